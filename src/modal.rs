//! Modal overlay stack.
//!
//! At most one modal is interactive at a time. When several are marked
//! active simultaneously, a fixed priority order decides which one receives
//! input; this order is checked on every event before any pane sees it.

use std::path::PathBuf;

/// What a confirmed destructive action should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmAction {
    /// Quit the application despite at-risk work.
    Quit,
    /// Delete the given filesystem entry.
    Delete(PathBuf),
    /// Close the tab for the given path, discarding unsaved changes.
    CloseTab(PathBuf),
}

/// Purpose of a text-input modal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputPurpose {
    /// Create a file inside `dir`.
    CreateFile { dir: PathBuf },
    /// Create a directory inside `dir`.
    CreateDirectory { dir: PathBuf },
    /// Rename `original` to the entered name.
    Rename { original: PathBuf },
}

/// State for a text-input modal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextInputState {
    pub purpose: InputPurpose,
    pub input: String,
    pub cursor: usize,
}

impl TextInputState {
    pub fn new(purpose: InputPurpose) -> Self {
        let mut state = Self {
            purpose,
            input: String::new(),
            cursor: 0,
        };
        // Rename prefills with the current file name, cursor at the end.
        if let InputPurpose::Rename { ref original } = state.purpose {
            if let Some(name) = original.file_name() {
                let name = name.to_string_lossy().to_string();
                state.cursor = name.len();
                state.input = name;
            }
        }
        state
    }

    pub fn insert_char(&mut self, c: char) {
        self.input.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    pub fn delete_char(&mut self) {
        if let Some(prev) = self.input[..self.cursor].chars().next_back() {
            self.cursor -= prev.len_utf8();
            self.input.remove(self.cursor);
        }
    }

    pub fn move_left(&mut self) {
        if let Some(prev) = self.input[..self.cursor].chars().next_back() {
            self.cursor -= prev.len_utf8();
        }
    }

    pub fn move_right(&mut self) {
        if let Some(next) = self.input[self.cursor..].chars().next() {
            self.cursor += next.len_utf8();
        }
    }
}

/// State for a list-selection modal (tool selector, project picker).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerState {
    pub entries: Vec<String>,
    pub selected: usize,
}

impl PickerState {
    pub fn new(entries: Vec<String>) -> Self {
        Self {
            entries,
            selected: 0,
        }
    }

    pub fn select_next(&mut self) {
        if !self.entries.is_empty() {
            self.selected = (self.selected + 1) % self.entries.len();
        }
    }

    pub fn select_previous(&mut self) {
        if !self.entries.is_empty() {
            self.selected = (self.selected + self.entries.len() - 1) % self.entries.len();
        }
    }
}

/// State for the quick-find (fuzzy file search) modal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QuickFindState {
    pub query: String,
    pub matches: Vec<PathBuf>,
    pub selected: usize,
}

/// Destructive confirmation dialog contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmState {
    pub title: String,
    pub items: Vec<String>,
    pub action: ConfirmAction,
}

/// Yes/no question dialog contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YesNoState {
    pub question: String,
    pub action: ConfirmAction,
}

/// Which modal is currently interactive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveModal {
    DestructiveConfirm,
    TextInput,
    YesNo,
    ProjectPicker,
    QuickFind,
    /// Tool selection for the given terminal slot.
    ToolSelector(usize),
    ShortcutsHelp,
}

/// All modal states, each independently activatable.
///
/// `active()` resolves the priority order:
/// destructive-confirm > text-input > yes/no > project-picker > quick-find >
/// tool-selector > shortcuts-help.
#[derive(Debug, Default)]
pub struct ModalStack {
    pub confirm: Option<ConfirmState>,
    pub text_input: Option<TextInputState>,
    pub yes_no: Option<YesNoState>,
    pub project_picker: Option<PickerState>,
    pub quick_find: Option<QuickFindState>,
    pub tool_selector: Option<(usize, PickerState)>,
    pub shortcuts_help: bool,
}

impl ModalStack {
    /// The modal that wins input, if any.
    pub fn active(&self) -> Option<ActiveModal> {
        if self.confirm.is_some() {
            Some(ActiveModal::DestructiveConfirm)
        } else if self.text_input.is_some() {
            Some(ActiveModal::TextInput)
        } else if self.yes_no.is_some() {
            Some(ActiveModal::YesNo)
        } else if self.project_picker.is_some() {
            Some(ActiveModal::ProjectPicker)
        } else if self.quick_find.is_some() {
            Some(ActiveModal::QuickFind)
        } else if let Some((slot, _)) = self.tool_selector {
            Some(ActiveModal::ToolSelector(slot))
        } else if self.shortcuts_help {
            Some(ActiveModal::ShortcutsHelp)
        } else {
            None
        }
    }

    /// Dismiss whichever modal is currently active.
    pub fn dismiss_active(&mut self) {
        match self.active() {
            Some(ActiveModal::DestructiveConfirm) => self.confirm = None,
            Some(ActiveModal::TextInput) => self.text_input = None,
            Some(ActiveModal::YesNo) => self.yes_no = None,
            Some(ActiveModal::ProjectPicker) => self.project_picker = None,
            Some(ActiveModal::QuickFind) => self.quick_find = None,
            Some(ActiveModal::ToolSelector(_)) => self.tool_selector = None,
            Some(ActiveModal::ShortcutsHelp) => self.shortcuts_help = false,
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stack_has_no_active_modal() {
        let stack = ModalStack::default();
        assert_eq!(stack.active(), None);
    }

    #[test]
    fn destructive_confirm_wins_over_text_input() {
        let mut stack = ModalStack::default();
        stack.text_input = Some(TextInputState::new(InputPurpose::CreateFile {
            dir: PathBuf::from("/tmp"),
        }));
        stack.confirm = Some(ConfirmState {
            title: "Quit".into(),
            items: vec!["modified buffer".into()],
            action: ConfirmAction::Quit,
        });
        assert_eq!(stack.active(), Some(ActiveModal::DestructiveConfirm));
    }

    #[test]
    fn priority_order_holds_down_the_list() {
        let mut stack = ModalStack::default();
        stack.shortcuts_help = true;
        assert_eq!(stack.active(), Some(ActiveModal::ShortcutsHelp));
        stack.tool_selector = Some((1, PickerState::new(vec!["Shell".into()])));
        assert_eq!(stack.active(), Some(ActiveModal::ToolSelector(1)));
        stack.quick_find = Some(QuickFindState::default());
        assert_eq!(stack.active(), Some(ActiveModal::QuickFind));
        stack.project_picker = Some(PickerState::new(vec!["a".into()]));
        assert_eq!(stack.active(), Some(ActiveModal::ProjectPicker));
        stack.yes_no = Some(YesNoState {
            question: "close?".into(),
            action: ConfirmAction::Quit,
        });
        assert_eq!(stack.active(), Some(ActiveModal::YesNo));
    }

    #[test]
    fn dismiss_removes_only_the_active_modal() {
        let mut stack = ModalStack::default();
        stack.shortcuts_help = true;
        stack.quick_find = Some(QuickFindState::default());
        stack.dismiss_active();
        assert!(stack.quick_find.is_none());
        assert_eq!(stack.active(), Some(ActiveModal::ShortcutsHelp));
    }

    #[test]
    fn rename_input_prefills_name() {
        let state = TextInputState::new(InputPurpose::Rename {
            original: PathBuf::from("/some/dir/hello.txt"),
        });
        assert_eq!(state.input, "hello.txt");
        assert_eq!(state.cursor, 9);
    }

    #[test]
    fn text_input_editing() {
        let mut state = TextInputState::new(InputPurpose::CreateFile {
            dir: PathBuf::from("/tmp"),
        });
        state.insert_char('a');
        state.insert_char('b');
        state.insert_char('c');
        assert_eq!(state.input, "abc");
        state.move_left();
        state.delete_char();
        assert_eq!(state.input, "ac");
        assert_eq!(state.cursor, 1);
        state.move_right();
        assert_eq!(state.cursor, 2);
    }

    #[test]
    fn picker_wraps_both_directions() {
        let mut picker = PickerState::new(vec!["a".into(), "b".into(), "c".into()]);
        picker.select_previous();
        assert_eq!(picker.selected, 2);
        picker.select_next();
        assert_eq!(picker.selected, 0);
    }
}
