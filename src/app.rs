//! Workspace coordinator.
//!
//! Owns every pane's state (tree, source-control, editor host, tabs, the
//! three terminal slots), the modal stack, focus, and the quit flow. All
//! mutation happens on the main loop's thread; background tasks only post
//! events, which the handlers here apply.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use tokio::sync::mpsc;

use crate::components::source_control::SourceControlState;
use crate::config::AppConfig;
use crate::error::Result;
use crate::event::Event;
use crate::fs::operations;
use crate::fs::tree::{FileTree, NodeKind};
use crate::git::GitEntry;
use crate::host::EditorHost;
use crate::layout::{
    compute_geometry, next_eligible_focus, prev_eligible_focus, terminal_slot_of, RegionSet,
    Visibility, FOCUS_EDITOR, FOCUS_TERMINAL_BASE, FOCUS_TREE, TERMINAL_SLOTS,
};
use crate::modal::{
    ConfirmAction, ConfirmState, InputPurpose, ModalStack, PickerState, QuickFindState,
    TextInputState, YesNoState,
};
use crate::tabs::TabStrip;
use crate::terminal::TerminalPanel;
use crate::theme::{resolve_theme, ThemeColors};

/// How long a status message stays on screen.
const STATUS_MESSAGE_TTL: Duration = Duration::from_secs(3);

/// Upper bound on quick-find candidates walked from the root.
const QUICK_FIND_WALK_LIMIT: usize = 5000;
/// Upper bound on matches shown in the quick-find list.
const QUICK_FIND_MATCH_LIMIT: usize = 100;

pub struct Workspace {
    pub root: PathBuf,
    pub config: AppConfig,
    pub theme: ThemeColors,

    pub vis: Visibility,
    pub focus: usize,
    /// Current screen size, updated on resize events.
    pub screen: (u16, u16),
    /// Regions from the last geometry pass, used for mouse hit-testing.
    pub regions: RegionSet,

    pub tree: FileTree,
    pub source_control: SourceControlState,
    pub tabs: TabStrip,
    pub host: Box<dyn EditorHost>,
    pub terminals: [TerminalPanel; TERMINAL_SLOTS],
    pub modals: ModalStack,

    pub status_message: Option<(String, bool, Instant)>,
    pub should_quit: bool,
    /// A quit-time inspection task is in flight; the overlay is shown.
    pub quit_scan_running: bool,
    /// Input has been idle past the timeout; background pollers are paused.
    pub suspended: bool,
    pub spinner_tick: usize,
    /// Quantize RGB colors to the 256-color cube (multiplexer sessions).
    pub quantize_colors: bool,

    last_input: Instant,
    /// Tool chosen for a slot while a speculative spawn was still in
    /// flight; applied once that spawn settles.
    pending_choice: Option<(usize, Vec<String>, String)>,
    /// Paths backing the project-picker entries, same order.
    project_paths: Vec<PathBuf>,
    /// All candidate files for the open quick-find modal.
    quick_find_files: Vec<PathBuf>,
    tx: mpsc::UnboundedSender<Event>,
}

impl Workspace {
    pub fn new(
        root: PathBuf,
        config: AppConfig,
        host: Box<dyn EditorHost>,
        tx: mpsc::UnboundedSender<Event>,
    ) -> Result<Self> {
        let theme = resolve_theme(&config.theme);
        let tree = FileTree::new(&root, config.show_hidden())?;
        Ok(Self {
            root,
            theme,
            vis: Visibility::default(),
            focus: FOCUS_TREE,
            screen: (0, 0),
            regions: RegionSet::default(),
            tree,
            source_control: SourceControlState::default(),
            tabs: TabStrip::default(),
            host,
            terminals: Default::default(),
            modals: ModalStack::default(),
            status_message: None,
            should_quit: false,
            quit_scan_running: false,
            suspended: false,
            spinner_tick: 0,
            quantize_colors: crate::components::terminal::in_multiplexer(),
            last_input: Instant::now(),
            pending_choice: None,
            project_paths: Vec::new(),
            quick_find_files: Vec::new(),
            config,
            tx,
        })
    }

    // ----- status messages -------------------------------------------------

    pub fn set_status(&mut self, message: impl Into<String>, is_error: bool) {
        self.status_message = Some((message.into(), is_error, Instant::now()));
    }

    pub fn clear_expired_status(&mut self) {
        if let Some((_, _, since)) = self.status_message {
            if since.elapsed() >= STATUS_MESSAGE_TTL {
                self.status_message = None;
            }
        }
    }

    // ----- geometry and focus ----------------------------------------------

    /// Recompute pane regions from current state and push sizes down to the
    /// visible terminal sessions. Called before every render and after any
    /// visibility or focus change.
    pub fn recompute_geometry(&mut self) {
        let cfg = self.config.layout_config();
        self.regions = compute_geometry(self.screen.0, self.screen.1, &self.vis, self.focus, &cfg);
        for slot in 0..TERMINAL_SLOTS {
            let region = self.regions.terminals[slot];
            if self.vis.terminals[slot] && !region.is_empty() {
                self.terminals[slot].resize(
                    region.height.saturating_sub(2).max(1),
                    region.width.saturating_sub(2).max(1),
                );
            }
        }
    }

    pub fn on_resize(&mut self, width: u16, height: u16) {
        self.screen = (width, height);
        self.recompute_geometry();
    }

    fn session_alive(&self) -> [bool; TERMINAL_SLOTS] {
        let mut alive = [false; TERMINAL_SLOTS];
        for (slot, panel) in self.terminals.iter().enumerate() {
            alive[slot] = panel.is_alive();
        }
        alive
    }

    /// Move focus off a slot that is no longer eligible.
    pub fn ensure_valid_focus(&mut self) {
        let eligible = match self.focus {
            FOCUS_TREE => self.vis.left_visible(),
            FOCUS_EDITOR => self.vis.editor,
            f => terminal_slot_of(f)
                .map(|t| self.vis.terminals[t] && self.terminals[t].is_alive())
                .unwrap_or(false),
        };
        if !eligible {
            self.focus = next_eligible_focus(self.focus, &self.vis, &self.session_alive());
        }
    }

    pub fn cycle_focus(&mut self) {
        self.focus = next_eligible_focus(self.focus, &self.vis, &self.session_alive());
        self.recompute_geometry();
    }

    pub fn cycle_focus_back(&mut self) {
        self.focus = prev_eligible_focus(self.focus, &self.vis, &self.session_alive());
        self.recompute_geometry();
    }

    /// Terminal slot behind the current focus, if any.
    pub fn focused_terminal(&self) -> Option<usize> {
        terminal_slot_of(self.focus)
    }

    pub fn focus_label(&self) -> String {
        match self.focus {
            FOCUS_TREE if self.vis.source_control => "source control".to_string(),
            FOCUS_TREE => "tree".to_string(),
            FOCUS_EDITOR => "editor".to_string(),
            f => match terminal_slot_of(f) {
                Some(slot) => self.terminals[slot]
                    .tool_name()
                    .unwrap_or_else(|| format!("terminal {}", slot + 1)),
                None => String::new(),
            },
        }
    }

    // ----- pane toggles ----------------------------------------------------

    pub fn toggle_tree(&mut self) {
        self.vis.toggle_tree();
        if self.vis.tree {
            self.focus = FOCUS_TREE;
        } else {
            self.ensure_valid_focus();
        }
        self.recompute_geometry();
    }

    pub fn toggle_source_control(&mut self) {
        self.vis.toggle_source_control();
        if self.vis.source_control {
            self.focus = FOCUS_TREE;
        } else {
            self.ensure_valid_focus();
        }
        self.recompute_geometry();
    }

    pub fn toggle_editor(&mut self) {
        self.vis.editor = !self.vis.editor;
        if self.vis.editor {
            self.focus = FOCUS_EDITOR;
        } else {
            self.ensure_valid_focus();
        }
        self.recompute_geometry();
    }

    /// Toggle a terminal slot.
    ///
    /// Showing a slot focuses it and, when no session is running and none is
    /// being created, opens the tool selector. Hiding the focused slot
    /// reassigns focus first.
    pub fn toggle_terminal(&mut self, slot: usize) {
        if slot >= TERMINAL_SLOTS {
            return;
        }
        let focus_slot = FOCUS_TERMINAL_BASE + slot;
        if self.vis.terminals[slot] {
            if self.focus == focus_slot {
                self.vis.terminals[slot] = false;
                self.ensure_valid_focus();
            } else {
                self.focus = focus_slot;
                if !self.terminals[slot].is_alive() && !self.terminals[slot].is_spawning() {
                    self.open_tool_selector(slot);
                }
            }
        } else {
            self.vis.terminals[slot] = true;
            self.focus = focus_slot;
            if !self.terminals[slot].is_alive() && !self.terminals[slot].is_spawning() {
                self.open_tool_selector(slot);
            }
        }
        self.recompute_geometry();
    }

    // ----- terminal sessions -----------------------------------------------

    /// Picker entries: shell first, then the configured assistant or an
    /// install hint when none is configured.
    pub fn open_tool_selector(&mut self, slot: usize) {
        let mut entries = vec![format!("Shell ({})", self.config.shell_command())];
        match self.config.assistant_command() {
            Some(cmd) => {
                let name = cmd.split_whitespace().next().unwrap_or(&cmd).to_string();
                entries.push(name);
            }
            None => entries.push("No assistant configured (set terminal.assistant_command)".into()),
        }
        self.modals.tool_selector = Some((slot, PickerState::new(entries)));
    }

    /// Apply a tool-selector choice for `slot`.
    pub fn choose_tool(&mut self, slot: usize, index: usize) {
        self.modals.tool_selector = None;
        let (command, tool) = match index {
            0 => {
                let shell = self.config.shell_command();
                (vec![shell.clone()], shell)
            }
            _ => match self.config.assistant_command() {
                Some(cmd) => {
                    let parts: Vec<String> = cmd.split_whitespace().map(String::from).collect();
                    let name = parts.first().cloned().unwrap_or(cmd);
                    (parts, name)
                }
                None => {
                    self.set_status("no assistant configured", true);
                    return;
                }
            },
        };
        if self.terminals[slot].is_spawning() {
            if self.terminals[slot].pending_tool() == Some(tool.as_str()) {
                return;
            }
            // A different tool than the in-flight spawn; swap once it lands.
            self.pending_choice = Some((slot, command, tool));
            return;
        }
        // A preloaded session for a different tool is discarded here.
        if self.terminals[slot].is_alive()
            && self.terminals[slot].tool_name().as_deref() != Some(tool.as_str())
        {
            self.terminals[slot].clear_session();
        }
        self.spawn_terminal(slot, command, tool);
    }

    /// Speculatively start a shell in the first terminal slot and ask which
    /// tool should run there; picking a different tool replaces the
    /// preloaded session.
    pub fn preload_terminal(&mut self) {
        self.vis.terminals[0] = true;
        let shell = self.config.shell_command();
        self.spawn_terminal(0, vec![shell.clone()], shell);
        self.open_tool_selector(0);
        self.recompute_geometry();
    }

    /// Start a session in `slot`, sized for the geometry the slot will have
    /// once visible and focused.
    pub fn spawn_terminal(&mut self, slot: usize, command: Vec<String>, tool: String) {
        let mut vis = self.vis.clone();
        vis.terminals[slot] = true;
        let cfg = self.config.layout_config();
        let set = compute_geometry(
            self.screen.0,
            self.screen.1,
            &vis,
            FOCUS_TERMINAL_BASE + slot,
            &cfg,
        );
        let region = set.terminals[slot];
        let rows = region.height.saturating_sub(2).max(1);
        let cols = region.width.saturating_sub(2).max(1);
        let cwd = self.current_dir();
        self.terminals[slot].spawn_session(
            slot,
            command,
            tool,
            cwd,
            rows,
            cols,
            self.config.scrollback_limit(),
            self.tx.clone(),
        );
    }

    pub fn on_session_ready(&mut self, slot: usize) {
        if slot >= TERMINAL_SLOTS {
            return;
        }
        self.terminals[slot].on_ready();
        self.vis.terminals[slot] = true;
        self.recompute_geometry();
        // A choice made while this spawn was in flight replaces it now.
        if let Some((pending_slot, command, tool)) = self.pending_choice.take() {
            if pending_slot != slot {
                self.pending_choice = Some((pending_slot, command, tool));
            } else if self.terminals[slot].tool_name().as_deref() != Some(tool.as_str()) {
                self.terminals[slot].clear_session();
                self.spawn_terminal(slot, command, tool);
            }
        }
    }

    /// The child exited: hide the slot, drop the session, reassign focus.
    pub fn on_session_exited(&mut self, slot: usize) {
        if slot >= TERMINAL_SLOTS {
            return;
        }
        let tool = self.terminals[slot].tool_name();
        self.terminals[slot].clear_session();
        self.vis.terminals[slot] = false;
        self.ensure_valid_focus();
        self.recompute_geometry();
        match tool {
            Some(tool) => self.set_status(format!("{tool} exited"), false),
            None => self.set_status(format!("terminal {} exited", slot + 1), false),
        }
    }

    pub fn on_spawn_failed(&mut self, slot: usize, message: String) {
        if slot >= TERMINAL_SLOTS {
            return;
        }
        self.terminals[slot].on_spawn_failed(message.clone());
        // A choice queued behind the failed spawn still goes ahead.
        if let Some((pending_slot, command, tool)) = self.pending_choice.take() {
            if pending_slot == slot {
                self.spawn_terminal(slot, command, tool);
                return;
            }
            self.pending_choice = Some((pending_slot, command, tool));
        }
        self.set_status(format!("terminal {}: {message}", slot + 1), true);
    }

    pub fn on_pty_output(&mut self, slot: usize, data: &[u8]) {
        if slot < TERMINAL_SLOTS {
            self.terminals[slot].process_output(data);
        }
    }

    // ----- quit flow -------------------------------------------------------

    /// Start quit-time inspection on a background task. The main loop shows
    /// the "Quitting" overlay until `QuitScanDone` arrives.
    pub fn request_quit(&mut self) {
        if self.quit_scan_running {
            return;
        }
        self.quit_scan_running = true;

        let mut items: Vec<String> = self
            .host
            .modified_paths()
            .iter()
            .map(|p| format!("unsaved: {}", p.display()))
            .collect();
        let sessions: Vec<(usize, u32)> = self
            .terminals
            .iter()
            .enumerate()
            .filter_map(|(slot, panel)| panel.process_id().map(|pid| (slot, pid)))
            .collect();
        let names = self.config.assistant_names();
        let tx = self.tx.clone();

        tokio::task::spawn_blocking(move || {
            for (slot, pid) in sessions {
                if let Some(comm) = foreground_process_name(pid) {
                    if names.iter().any(|n| n == &comm) {
                        items.push(format!("terminal {}: {comm} is running", slot + 1));
                    }
                }
            }
            let _ = tx.send(Event::QuitScanDone(items));
        });
    }

    pub fn on_quit_scan_done(&mut self, items: Vec<String>) {
        self.quit_scan_running = false;
        if items.is_empty() {
            self.should_quit = true;
        } else {
            self.modals.confirm = Some(ConfirmState {
                title: "Quit with work at risk?".into(),
                items,
                action: ConfirmAction::Quit,
            });
        }
    }

    /// Run a confirmed destructive action.
    pub fn confirm_action(&mut self, action: ConfirmAction) {
        match action {
            ConfirmAction::Quit => self.should_quit = true,
            ConfirmAction::Delete(path) => match operations::delete(&path) {
                Ok(()) => {
                    let name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_else(|| path.display().to_string());
                    self.tree.apply_changes(std::slice::from_ref(&path));
                    self.tree.select_after_delete(&path);
                    self.close_tab_for(&path);
                    self.set_status(format!("deleted {name}"), false);
                }
                Err(err) => self.set_status(format!("delete failed: {err}"), true),
            },
            ConfirmAction::CloseTab(path) => self.close_tab_for(&path),
        }
    }

    // ----- idle suspension -------------------------------------------------

    /// Record user input; returns true when this wakes the workspace from
    /// idle suspension.
    pub fn note_input(&mut self) -> bool {
        self.last_input = Instant::now();
        if self.suspended {
            self.suspended = false;
            true
        } else {
            false
        }
    }

    /// Advance animation state and check the idle timeout. Returns true when
    /// the workspace just became idle.
    pub fn on_tick(&mut self) -> bool {
        self.spinner_tick = self.spinner_tick.wrapping_add(1);
        self.clear_expired_status();
        let timeout = Duration::from_secs(self.config.idle_timeout_secs());
        if !self.suspended && self.last_input.elapsed() >= timeout {
            self.suspended = true;
            return true;
        }
        false
    }

    // ----- files, tabs, tree -----------------------------------------------

    /// Directory that file creation and terminal sessions should use: the
    /// selected directory, or the parent of the selected file.
    pub fn current_dir(&self) -> PathBuf {
        match self.tree.selected_entry() {
            Some(entry) if entry.kind == NodeKind::Directory => entry.path.clone(),
            Some(entry) => entry
                .path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| self.root.clone()),
            None => self.root.clone(),
        }
    }

    /// Open a file in the editor: preview tab unless `pinned`.
    pub fn open_file(&mut self, path: &Path, pinned: bool) {
        // Remember which preview tab a successful open will replace.
        let replaced = self
            .tabs
            .tabs
            .iter()
            .find(|t| !t.pinned && t.path != path)
            .map(|t| t.path.clone());
        match self.host.open(path) {
            Ok(()) => {
                if pinned {
                    self.tabs.open_pinned(path);
                } else {
                    self.tabs.open_preview(path);
                    if let Some(old) = replaced {
                        if self.tabs.index_of(&old).is_none() {
                            self.host.close(&old);
                        }
                    }
                }
                self.vis.editor = true;
                self.focus = FOCUS_EDITOR;
                self.recompute_geometry();
            }
            Err(err) => self.set_status(format!("open failed: {err}"), true),
        }
    }

    /// Close the active tab; a buffer with unsaved changes asks first.
    pub fn close_active_tab(&mut self) {
        let Some(path) = self.tabs.active_path().map(Path::to_path_buf) else {
            return;
        };
        if self.host.modified_paths().contains(&path) {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());
            self.modals.yes_no = Some(YesNoState {
                question: format!("Discard unsaved changes to {name}?"),
                action: ConfirmAction::CloseTab(path),
            });
            return;
        }
        if let Some(tab) = self.tabs.close_active() {
            self.host.close(&tab.path);
        }
    }

    fn close_tab_for(&mut self, path: &Path) {
        if let Some(idx) = self.tabs.index_of(path) {
            if let Some(tab) = self.tabs.close(idx) {
                self.host.close(&tab.path);
            }
        }
    }

    pub fn save_active(&mut self) {
        let Some(path) = self.tabs.active_path().map(Path::to_path_buf) else {
            return;
        };
        match self.host.save(&path) {
            Ok(()) => {
                let name = path.file_name().unwrap_or_default().to_string_lossy();
                self.set_status(format!("saved {name}"), false);
            }
            Err(err) => self.set_status(format!("save failed: {err}"), true),
        }
    }

    /// Apply debounced watcher changes to the tree.
    pub fn on_fs_change(&mut self, paths: &[PathBuf]) {
        self.tree.apply_changes(paths);
    }

    pub fn on_git_status(&mut self, entries: Vec<GitEntry>) {
        self.source_control.update(entries);
    }

    // ----- modals ----------------------------------------------------------

    pub fn open_create_file(&mut self) {
        let dir = self.current_dir();
        self.modals.text_input = Some(TextInputState::new(InputPurpose::CreateFile { dir }));
    }

    pub fn open_create_dir(&mut self) {
        let dir = self.current_dir();
        self.modals.text_input = Some(TextInputState::new(InputPurpose::CreateDirectory { dir }));
    }

    pub fn open_rename(&mut self) {
        if let Some(entry) = self.tree.selected_entry() {
            if entry.path != self.tree.root_path() {
                self.modals.text_input = Some(TextInputState::new(InputPurpose::Rename {
                    original: entry.path.clone(),
                }));
            }
        }
    }

    pub fn open_delete_confirm(&mut self) {
        if let Some(entry) = self.tree.selected_entry() {
            if entry.path == self.tree.root_path() {
                return;
            }
            self.modals.confirm = Some(ConfirmState {
                title: "Delete?".into(),
                items: vec![entry.path.display().to_string()],
                action: ConfirmAction::Delete(entry.path.clone()),
            });
        }
    }

    /// Run the submitted text-input action.
    pub fn submit_text_input(&mut self, state: TextInputState) {
        let name = state.input.trim();
        if name.is_empty() {
            return;
        }
        let result = match &state.purpose {
            InputPurpose::CreateFile { dir } => {
                let path = dir.join(name);
                operations::create_file(&path).map(|()| (path, format!("created {name}")))
            }
            InputPurpose::CreateDirectory { dir } => {
                let path = dir.join(name);
                operations::create_dir(&path).map(|()| (path, format!("created {name}/")))
            }
            InputPurpose::Rename { original } => {
                operations::rename(original, name).map(|path| (path, format!("renamed to {name}")))
            }
        };
        match result {
            Ok((path, message)) => {
                if let InputPurpose::Rename { original } = &state.purpose {
                    self.tree.apply_changes(std::slice::from_ref(original));
                    self.close_tab_for(original);
                }
                self.tree.apply_changes(std::slice::from_ref(&path));
                self.tree.select_path(&path);
                self.set_status(message, false);
            }
            Err(err) => self.set_status(err.to_string(), true),
        }
    }

    // ----- quick find ------------------------------------------------------

    pub fn open_quick_find(&mut self) {
        self.quick_find_files = operations::collect_files(&self.root, QUICK_FIND_WALK_LIMIT);
        self.modals.quick_find = Some(QuickFindState {
            query: String::new(),
            matches: self
                .quick_find_files
                .iter()
                .take(QUICK_FIND_MATCH_LIMIT)
                .cloned()
                .collect(),
            selected: 0,
        });
    }

    /// Re-rank matches after a query edit.
    pub fn update_quick_find(&mut self) {
        let Some(state) = self.modals.quick_find.as_mut() else {
            return;
        };
        if state.query.is_empty() {
            state.matches = self
                .quick_find_files
                .iter()
                .take(QUICK_FIND_MATCH_LIMIT)
                .cloned()
                .collect();
        } else {
            let matcher = SkimMatcherV2::default();
            let mut scored: Vec<(i64, &PathBuf)> = self
                .quick_find_files
                .iter()
                .filter_map(|p| {
                    let hay = p.strip_prefix(&self.root).unwrap_or(p).to_string_lossy();
                    matcher.fuzzy_match(&hay, &state.query).map(|s| (s, p))
                })
                .collect();
            scored.sort_by(|a, b| b.0.cmp(&a.0));
            state.matches = scored
                .into_iter()
                .take(QUICK_FIND_MATCH_LIMIT)
                .map(|(_, p)| p.clone())
                .collect();
        }
        state.selected = 0;
    }

    /// Open the selected quick-find match and dismiss the modal.
    pub fn accept_quick_find(&mut self) {
        let selection = self
            .modals
            .quick_find
            .as_ref()
            .and_then(|s| s.matches.get(s.selected).cloned());
        self.modals.quick_find = None;
        if let Some(path) = selection {
            self.tree.select_path(&path);
            self.open_file(&path, false);
        }
    }

    // ----- project picker --------------------------------------------------

    /// List immediate subdirectories of the root as switchable projects.
    pub fn open_project_picker(&mut self) {
        let mut dirs: Vec<PathBuf> = std::fs::read_dir(&self.root)
            .map(|rd| {
                rd.filter_map(|e| e.ok())
                    .map(|e| e.path())
                    .filter(|p| {
                        p.is_dir()
                            && p.file_name()
                                .is_some_and(|n| !n.to_string_lossy().starts_with('.'))
                    })
                    .collect()
            })
            .unwrap_or_default();
        dirs.sort();
        if dirs.is_empty() {
            self.set_status("no subdirectories to open", false);
            return;
        }
        let entries = dirs
            .iter()
            .map(|p| {
                p.file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| p.display().to_string())
            })
            .collect();
        self.project_paths = dirs;
        self.modals.project_picker = Some(PickerState::new(entries));
    }

    /// Re-root the tree at the picked project directory.
    pub fn choose_project(&mut self, index: usize) {
        self.modals.project_picker = None;
        let Some(path) = self.project_paths.get(index).cloned() else {
            return;
        };
        match FileTree::new(&path, self.config.show_hidden()) {
            Ok(tree) => {
                self.tree = tree;
                self.root = path.clone();
                self.set_status(format!("opened {}", path.display()), false);
            }
            Err(err) => self.set_status(format!("open failed: {err}"), true),
        }
    }
}

/// Name of the process a session is currently running, for the quit scan.
///
/// Follows the child chain from the PTY's immediate child (the shell) down
/// to the deepest descendant, reading `/proc/<pid>/comm`. Returns the
/// shell's own name when it has no children.
fn foreground_process_name(pid: u32) -> Option<String> {
    let mut current = pid;
    for _ in 0..8 {
        let children =
            std::fs::read_to_string(format!("/proc/{current}/task/{current}/children"))
                .unwrap_or_default();
        match children
            .split_whitespace()
            .last()
            .and_then(|c| c.parse::<u32>().ok())
        {
            Some(child) => current = child,
            None => break,
        }
    }
    std::fs::read_to_string(format!("/proc/{current}/comm"))
        .ok()
        .map(|s| s.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::FileViewerHost;
    use crate::modal::ActiveModal;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Workspace, mpsc::UnboundedReceiver<Event>) {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "hello\n").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/b.rs"), "fn main() {}\n").unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        let mut ws = Workspace::new(
            dir.path().to_path_buf(),
            AppConfig::default(),
            Box::new(FileViewerHost::default()),
            tx,
        )
        .unwrap();
        ws.on_resize(120, 40);
        (dir, ws, rx)
    }

    #[test]
    fn hiding_focused_tree_reassigns_focus() {
        let (_dir, mut ws, _rx) = setup();
        assert_eq!(ws.focus, FOCUS_TREE);
        ws.toggle_tree();
        assert!(!ws.vis.tree);
        assert_eq!(ws.focus, FOCUS_EDITOR);
    }

    #[test]
    fn showing_terminal_opens_tool_selector() {
        let (_dir, mut ws, _rx) = setup();
        ws.toggle_terminal(1);
        assert!(ws.vis.terminals[1]);
        assert_eq!(ws.focus, FOCUS_TERMINAL_BASE + 1);
        assert_eq!(ws.modals.active(), Some(ActiveModal::ToolSelector(1)));
    }

    #[test]
    fn hiding_focused_terminal_moves_focus_back() {
        let (_dir, mut ws, _rx) = setup();
        ws.toggle_terminal(0);
        ws.modals.tool_selector = None;
        ws.toggle_terminal(0);
        assert!(!ws.vis.terminals[0]);
        assert_ne!(ws.focus, FOCUS_TERMINAL_BASE);
    }

    #[test]
    fn tool_selector_lists_shell_first() {
        let (_dir, mut ws, _rx) = setup();
        ws.open_tool_selector(0);
        let (slot, picker) = ws.modals.tool_selector.as_ref().unwrap();
        assert_eq!(*slot, 0);
        assert!(picker.entries[0].starts_with("Shell ("));
        assert_eq!(picker.entries.len(), 2);
    }

    #[test]
    fn open_file_creates_preview_tab_and_focuses_editor() {
        let (dir, mut ws, _rx) = setup();
        ws.focus = FOCUS_TREE;
        ws.open_file(&dir.path().join("a.txt"), false);
        assert_eq!(ws.tabs.tabs.len(), 1);
        assert!(!ws.tabs.tabs[0].pinned);
        assert_eq!(ws.focus, FOCUS_EDITOR);
    }

    #[test]
    fn replaced_preview_buffer_is_closed() {
        let (dir, mut ws, _rx) = setup();
        ws.open_file(&dir.path().join("a.txt"), false);
        ws.open_file(&dir.path().join("sub/b.rs"), false);
        assert_eq!(ws.tabs.tabs.len(), 1);
        assert_eq!(ws.tabs.tabs[0].title, "b.rs");
    }

    #[test]
    fn create_file_via_text_input() {
        let (dir, mut ws, _rx) = setup();
        ws.tree.select_path(&dir.path().join("a.txt"));
        ws.open_create_file();
        let mut state = ws.modals.text_input.take().unwrap();
        for c in "new.txt".chars() {
            state.insert_char(c);
        }
        ws.submit_text_input(state);
        assert!(dir.path().join("new.txt").exists());
        let (msg, is_error, _) = ws.status_message.as_ref().unwrap();
        assert!(msg.contains("created"), "{msg}");
        assert!(!is_error);
    }

    #[test]
    fn duplicate_create_reports_error_status() {
        let (dir, mut ws, _rx) = setup();
        ws.tree.select_path(&dir.path().join("a.txt"));
        ws.open_create_file();
        let mut state = ws.modals.text_input.take().unwrap();
        for c in "a.txt".chars() {
            state.insert_char(c);
        }
        ws.submit_text_input(state);
        let (_, is_error, _) = ws.status_message.as_ref().unwrap();
        assert!(is_error);
    }

    #[test]
    fn delete_confirm_removes_entry() {
        let (dir, mut ws, _rx) = setup();
        let target = dir.path().join("a.txt");
        ws.tree.select_path(&target);
        ws.open_delete_confirm();
        let action = ws.modals.confirm.take().unwrap().action;
        ws.confirm_action(action);
        assert!(!target.exists());
    }

    #[test]
    fn root_cannot_be_deleted_or_renamed() {
        let (_dir, mut ws, _rx) = setup();
        ws.tree.selected = 0;
        ws.open_delete_confirm();
        assert!(ws.modals.confirm.is_none());
        ws.open_rename();
        assert!(ws.modals.text_input.is_none());
    }

    #[tokio::test]
    async fn quit_with_no_work_completes_cleanly() {
        let (_dir, mut ws, mut rx) = setup();
        ws.request_quit();
        assert!(ws.quit_scan_running);
        let items = loop {
            match rx.recv().await {
                Some(Event::QuitScanDone(items)) => break items,
                Some(_) => continue,
                None => panic!("channel closed"),
            }
        };
        ws.on_quit_scan_done(items);
        assert!(ws.should_quit);
        assert!(!ws.quit_scan_running);
    }

    #[test]
    fn quit_scan_with_findings_opens_confirm() {
        let (_dir, mut ws, _rx) = setup();
        ws.quit_scan_running = true;
        ws.on_quit_scan_done(vec!["terminal 1: aider is running".into()]);
        assert!(!ws.should_quit);
        let confirm = ws.modals.confirm.as_ref().unwrap();
        assert_eq!(confirm.action, ConfirmAction::Quit);
        assert_eq!(confirm.items.len(), 1);
    }

    #[test]
    fn quick_find_ranks_matches() {
        let (_dir, mut ws, _rx) = setup();
        ws.open_quick_find();
        {
            let state = ws.modals.quick_find.as_mut().unwrap();
            state.query = "b.rs".into();
        }
        ws.update_quick_find();
        let state = ws.modals.quick_find.as_ref().unwrap();
        assert_eq!(state.matches.len(), 1);
        assert!(state.matches[0].ends_with("sub/b.rs"));
    }

    #[test]
    fn quick_find_empty_query_lists_everything() {
        let (_dir, mut ws, _rx) = setup();
        ws.open_quick_find();
        let state = ws.modals.quick_find.as_ref().unwrap();
        assert_eq!(state.matches.len(), 2);
    }

    #[test]
    fn status_message_expires() {
        let (_dir, mut ws, _rx) = setup();
        ws.set_status("hello", false);
        ws.clear_expired_status();
        assert!(ws.status_message.is_some());
        ws.status_message = Some(("old".into(), false, Instant::now() - Duration::from_secs(4)));
        ws.clear_expired_status();
        assert!(ws.status_message.is_none());
    }

    #[test]
    fn idle_suspends_and_input_wakes() {
        let (_dir, mut ws, _rx) = setup();
        ws.last_input = Instant::now() - Duration::from_secs(120);
        assert!(ws.on_tick());
        assert!(ws.suspended);
        assert!(!ws.on_tick());
        assert!(ws.note_input());
        assert!(!ws.suspended);
        assert!(!ws.note_input());
    }

    #[test]
    fn current_dir_follows_selection() {
        let (dir, mut ws, _rx) = setup();
        ws.tree.select_path(&dir.path().join("a.txt"));
        assert_eq!(ws.current_dir(), dir.path());
        ws.tree.select_path(&dir.path().join("sub"));
        assert_eq!(ws.current_dir(), dir.path().join("sub"));
    }

    #[test]
    fn project_picker_lists_subdirectories() {
        let (dir, mut ws, _rx) = setup();
        ws.open_project_picker();
        let picker = ws.modals.project_picker.as_ref().unwrap();
        assert_eq!(picker.entries, vec!["sub".to_string()]);
        ws.choose_project(0);
        assert_eq!(ws.root, dir.path().join("sub"));
    }

    #[test]
    fn close_tab_with_clean_buffer_closes_immediately() {
        let (dir, mut ws, _rx) = setup();
        ws.open_file(&dir.path().join("a.txt"), true);
        ws.close_active_tab();
        assert!(ws.tabs.tabs.is_empty());
        assert!(ws.modals.yes_no.is_none());
    }

    #[test]
    fn close_tab_with_unsaved_changes_asks_first() {
        // A host that reports every open buffer as modified.
        #[derive(Default)]
        struct DirtyHost {
            open: Vec<PathBuf>,
        }
        impl crate::host::EditorHost for DirtyHost {
            fn open(&mut self, path: &Path) -> crate::error::Result<()> {
                self.open.push(path.to_path_buf());
                Ok(())
            }
            fn close(&mut self, path: &Path) {
                self.open.retain(|p| p != path);
            }
            fn modified_paths(&self) -> Vec<PathBuf> {
                self.open.clone()
            }
            fn save(&mut self, _path: &Path) -> crate::error::Result<()> {
                Ok(())
            }
            fn handle_key(&mut self, _path: &Path, _key: &crossterm::event::KeyEvent) -> bool {
                false
            }
            fn render(
                &mut self,
                _frame: &mut ratatui::Frame,
                _area: ratatui::layout::Rect,
                _path: Option<&Path>,
                _focused: bool,
                _theme: &ThemeColors,
            ) {
            }
        }

        let (dir, mut ws, _rx) = setup();
        ws.host = Box::new(DirtyHost::default());
        let path = dir.path().join("a.txt");
        ws.open_file(&path, true);
        ws.close_active_tab();
        assert_eq!(ws.tabs.tabs.len(), 1);
        let question = ws.modals.yes_no.take().unwrap();
        assert_eq!(question.action, ConfirmAction::CloseTab(path));
        ws.confirm_action(question.action);
        assert!(ws.tabs.tabs.is_empty());
    }

    #[test]
    fn session_exited_hides_slot() {
        let (_dir, mut ws, _rx) = setup();
        ws.vis.terminals[2] = true;
        ws.focus = FOCUS_TERMINAL_BASE + 2;
        ws.on_session_exited(2);
        assert!(!ws.vis.terminals[2]);
        assert_ne!(ws.focus, FOCUS_TERMINAL_BASE + 2);
    }

    #[tokio::test]
    async fn exited_session_is_dropped_from_its_slot() {
        let (_dir, mut ws, mut rx) = setup();
        ws.vis.terminals[2] = true;
        ws.spawn_terminal(2, vec!["/bin/sh".to_string()], "/bin/sh".to_string());
        loop {
            match rx.recv().await {
                Some(Event::SessionReady(2)) => break,
                Some(_) => continue,
                None => panic!("channel closed before SessionReady"),
            }
        }
        ws.on_session_ready(2);
        ws.focus = FOCUS_TERMINAL_BASE + 2;
        assert!(ws.terminals[2].is_alive());
        ws.on_session_exited(2);
        assert!(!ws.terminals[2].is_alive());
        assert!(!ws.vis.terminals[2]);
        assert_ne!(ws.focus, FOCUS_TERMINAL_BASE + 2);
    }

    #[tokio::test]
    async fn preload_starts_shell_and_opens_selector() {
        let (_dir, mut ws, _rx) = setup();
        ws.config.terminal.shell = Some("/bin/sh".into());
        ws.preload_terminal();
        assert!(ws.vis.terminals[0]);
        assert!(ws.terminals[0].is_spawning());
        assert_eq!(ws.modals.active(), Some(ActiveModal::ToolSelector(0)));
        // Confirming the preloaded shell keeps the in-flight spawn.
        ws.choose_tool(0, 0);
        assert!(ws.modals.tool_selector.is_none());
        assert!(ws.terminals[0].is_spawning());
        ws.terminals[0].clear_session();
    }

    #[tokio::test]
    async fn tool_choice_on_live_session_replaces_it() {
        let (_dir, mut ws, mut rx) = setup();
        ws.config.terminal.shell = Some("/bin/sh".into());
        ws.config.terminal.assistant_command = Some("echo ready".into());
        ws.preload_terminal();
        loop {
            match rx.recv().await {
                Some(Event::SessionReady(0)) => break,
                Some(_) => continue,
                None => panic!("channel closed before SessionReady"),
            }
        }
        ws.on_session_ready(0);
        assert_eq!(ws.terminals[0].tool_name().as_deref(), Some("/bin/sh"));
        ws.choose_tool(0, 1);
        assert!(ws.terminals[0].is_spawning());
        loop {
            match rx.recv().await {
                Some(Event::SessionReady(0)) => {
                    ws.on_session_ready(0);
                    break;
                }
                Some(_) => continue,
                None => panic!("channel closed before replacement"),
            }
        }
        assert_eq!(ws.terminals[0].tool_name().as_deref(), Some("echo"));
        ws.terminals[0].clear_session();
    }

    #[tokio::test]
    async fn tool_choice_during_spawn_is_applied_when_it_lands() {
        let (_dir, mut ws, mut rx) = setup();
        ws.config.terminal.shell = Some("/bin/sh".into());
        ws.config.terminal.assistant_command = Some("echo ready".into());
        ws.preload_terminal();
        // Pick the assistant while the shell spawn is still in flight.
        ws.choose_tool(0, 1);
        assert!(ws.modals.tool_selector.is_none());
        loop {
            match rx.recv().await {
                Some(Event::SessionReady(0)) => {
                    ws.on_session_ready(0);
                    if !ws.terminals[0].is_spawning()
                        && ws.terminals[0].tool_name().as_deref() == Some("echo")
                    {
                        break;
                    }
                }
                Some(_) => continue,
                None => panic!("channel closed before replacement"),
            }
        }
        ws.terminals[0].clear_session();
    }
}
