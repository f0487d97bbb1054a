//! Modal overlay widgets: confirm, text input, pickers, quick-find,
//! shortcuts help, and the quit-scan overlay.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Padding, Widget},
};

use crate::modal::{
    ActiveModal, ConfirmState, InputPurpose, ModalStack, PickerState, QuickFindState,
    TextInputState, YesNoState,
};
use crate::theme::ThemeColors;

/// Centered rectangle within `area`.
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    let x = area.x + (area.width - w) / 2;
    let y = area.y + (area.height - h) / 2;
    Rect::new(x, y, w, h)
}

fn dialog_block<'a>(title: String, theme: &ThemeColors) -> Block<'a> {
    Block::default()
        .title(format!(" {title} "))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.dialog_border_fg))
        .style(Style::default().bg(theme.dialog_bg))
        .padding(Padding::horizontal(1))
}

/// Render whichever modal currently wins input.
pub fn render_active_modal(stack: &ModalStack, theme: &ThemeColors, area: Rect, buf: &mut Buffer) {
    match stack.active() {
        Some(ActiveModal::DestructiveConfirm) => {
            if let Some(state) = &stack.confirm {
                render_confirm(state, theme, area, buf);
            }
        }
        Some(ActiveModal::TextInput) => {
            if let Some(state) = &stack.text_input {
                render_text_input(state, theme, area, buf);
            }
        }
        Some(ActiveModal::YesNo) => {
            if let Some(state) = &stack.yes_no {
                render_yes_no(state, theme, area, buf);
            }
        }
        Some(ActiveModal::ProjectPicker) => {
            if let Some(state) = &stack.project_picker {
                render_picker("Open project", state, theme, area, buf);
            }
        }
        Some(ActiveModal::QuickFind) => {
            if let Some(state) = &stack.quick_find {
                render_quick_find(state, theme, area, buf);
            }
        }
        Some(ActiveModal::ToolSelector(_)) => {
            if let Some((_, state)) = &stack.tool_selector {
                render_picker("Start in terminal", state, theme, area, buf);
            }
        }
        Some(ActiveModal::ShortcutsHelp) => render_shortcuts(theme, area, buf),
        None => {}
    }
}

fn render_confirm(state: &ConfirmState, theme: &ThemeColors, area: Rect, buf: &mut Buffer) {
    let height = (state.items.len() as u16 + 6).min(area.height);
    let rect = centered_rect(56, height, area);
    Clear.render(rect, buf);
    let block = dialog_block(state.title.clone(), theme)
        .border_style(Style::default().fg(theme.error_fg));
    let inner = block.inner(rect);
    block.render(rect, buf);
    if inner.height == 0 {
        return;
    }

    let mut y = inner.y;
    for item in state.items.iter().take(inner.height.saturating_sub(2) as usize) {
        buf.set_string(
            inner.x,
            y,
            format!("• {item}"),
            Style::default().fg(theme.warning_fg),
        );
        y += 1;
    }
    let hint = "y/Enter: confirm   n/Esc: cancel";
    buf.set_string(
        inner.x,
        inner.y + inner.height - 1,
        hint,
        Style::default().fg(theme.dim_fg),
    );
}

fn render_yes_no(state: &YesNoState, theme: &ThemeColors, area: Rect, buf: &mut Buffer) {
    let rect = centered_rect(50, 5, area);
    Clear.render(rect, buf);
    let block = dialog_block("Confirm".to_string(), theme);
    let inner = block.inner(rect);
    block.render(rect, buf);
    if inner.height == 0 {
        return;
    }
    buf.set_string(
        inner.x,
        inner.y,
        &state.question,
        Style::default().fg(theme.tree_fg),
    );
    buf.set_string(
        inner.x,
        inner.y + inner.height - 1,
        "y: yes   n/Esc: no",
        Style::default().fg(theme.dim_fg),
    );
}

fn input_title(purpose: &InputPurpose) -> &'static str {
    match purpose {
        InputPurpose::CreateFile { .. } => "New file",
        InputPurpose::CreateDirectory { .. } => "New directory",
        InputPurpose::Rename { .. } => "Rename",
    }
}

fn render_text_input(state: &TextInputState, theme: &ThemeColors, area: Rect, buf: &mut Buffer) {
    let rect = centered_rect(50, 5, area);
    Clear.render(rect, buf);
    let block = dialog_block(input_title(&state.purpose).to_string(), theme);
    let inner = block.inner(rect);
    block.render(rect, buf);
    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let input = &state.input;
    let cursor = state.cursor.min(input.len());
    let (before, cursor_char, after) = if cursor < input.len() {
        let next = input[cursor..]
            .chars()
            .next()
            .map(|c| c.len_utf8())
            .unwrap_or(1);
        (&input[..cursor], &input[cursor..cursor + next], &input[cursor + next..])
    } else {
        (input.as_str(), " ", "")
    };

    let text_style = Style::default().fg(theme.tree_fg);
    let cursor_style = Style::default()
        .bg(theme.terminal_cursor_bg)
        .fg(theme.terminal_cursor_fg);
    let line = Line::from(vec![
        Span::styled(before, text_style),
        Span::styled(cursor_char, cursor_style),
        Span::styled(after, text_style),
    ]);
    buf.set_line(inner.x, inner.y + inner.height / 2, &line, inner.width);
}

fn render_picker(title: &str, state: &PickerState, theme: &ThemeColors, area: Rect, buf: &mut Buffer) {
    let height = (state.entries.len() as u16 + 4).min(area.height).max(5);
    let rect = centered_rect(44, height, area);
    Clear.render(rect, buf);
    let block = dialog_block(title.to_string(), theme);
    let inner = block.inner(rect);
    block.render(rect, buf);

    for (i, entry) in state
        .entries
        .iter()
        .take(inner.height as usize)
        .enumerate()
    {
        let style = if i == state.selected {
            Style::default()
                .bg(theme.tree_selected_bg)
                .fg(theme.tree_selected_fg)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.tree_fg)
        };
        buf.set_string(inner.x, inner.y + i as u16, format!("  {entry}"), style);
    }
}

fn render_quick_find(state: &QuickFindState, theme: &ThemeColors, area: Rect, buf: &mut Buffer) {
    let rect = centered_rect(62, 16, area);
    Clear.render(rect, buf);
    let block = dialog_block("Quick find".to_string(), theme);
    let inner = block.inner(rect);
    block.render(rect, buf);
    if inner.height < 2 {
        return;
    }

    let query_line = Line::from(vec![
        Span::styled("> ", Style::default().fg(theme.accent_fg)),
        Span::styled(state.query.clone(), Style::default().fg(theme.tree_fg)),
        Span::styled(
            " ",
            Style::default()
                .bg(theme.terminal_cursor_bg)
                .fg(theme.terminal_cursor_fg),
        ),
    ]);
    buf.set_line(inner.x, inner.y, &query_line, inner.width);

    let list_height = inner.height.saturating_sub(1) as usize;
    let first = state
        .selected
        .saturating_sub(list_height.saturating_sub(1));
    for (row, (i, path)) in state
        .matches
        .iter()
        .enumerate()
        .skip(first)
        .take(list_height)
        .enumerate()
    {
        let style = if i == state.selected {
            Style::default()
                .bg(theme.tree_selected_bg)
                .fg(theme.tree_selected_fg)
        } else {
            Style::default().fg(theme.tree_fg)
        };
        buf.set_string(
            inner.x,
            inner.y + 1 + row as u16,
            format!("  {}", path.display()),
            style,
        );
    }
}

const SHORTCUTS: &[(&str, &str)] = &[
    ("Alt+t", "toggle file tree"),
    ("Alt+g", "toggle source control"),
    ("Alt+e", "toggle editor"),
    ("Alt+1/2/3", "toggle terminal slot"),
    ("Ctrl+O", "cycle focus"),
    ("Tab / Shift+Tab", "cycle focus"),
    ("Alt+] / Alt+[", "next / previous tab"),
    ("Alt+w", "close tab"),
    ("Ctrl+F", "quick find"),
    ("Ctrl+P", "open project"),
    ("Ctrl+S", "save"),
    ("Alt+p", "terminal passthrough (Ctrl+\\ twice exits)"),
    ("a / A / r / d", "tree: new file / dir / rename / delete"),
    ("Ctrl+Q", "quit"),
    ("F1", "this help"),
];

fn render_shortcuts(theme: &ThemeColors, area: Rect, buf: &mut Buffer) {
    let rect = centered_rect(58, SHORTCUTS.len() as u16 + 4, area);
    Clear.render(rect, buf);
    let block = dialog_block("Shortcuts".to_string(), theme);
    let inner = block.inner(rect);
    block.render(rect, buf);

    for (i, (keys, desc)) in SHORTCUTS.iter().take(inner.height as usize).enumerate() {
        let line = Line::from(vec![
            Span::styled(
                format!("{keys:>16}  "),
                Style::default()
                    .fg(theme.accent_fg)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(*desc, Style::default().fg(theme.tree_fg)),
        ]);
        buf.set_line(inner.x, inner.y + i as u16, &line, inner.width);
    }
}

/// Overlay shown while the background quit scan runs.
pub fn render_quitting(theme: &ThemeColors, spinner: char, area: Rect, buf: &mut Buffer) {
    let rect = centered_rect(30, 3, area);
    Clear.render(rect, buf);
    let block = dialog_block("Quitting".to_string(), theme);
    let inner = block.inner(rect);
    block.render(rect, buf);
    if inner.height > 0 {
        buf.set_string(
            inner.x,
            inner.y,
            format!("{spinner} checking for work…"),
            Style::default().fg(theme.accent_fg),
        );
    }
}
