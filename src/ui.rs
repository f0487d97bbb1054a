//! Frame composition: panes, tab strip, status bar, then overlays.

use std::path::PathBuf;

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::Line,
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};

use crate::app::Workspace;
use crate::components::dialog::{render_active_modal, render_quitting};
use crate::components::source_control::SourceControlWidget;
use crate::components::status_bar::StatusBarWidget;
use crate::components::tab_strip::TabStripWidget;
use crate::components::terminal::{BorderState, TerminalWidget, SPINNER_FRAMES};
use crate::components::tree::TreeWidget;
use crate::layout::{Region, FOCUS_EDITOR, FOCUS_TERMINAL_BASE, FOCUS_TREE, TERMINAL_SLOTS};

fn rect(region: Region) -> Rect {
    Rect::new(region.x, region.y, region.width, region.height)
}

pub fn render(ws: &mut Workspace, frame: &mut Frame) {
    let area = frame.area();
    ws.screen = (area.width, area.height);
    ws.recompute_geometry();

    // Tab strip across the top row.
    if area.height > 0 {
        let strip = Rect::new(area.x, area.y, area.width, 1);
        frame.render_widget(TabStripWidget::new(&ws.tabs, &ws.theme), strip);
    }

    render_left_pane(ws, frame);
    render_editor(ws, frame);
    render_terminals(ws, frame);
    render_placeholders(ws, frame);
    render_status_bar(ws, frame, area);

    let buf = frame.buffer_mut();
    render_active_modal(&ws.modals, &ws.theme, area, buf);
    if ws.quit_scan_running {
        let spinner = SPINNER_FRAMES[ws.spinner_tick % SPINNER_FRAMES.len()];
        render_quitting(&ws.theme, spinner, area, buf);
    }
}

fn render_left_pane(ws: &mut Workspace, frame: &mut Frame) {
    if !ws.vis.left_visible() {
        return;
    }
    let region = ws.regions.tree;
    if region.is_empty() {
        return;
    }
    let focused = ws.focus == FOCUS_TREE;
    let border_color = if focused {
        ws.theme.border_focused_fg
    } else {
        ws.theme.border_fg
    };
    let title = if ws.vis.source_control {
        " source control ".to_string()
    } else {
        let name = ws
            .tree
            .root_path()
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| ws.tree.root_path().display().to_string());
        format!(" {name} ")
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let inner_height = region.height.saturating_sub(2) as usize;
    if ws.vis.source_control {
        ws.source_control.update_scroll(inner_height);
        frame.render_widget(
            SourceControlWidget::new(&ws.source_control, &ws.theme).block(block),
            rect(region),
        );
    } else {
        ws.tree.update_scroll(inner_height);
        frame.render_widget(TreeWidget::new(&ws.tree, &ws.theme).block(block), rect(region));
    }
}

fn render_editor(ws: &mut Workspace, frame: &mut Frame) {
    if !ws.vis.editor {
        return;
    }
    let region = ws.regions.editor;
    if region.is_empty() {
        return;
    }
    let path = ws.tabs.active_path().map(PathBuf::from);
    let focused = ws.focus == FOCUS_EDITOR;
    let theme = ws.theme.clone();
    ws.host
        .render(frame, rect(region), path.as_deref(), focused, &theme);
}

fn render_terminals(ws: &mut Workspace, frame: &mut Frame) {
    for slot in 0..TERMINAL_SLOTS {
        if !ws.vis.terminals[slot] {
            continue;
        }
        let region = ws.regions.terminals[slot];
        if region.is_empty() {
            continue;
        }
        let state = if ws.terminals[slot].passthrough {
            BorderState::Passthrough
        } else if ws.focus == FOCUS_TERMINAL_BASE + slot {
            BorderState::Focused
        } else {
            BorderState::Unfocused
        };
        frame.render_widget(
            TerminalWidget::new(&ws.terminals[slot], &ws.theme, slot, state)
                .spinner_frame(ws.spinner_tick)
                .quantize(ws.quantize_colors),
            rect(region),
        );
    }
}

/// Centered hint boxes shown when the editor and every terminal are hidden.
fn render_placeholders(ws: &Workspace, frame: &mut Frame) {
    let Some((first, second)) = ws.regions.placeholders else {
        return;
    };
    let hints = [
        (first, "Alt+e  restore editor"),
        (second, "Alt+1  open a terminal"),
    ];
    for (region, hint) in hints {
        if region.is_empty() {
            continue;
        }
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(ws.theme.dim_fg));
        let body = Paragraph::new(Line::styled(
            hint,
            Style::default()
                .fg(ws.theme.dim_fg)
                .add_modifier(Modifier::DIM),
        ))
        .centered()
        .block(block);
        frame.render_widget(body, rect(region));
    }
}

fn render_status_bar(ws: &Workspace, frame: &mut Frame, area: Rect) {
    if area.height < 2 {
        return;
    }
    let row = Rect::new(area.x, area.y + area.height - 1, area.width, 1);
    let focus_label = ws.focus_label();
    let root = ws.root.display().to_string();
    let passthrough = ws
        .focused_terminal()
        .map(|slot| ws.terminals[slot].passthrough)
        .unwrap_or(false);
    let mut bar = StatusBarWidget::new(&focus_label, &root, &ws.theme)
        .passthrough(passthrough)
        .idle(ws.suspended);
    if let Some((message, is_error, _)) = &ws.status_message {
        bar = bar.status_message(message, *is_error);
    }
    frame.render_widget(bar, row);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::event::Event;
    use crate::host::FileViewerHost;
    use ratatui::{backend::TestBackend, Terminal};
    use std::fs;
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    fn setup() -> (TempDir, Workspace) {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "hello\n").unwrap();
        let (tx, _rx) = mpsc::unbounded_channel::<Event>();
        let ws = Workspace::new(
            dir.path().to_path_buf(),
            AppConfig::default(),
            Box::new(FileViewerHost::default()),
            tx,
        )
        .unwrap();
        (dir, ws)
    }

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let area = buffer.area;
        let mut out = String::new();
        for y in 0..area.height {
            for x in 0..area.width {
                if let Some(cell) = buffer.cell((x, y)) {
                    out.push_str(cell.symbol());
                }
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn full_frame_renders_tree_and_editor() {
        let (_dir, mut ws) = setup();
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| render(&mut ws, frame)).unwrap();
        let text = screen_text(&terminal);
        assert!(text.contains("a.txt"));
        assert!(text.contains("No file open"));
        assert!(text.contains("tree"));
    }

    #[test]
    fn hidden_panes_show_placeholders() {
        let (_dir, mut ws) = setup();
        ws.vis.editor = false;
        ws.focus = crate::layout::FOCUS_TREE;
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| render(&mut ws, frame)).unwrap();
        let text = screen_text(&terminal);
        assert!(text.contains("restore editor"));
        assert!(text.contains("open a terminal"));
    }

    #[test]
    fn quit_overlay_draws_on_top() {
        let (_dir, mut ws) = setup();
        ws.quit_scan_running = true;
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| render(&mut ws, frame)).unwrap();
        let text = screen_text(&terminal);
        assert!(text.contains("Quitting"));
    }

    #[test]
    fn status_message_appears_in_bottom_row() {
        let (_dir, mut ws) = setup();
        ws.set_status("created foo.txt", false);
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| render(&mut ws, frame)).unwrap();
        let text = screen_text(&terminal);
        assert!(text.contains("created foo.txt"));
    }
}
