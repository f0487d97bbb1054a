//! Input routing.
//!
//! Every key follows the same path: active modal first, then passthrough,
//! then the focused terminal (minus the chords that always stay with the
//! workspace), then global shortcuts, then the focused pane. Mouse clicks
//! are hit-tested against the tab strip row and the pane regions from the
//! last geometry pass.

use std::path::PathBuf;
use std::time::Instant;

use crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};

use crate::app::Workspace;
use crate::fs::tree::NodeKind;
use crate::layout::{FOCUS_EDITOR, FOCUS_TERMINAL_BASE, FOCUS_TREE, TERMINAL_SLOTS};
use crate::modal::ActiveModal;

pub fn handle_key(ws: &mut Workspace, key: KeyEvent) {
    if key.kind == KeyEventKind::Release {
        return;
    }
    // The quit overlay swallows everything while the scan runs.
    if ws.quit_scan_running {
        return;
    }

    if ws.modals.active().is_some() {
        handle_modal_key(ws, key);
        return;
    }

    if let Some(slot) = ws.focused_terminal() {
        if ws.terminals[slot].passthrough {
            handle_passthrough_key(ws, slot, key);
            return;
        }
        if ws.terminals[slot].is_alive() && !is_workspace_chord(&key) {
            handle_terminal_key(ws, slot, key);
            return;
        }
    }

    if handle_global_key(ws, key) {
        return;
    }

    match ws.focus {
        FOCUS_TREE => handle_left_pane_key(ws, key),
        FOCUS_EDITOR => {
            if let Some(path) = ws.tabs.active_path().map(PathBuf::from) {
                // Interacting with a preview buffer commits it to a real tab.
                if ws.host.handle_key(&path, &key) {
                    ws.tabs.pin_active();
                }
            }
        }
        _ => {}
    }
}

/// Chords that never reach a focused terminal: quit, pane toggles, tab
/// navigation, and focus cycling.
fn is_workspace_chord(key: &KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('q') if key.modifiers.contains(KeyModifiers::CONTROL) => true,
        KeyCode::Char('o') if key.modifiers.contains(KeyModifiers::CONTROL) => true,
        KeyCode::Char('t' | 'g' | 'e' | 'p' | 'w' | '1' | '2' | '3' | '[' | ']')
            if key.modifiers.contains(KeyModifiers::ALT) =>
        {
            true
        }
        _ => false,
    }
}

fn handle_passthrough_key(ws: &mut Workspace, slot: usize, key: KeyEvent) {
    // Ctrl+\ twice within the window leaves passthrough; a lone press is
    // forwarded like any other key.
    if key.code == KeyCode::Char('\\') && key.modifiers.contains(KeyModifiers::CONTROL) {
        if ws.terminals[slot].note_passthrough_escape(Instant::now()) {
            ws.set_status("passthrough off", false);
        } else {
            ws.terminals[slot].write_input(&[0x1c]);
        }
        return;
    }
    if let Some(bytes) = encode_key(&key) {
        ws.terminals[slot].write_input(&bytes);
    }
}

fn handle_terminal_key(ws: &mut Workspace, slot: usize, key: KeyEvent) {
    match key.code {
        KeyCode::PageUp if key.modifiers.contains(KeyModifiers::SHIFT) => {
            ws.terminals[slot].scroll_up(10);
        }
        KeyCode::PageDown if key.modifiers.contains(KeyModifiers::SHIFT) => {
            ws.terminals[slot].scroll_down(10);
        }
        _ => {
            if let Some(bytes) = encode_key(&key) {
                ws.terminals[slot].write_input(&bytes);
            }
        }
    }
}

/// Shortcuts available from any pane. Returns true when consumed.
fn handle_global_key(ws: &mut Workspace, key: KeyEvent) -> bool {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);
    match key.code {
        KeyCode::Char('q') if ctrl => ws.request_quit(),
        KeyCode::Char('s') if ctrl => ws.save_active(),
        KeyCode::Char('o') if ctrl => ws.cycle_focus(),
        KeyCode::Char('f') if ctrl => ws.open_quick_find(),
        KeyCode::Char('p') if ctrl => ws.open_project_picker(),
        KeyCode::F(1) => ws.modals.shortcuts_help = true,
        KeyCode::Tab => ws.cycle_focus(),
        KeyCode::BackTab => ws.cycle_focus_back(),
        KeyCode::Char('t') if alt => ws.toggle_tree(),
        KeyCode::Char('g') if alt => ws.toggle_source_control(),
        KeyCode::Char('e') if alt => ws.toggle_editor(),
        KeyCode::Char(c @ '1'..='3') if alt => {
            ws.toggle_terminal(c as usize - '1' as usize);
        }
        KeyCode::Char(']') if alt => ws.tabs.next_tab(),
        KeyCode::Char('[') if alt => ws.tabs.prev_tab(),
        KeyCode::Char('w') if alt => ws.close_active_tab(),
        KeyCode::Char('p') if alt => {
            if let Some(slot) = ws.focused_terminal() {
                if ws.terminals[slot].is_alive() {
                    ws.terminals[slot].passthrough = true;
                    ws.set_status("passthrough on (Ctrl+\\ twice to exit)", false);
                }
            }
        }
        _ => return false,
    }
    true
}

/// Keys for the tree / source-control pane.
fn handle_left_pane_key(ws: &mut Workspace, key: KeyEvent) {
    if ws.vis.source_control {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => ws.source_control.select_previous(),
            KeyCode::Down | KeyCode::Char('j') => ws.source_control.select_next(),
            KeyCode::Enter => {
                let path = ws
                    .source_control
                    .selected_entry()
                    .map(|e| ws.root.join(&e.path));
                if let Some(path) = path {
                    ws.open_file(&path, false);
                }
            }
            _ => {}
        }
        return;
    }
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => ws.tree.select_previous(),
        KeyCode::Down | KeyCode::Char('j') => ws.tree.select_next(),
        KeyCode::Left | KeyCode::Char('h') => ws.tree.collapse_selected(),
        KeyCode::Right | KeyCode::Char('l') => ws.tree.expand_selected(),
        KeyCode::Enter => {
            let target = ws
                .tree
                .selected_entry()
                .map(|e| (e.kind, e.expanded, e.path.clone()));
            match target {
                Some((NodeKind::Directory, true, _)) => ws.tree.collapse_selected(),
                Some((NodeKind::Directory, false, _)) => ws.tree.expand_selected(),
                Some((_, _, path)) => ws.open_file(&path, false),
                None => {}
            }
        }
        KeyCode::Char('a') => ws.open_create_file(),
        KeyCode::Char('A') => ws.open_create_dir(),
        KeyCode::Char('r') => ws.open_rename(),
        KeyCode::Char('d') => ws.open_delete_confirm(),
        KeyCode::Char('.') => ws.tree.toggle_hidden(),
        _ => {}
    }
}

fn handle_modal_key(ws: &mut Workspace, key: KeyEvent) {
    let Some(active) = ws.modals.active() else {
        return;
    };
    // Esc backs out of whichever modal has input.
    if key.code == KeyCode::Esc {
        ws.modals.dismiss_active();
        return;
    }
    match active {
        ActiveModal::DestructiveConfirm => match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                if let Some(state) = ws.modals.confirm.take() {
                    ws.confirm_action(state.action);
                }
            }
            KeyCode::Char('n') => ws.modals.confirm = None,
            _ => {}
        },
        ActiveModal::YesNo => match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                if let Some(state) = ws.modals.yes_no.take() {
                    ws.confirm_action(state.action);
                }
            }
            KeyCode::Char('n') => ws.modals.yes_no = None,
            _ => {}
        },
        ActiveModal::TextInput => match key.code {
            KeyCode::Enter => {
                if let Some(state) = ws.modals.text_input.take() {
                    ws.submit_text_input(state);
                }
            }
            KeyCode::Backspace => {
                if let Some(state) = ws.modals.text_input.as_mut() {
                    state.delete_char();
                }
            }
            KeyCode::Left => {
                if let Some(state) = ws.modals.text_input.as_mut() {
                    state.move_left();
                }
            }
            KeyCode::Right => {
                if let Some(state) = ws.modals.text_input.as_mut() {
                    state.move_right();
                }
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                if let Some(state) = ws.modals.text_input.as_mut() {
                    state.insert_char(c);
                }
            }
            _ => {}
        },
        ActiveModal::ProjectPicker => match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                if let Some(picker) = ws.modals.project_picker.as_mut() {
                    picker.select_previous();
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if let Some(picker) = ws.modals.project_picker.as_mut() {
                    picker.select_next();
                }
            }
            KeyCode::Enter => {
                if let Some(picker) = ws.modals.project_picker.as_ref() {
                    let index = picker.selected;
                    ws.choose_project(index);
                }
            }
            _ => {}
        },
        ActiveModal::QuickFind => match key.code {
            KeyCode::Enter => ws.accept_quick_find(),
            KeyCode::Up => {
                if let Some(state) = ws.modals.quick_find.as_mut() {
                    state.selected = state.selected.saturating_sub(1);
                }
            }
            KeyCode::Down => {
                if let Some(state) = ws.modals.quick_find.as_mut() {
                    if state.selected + 1 < state.matches.len() {
                        state.selected += 1;
                    }
                }
            }
            KeyCode::Backspace => {
                if let Some(state) = ws.modals.quick_find.as_mut() {
                    state.query.pop();
                    ws.update_quick_find();
                }
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                if let Some(state) = ws.modals.quick_find.as_mut() {
                    state.query.push(c);
                    ws.update_quick_find();
                }
            }
            _ => {}
        },
        ActiveModal::ToolSelector(slot) => match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                if let Some((_, picker)) = ws.modals.tool_selector.as_mut() {
                    picker.select_previous();
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if let Some((_, picker)) = ws.modals.tool_selector.as_mut() {
                    picker.select_next();
                }
            }
            KeyCode::Enter => {
                if let Some((_, picker)) = ws.modals.tool_selector.as_ref() {
                    let index = picker.selected;
                    ws.choose_tool(slot, index);
                }
            }
            _ => {}
        },
        ActiveModal::ShortcutsHelp => {
            ws.modals.shortcuts_help = false;
        }
    }
}

pub fn handle_mouse(ws: &mut Workspace, mouse: MouseEvent) {
    if ws.quit_scan_running || ws.modals.active().is_some() {
        return;
    }
    let (x, y) = (mouse.column, mouse.row);
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            if y == 0 {
                if let Some(index) = ws.tabs.tab_at_column(x) {
                    ws.tabs.active = index;
                    ws.vis.editor = true;
                    ws.focus = FOCUS_EDITOR;
                    ws.recompute_geometry();
                }
                return;
            }
            if ws.vis.left_visible() && ws.regions.tree.contains(x, y) {
                ws.focus = FOCUS_TREE;
                // Rows inside the border map onto flattened entries.
                if ws.vis.tree && y > ws.regions.tree.y {
                    let row = (y - ws.regions.tree.y - 1) as usize + ws.tree.scroll_offset;
                    if row < ws.tree.entries.len() {
                        ws.tree.selected = row;
                    }
                }
                ws.recompute_geometry();
                return;
            }
            if ws.vis.editor && ws.regions.editor.contains(x, y) {
                ws.focus = FOCUS_EDITOR;
                ws.recompute_geometry();
                return;
            }
            for slot in 0..TERMINAL_SLOTS {
                if ws.vis.terminals[slot] && ws.regions.terminals[slot].contains(x, y) {
                    ws.focus = FOCUS_TERMINAL_BASE + slot;
                    if !ws.terminals[slot].is_alive() && !ws.terminals[slot].is_spawning() {
                        ws.open_tool_selector(slot);
                    }
                    ws.recompute_geometry();
                    return;
                }
            }
        }
        MouseEventKind::ScrollUp | MouseEventKind::ScrollDown => {
            let up = mouse.kind == MouseEventKind::ScrollUp;
            for slot in 0..TERMINAL_SLOTS {
                if ws.vis.terminals[slot] && ws.regions.terminals[slot].contains(x, y) {
                    if up {
                        ws.terminals[slot].scroll_up(3);
                    } else {
                        ws.terminals[slot].scroll_down(3);
                    }
                    return;
                }
            }
            if ws.vis.tree && ws.regions.tree.contains(x, y) {
                if up {
                    ws.tree.select_previous();
                } else {
                    ws.tree.select_next();
                }
            }
        }
        _ => {}
    }
}

/// Undecoded escape sequences from the input layer.
///
/// Some terminals deliver Alt chords as a bare ESC prefix that the parser
/// gives up on; recognize the pane toggles, and hand anything else to a
/// focused live session so nothing typed is lost.
pub fn handle_raw_escape(ws: &mut Workspace, bytes: &[u8]) {
    if ws.modals.active().is_none() && bytes.len() == 2 && bytes[0] == 0x1b {
        match bytes[1] {
            b't' => return ws.toggle_tree(),
            b'g' => return ws.toggle_source_control(),
            b'e' => return ws.toggle_editor(),
            c @ b'1'..=b'3' => return ws.toggle_terminal((c - b'1') as usize),
            _ => {}
        }
    }
    if let Some(slot) = ws.focused_terminal() {
        if ws.terminals[slot].is_alive() {
            ws.terminals[slot].write_input(bytes);
        }
    }
}

pub fn handle_paste(ws: &mut Workspace, text: &str) {
    match ws.modals.active() {
        Some(ActiveModal::TextInput) => {
            if let Some(state) = ws.modals.text_input.as_mut() {
                for c in text.chars().filter(|c| !c.is_control()) {
                    state.insert_char(c);
                }
            }
        }
        Some(ActiveModal::QuickFind) => {
            if let Some(state) = ws.modals.quick_find.as_mut() {
                state.query.push_str(text);
                ws.update_quick_find();
            }
        }
        Some(_) => {}
        None => {
            if let Some(slot) = ws.focused_terminal() {
                if ws.terminals[slot].is_alive() {
                    // Re-wrap in bracketed paste markers for the child.
                    let mut bytes = Vec::with_capacity(text.len() + 12);
                    bytes.extend_from_slice(b"\x1b[200~");
                    bytes.extend_from_slice(text.as_bytes());
                    bytes.extend_from_slice(b"\x1b[201~");
                    ws.terminals[slot].write_input(&bytes);
                }
            }
        }
    }
}

/// Encode a key event as the byte sequence a terminal child expects.
pub fn encode_key(key: &KeyEvent) -> Option<Vec<u8>> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);
    let bytes = match key.code {
        KeyCode::Char(c) if ctrl => {
            let c = c.to_ascii_lowercase();
            match c {
                'a'..='z' => vec![c as u8 - b'a' + 1],
                '@' | ' ' => vec![0x00],
                '[' => vec![0x1b],
                '\\' => vec![0x1c],
                ']' => vec![0x1d],
                '^' => vec![0x1e],
                '_' | '/' => vec![0x1f],
                _ => return None,
            }
        }
        KeyCode::Char(c) => {
            let mut buf = [0u8; 4];
            let encoded = c.encode_utf8(&mut buf).as_bytes().to_vec();
            if alt {
                let mut with_esc = vec![0x1b];
                with_esc.extend_from_slice(&encoded);
                with_esc
            } else {
                encoded
            }
        }
        KeyCode::Enter => vec![b'\r'],
        KeyCode::Tab => vec![b'\t'],
        KeyCode::BackTab => b"\x1b[Z".to_vec(),
        KeyCode::Backspace => vec![0x7f],
        KeyCode::Esc => vec![0x1b],
        KeyCode::Up => b"\x1b[A".to_vec(),
        KeyCode::Down => b"\x1b[B".to_vec(),
        KeyCode::Right => b"\x1b[C".to_vec(),
        KeyCode::Left => b"\x1b[D".to_vec(),
        KeyCode::Home => b"\x1b[H".to_vec(),
        KeyCode::End => b"\x1b[F".to_vec(),
        KeyCode::PageUp => b"\x1b[5~".to_vec(),
        KeyCode::PageDown => b"\x1b[6~".to_vec(),
        KeyCode::Insert => b"\x1b[2~".to_vec(),
        KeyCode::Delete => b"\x1b[3~".to_vec(),
        KeyCode::F(n @ 1..=4) => {
            vec![0x1b, b'O', b'P' + (n - 1) as u8]
        }
        KeyCode::F(n @ 5..=12) => {
            let code = match n {
                5 => 15,
                6 => 17,
                7 => 18,
                8 => 19,
                9 => 20,
                10 => 21,
                11 => 23,
                _ => 24,
            };
            format!("\x1b[{code}~").into_bytes()
        }
        _ => return None,
    };
    Some(bytes)
}
