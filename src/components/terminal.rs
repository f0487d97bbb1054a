//! Terminal session panel widget.
//!
//! Renders one slot: spinner while the session starts, the live VT grid (or
//! a scrollback composition) once output arrives, and a three-state border
//! with passthrough taking precedence over focus.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::{Block, BorderType, Borders, Widget},
};

use crate::terminal::emulator::{Cell, VtEmulator};
use crate::terminal::TerminalPanel;
use crate::theme::ThemeColors;

/// Border state, in increasing precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderState {
    Unfocused,
    Focused,
    Passthrough,
}

pub const SPINNER_FRAMES: &[char] = &['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

/// Whether we are running inside a terminal multiplexer, where RGB colors
/// are unreliable and get quantized to the 256-color cube.
pub fn in_multiplexer() -> bool {
    std::env::var_os("TMUX").is_some()
        || std::env::var("TERM").is_ok_and(|t| t.starts_with("screen"))
}

/// Nearest 6×6×6 color-cube index for an RGB triple.
fn rgb_to_cube(r: u8, g: u8, b: u8) -> u8 {
    let q = |c: u8| ((c as u16 * 5 + 127) / 255) as u8;
    16 + 36 * q(r) + 6 * q(g) + q(b)
}

fn map_color(color: Color, quantize: bool) -> Color {
    match color {
        Color::Rgb(r, g, b) if quantize => Color::Indexed(rgb_to_cube(r, g, b)),
        other => other,
    }
}

fn cell_style(cell: &Cell, quantize: bool, default_bg: Color) -> Style {
    let bg = match cell.bg {
        Color::Reset => default_bg,
        other => map_color(other, quantize),
    };
    Style::default()
        .fg(map_color(cell.fg, quantize))
        .bg(bg)
        .add_modifier(cell.modifiers)
}

pub struct TerminalWidget<'a> {
    panel: &'a TerminalPanel,
    theme: &'a ThemeColors,
    slot: usize,
    state: BorderState,
    spinner_frame: usize,
    quantize: bool,
}

impl<'a> TerminalWidget<'a> {
    pub fn new(
        panel: &'a TerminalPanel,
        theme: &'a ThemeColors,
        slot: usize,
        state: BorderState,
    ) -> Self {
        Self {
            panel,
            theme,
            slot,
            state,
            spinner_frame: 0,
            quantize: false,
        }
    }

    pub fn spinner_frame(mut self, frame: usize) -> Self {
        self.spinner_frame = frame;
        self
    }

    pub fn quantize(mut self, quantize: bool) -> Self {
        self.quantize = quantize;
        self
    }

    fn block(&self) -> Block<'a> {
        let (border_type, color) = match self.state {
            BorderState::Passthrough => (BorderType::Double, self.theme.border_passthrough_fg),
            BorderState::Focused => (BorderType::Thick, self.theme.border_focused_fg),
            BorderState::Unfocused => (BorderType::Rounded, self.theme.border_fg),
        };
        let title = self
            .panel
            .tool_name()
            .map(|t| format!(" {t} "))
            .unwrap_or_else(|| format!(" terminal {} ", self.slot + 1));
        Block::default()
            .borders(Borders::ALL)
            .border_type(border_type)
            .border_style(Style::default().fg(color))
            .title(title)
    }

    fn centered(&self, text: &str, style: Style, inner: Rect, buf: &mut Buffer) {
        let y = inner.y + inner.height / 2;
        let x = inner.x + inner.width.saturating_sub(text.chars().count() as u16) / 2;
        buf.set_string(x, y, text, style);
    }
}

impl<'a> Widget for TerminalWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = self.block();
        let inner = block.inner(area);
        block.render(area, buf);
        if inner.width == 0 || inner.height == 0 {
            return;
        }

        if let Some(err) = &self.panel.spawn_error {
            self.centered(
                &format!("spawn failed: {err}"),
                Style::default().fg(self.theme.error_fg),
                inner,
                buf,
            );
            return;
        }

        if !self.panel.is_alive() || !self.panel.received_output {
            if self.panel.is_spawning() || self.panel.is_alive() {
                let frame = SPINNER_FRAMES[self.spinner_frame % SPINNER_FRAMES.len()];
                self.centered(
                    &format!("{frame} Starting…"),
                    Style::default().fg(self.theme.accent_fg),
                    inner,
                    buf,
                );
            } else {
                self.centered(
                    &format!("Alt+{} to start a session", self.slot + 1),
                    Style::default()
                        .fg(self.theme.dim_fg)
                        .add_modifier(Modifier::DIM),
                    inner,
                    buf,
                );
            }
            return;
        }

        let offset = self.panel.scroll_offset;
        let quantize = self.quantize;
        let default_bg = self.theme.terminal_default_bg;
        let show_cursor = self.state != BorderState::Unfocused && offset == 0;
        let cursor_style = Style::default()
            .fg(self.theme.terminal_cursor_fg)
            .bg(self.theme.terminal_cursor_bg);

        self.panel.with_session(|session| {
            let emu = &session.emulator;
            let offset = if emu.alternate_screen() { 0 } else { offset };
            render_grid(emu, offset, quantize, default_bg, inner, buf);

            if show_cursor && emu.cursor_visible() {
                let (row, col) = emu.cursor_position();
                let x = inner.x + col as u16;
                let y = inner.y + row as u16;
                if x < inner.x + inner.width && y < inner.y + inner.height {
                    if let Some(cell) = buf.cell_mut((x, y)) {
                        cell.set_style(cursor_style);
                    }
                }
            }
        });
    }
}

/// Paint the visible window into `inner`: with a scroll offset the window
/// slides back into scrollback, with the live grid filling the remainder.
fn render_grid(
    emu: &VtEmulator,
    offset: usize,
    quantize: bool,
    default_bg: Color,
    inner: Rect,
    buf: &mut Buffer,
) {
    let height = inner.height as usize;
    let width = (inner.width as usize).min(emu.cols());
    let total = emu.scrollback_len() + emu.rows();
    let end = total.saturating_sub(offset);
    let start = end.saturating_sub(height);

    for display_row in 0..height {
        let idx = start + display_row;
        if idx >= end {
            break;
        }
        let row = if idx < emu.scrollback_len() {
            emu.scrollback_row(idx)
        } else {
            emu.row(idx - emu.scrollback_len())
        };
        let Some(row) = row else { continue };
        let y = inner.y + display_row as u16;
        for (col, cell) in row.iter().take(width).enumerate() {
            let x = inner.x + col as u16;
            if let Some(out) = buf.cell_mut((x, y)) {
                let ch = if cell.ch == '\0' { ' ' } else { cell.ch };
                out.set_char(ch);
                out.set_style(cell_style(cell, quantize, default_bg));
            }
        }
    }
}
