//! Source-control pane: the current `git status` as a navigable list.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Widget},
};

use crate::git::GitEntry;
use crate::theme::ThemeColors;

/// Pane state: latest poll results plus list selection.
#[derive(Default)]
pub struct SourceControlState {
    pub entries: Vec<GitEntry>,
    pub selected: usize,
    pub scroll_offset: usize,
}

impl SourceControlState {
    pub fn update(&mut self, entries: Vec<GitEntry>) {
        self.entries = entries;
        if !self.entries.is_empty() && self.selected >= self.entries.len() {
            self.selected = self.entries.len() - 1;
        }
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.entries.len() {
            self.selected += 1;
        }
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn selected_entry(&self) -> Option<&GitEntry> {
        self.entries.get(self.selected)
    }

    pub fn update_scroll(&mut self, visible_height: usize) {
        if visible_height == 0 {
            return;
        }
        if self.selected < self.scroll_offset {
            self.scroll_offset = self.selected;
        } else if self.selected >= self.scroll_offset + visible_height {
            self.scroll_offset = self.selected - visible_height + 1;
        }
    }
}

pub struct SourceControlWidget<'a> {
    state: &'a SourceControlState,
    theme: &'a ThemeColors,
    block: Option<Block<'a>>,
}

impl<'a> SourceControlWidget<'a> {
    pub fn new(state: &'a SourceControlState, theme: &'a ThemeColors) -> Self {
        Self {
            state,
            theme,
            block: None,
        }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    fn status_color(&self, entry: &GitEntry) -> ratatui::style::Color {
        match entry.status.as_str() {
            "??" => self.theme.dim_fg,
            s if s.starts_with('A') => self.theme.success_fg,
            s if s.starts_with('D') || s.ends_with('D') => self.theme.error_fg,
            s if s.starts_with('R') => self.theme.info_fg,
            _ => self.theme.warning_fg,
        }
    }
}

impl<'a> Widget for SourceControlWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = if let Some(block) = &self.block {
            let inner = block.inner(area);
            block.clone().render(area, buf);
            inner
        } else {
            area
        };
        if inner.width == 0 || inner.height == 0 {
            return;
        }

        if self.state.entries.is_empty() {
            let msg = "working tree clean";
            let y = inner.y + inner.height / 2;
            let x = inner.x + inner.width.saturating_sub(msg.len() as u16) / 2;
            buf.set_string(
                x,
                y,
                msg,
                Style::default()
                    .fg(self.theme.dim_fg)
                    .add_modifier(Modifier::DIM),
            );
            return;
        }

        let visible = self
            .state
            .entries
            .iter()
            .enumerate()
            .skip(self.state.scroll_offset)
            .take(inner.height as usize);

        for (row, (idx, entry)) in visible.enumerate() {
            let y = inner.y + row as u16;
            let base = if idx == self.state.selected {
                Style::default()
                    .bg(self.theme.tree_selected_bg)
                    .fg(self.theme.tree_selected_fg)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(self.theme.tree_fg)
            };
            let line = Line::from(vec![
                Span::styled(
                    format!("{} ", entry.status),
                    base.fg(self.status_color(entry)),
                ),
                Span::styled(entry.path.clone(), base),
            ]);
            buf.set_line(inner.x, y, &line, inner.width);
        }
    }
}
