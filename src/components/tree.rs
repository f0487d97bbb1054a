//! File tree widget with box-drawing indentation.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Widget},
};

use crate::fs::tree::{FileTree, FlatEntry, NodeKind};
use crate::theme::ThemeColors;

pub struct TreeWidget<'a> {
    tree: &'a FileTree,
    theme: &'a ThemeColors,
    block: Option<Block<'a>>,
}

impl<'a> TreeWidget<'a> {
    pub fn new(tree: &'a FileTree, theme: &'a ThemeColors) -> Self {
        Self {
            tree,
            theme,
            block: None,
        }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    /// Indentation prefix with continuation lines. Ancestors that are the
    /// last sibling at their depth leave a gap instead of a `│`.
    fn build_prefix(entry: &FlatEntry, entries: &[FlatEntry], index: usize) -> String {
        if entry.depth == 0 {
            return String::new();
        }
        let mut parts: Vec<&str> = Vec::new();
        for d in 1..entry.depth {
            let mut ancestor_is_last = false;
            for j in (0..index).rev() {
                if entries[j].depth == d {
                    ancestor_is_last = entries[j].last_sibling;
                    break;
                }
                if entries[j].depth < d {
                    break;
                }
            }
            parts.push(if ancestor_is_last { "   " } else { "│  " });
        }
        parts.push(if entry.last_sibling { "└──" } else { "├──" });
        parts.join("")
    }

    fn indicator(entry: &FlatEntry) -> &'static str {
        match entry.kind {
            NodeKind::Directory if entry.expanded => "▾ ",
            NodeKind::Directory => "▸ ",
            NodeKind::Symlink => "→ ",
            NodeKind::File => "  ",
        }
    }
}

impl<'a> Widget for TreeWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = if let Some(block) = &self.block {
            let inner = block.inner(area);
            block.clone().render(area, buf);
            inner
        } else {
            area
        };

        let entries = &self.tree.entries;
        if entries.is_empty() || inner.height == 0 {
            return;
        }

        let visible = entries
            .iter()
            .enumerate()
            .skip(self.tree.scroll_offset)
            .take(inner.height as usize);

        for (row, (idx, entry)) in visible.enumerate() {
            let y = inner.y + row as u16;
            let prefix = Self::build_prefix(entry, entries, idx);
            let indicator = Self::indicator(entry);

            let style = if idx == self.tree.selected {
                Style::default()
                    .bg(self.theme.tree_selected_bg)
                    .fg(self.theme.tree_selected_fg)
                    .add_modifier(Modifier::BOLD)
            } else if entry.hidden {
                Style::default().fg(self.theme.tree_hidden_fg)
            } else {
                match entry.kind {
                    NodeKind::Directory => Style::default()
                        .fg(self.theme.tree_dir_fg)
                        .add_modifier(Modifier::BOLD),
                    NodeKind::Symlink => Style::default().fg(self.theme.info_fg),
                    NodeKind::File => Style::default().fg(self.theme.tree_fg),
                }
            };

            let line = Line::from(Span::styled(
                format!("{prefix}{indicator}{}", entry.name),
                style,
            ));
            buf.set_line(inner.x, y, &line, inner.width);
        }
    }
}
