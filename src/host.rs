//! Editor host boundary.
//!
//! The workspace does not implement text editing. The editor pane is filled
//! by an [`EditorHost`]: it owns buffers, answers modification queries for
//! the quit flow, and renders into the region the coordinator hands it.
//! [`FileViewerHost`] is the built-in host: a read-only scrolling viewer.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};
use ratatui::Frame;

use crate::error::Result;
use crate::theme::ThemeColors;

/// What the editor pane plugs into the workspace.
pub trait EditorHost {
    /// Load (or reuse) a buffer for `path`.
    fn open(&mut self, path: &Path) -> Result<()>;

    /// Drop the buffer for `path`, discarding unsaved state.
    fn close(&mut self, path: &Path);

    /// Buffers with unsaved changes, listed in the quit confirmation.
    fn modified_paths(&self) -> Vec<PathBuf>;

    /// Save the buffer for `path`.
    fn save(&mut self, path: &Path) -> Result<()>;

    /// Offer a key to the host. Returns false when the key is not an editor
    /// concern, so the coordinator keeps routing it.
    fn handle_key(&mut self, path: &Path, key: &KeyEvent) -> bool;

    /// Draw the buffer for `path` into `area`.
    fn render(
        &mut self,
        frame: &mut Frame,
        area: Rect,
        path: Option<&Path>,
        focused: bool,
        theme: &ThemeColors,
    );
}

struct ViewBuffer {
    lines: Vec<String>,
    scroll: u16,
}

/// Read-only file viewer: the default host when no real editor is embedded.
#[derive(Default)]
pub struct FileViewerHost {
    buffers: HashMap<PathBuf, ViewBuffer>,
}

impl FileViewerHost {
    fn buffer_mut(&mut self, path: &Path) -> Option<&mut ViewBuffer> {
        self.buffers.get_mut(path)
    }
}

impl EditorHost for FileViewerHost {
    fn open(&mut self, path: &Path) -> Result<()> {
        if self.buffers.contains_key(path) {
            return Ok(());
        }
        let content = fs::read(path)?;
        let text = String::from_utf8_lossy(&content);
        let lines = text.lines().map(|l| l.to_string()).collect();
        self.buffers
            .insert(path.to_path_buf(), ViewBuffer { lines, scroll: 0 });
        Ok(())
    }

    fn close(&mut self, path: &Path) {
        self.buffers.remove(path);
    }

    fn modified_paths(&self) -> Vec<PathBuf> {
        // A viewer never dirties a buffer.
        Vec::new()
    }

    fn save(&mut self, _path: &Path) -> Result<()> {
        Ok(())
    }

    fn handle_key(&mut self, path: &Path, key: &KeyEvent) -> bool {
        let Some(buffer) = self.buffer_mut(path) else {
            return false;
        };
        let max = buffer.lines.len().saturating_sub(1) as u16;
        match key.code {
            KeyCode::Up => buffer.scroll = buffer.scroll.saturating_sub(1),
            KeyCode::Down => buffer.scroll = (buffer.scroll + 1).min(max),
            KeyCode::PageUp => buffer.scroll = buffer.scroll.saturating_sub(20),
            KeyCode::PageDown => buffer.scroll = (buffer.scroll + 20).min(max),
            KeyCode::Home => buffer.scroll = 0,
            KeyCode::End => buffer.scroll = max,
            _ => return false,
        }
        true
    }

    fn render(
        &mut self,
        frame: &mut Frame,
        area: Rect,
        path: Option<&Path>,
        focused: bool,
        theme: &ThemeColors,
    ) {
        let border_color = if focused {
            theme.border_focused_fg
        } else {
            theme.border_fg
        };
        let title = path
            .and_then(|p| p.file_name())
            .map(|n| format!(" {} ", n.to_string_lossy()))
            .unwrap_or_else(|| " editor ".to_string());
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(border_color))
            .title(title);

        let body = match path.and_then(|p| self.buffers.get(p)) {
            Some(buffer) => {
                let number_width = buffer.lines.len().to_string().len().max(3);
                let lines: Vec<Line> = buffer
                    .lines
                    .iter()
                    .enumerate()
                    .skip(buffer.scroll as usize)
                    .take(area.height.saturating_sub(2) as usize)
                    .map(|(i, text)| {
                        Line::from(vec![
                            ratatui::text::Span::styled(
                                format!("{:>number_width$} ", i + 1),
                                Style::default().fg(theme.dim_fg),
                            ),
                            ratatui::text::Span::raw(text.clone()),
                        ])
                    })
                    .collect();
                Paragraph::new(lines)
            }
            None => Paragraph::new(Line::from(ratatui::text::Span::styled(
                "No file open — select one in the tree",
                Style::default().fg(theme.dim_fg),
            )))
            .centered(),
        };
        frame.render_widget(body.block(block), area);
    }
}
