//! Tab strip: open editor buffers as tabs, independent of pane focus.
//!
//! A preview tab is opened for quick viewing and is replaced by the next
//! preview unless the user commits to it (edits it or explicitly re-opens
//! it), which pins it. At most one preview tab exists at a time.

use std::path::{Path, PathBuf};

/// One open buffer tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tab {
    pub path: PathBuf,
    pub title: String,
    pub pinned: bool,
}

impl Tab {
    fn new(path: &Path, pinned: bool) -> Self {
        let title = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        Self {
            path: path.to_path_buf(),
            title,
            pinned,
        }
    }
}

/// Ordered tab list with one active index.
#[derive(Debug, Default)]
pub struct TabStrip {
    pub tabs: Vec<Tab>,
    pub active: usize,
}

impl TabStrip {
    /// Open a path as a preview tab.
    ///
    /// If the path is already open it becomes active (and is pinned, since
    /// re-opening counts as committing to it). Otherwise the existing
    /// preview tab, if any, is replaced in place; with no preview tab a new
    /// one is appended.
    pub fn open_preview(&mut self, path: &Path) {
        if let Some(idx) = self.index_of(path) {
            if self.active == idx {
                self.tabs[idx].pinned = true;
            }
            self.active = idx;
            return;
        }
        if let Some(idx) = self.tabs.iter().position(|t| !t.pinned) {
            self.tabs[idx] = Tab::new(path, false);
            self.active = idx;
        } else {
            self.tabs.push(Tab::new(path, false));
            self.active = self.tabs.len() - 1;
        }
    }

    /// Open a path as a pinned tab (or pin it if already open).
    pub fn open_pinned(&mut self, path: &Path) {
        self.open_preview(path);
        if let Some(tab) = self.tabs.get_mut(self.active) {
            tab.pinned = true;
        }
    }

    /// Pin the active tab. Called when the buffer is edited.
    pub fn pin_active(&mut self) {
        if let Some(tab) = self.tabs.get_mut(self.active) {
            tab.pinned = true;
        }
    }

    /// Path of the active tab.
    pub fn active_path(&self) -> Option<&Path> {
        self.tabs.get(self.active).map(|t| t.path.as_path())
    }

    pub fn index_of(&self, path: &Path) -> Option<usize> {
        self.tabs.iter().position(|t| t.path == path)
    }

    /// Switch to the next tab, wrapping.
    pub fn next_tab(&mut self) {
        if !self.tabs.is_empty() {
            self.active = (self.active + 1) % self.tabs.len();
        }
    }

    /// Switch to the previous tab, wrapping.
    pub fn prev_tab(&mut self) {
        if !self.tabs.is_empty() {
            self.active = (self.active + self.tabs.len() - 1) % self.tabs.len();
        }
    }

    /// Close the tab at `index`, clamping the active index.
    pub fn close(&mut self, index: usize) -> Option<Tab> {
        if index >= self.tabs.len() {
            return None;
        }
        let tab = self.tabs.remove(index);
        if self.active > index || self.active >= self.tabs.len() {
            self.active = self.active.saturating_sub(1);
        }
        Some(tab)
    }

    /// Close the active tab.
    pub fn close_active(&mut self) -> Option<Tab> {
        if self.tabs.is_empty() {
            None
        } else {
            self.close(self.active)
        }
    }

    /// Hit-test a click on the tab strip row; returns the tab index.
    ///
    /// Tabs are laid out left to right as `" title "` segments matching the
    /// widget's rendering.
    pub fn tab_at_column(&self, column: u16) -> Option<usize> {
        let mut x = 0u16;
        for (i, tab) in self.tabs.iter().enumerate() {
            let w = tab.title.chars().count() as u16 + 2;
            if column >= x && column < x + w {
                return Some(i);
            }
            x += w;
        }
        None
    }
}
