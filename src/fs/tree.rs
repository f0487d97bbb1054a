//! File tree model for the left pane.
//!
//! Directories load lazily on expand. The tree keeps a flattened entry list
//! for rendering; selection and scroll indices live here so the widget stays
//! stateless.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Kind of filesystem node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Directory,
    Symlink,
}

/// A node in the tree. `children` is `None` until the directory is loaded.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub name: String,
    pub path: PathBuf,
    pub kind: NodeKind,
    pub depth: usize,
    pub hidden: bool,
    pub expanded: bool,
    pub children: Option<Vec<TreeNode>>,
}

impl TreeNode {
    fn from_path(path: &Path, depth: usize) -> Result<Self> {
        let metadata = fs::symlink_metadata(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        let kind = if metadata.is_symlink() {
            NodeKind::Symlink
        } else if metadata.is_dir() {
            NodeKind::Directory
        } else {
            NodeKind::File
        };
        let hidden = name.starts_with('.');
        Ok(Self {
            name,
            path: path.to_path_buf(),
            kind,
            depth,
            hidden,
            expanded: false,
            children: None,
        })
    }

    /// Read the directory and (re)build sorted children. Entries that fail
    /// to stat (broken symlinks, permission errors) are skipped.
    fn load_children(&mut self) -> Result<()> {
        if self.kind != NodeKind::Directory {
            return Ok(());
        }
        let mut children = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let Ok(entry) = entry else { continue };
            if let Ok(node) = TreeNode::from_path(&entry.path(), self.depth + 1) {
                children.push(node);
            }
        }
        sort_siblings(&mut children);
        self.children = Some(children);
        Ok(())
    }
}

/// Directories first, then case-insensitive by name.
fn sort_siblings(children: &mut [TreeNode]) {
    children.sort_by(|a, b| {
        (b.kind == NodeKind::Directory)
            .cmp(&(a.kind == NodeKind::Directory))
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
}

/// One row of the flattened tree, ready for rendering.
#[derive(Debug, Clone)]
pub struct FlatEntry {
    pub name: String,
    pub path: PathBuf,
    pub kind: NodeKind,
    pub depth: usize,
    pub expanded: bool,
    pub hidden: bool,
    pub last_sibling: bool,
}

/// The tree pane's model: node tree plus flattened view state.
pub struct FileTree {
    root: TreeNode,
    pub entries: Vec<FlatEntry>,
    pub selected: usize,
    pub scroll_offset: usize,
    pub show_hidden: bool,
}

impl FileTree {
    /// Build the tree rooted at `path` with the root expanded one level.
    pub fn new(path: &Path, show_hidden: bool) -> Result<Self> {
        let mut root = TreeNode::from_path(path, 0)?;
        if root.kind == NodeKind::Directory {
            root.load_children()?;
            root.expanded = true;
        }
        let mut tree = Self {
            root,
            entries: Vec::new(),
            selected: 0,
            scroll_offset: 0,
            show_hidden,
        };
        tree.flatten();
        Ok(tree)
    }

    pub fn root_path(&self) -> &Path {
        &self.root.path
    }

    /// Rebuild the flattened entry list and clamp the selection.
    pub fn flatten(&mut self) {
        self.entries.clear();
        flatten_node(&self.root, &mut self.entries, self.show_hidden, true, true);
        if !self.entries.is_empty() && self.selected >= self.entries.len() {
            self.selected = self.entries.len() - 1;
        }
    }

    pub fn selected_entry(&self) -> Option<&FlatEntry> {
        self.entries.get(self.selected)
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.entries.len() {
            self.selected += 1;
        }
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_path(&mut self, path: &Path) {
        if let Some(idx) = self.find_index(path) {
            self.selected = idx;
        }
    }

    pub fn find_index(&self, path: &Path) -> Option<usize> {
        self.entries.iter().position(|e| e.path == path)
    }

    /// Expand the selected directory, loading children on first expand.
    pub fn expand_selected(&mut self) {
        let Some(entry) = self.selected_entry() else {
            return;
        };
        if entry.kind != NodeKind::Directory {
            return;
        }
        let path = entry.path.clone();
        if let Some(node) = find_node_mut(&mut self.root, &path) {
            if !node.expanded {
                if node.children.is_none() {
                    let _ = node.load_children();
                }
                node.expanded = true;
                self.flatten();
            }
        }
    }

    /// Collapse the selected directory, or move the selection to the parent
    /// when the selection is not an expanded directory.
    pub fn collapse_selected(&mut self) {
        let Some(entry) = self.selected_entry() else {
            return;
        };
        let path = entry.path.clone();
        if entry.kind == NodeKind::Directory && entry.expanded {
            if let Some(node) = find_node_mut(&mut self.root, &path) {
                node.expanded = false;
                self.flatten();
            }
            return;
        }
        if let Some(parent) = path.parent() {
            self.select_path(&parent.to_path_buf());
        }
    }

    pub fn toggle_hidden(&mut self) {
        self.show_hidden = !self.show_hidden;
        self.flatten();
    }

    /// Keep the selection inside the viewport.
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

    /// Paths of all currently expanded directories.
    pub fn expanded_paths(&self) -> HashSet<PathBuf> {
        let mut out = HashSet::new();
        collect_expanded(&self.root, &mut out);
        out
    }

    /// Reload the subtree containing each changed path, then restore the
    /// previous expansion set and selection where they still exist.
    pub fn apply_changes(&mut self, paths: &[PathBuf]) {
        let expanded = self.expanded_paths();
        let selected_path = self.selected_entry().map(|e| e.path.clone());

        for path in paths {
            // A change to a file means its parent directory's listing moved.
            let dir = if path.is_dir() {
                path.clone()
            } else {
                match path.parent() {
                    Some(p) => p.to_path_buf(),
                    None => continue,
                }
            };
            if let Some(node) = find_node_mut(&mut self.root, &dir) {
                if node.kind == NodeKind::Directory && node.children.is_some() {
                    let _ = node.load_children();
                }
            }
        }

        self.restore_expanded(&expanded);
        self.flatten();
        if let Some(path) = selected_path {
            if let Some(idx) = self.find_index(&path) {
                self.selected = idx;
            }
        }
    }

    /// Re-expand a saved set of directories, ancestors before descendants.
    pub fn restore_expanded(&mut self, expanded: &HashSet<PathBuf>) {
        let mut ordered: Vec<&PathBuf> = expanded.iter().collect();
        ordered.sort_by_key(|p| p.components().count());
        for path in ordered {
            if let Some(node) = find_node_mut(&mut self.root, path) {
                if node.kind == NodeKind::Directory && !node.expanded {
                    if node.children.is_none() {
                        let _ = node.load_children();
                    }
                    node.expanded = true;
                }
            }
        }
    }

    /// After deleting `path`, pick the nearest surviving entry to select.
    pub fn select_after_delete(&mut self, deleted: &Path) {
        if let Some(parent) = deleted.parent() {
            if let Some(idx) = self.find_index(&parent.to_path_buf()) {
                self.selected = idx;
                return;
            }
        }
        self.selected = 0;
    }
}

fn flatten_node(
    node: &TreeNode,
    out: &mut Vec<FlatEntry>,
    show_hidden: bool,
    last: bool,
    is_root: bool,
) {
    if !is_root && !show_hidden && node.hidden {
        return;
    }
    out.push(FlatEntry {
        name: node.name.clone(),
        path: node.path.clone(),
        kind: node.kind,
        depth: node.depth,
        expanded: node.expanded,
        hidden: node.hidden,
        last_sibling: last,
    });
    if node.expanded {
        if let Some(children) = &node.children {
            let visible: Vec<&TreeNode> = children
                .iter()
                .filter(|c| show_hidden || !c.hidden)
                .collect();
            for (i, child) in visible.iter().enumerate() {
                flatten_node(child, out, show_hidden, i + 1 == visible.len(), false);
            }
        }
    }
}

fn find_node_mut<'a>(node: &'a mut TreeNode, target: &Path) -> Option<&'a mut TreeNode> {
    if node.path == target {
        return Some(node);
    }
    if !target.starts_with(&node.path) {
        return None;
    }
    node.children
        .as_mut()?
        .iter_mut()
        .find_map(|child| find_node_mut(child, target))
}

fn collect_expanded(node: &TreeNode, out: &mut HashSet<PathBuf>) {
    if node.expanded {
        out.insert(node.path.clone());
    }
    if let Some(children) = &node.children {
        for child in children {
            collect_expanded(child, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::TempDir;

    fn setup() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("alpha")).unwrap();
        fs::create_dir(dir.path().join("beta")).unwrap();
        File::create(dir.path().join("file_a.txt")).unwrap();
        File::create(dir.path().join("file_b.rs")).unwrap();
        File::create(dir.path().join(".hidden")).unwrap();
        fs::create_dir(dir.path().join("alpha").join("nested")).unwrap();
        File::create(dir.path().join("alpha").join("inner.txt")).unwrap();
        dir
    }

    #[test]
    fn directories_sort_before_files() {
        let dir = setup();
        let tree = FileTree::new(dir.path(), false).unwrap();
        assert_eq!(tree.entries[1].name, "alpha");
        assert_eq!(tree.entries[2].name, "beta");
        assert_eq!(tree.entries[3].name, "file_a.txt");
    }

    #[test]
    fn hidden_files_excluded_by_default() {
        let dir = setup();
        let mut tree = FileTree::new(dir.path(), false).unwrap();
        // root + alpha + beta + two files
        assert_eq!(tree.entries.len(), 5);
        tree.toggle_hidden();
        assert_eq!(tree.entries.len(), 6);
        tree.toggle_hidden();
        assert_eq!(tree.entries.len(), 5);
    }

    #[test]
    fn expand_loads_children_lazily() {
        let dir = setup();
        let mut tree = FileTree::new(dir.path(), false).unwrap();
        tree.selected = 1; // alpha
        tree.expand_selected();
        let names: Vec<&str> = tree.entries.iter().map(|e| e.name.as_str()).collect();
        assert!(names.contains(&"nested"));
        assert!(names.contains(&"inner.txt"));
    }

    #[test]
    fn collapse_on_file_jumps_to_parent() {
        let dir = setup();
        let mut tree = FileTree::new(dir.path(), false).unwrap();
        let file_idx = tree.find_index(&dir.path().join("file_a.txt")).unwrap();
        tree.selected = file_idx;
        tree.collapse_selected();
        assert_eq!(tree.selected_entry().unwrap().path, dir.path());
    }

    #[test]
    fn selection_moves_and_clamps() {
        let dir = setup();
        let mut tree = FileTree::new(dir.path(), false).unwrap();
        for _ in 0..100 {
            tree.select_next();
        }
        assert_eq!(tree.selected, tree.entries.len() - 1);
        tree.select_previous();
        assert_eq!(tree.selected, tree.entries.len() - 2);
    }

    #[test]
    fn scroll_follows_selection() {
        let dir = setup();
        let mut tree = FileTree::new(dir.path(), false).unwrap();
        tree.selected = 4;
        tree.update_scroll(3);
        assert_eq!(tree.scroll_offset, 2);
        tree.selected = 0;
        tree.update_scroll(3);
        assert_eq!(tree.scroll_offset, 0);
    }

    #[test]
    fn apply_changes_picks_up_new_file() {
        let dir = setup();
        let mut tree = FileTree::new(dir.path(), false).unwrap();
        let new_file = dir.path().join("zeta.txt");
        File::create(&new_file).unwrap();
        tree.apply_changes(&[new_file.clone()]);
        assert!(tree.find_index(&new_file).is_some());
    }

    #[test]
    fn apply_changes_preserves_expansion_and_selection() {
        let dir = setup();
        let mut tree = FileTree::new(dir.path(), false).unwrap();
        tree.selected = 1; // alpha
        tree.expand_selected();
        let inner = dir.path().join("alpha").join("inner.txt");
        tree.select_path(&inner);

        File::create(dir.path().join("alpha").join("another.txt")).unwrap();
        tree.apply_changes(&[dir.path().join("alpha").join("another.txt")]);

        let alpha = tree
            .entries
            .iter()
            .find(|e| e.name == "alpha")
            .expect("alpha survives reload");
        assert!(alpha.expanded);
        assert_eq!(tree.selected_entry().unwrap().path, inner);
    }

    #[test]
    fn select_after_delete_falls_back_to_parent() {
        let dir = setup();
        let mut tree = FileTree::new(dir.path(), false).unwrap();
        let deleted = dir.path().join("file_a.txt");
        fs::remove_file(&deleted).unwrap();
        tree.apply_changes(&[deleted.clone()]);
        tree.select_after_delete(&deleted);
        assert_eq!(tree.selected_entry().unwrap().path, dir.path());
    }

    #[test]
    fn restore_expanded_handles_nesting() {
        let dir = setup();
        let mut tree = FileTree::new(dir.path(), false).unwrap();
        tree.selected = 1;
        tree.expand_selected();
        let nested = dir.path().join("alpha").join("nested");
        tree.select_path(&nested);
        tree.expand_selected();
        let expanded = tree.expanded_paths();
        assert!(expanded.contains(&nested));

        // Fresh tree, then restore.
        let mut fresh = FileTree::new(dir.path(), false).unwrap();
        fresh.restore_expanded(&expanded);
        fresh.flatten();
        let nested_entry = fresh.entries.iter().find(|e| e.path == nested).unwrap();
        assert!(nested_entry.expanded);
    }
}
