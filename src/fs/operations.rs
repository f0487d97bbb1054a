//! Filesystem mutations driven by the tree pane, plus the project file walk
//! used by quick-find.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

/// Create an empty file. Fails if the path already exists.
pub fn create_file(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(AppError::InvalidPath(format!(
            "{} already exists",
            path.display()
        )));
    }
    fs::File::create(path)?;
    Ok(())
}

/// Create a directory. Fails if the path already exists.
pub fn create_dir(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(AppError::InvalidPath(format!(
            "{} already exists",
            path.display()
        )));
    }
    fs::create_dir(path)?;
    Ok(())
}

/// Rename an entry within its directory. Fails if the target exists.
pub fn rename(from: &Path, new_name: &str) -> Result<PathBuf> {
    if new_name.is_empty() || new_name.contains('/') {
        return Err(AppError::InvalidPath(format!(
            "invalid name {new_name:?}"
        )));
    }
    let parent = from
        .parent()
        .ok_or_else(|| AppError::InvalidPath("cannot rename root".into()))?;
    let to = parent.join(new_name);
    if to.exists() {
        return Err(AppError::InvalidPath(format!(
            "{} already exists",
            to.display()
        )));
    }
    fs::rename(from, &to)?;
    Ok(to)
}

/// Delete a file or directory (recursively).
pub fn delete(path: &Path) -> Result<()> {
    if path.is_dir() {
        fs::remove_dir_all(path)?;
    } else {
        fs::remove_file(path)?;
    }
    Ok(())
}

/// Directories never descended into by the quick-find walk.
const WALK_IGNORE: &[&str] = &["node_modules", "target", "__pycache__", ".venv", "venv"];

/// Collect project file paths for quick-find, breadth-first, capped at
/// `limit`. Hidden entries and well-known build directories are skipped.
pub fn collect_files(root: &Path, limit: usize) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut queue = vec![root.to_path_buf()];
    while let Some(dir) = queue.pop() {
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            if out.len() >= limit {
                return out;
            }
            let path = entry.path();
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with('.') || WALK_IGNORE.contains(&name.as_ref()) {
                continue;
            }
            if path.is_dir() {
                queue.push(path);
            } else {
                out.push(path);
            }
        }
    }
    out
}
