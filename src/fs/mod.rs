//! Filesystem layer: tree model, file operations, and change watching.

pub mod operations;
pub mod tree;
pub mod watcher;
