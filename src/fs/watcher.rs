//! Debounced filesystem watcher feeding `Event::FsChange`.
//!
//! The watcher stays alive for the life of the app; idle suspension flips a
//! pause flag instead of tearing down inotify watches.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};
use tokio::sync::mpsc;

use crate::event::Event;

/// Path components never reported to the tree.
pub const IGNORE_COMPONENTS: &[&str] = &[
    ".git",
    "node_modules",
    "__pycache__",
    ".venv",
    "venv",
    "target",
];

/// More events than this in one debounce window collapse into a single
/// root-wide refresh.
const FLOOD_THRESHOLD: usize = 100;

/// Watches the workspace root and posts debounced change batches.
pub struct ChangeWatcher {
    active: Arc<AtomicBool>,
    _debouncer: notify_debouncer_mini::Debouncer<notify::RecommendedWatcher>,
}

impl ChangeWatcher {
    pub fn new(
        root: &Path,
        debounce: Duration,
        tx: mpsc::UnboundedSender<Event>,
    ) -> notify::Result<Self> {
        let active = Arc::new(AtomicBool::new(true));
        let flag = active.clone();
        let root_path = root.to_path_buf();

        let mut debouncer = new_debouncer(debounce, move |result| {
            if !flag.load(Ordering::Relaxed) {
                return;
            }
            match result {
                Ok(events) => {
                    let paths: Vec<PathBuf> = filter_events(events);
                    if paths.is_empty() {
                        return;
                    }
                    let paths = if paths.len() > FLOOD_THRESHOLD {
                        vec![root_path.clone()]
                    } else {
                        paths
                    };
                    let _ = tx.send(Event::FsChange(paths));
                }
                Err(err) => {
                    tracing::warn!("watcher error: {err}");
                }
            }
        })?;

        debouncer
            .watcher()
            .watch(root, notify::RecursiveMode::Recursive)?;

        Ok(Self {
            active,
            _debouncer: debouncer,
        })
    }

    /// Stop forwarding events; the OS watches stay registered.
    pub fn pause(&self) {
        self.active.store(false, Ordering::Relaxed);
    }

    pub fn resume(&self) {
        self.active.store(true, Ordering::Relaxed);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }
}

fn filter_events(events: Vec<notify_debouncer_mini::DebouncedEvent>) -> Vec<PathBuf> {
    events
        .into_iter()
        .filter(|e| e.kind == DebouncedEventKind::Any)
        .map(|e| e.path)
        .filter(|p| !is_ignored(p))
        .collect()
}

/// A path is ignored when any component matches an ignore entry exactly.
pub fn is_ignored(path: &Path) -> bool {
    path.components().any(|component| {
        matches!(
            component,
            std::path::Component::Normal(name)
                if IGNORE_COMPONENTS.iter().any(|p| name.to_string_lossy() == *p)
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_vcs_and_build_output() {
        assert!(is_ignored(Path::new("/p/.git/HEAD")));
        assert!(is_ignored(Path::new("/p/node_modules/express/index.js")));
        assert!(is_ignored(Path::new("/p/target/debug/bin")));
    }

    #[test]
    fn keeps_source_paths() {
        assert!(!is_ignored(Path::new("/p/src/main.rs")));
        assert!(!is_ignored(Path::new("/p/README.md")));
    }

    #[test]
    fn exact_component_match_required() {
        assert!(!is_ignored(Path::new("/p/target2/file.txt")));
        assert!(!is_ignored(Path::new("/p/retarget/file.txt")));
    }

    #[tokio::test]
    async fn pause_and_resume_flip_the_flag() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let dir = tempfile::TempDir::new().unwrap();
        let watcher = ChangeWatcher::new(dir.path(), Duration::from_millis(50), tx).unwrap();
        assert!(watcher.is_active());
        watcher.pause();
        assert!(!watcher.is_active());
        watcher.resume();
        assert!(watcher.is_active());
    }
}
