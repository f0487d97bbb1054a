//! Background `git status` polling for the source-control pane.
//!
//! A detached task runs `git status --porcelain` on an interval and posts
//! results to the main loop. The poller is pausable so it can go quiet
//! alongside the rest of the app when the user is idle.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::event::Event;

/// One line of porcelain output: a two-character status code and a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitEntry {
    /// The XY status code, e.g. `" M"`, `"??"`, `"A "`.
    pub status: String,
    pub path: String,
}

impl GitEntry {
    /// Whether the entry has unstaged or untracked changes.
    pub fn is_dirty(&self) -> bool {
        self.status
            .chars()
            .nth(1)
            .is_some_and(|c| c != ' ')
    }
}

/// Parse `git status --porcelain` output.
///
/// Malformed lines are skipped. Rename entries keep the full `old -> new`
/// form in the path.
pub fn parse_porcelain(output: &str) -> Vec<GitEntry> {
    output
        .lines()
        .filter(|line| line.len() > 3)
        .map(|line| GitEntry {
            status: line[..2].to_string(),
            path: line[3..].to_string(),
        })
        .collect()
}

/// Shared pause flag for the poller.
pub type PauseFlag = Arc<AtomicBool>;

/// Spawn the polling task. Returns the pause flag; setting it suspends
/// polling until cleared.
pub fn spawn_poller(
    root: PathBuf,
    interval: Duration,
    tx: mpsc::UnboundedSender<Event>,
) -> PauseFlag {
    let paused: PauseFlag = Arc::new(AtomicBool::new(false));
    let flag = paused.clone();

    tokio::spawn(async move {
        let mut last: Option<Vec<GitEntry>> = None;
        loop {
            tokio::time::sleep(interval).await;
            if flag.load(Ordering::Relaxed) {
                continue;
            }
            let output = tokio::process::Command::new("git")
                .args(["status", "--porcelain"])
                .current_dir(&root)
                .output()
                .await;
            let entries = match output {
                Ok(out) if out.status.success() => {
                    parse_porcelain(&String::from_utf8_lossy(&out.stdout))
                }
                Ok(_) => {
                    // Not a repository (or git unhappy); nothing to show.
                    Vec::new()
                }
                Err(err) => {
                    tracing::debug!("git status failed: {err}");
                    continue;
                }
            };
            // Only wake the UI when something changed.
            if last.as_ref() != Some(&entries) {
                last = Some(entries.clone());
                if tx.send(Event::GitStatus(entries)).is_err() {
                    break;
                }
            }
        }
    });

    paused
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_porcelain_lines() {
        let out = " M src/main.rs\n?? notes.txt\nA  added.rs\n";
        let entries = parse_porcelain(out);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].status, " M");
        assert_eq!(entries[0].path, "src/main.rs");
        assert_eq!(entries[1].status, "??");
        assert_eq!(entries[2].status, "A ");
        assert_eq!(entries[2].path, "added.rs");
    }

    #[test]
    fn parses_rename_entry() {
        let entries = parse_porcelain("R  old.rs -> new.rs\n");
        assert_eq!(entries[0].path, "old.rs -> new.rs");
    }

    #[test]
    fn skips_short_lines() {
        assert!(parse_porcelain("\nM\n").is_empty());
    }

    #[test]
    fn dirty_detection() {
        assert!(GitEntry {
            status: " M".into(),
            path: "a".into()
        }
        .is_dirty());
        assert!(GitEntry {
            status: "??".into(),
            path: "a".into()
        }
        .is_dirty());
        assert!(!GitEntry {
            status: "M ".into(),
            path: "a".into()
        }
        .is_dirty());
    }
}
