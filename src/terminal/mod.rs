//! Terminal panel: per-slot session state, async session creation, and the
//! passthrough escape chord.
//!
//! Each slot owns an `Arc<RwLock<Option<TerminalSession>>>`. Session creation
//! runs on a background task and publishes under the write lock; if a live
//! session is already installed by the time a creation task finishes, the
//! task shuts its own PTY down instead of replacing it.

pub mod emulator;
pub mod pty;

use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use crate::event::Event;

/// Pressing the passthrough escape twice within this window leaves
/// passthrough mode.
pub const PASSTHROUGH_EXIT_WINDOW: Duration = Duration::from_millis(500);

/// A live terminal session in one slot. Sessions are removed from the slot
/// as soon as their child exits, so a published session is always live.
pub struct TerminalSession {
    pub emulator: emulator::VtEmulator,
    pub pty: pty::PtyProcess,
    /// Display name of the tool running in this session.
    pub tool: String,
}

type SessionHandle = Arc<RwLock<Option<TerminalSession>>>;

/// Install a freshly created session unless one is already published. The
/// loser of a creation race shuts its own PTY down. Returns whether
/// `session` was installed.
fn publish_session(handle: &SessionHandle, session: TerminalSession) -> bool {
    let Ok(mut guard) = handle.write() else {
        session.pty.shutdown();
        return false;
    };
    if guard.is_some() {
        // Lost the race; an earlier task already published.
        drop(guard);
        session.pty.shutdown();
        false
    } else {
        *guard = Some(session);
        true
    }
}

/// State for one terminal slot.
pub struct TerminalPanel {
    session: SessionHandle,
    /// A creation task is in flight; further spawn requests are ignored.
    spawning: bool,
    /// Tool of the in-flight creation task.
    pending_tool: Option<String>,
    /// Last spawn failure, shown in the empty slot.
    pub spawn_error: Option<String>,
    /// Scrollback offset in lines; 0 means live view.
    pub scroll_offset: usize,
    /// Keys go verbatim to the PTY while set.
    pub passthrough: bool,
    /// First output has arrived; until then the panel shows a spinner.
    pub received_output: bool,
    last_escape: Option<Instant>,
    /// Last size handed to the PTY, to skip redundant resizes.
    last_size: Option<(u16, u16)>,
}

impl Default for TerminalPanel {
    fn default() -> Self {
        Self {
            session: Arc::new(RwLock::new(None)),
            spawning: false,
            pending_tool: None,
            spawn_error: None,
            scroll_offset: 0,
            passthrough: false,
            received_output: false,
            last_escape: None,
            last_size: None,
        }
    }
}

impl TerminalPanel {
    /// Whether a session occupies this slot.
    pub fn is_alive(&self) -> bool {
        self.session.read().map(|s| s.is_some()).unwrap_or(false)
    }

    pub fn is_spawning(&self) -> bool {
        self.spawning
    }

    /// Tool of the creation task in flight, if any.
    pub fn pending_tool(&self) -> Option<&str> {
        self.pending_tool.as_deref()
    }

    /// Tool name of the current session, if any.
    pub fn tool_name(&self) -> Option<String> {
        self.session
            .read()
            .ok()
            .and_then(|s| s.as_ref().map(|s| s.tool.clone()))
    }

    /// Run `f` with read access to the session, for rendering.
    pub fn with_session<R>(&self, f: impl FnOnce(&TerminalSession) -> R) -> Option<R> {
        self.session.read().ok()?.as_ref().map(f)
    }

    /// Kick off session creation on a background task.
    ///
    /// No-op when a live session already exists or a creation task is
    /// already in flight. The task publishes the session under the write
    /// lock and posts `SessionReady`; when it loses the race against an
    /// earlier publish it shuts its own PTY down instead.
    #[allow(clippy::too_many_arguments)]
    pub fn spawn_session(
        &mut self,
        slot: usize,
        command: Vec<String>,
        tool: String,
        cwd: PathBuf,
        rows: u16,
        cols: u16,
        scrollback_limit: usize,
        tx: mpsc::UnboundedSender<Event>,
    ) {
        if self.spawning || self.is_alive() {
            return;
        }
        self.spawning = true;
        self.pending_tool = Some(tool.clone());
        self.spawn_error = None;
        self.last_size = Some((rows, cols));

        let handle = self.session.clone();
        tokio::task::spawn_blocking(move || {
            match pty::PtyProcess::spawn(&command, &cwd, rows, cols, slot, tx.clone()) {
                Ok(pty) => {
                    let session = TerminalSession {
                        emulator: emulator::VtEmulator::new(
                            rows as usize,
                            cols as usize,
                            scrollback_limit,
                        ),
                        pty,
                        tool,
                    };
                    if publish_session(&handle, session) {
                        let _ = tx.send(Event::SessionReady(slot));
                    }
                }
                Err(err) => {
                    let _ = tx.send(Event::SpawnFailed(slot, err.to_string()));
                }
            }
        });
    }

    /// Called when the main loop sees `SessionReady` for this slot.
    pub fn on_ready(&mut self) {
        self.spawning = false;
        self.pending_tool = None;
        self.scroll_offset = 0;
    }

    /// Called when the main loop sees `SpawnFailed` for this slot.
    pub fn on_spawn_failed(&mut self, message: String) {
        self.spawning = false;
        self.pending_tool = None;
        self.spawn_error = Some(message);
    }

    /// Feed PTY output bytes into the emulator.
    pub fn process_output(&mut self, data: &[u8]) {
        if let Ok(mut guard) = self.session.write() {
            if let Some(session) = guard.as_mut() {
                session.emulator.process(data);
                self.received_output = true;
            }
        }
    }

    /// Drop the current session (if any), killing the child.
    pub fn clear_session(&mut self) {
        if let Ok(mut guard) = self.session.write() {
            if let Some(session) = guard.take() {
                session.pty.shutdown();
            }
        }
        self.scroll_offset = 0;
        self.passthrough = false;
        self.received_output = false;
        self.spawn_error = None;
    }

    /// Write input bytes to the PTY and snap the view back to live.
    pub fn write_input(&mut self, data: &[u8]) {
        self.scroll_offset = 0;
        if let Ok(guard) = self.session.read() {
            if let Some(session) = guard.as_ref() {
                let _ = session.pty.write(data);
            }
        }
    }

    /// Resize emulator and PTY. Idempotent: repeated calls with the same
    /// size do nothing.
    pub fn resize(&mut self, rows: u16, cols: u16) {
        if rows == 0 || cols == 0 || self.last_size == Some((rows, cols)) {
            return;
        }
        self.last_size = Some((rows, cols));
        if let Ok(mut guard) = self.session.write() {
            if let Some(session) = guard.as_mut() {
                session.emulator.resize(rows as usize, cols as usize);
                let _ = session.pty.resize(rows, cols);
            }
        }
    }

    /// Scroll back `n` lines, clamped to the scrollback length.
    pub fn scroll_up(&mut self, n: usize) {
        let max = self
            .with_session(|s| s.emulator.scrollback_len())
            .unwrap_or(0);
        self.scroll_offset = (self.scroll_offset + n).min(max);
    }

    /// Scroll toward live by `n` lines.
    pub fn scroll_down(&mut self, n: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(n);
    }

    /// Process id of the live child, for quit-time inspection.
    pub fn process_id(&self) -> Option<u32> {
        self.session
            .read()
            .ok()?
            .as_ref()
            .and_then(|s| s.pty.process_id())
    }

    /// Record a passthrough-escape press; returns true when this press
    /// completes the double chord and passthrough should end.
    pub fn note_passthrough_escape(&mut self, now: Instant) -> bool {
        let double = self
            .last_escape
            .is_some_and(|prev| now.duration_since(prev) <= PASSTHROUGH_EXIT_WINDOW);
        if double {
            self.last_escape = None;
            self.passthrough = false;
        } else {
            self.last_escape = Some(now);
        }
        double
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_panel_reports_dead() {
        let panel = TerminalPanel::default();
        assert!(!panel.is_alive());
        assert!(panel.process_id().is_none());
        assert!(panel.pending_tool().is_none());
    }

    #[test]
    fn passthrough_double_escape_within_window() {
        let mut panel = TerminalPanel::default();
        panel.passthrough = true;
        let t0 = Instant::now();
        assert!(!panel.note_passthrough_escape(t0));
        assert!(panel.passthrough);
        assert!(panel.note_passthrough_escape(t0 + Duration::from_millis(300)));
        assert!(!panel.passthrough);
    }

    #[test]
    fn passthrough_slow_second_press_does_not_exit() {
        let mut panel = TerminalPanel::default();
        panel.passthrough = true;
        let t0 = Instant::now();
        assert!(!panel.note_passthrough_escape(t0));
        assert!(!panel.note_passthrough_escape(t0 + Duration::from_millis(700)));
        assert!(panel.passthrough);
        // The slow press restarts the window.
        assert!(panel.note_passthrough_escape(t0 + Duration::from_millis(900)));
    }

    #[test]
    fn scroll_clamps_without_session() {
        let mut panel = TerminalPanel::default();
        panel.scroll_up(10);
        assert_eq!(panel.scroll_offset, 0);
        panel.scroll_down(5);
        assert_eq!(panel.scroll_offset, 0);
    }

    #[tokio::test]
    async fn spawn_publishes_session_and_posts_ready() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut panel = TerminalPanel::default();
        panel.spawn_session(
            1,
            vec!["/bin/sh".to_string()],
            "Shell".to_string(),
            std::env::temp_dir(),
            24,
            80,
            100,
            tx,
        );
        assert!(panel.is_spawning());
        assert_eq!(panel.pending_tool(), Some("Shell"));
        loop {
            match rx.recv().await {
                Some(Event::SessionReady(slot)) => {
                    assert_eq!(slot, 1);
                    break;
                }
                Some(_) => continue,
                None => panic!("channel closed before SessionReady"),
            }
        }
        panel.on_ready();
        assert!(panel.is_alive());
        assert!(panel.pending_tool().is_none());
        assert_eq!(panel.tool_name().as_deref(), Some("Shell"));
        panel.clear_session();
        assert!(!panel.is_alive());
    }

    #[tokio::test]
    async fn spawn_failure_posts_event() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut panel = TerminalPanel::default();
        panel.spawn_session(
            0,
            vec!["/nonexistent/binary".to_string()],
            "Broken".to_string(),
            std::env::temp_dir(),
            24,
            80,
            100,
            tx,
        );
        loop {
            match rx.recv().await {
                Some(Event::SpawnFailed(slot, msg)) => {
                    assert_eq!(slot, 0);
                    panel.on_spawn_failed(msg);
                    break;
                }
                Some(_) => continue,
                None => panic!("channel closed before SpawnFailed"),
            }
        }
        assert!(!panel.is_spawning());
        assert!(panel.spawn_error.is_some());
        assert!(!panel.is_alive());
    }

    #[tokio::test]
    async fn second_spawn_request_is_ignored_while_in_flight() {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let mut panel = TerminalPanel::default();
        panel.spawn_session(
            0,
            vec!["/bin/sh".to_string()],
            "Shell".to_string(),
            std::env::temp_dir(),
            24,
            80,
            100,
            tx.clone(),
        );
        assert!(panel.is_spawning());
        // Request again immediately; the guard drops it on the floor.
        panel.spawn_session(
            0,
            vec!["/bin/sh".to_string()],
            "Shell".to_string(),
            std::env::temp_dir(),
            24,
            80,
            100,
            tx,
        );
        panel.clear_session();
    }

    #[tokio::test]
    async fn publish_race_keeps_winner_and_shuts_loser_down() {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let panel = TerminalPanel::default();
        let make_session = |tool: &str| {
            let pty = pty::PtyProcess::spawn(
                &["/bin/sh".to_string()],
                &std::env::temp_dir(),
                24,
                80,
                0,
                tx.clone(),
            )
            .unwrap();
            TerminalSession {
                emulator: emulator::VtEmulator::new(24, 80, 100),
                pty,
                tool: tool.to_string(),
            }
        };

        let winner = make_session("First");
        let loser = make_session("Second");
        let loser_pid = loser.pty.process_id().unwrap();

        assert!(publish_session(&panel.session, winner));
        assert!(!publish_session(&panel.session, loser));

        // The incumbent stays; the loser's child was killed and reaped.
        assert_eq!(panel.tool_name().as_deref(), Some("First"));
        assert!(!std::path::Path::new(&format!("/proc/{loser_pid}")).exists());
    }
}
