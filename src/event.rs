//! Application events and the async event pump.
//!
//! The main loop blocks only on `EventHandler::next()`. Background tasks
//! (session creation, PTY readers, git polling, quit-time inspection) never
//! touch the UI directly; they post events on the same channel and the main
//! loop reacts on its own thread of execution.

use std::path::PathBuf;
use std::time::Duration;

use crossterm::event::{self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind, MouseEvent};
use tokio::sync::mpsc;

use crate::error::Result;
use crate::git::GitEntry;

/// Application events.
#[derive(Debug)]
pub enum Event {
    /// A key press event.
    Key(KeyEvent),
    /// A mouse event.
    Mouse(MouseEvent),
    /// Pasted text (bracketed paste).
    Paste(String),
    /// A literal escape byte sequence the input parser did not decode.
    RawEscape(Vec<u8>),
    /// A periodic tick for rendering (spinner animation, status expiry).
    Tick,
    /// Terminal resize event.
    Resize(u16, u16),
    /// Output bytes from a terminal session's PTY.
    PtyOutput(usize, Vec<u8>),
    /// A background creation task published a session for the slot.
    SessionReady(usize),
    /// A terminal session's process exited.
    SessionExited(usize),
    /// Spawning a terminal session failed.
    SpawnFailed(usize, String),
    /// Fresh `git status` results for the source-control pane.
    GitStatus(Vec<GitEntry>),
    /// Quit-time inspection finished; lists at-risk items (empty = clean).
    QuitScanDone(Vec<String>),
    /// Filesystem change detected by the watcher.
    FsChange(Vec<PathBuf>),
    /// Generic redraw request from a background task.
    Redraw,
}

/// Window after a bare Esc press in which a trailing key is treated as the
/// tail of an undecoded escape sequence rather than a separate press.
const ESC_PAIR_WINDOW: Duration = Duration::from_millis(25);

/// Fold the event that arrives right behind a bare Esc press into a raw
/// escape sequence. Terminals without modifier reporting deliver Alt chords
/// as ESC followed by the plain key, and slow ttys can split the pair across
/// reads. Returns `None` when the trailing event is not a plain printable
/// key, in which case both events are forwarded separately.
fn fold_escape_pair(next: &CrosstermEvent) -> Option<Vec<u8>> {
    if let CrosstermEvent::Key(key) = next {
        if key.kind != KeyEventKind::Release && key.modifiers.is_empty() {
            if let KeyCode::Char(c) = key.code {
                if c.is_ascii_graphic() {
                    return Some(vec![0x1b, c as u8]);
                }
            }
        }
    }
    None
}

/// Forward one crossterm event on the channel. Returns false when the
/// receiver is gone and the pump should stop.
fn forward(tx: &mpsc::UnboundedSender<Event>, event: CrosstermEvent) -> bool {
    let sent = match event {
        CrosstermEvent::Key(key) => tx.send(Event::Key(key)),
        CrosstermEvent::Mouse(mouse) => tx.send(Event::Mouse(mouse)),
        CrosstermEvent::Paste(text) => tx.send(Event::Paste(text)),
        CrosstermEvent::Resize(w, h) => tx.send(Event::Resize(w, h)),
        _ => Ok(()),
    };
    sent.is_ok()
}

/// Async event handler that polls crossterm events and forwards them via a
/// channel, alongside events posted by background tasks.
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<Event>,
    tx: mpsc::UnboundedSender<Event>,
}

impl EventHandler {
    /// Create a new EventHandler with the given tick rate.
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let event_tx = tx.clone();

        tokio::task::spawn_blocking(move || loop {
            if event::poll(tick_rate).unwrap_or(false) {
                let forwarded = match event::read() {
                    Ok(CrosstermEvent::Key(key))
                        if key.code == KeyCode::Esc
                            && key.modifiers.is_empty()
                            && key.kind != KeyEventKind::Release =>
                    {
                        // A bare Esc may be the prefix of an undecoded
                        // sequence; peek briefly for the tail before
                        // forwarding it alone.
                        if event::poll(ESC_PAIR_WINDOW).unwrap_or(false) {
                            match event::read() {
                                Ok(next) => match fold_escape_pair(&next) {
                                    Some(bytes) => {
                                        event_tx.send(Event::RawEscape(bytes)).is_ok()
                                    }
                                    None => {
                                        event_tx.send(Event::Key(key)).is_ok()
                                            && forward(&event_tx, next)
                                    }
                                },
                                Err(_) => event_tx.send(Event::Key(key)).is_ok(),
                            }
                        } else {
                            event_tx.send(Event::Key(key)).is_ok()
                        }
                    }
                    Ok(other) => forward(&event_tx, other),
                    Err(_) => true,
                };
                if !forwarded {
                    break;
                }
            } else if event_tx.send(Event::Tick).is_err() {
                break;
            }
        });

        Self { rx, tx }
    }

    /// Get a sender clone for background tasks.
    pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
        self.tx.clone()
    }

    /// Receive the next event (blocks until available).
    pub async fn next(&mut self) -> Result<Event> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| crate::error::AppError::Terminal("Event channel closed".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    #[test]
    fn plain_char_behind_esc_folds_into_raw_escape() {
        let next = CrosstermEvent::Key(KeyEvent::new(KeyCode::Char('t'), KeyModifiers::NONE));
        assert_eq!(fold_escape_pair(&next), Some(vec![0x1b, b't']));
        let next = CrosstermEvent::Key(KeyEvent::new(KeyCode::Char('2'), KeyModifiers::NONE));
        assert_eq!(fold_escape_pair(&next), Some(vec![0x1b, b'2']));
    }

    #[test]
    fn modified_or_special_keys_do_not_fold() {
        let alt = CrosstermEvent::Key(KeyEvent::new(KeyCode::Char('t'), KeyModifiers::ALT));
        assert_eq!(fold_escape_pair(&alt), None);
        let arrow = CrosstermEvent::Key(KeyEvent::new(KeyCode::Up, KeyModifiers::NONE));
        assert_eq!(fold_escape_pair(&arrow), None);
        assert_eq!(fold_escape_pair(&CrosstermEvent::Resize(80, 24)), None);
    }

    #[test]
    fn key_release_behind_esc_does_not_fold() {
        let mut key = KeyEvent::new(KeyCode::Char('t'), KeyModifiers::NONE);
        key.kind = KeyEventKind::Release;
        assert_eq!(fold_escape_pair(&CrosstermEvent::Key(key)), None);
    }

    #[tokio::test]
    async fn forward_maps_crossterm_events_onto_the_channel() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        assert!(forward(
            &tx,
            CrosstermEvent::Key(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE)),
        ));
        assert!(forward(&tx, CrosstermEvent::Resize(100, 30)));
        assert!(matches!(rx.recv().await, Some(Event::Key(_))));
        assert!(matches!(rx.recv().await, Some(Event::Resize(100, 30))));
        drop(rx);
        assert!(!forward(&tx, CrosstermEvent::Resize(1, 1)));
    }
}
