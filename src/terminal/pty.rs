//! PTY process management: spawning, I/O, resize, and lifecycle.

use std::io::{Read, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use portable_pty::{native_pty_system, CommandBuilder, MasterPty, PtySize};
use tokio::sync::mpsc;

use crate::error::{AppError, Result};
use crate::event::Event;

/// A PTY child process bound to one terminal slot.
///
/// Output bytes and the exit notification are posted to the main event loop
/// tagged with the slot index; the process itself never touches UI state.
pub struct PtyProcess {
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
    master: Arc<Mutex<Box<dyn MasterPty + Send>>>,
    child: Arc<Mutex<Box<dyn portable_pty::Child + Send + Sync>>>,
    process_id: Option<u32>,
    _reader_handle: tokio::task::JoinHandle<()>,
}

impl PtyProcess {
    /// Spawn a command on a fresh PTY.
    ///
    /// - `command`: program plus arguments (must be non-empty)
    /// - `cwd`: working directory for the child
    /// - `rows`, `cols`: initial PTY size
    /// - `slot`: terminal slot index used to tag posted events
    /// - `tx`: the main loop's event channel
    pub fn spawn(
        command: &[String],
        cwd: &Path,
        rows: u16,
        cols: u16,
        slot: usize,
        tx: mpsc::UnboundedSender<Event>,
    ) -> Result<Self> {
        let program = command
            .first()
            .ok_or_else(|| AppError::Pty("empty command".into()))?;

        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| AppError::Pty(e.to_string()))?;

        let mut cmd = CommandBuilder::new(program);
        cmd.args(&command[1..]);
        cmd.cwd(cwd);
        cmd.env("TERM", "xterm-256color");

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| AppError::Pty(e.to_string()))?;
        let process_id = child.process_id();

        let writer = pair
            .master
            .take_writer()
            .map_err(|e| AppError::Pty(e.to_string()))?;
        let mut reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| AppError::Pty(e.to_string()))?;
        let master: Box<dyn MasterPty + Send> = pair.master;

        let reader_handle = tokio::task::spawn_blocking(move || {
            let mut buf = [0u8; 4096];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) | Err(_) => {
                        let _ = tx.send(Event::SessionExited(slot));
                        break;
                    }
                    Ok(n) => {
                        if tx.send(Event::PtyOutput(slot, buf[..n].to_vec())).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        Ok(Self {
            writer: Arc::new(Mutex::new(writer)),
            master: Arc::new(Mutex::new(master)),
            child: Arc::new(Mutex::new(child)),
            process_id,
            _reader_handle: reader_handle,
        })
    }

    /// Write raw bytes to the child's stdin.
    pub fn write(&self, data: &[u8]) -> std::io::Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        writer.write_all(data)?;
        writer.flush()
    }

    /// Resize the PTY.
    pub fn resize(&self, rows: u16, cols: u16) -> std::io::Result<()> {
        let master = self
            .master
            .lock()
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        master
            .resize(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| std::io::Error::other(e.to_string()))
    }

    /// OS process id of the child, used for quit-time inspection.
    pub fn process_id(&self) -> Option<u32> {
        self.process_id
    }

    /// Whether the child process is still running.
    pub fn is_alive(&self) -> bool {
        if let Ok(mut child) = self.child.lock() {
            matches!(child.try_wait(), Ok(None))
        } else {
            false
        }
    }

    /// Kill the child and reap it.
    pub fn shutdown(&self) {
        if let Ok(mut child) = self.child.lock() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}
