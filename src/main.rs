mod app;
mod components;
mod config;
mod error;
mod event;
mod fs;
mod git;
mod handler;
mod host;
mod layout;
mod modal;
mod tabs;
mod terminal;
mod theme;
mod tui;
mod ui;

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::app::Workspace;
use crate::config::AppConfig;
use crate::event::{Event, EventHandler};
use crate::fs::watcher::ChangeWatcher;
use crate::host::FileViewerHost;
use crate::tui::{install_panic_hook, Tui};

/// Multi-pane workspace for a terminal-based code editor.
#[derive(Parser, Debug)]
#[command(name = "wb", version, about)]
struct Cli {
    /// Project root (defaults to current directory)
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Config file to use instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,

    /// Color scheme override (dark or light)
    #[arg(long)]
    theme: Option<String>,

    /// Disable the filesystem watcher (auto-refresh)
    #[arg(long)]
    no_watcher: bool,

    /// Start a shell session in terminal slot 1 on startup
    #[arg(long)]
    preload_terminal: bool,

    /// Append structured logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> error::Result<()> {
    let cli = Cli::parse();

    if let Some(log_path) = &cli.log_file {
        let file = std::fs::File::create(log_path)?;
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(file)
            .with_ansi(false)
            .init();
    }

    let path = cli.path.canonicalize().map_err(|_| {
        error::AppError::InvalidPath(format!("{} does not exist", cli.path.display()))
    })?;

    let mut config = AppConfig::load(cli.config.as_deref(), None);
    if let Some(scheme) = cli.theme {
        config.theme.scheme = Some(scheme);
    }

    install_panic_hook();

    let mut tui = Tui::new(config.mouse_enabled())?;
    let mut events = EventHandler::new(Duration::from_millis(16));
    let event_tx = events.sender();

    let mut ws = Workspace::new(
        path.clone(),
        config,
        Box::new(FileViewerHost::default()),
        event_tx.clone(),
    )?;
    let size = tui.terminal_mut().size()?;
    ws.on_resize(size.width, size.height);

    let watcher = if cli.no_watcher || !ws.config.watcher_enabled() {
        None
    } else {
        let debounce = Duration::from_millis(ws.config.watcher_debounce_ms());
        match ChangeWatcher::new(&path, debounce, event_tx.clone()) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                ws.set_status(format!("watcher unavailable: {e}"), true);
                None
            }
        }
    };

    let git_pause = if ws.config.git_enabled() {
        Some(git::spawn_poller(
            path.clone(),
            Duration::from_secs(ws.config.git_poll_secs()),
            event_tx.clone(),
        ))
    } else {
        None
    };

    if cli.preload_terminal || ws.config.preload_terminal() {
        ws.preload_terminal();
    }

    loop {
        tui.terminal_mut().draw(|frame| {
            ui::render(&mut ws, frame);
        })?;

        match events.next().await? {
            Event::Key(key) => {
                ws.note_input();
                handler::handle_key(&mut ws, key);
            }
            Event::Mouse(mouse) => {
                ws.note_input();
                handler::handle_mouse(&mut ws, mouse);
            }
            Event::Paste(text) => {
                ws.note_input();
                handler::handle_paste(&mut ws, &text);
            }
            Event::RawEscape(bytes) => handler::handle_raw_escape(&mut ws, &bytes),
            Event::Tick => {
                ws.on_tick();
            }
            Event::Resize(w, h) => ws.on_resize(w, h),
            Event::PtyOutput(slot, data) => ws.on_pty_output(slot, &data),
            Event::SessionReady(slot) => ws.on_session_ready(slot),
            Event::SessionExited(slot) => ws.on_session_exited(slot),
            Event::SpawnFailed(slot, message) => ws.on_spawn_failed(slot, message),
            Event::GitStatus(entries) => ws.on_git_status(entries),
            Event::QuitScanDone(items) => ws.on_quit_scan_done(items),
            Event::FsChange(paths) => ws.on_fs_change(&paths),
            Event::Redraw => {}
        }

        // Keep the background pollers in step with idle suspension.
        if let Some(watcher) = &watcher {
            if ws.suspended && watcher.is_active() {
                watcher.pause();
            } else if !ws.suspended && !watcher.is_active() {
                watcher.resume();
            }
        }
        if let Some(flag) = &git_pause {
            flag.store(ws.suspended, Ordering::Relaxed);
        }

        if ws.should_quit {
            break;
        }
    }

    // Kill any remaining session children before leaving the alt screen.
    for panel in ws.terminals.iter_mut() {
        panel.clear_session();
    }

    tui.restore()?;
    Ok(())
}
