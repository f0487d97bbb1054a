//! Application configuration: TOML file loading, CLI overrides, and defaults.
//!
//! Resolution order (first found wins, values merge/override):
//! 1. CLI flags (`--config`, `--theme`, `--no-watcher`, etc.)
//! 2. `$WORKBENCH_CONFIG` environment variable (path to config file)
//! 3. Project-local `.workbench.toml` in the current working directory
//! 4. Global `~/.config/workbench/config.toml`
//! 5. Built-in defaults

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::layout::LayoutConfig;

// ── Section configs ──────────────────────────────────────────────────────────

/// General application settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GeneralConfig {
    /// Show hidden files in the tree by default.
    pub show_hidden: Option<bool>,
    /// Enable mouse support.
    pub mouse: Option<bool>,
    /// Idle threshold in seconds before background watchers are suspended.
    pub idle_timeout_secs: Option<u64>,
}

/// Pane layout settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PaneLayoutConfig {
    /// Left pane width when not expanded.
    pub tree_width_normal: Option<u16>,
    /// Left pane width when expanded.
    pub tree_width_expanded: Option<u16>,
    /// Percentage of the screen width given to terminals while the editor
    /// is visible.
    pub term_width_percent: Option<u16>,
}

/// Terminal session settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TerminalConfig {
    /// Shell command (defaults to `$SHELL`, then `/bin/sh`).
    pub shell: Option<String>,
    /// Assistant tool command offered by the tool selector.
    pub assistant_command: Option<String>,
    /// Process names treated as at-risk interactive tools on quit.
    pub assistant_names: Option<Vec<String>>,
    /// Maximum scrollback lines kept per session.
    pub scrollback_limit: Option<usize>,
    /// Speculatively start a shell in terminal slot 1 on startup.
    pub preload: Option<bool>,
}

/// Filesystem watcher settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct WatcherConfig {
    /// Enable filesystem watcher for tree auto-refresh.
    pub enabled: Option<bool>,
    /// Debounce interval in milliseconds.
    pub debounce_ms: Option<u64>,
}

/// Git polling settings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GitConfig {
    /// Enable periodic `git status` polling for the source-control pane.
    pub enabled: Option<bool>,
    /// Poll interval in seconds.
    pub poll_interval_secs: Option<u64>,
}

/// Color settings for a single theme palette.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ThemeColorsConfig {
    pub tree_fg: Option<String>,
    pub tree_selected_bg: Option<String>,
    pub status_bg: Option<String>,
    pub status_fg: Option<String>,
    pub border_fg: Option<String>,
    pub border_focused_fg: Option<String>,
    pub terminal_bg: Option<String>,
    pub dialog_bg: Option<String>,
}

/// Theme configuration section.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ThemeConfig {
    /// Color scheme: "dark", "light", "custom".
    pub scheme: Option<String>,
    /// Custom color overrides.
    pub custom: Option<ThemeColorsConfig>,
}

// ── Top-level config ─────────────────────────────────────────────────────────

/// Top-level application configuration.
///
/// All fields are optional so that partial configs from different sources
/// can be merged together (CLI overrides file, file overrides defaults).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub layout: PaneLayoutConfig,
    pub terminal: TerminalConfig,
    pub watcher: WatcherConfig,
    pub git: GitConfig,
    pub theme: ThemeConfig,
}

// ── Default constants ────────────────────────────────────────────────────────

/// Default left pane width (columns).
pub const DEFAULT_TREE_WIDTH_NORMAL: u16 = 25;
/// Default expanded left pane width (columns).
pub const DEFAULT_TREE_WIDTH_EXPANDED: u16 = 40;
/// Default terminal share of the screen width (percent).
pub const DEFAULT_TERM_WIDTH_PERCENT: u16 = 45;
/// Default idle threshold in seconds.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 60;
/// Default watcher debounce interval in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;
/// Default git poll interval in seconds.
pub const DEFAULT_GIT_POLL_SECS: u64 = 5;
/// Default scrollback lines kept per terminal session.
pub const DEFAULT_SCROLLBACK_LIMIT: usize = 2000;

// ── Config file locator ──────────────────────────────────────────────────────

/// Return the list of candidate config file paths in priority order.
///
/// Does NOT include the CLI `--config` path, which is handled separately.
fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // 1. $WORKBENCH_CONFIG environment variable
    if let Ok(env_path) = std::env::var("WORKBENCH_CONFIG") {
        paths.push(PathBuf::from(env_path));
    }

    // 2. Project-local `.workbench.toml` in CWD
    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(".workbench.toml"));
    }

    // 3. Global `~/.config/workbench/config.toml`
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("workbench").join("config.toml"));
    }

    paths
}

/// Try to read and parse a TOML config file. Returns `None` if the file
/// doesn't exist or can't be parsed (with a warning logged).
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return None,
    };
    match toml::from_str::<AppConfig>(&content) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            tracing::warn!("failed to parse config file {}: {}", path.display(), e);
            None
        }
    }
}

// ── Merge logic ──────────────────────────────────────────────────────────────

impl AppConfig {
    /// Merge `other` on top of `self`; `other`'s `Some` values win.
    pub fn merge(self, other: &AppConfig) -> AppConfig {
        AppConfig {
            general: GeneralConfig {
                show_hidden: other.general.show_hidden.or(self.general.show_hidden),
                mouse: other.general.mouse.or(self.general.mouse),
                idle_timeout_secs: other
                    .general
                    .idle_timeout_secs
                    .or(self.general.idle_timeout_secs),
            },
            layout: PaneLayoutConfig {
                tree_width_normal: other
                    .layout
                    .tree_width_normal
                    .or(self.layout.tree_width_normal),
                tree_width_expanded: other
                    .layout
                    .tree_width_expanded
                    .or(self.layout.tree_width_expanded),
                term_width_percent: other
                    .layout
                    .term_width_percent
                    .or(self.layout.term_width_percent),
            },
            terminal: TerminalConfig {
                shell: other.terminal.shell.clone().or(self.terminal.shell),
                assistant_command: other
                    .terminal
                    .assistant_command
                    .clone()
                    .or(self.terminal.assistant_command),
                assistant_names: other
                    .terminal
                    .assistant_names
                    .clone()
                    .or(self.terminal.assistant_names),
                scrollback_limit: other
                    .terminal
                    .scrollback_limit
                    .or(self.terminal.scrollback_limit),
                preload: other.terminal.preload.or(self.terminal.preload),
            },
            watcher: WatcherConfig {
                enabled: other.watcher.enabled.or(self.watcher.enabled),
                debounce_ms: other.watcher.debounce_ms.or(self.watcher.debounce_ms),
            },
            git: GitConfig {
                enabled: other.git.enabled.or(self.git.enabled),
                poll_interval_secs: other
                    .git
                    .poll_interval_secs
                    .or(self.git.poll_interval_secs),
            },
            theme: ThemeConfig {
                scheme: other.theme.scheme.clone().or(self.theme.scheme),
                custom: match (&self.theme.custom, &other.theme.custom) {
                    (_, Some(o)) => Some(o.clone()),
                    (Some(s), None) => Some(s.clone()),
                    (None, None) => None,
                },
            },
        }
    }

    /// Load the final merged configuration.
    ///
    /// `cli_config_path` is an explicit config file path from `--config`.
    /// `cli_overrides` are partial overrides derived from CLI flags.
    pub fn load(cli_config_path: Option<&Path>, cli_overrides: Option<&AppConfig>) -> AppConfig {
        // Start with built-in defaults (all None, the struct Default).
        let mut config = AppConfig::default();

        // Walk candidates in reverse so that highest-priority overwrites lower.
        let paths = candidate_paths();
        for path in paths.iter().rev() {
            if let Some(file_cfg) = load_file(path) {
                config = config.merge(&file_cfg);
            }
        }

        // Explicit --config file has higher priority than candidates.
        if let Some(cli_path) = cli_config_path {
            if let Some(file_cfg) = load_file(cli_path) {
                config = config.merge(&file_cfg);
            }
        }

        // CLI flag overrides are highest priority.
        if let Some(overrides) = cli_overrides {
            config = config.merge(overrides);
        }

        config
    }

    // ── Convenience getters with built-in defaults ──────────────────────────

    pub fn show_hidden(&self) -> bool {
        self.general.show_hidden.unwrap_or(false)
    }

    pub fn mouse_enabled(&self) -> bool {
        self.general.mouse.unwrap_or(true)
    }

    pub fn idle_timeout_secs(&self) -> u64 {
        self.general
            .idle_timeout_secs
            .unwrap_or(DEFAULT_IDLE_TIMEOUT_SECS)
    }

    /// Layout widths for the geometry computation.
    pub fn layout_config(&self) -> LayoutConfig {
        LayoutConfig {
            tree_width_normal: self
                .layout
                .tree_width_normal
                .unwrap_or(DEFAULT_TREE_WIDTH_NORMAL),
            tree_width_expanded: self
                .layout
                .tree_width_expanded
                .unwrap_or(DEFAULT_TREE_WIDTH_EXPANDED),
            term_width_percent: self
                .layout
                .term_width_percent
                .unwrap_or(DEFAULT_TERM_WIDTH_PERCENT)
                .min(100),
        }
    }

    /// Shell command for new terminal sessions.
    pub fn shell_command(&self) -> String {
        self.terminal
            .shell
            .clone()
            .or_else(|| std::env::var("SHELL").ok())
            .unwrap_or_else(|| "/bin/sh".to_string())
    }

    /// Assistant tool command, if configured.
    pub fn assistant_command(&self) -> Option<String> {
        self.terminal.assistant_command.clone()
    }

    /// Process names treated as at-risk interactive tools on quit.
    pub fn assistant_names(&self) -> Vec<String> {
        self.terminal
            .assistant_names
            .clone()
            .unwrap_or_else(|| vec!["aider".to_string(), "claude".to_string()])
    }

    pub fn scrollback_limit(&self) -> usize {
        self.terminal
            .scrollback_limit
            .unwrap_or(DEFAULT_SCROLLBACK_LIMIT)
    }

    pub fn preload_terminal(&self) -> bool {
        self.terminal.preload.unwrap_or(false)
    }

    pub fn watcher_enabled(&self) -> bool {
        self.watcher.enabled.unwrap_or(true)
    }

    pub fn watcher_debounce_ms(&self) -> u64 {
        self.watcher.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS)
    }

    pub fn git_enabled(&self) -> bool {
        self.git.enabled.unwrap_or(true)
    }

    pub fn git_poll_secs(&self) -> u64 {
        self.git.poll_interval_secs.unwrap_or(DEFAULT_GIT_POLL_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let cfg = AppConfig::default();
        let layout = cfg.layout_config();
        assert_eq!(layout.tree_width_normal, DEFAULT_TREE_WIDTH_NORMAL);
        assert_eq!(layout.tree_width_expanded, DEFAULT_TREE_WIDTH_EXPANDED);
        assert_eq!(layout.term_width_percent, DEFAULT_TERM_WIDTH_PERCENT);
        assert_eq!(cfg.idle_timeout_secs(), DEFAULT_IDLE_TIMEOUT_SECS);
        assert_eq!(cfg.scrollback_limit(), DEFAULT_SCROLLBACK_LIMIT);
        assert!(cfg.watcher_enabled());
        assert!(cfg.git_enabled());
        assert!(!cfg.preload_terminal());
    }

    #[test]
    fn merge_other_some_wins() {
        let base = AppConfig::default();
        let over: AppConfig = toml::from_str(
            r#"
            [layout]
            term_width_percent = 60
            [terminal]
            shell = "/bin/zsh"
            "#,
        )
        .unwrap();
        let merged = base.merge(&over);
        assert_eq!(merged.layout_config().term_width_percent, 60);
        assert_eq!(merged.shell_command(), "/bin/zsh");
        // Untouched fields keep defaults
        assert_eq!(
            merged.layout_config().tree_width_normal,
            DEFAULT_TREE_WIDTH_NORMAL
        );
    }

    #[test]
    fn merge_keeps_base_when_other_none() {
        let base: AppConfig = toml::from_str(
            r#"
            [general]
            show_hidden = true
            "#,
        )
        .unwrap();
        let merged = base.merge(&AppConfig::default());
        assert!(merged.show_hidden());
    }

    #[test]
    fn term_width_percent_is_clamped() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [layout]
            term_width_percent = 250
            "#,
        )
        .unwrap();
        assert_eq!(cfg.layout_config().term_width_percent, 100);
    }

    #[test]
    fn parse_full_file() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [general]
            idle_timeout_secs = 120
            [terminal]
            assistant_command = "aider"
            assistant_names = ["aider"]
            scrollback_limit = 500
            [git]
            poll_interval_secs = 10
            [theme]
            scheme = "light"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.idle_timeout_secs(), 120);
        assert_eq!(cfg.assistant_command().as_deref(), Some("aider"));
        assert_eq!(cfg.assistant_names(), vec!["aider".to_string()]);
        assert_eq!(cfg.scrollback_limit(), 500);
        assert_eq!(cfg.git_poll_secs(), 10);
        assert_eq!(cfg.theme.scheme.as_deref(), Some("light"));
    }
}
