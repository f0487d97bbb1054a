//! Theme data model: built-in palettes and resolution from config.
//!
//! Two built-in palettes (dark and light) plus custom hex overrides from the
//! config file. Border colors encode the three terminal-pane states
//! (unfocused, focused, passthrough).

use ratatui::style::Color;

use crate::config::{ThemeColorsConfig, ThemeConfig};

// ── Runtime theme colors ─────────────────────────────────────────────────────

/// All runtime colors used in the UI.
///
/// Constructed from a config-level `ThemeConfig` via `resolve_theme()`.
#[derive(Debug, Clone)]
pub struct ThemeColors {
    // Tree / source-control panel
    pub tree_fg: Color,
    pub tree_selected_bg: Color,
    pub tree_selected_fg: Color,
    pub tree_dir_fg: Color,
    pub tree_hidden_fg: Color,

    // Tab strip
    pub tab_bg: Color,
    pub tab_fg: Color,
    pub tab_active_bg: Color,
    pub tab_active_fg: Color,
    pub tab_preview_fg: Color,

    // Status bar
    pub status_bg: Color,
    pub status_fg: Color,

    // Borders & chrome
    pub border_fg: Color,
    pub border_focused_fg: Color,
    pub border_passthrough_fg: Color,

    // Terminal panel
    pub terminal_default_bg: Color,
    pub terminal_cursor_fg: Color,
    pub terminal_cursor_bg: Color,

    // Dialogs
    pub dialog_bg: Color,
    pub dialog_border_fg: Color,

    // Semantic colors (not configurable, consistent across themes)
    pub error_fg: Color,
    pub warning_fg: Color,
    pub success_fg: Color,
    pub info_fg: Color,
    pub accent_fg: Color,
    pub dim_fg: Color,
}

// ── Built-in palettes ────────────────────────────────────────────────────────

/// Dark theme using Catppuccin Mocha palette.
pub fn dark_theme() -> ThemeColors {
    ThemeColors {
        tree_fg: Color::Rgb(205, 214, 244),       // #cdd6f4 (text)
        tree_selected_bg: Color::Rgb(69, 71, 90), // #45475a (surface1)
        tree_selected_fg: Color::Rgb(205, 214, 244),
        tree_dir_fg: Color::Rgb(137, 180, 250), // #89b4fa (blue)
        tree_hidden_fg: Color::Rgb(108, 112, 134), // #6c7086 (overlay0)

        tab_bg: Color::Rgb(30, 30, 46), // #1e1e2e (base)
        tab_fg: Color::Rgb(166, 173, 200), // #a6adc8 (subtext0)
        tab_active_bg: Color::Rgb(69, 71, 90), // #45475a
        tab_active_fg: Color::Rgb(205, 214, 244),
        tab_preview_fg: Color::Rgb(108, 112, 134), // #6c7086

        status_bg: Color::Rgb(30, 30, 46),
        status_fg: Color::Rgb(205, 214, 244),

        border_fg: Color::Rgb(88, 91, 112), // #585b70 (surface2)
        border_focused_fg: Color::Rgb(137, 180, 250), // #89b4fa (blue)
        border_passthrough_fg: Color::Rgb(203, 166, 247), // #cba6f7 (mauve)

        terminal_default_bg: Color::Rgb(24, 24, 37), // #181825 (mantle)
        terminal_cursor_fg: Color::Rgb(30, 30, 46),
        terminal_cursor_bg: Color::Rgb(205, 214, 244),

        dialog_bg: Color::Rgb(49, 50, 68), // #313244 (surface0)
        dialog_border_fg: Color::Rgb(137, 180, 250),

        error_fg: Color::Rgb(243, 139, 168),   // #f38ba8 (red)
        warning_fg: Color::Rgb(249, 226, 175), // #f9e2af (yellow)
        success_fg: Color::Rgb(166, 227, 161), // #a6e3a1 (green)
        info_fg: Color::Rgb(137, 180, 250),
        accent_fg: Color::Rgb(203, 166, 247), // #cba6f7 (mauve)
        dim_fg: Color::Rgb(108, 112, 134),
    }
}

/// Light theme, Catppuccin Latte palette.
pub fn light_theme() -> ThemeColors {
    ThemeColors {
        tree_fg: Color::Rgb(76, 79, 105), // #4c4f69 (text)
        tree_selected_bg: Color::Rgb(204, 208, 218), // #ccd0da (surface1)
        tree_selected_fg: Color::Rgb(76, 79, 105),
        tree_dir_fg: Color::Rgb(30, 102, 245), // #1e66f5 (blue)
        tree_hidden_fg: Color::Rgb(156, 160, 176), // #9ca0b0 (overlay0)

        tab_bg: Color::Rgb(239, 241, 245), // #eff1f5 (base)
        tab_fg: Color::Rgb(108, 111, 133), // #6c6f85 (subtext0)
        tab_active_bg: Color::Rgb(204, 208, 218),
        tab_active_fg: Color::Rgb(76, 79, 105),
        tab_preview_fg: Color::Rgb(156, 160, 176),

        status_bg: Color::Rgb(239, 241, 245),
        status_fg: Color::Rgb(76, 79, 105),

        border_fg: Color::Rgb(172, 176, 190), // #acb0be (surface2)
        border_focused_fg: Color::Rgb(30, 102, 245),
        border_passthrough_fg: Color::Rgb(136, 57, 239), // #8839ef (mauve)

        terminal_default_bg: Color::Rgb(230, 233, 239), // #e6e9ef (mantle)
        terminal_cursor_fg: Color::Rgb(239, 241, 245),
        terminal_cursor_bg: Color::Rgb(76, 79, 105),

        dialog_bg: Color::Rgb(230, 233, 239), // #e6e9ef (surface0)
        dialog_border_fg: Color::Rgb(30, 102, 245),

        error_fg: Color::Rgb(210, 15, 57),    // #d20f39 (red)
        warning_fg: Color::Rgb(223, 142, 29), // #df8e1d (yellow)
        success_fg: Color::Rgb(64, 160, 43),  // #40a02b (green)
        info_fg: Color::Rgb(30, 102, 245),
        accent_fg: Color::Rgb(136, 57, 239),
        dim_fg: Color::Rgb(156, 160, 176),
    }
}

// ── Color parsing ────────────────────────────────────────────────────────────

/// Parse a hex color string like `"#aabbcc"` into a `ratatui::style::Color`.
/// Returns `None` for malformed input.
pub fn parse_hex_color(hex: &str) -> Option<Color> {
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Color::Rgb(r, g, b))
}

// ── Theme resolution ─────────────────────────────────────────────────────────

/// Resolve the final `ThemeColors` from config.
///
/// - `"dark"` (default): dark Catppuccin palette
/// - `"light"`: light Catppuccin palette
/// - `"custom"`: start from dark palette, then override with custom hex values
pub fn resolve_theme(config: &ThemeConfig) -> ThemeColors {
    let scheme = config.scheme.as_deref().unwrap_or("dark");
    match scheme {
        "light" => light_theme(),
        "custom" => {
            let mut theme = dark_theme();
            if let Some(custom) = &config.custom {
                apply_custom_colors(&mut theme, custom);
            }
            theme
        }
        _ => dark_theme(), // "dark" or any unrecognized value
    }
}

/// Apply custom hex color overrides on top of an existing theme.
fn apply_custom_colors(theme: &mut ThemeColors, custom: &ThemeColorsConfig) {
    let fields: [(&Option<String>, &mut Color); 8] = [
        (&custom.tree_fg, &mut theme.tree_fg),
        (&custom.tree_selected_bg, &mut theme.tree_selected_bg),
        (&custom.status_bg, &mut theme.status_bg),
        (&custom.status_fg, &mut theme.status_fg),
        (&custom.border_fg, &mut theme.border_fg),
        (&custom.border_focused_fg, &mut theme.border_focused_fg),
        (&custom.terminal_bg, &mut theme.terminal_default_bg),
        (&custom.dialog_bg, &mut theme.dialog_bg),
    ];
    for (hex, slot) in fields {
        if let Some(parsed) = hex.as_deref().and_then(parse_hex_color) {
            *slot = parsed;
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
