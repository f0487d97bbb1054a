//! One-line status bar: transient messages, focus and mode indicators.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

use crate::theme::ThemeColors;

pub struct StatusBarWidget<'a> {
    focus_label: &'a str,
    root: &'a str,
    theme: &'a ThemeColors,
    status_message: Option<&'a str>,
    is_error: bool,
    passthrough: bool,
    idle: bool,
}

impl<'a> StatusBarWidget<'a> {
    pub fn new(focus_label: &'a str, root: &'a str, theme: &'a ThemeColors) -> Self {
        Self {
            focus_label,
            root,
            theme,
            status_message: None,
            is_error: false,
            passthrough: false,
            idle: false,
        }
    }

    pub fn status_message(mut self, msg: &'a str, is_error: bool) -> Self {
        self.status_message = Some(msg);
        self.is_error = is_error;
        self
    }

    pub fn passthrough(mut self, on: bool) -> Self {
        self.passthrough = on;
        self
    }

    pub fn idle(mut self, idle: bool) -> Self {
        self.idle = idle;
        self
    }
}

impl<'a> Widget for StatusBarWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }
        buf.set_style(
            area,
            Style::default()
                .bg(self.theme.status_bg)
                .fg(self.theme.status_fg),
        );

        // A transient message takes the whole row.
        if let Some(msg) = self.status_message {
            let style = if self.is_error {
                Style::default()
                    .bg(self.theme.status_bg)
                    .fg(self.theme.error_fg)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
                    .bg(self.theme.status_bg)
                    .fg(self.theme.success_fg)
            };
            buf.set_string(area.x + 1, area.y, msg, style);
            return;
        }

        let mut spans = vec![
            Span::styled(
                format!(" {} ", self.focus_label),
                Style::default()
                    .bg(self.theme.tab_active_bg)
                    .fg(self.theme.tab_active_fg)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" "),
            Span::styled(self.root, Style::default().fg(self.theme.dim_fg)),
        ];
        if self.passthrough {
            spans.push(Span::raw("  "));
            spans.push(Span::styled(
                "PASSTHROUGH (Ctrl+\\ twice to exit)",
                Style::default()
                    .fg(self.theme.border_passthrough_fg)
                    .add_modifier(Modifier::BOLD),
            ));
        }
        if self.idle {
            spans.push(Span::raw("  "));
            spans.push(Span::styled(
                "idle",
                Style::default()
                    .fg(self.theme.dim_fg)
                    .add_modifier(Modifier::DIM),
            ));
        }
        buf.set_line(area.x, area.y, &Line::from(spans), area.width);
    }
}
