//! Tab strip widget: one row of `" title "` segments across the top.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

use crate::tabs::TabStrip;
use crate::theme::ThemeColors;

pub struct TabStripWidget<'a> {
    tabs: &'a TabStrip,
    theme: &'a ThemeColors,
}

impl<'a> TabStripWidget<'a> {
    pub fn new(tabs: &'a TabStrip, theme: &'a ThemeColors) -> Self {
        Self { tabs, theme }
    }
}

impl<'a> Widget for TabStripWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }
        // Fill the row with the bar background first.
        buf.set_style(area, Style::default().bg(self.theme.tab_bg));

        let mut spans = Vec::new();
        for (i, tab) in self.tabs.tabs.iter().enumerate() {
            let style = if i == self.tabs.active {
                Style::default()
                    .bg(self.theme.tab_active_bg)
                    .fg(self.theme.tab_active_fg)
                    .add_modifier(Modifier::BOLD)
            } else if !tab.pinned {
                // Preview tab: italic, dimmer.
                Style::default()
                    .bg(self.theme.tab_bg)
                    .fg(self.theme.tab_preview_fg)
                    .add_modifier(Modifier::ITALIC)
            } else {
                Style::default().bg(self.theme.tab_bg).fg(self.theme.tab_fg)
            };
            spans.push(Span::styled(format!(" {} ", tab.title), style));
        }
        buf.set_line(area.x, area.y, &Line::from(spans), area.width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme;
    use std::path::Path;

    #[test]
    fn renders_titles_in_order() {
        let mut tabs = TabStrip::default();
        tabs.open_pinned(Path::new("/a.rs"));
        tabs.open_pinned(Path::new("/b.rs"));
        let theme = theme::dark_theme();
        let area = Rect::new(0, 0, 30, 1);
        let mut buf = Buffer::empty(area);
        TabStripWidget::new(&tabs, &theme).render(area, &mut buf);
        let row: String = (0..30)
            .map(|x| {
                buf.cell((x, 0))
                    .map(|c| c.symbol().chars().next().unwrap_or(' '))
                    .unwrap_or(' ')
            })
            .collect();
        assert!(row.contains("a.rs"));
        assert!(row.contains("b.rs"));
        assert!(row.find("a.rs").unwrap() < row.find("b.rs").unwrap());
    }
}
