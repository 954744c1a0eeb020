use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::ui::Theme;

/// Help overlay showing keybindings
pub struct HelpOverlay;

impl HelpOverlay {
    pub fn render(frame: &mut Frame, theme: &Theme) {
        let area = frame.area();

        let popup_width = 52.min(area.width.saturating_sub(4));
        let popup_height = 26.min(area.height.saturating_sub(2));
        let x = area.x + (area.width.saturating_sub(popup_width)) / 2;
        let y = area.y + (area.height.saturating_sub(popup_height)) / 2;
        let popup_area = Rect::new(x, y, popup_width, popup_height);

        frame.render_widget(Clear, popup_area);

        let help_text = vec![
            Line::from(Span::styled("Wizard", theme.section_header)),
            Self::key_line(theme, "type", "Filter the list"),
            Self::key_line(theme, "↑/^P ↓", "Move selection"),
            Self::key_line(theme, "PgUp/PgDn", "Move a page"),
            Self::key_line(theme, "Enter/Tab", "Confirm"),
            Self::key_line(theme, "Esc", "Clear filter, then go back"),
            Self::key_line(theme, "Backspace", "Go back when filter is empty"),
            Self::key_line(theme, "Ctrl+N", "Change namespace"),
            Self::key_line(theme, "Ctrl+K", "Change kubeconfig"),
            Line::from(""),
            Line::from(Span::styled("Log viewer", theme.section_header)),
            Self::key_line(theme, "/ Tab", "Focus search"),
            Self::key_line(theme, "Enter", "Leave search box"),
            Self::key_line(theme, "j/k ↑/↓", "Move selection"),
            Self::key_line(theme, "Ctrl+D/U", "Half page down/up"),
            Self::key_line(theme, "g/G", "Go to top/bottom"),
            Self::key_line(theme, "f", "Toggle follow mode"),
            Self::key_line(theme, "e", "Export lines to file"),
            Self::key_line(theme, "Ctrl+L", "Clear search"),
            Self::key_line(theme, "q/Esc", "Back to actions"),
            Line::from(""),
            Self::key_line(theme, "F1", "Toggle this help"),
            Self::key_line(theme, "Ctrl+C", "Quit"),
        ];

        let help_widget = Paragraph::new(help_text).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.border_focused)
                .title(Span::styled(" Help ", theme.title)),
        );

        frame.render_widget(help_widget, popup_area);
    }

    fn key_line<'a>(theme: &Theme, key: &'a str, desc: &'a str) -> Line<'a> {
        Line::from(vec![
            Span::styled(format!("  {:>10}", key), theme.success),
            Span::styled(format!("  {}", desc), theme.text),
        ])
    }
}
