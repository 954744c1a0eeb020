use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Widget,
};

use crate::ui::Theme;

/// Status bar showing keyboard shortcuts and a transient note
pub struct StatusBar<'a> {
    theme: &'a Theme,
    hints: Vec<(&'a str, &'a str)>,
    right_text: Option<(String, Style)>,
}

impl<'a> StatusBar<'a> {
    pub fn new(theme: &'a Theme) -> Self {
        Self {
            theme,
            hints: Vec::new(),
            right_text: None,
        }
    }

    /// Add keyboard hints as (key, description) pairs
    pub fn hints<I>(mut self, hints: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        self.hints = hints.into_iter().collect();
        self
    }

    /// Set text to display on the right side
    pub fn right<S: Into<String>>(mut self, text: S, style: Style) -> Self {
        self.right_text = Some((text.into(), style));
        self
    }
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let theme = self.theme;
        buf.set_style(area, theme.status_bar);

        let mut spans = Vec::new();
        for (i, (key, desc)) in self.hints.iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled("  ", theme.status_bar));
            }
            spans.push(Span::styled(format!("[{}]", key), theme.status_bar_key));
            spans.push(Span::styled(format!(" {}", desc), theme.status_bar));
        }

        let line = Line::from(spans);
        let line_width = line.width() as u16;
        buf.set_line(area.x + 1, area.y, &line, area.width.saturating_sub(2));

        if let Some((right, style)) = self.right_text {
            let width = Line::from(right.as_str()).width() as u16;
            let right_x = area.x + area.width.saturating_sub(width + 2);
            if right_x > area.x + line_width + 2 {
                let span = Span::styled(right.as_str(), theme.status_bar.patch(style));
                buf.set_span(right_x, area.y, &span, width);
            }
        }
    }
}

/// Hints for the selector screens
pub fn selector_hints() -> Vec<(&'static str, &'static str)> {
    vec![
        ("↑/↓", "Move"),
        ("Enter", "Select"),
        ("Esc", "Back"),
        ("^N", "Namespace"),
        ("^K", "Kubeconfig"),
        ("F1", "Help"),
        ("^C", "Quit"),
    ]
}

/// Hints for the log viewer
pub fn log_viewer_hints(search_focused: bool) -> Vec<(&'static str, &'static str)> {
    if search_focused {
        vec![
            ("↑/↓", "Move"),
            ("Enter", "Done"),
            ("Tab", "Focus list"),
            ("^L", "Clear"),
            ("Esc", "Back"),
        ]
    } else {
        vec![
            ("j/k", "Move"),
            ("g/G", "Top/Bottom"),
            ("/", "Search"),
            ("f", "Follow"),
            ("e", "Export"),
            ("q", "Back"),
        ]
    }
}
