use ratatui::style::{Color, Modifier, Style};

/// Color theme for the application, built once and passed to every renderer
#[derive(Clone, Debug)]
pub struct Theme {
    // Border styles
    pub border: Style,
    pub border_focused: Style,

    // Text styles
    pub title: Style,
    pub text: Style,
    pub text_dim: Style,
    pub prompt: Style,
    pub cursor: Style,

    // List styles
    pub list_item: Style,
    pub list_item_selected: Style,
    pub section_header: Style,
    pub fuzzy_match: Style,
    pub search_match: Style,

    // Status
    pub success: Style,
    pub warning: Style,
    pub error: Style,
    pub live: Style,

    // Status bar
    pub status_bar: Style,
    pub status_bar_key: Style,
}

impl Theme {
    // Base colors
    pub const BG: Color = Color::Reset;
    pub const FG: Color = Color::White;
    pub const FG_DIM: Color = Color::DarkGray;

    // Accent colors
    pub const PRIMARY: Color = Color::Cyan;
    pub const SECONDARY: Color = Color::Magenta;
    pub const HIGHLIGHT: Color = Color::Yellow;

    // Status colors
    pub const SUCCESS: Color = Color::Green;
    pub const WARNING: Color = Color::Yellow;
    pub const ERROR: Color = Color::Red;
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            border: Style::default().fg(Self::FG_DIM),
            border_focused: Style::default().fg(Self::PRIMARY),

            title: Style::default().fg(Self::PRIMARY).add_modifier(Modifier::BOLD),
            text: Style::default().fg(Self::FG),
            text_dim: Style::default().fg(Self::FG_DIM),
            prompt: Style::default().fg(Self::SECONDARY).add_modifier(Modifier::BOLD),
            cursor: Style::default().add_modifier(Modifier::REVERSED),

            list_item: Style::default().fg(Self::FG),
            list_item_selected: Style::default()
                .fg(Self::PRIMARY)
                .add_modifier(Modifier::BOLD),
            section_header: Style::default().fg(Self::SECONDARY).add_modifier(Modifier::BOLD),
            fuzzy_match: Style::default()
                .fg(Self::HIGHLIGHT)
                .add_modifier(Modifier::BOLD),
            search_match: Style::default()
                .fg(Color::Black)
                .bg(Self::HIGHLIGHT)
                .add_modifier(Modifier::BOLD),

            success: Style::default().fg(Self::SUCCESS).add_modifier(Modifier::BOLD),
            warning: Style::default().fg(Self::WARNING),
            error: Style::default().fg(Self::ERROR).add_modifier(Modifier::BOLD),
            live: Style::default().fg(Self::ERROR).add_modifier(Modifier::BOLD),

            status_bar: Style::default().fg(Self::FG_DIM).bg(Color::DarkGray),
            status_bar_key: Style::default()
                .fg(Self::HIGHLIGHT)
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        }
    }
}
