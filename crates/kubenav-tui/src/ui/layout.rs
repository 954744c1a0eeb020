use ratatui::layout::{Constraint, Direction, Layout as RatatuiLayout, Rect};

/// Layout helper for consistent screen layouts
pub struct Layout;

/// Areas of the log viewer screen
pub struct LogViewerAreas {
    pub search: Rect,
    pub hint: Rect,
    pub list: Rect,
    pub detail: Rect,
    pub status: Rect,
}

impl Layout {
    /// Create the main layout with header, content, and status bar
    pub fn main(area: Rect) -> (Rect, Rect, Rect) {
        let chunks = RatatuiLayout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(1),    // Content
                Constraint::Length(1), // Status bar
            ])
            .split(area);

        (chunks[0], chunks[1], chunks[2])
    }

    /// Create a centered content area (for wizard steps)
    pub fn centered(area: Rect, width_percent: u16) -> Rect {
        let horizontal = RatatuiLayout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage((100 - width_percent) / 2),
                Constraint::Percentage(width_percent),
                Constraint::Percentage((100 - width_percent) / 2),
            ])
            .split(area);

        let vertical = RatatuiLayout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(1),
                Constraint::Length(1),
            ])
            .split(horizontal[1]);

        vertical[1]
    }

    /// Split the log viewer: search bar, hint, list pane (`list_rows` inner
    /// rows), detail pane and status bar
    pub fn log_viewer(area: Rect, list_rows: usize) -> LogViewerAreas {
        let list_height = (list_rows as u16).saturating_add(2);
        let chunks = RatatuiLayout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),           // Search bar
                Constraint::Length(1),           // Recent searches
                Constraint::Length(list_height), // Matching lines
                Constraint::Min(3),              // Full entry
                Constraint::Length(1),           // Status bar
            ])
            .split(area);

        LogViewerAreas {
            search: chunks[0],
            hint: chunks[1],
            list: chunks[2],
            detail: chunks[3],
            status: chunks[4],
        }
    }
}
