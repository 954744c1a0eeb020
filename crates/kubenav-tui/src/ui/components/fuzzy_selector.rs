use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

use super::TextInput;
use crate::fuzzy::{self, FuzzyMatch};
use crate::ui::Theme;

/// Rows shown at once
pub const MAX_VISIBLE: usize = 10;

const RECENT_HEADER: &str = "⏱ Recent";
const ALL_HEADER: &str = "📋 All";

/// Which section a row belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Section {
    Recent,
    All,
}

/// One rendered row of the visible window
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Row<'a> {
    Header(Section),
    Item {
        entry: &'a FuzzyMatch,
        section: Section,
        selected: bool,
    },
}

/// Searchable list with a recent-items section above the full list.
///
/// The cursor indexes the concatenation of filtered recent items followed by
/// filtered candidates.
#[derive(Clone, Debug)]
pub struct FuzzySelector {
    title: String,
    input: TextInput,
    candidates: Vec<String>,
    recent: Vec<String>,
    filtered_recent: Vec<FuzzyMatch>,
    filtered: Vec<FuzzyMatch>,
    cursor: usize,
    scroll_offset: usize,
    max_visible: usize,
    loading: bool,
    error: Option<String>,
    in_recent_section: bool,
}

impl FuzzySelector {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            input: TextInput::new(),
            candidates: Vec::new(),
            recent: Vec::new(),
            filtered_recent: Vec::new(),
            filtered: Vec::new(),
            cursor: 0,
            scroll_offset: 0,
            max_visible: MAX_VISIBLE,
            loading: true,
            error: None,
            in_recent_section: false,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Replace the candidate list; clears loading and error
    pub fn set_candidates(&mut self, candidates: Vec<String>) {
        self.candidates = candidates;
        self.loading = false;
        self.error = None;
        self.refilter();
    }

    pub fn set_recent(&mut self, recent: Vec<String>) {
        self.recent = recent;
        self.refilter();
    }

    pub fn set_error(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
        self.loading = false;
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
        if loading {
            self.error = None;
        }
    }

    /// Clear query and cursor; candidates stay
    pub fn reset(&mut self) {
        self.input.clear();
        self.cursor = 0;
        self.scroll_offset = 0;
        self.refilter();
    }

    pub fn query(&self) -> &str {
        self.input.value()
    }

    pub fn clear_query(&mut self) {
        self.input.clear();
        self.refilter();
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    /// Filtered recent items followed by filtered candidates
    pub fn total(&self) -> usize {
        self.filtered_recent.len() + self.filtered.len()
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn filtered(&self) -> &[FuzzyMatch] {
        &self.filtered
    }

    pub fn filtered_recent(&self) -> &[FuzzyMatch] {
        &self.filtered_recent
    }

    /// Item under the cursor
    pub fn current_selection(&self) -> Option<&str> {
        let recent_len = self.filtered_recent.len();
        if self.in_recent_section && self.cursor < recent_len {
            return self.filtered_recent.get(self.cursor).map(|m| m.text.as_str());
        }
        self.filtered
            .get(self.cursor.saturating_sub(recent_len))
            .map(|m| m.text.as_str())
    }

    /// Recompute both filtered lists from the current query. Candidates
    /// already listed as recent are left out of the full list.
    fn refilter(&mut self) {
        let query = self.input.value();
        let rest: Vec<String> = self
            .candidates
            .iter()
            .filter(|c| !self.recent.contains(c))
            .cloned()
            .collect();
        self.filtered_recent = fuzzy::find(query, &self.recent);
        self.filtered = fuzzy::find(query, &rest);

        if self.cursor >= self.total() {
            self.cursor = 0;
            self.scroll_offset = 0;
        }
        self.sync_section();
        self.ensure_visible();
    }

    fn sync_section(&mut self) {
        self.in_recent_section = self.cursor < self.filtered_recent.len();
    }

    /// Scroll only when the cursor leaves the window
    fn ensure_visible(&mut self) {
        if self.cursor < self.scroll_offset {
            self.scroll_offset = self.cursor;
        } else if self.cursor >= self.scroll_offset + self.max_visible {
            self.scroll_offset = self.cursor + 1 - self.max_visible;
        }
        let max_offset = self.total().saturating_sub(self.max_visible);
        self.scroll_offset = self.scroll_offset.min(max_offset);
    }

    fn move_cursor(&mut self, delta: isize) {
        let total = self.total();
        if total == 0 {
            return;
        }
        let target = self.cursor as isize + delta;
        self.cursor = target.clamp(0, total as isize - 1) as usize;
        self.sync_section();
        self.ensure_visible();
    }

    pub fn move_up(&mut self) {
        self.move_cursor(-1);
    }

    pub fn move_down(&mut self) {
        self.move_cursor(1);
    }

    /// Navigation and query editing. Returns true when the query changed.
    pub fn handle_key(&mut self, key: &KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Up => self.move_up(),
            KeyCode::Char('p') if ctrl => self.move_up(),
            KeyCode::Down => self.move_down(),
            KeyCode::PageUp => self.move_cursor(-(self.max_visible as isize)),
            KeyCode::PageDown => self.move_cursor(self.max_visible as isize),
            _ => {
                if self.input.handle_key(key) {
                    self.cursor = 0;
                    self.scroll_offset = 0;
                    self.refilter();
                    return true;
                }
            }
        }
        false
    }

    /// Rows of the visible window with section headers interleaved
    pub fn visible_rows(&self) -> Vec<Row<'_>> {
        let recent_len = self.filtered_recent.len();
        let end = (self.scroll_offset + self.max_visible).min(self.total());
        let mut rows = Vec::new();

        for i in self.scroll_offset..end {
            if i < recent_len {
                if i == self.scroll_offset {
                    rows.push(Row::Header(Section::Recent));
                }
                rows.push(Row::Item {
                    entry: &self.filtered_recent[i],
                    section: Section::Recent,
                    selected: i == self.cursor,
                });
            } else {
                if i == recent_len || i == self.scroll_offset {
                    rows.push(Row::Header(Section::All));
                }
                rows.push(Row::Item {
                    entry: &self.filtered[i - recent_len],
                    section: Section::All,
                    selected: i == self.cursor,
                });
            }
        }
        rows
    }

    pub fn input(&self) -> &TextInput {
        &self.input
    }
}

/// Renders a [`FuzzySelector`]
pub struct SelectorView<'a> {
    selector: &'a FuzzySelector,
    theme: &'a Theme,
}

impl<'a> SelectorView<'a> {
    pub fn new(selector: &'a FuzzySelector, theme: &'a Theme) -> Self {
        Self { selector, theme }
    }

    fn item_line(&self, entry: &'a FuzzyMatch, selected: bool) -> Line<'a> {
        let theme = self.theme;
        let base = if selected {
            theme.list_item_selected
        } else {
            theme.list_item
        };
        let marker = if selected { "▶ " } else { "  " };

        let mut spans = vec![Span::styled(marker, base)];
        for (i, c) in entry.text.chars().enumerate() {
            let style = if entry.positions.contains(&i) {
                base.patch(theme.fuzzy_match)
            } else {
                base
            };
            spans.push(Span::styled(c.to_string(), style));
        }
        Line::from(spans)
    }
}

impl Widget for SelectorView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let selector = self.selector;
        let theme = self.theme;

        let mut lines = vec![
            Line::from(Span::styled(selector.title.as_str(), theme.title)),
            Line::from(""),
            selector
                .input
                .line("> ", "Type to filter...", true, theme),
            Line::from(""),
        ];

        if selector.loading {
            lines.push(Line::from(Span::styled("Loading...", theme.text_dim)));
        } else if let Some(err) = &selector.error {
            lines.push(Line::from(Span::styled(format!("Error: {}", err), theme.error)));
        } else if selector.total() == 0 {
            let text = if selector.candidates.is_empty() && selector.recent.is_empty() {
                "No items available"
            } else {
                "No matches found"
            };
            lines.push(Line::from(Span::styled(text, theme.text_dim)));
        } else {
            for row in selector.visible_rows() {
                match row {
                    Row::Header(Section::Recent) => {
                        lines.push(Line::from(Span::styled(RECENT_HEADER, theme.section_header)))
                    }
                    Row::Header(Section::All) => {
                        lines.push(Line::from(Span::styled(ALL_HEADER, theme.section_header)))
                    }
                    Row::Item {
                        entry, selected, ..
                    } => lines.push(self.item_line(entry, selected)),
                }
            }

            if selector.total() > selector.max_visible {
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    format!("[{}/{}]", selector.cursor + 1, selector.total()),
                    theme.text_dim,
                )));
            }
        }

        Paragraph::new(lines).render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{Terminal, backend::TestBackend};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_str(selector: &mut FuzzySelector, text: &str) {
        for c in text.chars() {
            selector.handle_key(&key(KeyCode::Char(c)));
        }
    }

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("item-{:02}", i)).collect()
    }

    #[test]
    fn test_query_filters_and_resets_cursor() {
        let mut selector = FuzzySelector::new("Select");
        selector.set_candidates(vec!["alpha".into(), "beta".into(), "gamma".into()]);
        selector.move_down();
        assert_eq!(selector.cursor(), 1);

        type_str(&mut selector, "a");
        assert_eq!(selector.total(), 3);
        assert_eq!(selector.cursor(), 0);
        assert_eq!(selector.current_selection(), Some("alpha"));
    }

    #[test]
    fn test_cursor_stays_in_bounds() {
        let mut selector = FuzzySelector::new("Select");
        selector.set_candidates(names(3));
        for _ in 0..10 {
            selector.move_down();
        }
        assert_eq!(selector.cursor(), 2);
        for _ in 0..10 {
            selector.move_up();
        }
        assert_eq!(selector.cursor(), 0);
    }

    #[test]
    fn test_empty_list_has_no_selection() {
        let mut selector = FuzzySelector::new("Select");
        selector.set_candidates(Vec::new());
        selector.move_down();
        assert_eq!(selector.cursor(), 0);
        assert_eq!(selector.current_selection(), None);
    }

    #[test]
    fn test_recent_section_comes_first() {
        let mut selector = FuzzySelector::new("Select");
        selector.set_candidates(vec!["api".into(), "web".into(), "worker".into()]);
        selector.set_recent(vec!["web".into()]);

        assert_eq!(selector.total(), 3);
        assert_eq!(selector.current_selection(), Some("web"));
        selector.move_down();
        assert_eq!(selector.current_selection(), Some("api"));
        selector.move_down();
        assert_eq!(selector.current_selection(), Some("worker"));

        let rows = selector.visible_rows();
        assert_eq!(rows[0], Row::Header(Section::Recent));
        assert_eq!(rows[2], Row::Header(Section::All));
    }

    #[test]
    fn test_recent_and_all_filtered_separately() {
        let mut selector = FuzzySelector::new("Select");
        selector.set_candidates(vec!["alpha".into(), "beta".into(), "gamma".into()]);
        selector.set_recent(vec!["beta".into()]);
        type_str(&mut selector, "al");

        assert!(selector.filtered_recent().is_empty());
        let all: Vec<_> = selector.filtered().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(all, vec!["alpha"]);
        assert_eq!(selector.current_selection(), Some("alpha"));
    }

    #[test]
    fn test_cursor_resets_when_list_shrinks() {
        let mut selector = FuzzySelector::new("Select");
        selector.set_candidates(names(5));
        for _ in 0..4 {
            selector.move_down();
        }
        selector.set_candidates(names(2));
        assert_eq!(selector.cursor(), 0);

        selector.move_down();
        selector.set_candidates(names(4));
        assert_eq!(selector.cursor(), 1);
    }

    #[test]
    fn test_refilter_is_idempotent() {
        let mut selector = FuzzySelector::new("Select");
        selector.set_candidates(vec!["api-gateway".into(), "payments".into(), "gateway".into()]);
        type_str(&mut selector, "gw");
        let first = selector.filtered().to_vec();
        selector.set_recent(Vec::new());
        assert_eq!(selector.filtered(), first.as_slice());
    }

    #[test]
    fn test_scroll_follows_cursor_lazily() {
        let mut selector = FuzzySelector::new("Select");
        selector.set_candidates(names(25));

        for _ in 0..9 {
            selector.move_down();
        }
        assert_eq!(selector.scroll_offset(), 0);
        selector.move_down();
        assert_eq!(selector.cursor(), 10);
        assert_eq!(selector.scroll_offset(), 1);

        // Moving back up inside the window does not scroll
        selector.move_up();
        assert_eq!(selector.scroll_offset(), 1);

        selector.handle_key(&key(KeyCode::PageDown));
        assert_eq!(selector.cursor(), 19);
        assert!(selector.cursor() >= selector.scroll_offset());
        assert!(selector.cursor() < selector.scroll_offset() + MAX_VISIBLE);
    }

    #[test]
    fn test_all_header_when_scrolled_past_recent() {
        let mut selector = FuzzySelector::new("Select");
        selector.set_candidates(names(20));
        selector.set_recent(vec!["item-05".into()]);
        for _ in 0..12 {
            selector.move_down();
        }
        let rows = selector.visible_rows();
        assert_eq!(rows[0], Row::Header(Section::All));
        let items = rows.iter().filter(|r| matches!(r, Row::Item { .. })).count();
        assert_eq!(items, MAX_VISIBLE);
    }

    #[test]
    fn test_error_clears_loading() {
        let mut selector = FuzzySelector::new("Select");
        assert!(selector.is_loading());
        selector.set_error("forbidden");
        assert!(!selector.is_loading());
        assert_eq!(selector.error(), Some("forbidden"));

        selector.set_candidates(names(1));
        assert_eq!(selector.error(), None);
    }

    #[test]
    fn test_render_shows_headers_and_counter() {
        let mut selector = FuzzySelector::new("Select deployment");
        selector.set_candidates(names(12));
        selector.set_recent(vec!["item-03".into()]);
        let theme = Theme::default();

        let mut terminal = Terminal::new(TestBackend::new(40, 20)).unwrap();
        terminal
            .draw(|f| f.render_widget(SelectorView::new(&selector, &theme), f.area()))
            .unwrap();

        let buffer = terminal.backend().buffer();
        let text: String = buffer.content().iter().map(|c| c.symbol()).collect();
        assert!(text.contains("Select deployment"));
        assert!(text.contains("Recent"));
        assert!(text.contains("All"));
        assert!(text.contains("[1/12]"));
    }

    #[test]
    fn test_render_loading() {
        let selector = FuzzySelector::new("Select namespace");
        let theme = Theme::default();
        let mut terminal = Terminal::new(TestBackend::new(30, 8)).unwrap();
        terminal
            .draw(|f| f.render_widget(SelectorView::new(&selector, &theme), f.area()))
            .unwrap();
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(text.contains("Loading..."));
    }
}
