use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use kubenav_logs::{LogBuffer, word_wrap};

use super::TextInput;

/// Rows used by everything except the two panes: search bar, hint line,
/// status bar and the four block borders
const CHROME_ROWS: u16 = 7;

/// Minimum rows of the line list pane
const MIN_LIST_ROWS: usize = 3;

/// Columns taken by pane borders and padding
const PANE_CHROME_COLS: u16 = 4;

/// Searchable log view: a filtered line list plus a wrapped detail pane for
/// the selected line.
#[derive(Clone, Debug)]
pub struct LogViewer {
    buffer: LogBuffer,
    search: TextInput,
    search_focused: bool,
    /// Index into the filtered lines
    selected: usize,
    list_offset: usize,
    width: u16,
    list_height: usize,
    detail_height: usize,
    streaming: bool,
    auto_follow: bool,
    recent_searches: Vec<String>,
    title: String,
}

impl LogViewer {
    pub fn new(title: impl Into<String>) -> Self {
        let mut viewer = Self {
            buffer: LogBuffer::new(),
            search: TextInput::new().with_char_limit(256),
            search_focused: true,
            selected: 0,
            list_offset: 0,
            width: 80,
            list_height: MIN_LIST_ROWS,
            detail_height: 1,
            streaming: false,
            auto_follow: false,
            recent_searches: Vec::new(),
            title: title.into(),
        };
        viewer.set_size(80, 24);
        viewer
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Recompute pane sizes for a terminal of the given size
    pub fn set_size(&mut self, width: u16, height: u16) {
        self.width = width;
        let body = height.saturating_sub(CHROME_ROWS) as usize;
        self.list_height = (body * 6 / 10).max(MIN_LIST_ROWS);
        self.detail_height = body.saturating_sub(self.list_height).max(1);
        self.ensure_visible();
    }

    pub fn list_height(&self) -> usize {
        self.list_height
    }

    pub fn detail_height(&self) -> usize {
        self.detail_height
    }

    /// Columns available for a line in the list pane
    pub fn list_width(&self) -> usize {
        self.width.saturating_sub(PANE_CHROME_COLS) as usize
    }

    /// Columns available in the detail pane
    pub fn detail_width(&self) -> usize {
        self.width.saturating_sub(PANE_CHROME_COLS) as usize
    }

    /// Replace all content with a one-shot log fetch
    pub fn set_static_content(&mut self, text: &str) {
        self.buffer.set_content(text);
        self.selected = 0;
        self.list_offset = 0;
        if self.auto_follow {
            self.select_last();
        }
    }

    /// Append one streamed line
    pub fn append_line(&mut self, line: String) {
        self.buffer.push(line);
        if self.auto_follow {
            self.select_last();
        }
    }

    /// Streaming mode also drives auto-follow
    pub fn set_streaming(&mut self, streaming: bool) {
        self.streaming = streaming;
        self.auto_follow = streaming;
        if streaming {
            self.select_last();
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    pub fn is_following(&self) -> bool {
        self.auto_follow
    }

    /// Pause or resume auto-follow while streaming
    pub fn toggle_follow(&mut self) {
        if !self.streaming {
            return;
        }
        self.auto_follow = !self.auto_follow;
        if self.auto_follow {
            self.select_last();
        }
    }

    pub fn set_recent_searches(&mut self, recent: Vec<String>) {
        self.recent_searches = recent;
    }

    pub fn recent_searches(&self) -> &[String] {
        &self.recent_searches
    }

    pub fn search_query(&self) -> &str {
        self.buffer.query()
    }

    pub fn search_input(&self) -> &TextInput {
        &self.search
    }

    pub fn is_search_focused(&self) -> bool {
        self.search_focused
    }

    pub fn focus_search(&mut self) {
        self.search_focused = true;
    }

    pub fn blur_search(&mut self) {
        self.search_focused = false;
    }

    pub fn buffer(&self) -> &LogBuffer {
        &self.buffer
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_line(&self) -> Option<&str> {
        self.buffer.visible_line(self.selected)
    }

    /// Indices of filtered lines currently in the list window
    pub fn visible_range(&self) -> std::ops::Range<usize> {
        let end = (self.list_offset + self.list_height).min(self.buffer.visible_len());
        self.list_offset..end.max(self.list_offset)
    }

    /// The selected line wrapped to the detail pane width
    pub fn detail_lines(&self) -> Vec<String> {
        match self.selected_line() {
            Some(line) => word_wrap(line, self.detail_width()),
            None => Vec::new(),
        }
    }

    fn select_last(&mut self) {
        self.selected = self.buffer.visible_len().saturating_sub(1);
        self.ensure_visible();
    }

    fn select_first(&mut self) {
        self.selected = 0;
        self.ensure_visible();
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.buffer.visible_len();
        if len == 0 {
            return;
        }
        let target = self.selected as isize + delta;
        self.selected = target.clamp(0, len as isize - 1) as usize;
        self.ensure_visible();
    }

    /// Scroll only when the selection leaves the window
    fn ensure_visible(&mut self) {
        if self.selected < self.list_offset {
            self.list_offset = self.selected;
        } else if self.selected >= self.list_offset + self.list_height {
            self.list_offset = self.selected + 1 - self.list_height;
        }
    }

    fn apply_query(&mut self) {
        if !self.buffer.set_query(self.search.value()) {
            return;
        }
        if self.auto_follow {
            self.select_last();
            return;
        }
        if self.selected >= self.buffer.visible_len() {
            self.selected = 0;
            self.list_offset = 0;
        }
        self.ensure_visible();
    }

    pub fn clear_search(&mut self) {
        self.search.clear();
        self.apply_query();
    }

    /// Handle a key routed to the viewer
    pub fn handle_key(&mut self, key: &KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let typing = self.search_focused;
        let half_page = (self.list_height / 2).max(1) as isize;

        match key.code {
            KeyCode::Up => self.move_selection(-1),
            KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') if !ctrl => self.move_selection(-1),
            KeyCode::Char('j') if !ctrl => self.move_selection(1),
            KeyCode::PageUp => self.move_selection(-half_page),
            KeyCode::PageDown => self.move_selection(half_page),
            KeyCode::Char('u') if ctrl => self.move_selection(-half_page),
            KeyCode::Char('d') if ctrl => self.move_selection(half_page),
            KeyCode::Char('l') if ctrl => self.clear_search(),
            KeyCode::Home if !typing => self.select_first(),
            KeyCode::End if !typing => self.select_last(),
            KeyCode::Char('g') if !typing => self.select_first(),
            KeyCode::Char('G') if !typing => self.select_last(),
            KeyCode::Char('f') if !typing => self.toggle_follow(),
            KeyCode::Char('/') if !typing => self.focus_search(),
            KeyCode::Tab => self.search_focused = !self.search_focused,
            KeyCode::Enter if typing => self.blur_search(),
            _ if typing => {
                if self.search.handle_key(key) {
                    self.apply_query();
                }
            }
            _ => {}
        }
    }
}
