use crate::filter::LineFilter;

/// Append-only log lines with a filtered view kept in sync.
///
/// The filtered view holds indices into the full line list, so it is always
/// an order-preserving subsequence of it.
#[derive(Clone, Debug, Default)]
pub struct LogBuffer {
    /// Every line received, in arrival order
    lines: Vec<String>,

    /// Indices of lines matching the current filter
    visible: Vec<usize>,

    filter: LineFilter,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all content with the lines of `text`
    pub fn set_content(&mut self, text: &str) {
        self.lines = text.lines().map(str::to_string).collect();
        self.refilter();
    }

    /// Append one line. Returns true when it is visible under the current filter.
    pub fn push(&mut self, line: String) -> bool {
        let matched = self.filter.matches(&line);
        self.lines.push(line);
        if matched {
            self.visible.push(self.lines.len() - 1);
        }
        matched
    }

    /// Change the search query. Returns true if the query actually changed.
    pub fn set_query(&mut self, query: &str) -> bool {
        if self.filter.query() == query {
            return false;
        }
        self.filter = LineFilter::new(query);
        self.refilter();
        true
    }

    fn refilter(&mut self) {
        self.visible = self
            .lines
            .iter()
            .enumerate()
            .filter(|(_, line)| self.filter.matches(line))
            .map(|(i, _)| i)
            .collect();
    }

    pub fn query(&self) -> &str {
        self.filter.query()
    }

    pub fn filter(&self) -> &LineFilter {
        &self.filter
    }

    /// Number of lines received
    pub fn total_len(&self) -> usize {
        self.lines.len()
    }

    /// Number of lines matching the filter
    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    /// The `index`-th visible line
    pub fn visible_line(&self, index: usize) -> Option<&str> {
        self.visible
            .get(index)
            .and_then(|&i| self.lines.get(i))
            .map(String::as_str)
    }

    /// Visible lines in order
    pub fn visible_lines(&self) -> impl Iterator<Item = &str> {
        self.visible.iter().map(|&i| self.lines[i].as_str())
    }
}
