/// Case-insensitive substring filter for log lines
#[derive(Clone, Debug, Default)]
pub struct LineFilter {
    /// Original query text
    query: String,

    /// Lowercased query characters
    folded: Vec<char>,
}

fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

impl LineFilter {
    pub fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            folded: query.chars().map(fold).collect(),
        }
    }

    /// The query as typed
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Check if filter is empty (matches everything)
    pub fn is_empty(&self) -> bool {
        self.folded.is_empty()
    }

    /// Check if a line contains the query
    pub fn matches(&self, line: &str) -> bool {
        self.is_empty() || self.scan(line, true).next().is_some()
    }

    /// Byte ranges of every non-overlapping occurrence, left to right
    pub fn find_matches(&self, text: &str) -> Vec<(usize, usize)> {
        if self.is_empty() {
            return Vec::new();
        }
        self.scan(text, false).collect()
    }

    fn scan<'a>(&'a self, text: &'a str, first_only: bool) -> impl Iterator<Item = (usize, usize)> + 'a {
        let chars: Vec<(usize, char)> = text.char_indices().collect();
        let n = self.folded.len();
        let mut i = 0;
        let mut done = false;

        std::iter::from_fn(move || {
            if done || n == 0 {
                return None;
            }
            while i + n <= chars.len() {
                let hit = (0..n).all(|k| fold(chars[i + k].1) == self.folded[k]);
                if hit {
                    let start = chars[i].0;
                    let end = chars.get(i + n).map(|c| c.0).unwrap_or(text.len());
                    i += n;
                    done = first_only;
                    return Some((start, end));
                }
                i += 1;
            }
            None
        })
    }
}
