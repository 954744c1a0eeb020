use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::text::{Line, Span};

use crate::ui::Theme;

/// Single-line editable text with a cursor
#[derive(Clone, Debug, Default)]
pub struct TextInput {
    value: String,
    /// Cursor position in chars
    cursor: usize,
    char_limit: Option<usize>,
}

impl TextInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_char_limit(mut self, limit: usize) -> Self {
        self.char_limit = Some(limit);
        self
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn set_value(&mut self, value: &str) {
        self.value = value.to_string();
        self.cursor = self.value.chars().count();
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    fn byte_offset(&self, char_index: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    fn len(&self) -> usize {
        self.value.chars().count()
    }

    /// Apply an editing key. Returns true when the value changed.
    pub fn handle_key(&mut self, key: &KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('w') if ctrl => self.delete_word(),
            KeyCode::Char('a') if ctrl => {
                self.cursor = 0;
                false
            }
            KeyCode::Char('e') if ctrl => {
                self.cursor = self.len();
                false
            }
            KeyCode::Char(_) if ctrl || key.modifiers.contains(KeyModifiers::ALT) => false,
            KeyCode::Char(c) => self.insert(c),
            KeyCode::Backspace => {
                if self.cursor == 0 {
                    return false;
                }
                self.cursor -= 1;
                let at = self.byte_offset(self.cursor);
                self.value.remove(at);
                true
            }
            KeyCode::Delete => {
                if self.cursor >= self.len() {
                    return false;
                }
                let at = self.byte_offset(self.cursor);
                self.value.remove(at);
                true
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                false
            }
            KeyCode::Right => {
                self.cursor = (self.cursor + 1).min(self.len());
                false
            }
            KeyCode::Home => {
                self.cursor = 0;
                false
            }
            KeyCode::End => {
                self.cursor = self.len();
                false
            }
            _ => false,
        }
    }

    fn insert(&mut self, c: char) -> bool {
        if self.char_limit.is_some_and(|limit| self.len() >= limit) {
            return false;
        }
        let at = self.byte_offset(self.cursor);
        self.value.insert(at, c);
        self.cursor += 1;
        true
    }

    fn delete_word(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        let chars: Vec<char> = self.value.chars().collect();
        let mut start = self.cursor;
        while start > 0 && chars[start - 1] == ' ' {
            start -= 1;
        }
        while start > 0 && chars[start - 1] != ' ' {
            start -= 1;
        }
        let from = self.byte_offset(start);
        let to = self.byte_offset(self.cursor);
        self.value.replace_range(from..to, "");
        self.cursor = start;
        true
    }

    /// Render as a line: prompt, text and a block cursor when focused
    pub fn line<'a>(&'a self, prompt: &'a str, placeholder: &'a str, focused: bool, theme: &Theme) -> Line<'a> {
        let mut spans = vec![Span::styled(prompt, theme.prompt)];

        if self.value.is_empty() {
            if focused {
                spans.push(Span::styled(" ", theme.cursor));
            }
            spans.push(Span::styled(placeholder, theme.text_dim));
            return Line::from(spans);
        }

        if !focused {
            spans.push(Span::styled(self.value.as_str(), theme.text));
            return Line::from(spans);
        }

        let at = self.byte_offset(self.cursor);
        let (before, rest) = self.value.split_at(at);
        spans.push(Span::styled(before, theme.text));
        let mut rest_chars = rest.chars();
        match rest_chars.next() {
            Some(c) => {
                let cursor_len = c.len_utf8();
                spans.push(Span::styled(&rest[..cursor_len], theme.cursor));
                spans.push(Span::styled(&rest[cursor_len..], theme.text));
            }
            None => spans.push(Span::styled(" ", theme.cursor)),
        }
        Line::from(spans)
    }
}
