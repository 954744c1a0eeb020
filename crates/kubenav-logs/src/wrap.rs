use std::borrow::Cow;

use unicode_width::UnicodeWidthChar;

const ELLIPSIS: &str = "...";

/// Characters a wrapped line may break after
fn is_break(c: char) -> bool {
    c.is_whitespace() || matches!(c, ',' | ';' | ':')
}

fn char_width(c: char) -> usize {
    c.width().unwrap_or(0)
}

/// Cut `text` to at most `width` columns, marking the cut with "..."
pub fn truncate(text: &str, width: usize) -> Cow<'_, str> {
    let total: usize = text.chars().map(char_width).sum();
    if total <= width {
        return Cow::Borrowed(text);
    }
    if width <= ELLIPSIS.len() {
        return Cow::Owned(".".repeat(width));
    }

    let budget = width - ELLIPSIS.len();
    let mut used = 0;
    let mut out = String::new();
    for c in text.chars() {
        let w = char_width(c);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push_str(ELLIPSIS);
    Cow::Owned(out)
}

/// Wrap `text` into lines of at most `width` columns.
///
/// A line is broken after whitespace or punctuation when one occurs in the
/// second half of the line; otherwise it is cut at the width.
pub fn word_wrap(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    for raw in text.lines() {
        let chars: Vec<char> = raw.chars().collect();
        if chars.is_empty() {
            lines.push(String::new());
            continue;
        }

        let mut start = 0;
        while start < chars.len() {
            // Longest prefix that fits
            let mut end = start;
            let mut used = 0;
            while end < chars.len() {
                let w = char_width(chars[end]);
                if used + w > width && end > start {
                    break;
                }
                used += w;
                end += 1;
            }

            if end < chars.len() {
                let half = start + (end - start) / 2;
                if let Some(pos) = (half..end).rev().find(|&i| is_break(chars[i])) {
                    end = pos + 1;
                }
            }

            let line: String = chars[start..end].iter().collect();
            lines.push(line.trim_end().to_string());
            start = end;
            while start < chars.len() && chars[start] == ' ' {
                start += 1;
            }
        }
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_text_unchanged() {
        assert!(matches!(truncate("short", 10), Cow::Borrowed("short")));
    }

    #[test]
    fn test_truncate_adds_marker() {
        assert_eq!(truncate("abcdefghij", 8), "abcde...");
        assert_eq!(truncate("abcdefghij", 2), "..");
    }

    #[test]
    fn test_wrap_prefers_spaces() {
        let lines = word_wrap("the quick brown fox jumps", 10);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps"]);
    }

    #[test]
    fn test_wrap_breaks_after_punctuation() {
        let lines = word_wrap("key=value,other=thing", 12);
        assert_eq!(lines, vec!["key=value,", "other=thing"]);
    }

    #[test]
    fn test_wrap_hard_breaks_long_words() {
        let lines = word_wrap("abcdefghijkl", 5);
        assert_eq!(lines, vec!["abcde", "fghij", "kl"]);
    }

    #[test]
    fn test_wrap_lines_fit_width() {
        let text = "level=error msg=\"connection refused\" host=db-0.internal:5432 retry=3";
        for line in word_wrap(text, 16) {
            assert!(line.chars().count() <= 16, "{:?}", line);
        }
    }
}
