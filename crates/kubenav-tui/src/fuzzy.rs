//! Subsequence fuzzy matching for selector filtering

const FIRST_CHAR_BONUS: i64 = 10;
const SEPARATOR_BONUS: i64 = 20;
const CAMEL_CASE_BONUS: i64 = 20;
const ADJACENT_BONUS: i64 = 5;
const LEADING_CHAR_PENALTY: i64 = -5;
const MAX_LEADING_PENALTY: i64 = -15;
const UNMATCHED_CHAR_PENALTY: i64 = -1;

/// A candidate that matched a query
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FuzzyMatch {
    pub text: String,
    /// Position of the candidate in the input list
    pub index: usize,
    /// Char offsets of the matched query characters, strictly increasing
    pub positions: Vec<usize>,
    pub score: i64,
}

fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

fn is_separator(c: char) -> bool {
    matches!(c, ' ' | '-' | '_' | '.' | '/' | ':' | '\\')
}

/// Score `candidate` against `query`, returning `None` unless every query
/// character appears in order (case-insensitive).
pub fn score(query: &str, candidate: &str) -> Option<(i64, Vec<usize>)> {
    let query: Vec<char> = query.chars().map(fold).collect();
    if query.is_empty() {
        return Some((0, Vec::new()));
    }

    let chars: Vec<char> = candidate.chars().collect();
    let mut positions = Vec::with_capacity(query.len());
    let mut total = 0;
    let mut previous_matched = false;

    for (ci, &c) in chars.iter().enumerate() {
        if positions.len() == query.len() {
            break;
        }
        if fold(c) != query[positions.len()] {
            previous_matched = false;
            continue;
        }

        if positions.is_empty() {
            total += (LEADING_CHAR_PENALTY * ci as i64).max(MAX_LEADING_PENALTY);
        }
        if ci == 0 {
            total += FIRST_CHAR_BONUS;
        } else {
            let prev = chars[ci - 1];
            if is_separator(prev) {
                total += SEPARATOR_BONUS;
            } else if prev.is_lowercase() && c.is_uppercase() {
                total += CAMEL_CASE_BONUS;
            }
        }
        if previous_matched {
            total += ADJACENT_BONUS;
        }

        positions.push(ci);
        previous_matched = true;
    }

    if positions.len() < query.len() {
        return None;
    }
    total += UNMATCHED_CHAR_PENALTY * (chars.len() - positions.len()) as i64;
    Some((total, positions))
}

/// Filter and rank `candidates`. Best score first; ties keep input order.
/// An empty query returns every candidate in input order.
pub fn find(query: &str, candidates: &[String]) -> Vec<FuzzyMatch> {
    let mut matches: Vec<FuzzyMatch> = candidates
        .iter()
        .enumerate()
        .filter_map(|(index, text)| {
            score(query, text).map(|(score, positions)| FuzzyMatch {
                text: text.clone(),
                index,
                positions,
                score,
            })
        })
        .collect();

    if !query.is_empty() {
        matches.sort_by(|a, b| b.score.cmp(&a.score).then(a.index.cmp(&b.index)));
    }
    matches
}
