// Tokenizing and fuzzy term matching used by relevance scoring and autocomplete

use crate::lexicon;

// Words that carry no catalog meaning in a free-text query
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "the", "with", "for", "in", "of", "or", "to", "car", "cars", "i", "me", "my",
    "want", "need", "looking", "show", "find", "some", "best", "good", "new",
];

/// Query terms after synonym rewriting, with stop words removed.
pub fn query_terms(text: &str) -> Vec<String> {
    lexicon::apply_synonyms(text)
        .split_whitespace()
        .filter(|t| !STOP_WORDS.contains(t))
        .map(str::to_string)
        .collect()
}

/// Indexed terms for a field; stop words are kept so names like "The Beetle" stay whole.
pub fn field_terms(text: &str) -> Vec<String> {
    lexicon::apply_synonyms(text)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Allowed edit distance for a term, scaled by its length (0 for 1-2 chars,
/// 1 for 3-5 chars, 2 beyond).
pub fn fuzziness(term: &str) -> usize {
    match term.chars().count() {
        0..=2 => 0,
        3..=5 => 1,
        _ => 2,
    }
}

/// How well one query term matches one field's terms: 1.0 exact, 0.75 prefix,
/// 0.5 within fuzzy edit distance, 0.0 otherwise.
pub fn term_match_quality(query_term: &str, field_terms: &[String]) -> f32 {
    let mut best = 0.0f32;
    let max_edits = fuzziness(query_term);
    for candidate in field_terms {
        let quality = if candidate == query_term {
            1.0
        } else if query_term.chars().count() >= 2 && candidate.starts_with(query_term) {
            0.75
        } else if max_edits > 0
            && levenshtein_distance_bounded(query_term, candidate, max_edits) <= max_edits
        {
            0.5
        } else {
            0.0
        };
        if quality > best {
            best = quality;
            if best >= 1.0 {
                break;
            }
        }
    }
    best
}

/// Levenshtein distance with early termination.
/// Returns `max_distance + 1` once the distance is known to exceed it.
pub fn levenshtein_distance_bounded(s1: &str, s2: &str, max_distance: usize) -> usize {
    let a: Vec<char> = s1.chars().collect();
    let b: Vec<char> = s2.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }
    if a.len().abs_diff(b.len()) > max_distance {
        return max_distance + 1;
    }

    // Shorter string drives the row width
    let (a, b) = if a.len() > b.len() { (b, a) } else { (a, b) };

    let mut prev_row: Vec<usize> = (0..=a.len()).collect();
    let mut curr_row: Vec<usize> = vec![0; a.len() + 1];

    for j in 1..=b.len() {
        curr_row[0] = j;
        let mut min_in_row = j;
        for i in 1..=a.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            curr_row[i] = (prev_row[i] + 1)
                .min(curr_row[i - 1] + 1)
                .min(prev_row[i - 1] + cost);
            min_in_row = min_in_row.min(curr_row[i]);
        }
        if min_in_row > max_distance {
            return max_distance + 1;
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[a.len()]
}
