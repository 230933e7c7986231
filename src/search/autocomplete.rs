use std::collections::HashMap;

use crate::lexicon::normalize_text;

use super::engine::SearchEngine;
use super::text::{fuzziness, levenshtein_distance_bounded};

impl SearchEngine {
    /// Listing names completing `prefix`, best first, without duplicates.
    ///
    /// Whole-name prefixes beat word prefixes, which beat "brand name" prefixes,
    /// which beat fuzzy prefixes. Within a tier, the name the prefix covers
    /// most of comes first.
    pub fn autocomplete(&self, prefix: &str, limit: usize) -> Vec<String> {
        let prefix = normalize_text(prefix);
        if prefix.is_empty() || limit == 0 {
            return Vec::new();
        }

        let mut best: HashMap<String, (f32, &str)> = HashMap::new();
        for doc in &self.docs {
            let listing = &doc.listing;
            let Some(score) = completion_score(&prefix, &listing.name, &listing.brand_name) else {
                continue;
            };
            let key = listing.name.to_lowercase();
            // Keep the first spelling seen unless a later one scores higher
            if best.get(&key).is_none_or(|(existing, _)| *existing < score) {
                best.insert(key, (score, listing.name.as_str()));
            }
        }

        let mut suggestions: Vec<(f32, &str)> = best.into_values().collect();
        suggestions.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.cmp(b.1))
        });
        suggestions
            .into_iter()
            .take(limit)
            .map(|(_, name)| name.to_string())
            .collect()
    }
}

fn completion_score(prefix: &str, name: &str, brand: &str) -> Option<f32> {
    let name_norm = normalize_text(name);
    if name_norm.is_empty() {
        return None;
    }
    let coverage = prefix.chars().count() as f32 / name_norm.chars().count().max(1) as f32;
    let coverage = coverage.min(1.0);

    if name_norm.starts_with(prefix) {
        return Some(3.0 + coverage);
    }
    if name_norm.split(' ').any(|word| word.starts_with(prefix)) {
        return Some(2.0 + coverage);
    }
    if normalize_text(&format!("{} {}", brand, name)).starts_with(prefix) {
        return Some(1.0 + coverage);
    }

    let max_edits = fuzziness(prefix);
    if max_edits == 0 {
        return None;
    }
    let prefix_len = prefix.chars().count();
    let fuzzy_hit = std::iter::once(name_norm.as_str())
        .chain(name_norm.split(' '))
        .any(|word| {
            let head: String = word.chars().take(prefix_len).collect();
            levenshtein_distance_bounded(prefix, &head, max_edits) <= max_edits
        });
    fuzzy_hit.then_some(0.5 + coverage * 0.5)
}
