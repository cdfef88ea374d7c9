//! Column suggestion for choosing the lookup column
//! Priority: Segment (prefix/suffix above threshold) → Fallback (best normalized Levenshtein)

use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use strsim::normalized_levenshtein;

use super::models::{ColumnSuggestion, SuggestionKind};
use crate::table::Table;

/// Minimum similarity a prefix/suffix candidate needs
pub const DEFAULT_THRESHOLD: f64 = 0.9;

/// Segments an input needs before prefix/suffix matching applies
const MIN_SEGMENTS: usize = 4;

/// Segments that form the prefix
const PREFIX_SEGMENTS: usize = 3;

/// Suggest a permitted column for free-text input using the default threshold
pub fn suggest_column(input: &str, permitted: &[String]) -> ColumnSuggestion {
    suggest_column_with_threshold(input, permitted, DEFAULT_THRESHOLD)
}

/// Suggest a permitted column for free-text input
///
/// Inputs like `J74_V710_B2_PP_YOTK` are split on `_`; with enough segments
/// the first three form a prefix and the last a suffix, and only columns
/// sharing both are considered against `threshold`. Otherwise, or when no
/// such column qualifies, the best similarity over every column wins.
/// Ties keep the earliest column.
pub fn suggest_column_with_threshold(
    input: &str,
    permitted: &[String],
    threshold: f64,
) -> ColumnSuggestion {
    if input.trim().is_empty() {
        let first = permitted.first().cloned().unwrap_or_default();
        return ColumnSuggestion::new(first, 0.0, SuggestionKind::Blank);
    }

    let needle = input.to_lowercase();

    let parts: Vec<&str> = input.split('_').collect();
    if parts.len() >= MIN_SEGMENTS {
        let prefix = parts[..PREFIX_SEGMENTS].join("_").to_uppercase();
        let suffix = parts[parts.len() - 1].to_uppercase();

        let mut best: Option<(&String, f64)> = None;
        for column in permitted {
            let upper = column.to_uppercase();
            if !upper.starts_with(&prefix) || !upper.ends_with(&suffix) {
                continue;
            }
            let score = normalized_levenshtein(&needle, &column.to_lowercase());
            log::debug!("Segment candidate '{}' scored {:.3}", column, score);
            if score >= threshold && best.is_none_or(|(_, s)| score > s) {
                best = Some((column, score));
            }
        }

        if let Some((column, score)) = best {
            return ColumnSuggestion::new(column.clone(), score, SuggestionKind::Segment);
        }
    }

    let mut best: Option<(&String, f64)> = None;
    for column in permitted {
        let score = normalized_levenshtein(&needle, &column.to_lowercase());
        if score > best.map_or(0.0, |(_, s)| s) {
            best = Some((column, score));
        }
    }

    match best {
        Some((column, score)) => ColumnSuggestion::new(column.clone(), score, SuggestionKind::Fallback),
        None => ColumnSuggestion::new(input, 0.0, SuggestionKind::NoMatch),
    }
}

/// Master columns offered as lookup candidates: positions `[start, end)`
pub fn permitted_columns(master: &Table, start: usize, end: usize) -> Vec<String> {
    let end = end.min(master.columns.len());
    if start >= end {
        return Vec::new();
    }
    master.columns[start..end].to_vec()
}

/// Rank columns against a typed query, best first
/// Empty query keeps every column in its original order
pub fn filter_columns(query: &str, columns: &[String]) -> Vec<(String, i64)> {
    if query.is_empty() {
        return columns.iter().map(|c| (c.clone(), 0)).collect();
    }

    let matcher = SkimMatcherV2::default();
    let mut scored: Vec<(String, i64)> = columns
        .iter()
        .filter_map(|c| matcher.fuzzy_match(c, query).map(|score| (c.clone(), score)))
        .collect();

    // Sort by score descending
    scored.sort_by(|a, b| b.1.cmp(&a.1));
    scored
}
