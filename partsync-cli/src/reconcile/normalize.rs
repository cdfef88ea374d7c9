//! Key and text normalization for master and target sheets

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::error::{DataQualityWarning, ReconcileError};
use crate::table::{Table, Value};

static NON_KEY_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Z0-9]").expect("static key pattern"));

static TEXT_NOISE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"['"+ ]+"#).expect("static noise pattern"));

/// Canonical key form: uppercase, `[A-Z0-9]` only, null becomes ""
pub fn normalize_key(value: &Value) -> String {
    let upper = value.to_text().to_uppercase();
    NON_KEY_CHARS.replace_all(&upper, "").into_owned()
}

/// Canonical column-name form: trimmed, uppercase, spaces as underscores
pub fn normalize_column_name(name: &str) -> String {
    name.trim().to_uppercase().replace(' ', "_")
}

/// Strip quotes, plus signs and spaces from a text cell
pub fn clean_text(value: &Value) -> String {
    TEXT_NOISE
        .replace_all(&value.to_text(), "")
        .trim()
        .to_string()
}

/// Options for generic sheet normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenericOptions {
    /// Swap the first two columns (input layout convention)
    pub swap_leading_columns: bool,
}

impl Default for GenericOptions {
    fn default() -> Self {
        Self {
            swap_leading_columns: true,
        }
    }
}

/// What master normalization did
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MasterCleaningStats {
    pub original_shape: (usize, usize),
    pub final_shape: (usize, usize),
    pub columns_renamed: Vec<String>,
    pub rows_with_null_key: usize,
    pub rows_dropped: usize,
    pub warnings: Vec<DataQualityWarning>,
}

/// What generic normalization did
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenericCleaningStats {
    pub original_shape: (usize, usize),
    pub final_shape: (usize, usize),
    pub columns_standardized: Vec<(String, String)>,
    pub columns_swapped: bool,
    pub string_columns_cleaned: usize,
}

/// Status marker counts before and after re-marking retired parts
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MasterInsights {
    pub total_records: usize,
    pub excluded_before: usize,
    pub intermediate_before: usize,
    pub zero_before: usize,
    pub excluded_after: usize,
    pub intermediate_after: usize,
    pub zero_after: usize,
    pub remarked: usize,
}

/// Canonicalize the master key column and drop rows without a key
///
/// The first column whose normalized name equals the key or one of `aliases`
/// is renamed to `key_column`. Every key cell is rewritten to its canonical
/// form and rows whose key ends up empty are removed.
pub fn normalize_master(
    table: &Table,
    key_column: &str,
    aliases: &[String],
) -> Result<(Table, MasterCleaningStats), ReconcileError> {
    let mut df = table.clone();
    let original_shape = df.shape();
    let mut columns_renamed = Vec::new();

    if !df.has_column(key_column) {
        let wanted: HashSet<String> = std::iter::once(key_column)
            .chain(aliases.iter().map(String::as_str))
            .map(normalize_column_name)
            .collect();

        let found = df
            .columns
            .iter()
            .find(|c| wanted.contains(&normalize_column_name(c)))
            .cloned();

        if let Some(old_name) = found {
            df.rename_column(&old_name, key_column);
            columns_renamed.push(format!("{} -> {}", old_name, key_column));
        }
    }

    df.require_column("master", key_column)?;

    let rows_with_null_key = df.column_values(key_column).filter(|v| v.is_null()).count();

    for row in &mut df.rows {
        let key = row
            .get(key_column)
            .map(normalize_key)
            .unwrap_or_default();
        row.insert(key_column.to_string(), Value::String(key));
    }

    let before = df.len();
    df.rows.retain(|row| {
        row.get(key_column)
            .and_then(Value::as_str)
            .is_some_and(|k| !k.is_empty())
    });
    let rows_dropped = before - df.len();

    let mut warnings = Vec::new();
    if rows_dropped > 0 {
        warnings.push(DataQualityWarning::RowsDroppedForEmptyKey {
            count: rows_dropped,
        });
    }
    if before > 0 && df.is_empty() {
        warnings.push(DataQualityWarning::AllKeysMissing {
            table: "master".to_string(),
            column: key_column.to_string(),
        });
    }
    for warning in &warnings {
        log::warn!("Master cleaning: {}", warning);
    }

    let stats = MasterCleaningStats {
        original_shape,
        final_shape: df.shape(),
        columns_renamed,
        rows_with_null_key,
        rows_dropped,
        warnings,
    };

    log::info!(
        "Master cleaning completed: {:?} -> {:?}, {} rows dropped",
        stats.original_shape,
        stats.final_shape,
        stats.rows_dropped
    );

    Ok((df, stats))
}

/// Standardize column names and clean every text column of a sheet
pub fn normalize_generic(table: &Table, options: GenericOptions) -> (Table, GenericCleaningStats) {
    let original_shape = table.shape();

    // Standardized names can collide ("Part No" / "PART NO"); later ones get a suffix
    let mut seen = HashSet::new();
    let mut renames = Vec::with_capacity(table.columns.len());
    for column in &table.columns {
        let base = normalize_column_name(column);
        let mut name = base.clone();
        let mut n = 2;
        while !seen.insert(name.clone()) {
            name = format!("{}_{}", base, n);
            n += 1;
        }
        renames.push((column.clone(), name));
    }

    let mut df = Table::new(renames.iter().map(|(_, new)| new.clone()).collect());
    for row in &table.rows {
        let record = renames
            .iter()
            .map(|(old, new)| (new.clone(), row.get(old).cloned().unwrap_or_default()))
            .collect();
        df.rows.push(record);
    }

    let mut columns_swapped = false;
    if options.swap_leading_columns && df.columns.len() >= 2 {
        columns_swapped = df.swap_columns(0, 1);
    }

    let text_columns: Vec<String> = df
        .columns
        .iter()
        .filter(|c| df.is_text_column(c))
        .cloned()
        .collect();

    for column in &text_columns {
        for row in &mut df.rows {
            let cleaned = row.get(column).map(clean_text).unwrap_or_default();
            row.insert(column.clone(), Value::String(cleaned));
        }
    }

    let stats = GenericCleaningStats {
        original_shape,
        final_shape: df.shape(),
        columns_standardized: renames,
        columns_swapped,
        string_columns_cleaned: text_columns.len(),
    };

    log::info!(
        "Generic cleaning completed: {} columns standardized, {} text columns cleaned, swapped={}",
        stats.columns_standardized.len(),
        stats.string_columns_cleaned,
        stats.columns_swapped
    );

    (df, stats)
}

/// Rename the underscore form of the key back to canonical and move it first
pub fn reposition_key(table: &Table, key_column: &str) -> Table {
    let mut df = table.clone();
    let alias = key_column.replace(' ', "_");

    if alias != key_column && !df.has_column(key_column) && df.has_column(&alias) {
        df.rename_column(&alias, key_column);
    }
    df.move_column(key_column, 0);
    df
}

/// Re-mark master rows whose key no longer appears in the target
///
/// Rows carrying `excluded` in `status_column` whose key is absent from the
/// target are switched to `intermediate`.
pub fn flag_retired_parts(
    master: &Table,
    target: &Table,
    key_column: &str,
    status_column: &str,
    excluded: &str,
    intermediate: &str,
) -> Result<(Table, MasterInsights), ReconcileError> {
    master.require_column("master", key_column)?;
    master.require_column("master", status_column)?;

    let mut df = master.clone();

    let target_keys: HashSet<String> = if target.has_column(key_column) {
        target
            .column_values(key_column)
            .filter(|v| !v.is_null())
            .map(normalize_key)
            .collect()
    } else {
        HashSet::new()
    };

    let count = |table: &Table, marker: &str| {
        table
            .column_values(status_column)
            .filter(|v| v.as_str() == Some(marker))
            .count()
    };

    let mut insights = MasterInsights {
        total_records: df.len(),
        excluded_before: count(&df, excluded),
        intermediate_before: count(&df, intermediate),
        zero_before: count(&df, "0"),
        ..Default::default()
    };

    for row in &mut df.rows {
        let key = row.get(key_column).map(normalize_key).unwrap_or_default();
        let is_excluded = row.get(status_column).and_then(Value::as_str) == Some(excluded);
        if is_excluded && !target_keys.contains(&key) {
            row.insert(status_column.to_string(), Value::from(intermediate));
            insights.remarked += 1;
        }
    }

    insights.excluded_after = count(&df, excluded);
    insights.intermediate_after = count(&df, intermediate);
    insights.zero_after = count(&df, "0");

    log::info!(
        "Master insights: {} of {} rows re-marked {} -> {}",
        insights.remarked,
        insights.total_records,
        excluded,
        intermediate
    );

    Ok((df, insights))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key(&Value::from("ab-12 ")), "AB12");
        assert_eq!(normalize_key(&Value::Null), "");
        assert_eq!(normalize_key(&Value::Int(7100)), "7100");
        assert_eq!(normalize_key(&Value::from("7116-4101.02")), "7116410102");
    }

    #[test]
    fn test_normalize_master_drops_empty_keys() {
        let master = Table::from_json_records(
            &["PN", "COL"],
            &json!([
                {"PN": "ab-12 ", "COL": "X"},
                {"PN": null, "COL": "D"},
                {"PN": "AB12", "COL": "0"},
            ]),
        );

        let (clean, stats) = normalize_master(&master, "PN", &[]).unwrap();

        let keys: Vec<_> = clean.column_values("PN").map(Value::to_text).collect();
        assert_eq!(keys, vec!["AB12", "AB12"]);
        assert_eq!(stats.rows_with_null_key, 1);
        assert_eq!(stats.rows_dropped, 1);
        assert_eq!(stats.original_shape, (3, 2));
        assert_eq!(stats.final_shape, (2, 2));
        assert_eq!(
            stats.warnings,
            vec![DataQualityWarning::RowsDroppedForEmptyKey { count: 1 }]
        );
    }

    #[test]
    fn test_normalize_master_is_idempotent() {
        let master = Table::from_json_records(
            &["PN", "COL"],
            &json!([{"PN": "x-1", "COL": "A"}, {"PN": "--", "COL": "B"}, {"PN": "y 2"}]),
        );
        let (once, _) = normalize_master(&master, "PN", &[]).unwrap();
        let (twice, stats) = normalize_master(&once, "PN", &[]).unwrap();
        assert_eq!(once, twice);
        assert_eq!(stats.rows_dropped, 0);
    }

    #[test]
    fn test_normalize_master_renames_alias() {
        let master = Table::from_json_records(
            &["Yazaki  pn", " yazaki pn ", "COL"],
            &json!([{" yazaki pn ": "a1", "COL": "X"}]),
        );

        let (clean, stats) =
            normalize_master(&master, "YAZAKI PN", &["YAZAKI_PN".to_string()]).unwrap();

        // Double space does not normalize to the alias, the second column does
        assert_eq!(clean.columns, vec!["Yazaki  pn", "YAZAKI PN", "COL"]);
        assert_eq!(stats.columns_renamed, vec![" yazaki pn  -> YAZAKI PN"]);
        assert_eq!(clean.get(0, "YAZAKI PN"), &Value::from("A1"));
    }

    #[test]
    fn test_normalize_master_missing_key_is_validation_error() {
        let master = Table::from_json_records(&["COL"], &json!([{"COL": "X"}]));
        let err = normalize_master(&master, "PN", &[]).unwrap_err();
        assert_eq!(
            err,
            ReconcileError::MissingColumn {
                table: "master".to_string(),
                column: "PN".to_string()
            }
        );
    }

    #[test]
    fn test_normalize_generic() {
        let target = Table::from_json_records(
            &["status code", " part number", "qty"],
            &json!([
                {"status code": " 'A' ", " part number": "+ab 12\"", "qty": 3},
                {"status code": null, " part number": "cd99", "qty": null},
            ]),
        );

        let (clean, stats) = normalize_generic(&target, GenericOptions::default());

        assert_eq!(clean.columns, vec!["PART_NUMBER", "STATUS_CODE", "QTY"]);
        assert!(stats.columns_swapped);
        assert_eq!(stats.string_columns_cleaned, 2);
        assert_eq!(clean.get(0, "PART_NUMBER"), &Value::from("ab12"));
        assert_eq!(clean.get(0, "STATUS_CODE"), &Value::from("A"));
        assert_eq!(clean.get(1, "STATUS_CODE"), &Value::from(""));
        // Numeric column is untouched
        assert_eq!(clean.get(0, "QTY"), &Value::Int(3));
        assert_eq!(clean.get(1, "QTY"), &Value::Null);
    }

    #[test]
    fn test_normalize_generic_swap_can_be_disabled() {
        let target = Table::from_json_records(&["a", "b", "c"], &json!([]));
        let (clean, stats) = normalize_generic(
            &target,
            GenericOptions {
                swap_leading_columns: false,
            },
        );
        assert_eq!(clean.columns, vec!["A", "B", "C"]);
        assert!(!stats.columns_swapped);
    }

    #[test]
    fn test_normalize_generic_single_column_not_swapped() {
        let target = Table::from_json_records(&["only"], &json!([{"only": "x"}]));
        let (clean, stats) = normalize_generic(&target, GenericOptions::default());
        assert_eq!(clean.columns, vec!["ONLY"]);
        assert!(!stats.columns_swapped);
    }

    #[test]
    fn test_normalize_generic_disambiguates_collisions() {
        let target = Table::from_json_records(
            &["Part No", "PART NO"],
            &json!([{"Part No": "a", "PART NO": "b"}]),
        );
        let (clean, _) = normalize_generic(
            &target,
            GenericOptions {
                swap_leading_columns: false,
            },
        );
        assert_eq!(clean.columns, vec!["PART_NO", "PART_NO_2"]);
        assert_eq!(clean.get(0, "PART_NO_2"), &Value::from("b"));
    }

    #[test]
    fn test_reposition_key() {
        let target = Table::from_json_records(
            &["STATUS", "PART_NUMBER", "QTY"],
            &json!([{"STATUS": "A", "PART_NUMBER": "AB12", "QTY": 1}]),
        );
        let moved = reposition_key(&target, "PART NUMBER");
        assert_eq!(moved.columns, vec!["PART NUMBER", "STATUS", "QTY"]);
        assert_eq!(moved.get(0, "PART NUMBER"), &Value::from("AB12"));
    }

    #[test]
    fn test_flag_retired_parts() {
        let master = Table::from_json_records(
            &["PN", "COL"],
            &json!([
                {"PN": "AB12", "COL": "X"},
                {"PN": "CD99", "COL": "X"},
                {"PN": "EF01", "COL": "0"},
            ]),
        );
        let target = Table::from_json_records(&["PN"], &json!([{"PN": "ab-12"}]));

        let (flagged, insights) =
            flag_retired_parts(&master, &target, "PN", "COL", "X", "D").unwrap();

        assert_eq!(flagged.get(0, "COL"), &Value::from("X"));
        assert_eq!(flagged.get(1, "COL"), &Value::from("D"));
        assert_eq!(flagged.get(2, "COL"), &Value::from("0"));
        assert_eq!(insights.remarked, 1);
        assert_eq!(insights.excluded_before, 2);
        assert_eq!(insights.excluded_after, 1);
        assert_eq!(insights.intermediate_after, 1);
        assert_eq!(insights.zero_after, 1);
    }
}
