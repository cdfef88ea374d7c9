//! Activation classification of target rows against the master
//!
//! Every target row receives exactly one status: the master's lookup value
//! for its key, `"0"` when the master holds the key without a value,
//! `NOT_FOUND` when the master lacks the key, or `MISSING_KEY` when the row
//! has no usable key.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use super::normalize::normalize_key;
use crate::error::{DataQualityWarning, ReconcileError};
use crate::table::{Table, Value};

pub const STATUS_ZERO: &str = "0";
pub const STATUS_NOT_FOUND: &str = "NOT_FOUND";
pub const STATUS_MISSING_KEY: &str = "MISSING_KEY";

/// Classification outcome for one target row
#[derive(Debug, Clone, PartialEq)]
pub enum ActivationStatus {
    /// Master value of the lookup column for this key
    Mapped(Value),
    /// Key present in master with an empty lookup value
    Zero,
    NotFound,
    MissingKey,
}

impl ActivationStatus {
    /// Cell written to the status column
    pub fn to_value(&self) -> Value {
        match self {
            ActivationStatus::Mapped(value) => value.clone(),
            ActivationStatus::Zero => Value::from(STATUS_ZERO),
            ActivationStatus::NotFound => Value::from(STATUS_NOT_FOUND),
            ActivationStatus::MissingKey => Value::from(STATUS_MISSING_KEY),
        }
    }

    /// Label used for counting and for the update policy
    pub fn label(&self) -> String {
        self.to_value().to_text()
    }
}

/// Canonical key -> lookup value, first master occurrence wins
#[derive(Debug, Clone, Default)]
pub struct LookupMap {
    entries: HashMap<String, Value>,
}

impl LookupMap {
    pub fn build(master: &Table, key_column: &str, lookup_column: &str) -> Self {
        let mut entries = HashMap::new();
        for row in &master.rows {
            let key = row.get(key_column).map(normalize_key).unwrap_or_default();
            if key.is_empty() {
                continue;
            }
            let value = row.get(lookup_column).cloned().unwrap_or_default();
            entries.entry(key).or_insert(value);
        }
        LookupMap { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Status for a raw target key cell
    pub fn status_for(&self, key: &Value) -> ActivationStatus {
        let key = normalize_key(key);
        if key.is_empty() {
            return ActivationStatus::MissingKey;
        }
        match self.entries.get(&key) {
            Some(Value::Null) => ActivationStatus::Zero,
            Some(value) => ActivationStatus::Mapped(value.clone()),
            None => ActivationStatus::NotFound,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClassificationStats {
    pub status_counts: BTreeMap<String, usize>,
    pub status_percentages: BTreeMap<String, f64>,
    pub lookup_map_size: usize,
    pub master_records: usize,
    pub master_unique_records: usize,
    pub target_records: usize,
    pub total_processed: usize,
    pub warnings: Vec<DataQualityWarning>,
}

impl ClassificationStats {
    pub fn count(&self, status: &str) -> usize {
        self.status_counts.get(status).copied().unwrap_or(0)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Classify every target row and insert `status_column` after the key column
///
/// An existing `status_column` in the target is replaced. The target's own
/// cells are never rewritten.
pub fn classify(
    master: &Table,
    target: &Table,
    key_column: &str,
    lookup_column: &str,
    status_column: &str,
) -> Result<(Table, ClassificationStats), ReconcileError> {
    master.require_column("master", key_column)?;
    master.require_column("master", lookup_column)?;
    target.require_column("target", key_column)?;

    let lookup = LookupMap::build(master, key_column, lookup_column);
    log::info!(
        "Built lookup map with {} entries from {} master records",
        lookup.len(),
        master.len()
    );

    let mut classified = target.clone();
    if classified.drop_column(status_column) {
        log::debug!("Replacing existing '{}' column", status_column);
    }

    let mut status_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut values = Vec::with_capacity(classified.len());
    for (idx, key) in classified.column_values(key_column).enumerate() {
        let status = lookup.status_for(key);
        log::debug!("Row {}: key {} -> {:?}", idx, key, status);
        *status_counts.entry(status.label()).or_insert(0) += 1;
        values.push(status.to_value());
    }

    let key_idx = classified.require_column("target", key_column)?;
    classified.insert_column(key_idx + 1, status_column, values);

    let total = classified.len();
    let status_percentages = if total > 0 {
        status_counts
            .iter()
            .map(|(status, count)| (status.clone(), round2(*count as f64 / total as f64 * 100.0)))
            .collect()
    } else {
        BTreeMap::new()
    };

    let mut warnings = Vec::new();
    if lookup.is_empty() {
        warnings.push(DataQualityWarning::EmptyLookupMap {
            master_records: master.len(),
        });
    }
    let missing = status_counts.get(STATUS_MISSING_KEY).copied().unwrap_or(0);
    if total > 0 && missing == total {
        warnings.push(DataQualityWarning::AllKeysMissing {
            table: "target".to_string(),
            column: key_column.to_string(),
        });
    }
    for warning in &warnings {
        log::warn!("Classification: {}", warning);
    }

    let stats = ClassificationStats {
        status_counts,
        status_percentages,
        lookup_map_size: lookup.len(),
        master_records: master.len(),
        master_unique_records: lookup.len(),
        target_records: target.len(),
        total_processed: total,
        warnings,
    };

    log::info!(
        "Classification completed: {} rows, statuses {:?}",
        stats.total_processed,
        stats.status_counts
    );

    Ok((classified, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn master() -> Table {
        Table::from_json_records(
            &["PN", "COL"],
            &json!([
                {"PN": "AB12", "COL": "X"},
                {"PN": "CD34", "COL": null},
                {"PN": "AB12", "COL": "D"},
                {"PN": "EF56", "COL": "D"}
            ]),
        )
    }

    #[test]
    fn test_partition_is_total() {
        let target = Table::from_json_records(
            &["PN", "DESC"],
            &json!([
                {"PN": "AB12", "DESC": "a"},
                {"PN": "CD34", "DESC": "b"},
                {"PN": "ZZ99", "DESC": "c"},
                {"PN": null, "DESC": "d"},
                {"PN": "ef-56", "DESC": "e"}
            ]),
        );

        let (classified, stats) = classify(&master(), &target, "PN", "COL", "ACTIVATION_STATUS").unwrap();

        assert_eq!(classified.columns, vec!["PN", "ACTIVATION_STATUS", "DESC"]);
        let statuses: Vec<String> = classified
            .column_values("ACTIVATION_STATUS")
            .map(Value::to_text)
            .collect();
        assert_eq!(statuses, vec!["X", "0", "NOT_FOUND", "MISSING_KEY", "D"]);
        assert_eq!(stats.status_counts.values().sum::<usize>(), target.len());
        assert_eq!(stats.total_processed, 5);
        assert_eq!(stats.status_percentages["X"], 20.0);
        // Target cells are not canonicalized
        assert_eq!(classified.get(4, "PN"), &Value::from("ef-56"));
    }

    #[test]
    fn test_first_duplicate_wins() {
        let target = Table::from_json_records(&["PN"], &json!([{"PN": "AB12"}]));
        let (classified, stats) = classify(&master(), &target, "PN", "COL", "ACTIVATION_STATUS").unwrap();
        assert_eq!(classified.get(0, "ACTIVATION_STATUS"), &Value::from("X"));
        assert_eq!(stats.lookup_map_size, 3);
        assert_eq!(stats.master_records, 4);
    }

    #[test]
    fn test_reclassify_replaces_status_column() {
        let target = Table::from_json_records(&["PN"], &json!([{"PN": "CD34"}, {"PN": "QQ"}]));
        let (once, _) = classify(&master(), &target, "PN", "COL", "ACTIVATION_STATUS").unwrap();
        let (twice, _) = classify(&master(), &once, "PN", "COL", "ACTIVATION_STATUS").unwrap();
        assert_eq!(once, twice);
        assert_eq!(twice.columns.len(), 2);
    }

    #[test]
    fn test_blank_key_is_missing() {
        let target = Table::from_json_records(&["PN"], &json!([{"PN": " - "}, {"PN": ""}]));
        let (_, stats) = classify(&master(), &target, "PN", "COL", "ACTIVATION_STATUS").unwrap();
        assert_eq!(stats.count(STATUS_MISSING_KEY), 2);
        assert!(stats.warnings.contains(&DataQualityWarning::AllKeysMissing {
            table: "target".to_string(),
            column: "PN".to_string(),
        }));
    }

    #[test]
    fn test_empty_master_warns() {
        let empty = Table::from_json_records(&["PN", "COL"], &json!([]));
        let target = Table::from_json_records(&["PN"], &json!([{"PN": "AB12"}]));
        let (_, stats) = classify(&empty, &target, "PN", "COL", "ACTIVATION_STATUS").unwrap();
        assert_eq!(stats.count(STATUS_NOT_FOUND), 1);
        assert_eq!(
            stats.warnings,
            vec![DataQualityWarning::EmptyLookupMap { master_records: 0 }]
        );
    }

    #[test]
    fn test_missing_lookup_column() {
        let target = Table::from_json_records(&["PN"], &json!([]));
        let err = classify(&master(), &target, "PN", "NOPE", "ACTIVATION_STATUS").unwrap_err();
        assert_eq!(
            err,
            ReconcileError::MissingColumn {
                table: "master".to_string(),
                column: "NOPE".to_string(),
            }
        );
    }
}
