//! Master update engine
//!
//! Status groups are processed in a fixed order (skip, update, `"0"`,
//! `NOT_FOUND`) and every group scans the master as it stands after the
//! previous group, so rows inserted earlier are visible to later checks.

use std::collections::HashMap;

use serde::Serialize;

use super::classify::{STATUS_NOT_FOUND, STATUS_ZERO};
use super::normalize::normalize_key;
use crate::config::MarkerConfig;
use crate::error::{DataQualityWarning, ReconcileError};
use crate::table::{Record, Table, Value};

/// Status values and written markers driving the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePolicy {
    /// Rows with this status are left alone
    pub skip: String,
    /// Rows with this status update their master row
    pub update: String,
    /// Value written to the lookup column before `excluded`
    pub intermediate: String,
    /// Final lookup value for updated and inserted rows
    pub excluded: String,
}

impl Default for UpdatePolicy {
    fn default() -> Self {
        MarkerConfig::default().into()
    }
}

impl From<MarkerConfig> for UpdatePolicy {
    fn from(markers: MarkerConfig) -> Self {
        Self {
            skip: markers.skip,
            update: markers.update,
            intermediate: markers.intermediate,
            excluded: markers.excluded,
        }
    }
}

impl From<&MarkerConfig> for UpdatePolicy {
    fn from(markers: &MarkerConfig) -> Self {
        markers.clone().into()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationAction {
    Updated,
    InsertedFromZero,
    InsertedNotFound,
}

impl MutationAction {
    pub fn label(&self) -> &'static str {
        match self {
            MutationAction::Updated => "Updated",
            MutationAction::InsertedFromZero => "Inserted (Status 0)",
            MutationAction::InsertedNotFound => "Inserted (NOT_FOUND)",
        }
    }
}

/// Before/after view of one master mutation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordDiff {
    pub key: String,
    pub action: MutationAction,
    pub column: String,
    pub before: Value,
    /// Value held between the two writes of an update
    pub intermediate: Option<Value>,
    pub after: Value,
    /// Full master record after the mutation
    pub record: serde_json::Value,
}

/// A `"0"` row whose key already exists in the master
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateEntry {
    pub key: String,
    pub target_row: usize,
    pub master_row: usize,
    pub master_record: serde_json::Value,
    pub target_record: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateStats {
    pub updated_count: usize,
    pub inserted_count: usize,
    pub duplicates_count: usize,
    /// Includes `unmatched_count` and `ignored_count`
    pub skipped_count: usize,
    /// Update rows with no master row to update
    pub unmatched_count: usize,
    /// Rows whose status belongs to no handled group
    pub ignored_count: usize,
    pub duplicates: Vec<DuplicateEntry>,
    pub diffs: Vec<RecordDiff>,
    pub warnings: Vec<DataQualityWarning>,
}

impl UpdateStats {
    /// Rows accounted for across every outcome
    pub fn total(&self) -> usize {
        self.updated_count + self.inserted_count + self.duplicates_count + self.skipped_count
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Group {
    Skip = 0,
    Update = 1,
    Zero = 2,
    NotFound = 3,
}

const GROUP_ORDER: [Group; 4] = [Group::Skip, Group::Update, Group::Zero, Group::NotFound];

impl UpdatePolicy {
    fn group_of(&self, status: &str) -> Option<Group> {
        if status == self.skip {
            Some(Group::Skip)
        } else if status == self.update {
            Some(Group::Update)
        } else if status == STATUS_ZERO {
            Some(Group::Zero)
        } else if status == STATUS_NOT_FOUND {
            Some(Group::NotFound)
        } else {
            None
        }
    }
}

/// Canonical key to first master row, kept in step with inserts
#[derive(Debug, Default)]
struct MasterIndex {
    rows: HashMap<String, usize>,
}

impl MasterIndex {
    fn build(master: &Table, key_column: &str) -> Self {
        let mut index = Self::default();
        for (row, value) in master.column_values(key_column).enumerate() {
            index.record(normalize_key(value), row);
        }
        index
    }

    fn record(&mut self, key: String, row: usize) {
        if !key.is_empty() {
            self.rows.entry(key).or_insert(row);
        }
    }

    fn find(&self, key: &str) -> Option<usize> {
        self.rows.get(key).copied()
    }
}

/// New master record built from a target row
///
/// Starts from the master's columns set to "", copies every target field the
/// master also has except the status, then forces the lookup column.
fn synthesize_record(
    master: &Table,
    source: &Record,
    key_column: &str,
    lookup_column: &str,
    status_column: &str,
    key: &str,
    excluded: &str,
) -> Record {
    let mut record = Record::with_capacity(master.columns.len());
    for column in &master.columns {
        let value = match source.get(column) {
            Some(v) if column != status_column => v.clone(),
            _ => Value::from(""),
        };
        record.insert(column.clone(), value);
    }
    record.insert(key_column.to_string(), Value::from(key));
    record.insert(lookup_column.to_string(), Value::from(excluded));
    record
}

/// Apply the classified target to a copy of the master
///
/// Fails before touching anything when the status, key or lookup column is
/// missing. The returned master is a new table; inputs are never modified.
pub fn apply_updates(
    master: &Table,
    classified: &Table,
    lookup_column: &str,
    key_column: &str,
    status_column: &str,
    policy: &UpdatePolicy,
) -> Result<(Table, UpdateStats), ReconcileError> {
    classified.require_column("target", status_column)?;
    classified.require_column("target", key_column)?;
    master.require_column("master", key_column)?;
    master.require_column("master", lookup_column)?;

    let mut updated = master.clone();
    let mut index = MasterIndex::build(&updated, key_column);
    let mut stats = UpdateStats::default();

    let mut groups: [Vec<usize>; 4] = Default::default();
    for (idx, status) in classified.column_values(status_column).enumerate() {
        match policy.group_of(&status.to_text()) {
            Some(group) => groups[group as usize].push(idx),
            None => {
                log::debug!("Row {}: status {} not handled, ignoring", idx, status);
                stats.ignored_count += 1;
            }
        }
    }

    for (group, rows) in GROUP_ORDER.iter().zip(groups.iter()) {
        if rows.is_empty() {
            continue;
        }
        log::info!("Processing {} records in {:?} group", rows.len(), group);

        for &idx in rows {
            let source = &classified.rows[idx];
            let key = source.get(key_column).map(normalize_key).unwrap_or_default();

            match group {
                Group::Skip => {
                    stats.skipped_count += 1;
                }
                Group::Update => {
                    let Some(row) = index.find(&key) else {
                        log::debug!("No master row for {}, update dropped", key);
                        stats.unmatched_count += 1;
                        continue;
                    };
                    let record = &mut updated.rows[row];
                    let before = record.get(lookup_column).cloned().unwrap_or_default();
                    record.insert(lookup_column.to_string(), Value::from(policy.intermediate.as_str()));
                    let intermediate = record.get(lookup_column).cloned();
                    record.insert(lookup_column.to_string(), Value::from(policy.excluded.as_str()));
                    let after = record.get(lookup_column).cloned().unwrap_or_default();

                    log::debug!("Updated {}: {} -> {} in column {}", key, before, after, lookup_column);
                    stats.diffs.push(RecordDiff {
                        key,
                        action: MutationAction::Updated,
                        column: lookup_column.to_string(),
                        before,
                        intermediate,
                        after,
                        record: Table::record_to_json(&updated.columns, &updated.rows[row]),
                    });
                    stats.updated_count += 1;
                }
                Group::Zero => {
                    if let Some(row) = index.find(&key) {
                        log::debug!("Duplicate {} already in master row {}", key, row);
                        stats.duplicates.push(DuplicateEntry {
                            key,
                            target_row: idx,
                            master_row: row,
                            master_record: Table::record_to_json(&updated.columns, &updated.rows[row]),
                            target_record: Table::record_to_json(&classified.columns, source),
                        });
                        stats.duplicates_count += 1;
                    } else {
                        insert_record(
                            &mut updated,
                            &mut index,
                            &mut stats,
                            source,
                            &key,
                            MutationAction::InsertedFromZero,
                            (key_column, lookup_column, status_column),
                            &policy.excluded,
                        );
                    }
                }
                Group::NotFound => {
                    insert_record(
                        &mut updated,
                        &mut index,
                        &mut stats,
                        source,
                        &key,
                        MutationAction::InsertedNotFound,
                        (key_column, lookup_column, status_column),
                        &policy.excluded,
                    );
                }
            }
        }
    }

    stats.skipped_count += stats.unmatched_count + stats.ignored_count;
    if stats.unmatched_count > 0 {
        let warning = DataQualityWarning::UnmatchedUpdates {
            count: stats.unmatched_count,
        };
        log::warn!("Master update: {}", warning);
        stats.warnings.push(warning);
    }

    log::info!(
        "Master update completed: {} updated, {} inserted, {} duplicates, {} skipped",
        stats.updated_count,
        stats.inserted_count,
        stats.duplicates_count,
        stats.skipped_count
    );

    Ok((updated, stats))
}

#[allow(clippy::too_many_arguments)]
fn insert_record(
    master: &mut Table,
    index: &mut MasterIndex,
    stats: &mut UpdateStats,
    source: &Record,
    key: &str,
    action: MutationAction,
    (key_column, lookup_column, status_column): (&str, &str, &str),
    excluded: &str,
) {
    let record = synthesize_record(master, source, key_column, lookup_column, status_column, key, excluded);
    let json = Table::record_to_json(&master.columns, &record);
    index.record(key.to_string(), master.len());
    master.push_record(record);

    log::debug!("Inserted {} with {} = {}", key, lookup_column, excluded);
    stats.diffs.push(RecordDiff {
        key: key.to_string(),
        action,
        column: lookup_column.to_string(),
        before: Value::Null,
        intermediate: None,
        after: Value::from(excluded),
        record: json,
    });
    stats.inserted_count += 1;
}
