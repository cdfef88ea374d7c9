//! Error and warning types for reconciliation

use serde::{Deserialize, Serialize};

/// Structural problems that abort a reconciliation call
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileError {
    /// A required column is absent from a table
    MissingColumn { table: String, column: String },
    /// A sheet was requested that the workbook does not contain
    MissingSheet {
        sheet: String,
        available: Vec<String>,
    },
    /// A stage was asked to run before its input exists
    EmptyInput { table: String },
    /// Configuration could not be read or is inconsistent
    Config(String),
}

impl std::fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconcileError::MissingColumn { table, column } => {
                write!(f, "Column '{}' not found in {} table", column, table)
            }
            ReconcileError::MissingSheet { sheet, available } => {
                write!(
                    f,
                    "Sheet '{}' not found - available sheets: {}",
                    sheet,
                    available.join(", ")
                )
            }
            ReconcileError::EmptyInput { table } => {
                write!(f, "No {} table loaded - run the earlier stage first", table)
            }
            ReconcileError::Config(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ReconcileError {}

/// Non-fatal data conditions surfaced through stats
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataQualityWarning {
    /// The master produced no usable lookup entries
    EmptyLookupMap { master_records: usize },
    /// Every key in a table is null or blank
    AllKeysMissing { table: String, column: String },
    /// Master rows were dropped because their key normalized to empty
    RowsDroppedForEmptyKey { count: usize },
    /// A status group's key matched nothing in the master
    UnmatchedUpdates { count: usize },
}

impl std::fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataQualityWarning::EmptyLookupMap { master_records } => write!(
                f,
                "Lookup map is empty ({} master records) - every key will be NOT_FOUND",
                master_records
            ),
            DataQualityWarning::AllKeysMissing { table, column } => write!(
                f,
                "Every value of '{}' in the {} table is empty",
                column, table
            ),
            DataQualityWarning::RowsDroppedForEmptyKey { count } => {
                write!(f, "{} master rows dropped for an empty key", count)
            }
            DataQualityWarning::UnmatchedUpdates { count } => write!(
                f,
                "{} update rows had no matching master key and were not applied",
                count
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_sheet_lists_available() {
        let err = ReconcileError::MissingSheet {
            sheet: "Sheet9".to_string(),
            available: vec!["MasterBOM".to_string(), "Sheet2".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Sheet 'Sheet9' not found - available sheets: MasterBOM, Sheet2"
        );
    }

    #[test]
    fn test_warning_serializes_with_kind_tag() {
        let warning = DataQualityWarning::UnmatchedUpdates { count: 2 };
        let json = serde_json::to_value(&warning).unwrap();
        assert_eq!(json["kind"], "unmatched_updates");
        assert_eq!(json["count"], 2);
    }
}
