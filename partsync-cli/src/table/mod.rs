//! In-memory tables shared by every reconciliation stage
//!
//! A [`Table`] keeps its column order separately from its records so that
//! renames, swaps and inserts can change display order without touching the
//! lookup semantics of the records themselves.

mod value;

pub use value::*;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ReconcileError;

static NULL_VALUE: Value = Value::Null;

/// A single row: column name -> cell
pub type Record = HashMap<String, Value>;

/// Ordered columns plus ordered records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Column names in display order
    pub columns: Vec<String>,
    /// Records in display order
    pub rows: Vec<Record>,
}

impl Table {
    /// Create an empty table with the given columns
    pub fn new(columns: Vec<String>) -> Self {
        Table {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table from positional rows; short rows are padded with nulls
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let mut table = Table::new(columns);
        for row in rows {
            let mut record = Record::with_capacity(table.columns.len());
            let mut cells = row.into_iter();
            for column in &table.columns {
                record.insert(column.clone(), cells.next().unwrap_or_default());
            }
            table.rows.push(record);
        }
        table
    }

    /// Build a table from a JSON array of objects, using `columns` for order
    pub fn from_json_records(columns: &[&str], records: &serde_json::Value) -> Self {
        let mut table = Table::new(columns.iter().map(|c| c.to_string()).collect());
        if let Some(items) = records.as_array() {
            for item in items {
                let record = table
                    .columns
                    .iter()
                    .map(|c| {
                        let value = item.get(c).map(Value::from_json).unwrap_or_default();
                        (c.clone(), value)
                    })
                    .collect();
                table.rows.push(record);
            }
        }
        table
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.columns.len())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Fail with a validation error naming the table if `name` is absent
    pub fn require_column(&self, table: &str, name: &str) -> Result<usize, ReconcileError> {
        self.column_index(name)
            .ok_or_else(|| ReconcileError::MissingColumn {
                table: table.to_string(),
                column: name.to_string(),
            })
    }

    /// Cell at (row, column); absent cells read as null
    pub fn get(&self, row: usize, column: &str) -> &Value {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&NULL_VALUE)
    }

    /// All cells of a column in row order
    pub fn column_values<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.rows
            .iter()
            .map(move |r| r.get(column).unwrap_or(&NULL_VALUE))
    }

    /// A column is text-typed when it holds at least one string cell
    pub fn is_text_column(&self, column: &str) -> bool {
        self.column_values(column).any(Value::is_string)
    }

    /// Append a record, filling absent columns with nulls
    pub fn push_record(&mut self, mut record: Record) {
        for column in &self.columns {
            record.entry(column.clone()).or_default();
        }
        self.rows.push(record);
    }

    /// Rename a column in the header and in every record
    pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
        if from == to {
            return self.has_column(from);
        }
        let Some(idx) = self.column_index(from) else {
            return false;
        };
        self.columns[idx] = to.to_string();
        for row in &mut self.rows {
            let value = row.remove(from).unwrap_or_default();
            row.insert(to.to_string(), value);
        }
        true
    }

    /// Move a column to `index` (clamped to the last position)
    pub fn move_column(&mut self, name: &str, index: usize) -> bool {
        let Some(current) = self.column_index(name) else {
            return false;
        };
        let column = self.columns.remove(current);
        let index = index.min(self.columns.len());
        self.columns.insert(index, column);
        true
    }

    /// Swap two column positions
    pub fn swap_columns(&mut self, a: usize, b: usize) -> bool {
        if a >= self.columns.len() || b >= self.columns.len() {
            return false;
        }
        self.columns.swap(a, b);
        true
    }

    /// Insert a new column at `index`, one value per record
    pub fn insert_column(&mut self, index: usize, name: &str, values: Vec<Value>) {
        let index = index.min(self.columns.len());
        self.columns.insert(index, name.to_string());
        let mut values = values.into_iter();
        for row in &mut self.rows {
            row.insert(name.to_string(), values.next().unwrap_or_default());
        }
    }

    /// Remove a column from the header and every record
    pub fn drop_column(&mut self, name: &str) -> bool {
        let Some(idx) = self.column_index(name) else {
            return false;
        };
        self.columns.remove(idx);
        for row in &mut self.rows {
            row.remove(name);
        }
        true
    }

    /// Records as a JSON array of objects
    pub fn to_json_records(&self) -> serde_json::Value {
        let records = self
            .rows
            .iter()
            .map(|row| Self::record_to_json(&self.columns, row))
            .collect();
        serde_json::Value::Array(records)
    }

    /// A single record as a JSON object restricted to `columns`
    pub fn record_to_json(columns: &[String], record: &Record) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for column in columns {
            let value = record.get(column).map(Value::to_json).unwrap_or_default();
            map.insert(column.clone(), value);
        }
        serde_json::Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Table {
        Table::from_rows(
            vec!["A".into(), "B".into(), "C".into()],
            vec![
                vec![Value::from("a1"), Value::Int(1)],
                vec![Value::from("a2"), Value::Int(2), Value::from("c2")],
            ],
        )
    }

    #[test]
    fn test_from_rows_pads_short_rows() {
        let table = sample();
        assert_eq!(table.shape(), (2, 3));
        assert_eq!(table.get(0, "C"), &Value::Null);
        assert_eq!(table.get(1, "C"), &Value::from("c2"));
    }

    #[test]
    fn test_rename_and_move() {
        let mut table = sample();
        assert!(table.rename_column("B", "KEY"));
        assert!(table.move_column("KEY", 0));
        assert_eq!(table.columns, vec!["KEY", "A", "C"]);
        assert_eq!(table.get(1, "KEY"), &Value::Int(2));
        assert!(table.rows.iter().all(|r| !r.contains_key("B")));
    }

    #[test]
    fn test_insert_and_drop_column() {
        let mut table = sample();
        table.insert_column(1, "S", vec![Value::from("x"), Value::from("y")]);
        assert_eq!(table.columns, vec!["A", "S", "B", "C"]);
        assert_eq!(table.get(1, "S"), &Value::from("y"));
        assert!(table.drop_column("S"));
        assert!(!table.has_column("S"));
    }

    #[test]
    fn test_text_column_detection() {
        let table = sample();
        assert!(table.is_text_column("A"));
        assert!(!table.is_text_column("B"));
    }

    #[test]
    fn test_require_column_names_table() {
        let table = sample();
        let err = table.require_column("master", "PN").unwrap_err();
        assert_eq!(err.to_string(), "Column 'PN' not found in master table");
    }

    #[test]
    fn test_json_round_trip_shape() {
        let table = Table::from_json_records(
            &["PN", "COL"],
            &json!([{"PN": "AB12", "COL": null}, {"PN": "CD99"}]),
        );
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(1, "COL"), &Value::Null);
        assert_eq!(
            table.to_json_records(),
            json!([{"PN": "AB12", "COL": null}, {"PN": "CD99", "COL": null}])
        );
    }
}
