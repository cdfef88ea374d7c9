//! CSV import and export

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use csv::{ReaderBuilder, Writer};

use crate::table::{Table, Value};

/// Parse a CSV cell; empty cells are null
fn parse_cell(raw: &str, infer_numbers: bool) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    if infer_numbers {
        let trimmed = raw.trim();
        if let Ok(i) = trimmed.parse::<i64>() {
            return Value::Int(i);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            if f.is_finite() {
                return Value::Float(f);
            }
        }
    }
    Value::String(raw.to_string())
}

/// Read a CSV file with a header row
pub fn read_csv(path: &Path, infer_numbers: bool) -> Result<Table> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;

    let columns: Vec<String> = reader
        .headers()
        .with_context(|| format!("Failed to read CSV header: {}", path.display()))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read CSV row {}", idx + 2))?;
        rows.push(
            record
                .iter()
                .map(|cell| parse_cell(cell, infer_numbers))
                .collect(),
        );
    }

    let table = Table::from_rows(columns, rows);
    log::info!(
        "Read {} rows x {} columns from {}",
        table.len(),
        table.columns.len(),
        path.display()
    );
    Ok(table)
}

/// Write a table as CSV to any writer; header follows column order
pub fn write_csv_to<W: Write>(table: &Table, writer: W) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);

    wtr.write_record(&table.columns)
        .context("Failed to write CSV header")?;

    for (idx, row) in table.rows.iter().enumerate() {
        let cells: Vec<String> = table
            .columns
            .iter()
            .map(|c| row.get(c).map(Value::to_text).unwrap_or_default())
            .collect();
        wtr.write_record(&cells)
            .with_context(|| format!("Failed to write CSV row {}", idx + 1))?;
    }

    wtr.flush().context("Failed to flush CSV writer")?;
    Ok(())
}

/// Write a table to a CSV file
pub fn write_csv(table: &Table, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
    write_csv_to(table, file)?;
    log::info!("CSV file exported to: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("partsync-{}-{}", uuid::Uuid::new_v4(), name))
    }

    #[test]
    fn test_write_quotes_delimiters() {
        let table = Table::from_json_records(
            &["PN", "DESC", "QTY"],
            &json!([
                {"PN": "AB12", "DESC": "bolt, m8", "QTY": 4},
                {"PN": "CD99", "DESC": null, "QTY": 2.5}
            ]),
        );

        let mut buf = Vec::new();
        write_csv_to(&table, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert_eq!(text, "PN,DESC,QTY\nAB12,\"bolt, m8\",4\nCD99,,2.5\n");
    }

    #[test]
    fn test_read_csv_text_and_numbers() {
        let path = temp_path("read.csv");
        std::fs::write(&path, "PN,QTY,NOTE\nAB12,3,\n007,1.5,x\n").unwrap();

        let text = read_csv(&path, false).unwrap();
        assert_eq!(text.columns, vec!["PN", "QTY", "NOTE"]);
        assert_eq!(text.get(0, "QTY"), &Value::from("3"));
        assert_eq!(text.get(0, "NOTE"), &Value::Null);

        let numeric = read_csv(&path, true).unwrap();
        assert_eq!(numeric.get(0, "QTY"), &Value::Int(3));
        assert_eq!(numeric.get(1, "QTY"), &Value::Float(1.5));
        assert_eq!(numeric.get(1, "PN"), &Value::Int(7));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_csv_file_round_trip_keeps_column_order() {
        let path = temp_path("order.csv");
        let table = Table::from_json_records(&["Z", "A"], &json!([{"Z": "1", "A": "2"}]));
        write_csv(&table, &path).unwrap();

        let back = read_csv(&path, false).unwrap();
        assert_eq!(back.columns, vec!["Z", "A"]);
        assert_eq!(back.get(0, "A"), &Value::from("2"));

        std::fs::remove_file(&path).ok();
    }
}
