//! Excel import and plain table export

use std::path::Path;

use anyhow::{Context, Result};
use calamine::{Data, Reader, open_workbook_auto};
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

use crate::error::ReconcileError;
use crate::table::{Table, Value};

/// Convert Excel cell to a table value
pub fn cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Int(i) => Value::Int(*i),
        Data::Float(f) => {
            // Whole numbers come back as integers
            if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                Value::Int(*f as i64)
            } else {
                Value::Float(*f)
            }
        }
        Data::Bool(b) => Value::String(b.to_string()),
        Data::DateTime(dt) => Value::String(format!("{}", dt)),
        Data::DateTimeIso(s) => Value::String(s.clone()),
        Data::DurationIso(s) => Value::String(s.clone()),
        Data::Error(_) => Value::Null,
    }
}

/// Header text for a cell; blank headers become `COLUMN_<n>`
fn header_name(cell: Option<&Data>, idx: usize) -> String {
    let name = match cell {
        Some(Data::String(s)) => s.clone(),
        Some(Data::Empty) | None => String::new(),
        Some(other) => other.to_string(),
    };
    if name.trim().is_empty() {
        format!("COLUMN_{}", idx + 1)
    } else {
        name
    }
}

/// Worksheet names in workbook order
pub fn sheet_names(path: &Path) -> Result<Vec<String>> {
    let workbook = open_workbook_auto(path)
        .with_context(|| format!("Failed to open Excel file: {}", path.display()))?;
    Ok(workbook.sheet_names().to_vec())
}

/// Read one worksheet; the first row is the header
///
/// Without `sheet` the first worksheet is used. An unknown sheet name fails
/// with [`ReconcileError::MissingSheet`].
pub fn read_excel(path: &Path, sheet: Option<&str>) -> Result<Table> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("Failed to open Excel file: {}", path.display()))?;

    let available: Vec<String> = workbook.sheet_names().to_vec();
    let sheet_name = match sheet {
        Some(name) if available.iter().any(|s| s == name) => name.to_string(),
        Some(name) => {
            return Err(ReconcileError::MissingSheet {
                sheet: name.to_string(),
                available,
            }
            .into());
        }
        None => available
            .first()
            .cloned()
            .with_context(|| format!("Workbook has no sheets: {}", path.display()))?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .with_context(|| format!("Failed to read sheet: {}", sheet_name))?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        log::warn!("Sheet '{}' is empty", sheet_name);
        return Ok(Table::default());
    };

    let width = range.width();
    let columns: Vec<String> = (0..width).map(|i| header_name(header.get(i), i)).collect();

    let data: Vec<Vec<Value>> = rows
        .map(|row| row.iter().map(cell_to_value).collect())
        .filter(|cells: &Vec<Value>| cells.iter().any(|v| !v.is_null()))
        .collect();

    let table = Table::from_rows(columns, data);
    log::info!(
        "Read {} rows x {} columns from sheet '{}' of {}",
        table.len(),
        table.columns.len(),
        sheet_name,
        path.display()
    );
    Ok(table)
}

/// Write a cell, leaving nulls blank
pub(crate) fn write_value(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &Value,
) -> Result<(), XlsxError> {
    match value {
        Value::Null => {}
        Value::String(s) => {
            sheet.write_string(row, col, s)?;
        }
        Value::Int(i) => {
            sheet.write_number(row, col, *i as f64)?;
        }
        Value::Float(f) => {
            sheet.write_number(row, col, *f)?;
        }
    }
    Ok(())
}

/// Write a table to a worksheet with a bold header row
pub(crate) fn write_table_sheet(sheet: &mut Worksheet, table: &Table) -> Result<(), XlsxError> {
    let header_format = Format::new().set_bold();

    for (col, name) in table.columns.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, name, &header_format)?;
    }
    for (idx, record) in table.rows.iter().enumerate() {
        let row = idx as u32 + 1;
        for (col, name) in table.columns.iter().enumerate() {
            if let Some(value) = record.get(name) {
                write_value(sheet, row, col as u16, value)?;
            }
        }
    }
    sheet.autofit();
    Ok(())
}

/// Export a table to a single-sheet XLSX file
pub fn write_table_xlsx(table: &Table, path: &Path, sheet_name: &str) -> Result<()> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(sheet_name)?;
    write_table_sheet(sheet, table)?;

    workbook
        .save(path)
        .with_context(|| format!("Failed to save Excel file: {}", path.display()))?;

    log::info!("Excel file exported to: {}", path.display());
    Ok(())
}
