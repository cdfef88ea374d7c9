//! File adapters between disk formats and [`Table`](crate::table::Table)
//!
//! The reconciliation engine never touches files; these adapters exist for the
//! command line front end.

pub mod delimited;
pub mod excel;
pub mod report;

use std::path::Path;

use anyhow::{Result, bail};

use crate::table::Table;

pub use delimited::{read_csv, write_csv, write_csv_to};
pub use excel::{cell_to_value, read_excel, sheet_names, write_table_xlsx};
pub use report::export_audit_workbook;

/// Supported tabular file kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Csv,
    Excel,
}

impl FileKind {
    /// Detect kind from the file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "csv" => Some(FileKind::Csv),
            "xlsx" | "xlsm" | "xls" => Some(FileKind::Excel),
            _ => None,
        }
    }
}

/// Options applied when reading a table
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Worksheet to read; first sheet when absent
    pub sheet: Option<String>,
    /// Parse numeric CSV cells as numbers instead of text
    pub infer_numbers: bool,
}

/// Read a CSV or Excel file into a table
pub fn read_table(path: &Path, options: &ReadOptions) -> Result<Table> {
    match FileKind::from_path(path) {
        Some(FileKind::Csv) => read_csv(path, options.infer_numbers),
        Some(FileKind::Excel) => read_excel(path, options.sheet.as_deref()),
        None => bail!(
            "Unsupported file type: {} (expected .csv, .xlsx, .xlsm or .xls)",
            path.display()
        ),
    }
}

/// Write a table as CSV or XLSX depending on the extension
pub fn write_table(table: &Table, path: &Path) -> Result<()> {
    match FileKind::from_path(path) {
        Some(FileKind::Csv) => write_csv(table, path),
        Some(FileKind::Excel) => write_table_xlsx(table, path, "Master"),
        None => bail!(
            "Unsupported output type: {} (expected .csv or .xlsx)",
            path.display()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_kind_detection() {
        assert_eq!(FileKind::from_path(Path::new("a/master.CSV")), Some(FileKind::Csv));
        assert_eq!(FileKind::from_path(Path::new("bom.xlsm")), Some(FileKind::Excel));
        assert_eq!(FileKind::from_path(Path::new("notes.txt")), None);
        assert_eq!(FileKind::from_path(Path::new("noext")), None);
    }

    #[test]
    fn test_unsupported_read_fails() {
        let err = read_table(Path::new("data.json"), &ReadOptions::default()).unwrap_err();
        assert!(err.to_string().contains("Unsupported file type"));
    }
}
