//! Excel audit workbook for a reconciliation run
//!
//! Sheets:
//! - Summary: run metadata and counters
//! - Updates: one row per master mutation
//! - Duplicates: `"0"` rows already present in the master
//! - Classification: status distribution of the target

use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::*;

use super::excel::write_value;
use crate::reconcile::ReconciliationReport;

fn header_format() -> Format {
    Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0x4472C4))
        .set_font_color(Color::White)
}

/// Export the audit workbook to `path`
pub fn export_audit_workbook(report: &ReconciliationReport, path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();

    create_summary_sheet(&mut workbook, report)?;
    create_updates_sheet(&mut workbook, report)?;
    create_duplicates_sheet(&mut workbook, report)?;
    create_classification_sheet(&mut workbook, report)?;

    workbook
        .save(path)
        .with_context(|| format!("Failed to save Excel file: {}", path.display()))?;

    log::info!("Audit report exported to: {}", path.display());
    Ok(())
}

fn create_summary_sheet(workbook: &mut Workbook, report: &ReconciliationReport) -> Result<()> {
    let sheet = workbook.add_worksheet();
    sheet.set_name("Summary")?;

    let title_format = Format::new().set_bold().set_font_size(16);
    let section_format = header_format().set_font_size(14);
    let bold_format = Format::new().set_bold();

    sheet.write_string_with_format(0, 0, "Part Master Reconciliation Report", &title_format)?;
    sheet.write_string(
        1,
        0,
        &format!(
            "Generated: {}",
            report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ),
    )?;
    sheet.write_string(2, 0, &format!("Run: {}", report.run_id))?;

    let mut row = 4u32;

    sheet.write_string_with_format(row, 0, "COLUMNS", &section_format)?;
    row += 1;
    sheet.write_string(row, 0, "Key Column")?;
    sheet.write_string(row, 1, &report.key_column)?;
    row += 1;
    sheet.write_string(row, 0, "Lookup Column")?;
    sheet.write_string(row, 1, report.lookup_column.as_deref().unwrap_or("-"))?;
    row += 1;
    if let Some(suggestion) = &report.suggestion {
        sheet.write_string(row, 0, "Suggested Column")?;
        sheet.write_string(
            row,
            1,
            &format!(
                "{} {} ({:.2})",
                suggestion.column,
                suggestion.kind.label(),
                suggestion.confidence
            ),
        )?;
        row += 1;
    }
    row += 1;

    let mut metrics: Vec<(&str, f64)> = Vec::new();
    if let Some(cleaning) = &report.master_cleaning {
        metrics.push(("Master Rows (original)", cleaning.original_shape.0 as f64));
        metrics.push(("Master Rows (clean)", cleaning.final_shape.0 as f64));
        metrics.push(("Master Rows Dropped", cleaning.rows_dropped as f64));
    }
    if let Some(insights) = &report.insights {
        metrics.push(("Master Rows Re-marked", insights.remarked as f64));
    }
    if let Some(classification) = &report.classification {
        metrics.push(("Target Rows Classified", classification.total_processed as f64));
        metrics.push(("Lookup Map Size", classification.lookup_map_size as f64));
    }
    if let Some(update) = &report.update {
        metrics.push(("Records Updated", update.updated_count as f64));
        metrics.push(("Records Inserted", update.inserted_count as f64));
        metrics.push(("Duplicates", update.duplicates_count as f64));
        metrics.push(("Skipped", update.skipped_count as f64));
        metrics.push(("Unmatched Updates", update.unmatched_count as f64));
        metrics.push(("Ignored Statuses", update.ignored_count as f64));
    }

    sheet.write_string_with_format(row, 0, "SUMMARY", &section_format)?;
    row += 1;
    sheet.write_string_with_format(row, 0, "Metric", &bold_format)?;
    sheet.write_string_with_format(row, 1, "Value", &bold_format)?;
    row += 1;
    for (label, value) in metrics {
        sheet.write_string(row, 0, label)?;
        sheet.write_number(row, 1, value)?;
        row += 1;
    }

    let warnings: Vec<String> = report
        .master_cleaning
        .iter()
        .flat_map(|c| c.warnings.iter())
        .chain(report.classification.iter().flat_map(|c| c.warnings.iter()))
        .chain(report.update.iter().flat_map(|u| u.warnings.iter()))
        .map(|w| w.to_string())
        .collect();

    if !warnings.is_empty() {
        row += 1;
        sheet.write_string_with_format(row, 0, "WARNINGS", &section_format)?;
        row += 1;
        for warning in &warnings {
            sheet.write_string(row, 0, warning)?;
            row += 1;
        }
    }

    sheet.autofit();
    Ok(())
}

fn create_updates_sheet(workbook: &mut Workbook, report: &ReconciliationReport) -> Result<()> {
    let sheet = workbook.add_worksheet();
    sheet.set_name("Updates")?;

    let header = header_format();
    let inserted_format = Format::new().set_background_color(Color::RGB(0xC6EFCE));

    let headers = ["Key", "Action", "Column", "Before", "Intermediate", "After"];
    for (col, title) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, &header)?;
    }

    let diffs = report.update.as_ref().map(|u| u.diffs.as_slice()).unwrap_or(&[]);
    if diffs.is_empty() {
        sheet.write_string(1, 0, "No master records changed")?;
    }

    for (idx, diff) in diffs.iter().enumerate() {
        let row = idx as u32 + 1;
        let action = diff.action.label();
        if diff.before.is_null() {
            sheet.write_string_with_format(row, 0, &diff.key, &inserted_format)?;
            sheet.write_string_with_format(row, 1, action, &inserted_format)?;
        } else {
            sheet.write_string(row, 0, &diff.key)?;
            sheet.write_string(row, 1, action)?;
        }
        sheet.write_string(row, 2, &diff.column)?;
        write_value(sheet, row, 3, &diff.before)?;
        if let Some(intermediate) = &diff.intermediate {
            write_value(sheet, row, 4, intermediate)?;
        }
        write_value(sheet, row, 5, &diff.after)?;
    }

    sheet.autofit();
    Ok(())
}

fn create_duplicates_sheet(workbook: &mut Workbook, report: &ReconciliationReport) -> Result<()> {
    let sheet = workbook.add_worksheet();
    sheet.set_name("Duplicates")?;

    let header = header_format();
    let headers = ["Key", "Target Row", "Master Row", "Master Record", "Target Record"];
    for (col, title) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, &header)?;
    }

    let duplicates = report
        .update
        .as_ref()
        .map(|u| u.duplicates.as_slice())
        .unwrap_or(&[]);
    if duplicates.is_empty() {
        sheet.write_string(1, 0, "No duplicates found")?;
    }

    for (idx, dup) in duplicates.iter().enumerate() {
        let row = idx as u32 + 1;
        sheet.write_string(row, 0, &dup.key)?;
        // Rows as shown in a spreadsheet: header is row 1
        sheet.write_number(row, 1, (dup.target_row + 2) as f64)?;
        sheet.write_number(row, 2, (dup.master_row + 2) as f64)?;
        sheet.write_string(row, 3, &dup.master_record.to_string())?;
        sheet.write_string(row, 4, &dup.target_record.to_string())?;
    }

    sheet.autofit();
    Ok(())
}

fn create_classification_sheet(workbook: &mut Workbook, report: &ReconciliationReport) -> Result<()> {
    let sheet = workbook.add_worksheet();
    sheet.set_name("Classification")?;

    let header = header_format();
    sheet.write_string_with_format(0, 0, "Status", &header)?;
    sheet.write_string_with_format(0, 1, "Count", &header)?;
    sheet.write_string_with_format(0, 2, "Percent", &header)?;

    let Some(stats) = &report.classification else {
        sheet.write_string(1, 0, "Classification not run")?;
        sheet.autofit();
        return Ok(());
    };

    let mut row = 1u32;
    for (status, count) in &stats.status_counts {
        sheet.write_string(row, 0, status)?;
        sheet.write_number(row, 1, *count as f64)?;
        let percent = stats.status_percentages.get(status).copied().unwrap_or(0.0);
        sheet.write_number(row, 2, percent)?;
        row += 1;
    }

    sheet.autofit();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReconcileConfig;
    use crate::reconcile::ReconcileSession;
    use crate::table::Table;
    use calamine::{Data, Reader, open_workbook_auto};
    use serde_json::json;

    #[test]
    fn test_audit_workbook_sheets() {
        let mut session = ReconcileSession::new(ReconcileConfig::builder().key_column("PN").build());
        session
            .load_master(&Table::from_json_records(
                &["PN", "COL"],
                &json!([{"PN": "AB12", "COL": "D"}, {"PN": "CD34", "COL": null}]),
            ))
            .unwrap();
        session
            .load_target(&Table::from_json_records(
                &["DESC", "PN"],
                &json!([
                    {"DESC": "a", "PN": "AB12"},
                    {"DESC": "b", "PN": "CD34"},
                    {"DESC": "c", "PN": "EF56"}
                ]),
            ))
            .unwrap();
        session.classify("COL").unwrap();
        session.apply().unwrap();
        let report = session.report();

        let path = std::env::temp_dir().join(format!("partsync-audit-{}.xlsx", uuid::Uuid::new_v4()));
        export_audit_workbook(&report, &path).unwrap();

        let mut workbook = open_workbook_auto(&path).unwrap();
        assert_eq!(
            workbook.sheet_names().to_vec(),
            vec!["Summary", "Updates", "Duplicates", "Classification"]
        );

        let updates = workbook.worksheet_range("Updates").unwrap();
        // Header plus one update and one insert
        assert_eq!(updates.height(), 3);
        assert_eq!(updates.get((1, 0)), Some(&Data::String("AB12".to_string())));

        let duplicates = workbook.worksheet_range("Duplicates").unwrap();
        assert_eq!(duplicates.get((1, 0)), Some(&Data::String("CD34".to_string())));

        std::fs::remove_file(&path).ok();
    }
}
