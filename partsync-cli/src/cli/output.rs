//! Human-readable and JSON rendering of command results

use anyhow::{Context, Result};
use colored::*;
use serde::Serialize;

use partsync::DataQualityWarning;
use partsync::reconcile::{
    ClassificationStats, GenericCleaningStats, MasterCleaningStats, MasterInsights, UpdateStats,
};
use partsync::services::matching::ColumnSuggestion;

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to format JSON output")?;
    println!("{}", text);
    Ok(())
}

fn heading(title: &str) {
    println!("{}", title.bold().underline());
}

fn metric(label: &str, value: impl std::fmt::Display) {
    println!("  {:<28} {}", label, value.to_string().cyan());
}

pub fn print_warnings(warnings: &[DataQualityWarning]) {
    for warning in warnings {
        println!("  {} {}", "warning:".yellow().bold(), warning);
    }
}

pub fn print_master_cleaning(stats: &MasterCleaningStats) {
    heading("Master cleaning");
    metric("Shape before", format!("{} x {}", stats.original_shape.0, stats.original_shape.1));
    metric("Shape after", format!("{} x {}", stats.final_shape.0, stats.final_shape.1));
    metric("Rows with null key", stats.rows_with_null_key);
    metric("Rows dropped", stats.rows_dropped);
    for rename in &stats.columns_renamed {
        println!("  {} {}", "renamed:".dimmed(), rename);
    }
    print_warnings(&stats.warnings);
    println!();
}

pub fn print_target_cleaning(stats: &GenericCleaningStats) {
    heading("Target cleaning");
    metric("Shape", format!("{} x {}", stats.final_shape.0, stats.final_shape.1));
    metric("Text columns cleaned", stats.string_columns_cleaned);
    metric("Leading columns swapped", stats.columns_swapped);
    for (old, new) in stats.columns_standardized.iter().filter(|(o, n)| o != n) {
        println!("  {} {} -> {}", "renamed:".dimmed(), old, new);
    }
    println!();
}

pub fn print_insights(insights: &MasterInsights, excluded: &str, intermediate: &str) {
    heading("Retired parts");
    metric(
        &format!("'{}' markers", excluded),
        format!("{} -> {}", insights.excluded_before, insights.excluded_after),
    );
    metric(
        &format!("'{}' markers", intermediate),
        format!("{} -> {}", insights.intermediate_before, insights.intermediate_after),
    );
    metric("Re-marked", insights.remarked);
    println!();
}

pub fn print_suggestion(input: &str, suggestion: &ColumnSuggestion) {
    let confidence = format!("{:.2}", suggestion.confidence);
    let confidence = if suggestion.confidence >= 0.9 {
        confidence.green()
    } else if suggestion.confidence > 0.0 {
        confidence.yellow()
    } else {
        confidence.red()
    };
    println!(
        "{} -> {} {} {}",
        input.dimmed(),
        suggestion.column.bright_green().bold(),
        suggestion.kind.label().dimmed(),
        confidence
    );
}

pub fn print_classification(stats: &ClassificationStats) {
    heading("Classification");
    metric("Master records", stats.master_records);
    metric("Lookup map size", stats.lookup_map_size);
    metric("Target rows", stats.total_processed);
    for (status, count) in &stats.status_counts {
        let pct = stats.status_percentages.get(status).copied().unwrap_or(0.0);
        println!("  {:<28} {} ({:.2}%)", status.bold(), count, pct);
    }
    print_warnings(&stats.warnings);
    println!();
}

pub fn print_update(stats: &UpdateStats) {
    heading("Master update");
    metric("Updated", stats.updated_count.to_string().green());
    metric("Inserted", stats.inserted_count.to_string().green());
    metric("Duplicates", stats.duplicates_count.to_string().yellow());
    metric("Skipped", stats.skipped_count);
    if stats.unmatched_count > 0 || stats.ignored_count > 0 {
        metric("  of which unmatched", stats.unmatched_count);
        metric("  of which ignored", stats.ignored_count);
    }
    print_warnings(&stats.warnings);
    println!();
}

pub fn print_written(what: &str, path: &std::path::Path) {
    println!("{} {} to {}", "Wrote".green(), what, path.display().to_string().bright_green());
}
