//! Commands that look at the data without reconciling it

use anyhow::{Context, Result};
use colored::*;
use serde_json::json;

use partsync::ReconcileSession;
use partsync::io::write_table;
use partsync::services::matching::filter_columns;

use crate::cli::output;
use crate::cli::{CleanArgs, ColumnsArgs, GlobalArgs, OutputFormat, SuggestArgs, load_config, read_input};

/// Handle `partsync clean`
pub fn handle_clean(global: &GlobalArgs, args: CleanArgs) -> Result<()> {
    let config = load_config(global)?;
    let mut session = ReconcileSession::new(config);

    let raw_master = args.master.read()?;
    let master_stats = session
        .load_master(&raw_master)
        .context("Failed to clean master table")?
        .clone();

    let target_stats = match &args.target {
        Some(path) => {
            let raw = read_input(path, args.target_sheet.as_deref(), args.master.infer_numbers)?;
            Some(
                session
                    .load_target(&raw)
                    .context("Failed to clean target table")?
                    .clone(),
            )
        }
        None => None,
    };

    if let (Some(path), Some(master)) = (&args.output, session.master()) {
        write_table(master, path)?;
    }
    if let (Some(path), Some(target)) = (&args.target_output, session.target()) {
        write_table(target, path)?;
    }

    match global.format {
        OutputFormat::Json => output::print_json(&json!({
            "master": master_stats,
            "target": target_stats,
        }))?,
        OutputFormat::Text => {
            output::print_master_cleaning(&master_stats);
            if let Some(stats) = &target_stats {
                output::print_target_cleaning(stats);
            }
            if let Some(path) = &args.output {
                output::print_written("cleaned master", path);
            }
            if let Some(path) = &args.target_output {
                output::print_written("cleaned target", path);
            }
        }
    }

    Ok(())
}

/// Handle `partsync columns`
pub fn handle_columns(global: &GlobalArgs, args: ColumnsArgs) -> Result<()> {
    let config = load_config(global)?;
    let mut session = ReconcileSession::new(config);

    let raw_master = args.master.read()?;
    session
        .load_master(&raw_master)
        .context("Failed to clean master table")?;

    let permitted = session.permitted_columns()?;
    let ranked = filter_columns(args.filter.as_deref().unwrap_or(""), &permitted);

    match global.format {
        OutputFormat::Json => {
            let items: Vec<_> = ranked
                .iter()
                .map(|(column, score)| json!({"column": column, "score": score}))
                .collect();
            output::print_json(&items)?;
        }
        OutputFormat::Text => {
            if ranked.is_empty() {
                println!("{}", "No matching columns".yellow());
            }
            for (column, score) in &ranked {
                if args.filter.is_some() {
                    println!("  {} {}", column.bold(), format!("({})", score).dimmed());
                } else {
                    println!("  {}", column);
                }
            }
        }
    }

    Ok(())
}

/// Handle `partsync suggest`
pub fn handle_suggest(global: &GlobalArgs, args: SuggestArgs) -> Result<()> {
    let config = load_config(global)?;
    let mut session = ReconcileSession::new(config);

    let raw_master = args.master.read()?;
    session
        .load_master(&raw_master)
        .context("Failed to clean master table")?;

    let suggestion = session.suggest(&args.input)?;

    match global.format {
        OutputFormat::Json => output::print_json(suggestion)?,
        OutputFormat::Text => output::print_suggestion(&args.input, suggestion),
    }

    Ok(())
}
