//! Commands that classify and update the master

use std::path::Path;

use anyhow::{Context, Result, bail};
use colored::*;

use partsync::ReconcileSession;
use partsync::io::{FileKind, export_audit_workbook, write_table};
use partsync::table::Table;

use crate::cli::output;
use crate::cli::{
    ClassifyArgs, GlobalArgs, LookupArgs, OutputFormat, RunArgs, UpdateArgs, load_config, read_input,
};

/// Resolve the lookup column from `--lookup` or a `--guess` suggestion
fn resolve_lookup(session: &mut ReconcileSession, args: &LookupArgs, format: OutputFormat) -> Result<String> {
    if let Some(lookup) = &args.lookup {
        return Ok(lookup.clone());
    }
    let Some(guess) = &args.guess else {
        bail!("Provide the lookup column with --lookup or a name to resolve with --guess");
    };

    let suggestion = session.suggest(guess)?;
    if suggestion.confidence == 0.0 {
        bail!(
            "No master column resembles '{}' - pass --lookup explicitly",
            guess
        );
    }
    if format == OutputFormat::Text {
        output::print_suggestion(guess, suggestion);
        println!();
    }
    Ok(suggestion.column.clone())
}

fn write_output(table: Option<&Table>, path: Option<&Path>, what: &str, format: OutputFormat) -> Result<()> {
    let (Some(table), Some(path)) = (table, path) else {
        return Ok(());
    };
    write_table(table, path).with_context(|| format!("Failed to write {}", what))?;
    if format == OutputFormat::Text {
        output::print_written(what, path);
    }
    Ok(())
}

fn write_report(session: &ReconcileSession, path: Option<&Path>, format: OutputFormat) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    if FileKind::from_path(path) != Some(FileKind::Excel) {
        bail!("Audit report must be an .xlsx file: {}", path.display());
    }
    export_audit_workbook(&session.report(), path)?;
    if format == OutputFormat::Text {
        output::print_written("audit report", path);
    }
    Ok(())
}

/// Handle `partsync classify`
pub fn handle_classify(global: &GlobalArgs, args: ClassifyArgs) -> Result<()> {
    let config = load_config(global)?;
    let mut session = ReconcileSession::new(config);

    session
        .load_master(&args.master.read()?)
        .context("Failed to clean master table")?;
    session
        .load_target(&args.target.read(args.master.infer_numbers)?)
        .context("Failed to clean target table")?;

    let lookup = resolve_lookup(&mut session, &args.lookup, global.format)?;
    let stats = session
        .classify(&lookup)
        .with_context(|| format!("Failed to classify with lookup column '{}'", lookup))?
        .clone();

    write_output(session.classified(), args.output.as_deref(), "classified target", global.format)?;

    match global.format {
        OutputFormat::Json => output::print_json(&stats)?,
        OutputFormat::Text => output::print_classification(&stats),
    }

    Ok(())
}

/// Handle `partsync update`
pub fn handle_update(global: &GlobalArgs, args: UpdateArgs) -> Result<()> {
    let config = load_config(global)?;
    let mut session = ReconcileSession::new(config);

    session
        .load_master(&args.master.read()?)
        .context("Failed to clean master table")?;

    let classified = read_input(
        &args.classified,
        args.classified_sheet.as_deref(),
        args.master.infer_numbers,
    )?;
    session
        .load_classified(classified, &args.lookup)
        .context("Classified input is missing required columns")?;

    let stats = session.apply().context("Failed to update master")?.clone();

    write_output(session.updated(), args.output.as_deref(), "updated master", global.format)?;
    write_report(&session, args.report.as_deref(), global.format)?;

    match global.format {
        OutputFormat::Json => output::print_json(&stats)?,
        OutputFormat::Text => output::print_update(&stats),
    }

    Ok(())
}

/// Handle `partsync run`
pub fn handle_run(global: &GlobalArgs, args: RunArgs) -> Result<()> {
    let config = load_config(global)?;
    let excluded = config.markers.excluded.clone();
    let intermediate = config.markers.intermediate.clone();
    let text = global.format == OutputFormat::Text;
    let mut session = ReconcileSession::new(config);

    let master_stats = session
        .load_master(&args.master.read()?)
        .context("Failed to clean master table")?;
    if text {
        output::print_master_cleaning(master_stats);
    }

    let target_stats = session
        .load_target(&args.target.read(args.master.infer_numbers)?)
        .context("Failed to clean target table")?;
    if text {
        output::print_target_cleaning(target_stats);
    }

    let lookup = resolve_lookup(&mut session, &args.lookup, global.format)?;

    if args.flag_retired {
        let insights = session
            .flag_retired(&lookup)
            .context("Failed to flag retired parts")?;
        if text {
            output::print_insights(insights, &excluded, &intermediate);
        }
    }

    let classification = session
        .classify(&lookup)
        .with_context(|| format!("Failed to classify with lookup column '{}'", lookup))?;
    if text {
        output::print_classification(classification);
    }

    let update = session.apply().context("Failed to update master")?;
    if text {
        output::print_update(update);
    }

    write_output(session.classified(), args.classified_output.as_deref(), "classified target", global.format)?;
    write_output(session.updated(), args.output.as_deref(), "updated master", global.format)?;
    write_report(&session, args.report.as_deref(), global.format)?;

    if global.format == OutputFormat::Json {
        output::print_json(&session.report())?;
    } else if args.output.is_none() {
        println!(
            "{}",
            "Dry run: pass --output to save the updated master".dimmed()
        );
    }

    Ok(())
}
