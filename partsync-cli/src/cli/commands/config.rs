//! `partsync config` subcommands

use anyhow::{Context, Result, bail};
use colored::*;

use partsync::ReconcileConfig;

use crate::cli::{ConfigAction, GlobalArgs, OutputFormat, load_config};

pub fn handle_config(global: &GlobalArgs, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(global)?;
            match global.format {
                OutputFormat::Json => crate::cli::output::print_json(&config)?,
                OutputFormat::Text => print!("{}", config.to_toml()?),
            }
        }
        ConfigAction::Path => {
            let path = ReconcileConfig::default_path()
                .context("Could not determine the user config directory")?;
            let state = if path.exists() {
                "exists".green()
            } else {
                "not created".yellow()
            };
            println!("{} ({})", path.display(), state);
        }
        ConfigAction::Init { force } => {
            let path = global
                .config
                .clone()
                .or_else(ReconcileConfig::default_path)
                .context("Could not determine the user config directory")?;

            if path.exists() && !force {
                bail!(
                    "Config file already exists: {} (use --force to overwrite)",
                    path.display()
                );
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }

            let text = ReconcileConfig::default().to_toml()?;
            std::fs::write(&path, text)
                .with_context(|| format!("Failed to write config file: {}", path.display()))?;

            log::info!("Default configuration written to {}", path.display());
            println!("{} {}", "Created".green(), path.display().to_string().bright_green());
        }
    }
    Ok(())
}
