//! Subcommand handlers

pub mod config;
pub mod inspect;
pub mod reconcile;

use anyhow::Result;

use super::{Cli, Commands};

/// Dispatch a parsed command line
pub fn dispatch(cli: Cli) -> Result<()> {
    let global = cli.global;
    match cli.command {
        Commands::Clean(args) => inspect::handle_clean(&global, args),
        Commands::Columns(args) => inspect::handle_columns(&global, args),
        Commands::Suggest(args) => inspect::handle_suggest(&global, args),
        Commands::Classify(args) => reconcile::handle_classify(&global, args),
        Commands::Update(args) => reconcile::handle_update(&global, args),
        Commands::Run(args) => reconcile::handle_run(&global, args),
        Commands::Config { action } => config::handle_config(&global, action),
    }
}
