//! Command line definitions

pub mod commands;
pub mod output;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use is_terminal::IsTerminal;

use partsync::ReconcileConfig;
use partsync::io::{ReadOptions, read_table};
use partsync::table::Table;

#[derive(Parser)]
#[command(name = "partsync")]
#[command(about = "Reconcile a master parts table against incoming target sheets")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Configuration file (defaults to <config dir>/partsync/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Output format for results
    #[arg(long, short, global = true, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Normalize a master (and optionally a target) and show what changed
    Clean(CleanArgs),
    /// List master columns eligible as lookup columns
    Columns(ColumnsArgs),
    /// Suggest the master column a free-text name refers to
    Suggest(SuggestArgs),
    /// Classify target rows against the master
    Classify(ClassifyArgs),
    /// Apply an already classified target to the master
    Update(UpdateArgs),
    /// Run the full reconciliation from raw files
    Run(RunArgs),
    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print the default configuration file location
    Path,
    /// Write the default configuration to the default location
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct MasterInput {
    /// Master table (.csv, .xlsx, .xlsm, .xls)
    #[arg(long, short, value_name = "FILE")]
    pub master: PathBuf,

    /// Worksheet to read from the master workbook
    #[arg(long, value_name = "NAME")]
    pub master_sheet: Option<String>,

    /// Parse numeric CSV cells as numbers
    #[arg(long)]
    pub infer_numbers: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TargetInput {
    /// Target table (.csv, .xlsx, .xlsm, .xls)
    #[arg(long, short, value_name = "FILE")]
    pub target: PathBuf,

    /// Worksheet to read from the target workbook
    #[arg(long, value_name = "NAME")]
    pub target_sheet: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct CleanArgs {
    #[command(flatten)]
    pub master: MasterInput,

    /// Target table to normalize as well
    #[arg(long, value_name = "FILE")]
    pub target: Option<PathBuf>,

    #[arg(long, value_name = "NAME")]
    pub target_sheet: Option<String>,

    /// Write the cleaned master here (.csv or .xlsx)
    #[arg(long, short, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Write the cleaned target here (.csv or .xlsx)
    #[arg(long, value_name = "FILE")]
    pub target_output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ColumnsArgs {
    #[command(flatten)]
    pub master: MasterInput,

    /// Fuzzy filter applied to the column names
    #[arg(long, value_name = "QUERY")]
    pub filter: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct SuggestArgs {
    #[command(flatten)]
    pub master: MasterInput,

    /// Free-text column name, e.g. J74_V710_B2_PP_YOTK
    pub input: String,
}

#[derive(Args, Debug, Clone)]
pub struct LookupArgs {
    /// Lookup column in the master
    #[arg(long, short, value_name = "COLUMN", conflicts_with = "guess")]
    pub lookup: Option<String>,

    /// Free-text name resolved to a lookup column through suggestion
    #[arg(long, value_name = "TEXT")]
    pub guess: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ClassifyArgs {
    #[command(flatten)]
    pub master: MasterInput,

    #[command(flatten)]
    pub target: TargetInput,

    #[command(flatten)]
    pub lookup: LookupArgs,

    /// Write the classified target here (.csv or .xlsx)
    #[arg(long, short, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct UpdateArgs {
    #[command(flatten)]
    pub master: MasterInput,

    /// Classified target holding the status column
    #[arg(long, short, value_name = "FILE")]
    pub classified: PathBuf,

    #[arg(long, value_name = "NAME")]
    pub classified_sheet: Option<String>,

    /// Lookup column in the master
    #[arg(long, short, value_name = "COLUMN")]
    pub lookup: String,

    /// Write the updated master here (.csv or .xlsx)
    #[arg(long, short, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Write the audit workbook here (.xlsx)
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub master: MasterInput,

    #[command(flatten)]
    pub target: TargetInput,

    #[command(flatten)]
    pub lookup: LookupArgs,

    /// Re-mark master rows whose key is missing from the target before classifying
    #[arg(long)]
    pub flag_retired: bool,

    /// Write the updated master here (.csv or .xlsx)
    #[arg(long, short, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Write the classified target here (.csv or .xlsx)
    #[arg(long, value_name = "FILE")]
    pub classified_output: Option<PathBuf>,

    /// Write the audit workbook here (.xlsx)
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,
}

/// Initialize env_logger; `RUST_LOG` wins over `-v`
pub fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// Turn colors off for --no-color or when stdout is not a terminal
pub fn configure_colors(no_color: bool) {
    if no_color || !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }
}

pub fn load_config(global: &GlobalArgs) -> Result<ReconcileConfig> {
    ReconcileConfig::load(global.config.as_deref()).context("Failed to load configuration")
}

pub fn read_input(path: &Path, sheet: Option<&str>, infer_numbers: bool) -> Result<Table> {
    if !path.exists() {
        anyhow::bail!("Input file does not exist: {}", path.display());
    }
    let options = ReadOptions {
        sheet: sheet.map(str::to_string),
        infer_numbers,
    };
    read_table(path, &options).with_context(|| format!("Failed to read {}", path.display()))
}

impl MasterInput {
    pub fn read(&self) -> Result<Table> {
        read_input(&self.master, self.master_sheet.as_deref(), self.infer_numbers)
    }
}

impl TargetInput {
    pub fn read(&self, infer_numbers: bool) -> Result<Table> {
        read_input(&self.target, self.target_sheet.as_deref(), infer_numbers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_command() {
        let cli = Cli::parse_from([
            "partsync", "run", "-m", "master.xlsx", "-t", "target.csv", "--guess",
            "J74_V710_B2_PP_YOTK", "--format", "json", "-vv",
        ]);
        assert_eq!(cli.global.format, OutputFormat::Json);
        assert_eq!(cli.global.verbose, 2);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.master.master, PathBuf::from("master.xlsx"));
                assert_eq!(args.lookup.guess.as_deref(), Some("J74_V710_B2_PP_YOTK"));
                assert!(args.lookup.lookup.is_none());
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_lookup_and_guess_conflict() {
        let result = Cli::try_parse_from([
            "partsync", "classify", "-m", "m.csv", "-t", "t.csv", "-l", "COL", "--guess", "x",
        ]);
        assert!(result.is_err());
    }
}
