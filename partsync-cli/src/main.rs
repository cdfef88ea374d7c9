mod cli;

use std::process::ExitCode;

use clap::Parser;

use cli::Cli;
use partsync::ReconcileError;

fn main() -> ExitCode {
    // .env may set RUST_LOG, so load it before the logger
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    cli::init_logging(cli.global.verbose);
    cli::configure_colors(cli.global.no_color);

    match cli::commands::dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            exit_code_for_error(&e)
        }
    }
}

/// 2 for problems with the inputs, 1 for everything else
fn exit_code_for_error(err: &anyhow::Error) -> ExitCode {
    let input_error = err.chain().any(|cause| cause.is::<ReconcileError>());
    if input_error {
        ExitCode::from(2)
    } else {
        ExitCode::from(1)
    }
}
