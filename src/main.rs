use std::{env, io, process::ExitCode};

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use snapshotter_cli::{
    cli::Cli,
    commands::AppContext,
    console::TerminalConsole,
    env::ProcessEnv,
    error::{AppError, Result},
    storage::StorePaths,
};

const LOG_ENV_VAR: &str = "POWERLOOM_LOG";

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(AppError::Aborted) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{} {e}", "error:".red());
            if let Some(hint) = e.hint() {
                eprintln!("{}", hint.yellow());
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let paths = StorePaths::resolve(cli.config_dir.clone())?;
    let ctx = AppContext::new(paths, env::current_dir()?, Box::new(ProcessEnv));
    let mut console = TerminalConsole::new();
    snapshotter_cli::run(cli, &ctx, &mut console)
}

/// Log filter from `POWERLOOM_LOG`, otherwise from the `-v` count
fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| {
        let level = match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        EnvFilter::new(format!("snapshotter_cli={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
