//! Profile and credential store for Powerloom snapshotter nodes.
//!
//! Profiles are directories under `<root>/profiles/`, each holding namespaced
//! `.env.<chain>.<market>.<source_chain>` credential files. Profile metadata and the
//! default/last-used selection live in `<root>/config.json`.

pub mod cli;
pub mod commands;
pub mod console;
pub mod credentials;
pub mod env;
pub mod error;
pub mod menu;
pub mod migration;
pub mod profile;
pub mod resolver;
pub mod storage;
pub mod transfer;
pub mod validation;

use cli::Cli;
use commands::{AppContext, dispatch};
use console::Console;
use error::Result;

/// Runs the parsed command line; no subcommand opens the interactive menu
pub fn run(cli: Cli, ctx: &AppContext, console: &mut dyn Console) -> Result<()> {
    match cli.command {
        Some(command) => dispatch(ctx, console, command),
        None => menu::run_menu(ctx, console),
    }
}
