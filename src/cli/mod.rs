//! cli
//!
//! Command-line interface layer for git-evtag.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments
//! - Initialize logging
//! - Delegate to command handlers
//! - Map failures to exit statuses
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and dispatches to the
//! [`crate::engine`] for execution. Errors travel as `anyhow::Error`; the
//! exit status comes from the first [`EvtagError`] in the error chain.

pub mod args;
pub mod commands;

pub use args::{Cli, Mode};

use anyhow::Result;

use crate::core::error::EvtagError;
use crate::ui::{logging, output::Verbosity};

/// Exit status for failures outside the error taxonomy.
pub const GENERIC_FAILURE: i32 = 1;

/// Run the CLI application with parsed arguments.
///
/// This is the main entry point called from `main.rs`.
pub fn run(cli: Cli) -> Result<()> {
    let verbosity = Verbosity::from_flags(cli.quiet, cli.debug);
    logging::init(verbosity);

    let ctx = commands::Context {
        repo: cli.repo.clone(),
        verbosity,
        json: cli.json,
        stats: cli.stats,
        compat: cli.compat,
        jobs: cli.jobs.map(usize::from),
    };

    commands::dispatch(cli.mode(), &ctx)
}

/// The exit status for a failed run.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<EvtagError>())
        .map(EvtagError::exit_code)
        .unwrap_or(GENERIC_FAILURE)
}
