//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Opens the repository and loads configuration
//! 2. Calls the engine to execute the command
//! 3. Formats and displays output
//!
//! Handlers do NOT read or write objects directly; the engine does.

mod compute;
mod sign;
mod verify;

pub use compute::compute;
pub use sign::sign;
pub use verify::verify;

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use tracing::debug;

use super::args::Mode;
use crate::core::config::Config;
use crate::core::error::EvtagError;
use crate::engine::ComputeOptions;
use crate::git::Git;
use crate::trust::GpgBackend;
use crate::ui::output::Verbosity;

/// Execution context built from global flags.
#[derive(Debug, Clone)]
pub struct Context {
    /// Path inside the repository
    pub repo: Option<PathBuf>,
    /// Output verbosity
    pub verbosity: Verbosity,
    /// Render results as JSON
    pub json: bool,
    /// Print the statistics comment line
    pub stats: bool,
    /// Disable deduplication
    pub compat: bool,
    /// Worker count override
    pub jobs: Option<usize>,
}

impl Context {
    /// Open the repository and load its configuration.
    pub(crate) fn open(&self) -> Result<(Git, Config)> {
        let path = match &self.repo {
            Some(path) => path.clone(),
            None => std::env::current_dir().context("Failed to determine current directory")?,
        };
        let git = Git::open(&path).map_err(EvtagError::from)?;
        let config = Config::load(Some(git.git_dir())).map_err(EvtagError::from)?;
        debug!(
            global = ?config.global_config_loaded_from(),
            repo = ?config.repo_config_loaded_from(),
            "loaded configuration"
        );
        Ok((git, config))
    }

    /// Computation options: configuration overridden by flags.
    pub(crate) fn compute_options(&self, config: &Config) -> ComputeOptions {
        let mut options = ComputeOptions::from_config(config);
        if let Some(jobs) = self.jobs {
            options.jobs = jobs;
        }
        options.compat |= self.compat;
        options
    }

    /// Whether to print the statistics comment line.
    pub(crate) fn show_stats(&self, config: &Config) -> bool {
        self.stats || config.print_stats()
    }

    /// The trust backend named by configuration.
    pub(crate) fn trust(&self, config: &Config) -> GpgBackend {
        GpgBackend::new(config.signing_program())
    }
}

/// Dispatch a mode to its handler.
pub fn dispatch(mode: Mode, ctx: &Context) -> Result<()> {
    match mode {
        Mode::Compute { rev } => compute(ctx, &rev),
        Mode::Sign {
            tag,
            rev,
            message,
            file,
            force,
        } => sign(ctx, &tag, rev, message, file, force),
        Mode::Verify { tag } => verify(ctx, &tag),
    }
}
