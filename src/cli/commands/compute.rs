//! compute command - Print the checksum of a revision

use anyhow::Result;
use tracing::debug;

use super::Context;
use crate::engine;
use crate::ui::output;

/// Print the checksum line for `rev`.
///
/// # Arguments
///
/// * `ctx` - Execution context
/// * `rev` - Revision to checksum
pub fn compute(ctx: &Context, rev: &str) -> Result<()> {
    let (git, config) = ctx.open()?;
    let options = ctx.compute_options(&config);
    debug!(?options, rev, "computing checksum");

    let outcome = engine::compute(&git, rev, &options)?;

    if ctx.json {
        output::result(output::to_json(&outcome)?);
    } else {
        output::result(output::format_compute(&outcome, ctx.show_stats(&config)));
    }
    Ok(())
}
