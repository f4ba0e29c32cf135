//! verify command - Check a tag's signature and checksum

use anyhow::Result;

use super::Context;
use crate::core::types::TagName;
use crate::engine::Orchestrator;
use crate::ui::output;

/// Verify `tag`.
///
/// The report is printed before failing so both axes are always visible;
/// the exit status then names what failed.
pub fn verify(ctx: &Context, tag: &str) -> Result<()> {
    let (git, config) = ctx.open()?;
    let tag = TagName::new(tag)?;

    let trust = ctx.trust(&config);
    let mut orchestrator = Orchestrator::new(&git, &trust, ctx.compute_options(&config));
    let report = orchestrator.inspect(&tag)?;

    if ctx.json {
        output::result(output::to_json(&report)?);
    } else if ctx.verbosity != output::Verbosity::Quiet || !report.is_success() {
        output::result(output::format_verify(&report, ctx.show_stats(&config)));
    }

    report.into_result()?;
    Ok(())
}
