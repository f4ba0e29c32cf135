//! sign command - Create a signed tag carrying the checksum

use std::path::PathBuf;

use anyhow::Result;

use super::Context;
use crate::core::types::TagName;
use crate::engine::{Orchestrator, SignRequest};
use crate::ui::output;
use crate::ui::prompts::{resolve_editor, MessageSource};

/// Sign `tag`, targeting `rev` when given.
///
/// # Arguments
///
/// * `ctx` - Execution context
/// * `tag` - Name of the tag to create
/// * `rev` - Target revision; defaults to the existing tag's commit, then HEAD
/// * `message` - Literal message (`-m`)
/// * `file` - Message file (`-F`); the editor is used when neither is given
/// * `force` - Replace an existing tag
pub fn sign(
    ctx: &Context,
    tag: &str,
    rev: Option<String>,
    message: Option<String>,
    file: Option<PathBuf>,
    force: bool,
) -> Result<()> {
    let (git, config) = ctx.open()?;
    let tag = TagName::new(tag)?;

    let message = match (message, file) {
        (Some(text), _) => MessageSource::Literal(text),
        (None, Some(path)) => MessageSource::File(path),
        (None, None) => MessageSource::Editor(resolve_editor(git.core_editor())),
    };

    let trust = ctx.trust(&config);
    let mut orchestrator = Orchestrator::new(&git, &trust, ctx.compute_options(&config));
    let outcome = orchestrator.sign(SignRequest {
        tag,
        target: rev,
        message,
        force,
        key: config.signing_key().map(str::to_string),
    })?;

    if ctx.json {
        output::result(output::to_json(&outcome)?);
    } else if ctx.verbosity == output::Verbosity::Quiet {
        output::result(outcome.checksum.line());
    } else {
        output::result(output::format_sign(&outcome, ctx.show_stats(&config)));
    }
    Ok(())
}
