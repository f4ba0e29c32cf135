//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Output is formatted consistently and respects the quiet flag.
//! When `--json` is enabled, output is machine-readable JSON.
//! Checksum lines always reach stdout, even in quiet mode: they are the
//! program's result, not commentary.

use std::fmt::Display;

use serde::Serialize;

use crate::engine::{ComputeOutcome, SignOutcome, Stats, VerifyReport};

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// Print a result line to stdout regardless of verbosity.
pub fn result(message: impl Display) {
    println!("{}", message);
}

/// Render a value as pretty JSON.
pub fn to_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}

/// Format a list of items.
pub fn format_list<T: Display>(items: &[T], prefix: &str) -> String {
    items
        .iter()
        .map(|item| format!("{}{}", prefix, item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The checksum line, optionally followed by the statistics comment.
fn checksum_block(line: String, stats: &Stats, with_stats: bool) -> String {
    if with_stats {
        format!("{}\n{}", stats.comment_line(), line)
    } else {
        line
    }
}

/// Text for a plain computation.
pub fn format_compute(outcome: &ComputeOutcome, with_stats: bool) -> String {
    checksum_block(outcome.checksum.line(), &outcome.stats, with_stats)
}

/// Text for a newly signed tag.
pub fn format_sign(outcome: &SignOutcome, with_stats: bool) -> String {
    let summary = format!(
        "Signed tag {} ({}) for commit {}",
        outcome.tag,
        outcome.tag_oid.short(10),
        outcome.target.short(10)
    );
    format!(
        "{}\n{}",
        summary,
        checksum_block(outcome.checksum.line(), &outcome.stats, with_stats)
    )
}

/// Text for a verification report; both axes are always listed.
pub fn format_verify(report: &VerifyReport, with_stats: bool) -> String {
    let mut lines = vec![
        format!(
            "signature: {}",
            if report.signature_valid { "good" } else { "BAD" }
        ),
        format!(
            "checksum: {}",
            if report.checksum_matches() {
                "match"
            } else {
                "MISMATCH"
            }
        ),
    ];
    if !report.checksum_matches() {
        lines.push(format!("recorded: {}", report.recorded));
        lines.push(format!("computed: {}", report.computed));
    }

    let header = format!("Tag {} -> {}", report.tag, report.target.short(10));
    let mut out = format!("{}\n{}", header, format_list(&lines, "  "));
    if report.is_success() {
        out.push('\n');
        out.push_str(&checksum_block(
            report.computed.line(),
            &report.stats,
            with_stats,
        ));
    }
    out
}
