//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Modes
//!
//! git-evtag has three modes selected by flags:
//! - no mode flag: print the checksum of `--rev` (default `HEAD`)
//! - `--sign TAG`: create a signed tag carrying the checksum
//! - `--verify TAG`: check a tag's signature and recorded checksum
//!
//! # Global Flags
//!
//! - `--repo <path>`: Run against the repository containing this path
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use clap::{ArgGroup, Parser};
use std::path::PathBuf;

/// git-evtag - Strong checksums for signed Git tags
#[derive(Parser, Debug)]
#[command(name = "git-evtag")]
#[command(author, version, about)]
#[command(
    long_about = "Compute, sign and verify EVTag checksums.\n\n\
        An EVTag checksum is a SHA-512 over a commit, its complete tree, every \
        blob, and every submodule reached through it, recursively. Recording it \
        in a signed tag means verifying the tag verifies the full source, not \
        just a commit id.",
    after_help = "\
WORKFLOW EXAMPLES:
    # Print the checksum of HEAD
    git-evtag

    # Checksum a specific revision, with per-class statistics
    git-evtag --rev v1.2.0 --stats

    # Create a signed tag carrying the checksum
    git-evtag --sign v1.3.0 -m 'Release 1.3.0'

    # Verify a signed tag
    git-evtag --verify v1.3.0

COMPATIBILITY:
    Use --compat to hash repeated objects at every occurrence, matching the
    checksums published by the reference tools."
)]
#[command(group(ArgGroup::new("mode").args(["sign", "verify"])))]
#[command(group(ArgGroup::new("message_source").args(["message", "file"])))]
pub struct Cli {
    /// Path inside the repository (default: current directory)
    #[arg(long, value_name = "PATH")]
    pub repo: Option<PathBuf>,

    /// Revision to checksum, or to tag with --sign (default: HEAD)
    #[arg(long, value_name = "REV", conflicts_with = "verify")]
    pub rev: Option<String>,

    /// Create a signed tag carrying the checksum
    #[arg(long, value_name = "TAG")]
    pub sign: Option<String>,

    /// Verify the signature and checksum of a tag
    #[arg(long, value_name = "TAG")]
    pub verify: Option<String>,

    /// Tag message (with --sign)
    #[arg(short = 'm', long, value_name = "MSG", requires = "sign")]
    pub message: Option<String>,

    /// Read the tag message from a file, `-` for stdin (with --sign)
    #[arg(short = 'F', long, value_name = "FILE", requires = "sign")]
    pub file: Option<PathBuf>,

    /// Replace an existing tag (with --sign)
    #[arg(short = 'f', long, requires = "sign")]
    pub force: bool,

    /// Hash repeated objects at every occurrence, like the reference tools
    #[arg(long)]
    pub compat: bool,

    /// Print per-class object statistics
    #[arg(long)]
    pub stats: bool,

    /// Object read workers per store (1 reads inline)
    #[arg(short = 'j', long, value_name = "N", value_parser = clap::value_parser!(u16).range(1..=256))]
    pub jobs: Option<u16>,

    /// Machine-readable JSON output
    #[arg(long)]
    pub json: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long)]
    pub quiet: bool,
}

/// The operation selected by the mode flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Print the checksum of a revision.
    Compute {
        /// The revision to checksum
        rev: String,
    },
    /// Create a signed tag.
    Sign {
        /// The tag to create
        tag: String,
        /// Explicit target revision
        rev: Option<String>,
        /// Literal message
        message: Option<String>,
        /// Message file
        file: Option<PathBuf>,
        /// Replace an existing tag
        force: bool,
    },
    /// Verify a tag.
    Verify {
        /// The tag to verify
        tag: String,
    },
}

impl Cli {
    /// The operation these flags select.
    pub fn mode(&self) -> Mode {
        match (&self.sign, &self.verify) {
            (Some(tag), _) => Mode::Sign {
                tag: tag.clone(),
                rev: self.rev.clone(),
                message: self.message.clone(),
                file: self.file.clone(),
                force: self.force,
            },
            (None, Some(tag)) => Mode::Verify { tag: tag.clone() },
            (None, None) => Mode::Compute {
                rev: self.rev.clone().unwrap_or_else(|| "HEAD".to_string()),
            },
        }
    }
}
