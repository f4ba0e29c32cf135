//! git-evtag - Strong checksums for signed Git tags
//!
//! A Git tag signature covers a commit id, which is a SHA-1 (or SHA-256)
//! digest of the commit object alone. git-evtag computes a single SHA-512
//! over the commit, its complete tree, every blob, and every submodule
//! reached through gitlinks, then records that checksum in the message of a
//! signed annotated tag so that verifying the tag verifies the full source.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Tree walk, digest, parallel object reads, sign/verify flow
//! - [`core`] - Domain types, object parsing, checksum values, configuration
//! - [`git`] - Single interface for all Git operations
//! - [`trust`] - Signing and signature verification backends
//! - [`ui`] - Logging, output rendering, and message prompts
//!
//! # Correctness Invariants
//!
//! 1. The checksum depends only on stored object bytes and the traversal order
//! 2. The worker count never changes a checksum
//! 3. A missing or corrupt object aborts the computation; no partial
//!    checksum is ever reported
//! 4. Existing tags are never replaced unless forced

pub mod cli;
pub mod core;
pub mod engine;
pub mod git;
pub mod trust;
pub mod ui;
