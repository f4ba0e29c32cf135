//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! This module is the only doorway to Git. Object reads, revision
//! resolution, tag lookup and tag creation all flow through it, and no other
//! module imports `git2`. The engine sees the repository only through the
//! [`crate::core::store`] traits, which [`Git`] and [`GitStore`] implement.
//!
//! # Invariants
//!
//! - Objects are read from the object database exactly as stored, never
//!   from the working tree or index
//! - Each worker thread owns its own libgit2 handle
//! - Tag references are never overwritten unless forced
//!
//! # Example
//!
//! ```no_run
//! use git_evtag::core::store::Repo;
//! use git_evtag::engine::{compute, ComputeOptions};
//! use git_evtag::git::Git;
//! use std::path::Path;
//!
//! let git = Git::open(Path::new(".")).unwrap();
//! let outcome = compute(&git, "HEAD", &ComputeOptions::default()).unwrap();
//! println!("{}", outcome.checksum.line());
//! ```

mod interface;
mod store;

pub use interface::{Git, GitError};
pub use store::{GitReader, GitStore};
