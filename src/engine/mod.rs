//! engine
//!
//! Checksum computation and the sign/verify lifecycle.
//!
//! # Architecture
//!
//! ```text
//! Repo ──resolve──▶ Walker ──Visited──▶ Accumulator ──▶ Checksum
//!                     │  ▲                                 │
//!            fetch    │  │ submodule stores                ▼
//!          (workers)  ▼  │                            Orchestrator ──▶ TrustBackend
//!                   Fetcher  SubmoduleResolver
//! ```
//!
//! - [`walk`] - deterministic pre-order traversal with an explicit work stack
//! - [`fetch`] - per-store read workers, re-joined in traversal order
//! - [`submodule`] - gitlink to nested store resolution
//! - [`digest`] - streaming SHA-512 and statistics
//! - [`compute`] - `compute(repo, revision)` entry point
//! - [`orchestrator`] - sign/verify state machine
//!
//! # Invariants
//!
//! - Only the walker's emission order reaches the hash context
//! - Traversal state lives in one [`walk::Walker`] and dies with it
//! - A failed walk never yields a checksum

pub mod compute;
pub mod digest;
pub mod fetch;
pub mod orchestrator;
pub mod submodule;
pub mod walk;

pub use compute::{compute, compute_commit, ComputeOptions, ComputeOutcome};
pub use digest::{ClassStats, Stats};
pub use orchestrator::{Orchestrator, Phase, SignOutcome, SignRequest, VerifyReport};
