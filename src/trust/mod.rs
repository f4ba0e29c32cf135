//! trust
//!
//! Signing and verification backends for tag signatures.
//!
//! # Backends
//!
//! - [`gpg::GpgBackend`] - OpenPGP via an external `gpg` program
//! - [`mock::MockTrust`] - Deterministic backend for tests

pub mod gpg;
pub mod mock;
pub mod traits;

pub use gpg::GpgBackend;
pub use traits::{TrustBackend, TrustError};
