//! trust::traits
//!
//! Signing and verification backend trait.
//!
//! # Design
//!
//! The orchestrator never shells out or touches key material itself. It
//! hands the exact tag payload bytes to a [`TrustBackend`] and gets back an
//! armored detached signature, or a validity verdict for an existing one.
//! What "valid" means (key trust, identity binding) is entirely the
//! backend's decision.
//!
//! # Example
//!
//! ```
//! use git_evtag::trust::{TrustBackend, TrustError};
//! use git_evtag::trust::mock::MockTrust;
//!
//! let trust = MockTrust::new();
//! let signature = trust.sign(b"payload", Some("key")).unwrap();
//! assert!(trust.verify(b"payload", &signature, None).unwrap());
//! assert!(!trust.verify(b"tampered", &signature, None).unwrap());
//! ```

use thiserror::Error;

/// Errors from trust backend operations.
///
/// A signature that merely fails to validate is not an error; backends
/// report it as `Ok(false)` from [`TrustBackend::verify`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TrustError {
    /// The signing program could not be started.
    #[error("failed to run '{program}': {message}")]
    ProgramUnavailable {
        /// Program that was invoked
        program: String,
        /// OS error text
        message: String,
    },

    /// The backend ran but reported a failure.
    #[error("{0}")]
    Backend(String),

    /// No key was configured and the backend requires one.
    #[error("no signing key configured (set user.signingkey or signing.key)")]
    NoKey,

    /// Scratch file handling failed.
    #[error("i/o error: {0}")]
    Io(String),
}

/// A signing and verification backend.
///
/// Implementations must be thread-safe (Send + Sync).
pub trait TrustBackend: Send + Sync {
    /// Produce an armored detached signature over `payload`.
    ///
    /// `key` selects the signing identity; `None` means the backend's
    /// default key.
    fn sign(&self, payload: &[u8], key: Option<&str>) -> Result<String, TrustError>;

    /// Check an armored detached signature over `payload`.
    ///
    /// If `expected_identity` is given, the signature must also have been
    /// made by that identity.
    ///
    /// Returns `Ok(false)` for a signature that does not validate and
    /// `Err` only when the backend itself could not run.
    fn verify(
        &self,
        payload: &[u8],
        signature: &str,
        expected_identity: Option<&str>,
    ) -> Result<bool, TrustError>;

    /// Human-readable backend name for logs.
    fn name(&self) -> &'static str;
}
