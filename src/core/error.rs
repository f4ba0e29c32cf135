//! core::error
//!
//! The error taxonomy shared by traversal, digesting, and sign/verify.
//!
//! # Propagation
//!
//! Traversal errors ([`EvtagError::ObjectNotFound`],
//! [`EvtagError::MalformedObject`], [`EvtagError::SubmoduleNotInitialized`])
//! abort a computation immediately; no partial checksum is ever produced.
//! Verification failures carry both axes (signature and checksum) so the
//! caller can report exactly which check failed.
//!
//! Every variant maps to a distinct process exit status via
//! [`EvtagError::exit_code`].

use std::path::PathBuf;

use thiserror::Error;

use crate::core::checksum::Checksum;
use crate::core::config::ConfigError;
use crate::core::types::{Oid, TagName, TypeError};
use crate::trust::TrustError;
use crate::ui::prompts::PromptError;

/// Errors from checksum computation, signing, and verification.
#[derive(Debug, Error)]
pub enum EvtagError {
    /// A reachable object is absent from its store.
    #[error("object not found: {oid}")]
    ObjectNotFound {
        /// The missing object
        oid: Oid,
    },

    /// An object payload could not be parsed as its declared type.
    #[error("malformed object {oid}: {reason}")]
    MalformedObject {
        /// The offending object
        oid: Oid,
        /// What was wrong with it
        reason: String,
    },

    /// A gitlink points at a submodule whose object store is not present.
    #[error("submodule not initialized: {path} (run `git submodule update --init --recursive`)")]
    SubmoduleNotInitialized {
        /// Path of the gitlink, relative to the top-level working tree
        path: String,
    },

    /// The tag message carries no EVTag checksum line.
    #[error("no EVTag checksum found in tag '{tag}'")]
    NoChecksumFound {
        /// The tag that was inspected
        tag: TagName,
    },

    /// The recomputed checksum differs from the one recorded in the tag.
    #[error(
        "EVTag checksum mismatch for tag '{tag}' (signature is valid)\n\
         recorded:   {recorded}\n\
         calculated: {computed}"
    )]
    ChecksumMismatch {
        /// The tag that was verified
        tag: TagName,
        /// Checksum parsed from the tag message
        recorded: Checksum,
        /// Checksum computed from the repository
        computed: Checksum,
    },

    /// The tag's signature did not validate.
    #[error("signature of tag '{tag}' is invalid (EVTag checksum matches)")]
    SignatureInvalid {
        /// The tag that was verified
        tag: TagName,
    },

    /// Both the signature and the checksum failed to verify.
    #[error(
        "both the signature and the EVTag checksum of tag '{tag}' failed to verify\n\
         recorded:   {recorded}\n\
         calculated: {computed}"
    )]
    VerificationFailed {
        /// The tag that was verified
        tag: TagName,
        /// Checksum parsed from the tag message
        recorded: Checksum,
        /// Checksum computed from the repository
        computed: Checksum,
    },

    /// The trust backend could not produce a signature.
    #[error("signing failed: {0}")]
    SigningFailed(#[source] TrustError),

    /// A tag with the requested name already exists.
    #[error("tag '{tag}' already exists (use --force to replace it)")]
    TagExists {
        /// The conflicting tag
        tag: TagName,
    },

    /// No repository could be opened at the given path.
    #[error("not a git repository: {path}")]
    RepositoryNotFound {
        /// The path that was searched
        path: PathBuf,
    },

    /// A revision string does not name a commit.
    #[error("invalid revision '{revision}': {reason}")]
    InvalidRevision {
        /// The revision as given
        revision: String,
        /// Why it could not be resolved
        reason: String,
    },

    /// The composed tag message was empty.
    #[error("aborting tag due to empty message")]
    EmptyMessage,

    /// The trust backend failed while verifying.
    #[error(transparent)]
    Trust(TrustError),

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The message source failed (editor, file).
    #[error(transparent)]
    Prompt(#[from] PromptError),

    /// Any other object store failure.
    #[error("object store error: {message}")]
    Store {
        /// Description of the failure
        message: String,
    },
}

impl EvtagError {
    /// The process exit status for this error.
    ///
    /// Zero is reserved for success and 1 for failures outside this
    /// taxonomy (argument errors, I/O at the CLI boundary).
    pub fn exit_code(&self) -> i32 {
        match self {
            EvtagError::ObjectNotFound { .. } => 2,
            EvtagError::MalformedObject { .. } => 3,
            EvtagError::SubmoduleNotInitialized { .. } => 4,
            EvtagError::NoChecksumFound { .. } => 5,
            EvtagError::ChecksumMismatch { .. } => 6,
            EvtagError::SignatureInvalid { .. } => 7,
            EvtagError::VerificationFailed { .. } => 8,
            EvtagError::SigningFailed(_) => 9,
            EvtagError::TagExists { .. } => 10,
            EvtagError::RepositoryNotFound { .. } => 11,
            EvtagError::InvalidRevision { .. } => 12,
            EvtagError::EmptyMessage
            | EvtagError::Trust(_)
            | EvtagError::Config(_)
            | EvtagError::Prompt(_)
            | EvtagError::Store { .. } => 1,
        }
    }

    /// Shorthand for a malformed-object error.
    pub fn malformed(oid: &Oid, reason: impl Into<String>) -> Self {
        EvtagError::MalformedObject {
            oid: oid.clone(),
            reason: reason.into(),
        }
    }
}

impl From<TypeError> for EvtagError {
    fn from(err: TypeError) -> Self {
        EvtagError::Store {
            message: err.to_string(),
        }
    }
}
