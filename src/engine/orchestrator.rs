//! engine::orchestrator
//!
//! The sign/verify state machine.
//!
//! # Lifecycle
//!
//! ```text
//! Idle -> ComputingChecksum -> Signing   -> Done
//!                           -> Verifying -> Done
//!         (any step)        -> Failed
//! ```
//!
//! Signature creation and validation are delegated to an injected
//! [`TrustBackend`]; the orchestrator only assembles the bytes that get
//! signed and interprets the verdict.
//!
//! # Verification axes
//!
//! Verification checks two independent things: the tag's signature and the
//! recorded checksum. [`Orchestrator::inspect`] always reports both;
//! [`VerifyReport::into_result`] turns a report into the error naming the
//! axis (or axes) that failed.

use serde::Serialize;
use tracing::{debug, info};

use crate::core::checksum::{clean_message, compose_message, Checksum};
use crate::core::error::EvtagError;
use crate::core::object::{ObjectKind, TagObject};
use crate::core::store::{Repo, TagRef};
use crate::core::types::{Oid, TagName};
use crate::trust::TrustBackend;
use crate::ui::prompts::MessageSource;

use super::compute::{compute_commit, ComputeOptions};
use super::digest::Stats;

/// Orchestrator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    ComputingChecksum,
    Signing,
    Verifying,
    Done,
    Failed,
}

/// A request to create a signed EVTag tag.
#[derive(Debug, Clone)]
pub struct SignRequest {
    /// Name of the tag to create
    pub tag: TagName,
    /// Revision to tag; defaults to the existing tag's commit, then `HEAD`
    pub target: Option<String>,
    /// Where the message body comes from
    pub message: MessageSource,
    /// Replace an existing tag of the same name
    pub force: bool,
    /// Signing key; defaults to the repository's configured key
    pub key: Option<String>,
}

/// The result of a successful sign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignOutcome {
    pub tag: TagName,
    /// Id of the new tag object
    pub tag_oid: Oid,
    /// The tagged commit
    pub target: Oid,
    pub checksum: Checksum,
    pub stats: Stats,
}

/// Both verification axes for one tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub tag: TagName,
    /// The tagged commit
    pub target: Oid,
    /// Checksum found in the tag message
    pub recorded: Checksum,
    /// Checksum computed from the repository
    pub computed: Checksum,
    /// Whether the trust backend accepted the tag's signature
    pub signature_valid: bool,
    pub stats: Stats,
}

impl VerifyReport {
    /// Whether the recorded and computed checksums are identical.
    pub fn checksum_matches(&self) -> bool {
        self.recorded == self.computed
    }

    /// Whether both axes passed.
    pub fn is_success(&self) -> bool {
        self.signature_valid && self.checksum_matches()
    }

    /// Keep a fully verified report, or name what failed.
    ///
    /// # Errors
    ///
    /// - [`EvtagError::SignatureInvalid`] if only the signature failed
    /// - [`EvtagError::ChecksumMismatch`] if only the checksum failed
    /// - [`EvtagError::VerificationFailed`] if both failed
    pub fn into_result(self) -> Result<Self, EvtagError> {
        match (self.signature_valid, self.checksum_matches()) {
            (true, true) => Ok(self),
            (false, true) => Err(EvtagError::SignatureInvalid { tag: self.tag }),
            (true, false) => Err(EvtagError::ChecksumMismatch {
                tag: self.tag,
                recorded: self.recorded,
                computed: self.computed,
            }),
            (false, false) => Err(EvtagError::VerificationFailed {
                tag: self.tag,
                recorded: self.recorded,
                computed: self.computed,
            }),
        }
    }
}

/// Drives checksum computation together with a trust backend.
pub struct Orchestrator<'a> {
    repo: &'a dyn Repo,
    trust: &'a dyn TrustBackend,
    options: ComputeOptions,
    expected_identity: Option<String>,
    phase: Phase,
}

impl<'a> Orchestrator<'a> {
    /// Create an orchestrator in the `Idle` phase.
    pub fn new(repo: &'a dyn Repo, trust: &'a dyn TrustBackend, options: ComputeOptions) -> Self {
        Self {
            repo,
            trust,
            options,
            expected_identity: None,
            phase: Phase::Idle,
        }
    }

    /// Require verified signatures to come from `identity`.
    pub fn with_expected_identity(mut self, identity: impl Into<String>) -> Self {
        self.expected_identity = Some(identity.into());
        self
    }

    /// The current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn enter(&mut self, phase: Phase) {
        debug!(from = ?self.phase, to = ?phase, "orchestrator phase");
        self.phase = phase;
    }

    fn settle<T>(&mut self, result: Result<T, EvtagError>) -> Result<T, EvtagError> {
        self.enter(if result.is_ok() {
            Phase::Done
        } else {
            Phase::Failed
        });
        result
    }

    /// Create a signed tag carrying the checksum of its target.
    ///
    /// # Errors
    ///
    /// - [`EvtagError::TagExists`] if the tag exists and `force` is not set
    /// - [`EvtagError::EmptyMessage`] if the message body is empty
    /// - [`EvtagError::SigningFailed`] if the backend cannot sign
    /// - any error from checksum computation
    pub fn sign(&mut self, request: SignRequest) -> Result<SignOutcome, EvtagError> {
        let result = self.sign_inner(request);
        self.settle(result)
    }

    fn sign_inner(&mut self, request: SignRequest) -> Result<SignOutcome, EvtagError> {
        let existing = self.repo.find_tag(&request.tag)?;
        if existing.is_some() && !request.force {
            return Err(EvtagError::TagExists { tag: request.tag });
        }

        let revision = match (&request.target, &existing) {
            (Some(revision), _) => revision.clone(),
            (None, Some(TagRef::Annotated { tag, .. })) => tag.target.to_string(),
            (None, Some(TagRef::Lightweight { target })) => target.to_string(),
            (None, None) => "HEAD".to_string(),
        };
        let target = self.repo.resolve_commit(&revision)?;

        self.enter(Phase::ComputingChecksum);
        let (checksum, stats) = compute_commit(self.repo.objects(), &target, &self.options)?;

        self.enter(Phase::Signing);
        let previous = match &existing {
            Some(TagRef::Annotated { tag, .. }) => Some(clean_message(&tag.message)),
            _ => None,
        };
        let body = request
            .message
            .obtain(request.tag.as_str(), previous.as_deref())?;
        if clean_message(&body).trim().is_empty() {
            return Err(EvtagError::EmptyMessage);
        }
        let message = compose_message(&body, &checksum);

        let tagger = self.repo.tagger()?;
        let payload = TagObject::payload(
            &target,
            ObjectKind::Commit,
            request.tag.as_str(),
            &tagger,
            &message,
        );
        let key = request.key.or_else(|| self.repo.signing_key());
        let signature = self
            .trust
            .sign(&payload, key.as_deref())
            .map_err(EvtagError::SigningFailed)?;

        let object = TagObject::signed(&payload, &signature);
        let tag_oid = self.repo.write_tag(&request.tag, &object, request.force)?;

        info!(tag = %request.tag, target = %target, backend = self.trust.name(), "signed tag");
        Ok(SignOutcome {
            tag: request.tag,
            tag_oid,
            target,
            checksum,
            stats,
        })
    }

    /// Check a tag's signature and checksum, reporting both axes.
    ///
    /// A report is returned even when an axis fails; use
    /// [`Orchestrator::verify`] to fail on it.
    ///
    /// # Errors
    ///
    /// - [`EvtagError::InvalidRevision`] if the tag does not exist
    /// - [`EvtagError::NoChecksumFound`] if the tag carries no checksum line
    /// - [`EvtagError::Trust`] if the backend itself could not run
    /// - any error from checksum computation
    pub fn inspect(&mut self, name: &TagName) -> Result<VerifyReport, EvtagError> {
        let result = self.inspect_inner(name);
        self.settle(result)
    }

    /// Verify a tag, failing unless both axes pass.
    ///
    /// # Errors
    ///
    /// As [`Orchestrator::inspect`], plus the errors of
    /// [`VerifyReport::into_result`].
    pub fn verify(&mut self, name: &TagName) -> Result<VerifyReport, EvtagError> {
        let result = self.inspect_inner(name).and_then(VerifyReport::into_result);
        self.settle(result)
    }

    fn inspect_inner(&mut self, name: &TagName) -> Result<VerifyReport, EvtagError> {
        let tag = match self.repo.find_tag(name)? {
            Some(TagRef::Annotated { tag, .. }) => tag,
            Some(TagRef::Lightweight { .. }) => {
                return Err(EvtagError::NoChecksumFound { tag: name.clone() })
            }
            None => {
                return Err(EvtagError::InvalidRevision {
                    revision: name.to_string(),
                    reason: "no such tag".to_string(),
                })
            }
        };

        let recorded = Checksum::from_message(&tag.message)
            .ok_or_else(|| EvtagError::NoChecksumFound { tag: name.clone() })?;
        let target = self.repo.resolve_commit(tag.target.as_str())?;

        self.enter(Phase::ComputingChecksum);
        let (computed, stats) = compute_commit(self.repo.objects(), &target, &self.options)?;

        self.enter(Phase::Verifying);
        let signature_valid = match &tag.signature {
            Some(signature) => self
                .trust
                .verify(
                    &tag.signed_payload,
                    signature,
                    self.expected_identity.as_deref(),
                )
                .map_err(EvtagError::Trust)?,
            None => false,
        };

        let report = VerifyReport {
            tag: name.clone(),
            target,
            recorded,
            computed,
            signature_valid,
            stats,
        };
        info!(
            tag = %name,
            signature_valid,
            checksum_matches = report.checksum_matches(),
            "verified tag"
        );
        Ok(report)
    }
}
