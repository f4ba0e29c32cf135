//! trust::mock
//!
//! Mock trust backend for deterministic testing.
//!
//! # Design
//!
//! Signatures are armored blocks embedding the signing key and the SHA-256
//! of the signed payload, so any change to the payload invalidates them.
//! Failure scenarios are configured up front.
//!
//! # Example
//!
//! ```
//! use git_evtag::trust::mock::MockTrust;
//! use git_evtag::trust::TrustBackend;
//!
//! let trust = MockTrust::new();
//! let signature = trust.sign(b"object abc\n", Some("release")).unwrap();
//! assert!(signature.starts_with("-----BEGIN PGP SIGNATURE-----"));
//! assert!(trust.verify(b"object abc\n", &signature, Some("release")).unwrap());
//! assert!(!trust.verify(b"object abc\n", &signature, Some("someone-else")).unwrap());
//! assert_eq!(trust.signed_payloads().len(), 1);
//! ```

use std::sync::{Arc, Mutex};

use sha2::{Digest, Sha256};

use super::traits::{TrustBackend, TrustError};

const BEGIN: &str = "-----BEGIN PGP SIGNATURE-----";
const END: &str = "-----END PGP SIGNATURE-----";
const DEFAULT_KEY: &str = "mock-default-key";

/// Mock trust backend.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockTrust {
    inner: Arc<Mutex<MockTrustInner>>,
}

#[derive(Debug, Default)]
struct MockTrustInner {
    fail_sign: Option<TrustError>,
    fail_verify: Option<TrustError>,
    reject_all: bool,
    signed: Vec<Vec<u8>>,
}

impl MockTrust {
    /// Create a backend that signs and verifies successfully.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `sign` call fail with `error`.
    pub fn fail_sign(self, error: TrustError) -> Self {
        self.lock().fail_sign = Some(error);
        self
    }

    /// Make every `verify` call fail with `error`.
    pub fn fail_verify(self, error: TrustError) -> Self {
        self.lock().fail_verify = Some(error);
        self
    }

    /// Report every signature as invalid.
    pub fn reject_all(self) -> Self {
        self.lock().reject_all = true;
        self
    }

    /// Payloads passed to `sign`, in call order.
    pub fn signed_payloads(&self) -> Vec<Vec<u8>> {
        self.lock().signed.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockTrustInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn fingerprint(payload: &[u8]) -> String {
        hex::encode(Sha256::digest(payload))
    }
}

impl TrustBackend for MockTrust {
    fn sign(&self, payload: &[u8], key: Option<&str>) -> Result<String, TrustError> {
        let mut inner = self.lock();
        if let Some(err) = &inner.fail_sign {
            return Err(err.clone());
        }
        inner.signed.push(payload.to_vec());

        Ok(format!(
            "{BEGIN}\n\nmock {} {}\n{END}\n",
            key.unwrap_or(DEFAULT_KEY),
            Self::fingerprint(payload)
        ))
    }

    fn verify(
        &self,
        payload: &[u8],
        signature: &str,
        expected_identity: Option<&str>,
    ) -> Result<bool, TrustError> {
        let inner = self.lock();
        if let Some(err) = &inner.fail_verify {
            return Err(err.clone());
        }
        if inner.reject_all {
            return Ok(false);
        }

        let Some(body) = signature.lines().find_map(|l| l.strip_prefix("mock ")) else {
            return Ok(false);
        };
        let Some((key, digest)) = body.split_once(' ') else {
            return Ok(false);
        };

        let identity_ok = expected_identity.map_or(true, |wanted| wanted == key);
        Ok(identity_ok && digest.trim() == Self::fingerprint(payload))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
