//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`Oid`] - Git object identifier (SHA-1 or SHA-256), hex encoded
//! - [`StoreId`] - Identity of one object store (a repository or submodule)
//! - [`TagName`] - Validated tag name (the part after `refs/tags/`)
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, preventing entire classes of bugs.
//!
//! # Examples
//!
//! ```
//! use git_evtag::core::types::{Oid, TagName};
//!
//! let oid = Oid::new("abc123def4567890abc123def4567890abc12345").unwrap();
//! let tag = TagName::new("v1.0.0").unwrap();
//! assert_eq!(tag.ref_name(), "refs/tags/v1.0.0");
//!
//! assert!(Oid::new("not-a-sha").is_err());
//! assert!(TagName::new("bad..tag").is_err());
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid object id: {0}")]
    InvalidOid(String),

    #[error("invalid tag name: {0}")]
    InvalidTagName(String),
}

/// A Git object identifier (SHA-1 or SHA-256).
///
/// OIDs are normalized to lowercase for consistency. An id is only
/// meaningful relative to the store it was read from; see [`StoreId`].
///
/// # Example
///
/// ```
/// use git_evtag::core::types::Oid;
///
/// let oid = Oid::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
/// assert_eq!(oid.as_str(), "abc123def4567890abc123def4567890abc12345");
/// assert_eq!(oid.short(7), "abc123d");
/// assert_eq!(oid.raw_len(), 20);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Raw length of a SHA-1 object id in bytes.
    pub const SHA1_LEN: usize = 20;

    /// Raw length of a SHA-256 object id in bytes.
    pub const SHA256_LEN: usize = 32;

    /// Create a new validated object id from its hex form.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidOid` if the string is not a valid hex OID.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().to_ascii_lowercase();
        Self::validate(&oid)?;
        Ok(Self(oid))
    }

    /// Create an object id from its raw binary form, as stored in tree entries.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidOid` if `bytes` is neither 20 nor 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TypeError> {
        if bytes.len() != Self::SHA1_LEN && bytes.len() != Self::SHA256_LEN {
            return Err(TypeError::InvalidOid(format!(
                "expected {} or {} raw bytes, got {}",
                Self::SHA1_LEN,
                Self::SHA256_LEN,
                bytes.len()
            )));
        }
        Ok(Self(hex::encode(bytes)))
    }

    /// Number of raw bytes in this id (20 for SHA-1, 32 for SHA-256).
    pub fn raw_len(&self) -> usize {
        self.0.len() / 2
    }

    /// Get an abbreviated form of the OID.
    ///
    /// Returns the first `len` characters. If `len` exceeds the OID length,
    /// returns the full OID.
    pub fn short(&self, len: usize) -> &str {
        let end = len.min(self.0.len());
        &self.0[..end]
    }

    fn validate(oid: &str) -> Result<(), TypeError> {
        // SHA-1 is 40 hex chars, SHA-256 is 64
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid(
                "object id must be hexadecimal".into(),
            ));
        }
        Ok(())
    }

    /// Get the object id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl AsRef<str> for Oid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of an object store.
///
/// Object ids are store-local: two stores may hold unrelated objects that
/// happen to share an id (for example after a shallow fetch rewrote
/// history). The walker keys its seen-set by `(StoreId, Oid)`.
///
/// For on-disk repositories the identity is the canonical path of the git
/// directory, so a submodule reached through two different gitlinks maps to
/// the same store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StoreId(String);

impl StoreId {
    /// Create a store identity from an arbitrary label.
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// Create a store identity from a git directory path.
    ///
    /// The path is canonicalized when possible so that `a/../b/.git` and
    /// `b/.git` compare equal.
    pub fn from_git_dir(path: &Path) -> Self {
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        Self(canonical.to_string_lossy().into_owned())
    }

    /// Get the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StoreId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated tag name.
///
/// Tag names follow Git's refname rules (see `git check-ref-format`), and
/// are stored without the `refs/tags/` prefix.
///
/// # Example
///
/// ```
/// use git_evtag::core::types::TagName;
///
/// let tag = TagName::new("release/v2.1").unwrap();
/// assert_eq!(tag.as_str(), "release/v2.1");
/// assert_eq!(tag.ref_name(), "refs/tags/release/v2.1");
///
/// // A full ref name is accepted and normalized
/// let full = TagName::new("refs/tags/v1").unwrap();
/// assert_eq!(full.as_str(), "v1");
///
/// assert!(TagName::new("").is_err());
/// assert!(TagName::new("v1.lock").is_err());
/// assert!(TagName::new("has space").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TagName(String);

impl TagName {
    /// Create a new validated tag name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidTagName` if the name violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        let name = match name.strip_prefix("refs/tags/") {
            Some(stripped) => stripped.to_string(),
            None => name,
        };
        Self::validate(&name)?;
        Ok(Self(name))
    }

    /// The full reference name (`refs/tags/<name>`).
    pub fn ref_name(&self) -> String {
        format!("refs/tags/{}", self.0)
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        if name.is_empty() {
            return Err(TypeError::InvalidTagName("tag name cannot be empty".into()));
        }
        if name == "@" {
            return Err(TypeError::InvalidTagName(
                "tag name cannot be '@' (reserved)".into(),
            ));
        }
        if name.starts_with('-') {
            return Err(TypeError::InvalidTagName(
                "tag name cannot start with '-'".into(),
            ));
        }
        if name.ends_with('/') || name.starts_with('/') {
            return Err(TypeError::InvalidTagName(
                "tag name cannot start or end with '/'".into(),
            ));
        }
        if name.ends_with('.') {
            return Err(TypeError::InvalidTagName(
                "tag name cannot end with '.'".into(),
            ));
        }

        for pattern in ["..", "@{", "//"] {
            if name.contains(pattern) {
                return Err(TypeError::InvalidTagName(format!(
                    "tag name cannot contain '{pattern}'"
                )));
            }
        }

        const INVALID_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];
        for c in INVALID_CHARS {
            if name.contains(c) {
                return Err(TypeError::InvalidTagName(format!(
                    "tag name cannot contain '{c}'"
                )));
            }
        }

        if name.chars().any(|c| c.is_ascii_control()) {
            return Err(TypeError::InvalidTagName(
                "tag name cannot contain control characters".into(),
            ));
        }

        for component in name.split('/') {
            if component.starts_with('.') {
                return Err(TypeError::InvalidTagName(
                    "path component cannot start with '.'".into(),
                ));
            }
            if component.ends_with(".lock") {
                return Err(TypeError::InvalidTagName(
                    "path component cannot end with '.lock'".into(),
                ));
            }
        }

        Ok(())
    }

    /// Get the tag name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TagName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<TagName> for String {
    fn from(name: TagName) -> Self {
        name.0
    }
}

impl AsRef<str> for TagName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TagName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
