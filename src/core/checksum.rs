//! core::checksum
//!
//! The EVTag checksum value and its textual forms.
//!
//! # Format
//!
//! A checksum is a SHA-512 digest rendered as 128 lowercase hex digits and
//! carried in tag messages on a single line:
//!
//! ```text
//! Git-EVTag-v0-SHA512: 3973d3ad...e802
//! ```
//!
//! Parsing also accepts the `Git-EVTag-Py-v0-SHA512:` prefix written by the
//! Python port of the tool.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::object::signature_offset;

/// Line prefix of the checksum written into tag messages.
pub const CHECKSUM_PREFIX: &str = "Git-EVTag-v0-SHA512: ";

/// Alternate prefix accepted when parsing.
pub const PY_CHECKSUM_PREFIX: &str = "Git-EVTag-Py-v0-SHA512: ";

/// Number of hex digits in a SHA-512 digest.
const HEX_LEN: usize = 128;

/// Errors from checksum parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChecksumError {
    #[error("expected 128 hex digits, got {0}")]
    BadLength(usize),

    #[error("checksum must be hexadecimal")]
    NotHex,
}

/// A computed or recorded EVTag checksum.
///
/// `Display` renders the bare hex digest; [`Checksum::line`] renders the
/// full tag-message line.
///
/// # Example
///
/// ```
/// use git_evtag::core::checksum::Checksum;
///
/// let checksum = Checksum::from_hex("AB".repeat(64)).unwrap();
/// assert_eq!(checksum.as_str(), "ab".repeat(64));
/// assert!(checksum.line().starts_with("Git-EVTag-v0-SHA512: abab"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Checksum(String);

impl Checksum {
    /// Create a checksum from raw digest bytes.
    pub(crate) fn from_digest(digest: &[u8]) -> Self {
        Self(hex::encode(digest))
    }

    /// Create a checksum from its hex form (normalized to lowercase).
    ///
    /// # Errors
    ///
    /// Returns [`ChecksumError`] unless `hex` is exactly 128 hex digits.
    pub fn from_hex(hex: impl Into<String>) -> Result<Self, ChecksumError> {
        let hex = hex.into().to_ascii_lowercase();
        if hex.len() != HEX_LEN {
            return Err(ChecksumError::BadLength(hex.len()));
        }
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ChecksumError::NotHex);
        }
        Ok(Self(hex))
    }

    /// The hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `Git-EVTag-v0-SHA512: <hex>` line, without a trailing newline.
    pub fn line(&self) -> String {
        format!("{}{}", CHECKSUM_PREFIX, self.0)
    }

    /// Find the checksum recorded in a tag message.
    ///
    /// The first line (ignoring surrounding whitespace) carrying either
    /// accepted prefix wins. Lines whose value is not a well-formed digest
    /// are skipped.
    ///
    /// # Example
    ///
    /// ```
    /// use git_evtag::core::checksum::Checksum;
    ///
    /// let message = format!("Release 1.0\n\nGit-EVTag-v0-SHA512: {}\n", "0".repeat(128));
    /// let found = Checksum::from_message(&message).unwrap();
    /// assert_eq!(found.as_str(), "0".repeat(128));
    ///
    /// assert!(Checksum::from_message("no checksum here").is_none());
    /// ```
    pub fn from_message(message: &str) -> Option<Self> {
        message.lines().find_map(|line| {
            let line = line.trim();
            let value = line
                .strip_prefix(CHECKSUM_PREFIX)
                .or_else(|| line.strip_prefix(PY_CHECKSUM_PREFIX))?;
            Self::from_hex(value.trim()).ok()
        })
    }
}

impl TryFrom<String> for Checksum {
    type Error = ChecksumError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(s)
    }
}

impl From<Checksum> for String {
    fn from(checksum: Checksum) -> Self {
        checksum.0
    }
}

impl std::fmt::Display for Checksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_checksum_line(line: &str) -> bool {
    let line = line.trim();
    line.starts_with(CHECKSUM_PREFIX.trim_end()) || line.starts_with(PY_CHECKSUM_PREFIX.trim_end())
}

/// Remove stale checksum lines and any trailing signature block.
///
/// Used on messages taken from an existing tag before re-signing, and on
/// caller-supplied messages so a pasted checksum line never duplicates the
/// freshly computed one.
///
/// # Example
///
/// ```
/// use git_evtag::core::checksum::clean_message;
///
/// let old = "Release\n\nGit-EVTag-v0-SHA512: abc\n-----BEGIN PGP SIGNATURE-----\nxyz\n-----END PGP SIGNATURE-----\n";
/// assert_eq!(clean_message(old), "Release\n");
/// ```
pub fn clean_message(message: &str) -> String {
    let unsigned = strip_trailing_signature(message);

    let kept: Vec<&str> = unsigned
        .lines()
        .filter(|line| !is_checksum_line(line))
        .collect();

    let mut out = kept.join("\n").trim_end().to_string();
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

/// Drop the signature block at the end of `message`.
///
/// Armored blocks followed by further text are quoted content and are kept.
fn strip_trailing_signature(message: &str) -> &str {
    let Some(offset) = signature_offset(message) else {
        return message;
    };
    let block = &message[offset..];
    let mut end = None;
    let mut pos = 0;
    for line in block.split_inclusive('\n') {
        pos += line.len();
        if line.starts_with("-----END ") {
            end = Some(pos);
            break;
        }
    }
    match end {
        Some(end) if !block[end..].trim().is_empty() => message,
        _ => &message[..offset],
    }
}

/// Append the checksum line to a tag message.
///
/// The message is cleaned with [`clean_message`], trailing whitespace is
/// trimmed, and the checksum follows after one blank line.
///
/// # Example
///
/// ```
/// use git_evtag::core::checksum::{compose_message, Checksum};
///
/// let checksum = Checksum::from_hex("f".repeat(128)).unwrap();
/// let message = compose_message("Release 2.0\n\n", &checksum);
/// assert_eq!(message, format!("Release 2.0\n\nGit-EVTag-v0-SHA512: {}\n", "f".repeat(128)));
/// ```
pub fn compose_message(message: &str, checksum: &Checksum) -> String {
    let body = clean_message(message);
    let body = body.trim_end();
    if body.is_empty() {
        format!("{}\n", checksum.line())
    } else {
        format!("{}\n\n{}\n", body, checksum.line())
    }
}
