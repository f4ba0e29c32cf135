//! core::object
//!
//! The four git object kinds and parsers for their raw payloads.
//!
//! # Design
//!
//! Objects arrive from a store as a [`RawObject`]: a kind tag plus the
//! exact payload bytes git stores (without the `"<type> <len>\0"` header).
//! The raw form is what gets digested; [`RawObject::parse`] decodes it into
//! a [`GitObject`] only to discover the edges of the object graph.
//!
//! The object kinds form a closed set. Every traversal and digesting site
//! matches on [`ObjectKind`] / [`GitObject`] exhaustively.

use serde::{Deserialize, Serialize};

use crate::core::error::EvtagError;
use crate::core::types::Oid;

/// The kind of a stored object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Commit,
    Tree,
    Blob,
    Tag,
}

impl ObjectKind {
    /// The name git uses for this kind in object headers.
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Commit => "commit",
            ObjectKind::Tree => "tree",
            ObjectKind::Blob => "blob",
            ObjectKind::Tag => "tag",
        }
    }

    /// Parse a kind from its header name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "commit" => Some(ObjectKind::Commit),
            "tree" => Some(ObjectKind::Tree),
            "blob" => Some(ObjectKind::Blob),
            "tag" => Some(ObjectKind::Tag),
            _ => None,
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An object exactly as stored: kind plus payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawObject {
    /// The object kind
    pub kind: ObjectKind,
    /// The payload, without the loose-object header
    pub data: Vec<u8>,
}

impl RawObject {
    /// Create a raw object.
    pub fn new(kind: ObjectKind, data: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            data: data.into(),
        }
    }

    /// The loose-object header git hashes ahead of the payload.
    ///
    /// # Example
    ///
    /// ```
    /// use git_evtag::core::object::{ObjectKind, RawObject};
    ///
    /// let blob = RawObject::new(ObjectKind::Blob, b"hello\n".to_vec());
    /// assert_eq!(blob.header(), b"blob 6\0");
    /// ```
    pub fn header(&self) -> Vec<u8> {
        format!("{} {}\0", self.kind, self.data.len()).into_bytes()
    }

    /// Decode the payload according to its kind.
    ///
    /// `oid` is the id the object was read under; it names the object in
    /// errors and determines the raw id width used by tree entries.
    ///
    /// # Errors
    ///
    /// Returns [`EvtagError::MalformedObject`] if the payload does not
    /// parse as its declared kind.
    pub fn parse(&self, oid: &Oid) -> Result<GitObject, EvtagError> {
        match self.kind {
            ObjectKind::Commit => parse_commit(oid, &self.data).map(GitObject::Commit),
            ObjectKind::Tree => parse_tree(oid, &self.data).map(GitObject::Tree),
            ObjectKind::Blob => Ok(GitObject::Blob),
            ObjectKind::Tag => TagObject::parse(oid, &self.data).map(GitObject::Tag),
        }
    }
}

/// A decoded object.
///
/// Blob content is not decoded: it has no outgoing edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitObject {
    Commit(Commit),
    Tree(Vec<TreeEntry>),
    Blob,
    Tag(TagObject),
}

/// The parts of a commit the walker needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// Root tree of the commit
    pub tree: Oid,
    /// Parent commits (never traversed)
    pub parents: Vec<Oid>,
    /// Raw `committer` header value, if present
    pub committer: Option<String>,
    /// Commit message
    pub message: String,
}

/// What a tree entry points at, derived from its mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Regular file, executable, or symlink
    Blob,
    /// Subdirectory
    Tree,
    /// Submodule commit, living in a different object store
    Gitlink,
}

impl EntryKind {
    /// Classify a tree entry mode.
    pub fn from_mode(mode: u32) -> Option<Self> {
        match mode & 0o170000 {
            0o040000 => Some(EntryKind::Tree),
            0o160000 => Some(EntryKind::Gitlink),
            0o100000 | 0o120000 => Some(EntryKind::Blob),
            _ => None,
        }
    }
}

/// One entry of a tree object, in stored order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// File mode (e.g. `0o100644`)
    pub mode: u32,
    /// Entry name; arbitrary bytes, usually UTF-8
    pub name: Vec<u8>,
    /// Target object id
    pub oid: Oid,
    /// Target kind
    pub kind: EntryKind,
}

impl TreeEntry {
    /// The entry name for display and path building.
    pub fn name_lossy(&self) -> String {
        String::from_utf8_lossy(&self.name).into_owned()
    }
}

fn parse_commit(oid: &Oid, data: &[u8]) -> Result<Commit, EvtagError> {
    // Messages may use a legacy `encoding`; only the ASCII headers matter here.
    let text = String::from_utf8_lossy(data);
    let text = text.as_ref();

    let (headers, message) = match text.split_once("\n\n") {
        Some((h, m)) => (h, m),
        None => (text.strip_suffix('\n').unwrap_or(text), ""),
    };

    let mut lines = headers.lines();
    let tree = match lines.next().and_then(|l| l.strip_prefix("tree ")) {
        Some(hex) => Oid::new(hex.trim())
            .map_err(|e| EvtagError::malformed(oid, format!("bad tree id: {e}")))?,
        None => {
            return Err(EvtagError::malformed(
                oid,
                "expected 'tree <id>' as first commit header",
            ))
        }
    };

    let mut parents = Vec::new();
    let mut committer = None;
    for line in lines {
        // Continuation lines of multi-line headers (gpgsig, mergetag)
        if line.starts_with(' ') {
            continue;
        }
        if let Some(hex) = line.strip_prefix("parent ") {
            let parent = Oid::new(hex.trim())
                .map_err(|e| EvtagError::malformed(oid, format!("bad parent id: {e}")))?;
            parents.push(parent);
        } else if let Some(value) = line.strip_prefix("committer ") {
            committer = Some(value.to_string());
        }
    }

    Ok(Commit {
        tree,
        parents,
        committer,
        message: message.to_string(),
    })
}

fn parse_tree(oid: &Oid, data: &[u8]) -> Result<Vec<TreeEntry>, EvtagError> {
    let id_len = oid.raw_len();
    let mut entries = Vec::new();
    let mut rest = data;

    while !rest.is_empty() {
        let space = rest
            .iter()
            .position(|b| *b == b' ')
            .ok_or_else(|| EvtagError::malformed(oid, "tree entry without mode"))?;
        let mode_str = std::str::from_utf8(&rest[..space])
            .map_err(|_| EvtagError::malformed(oid, "tree entry mode is not ASCII"))?;
        let mode = u32::from_str_radix(mode_str, 8)
            .map_err(|_| EvtagError::malformed(oid, format!("bad tree entry mode '{mode_str}'")))?;
        rest = &rest[space + 1..];

        let nul = rest
            .iter()
            .position(|b| *b == 0)
            .ok_or_else(|| EvtagError::malformed(oid, "unterminated tree entry name"))?;
        let name = rest[..nul].to_vec();
        rest = &rest[nul + 1..];

        if rest.len() < id_len {
            return Err(EvtagError::malformed(oid, "truncated tree entry id"));
        }
        let entry_oid = Oid::from_bytes(&rest[..id_len])?;
        rest = &rest[id_len..];

        let kind = EntryKind::from_mode(mode)
            .ok_or_else(|| EvtagError::malformed(oid, format!("unknown entry mode {mode_str}")))?;

        entries.push(TreeEntry {
            mode,
            name,
            oid: entry_oid,
            kind,
        });
    }

    Ok(entries)
}

/// Armor lines that open a signature block appended to a tag message.
const SIGNATURE_MARKERS: [&str; 4] = [
    "-----BEGIN PGP SIGNATURE-----",
    "-----BEGIN PGP MESSAGE-----",
    "-----BEGIN SSH SIGNATURE-----",
    "-----BEGIN SIGNED MESSAGE-----",
];

/// Byte offset of the signature block that ends `text`, if any.
///
/// A block only counts when its marker starts a line. When several marker
/// lines occur the last one opens the signature, as git's own tag parser
/// does, so armored text quoted in a message stays part of the message.
pub fn signature_offset(text: &str) -> Option<usize> {
    let mut offset = 0;
    let mut found = None;
    for line in text.split_inclusive('\n') {
        if SIGNATURE_MARKERS.iter().any(|m| line.starts_with(m)) {
            found = Some(offset);
        }
        offset += line.len();
    }
    found
}

/// An annotated tag object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagObject {
    /// The tagged object
    pub target: Oid,
    /// Kind of the tagged object
    pub target_kind: ObjectKind,
    /// Name recorded inside the tag
    pub name: String,
    /// Raw `tagger` header value, if present
    pub tagger: Option<String>,
    /// Message, without any trailing signature block
    pub message: String,
    /// Armored signature block, if the tag is signed
    pub signature: Option<String>,
    /// The bytes covered by the signature (the object minus the signature)
    pub signed_payload: Vec<u8>,
}

impl TagObject {
    /// Assemble the unsigned payload of a new tag object.
    ///
    /// The message is terminated with a newline if it is not already.
    ///
    /// # Example
    ///
    /// ```
    /// use git_evtag::core::object::{ObjectKind, TagObject};
    /// use git_evtag::core::types::Oid;
    ///
    /// let target = Oid::new("abc123def4567890abc123def4567890abc12345").unwrap();
    /// let payload = TagObject::payload(
    ///     &target,
    ///     ObjectKind::Commit,
    ///     "v1",
    ///     "A U Thor <a@example.com> 1700000000 +0000",
    ///     "Release v1",
    /// );
    /// let text = String::from_utf8(payload).unwrap();
    /// assert!(text.starts_with("object abc123def4567890abc123def4567890abc12345\ntype commit\ntag v1\n"));
    /// assert!(text.ends_with("\n\nRelease v1\n"));
    /// ```
    pub fn payload(
        target: &Oid,
        target_kind: ObjectKind,
        name: &str,
        tagger: &str,
        message: &str,
    ) -> Vec<u8> {
        let mut out = format!(
            "object {}\ntype {}\ntag {}\ntagger {}\n\n{}",
            target, target_kind, name, tagger, message
        );
        if !out.ends_with('\n') {
            out.push('\n');
        }
        out.into_bytes()
    }

    /// Append an armored signature to a payload built by [`TagObject::payload`].
    pub fn signed(payload: &[u8], signature: &str) -> Vec<u8> {
        let mut out = payload.to_vec();
        out.extend_from_slice(signature.as_bytes());
        if !signature.ends_with('\n') {
            out.push(b'\n');
        }
        out
    }

    /// Parse a raw tag payload.
    ///
    /// # Errors
    ///
    /// Returns [`EvtagError::MalformedObject`] on missing or invalid headers.
    pub fn parse(oid: &Oid, data: &[u8]) -> Result<Self, EvtagError> {
        let text = std::str::from_utf8(data)
            .map_err(|_| EvtagError::malformed(oid, "tag is not valid UTF-8"))?;

        let (headers, body, body_start) = match text.find("\n\n") {
            Some(idx) => (&text[..idx], &text[idx + 2..], idx + 2),
            None => (text.trim_end_matches('\n'), "", text.len()),
        };

        let mut target = None;
        let mut target_kind = None;
        let mut name = None;
        let mut tagger = None;
        for line in headers.lines() {
            if let Some(hex) = line.strip_prefix("object ") {
                target = Some(
                    Oid::new(hex.trim())
                        .map_err(|e| EvtagError::malformed(oid, format!("bad object id: {e}")))?,
                );
            } else if let Some(kind) = line.strip_prefix("type ") {
                target_kind = Some(ObjectKind::from_name(kind.trim()).ok_or_else(|| {
                    EvtagError::malformed(oid, format!("unknown tagged type '{kind}'"))
                })?);
            } else if let Some(value) = line.strip_prefix("tag ") {
                name = Some(value.to_string());
            } else if let Some(value) = line.strip_prefix("tagger ") {
                tagger = Some(value.to_string());
            }
        }

        let target = target.ok_or_else(|| EvtagError::malformed(oid, "missing 'object' header"))?;
        let target_kind =
            target_kind.ok_or_else(|| EvtagError::malformed(oid, "missing 'type' header"))?;
        let name = name.ok_or_else(|| EvtagError::malformed(oid, "missing 'tag' header"))?;

        let (message, signature, payload_end) = match signature_offset(body) {
            Some(offset) => (
                body[..offset].to_string(),
                Some(body[offset..].to_string()),
                body_start + offset,
            ),
            None => (body.to_string(), None, data.len()),
        };

        Ok(Self {
            target,
            target_kind,
            name,
            tagger,
            message,
            signature,
            signed_payload: data[..payload_end.min(data.len())].to_vec(),
        })
    }
}
