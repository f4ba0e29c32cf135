//! core::store
//!
//! The object store seams consumed by the checksum engine.
//!
//! # Design
//!
//! The engine never talks to git directly. It consumes three narrow
//! capabilities:
//!
//! - [`ObjectSource`]: one object store (a repository or a submodule). It
//!   can hand out independent [`ObjectReader`] handles, one per worker
//!   thread, and locate the nested store behind a gitlink. Readers are
//!   opened on the thread that uses them.
//! - [`ObjectReader`]: reads one object's kind and raw payload by id.
//! - [`Repo`]: the top-level repository: revision resolution, tag lookup,
//!   tag creation, and signing identity.
//!
//! The production implementation lives in [`crate::git`]; the in-memory
//! implementation in [`memory`] backs tests.

pub mod memory;

use std::sync::Arc;

use crate::core::error::EvtagError;
use crate::core::object::{RawObject, TagObject};
use crate::core::types::{Oid, StoreId, TagName};

/// A read handle on one object store.
///
/// Handles never leave the thread that opened them; open one per worker.
pub trait ObjectReader {
    /// Read an object's kind and raw payload.
    ///
    /// # Errors
    ///
    /// - [`EvtagError::ObjectNotFound`] if the id is absent from the store
    fn read(&mut self, oid: &Oid) -> Result<RawObject, EvtagError>;
}

/// One object store, shareable across threads.
pub trait ObjectSource: Send + Sync {
    /// Identity of this store; keys the walker's seen-set.
    fn store_id(&self) -> &StoreId;

    /// Open an independent reader on this store.
    fn reader(&self) -> Result<Box<dyn ObjectReader>, EvtagError>;

    /// Locate the store of the submodule checked out at `path`.
    ///
    /// `path` is relative to this store's working tree.
    ///
    /// # Errors
    ///
    /// - [`EvtagError::SubmoduleNotInitialized`] if the nested store is absent
    fn submodule(&self, path: &str) -> Result<Arc<dyn ObjectSource>, EvtagError>;
}

/// What a tag reference points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagRef {
    /// An annotated tag object.
    Annotated {
        /// Id of the tag object
        oid: Oid,
        /// The parsed tag object
        tag: TagObject,
    },
    /// A lightweight tag pointing straight at an object.
    Lightweight {
        /// The tagged object
        target: Oid,
    },
}

/// The top-level repository the orchestrator works against.
pub trait Repo {
    /// The repository's own object store.
    fn objects(&self) -> Arc<dyn ObjectSource>;

    /// Resolve a revision (ref name, tag, abbreviated or full id) to a commit.
    ///
    /// # Errors
    ///
    /// - [`EvtagError::InvalidRevision`] if it does not name a commit
    fn resolve_commit(&self, revision: &str) -> Result<Oid, EvtagError>;

    /// Look up a tag by name. Returns `Ok(None)` if it does not exist.
    fn find_tag(&self, name: &TagName) -> Result<Option<TagRef>, EvtagError>;

    /// Store a raw tag object and point `refs/tags/<name>` at it.
    ///
    /// # Errors
    ///
    /// - [`EvtagError::TagExists`] if the tag exists and `force` is false
    fn write_tag(&self, name: &TagName, object: &[u8], force: bool) -> Result<Oid, EvtagError>;

    /// The tagger identity line (`Name <email> <epoch> <+zzzz>`).
    fn tagger(&self) -> Result<String, EvtagError>;

    /// The configured signing key, if any (`user.signingkey`).
    fn signing_key(&self) -> Option<String>;
}
