//! core::store::memory
//!
//! In-memory object stores for deterministic testing.
//!
//! # Design
//!
//! Objects are addressed with git's SHA-256 object format: the id of an
//! object is the SHA-256 of its loose-object header and payload. Stores are
//! thread-safe via internal locks so the engine's worker pool can read them
//! concurrently, and they expose mutation hooks (`replace`, `remove`) for
//! tamper and missing-object scenarios that a real content-addressed store
//! would refuse.
//!
//! # Example
//!
//! ```
//! use git_evtag::core::store::memory::{MemoryRepo, MemoryStore};
//! use git_evtag::core::store::Repo;
//!
//! let store = MemoryStore::new("top");
//! let readme = store.blob(b"hello\n");
//! let root = store.tree(&[("100644", "README", &readme)]);
//! let head = store.commit(&root, &[], "initial");
//!
//! let repo = MemoryRepo::new(store);
//! repo.set_ref("refs/heads/main", &head);
//! assert_eq!(repo.resolve_commit("main").unwrap(), head);
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use sha2::{Digest, Sha256};

use super::{ObjectReader, ObjectSource, Repo, TagRef};
use crate::core::error::EvtagError;
use crate::core::object::{ObjectKind, RawObject, TagObject};
use crate::core::types::{Oid, StoreId, TagName};

/// An in-memory object store.
#[derive(Debug)]
pub struct MemoryStore {
    id: StoreId,
    objects: RwLock<HashMap<Oid, RawObject>>,
    submodules: RwLock<HashMap<String, Arc<MemoryStore>>>,
}

impl MemoryStore {
    /// Create an empty store with the given identity label.
    pub fn new(label: &str) -> Arc<Self> {
        Arc::new(Self {
            id: StoreId::new(label),
            objects: RwLock::new(HashMap::new()),
            submodules: RwLock::new(HashMap::new()),
        })
    }

    /// Compute the id an object would be stored under.
    pub fn id_for(raw: &RawObject) -> Oid {
        let mut hasher = Sha256::new();
        hasher.update(raw.header());
        hasher.update(&raw.data);
        Oid::from_bytes(&hasher.finalize()).unwrap_or_else(|_| unreachable!("sha256 is 32 bytes"))
    }

    /// Store an object and return its id.
    pub fn insert(&self, raw: RawObject) -> Oid {
        let oid = Self::id_for(&raw);
        self.write_objects().insert(oid.clone(), raw);
        oid
    }

    /// Store a blob.
    pub fn blob(&self, content: &[u8]) -> Oid {
        self.insert(RawObject::new(ObjectKind::Blob, content.to_vec()))
    }

    /// Store a tree. Entries are kept in the order given: `(mode, name, id)`.
    pub fn tree(&self, entries: &[(&str, &str, &Oid)]) -> Oid {
        let mut data = Vec::new();
        for (mode, name, oid) in entries {
            data.extend_from_slice(mode.as_bytes());
            data.push(b' ');
            data.extend_from_slice(name.as_bytes());
            data.push(0);
            data.extend_from_slice(
                &hex::decode(oid.as_str()).unwrap_or_else(|_| unreachable!("oids are hex")),
            );
        }
        self.insert(RawObject::new(ObjectKind::Tree, data))
    }

    /// Store a commit with a fixed author and committer.
    pub fn commit(&self, tree: &Oid, parents: &[&Oid], message: &str) -> Oid {
        let mut text = format!("tree {tree}\n");
        for parent in parents {
            text.push_str(&format!("parent {parent}\n"));
        }
        text.push_str("author A U Thor <author@example.com> 1700000000 +0000\n");
        text.push_str("committer C O Mitter <committer@example.com> 1700000000 +0000\n");
        text.push('\n');
        text.push_str(message);
        text.push('\n');
        self.insert(RawObject::new(ObjectKind::Commit, text.into_bytes()))
    }

    /// Register `store` as the submodule checked out at `path`.
    pub fn link_submodule(&self, path: &str, store: Arc<MemoryStore>) {
        self.submodules
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.to_string(), store);
    }

    /// Overwrite the payload stored under an existing id.
    ///
    /// Simulates on-disk corruption that a reader does not detect.
    pub fn replace(&self, oid: &Oid, raw: RawObject) {
        self.write_objects().insert(oid.clone(), raw);
    }

    /// Delete an object.
    pub fn remove(&self, oid: &Oid) -> Option<RawObject> {
        self.write_objects().remove(oid)
    }

    /// Read an object directly.
    pub fn get(&self, oid: &Oid) -> Option<RawObject> {
        self.objects
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(oid)
            .cloned()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether the store holds no objects.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn write_objects(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<Oid, RawObject>> {
        self.objects.write().unwrap_or_else(|e| e.into_inner())
    }
}

struct MemoryReader {
    store: Arc<MemoryStore>,
}

impl ObjectReader for MemoryReader {
    fn read(&mut self, oid: &Oid) -> Result<RawObject, EvtagError> {
        self.store
            .get(oid)
            .ok_or_else(|| EvtagError::ObjectNotFound { oid: oid.clone() })
    }
}

/// Wrapper so an `Arc<MemoryStore>` can hand out readers holding the `Arc`.
#[derive(Debug, Clone)]
pub struct MemorySource(pub Arc<MemoryStore>);

impl ObjectSource for MemorySource {
    fn store_id(&self) -> &StoreId {
        &self.0.id
    }

    fn reader(&self) -> Result<Box<dyn ObjectReader>, EvtagError> {
        Ok(Box::new(MemoryReader {
            store: Arc::clone(&self.0),
        }))
    }

    fn submodule(&self, path: &str) -> Result<Arc<dyn ObjectSource>, EvtagError> {
        let submodules = self.0.submodules.read().unwrap_or_else(|e| e.into_inner());
        match submodules.get(path) {
            Some(store) => Ok(Arc::new(MemorySource(Arc::clone(store)))),
            None => Err(EvtagError::SubmoduleNotInitialized {
                path: path.to_string(),
            }),
        }
    }
}

/// An in-memory repository: a store plus refs.
#[derive(Debug)]
pub struct MemoryRepo {
    store: Arc<MemoryStore>,
    refs: RwLock<BTreeMap<String, Oid>>,
    tagger: String,
    signing_key: Option<String>,
}

impl MemoryRepo {
    /// Create a repository over `store` with no refs.
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            refs: RwLock::new(BTreeMap::new()),
            tagger: "T Agger <tagger@example.com> 1700000000 +0000".to_string(),
            signing_key: None,
        }
    }

    /// Set the signing key reported by [`Repo::signing_key`].
    pub fn with_signing_key(mut self, key: &str) -> Self {
        self.signing_key = Some(key.to_string());
        self
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    /// Point a full ref name at an object.
    pub fn set_ref(&self, name: &str, oid: &Oid) {
        self.refs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.to_string(), oid.clone());
    }

    fn lookup_ref(&self, name: &str) -> Option<Oid> {
        let refs = self.refs.read().unwrap_or_else(|e| e.into_inner());
        [
            name.to_string(),
            format!("refs/tags/{name}"),
            format!("refs/heads/{name}"),
        ]
        .iter()
        .find_map(|candidate| refs.get(candidate).cloned())
    }

    fn lookup_exact(&self, refname: &str) -> bool {
        self.refs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(refname)
    }

    fn peel_to_commit(&self, revision: &str, mut oid: Oid) -> Result<Oid, EvtagError> {
        loop {
            let raw = self
                .store
                .get(&oid)
                .ok_or_else(|| EvtagError::InvalidRevision {
                    revision: revision.to_string(),
                    reason: format!("object {oid} not found"),
                })?;
            match raw.kind {
                ObjectKind::Commit => return Ok(oid),
                ObjectKind::Tag => oid = TagObject::parse(&oid, &raw.data)?.target,
                ObjectKind::Tree | ObjectKind::Blob => {
                    return Err(EvtagError::InvalidRevision {
                        revision: revision.to_string(),
                        reason: format!("{oid} is a {}, not a commit", raw.kind),
                    })
                }
            }
        }
    }
}

impl Repo for MemoryRepo {
    fn objects(&self) -> Arc<dyn ObjectSource> {
        Arc::new(MemorySource(Arc::clone(&self.store)))
    }

    fn resolve_commit(&self, revision: &str) -> Result<Oid, EvtagError> {
        let start = match self.lookup_ref(revision) {
            Some(oid) => oid,
            None => Oid::new(revision).map_err(|_| EvtagError::InvalidRevision {
                revision: revision.to_string(),
                reason: "unknown revision".to_string(),
            })?,
        };
        self.peel_to_commit(revision, start)
    }

    fn find_tag(&self, name: &TagName) -> Result<Option<TagRef>, EvtagError> {
        let refs = self.refs.read().unwrap_or_else(|e| e.into_inner());
        let Some(oid) = refs.get(&name.ref_name()).cloned() else {
            return Ok(None);
        };
        drop(refs);

        match self.store.get(&oid) {
            Some(raw) if raw.kind == ObjectKind::Tag => Ok(Some(TagRef::Annotated {
                tag: TagObject::parse(&oid, &raw.data)?,
                oid,
            })),
            Some(_) => Ok(Some(TagRef::Lightweight { target: oid })),
            None => Err(EvtagError::ObjectNotFound { oid }),
        }
    }

    fn write_tag(&self, name: &TagName, object: &[u8], force: bool) -> Result<Oid, EvtagError> {
        let refname = name.ref_name();
        if !force && self.lookup_exact(&refname) {
            return Err(EvtagError::TagExists { tag: name.clone() });
        }
        let oid = self
            .store
            .insert(RawObject::new(ObjectKind::Tag, object.to_vec()));
        self.set_ref(&refname, &oid);
        Ok(oid)
    }

    fn tagger(&self) -> Result<String, EvtagError> {
        Ok(self.tagger.clone())
    }

    fn signing_key(&self) -> Option<String> {
        self.signing_key.clone()
    }
}
