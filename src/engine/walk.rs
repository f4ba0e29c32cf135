//! engine::walk
//!
//! The graph walker.
//!
//! # Order
//!
//! The walk is a pre-order depth-first traversal driven by an explicit work
//! stack:
//!
//! 1. the target commit (its parents are never followed)
//! 2. the commit's root tree
//! 3. each tree's entries in stored order; a subtree is emitted and fully
//!    walked before the next sibling
//! 4. a gitlink entry switches to the submodule's store at that position
//!    and walks the submodule commit the same way
//!
//! Order depends only on the root commit and store content.
//!
//! # Deduplication
//!
//! By default an object is emitted at most once per `(StoreId, Oid)`. With
//! `dedup` disabled every occurrence is emitted, which is how other EVTag
//! implementations hash.
//!
//! # Failure
//!
//! The first error is yielded once and the walk is over: the iterator is
//! fused and all read state is dropped with it.
//!
//! # Resources
//!
//! Each store gets its own [`Fetcher`] while frames of that store are
//! pending. Once a store's last frame is processed its reader pool is shut
//! down, so live pools are bounded by the submodule nesting depth rather
//! than the number of submodules.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::trace;

use crate::core::error::EvtagError;
use crate::core::object::{EntryKind, GitObject, ObjectKind, RawObject};
use crate::core::store::ObjectSource;
use crate::core::types::{Oid, StoreId};

use super::fetch::Fetcher;
use super::submodule::SubmoduleResolver;

/// Tuning and semantics of one walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkOptions {
    /// Read workers per store
    pub jobs: usize,
    /// Objects that may be read ahead per store
    pub prefetch_window: usize,
    /// Emit each `(store, oid)` at most once
    pub dedup: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            jobs: 1,
            prefetch_window: 256,
            dedup: true,
        }
    }
}

/// One emitted object.
#[derive(Debug, Clone)]
pub struct Visited {
    /// Object id within its store
    pub oid: Oid,
    /// The store the object was read from
    pub store: StoreId,
    /// Path relative to the top-level working tree ("" for root commit/tree)
    pub path: String,
    /// The bytes that get digested
    pub raw: RawObject,
    /// The decoded object
    pub object: GitObject,
    /// Submodule nesting depth (0 for the top-level store)
    pub depth: usize,
    /// Whether this is the commit a gitlink pointed at
    pub submodule_root: bool,
}

/// A position in the pending work.
struct Frame {
    store: Arc<dyn ObjectSource>,
    /// Path of the store's working tree relative to the top level, with a
    /// trailing slash unless empty
    base: String,
    /// Path relative to `base`
    path: String,
    oid: Oid,
    step: Step,
    depth: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Commit { submodule_root: bool },
    Tree,
    Blob,
    Gitlink,
}

impl Step {
    fn expected(self) -> Option<ObjectKind> {
        match self {
            Step::Commit { .. } => Some(ObjectKind::Commit),
            Step::Tree => Some(ObjectKind::Tree),
            Step::Blob => Some(ObjectKind::Blob),
            Step::Gitlink => None,
        }
    }
}

/// Lazy traversal of everything reachable from one commit.
pub struct Walker {
    options: WalkOptions,
    stack: Vec<Frame>,
    seen: HashSet<(StoreId, Oid)>,
    fetchers: HashMap<StoreId, Fetcher>,
    /// Frames on the stack per store
    pending: HashMap<StoreId, usize>,
    resolver: SubmoduleResolver,
    done: bool,
}

impl Walker {
    /// Start a walk at `commit` in `store`.
    pub fn new(store: Arc<dyn ObjectSource>, commit: Oid, options: WalkOptions) -> Self {
        let root = Frame {
            store,
            base: String::new(),
            path: String::new(),
            oid: commit,
            step: Step::Commit {
                submodule_root: false,
            },
            depth: 0,
        };
        let mut walker = Self {
            options,
            stack: Vec::new(),
            seen: HashSet::new(),
            fetchers: HashMap::new(),
            pending: HashMap::new(),
            resolver: SubmoduleResolver::new(),
            done: false,
        };
        walker.push(root);
        walker
    }

    fn push(&mut self, frame: Frame) {
        *self
            .pending
            .entry(frame.store.store_id().clone())
            .or_default() += 1;
        self.stack.push(frame);
    }

    /// Account for a processed frame of `store`, shutting its pool down
    /// when nothing else of that store is pending.
    fn release(&mut self, store: &StoreId) {
        let Some(count) = self.pending.get_mut(store) else {
            return;
        };
        *count -= 1;
        if *count == 0 {
            self.pending.remove(store);
            if self.fetchers.remove(store).is_some() {
                trace!(%store, "released object reader");
            }
        }
    }

    fn fetcher(&mut self, store: &Arc<dyn ObjectSource>) -> Result<&mut Fetcher, EvtagError> {
        let id = store.store_id().clone();
        if !self.fetchers.contains_key(&id) {
            let fetcher = Fetcher::new(
                store,
                self.options.jobs,
                self.options.prefetch_window,
            )?;
            self.fetchers.insert(id.clone(), fetcher);
        }
        self.fetchers.get_mut(&id).ok_or_else(|| EvtagError::Store {
            message: format!("no reader for store {id}"),
        })
    }

    fn is_seen(&self, store: &StoreId, oid: &Oid) -> bool {
        self.options.dedup && self.seen.contains(&(store.clone(), oid.clone()))
    }

    /// Process frames until one yields an object.
    fn advance(&mut self) -> Result<Option<Visited>, EvtagError> {
        while let Some(frame) = self.stack.pop() {
            let store_id = frame.store.store_id().clone();
            if frame.step == Step::Gitlink {
                self.enter_submodule(frame)?;
                self.release(&store_id);
                continue;
            }

            if self.is_seen(&store_id, &frame.oid) {
                trace!(oid = %frame.oid, "already digested");
                self.release(&store_id);
                continue;
            }

            let raw = self.fetcher(&frame.store)?.fetch(&frame.oid)?;
            if let Some(expected) = frame.step.expected() {
                if raw.kind != expected {
                    return Err(EvtagError::malformed(
                        &frame.oid,
                        format!("expected a {expected}, found a {}", raw.kind),
                    ));
                }
            }
            let object = raw.parse(&frame.oid)?;

            match &object {
                GitObject::Commit(commit) => {
                    self.push(Frame {
                        store: Arc::clone(&frame.store),
                        base: frame.base.clone(),
                        path: frame.path.clone(),
                        oid: commit.tree.clone(),
                        step: Step::Tree,
                        depth: frame.depth,
                    });
                }
                GitObject::Tree(entries) => {
                    self.schedule_entries(&frame, entries)?;
                }
                GitObject::Blob => {}
                GitObject::Tag(_) => {
                    return Err(EvtagError::malformed(
                        &frame.oid,
                        "tag objects cannot appear inside a tree",
                    ));
                }
            }

            if self.options.dedup {
                self.seen.insert((store_id.clone(), frame.oid.clone()));
            }
            self.release(&store_id);

            return Ok(Some(Visited {
                oid: frame.oid,
                store: store_id,
                path: format!("{}{}", frame.base, frame.path),
                raw,
                object,
                depth: frame.depth,
                submodule_root: matches!(
                    frame.step,
                    Step::Commit {
                        submodule_root: true
                    }
                ),
            }));
        }
        Ok(None)
    }

    fn schedule_entries(
        &mut self,
        parent: &Frame,
        entries: &[crate::core::object::TreeEntry],
    ) -> Result<(), EvtagError> {
        let store_id = parent.store.store_id().clone();
        let mut hints = Vec::new();

        // Reverse so the first entry is popped first.
        for entry in entries.iter().rev() {
            let path = if parent.path.is_empty() {
                entry.name_lossy()
            } else {
                format!("{}/{}", parent.path, entry.name_lossy())
            };
            let step = match entry.kind {
                EntryKind::Blob => Step::Blob,
                EntryKind::Tree => Step::Tree,
                EntryKind::Gitlink => Step::Gitlink,
            };
            if step != Step::Gitlink && !self.is_seen(&store_id, &entry.oid) {
                hints.push(entry.oid.clone());
            }
            self.push(Frame {
                store: Arc::clone(&parent.store),
                base: parent.base.clone(),
                path,
                oid: entry.oid.clone(),
                step,
                depth: parent.depth,
            });
        }

        let fetcher = self.fetcher(&parent.store)?;
        for oid in hints.iter().rev() {
            fetcher.prefetch(oid);
        }
        Ok(())
    }

    fn enter_submodule(&mut self, link: Frame) -> Result<(), EvtagError> {
        let display = format!("{}{}", link.base, link.path);
        let store = self.resolver.resolve(&link.store, &link.path, &display)?;
        self.push(Frame {
            store,
            base: format!("{display}/"),
            path: String::new(),
            oid: link.oid,
            step: Step::Commit {
                submodule_root: true,
            },
            depth: link.depth + 1,
        });
        Ok(())
    }
}

impl Iterator for Walker {
    type Item = Result<Visited, EvtagError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.advance() {
            Ok(Some(visited)) => Some(Ok(visited)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                self.stack.clear();
                self.pending.clear();
                self.fetchers.clear();
                Some(Err(err))
            }
        }
    }
}

impl std::iter::FusedIterator for Walker {}
