//! engine::compute
//!
//! Checksum computation entry points.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info_span};

use crate::core::checksum::Checksum;
use crate::core::config::Config;
use crate::core::error::EvtagError;
use crate::core::store::{ObjectSource, Repo};
use crate::core::types::Oid;

use super::digest::{Accumulator, Stats};
use super::walk::{WalkOptions, Walker};

/// Options for one checksum computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputeOptions {
    /// Read workers per store
    pub jobs: usize,
    /// Objects that may be read ahead per store
    pub prefetch_window: usize,
    /// Hash repeated objects at every occurrence
    pub compat: bool,
}

impl Default for ComputeOptions {
    fn default() -> Self {
        Self {
            jobs: 1,
            prefetch_window: 256,
            compat: false,
        }
    }
}

impl ComputeOptions {
    /// Options taken from loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            jobs: config.jobs(),
            prefetch_window: config.prefetch_window(),
            compat: config.compat(),
        }
    }

    fn walk_options(&self) -> WalkOptions {
        WalkOptions {
            jobs: self.jobs,
            prefetch_window: self.prefetch_window,
            dedup: !self.compat,
        }
    }
}

/// The result of a successful computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComputeOutcome {
    /// The commit the checksum covers
    pub commit: Oid,
    /// The checksum
    pub checksum: Checksum,
    /// Informational per-class statistics
    pub stats: Stats,
}

/// Compute the checksum of `revision` in `repo`.
///
/// # Errors
///
/// - [`EvtagError::InvalidRevision`] if `revision` does not name a commit
/// - any traversal error from [`compute_commit`]
///
/// # Example
///
/// ```
/// use git_evtag::core::store::memory::{MemoryRepo, MemoryStore};
/// use git_evtag::engine::compute::{compute, ComputeOptions};
///
/// let store = MemoryStore::new("top");
/// let blob = store.blob(b"hello\n");
/// let root = store.tree(&[("100644", "hello.txt", &blob)]);
/// let head = store.commit(&root, &[], "initial");
/// let repo = MemoryRepo::new(store);
/// repo.set_ref("HEAD", &head);
///
/// let outcome = compute(&repo, "HEAD", &ComputeOptions::default()).unwrap();
/// assert_eq!(outcome.commit, head);
/// assert_eq!(outcome.stats.blobs.count, 1);
/// assert_eq!(outcome.checksum.as_str().len(), 128);
/// ```
pub fn compute(
    repo: &dyn Repo,
    revision: &str,
    options: &ComputeOptions,
) -> Result<ComputeOutcome, EvtagError> {
    let commit = repo.resolve_commit(revision)?;
    let (checksum, stats) = compute_commit(repo.objects(), &commit, options)?;
    Ok(ComputeOutcome {
        commit,
        checksum,
        stats,
    })
}

/// Compute the checksum of `commit` in `store`.
///
/// # Errors
///
/// - [`EvtagError::ObjectNotFound`] if a reachable object is missing
/// - [`EvtagError::MalformedObject`] if a reachable object does not parse
/// - [`EvtagError::SubmoduleNotInitialized`] if a submodule store is absent
pub fn compute_commit(
    store: Arc<dyn ObjectSource>,
    commit: &Oid,
    options: &ComputeOptions,
) -> Result<(Checksum, Stats), EvtagError> {
    let span = info_span!("compute", commit = %commit, compat = options.compat);
    let _enter = span.enter();
    let started = Instant::now();

    let mut accumulator = Accumulator::new();
    for visited in Walker::new(store, commit.clone(), options.walk_options()) {
        accumulator.feed(&visited?);
    }
    let (checksum, stats) = accumulator.finish();

    debug!(
        objects = stats.objects(),
        submodules = stats.submodules.count,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "checksum computed"
    );
    Ok((checksum, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::object::{ObjectKind, RawObject};
    use crate::core::store::memory::{MemoryRepo, MemorySource, MemoryStore};

    struct Fixture {
        top: Arc<MemoryStore>,
        sub: Arc<MemoryStore>,
        commit: Oid,
        shared: Oid,
        sub_blob: Oid,
    }

    fn fixture() -> Fixture {
        let sub = MemoryStore::new("sub");
        let sub_blob = sub.blob(b"submodule file\n");
        let sub_root = sub.tree(&[("100644", "sub.txt", &sub_blob)]);
        let sub_commit = sub.commit(&sub_root, &[], "sub");

        let top = MemoryStore::new("top");
        let shared = top.blob(b"shared\n");
        let docs = top.tree(&[("100644", "copy.txt", &shared)]);
        let root = top.tree(&[
            ("100644", "README", &shared),
            ("40000", "docs", &docs),
            ("160000", "third_party", &sub_commit),
        ]);
        let commit = top.commit(&root, &[], "top");
        top.link_submodule("third_party", Arc::clone(&sub));

        Fixture {
            top,
            sub,
            commit,
            shared,
            sub_blob,
        }
    }

    fn checksum_of(f: &Fixture, options: &ComputeOptions) -> Result<(Checksum, Stats), EvtagError> {
        compute_commit(
            Arc::new(MemorySource(Arc::clone(&f.top))),
            &f.commit,
            options,
        )
    }

    #[test]
    fn deterministic_across_runs_and_worker_counts() {
        let f = fixture();
        let (first, _) = checksum_of(&f, &ComputeOptions::default()).unwrap();
        let (second, _) = checksum_of(&f, &ComputeOptions::default()).unwrap();
        let pooled = ComputeOptions {
            jobs: 4,
            prefetch_window: 2,
            ..Default::default()
        };
        let (third, _) = checksum_of(&f, &pooled).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, third);
    }

    #[test]
    fn stats_count_each_object_once() {
        let f = fixture();
        let (_, stats) = checksum_of(&f, &ComputeOptions::default()).unwrap();
        // top: README/copy.txt share one blob; sub: one blob
        assert_eq!(stats.commits.count, 2);
        assert_eq!(stats.trees.count, 3);
        assert_eq!(stats.blobs.count, 2);
        assert_eq!(stats.submodules.count, 1);
        assert!(stats.submodules.bytes > 0);
    }

    #[test]
    fn compat_differs_only_when_content_repeats() {
        let f = fixture();
        let compat = ComputeOptions {
            compat: true,
            ..Default::default()
        };
        let (deduped, _) = checksum_of(&f, &ComputeOptions::default()).unwrap();
        let (repeated, stats) = checksum_of(&f, &compat).unwrap();
        assert_ne!(deduped, repeated);
        assert_eq!(stats.blobs.count, 3);

        let store = MemoryStore::new("plain");
        let blob = store.blob(b"only once");
        let root = store.tree(&[("100644", "f", &blob)]);
        let commit = store.commit(&root, &[], "plain");
        let source = || -> Arc<dyn ObjectSource> { Arc::new(MemorySource(Arc::clone(&store))) };
        assert_eq!(
            compute_commit(source(), &commit, &ComputeOptions::default()).unwrap(),
            compute_commit(source(), &commit, &compat).unwrap()
        );
    }

    #[test]
    fn submodule_content_changes_checksum() {
        let f = fixture();
        let (before, _) = checksum_of(&f, &ComputeOptions::default()).unwrap();
        f.sub.replace(
            &f.sub_blob,
            RawObject::new(ObjectKind::Blob, b"submodule file!\n".to_vec()),
        );
        let (after, _) = checksum_of(&f, &ComputeOptions::default()).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn missing_object_yields_no_checksum() {
        let f = fixture();
        f.top.remove(&f.shared);
        let err = checksum_of(&f, &ComputeOptions::default()).unwrap_err();
        assert!(matches!(err, EvtagError::ObjectNotFound { ref oid } if *oid == f.shared));
    }

    #[test]
    fn compute_resolves_revision() {
        let f = fixture();
        let repo = MemoryRepo::new(Arc::clone(&f.top));
        repo.set_ref("refs/heads/main", &f.commit);
        let outcome = compute(&repo, "main", &ComputeOptions::default()).unwrap();
        assert_eq!(outcome.commit, f.commit);

        let err = compute(&repo, "nope", &ComputeOptions::default()).unwrap_err();
        assert!(matches!(err, EvtagError::InvalidRevision { .. }));
    }
}
