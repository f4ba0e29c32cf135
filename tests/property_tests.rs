//! Property-based tests for checksum invariants.
//!
//! These tests use proptest over the in-memory store to check that the
//! checksum depends only on content and stored entry order.

use std::collections::BTreeMap;
use std::sync::Arc;

use proptest::prelude::*;

use git_evtag::core::store::memory::{MemorySource, MemoryStore};
use git_evtag::core::types::Oid;
use git_evtag::engine::{compute_commit, ComputeOptions};

/// Strategy for file names.
fn file_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_.]{0,11}"
}

/// Strategy for a flat directory: unique names mapped to contents.
fn files() -> impl Strategy<Value = BTreeMap<String, Vec<u8>>> {
    prop::collection::btree_map(file_name(), prop::collection::vec(any::<u8>(), 0..64), 1..12)
}

/// Store `files` as a root tree with one subdirectory holding the same
/// files, inserting objects in the given or reversed order.
fn build(store: &MemoryStore, files: &BTreeMap<String, Vec<u8>>, reverse: bool) -> Oid {
    let mut entries: Vec<(&String, &Vec<u8>)> = files.iter().collect();
    if reverse {
        entries.reverse();
    }
    let mut blobs: BTreeMap<&str, Oid> = BTreeMap::new();
    for (name, content) in entries {
        blobs.insert(name.as_str(), store.blob(content));
    }

    let leaf: Vec<(&str, &str, &Oid)> = blobs
        .iter()
        .map(|(name, oid)| ("100644", *name, oid))
        .collect();
    let sub = store.tree(&leaf);

    let mut root = leaf.clone();
    root.push(("40000", "~sub", &sub));
    let root = store.tree(&root);
    store.commit(&root, &[], "property")
}

fn checksum(store: &Arc<MemoryStore>, commit: &Oid, options: &ComputeOptions) -> String {
    compute_commit(Arc::new(MemorySource(Arc::clone(store))), commit, options)
        .unwrap()
        .0
        .to_string()
}

proptest! {
    #[test]
    fn worker_count_and_window_do_not_matter(
        files in files(),
        jobs in 1usize..6,
        window in 1usize..16,
    ) {
        let store = MemoryStore::new("p");
        let commit = build(&store, &files, false);
        let inline = checksum(&store, &commit, &ComputeOptions::default());
        let pooled = checksum(&store, &commit, &ComputeOptions {
            jobs,
            prefetch_window: window,
            ..Default::default()
        });
        prop_assert_eq!(inline, pooled);
    }

    #[test]
    fn storage_insertion_order_does_not_matter(files in files()) {
        let forward = MemoryStore::new("p");
        let backward = MemoryStore::new("p");
        let a = build(&forward, &files, false);
        let b = build(&backward, &files, true);
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(
            checksum(&forward, &a, &ComputeOptions::default()),
            checksum(&backward, &b, &ComputeOptions::default())
        );
    }

    #[test]
    fn repeated_blobs_counted_once(files in files()) {
        let store = MemoryStore::new("p");
        let commit = build(&store, &files, false);
        let distinct = files.values().collect::<std::collections::BTreeSet<_>>().len() as u64;

        let (_, stats) = compute_commit(
            Arc::new(MemorySource(Arc::clone(&store))),
            &commit,
            &ComputeOptions::default(),
        ).unwrap();
        prop_assert_eq!(stats.blobs.count, distinct);
        prop_assert_eq!(stats.trees.count, 2);

        let (_, compat) = compute_commit(
            Arc::new(MemorySource(Arc::clone(&store))),
            &commit,
            &ComputeOptions { compat: true, ..Default::default() },
        ).unwrap();
        prop_assert_eq!(compat.blobs.count, 2 * files.len() as u64);
    }

    #[test]
    fn any_content_change_changes_checksum(
        files in files(),
        pick in any::<prop::sample::Index>(),
        extra in any::<u8>(),
    ) {
        let store = MemoryStore::new("p");
        let commit = build(&store, &files, false);
        let before = checksum(&store, &commit, &ComputeOptions::default());

        let mut changed = files.clone();
        let name = pick.get(&files.keys().cloned().collect::<Vec<_>>()).clone();
        if let Some(content) = changed.get_mut(&name) {
            content.push(extra);
        }
        let other = MemoryStore::new("p");
        let changed_commit = build(&other, &changed, false);
        prop_assert_ne!(before, checksum(&other, &changed_commit, &ComputeOptions::default()));
    }
}
