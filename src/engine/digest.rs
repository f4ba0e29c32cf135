//! engine::digest
//!
//! The digest accumulator.
//!
//! Each visited object contributes its loose-object header
//! (`"<type> <len>\0"`) followed by its raw payload to one SHA-512 context,
//! strictly in traversal order. Statistics are tracked alongside and never
//! influence the digest. The digest is only observable through
//! [`Accumulator::finish`], which consumes the accumulator.

use serde::Serialize;
use sha2::{Digest, Sha512};

use crate::core::checksum::Checksum;
use crate::core::object::ObjectKind;

use super::walk::Visited;

/// Count and cumulative payload size of one object class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClassStats {
    /// Number of objects
    pub count: u64,
    /// Sum of payload sizes in bytes (headers excluded)
    pub bytes: u64,
}

impl ClassStats {
    fn add(&mut self, bytes: usize) {
        self.count += 1;
        self.bytes += bytes as u64;
    }
}

/// Per-class statistics for one computation.
///
/// `submodules` counts submodule roots entered; its byte total covers every
/// object digested from a nested store. The other classes count objects of
/// that kind across all stores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub submodules: ClassStats,
    pub commits: ClassStats,
    pub trees: ClassStats,
    pub blobs: ClassStats,
}

impl Stats {
    /// The informational comment line printed after a checksum.
    ///
    /// # Example
    ///
    /// ```
    /// use git_evtag::engine::digest::Stats;
    ///
    /// let stats = Stats::default();
    /// assert_eq!(
    ///     stats.comment_line(),
    ///     "# git-evtag comment: submodules=0 (0) commits=0 (0) trees=0 (0) blobs=0 (0)"
    /// );
    /// ```
    pub fn comment_line(&self) -> String {
        format!(
            "# git-evtag comment: submodules={} ({}) commits={} ({}) trees={} ({}) blobs={} ({})",
            self.submodules.count,
            self.submodules.bytes,
            self.commits.count,
            self.commits.bytes,
            self.trees.count,
            self.trees.bytes,
            self.blobs.count,
            self.blobs.bytes,
        )
    }

    /// Total number of objects digested.
    pub fn objects(&self) -> u64 {
        self.commits.count + self.trees.count + self.blobs.count
    }
}

/// Streaming SHA-512 over visited objects.
#[derive(Default)]
pub struct Accumulator {
    hasher: Sha512,
    stats: Stats,
}

impl Accumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one visited object.
    pub fn feed(&mut self, visited: &Visited) {
        let raw = &visited.raw;
        self.hasher.update(raw.header());
        self.hasher.update(&raw.data);

        let len = raw.data.len();
        match raw.kind {
            ObjectKind::Commit => self.stats.commits.add(len),
            ObjectKind::Tree => self.stats.trees.add(len),
            ObjectKind::Blob => self.stats.blobs.add(len),
            // Trees cannot name tag objects; nothing to count.
            ObjectKind::Tag => {}
        }

        if visited.submodule_root {
            self.stats.submodules.count += 1;
        }
        if visited.depth > 0 {
            self.stats.submodules.bytes += len as u64;
        }
    }

    /// Statistics gathered so far.
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Finish the digest.
    pub fn finish(self) -> (Checksum, Stats) {
        let digest = self.hasher.finalize();
        (Checksum::from_digest(&digest), self.stats)
    }
}
