//! engine::submodule
//!
//! Locates the object store behind a gitlink.
//!
//! Stores are cached per `(parent store, path)` so a submodule commit that
//! is reached again (compat walks, or the same gitlink under two parents
//! sharing a store) does not reopen the repository.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::core::error::EvtagError;
use crate::core::store::ObjectSource;
use crate::core::types::StoreId;

/// Resolves gitlink entries to nested object stores.
#[derive(Default)]
pub struct SubmoduleResolver {
    cache: HashMap<(StoreId, String), Arc<dyn ObjectSource>>,
}

impl SubmoduleResolver {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Locate the store for the gitlink at `path` inside `parent`.
    ///
    /// `path` is relative to the parent's working tree; `display_path` is
    /// the same location relative to the top-level working tree and is what
    /// errors report.
    ///
    /// # Errors
    ///
    /// - [`EvtagError::SubmoduleNotInitialized`] naming `display_path`
    pub fn resolve(
        &mut self,
        parent: &Arc<dyn ObjectSource>,
        path: &str,
        display_path: &str,
    ) -> Result<Arc<dyn ObjectSource>, EvtagError> {
        let key = (parent.store_id().clone(), path.to_string());
        if let Some(store) = self.cache.get(&key) {
            return Ok(Arc::clone(store));
        }

        let store = parent.submodule(path).map_err(|err| match err {
            EvtagError::SubmoduleNotInitialized { .. } => EvtagError::SubmoduleNotInitialized {
                path: display_path.to_string(),
            },
            other => other,
        })?;

        debug!(path = display_path, store = %store.store_id(), "entered submodule");
        self.cache.insert(key, Arc::clone(&store));
        Ok(store)
    }

    /// Number of distinct gitlink locations resolved so far.
    pub fn resolved(&self) -> usize {
        self.cache.len()
    }
}
