//! git::store
//!
//! Object store access over libgit2's object database.
//!
//! libgit2 handles are not `Sync`, so [`GitStore`] keeps only paths and each
//! [`GitReader`] opens its own object database on the thread that reads
//! through it. Worker threads never share a libgit2 handle.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, trace};

use super::interface::GitError;
use crate::core::error::EvtagError;
use crate::core::object::{ObjectKind, RawObject};
use crate::core::store::{ObjectReader, ObjectSource};
use crate::core::types::{Oid, StoreId};

/// Convert a libgit2 id into ours.
pub(crate) fn from_git2_oid(oid: git2::Oid) -> Result<Oid, GitError> {
    Ok(Oid::from_bytes(oid.as_bytes())?)
}

/// Convert our id into a libgit2 id.
pub(crate) fn to_git2_oid(oid: &Oid) -> Result<git2::Oid, GitError> {
    git2::Oid::from_str(oid.as_str()).map_err(|e| GitError::from_git2(e, oid.as_str()))
}

fn object_kind(kind: git2::ObjectType) -> Option<ObjectKind> {
    match kind {
        git2::ObjectType::Commit => Some(ObjectKind::Commit),
        git2::ObjectType::Tree => Some(ObjectKind::Tree),
        git2::ObjectType::Blob => Some(ObjectKind::Blob),
        git2::ObjectType::Tag => Some(ObjectKind::Tag),
        _ => None,
    }
}

/// One on-disk object store: a repository or a checked-out submodule.
#[derive(Debug)]
pub struct GitStore {
    id: StoreId,
    git_dir: PathBuf,
    work_dir: Option<PathBuf>,
}

impl GitStore {
    pub(crate) fn from_repository(repo: &git2::Repository) -> Self {
        Self {
            id: StoreId::from_git_dir(repo.path()),
            git_dir: repo.path().to_path_buf(),
            work_dir: repo.workdir().map(Path::to_path_buf),
        }
    }

    fn open(&self) -> Result<git2::Repository, GitError> {
        git2::Repository::open(&self.git_dir).map_err(|_| GitError::NotARepo {
            path: self.git_dir.clone(),
        })
    }

    /// Find the nested repository behind the gitlink at `path`.
    ///
    /// The submodule configuration is consulted first; a bare checkout at
    /// `<workdir>/<path>` is accepted when `.gitmodules` does not list it.
    fn open_submodule(&self, path: &str) -> Option<git2::Repository> {
        let parent = self.open().ok()?;
        if let Ok(repo) = parent
            .find_submodule(path)
            .and_then(|submodule| submodule.open())
        {
            return Some(repo);
        }

        let checkout = self.work_dir.as_ref()?.join(path);
        git2::Repository::open(checkout).ok()
    }
}

impl ObjectSource for GitStore {
    fn store_id(&self) -> &StoreId {
        &self.id
    }

    fn reader(&self) -> Result<Box<dyn ObjectReader>, EvtagError> {
        Ok(Box::new(GitReader::open(self)?))
    }

    fn submodule(&self, path: &str) -> Result<Arc<dyn ObjectSource>, EvtagError> {
        let repo = self
            .open_submodule(path)
            .ok_or_else(|| EvtagError::SubmoduleNotInitialized {
                path: path.to_string(),
            })?;
        let store = GitStore::from_repository(&repo);
        debug!(path, git_dir = %store.git_dir.display(), "opened submodule store");
        Ok(Arc::new(store))
    }
}

/// A reader owning one libgit2 object database.
///
/// The database is opened once over the store's `objects` directory (loose
/// objects, packs and alternates) and reused for every read.
pub struct GitReader {
    odb: git2::Odb<'static>,
}

impl GitReader {
    fn open(store: &GitStore) -> Result<Self, GitError> {
        let repo = store.open()?;
        let objects = repo.commondir().join("objects");
        let path = objects.to_str().ok_or_else(|| GitError::Internal {
            message: format!("object directory is not UTF-8: {}", objects.display()),
        })?;

        let odb = git2::Odb::new().map_err(|e| GitError::from_git2(e, "odb"))?;
        odb.add_disk_alternate(path)
            .map_err(|e| GitError::from_git2(e, path))?;
        Ok(Self { odb })
    }
}

impl ObjectReader for GitReader {
    fn read(&mut self, oid: &Oid) -> Result<RawObject, EvtagError> {
        let id = to_git2_oid(oid)?;
        let object = match self.odb.read(id) {
            Ok(object) => object,
            Err(e) if e.code() == git2::ErrorCode::NotFound => {
                return Err(EvtagError::ObjectNotFound { oid: oid.clone() })
            }
            Err(e) => return Err(GitError::from_git2(e, oid.as_str()).into()),
        };

        let kind = object_kind(object.kind())
            .ok_or_else(|| EvtagError::malformed(oid, "unknown object type"))?;
        trace!(%oid, %kind, len = object.len(), "read object");
        Ok(RawObject::new(kind, object.data()))
    }
}
