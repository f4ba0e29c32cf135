//! git::interface
//!
//! The repository handle used by the orchestrator and CLI.
//!
//! # Error Handling
//!
//! libgit2 failures are categorized into [`GitError`] variants and folded
//! into [`EvtagError`] at the boundary:
//! - [`GitError::NotARepo`] becomes `RepositoryNotFound`
//! - [`GitError::InvalidRevision`] becomes `InvalidRevision`
//! - [`GitError::ObjectNotFound`] becomes `ObjectNotFound`
//!
//! # Example
//!
//! ```no_run
//! use git_evtag::core::store::Repo;
//! use git_evtag::git::Git;
//! use std::path::Path;
//!
//! let git = Git::open(Path::new(".")).unwrap();
//! let head = git.resolve_commit("HEAD").unwrap();
//! println!("HEAD is {}", head.short(7));
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use super::store::{from_git2_oid, GitStore};
use crate::core::error::EvtagError;
use crate::core::object::TagObject;
use crate::core::store::{ObjectSource, Repo, TagRef};
use crate::core::types::{Oid, TagName, TypeError};

/// Errors from Git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Not inside a Git repository.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was searched
        path: PathBuf,
    },

    /// A revision does not resolve to a commit.
    #[error("invalid revision '{revision}': {message}")]
    InvalidRevision {
        /// The revision as given
        revision: String,
        /// libgit2's explanation
        message: String,
    },

    /// Object not found in repository.
    #[error("object not found: {oid}")]
    ObjectNotFound {
        /// The OID that was not found
        oid: String,
    },

    /// Invalid object id format.
    #[error("invalid object id: {oid}")]
    InvalidOid {
        /// The invalid OID string
        oid: String,
    },

    /// No tagger identity is configured.
    #[error("unable to determine tagger identity (set user.name and user.email): {message}")]
    NoIdentity {
        /// libgit2's explanation
        message: String,
    },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl GitError {
    /// Create a GitError from a git2::Error with richer context.
    pub(crate) fn from_git2(err: git2::Error, context: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound => GitError::ObjectNotFound {
                oid: context.to_string(),
            },
            git2::ErrorCode::InvalidSpec => GitError::InvalidOid {
                oid: context.to_string(),
            },
            _ => GitError::Internal {
                message: format!("{}: {}", context, err.message()),
            },
        }
    }
}

impl From<TypeError> for GitError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidOid(msg) => GitError::InvalidOid { oid: msg },
            TypeError::InvalidTagName(msg) => GitError::Internal { message: msg },
        }
    }
}

impl From<GitError> for EvtagError {
    fn from(err: GitError) -> Self {
        match err {
            GitError::NotARepo { path } => EvtagError::RepositoryNotFound { path },
            GitError::InvalidRevision { revision, message } => EvtagError::InvalidRevision {
                revision,
                reason: message,
            },
            GitError::ObjectNotFound { oid } => match Oid::new(&oid) {
                Ok(oid) => EvtagError::ObjectNotFound { oid },
                Err(_) => EvtagError::Store {
                    message: format!("object not found: {oid}"),
                },
            },
            other => EvtagError::Store {
                message: other.to_string(),
            },
        }
    }
}

/// The Git interface.
///
/// Wraps one opened repository and the [`GitStore`] over its object
/// database. No other module imports `git2`.
pub struct Git {
    /// The underlying git2 repository
    repo: git2::Repository,
    store: Arc<GitStore>,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl Git {
    /// Open the repository containing `path`.
    ///
    /// Uses `git2::Repository::discover`, so `path` can be any directory
    /// within the repository. Bare repositories are accepted.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if no repository is found
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::discover(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;
        let store = Arc::new(GitStore::from_repository(&repo));
        debug!(git_dir = %repo.path().display(), "opened repository");
        Ok(Self { repo, store })
    }

    /// Path to the git directory.
    pub fn git_dir(&self) -> &Path {
        self.repo.path()
    }

    /// Path to the working tree, if the repository has one.
    pub fn work_dir(&self) -> Option<&Path> {
        self.repo.workdir()
    }

    /// The repository's `core.editor`, if set.
    pub fn core_editor(&self) -> Option<String> {
        self.config_string("core.editor")
    }

    fn config_string(&self, key: &str) -> Option<String> {
        self.repo
            .config()
            .ok()
            .and_then(|config| config.get_string(key).ok())
            .filter(|value| !value.trim().is_empty())
    }

    fn reference_target(&self, refname: &str) -> Result<Option<git2::Oid>, GitError> {
        let reference = match self.repo.find_reference(refname) {
            Ok(reference) => reference,
            Err(e) if e.code() == git2::ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(GitError::from_git2(e, refname)),
        };
        let resolved = reference
            .resolve()
            .map_err(|e| GitError::from_git2(e, refname))?;
        Ok(resolved.target())
    }

    fn find_tag_inner(&self, name: &TagName) -> Result<Option<TagRef>, EvtagError> {
        let Some(target) = self.reference_target(&name.ref_name())? else {
            return Ok(None);
        };
        let oid = from_git2_oid(target)?;

        let odb = self
            .repo
            .odb()
            .map_err(|e| GitError::from_git2(e, "odb"))?;
        let object = odb
            .read(target)
            .map_err(|e| GitError::from_git2(e, oid.as_str()))?;

        if object.kind() == git2::ObjectType::Tag {
            let tag = TagObject::parse(&oid, object.data())?;
            Ok(Some(TagRef::Annotated { oid, tag }))
        } else {
            Ok(Some(TagRef::Lightweight { target: oid }))
        }
    }
}

impl Repo for Git {
    fn objects(&self) -> Arc<dyn ObjectSource> {
        Arc::clone(&self.store) as Arc<dyn ObjectSource>
    }

    fn resolve_commit(&self, revision: &str) -> Result<Oid, EvtagError> {
        let invalid = |e: git2::Error| GitError::InvalidRevision {
            revision: revision.to_string(),
            message: e.message().to_string(),
        };
        let commit = self
            .repo
            .revparse_single(revision)
            .map_err(invalid)?
            .peel_to_commit()
            .map_err(invalid)?;
        Ok(from_git2_oid(commit.id())?)
    }

    fn find_tag(&self, name: &TagName) -> Result<Option<TagRef>, EvtagError> {
        self.find_tag_inner(name)
    }

    fn write_tag(&self, name: &TagName, object: &[u8], force: bool) -> Result<Oid, EvtagError> {
        let refname = name.ref_name();
        if !force && self.reference_target(&refname)?.is_some() {
            return Err(EvtagError::TagExists { tag: name.clone() });
        }

        let odb = self
            .repo
            .odb()
            .map_err(|e| GitError::from_git2(e, "odb"))?;
        let tag_oid = odb
            .write(git2::ObjectType::Tag, object)
            .map_err(|e| GitError::from_git2(e, "write tag"))?;

        let log_message = format!("git-evtag: sign {name}");
        match self.repo.reference(&refname, tag_oid, force, &log_message) {
            Ok(_) => {}
            Err(e) if e.code() == git2::ErrorCode::Exists => {
                return Err(EvtagError::TagExists { tag: name.clone() })
            }
            Err(e) => return Err(GitError::from_git2(e, &refname).into()),
        }

        debug!(tag = %name, oid = %tag_oid, "wrote tag");
        Ok(from_git2_oid(tag_oid)?)
    }

    fn tagger(&self) -> Result<String, EvtagError> {
        let signature = self.repo.signature().map_err(|e| GitError::NoIdentity {
            message: e.message().to_string(),
        })?;
        let when = signature.when();
        Ok(format_identity(
            &String::from_utf8_lossy(signature.name_bytes()),
            &String::from_utf8_lossy(signature.email_bytes()),
            when.seconds(),
            when.offset_minutes(),
        ))
    }

    fn signing_key(&self) -> Option<String> {
        self.config_string("user.signingkey")
    }
}

/// Render an identity line as git writes it in object headers.
fn format_identity(name: &str, email: &str, seconds: i64, offset_minutes: i32) -> String {
    let sign = if offset_minutes < 0 { '-' } else { '+' };
    let offset = offset_minutes.abs();
    format!(
        "{} <{}> {} {}{:02}{:02}",
        name,
        email,
        seconds,
        sign,
        offset / 60,
        offset % 60
    )
}
