//! Integration tests for checksums over real repositories.
//!
//! Repositories are built with the git CLI in temporary directories and
//! read back through the `git` module. An independent walk driven by
//! `git cat-file` and `git ls-tree` serves as the reference digest.

use std::path::{Path, PathBuf};
use std::process::Command;

use sha2::{Digest, Sha512};
use tempfile::TempDir;

use git_evtag::core::checksum::Checksum;
use git_evtag::core::error::EvtagError;
use git_evtag::core::store::{Repo, TagRef};
use git_evtag::core::types::TagName;
use git_evtag::engine::{compute, ComputeOptions, Orchestrator, SignRequest};
use git_evtag::git::{Git, GitError};
use git_evtag::trust::mock::MockTrust;
use git_evtag::ui::prompts::MessageSource;

/// Test fixture that creates a real git repository.
struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    /// Create a new test repository with an initial commit.
    fn new() -> Self {
        let repo = Self::empty();
        repo.write("README.md", "# Test Repo\n");
        repo.commit_all("Initial commit");
        repo
    }

    /// Create a repository with no commits.
    fn empty() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        run_git(dir.path(), &["init", "-q"]);
        run_git(dir.path(), &["config", "user.email", "test@example.com"]);
        run_git(dir.path(), &["config", "user.name", "Test User"]);
        Self { dir }
    }

    /// Get the path to the repository.
    fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Open a Git interface to this repository.
    fn git(&self) -> Git {
        Git::open(self.path()).expect("failed to open test repo")
    }

    /// Write a file in the working tree, creating parent directories.
    fn write(&self, path: &str, content: &str) {
        let full = self.path().join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(full, content).unwrap();
    }

    /// Stage everything and commit.
    fn commit_all(&self, message: &str) {
        run_git(self.path(), &["add", "-A"]);
        run_git(self.path(), &["commit", "-q", "-m", message]);
    }

    /// Get an object id using git directly.
    fn rev_parse(&self, rev: &str) -> String {
        git_stdout(self.path(), &["rev-parse", rev])
    }

    /// The checksum computed through the library.
    fn checksum(&self, rev: &str, options: &ComputeOptions) -> Result<Checksum, EvtagError> {
        compute(&self.git(), rev, options).map(|outcome| outcome.checksum)
    }
}

/// Run a git command in the given directory.
fn run_git(dir: &Path, args: &[&str]) -> Vec<u8> {
    let output = Command::new("git")
        .args(["-c", "protocol.file.allow=always"])
        .args(args)
        .current_dir(dir)
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .env("GIT_CONFIG_GLOBAL", "/dev/null")
        .env("GIT_AUTHOR_DATE", "1700000000 +0000")
        .env("GIT_COMMITTER_DATE", "1700000000 +0000")
        .output()
        .expect("git command failed");

    if !output.status.success() {
        panic!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }
    output.stdout
}

fn git_stdout(dir: &Path, args: &[&str]) -> String {
    String::from_utf8(run_git(dir, args))
        .unwrap()
        .trim()
        .to_string()
}

/// Reference digest: every object hashed at every occurrence, in
/// `ls-tree` order, descending into submodule checkouts.
fn reference_checksum(repo: &Path, rev: &str) -> String {
    let mut hasher = Sha512::new();
    let commit = git_stdout(repo, &["rev-parse", &format!("{rev}^{{commit}}")]);
    reference_commit(repo, &commit, &mut hasher);
    hex::encode(hasher.finalize())
}

fn reference_object(repo: &Path, oid: &str, hasher: &mut Sha512) -> (String, Vec<u8>) {
    let kind = git_stdout(repo, &["cat-file", "-t", oid]);
    let data = run_git(repo, &["cat-file", &kind, oid]);
    hasher.update(format!("{} {}\0", kind, data.len()).as_bytes());
    hasher.update(&data);
    (kind, data)
}

fn reference_commit(repo: &Path, oid: &str, hasher: &mut Sha512) {
    let (_, data) = reference_object(repo, oid, hasher);
    let text = String::from_utf8(data).unwrap();
    let tree = text
        .lines()
        .next()
        .and_then(|line| line.strip_prefix("tree "))
        .unwrap()
        .to_string();
    reference_tree(repo, PathBuf::new(), &tree, hasher);
}

fn reference_tree(repo: &Path, prefix: PathBuf, oid: &str, hasher: &mut Sha512) {
    reference_object(repo, oid, hasher);
    let listing = git_stdout(repo, &["ls-tree", oid]);
    for line in listing.lines() {
        let (meta, name) = line.split_once('\t').unwrap();
        let fields: Vec<&str> = meta.split_whitespace().collect();
        let (kind, id) = (fields[1], fields[2]);
        match kind {
            "blob" => {
                reference_object(repo, id, hasher);
            }
            "tree" => reference_tree(repo, prefix.join(name), id, hasher),
            "commit" => {
                let sub = repo.join(&prefix).join(name);
                reference_commit(&sub, id, hasher);
            }
            other => panic!("unexpected entry kind {other}"),
        }
    }
}

fn compat() -> ComputeOptions {
    ComputeOptions {
        compat: true,
        ..Default::default()
    }
}

fn pooled() -> ComputeOptions {
    ComputeOptions {
        jobs: 4,
        prefetch_window: 3,
        ..Default::default()
    }
}

/// A repository with nested directories and a duplicated file.
fn layered_repo() -> TestRepo {
    let repo = TestRepo::empty();
    repo.write("README.md", "# Layered\n");
    repo.write("src/lib.rs", "pub fn f() {}\n");
    repo.write("src/nested/deep/mod.rs", "// deep\n");
    repo.write("docs/guide.md", "guide\n");
    repo.write("docs/LICENSE", "same text\n");
    repo.write("LICENSE", "same text\n");
    repo.commit_all("layered");
    repo
}

/// Add `sub` as a submodule of `parent` at `path` and commit.
fn add_submodule(parent: &TestRepo, sub: &TestRepo, path: &str) {
    let url = sub.path().to_str().unwrap();
    run_git(parent.path(), &["submodule", "add", "-q", url, path]);
    parent.commit_all(&format!("add {path}"));
}

// =============================================================================
// Repository Opening Tests
// =============================================================================

mod opening {
    use super::*;

    #[test]
    fn open_from_subdirectory() {
        let repo = layered_repo();
        let git = Git::open(&repo.path().join("src/nested")).unwrap();
        assert_eq!(
            git.work_dir().unwrap().canonicalize().unwrap(),
            repo.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn open_non_repository_fails() {
        let dir = TempDir::new().unwrap();
        let err = Git::open(dir.path()).unwrap_err();
        assert!(matches!(err, GitError::NotARepo { .. }));
        assert_eq!(EvtagError::from(err).exit_code(), 11);
    }

    #[test]
    fn resolve_commit_peels_tags() {
        let repo = TestRepo::new();
        run_git(repo.path(), &["tag", "-a", "v1", "-m", "annotated"]);
        let head = repo.rev_parse("HEAD");
        assert_eq!(repo.git().resolve_commit("v1").unwrap().as_str(), head);
        assert_eq!(
            repo.git().resolve_commit(&head[..8]).unwrap().as_str(),
            head
        );
    }

    #[test]
    fn unknown_revision_is_invalid() {
        let repo = TestRepo::new();
        let err = repo.git().resolve_commit("no-such-branch").unwrap_err();
        assert!(matches!(err, EvtagError::InvalidRevision { .. }));
    }

    #[test]
    fn tree_revision_is_not_a_commit() {
        let repo = TestRepo::new();
        let err = repo.git().resolve_commit("HEAD^{tree}").unwrap_err();
        assert!(matches!(err, EvtagError::InvalidRevision { .. }));
    }

    #[test]
    fn tagger_comes_from_config() {
        let repo = TestRepo::new();
        let tagger = repo.git().tagger().unwrap();
        assert!(tagger.starts_with("Test User <test@example.com> "));
    }

    #[test]
    fn signing_key_from_git_config() {
        let repo = TestRepo::new();
        assert_eq!(repo.git().signing_key(), None);
        run_git(repo.path(), &["config", "user.signingkey", "ABCDEF12"]);
        assert_eq!(repo.git().signing_key().as_deref(), Some("ABCDEF12"));
    }
}

// =============================================================================
// Checksum Tests
// =============================================================================

mod checksums {
    use super::*;

    #[test]
    fn compat_matches_reference_walk() {
        let repo = layered_repo();
        let checksum = repo.checksum("HEAD", &compat()).unwrap();
        assert_eq!(checksum.as_str(), reference_checksum(repo.path(), "HEAD"));
    }

    #[test]
    fn dedup_matches_reference_without_repeats() {
        let repo = TestRepo::empty();
        repo.write("a.txt", "a\n");
        repo.write("dir/b.txt", "b\n");
        repo.commit_all("distinct");

        let checksum = repo.checksum("HEAD", &ComputeOptions::default()).unwrap();
        assert_eq!(checksum.as_str(), reference_checksum(repo.path(), "HEAD"));
    }

    #[test]
    fn repeated_content_counted_once() {
        let repo = layered_repo();
        let outcome = compute(&repo.git(), "HEAD", &ComputeOptions::default()).unwrap();
        let compat_outcome = compute(&repo.git(), "HEAD", &compat()).unwrap();

        // LICENSE and docs/LICENSE share a blob
        assert_eq!(outcome.stats.blobs.count, 5);
        assert_eq!(compat_outcome.stats.blobs.count, 6);
        assert_ne!(outcome.checksum, compat_outcome.checksum);
        assert_eq!(outcome.stats.commits.count, 1);
        assert_eq!(outcome.stats.trees.count, 5);
    }

    #[test]
    fn worker_count_does_not_change_checksum() {
        let repo = layered_repo();
        let inline = repo.checksum("HEAD", &ComputeOptions::default()).unwrap();
        let parallel = repo.checksum("HEAD", &pooled()).unwrap();
        assert_eq!(inline, parallel);
    }

    #[test]
    fn identical_content_in_separate_repositories() {
        let first = layered_repo();
        let second = layered_repo();
        assert_eq!(first.rev_parse("HEAD"), second.rev_parse("HEAD"));
        assert_eq!(
            first.checksum("HEAD", &ComputeOptions::default()).unwrap(),
            second.checksum("HEAD", &pooled()).unwrap()
        );
    }

    #[test]
    fn packing_does_not_change_checksum() {
        let repo = layered_repo();
        let loose = repo.checksum("HEAD", &ComputeOptions::default()).unwrap();
        run_git(repo.path(), &["gc", "-q", "--aggressive"]);
        let packed = repo.checksum("HEAD", &pooled()).unwrap();
        assert_eq!(loose, packed);
    }

    #[test]
    fn history_is_not_walked() {
        let repo = TestRepo::new();
        let before = repo.checksum("HEAD", &ComputeOptions::default()).unwrap();
        repo.write("extra.txt", "extra\n");
        repo.commit_all("second");
        run_git(repo.path(), &["rm", "-q", "extra.txt"]);
        repo.commit_all("third");

        // Same tree, different commit
        let after = compute(&repo.git(), "HEAD", &ComputeOptions::default()).unwrap();
        assert_ne!(after.checksum, before);
        assert_eq!(after.stats.commits.count, 1);
        assert_eq!(after.stats.blobs.count, 1);
    }

    #[test]
    fn content_change_changes_checksum() {
        let repo = layered_repo();
        let before = repo.checksum("HEAD", &ComputeOptions::default()).unwrap();
        repo.write("src/nested/deep/mod.rs", "// changed\n");
        repo.commit_all("change");
        assert_ne!(
            repo.checksum("HEAD", &ComputeOptions::default()).unwrap(),
            before
        );
    }

    #[test]
    fn missing_object_fails() {
        let repo = layered_repo();
        let blob = git_stdout(repo.path(), &["rev-parse", "HEAD:src/lib.rs"]);
        let loose = repo
            .path()
            .join(".git/objects")
            .join(&blob[..2])
            .join(&blob[2..]);
        std::fs::remove_file(loose).unwrap();

        let err = repo
            .checksum("HEAD", &ComputeOptions::default())
            .unwrap_err();
        assert!(matches!(err, EvtagError::ObjectNotFound { oid } if oid.as_str() == blob));
        assert!(matches!(
            repo.checksum("HEAD", &pooled()),
            Err(EvtagError::ObjectNotFound { .. })
        ));
    }
}

// =============================================================================
// Submodule Tests
// =============================================================================

mod submodules {
    use super::*;

    fn library() -> TestRepo {
        let lib = TestRepo::empty();
        lib.write("lib.c", "int lib(void) { return 1; }\n");
        lib.write("include/lib.h", "int lib(void);\n");
        lib.commit_all("library");
        lib
    }

    #[test]
    fn submodule_content_is_included() {
        let lib = library();
        let app = TestRepo::new();
        add_submodule(&app, &lib, "vendor/lib");

        let outcome = compute(&app.git(), "HEAD", &compat()).unwrap();
        assert_eq!(
            outcome.checksum.as_str(),
            reference_checksum(app.path(), "HEAD")
        );
        assert_eq!(outcome.stats.submodules.count, 1);
        assert_eq!(outcome.stats.commits.count, 2);
        assert!(outcome.stats.submodules.bytes > 0);

        let pooled_checksum = app.checksum("HEAD", &pooled()).unwrap();
        let inline = app.checksum("HEAD", &ComputeOptions::default()).unwrap();
        assert_eq!(pooled_checksum, inline);
    }

    #[test]
    fn nested_submodules() {
        let inner = library();
        let middle = TestRepo::new();
        add_submodule(&middle, &inner, "inner");
        let outer = TestRepo::new();
        run_git(
            outer.path(),
            &[
                "submodule",
                "add",
                "-q",
                middle.path().to_str().unwrap(),
                "middle",
            ],
        );
        run_git(
            outer.path(),
            &["submodule", "update", "-q", "--init", "--recursive"],
        );
        outer.commit_all("add middle");

        let outcome = compute(&outer.git(), "HEAD", &compat()).unwrap();
        assert_eq!(outcome.stats.submodules.count, 2);
        assert_eq!(
            outcome.checksum.as_str(),
            reference_checksum(outer.path(), "HEAD")
        );
    }

    #[test]
    fn submodule_change_changes_parent_checksum() {
        let lib = library();
        let app = TestRepo::new();
        add_submodule(&app, &lib, "lib");
        let before = app.checksum("HEAD", &ComputeOptions::default()).unwrap();

        let checkout = app.path().join("lib");
        run_git(&checkout, &["config", "user.email", "test@example.com"]);
        run_git(&checkout, &["config", "user.name", "Test User"]);
        std::fs::write(checkout.join("lib.c"), "int lib(void) { return 2; }\n").unwrap();
        run_git(&checkout, &["commit", "-q", "-am", "bump"]);
        app.commit_all("bump lib");

        let after = app.checksum("HEAD", &ComputeOptions::default()).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn uninitialized_submodule_fails() {
        let lib = library();
        let app = TestRepo::new();
        add_submodule(&app, &lib, "vendor/lib");

        let clone_dir = TempDir::new().unwrap();
        let clone = clone_dir.path().join("clone");
        run_git(
            clone_dir.path(),
            &["clone", "-q", app.path().to_str().unwrap(), "clone"],
        );

        let git = Git::open(&clone).unwrap();
        let err = compute(&git, "HEAD", &ComputeOptions::default()).unwrap_err();
        assert!(
            matches!(err, EvtagError::SubmoduleNotInitialized { ref path } if path == "vendor/lib"),
            "unexpected error: {err}"
        );
        assert_eq!(err.exit_code(), 4);
    }
}

// =============================================================================
// Sign/Verify Tests
// =============================================================================

mod tags {
    use super::*;

    fn sign(repo: &TestRepo, trust: &MockTrust, tag: &str, force: bool) -> Result<(), EvtagError> {
        let git = repo.git();
        let mut orchestrator = Orchestrator::new(&git, trust, ComputeOptions::default());
        orchestrator
            .sign(SignRequest {
                tag: TagName::new(tag).unwrap(),
                target: None,
                message: MessageSource::Literal(format!("Release {tag}\n")),
                force,
                key: Some("release@example.com".to_string()),
            })
            .map(|_| ())
    }

    #[test]
    fn sign_then_verify_round_trip() {
        let repo = layered_repo();
        let trust = MockTrust::default();
        sign(&repo, &trust, "v1.0", false).unwrap();

        // git itself accepts the tag object
        assert_eq!(git_stdout(repo.path(), &["cat-file", "-t", "v1.0"]), "tag");
        assert_eq!(repo.rev_parse("v1.0^{commit}"), repo.rev_parse("HEAD"));
        let body = git_stdout(repo.path(), &["cat-file", "tag", "v1.0"]);
        let expected = repo.checksum("HEAD", &ComputeOptions::default()).unwrap();
        assert!(body.contains(&expected.line()));
        assert!(body.contains("-----BEGIN PGP SIGNATURE-----"));

        let git = repo.git();
        let mut orchestrator = Orchestrator::new(&git, &trust, ComputeOptions::default());
        let report = orchestrator.verify(&TagName::new("v1.0").unwrap()).unwrap();
        assert!(report.signature_valid);
        assert!(report.checksum_matches());
        assert_eq!(report.recorded, expected);
    }

    #[test]
    fn existing_tag_requires_force() {
        let repo = TestRepo::new();
        let trust = MockTrust::default();
        sign(&repo, &trust, "v1", false).unwrap();
        let first = repo.rev_parse("v1");

        let err = sign(&repo, &trust, "v1", false).unwrap_err();
        assert!(matches!(err, EvtagError::TagExists { .. }));
        assert_eq!(repo.rev_parse("v1"), first);

        repo.write("new.txt", "new\n");
        repo.commit_all("second");
        sign(&repo, &trust, "v1", true).unwrap();
        // Forced re-sign keeps the tag's original target
        assert_eq!(repo.rev_parse("v1^{commit}"), repo.rev_parse("HEAD~1"));
        assert_ne!(repo.rev_parse("v1"), first);
    }

    #[test]
    fn existing_git_tag_is_found() {
        let repo = TestRepo::new();
        run_git(repo.path(), &["tag", "light"]);
        run_git(repo.path(), &["tag", "-a", "heavy", "-m", "heavy tag"]);

        let git = repo.git();
        assert!(matches!(
            git.find_tag(&TagName::new("light").unwrap()).unwrap(),
            Some(TagRef::Lightweight { .. })
        ));
        match git.find_tag(&TagName::new("heavy").unwrap()).unwrap() {
            Some(TagRef::Annotated { tag, .. }) => {
                assert_eq!(tag.name, "heavy");
                assert_eq!(tag.message.trim(), "heavy tag");
                assert!(tag.signature.is_none());
            }
            other => panic!("expected annotated tag, got {other:?}"),
        }
        assert_eq!(git.find_tag(&TagName::new("absent").unwrap()).unwrap(), None);
    }

    #[test]
    fn lightweight_tag_has_no_checksum() {
        let repo = TestRepo::new();
        run_git(repo.path(), &["tag", "light"]);
        let git = repo.git();
        let trust = MockTrust::default();
        let mut orchestrator = Orchestrator::new(&git, &trust, ComputeOptions::default());
        assert!(matches!(
            orchestrator.verify(&TagName::new("light").unwrap()),
            Err(EvtagError::NoChecksumFound { .. })
        ));
    }

    #[test]
    fn new_commit_behind_tag_name_is_a_mismatch() {
        let repo = TestRepo::new();
        let trust = MockTrust::default();
        sign(&repo, &trust, "v1", false).unwrap();

        // Rewrite the tag by hand with the old message over a new commit
        repo.write("other.txt", "other\n");
        repo.commit_all("other");
        let old = git_stdout(repo.path(), &["cat-file", "tag", "v1"]);
        let recorded = Checksum::from_message(&old).unwrap();
        run_git(
            repo.path(),
            &["tag", "-f", "-a", "v1", "-m", &recorded.line()],
        );

        let git = repo.git();
        let mut orchestrator = Orchestrator::new(&git, &trust, ComputeOptions::default());
        let report = orchestrator.inspect(&TagName::new("v1").unwrap()).unwrap();
        assert!(!report.checksum_matches());
        assert!(!report.signature_valid);
        assert!(matches!(
            report.into_result(),
            Err(EvtagError::VerificationFailed { .. })
        ));
    }
}
