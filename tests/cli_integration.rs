//! Integration tests for the git-evtag binary.
//!
//! These tests exercise the full CLI against real Git repos and check
//! output shape and exit statuses.

use std::path::Path;
use std::process::Command as StdCommand;

use assert_cmd::Command;
use assert_fs::TempDir;
use predicates::prelude::*;

/// Get a command for running git-evtag against `repo`, isolated from the
/// user's configuration.
fn evtag(home: &Path, repo: &Path) -> Command {
    let mut cmd = Command::cargo_bin("git-evtag").unwrap();
    cmd.arg("--repo")
        .arg(repo)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("xdg"))
        .env("GIT_EVTAG_CONFIG", home.join("absent.toml"))
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .env("GIT_CONFIG_GLOBAL", "/dev/null")
        .env_remove("RUST_LOG");
    cmd
}

/// Run a git command in the given directory.
fn run_git(dir: &Path, args: &[&str]) -> String {
    let output = StdCommand::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .env("GIT_CONFIG_GLOBAL", "/dev/null")
        .output()
        .expect("git command failed");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

/// A temporary home plus a repository with two commits.
struct Fixture {
    home: TempDir,
    repo: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let home = TempDir::new().unwrap();
        let repo = TempDir::new().unwrap();
        let path = repo.path();
        run_git(path, &["init", "-q"]);
        run_git(path, &["config", "user.email", "test@example.com"]);
        run_git(path, &["config", "user.name", "Test User"]);
        std::fs::write(path.join("README.md"), "# Test Repo\n").unwrap();
        run_git(path, &["add", "README.md"]);
        run_git(path, &["commit", "-q", "-m", "Initial commit"]);
        std::fs::create_dir(path.join("src")).unwrap();
        std::fs::write(path.join("src/main.c"), "int main(void) { return 0; }\n").unwrap();
        run_git(path, &["add", "src"]);
        run_git(path, &["commit", "-q", "-m", "Add source"]);
        Self { home, repo }
    }

    fn cmd(&self) -> Command {
        evtag(self.home.path(), self.repo.path())
    }

    fn git(&self, args: &[&str]) -> String {
        run_git(self.repo.path(), args)
    }

    fn checksum_line(&self, rev: &str) -> String {
        let output = self.cmd().args(["--rev", rev]).output().unwrap();
        assert!(output.status.success());
        String::from_utf8(output.stdout).unwrap().trim().to_string()
    }
}

fn checksum_line() -> impl Predicate<str> {
    predicate::str::is_match(r"^Git-EVTag-v0-SHA512: [0-9a-f]{128}\n$").unwrap()
}

mod basics {
    use super::*;

    #[test]
    fn help_flag_works() {
        Command::cargo_bin("git-evtag")
            .unwrap()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("EVTag"));
    }

    #[test]
    fn version_flag_works() {
        Command::cargo_bin("git-evtag")
            .unwrap()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("git-evtag"));
    }

    #[test]
    fn usage_errors_are_generic_failures() {
        let f = Fixture::new();
        f.cmd()
            .args(["--sign", "a", "--verify", "b"])
            .assert()
            .code(1);
        f.cmd()
            .args(["--verify", "a", "--rev", "HEAD"])
            .assert()
            .code(1);
    }
}

mod compute {
    use super::*;

    #[test]
    fn prints_checksum_line_for_head() {
        let f = Fixture::new();
        f.cmd().assert().success().stdout(checksum_line());
    }

    #[test]
    fn revisions_differ() {
        let f = Fixture::new();
        let head = f.checksum_line("HEAD");
        let parent = f.checksum_line("HEAD~1");
        assert_ne!(head, parent);
        assert_eq!(head, f.checksum_line("HEAD"));
    }

    #[test]
    fn jobs_do_not_change_output() {
        let f = Fixture::new();
        let inline = f.cmd().args(["--jobs", "1"]).output().unwrap().stdout;
        let pooled = f.cmd().args(["--jobs", "8"]).output().unwrap().stdout;
        assert_eq!(inline, pooled);
    }

    #[test]
    fn stats_comment_precedes_checksum() {
        let f = Fixture::new();
        f.cmd()
            .arg("--stats")
            .assert()
            .success()
            .stdout(predicate::str::starts_with(
                "# git-evtag comment: submodules=0 (0) commits=1 (",
            ))
            .stdout(predicate::str::contains("trees=2 (").and(predicate::str::contains("blobs=2 (")));
    }

    #[test]
    fn print_stats_from_config() {
        let f = Fixture::new();
        std::fs::create_dir_all(f.home.path().join("xdg/git-evtag")).unwrap();
        std::fs::write(
            f.home.path().join("xdg/git-evtag/config.toml"),
            "print_stats = true\n",
        )
        .unwrap();
        f.cmd()
            .assert()
            .success()
            .stdout(predicate::str::contains("# git-evtag comment:"));
    }

    #[test]
    fn debug_names_loaded_config_files() {
        let f = Fixture::new();
        std::fs::create_dir_all(f.repo.path().join(".git/evtag")).unwrap();
        std::fs::write(
            f.repo.path().join(".git/evtag/config.toml"),
            "[signing]\nkey = \"release@example.com\"\n",
        )
        .unwrap();
        f.cmd()
            .arg("--debug")
            .assert()
            .success()
            .stderr(predicate::str::contains("loaded configuration"))
            .stderr(predicate::str::contains("evtag/config.toml"));
    }

    #[test]
    fn invalid_config_is_reported() {
        let f = Fixture::new();
        std::fs::create_dir_all(f.repo.path().join(".git/evtag")).unwrap();
        std::fs::write(f.repo.path().join(".git/evtag/config.toml"), "bogus = 1\n").unwrap();
        f.cmd()
            .assert()
            .code(1)
            .stderr(predicate::str::contains("config.toml"));
    }

    #[test]
    fn json_output() {
        let f = Fixture::new();
        let output = f.cmd().arg("--json").output().unwrap();
        assert!(output.status.success());
        let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(value["commit"], f.git(&["rev-parse", "HEAD"]));
        assert_eq!(value["checksum"].as_str().unwrap().len(), 128);
        assert_eq!(value["stats"]["blobs"]["count"], 2);
    }

    #[test]
    fn not_a_repository() {
        let home = TempDir::new().unwrap();
        let empty = TempDir::new().unwrap();
        evtag(home.path(), empty.path())
            .assert()
            .code(11)
            .stderr(predicate::str::contains("not a git repository"));
    }

    #[test]
    fn invalid_revision() {
        let f = Fixture::new();
        f.cmd()
            .args(["--rev", "does-not-exist"])
            .assert()
            .code(12)
            .stderr(predicate::str::contains("does-not-exist"));
    }

    #[test]
    fn missing_object() {
        let f = Fixture::new();
        let blob = f.git(&["rev-parse", "HEAD:src/main.c"]);
        std::fs::remove_file(
            f.repo
                .path()
                .join(".git/objects")
                .join(&blob[..2])
                .join(&blob[2..]),
        )
        .unwrap();
        f.cmd()
            .assert()
            .code(2)
            .stdout(predicate::str::is_empty())
            .stderr(predicate::str::contains(blob));
    }
}

mod verify {
    use super::*;

    #[test]
    fn lightweight_tag_has_no_checksum() {
        let f = Fixture::new();
        f.git(&["tag", "light"]);
        f.cmd().args(["--verify", "light"]).assert().code(5);
    }

    #[test]
    fn unknown_tag() {
        let f = Fixture::new();
        f.cmd().args(["--verify", "nope"]).assert().code(12);
    }

    #[test]
    fn unsigned_tag_with_matching_checksum() {
        let f = Fixture::new();
        let line = f.checksum_line("HEAD");
        f.git(&["tag", "-a", "v1", "-m", &format!("Release\n\n{line}")]);
        f.cmd()
            .args(["--verify", "v1"])
            .assert()
            .code(7)
            .stdout(predicate::str::contains("signature: BAD"))
            .stdout(predicate::str::contains("checksum: match"));
    }

    #[test]
    fn unsigned_tag_with_wrong_checksum() {
        let f = Fixture::new();
        let line = f.checksum_line("HEAD~1");
        f.git(&["tag", "-a", "v1", "-m", &line]);
        f.cmd()
            .args(["--verify", "v1"])
            .assert()
            .code(8)
            .stdout(predicate::str::contains("MISMATCH"))
            .stdout(predicate::str::contains("recorded:"));
    }

    #[test]
    fn json_report_lists_both_axes() {
        let f = Fixture::new();
        let line = f.checksum_line("HEAD");
        f.git(&["tag", "-a", "v1", "-m", &line]);
        let output = f.cmd().args(["--verify", "v1", "--json"]).output().unwrap();
        assert_eq!(output.status.code(), Some(7));
        let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(value["signature_valid"], false);
        assert_eq!(value["recorded"], value["computed"]);
    }
}

mod sign {
    use super::*;

    #[test]
    fn existing_tag_without_force() {
        let f = Fixture::new();
        f.git(&["tag", "v1"]);
        f.cmd()
            .args(["--sign", "v1", "-m", "Release"])
            .assert()
            .code(10)
            .stderr(predicate::str::contains("--force"));
    }

    #[test]
    fn empty_editor_message_aborts() {
        let f = Fixture::new();
        f.cmd()
            .args(["--sign", "v1"])
            .env("GIT_EDITOR", "true")
            .assert()
            .code(1)
            .stderr(predicate::str::contains("empty message"));
        assert_eq!(f.git(&["tag", "-l"]), "");
    }

    #[test]
    fn unavailable_signing_program() {
        let f = Fixture::new();
        std::fs::create_dir_all(f.repo.path().join(".git/evtag")).unwrap();
        std::fs::write(
            f.repo.path().join(".git/evtag/config.toml"),
            "[signing]\nprogram = \"/nonexistent/gpg\"\n",
        )
        .unwrap();
        f.cmd()
            .args(["--sign", "v1", "-m", "Release"])
            .assert()
            .code(9)
            .stderr(predicate::str::contains("/nonexistent/gpg"));
        assert_eq!(f.git(&["tag", "-l"]), "");
    }
}
