//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! git-evtag has two configuration scopes:
//! - **Global**: User-level settings (worker pool, output, signing)
//! - **Repo**: Repository-level signing overrides
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Repo config file
//! 4. CLI flags (not handled here)
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$GIT_EVTAG_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/git-evtag/config.toml`
//! 3. `~/.git-evtag/config.toml`
//!
//! # Repo Config Location
//!
//! `.git/evtag/config.toml` inside the repository's git directory.
//!
//! # Example
//!
//! ```no_run
//! use git_evtag::core::config::Config;
//! use std::path::Path;
//!
//! let config = Config::load(Some(Path::new("/path/to/repo/.git"))).unwrap();
//!
//! println!("Workers: {}", config.jobs());
//! println!("Signing program: {}", config.signing_program());
//! ```

pub mod schema;

pub use schema::{GlobalConfig, RepoConfig, SigningConfig};

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

/// Default cap on worker threads when `jobs` is not configured.
const DEFAULT_MAX_JOBS: usize = 8;

/// Default number of objects that may be read ahead of the digest.
const DEFAULT_PREFETCH_WINDOW: usize = 256;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Merged configuration from all sources.
///
/// This struct provides accessor methods that apply precedence rules
/// automatically. Repo config overrides global config.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: GlobalConfig,
    /// Repository configuration (if in a repo)
    pub repo: Option<RepoConfig>,
    /// Path to the global config file (if loaded)
    global_path: Option<PathBuf>,
    /// Path to the repo config file (if loaded)
    repo_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// If `git_dir` is provided, also loads repo-specific config from
    /// `<git_dir>/evtag/config.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if config files exist but cannot be parsed or hold
    /// invalid values. Missing config files are not an error.
    pub fn load(git_dir: Option<&Path>) -> Result<Config, ConfigError> {
        let (global, global_path) = Self::load_global()?;

        let (repo, repo_path) = match git_dir {
            Some(dir) => {
                let path = Self::repo_config_path(dir);
                if path.exists() {
                    (Some(Self::read_config::<RepoConfig>(&path)?), Some(path))
                } else {
                    (None, None)
                }
            }
            None => (None, None),
        };

        global.validate()?;
        if let Some(ref r) = repo {
            r.validate()?;
        }

        Ok(Config {
            global,
            repo,
            global_path,
            repo_path,
        })
    }

    /// Load global configuration from standard locations.
    fn load_global() -> Result<(GlobalConfig, Option<PathBuf>), ConfigError> {
        // 1. Check $GIT_EVTAG_CONFIG
        if let Ok(path) = std::env::var("GIT_EVTAG_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                let config = Self::read_config(&path)?;
                return Ok((config, Some(path)));
            }
        }

        // 2. Check $XDG_CONFIG_HOME/git-evtag/config.toml
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("git-evtag/config.toml");
            if path.exists() {
                let config = Self::read_config(&path)?;
                return Ok((config, Some(path)));
            }
        }

        // 3. Check ~/.git-evtag/config.toml
        if let Some(home) = dirs::home_dir() {
            let path = home.join(".git-evtag/config.toml");
            if path.exists() {
                let config = Self::read_config(&path)?;
                return Ok((config, Some(path)));
            }
        }

        Ok((GlobalConfig::default(), None))
    }

    /// Read and parse a config file.
    fn read_config<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Get the path for repo config inside a git directory.
    pub fn repo_config_path(git_dir: &Path) -> PathBuf {
        git_dir.join("evtag/config.toml")
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    /// Number of object read workers per store.
    ///
    /// Defaults to the available parallelism, capped at 8.
    pub fn jobs(&self) -> usize {
        self.global.jobs.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
                .min(DEFAULT_MAX_JOBS)
        })
    }

    /// Maximum number of objects read ahead of the digest.
    ///
    /// Defaults to 256.
    pub fn prefetch_window(&self) -> usize {
        self.global
            .prefetch_window
            .unwrap_or(DEFAULT_PREFETCH_WINDOW)
    }

    /// Whether repeated objects are hashed at every occurrence.
    ///
    /// Defaults to `false`.
    pub fn compat(&self) -> bool {
        self.global.compat.unwrap_or(false)
    }

    /// Whether to print the statistics comment line.
    ///
    /// Defaults to `false`.
    pub fn print_stats(&self) -> bool {
        self.global.print_stats.unwrap_or(false)
    }

    /// The OpenPGP program used for signing and verification.
    ///
    /// Repo config overrides global; defaults to "gpg".
    pub fn signing_program(&self) -> &str {
        self.signing_value(|s| s.program.as_deref())
            .unwrap_or("gpg")
    }

    /// The configured signing key, if any.
    ///
    /// Repo config overrides global.
    pub fn signing_key(&self) -> Option<&str> {
        self.signing_value(|s| s.key.as_deref())
    }

    fn signing_value<'a>(
        &'a self,
        field: impl Fn(&'a SigningConfig) -> Option<&'a str>,
    ) -> Option<&'a str> {
        let repo = self
            .repo
            .as_ref()
            .and_then(|r| r.signing.as_ref())
            .and_then(&field);
        repo.or_else(|| self.global.signing.as_ref().and_then(&field))
    }

    /// Get the path to the loaded global config file.
    pub fn global_config_loaded_from(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    /// Get the path to the loaded repo config file.
    pub fn repo_config_loaded_from(&self) -> Option<&Path> {
        self.repo_path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_without_files() {
        let config = Config::default();
        assert!(config.jobs() >= 1);
        assert!(config.jobs() <= DEFAULT_MAX_JOBS);
        assert_eq!(config.prefetch_window(), DEFAULT_PREFETCH_WINDOW);
        assert!(!config.compat());
        assert!(!config.print_stats());
        assert_eq!(config.signing_program(), "gpg");
        assert_eq!(config.signing_key(), None);
    }

    #[test]
    fn load_repo_config() {
        let temp = TempDir::new().unwrap();
        let evtag_dir = temp.path().join("evtag");
        fs::create_dir_all(&evtag_dir).unwrap();
        fs::write(
            evtag_dir.join("config.toml"),
            r#"
            [signing]
            key = "release@example.com"
            "#,
        )
        .unwrap();

        let config = Config::load(Some(temp.path())).unwrap();

        assert_eq!(config.signing_key(), Some("release@example.com"));
        assert_eq!(
            config.repo_config_loaded_from(),
            Some(evtag_dir.join("config.toml").as_path())
        );
    }

    #[test]
    fn unknown_fields_rejected() {
        let temp = TempDir::new().unwrap();
        let evtag_dir = temp.path().join("evtag");
        fs::create_dir_all(&evtag_dir).unwrap();
        fs::write(evtag_dir.join("config.toml"), "jobs = 4\n").unwrap();

        // `jobs` is a global-only setting
        assert!(Config::load(Some(temp.path())).is_err());
    }

    #[test]
    fn precedence_repo_overrides_global() {
        let config = Config {
            global: GlobalConfig {
                signing: Some(SigningConfig {
                    program: Some("gpg2".to_string()),
                    key: Some("global-key".to_string()),
                }),
                ..Default::default()
            },
            repo: Some(RepoConfig {
                signing: Some(SigningConfig {
                    program: None,
                    key: Some("repo-key".to_string()),
                }),
            }),
            global_path: None,
            repo_path: None,
        };

        assert_eq!(config.signing_key(), Some("repo-key"));
        assert_eq!(config.signing_program(), "gpg2");
    }
}
