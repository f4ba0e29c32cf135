//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Global Config
//!
//! Located at (in order of precedence):
//! 1. `$GIT_EVTAG_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/git-evtag/config.toml`
//! 3. `~/.git-evtag/config.toml`
//!
//! # Repo Config
//!
//! Located at `.git/evtag/config.toml`.
//!
//! # Validation
//!
//! Config values are validated after parsing so that a typo fails loudly
//! instead of silently changing how checksums are computed.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Upper bound on worker threads per object store.
pub const MAX_JOBS: usize = 256;

/// Global configuration (user scope).
///
/// # Example
///
/// ```toml
/// jobs = 4
/// prefetch_window = 512
/// compat = false
/// print_stats = true
///
/// [signing]
/// program = "gpg2"
/// key = "0xDEADBEEF"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Object read workers per store (1 reads inline)
    pub jobs: Option<usize>,

    /// Maximum objects read ahead of the digest
    pub prefetch_window: Option<usize>,

    /// Hash repeated objects at every occurrence
    pub compat: Option<bool>,

    /// Print the statistics comment line with the checksum
    pub print_stats: Option<bool>,

    /// Signing backend settings
    pub signing: Option<SigningConfig>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(jobs) = self.jobs {
            if jobs == 0 || jobs > MAX_JOBS {
                return Err(ConfigError::InvalidValue(format!(
                    "jobs must be between 1 and {MAX_JOBS}, got {jobs}"
                )));
            }
        }

        if self.prefetch_window == Some(0) {
            return Err(ConfigError::InvalidValue(
                "prefetch_window must be at least 1".to_string(),
            ));
        }

        if let Some(signing) = &self.signing {
            signing.validate()?;
        }

        Ok(())
    }
}

/// Repository configuration.
///
/// # Example
///
/// ```toml
/// [signing]
/// key = "release@example.com"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RepoConfig {
    /// Signing backend settings for this repository
    pub signing: Option<SigningConfig>,
}

impl RepoConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(signing) = &self.signing {
            signing.validate()?;
        }
        Ok(())
    }
}

/// Signing backend settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SigningConfig {
    /// OpenPGP program to invoke (default: "gpg")
    pub program: Option<String>,

    /// Key id or user id to sign with (default: git's `user.signingkey`)
    pub key: Option<String>,
}

impl SigningConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(program) = &self.program {
            if program.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "signing.program cannot be empty".to_string(),
                ));
            }
        }
        if let Some(key) = &self.key {
            if key.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "signing.key cannot be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(GlobalConfig::default().validate().is_ok());
        assert!(RepoConfig::default().validate().is_ok());
    }

    #[test]
    fn jobs_bounds() {
        let zero = GlobalConfig {
            jobs: Some(0),
            ..Default::default()
        };
        assert!(zero.validate().is_err());

        let huge = GlobalConfig {
            jobs: Some(MAX_JOBS + 1),
            ..Default::default()
        };
        assert!(huge.validate().is_err());

        let ok = GlobalConfig {
            jobs: Some(4),
            ..Default::default()
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn empty_signing_program_rejected() {
        let config = RepoConfig {
            signing: Some(SigningConfig {
                program: Some("  ".to_string()),
                key: None,
            }),
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_full_global_config() {
        let config: GlobalConfig = toml::from_str(
            r#"
            jobs = 2
            prefetch_window = 64
            compat = true
            print_stats = true

            [signing]
            program = "gpg2"
            key = "ABCD"
            "#,
        )
        .unwrap();
        assert_eq!(config.jobs, Some(2));
        assert_eq!(config.compat, Some(true));
        assert_eq!(
            config.signing.and_then(|s| s.program),
            Some("gpg2".to_string())
        );
    }
}
