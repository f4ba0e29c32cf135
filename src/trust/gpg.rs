//! trust::gpg
//!
//! OpenPGP backend driving an external `gpg` program.
//!
//! # Protocol
//!
//! Signing runs `gpg --status-fd=2 -bsa [-u <key>]` with the tag payload on
//! stdin and takes the armored detached signature from stdout. Success
//! additionally requires a `SIG_CREATED` status line.
//!
//! Verification writes the signature to a scratch file and runs
//! `gpg --status-fd=1 --verify <file> -` with the payload on stdin. The
//! signature is valid only if gpg exits cleanly, reports `GOODSIG`, and
//! reports no `BADSIG`/`ERRSIG`.

use std::io::Write;
use std::process::{Command, Output, Stdio};

use tracing::debug;

use super::traits::{TrustBackend, TrustError};

/// Signing backend for `gpg` (or a compatible program).
#[derive(Debug, Clone)]
pub struct GpgBackend {
    program: String,
}

impl GpgBackend {
    /// Create a backend invoking `program`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// The program this backend invokes.
    pub fn program(&self) -> &str {
        &self.program
    }

    fn run(&self, args: &[&str], stdin: &[u8]) -> Result<Output, TrustError> {
        debug!(program = %self.program, ?args, "invoking signing program");
        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| TrustError::ProgramUnavailable {
                program: self.program.clone(),
                message: e.to_string(),
            })?;

        if let Some(mut input) = child.stdin.take() {
            input
                .write_all(stdin)
                .map_err(|e| TrustError::Io(e.to_string()))?;
        }

        child
            .wait_with_output()
            .map_err(|e| TrustError::Io(e.to_string()))
    }
}

impl Default for GpgBackend {
    fn default() -> Self {
        Self::new("gpg")
    }
}

impl TrustBackend for GpgBackend {
    fn sign(&self, payload: &[u8], key: Option<&str>) -> Result<String, TrustError> {
        let mut args = vec!["--status-fd=2", "-bsa"];
        if let Some(key) = key {
            args.push("-u");
            args.push(key);
        }

        let output = self.run(&args, payload)?;
        let stderr = String::from_utf8_lossy(&output.stderr);
        let created = stderr
            .lines()
            .any(|line| line.starts_with("[GNUPG:] SIG_CREATED "));
        if !output.status.success() || !created {
            return Err(TrustError::Backend(format!(
                "{} failed to sign the data: {}",
                self.program,
                stderr.trim()
            )));
        }

        String::from_utf8(output.stdout)
            .map_err(|_| TrustError::Backend("signature is not valid UTF-8".to_string()))
    }

    fn verify(
        &self,
        payload: &[u8],
        signature: &str,
        expected_identity: Option<&str>,
    ) -> Result<bool, TrustError> {
        let mut sig_file =
            tempfile::NamedTempFile::new().map_err(|e| TrustError::Io(e.to_string()))?;
        sig_file
            .write_all(signature.as_bytes())
            .map_err(|e| TrustError::Io(e.to_string()))?;
        let sig_path = sig_file.path().to_string_lossy().into_owned();

        let output = self.run(
            &["--status-fd=1", "--keyid-format=long", "--verify", &sig_path, "-"],
            payload,
        )?;

        let status = GpgStatus::parse(&String::from_utf8_lossy(&output.stdout));
        debug!(
            exit = ?output.status.code(),
            good = status.good,
            bad = status.bad,
            "signature check finished"
        );

        if !output.status.success() || !status.good || status.bad {
            return Ok(false);
        }

        Ok(match expected_identity {
            Some(identity) => status.matches(identity),
            None => true,
        })
    }

    fn name(&self) -> &'static str {
        "gpg"
    }
}

/// The verdict lines of a `--status-fd` transcript.
#[derive(Debug, Default, PartialEq, Eq)]
struct GpgStatus {
    good: bool,
    bad: bool,
    /// Key ids and fingerprints named by GOODSIG/VALIDSIG, uppercased
    key_ids: Vec<String>,
    /// User ids named by GOODSIG
    user_ids: Vec<String>,
}

/// Shortest key id accepted for matching (a short OpenPGP key id).
const MIN_KEY_ID_LEN: usize = 8;

impl GpgStatus {
    fn parse(text: &str) -> Self {
        let mut status = GpgStatus::default();
        for line in text.lines() {
            let Some(rest) = line.strip_prefix("[GNUPG:] ") else {
                continue;
            };
            let mut fields = rest.splitn(3, ' ');
            match fields.next() {
                Some("GOODSIG") => {
                    status.good = true;
                    if let Some(key_id) = fields.next() {
                        status.key_ids.push(key_id.to_ascii_uppercase());
                    }
                    if let Some(user_id) = fields.next() {
                        status.user_ids.push(user_id.trim().to_string());
                    }
                }
                Some("VALIDSIG") => {
                    let args: Vec<&str> = fields.flat_map(str::split_whitespace).collect();
                    // Signing key fingerprint first, primary key fingerprint last.
                    if let Some(fingerprint) = args.first() {
                        status.key_ids.push(fingerprint.to_ascii_uppercase());
                    }
                    if args.len() >= 10 {
                        if let Some(primary) = args.last() {
                            status.key_ids.push(primary.to_ascii_uppercase());
                        }
                    }
                }
                Some("BADSIG") | Some("ERRSIG") | Some("EXPKEYSIG") | Some("REVKEYSIG") => {
                    status.bad = true;
                }
                _ => {}
            }
        }
        status
    }

    /// Whether `identity` names one of the signers.
    ///
    /// Hex key ids of at least eight digits match as case-insensitive
    /// suffixes of a key id or fingerprint. An address matches the `<...>`
    /// part of a user id; anything else must equal a whole user id.
    fn matches(&self, identity: &str) -> bool {
        let identity = identity.trim();
        let hex = identity
            .strip_prefix("0x")
            .or_else(|| identity.strip_prefix("0X"))
            .unwrap_or(identity);
        if hex.len() >= MIN_KEY_ID_LEN && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            let wanted = hex.to_ascii_uppercase();
            return self.key_ids.iter().any(|id| id.ends_with(&wanted));
        }

        if identity.contains('@') {
            let wanted = identity.trim_start_matches('<').trim_end_matches('>');
            return self
                .user_ids
                .iter()
                .filter_map(|uid| email_of(uid))
                .any(|email| email.eq_ignore_ascii_case(wanted));
        }

        !identity.is_empty()
            && self
                .user_ids
                .iter()
                .any(|uid| uid.eq_ignore_ascii_case(identity))
    }
}

/// The address between the last `<` and `>` of a user id.
fn email_of(user_id: &str) -> Option<&str> {
    let start = user_id.rfind('<')?;
    let end = user_id[start..].find('>')? + start;
    Some(&user_id[start + 1..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD: &str = "\
[GNUPG:] NEWSIG
[GNUPG:] KEY_CONSIDERED 1234567890ABCDEF1234567890ABCDEF12345678 0
[GNUPG:] SIG_ID abc 2024-01-01 1700000000
[GNUPG:] GOODSIG 90ABCDEF12345678 Release Bot <release@example.com>
[GNUPG:] VALIDSIG 1234567890ABCDEF1234567890ABCDEF12345678 2024-01-01 1700000000 0 4 0 1 10 00 1234567890ABCDEF1234567890ABCDEF12345678
[GNUPG:] TRUST_ULTIMATE 0 pgp
";

    #[test]
    fn parses_good_signature() {
        let status = GpgStatus::parse(GOOD);
        assert!(status.good);
        assert!(!status.bad);
        assert_eq!(status.key_ids.len(), 3);
        assert_eq!(status.user_ids, vec!["Release Bot <release@example.com>"]);
    }

    #[test]
    fn parses_bad_signature() {
        let status = GpgStatus::parse("[GNUPG:] BADSIG 90ABCDEF12345678 Someone <x@example.com>\n");
        assert!(!status.good);
        assert!(status.bad);
    }

    #[test]
    fn ignores_non_status_lines() {
        let status = GpgStatus::parse("gpg: Good signature from \"x\"\n");
        assert_eq!(status, GpgStatus::default());
    }

    mod identity {
        use super::*;

        #[test]
        fn key_ids_match_as_suffixes() {
            let status = GpgStatus::parse(GOOD);
            assert!(status.matches("0x90abcdef12345678"));
            assert!(status.matches("12345678"));
            assert!(status.matches("1234567890ABCDEF1234567890ABCDEF12345678"));
            assert!(!status.matches("ABCDEF12"));
            assert!(!status.matches("5678"));
        }

        #[test]
        fn addresses_match_the_whole_email() {
            let status = GpgStatus::parse(GOOD);
            assert!(status.matches("release@example.com"));
            assert!(status.matches("<Release@Example.com>"));
            assert!(!status.matches("lease@example.com"));
            assert!(!status.matches("other@example.com"));
        }

        #[test]
        fn fragments_of_a_user_id_do_not_match() {
            let status = GpgStatus::parse(GOOD);
            assert!(status.matches("Release Bot <release@example.com>"));
            assert!(!status.matches("example.com"));
            assert!(!status.matches("Release"));
            assert!(!status.matches(""));
        }
    }

    #[test]
    fn missing_program_is_unavailable() {
        let backend = GpgBackend::new("git-evtag-no-such-program");
        let err = backend.sign(b"payload", None).unwrap_err();
        assert!(matches!(err, TrustError::ProgramUnavailable { .. }));

        let err = backend.verify(b"payload", "sig", None).unwrap_err();
        assert!(matches!(err, TrustError::ProgramUnavailable { .. }));
    }
}
