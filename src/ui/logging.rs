//! ui::logging
//!
//! Single initialization point for `tracing` output.
//!
//! Diagnostics go to stderr so stdout carries only the checksum or report.
//! `RUST_LOG` takes precedence; otherwise the level follows the verbosity.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

use super::output::Verbosity;

static INIT_ONCE: Once = Once::new();

/// The default filter directive for a verbosity level.
pub fn default_directive(verbosity: Verbosity) -> &'static str {
    match verbosity {
        Verbosity::Quiet => "git_evtag=error",
        Verbosity::Normal => "git_evtag=warn",
        Verbosity::Debug => "git_evtag=debug",
    }
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init(verbosity: Verbosity) {
    INIT_ONCE.call_once(|| {
        let filter = if verbosity == Verbosity::Debug {
            EnvFilter::new(default_directive(verbosity))
        } else {
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)))
        };

        // A subscriber installed by an embedding program wins.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_idempotent() {
        init(Verbosity::Normal);
        init(Verbosity::Debug);
        init(Verbosity::Quiet);
    }

    #[test]
    fn directives_follow_verbosity() {
        assert_eq!(default_directive(Verbosity::Quiet), "git_evtag=error");
        assert_eq!(default_directive(Verbosity::Debug), "git_evtag=debug");
    }
}
