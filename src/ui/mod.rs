//! ui
//!
//! User interaction utilities.
//!
//! # Modules
//!
//! - [`output`] - Output formatting and display
//! - [`prompts`] - Tag message sources and editor sessions
//! - [`logging`] - `tracing` subscriber setup
//!
//! # Design
//!
//! All user-facing text goes through this module. Results go to stdout;
//! diagnostics and log events go to stderr.

pub mod logging;
pub mod output;
pub mod prompts;
