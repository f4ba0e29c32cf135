//! core
//!
//! Core domain types for git-evtag.
//!
//! # Modules
//!
//! - [`types`] - Strong types: Oid, StoreId, TagName
//! - [`object`] - Raw object representation and parsing
//! - [`checksum`] - The checksum value and tag-message handling
//! - [`store`] - Object store traits and the in-memory store
//! - [`error`] - The error taxonomy and exit codes
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid ids and tag names from reaching git
//! - Object parsing is strict: anything that does not decode is malformed
//! - Nothing here touches the filesystem except configuration loading

pub mod checksum;
pub mod config;
pub mod error;
pub mod object;
pub mod store;
pub mod types;
