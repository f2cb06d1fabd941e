//! Output writers.
//!
//! Dry-run payloads and `inspect` reports are written to disk as
//! pretty-printed JSON.

pub mod json;

// Re-export main functions
pub use json::{read_json, write_json};
