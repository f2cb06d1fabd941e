//! Langfuse Reimport
//!
//! Re-imports exported Langfuse traces into a Langfuse project, fixing the
//! tool-call field names that break the replay view along the way.
//!
//! The import runs in two halves:
//! - An in-memory core (`parser` → `normalize` → `graph` → `schedule`) that
//!   either yields an ordered list of ingestion events or fails before any
//!   network call
//! - An [`ingest::Uploader`] that submits those events in batches, and a
//!   [`report::ImportReport`] summarizing per-entity outcomes
//!
//! ## Getting Started
//!
//! ```bash
//! export LANGFUSE_PUBLIC_KEY=pk-lf-...
//! export LANGFUSE_SECRET_KEY=sk-lf-...
//! langfuse-reimport import trace.json
//! ```

pub mod commands;
pub mod graph;
pub mod ingest;
pub mod normalize;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod report;
pub mod schedule;
pub mod utils;
