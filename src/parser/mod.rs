//! Export loading and raw section schemas.
//!
//! This module handles:
//! - Decoding export files (UTF-8, BOM, Latin-1 fallback)
//! - Recognizing the supported export shapes
//! - Defining the raw trace and observation sections

pub mod loader;
pub mod schema;

// Re-export main types
pub use loader::{decode_bytes, load_export, parse_export, split_export, ExportDocument, ExportShape};
pub use schema::{
    unreadable_fields, FieldType, RawObservation, RawTrace, OBSERVATION_FIELDS, TRACE_FIELDS,
};
