//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use thiserror::Error;

/// Errors that can occur while loading an export file
///
/// All of these are fatal: nothing is submitted once loading fails.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read export file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON in export file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not a valid trace export: {0}")]
    MalformedExport(String),
}

/// Recoverable problems found while rebuilding the trace graph
///
/// Recorded and logged, never abort the run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildWarning {
    #[error("observation {observation} references unknown parent {parent}; reparented to trace root")]
    BrokenReference { observation: String, parent: String },

    #[error("identifier {original} appears more than once; occurrence #{index} received {assigned}")]
    DuplicateId {
        original: String,
        index: usize,
        assigned: String,
    },

    #[error("observation {observation} is part of a parent cycle; reparented to trace root")]
    Cycle { observation: String },

    #[error("observation {observation} ends before it starts; end time dropped")]
    EndBeforeStart { observation: String },

    #[error("observation {observation} has unknown type {kind}; imported as span")]
    UnknownKind { observation: String, kind: String },

    #[error("observation #{index} skipped: {reason}")]
    SkippedObservation { index: usize, reason: String },

    #[error("{entity} has an unusable value for field {field}; field dropped")]
    InvalidField { entity: String, field: String },
}

/// Errors raised by the ingestion transport
///
/// A failed request marks every unit of its batch as failed.
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Ingestion rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Invalid ingestion response: {0}")]
    InvalidResponse(String),

    #[error("Failed to write dry-run payload: {0}")]
    Output(#[from] OutputError),
}

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}

/// Errors that can occur while resolving configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Langfuse credentials not provided (set LANGFUSE_PUBLIC_KEY and LANGFUSE_SECRET_KEY, pass --public-key/--secret-key, or use --config)")]
    MissingCredentials,
}
