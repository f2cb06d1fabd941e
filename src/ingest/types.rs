//! Types for the Langfuse public ingestion API.
//!
//! Request: `{"batch": [events], "metadata": {...}}`.
//! Response (200/201/207): per-event `successes` and `errors`, keyed by event id.

use crate::schedule::SubmissionUnit;
use crate::utils::config::{SDK_INTEGRATION, SDK_NAME};
use serde::{Deserialize, Serialize};

/// Ingestion request body
#[derive(Debug, Serialize)]
pub struct IngestionRequest<'a> {
    pub batch: &'a [SubmissionUnit],
    pub metadata: IngestionMetadata,
}

impl<'a> IngestionRequest<'a> {
    pub fn new(batch: &'a [SubmissionUnit]) -> Self {
        Self {
            batch,
            metadata: IngestionMetadata {
                batch_size: batch.len(),
                sdk_integration: SDK_INTEGRATION.to_string(),
                sdk_name: SDK_NAME.to_string(),
                sdk_version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }
}

/// SDK metadata sent with every request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionMetadata {
    pub batch_size: usize,
    pub sdk_integration: String,
    pub sdk_name: String,
    pub sdk_version: String,
}

/// Ingestion response body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngestionResponse {
    #[serde(default)]
    pub successes: Vec<IngestionSuccess>,
    #[serde(default)]
    pub errors: Vec<IngestionFailure>,
}

/// Event accepted by the backend
#[derive(Debug, Clone, Deserialize)]
pub struct IngestionSuccess {
    pub id: String,
    #[serde(default)]
    pub status: Option<u16>,
}

/// Event rejected by the backend
#[derive(Debug, Clone, Deserialize)]
pub struct IngestionFailure {
    pub id: String,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

impl IngestionFailure {
    /// Human-readable reason, from `message` or the raw `error` field
    pub fn reason(&self) -> String {
        match (&self.message, &self.error) {
            (Some(message), _) => message.clone(),
            (None, Some(serde_json::Value::String(error))) => error.clone(),
            (None, Some(error)) => error.to_string(),
            (None, None) => "rejected without message".to_string(),
        }
    }
}
