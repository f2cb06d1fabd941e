//! Uploader that writes request bodies to a file instead of the network.

use super::types::{IngestionRequest, IngestionResponse, IngestionSuccess};
use super::Uploader;
use crate::output::write_json;
use crate::schedule::SubmissionUnit;
use crate::utils::error::{IngestionError, OutputError};
use serde_json::{json, Value};
use std::path::PathBuf;

/// Collects every request and writes them as `{"requests": [...]}` on finish
pub struct DryRunUploader {
    path: PathBuf,
    requests: Vec<Value>,
}

impl DryRunUploader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            requests: Vec::new(),
        }
    }
}

impl Uploader for DryRunUploader {
    fn submit_batch(&mut self, batch: &[SubmissionUnit]) -> Result<IngestionResponse, IngestionError> {
        let request = serde_json::to_value(IngestionRequest::new(batch))
            .map_err(OutputError::SerializationFailed)?;
        self.requests.push(request);

        Ok(IngestionResponse {
            successes: batch
                .iter()
                .map(|unit| IngestionSuccess {
                    id: unit.event_id.clone(),
                    status: Some(201),
                })
                .collect(),
            errors: Vec::new(),
        })
    }

    fn finish(&mut self) -> Result<(), IngestionError> {
        write_json(&json!({ "requests": self.requests }), &self.path)?;
        Ok(())
    }
}
