//! Submission of scheduled units to the ingestion API.
//!
//! The [`Uploader`] trait is the boundary to the transport. Batch failures
//! are turned into per-unit failures so the remaining batches still go out.

pub mod client;
pub mod dry_run;
pub mod types;

// Re-export main types
pub use client::{ingestion_url, IngestionClient};
pub use dry_run::DryRunUploader;
pub use types::{IngestionFailure, IngestionRequest, IngestionResponse, IngestionSuccess};

use crate::schedule::{into_batches, BatchLimits, OperationKind, SubmissionUnit};
use crate::utils::error::IngestionError;
use log::{info, warn};
use std::collections::HashMap;

/// Transport for ordered batches
pub trait Uploader {
    /// Submit one batch, in order
    fn submit_batch(&mut self, batch: &[SubmissionUnit]) -> Result<IngestionResponse, IngestionError>;

    /// Called once after the last batch
    fn finish(&mut self) -> Result<(), IngestionError> {
        Ok(())
    }
}

/// Result of submitting one unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOutcome {
    Succeeded,
    Failed { status: Option<u16>, message: String },
}

impl UnitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, UnitOutcome::Succeeded)
    }
}

/// Outcome of one entity, in submission order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityOutcome {
    pub entity_id: String,
    pub kind: OperationKind,
    pub outcome: UnitOutcome,
}

impl IngestionError {
    /// HTTP status behind the error, when there was one
    pub fn status(&self) -> Option<u16> {
        match self {
            IngestionError::Rejected { status, .. } => Some(*status),
            IngestionError::RequestFailed(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Submit every unit, batch by batch
///
/// **Public** - drives an [`Uploader`] over the scheduled sequence
///
/// A failed batch marks its units failed and submission continues.
///
/// # Errors
/// * Whatever `Uploader::finish` returns
pub fn submit_all(
    uploader: &mut dyn Uploader,
    units: &[SubmissionUnit],
    limits: &BatchLimits,
) -> Result<Vec<EntityOutcome>, IngestionError> {
    let batches = into_batches(units, limits);
    let mut outcomes = Vec::with_capacity(units.len());

    for (n, batch) in batches.iter().enumerate() {
        info!("Submitting batch {}/{} ({} events)", n + 1, batches.len(), batch.len());

        match uploader.submit_batch(batch) {
            Ok(response) => outcomes.extend(resolve_outcomes(batch, &response)),
            Err(e) => {
                warn!("Batch {} failed: {}", n + 1, e);
                let status = e.status();
                let message = e.to_string();
                outcomes.extend(batch.iter().map(|unit| EntityOutcome {
                    entity_id: unit.entity_id.clone(),
                    kind: unit.kind,
                    outcome: UnitOutcome::Failed {
                        status,
                        message: message.clone(),
                    },
                }));
            }
        }
    }

    uploader.finish()?;
    Ok(outcomes)
}

/// Map a batch response back onto its units
///
/// Units missing from the response count as accepted.
pub fn resolve_outcomes(batch: &[SubmissionUnit], response: &IngestionResponse) -> Vec<EntityOutcome> {
    let failures: HashMap<&str, &IngestionFailure> = response
        .errors
        .iter()
        .map(|failure| (failure.id.as_str(), failure))
        .collect();

    batch
        .iter()
        .map(|unit| {
            let outcome = match failures.get(unit.event_id.as_str()) {
                Some(failure) => UnitOutcome::Failed {
                    status: failure.status,
                    message: failure.reason(),
                },
                None => UnitOutcome::Succeeded,
            };
            EntityOutcome {
                entity_id: unit.entity_id.clone(),
                kind: unit.kind,
                outcome,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn unit(id: &str) -> SubmissionUnit {
        SubmissionUnit {
            event_id: format!("ev-{}", id),
            timestamp: "2024-05-01T10:00:00Z".to_string(),
            kind: OperationKind::SpanCreate,
            entity_id: id.to_string(),
            body: json!({"id": id}),
        }
    }

    /// Fails the batches whose index is listed, rejects event `ev-bad`
    struct ScriptedUploader {
        fail_batches: Vec<usize>,
        calls: usize,
        finished: bool,
    }

    impl Uploader for ScriptedUploader {
        fn submit_batch(&mut self, batch: &[SubmissionUnit]) -> Result<IngestionResponse, IngestionError> {
            let call = self.calls;
            self.calls += 1;
            if self.fail_batches.contains(&call) {
                return Err(IngestionError::Rejected {
                    status: 500,
                    body: "boom".to_string(),
                });
            }
            let errors = batch
                .iter()
                .filter(|u| u.event_id == "ev-bad")
                .map(|u| IngestionFailure {
                    id: u.event_id.clone(),
                    status: Some(400),
                    message: Some("invalid".to_string()),
                    error: None,
                })
                .collect();
            Ok(IngestionResponse {
                successes: Vec::new(),
                errors,
            })
        }

        fn finish(&mut self) -> Result<(), IngestionError> {
            self.finished = true;
            Ok(())
        }
    }

    #[test]
    fn test_failed_batch_does_not_stop_submission() {
        let units = vec![unit("a"), unit("b"), unit("c"), unit("bad")];
        let mut uploader = ScriptedUploader {
            fail_batches: vec![0],
            calls: 0,
            finished: false,
        };
        let limits = BatchLimits { max_units: 2, max_bytes: None };

        let outcomes = submit_all(&mut uploader, &units, &limits).unwrap();

        assert_eq!(uploader.calls, 2);
        assert!(uploader.finished);
        assert_eq!(outcomes.len(), 4);
        assert_eq!(
            outcomes[0].outcome,
            UnitOutcome::Failed {
                status: Some(500),
                message: "Ingestion rejected with HTTP 500: boom".to_string()
            }
        );
        assert!(!outcomes[1].outcome.is_success());
        assert!(outcomes[2].outcome.is_success());
        assert_eq!(
            outcomes[3].outcome,
            UnitOutcome::Failed {
                status: Some(400),
                message: "invalid".to_string()
            }
        );
    }
}
