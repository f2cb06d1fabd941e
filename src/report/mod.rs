//! Import report.
//!
//! Collects per-entity submission outcomes and build warnings into a
//! pass/fail summary printed after the run.

use crate::ingest::{EntityOutcome, UnitOutcome};
use crate::utils::error::BuildWarning;

/// Result of one import run
#[derive(Debug, Clone)]
pub struct ImportReport {
    pub trace_id: String,
    pub outcomes: Vec<EntityOutcome>,
    pub warnings: Vec<BuildWarning>,
}

impl ImportReport {
    pub fn new(trace_id: impl Into<String>, outcomes: Vec<EntityOutcome>, warnings: Vec<BuildWarning>) -> Self {
        Self {
            trace_id: trace_id.into(),
            outcomes,
            warnings,
        }
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.outcome.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Outcomes that failed, in submission order
    pub fn failures(&self) -> impl Iterator<Item = &EntityOutcome> {
        self.outcomes.iter().filter(|o| !o.outcome.is_success())
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed() == 0
    }

    /// Process exit code: 0 when every unit succeeded, 2 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.is_complete_success() {
            0
        } else {
            2
        }
    }

    /// One-line summary for logs
    pub fn summary(&self) -> String {
        format!(
            "Trace: {} | Submitted: {} | Succeeded: {} | Failed: {} | Warnings: {}",
            self.trace_id,
            self.outcomes.len(),
            self.succeeded(),
            self.failed(),
            self.warnings.len()
        )
    }

    /// Multi-line per-entity summary
    pub fn render_summary(&self) -> String {
        let mut lines = Vec::new();
        let rule = "=".repeat(80);

        lines.push(rule.clone());
        lines.push("IMPORT SUMMARY".to_string());
        lines.push(rule.clone());
        lines.push(format!("Trace:     {}", self.trace_id));
        lines.push(format!("Entities:  {}", self.outcomes.len()));
        lines.push(format!("Succeeded: {}", self.succeeded()));
        lines.push(format!("Failed:    {}", self.failed()));

        if !self.outcomes.is_empty() {
            lines.push(String::new());
            for entity in &self.outcomes {
                lines.push(render_outcome(entity));
            }
        }

        if !self.warnings.is_empty() {
            lines.push(String::new());
            lines.push(format!("Warnings ({}):", self.warnings.len()));
            for warning in &self.warnings {
                lines.push(format!("  ! {}", warning));
            }
        }

        lines.push(rule);
        lines.join("\n")
    }
}

fn render_outcome(entity: &EntityOutcome) -> String {
    match &entity.outcome {
        UnitOutcome::Succeeded => format!("  ✓ {:<18} {}", entity.kind.as_str(), entity.entity_id),
        UnitOutcome::Failed { status: Some(status), message } => format!(
            "  ✗ {:<18} {} (HTTP {}: {})",
            entity.kind.as_str(),
            entity.entity_id,
            status,
            message
        ),
        UnitOutcome::Failed { status: None, message } => {
            format!("  ✗ {:<18} {} ({})", entity.kind.as_str(), entity.entity_id, message)
        }
    }
}
