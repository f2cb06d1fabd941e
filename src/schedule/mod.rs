//! Submission scheduling.
//!
//! This module linearizes a [`TraceGraph`] into ingestion events:
//! - The `trace-create` unit always comes first
//! - Every observation comes after its parent
//! - Independent observations follow start time, then export order

pub mod batch;
pub mod order;
pub mod unit;

// Re-export main types and functions
pub use batch::{into_batches, BatchLimits};
pub use order::submission_order;
pub use unit::{OperationKind, SubmissionUnit};

use crate::graph::TraceGraph;
use log::debug;

/// Build the ordered unit sequence for a graph
///
/// **Public** - the SubmissionScheduler stage of the import pipeline
pub fn schedule(graph: &TraceGraph) -> Vec<SubmissionUnit> {
    let mut units = Vec::with_capacity(graph.observations.len() + 1);
    units.push(SubmissionUnit::trace_create(&graph.trace));

    for pos in submission_order(graph) {
        let obs = &graph.observations[pos];
        units.push(SubmissionUnit::observation_create(obs, &graph.trace.id));
    }

    debug!("Scheduled {} submission units", units.len());
    units
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{build_graph, IdPolicy};
    use crate::parser::split_export;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn test_trace_first_and_parents_before_children() {
        let graph = build_graph(
            &split_export(json!({
                "trace": {"id": "t"},
                "observations": [
                    {"id": "c", "parentObservationId": "b", "startTime": "2024-05-01T10:00:00Z"},
                    {"id": "b", "parentObservationId": "a", "startTime": "2024-05-01T10:00:01Z"},
                    {"id": "a", "startTime": "2024-05-01T10:00:02Z"}
                ]
            }))
            .unwrap(),
            IdPolicy::Reuse,
        )
        .unwrap();

        let units = schedule(&graph);
        assert_eq!(units[0].kind, OperationKind::TraceCreate);
        assert_eq!(units[0].entity_id, "t");

        let mut seen = HashSet::new();
        seen.insert(units[0].entity_id.clone());
        for unit in &units[1..] {
            if let Some(parent) = unit.parent_observation_id() {
                assert!(seen.contains(parent), "{} submitted before parent {}", unit.entity_id, parent);
            }
            seen.insert(unit.entity_id.clone());
        }

        let ids: Vec<&str> = units.iter().map(|u| u.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["t", "a", "b", "c"]);
    }
}
