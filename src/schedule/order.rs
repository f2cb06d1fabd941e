//! Dependency-respecting submission order.
//!
//! A topological sort over the parent links: an observation becomes ready
//! once its parent has been emitted, and among ready observations the one
//! with the earliest start goes first (export order breaks ties).

use crate::graph::{ParentRef, TraceGraph};
use chrono::{DateTime, Utc};
use log::debug;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// Sort key for ready observations
///
/// Unparseable start times sort after every parseable one.
type ReadyKey = (bool, Option<DateTime<Utc>>, usize, usize);

/// Order observations so every parent precedes its children
///
/// **Public** - returns positions into `graph.observations`
pub fn submission_order(graph: &TraceGraph) -> Vec<usize> {
    let observations = &graph.observations;

    let position: HashMap<&str, usize> = observations
        .iter()
        .enumerate()
        .map(|(pos, obs)| (obs.id.as_str(), pos))
        .collect();

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); observations.len()];
    let mut ready: BinaryHeap<Reverse<ReadyKey>> = BinaryHeap::new();

    let key = |pos: usize| -> Reverse<ReadyKey> {
        let obs = &observations[pos];
        Reverse((obs.start.parsed.is_none(), obs.start.parsed, obs.export_index, pos))
    };

    for (pos, obs) in observations.iter().enumerate() {
        match &obs.parent {
            ParentRef::Observation(parent) => match position.get(parent.as_str()) {
                Some(&parent_pos) => children[parent_pos].push(pos),
                None => ready.push(key(pos)),
            },
            ParentRef::Root => ready.push(key(pos)),
        }
    }

    let mut order = Vec::with_capacity(observations.len());
    while let Some(Reverse((_, _, _, pos))) = ready.pop() {
        order.push(pos);
        for &child in &children[pos] {
            ready.push(key(child));
        }
    }

    debug!("Ordered {} of {} observations", order.len(), observations.len());
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{build_graph, IdPolicy};
    use crate::parser::split_export;
    use serde_json::{json, Value};

    fn order_ids(export: Value) -> Vec<String> {
        let graph = build_graph(&split_export(export).unwrap(), IdPolicy::Reuse).unwrap();
        submission_order(&graph)
            .into_iter()
            .map(|pos| graph.observations[pos].id.clone())
            .collect()
    }

    #[test]
    fn test_parent_before_child_even_if_child_starts_first() {
        let ids = order_ids(json!({
            "trace": {"id": "t"},
            "observations": [
                {"id": "child", "parentObservationId": "parent", "startTime": "2024-05-01T10:00:00Z"},
                {"id": "parent", "startTime": "2024-05-01T10:00:05Z"}
            ]
        }));
        assert_eq!(ids, vec!["parent", "child"]);
    }

    #[test]
    fn test_siblings_by_start_then_export_order() {
        let ids = order_ids(json!({
            "trace": {"id": "t"},
            "observations": [
                {"id": "late", "startTime": "2024-05-01T10:00:09Z"},
                {"id": "tie-a", "startTime": "2024-05-01T10:00:01Z"},
                {"id": "tie-b", "startTime": "2024-05-01T10:00:01Z"},
                {"id": "early", "startTime": "2024-05-01T10:00:00Z"}
            ]
        }));
        assert_eq!(ids, vec!["early", "tie-a", "tie-b", "late"]);
    }

    #[test]
    fn test_unparseable_start_sorts_last() {
        let ids = order_ids(json!({
            "trace": {"id": "t", "timestamp": "2024-05-01T10:00:00Z"},
            "observations": [
                {"id": "odd", "startTime": "sometime"},
                {"id": "ok", "startTime": "2024-05-01T11:00:00Z"}
            ]
        }));
        assert_eq!(ids, vec!["ok", "odd"]);
    }

    #[test]
    fn test_every_observation_emitted_once() {
        let graph = build_graph(
            &split_export(json!({
                "trace": {"id": "t"},
                "observations": [
                    {"id": "a"},
                    {"id": "b", "parentObservationId": "a"},
                    {"id": "c", "parentObservationId": "b"},
                    {"id": "d", "parentObservationId": "a"},
                    {"id": "e", "parentObservationId": "missing"}
                ]
            }))
            .unwrap(),
            IdPolicy::Reuse,
        )
        .unwrap();

        let mut order = submission_order(&graph);
        assert_eq!(order.len(), 5);
        order.sort_unstable();
        order.dedup();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }
}
