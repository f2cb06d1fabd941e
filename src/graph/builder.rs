//! Rebuild the trace tree from a normalized export.
//!
//! Recovery policies, all recorded as [`BuildWarning`]s rather than errors:
//! - An unknown parent id reparents the observation to the trace root.
//!   Exports can point at synthetic groupings the backend never stored,
//!   and dropping the child would lose data the user asked to import.
//! - A parent cycle is broken at its earliest observation, which becomes a
//!   direct child of the trace.
//! - A repeated export id keeps the first occurrence; later ones get fresh ids.
//! - An end time before the start time is dropped.
//! - A scalar field of an unusable type is dropped; the rest of its section
//!   is kept.
//!
//! Only an unreadable trace section is fatal.

use super::ids::{IdAllocator, IdPolicy};
use super::model::{
    GenerationDetails, Observation, ObservationKind, ParentRef, Timestamp, Trace, TraceGraph,
};
use crate::parser::{
    unreadable_fields, ExportDocument, RawObservation, RawTrace, OBSERVATION_FIELDS, TRACE_FIELDS,
};
use crate::utils::config::{CHAT_COMPLETION_MARKER, DEFAULT_TRACE_NAME, SKIPPED_IO_MARKERS};
use crate::utils::error::{BuildWarning, LoadError};
use log::{debug, warn};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Observation section that was read successfully
struct Entry {
    export_index: usize,
    raw: RawObservation,
    id: String,
}

/// Build the trace graph from a normalized export
///
/// **Public** - the GraphBuilder stage of the import pipeline
///
/// # Errors
/// * `LoadError::MalformedExport` - the trace section cannot be read
pub fn build_graph(doc: &ExportDocument, policy: IdPolicy) -> Result<TraceGraph, LoadError> {
    let raw_trace: RawTrace = serde_json::from_value(Value::Object(doc.trace.clone()))
        .map_err(|e| LoadError::MalformedExport(format!("unreadable trace section: {}", e)))?;

    let mut warnings = Vec::new();
    let mut ids = IdAllocator::new(policy);

    let trace_id = ids.assign(raw_trace.id.as_deref());
    debug!("Trace id: {} (export id: {:?})", trace_id, raw_trace.id);

    for field in unreadable_fields(&doc.trace, TRACE_FIELDS) {
        record(
            &mut warnings,
            BuildWarning::InvalidField {
                entity: format!("trace {}", trace_id),
                field: field.to_string(),
            },
        );
    }

    let entries = read_entries(&doc.observations, &mut ids, &mut warnings);
    let by_original = index_original_ids(&entries, &mut warnings);

    let mut parents = resolve_parents(&entries, &by_original, raw_trace.id.as_deref(), &mut warnings);
    break_cycles(&entries, &mut parents, &mut warnings);

    let trace = build_trace(raw_trace, trace_id, &entries);
    let observations = entries
        .iter()
        .zip(&parents)
        .map(|(entry, parent)| {
            let parent = match parent {
                Some(pos) => ParentRef::Observation(entries[*pos].id.clone()),
                None => ParentRef::Root,
            };
            build_observation(entry, parent, &trace.start, &mut warnings)
        })
        .collect::<Vec<_>>();

    debug!(
        "Built graph: {} observations, {} warnings",
        observations.len(),
        warnings.len()
    );

    Ok(TraceGraph {
        trace,
        observations,
        warnings,
    })
}

fn record(warnings: &mut Vec<BuildWarning>, warning: BuildWarning) {
    warn!("{}", warning);
    warnings.push(warning);
}

/// Read every observation section and assign its id
///
/// **Private** - sections that are not objects or do not fit the schema are skipped
fn read_entries(
    observations: &[Value],
    ids: &mut IdAllocator,
    warnings: &mut Vec<BuildWarning>,
) -> Vec<Entry> {
    let mut entries = Vec::with_capacity(observations.len());

    for (export_index, value) in observations.iter().enumerate() {
        let Some(section) = value.as_object() else {
            record(
                warnings,
                BuildWarning::SkippedObservation {
                    index: export_index,
                    reason: "not a JSON object".to_string(),
                },
            );
            continue;
        };

        match serde_json::from_value::<RawObservation>(value.clone()) {
            Ok(raw) => {
                let id = ids.assign(raw.id.as_deref());
                for field in unreadable_fields(section, OBSERVATION_FIELDS) {
                    record(
                        warnings,
                        BuildWarning::InvalidField {
                            entity: format!("observation {}", id),
                            field: field.to_string(),
                        },
                    );
                }
                entries.push(Entry {
                    export_index,
                    raw,
                    id,
                });
            }
            Err(e) => record(
                warnings,
                BuildWarning::SkippedObservation {
                    index: export_index,
                    reason: e.to_string(),
                },
            ),
        }
    }

    entries
}

/// Map export ids to entry positions; the first occurrence of an id wins
fn index_original_ids(entries: &[Entry], warnings: &mut Vec<BuildWarning>) -> HashMap<String, usize> {
    let mut by_original = HashMap::with_capacity(entries.len());

    for (pos, entry) in entries.iter().enumerate() {
        let Some(original) = entry.raw.id.as_deref() else {
            continue;
        };
        if by_original.contains_key(original) {
            record(
                warnings,
                BuildWarning::DuplicateId {
                    original: original.to_string(),
                    index: entry.export_index,
                    assigned: entry.id.clone(),
                },
            );
        } else {
            by_original.insert(original.to_string(), pos);
        }
    }

    by_original
}

/// Resolve each declared parent to an entry position
///
/// `None` means "direct child of the trace": no parent declared, the parent
/// is the trace itself, or the parent could not be found.
fn resolve_parents(
    entries: &[Entry],
    by_original: &HashMap<String, usize>,
    trace_original_id: Option<&str>,
    warnings: &mut Vec<BuildWarning>,
) -> Vec<Option<usize>> {
    entries
        .iter()
        .map(|entry| {
            let declared = entry.raw.parent_observation_id.as_deref()?;
            if Some(declared) == trace_original_id {
                return None;
            }
            match by_original.get(declared) {
                Some(&pos) => Some(pos),
                None => {
                    record(
                        warnings,
                        BuildWarning::BrokenReference {
                            observation: entry.id.clone(),
                            parent: declared.to_string(),
                        },
                    );
                    None
                }
            }
        })
        .collect()
}

/// Reparent observations until the parent links form a forest
///
/// Each cycle is broken at its member with the lowest export index.
fn break_cycles(entries: &[Entry], parents: &mut [Option<usize>], warnings: &mut Vec<BuildWarning>) {
    while let Some(cycle) = find_cycle(parents) {
        let Some(&victim) = cycle.iter().min() else {
            break;
        };
        record(
            warnings,
            BuildWarning::Cycle {
                observation: entries[victim].id.clone(),
            },
        );
        parents[victim] = None;
    }
}

/// Find one cycle in a parent array, returned as the positions on it
pub fn find_cycle(parents: &[Option<usize>]) -> Option<Vec<usize>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        OnPath,
        Done,
    }

    let mut marks = vec![Mark::Unvisited; parents.len()];

    for start in 0..parents.len() {
        if marks[start] != Mark::Unvisited {
            continue;
        }

        let mut path = Vec::new();
        let mut current = Some(start);
        while let Some(node) = current {
            match marks[node] {
                Mark::Unvisited => {
                    marks[node] = Mark::OnPath;
                    path.push(node);
                    current = parents[node];
                }
                Mark::OnPath => {
                    let from = path.iter().position(|&p| p == node)?;
                    return Some(path[from..].to_vec());
                }
                Mark::Done => break,
            }
        }

        for node in path {
            marks[node] = Mark::Done;
        }
    }

    None
}

/// Build the trace entity
///
/// **Private** - timestamps and input/output fall back to the observations
fn build_trace(raw: RawTrace, id: String, entries: &[Entry]) -> Trace {
    let starts = entries
        .iter()
        .filter_map(|e| e.raw.start_time.as_deref())
        .map(Timestamp::parse);
    let start = raw
        .timestamp
        .as_deref()
        .map(Timestamp::parse)
        .or_else(|| pick_timestamp(starts, |a, b| a < b))
        .unwrap_or_else(Timestamp::now);

    let ends = entries
        .iter()
        .filter_map(|e| e.raw.end_time.as_deref())
        .map(Timestamp::parse);
    let end = raw
        .end_time
        .as_deref()
        .map(Timestamp::parse)
        .or_else(|| pick_timestamp(ends, |a, b| a > b))
        .unwrap_or_else(|| start.clone());

    let (input, output) = if raw.input.is_some() || raw.output.is_some() {
        (raw.input, raw.output)
    } else {
        collect_trace_io(entries)
    };

    let mut tags: Vec<String> = Vec::new();
    for tag in raw.tags.unwrap_or_default() {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }

    Trace {
        id,
        original_id: raw.id,
        name: raw.name.unwrap_or_else(|| DEFAULT_TRACE_NAME.to_string()),
        start,
        end,
        metadata: into_metadata(raw.metadata),
        tags,
        input,
        output,
        user_id: raw.user_id,
        session_id: raw.session_id,
        release: raw.release,
        version: raw.version,
        environment: raw.environment,
        public: raw.public,
    }
}

/// Pick the timestamp that wins `better` among the parseable ones
///
/// Falls back to the first timestamp when none can be parsed.
fn pick_timestamp(
    timestamps: impl Iterator<Item = Timestamp>,
    better: impl Fn(&chrono::DateTime<chrono::Utc>, &chrono::DateTime<chrono::Utc>) -> bool,
) -> Option<Timestamp> {
    let mut first: Option<Timestamp> = None;
    let mut best: Option<Timestamp> = None;

    for ts in timestamps {
        if first.is_none() {
            first = Some(ts.clone());
        }
        let Some(parsed) = ts.parsed else {
            continue;
        };
        let replace = match best.as_ref().and_then(|b| b.parsed.as_ref()) {
            Some(current) => better(&parsed, current),
            None => true,
        };
        if replace {
            best = Some(ts);
        }
    }

    best.or(first)
}

/// Input/output of the last chat completion, used when the trace has none
///
/// Tool-call bookkeeping observations are never picked.
fn collect_trace_io(entries: &[Entry]) -> (Option<Value>, Option<Value>) {
    // Stable sort, so equal depths keep export order
    let mut by_depth: Vec<&Entry> = entries.iter().collect();
    by_depth.sort_by_key(|entry| entry.raw.depth.unwrap_or(0));

    by_depth
        .into_iter()
        .rev()
        .find(|entry| {
            let name = entry.raw.name.as_deref().unwrap_or("");
            name.contains(CHAT_COMPLETION_MARKER)
                && !SKIPPED_IO_MARKERS.iter().any(|marker| name.contains(marker))
        })
        .map(|entry| (entry.raw.input.clone(), entry.raw.output.clone()))
        .unwrap_or((None, None))
}

fn build_observation(
    entry: &Entry,
    parent: ParentRef,
    trace_start: &Timestamp,
    warnings: &mut Vec<BuildWarning>,
) -> Observation {
    let raw = &entry.raw;

    let kind = match raw.kind.as_deref() {
        None => ObservationKind::Span,
        Some(text) => ObservationKind::parse(text).unwrap_or_else(|| {
            record(
                warnings,
                BuildWarning::UnknownKind {
                    observation: entry.id.clone(),
                    kind: text.to_string(),
                },
            );
            ObservationKind::Span
        }),
    };

    let start = raw
        .start_time
        .as_deref()
        .map(Timestamp::parse)
        .unwrap_or_else(|| trace_start.clone());

    let end = raw.end_time.as_deref().map(Timestamp::parse).filter(|end| {
        let backwards = matches!((&start.parsed, &end.parsed), (Some(s), Some(e)) if e < s);
        if backwards {
            record(
                warnings,
                BuildWarning::EndBeforeStart {
                    observation: entry.id.clone(),
                },
            );
        }
        !backwards
    });

    let name = raw.name.clone().unwrap_or_else(|| {
        let short: String = entry.id.chars().take(8).collect();
        format!("{}-{}", kind.as_str().to_ascii_lowercase(), short)
    });

    let generation = (kind == ObservationKind::Generation).then(|| GenerationDetails {
        model: raw.model.clone(),
        model_parameters: raw.model_parameters.clone(),
        usage: raw.usage.clone(),
        usage_details: raw.usage_details.clone(),
        cost_details: raw.cost_details.clone(),
        completion_start_time: raw.completion_start_time.clone(),
        prompt_name: raw.prompt_name.clone(),
        prompt_version: raw.prompt_version,
    });

    Observation {
        id: entry.id.clone(),
        original_id: raw.id.clone(),
        export_index: entry.export_index,
        kind,
        name,
        parent,
        start,
        end,
        input: raw.input.clone(),
        output: raw.output.clone(),
        metadata: into_metadata(raw.metadata.clone()),
        level: raw.level.clone(),
        status_message: raw.status_message.clone(),
        version: raw.version.clone(),
        generation,
    }
}

/// Metadata must be an object; anything else becomes empty
fn into_metadata(value: Option<Value>) -> Map<String, Value> {
    match value {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    }
}
