//! Transport chunking of the ordered unit sequence.
//!
//! Batches are contiguous slices, so concatenating them gives back the
//! global order unchanged.

use super::unit::SubmissionUnit;
use crate::utils::config::{DEFAULT_BATCH_SIZE, DEFAULT_MAX_BATCH_BYTES};

/// Limits supplied by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    pub max_units: usize,

    /// Approximate request body limit; `None` disables the size check
    pub max_bytes: Option<usize>,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_units: DEFAULT_BATCH_SIZE,
            max_bytes: Some(DEFAULT_MAX_BATCH_BYTES),
        }
    }
}

impl BatchLimits {
    pub fn with_max_units(mut self, max_units: usize) -> Self {
        self.max_units = max_units;
        self
    }
}

/// Split units into batches within `limits`
///
/// A unit larger than `max_bytes` on its own still gets a batch.
pub fn into_batches<'a>(units: &'a [SubmissionUnit], limits: &BatchLimits) -> Vec<&'a [SubmissionUnit]> {
    let max_units = limits.max_units.max(1);
    let mut batches = Vec::new();
    let mut start = 0;
    let mut bytes = 0;

    for (i, unit) in units.iter().enumerate() {
        let size = unit_size(unit);
        let full = i - start >= max_units
            || limits.max_bytes.map_or(false, |max| bytes + size > max);
        if i > start && full {
            batches.push(&units[start..i]);
            start = i;
            bytes = 0;
        }
        bytes += size;
    }

    if start < units.len() {
        batches.push(&units[start..]);
    }

    batches
}

fn unit_size(unit: &SubmissionUnit) -> usize {
    serde_json::to_vec(unit).map(|bytes| bytes.len()).unwrap_or(0)
}
