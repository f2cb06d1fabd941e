//! Field mapping table for tool-call descriptors.
//!
//! The export writes tool-call keys camelCase; the ingestion API and the
//! replay view expect snake_case. Only the keys listed here are touched.

/// One key rewrite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRewrite {
    pub source: &'static str,
    pub target: &'static str,

    /// Only rename when the value is an object or array.
    /// Set for keys that name structures rather than scalars.
    pub requires_container: bool,
}

/// Tool-call keys known to break the replay view
pub const TOOL_CALL_REWRITES: &[FieldRewrite] = &[
    FieldRewrite {
        source: "toolCallId",
        target: "tool_call_id",
        requires_container: false,
    },
    FieldRewrite {
        source: "toolCalls",
        target: "tool_calls",
        requires_container: true,
    },
    FieldRewrite {
        source: "toolCall",
        target: "tool_call",
        requires_container: true,
    },
];

/// Fixed source-to-target key table
#[derive(Debug, Clone, Copy)]
pub struct FieldMapping {
    rewrites: &'static [FieldRewrite],
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self::tool_calls()
    }
}

impl FieldMapping {
    /// The tool-call mapping used for every import
    pub fn tool_calls() -> Self {
        Self {
            rewrites: TOOL_CALL_REWRITES,
        }
    }

    /// Look up the rewrite for a key, if any
    pub fn lookup(&self, key: &str) -> Option<&'static FieldRewrite> {
        self.rewrites.iter().find(|r| r.source == key)
    }

    pub fn rewrites(&self) -> &'static [FieldRewrite] {
        self.rewrites
    }
}
