use crate::normalize::FieldMapping;
use crate::utils::config::{DEFAULT_HOST, INGESTION_PATH, SDK_INTEGRATION};

/// Display the field mapping table
pub fn display_mapping() {
    println!("Tool-call field mapping");
    println!();
    println!("  {:<14} {:<14} {}", "SOURCE", "TARGET", "APPLIES TO");

    for rewrite in FieldMapping::tool_calls().rewrites() {
        let applies_to = if rewrite.requires_container {
            "objects and arrays"
        } else {
            "any value"
        };
        println!("  {:<14} {:<14} {}", rewrite.source, rewrite.target, applies_to);
    }

    println!();
    println!("Keys are rewritten at every depth. All other keys are kept as exported.");
}

/// Display version information
pub fn display_version() {
    println!("Langfuse Reimport v{}", env!("CARGO_PKG_VERSION"));
    println!("SDK integration: {}", SDK_INTEGRATION);
    println!("Default endpoint: {}{}", DEFAULT_HOST, INGESTION_PATH);
    println!();
    println!("Re-imports exported Langfuse traces with normalized tool-call fields.");
}
