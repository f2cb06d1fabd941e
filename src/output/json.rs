//! JSON file output writer.

use crate::utils::error::OutputError;
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write any serializable value to a JSON file
///
/// **Public** - main entry point for file output
///
/// # Arguments
/// * `value` - Data to write
/// * `output_path` - Path to output JSON file
///
/// # Errors
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::SerializationFailed` - JSON serialization error
/// * `OutputError::InvalidPath` - Path cannot be created or is invalid
///
/// # Example
/// ```ignore
/// write_json(&json!({"requests": requests}), "payload.json")?;
/// ```
pub fn write_json<T: Serialize + ?Sized>(
    value: &T,
    output_path: impl AsRef<Path>,
) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();

    info!("Writing JSON to: {}", output_path.display());

    validate_output_path(output_path)?;

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Creating parent directories: {}", parent.display());
            std::fs::create_dir_all(parent).map_err(|e| {
                OutputError::InvalidPath(format!("Cannot create directory {}: {}", parent.display(), e))
            })?;
        }
    }

    let file = File::create(output_path).map_err(OutputError::WriteFailed)?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer_pretty(&mut writer, value).map_err(OutputError::SerializationFailed)?;
    writer.write_all(b"\n").map_err(OutputError::WriteFailed)?;
    writer.flush().map_err(OutputError::WriteFailed)?;

    info!("JSON written successfully ({} bytes)", calculate_file_size(output_path));

    Ok(())
}

/// Read a JSON file back into a value
///
/// **Public** - useful for validating dry-run payloads
///
/// # Errors
/// * `OutputError::WriteFailed` - File read error (reusing WriteFailed for I/O)
/// * `OutputError::SerializationFailed` - JSON parse error
pub fn read_json<T: DeserializeOwned>(input_path: impl AsRef<Path>) -> Result<T, OutputError> {
    let input_path = input_path.as_ref();

    debug!("Reading JSON from: {}", input_path.display());

    let file = File::open(input_path).map_err(OutputError::WriteFailed)?;
    serde_json::from_reader(std::io::BufReader::new(file)).map_err(OutputError::SerializationFailed)
}

/// Validate that output path is writable
///
/// **Private** - internal validation
fn validate_output_path(path: &Path) -> Result<(), OutputError> {
    if path.as_os_str().is_empty() {
        return Err(OutputError::InvalidPath("Path is empty".to_string()));
    }

    if path.is_dir() {
        return Err(OutputError::InvalidPath(format!(
            "Path is a directory: {}",
            path.display()
        )));
    }

    Ok(())
}

/// **Private** - internal utility
fn calculate_file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}
