//! Configuration and constants for the importer.
//!
//! Credentials are resolved in order: CLI flag or environment variable
//! (handled by clap), then an optional TOML config file, then defaults.

use super::error::ConfigError;
use log::debug;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Default Langfuse host
pub const DEFAULT_HOST: &str = "https://us.cloud.langfuse.com";

/// Ingestion endpoint, relative to the host
pub const INGESTION_PATH: &str = "/api/public/ingestion";

/// Default timeout for ingestion requests
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Retries of a failed ingestion request (transport errors, 429, 5xx)
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Base delay between retries; grows linearly per attempt
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Maximum number of events per ingestion request
pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const MAX_BATCH_SIZE: usize = 1000;

/// Request body limit enforced by the backend (3.5 MB)
pub const DEFAULT_MAX_BATCH_BYTES: usize = 3_500_000;

/// Name given to traces whose export carries none
pub const DEFAULT_TRACE_NAME: &str = "Imported Trace";

// SDK metadata attached to every ingestion request
pub const SDK_INTEGRATION: &str = "trace_importer";
pub const SDK_NAME: &str = "rust";

// Field names for export parsing (exports and API responses differ)
pub const TRACE_SECTION_NAMES: &[&str] = &["trace", "traceData"];
pub const OBSERVATION_SECTION_NAMES: &[&str] = &["observations", "spans"];

// Observation names used to pick the trace-level input/output
pub const CHAT_COMPLETION_MARKER: &str = "chat-completion";
pub const SKIPPED_IO_MARKERS: &[&str] = &["tool-call", "tool-start-message"];

/// Longest identifier reused verbatim from an export
pub const MAX_ID_LEN: usize = 128;

/// Optional TOML config file
///
/// ```toml
/// [langfuse]
/// host = "https://cloud.langfuse.com"
/// public_key = "pk-lf-..."
/// secret_key = "sk-lf-..."
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub langfuse: LangfuseSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LangfuseSection {
    pub host: Option<String>,
    pub public_key: Option<String>,
    pub secret_key: Option<String>,
}

/// Resolved connection settings, opaque to the import core
#[derive(Clone)]
pub struct Credentials {
    pub host: String,
    pub public_key: String,
    pub secret_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("public_key", &self.public_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Read a TOML config file
pub fn load_config_file(path: impl AsRef<Path>) -> Result<ConfigFile, ConfigError> {
    let path = path.as_ref();
    debug!("Reading config file: {}", path.display());

    let content = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
    toml::from_str(&content).map_err(ConfigError::Parse)
}

/// Merge explicit values with an optional config file
///
/// Explicit values (CLI flags or environment) always win.
pub fn resolve_credentials(
    host: Option<String>,
    public_key: Option<String>,
    secret_key: Option<String>,
    file: Option<&ConfigFile>,
) -> Result<Credentials, ConfigError> {
    let section = file.map(|f| &f.langfuse);

    let host = host
        .or_else(|| section.and_then(|s| s.host.clone()))
        .unwrap_or_else(|| DEFAULT_HOST.to_string());
    let public_key = public_key.or_else(|| section.and_then(|s| s.public_key.clone()));
    let secret_key = secret_key.or_else(|| section.and_then(|s| s.secret_key.clone()));

    match (public_key, secret_key) {
        (Some(public_key), Some(secret_key)) => Ok(Credentials {
            host: host.trim_end_matches('/').to_string(),
            public_key,
            secret_key,
        }),
        _ => Err(ConfigError::MissingCredentials),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_explicit_values_win() {
        let file = ConfigFile {
            langfuse: LangfuseSection {
                host: Some("https://file.example".to_string()),
                public_key: Some("pk-file".to_string()),
                secret_key: Some("sk-file".to_string()),
            },
        };

        let creds = resolve_credentials(
            Some("https://cli.example/".to_string()),
            Some("pk-cli".to_string()),
            None,
            Some(&file),
        )
        .unwrap();

        assert_eq!(creds.host, "https://cli.example");
        assert_eq!(creds.public_key, "pk-cli");
        assert_eq!(creds.secret_key, "sk-file");
    }

    #[test]
    fn test_missing_credentials() {
        let result = resolve_credentials(None, Some("pk".to_string()), None, None);
        assert!(matches!(result, Err(ConfigError::MissingCredentials)));
    }

    #[test]
    fn test_default_host() {
        let creds =
            resolve_credentials(None, Some("pk".to_string()), Some("sk".to_string()), None)
                .unwrap();
        assert_eq!(creds.host, DEFAULT_HOST);
    }

    #[test]
    fn test_load_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[langfuse]\npublic_key = \"pk-lf-1\"\nsecret_key = \"sk-lf-1\"").unwrap();

        let config = load_config_file(file.path()).unwrap();
        assert_eq!(config.langfuse.public_key.as_deref(), Some("pk-lf-1"));
        assert!(config.langfuse.host.is_none());
    }

    #[test]
    fn test_secret_is_redacted_in_debug() {
        let creds = Credentials {
            host: DEFAULT_HOST.to_string(),
            public_key: "pk".to_string(),
            secret_key: "sk-very-secret".to_string(),
        };
        assert!(!format!("{:?}", creds).contains("sk-very-secret"));
    }
}
