//! HTTP client for the Langfuse ingestion endpoint.

use super::types::{IngestionRequest, IngestionResponse};
use super::Uploader;
use crate::schedule::SubmissionUnit;
use crate::utils::config::{
    Credentials, DEFAULT_HTTP_TIMEOUT, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY, INGESTION_PATH,
};
use crate::utils::error::IngestionError;
use backoff::{retry_notify, Error as BackoffError, ExponentialBackoff, ExponentialBackoffBuilder};
use log::{debug, info, warn};
use reqwest::blocking::Client;
use std::time::Duration;

/// Longest response body kept in error messages
const MAX_ERROR_BODY: usize = 500;

/// Ingestion client authenticating with the project key pair
pub struct IngestionClient {
    client: Client,
    endpoint: String,
    public_key: String,
    secret_key: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl IngestionClient {
    /// Create a new ingestion client
    pub fn new(credentials: &Credentials) -> Result<Self, IngestionError> {
        let client = Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(IngestionError::RequestFailed)?;

        Ok(Self {
            client,
            endpoint: ingestion_url(&credentials.host),
            public_key: credentials.public_key.clone(),
            secret_key: credentials.secret_key.clone(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        })
    }

    /// Override the retry policy
    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Doubling delays starting at `retry_delay`; the attempt count bounds retries
    fn retry_policy(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.retry_delay)
            .with_multiplier(2.0)
            .with_randomization_factor(0.0)
            .with_max_elapsed_time(None)
            .build()
    }
}

impl Uploader for IngestionClient {
    fn submit_batch(&mut self, batch: &[SubmissionUnit]) -> Result<IngestionResponse, IngestionError> {
        let request = IngestionRequest::new(batch);

        info!("Posting {} events to {}", batch.len(), self.endpoint);

        let mut failures = 0;
        let result = retry_notify(
            self.retry_policy(),
            || {
                self.post(&request).map_err(|e| {
                    failures += 1;
                    if failures <= self.max_retries && is_retryable(&e) {
                        BackoffError::transient(e)
                    } else {
                        BackoffError::permanent(e)
                    }
                })
            },
            |e: IngestionError, wait: Duration| {
                warn!("Ingestion attempt failed ({}), retrying in {:?}", e, wait);
            },
        );

        result.map_err(|e| match e {
            BackoffError::Permanent(e) => e,
            BackoffError::Transient { err, .. } => err,
        })
    }
}

impl IngestionClient {
    /// Send one request and decode its response
    ///
    /// **Private** - a single attempt, no retries
    fn post(&self, request: &IngestionRequest<'_>) -> Result<IngestionResponse, IngestionError> {
        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.public_key, Some(&self.secret_key))
            .json(request)
            .send()
            .map_err(IngestionError::RequestFailed)?;

        let status = response.status();
        let body = response.text().map_err(IngestionError::RequestFailed)?;

        debug!("Ingestion response: HTTP {} ({} bytes)", status, body.len());

        if !matches!(status.as_u16(), 200 | 201 | 207) {
            return Err(IngestionError::Rejected {
                status: status.as_u16(),
                body: truncate(&body, MAX_ERROR_BODY),
            });
        }

        if body.trim().is_empty() {
            return Ok(IngestionResponse::default());
        }

        serde_json::from_str(&body).map_err(|e| {
            IngestionError::InvalidResponse(format!("{}: {}", e, truncate(&body, MAX_ERROR_BODY)))
        })
    }
}

/// Transport failures, throttling and server errors are worth another attempt
fn is_retryable(error: &IngestionError) -> bool {
    match error {
        IngestionError::RequestFailed(e) => e.is_timeout() || e.is_connect(),
        IngestionError::Rejected { status, .. } => *status == 429 || *status >= 500,
        _ => false,
    }
}

/// Join the host and the ingestion path
pub fn ingestion_url(host: &str) -> String {
    format!("{}{}", host.trim_end_matches('/'), INGESTION_PATH)
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
