// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! HTTP client for the melody generation service.
//!
//! A request posts the column payload of a log and expects a payload of
//! the same shape back, which becomes a new log. Failures leave the
//! caller's log untouched; adopting the result is up to the caller.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::payload::{from_payload, to_payload, ColumnPayload, PayloadError};
use crate::config::GenerationConfig;
use crate::recording::RecordingLog;

/// Generation failures
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Transport failure: unreachable host, timeout, broken connection
    #[error("generation request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// The service answered with a non-success status
    #[error("generation service returned HTTP {0}")]
    Status(u16),
    /// The response body is not a column payload
    #[error("malformed generation response: {0}")]
    Decode(String),
    /// The payload parsed but does not describe valid notes
    #[error("invalid generated notes: {0}")]
    Payload(#[from] PayloadError),
}

impl GenerationError {
    /// Whether the request never got a response
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Whether a response arrived but could not be turned into a log
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_) | Self::Payload(_))
    }
}

/// Client for one generation endpoint
#[derive(Debug, Clone)]
pub struct GenerationClient {
    http: reqwest::Client,
    endpoint: String,
    /// Requests in flight
    loading: Arc<AtomicUsize>,
}

impl GenerationClient {
    /// Build a client for the configured endpoint and timeout
    pub fn new(config: &GenerationConfig) -> Result<Self, GenerationError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            loading: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Endpoint requests are posted to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Whether a request is in flight
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst) > 0
    }

    /// Send `log` to the service and return the generated log.
    ///
    /// The returned log is in recording mode with its current time at the
    /// end of its timeline.
    pub async fn request(&self, log: &RecordingLog) -> Result<RecordingLog, GenerationError> {
        let _loading = LoadingGuard::new(&self.loading);
        let payload = to_payload(log);
        info!(notes = payload.len(), endpoint = %self.endpoint, "requesting generation");

        let response = self
            .http
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                warn!("generation request failed: {}", e);
                GenerationError::Network(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "generation service error");
            return Err(GenerationError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        debug!(bytes = body.len(), "generation response received");

        let generated: ColumnPayload = serde_json::from_slice(&body).map_err(|e| {
            warn!("malformed generation response: {}", e);
            GenerationError::Decode(e.to_string())
        })?;
        let events = from_payload(&generated)?;

        info!(notes = events.len(), "generation complete");
        Ok(RecordingLog::from_events(events))
    }
}

/// Holds the loading count up for the life of a request
struct LoadingGuard {
    count: Arc<AtomicUsize>,
}

impl LoadingGuard {
    fn new(count: &Arc<AtomicUsize>) -> Self {
        count.fetch_add(1, Ordering::SeqCst);
        Self {
            count: Arc::clone(count),
        }
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::SeqCst);
    }
}
