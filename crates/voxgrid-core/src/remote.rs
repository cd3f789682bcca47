//! Remote snippet source: the workflow webhook that turns a transcription into
//! widget source text.

use crate::config::RemoteConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("network failure: {0}")]
    NetworkFailure(String),
    #[error("remote returned HTTP {0}")]
    NonSuccessStatus(u16),
    #[error("response has no string `output` field")]
    MissingOutputField,
}

pub type FetchResult<T> = Result<T, FetchError>;

/// One trigger of the pipeline, as sent to the webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnippetRequest {
    pub transcription: String,
    pub confidence: f32,
    pub timestamp: DateTime<Utc>,
}

impl SnippetRequest {
    pub fn new(transcription: impl Into<String>, confidence: f32) -> Self {
        Self {
            transcription: transcription.into(),
            confidence,
            timestamp: Utc::now(),
        }
    }

    fn query(&self) -> [(&'static str, String); 3] {
        [
            ("transcription", self.transcription.clone()),
            ("confidence", self.confidence.to_string()),
            ("timestamp", self.timestamp.to_rfc3339()),
        ]
    }
}

/// Anything that can answer a request with snippet text.
#[async_trait::async_trait]
pub trait SnippetSource: Send + Sync {
    async fn fetch(&self, request: &SnippetRequest) -> FetchResult<String>;
}

/// HTTP GET against `{base_url}/{webhook_id}`; expects `{ "output": "..." }`.
pub struct WebhookSnippetSource {
    client: reqwest::Client,
    endpoint: String,
}

impl WebhookSnippetSource {
    pub fn new(config: &RemoteConfig) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("voxgrid-dashboard")
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            endpoint: config.endpoint(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl SnippetSource for WebhookSnippetSource {
    async fn fetch(&self, request: &SnippetRequest) -> FetchResult<String> {
        debug!(
            target: "voxgrid::remote",
            endpoint = %self.endpoint,
            transcription = %request.transcription,
            confidence = request.confidence,
            "fetching snippet"
        );
        let response = self
            .client
            .get(&self.endpoint)
            .query(&request.query())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                warn!(target: "voxgrid::remote", error = %e, "snippet request failed");
                FetchError::NetworkFailure(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(target: "voxgrid::remote", status = status.as_u16(), "snippet request rejected");
            return Err(FetchError::NonSuccessStatus(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::NetworkFailure(e.to_string()))?;
        extract_output(&body)
    }
}

/// Pull the snippet out of a webhook response body.
pub fn extract_output(body: &[u8]) -> FetchResult<String> {
    let json: serde_json::Value =
        serde_json::from_slice(body).map_err(|_| FetchError::MissingOutputField)?;
    json.get("output")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or(FetchError::MissingOutputField)
}
