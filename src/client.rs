//! Chat transport: opens one streamed completion request per turn.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::ChatConfig;
use crate::http::{add_extra_headers, build_http_client};
use crate::model::ChatMessage;
use crate::store::StoreError;

/// Errors that can occur while driving a chat turn.
#[derive(Error, Debug)]
pub enum ChatError {
    /// The request failed or was refused before any reply streamed.
    #[error("request rejected: {0}")]
    TransportRejected(String),

    /// The connection dropped while the reply was streaming.
    #[error("stream transport error: {0}")]
    StreamTransport(#[source] reqwest::Error),

    /// The message store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The client configuration is unusable for this turn.
    #[error("configuration error: {0}")]
    Config(String),
}

/// HTTP transport for streamed chat completions.
///
/// One instance per configured endpoint; [`ChatClient::open_stream`] performs
/// a single POST whose response body is the SSE stream consumed by
/// [`StreamAssembler`](crate::stream::StreamAssembler).
pub struct ChatClient {
    config: ChatConfig,
}

impl ChatClient {
    /// Create a client for the configured endpoint.
    pub fn new(config: ChatConfig) -> Self {
        Self { config }
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// POST the conversation and return the streaming response.
    ///
    /// The returned response has already passed the status check; its body is
    /// the SSE event stream. A failed send or a non-success status yields
    /// [`ChatError::TransportRejected`] without consuming any stream.
    pub async fn open_stream(
        &self,
        messages: &[ChatMessage],
    ) -> Result<reqwest::Response, ChatError> {
        // Validate API key is present
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| ChatError::Config("API key is required".to_string()))?;

        let http_client = build_http_client(&self.config)
            .map_err(|e| ChatError::Config(format!("failed to build HTTP client: {}", e)))?;

        let request_body = CompletionRequest { messages };

        let mut req = http_client
            .post(&self.config.endpoint)
            .header(AUTHORIZATION, format!("Bearer {}", api_key.expose_secret()))
            .header(CONTENT_TYPE, "application/json");

        req = add_extra_headers(req, &self.config.extra_headers);

        debug!(
            "Opening completion stream to {} with {} messages",
            self.config.endpoint,
            messages.len()
        );

        let response = req
            .json(&request_body)
            .send()
            .await
            .map_err(|e| ChatError::TransportRejected(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::handle_error_response(status, &body));
        }

        Ok(response)
    }

    /// Turn a non-success status into a rejection error.
    fn handle_error_response(status: reqwest::StatusCode, body: &str) -> ChatError {
        if let Ok(error_resp) = serde_json::from_str::<ServiceErrorResponse>(body) {
            ChatError::TransportRejected(format!(
                "service error ({}): {}",
                status, error_resp.error.message
            ))
        } else {
            ChatError::TransportRejected(format!("HTTP {}: {}", status, body))
        }
    }
}

// --- Completion API Request/Response Types ---

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    messages: &'a [ChatMessage],
}

#[derive(Debug, Clone, Deserialize)]
struct ServiceErrorResponse {
    error: ServiceError,
}

#[derive(Debug, Clone, Deserialize)]
struct ServiceError {
    message: String,
}
