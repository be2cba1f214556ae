use crate::token::error_message;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::Client;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("relay request failed: {0}")]
    Request(String),
    #[error("relay request rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Deserialize)]
struct TextResponse {
    text: String,
}

// The backend relay is the bridge to the transcription/LLM pipeline. All of
// its operations are narrow request/response calls; none of them may take the
// session down when they fail.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BackendRelay: Send + Sync {
    /// Asks the backend for the session's spoken reply to `text`. Used for
    /// the welcome message once the stream is up.
    async fn greeting(&self, session_id: &str, text: &str) -> Result<String, RelayError>;

    /// Requests an interruption of the avatar's current utterance through the
    /// backend. Returns the backend's acknowledgment payload.
    async fn interrupt(&self, session_id: &str) -> Result<String, RelayError>;

    /// Forwards one finalized transcript for downstream processing.
    /// Fire-and-forget: the caller only logs failures.
    async fn submit_transcript(&self, text: &str) -> Result<(), RelayError>;
}

pub struct HttpBackendRelay {
    client: Client,
    base_url: String,
}

impl HttpBackendRelay {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn post_for_text(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<String, RelayError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(&body)
            .send()
            .await
            .map_err(|e| RelayError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let body = response.json::<serde_json::Value>().await.ok();
            return Err(RelayError::Rejected(error_message(body)));
        }

        let data = response
            .json::<TextResponse>()
            .await
            .map_err(|e| RelayError::Request(e.to_string()))?;
        Ok(data.text)
    }
}

#[async_trait]
impl BackendRelay for HttpBackendRelay {
    async fn greeting(&self, session_id: &str, text: &str) -> Result<String, RelayError> {
        self.post_for_text(
            "/api/respuesta-audio",
            serde_json::json!({ "session_id": session_id, "text": text }),
        )
        .await
    }

    async fn interrupt(&self, session_id: &str) -> Result<String, RelayError> {
        self.post_for_text(
            "/api/interrupciones-audio",
            serde_json::json!({ "session_id": session_id }),
        )
        .await
    }

    async fn submit_transcript(&self, text: &str) -> Result<(), RelayError> {
        let response = self
            .client
            .post(format!("{}/send-text", self.base_url))
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .map_err(|e| RelayError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let body = response.json::<serde_json::Value>().await.ok();
            return Err(RelayError::Rejected(error_message(body)));
        }
        Ok(())
    }
}
