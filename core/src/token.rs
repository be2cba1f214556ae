use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::Client;
use secrecy::SecretString;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token request failed: {0}")]
    Request(String),
    #[error("token request rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

/// Extracts the human-readable message from a backend error body, falling
/// back to a generic description when the field is absent or unreadable.
pub(crate) fn error_message(body: Option<serde_json::Value>) -> String {
    body.as_ref()
        .and_then(|json| {
            json.get("error")
                .or_else(|| json.get("message"))
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
        })
        .unwrap_or_else(|| "unauthorized".to_string())
}

// Credential acquisition is the one step that differs between the deployed
// variants: one asks the local backend to mint the token, the other calls the
// vendor's token endpoint directly with an API key.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<SecretString, TokenError>;
}

/// Obtains the session token from the local backend.
pub struct BackendTokenProvider {
    client: Client,
    base_url: String,
}

impl BackendTokenProvider {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl TokenProvider for BackendTokenProvider {
    async fn access_token(&self) -> Result<SecretString, TokenError> {
        let response = self
            .client
            .post(format!("{}/api/access-token", self.base_url))
            .send()
            .await
            .map_err(|e| TokenError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let body = response.json::<serde_json::Value>().await.ok();
            return Err(TokenError::Rejected(error_message(body)));
        }

        let data = response
            .json::<TokenResponse>()
            .await
            .map_err(|e| TokenError::Request(e.to_string()))?;
        Ok(SecretString::from(data.token))
    }
}

/// Obtains the session token straight from the vendor with an API key header.
pub struct VendorTokenProvider {
    client: Client,
    token_url: String,
    api_key: SecretString,
}

impl VendorTokenProvider {
    pub fn new(token_url: &str, api_key: SecretString) -> Self {
        Self {
            client: Client::new(),
            token_url: token_url.to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl TokenProvider for VendorTokenProvider {
    async fn access_token(&self) -> Result<SecretString, TokenError> {
        use secrecy::ExposeSecret;

        let response = self
            .client
            .post(&self.token_url)
            .header("x-api-key", self.api_key.expose_secret())
            .send()
            .await
            .map_err(|e| TokenError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let body = response.json::<serde_json::Value>().await.ok();
            return Err(TokenError::Rejected(error_message(body)));
        }

        let data = response
            .json::<TokenResponse>()
            .await
            .map_err(|e| TokenError::Request(e.to_string()))?;
        Ok(SecretString::from(data.token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_error_field() {
        let body = serde_json::json!({ "error": "token expired", "message": "other" });
        assert_eq!(error_message(Some(body)), "token expired");
    }

    #[test]
    fn test_error_message_falls_back_to_message_field() {
        let body = serde_json::json!({ "message": "bad request" });
        assert_eq!(error_message(Some(body)), "bad request");
    }

    #[test]
    fn test_error_message_defaults_when_absent() {
        assert_eq!(error_message(None), "unauthorized");
        assert_eq!(
            error_message(Some(serde_json::json!({ "status": 403 }))),
            "unauthorized"
        );
    }
}
