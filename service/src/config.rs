//! Application Configuration Module
//!
//! Centralizes the runtime configuration for the presenter service. The
//! deployed variants of this front-end differ only in a handful of switches
//! (where the token comes from, whether the relay socket exists, how voice
//! and interrupts are routed); all of them live here as environment settings.

use presenter_core::coordinator::{InterruptRoute, VoiceRoute, DEFAULT_GREETING};
use std::env;
use tracing::Level;

/// Capacity of the runtime's input event channel.
pub const INPUT_CAPACITY: usize = 256;
/// Capacity of the coordinator command channel.
pub const COMMAND_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenSource {
    /// `POST {backend}/api/access-token`, no credential needed locally.
    Backend,
    /// The vendor token endpoint, authenticated with `AVATAR_API_KEY`.
    Vendor,
}

/// Holds all configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub backend_base_url: String,
    pub token_source: TokenSource,
    pub avatar_api_key: Option<String>,
    pub avatar_token_url: String,
    pub avatar_ws_url: String,
    /// Relay socket for backend pushes; None disables the listener.
    pub relay_ws_url: Option<String>,
    pub recognizer_ws_url: String,
    pub speech_auto_restart: bool,
    pub barge_in_on_push: bool,
    pub interrupt_route: InterruptRoute,
    pub voice_route: VoiceRoute,
    pub greeting: String,
    pub log_level: Level,
}

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
    #[error("Invalid log level provided for RUST_LOG: {0}")]
    InvalidLogLevel(String),
}

pub(crate) fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue(name, value.to_string())),
    }
}

fn env_bool(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(name) {
        Ok(value) => parse_bool(name, &value),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    // *   `BACKEND_BASE_URL`: (Optional) The local backend. Defaults to "http://localhost:3000".
    // *   `TOKEN_SOURCE`: (Optional) "backend" or "vendor". Defaults to "backend".
    // *   `AVATAR_API_KEY`: The vendor API key. Required if TOKEN_SOURCE is "vendor".
    // *   `AVATAR_TOKEN_URL`: (Optional) The vendor token endpoint.
    // *   `AVATAR_WS_URL`: (Optional) The vendor realtime endpoint.
    // *   `RELAY_WS_URL`: (Optional) The backend push socket. Defaults to "ws://localhost:8080"; set to "" to disable.
    // *   `RECOGNIZER_WS_URL`: (Optional) The recognizer feed. Defaults to "ws://localhost:2700".
    // *   `SPEECH_AUTO_RESTART`: (Optional) Restart capture on every natural end. Defaults to "true".
    // *   `BARGE_IN_ON_PUSH`: (Optional) Interrupt in-flight speech for pushed replies too. Defaults to "false".
    // *   `INTERRUPT_ROUTE`: (Optional) "avatar" or "backend". Defaults to "avatar".
    // *   `VOICE_ROUTE`: (Optional) "direct" or "backend". Defaults to "backend" when the relay is enabled.
    // *   `GREETING_TEXT`: (Optional) Seed/fallback welcome text.
    // *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file. This is useful for local development and is ignored if not present.
        dotenvy::dotenv().ok();

        let backend_base_url =
            env::var("BACKEND_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        let token_source_str = env::var("TOKEN_SOURCE").unwrap_or_else(|_| "backend".to_string());
        let token_source = match token_source_str.to_lowercase().as_str() {
            "vendor" => TokenSource::Vendor,
            // Default to the backend for "backend" or any other value
            _ => TokenSource::Backend,
        };

        let avatar_api_key = env::var("AVATAR_API_KEY").ok();
        let avatar_token_url = env::var("AVATAR_TOKEN_URL")
            .unwrap_or_else(|_| "https://api.heygen.com/v1/streaming.create_token".to_string());
        let avatar_ws_url =
            env::var("AVATAR_WS_URL").unwrap_or_else(|_| "wss://api.heygen.com/v1".to_string());

        let relay_ws_url = match env::var("RELAY_WS_URL") {
            Ok(url) if url.trim().is_empty() => None,
            Ok(url) => Some(url),
            Err(_) => Some("ws://localhost:8080".to_string()),
        };

        let recognizer_ws_url =
            env::var("RECOGNIZER_WS_URL").unwrap_or_else(|_| "ws://localhost:2700".to_string());

        let speech_auto_restart = env_bool("SPEECH_AUTO_RESTART", true)?;
        let barge_in_on_push = env_bool("BARGE_IN_ON_PUSH", false)?;

        let interrupt_route_str =
            env::var("INTERRUPT_ROUTE").unwrap_or_else(|_| "avatar".to_string());
        let interrupt_route = match interrupt_route_str.to_lowercase().as_str() {
            "backend" => InterruptRoute::Backend,
            _ => InterruptRoute::Avatar,
        };

        // Voice goes to the backend pipeline when a relay is present, else
        // straight to the avatar; either can be forced explicitly.
        let voice_route = match env::var("VOICE_ROUTE") {
            Ok(value) => match value.to_lowercase().as_str() {
                "direct" => VoiceRoute::Direct,
                "backend" => VoiceRoute::Backend,
                _ => return Err(ConfigError::InvalidValue("VOICE_ROUTE", value)),
            },
            Err(_) => {
                if relay_ws_url.is_some() {
                    VoiceRoute::Backend
                } else {
                    VoiceRoute::Direct
                }
            }
        };

        let greeting = env::var("GREETING_TEXT").unwrap_or_else(|_| DEFAULT_GREETING.to_string());

        // Configure logging level from RUST_LOG, with a sensible default.
        let log_level_str = env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidLogLevel(log_level_str))?;

        let config = Self {
            backend_base_url,
            token_source,
            avatar_api_key,
            avatar_token_url,
            avatar_ws_url,
            relay_ws_url,
            recognizer_ws_url,
            speech_auto_restart,
            barge_in_on_push,
            interrupt_route,
            voice_route,
            greeting,
            log_level,
        };

        // Validate that the required API key is present for the selected source.
        if config.token_source == TokenSource::Vendor && config.avatar_api_key.is_none() {
            return Err(ConfigError::MissingVar(
                "AVATAR_API_KEY must be set for vendor token source".to_string(),
            ));
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_accepts_common_spellings() {
        assert!(parse_bool("X", "true").unwrap());
        assert!(parse_bool("X", "1").unwrap());
        assert!(parse_bool("X", "YES").unwrap());
        assert!(!parse_bool("X", "off").unwrap());
        assert!(!parse_bool("X", "0").unwrap());
    }

    #[test]
    fn test_parse_bool_rejects_garbage() {
        let result = parse_bool("SPEECH_AUTO_RESTART", "maybe");
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue("SPEECH_AUTO_RESTART", _))
        ));
    }
}
