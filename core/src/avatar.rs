use async_trait::async_trait;
use avatar_realtime_types::SessionConfig;
#[cfg(test)]
use mockall::automock;
use secrecy::SecretString;

#[derive(Debug, thiserror::Error)]
pub enum AvatarError {
    #[error("failed to create session: {0}")]
    SessionCreate(String),
    #[error("failed to dispatch speak task: {0}")]
    Speak(String),
    #[error("failed to interrupt task: {0}")]
    Interrupt(String),
    #[error("failed to stop session: {0}")]
    Stop(String),
}

// The `AvatarSession` trait is the coordinator's view of the vendor service.
// The concrete implementation lives in the service crate on top of the
// `avatar-realtime` client; tests substitute `MockAvatarSession` so the state
// machine can be exercised without a vendor connection.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AvatarSession: Send + Sync {
    /// Opens the vendor session with the supplied short-lived credential.
    /// The session identifier arrives afterwards as a `session.created` event.
    async fn start_session(
        &self,
        token: &SecretString,
        config: &SessionConfig,
    ) -> Result<(), AvatarError>;

    /// Submits one utterance for the avatar to speak verbatim.
    async fn speak(&self, session_id: &str, text: &str) -> Result<(), AvatarError>;

    /// Halts the in-flight utterance. Resolves once the vendor acknowledges;
    /// callers bound the wait with a timeout.
    async fn interrupt(&self, session_id: &str) -> Result<(), AvatarError>;

    /// Tears the session down. `session_id` is `None` when teardown races
    /// session creation and no identifier was ever recorded.
    async fn stop_session(&self, session_id: Option<String>) -> Result<(), AvatarError>;
}
