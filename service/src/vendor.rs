use async_trait::async_trait;
use avatar_realtime::{Client, Config, ServerRx};
use avatar_realtime_types::SessionConfig;
use presenter_core::avatar::{AvatarError, AvatarSession};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Mutex;

/// An adapter that implements the coordinator's `AvatarSession` trait on top
/// of the `avatar-realtime` client. The connection is opened lazily with the
/// short-lived token handed to `start_session`, and dropped on teardown so a
/// later start gets a fresh connection.
pub struct VendorAvatar {
    ws_url: String,
    client: Mutex<Option<Client>>,
    // Subscription captured at connect time, before the start event is sent,
    // so the runtime's pump cannot miss `session.created`.
    pending_events: Mutex<Option<ServerRx>>,
}

impl VendorAvatar {
    pub fn new(ws_url: &str) -> Self {
        Self {
            ws_url: ws_url.to_string(),
            client: Mutex::new(None),
            pending_events: Mutex::new(None),
        }
    }

    /// Hands the vendor event subscription to the runtime. Available once per
    /// `start_session`.
    pub async fn take_events(&self) -> Option<ServerRx> {
        self.pending_events.lock().await.take()
    }
}

#[async_trait]
impl AvatarSession for VendorAvatar {
    async fn start_session(
        &self,
        token: &SecretString,
        config: &SessionConfig,
    ) -> Result<(), AvatarError> {
        let mut guard = self.client.lock().await;
        if guard.is_some() {
            return Err(AvatarError::SessionCreate(
                "a vendor connection is already open".to_string(),
            ));
        }

        let ws_config = Config::builder()
            .with_base_url(&self.ws_url)
            .with_token(token.expose_secret())
            .build();
        let mut client = avatar_realtime::connect_with_config(1024, ws_config)
            .await
            .map_err(|e| AvatarError::SessionCreate(e.to_string()))?;

        let events = client
            .server_events()
            .await
            .map_err(|e| AvatarError::SessionCreate(e.to_string()))?;
        client
            .start_session(config.clone())
            .await
            .map_err(|e| AvatarError::SessionCreate(e.to_string()))?;

        *self.pending_events.lock().await = Some(events);
        *guard = Some(client);
        Ok(())
    }

    async fn speak(&self, session_id: &str, text: &str) -> Result<(), AvatarError> {
        let mut guard = self.client.lock().await;
        let client = guard
            .as_mut()
            .ok_or_else(|| AvatarError::Speak("not connected".to_string()))?;
        client
            .speak(session_id, text)
            .await
            .map_err(|e| AvatarError::Speak(e.to_string()))
    }

    async fn interrupt(&self, session_id: &str) -> Result<(), AvatarError> {
        let mut guard = self.client.lock().await;
        let client = guard
            .as_mut()
            .ok_or_else(|| AvatarError::Interrupt("not connected".to_string()))?;
        client
            .interrupt(session_id)
            .await
            .map_err(|e| AvatarError::Interrupt(e.to_string()))
    }

    async fn stop_session(&self, session_id: Option<String>) -> Result<(), AvatarError> {
        // Take the connection down regardless of what the stop call returns.
        let client = self.client.lock().await.take();
        self.pending_events.lock().await.take();

        let Some(mut client) = client else {
            return Ok(());
        };
        if let Some(session_id) = session_id {
            client
                .stop_session(&session_id)
                .await
                .map_err(|e| AvatarError::Stop(e.to_string()))?;
        }
        Ok(())
    }
}
