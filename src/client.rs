use crate::types;
use anyhow::Result;
use avatar_realtime_types::session::SessionConfig;
use futures_util::{SinkExt, StreamExt};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast::error::RecvError;
use tokio_tungstenite::tungstenite::Message;

use crate::client::stats::Stats;

mod config;
mod consts;
mod stats;
mod utils;

pub use config::Config;

pub type ClientTx = tokio::sync::mpsc::Sender<types::ClientEvent>;
type ServerTx = tokio::sync::broadcast::Sender<types::ServerEvent>;
pub type ServerRx = tokio::sync::broadcast::Receiver<types::ServerEvent>;

pub struct Client {
    capacity: usize,
    config: Config,
    c_tx: Option<ClientTx>,
    s_tx: Option<ServerTx>,
    stats: Arc<Mutex<Stats>>,
}

impl Client {
    fn new(capacity: usize, config: Config) -> Self {
        Self {
            capacity,
            config,
            c_tx: None,
            s_tx: None,
            stats: Arc::new(Mutex::new(Stats::new())),
        }
    }

    async fn connect(&mut self) -> Result<()> {
        if self.c_tx.is_some() {
            return Err(anyhow::anyhow!("already connected"));
        }

        let request = utils::build_request(&self.config)?;
        let (ws_stream, _) = tokio_tungstenite::connect_async(request).await?;

        let (mut write, mut read) = ws_stream.split();

        let (c_tx, mut c_rx) = tokio::sync::mpsc::channel(self.capacity);
        let (s_tx, _) = tokio::sync::broadcast::channel(self.capacity);

        self.c_tx = Some(c_tx.clone());
        self.s_tx = Some(s_tx.clone());

        tokio::spawn(async move {
            while let Some(event) = c_rx.recv().await {
                match serde_json::to_string(&event) {
                    Ok(text) => {
                        if let Err(e) = write.send(Message::Text(text)).await {
                            tracing::error!("failed to send message: {}", e);
                        }
                    }
                    Err(e) => {
                        tracing::error!("failed to serialize event: {}", e);
                    }
                }
            }
        });

        let stats = self.stats.clone();
        tokio::spawn(async move {
            while let Some(message) = read.next().await {
                let message = match message {
                    Err(e) => {
                        tracing::error!("failed to read message: {}", e);
                        break;
                    }
                    Ok(message) => message,
                };
                match message {
                    Message::Text(text) => {
                        if let Ok(json) = serde_json::from_str::<serde_json::Value>(&text) {
                            let event_type = json.get("type").and_then(|v| v.as_str());
                            tracing::debug!(
                                "received message: {}",
                                event_type.unwrap_or("unknown")
                            );
                        }

                        match serde_json::from_str::<types::ServerEvent>(&text) {
                            Ok(event) => {
                                match &event {
                                    types::ServerEvent::SessionCreated(_) => {
                                        if let Ok(mut stats_guard) = stats.lock() {
                                            stats_guard.record_session_created();
                                        }
                                    }
                                    types::ServerEvent::TaskFinished(_) => {
                                        if let Ok(mut stats_guard) = stats.lock() {
                                            stats_guard.record_task_finished();
                                        }
                                    }
                                    types::ServerEvent::TaskInterrupted(_) => {
                                        if let Ok(mut stats_guard) = stats.lock() {
                                            stats_guard.record_task_interrupted();
                                        }
                                    }
                                    _ => {}
                                }

                                if let Err(e) = s_tx.send(event) {
                                    tracing::error!("failed to send event: {}", e);
                                }
                            }
                            Err(e) => {
                                tracing::error!(
                                    "failed to deserialize event: {}, text=> {:?}",
                                    e,
                                    text
                                );
                            }
                        }
                    }
                    Message::Binary(bin) => {
                        tracing::warn!("unexpected binary message: {} bytes", bin.len());
                    }
                    Message::Close(reason) => {
                        tracing::info!("connection closed: {:?}", reason);
                        let reason = reason.map(|f| f.reason.to_string());
                        if let Err(e) = s_tx.send(types::ServerEvent::Close { reason }) {
                            tracing::error!("failed to send close event: {}", e);
                        }
                        break;
                    }
                    _ => {}
                }
            }
        });
        Ok(())
    }

    pub async fn server_events(&mut self) -> Result<ServerRx> {
        match self.s_tx {
            Some(ref tx) => Ok(tx.subscribe()),
            None => Err(anyhow::anyhow!("not connected yet")),
        }
    }

    pub fn stats(&self) -> Result<Stats> {
        if let Ok(stats_guard) = self.stats.lock() {
            Ok(stats_guard.clone())
        } else {
            Err(anyhow::anyhow!("failed to get stats"))
        }
    }

    async fn send_client_event(&mut self, event: types::ClientEvent) -> Result<()> {
        match self.c_tx {
            Some(ref tx) => {
                tx.send(event).await?;
                Ok(())
            }
            None => Err(anyhow::anyhow!("not connected yet")),
        }
    }

    pub async fn start_session(&mut self, config: SessionConfig) -> Result<()> {
        let event = types::ClientEvent::SessionStart(
            types::events::client::SessionStartEvent::new(config),
        );
        self.send_client_event(event).await
    }

    pub async fn speak(&mut self, session_id: &str, text: &str) -> Result<()> {
        let event = types::ClientEvent::TaskSpeak(types::events::client::TaskSpeakEvent::new(
            session_id, text,
        ));
        self.send_client_event(event).await
    }

    /// Sends the interrupt signal and waits until the vendor acknowledges
    /// that the in-flight task was halted. Callers are expected to bound the
    /// wait with a timeout; the server may never acknowledge a session it no
    /// longer knows.
    pub async fn interrupt(&mut self, session_id: &str) -> Result<()> {
        let mut events = self.server_events().await?;
        let event = types::ClientEvent::TaskInterrupt(
            types::events::client::TaskInterruptEvent::new(session_id),
        );
        self.send_client_event(event).await?;

        loop {
            match events.recv().await {
                Ok(types::ServerEvent::TaskInterrupted(ack))
                    if ack.session_id() == session_id =>
                {
                    return Ok(());
                }
                Ok(types::ServerEvent::Close { reason }) => {
                    return Err(anyhow::anyhow!(
                        "connection closed before interrupt ack: {:?}",
                        reason
                    ));
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("interrupt ack listener lagged, skipped {} events", skipped);
                    continue;
                }
                Err(RecvError::Closed) => {
                    return Err(anyhow::anyhow!("event channel closed before interrupt ack"));
                }
            }
        }
    }

    pub async fn stop_session(&mut self, session_id: &str) -> Result<()> {
        let event = types::ClientEvent::SessionStop(
            types::events::client::SessionStopEvent::new(session_id),
        );
        self.send_client_event(event).await
    }
}

pub async fn connect_with_config(capacity: usize, config: Config) -> Result<Client> {
    let mut client = Client::new(capacity, config);
    client.connect().await?;
    Ok(client)
}

pub async fn connect(token: &str) -> Result<Client> {
    let config = Config::builder().with_token(token).build();
    connect_with_config(1024, config).await
}
