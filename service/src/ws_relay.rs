use crate::Input;
use futures_util::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

/// Inbound frame on the signaling socket. The backend pushes synthesized
/// reply text with `type: "text"`; anything else is ignored.
#[derive(Debug, Deserialize)]
struct RelayFrame {
    #[serde(rename = "type")]
    kind: String,
    transcription: Option<String>,
}

pub(crate) fn parse_frame(text: &str) -> Option<String> {
    let frame = serde_json::from_str::<RelayFrame>(text).ok()?;
    if frame.kind != "text" {
        return None;
    }
    frame.transcription.filter(|t| !t.trim().is_empty())
}

/// Listens on the backend relay socket and feeds pushed reply text into the
/// runtime loop. Connection lifecycle problems are logged only; the rest of
/// the application keeps running without the relay.
pub async fn run_relay_listener(url: String, input_tx: mpsc::Sender<Input>) {
    let (ws_stream, _) = match connect_async(&url).await {
        Ok(connected) => connected,
        Err(e) => {
            tracing::error!("failed to connect to relay socket {}: {}", url, e);
            return;
        }
    };
    tracing::info!("connected to relay socket for backend pushes");

    let (_, mut read) = ws_stream.split();
    while let Some(message) = read.next().await {
        match message {
            Ok(Message::Text(text)) => {
                tracing::debug!("relay frame: {}", text);
                if let Some(reply) = parse_frame(&text) {
                    tracing::info!("backend pushed reply text: \"{}\"", reply);
                    if input_tx.send(Input::BackendText(reply)).await.is_err() {
                        break;
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                tracing::warn!("unexpected binary frame on relay socket");
            }
            Ok(Message::Close(reason)) => {
                tracing::info!("relay socket closed: {:?}", reason);
                break;
            }
            Err(e) => {
                tracing::error!("relay socket error: {}", e);
                break;
            }
            _ => {}
        }
    }
    tracing::info!("relay listener finished");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_accepts_text_pushes() {
        let frame = r#"{ "type": "text", "transcription": "hola de nuevo" }"#;
        assert_eq!(parse_frame(frame), Some("hola de nuevo".to_string()));
    }

    #[test]
    fn test_parse_frame_rejects_other_kinds_and_empty_text() {
        assert_eq!(
            parse_frame(r#"{ "type": "audio", "transcription": "x" }"#),
            None
        );
        assert_eq!(parse_frame(r#"{ "type": "text" }"#), None);
        assert_eq!(
            parse_frame(r#"{ "type": "text", "transcription": "  " }"#),
            None
        );
        assert_eq!(parse_frame("not json"), None);
    }
}
