use async_trait::async_trait;
use futures_util::StreamExt;
use presenter_core::speech::{RecognitionEngine, RecognitionEvent, SpeechError};
use serde::Deserialize;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

/// Frame pushed by the recognizer sidecar. Interim hypotheses carry
/// `is_final: false` and are dropped here; the adapter only ever sees
/// finalized transcripts.
#[derive(Debug, Deserialize)]
struct RecognizerFrame {
    transcript: String,
    #[serde(default)]
    is_final: bool,
}

pub(crate) fn parse_transcript(text: &str) -> Option<String> {
    let frame = serde_json::from_str::<RecognizerFrame>(text).ok()?;
    if !frame.is_final || frame.transcript.trim().is_empty() {
        return None;
    }
    Some(frame.transcript)
}

/// `RecognitionEngine` over a recognizer WebSocket feed. Each `start` opens a
/// fresh connection; the feed closing counts as a natural end, which lets the
/// capture adapter's auto-restart reconnect.
pub struct WsRecognizer {
    url: String,
    events: mpsc::Sender<RecognitionEvent>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl WsRecognizer {
    pub fn new(url: &str, events: mpsc::Sender<RecognitionEvent>) -> Self {
        Self {
            url: url.to_string(),
            events,
            task: Mutex::new(None),
        }
    }
}

#[async_trait]
impl RecognitionEngine for WsRecognizer {
    async fn start(&self) -> Result<(), SpeechError> {
        let mut task = self.task.lock().await;
        if let Some(previous) = task.take() {
            previous.abort();
        }

        let url = self.url.clone();
        let events = self.events.clone();
        *task = Some(tokio::spawn(async move {
            match connect_async(&url).await {
                Ok((ws_stream, _)) => {
                    tracing::debug!("connected to recognizer at {}", url);
                    let (_, mut read) = ws_stream.split();
                    while let Some(message) = read.next().await {
                        match message {
                            Ok(Message::Text(text)) => {
                                if let Some(transcript) = parse_transcript(&text) {
                                    if events
                                        .send(RecognitionEvent::Transcript(transcript))
                                        .await
                                        .is_err()
                                    {
                                        return;
                                    }
                                }
                            }
                            Ok(Message::Close(_)) => break,
                            Err(e) => {
                                let _ = events
                                    .send(RecognitionEvent::Error(e.to_string()))
                                    .await;
                                break;
                            }
                            _ => {}
                        }
                    }
                }
                Err(e) => {
                    let _ = events.send(RecognitionEvent::Error(e.to_string())).await;
                }
            }
            let _ = events.send(RecognitionEvent::Ended).await;
        }));
        Ok(())
    }

    async fn stop(&self) -> Result<(), SpeechError> {
        if let Some(task) = self.task.lock().await.take() {
            task.abort();
        }
        // The aborted task cannot deliver its own end event.
        let _ = self.events.send(RecognitionEvent::Ended).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_transcript_keeps_final_results_only() {
        assert_eq!(
            parse_transcript(r#"{ "transcript": "hola", "is_final": true }"#),
            Some("hola".to_string())
        );
        assert_eq!(
            parse_transcript(r#"{ "transcript": "hol", "is_final": false }"#),
            None
        );
        // Missing flag means interim.
        assert_eq!(parse_transcript(r#"{ "transcript": "hola" }"#), None);
        assert_eq!(
            parse_transcript(r#"{ "transcript": " ", "is_final": true }"#),
            None
        );
        assert_eq!(parse_transcript("garbage"), None);
    }
}
