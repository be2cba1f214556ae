use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Pause before restarting a capture that ended on its own, so a recognizer
/// that went away does not get hammered with reconnects.
const RESTART_DELAY: Duration = Duration::from_millis(250);

#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("recognition engine failed to start: {0}")]
    Start(String),
    #[error("recognition engine failed to stop: {0}")]
    Stop(String),
}

/// Events produced by a recognition engine. Only finalized transcripts are
/// reported, one alternative each; interim results never reach the adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionEvent {
    Transcript(String),
    Error(String),
    Ended,
}

// The engine is opaque: the browser recognition API, a recognizer sidecar
// over a socket, anything that can be started and stopped and emits the
// events above through a channel handed over at construction.
#[async_trait]
pub trait RecognitionEngine: Send + Sync {
    async fn start(&self) -> Result<(), SpeechError>;
    async fn stop(&self) -> Result<(), SpeechError>;
}

/// Continuous voice capture over a [`RecognitionEngine`].
///
/// In always-listening mode (`auto_restart`) the engine is restarted on every
/// natural end, forming an effectively infinite sequence of transcripts. An
/// intentional [`stop`](SpeechCapture::stop) suppresses the restart and lets
/// the run loop terminate.
pub struct SpeechCapture<E> {
    engine: Arc<E>,
    auto_restart: bool,
    stopping: Arc<AtomicBool>,
}

impl<E> Clone for SpeechCapture<E> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            auto_restart: self.auto_restart,
            stopping: self.stopping.clone(),
        }
    }
}

impl<E: RecognitionEngine> SpeechCapture<E> {
    pub fn new(engine: E, auto_restart: bool) -> Self {
        Self {
            engine: Arc::new(engine),
            auto_restart,
            stopping: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Starts the engine and forwards finalized transcripts until the engine
    /// ends for good or capture is stopped intentionally.
    pub async fn run(
        &self,
        mut events: mpsc::Receiver<RecognitionEvent>,
        transcript_tx: mpsc::Sender<String>,
    ) -> Result<(), SpeechError> {
        self.engine.start().await?;
        tracing::info!("voice capture started");

        while let Some(event) = events.recv().await {
            match event {
                RecognitionEvent::Transcript(text) => {
                    let text = text.trim().to_owned();
                    if text.is_empty() {
                        continue;
                    }
                    tracing::info!("voice transcript: \"{}\"", text);
                    if transcript_tx.send(text).await.is_err() {
                        tracing::warn!("transcript consumer went away, stopping capture");
                        break;
                    }
                }
                RecognitionEvent::Error(code) => {
                    // The engine keeps running or follows up with Ended.
                    tracing::warn!("recognition error: {}", code);
                }
                RecognitionEvent::Ended => {
                    if self.stopping.load(Ordering::SeqCst) {
                        tracing::info!("voice capture stopped");
                        break;
                    }
                    if !self.auto_restart {
                        tracing::info!("voice capture ended");
                        break;
                    }
                    tracing::debug!("recognition ended, restarting");
                    tokio::time::sleep(RESTART_DELAY).await;
                    if let Err(e) = self.engine.start().await {
                        tracing::error!("failed to restart recognition: {}", e);
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    /// Intentional stop: no restart will follow the engine's end event.
    pub async fn stop(&self) -> Result<(), SpeechError> {
        self.stopping.store(true, Ordering::SeqCst);
        self.engine.stop().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    /// Engine double that counts starts and replays nothing on its own; the
    /// test feeds the event channel directly.
    struct CountingEngine {
        starts: AtomicUsize,
        stops: AtomicUsize,
    }

    impl CountingEngine {
        fn new() -> Self {
            Self {
                starts: AtomicUsize::new(0),
                stops: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl RecognitionEngine for CountingEngine {
        async fn start(&self) -> Result<(), SpeechError> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn stop(&self) -> Result<(), SpeechError> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_forwards_final_transcripts_and_skips_empty() {
        let capture = SpeechCapture::new(CountingEngine::new(), false);
        let (event_tx, event_rx) = mpsc::channel(8);
        let (transcript_tx, mut transcript_rx) = mpsc::channel(8);

        event_tx
            .send(RecognitionEvent::Transcript("hola".to_string()))
            .await
            .unwrap();
        event_tx
            .send(RecognitionEvent::Transcript("   ".to_string()))
            .await
            .unwrap();
        event_tx
            .send(RecognitionEvent::Transcript(" adios ".to_string()))
            .await
            .unwrap();
        event_tx.send(RecognitionEvent::Ended).await.unwrap();

        capture
            .run(event_rx, transcript_tx)
            .await
            .expect("run should complete");

        assert_eq!(transcript_rx.try_recv().unwrap(), "hola");
        assert_eq!(transcript_rx.try_recv().unwrap(), "adios");
        assert!(transcript_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_auto_restart_restarts_engine_on_natural_end() {
        let capture = SpeechCapture::new(CountingEngine::new(), true);
        let (event_tx, event_rx) = mpsc::channel(8);
        let (transcript_tx, _transcript_rx) = mpsc::channel(8);

        event_tx.send(RecognitionEvent::Ended).await.unwrap();
        event_tx.send(RecognitionEvent::Ended).await.unwrap();
        drop(event_tx); // channel closing terminates the loop

        capture
            .run(event_rx, transcript_tx)
            .await
            .expect("run should complete");

        // Initial start plus one restart per natural end.
        assert_eq!(capture.engine.starts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_no_restart_after_intentional_stop() {
        let capture = SpeechCapture::new(CountingEngine::new(), true);
        let (event_tx, event_rx) = mpsc::channel(8);
        let (transcript_tx, _transcript_rx) = mpsc::channel(8);

        capture.stop().await.expect("stop should succeed");
        event_tx.send(RecognitionEvent::Ended).await.unwrap();

        capture
            .run(event_rx, transcript_tx)
            .await
            .expect("run should complete");

        assert_eq!(capture.engine.starts.load(Ordering::SeqCst), 1);
        assert_eq!(capture.engine.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recognition_errors_do_not_end_capture() {
        let capture = SpeechCapture::new(CountingEngine::new(), false);
        let (event_tx, event_rx) = mpsc::channel(8);
        let (transcript_tx, mut transcript_rx) = mpsc::channel(8);

        event_tx
            .send(RecognitionEvent::Error("no-speech".to_string()))
            .await
            .unwrap();
        event_tx
            .send(RecognitionEvent::Transcript("sigo aqui".to_string()))
            .await
            .unwrap();
        event_tx.send(RecognitionEvent::Ended).await.unwrap();

        capture
            .run(event_rx, transcript_tx)
            .await
            .expect("run should complete");

        assert_eq!(transcript_rx.try_recv().unwrap(), "sigo aqui");
    }
}
