use anyhow::{Context, Result};
use avatar_realtime_types::{ServerEvent, SessionConfig};
use clap::Parser;
use presenter_core::coordinator::{
    Coordinator, CoordinatorConfig, UtteranceOrigin, UtteranceRequest, VoiceRoute,
};
use presenter_core::relay::HttpBackendRelay;
use presenter_core::speech::SpeechCapture;
use presenter_core::token::{BackendTokenProvider, TokenProvider, VendorTokenProvider};
use presenter_core::Command;
use presenter_service::config::{Config, TokenSource, COMMAND_CAPACITY, INPUT_CAPACITY};
use presenter_service::recognizer::WsRecognizer;
use presenter_service::vendor::VendorAvatar;
use presenter_service::{ws_relay, Input};
use secrecy::SecretString;
use tokio::io::AsyncBufReadExt;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tracing_subscriber::fmt::time::ChronoLocal;

#[derive(Parser)]
struct Cli {
    /// Avatar identity to present, overriding the built-in default
    #[arg(long)]
    avatar_name: Option<String>,

    /// Target spoken language for the session
    #[arg(long)]
    language: Option<String>,

    /// Start a session immediately instead of waiting for a "start" command
    #[arg(long)]
    autostart: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load application configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    tracing::info!("Configuration loaded successfully. Starting presenter service...");

    // --- 3. Parse Command-Line Arguments ---
    let args = Cli::parse();

    let mut session = SessionConfig::builder();
    if let Some(avatar_name) = &args.avatar_name {
        session = session.with_avatar_name(avatar_name);
    }
    if let Some(language) = &args.language {
        session = session.with_language(language);
    }

    // --- 4. Build Collaborators ---
    let tokens: Box<dyn TokenProvider> = match config.token_source {
        TokenSource::Backend => Box::new(BackendTokenProvider::new(&config.backend_base_url)),
        TokenSource::Vendor => {
            let api_key = config
                .avatar_api_key
                .clone()
                .context("AVATAR_API_KEY must be set for vendor token source")?;
            Box::new(VendorTokenProvider::new(
                &config.avatar_token_url,
                SecretString::from(api_key),
            ))
        }
    };
    let avatar = VendorAvatar::new(&config.avatar_ws_url);
    let backend = HttpBackendRelay::new(&config.backend_base_url);

    let coordinator_config = CoordinatorConfig {
        session: session.build(),
        greeting: config.greeting.clone(),
        use_backend_greeting: config.voice_route == VoiceRoute::Backend,
        barge_in_on_push: config.barge_in_on_push,
        interrupt_route: config.interrupt_route,
        voice_route: config.voice_route,
        ..CoordinatorConfig::default()
    };
    let mut coordinator = Coordinator::new(coordinator_config);

    // --- 5. Application Setup ---

    // Every session-moving occurrence funnels into one input channel; the
    // event loop below is the only place coordinator state changes.
    let (input_tx, mut input_rx) = mpsc::channel::<Input>(INPUT_CAPACITY);
    // Command channel decoupling the coordinator from runtime side effects.
    let (command_tx, mut command_rx) = mpsc::channel::<Command>(COMMAND_CAPACITY);

    // This task executes the coordinator's commands. The headless runtime
    // renders the control surface into the log; a UI would bind media and
    // toggle controls here instead.
    let command_handler = tokio::spawn(async move {
        while let Some(command) = command_rx.recv().await {
            match command {
                Command::Ui(state) => {
                    tracing::info!(
                        "controls: start={} end={} mic={}",
                        state.start_enabled,
                        state.end_enabled,
                        state.mic_visible
                    );
                }
                Command::AttachMedia(media) => {
                    tracing::info!("binding media stream: {}", media.url());
                }
                Command::DetachMedia => {
                    tracing::info!("releasing media stream");
                }
                Command::ClearInput => {
                    tracing::debug!("clearing input field");
                }
            }
        }
    });

    // Relay socket listener, when this deployment has one.
    let relay_listener = config.relay_ws_url.clone().map(|url| {
        let relay_input = input_tx.clone();
        tokio::spawn(async move { ws_relay::run_relay_listener(url, relay_input).await })
    });

    // Voice capture: recognizer feed -> capture adapter -> input loop.
    let (recognition_tx, recognition_rx) = mpsc::channel(64);
    let (transcript_tx, mut transcript_rx) = mpsc::channel::<String>(64);
    let capture = SpeechCapture::new(
        WsRecognizer::new(&config.recognizer_ws_url, recognition_tx),
        config.speech_auto_restart,
    );
    let capture_task = {
        let capture = capture.clone();
        tokio::spawn(async move {
            if let Err(e) = capture.run(recognition_rx, transcript_tx).await {
                tracing::error!("voice capture failed: {}", e);
            }
        })
    };
    let transcript_input = input_tx.clone();
    let transcript_bridge = tokio::spawn(async move {
        while let Some(text) = transcript_rx.recv().await {
            if transcript_input.send(Input::Transcript(text)).await.is_err() {
                break;
            }
        }
    });

    // Minimal control surface on stdin, standing in for the start/end/speak
    // buttons: "start", "stop", "say <text>", "quit".
    let control_input = input_tx.clone();
    let control = tokio::spawn(async move {
        let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let line = line.trim();
            let input = if line == "start" {
                Input::Start
            } else if line == "stop" {
                Input::Stop
            } else if let Some(text) = line.strip_prefix("say ") {
                Input::TypedText(text.to_string())
            } else if line == "quit" {
                break;
            } else {
                if !line.is_empty() {
                    tracing::info!("commands: start | stop | say <text> | quit");
                }
                continue;
            };
            if control_input.send(input).await.is_err() {
                break;
            }
        }
    });

    if args.autostart {
        input_tx
            .send(Input::Start)
            .await
            .context("Failed to queue the initial start")?;
    }

    // --- 6. Event Loop ---
    let pump_input = input_tx.clone();
    let event_loop = tokio::spawn(async move {
        while let Some(input) = input_rx.recv().await {
            match input {
                Input::Start => {
                    match coordinator.start(&*tokens, &avatar, &command_tx).await {
                        Ok(epoch) => {
                            spawn_vendor_pump(&avatar, epoch, pump_input.clone()).await;
                        }
                        Err(e) => tracing::warn!("session not started: {}", e),
                    }
                }
                Input::Stop => {
                    if let Err(e) = coordinator.stop(&avatar, &command_tx).await {
                        tracing::error!("stop failed: {}", e);
                    }
                }
                Input::TypedText(text) => {
                    let request = UtteranceRequest::new(&text, UtteranceOrigin::UserTyped);
                    if let Err(e) = coordinator
                        .speak(request, &avatar, &backend, &command_tx)
                        .await
                    {
                        tracing::warn!("typed text dropped: {}", e);
                    }
                }
                Input::Transcript(text) => {
                    coordinator
                        .transcript(text, &avatar, &backend, &command_tx)
                        .await;
                }
                Input::BackendText(text) => {
                    coordinator
                        .backend_push(text, &avatar, &backend, &command_tx)
                        .await;
                }
                Input::Avatar(epoch, event) => match event {
                    ServerEvent::SessionCreated(data) => {
                        coordinator.session_created(epoch, data.session().session_id());
                    }
                    ServerEvent::StreamReady(data) => {
                        coordinator
                            .stream_ready(
                                epoch,
                                data.media().cloned(),
                                &avatar,
                                &backend,
                                &command_tx,
                            )
                            .await;
                    }
                    ServerEvent::StreamDisconnected(data) => {
                        tracing::info!("stream disconnected: {:?}", data.reason());
                        coordinator.stream_disconnected(epoch, &command_tx).await;
                    }
                    ServerEvent::Close { reason } => {
                        tracing::info!("vendor connection closed: {:?}", reason);
                        coordinator.stream_disconnected(epoch, &command_tx).await;
                    }
                    ServerEvent::Error(e) => {
                        tracing::error!("vendor error: {} (code: {:?})", e.message(), e.code());
                    }
                    ServerEvent::TaskStarted(data) => {
                        tracing::debug!("task started for {}", data.session_id());
                    }
                    ServerEvent::TaskFinished(data) => {
                        tracing::debug!(
                            "task finished for {} ({:?} ms)",
                            data.session_id(),
                            data.duration_ms()
                        );
                    }
                    ServerEvent::TaskInterrupted(data) => {
                        tracing::debug!("task interrupted for {}", data.session_id());
                    }
                    ServerEvent::SessionStopped(data) => {
                        tracing::debug!("session stopped: {}", data.session_id());
                    }
                },
            }
        }
    });

    tokio::select! {
        _ = event_loop => {},
        _ = command_handler => {},
        _ = capture_task => {},
        _ = transcript_bridge => {},
        _ = control => {
            tracing::info!("control stream closed, shutting down...");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl-C, shutting down...");
        }
    }
    if let Some(listener) = relay_listener {
        listener.abort();
    }
    if let Err(e) = capture.stop().await {
        tracing::warn!("failed to stop voice capture: {}", e);
    }
    tracing::info!("Shutting down...");
    Ok(())
}

/// Forwards vendor events into the input loop, tagged with the epoch the
/// session was started under so late events from a torn-down session are
/// recognizably stale.
async fn spawn_vendor_pump(avatar: &VendorAvatar, epoch: u64, input_tx: mpsc::Sender<Input>) {
    let Some(mut events) = avatar.take_events().await else {
        tracing::error!("vendor event subscription was not available");
        return;
    };
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if input_tx.send(Input::Avatar(epoch, event)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("vendor event pump lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}
