use crate::avatar::AvatarSession;
use crate::relay::BackendRelay;
use crate::token::TokenProvider;
use crate::Command;
use avatar_realtime_types::{MediaDescriptor, SessionConfig};
use std::time::Duration;
use tokio::sync::mpsc;

pub const DEFAULT_GREETING: &str = "hola soy marcuss, ¿como te llamas?";
pub const DEFAULT_INTERRUPT_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionStatus {
    Idle,
    Starting,
    Active,
    Ending,
}

/// Derived control-surface state. A pure function of `SessionStatus`; the
/// runtime renders it and must never feed it back as session truth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UiState {
    pub start_enabled: bool,
    pub end_enabled: bool,
    pub mic_visible: bool,
}

impl UiState {
    pub fn from_status(status: SessionStatus) -> Self {
        match status {
            SessionStatus::Idle => Self {
                start_enabled: true,
                end_enabled: false,
                mic_visible: false,
            },
            SessionStatus::Starting | SessionStatus::Ending => Self {
                start_enabled: false,
                end_enabled: false,
                mic_visible: false,
            },
            SessionStatus::Active => Self {
                start_enabled: false,
                end_enabled: true,
                mic_visible: true,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UtteranceOrigin {
    UserTyped,
    VoiceTranscript,
    BackendPush,
}

/// One unit of text bound for the avatar's speak operation.
#[derive(Debug, Clone)]
pub struct UtteranceRequest {
    pub text: String,
    pub origin: UtteranceOrigin,
}

impl UtteranceRequest {
    pub fn new(text: &str, origin: UtteranceOrigin) -> Self {
        Self {
            text: text.to_string(),
            origin,
        }
    }
}

/// Which collaborator carries the interrupt signal. The deployed variants
/// disagree: one interrupts through the vendor task API, the other proxies
/// through the backend's interruption endpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InterruptRoute {
    Avatar,
    Backend,
}

/// Where finalized voice transcripts go: straight to the avatar (barge-in),
/// or to the backend pipeline which pushes the reply over the relay socket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VoiceRoute {
    Direct,
    Backend,
}

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub session: SessionConfig,
    /// Seed text for the welcome message; also the spoken fallback when the
    /// backend greeting call is disabled or fails.
    pub greeting: String,
    pub use_backend_greeting: bool,
    pub barge_in_on_push: bool,
    pub interrupt_route: InterruptRoute,
    pub voice_route: VoiceRoute,
    pub interrupt_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            greeting: DEFAULT_GREETING.to_string(),
            use_backend_greeting: true,
            barge_in_on_push: false,
            interrupt_route: InterruptRoute::Avatar,
            voice_route: VoiceRoute::Backend,
            interrupt_timeout: DEFAULT_INTERRUPT_TIMEOUT,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error("token acquisition failed: {0}")]
    Auth(String),
    #[error("session creation failed: {0}")]
    SessionCreate(String),
    #[error("a session is already starting or active")]
    AlreadyRunning,
    #[error("no active session")]
    NotActive,
    #[error("utterance text is empty")]
    EmptyUtterance,
}

struct ActiveSession {
    /// Vendor identifier; None until `session.created` arrives.
    session_id: Option<String>,
    /// Set once the welcome message has been dispatched for this session.
    greeted: bool,
}

/// The session coordinator. Owns the single `ActiveSession` and serializes
/// every transition: the runtime drives it from one mpsc loop, so a speak can
/// never race past a half-completed interrupt. Vendor callbacks that resolve
/// after teardown are discarded through the epoch guard.
pub struct Coordinator {
    status: SessionStatus,
    session: Option<ActiveSession>,
    epoch: u64,
    config: CoordinatorConfig,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self {
            status: SessionStatus::Idle,
            session: None,
            epoch: 0,
            config,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn ui_state(&self) -> UiState {
        UiState::from_status(self.status)
    }

    /// The epoch of the session currently being started or running. Events
    /// fed back into the coordinator must carry the epoch they were observed
    /// under; anything older is stale and ignored.
    pub fn current_epoch(&self) -> u64 {
        self.epoch
    }

    fn session_id(&self) -> Option<String> {
        self.session.as_ref().and_then(|s| s.session_id.clone())
    }

    async fn set_status(&mut self, status: SessionStatus, command_tx: &mpsc::Sender<Command>) {
        self.status = status;
        send_command(command_tx, Command::Ui(UiState::from_status(status))).await;
    }

    async fn reset(&mut self, command_tx: &mpsc::Sender<Command>) {
        send_command(command_tx, Command::DetachMedia).await;
        self.session = None;
        self.set_status(SessionStatus::Idle, command_tx).await;
    }

    /// Begins a session: credential first, then the vendor create call. Any
    /// failure lands back in `Idle`. Returns the epoch the runtime should tag
    /// this session's vendor events with.
    pub async fn start<T: TokenProvider + ?Sized, A: AvatarSession + ?Sized>(
        &mut self,
        tokens: &T,
        avatar: &A,
        command_tx: &mpsc::Sender<Command>,
    ) -> Result<u64, CoordinatorError> {
        if self.status != SessionStatus::Idle {
            tracing::warn!("start requested while session is {:?}, ignoring", self.status);
            return Err(CoordinatorError::AlreadyRunning);
        }

        self.epoch += 1;
        let epoch = self.epoch;
        self.set_status(SessionStatus::Starting, command_tx).await;

        let token = match tokens.access_token().await {
            Ok(token) => token,
            Err(e) => {
                tracing::error!("failed to acquire session token: {}", e);
                self.reset(command_tx).await;
                return Err(CoordinatorError::Auth(e.to_string()));
            }
        };

        if let Err(e) = avatar.start_session(&token, &self.config.session).await {
            tracing::error!("failed to create avatar session: {}", e);
            self.reset(command_tx).await;
            return Err(CoordinatorError::SessionCreate(e.to_string()));
        }

        self.session = Some(ActiveSession {
            session_id: None,
            greeted: false,
        });
        tracing::info!("avatar session requested, waiting for stream");
        Ok(epoch)
    }

    /// Records the vendor-assigned identifier. The session stays `Starting`
    /// until the stream itself is announced.
    pub fn session_created(&mut self, epoch: u64, session_id: &str) {
        if epoch != self.epoch || self.status != SessionStatus::Starting {
            tracing::debug!("ignoring stale session.created for {}", session_id);
            return;
        }
        if let Some(session) = self.session.as_mut() {
            tracing::info!("session created: {}", session_id);
            session.session_id = Some(session_id.to_string());
        }
    }

    /// Binds the media stream and goes `Active`, dispatching the welcome
    /// message exactly once per session. A ready event without media is
    /// logged and leaves the state untouched.
    pub async fn stream_ready<A: AvatarSession + ?Sized, R: BackendRelay + ?Sized>(
        &mut self,
        epoch: u64,
        media: Option<MediaDescriptor>,
        avatar: &A,
        relay: &R,
        command_tx: &mpsc::Sender<Command>,
    ) {
        if epoch != self.epoch || self.status != SessionStatus::Starting {
            tracing::debug!("ignoring stale stream.ready");
            return;
        }
        let Some(media) = media else {
            tracing::error!("stream ready without media attached");
            return;
        };
        let Some(session_id) = self.session_id() else {
            tracing::error!("stream ready before session was created");
            return;
        };

        send_command(command_tx, Command::AttachMedia(media)).await;
        self.set_status(SessionStatus::Active, command_tx).await;

        let greeted = self
            .session
            .as_ref()
            .map(|s| s.greeted)
            .unwrap_or(true);
        if greeted {
            return;
        }
        if let Some(session) = self.session.as_mut() {
            session.greeted = true;
        }

        let text = if self.config.use_backend_greeting {
            match relay.greeting(&session_id, &self.config.greeting).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!("backend greeting failed, using fixed text: {}", e);
                    self.config.greeting.clone()
                }
            }
        } else {
            self.config.greeting.clone()
        };

        let request = UtteranceRequest::new(&text, UtteranceOrigin::BackendPush);
        if let Err(e) = self.speak(request, avatar, relay, command_tx).await {
            tracing::warn!("welcome message dropped: {}", e);
        }
    }

    /// Dispatches one utterance to the avatar. Voice transcripts barge in:
    /// the in-flight utterance is interrupted and the new one waits for the
    /// acknowledgment (bounded by the configured timeout). Typed input never
    /// interrupts. Speak and interrupt failures are logged and the session
    /// stays `Active`; the utterance is simply dropped.
    pub async fn speak<A: AvatarSession + ?Sized, R: BackendRelay + ?Sized>(
        &mut self,
        request: UtteranceRequest,
        avatar: &A,
        relay: &R,
        command_tx: &mpsc::Sender<Command>,
    ) -> Result<(), CoordinatorError> {
        if self.status != SessionStatus::Active {
            tracing::warn!("speak requested while session is {:?}, dropping", self.status);
            return Err(CoordinatorError::NotActive);
        }
        if request.text.trim().is_empty() {
            return Err(CoordinatorError::EmptyUtterance);
        }
        let session_id = self.session_id().ok_or(CoordinatorError::NotActive)?;

        let barge_in = match request.origin {
            UtteranceOrigin::VoiceTranscript => true,
            UtteranceOrigin::BackendPush => self.config.barge_in_on_push,
            UtteranceOrigin::UserTyped => false,
        };
        if barge_in {
            self.interrupt_current(&session_id, avatar, relay).await;
        }

        if let Err(e) = avatar.speak(&session_id, &request.text).await {
            tracing::error!("speak task failed: {}", e);
        }

        if request.origin == UtteranceOrigin::UserTyped {
            send_command(command_tx, Command::ClearInput).await;
        }
        Ok(())
    }

    /// Issues the interrupt signal over the configured route and waits for
    /// the acknowledgment or the timeout, whichever comes first. Failure is
    /// never fatal; the new utterance is dispatched regardless.
    async fn interrupt_current<A: AvatarSession + ?Sized, R: BackendRelay + ?Sized>(
        &self,
        session_id: &str,
        avatar: &A,
        relay: &R,
    ) {
        let timeout = self.config.interrupt_timeout;
        let acked = match self.config.interrupt_route {
            InterruptRoute::Avatar => {
                tokio::time::timeout(timeout, avatar.interrupt(session_id))
                    .await
                    .map(|result| result.map_err(|e| e.to_string()))
            }
            InterruptRoute::Backend => tokio::time::timeout(timeout, relay.interrupt(session_id))
                .await
                .map(|result| result.map(|_ack| ()).map_err(|e| e.to_string())),
        };
        match acked {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("interrupt failed, speaking anyway: {}", e),
            Err(_) => tracing::warn!("interrupt not acknowledged within {:?}", timeout),
        }
    }

    /// Routes a finalized voice transcript: to the backend pipeline, or
    /// straight to the avatar with barge-in. Dropped transcripts and relay
    /// failures are logged only; capture continues either way.
    pub async fn transcript<A: AvatarSession + ?Sized, R: BackendRelay + ?Sized>(
        &mut self,
        text: String,
        avatar: &A,
        relay: &R,
        command_tx: &mpsc::Sender<Command>,
    ) {
        match self.config.voice_route {
            VoiceRoute::Backend => {
                if let Err(e) = relay.submit_transcript(&text).await {
                    tracing::warn!("failed to forward transcript: {}", e);
                }
            }
            VoiceRoute::Direct => {
                let request = UtteranceRequest::new(&text, UtteranceOrigin::VoiceTranscript);
                if let Err(e) = self.speak(request, avatar, relay, command_tx).await {
                    tracing::debug!("transcript dropped: {}", e);
                }
            }
        }
    }

    /// Handles reply text pushed by the backend over the relay socket.
    pub async fn backend_push<A: AvatarSession + ?Sized, R: BackendRelay + ?Sized>(
        &mut self,
        text: String,
        avatar: &A,
        relay: &R,
        command_tx: &mpsc::Sender<Command>,
    ) {
        let request = UtteranceRequest::new(&text, UtteranceOrigin::BackendPush);
        if let Err(e) = self.speak(request, avatar, relay, command_tx).await {
            tracing::debug!("pushed reply dropped: {}", e);
        }
    }

    /// Vendor-initiated disconnect. Not an error: detach, clear, back to
    /// `Idle` so the next start is possible.
    pub async fn stream_disconnected(
        &mut self,
        epoch: u64,
        command_tx: &mpsc::Sender<Command>,
    ) {
        if epoch != self.epoch || self.status == SessionStatus::Idle {
            tracing::debug!("ignoring stale stream.disconnected");
            return;
        }
        tracing::info!("stream disconnected");
        self.reset(command_tx).await;
    }

    /// Tears the session down. Best-effort: the UI always lands unlocked in
    /// `Idle`, even when the vendor teardown call fails.
    pub async fn stop<A: AvatarSession + ?Sized>(
        &mut self,
        avatar: &A,
        command_tx: &mpsc::Sender<Command>,
    ) -> Result<(), CoordinatorError> {
        match self.status {
            SessionStatus::Idle | SessionStatus::Ending => {
                tracing::debug!("stop requested without a session, ignoring");
                return Ok(());
            }
            SessionStatus::Starting | SessionStatus::Active => {}
        }

        self.set_status(SessionStatus::Ending, command_tx).await;

        let session_id = self.session_id();
        if let Err(e) = avatar.stop_session(session_id).await {
            tracing::error!("session teardown failed: {}", e);
        }

        self.reset(command_tx).await;
        Ok(())
    }
}

async fn send_command(command_tx: &mpsc::Sender<Command>, command: Command) {
    if let Err(e) = command_tx.send(command).await {
        tracing::warn!("failed to send command to runtime: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avatar::{AvatarError, MockAvatarSession};
    use crate::relay::{MockBackendRelay, RelayError};
    use crate::token::{MockTokenProvider, TokenError};
    use secrecy::SecretString;

    fn test_config() -> CoordinatorConfig {
        CoordinatorConfig {
            use_backend_greeting: false,
            interrupt_timeout: Duration::from_millis(50),
            voice_route: VoiceRoute::Direct,
            ..CoordinatorConfig::default()
        }
    }

    fn tokens_ok() -> MockTokenProvider {
        let mut tokens = MockTokenProvider::new();
        tokens
            .expect_access_token()
            .returning(|| Ok(SecretString::from("abc".to_string())));
        tokens
    }

    fn media() -> MediaDescriptor {
        MediaDescriptor::new("https://stream.test/s1").with_kind("webrtc")
    }

    fn drain(rx: &mut mpsc::Receiver<Command>) -> Vec<Command> {
        let mut commands = vec![];
        while let Ok(command) = rx.try_recv() {
            commands.push(command);
        }
        commands
    }

    /// Drives a fresh coordinator into `Active` with session id "s1".
    async fn start_to_active(
        coordinator: &mut Coordinator,
        avatar: &MockAvatarSession,
        relay: &MockBackendRelay,
        command_tx: &mpsc::Sender<Command>,
    ) -> u64 {
        let tokens = tokens_ok();
        let epoch = coordinator
            .start(&tokens, avatar, command_tx)
            .await
            .expect("start should succeed");
        coordinator.session_created(epoch, "s1");
        coordinator
            .stream_ready(epoch, Some(media()), avatar, relay, command_tx)
            .await;
        assert_eq!(coordinator.status(), SessionStatus::Active);
        epoch
    }

    #[tokio::test]
    async fn test_start_speaks_greeting_once_without_interrupt() {
        let tokens = tokens_ok();
        let mut avatar = MockAvatarSession::new();
        avatar.expect_start_session().times(1).returning(|_, _| Ok(()));
        avatar.expect_interrupt().never();
        avatar
            .expect_speak()
            .withf(|sid, text| sid == "s1" && text == DEFAULT_GREETING)
            .times(1)
            .returning(|_, _| Ok(()));
        let relay = MockBackendRelay::new();
        let (command_tx, mut command_rx) = mpsc::channel(32);

        let mut coordinator = Coordinator::new(test_config());
        let epoch = coordinator
            .start(&tokens, &avatar, &command_tx)
            .await
            .expect("start should succeed");
        assert_eq!(coordinator.status(), SessionStatus::Starting);

        coordinator.session_created(epoch, "s1");
        assert_eq!(coordinator.status(), SessionStatus::Starting);

        coordinator
            .stream_ready(epoch, Some(media()), &avatar, &relay, &command_tx)
            .await;
        assert_eq!(coordinator.status(), SessionStatus::Active);

        let commands = drain(&mut command_rx);
        assert!(commands.contains(&Command::AttachMedia(media())));
        assert!(commands.contains(&Command::Ui(UiState::from_status(SessionStatus::Active))));

        // A repeated ready event must not greet again.
        coordinator
            .stream_ready(epoch, Some(media()), &avatar, &relay, &command_tx)
            .await;
    }

    #[tokio::test]
    async fn test_second_start_is_rejected_until_idle() {
        let tokens = tokens_ok();
        let mut avatar = MockAvatarSession::new();
        avatar.expect_start_session().times(1).returning(|_, _| Ok(()));
        let (command_tx, _command_rx) = mpsc::channel(32);

        let mut coordinator = Coordinator::new(test_config());
        coordinator
            .start(&tokens, &avatar, &command_tx)
            .await
            .expect("first start should succeed");

        // Still `Starting`: rejected, no second create call.
        let result = coordinator.start(&tokens, &avatar, &command_tx).await;
        assert!(matches!(result, Err(CoordinatorError::AlreadyRunning)));
    }

    #[tokio::test]
    async fn test_speak_rejected_when_not_active() {
        let mut avatar = MockAvatarSession::new();
        avatar.expect_speak().never();
        avatar.expect_interrupt().never();
        let relay = MockBackendRelay::new();
        let (command_tx, _command_rx) = mpsc::channel(32);

        let mut coordinator = Coordinator::new(test_config());
        let request = UtteranceRequest::new("hola", UtteranceOrigin::UserTyped);
        let result = coordinator.speak(request, &avatar, &relay, &command_tx).await;
        assert!(matches!(result, Err(CoordinatorError::NotActive)));
    }

    #[tokio::test]
    async fn test_empty_utterance_rejected() {
        let mut avatar = MockAvatarSession::new();
        avatar.expect_start_session().returning(|_, _| Ok(()));
        avatar.expect_speak().times(1).returning(|_, _| Ok(())); // greeting only
        let relay = MockBackendRelay::new();
        let (command_tx, _command_rx) = mpsc::channel(32);

        let mut coordinator = Coordinator::new(test_config());
        start_to_active(&mut coordinator, &avatar, &relay, &command_tx).await;

        let request = UtteranceRequest::new("   ", UtteranceOrigin::UserTyped);
        let result = coordinator.speak(request, &avatar, &relay, &command_tx).await;
        assert!(matches!(result, Err(CoordinatorError::EmptyUtterance)));
    }

    #[tokio::test]
    async fn test_voice_transcript_interrupts_before_speaking() {
        let mut avatar = MockAvatarSession::new();
        avatar.expect_start_session().returning(|_, _| Ok(()));
        avatar.expect_speak().times(1).returning(|_, _| Ok(())); // greeting
        let relay = MockBackendRelay::new();
        let (command_tx, _command_rx) = mpsc::channel(32);

        let mut coordinator = Coordinator::new(test_config());
        start_to_active(&mut coordinator, &avatar, &relay, &command_tx).await;

        let mut seq = mockall::Sequence::new();
        avatar
            .expect_interrupt()
            .withf(|sid| sid == "s1")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        avatar
            .expect_speak()
            .withf(|sid, text| sid == "s1" && text == "hola")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        let request = UtteranceRequest::new("hola", UtteranceOrigin::VoiceTranscript);
        coordinator
            .speak(request, &avatar, &relay, &command_tx)
            .await
            .expect("speak should succeed");
    }

    #[tokio::test]
    async fn test_typed_input_never_interrupts_and_clears_field() {
        let mut avatar = MockAvatarSession::new();
        avatar.expect_start_session().returning(|_, _| Ok(()));
        avatar.expect_interrupt().never();
        avatar.expect_speak().times(2).returning(|_, _| Ok(())); // greeting + typed
        let relay = MockBackendRelay::new();
        let (command_tx, mut command_rx) = mpsc::channel(32);

        let mut coordinator = Coordinator::new(test_config());
        start_to_active(&mut coordinator, &avatar, &relay, &command_tx).await;
        drain(&mut command_rx);

        let request = UtteranceRequest::new("buenas tardes", UtteranceOrigin::UserTyped);
        coordinator
            .speak(request, &avatar, &relay, &command_tx)
            .await
            .expect("speak should succeed");

        let commands = drain(&mut command_rx);
        assert!(commands.contains(&Command::ClearInput));
    }

    #[tokio::test]
    async fn test_backend_push_does_not_interrupt_by_default() {
        let mut avatar = MockAvatarSession::new();
        avatar.expect_start_session().returning(|_, _| Ok(()));
        avatar.expect_interrupt().never();
        avatar.expect_speak().times(2).returning(|_, _| Ok(()));
        let relay = MockBackendRelay::new();
        let (command_tx, _command_rx) = mpsc::channel(32);

        let mut coordinator = Coordinator::new(test_config());
        start_to_active(&mut coordinator, &avatar, &relay, &command_tx).await;

        coordinator
            .backend_push("respuesta".to_string(), &avatar, &relay, &command_tx)
            .await;
    }

    #[tokio::test]
    async fn test_backend_push_interrupts_when_configured() {
        let mut avatar = MockAvatarSession::new();
        avatar.expect_start_session().returning(|_, _| Ok(()));
        // Greeting barges in too under this configuration: one interrupt for
        // it and one for the pushed reply.
        avatar.expect_interrupt().times(2).returning(|_| Ok(()));
        avatar.expect_speak().times(2).returning(|_, _| Ok(()));
        let relay = MockBackendRelay::new();
        let (command_tx, _command_rx) = mpsc::channel(32);

        let mut config = test_config();
        config.barge_in_on_push = true;
        let mut coordinator = Coordinator::new(config);
        start_to_active(&mut coordinator, &avatar, &relay, &command_tx).await;

        coordinator
            .backend_push("respuesta".to_string(), &avatar, &relay, &command_tx)
            .await;
    }

    #[tokio::test]
    async fn test_interrupt_timeout_does_not_block_speak() {
        struct StallingAvatar;

        #[async_trait::async_trait]
        impl AvatarSession for StallingAvatar {
            async fn start_session(
                &self,
                _token: &SecretString,
                _config: &SessionConfig,
            ) -> Result<(), AvatarError> {
                Ok(())
            }
            async fn speak(&self, _session_id: &str, _text: &str) -> Result<(), AvatarError> {
                Ok(())
            }
            async fn interrupt(&self, _session_id: &str) -> Result<(), AvatarError> {
                // Acknowledgment that never arrives.
                std::future::pending::<()>().await;
                Ok(())
            }
            async fn stop_session(
                &self,
                _session_id: Option<String>,
            ) -> Result<(), AvatarError> {
                Ok(())
            }
        }

        let avatar = StallingAvatar;
        let relay = MockBackendRelay::new();
        let (command_tx, _command_rx) = mpsc::channel(32);

        let mut coordinator = Coordinator::new(test_config());
        let tokens = tokens_ok();
        let epoch = coordinator
            .start(&tokens, &avatar, &command_tx)
            .await
            .expect("start should succeed");
        coordinator.session_created(epoch, "s1");
        coordinator
            .stream_ready(epoch, Some(media()), &avatar, &relay, &command_tx)
            .await;

        let request = UtteranceRequest::new("hola", UtteranceOrigin::VoiceTranscript);
        coordinator
            .speak(request, &avatar, &relay, &command_tx)
            .await
            .expect("speak should dispatch after the interrupt timeout");
    }

    #[tokio::test]
    async fn test_interrupt_routed_through_backend_when_configured() {
        let mut avatar = MockAvatarSession::new();
        avatar.expect_start_session().returning(|_, _| Ok(()));
        avatar.expect_interrupt().never();
        avatar.expect_speak().times(2).returning(|_, _| Ok(()));
        let mut relay = MockBackendRelay::new();
        relay
            .expect_interrupt()
            .withf(|sid| sid == "s1")
            .times(1)
            .returning(|_| Ok("ok".to_string()));
        let (command_tx, _command_rx) = mpsc::channel(32);

        let mut config = test_config();
        config.interrupt_route = InterruptRoute::Backend;
        let mut coordinator = Coordinator::new(config);
        start_to_active(&mut coordinator, &avatar, &relay, &command_tx).await;

        let request = UtteranceRequest::new("hola", UtteranceOrigin::VoiceTranscript);
        coordinator
            .speak(request, &avatar, &relay, &command_tx)
            .await
            .expect("speak should succeed");
    }

    #[tokio::test]
    async fn test_stream_disconnected_resets_and_blocks_speak() {
        let mut avatar = MockAvatarSession::new();
        avatar.expect_start_session().returning(|_, _| Ok(()));
        avatar.expect_speak().times(1).returning(|_, _| Ok(())); // greeting only
        let relay = MockBackendRelay::new();
        let (command_tx, mut command_rx) = mpsc::channel(32);

        let mut coordinator = Coordinator::new(test_config());
        let epoch = start_to_active(&mut coordinator, &avatar, &relay, &command_tx).await;
        drain(&mut command_rx);

        coordinator.stream_disconnected(epoch, &command_tx).await;
        assert_eq!(coordinator.status(), SessionStatus::Idle);

        let commands = drain(&mut command_rx);
        assert!(commands.contains(&Command::DetachMedia));
        assert!(commands.contains(&Command::Ui(UiState::from_status(SessionStatus::Idle))));

        let request = UtteranceRequest::new("hola", UtteranceOrigin::UserTyped);
        let result = coordinator.speak(request, &avatar, &relay, &command_tx).await;
        assert!(matches!(result, Err(CoordinatorError::NotActive)));
    }

    #[tokio::test]
    async fn test_auth_failure_returns_idle_without_create_call() {
        let mut tokens = MockTokenProvider::new();
        tokens
            .expect_access_token()
            .returning(|| Err(TokenError::Rejected("unauthorized".to_string())));
        let mut avatar = MockAvatarSession::new();
        avatar.expect_start_session().never();
        let (command_tx, _command_rx) = mpsc::channel(32);

        let mut coordinator = Coordinator::new(test_config());
        let result = coordinator.start(&tokens, &avatar, &command_tx).await;
        assert!(matches!(result, Err(CoordinatorError::Auth(_))));
        assert_eq!(coordinator.status(), SessionStatus::Idle);
        assert!(coordinator.ui_state().start_enabled);
    }

    #[tokio::test]
    async fn test_create_failure_returns_idle() {
        let tokens = tokens_ok();
        let mut avatar = MockAvatarSession::new();
        avatar
            .expect_start_session()
            .returning(|_, _| Err(AvatarError::SessionCreate("quota".to_string())));
        let (command_tx, _command_rx) = mpsc::channel(32);

        let mut coordinator = Coordinator::new(test_config());
        let result = coordinator.start(&tokens, &avatar, &command_tx).await;
        assert!(matches!(result, Err(CoordinatorError::SessionCreate(_))));
        assert_eq!(coordinator.status(), SessionStatus::Idle);
    }

    #[tokio::test]
    async fn test_stop_resets_ui_even_when_teardown_fails() {
        for teardown_fails in [false, true] {
            let mut avatar = MockAvatarSession::new();
            avatar.expect_start_session().returning(|_, _| Ok(()));
            avatar.expect_speak().returning(|_, _| Ok(()));
            avatar
                .expect_stop_session()
                .withf(|sid| sid.as_deref() == Some("s1"))
                .times(1)
                .returning(move |_| {
                    if teardown_fails {
                        Err(AvatarError::Stop("gone".to_string()))
                    } else {
                        Ok(())
                    }
                });
            let relay = MockBackendRelay::new();
            let (command_tx, mut command_rx) = mpsc::channel(32);

            let mut coordinator = Coordinator::new(test_config());
            start_to_active(&mut coordinator, &avatar, &relay, &command_tx).await;
            drain(&mut command_rx);

            coordinator
                .stop(&avatar, &command_tx)
                .await
                .expect("stop is best-effort");
            assert_eq!(coordinator.status(), SessionStatus::Idle);
            assert_eq!(
                coordinator.ui_state(),
                UiState::from_status(SessionStatus::Idle)
            );

            let commands = drain(&mut command_rx);
            assert!(commands.contains(&Command::DetachMedia));
            assert_eq!(
                commands.last(),
                Some(&Command::Ui(UiState::from_status(SessionStatus::Idle)))
            );
        }
    }

    #[tokio::test]
    async fn test_stop_while_starting_still_tears_down() {
        let tokens = tokens_ok();
        let mut avatar = MockAvatarSession::new();
        avatar.expect_start_session().returning(|_, _| Ok(()));
        // No session id was recorded yet; teardown still runs.
        avatar
            .expect_stop_session()
            .withf(|sid| sid.is_none())
            .times(1)
            .returning(|_| Ok(()));
        let (command_tx, _command_rx) = mpsc::channel(32);

        let mut coordinator = Coordinator::new(test_config());
        coordinator
            .start(&tokens, &avatar, &command_tx)
            .await
            .expect("start should succeed");
        assert_eq!(coordinator.status(), SessionStatus::Starting);

        coordinator
            .stop(&avatar, &command_tx)
            .await
            .expect("stop is best-effort");
        assert_eq!(coordinator.status(), SessionStatus::Idle);
    }

    #[tokio::test]
    async fn test_stale_stream_ready_is_ignored() {
        let mut avatar = MockAvatarSession::new();
        avatar.expect_start_session().returning(|_, _| Ok(()));
        avatar.expect_stop_session().returning(|_| Ok(()));
        avatar.expect_speak().never();
        let relay = MockBackendRelay::new();
        let (command_tx, _command_rx) = mpsc::channel(32);

        let mut coordinator = Coordinator::new(test_config());
        let tokens = tokens_ok();
        let old_epoch = coordinator
            .start(&tokens, &avatar, &command_tx)
            .await
            .expect("start should succeed");
        coordinator.session_created(old_epoch, "s1");
        coordinator
            .stop(&avatar, &command_tx)
            .await
            .expect("stop is best-effort");

        let new_epoch = coordinator
            .start(&tokens, &avatar, &command_tx)
            .await
            .expect("restart should succeed");
        assert_ne!(old_epoch, new_epoch);

        // The first session's stream resolves late: no transition, no speak.
        coordinator
            .stream_ready(old_epoch, Some(media()), &avatar, &relay, &command_tx)
            .await;
        assert_eq!(coordinator.status(), SessionStatus::Starting);
    }

    #[tokio::test]
    async fn test_stream_ready_without_media_stays_starting() {
        let tokens = tokens_ok();
        let mut avatar = MockAvatarSession::new();
        avatar.expect_start_session().returning(|_, _| Ok(()));
        avatar.expect_speak().times(1).returning(|_, _| Ok(()));
        let relay = MockBackendRelay::new();
        let (command_tx, _command_rx) = mpsc::channel(32);

        let mut coordinator = Coordinator::new(test_config());
        let epoch = coordinator
            .start(&tokens, &avatar, &command_tx)
            .await
            .expect("start should succeed");
        coordinator.session_created(epoch, "s1");

        coordinator
            .stream_ready(epoch, None, &avatar, &relay, &command_tx)
            .await;
        assert_eq!(coordinator.status(), SessionStatus::Starting);

        // The stream recovering with media still completes the transition.
        coordinator
            .stream_ready(epoch, Some(media()), &avatar, &relay, &command_tx)
            .await;
        assert_eq!(coordinator.status(), SessionStatus::Active);
    }

    #[tokio::test]
    async fn test_backend_greeting_used_and_falls_back_on_failure() {
        // Backend greeting succeeds.
        let mut avatar = MockAvatarSession::new();
        avatar.expect_start_session().returning(|_, _| Ok(()));
        avatar
            .expect_speak()
            .withf(|_, text| text == "bienvenido")
            .times(1)
            .returning(|_, _| Ok(()));
        let mut relay = MockBackendRelay::new();
        relay
            .expect_greeting()
            .withf(|sid, text| sid == "s1" && text == DEFAULT_GREETING)
            .times(1)
            .returning(|_, _| Ok("bienvenido".to_string()));
        let (command_tx, _command_rx) = mpsc::channel(32);

        let mut config = test_config();
        config.use_backend_greeting = true;
        let mut coordinator = Coordinator::new(config);
        start_to_active(&mut coordinator, &avatar, &relay, &command_tx).await;

        // Backend greeting fails: the fixed text is spoken instead.
        let mut avatar = MockAvatarSession::new();
        avatar.expect_start_session().returning(|_, _| Ok(()));
        avatar
            .expect_speak()
            .withf(|_, text| text == DEFAULT_GREETING)
            .times(1)
            .returning(|_, _| Ok(()));
        let mut relay = MockBackendRelay::new();
        relay
            .expect_greeting()
            .times(1)
            .returning(|_, _| Err(RelayError::Request("backend down".to_string())));

        let mut config = test_config();
        config.use_backend_greeting = true;
        let mut coordinator = Coordinator::new(config);
        start_to_active(&mut coordinator, &avatar, &relay, &command_tx).await;
    }

    #[tokio::test]
    async fn test_transcript_routes_to_backend_without_speaking() {
        let mut avatar = MockAvatarSession::new();
        avatar.expect_start_session().returning(|_, _| Ok(()));
        avatar.expect_speak().times(1).returning(|_, _| Ok(())); // greeting only
        avatar.expect_interrupt().never();
        let mut relay = MockBackendRelay::new();
        relay
            .expect_submit_transcript()
            .withf(|text| text == "hola")
            .times(1)
            .returning(|_| Ok(()));
        let (command_tx, _command_rx) = mpsc::channel(32);

        let mut config = test_config();
        config.voice_route = VoiceRoute::Backend;
        let mut coordinator = Coordinator::new(config);
        start_to_active(&mut coordinator, &avatar, &relay, &command_tx).await;

        coordinator
            .transcript("hola".to_string(), &avatar, &relay, &command_tx)
            .await;
    }

    #[tokio::test]
    async fn test_transcript_relay_failure_is_not_fatal() {
        let mut avatar = MockAvatarSession::new();
        avatar.expect_start_session().returning(|_, _| Ok(()));
        avatar.expect_speak().returning(|_, _| Ok(()));
        let mut relay = MockBackendRelay::new();
        relay
            .expect_submit_transcript()
            .returning(|_| Err(RelayError::Request("backend down".to_string())));
        let (command_tx, _command_rx) = mpsc::channel(32);

        let mut config = test_config();
        config.voice_route = VoiceRoute::Backend;
        let mut coordinator = Coordinator::new(config);
        start_to_active(&mut coordinator, &avatar, &relay, &command_tx).await;

        coordinator
            .transcript("hola".to_string(), &avatar, &relay, &command_tx)
            .await;
        assert_eq!(coordinator.status(), SessionStatus::Active);
    }
}
