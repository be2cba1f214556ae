use crate::media::MediaDescriptor;
use crate::session::SessionInfo;

/// `error` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ErrorEvent {
    event_id: Option<String>,

    /// Human-readable description supplied by the vendor
    message: Option<String>,

    /// Vendor error code, ex: "session_not_found"
    code: Option<String>,
}

impl ErrorEvent {
    pub fn new(message: &str) -> Self {
        Self {
            event_id: None,
            message: Some(message.to_string()),
            code: None,
        }
    }

    pub fn with_code(mut self, code: &str) -> Self {
        self.code = Some(code.to_string());
        self
    }

    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or("unknown")
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }
}

/// `session.created` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SessionCreatedEvent {
    event_id: Option<String>,

    session: SessionInfo,
}

impl SessionCreatedEvent {
    pub fn new(session: SessionInfo) -> Self {
        Self {
            event_id: None,
            session,
        }
    }

    pub fn session(&self) -> &SessionInfo {
        &self.session
    }
}

/// `stream.ready` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StreamReadyEvent {
    event_id: Option<String>,

    /// Playback handle for the inbound stream. Absent when the vendor
    /// announced readiness without attaching media.
    media: Option<MediaDescriptor>,
}

impl StreamReadyEvent {
    pub fn new(media: MediaDescriptor) -> Self {
        Self {
            event_id: None,
            media: Some(media),
        }
    }

    pub fn without_media() -> Self {
        Self {
            event_id: None,
            media: None,
        }
    }

    pub fn media(&self) -> Option<&MediaDescriptor> {
        self.media.as_ref()
    }
}

/// `stream.disconnected` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StreamDisconnectedEvent {
    event_id: Option<String>,

    reason: Option<String>,
}

impl StreamDisconnectedEvent {
    pub fn new() -> Self {
        Self {
            event_id: None,
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: &str) -> Self {
        self.reason = Some(reason.to_string());
        self
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}

impl Default for StreamDisconnectedEvent {
    fn default() -> Self {
        Self::new()
    }
}

/// `task.started` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TaskStartedEvent {
    event_id: Option<String>,

    session_id: String,
}

impl TaskStartedEvent {
    pub fn new(session_id: &str) -> Self {
        Self {
            event_id: None,
            session_id: session_id.to_string(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

/// `task.finished` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TaskFinishedEvent {
    event_id: Option<String>,

    session_id: String,

    /// Milliseconds the avatar spent speaking the task, when reported.
    duration_ms: Option<u64>,
}

impl TaskFinishedEvent {
    pub fn new(session_id: &str) -> Self {
        Self {
            event_id: None,
            session_id: session_id.to_string(),
            duration_ms: None,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn duration_ms(&self) -> Option<u64> {
        self.duration_ms
    }
}

/// `task.interrupted` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TaskInterruptedEvent {
    event_id: Option<String>,

    session_id: String,
}

impl TaskInterruptedEvent {
    pub fn new(session_id: &str) -> Self {
        Self {
            event_id: None,
            session_id: session_id.to_string(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

/// `session.stopped` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SessionStoppedEvent {
    event_id: Option<String>,

    session_id: String,
}

impl SessionStoppedEvent {
    pub fn new(session_id: &str) -> Self {
        Self {
            event_id: None,
            session_id: session_id.to_string(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}
