use crate::session::SessionConfig;

/// `session.start` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SessionStartEvent {
    event_id: Option<String>,

    /// The configuration for the session being started
    config: SessionConfig,
}

impl SessionStartEvent {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            event_id: None,
            config,
        }
    }
    pub fn with_event_id(mut self, event_id: &str) -> Self {
        self.event_id = Some(event_id.to_string());
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

/// `task.speak` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TaskSpeakEvent {
    event_id: Option<String>,

    /// The session the task belongs to
    session_id: String,

    /// The text the avatar should speak verbatim
    text: String,
}

impl TaskSpeakEvent {
    pub fn new(session_id: &str, text: &str) -> Self {
        Self {
            event_id: None,
            session_id: session_id.to_string(),
            text: text.to_string(),
        }
    }
    pub fn with_event_id(mut self, event_id: &str) -> Self {
        self.event_id = Some(event_id.to_string());
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// `task.interrupt` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TaskInterruptEvent {
    event_id: Option<String>,

    /// The session whose in-flight task should be halted
    session_id: String,
}

impl TaskInterruptEvent {
    pub fn new(session_id: &str) -> Self {
        Self {
            event_id: None,
            session_id: session_id.to_string(),
        }
    }
    pub fn with_event_id(mut self, event_id: &str) -> Self {
        self.event_id = Some(event_id.to_string());
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

/// `session.stop` event
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SessionStopEvent {
    event_id: Option<String>,

    session_id: String,
}

impl SessionStopEvent {
    pub fn new(session_id: &str) -> Self {
        Self {
            event_id: None,
            session_id: session_id.to_string(),
        }
    }
    pub fn with_event_id(mut self, event_id: &str) -> Self {
        self.event_id = Some(event_id.to_string());
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}
