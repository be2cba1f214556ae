use crate::voice::{AvatarQuality, VoiceEmotion, VoiceSettings};

pub const DEFAULT_AVATAR_NAME: &str = "Wayne_20240711";
pub const DEFAULT_VOICE_ID: &str = "001cc6d54eae4ca2b5fb16ca8e8eb9bb";
pub const DEFAULT_LANGUAGE: &str = "Spanish";

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SessionConfig {
    /// Rendering quality requested for the video stream.
    quality: AvatarQuality,

    /// Vendor identifier of the avatar to present.
    avatar_name: String,

    /// Voice configuration. None lets the vendor pick the avatar's default voice.
    voice: Option<VoiceSettings>,

    /// Target spoken language, ex: "Spanish".
    language: Option<String>,
}

impl SessionConfig {
    pub fn new() -> Self {
        SessionConfigurator::new().build()
    }

    pub fn builder() -> SessionConfigurator {
        SessionConfigurator::new()
    }

    pub fn quality(&self) -> AvatarQuality {
        self.quality
    }

    pub fn avatar_name(&self) -> &str {
        &self.avatar_name
    }

    pub fn voice(&self) -> Option<&VoiceSettings> {
        self.voice.as_ref()
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

pub struct SessionConfigurator {
    config: SessionConfig,
}

impl SessionConfigurator {
    pub fn new() -> Self {
        Self {
            config: SessionConfig {
                quality: AvatarQuality::High,
                avatar_name: DEFAULT_AVATAR_NAME.to_string(),
                voice: Some(
                    VoiceSettings::new(DEFAULT_VOICE_ID)
                        .with_rate(1.5)
                        .with_emotion(VoiceEmotion::Friendly),
                ),
                language: Some(DEFAULT_LANGUAGE.to_string()),
            },
        }
    }

    pub fn with_quality(mut self, quality: AvatarQuality) -> Self {
        self.config.quality = quality;
        self
    }

    pub fn with_avatar_name(mut self, avatar_name: &str) -> Self {
        self.config.avatar_name = avatar_name.to_string();
        self
    }

    pub fn with_voice(mut self, voice: VoiceSettings) -> Self {
        self.config.voice = Some(voice);
        self
    }

    pub fn with_voice_disable(mut self) -> Self {
        self.config.voice = None;
        self
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.config.language = Some(language.to_string());
        self
    }

    pub fn build(self) -> SessionConfig {
        self.config
    }
}

impl Default for SessionConfigurator {
    fn default() -> Self {
        Self::new()
    }
}

/// Vendor-assigned identity of a created session.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SessionInfo {
    session_id: String,
}

impl SessionInfo {
    pub fn new(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}
