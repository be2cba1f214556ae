/// Rendering quality tier for the avatar video stream.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvatarQuality {
    Low,
    Medium,
    High,
}

/// Emotional delivery applied to the synthesized voice.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceEmotion {
    Excited,
    Serious,
    Friendly,
    Soothing,
    Broadcaster,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct VoiceSettings {
    /// Vendor-assigned voice identifier.
    voice_id: String,

    /// Speaking rate multiplier. 1.0 is the voice's natural pace.
    rate: f32,

    emotion: Option<VoiceEmotion>,
}

impl VoiceSettings {
    pub fn new(voice_id: &str) -> Self {
        Self {
            voice_id: voice_id.to_string(),
            rate: 1.0,
            emotion: None,
        }
    }

    pub fn with_rate(mut self, rate: f32) -> Self {
        self.rate = rate;
        self
    }

    pub fn with_emotion(mut self, emotion: VoiceEmotion) -> Self {
        self.emotion = Some(emotion);
        self
    }

    pub fn voice_id(&self) -> &str {
        &self.voice_id
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn emotion(&self) -> Option<VoiceEmotion> {
        self.emotion
    }
}
