/// Handle to the inbound media stream announced by `stream.ready`.
///
/// The client never touches the media itself; the runtime binds this handle
/// to whatever display surface it owns.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MediaDescriptor {
    /// Playback location of the stream.
    url: String,

    /// Transport kind, ex: "webrtc", "hls".
    kind: Option<String>,
}

impl MediaDescriptor {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            kind: None,
        }
    }

    pub fn with_kind(mut self, kind: &str) -> Self {
        self.kind = Some(kind.to_string());
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }
}
