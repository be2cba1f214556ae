pub mod session;
pub mod voice;
pub mod events;
mod media;

pub use media::MediaDescriptor;
pub use session::{SessionConfig, SessionInfo};
pub use voice::{AvatarQuality, VoiceEmotion, VoiceSettings};
pub use events::{ClientEvent, ServerEvent};
