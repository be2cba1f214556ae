pub mod avatar;
pub mod coordinator;
pub mod relay;
pub mod speech;
pub mod token;

use avatar_realtime_types::MediaDescriptor;
use coordinator::UiState;

/// Represents commands that the core logic (`Coordinator`) issues to the runtime.
///
/// This enum is the primary API for decoupling the coordinator's decision-making
/// from the runtime's execution of side effects (binding media, updating controls).
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Render the derived control state. Never read back as input.
    Ui(UiState),
    /// Bind the inbound media stream to the display surface.
    AttachMedia(MediaDescriptor),
    /// Release the display surface.
    DetachMedia,
    /// Clear the text input field after a typed utterance was dispatched.
    ClearInput,
}
