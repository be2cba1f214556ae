pub mod config;
pub mod recognizer;
pub mod vendor;
pub mod ws_relay;

pub use avatar_realtime::types as avatar_types;

use avatar_realtime_types::ServerEvent;

/// Inputs feeding the runtime's single event loop. Everything that can move
/// the session — user intent, vendor callbacks, voice transcripts, relay
/// pushes — arrives here and is processed strictly in order.
pub enum Input {
    /// User asked to start a session.
    Start,
    /// User asked to end the session.
    Stop,
    /// User typed text and pressed speak.
    TypedText(String),
    /// Finalized voice transcript from the capture adapter.
    Transcript(String),
    /// Reply text pushed by the backend over the relay socket.
    BackendText(String),
    /// Vendor event observed under the given session epoch.
    Avatar(u64, ServerEvent),
}
