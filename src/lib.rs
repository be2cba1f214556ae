mod client;

pub use avatar_realtime_types as types;
pub use client::{connect, connect_with_config, Client, Config, ServerRx};
