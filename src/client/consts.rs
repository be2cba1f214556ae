pub const SESSION_TOKEN: &str = "AVATAR_SESSION_TOKEN";

pub const BASE_URL: &str = "wss://api.heygen.com/v1";
pub const REALTIME_PATH: &str = "streaming.realtime";

pub const AUTHORIZATION_HEADER: &str = "Authorization";
