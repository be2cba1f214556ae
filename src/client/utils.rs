use crate::client::config::Config;
use crate::client::consts::{AUTHORIZATION_HEADER, REALTIME_PATH};
use secrecy::ExposeSecret;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;

pub fn build_request(config: &Config) -> tokio_tungstenite::tungstenite::Result<Request> {
    let mut request =
        format!("{}/{}", config.base_url(), REALTIME_PATH).into_client_request()?;
    request.headers_mut().insert(
        AUTHORIZATION_HEADER,
        format!("Bearer {}", config.token().expose_secret())
            .as_str()
            .parse()?,
    );
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_request_sets_bearer_token() {
        let config = Config::builder()
            .with_base_url("wss://avatar.test/v1")
            .with_token("tok-123")
            .build();

        let request = build_request(&config).expect("request should build");

        assert_eq!(request.uri().to_string(), "wss://avatar.test/v1/streaming.realtime");
        let auth = request
            .headers()
            .get(AUTHORIZATION_HEADER)
            .expect("authorization header present");
        assert_eq!(auth.to_str().unwrap(), "Bearer tok-123");
    }
}
