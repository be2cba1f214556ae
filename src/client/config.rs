use crate::client::consts::{BASE_URL, SESSION_TOKEN};
use secrecy::SecretString;

pub struct Config {
    base_url: String,
    token: SecretString,
}

pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.config.base_url = base_url.to_string();
        self
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.config.token = SecretString::from(token.to_string());
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Config {
    // Sets the default values. The short-lived session token normally comes
    // from a token provider, not the environment; the env fallback keeps the
    // library usable standalone.
    pub fn new() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            token: std::env::var(SESSION_TOKEN)
                .unwrap_or_else(|_| "".to_string())
                .into(),
        }
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> &SecretString {
        &self.token
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
