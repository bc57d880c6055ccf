//! Client configuration loaded from environment variables.

use std::env;

/// Client configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the backend project (e.g. `https://xyz.example.co`)
    pub backend_url: String,
    /// Public (anon) API key sent with every request
    pub anon_key: String,
    /// Session access token for the signed-in user, if any
    pub access_token: Option<String>,
    /// User agent recorded with view events
    pub user_agent: String,
    /// Realtime websocket heartbeat interval
    pub realtime_heartbeat_secs: u64,
}

impl Config {
    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            backend_url: "http://localhost:54321".to_string(),
            anon_key: "test_anon_key".to_string(),
            access_token: None,
            user_agent: "courtside-test".to_string(),
            realtime_heartbeat_secs: 25,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is honored for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let backend_url = env::var("BACKEND_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .map_err(|_| ConfigError::Missing("BACKEND_URL"))?;
        if !backend_url.starts_with("http://") && !backend_url.starts_with("https://") {
            return Err(ConfigError::Invalid(
                "BACKEND_URL",
                "must start with http:// or https://".to_string(),
            ));
        }

        Ok(Self {
            backend_url,
            anon_key: env::var("BACKEND_ANON_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("BACKEND_ANON_KEY"))?,
            access_token: env::var("BACKEND_ACCESS_TOKEN")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            user_agent: env::var("CLIENT_USER_AGENT")
                .unwrap_or_else(|_| format!("courtside/{}", env!("CARGO_PKG_VERSION"))),
            realtime_heartbeat_secs: parse_heartbeat(env::var("REALTIME_HEARTBEAT_SECS").ok())?,
        })
    }
}

/// Heartbeat interval in seconds; 25 when unset, never zero.
fn parse_heartbeat(value: Option<String>) -> Result<u64, ConfigError> {
    let Some(value) = value else {
        return Ok(25);
    };
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        Ok(_) => Err(ConfigError::Invalid(
            "REALTIME_HEARTBEAT_SECS",
            "must be greater than zero".to_string(),
        )),
        Err(e) => Err(ConfigError::Invalid("REALTIME_HEARTBEAT_SECS", e.to_string())),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
