use serde::{Deserialize, Serialize};
use std::fmt;

/// Header carrying a Gotify application token.
pub const GOTIFY_KEY_HEADER: &str = "X-Gotify-Key";

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GotifyConfig {
    pub enabled: bool,
    /// Host (and optional port) of the Gotify server. `https://` is implied
    /// unless a scheme is given.
    pub server: String,
    /// One message is sent per application key.
    pub api_keys: Vec<String>,
    pub priority: i64,
    pub timeout_secs: u64,
}

impl Default for GotifyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            server: String::new(),
            api_keys: Vec::new(),
            priority: 5,
            timeout_secs: 10,
        }
    }
}

impl fmt::Debug for GotifyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GotifyConfig")
            .field("enabled", &self.enabled)
            .field("server", &self.server)
            .field("api_keys", &format!("<{} redacted>", self.api_keys.len()))
            .field("priority", &self.priority)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Body of `POST /message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GotifyMessage {
    pub title: String,
    pub message: String,
    pub priority: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Notification config error: {0}")]
    Config(String),

    #[error("Notification request failed: {0}")]
    Http(String),

    #[error("{failed} of {total} notification deliveries failed")]
    Partial { failed: usize, total: usize },
}

impl From<NotifyError> for String {
    fn from(e: NotifyError) -> Self {
        e.to_string()
    }
}
