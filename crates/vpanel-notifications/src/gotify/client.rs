//! Gotify delivery and the [`Notifier`] seam.

use crate::gotify::types::*;
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError>;
}

pub type SharedNotifier = Arc<dyn Notifier>;

/// Used when notifications are disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, title: &str, _message: &str) -> Result<(), NotifyError> {
        debug!("notifications disabled, dropping '{}'", title);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct GotifyClient {
    client: Client,
    endpoint: Url,
    api_keys: Vec<String>,
    priority: i64,
}

impl GotifyClient {
    pub fn new(config: &GotifyConfig) -> Result<Self, NotifyError> {
        if config.api_keys.is_empty() {
            return Err(NotifyError::Config("no Gotify application key configured".into()));
        }
        let endpoint = message_endpoint(&config.server)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NotifyError::Http(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint,
            api_keys: config.api_keys.clone(),
            priority: config.priority,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn send_one(&self, key: &str, body: &GotifyMessage) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(GOTIFY_KEY_HEADER, key)
            .json(body)
            .send()
            .await
            .map_err(|e| NotifyError::Http(e.to_string()))?;
        if !response.status().is_success() {
            return Err(NotifyError::Http(format!("Gotify answered HTTP {}", response.status())));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for GotifyClient {
    /// Deliver to every application key; one failing key does not stop the others.
    async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        let body = GotifyMessage {
            title: title.to_string(),
            message: message.to_string(),
            priority: self.priority,
        };
        let mut failed = 0;
        for (index, key) in self.api_keys.iter().enumerate() {
            if let Err(e) = self.send_one(key, &body).await {
                warn!("Gotify delivery with key #{} failed: {}", index + 1, e);
                failed += 1;
            }
        }
        if failed > 0 {
            return Err(NotifyError::Partial {
                failed,
                total: self.api_keys.len(),
            });
        }
        debug!("sent '{}' to {} Gotify application(s)", title, self.api_keys.len());
        Ok(())
    }
}

/// `https://<server>/message`, or `<server>/message` when a scheme is given.
pub fn message_endpoint(server: &str) -> Result<Url, NotifyError> {
    let server = server.trim().trim_end_matches('/');
    if server.is_empty() {
        return Err(NotifyError::Config("Gotify server is empty".into()));
    }
    let base = if server.starts_with("http://") || server.starts_with("https://") {
        server.to_string()
    } else {
        format!("https://{}", server)
    };
    Url::parse(&format!("{}/message", base))
        .map_err(|e| NotifyError::Config(format!("invalid Gotify server '{}': {}", server, e)))
}

/// Build the notifier the configuration asks for.
pub fn notifier_from_config(config: &GotifyConfig) -> Result<SharedNotifier, NotifyError> {
    if !config.enabled {
        return Ok(Arc::new(NoopNotifier));
    }
    Ok(Arc::new(GotifyClient::new(config)?))
}

/// Send in the background; failures are logged and never reach the caller.
pub fn dispatch(
    notifier: SharedNotifier,
    title: String,
    message: String,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = notifier.notify(&title, &message).await {
            warn!("notification '{}' not delivered: {}", title, e);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_defaults_to_https() {
        assert_eq!(
            message_endpoint("push.example.com").unwrap().as_str(),
            "https://push.example.com/message"
        );
        assert_eq!(
            message_endpoint("http://127.0.0.1:8080/").unwrap().as_str(),
            "http://127.0.0.1:8080/message"
        );
        assert!(matches!(message_endpoint("  "), Err(NotifyError::Config(_))));
    }

    #[test]
    fn client_needs_a_key() {
        let cfg = GotifyConfig {
            enabled: true,
            server: "push.example.com".into(),
            ..Default::default()
        };
        assert!(matches!(GotifyClient::new(&cfg), Err(NotifyError::Config(_))));
    }

    #[tokio::test]
    async fn disabled_config_gives_noop() {
        let notifier = notifier_from_config(&GotifyConfig::default()).unwrap();
        notifier.notify("t", "m").await.unwrap();
    }

    #[tokio::test]
    async fn dispatch_swallows_failures() {
        struct Failing;
        #[async_trait]
        impl Notifier for Failing {
            async fn notify(&self, _: &str, _: &str) -> Result<(), NotifyError> {
                Err(NotifyError::Http("down".into()))
            }
        }
        dispatch(Arc::new(Failing), "t".into(), "m".into()).await.unwrap();
    }
}
