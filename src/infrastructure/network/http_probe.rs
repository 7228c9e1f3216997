use crate::application::ports::connectivity::ConnectivityProbe;
use crate::shared::config::AppConfig;
use crate::shared::error::AppError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Treats any HTTP answer from the probe URL as reachable. Only transport
/// failures (DNS, refused, timeout) count as offline.
pub struct HttpConnectivityProbe {
    client: Client,
    url: String,
}

impl HttpConnectivityProbe {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::Configuration(format!("probe client: {err}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        Self::new(
            config.probe_url(),
            Duration::from_secs(config.network.probe_timeout_secs.max(1)),
        )
    }
}

#[async_trait]
impl ConnectivityProbe for HttpConnectivityProbe {
    async fn check(&self) -> bool {
        match self.client.get(&self.url).send().await {
            Ok(_) => true,
            Err(err) => {
                tracing::debug!(
                    target: "sync::network",
                    url = %self.url,
                    error = %err,
                    "reachability probe failed"
                );
                false
            }
        }
    }
}
