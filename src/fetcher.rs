use reqwest::Client;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;

/// Failure to retrieve a channel page.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The origin answered with a non-success status.
    #[error("Failed to fetch channel HTML: {status_text}")]
    Status { status: u16, status_text: String },
    /// The request never produced a response (DNS, connect, timeout, body read).
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl FetchError {
    /// HTTP status to report to our own caller.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::Status { status, .. } => *status,
            Self::Network(_) | Self::Client(_) => 500,
        }
    }
}

/// Fetches public channel preview pages.
#[derive(Debug, Clone)]
pub struct ChannelFetcher {
    client: Client,
    base_url: String,
}

impl ChannelFetcher {
    /// Build a fetcher from the upstream settings in `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let mut builder = Client::builder().user_agent(config.user_agent.as_str());
        if let Some(timeout) = config.fetch_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(FetchError::Client)?;

        Ok(Self {
            client,
            base_url: config.telegram_base_url.clone(),
        })
    }

    /// URL of the preview page for `channel`. The handle is appended verbatim.
    #[must_use]
    pub fn channel_url(&self, channel: &str) -> String {
        format!("{}{channel}", self.base_url)
    }

    /// Download the raw preview page HTML for `channel`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Status`] for a non-2xx answer and
    /// [`FetchError::Network`] if no response could be read.
    pub async fn fetch(&self, channel: &str) -> Result<String, FetchError> {
        let url = self.channel_url(channel);
        debug!(url = %url, "Fetching channel page");

        let response = self.client.get(&url).send().await.map_err(|e| {
            warn!(url = %url, error = %e, "Channel page request failed");
            FetchError::Network(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = %status, "Channel page returned error status");
            return Err(FetchError::Status {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let body = response.text().await.map_err(FetchError::Network)?;
        debug!(url = %url, bytes = body.len(), "Fetched channel page");
        Ok(body)
    }
}
