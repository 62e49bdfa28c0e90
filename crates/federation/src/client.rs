//! `ActivityPub` HTTP client for fetching remote actors.

#![allow(missing_docs)]

use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

const ACTIVITY_ACCEPT: &str =
    "application/activity+json, application/ld+json; profile=\"https://www.w3.org/ns/activitystreams\"";

/// Error type for AP client operations.
#[derive(Debug, thiserror::Error)]
pub enum ApClientError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Fetch failed: {status} - {body}")]
    FetchFailed { status: u16, body: String },
}

/// `ActivityPub` HTTP client.
#[derive(Clone)]
pub struct ApClient {
    client: Client,
    user_agent: String,
}

impl ApClient {
    /// Create a new AP client identifying itself with `instance_url`.
    pub fn new(instance_url: &str) -> Result<Self, ApClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        let user_agent = format!(
            "murmur/{} (+{instance_url})",
            env!("CARGO_PKG_VERSION")
        );

        Ok(Self { client, user_agent })
    }

    /// Fetch a remote actor document by its id URL.
    pub async fn fetch_actor(&self, actor_url: &Url) -> Result<Value, ApClientError> {
        debug!(actor_url = %actor_url, "Fetching remote actor");

        let response = self
            .client
            .get(actor_url.as_str())
            .header("User-Agent", &self.user_agent)
            .header("Accept", ACTIVITY_ACCEPT)
            .send()
            .await?;

        let status = response.status();

        if status.is_success() {
            Ok(response.json().await?)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ApClientError::FetchFailed {
                status: status.as_u16(),
                body,
            })
        }
    }
}
