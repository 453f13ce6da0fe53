//! Shared HTTP client for the remote data sources

use anyhow::{Context, Result};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::SourceError;
use crate::config::SourcesConfig;

const USER_AGENT: &str = concat!("raincheck/", env!("CARGO_PKG_VERSION"));

/// Client with bounded transient-error retries; each attempt gets its share of the fetch timeout
pub fn build_client(config: &SourcesConfig) -> Result<ClientWithMiddleware> {
    let inner = reqwest::Client::builder()
        .timeout(config.attempt_timeout())
        .user_agent(USER_AGENT)
        .build()
        .with_context(|| "Failed to create HTTP client")?;

    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);

    Ok(ClientBuilder::new(inner)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build())
}

/// Send a request and decode a successful JSON body
pub async fn get_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, SourceError> {
    let response = request.send().await?;
    let status = response.status();
    debug!(%status, url = %response.url().path(), "source responded");

    if !status.is_success() {
        return Err(SourceError::from_status(status));
    }

    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| SourceError::parse(e.to_string()))
}
