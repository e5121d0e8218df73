//! HTTP client utilities.

use reqwest::{Client, RequestBuilder, Response};
use std::sync::Arc;
use std::time::Duration;

use crate::sources::SourceError;

/// Shared HTTP client with sensible defaults
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self, SourceError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Create a new HTTP client with a custom request timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| SourceError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// Get the underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.client.get(url)
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        self.client.post(url)
    }
}

/// Send a request and turn transport failures and non-2xx answers into errors.
///
/// The response body of a failed request is kept (cut to 500 characters) so the
/// user sees what the service complained about.
pub async fn send_checked(request: RequestBuilder, service: &str) -> Result<Response, SourceError> {
    let response = request
        .send()
        .await
        .map_err(|e| SourceError::Network(format!("{} request failed: {}", service, e)))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message: String = body.trim().chars().take(500).collect();
    tracing::debug!(service, status = status.as_u16(), "upstream returned an error status");
    Err(SourceError::Status {
        status: status.as_u16(),
        message: if message.is_empty() {
            format!("{} returned {}", service, status)
        } else {
            format!("{} returned {}: {}", service, status, message)
        },
    })
}
