//! HTTP transport seam.
//!
//! The dispatcher only needs "GET this URL, give me status and body". That
//! capability is the [`Transport`] trait; [`HttpTransport`] is the production
//! implementation on a pooled `reqwest::Client`, and tests plug in fakes.

use crate::error::HibpError;
use crate::types::DispatchConfig;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Status line and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new<B: Into<String>>(status: u16, body: B) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Capability to perform a GET request.
///
/// Implementations are shared by every worker of a batch, so they must be
/// safe for concurrent use.
pub trait Transport: Send + Sync {
    /// Perform one GET against `url`.
    ///
    /// Any non-`Err` result means the exchange completed, whatever its status.
    fn get(&self, url: &str) -> impl Future<Output = Result<RawResponse, HibpError>> + Send;
}

/// Production transport backed by a connection-pooling `reqwest::Client`.
#[derive(Clone)]
pub struct HttpTransport {
    http_client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with the default user agent and a 5 second call timeout.
    pub fn new() -> Result<Self, HibpError> {
        Self::from_config(&DispatchConfig::default())
    }

    /// Create a transport using the user agent and call timeout from `config`.
    pub fn from_config(config: &DispatchConfig) -> Result<Self, HibpError> {
        Self::with_settings(&config.user_agent, config.request_timeout)
    }

    /// Create a transport with an explicit user agent and per-call timeout.
    pub fn with_settings(user_agent: &str, timeout: Duration) -> Result<Self, HibpError> {
        let http_client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| {
                HibpError::network_with_source("Failed to create HTTP client", e.to_string())
            })?;

        Ok(Self { http_client })
    }
}

impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<RawResponse, HibpError> {
        let response = self.http_client.get(url).send().await.map_err(|e| {
            debug!(url, error = %e, "HTTP request failed");
            HibpError::from(e)
        })?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        debug!(url, status, bytes = body.len(), "HTTP response received");

        Ok(RawResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_creation() {
        assert!(HttpTransport::new().is_ok());
        assert!(HttpTransport::with_settings("custom-agent/1.0", Duration::from_secs(1)).is_ok());
    }

    #[test]
    fn test_raw_response_success_range() {
        assert!(RawResponse::new(200, "[]").is_success());
        assert!(RawResponse::new(204, "").is_success());
        assert!(!RawResponse::new(404, "").is_success());
        assert!(!RawResponse::new(503, "").is_success());
    }
}
