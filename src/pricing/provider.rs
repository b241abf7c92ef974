use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use super::retry::Retryable;
use crate::consts::FETCH_TIMEOUT;

/// One failed attempt at downloading the rate table
#[derive(Debug, Clone, Error, PartialEq)]
pub(crate) enum FetchError {
    #[error("HTTP status {0}")]
    Status(u16),

    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("invalid response body: {0}")]
    Body(String),
}

impl Retryable for FetchError {
    fn is_retryable(&self) -> bool {
        match self {
            FetchError::Status(code) => matches!(code, 408 | 425 | 429 | 500..=599),
            FetchError::Timeout | FetchError::Network(_) => true,
            FetchError::Request(_) | FetchError::Body(_) => false,
        }
    }
}

/// Source of the raw upstream rate-table document
#[async_trait]
pub(crate) trait RateTableFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<serde_json::Value, FetchError>;
}

/// Blocking `ureq` client moved onto the blocking pool
#[derive(Debug, Clone)]
pub(crate) struct UreqFetcher {
    timeout: Duration,
}

impl Default for UreqFetcher {
    fn default() -> Self {
        Self {
            timeout: FETCH_TIMEOUT,
        }
    }
}

impl UreqFetcher {
    fn fetch_blocking(url: &str, timeout: Duration) -> Result<serde_json::Value, FetchError> {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();

        let response = agent.get(url).call().map_err(map_ureq_error)?;
        let mut body = response.into_body();
        serde_json::from_reader(body.as_reader()).map_err(|e| {
            if e.is_io() {
                FetchError::Network(e.to_string())
            } else {
                FetchError::Body(e.to_string())
            }
        })
    }
}

fn map_ureq_error(err: ureq::Error) -> FetchError {
    match err {
        ureq::Error::StatusCode(code) => FetchError::Status(code),
        ureq::Error::Timeout(_) => FetchError::Timeout,
        ureq::Error::Io(e) if e.kind() == std::io::ErrorKind::TimedOut => FetchError::Timeout,
        ureq::Error::Io(e) => FetchError::Network(e.to_string()),
        ureq::Error::HostNotFound => FetchError::Network("host not found".to_string()),
        ureq::Error::ConnectionFailed => FetchError::Network("connection failed".to_string()),
        other => FetchError::Request(other.to_string()),
    }
}

#[async_trait]
impl RateTableFetcher for UreqFetcher {
    async fn fetch(&self, url: &str) -> Result<serde_json::Value, FetchError> {
        let url = url.to_string();
        let timeout = self.timeout;
        tokio::task::spawn_blocking(move || Self::fetch_blocking(&url, timeout))
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_statuses() {
        for code in [408, 425, 429, 500, 502, 503, 599] {
            assert!(FetchError::Status(code).is_retryable(), "{code}");
        }
        for code in [400, 401, 403, 404, 410] {
            assert!(!FetchError::Status(code).is_retryable(), "{code}");
        }
    }

    #[test]
    fn network_class_failures_are_retryable() {
        assert!(FetchError::Timeout.is_retryable());
        assert!(FetchError::Network("reset".into()).is_retryable());
        assert!(!FetchError::Body("expected value".into()).is_retryable());
        assert!(!FetchError::Request("bad uri".into()).is_retryable());
    }

    #[test]
    fn ureq_errors_map_to_fetch_errors() {
        assert_eq!(map_ureq_error(ureq::Error::StatusCode(503)), FetchError::Status(503));
        assert!(map_ureq_error(ureq::Error::HostNotFound).is_retryable());
        assert!(map_ureq_error(ureq::Error::ConnectionFailed).is_retryable());
    }
}
