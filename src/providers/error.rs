//! 提供者错误分类：把厂商 HTTP 状态与传输故障统一为少量错误种类。
//!
//! Provider error taxonomy.
//!
//! Every adapter failure is reported as a [`ProviderError`]. The failover loop
//! treats all kinds the same way (record, exclude, move on); the kind exists so
//! logs, reports and events can say *why* a provider was skipped.
//!
//! | Kind | Typical cause |
//! |------|---------------|
//! | `network` | DNS, connect or TLS failure |
//! | `authentication` | Missing, invalid or expired credentials |
//! | `quota_exceeded` | Billing or monthly quota reached |
//! | `rate_limited` | Vendor rate limit hit |
//! | `timeout` | Call exceeded its bounded timeout |
//! | `invalid_response` | Body could not be normalized into an outcome |
//! | `unavailable` | Vendor-side 5xx |
//! | `unknown` | Anything else |

use std::fmt;
use thiserror::Error;

/// Coarse classification of a provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    Network,
    Authentication,
    QuotaExceeded,
    RateLimited,
    Timeout,
    InvalidResponse,
    Unavailable,
    Unknown,
}

impl ProviderErrorKind {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Authentication => "authentication",
            Self::QuotaExceeded => "quota_exceeded",
            Self::RateLimited => "rate_limited",
            Self::Timeout => "timeout",
            Self::InvalidResponse => "invalid_response",
            Self::Unavailable => "unavailable",
            Self::Unknown => "unknown",
        }
    }

    /// Maps an HTTP status code to the most likely kind.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Authentication,
            402 => Self::QuotaExceeded,
            408 | 504 => Self::Timeout,
            429 => Self::RateLimited,
            500..=599 => Self::Unavailable,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed call to a single classification provider.
#[derive(Debug, Clone, Error)]
#[error("{provider} failed ({kind}): {message}")]
pub struct ProviderError {
    pub provider: String,
    pub kind: ProviderErrorKind,
    pub message: String,
    /// HTTP status, when the failure came from a vendor response.
    pub status: Option<u16>,
}

impl ProviderError {
    pub fn new(
        provider: impl Into<String>,
        kind: ProviderErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            kind,
            message: message.into(),
            status: None,
        }
    }

    pub fn from_status(provider: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            kind: ProviderErrorKind::from_http_status(status),
            message: body.into(),
            status: Some(status),
        }
    }

    pub fn timeout(provider: impl Into<String>, after: std::time::Duration) -> Self {
        Self::new(
            provider,
            ProviderErrorKind::Timeout,
            format!("no response after {} ms", after.as_millis()),
        )
    }

    pub fn invalid_response(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorKind::InvalidResponse, message)
    }

    /// Classify a reqwest failure that happened before a status was available.
    pub fn from_transport(provider: impl Into<String>, err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            ProviderErrorKind::Timeout
        } else if err.is_connect() || err.is_request() {
            ProviderErrorKind::Network
        } else if err.is_decode() || err.is_body() {
            ProviderErrorKind::InvalidResponse
        } else if let Some(status) = err.status() {
            ProviderErrorKind::from_http_status(status.as_u16())
        } else {
            ProviderErrorKind::Unknown
        };
        Self {
            provider: provider.into(),
            kind,
            message: err.to_string(),
            status: err.status().map(|s| s.as_u16()),
        }
    }
}
