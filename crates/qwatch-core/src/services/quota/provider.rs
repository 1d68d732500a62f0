//! Quota provider trait and error types
//!
//! Defines the interface the poll coordinator drives and the error taxonomy
//! of the fetch path.

use async_trait::async_trait;
use thiserror::Error;

use super::types::UsageSnapshot;

// ============================================================================
// Snapshot error codes
// ============================================================================

pub const CODE_NOT_LOGGED_IN: &str = "Not Logged In";
pub const CODE_SESSION_EXPIRED: &str = "Session Expired";
pub const CODE_OFFLINE: &str = "Offline";
pub const CODE_DATA_UNAVAILABLE: &str = "Data Unavailable";

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while obtaining a token or fetching usage
///
/// Every variant is terminal for a single poll cycle only.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuotaError {
    /// No credential record, or one without an access token
    #[error("Not authenticated: {0}")]
    NotAuthenticated(String),

    /// The usage API rejected the bearer token (HTTP 401)
    #[error("Session expired")]
    SessionExpired,

    /// DNS, connect, timeout or other transport failure
    #[error("Network error: {0}")]
    Network(String),

    /// Any other non-200 status
    #[error("API error: HTTP {0}")]
    Api(u16),

    /// Body was not the expected structure
    #[error("Parse error: {0}")]
    Parse(String),
}

impl QuotaError {
    /// Machine-readable code stored in a failed [`UsageSnapshot`]
    pub fn snapshot_code(&self) -> String {
        match self {
            QuotaError::NotAuthenticated(_) => CODE_NOT_LOGGED_IN.to_string(),
            QuotaError::SessionExpired => CODE_SESSION_EXPIRED.to_string(),
            QuotaError::Network(_) => CODE_OFFLINE.to_string(),
            QuotaError::Api(status) => format!("API Error ({})", status),
            QuotaError::Parse(_) => CODE_DATA_UNAVAILABLE.to_string(),
        }
    }

    /// Map a non-success HTTP status to its error variant
    pub fn from_status(status: u16) -> Self {
        if status == 401 {
            QuotaError::SessionExpired
        } else {
            QuotaError::Api(status)
        }
    }
}

impl From<reqwest::Error> for QuotaError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            QuotaError::Network("Request timed out".to_string())
        } else if err.is_connect() {
            QuotaError::Network("Connection failed".to_string())
        } else if err.is_decode() {
            QuotaError::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            QuotaError::from_status(status.as_u16())
        } else {
            QuotaError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for QuotaError {
    fn from(err: serde_json::Error) -> Self {
        QuotaError::Parse(err.to_string())
    }
}

// ============================================================================
// Provider Trait
// ============================================================================

/// Source of usage snapshots
///
/// `fetch` never fails: every failure mode is encoded as the snapshot's error
/// code so the coordinator can treat all outcomes uniformly.
#[async_trait]
pub trait QuotaProvider: Send + Sync {
    /// Unique identifier for this provider
    fn provider_id(&self) -> &'static str;

    /// Human-readable display name for this provider
    fn display_name(&self) -> &'static str {
        self.provider_id()
    }

    /// Perform one fetch cycle
    async fn fetch(&self) -> UsageSnapshot;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_codes() {
        assert_eq!(
            QuotaError::NotAuthenticated("no file".into()).snapshot_code(),
            "Not Logged In"
        );
        assert_eq!(QuotaError::SessionExpired.snapshot_code(), "Session Expired");
        assert_eq!(QuotaError::Network("dns".into()).snapshot_code(), "Offline");
        assert_eq!(QuotaError::Api(503).snapshot_code(), "API Error (503)");
        assert_eq!(
            QuotaError::Parse("eof".into()).snapshot_code(),
            "Data Unavailable"
        );
    }

    #[test]
    fn test_from_status() {
        assert_eq!(QuotaError::from_status(401), QuotaError::SessionExpired);
        assert_eq!(QuotaError::from_status(403), QuotaError::Api(403));
        assert_eq!(QuotaError::from_status(500), QuotaError::Api(500));
    }

    #[test]
    fn test_quota_error_from_serde() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let quota_err: QuotaError = json_err.into();
        assert!(matches!(quota_err, QuotaError::Parse(_)));
    }

    #[test]
    fn test_quota_error_display() {
        assert_eq!(QuotaError::SessionExpired.to_string(), "Session expired");
        assert_eq!(QuotaError::Api(500).to_string(), "API error: HTTP 500");
    }
}
