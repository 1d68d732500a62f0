//! OAuth credential store
//!
//! Produces a bearer token for exactly one fetch. The credentials file is
//! owned by the Claude Code agent, which refreshes it on its own schedule,
//! so this module never writes it and never caches it between calls.
//!
//! # Refresh sequence
//!
//! ```text
//! read ──► fresh? ──yes──► use token
//!            │no
//!            ▼
//!        re-read ──► fresh now? ──yes──► use re-read token
//!                        │no
//!                        ▼
//!            refresh_token? ──no──► use re-read token
//!                        │yes
//!                        ▼
//!                 POST /oauth/token ──ok──► use new token
//!                        │failed
//!                        ▼
//!                     re-read ──► use whatever token is there
//! ```
//!
//! A failed refresh still yields a token: the usage API is the authority on
//! whether it is stale and answers with a 401.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::provider::QuotaError;

/// Refresh when the token expires within this many milliseconds
pub const EXPIRY_MARGIN_MS: i64 = 5 * 60 * 1000;

// ============================================================================
// Credentials Types
// ============================================================================

/// Claude credentials file structure (~/.claude/.credentials.json)
#[derive(Debug, Deserialize)]
struct CredentialsFile {
    #[serde(rename = "claudeAiOauth")]
    claude_ai_oauth: Option<OAuthCredentials>,
}

/// OAuth credentials stored within the claudeAiOauth object
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OAuthCredentials {
    #[serde(rename = "accessToken")]
    pub access_token: Option<String>,

    #[serde(rename = "refreshToken")]
    pub refresh_token: Option<String>,

    /// Expiration time in milliseconds since epoch
    #[serde(rename = "expiresAt")]
    pub expires_at: Option<i64>,
}

impl OAuthCredentials {
    /// Access token, if present and non-empty
    pub fn token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|t| !t.is_empty())
    }

    fn refresh(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }

    /// True when the token expires within [`EXPIRY_MARGIN_MS`] of `now`
    ///
    /// Records without an expiry (or with a zero expiry) are never considered
    /// near expiry.
    pub fn is_near_expiry(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) if expires_at != 0 => {
                now.timestamp_millis() + EXPIRY_MARGIN_MS >= expires_at
            }
            _ => false,
        }
    }
}

/// Parse the credentials file contents
pub fn parse_credentials(content: &str) -> Result<Option<OAuthCredentials>, QuotaError> {
    let file: CredentialsFile = serde_json::from_str(content)?;
    Ok(file.claude_ai_oauth)
}

// ============================================================================
// Credential Source
// ============================================================================

/// Where credential records are read from
///
/// Each call observes the current on-disk state; implementations must not
/// cache.
pub trait CredentialSource: Send + Sync {
    /// `None` when the record is missing or unreadable
    fn read(&self) -> Option<OAuthCredentials>;
}

/// Credentials file maintained by the Claude Code agent
#[derive(Debug, Clone)]
pub struct FileCredentialSource {
    path: PathBuf,
}

impl FileCredentialSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialSource for FileCredentialSource {
    fn read(&self) -> Option<OAuthCredentials> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                log::debug!(
                    "[quota:credentials] Cannot read {:?}: {}",
                    self.path,
                    e
                );
                return None;
            }
        };

        match parse_credentials(&content) {
            Ok(Some(credentials)) => Some(credentials),
            Ok(None) => {
                log::warn!("[quota:credentials] No claudeAiOauth object in credentials");
                None
            }
            Err(e) => {
                log::warn!("[quota:credentials] Invalid credentials file: {}", e);
                None
            }
        }
    }
}

// ============================================================================
// Token Refresh
// ============================================================================

/// Exchanges a refresh token for a new access token
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<String, QuotaError>;
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    grant_type: &'static str,
    refresh_token: &'a str,
    client_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: Option<String>,
}

/// `refresh_token` grant against the OAuth token endpoint
pub struct OAuthTokenRefresher {
    client: Client,
    token_url: String,
    client_id: String,
}

impl OAuthTokenRefresher {
    /// The client's own timeout bounds how long a refresh can block
    pub fn new(client: Client, token_url: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            client,
            token_url: token_url.into(),
            client_id: client_id.into(),
        }
    }
}

#[async_trait]
impl TokenRefresher for OAuthTokenRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<String, QuotaError> {
        log::info!("[quota:credentials] Refreshing OAuth access token");

        let body = RefreshRequest {
            grant_type: "refresh_token",
            refresh_token,
            client_id: &self.client_id,
        };

        let response = self
            .client
            .post(&self.token_url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        if status != 200 {
            log::warn!("[quota:credentials] Token refresh failed: HTTP {}", status);
            return Err(QuotaError::Api(status));
        }

        let text = response.text().await?;
        let parsed: RefreshResponse = serde_json::from_str(&text)?;
        parsed
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| QuotaError::Parse("Refresh response has no access_token".to_string()))
    }
}

// ============================================================================
// CredentialStore
// ============================================================================

/// Entry store: hands out a usable bearer token per fetch
pub struct CredentialStore {
    source: Arc<dyn CredentialSource>,
    refresher: Arc<dyn TokenRefresher>,
}

impl CredentialStore {
    pub fn new(source: Arc<dyn CredentialSource>, refresher: Arc<dyn TokenRefresher>) -> Self {
        Self { source, refresher }
    }

    /// Token for the current instant
    pub async fn current_token(&self) -> Result<String, QuotaError> {
        self.current_token_at(Utc::now()).await
    }

    /// Token as of `now`, refreshing when it is near expiry
    pub async fn current_token_at(&self, now: DateTime<Utc>) -> Result<String, QuotaError> {
        let credentials = self.source.read().ok_or_else(|| {
            QuotaError::NotAuthenticated("No Claude credentials found".to_string())
        })?;

        let mut token = credentials
            .token()
            .ok_or_else(|| QuotaError::NotAuthenticated("No access token in credentials".to_string()))?
            .to_string();

        if !credentials.is_near_expiry(now) {
            return Ok(token);
        }

        log::debug!(
            "[quota:credentials] Token near expiry (expiresAt={:?}), re-reading credentials",
            credentials.expires_at
        );

        // The agent may have refreshed the file since the first read
        let Some(reread) = self.source.read() else {
            return Ok(token);
        };
        if let Some(t) = reread.token() {
            token = t.to_string();
        }
        if !reread.is_near_expiry(now) {
            log::debug!("[quota:credentials] Credentials were refreshed externally");
            return Ok(token);
        }

        let Some(refresh_token) = reread.refresh() else {
            log::debug!("[quota:credentials] No refresh token, using current access token");
            return Ok(token);
        };

        match self.refresher.refresh(refresh_token).await {
            Ok(new_token) => {
                log::info!("[quota:credentials] Access token refreshed");
                Ok(new_token)
            }
            Err(e) => {
                log::warn!("[quota:credentials] Token refresh failed: {}", e);
                // Second race check: the agent may have won the refresh
                if let Some(t) = self.source.read().as_ref().and_then(|c| c.token()) {
                    token = t.to_string();
                }
                Ok(token)
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
