//! Claude Code quota provider
//!
//! Turns a bearer token from the [`CredentialStore`] into a
//! [`UsageSnapshot`] by calling Anthropic's OAuth usage API.
//!
//! # Outcome mapping
//!
//! | condition                          | snapshot error        |
//! |------------------------------------|-----------------------|
//! | no credential / no access token    | `Not Logged In`       |
//! | HTTP 401                           | `Session Expired`     |
//! | any other non-200                  | `API Error (<code>)`  |
//! | DNS / connect / timeout            | `Offline`             |
//! | body not the expected structure    | `Data Unavailable`    |
//!
//! Each quota window in a 200 response is decoded independently; a missing
//! window leaves its slot empty rather than failing the snapshot.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use super::credentials::{CredentialStore, FileCredentialSource, OAuthTokenRefresher};
use super::provider::{QuotaError, QuotaProvider};
use super::types::{UsageData, UsageEntry, UsageSnapshot};
use crate::config::QuotaWatchConfig;

// ============================================================================
// Constants
// ============================================================================

/// OAuth beta header value for API access
const OAUTH_BETA_HEADER: &str = "oauth-2025-04-20";

/// Client name sent in the x-app header
const CLIENT_APP_HEADER: &str = "cli";

// ============================================================================
// API Response Types
// ============================================================================

/// Response from Anthropic's OAuth usage API
#[derive(Debug, Deserialize)]
struct OAuthUsageResponse {
    five_hour: Option<UsageWindow>,
    seven_day: Option<UsageWindow>,
    seven_day_opus: Option<UsageWindow>,
    seven_day_sonnet: Option<UsageWindow>,
    extra_usage: Option<ExtraUsage>,
}

/// A single usage window from the API
#[derive(Debug, Deserialize)]
struct UsageWindow {
    /// Utilization as a percentage (28.0 for 28%)
    utilization: Option<f64>,

    /// When this window resets (ISO8601 format)
    resets_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExtraUsage {
    is_enabled: Option<bool>,
}

// ============================================================================
// ClaudeQuotaProvider
// ============================================================================

/// Quota fetcher for Claude Code subscriptions
pub struct ClaudeQuotaProvider {
    client: Client,
    usage_url: String,
    credentials: CredentialStore,
}

impl ClaudeQuotaProvider {
    pub fn new(client: Client, usage_url: impl Into<String>, credentials: CredentialStore) -> Self {
        Self {
            client,
            usage_url: usage_url.into(),
            credentials,
        }
    }

    /// Wire up the file credential source, token refresher and HTTP client
    pub fn from_config(config: &QuotaWatchConfig) -> crate::Result<Self> {
        let client = build_http_client(config.request_timeout())?;

        let source = Arc::new(FileCredentialSource::new(&config.credentials_path));
        let refresher = Arc::new(OAuthTokenRefresher::new(
            client.clone(),
            &config.token_url,
            &config.client_id,
        ));

        Ok(Self::new(
            client,
            &config.usage_url,
            CredentialStore::new(source, refresher),
        ))
    }

    /// Call the Anthropic usage API
    ///
    /// Returns the decoded usage together with the instant the call resolved.
    async fn call_usage_api(&self, token: &str) -> Result<(UsageData, DateTime<Utc>), QuotaError> {
        log::info!("[quota:claude] Fetching quota from Anthropic API");

        let response = self
            .client
            .get(&self.usage_url)
            .header("Authorization", format!("Bearer {}", token))
            .header("anthropic-beta", OAUTH_BETA_HEADER)
            .header("x-app", CLIENT_APP_HEADER)
            .send()
            .await?;
        let resolved_at = Utc::now();

        let status = response.status().as_u16();
        log::debug!("[quota:claude] API response status: {}", status);

        if status != 200 {
            log::warn!("[quota:claude] Usage API returned HTTP {}", status);
            return Err(QuotaError::from_status(status));
        }

        let response_text = response.text().await?;
        let usage = parse_usage_response(&response_text)?;

        log::info!("[quota:claude] Successfully fetched quota data");
        Ok((usage, resolved_at))
    }
}

#[async_trait]
impl QuotaProvider for ClaudeQuotaProvider {
    fn provider_id(&self) -> &'static str {
        "claude"
    }

    fn display_name(&self) -> &'static str {
        "Claude Code"
    }

    async fn fetch(&self) -> UsageSnapshot {
        let result = match self.credentials.current_token().await {
            Ok(token) => self.call_usage_api(&token).await,
            Err(e) => Err(e),
        };

        match result {
            Ok((usage, resolved_at)) => UsageSnapshot::success(usage, resolved_at),
            Err(e) => {
                log::warn!("[quota:claude] Fetch failed: {}", e);
                UsageSnapshot::failure(e.snapshot_code(), Utc::now())
            }
        }
    }
}

/// Build the shared HTTP client with a per-request timeout
pub fn build_http_client(timeout: Duration) -> crate::Result<Client> {
    Ok(Client::builder().timeout(timeout).build()?)
}

// ============================================================================
// Response decoding
// ============================================================================

/// Decode a 200 response body into usage data
fn parse_usage_response(body: &str) -> Result<UsageData, QuotaError> {
    let response: OAuthUsageResponse = serde_json::from_str(body).map_err(|e| {
        log::error!("[quota:claude] Failed to parse API response: {}", e);
        QuotaError::Parse(format!("Invalid API response: {}", e))
    })?;

    Ok(UsageData {
        five_hour: window_to_entry(response.five_hour, "five_hour").unwrap_or_default(),
        seven_day: window_to_entry(response.seven_day, "seven_day").unwrap_or_default(),
        seven_day_sonnet: window_to_entry(response.seven_day_sonnet, "seven_day_sonnet"),
        seven_day_opus: window_to_entry(response.seven_day_opus, "seven_day_opus"),
        extra_usage_enabled: response
            .extra_usage
            .and_then(|extra| extra.is_enabled)
            .unwrap_or(false),
    })
}

/// Convert a single usage window; `None` when the window is absent
fn window_to_entry(window: Option<UsageWindow>, name: &str) -> Option<UsageEntry> {
    let window = window?;
    let utilization = window.utilization.unwrap_or(0.0);

    if !(0.0..=100.0).contains(&utilization) {
        log::warn!(
            "[quota:claude] Window {} utilization {} is outside 0-100, keeping as-is",
            name,
            utilization
        );
    }

    let mut entry = UsageEntry::new(utilization);
    if let Some(resets_at_str) = window.resets_at {
        match DateTime::parse_from_rfc3339(&resets_at_str) {
            Ok(resets_at) => entry = entry.with_resets_at(resets_at.with_timezone(&Utc)),
            Err(_) => log::warn!(
                "[quota:claude] Failed to parse resets_at: {}",
                resets_at_str
            ),
        }
    }

    Some(entry)
}

// ============================================================================
// Tests
// ============================================================================
