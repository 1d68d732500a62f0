//! Runtime configuration
//!
//! Paths and endpoints default to the locations the Claude Code agent uses
//! under `~/.claude`. Each can be overridden through a `QWATCH_*`
//! environment variable.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Anthropic OAuth usage API endpoint
pub const DEFAULT_USAGE_URL: &str = "https://api.anthropic.com/api/oauth/usage";

/// OAuth token endpoint used for refresh_token grants
pub const DEFAULT_TOKEN_URL: &str = "https://platform.claude.com/v1/oauth/token";

/// OAuth client id of the Claude Code CLI
pub const DEFAULT_CLIENT_ID: &str = "9d1c250a-e61b-44d9-88ed-5944d1962f5e";

/// Default polling cadence
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Lower bound for the polling cadence
pub const MIN_POLL_INTERVAL_SECS: u64 = 10;

/// Countdown re-render cadence
pub const DEFAULT_COUNTDOWN_INTERVAL_SECS: u64 = 1;

/// HTTP timeout for both the usage and the token endpoint
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

pub const ENV_CREDENTIALS_PATH: &str = "QWATCH_CREDENTIALS_PATH";
pub const ENV_HISTORY_PATH: &str = "QWATCH_HISTORY_PATH";
pub const ENV_STATS_CACHE_PATH: &str = "QWATCH_STATS_CACHE_PATH";
pub const ENV_USAGE_URL: &str = "QWATCH_USAGE_URL";
pub const ENV_TOKEN_URL: &str = "QWATCH_TOKEN_URL";
pub const ENV_POLL_INTERVAL_SECS: &str = "QWATCH_POLL_INTERVAL_SECS";

/// Effective configuration for one qwatch process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaWatchConfig {
    /// Credentials file maintained by the Claude Code agent
    pub credentials_path: PathBuf,
    /// Persisted usage history
    pub history_path: PathBuf,
    /// Claude Code's local token statistics cache
    pub stats_cache_path: PathBuf,
    pub usage_url: String,
    pub token_url: String,
    pub client_id: String,
    pub poll_interval_secs: u64,
    pub countdown_interval_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for QuotaWatchConfig {
    fn default() -> Self {
        let claude_home = claude_home();
        Self {
            credentials_path: claude_home.join(".credentials.json"),
            history_path: claude_home.join("usage_history.json"),
            stats_cache_path: claude_home.join("stats-cache.json"),
            usage_url: DEFAULT_USAGE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            countdown_interval_secs: DEFAULT_COUNTDOWN_INTERVAL_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl QuotaWatchConfig {
    /// Defaults with `QWATCH_*` environment overrides applied
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = env_path(ENV_CREDENTIALS_PATH) {
            config.credentials_path = path;
        }
        if let Some(path) = env_path(ENV_HISTORY_PATH) {
            config.history_path = path;
        }
        if let Some(path) = env_path(ENV_STATS_CACHE_PATH) {
            config.stats_cache_path = path;
        }
        if let Ok(url) = std::env::var(ENV_USAGE_URL) {
            config.usage_url = url;
        }
        if let Ok(url) = std::env::var(ENV_TOKEN_URL) {
            config.token_url = url;
        }
        if let Ok(raw) = std::env::var(ENV_POLL_INTERVAL_SECS) {
            config.poll_interval_secs = raw.trim().parse().map_err(|_| {
                Error::config(format!(
                    "{} must be a whole number of seconds, got '{}'",
                    ENV_POLL_INTERVAL_SECS, raw
                ))
            })?;
        }

        Ok(config.validate())
    }

    /// Clamp cadence and timeouts to usable values
    pub fn validate(self) -> Self {
        Self {
            poll_interval_secs: self.poll_interval_secs.max(MIN_POLL_INTERVAL_SECS),
            countdown_interval_secs: self.countdown_interval_secs.max(1),
            request_timeout_secs: self.request_timeout_secs.max(1),
            ..self
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn countdown_interval(&self) -> Duration {
        Duration::from_secs(self.countdown_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// `~/.claude`, or `./.claude` when no home directory can be resolved
fn claude_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".claude")
}

/// Read a path-valued env var, expanding a leading `~`
fn env_path(key: &str) -> Option<PathBuf> {
    let raw = std::env::var(key).ok()?;
    if raw.trim().is_empty() {
        return None;
    }
    Some(expand_path(&raw))
}

/// Expand `~` and `$VARS` in a user-supplied path
pub fn expand_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(e) => {
            log::warn!("[config] Could not expand path {}: {}", raw, e);
            Path::new(raw).to_path_buf()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Env var tests must not interleave
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for key in [
            ENV_CREDENTIALS_PATH,
            ENV_HISTORY_PATH,
            ENV_STATS_CACHE_PATH,
            ENV_USAGE_URL,
            ENV_TOKEN_URL,
            ENV_POLL_INTERVAL_SECS,
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_default_paths() {
        let config = QuotaWatchConfig::default();
        assert!(config
            .credentials_path
            .ends_with(".claude/.credentials.json"));
        assert!(config.history_path.ends_with(".claude/usage_history.json"));
        assert!(config.stats_cache_path.ends_with(".claude/stats-cache.json"));
        assert_eq!(config.poll_interval_secs, 60);
        assert_eq!(config.request_timeout_secs, 15);
    }

    #[test]
    fn test_from_env_overrides() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();
        std::env::set_var(ENV_HISTORY_PATH, "/tmp/qwatch/history.json");
        std::env::set_var(ENV_USAGE_URL, "http://127.0.0.1:9/usage");
        std::env::set_var(ENV_POLL_INTERVAL_SECS, "120");

        let config = QuotaWatchConfig::from_env().unwrap();
        assert_eq!(config.history_path, PathBuf::from("/tmp/qwatch/history.json"));
        assert_eq!(config.usage_url, "http://127.0.0.1:9/usage");
        assert_eq!(config.poll_interval_secs, 120);
        assert_eq!(config.token_url, DEFAULT_TOKEN_URL);

        clear_env();
    }

    #[test]
    fn test_from_env_rejects_bad_interval() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_env();
        std::env::set_var(ENV_POLL_INTERVAL_SECS, "soon");

        let err = QuotaWatchConfig::from_env().unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        clear_env();
    }

    #[test]
    fn test_validate_enforces_minimums() {
        let config = QuotaWatchConfig {
            poll_interval_secs: 1,
            countdown_interval_secs: 0,
            request_timeout_secs: 0,
            ..Default::default()
        }
        .validate();

        assert_eq!(config.poll_interval_secs, MIN_POLL_INTERVAL_SECS);
        assert_eq!(config.countdown_interval_secs, 1);
        assert_eq!(config.request_timeout_secs, 1);
    }

    #[test]
    fn test_expand_path_tilde() {
        let expanded = expand_path("~/history.json");
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.ends_with("history.json"));
    }
}
