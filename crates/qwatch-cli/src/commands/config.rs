//! Config command
//!
//! Shows the effective configuration and where each value came from.

use anyhow::Result;
use serde::Serialize;
use tabled::Tabled;

use qwatch_core::config::{
    QuotaWatchConfig, ENV_CREDENTIALS_PATH, ENV_HISTORY_PATH, ENV_POLL_INTERVAL_SECS,
    ENV_STATS_CACHE_PATH, ENV_TOKEN_URL, ENV_USAGE_URL,
};

use super::Context;
use crate::output::print_output;

/// Config row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct ConfigRow {
    #[tabled(rename = "Key")]
    pub key: String,
    #[tabled(rename = "Value")]
    pub value: String,
    #[tabled(rename = "Source")]
    pub source: String,
}

fn row(key: &str, value: impl ToString, env_key: Option<&str>) -> ConfigRow {
    let from_env = env_key.is_some_and(|k| std::env::var(k).is_ok_and(|v| !v.trim().is_empty()));
    ConfigRow {
        key: key.to_string(),
        value: value.to_string(),
        source: if from_env { "env" } else { "default" }.to_string(),
    }
}

/// One row per setting, in display order
pub fn config_rows(config: &QuotaWatchConfig) -> Vec<ConfigRow> {
    vec![
        row(
            "credentials_path",
            config.credentials_path.display(),
            Some(ENV_CREDENTIALS_PATH),
        ),
        row(
            "history_path",
            config.history_path.display(),
            Some(ENV_HISTORY_PATH),
        ),
        row(
            "stats_cache_path",
            config.stats_cache_path.display(),
            Some(ENV_STATS_CACHE_PATH),
        ),
        row("usage_url", &config.usage_url, Some(ENV_USAGE_URL)),
        row("token_url", &config.token_url, Some(ENV_TOKEN_URL)),
        row("client_id", &config.client_id, None),
        row(
            "poll_interval_secs",
            config.poll_interval_secs,
            Some(ENV_POLL_INTERVAL_SECS),
        ),
        row(
            "countdown_interval_secs",
            config.countdown_interval_secs,
            None,
        ),
        row("request_timeout_secs", config.request_timeout_secs, None),
    ]
}

pub async fn execute(ctx: &Context) -> Result<()> {
    print_output(&config_rows(&ctx.config), ctx.format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_rows_cover_every_setting() {
        let config = QuotaWatchConfig::default();
        let rows = config_rows(&config);

        assert_eq!(rows.len(), 9);
        let poll = rows.iter().find(|r| r.key == "poll_interval_secs").unwrap();
        assert_eq!(poll.value, "60");
        let client = rows.iter().find(|r| r.key == "client_id").unwrap();
        assert_eq!(client.source, "default");
    }
}
