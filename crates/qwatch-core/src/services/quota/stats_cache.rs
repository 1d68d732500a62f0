//! Local token statistics from Claude Code's stats cache
//!
//! Claude Code keeps a running `~/.claude/stats-cache.json` with per-model
//! token counters. Only the `modelUsage` map is read:
//!
//! ```json
//! { "modelUsage": { "<model>": { "outputTokens": 1200, "cacheReadInputTokens": 98000 } } }
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct StatsCacheFile {
    #[serde(rename = "modelUsage", default)]
    model_usage: HashMap<String, ModelTokenCounters>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ModelTokenCounters {
    output_tokens: u64,
    cache_read_input_tokens: u64,
}

/// Token totals summed across every model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenStats {
    pub total_output: u64,
    pub total_cache_read: u64,
}

// ============================================================================
// Reading
// ============================================================================

/// Read and sum the stats cache; `None` if it is missing or malformed
pub fn read_token_stats(path: &Path) -> Option<TokenStats> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            log::debug!("[quota:stats] No stats cache at {:?}: {}", path, e);
            return None;
        }
    };

    match parse_token_stats(&content) {
        Ok(stats) => Some(stats),
        Err(e) => {
            log::warn!("[quota:stats] Ignoring unreadable stats cache {:?}: {}", path, e);
            None
        }
    }
}

fn parse_token_stats(content: &str) -> Result<TokenStats, serde_json::Error> {
    let file: StatsCacheFile = serde_json::from_str(content)?;

    Ok(file
        .model_usage
        .values()
        .fold(TokenStats::default(), |acc, counters| TokenStats {
            total_output: acc.total_output.saturating_add(counters.output_tokens),
            total_cache_read: acc
                .total_cache_read
                .saturating_add(counters.cache_read_input_tokens),
        }))
}

/// Compact token count: `1.2B`, `3.4M`, `5.6K` or the plain number
pub fn format_tokens(n: u64) -> String {
    if n >= 1_000_000_000 {
        format!("{:.1}B", n as f64 / 1_000_000_000.0)
    } else if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================
