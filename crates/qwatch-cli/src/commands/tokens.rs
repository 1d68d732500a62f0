//! Tokens command
//!
//! Shows the output and cache-read token totals Claude Code keeps locally.

use anyhow::Result;
use serde::Serialize;
use tabled::Tabled;

use qwatch_core::{format_tokens, read_token_stats, TokenStats};

use super::Context;
use crate::output::{print_info, print_json, print_single, OutputFormat};

/// Token totals row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct TokenRow {
    #[tabled(rename = "Output")]
    pub output: String,
    #[tabled(rename = "Cache Read")]
    pub cache_read: String,
}

impl From<TokenStats> for TokenRow {
    fn from(stats: TokenStats) -> Self {
        Self {
            output: format_tokens(stats.total_output),
            cache_read: format_tokens(stats.total_cache_read),
        }
    }
}

pub async fn execute(ctx: &Context) -> Result<()> {
    let path = &ctx.config.stats_cache_path;
    let Some(stats) = read_token_stats(path) else {
        print_info(
            &format!("No token statistics found at {}", path.display()),
            ctx.quiet,
        );
        return Ok(());
    };

    match ctx.format {
        OutputFormat::Json => print_json(&stats)?,
        OutputFormat::Table => print_single(&TokenRow::from(stats), ctx.format)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_row() {
        let row = TokenRow::from(TokenStats {
            total_output: 1_240_000,
            total_cache_read: 3_400_000_000,
        });
        assert_eq!(row.output, "1.2M");
        assert_eq!(row.cache_read, "3.4B");
    }
}
