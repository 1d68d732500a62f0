//! CLI commands module
//!
//! Contains all CLI command implementations.

pub mod config;
pub mod history;
pub mod status;
pub mod tokens;
pub mod watch;

use crate::output::OutputFormat;
use qwatch_core::config::QuotaWatchConfig;

/// Shared context for all commands
pub struct Context {
    pub config: QuotaWatchConfig,
    pub format: OutputFormat,
    pub quiet: bool,
}

/// Render a utilization percentage the way every command shows it
pub fn format_pct(pct: f64) -> String {
    format!("{:.0}%", pct)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_pct() {
        assert_eq!(format_pct(0.0), "0%");
        assert_eq!(format_pct(42.4), "42%");
        assert_eq!(format_pct(104.6), "105%");
    }
}
