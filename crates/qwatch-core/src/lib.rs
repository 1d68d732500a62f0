//! # qwatch-core
//!
//! Core quota tracking for qwatch, shared by the CLI and any other front end.
//!
//! This crate provides:
//! - Runtime configuration (`config` module)
//! - Quota fetching, history and analytics (`services::quota`)
//! - Unified error handling (`error` module)

pub mod config;
pub mod error;
pub mod services;

// Re-exports for convenience
pub use config::QuotaWatchConfig;
pub use error::{Error, Result};

// Re-export commonly used types from services
pub use services::quota::{
    format_tokens, read_token_stats, ClaudeQuotaProvider, CountdownTick, Forecast, GraphWindow,
    HistoryPoint, HistoryStore, PollCoordinator, PollPhase, QuotaError, QuotaProvider,
    TokenStats, Trend, UsageData, UsageEntry, UsageObserver, UsageSnapshot, UsageStats,
    UsageUpdate,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the library version
pub fn version() -> &'static str {
    VERSION
}
