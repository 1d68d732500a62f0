//! Quota tracking module
//!
//! Watches the rate-limit quotas of a Claude Code subscription: obtains a
//! valid OAuth token, polls the usage API, keeps a bounded local history and
//! derives trend and exhaustion forecasts from it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ PollCoordinator (timer)                                 │
//! │   - request_fetch()   single-flight                     │
//! │   - complete_fetch()  history + stats                   │
//! │   - tick_at()         countdown                         │
//! └─────────────────────────────────────────────────────────┘
//!          │                              │
//!          ▼                              ▼
//! ┌──────────────────────────┐  ┌──────────────────────────┐
//! │ trait QuotaProvider      │  │ HistoryStore (history)   │
//! │   - fetch() -> Snapshot  │  │   - append() / prune()   │
//! └──────────────────────────┘  │   - atomic save()        │
//!          │                    └──────────────────────────┘
//!          ▼                              │
//! ┌──────────────────────────┐            ▼
//! │ ClaudeQuotaProvider      │  ┌──────────────────────────┐
//! │   └─ CredentialStore     │  │ analytics                │
//! │        - current_token() │  │   average / peak / trend │
//! │        - refresh race    │  │   forecast               │
//! └──────────────────────────┘  └──────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use qwatch_core::config::QuotaWatchConfig;
//! use qwatch_core::services::quota::{ClaudeQuotaProvider, HistoryStore, QuotaProvider};
//!
//! let config = QuotaWatchConfig::from_env()?;
//! let provider = ClaudeQuotaProvider::from_config(&config)?;
//!
//! let snapshot = provider.fetch().await;
//! let mut history = HistoryStore::load(&config.history_path);
//! history.append(&snapshot);
//! ```

pub mod analytics;
pub mod claude;
pub mod credentials;
pub mod history;
pub mod provider;
pub mod stats_cache;
pub mod timer;
pub mod types;

// Re-export main types
pub use types::{
    epoch_seconds, HistoryPoint, QuotaWindowType, SnapshotOutcome, UsageData, UsageEntry,
    UsageSnapshot,
};

// Re-export provider trait and error
pub use provider::{QuotaError, QuotaProvider};

// Re-export providers
pub use claude::{build_http_client, ClaudeQuotaProvider};

// Re-export credential handling
pub use credentials::{
    CredentialSource, CredentialStore, FileCredentialSource, OAuthCredentials,
    OAuthTokenRefresher, TokenRefresher,
};

// Re-export history and analytics
pub use analytics::{Forecast, Trend, UsageStats};
pub use history::{GraphWindow, HistoryStore, MAX_HISTORY_AGE_SECS, MAX_HISTORY_POINTS};
pub use stats_cache::{format_tokens, read_token_stats, TokenStats};

// Re-export timer types
pub use timer::{CountdownTick, PollCoordinator, PollPhase, UsageObserver, UsageUpdate};
