//! Services module

pub mod quota;

pub use quota::{
    ClaudeQuotaProvider, HistoryStore, PollCoordinator, QuotaError, QuotaProvider, UsageSnapshot,
    UsageStats,
};
