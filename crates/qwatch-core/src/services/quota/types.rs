//! Quota tracking types
//!
//! Value objects shared by the fetcher, the history store and the analytics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Window Types
// ============================================================================

/// Quota windows reported by the usage API
///
/// - 5-hour rolling window for rate limits
/// - 7-day rolling window across all models
/// - 7-day windows scoped to the Opus and Sonnet tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaWindowType {
    FiveHour,
    SevenDay,
    SevenDayOpus,
    SevenDaySonnet,
}

impl QuotaWindowType {
    /// Label used by the presentation layer
    pub fn label(&self) -> &'static str {
        match self {
            QuotaWindowType::FiveHour => "5-Hour",
            QuotaWindowType::SevenDay => "7-Day",
            QuotaWindowType::SevenDayOpus => "Opus (7-Day)",
            QuotaWindowType::SevenDaySonnet => "Sonnet (7-Day)",
        }
    }
}

impl std::fmt::Display for QuotaWindowType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuotaWindowType::FiveHour => write!(f, "5_hour"),
            QuotaWindowType::SevenDay => write!(f, "7_day"),
            QuotaWindowType::SevenDayOpus => write!(f, "7_day_opus"),
            QuotaWindowType::SevenDaySonnet => write!(f, "7_day_sonnet"),
        }
    }
}

// ============================================================================
// Usage Entry
// ============================================================================

/// Saturation of one quota window and the instant it resets
///
/// `utilization` is a percentage as reported by the API. It is not clamped,
/// so values outside 0-100 are carried through unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageEntry {
    pub utilization: f64,
    pub resets_at: Option<DateTime<Utc>>,
}

impl UsageEntry {
    pub fn new(utilization: f64) -> Self {
        Self {
            utilization,
            resets_at: None,
        }
    }

    /// Set the reset time for this entry
    pub fn with_resets_at(mut self, resets_at: DateTime<Utc>) -> Self {
        self.resets_at = Some(resets_at);
        self
    }

    /// Human readable time until this window resets
    ///
    /// `"—"` without a reset time, `"now"` once it has passed, otherwise the
    /// two most significant units (`"2d 4h"`, `"3h 12m"`, `"45m"`).
    pub fn time_remaining(&self, now: DateTime<Utc>) -> String {
        let Some(resets_at) = self.resets_at else {
            return "—".to_string();
        };

        let total_seconds = (resets_at - now).num_seconds();
        if total_seconds <= 0 {
            return "now".to_string();
        }

        let days = total_seconds / 86_400;
        let hours = (total_seconds % 86_400) / 3_600;
        let minutes = (total_seconds % 3_600) / 60;

        if days > 0 {
            format!("{}d {}h", days, hours)
        } else if hours > 0 {
            format!("{}h {}m", hours, minutes)
        } else {
            format!("{}m", minutes)
        }
    }
}

// ============================================================================
// Usage Data / Snapshot
// ============================================================================

/// Decoded quota windows from one successful fetch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageData {
    pub five_hour: UsageEntry,
    pub seven_day: UsageEntry,
    pub seven_day_sonnet: Option<UsageEntry>,
    pub seven_day_opus: Option<UsageEntry>,
    pub extra_usage_enabled: bool,
}

impl UsageData {
    /// Model-scoped entry shown alongside the 5-hour and 7-day windows
    ///
    /// Opus takes precedence over Sonnet.
    pub fn model_entry(&self) -> Option<(QuotaWindowType, &UsageEntry)> {
        if let Some(opus) = &self.seven_day_opus {
            return Some((QuotaWindowType::SevenDayOpus, opus));
        }
        self.seven_day_sonnet
            .as_ref()
            .map(|sonnet| (QuotaWindowType::SevenDaySonnet, sonnet))
    }

    /// Model tier the account is limited on: "opus", "sonnet" or "unknown"
    pub fn model_name(&self) -> &'static str {
        match self.model_entry() {
            Some((QuotaWindowType::SevenDayOpus, _)) => "opus",
            Some(_) => "sonnet",
            None => "unknown",
        }
    }

    /// Utilization of the model-scoped window, 0 when the account has none
    pub fn model_pct(&self) -> f64 {
        self.model_entry()
            .map(|(_, entry)| entry.utilization)
            .unwrap_or(0.0)
    }

    /// Subscription plan inferred from which model windows are present
    pub fn plan_name(&self) -> &'static str {
        match self.model_entry() {
            Some((QuotaWindowType::SevenDayOpus, _)) => "CLAUDE MAX",
            Some(_) => "CLAUDE PRO",
            None => "CLAUDE",
        }
    }
}

/// Result of one fetch cycle
///
/// Exactly one of usage data or an error code is present. The error code is
/// the short machine-readable string produced by
/// [`QuotaError::snapshot_code`](super::provider::QuotaError::snapshot_code).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    #[serde(flatten)]
    pub outcome: SnapshotOutcome,
    /// When the HTTP call resolved (or the failure was observed)
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotOutcome {
    Usage(UsageData),
    Error(String),
}

impl UsageSnapshot {
    pub fn success(usage: UsageData, fetched_at: DateTime<Utc>) -> Self {
        Self {
            outcome: SnapshotOutcome::Usage(usage),
            fetched_at,
        }
    }

    pub fn failure(code: impl Into<String>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            outcome: SnapshotOutcome::Error(code.into()),
            fetched_at,
        }
    }

    pub fn usage(&self) -> Option<&UsageData> {
        match &self.outcome {
            SnapshotOutcome::Usage(usage) => Some(usage),
            SnapshotOutcome::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            SnapshotOutcome::Usage(_) => None,
            SnapshotOutcome::Error(code) => Some(code),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error().is_some()
    }
}

// ============================================================================
// History Point
// ============================================================================

fn unknown_model() -> String {
    "unknown".to_string()
}

/// One durable observation in the usage history
///
/// `timestamp` is seconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub timestamp: f64,
    pub five_hour_pct: f64,
    pub seven_day_pct: f64,
    pub model_pct: f64,
    #[serde(default = "unknown_model")]
    pub model_name: String,
}

impl HistoryPoint {
    /// Derive a point from a successful snapshot; error snapshots yield `None`
    pub fn from_snapshot(snapshot: &UsageSnapshot) -> Option<Self> {
        let usage = snapshot.usage()?;
        Some(Self {
            timestamp: epoch_seconds(snapshot.fetched_at),
            five_hour_pct: usage.five_hour.utilization,
            seven_day_pct: usage.seven_day.utilization,
            model_pct: usage.model_pct(),
            model_name: usage.model_name().to_string(),
        })
    }
}

/// Fractional seconds since the Unix epoch
pub fn epoch_seconds(at: DateTime<Utc>) -> f64 {
    at.timestamp_millis() as f64 / 1000.0
}

// ============================================================================
// Tests
// ============================================================================
