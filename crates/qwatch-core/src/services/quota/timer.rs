//! Quota polling coordinator
//!
//! Drives the fetch cadence and owns the state the presentation layer reads.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      PollCoordinator                         │
//! │                                                              │
//! │  fetch tick ──► request_fetch() ──spawn──► provider.fetch()  │
//! │                   Idle → Fetching                  │         │
//! │                                                    ▼         │
//! │  completion ◄──────────── mpsc ◄────────── UsageSnapshot     │
//! │     │  Fetching → Idle                                       │
//! │     ├─► HistoryStore::append()                               │
//! │     └─► UsageStats::compute() ──► UsageObserver::on_update   │
//! │                                                              │
//! │  countdown tick ──► UsageObserver::on_tick (no I/O)          │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Only the network-bound fetch runs off the coordinator's task. A fetch
//! request while one is in flight is dropped, never queued; a hung fetch
//! simply delays the next poll until the HTTP client times out.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;

use super::analytics::{self, Forecast, UsageStats};
use super::history::HistoryStore;
use super::provider::QuotaProvider;
use super::types::UsageSnapshot;
use crate::config::QuotaWatchConfig;

// ============================================================================
// Phase
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollPhase {
    Idle,
    Fetching,
}

// ============================================================================
// Published values
// ============================================================================

/// Published after every completed fetch
#[derive(Debug, Clone)]
pub struct UsageUpdate {
    pub snapshot: Arc<UsageSnapshot>,
    pub stats: UsageStats,
    pub next_fetch_at: Option<DateTime<Utc>>,
}

/// Published on every countdown tick; carries no new data, only
/// time-dependent values recomputed against `now`
#[derive(Debug, Clone)]
pub struct CountdownTick {
    pub now: DateTime<Utc>,
    pub snapshot: Option<Arc<UsageSnapshot>>,
    pub seconds_until_next: i64,
    pub forecast: Forecast,
    pub five_hour_resets_in: String,
    pub seven_day_resets_in: String,
}

impl CountdownTick {
    /// Status line for the latest snapshot
    pub fn status_line(&self) -> String {
        match self.snapshot.as_deref() {
            None => "Loading...".to_string(),
            Some(snapshot) => match snapshot.error() {
                Some(code) => code.to_string(),
                None => format!("Updated: just now  ·  Next: {}s", self.seconds_until_next),
            },
        }
    }

    /// Reset countdowns and forecast, once a successful snapshot exists
    pub fn detail_line(&self) -> Option<String> {
        self.snapshot.as_deref()?.usage()?;

        let mut line = format!(
            "5h resets in {}  ·  7d resets in {}",
            self.five_hour_resets_in, self.seven_day_resets_in
        );
        if self.forecast.is_available() {
            line.push_str(&format!("  ·  {}", self.forecast));
        }
        Some(line)
    }
}

/// Presentation-side sink for coordinator output
pub trait UsageObserver: Send {
    fn on_update(&mut self, update: &UsageUpdate);

    fn on_tick(&mut self, _tick: &CountdownTick) {}
}

// ============================================================================
// PollCoordinator
// ============================================================================

pub struct PollCoordinator {
    provider: Arc<dyn QuotaProvider>,
    history: HistoryStore,
    latest: Option<Arc<UsageSnapshot>>,
    phase: PollPhase,
    next_fetch_deadline: Option<DateTime<Utc>>,
    poll_interval: Duration,
    countdown_interval: Duration,
    completion_tx: mpsc::UnboundedSender<UsageSnapshot>,
    completion_rx: Option<mpsc::UnboundedReceiver<UsageSnapshot>>,
}

impl PollCoordinator {
    pub fn new(
        provider: Arc<dyn QuotaProvider>,
        history: HistoryStore,
        poll_interval: Duration,
        countdown_interval: Duration,
    ) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        Self {
            provider,
            history,
            latest: None,
            phase: PollPhase::Idle,
            next_fetch_deadline: None,
            poll_interval,
            countdown_interval,
            completion_tx,
            completion_rx: Some(completion_rx),
        }
    }

    pub fn from_config(
        provider: Arc<dyn QuotaProvider>,
        history: HistoryStore,
        config: &QuotaWatchConfig,
    ) -> Self {
        Self::new(
            provider,
            history,
            config.poll_interval(),
            config.countdown_interval(),
        )
    }

    pub fn phase(&self) -> PollPhase {
        self.phase
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn latest(&self) -> Option<Arc<UsageSnapshot>> {
        self.latest.clone()
    }

    pub fn next_fetch_deadline(&self) -> Option<DateTime<Utc>> {
        self.next_fetch_deadline
    }

    /// Start a background fetch unless one is already in flight
    ///
    /// Returns whether a fetch was started. Must be called within a tokio
    /// runtime.
    pub fn request_fetch(&mut self) -> bool {
        if self.phase == PollPhase::Fetching {
            log::debug!("[quota:timer] Fetch already in flight, skipping");
            return false;
        }

        self.phase = PollPhase::Fetching;
        self.next_fetch_deadline = chrono::Duration::from_std(self.poll_interval)
            .ok()
            .map(|interval| Utc::now() + interval);

        let provider = Arc::clone(&self.provider);
        let completion_tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let snapshot = provider.fetch().await;
            if completion_tx.send(snapshot).is_err() {
                log::debug!("[quota:timer] Coordinator gone, dropping fetch result");
            }
        });

        log::debug!(
            "[quota:timer] Fetch started via {}",
            self.provider.display_name()
        );
        true
    }

    /// Wait for the in-flight fetch to deliver its snapshot
    ///
    /// Returns `None` once [`run`](Self::run) has taken the completion channel.
    pub async fn next_completion(&mut self) -> Option<UsageSnapshot> {
        self.completion_rx.as_mut()?.recv().await
    }

    /// Apply a finished fetch: back to idle, record history, recompute stats
    pub fn complete_fetch(&mut self, snapshot: UsageSnapshot) -> UsageUpdate {
        self.phase = PollPhase::Idle;

        match snapshot.error() {
            Some(code) => log::info!("[quota:timer] Poll finished with error: {}", code),
            None => {
                self.history.append(&snapshot);
            }
        }

        let snapshot = Arc::new(snapshot);
        self.latest = Some(Arc::clone(&snapshot));

        UsageUpdate {
            snapshot,
            stats: self.stats_at(Utc::now()),
            next_fetch_at: self.next_fetch_deadline,
        }
    }

    /// Analytics over the current history as of `now`
    pub fn stats_at(&self, now: DateTime<Utc>) -> UsageStats {
        UsageStats::from_history(self.history.points(), now)
    }

    /// Time-dependent values for the presentation layer recomputed at `now`;
    /// touches no I/O
    pub fn tick_at(&self, now: DateTime<Utc>) -> CountdownTick {
        let seconds_until_next = self
            .next_fetch_deadline
            .map(|deadline| (deadline - now).num_seconds().max(0))
            .unwrap_or(0);

        let usage = self.latest.as_deref().and_then(UsageSnapshot::usage);
        let current_pct = usage
            .map(|u| u.five_hour.utilization)
            .or_else(|| self.history.points().last().map(|p| p.five_hour_pct))
            .unwrap_or(0.0);
        let (five_hour_resets_in, seven_day_resets_in) = match usage {
            Some(u) => (
                u.five_hour.time_remaining(now),
                u.seven_day.time_remaining(now),
            ),
            None => ("—".to_string(), "—".to_string()),
        };

        CountdownTick {
            now,
            snapshot: self.latest.clone(),
            seconds_until_next,
            forecast: analytics::forecast(self.history.points(), current_pct, now),
            five_hour_resets_in,
            seven_day_resets_in,
        }
    }

    /// Poll until `shutdown` fires, returning the history for reuse
    ///
    /// The first fetch is issued immediately.
    pub async fn run(
        mut self,
        observer: &mut dyn UsageObserver,
        mut shutdown: oneshot::Receiver<()>,
    ) -> HistoryStore {
        let Some(mut completions) = self.completion_rx.take() else {
            log::error!("[quota:timer] Completion channel already taken");
            return self.history;
        };

        let mut fetch_timer = tokio::time::interval(self.poll_interval);
        fetch_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut countdown_timer = tokio::time::interval(self.countdown_interval);
        countdown_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        log::info!(
            "[quota:timer] Polling loop started (interval: {:?})",
            self.poll_interval
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    log::info!("[quota:timer] Received shutdown signal");
                    break;
                }
                Some(snapshot) = completions.recv() => {
                    let update = self.complete_fetch(snapshot);
                    observer.on_update(&update);
                }
                _ = fetch_timer.tick() => {
                    self.request_fetch();
                }
                _ = countdown_timer.tick() => {
                    observer.on_tick(&self.tick_at(Utc::now()));
                }
            }
        }

        log::info!("[quota:timer] Polling loop exited");
        self.history
    }
}

// ============================================================================
// Tests
// ============================================================================
