//! Usage history storage
//!
//! A bounded series of [`HistoryPoint`]s persisted as a JSON array. Every
//! mutation rewrites the file through a temporary sibling that is renamed
//! over the target, so a reader sees either the previous or the new series.
//!
//! Retention is two independent rules applied in order: points older than
//! [`MAX_HISTORY_AGE_SECS`] are dropped first, then only the newest
//! [`MAX_HISTORY_POINTS`] are kept.
//!
//! Persistence is best-effort. Load failures start an empty series and save
//! failures are logged; neither reaches the caller.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::types::{epoch_seconds, HistoryPoint, UsageSnapshot};

// ============================================================================
// Constants
// ============================================================================

/// Maximum age of a retained point
pub const MAX_HISTORY_AGE_SECS: u64 = 24 * 3600;

/// Maximum number of retained points (24h at one poll per minute)
pub const MAX_HISTORY_POINTS: usize = 1440;

// ============================================================================
// Graph windows
// ============================================================================

/// Time span selectable for graphing the series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GraphWindow {
    ThirtyMinutes,
    FiveHours,
    #[default]
    TwentyFourHours,
}

impl GraphWindow {
    pub fn duration(&self) -> Duration {
        match self {
            GraphWindow::ThirtyMinutes => Duration::from_secs(30 * 60),
            GraphWindow::FiveHours => Duration::from_secs(5 * 3600),
            GraphWindow::TwentyFourHours => Duration::from_secs(MAX_HISTORY_AGE_SECS),
        }
    }
}

impl std::fmt::Display for GraphWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphWindow::ThirtyMinutes => write!(f, "30m"),
            GraphWindow::FiveHours => write!(f, "5h"),
            GraphWindow::TwentyFourHours => write!(f, "24h"),
        }
    }
}

impl std::str::FromStr for GraphWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "30m" | "30min" => Ok(GraphWindow::ThirtyMinutes),
            "5h" | "5hour" => Ok(GraphWindow::FiveHours),
            "24h" | "1d" | "day" => Ok(GraphWindow::TwentyFourHours),
            _ => Err(format!("Unknown graph window: {}. Use 30m, 5h or 24h", s)),
        }
    }
}

// ============================================================================
// HistoryStore
// ============================================================================

/// Durable, bounded history of successful observations
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    points: Vec<HistoryPoint>,
}

impl HistoryStore {
    /// Load the persisted series, or start empty if it is missing or corrupt
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let points = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Vec<HistoryPoint>>(&content) {
                Ok(points) => {
                    log::debug!(
                        "[quota:history] Loaded {} points from {:?}",
                        points.len(),
                        path
                    );
                    points
                }
                Err(e) => {
                    log::warn!(
                        "[quota:history] Ignoring unreadable history {:?}: {}",
                        path,
                        e
                    );
                    Vec::new()
                }
            },
            Err(e) => {
                log::debug!("[quota:history] No history at {:?}: {}", path, e);
                Vec::new()
            }
        };

        Self { path, points }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn points(&self) -> &[HistoryPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Record a snapshot, pruning and persisting relative to the current time
    ///
    /// Returns whether a point was appended.
    pub fn append(&mut self, snapshot: &UsageSnapshot) -> bool {
        self.append_at(snapshot, Utc::now())
    }

    /// Record a snapshot as of `now`; error snapshots leave the series untouched
    pub fn append_at(&mut self, snapshot: &UsageSnapshot, now: DateTime<Utc>) -> bool {
        let Some(mut point) = HistoryPoint::from_snapshot(snapshot) else {
            return false;
        };

        // Keep timestamps non-decreasing if the wall clock stepped back
        if let Some(last) = self.points.last() {
            if point.timestamp < last.timestamp {
                log::debug!(
                    "[quota:history] Clock went backwards ({} < {}), pinning to last point",
                    point.timestamp,
                    last.timestamp
                );
                point.timestamp = last.timestamp;
            }
        }

        self.points.push(point);
        self.prune(now);
        self.persist();
        true
    }

    /// Apply the age rule, then the count rule
    pub fn prune(&mut self, now: DateTime<Utc>) {
        let cutoff = epoch_seconds(now) - MAX_HISTORY_AGE_SECS as f64;
        self.points.retain(|p| p.timestamp >= cutoff);

        if self.points.len() > MAX_HISTORY_POINTS {
            let excess = self.points.len() - MAX_HISTORY_POINTS;
            self.points.drain(..excess);
        }
    }

    /// Points whose timestamp falls within `window` before `now`, in order
    pub fn points_within(&self, window: GraphWindow, now: DateTime<Utc>) -> &[HistoryPoint] {
        let now_secs = epoch_seconds(now);
        let start = now_secs - window.duration().as_secs_f64();
        let first = self.points.partition_point(|p| p.timestamp < start);
        let end = self.points.partition_point(|p| p.timestamp <= now_secs);
        &self.points[first..end.max(first)]
    }

    /// Persist the series, logging instead of returning failures
    fn persist(&self) {
        if let Err(e) = self.save() {
            log::warn!(
                "[quota:history] Could not persist history to {:?}: {}",
                self.path,
                e
            );
        }
    }

    /// Atomically replace the history file with the current series
    pub fn save(&self) -> crate::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string(&self.points)?;
        let tmp_path = self.path.with_extension("tmp");
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
