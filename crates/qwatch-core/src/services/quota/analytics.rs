//! Usage analytics
//!
//! Stateless functions over a history series. Everything here is recomputed
//! on demand from the points passed in.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::types::{epoch_seconds, HistoryPoint};

/// Points compared on each side of the trend
const TREND_SPAN: usize = 3;

/// Mean difference beyond which the trend is not steady
const TREND_THRESHOLD: f64 = 2.0;

/// Forecast only looks at points from this far back
const FORECAST_LOOKBACK_SECS: f64 = 5.0 * 60.0;

/// Minimum spread between the oldest and newest forecast points
const FORECAST_MIN_SPAN_MINUTES: f64 = 0.5;

/// Estimates beyond this are reported as "more than a day"
const FORECAST_HORIZON_MINUTES: f64 = 1440.0;

// ============================================================================
// Average / Peak
// ============================================================================

/// Mean 5-hour utilization across all points, 0 when empty
pub fn average_five_hour(points: &[HistoryPoint]) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    points.iter().map(|p| p.five_hour_pct).sum::<f64>() / points.len() as f64
}

/// Highest 5-hour utilization, 0 when empty
pub fn peak_five_hour(points: &[HistoryPoint]) -> f64 {
    points
        .iter()
        .map(|p| p.five_hour_pct)
        .reduce(f64::max)
        .unwrap_or(0.0)
}

// ============================================================================
// Trend
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increasing,
    Decreasing,
    Steady,
    /// Not enough points to tell
    Neutral,
}

impl Trend {
    pub fn symbol(&self) -> &'static str {
        match self {
            Trend::Increasing => "↑",
            Trend::Decreasing => "↓",
            Trend::Steady => "→",
            Trend::Neutral => "—",
        }
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Compare the mean of the last three points with the three before them
pub fn trend(points: &[HistoryPoint]) -> Trend {
    if points.len() < TREND_SPAN * 2 {
        return Trend::Neutral;
    }

    let tail = &points[points.len() - TREND_SPAN * 2..];
    let prior = average_five_hour(&tail[..TREND_SPAN]);
    let recent = average_five_hour(&tail[TREND_SPAN..]);
    let diff = recent - prior;

    if diff > TREND_THRESHOLD {
        Trend::Increasing
    } else if diff < -TREND_THRESHOLD {
        Trend::Decreasing
    } else {
        Trend::Steady
    }
}

// ============================================================================
// Forecast
// ============================================================================

/// Time until the 5-hour window is exhausted at the recent rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Forecast {
    /// Too little recent data, or already at 100%
    Unavailable,
    NotIncreasing,
    MoreThanDay,
    Remaining { hours: u64, minutes: u64 },
}

impl Forecast {
    pub fn is_available(&self) -> bool {
        !matches!(self, Forecast::Unavailable)
    }
}

impl std::fmt::Display for Forecast {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Forecast::Unavailable => Ok(()),
            Forecast::NotIncreasing => write!(f, "not increasing"),
            Forecast::MoreThanDay => write!(f, ">24h left at current rate"),
            Forecast::Remaining { hours: 0, minutes } => {
                write!(f, "~{}m left at current rate", minutes)
            }
            Forecast::Remaining { hours, minutes } => {
                write!(f, "~{}h {}m left at current rate", hours, minutes)
            }
        }
    }
}

/// Estimate time to exhaustion from the points of the last five minutes
///
/// `current_pct` is not clamped: values above 100 yield no estimate and
/// negative values simply lengthen the estimate.
pub fn forecast(points: &[HistoryPoint], current_pct: f64, now: DateTime<Utc>) -> Forecast {
    if current_pct >= 100.0 {
        return Forecast::Unavailable;
    }

    let cutoff = epoch_seconds(now) - FORECAST_LOOKBACK_SECS;
    let recent: Vec<&HistoryPoint> = points.iter().filter(|p| p.timestamp >= cutoff).collect();

    let (Some(oldest), Some(newest)) = (recent.first(), recent.last()) else {
        return Forecast::Unavailable;
    };
    if recent.len() < 2 {
        return Forecast::Unavailable;
    }

    let span_minutes = (newest.timestamp - oldest.timestamp) / 60.0;
    if span_minutes < FORECAST_MIN_SPAN_MINUTES {
        return Forecast::Unavailable;
    }

    let rate = (newest.five_hour_pct - oldest.five_hour_pct) / span_minutes;
    if rate <= 0.0 {
        return Forecast::NotIncreasing;
    }

    let remaining_minutes = (100.0 - current_pct) / rate;
    if remaining_minutes > FORECAST_HORIZON_MINUTES {
        return Forecast::MoreThanDay;
    }

    let whole_minutes = remaining_minutes.floor() as u64;
    Forecast::Remaining {
        hours: whole_minutes / 60,
        minutes: whole_minutes % 60,
    }
}

// ============================================================================
// Summary
// ============================================================================

/// Everything the presentation layer shows about the series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageStats {
    pub average: f64,
    pub peak: f64,
    pub trend: Trend,
    pub forecast: Forecast,
    pub points: usize,
}

impl UsageStats {
    pub fn compute(points: &[HistoryPoint], current_pct: f64, now: DateTime<Utc>) -> Self {
        Self {
            average: average_five_hour(points),
            peak: peak_five_hour(points),
            trend: trend(points),
            forecast: forecast(points, current_pct, now),
            points: points.len(),
        }
    }

    /// Stats using the newest point's 5-hour utilization as the current value
    pub fn from_history(points: &[HistoryPoint], now: DateTime<Utc>) -> Self {
        let current = points.last().map(|p| p.five_hour_pct).unwrap_or(0.0);
        Self::compute(points, current, now)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn at(offset_secs: f64, pct: f64) -> HistoryPoint {
        HistoryPoint {
            timestamp: epoch_seconds(now()) + offset_secs,
            five_hour_pct: pct,
            seven_day_pct: 0.0,
            model_pct: 0.0,
            model_name: "unknown".to_string(),
        }
    }

    fn series(values: &[f64]) -> Vec<HistoryPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| at(-3600.0 + i as f64 * 60.0, *v))
            .collect()
    }

    #[test]
    fn test_average_and_peak() {
        assert_eq!(average_five_hour(&[]), 0.0);
        assert_eq!(peak_five_hour(&[]), 0.0);

        let points = series(&[10.0, 20.0, 60.0]);
        assert_eq!(average_five_hour(&points), 30.0);
        assert_eq!(peak_five_hour(&points), 60.0);
    }

    #[test]
    fn test_trend_needs_six_points() {
        for n in 0..6 {
            let points = series(&vec![50.0; n]);
            assert_eq!(trend(&points), Trend::Neutral);
        }
        assert_eq!(Trend::Neutral.symbol(), "—");
    }

    #[test]
    fn test_trend_directions() {
        assert_eq!(trend(&series(&[10.0, 10.0, 10.0, 20.0, 20.0, 20.0])), Trend::Increasing);
        assert_eq!(trend(&series(&[20.0, 20.0, 20.0, 10.0, 10.0, 10.0])), Trend::Decreasing);
        assert_eq!(trend(&series(&[10.0, 10.0, 10.0, 12.0, 12.0, 12.0])), Trend::Steady);
        assert_eq!(Trend::Increasing.to_string(), "↑");
    }

    #[test]
    fn test_trend_uses_only_last_six() {
        let points = series(&[90.0, 90.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0]);
        assert_eq!(trend(&points), Trend::Steady);
    }

    #[test]
    fn test_forecast_example() {
        let points = vec![at(-300.0, 40.0), at(-60.0, 50.0)];
        let result = forecast(&points, 50.0, now());

        assert_eq!(result, Forecast::Remaining { hours: 0, minutes: 20 });
        assert!(result.to_string().contains("20m"));
    }

    #[test]
    fn test_forecast_hours_and_minutes() {
        // 1%/min from 10% leaves 90 minutes
        let points = vec![at(-120.0, 8.0), at(0.0, 10.0)];
        let result = forecast(&points, 10.0, now());
        assert_eq!(result, Forecast::Remaining { hours: 1, minutes: 30 });
        assert_eq!(result.to_string(), "~1h 30m left at current rate");
    }

    #[test]
    fn test_forecast_at_limit_is_unavailable() {
        let points = vec![at(-300.0, 40.0), at(-60.0, 50.0)];
        assert_eq!(forecast(&points, 100.0, now()), Forecast::Unavailable);
        assert_eq!(forecast(&[], 100.0, now()), Forecast::Unavailable);
        assert_eq!(forecast(&points, 130.0, now()), Forecast::Unavailable);
    }

    #[test]
    fn test_forecast_ignores_old_points() {
        let points = vec![at(-600.0, 10.0), at(-30.0, 50.0)];
        assert_eq!(forecast(&points, 50.0, now()), Forecast::Unavailable);
    }

    #[test]
    fn test_forecast_needs_half_minute_span() {
        let points = vec![at(-20.0, 10.0), at(0.0, 50.0)];
        assert_eq!(forecast(&points, 50.0, now()), Forecast::Unavailable);
    }

    #[test]
    fn test_forecast_not_increasing() {
        let flat = vec![at(-240.0, 30.0), at(0.0, 30.0)];
        assert_eq!(forecast(&flat, 30.0, now()), Forecast::NotIncreasing);

        let falling = vec![at(-240.0, 30.0), at(0.0, 20.0)];
        let result = forecast(&falling, 20.0, now());
        assert_eq!(result, Forecast::NotIncreasing);
        assert_eq!(result.to_string(), "not increasing");
    }

    #[test]
    fn test_forecast_beyond_a_day() {
        // 0.01%/min leaves far more than 24h
        let points = vec![at(-240.0, 10.0), at(0.0, 10.04)];
        let result = forecast(&points, 10.04, now());
        assert_eq!(result, Forecast::MoreThanDay);
        assert_eq!(result.to_string(), ">24h left at current rate");
    }

    #[test]
    fn test_usage_stats_from_history() {
        let points = vec![at(-300.0, 40.0), at(-60.0, 50.0)];
        let stats = UsageStats::from_history(&points, now());

        assert_eq!(stats.average, 45.0);
        assert_eq!(stats.peak, 50.0);
        assert_eq!(stats.trend, Trend::Neutral);
        assert_eq!(stats.forecast, Forecast::Remaining { hours: 0, minutes: 20 });
        assert_eq!(stats.points, 2);
    }
}
