//! History command
//!
//! Summarizes the recorded usage series and lists the points inside the
//! selected graph window.

use anyhow::Result;
use chrono::{DateTime, Local, TimeZone, Utc};
use serde::Serialize;
use tabled::Tabled;

use qwatch_core::{Forecast, GraphWindow, HistoryPoint, HistoryStore, UsageStats};

use super::{format_pct, Context};
use crate::output::{print_info, print_json, print_output, print_single, OutputFormat};

/// Summary row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct SummaryRow {
    #[tabled(rename = "Points")]
    pub points: usize,
    #[tabled(rename = "Average")]
    pub average: String,
    #[tabled(rename = "Peak")]
    pub peak: String,
    #[tabled(rename = "Trend")]
    pub trend: String,
    #[tabled(rename = "Forecast")]
    pub forecast: String,
}

impl From<&UsageStats> for SummaryRow {
    fn from(stats: &UsageStats) -> Self {
        let forecast = match stats.forecast {
            Forecast::Unavailable => "—".to_string(),
            other => other.to_string(),
        };
        Self {
            points: stats.points,
            average: format_pct(stats.average),
            peak: format_pct(stats.peak),
            trend: stats.trend.to_string(),
            forecast,
        }
    }
}

/// History point row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct PointRow {
    #[tabled(rename = "Time")]
    pub time: String,
    #[tabled(rename = "5-Hour")]
    pub five_hour: String,
    #[tabled(rename = "7-Day")]
    pub seven_day: String,
    #[tabled(rename = "Model")]
    pub model: String,
}

impl From<&HistoryPoint> for PointRow {
    fn from(point: &HistoryPoint) -> Self {
        Self {
            time: format_timestamp(point.timestamp),
            five_hour: format_pct(point.five_hour_pct),
            seven_day: format_pct(point.seven_day_pct),
            model: format!("{} {}", point.model_name, format_pct(point.model_pct)),
        }
    }
}

/// Local wall-clock time of an epoch-seconds timestamp
fn format_timestamp(timestamp: f64) -> String {
    let millis = (timestamp * 1000.0).round() as i64;
    match Utc.timestamp_millis_opt(millis).single() {
        Some(at) => at.with_timezone(&Local).format("%m-%d %H:%M").to_string(),
        None => format!("{:.0}", timestamp),
    }
}

#[derive(Debug, Serialize)]
struct HistoryReport<'a> {
    window: String,
    stats: &'a UsageStats,
    points: &'a [HistoryPoint],
}

pub async fn execute(ctx: &Context, window: GraphWindow) -> Result<()> {
    let history = HistoryStore::load(&ctx.config.history_path);
    let now: DateTime<Utc> = Utc::now();
    let stats = UsageStats::from_history(history.points(), now);
    let in_window = history.points_within(window, now);

    match ctx.format {
        OutputFormat::Json => print_json(&HistoryReport {
            window: window.to_string(),
            stats: &stats,
            points: in_window,
        })?,
        OutputFormat::Table => {
            if history.is_empty() {
                print_info("No usage history recorded yet.", ctx.quiet);
                return Ok(());
            }
            print_single(&SummaryRow::from(&stats), ctx.format)?;

            print_info(
                &format!("\nLast {} ({} points):", window, in_window.len()),
                ctx.quiet,
            );
            let rows: Vec<PointRow> = in_window.iter().map(PointRow::from).collect();
            print_output(&rows, ctx.format)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use qwatch_core::Trend;

    #[test]
    fn test_summary_row() {
        let stats = UsageStats {
            average: 45.0,
            peak: 50.0,
            trend: Trend::Increasing,
            forecast: Forecast::Remaining { hours: 0, minutes: 20 },
            points: 2,
        };
        let row = SummaryRow::from(&stats);
        assert_eq!(row.average, "45%");
        assert_eq!(row.trend, "↑");
        assert_eq!(row.forecast, "~20m left at current rate");

        let empty = SummaryRow::from(&UsageStats::from_history(&[], Utc::now()));
        assert_eq!(empty.forecast, "—");
        assert_eq!(empty.trend, "—");
        assert_eq!(empty.points, 0);
    }

    #[test]
    fn test_point_row() {
        let point = HistoryPoint {
            timestamp: 1_700_000_000.5,
            five_hour_pct: 12.0,
            seven_day_pct: 3.0,
            model_pct: 7.0,
            model_name: "sonnet".to_string(),
        };
        let row = PointRow::from(&point);
        assert_eq!(row.five_hour, "12%");
        assert_eq!(row.model, "sonnet 7%");
        assert_eq!(row.time.len(), "11-14 22:13".len());
    }
}
