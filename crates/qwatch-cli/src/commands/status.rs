//! Status command
//!
//! One-shot quota fetch. The usage history file is left alone; only the
//! poll coordinator behind `qwatch watch` writes it.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tabled::Tabled;

use qwatch_core::{ClaudeQuotaProvider, QuotaProvider, UsageData, UsageEntry};

use super::{format_pct, Context};
use crate::output::{print_info, print_json, print_output, OutputFormat};

/// Quota window row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct WindowRow {
    #[tabled(rename = "Window")]
    pub window: String,
    #[tabled(rename = "Used")]
    pub used: String,
    #[tabled(rename = "Resets In")]
    pub resets_in: String,
}

fn window_row(label: &str, entry: &UsageEntry, now: DateTime<Utc>) -> WindowRow {
    WindowRow {
        window: label.to_string(),
        used: format_pct(entry.utilization),
        resets_in: entry.time_remaining(now),
    }
}

/// 5-hour, 7-day and (when present) the model-scoped window
pub fn window_rows(usage: &UsageData, now: DateTime<Utc>) -> Vec<WindowRow> {
    let mut rows = vec![
        window_row("5-Hour", &usage.five_hour, now),
        window_row("7-Day", &usage.seven_day, now),
    ];
    if let Some((window, entry)) = usage.model_entry() {
        rows.push(window_row(window.label(), entry, now));
    }
    rows
}

pub async fn execute(ctx: &Context) -> Result<()> {
    let provider = ClaudeQuotaProvider::from_config(&ctx.config)?;
    let snapshot = provider.fetch().await;

    if ctx.format == OutputFormat::Json {
        print_json(&snapshot)?;
    }

    let usage = match (snapshot.usage(), snapshot.error()) {
        (Some(usage), _) => usage,
        (None, Some(code)) => bail!("{}", code),
        (None, None) => bail!("Fetch returned neither usage nor an error"),
    };

    if ctx.format == OutputFormat::Table {
        print_output(&window_rows(usage, Utc::now()), ctx.format)?;
        print_info(
            &format!(
                "Plan: {}  ·  Extra usage: {}",
                usage.plan_name(),
                if usage.extra_usage_enabled { "on" } else { "off" }
            ),
            ctx.quiet,
        );
    }

    Ok(())
}
