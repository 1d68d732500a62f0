//! Watch command
//!
//! Runs the poll coordinator in the foreground. Each completed fetch prints
//! one line; between fetches the countdown is redrawn in place.

use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use chrono::Local;
use colored::Colorize;
use serde::Serialize;
use tokio::sync::oneshot;

use qwatch_core::{
    ClaudeQuotaProvider, CountdownTick, Forecast, HistoryStore, PollCoordinator, UsageObserver,
    UsageSnapshot, UsageStats, UsageUpdate,
};

use super::{format_pct, Context};
use crate::output::{print_info, print_json_line, print_success, OutputFormat};

/// One line per update; JSON mode emits newline-delimited objects
struct ConsoleObserver {
    format: OutputFormat,
    quiet: bool,
    countdown_visible: bool,
}

#[derive(Serialize)]
struct UpdateLine<'a> {
    snapshot: &'a UsageSnapshot,
    stats: &'a UsageStats,
}

impl ConsoleObserver {
    fn clear_countdown(&mut self) {
        if self.countdown_visible {
            print!("\r\x1b[2K");
            self.countdown_visible = false;
        }
    }
}

impl UsageObserver for ConsoleObserver {
    fn on_update(&mut self, update: &UsageUpdate) {
        match self.format {
            OutputFormat::Json => {
                let line = UpdateLine {
                    snapshot: &update.snapshot,
                    stats: &update.stats,
                };
                if let Err(e) = print_json_line(&line) {
                    log::error!("[cli:watch] Failed to encode update: {}", e);
                }
            }
            OutputFormat::Table => {
                self.clear_countdown();
                println!("{}", update_line(update));
            }
        }
    }

    fn on_tick(&mut self, tick: &CountdownTick) {
        if self.quiet || self.format == OutputFormat::Json {
            return;
        }
        print!("\r\x1b[2K{}", tick_line(tick).dimmed());
        let _ = std::io::stdout().flush();
        self.countdown_visible = true;
    }
}

/// Countdown status followed by the reset and forecast details
fn tick_line(tick: &CountdownTick) -> String {
    match tick.detail_line() {
        Some(detail) => format!("{}  ·  {}", tick.status_line(), detail),
        None => tick.status_line(),
    }
}

/// Human readable summary of one update
fn update_line(update: &UsageUpdate) -> String {
    let time = update
        .snapshot
        .fetched_at
        .with_timezone(&Local)
        .format("%H:%M:%S");

    let Some(usage) = update.snapshot.usage() else {
        let code = update.snapshot.error().unwrap_or("Unknown error");
        return format!("[{}] {}", time, code.red());
    };

    let mut line = format!(
        "[{}] 5h {}  ·  7d {}",
        time,
        format_pct(usage.five_hour.utilization),
        format_pct(usage.seven_day.utilization)
    );
    if let Some((window, entry)) = usage.model_entry() {
        line.push_str(&format!("  ·  {} {}", window.label(), format_pct(entry.utilization)));
    }

    let stats = &update.stats;
    line.push_str(&format!(
        "  ·  avg {} peak {} {}",
        format_pct(stats.average),
        format_pct(stats.peak),
        stats.trend
    ));
    if !matches!(stats.forecast, Forecast::Unavailable) {
        line.push_str(&format!("  ·  {}", stats.forecast));
    }
    line
}

pub async fn execute(ctx: &Context) -> Result<()> {
    let provider = Arc::new(ClaudeQuotaProvider::from_config(&ctx.config)?);
    let history = HistoryStore::load(&ctx.config.history_path);
    let coordinator = PollCoordinator::from_config(provider, history, &ctx.config);

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("[cli:watch] Failed to listen for Ctrl-C: {}", e);
            return;
        }
        let _ = shutdown_tx.send(());
    });

    if ctx.format == OutputFormat::Table {
        print_info(
            &format!(
                "Watching quota every {}s (Ctrl-C to stop)",
                ctx.config.poll_interval_secs
            ),
            ctx.quiet,
        );
    }

    let mut observer = ConsoleObserver {
        format: ctx.format,
        quiet: ctx.quiet,
        countdown_visible: false,
    };
    let history = coordinator.run(&mut observer, shutdown_rx).await;
    observer.clear_countdown();

    if ctx.format == OutputFormat::Table {
        print_success(
            &format!("Stopped. {} points in history.", history.len()),
            ctx.quiet,
        );
    }
    Ok(())
}
