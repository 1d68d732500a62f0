//! Integration tests for qwatch-cli
//!
//! These tests verify the CLI commands work end-to-end.
//! Tests run serially because they steer the binary through QWATCH_* env vars.

use assert_cmd::Command;
use axum::http::header;
use axum::routing::get;
use axum::Router;
use predicates::prelude::*;
use serial_test::serial;
use tempfile::TempDir;

/// Get a Command for the qwatch binary with every path pointed into `dir`
fn qwatch(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("qwatch").unwrap();
    cmd.env("QWATCH_CREDENTIALS_PATH", dir.path().join(".credentials.json"))
        .env("QWATCH_HISTORY_PATH", dir.path().join("usage_history.json"))
        .env("QWATCH_STATS_CACHE_PATH", dir.path().join("stats-cache.json"))
        // Nothing listens here; no test may reach the real API
        .env("QWATCH_USAGE_URL", "http://127.0.0.1:9/api/oauth/usage")
        .env("QWATCH_TOKEN_URL", "http://127.0.0.1:9/v1/oauth/token")
        .env_remove("QWATCH_POLL_INTERVAL_SECS")
        .env_remove("RUST_LOG");
    cmd
}

fn write_history(dir: &TempDir) {
    let now = chrono::Utc::now().timestamp() as f64;
    let points = serde_json::json!([
        {"timestamp": now - 290.0, "five_hour_pct": 40.0, "seven_day_pct": 10.0, "model_pct": 5.0, "model_name": "sonnet"},
        {"timestamp": now - 50.0, "five_hour_pct": 50.0, "seven_day_pct": 11.0, "model_pct": 6.0, "model_name": "sonnet"}
    ]);
    std::fs::write(dir.path().join("usage_history.json"), points.to_string()).unwrap();
}

const USAGE_BODY: &str = r#"{
    "five_hour": {"utilization": 42.0, "resets_at": "2030-01-01T05:00:00Z"},
    "seven_day": {"utilization": 17.5, "resets_at": "2030-01-07T00:00:00Z"}
}"#;

/// Serves USAGE_BODY on a background runtime and returns the usage URL
fn serve_usage() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();

    std::thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).unwrap();
            let router = Router::new().route(
                "/api/oauth/usage",
                get(|| async { ([(header::CONTENT_TYPE, "application/json")], USAGE_BODY) }),
            );
            axum::serve(listener, router).await.unwrap();
        });
    });

    format!("http://{}/api/oauth/usage", addr)
}

fn write_fresh_credentials(dir: &TempDir) {
    let expires_at = chrono::Utc::now().timestamp_millis() + 60 * 60 * 1000;
    let content = serde_json::json!({
        "claudeAiOauth": {"accessToken": "tok", "expiresAt": expires_at}
    });
    std::fs::write(dir.path().join(".credentials.json"), content.to_string()).unwrap();
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
#[serial]
fn test_cli_help() {
    let dir = TempDir::new().unwrap();
    qwatch(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("qwatch"))
        .stdout(predicate::str::contains("COMMAND").or(predicate::str::contains("Commands")));
}

#[test]
#[serial]
fn test_cli_version() {
    let dir = TempDir::new().unwrap();
    qwatch(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("qwatch"));
}

#[test]
#[serial]
fn test_history_help_lists_windows() {
    let dir = TempDir::new().unwrap();
    qwatch(&dir)
        .args(["history", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("30m"));
}

// =============================================================================
// Status Command Tests
// =============================================================================

#[test]
#[serial]
fn test_status_without_credentials_is_not_logged_in() {
    let dir = TempDir::new().unwrap();
    qwatch(&dir)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not Logged In"));

    assert!(!dir.path().join("usage_history.json").exists());
}

#[test]
#[serial]
fn test_status_json_reports_error_field() {
    let dir = TempDir::new().unwrap();
    qwatch(&dir)
        .args(["status", "--format", "json"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"error\": \"Not Logged In\""));
}

#[test]
#[serial]
fn test_status_unreachable_api_is_offline() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join(".credentials.json"),
        r#"{"claudeAiOauth": {"accessToken": "tok", "expiresAt": 0}}"#,
    )
    .unwrap();

    qwatch(&dir)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Offline"));
}

#[test]
#[serial]
fn test_status_success_leaves_history_file_untouched() {
    let dir = TempDir::new().unwrap();
    write_fresh_credentials(&dir);
    write_history(&dir);
    let history_path = dir.path().join("usage_history.json");
    let before = std::fs::read(&history_path).unwrap();

    qwatch(&dir)
        .env("QWATCH_USAGE_URL", serve_usage())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("42%"));

    assert_eq!(std::fs::read(&history_path).unwrap(), before);
}

#[test]
#[serial]
fn test_status_success_does_not_create_history() {
    let dir = TempDir::new().unwrap();
    write_fresh_credentials(&dir);

    qwatch(&dir)
        .env("QWATCH_USAGE_URL", serve_usage())
        .args(["status", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("42"));

    assert!(!dir.path().join("usage_history.json").exists());
}

// =============================================================================
// History Command Tests
// =============================================================================

#[test]
#[serial]
fn test_history_empty() {
    let dir = TempDir::new().unwrap();
    qwatch(&dir)
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("No usage history recorded yet."));
}

#[test]
#[serial]
fn test_history_table_shows_stats() {
    let dir = TempDir::new().unwrap();
    write_history(&dir);

    qwatch(&dir)
        .args(["history", "--window", "30m"])
        .assert()
        .success()
        .stdout(predicate::str::contains("45%"))
        .stdout(predicate::str::contains("~20m left at current rate"))
        .stdout(predicate::str::contains("Last 30m (2 points)"));
}

#[test]
#[serial]
fn test_history_json() {
    let dir = TempDir::new().unwrap();
    write_history(&dir);

    let output = qwatch(&dir)
        .args(["history", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["window"], "24h");
    assert_eq!(report["stats"]["points"], 2);
    assert_eq!(report["stats"]["peak"], 50.0);
    assert_eq!(report["points"].as_array().unwrap().len(), 2);
}

#[test]
#[serial]
fn test_history_rejects_unknown_window() {
    let dir = TempDir::new().unwrap();
    qwatch(&dir)
        .args(["history", "--window", "7d"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown graph window"));
}

// =============================================================================
// Tokens / Config Command Tests
// =============================================================================

#[test]
#[serial]
fn test_tokens_missing_cache() {
    let dir = TempDir::new().unwrap();
    qwatch(&dir)
        .arg("tokens")
        .assert()
        .success()
        .stdout(predicate::str::contains("No token statistics found"));
}

#[test]
#[serial]
fn test_tokens_reads_cache() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("stats-cache.json"),
        r#"{"modelUsage": {"opus": {"outputTokens": 5600, "cacheReadInputTokens": 3400000}}}"#,
    )
    .unwrap();

    qwatch(&dir)
        .arg("tokens")
        .assert()
        .success()
        .stdout(predicate::str::contains("5.6K"))
        .stdout(predicate::str::contains("3.4M"));
}

#[test]
#[serial]
fn test_config_shows_env_overrides() {
    let dir = TempDir::new().unwrap();
    qwatch(&dir)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("history_path"))
        .stdout(predicate::str::contains("usage_history.json"))
        .stdout(predicate::str::contains("env"));
}

#[test]
#[serial]
fn test_invalid_poll_interval_fails() {
    let dir = TempDir::new().unwrap();
    qwatch(&dir)
        .env("QWATCH_POLL_INTERVAL_SECS", "soon")
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("QWATCH_POLL_INTERVAL_SECS"));
}
