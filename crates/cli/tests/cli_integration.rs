//! CLI integration tests.
//!
//! Uses `assert_cmd` to spawn the `oficina` binary and verify exit codes,
//! stdout content, and stderr content. Configuration variables are cleared
//! so the host environment cannot leak into a test.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const CONFIG_VARS: &[&str] = &[
    "OFICINA_CONFIG",
    "OFICINA_PORT",
    "WEBHOOK_SECRET",
    "SUPABASE_URL",
    "SUPABASE_SERVICE_ROLE_KEY",
    "N8N_WEBHOOK_URL",
    "N8N_WEBHOOK_TOKEN",
    "APP_URL",
    "OFICINA_RATE_LIMIT",
    "OFICINA_RATE_WINDOW_SECS",
];

fn oficina() -> Command {
    let mut cmd = cargo_bin_cmd!("oficina");
    for var in CONFIG_VARS {
        cmd.env_remove(var);
    }
    cmd.env("OFICINA_LOG", "error");
    cmd
}

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    oficina()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Workshop webhook gateway"))
        .stdout(predicate::str::contains("notify-status"));
}

#[test]
fn version_exits_0() {
    oficina()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("oficina"));
}

#[test]
fn serve_help_lists_tls_flags() {
    oficina()
        .args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--tls-cert"))
        .stdout(predicate::str::contains("--port"));
}

// ──────────────────────────────────────────────
// 2. Serve argument checks
// ──────────────────────────────────────────────

#[test]
fn serve_with_only_tls_cert_fails() {
    oficina()
        .args(["serve", "--tls-cert", "cert.pem"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains(
            "--tls-cert and --tls-key must both be provided",
        ));
}

// ──────────────────────────────────────────────
// 3. Configuration
// ──────────────────────────────────────────────

#[test]
fn missing_config_file_fails_with_path() {
    oficina()
        .args(["--config", "/nonexistent/oficina.toml", "logs"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("error: could not read"))
        .stderr(predicate::str::contains("/nonexistent/oficina.toml"));
}

#[test]
fn malformed_config_file_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("oficina.toml");
    fs::write(&path, "port = \"not a number\"").unwrap();

    oficina()
        .arg("--config")
        .arg(&path)
        .arg("logs")
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not parse"));
}

#[test]
fn invalid_env_override_fails() {
    oficina()
        .arg("logs")
        .env("OFICINA_PORT", "eighty")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value for OFICINA_PORT"));
}

#[test]
fn zero_rate_window_fails() {
    oficina()
        .args(["serve", "--port", "0"])
        .env("OFICINA_RATE_WINDOW_SECS", "0")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains(
            "rate_limit.window_seconds must be at least 1",
        ));
}

// ──────────────────────────────────────────────
// 4. notify-status
// ──────────────────────────────────────────────

#[test]
fn notify_status_without_secret_fails() {
    oficina()
        .args([
            "notify-status",
            "--numero-os",
            "7",
            "--from",
            "pendente",
            "--to",
            "finalizado",
        ])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("webhook secret is not configured"));
}

#[test]
fn notify_status_rejects_unknown_status() {
    oficina()
        .env("WEBHOOK_SECRET", "secret")
        .args([
            "notify-status",
            "--numero-os",
            "7",
            "--from",
            "pendente",
            "--to",
            "voando",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown order status 'voando'"));
}

#[test]
fn notify_status_reads_secret_from_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("oficina.toml");
    // Port 1 is never listening, so the notice fails in transport, after
    // the secret check has passed.
    fs::write(&path, "port = 1\nwebhook_secret = \"from-file\"\n").unwrap();

    oficina()
        .arg("--config")
        .arg(&path)
        .args([
            "notify-status",
            "--numero-os",
            "7",
            "--from",
            "pendente",
            "--to",
            "finalizado",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("status notification failed"));
}

// ──────────────────────────────────────────────
// 5. logs
// ──────────────────────────────────────────────

#[test]
fn logs_without_hosted_storage_fails() {
    oficina()
        .arg("logs")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("SUPABASE_URL"));
}
