//! Integration tests for the `coffer` CLI binary.
//!
//! Each test runs the binary as a subprocess against its own redb file in a
//! temporary directory, checking exit codes and stdout.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::Path;
use std::process::Command;

const KEY: &str = "AAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh8=";

/// Helper: locate the `coffer` binary built by `cargo test`.
fn coffer_bin() -> String {
    let path = env!("CARGO_BIN_EXE_coffer");
    assert!(Path::new(path).exists(), "coffer binary not found at {path}");
    path.to_owned()
}

/// Helper: run coffer against `db` and return (`exit_code`, stdout, stderr).
fn run(db: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(coffer_bin())
        .args(args)
        .env("COFFER_DB_PATH", db)
        .env("COFFER_ENCRYPTION_KEY", KEY)
        .env_remove("COFFER_DEFAULT_KEY")
        .env_remove("COFFER_ENCRYPTION_KEYS")
        .env_remove("COFFER_TRACK_ACCESS")
        .env_remove("COFFER_DEFAULT_POLICY")
        .env_remove("COFFER_VALUE_TYPES")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to execute coffer");

    let code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (code, stdout, stderr)
}

fn db_in(dir: &tempfile::TempDir) -> std::path::PathBuf {
    dir.path().join("coffer.redb")
}

// ── Version & help ───────────────────────────────────────────────────

#[test]
fn test_version_flag() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run(&db_in(&dir), &["--version"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("coffer"), "version output: {stdout}");
}

#[test]
fn test_help_lists_commands() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run(&db_in(&dir), &["--help"]);
    assert_eq!(code, 0);
    for cmd in ["put", "get", "has", "forget", "evict", "keygen"] {
        assert!(stdout.contains(cmd), "help should list '{cmd}'");
    }
}

// ── Keygen ───────────────────────────────────────────────────────────

#[test]
fn test_keygen_prints_a_usable_key() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run(&db_in(&dir), &["keygen"]);
    assert_eq!(code, 0);
    let key = stdout.trim();
    assert_eq!(key.len(), 44, "32-byte key in padded base64: {key}");
    assert!(coffer_core::EncryptionKey::from_base64(key).is_ok());
    assert!(!db_in(&dir).exists(), "keygen must not create a database");
}

// ── Put / get / has / forget ─────────────────────────────────────────

#[test]
fn test_put_then_get_text() {
    let dir = tempfile::tempdir().unwrap();
    let db = db_in(&dir);

    let (code, stdout, stderr) = run(&db, &["put", "stripe", "sk_live_123"]);
    assert_eq!(code, 0, "put failed: {stderr}");
    assert!(stdout.contains("string"), "put output: {stdout}");

    let (code, stdout, _) = run(&db, &["get", "stripe"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "sk_live_123");
}

#[test]
fn test_put_int_and_json() {
    let dir = tempfile::tempdir().unwrap();
    let db = db_in(&dir);

    let (code, stdout, _) = run(&db, &["put", "pin", "1234", "--int"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("int"));
    let (_, stdout, _) = run(&db, &["get", "pin"]);
    assert_eq!(stdout.trim(), "1234");

    let (code, stdout, _) = run(&db, &["put", "db", r#"{"host":"h","port":5432}"#, "--json"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("json"));
    let (_, stdout, _) = run(&db, &["get", "db"]);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed, serde_json::json!({"host": "h", "port": 5432}));
}

#[test]
fn test_put_int_rejects_text() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run(&db_in(&dir), &["put", "pin", "12ab", "--int"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("not an integer"), "stderr: {stderr}");
}

#[test]
fn test_get_missing_exits_1() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, stderr) = run(&db_in(&dir), &["get", "nope"]);
    assert_eq!(code, 1);
    assert!(stdout.is_empty());
    assert!(stderr.contains("no secret stored under nope"), "stderr: {stderr}");
}

#[test]
fn test_owner_scopes_are_separate() {
    let dir = tempfile::tempdir().unwrap();
    let db = db_in(&dir);

    run(&db, &["put", "token", "team-a", "--owner", "team:a"]);
    run(&db, &["put", "token", "unscoped"]);

    let (_, stdout, _) = run(&db, &["get", "token", "--owner", "team:a"]);
    assert_eq!(stdout.trim(), "team-a");
    let (_, stdout, _) = run(&db, &["get", "token"]);
    assert_eq!(stdout.trim(), "unscoped");
    let (code, _, _) = run(&db, &["get", "token", "--owner", "team:b"]);
    assert_eq!(code, 1);
}

#[test]
fn test_invalid_owner_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run(&db_in(&dir), &["get", "token", "--owner", "no-colon"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("kind:id"), "stderr: {stderr}");
}

#[test]
fn test_has_and_forget() {
    let dir = tempfile::tempdir().unwrap();
    let db = db_in(&dir);

    let (code, stdout, _) = run(&db, &["has", "api"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "false");

    run(&db, &["put", "api", "x"]);
    let (_, stdout, _) = run(&db, &["has", "api"]);
    assert_eq!(stdout.trim(), "true");

    let (code, stdout, _) = run(&db, &["forget", "api"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("forgot"));
    let (_, stdout, _) = run(&db, &["has", "api"]);
    assert_eq!(stdout.trim(), "false");
}

// ── Policies ─────────────────────────────────────────────────────────

#[test]
fn test_access_count_policy_across_invocations() {
    let dir = tempfile::tempdir().unwrap();
    let db = db_in(&dir);

    let policy = r#"{"type":"access_count","max":1}"#;
    let (code, _, stderr) = run(&db, &["put", "otp", "493021", "--int", "--policy", policy]);
    assert_eq!(code, 0, "put failed: {stderr}");

    let (code, stdout, _) = run(&db, &["get", "otp"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "493021");

    let (code, _, _) = run(&db, &["get", "otp"]);
    assert_eq!(code, 1, "second read should find the secret evicted");
}

#[test]
fn test_invalid_policy_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run(&db_in(&dir), &["put", "k", "v", "--policy", "{bad"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("invalid eviction policy"), "stderr: {stderr}");
}

#[test]
fn test_evict_reports_count() {
    let dir = tempfile::tempdir().unwrap();
    let db = db_in(&dir);

    run(&db, &["put", "old", "x", "--policy", r#"{"type":"time_based","seconds":0}"#]);
    run(&db, &["put", "keep", "x"]);

    let (code, stdout, _) = run(&db, &["evict"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("evicted 1"), "evict output: {stdout}");
    let (_, stdout, _) = run(&db, &["has", "keep"]);
    assert_eq!(stdout.trim(), "true");
}

// ── Keys ─────────────────────────────────────────────────────────────

#[test]
fn test_missing_key_material_fails_put() {
    let dir = tempfile::tempdir().unwrap();
    let output = Command::new(coffer_bin())
        .args(["put", "k", "v"])
        .env("COFFER_DB_PATH", db_in(&dir))
        .env_remove("COFFER_ENCRYPTION_KEY")
        .env_remove("COFFER_ENCRYPTION_KEYS")
        .env_remove("COFFER_DEFAULT_KEY")
        .output()
        .expect("failed to execute coffer");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("encryption key not found"), "stderr: {stderr}");
}
