//! End-to-end CLI tests for the metamaster binary.

use assert_cmd::Command;
use predicates::prelude::*;

const SERVICE_VARS: [&str; 10] = [
    "SHIMMIE_ENDPOINT",
    "SHIMMIE_LOGIN",
    "SHIMMIE_PASSWORD",
    "SAUCENAO_API_KEY",
    "CHIBISAFE_UPLOAD_URL",
    "CHIBISAFE_API_KEY",
    "DANBOORU_LOGIN",
    "DANBOORU_KEY",
    "GELBOORU_ID",
    "GELBOORU_KEY",
];

/// Binary with every service variable cleared so host settings cannot leak in.
fn metamaster() -> Command {
    let mut cmd = Command::cargo_bin("metamaster").unwrap();
    for var in SERVICE_VARS {
        cmd.env_remove(var);
    }
    cmd.env_remove("RUST_LOG");
    cmd
}

/// Test that --help displays usage information and exits with code 0.
#[test]
fn test_binary_help_displays_usage() {
    metamaster()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Enrich backlog catalog posts"))
        .stdout(predicate::str::contains("--override-source"));
}

/// Test that --version displays version and exits with code 0.
#[test]
fn test_binary_version_displays_version() {
    metamaster()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("metamaster"));
}

/// Test that invalid flags cause non-zero exit.
#[test]
fn test_binary_invalid_flag_returns_error() {
    metamaster()
        .arg("--invalid-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

/// Test that help output never prints secret values taken from the environment.
#[test]
fn test_binary_help_hides_secret_env_values() {
    metamaster()
        .env("SHIMMIE_PASSWORD", "hunter2")
        .env("SAUCENAO_API_KEY", "sauce-secret")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("hunter2").not())
        .stdout(predicate::str::contains("sauce-secret").not());
}

/// Test that a run without catalog settings fails with a pointer to the variable.
#[test]
fn test_binary_missing_endpoint_fails() {
    metamaster()
        .arg("-q")
        .assert()
        .failure()
        .stderr(predicate::str::contains("SHIMMIE_ENDPOINT is not set"));
}

/// Test that inverted similarity thresholds are rejected before any network use.
#[test]
fn test_binary_rejects_inverted_thresholds() {
    metamaster()
        .args(["-q", "--max-similarity", "30"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be below max similarity"));
}

/// Test that --compress needs --upload.
#[test]
fn test_binary_compress_requires_upload() {
    metamaster()
        .arg("--compress")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--upload"));
}

/// Test that extract mode refuses hosts without an extractor.
#[test]
fn test_binary_extract_unsupported_host() {
    metamaster()
        .args(["-q", "--extract", "https://example.com/post/1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No extractor supports"));
}
