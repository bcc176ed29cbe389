//! Binary-level tests: argument parsing, exit codes and stats files.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn kiln() -> Command {
    let mut cmd = Command::cargo_bin("kiln").unwrap();
    cmd.env_remove("NODE_ENV")
        .env_remove("PORT")
        .env_remove("GRAPHQL")
        .env("NO_COLOR", "1");
    cmd
}

/// Project whose bundler is a shell script.
fn project(script: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    let config = format!(
        "[bundler]\nprogram = \"sh\"\nargs = [\"-c\", {}]\n",
        toml_string(script)
    );
    fs::write(dir.path().join("kiln.toml"), config).unwrap();
    dir
}

fn toml_string(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

fn build(dir: &Path) -> assert_cmd::assert::Assert {
    kiln()
        .current_dir(dir)
        .args(["build", "--root"])
        .arg(dir)
        .assert()
}

#[test]
fn test_help_lists_commands() {
    kiln()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("dev"))
        .stdout(predicate::str::contains("start"));
}

#[test]
fn test_unknown_mode_is_rejected() {
    kiln()
        .args(["build", "--mode", "staging"])
        .assert()
        .failure();
}

#[cfg(unix)]
#[test]
fn test_successful_build_writes_stats() {
    let dir = project(r#"cat > /dev/null; echo "{\"target\":\"$KILN_TARGET\",\"errors\":[],\"warnings\":[]}""#);

    build(dir.path()).success();

    let server = fs::read_to_string(dir.path().join("dist/server.stats.json")).unwrap();
    let client = fs::read_to_string(dir.path().join("dist/client.stats.json")).unwrap();
    let server: serde_json::Value = serde_json::from_str(&server).unwrap();
    let client: serde_json::Value = serde_json::from_str(&client).unwrap();
    assert_eq!(server["target"], "server");
    assert_eq!(client["target"], "client");
}

#[cfg(unix)]
#[test]
fn test_compilation_error_exits_non_zero_without_stats() {
    let dir = project(r#"cat > /dev/null; if [ "$KILN_TARGET" = client ]; then echo "Module not found: ./missing" >&2; exit 1; fi; echo "{}""#);

    build(dir.path())
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Module not found"));

    assert!(!dir.path().join("dist/server.stats.json").exists());
    assert!(!dir.path().join("dist/client.stats.json").exists());
}

#[cfg(unix)]
#[test]
fn test_static_build_writes_no_stats() {
    let dir = project(r#"cat > /dev/null; echo "{}""#);

    kiln()
        .current_dir(dir.path())
        .args(["build", "--static", "--root"])
        .arg(dir.path())
        .assert()
        .success();

    assert!(!dir.path().join("dist/server.stats.json").exists());
}

#[test]
fn test_missing_bundler_is_fatal() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("kiln.toml"),
        "[bundler]\nprogram = \"kiln-no-such-bundler\"\nargs = []\n",
    )
    .unwrap();

    build(dir.path()).failure().code(1);
}

#[test]
fn test_missing_explicit_config_is_reported() {
    kiln()
        .args(["build", "--config", "/definitely/missing/kiln.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config file not found"));
}
