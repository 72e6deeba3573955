//! Integration tests for the objcache binary
//!
//! Runs put/get/exists/clear against a temporary cache directory.

use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

/// Helper to run the CLI against `dir` with given args and capture output
fn run_cli(dir: &Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_objcache"))
        .arg("--dir")
        .arg(dir)
        .args(args)
        .env_remove("OBJCACHE_DIR")
        .env_remove("OBJCACHE_MAX_BYTES")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute objcache")
}

#[test]
fn test_help_flag_exits_successfully() {
    let output = Command::new(env!("CARGO_BIN_EXE_objcache"))
        .arg("--help")
        .output()
        .expect("Failed to execute objcache");
    assert!(
        output.status.success(),
        "Expected --help to exit successfully"
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("objcache"), "Help should mention objcache");
    assert!(stdout.contains("put"), "Help should mention the put command");
}

#[test]
fn test_put_then_get_prints_value() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");

    let put = run_cli(temp_dir.path(), &["put", "user:1", r#"{"name":"Ann"}"#, "--ttl", "3600"]);
    assert!(put.status.success(), "Put should succeed: {:?}", put);

    let get = run_cli(temp_dir.path(), &["get", "user:1"]);
    assert!(get.status.success());
    assert_eq!(String::from_utf8_lossy(&get.stdout).trim(), r#"{"name":"Ann"}"#);
}

#[test]
fn test_get_missing_key_fails() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");

    let output = run_cli(temp_dir.path(), &["get", "nobody"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Not found"), "Unexpected stderr: {}", stderr);
}

#[test]
fn test_exists_and_clear() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");

    assert!(run_cli(temp_dir.path(), &["put", "flag", "true"]).status.success());
    let exists = run_cli(temp_dir.path(), &["exists", "flag"]);
    assert_eq!(String::from_utf8_lossy(&exists.stdout).trim(), "true");

    assert!(run_cli(temp_dir.path(), &["clear"]).status.success());
    let exists = run_cli(temp_dir.path(), &["exists", "flag"]);
    assert_eq!(String::from_utf8_lossy(&exists.stdout).trim(), "false");
}

#[test]
fn test_invalid_json_value_prints_error_and_exits() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");

    let output = run_cli(temp_dir.path(), &["put", "k", "{not json"]);

    assert!(!output.status.success(), "Expected invalid JSON to fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Invalid value"),
        "Should print error message about invalid value: {}",
        stderr
    );
}

#[cfg(test)]
mod unit_tests {
    //! Unit tests for CLI parsing that don't require running the binary

    use clap::Parser;
    use objcache::cli::{Cli, Command};

    #[test]
    fn test_cli_requires_a_command() {
        assert!(Cli::try_parse_from(["objcache"]).is_err());
    }

    #[test]
    fn test_cli_parse_get() {
        let cli = Cli::parse_from(["objcache", "get", "user:1"]);
        assert_eq!(
            cli.command,
            Command::Get {
                key: "user:1".to_string()
            }
        );
    }

    #[test]
    fn test_cli_parse_verbose_flag() {
        let cli = Cli::parse_from(["objcache", "-v", "clear"]);
        assert!(cli.verbose);
        assert_eq!(cli.command, Command::Clear);
    }

    #[test]
    fn test_cli_value_may_start_with_hyphen() {
        let cli = Cli::parse_from(["objcache", "put", "n", "-5"]);
        assert!(matches!(cli.command, Command::Put { ref value, .. } if value == "-5"));
    }
}
