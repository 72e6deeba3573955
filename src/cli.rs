//! Command-line interface parsing for objcache
//!
//! This module handles parsing of CLI arguments using clap and turns them
//! into a [`CacheConfig`] and a command to run against the cache.

use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;

use crate::config::{CacheConfig, ConfigError};

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// The value given to `put` is not valid JSON
    #[error("Invalid value: {0}")]
    InvalidValue(#[from] serde_json::Error),

    /// The resulting configuration cannot open a cache
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// objcache - inspect and populate a two-tier object cache
#[derive(Parser, Debug)]
#[command(name = "objcache")]
#[command(about = "Two-tier object cache with soft expiry and anti-stampede refills")]
#[command(version)]
pub struct Cli {
    /// Directory of the persistent tier (defaults to the XDG cache directory)
    #[arg(long, env = "OBJCACHE_DIR", value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Maximum size of the persistent tier in bytes
    #[arg(long, env = "OBJCACHE_MAX_BYTES", value_name = "BYTES")]
    pub max_bytes: Option<u64>,

    /// Log cache activity to stderr
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Operations available from the command line
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Store a JSON value
    ///
    /// Examples:
    ///   objcache put user:1 '{"name":"Ann"}' --ttl 60
    ///   objcache put greeting '"hello"' --ttl 3600 --soft
    Put {
        key: String,
        /// JSON document to cache
        #[arg(allow_hyphen_values = true)]
        value: String,
        /// Lifetime in seconds; zero or negative never expires
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        ttl: i64,
        /// Keep serving the value, flagged as stale, after it expires
        #[arg(long)]
        soft: bool,
    },
    /// Print a cached value
    Get { key: String },
    /// Report whether a value is stored, expired or not
    Exists { key: String },
    /// Remove every cached value
    Clear,
}

/// Parses a `put` value argument as JSON
pub fn parse_value(s: &str) -> Result<Value, CliError> {
    Ok(serde_json::from_str(s)?)
}

impl Cli {
    /// Builds the cache configuration from flags and defaults
    ///
    /// # Returns
    /// * `Ok(CacheConfig)` with flag overrides applied and validated
    /// * `Err(CliError::Config)` if no directory is known or a value is invalid
    pub fn config(&self) -> Result<CacheConfig, CliError> {
        let mut config = match &self.dir {
            Some(dir) => CacheConfig::with_dir(dir.clone()),
            None => CacheConfig::new().ok_or(ConfigError::NoCacheDirectory)?,
        };
        if let Some(max_bytes) = self.max_bytes {
            config.max_bytes = max_bytes;
        }
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_accepts_json() {
        let value = parse_value(r#"{"name":"Ann"}"#).unwrap();
        assert_eq!(value["name"], "Ann");
    }

    #[test]
    fn test_parse_value_rejects_malformed_json() {
        let err = parse_value("{name: Ann").unwrap_err();
        assert!(err.to_string().contains("Invalid value"));
    }

    #[test]
    fn test_cli_parse_put_with_options() {
        let cli = Cli::parse_from(["objcache", "put", "k", "1", "--ttl", "30", "--soft"]);
        assert_eq!(
            cli.command,
            Command::Put {
                key: "k".to_string(),
                value: "1".to_string(),
                ttl: 30,
                soft: true,
            }
        );
    }

    #[test]
    fn test_cli_parse_put_defaults_to_never_expiring() {
        let cli = Cli::parse_from(["objcache", "put", "k", "true"]);
        match cli.command {
            Command::Put { ttl, soft, .. } => {
                assert_eq!(ttl, 0);
                assert!(!soft);
            }
            other => panic!("Expected put, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_parse_negative_ttl() {
        let cli = Cli::parse_from(["objcache", "put", "k", "1", "--ttl", "-1"]);
        assert!(matches!(cli.command, Command::Put { ttl: -1, .. }));
    }

    #[test]
    fn test_config_uses_dir_and_max_bytes() {
        let cli = Cli::parse_from([
            "objcache",
            "--dir",
            "/tmp/objcache-cli",
            "--max-bytes",
            "2048",
            "clear",
        ]);
        let config = cli.config().unwrap();
        assert_eq!(config.directory, PathBuf::from("/tmp/objcache-cli"));
        assert_eq!(config.max_bytes, 2048);
    }

    #[test]
    fn test_config_rejects_zero_max_bytes() {
        let cli = Cli::parse_from(["objcache", "--dir", "/tmp/x", "--max-bytes", "0", "clear"]);
        assert!(matches!(
            cli.config(),
            Err(CliError::Config(ConfigError::ZeroCapacity))
        ));
    }
}
