//! objcache - command-line front-end for the two-tier object cache
//!
//! Opens a disk-backed cache and runs a single put/get/exists/clear
//! command against it. Refills scheduled by the command are drained before
//! the process exits.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use objcache::cache::Lookup;
use objcache::cli::{parse_value, Cli, Command};
use objcache::{CacheManager, TokioExecutor};

/// Installs a stderr subscriber; `RUST_LOG` takes precedence over `--verbose`
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}

fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = cli.config()?;
    let runtime = tokio::runtime::Runtime::new()?;
    let executor = TokioExecutor::new(runtime.handle().clone(), config.workers);
    let cache = CacheManager::open(&config, Arc::new(executor.clone()))?;

    let code = match cli.command {
        Command::Put {
            key,
            value,
            ttl,
            soft,
        } => {
            let value = parse_value(&value)?;
            cache.put_with(&key, &value, ttl, soft)?;
            ExitCode::SUCCESS
        }
        Command::Get { key } => match cache.get::<Value>(&key) {
            Lookup::Fresh(value) => {
                println!("{}", value);
                ExitCode::SUCCESS
            }
            Lookup::Degraded(value) => {
                eprintln!("(stale)");
                println!("{}", value);
                ExitCode::SUCCESS
            }
            Lookup::Absent => {
                eprintln!("Not found: {}", key);
                ExitCode::FAILURE
            }
        },
        Command::Exists { key } => {
            println!("{}", cache.exists::<Value>(&key));
            ExitCode::SUCCESS
        }
        Command::Clear => {
            cache.clear()?;
            ExitCode::SUCCESS
        }
    };

    runtime.block_on(executor.wait_idle());
    Ok(code)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
