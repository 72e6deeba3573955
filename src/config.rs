//! Cache configuration
//!
//! Collects the knobs a host needs to open a disk-backed cache: where the
//! store lives, how large it may grow, how long refill placeholders live and
//! how many background workers may run at once.

use directories::ProjectDirs;
use std::path::PathBuf;
use thiserror::Error;

use crate::cache::RUSH_SECONDS;

/// Default persistent tier budget: 10 MiB
pub const DEFAULT_MAX_BYTES: u64 = 10 * 1024 * 1024;

/// Default number of concurrently running background tasks
pub const DEFAULT_WORKERS: usize = 4;

/// Errors for configuration that cannot be used to open a cache
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// No platform cache directory could be determined
    #[error("Could not determine a cache directory; pass one explicitly")]
    NoCacheDirectory,

    /// The persistent tier budget is zero
    #[error("max_bytes must be greater than zero")]
    ZeroCapacity,

    /// The refill TTL is not positive
    #[error("rush_seconds must be positive, got {0}")]
    InvalidRushWindow(i64),

    /// No background workers were allowed
    #[error("workers must be greater than zero")]
    NoWorkers,
}

/// Settings for a disk-backed cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Directory holding the persistent tier
    pub directory: PathBuf,
    /// Maximum total size of the persistent tier in bytes
    pub max_bytes: u64,
    /// TTL in seconds given to anti-stampede refills
    pub rush_seconds: i64,
    /// Maximum number of background tasks running at once
    pub workers: usize,
}

impl CacheConfig {
    /// Creates a configuration using the XDG-compliant cache directory
    ///
    /// Uses `~/.cache/objcache/` on Linux, or the platform equivalent.
    /// Returns `None` if no home directory can be found.
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "objcache")?;
        Some(Self::with_dir(project_dirs.cache_dir().to_path_buf()))
    }

    /// Creates a configuration with defaults and a custom directory
    pub fn with_dir(directory: PathBuf) -> Self {
        Self {
            directory,
            max_bytes: DEFAULT_MAX_BYTES,
            rush_seconds: RUSH_SECONDS,
            workers: DEFAULT_WORKERS,
        }
    }

    /// Checks that the configuration can open a working cache
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.rush_seconds <= 0 {
            return Err(ConfigError::InvalidRushWindow(self.rush_seconds));
        }
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        Ok(())
    }
}
