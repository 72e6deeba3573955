//! objcache library
//!
//! A two-tier object cache: an in-process map backed by a size-bounded
//! persistent store, with per-entry TTLs, soft expiry and anti-stampede
//! refills. The CLI module is exposed for use in integration tests.

pub mod cache;
pub mod cli;
pub mod config;
pub mod executor;

pub use cache::{CacheError, CacheManager, Lookup, TtlPreset};
pub use config::CacheConfig;
pub use executor::{Executor, InlineExecutor, TokioExecutor};
