//! Two-tier object cache
//!
//! This module provides a cache manager that keeps entries in memory and
//! writes them through to a bounded persistent store. Each entry carries a
//! TTL and an optional soft-expiry grace mode, in which stale values are
//! still returned but flagged as degraded. Expired reads trigger a
//! background refill that protects the cold path from stampedes.

mod clock;
mod codec;
mod entry;
mod error;
mod expiry;
pub mod key;
mod lock;
mod manager;
mod store;

pub use clock::{Clock, SystemClock};
pub use codec::{Codec, JsonCodec};
pub use entry::{Entry, Freshness, Lookup};
pub use error::CacheError;
pub use expiry::{TtlPreset, NEVER, RUSH_SECONDS};
pub use manager::{CacheManager, CacheManagerBuilder};
pub use store::{DiskStore, PersistentStore};
