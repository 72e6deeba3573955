//! Two-tier cache manager
//!
//! Provides a `CacheManager` that keeps recently used entries in an
//! in-process map and writes every entry through to a [`PersistentStore`].
//! Entries carry their own expiry policy, evaluated at read time. Reading an
//! expired entry schedules an anti-stampede refill that rewrites the same
//! value with a short rush-window TTL, so concurrent late readers find a
//! placeholder instead of all falling through to the cold path.

use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use super::clock::{Clock, SystemClock};
use super::codec::{Codec, JsonCodec};
use super::entry::{Entry, Freshness, Lookup};
use super::error::CacheError;
use super::expiry::{NEVER, RUSH_SECONDS};
use super::key;
use super::lock::mutex_lock;
use super::store::{DiskStore, PersistentStore};
use crate::config::CacheConfig;
use crate::executor::Executor;

const SOURCE: &str = "cache::manager";

/// State shared between the manager handle and its background tasks
struct Shared<S, C> {
    store: S,
    codec: C,
    /// Memory tier, keyed by internal key
    memory: Mutex<HashMap<String, Entry>>,
    /// Bumped by every `clear`; refills scheduled before a clear are dropped
    generation: AtomicU64,
    executor: Arc<dyn Executor>,
    clock: Arc<dyn Clock>,
    rush_seconds: i64,
}

impl<S: PersistentStore, C: Codec> Shared<S, C> {
    /// Encodes the envelope, then writes the memory tier and the store
    ///
    /// The memory tier is written before the store, so a failed store write
    /// leaves the memory tier one entry ahead of the persistent tier.
    fn write(&self, internal_key: &str, entry: Entry) -> Result<(), CacheError> {
        let envelope = self.codec.encode(&entry)?;
        mutex_lock(&self.memory, SOURCE, "write").insert(internal_key.to_string(), entry);
        self.store.put(internal_key, envelope.as_bytes())?;
        Ok(())
    }

    /// Writes a refill placeholder unless it has been superseded
    ///
    /// The memory lock is held across the store write so a concurrent
    /// `clear` either runs entirely before (and the refill is skipped) or
    /// entirely after (and wipes the refill). Returns false when skipped.
    fn refill(
        &self,
        internal_key: &str,
        expired_created_at: i64,
        payload: String,
        generation: u64,
    ) -> Result<bool, CacheError> {
        let entry = Entry::new(payload, self.rush_seconds, false, self.clock.now());
        let envelope = self.codec.encode(&entry)?;

        let mut memory = mutex_lock(&self.memory, SOURCE, "refill");
        if self.generation.load(Ordering::SeqCst) != generation {
            return Ok(false);
        }
        if memory
            .get(internal_key)
            .is_some_and(|current| current.created_at() > expired_created_at)
        {
            return Ok(false);
        }
        memory.insert(internal_key.to_string(), entry);
        self.store.put(internal_key, envelope.as_bytes())?;
        Ok(true)
    }

    fn remember(&self, internal_key: &str, entry: Entry) {
        mutex_lock(&self.memory, SOURCE, "promote").insert(internal_key.to_string(), entry);
    }

    fn cached(&self, internal_key: &str) -> Option<Entry> {
        mutex_lock(&self.memory, SOURCE, "get").get(internal_key).cloned()
    }

    fn read_stored(&self, internal_key: &str) -> Result<Option<Entry>, CacheError> {
        let Some(bytes) = self.store.get(internal_key)? else {
            return Ok(None);
        };
        let text = String::from_utf8(bytes).map_err(CacheError::serialization)?;
        self.codec.decode(&text).map(Some)
    }
}

/// Handle to a two-tier object cache
///
/// Cloning is cheap; clones share both tiers. A process is expected to build
/// one manager at startup, once its persistent store is open, and pass it to
/// whatever needs caching.
///
/// Values are keyed by the caller's logical key together with the value's
/// type name, so `put::<User>("k", ..)` is only visible to `get::<User>("k")`.
///
/// The memory tier is unbounded: it keeps every entry written or promoted
/// through this manager until [`clear`](Self::clear), even after the
/// persistent tier has evicted it. Size it by the number of distinct keys
/// the process touches, not by the store's byte budget.
pub struct CacheManager<S, C = JsonCodec> {
    shared: Arc<Shared<S, C>>,
}

impl<S, C> Clone for CacheManager<S, C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// Assembles a [`CacheManager`] from its collaborators
pub struct CacheManagerBuilder<S, C = JsonCodec> {
    store: S,
    codec: C,
    executor: Arc<dyn Executor>,
    clock: Arc<dyn Clock>,
    rush_seconds: i64,
}

impl<S: PersistentStore + 'static, C: Codec> CacheManagerBuilder<S, C> {
    /// Replaces the codec used for values and envelopes
    pub fn codec<C2: Codec>(self, codec: C2) -> CacheManagerBuilder<S, C2> {
        CacheManagerBuilder {
            store: self.store,
            codec,
            executor: self.executor,
            clock: self.clock,
            rush_seconds: self.rush_seconds,
        }
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sets the TTL given to anti-stampede refills
    ///
    /// Non-positive values fall back to [`RUSH_SECONDS`].
    pub fn rush_seconds(mut self, rush_seconds: i64) -> Self {
        self.rush_seconds = if rush_seconds > 0 {
            rush_seconds
        } else {
            RUSH_SECONDS
        };
        self
    }

    pub fn build(self) -> CacheManager<S, C> {
        CacheManager {
            shared: Arc::new(Shared {
                store: self.store,
                codec: self.codec,
                memory: Mutex::new(HashMap::new()),
                generation: AtomicU64::new(0),
                executor: self.executor,
                clock: self.clock,
                rush_seconds: self.rush_seconds,
            }),
        }
    }
}

impl<S: PersistentStore + 'static> CacheManager<S, JsonCodec> {
    /// Creates a manager with the JSON codec and the system clock
    pub fn new(store: S, executor: Arc<dyn Executor>) -> Self {
        Self::builder(store, executor).build()
    }

    /// Starts building a manager around an already-open store
    pub fn builder(store: S, executor: Arc<dyn Executor>) -> CacheManagerBuilder<S, JsonCodec> {
        CacheManagerBuilder {
            store,
            codec: JsonCodec,
            executor,
            clock: Arc::new(SystemClock),
            rush_seconds: RUSH_SECONDS,
        }
    }
}

impl CacheManager<DiskStore, JsonCodec> {
    /// Opens a disk-backed manager described by `config`
    ///
    /// # Returns
    /// * `Ok(CacheManager)` once the store directory is open and indexed
    /// * `Err(CacheError::Storage)` if the directory cannot be created or read
    pub fn open(config: &CacheConfig, executor: Arc<dyn Executor>) -> Result<Self, CacheError> {
        let store = DiskStore::open(&config.directory, config.max_bytes)?;
        Ok(Self::builder(store, executor)
            .rush_seconds(config.rush_seconds)
            .build())
    }
}

impl<S: PersistentStore + 'static, C: Codec> CacheManager<S, C> {
    /// Returns true if the persistent tier holds an entry for `key` as a `T`
    ///
    /// Expired entries still count as present. Storage failures are logged
    /// and reported as `false`.
    pub fn exists<T: ?Sized>(&self, key: &str) -> bool {
        let internal_key = key::derive_for::<T>(key);
        match self.shared.store.contains(&internal_key) {
            Ok(found) => found,
            Err(e) => {
                warn!(key, error = %e, "Cache existence check failed");
                false
            }
        }
    }

    /// Reads `key` as a `T`
    ///
    /// Storage and decode failures are logged and reported as
    /// [`Lookup::Absent`]; a cache lookup never fails the caller.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Lookup<T> {
        match self.try_get(key) {
            Ok(lookup) => lookup,
            Err(e) => {
                warn!(key, error = %e, "Cache lookup failed, treating as absent");
                Lookup::Absent
            }
        }
    }

    /// Reads `key` as a `T`, surfacing storage and decode failures
    ///
    /// # Returns
    /// * `Ok(Lookup::Fresh)` for an entry within its lifetime
    /// * `Ok(Lookup::Degraded)` for an expired entry that allows soft expiry
    /// * `Ok(Lookup::Absent)` for a missing or hard-expired entry
    /// * `Err(CacheError)` if the persistent tier or the codec failed
    ///
    /// Both expired cases schedule an anti-stampede refill.
    pub fn try_get<T: DeserializeOwned>(&self, key: &str) -> Result<Lookup<T>, CacheError> {
        let internal_key = key::derive_for::<T>(key);
        let now = self.shared.clock.now();

        let cached = self.shared.cached(&internal_key);
        if let Some(entry) = &cached {
            match entry.freshness(now) {
                Freshness::Fresh => {
                    debug!(key, "Memory tier hit");
                    return Ok(Lookup::Fresh(self.shared.codec.decode(entry.payload())?));
                }
                Freshness::SoftExpired => {
                    let value = self.shared.codec.decode(entry.payload())?;
                    self.schedule_refill(&internal_key, entry);
                    return Ok(Lookup::Degraded(value));
                }
                // The store may hold a newer entry written by another manager
                Freshness::HardExpired => {}
            }
        }

        // Past this point a cached entry is hard-expired
        let stored = match self.shared.read_stored(&internal_key) {
            Ok(stored) => stored,
            Err(e) => {
                if let Some(expired) = &cached {
                    self.schedule_refill(&internal_key, expired);
                }
                return Err(e);
            }
        };
        // Fall back to the expired memory entry when the store lost the key
        let Some(entry) = stored.or(cached) else {
            debug!(key, "Cache miss");
            return Ok(Lookup::Absent);
        };
        let value: T = self.shared.codec.decode(entry.payload())?;

        match entry.freshness(now) {
            Freshness::Fresh => {
                debug!(key, "Persistent tier hit, promoting to memory");
                self.shared.remember(&internal_key, entry);
                Ok(Lookup::Fresh(value))
            }
            Freshness::SoftExpired => {
                self.schedule_refill(&internal_key, &entry);
                Ok(Lookup::Degraded(value))
            }
            Freshness::HardExpired => {
                self.schedule_refill(&internal_key, &entry);
                Ok(Lookup::Absent)
            }
        }
    }

    /// Stores `value` under `key` with no expiry
    ///
    /// The type identity is `T` as seen at the call site: `put("k", "text")`
    /// stores a `str`, which `get::<String>("k")` will not find. Pass
    /// `&String` to share the entry with `String` readers.
    pub fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        self.put_with(key, value, NEVER, false)
    }

    /// Stores `value` under `key` in both tiers
    ///
    /// # Arguments
    /// * `key` - Logical key; combined with `T`'s type name internally, so
    ///   the value must be read back with the same `T` (`str` and `String`
    ///   are distinct)
    /// * `value` - The value to cache
    /// * `ttl_seconds` - Lifetime in seconds; zero or negative never expires
    /// * `allow_soft_expiry` - Whether the value may be served degraded after expiry
    ///
    /// # Returns
    /// * `Ok(())` once both tiers hold the new entry
    /// * `Err(CacheError)` on an encode or storage failure. The memory tier
    ///   may already hold the new entry when the store write fails.
    pub fn put_with<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: i64,
        allow_soft_expiry: bool,
    ) -> Result<(), CacheError> {
        let internal_key = key::derive_for::<T>(key);
        let payload = self.shared.codec.encode(value)?;
        let entry = Entry::new(
            payload,
            ttl_seconds,
            allow_soft_expiry,
            self.shared.clock.now(),
        );
        self.shared.write(&internal_key, entry)
    }

    /// Runs [`try_get`](Self::try_get) on the executor and hands the outcome to `callback`
    ///
    /// Unlike [`get`](Self::get), failures reach the callback as `Err`.
    pub fn get_async<T, F>(&self, key: &str, callback: F)
    where
        T: DeserializeOwned + 'static,
        F: FnOnce(Result<Lookup<T>, CacheError>) + Send + 'static,
    {
        let manager = self.clone();
        let key = key.to_string();
        self.shared
            .executor
            .submit(Box::new(move || callback(manager.try_get::<T>(&key))));
    }

    /// Stores `value` with no expiry on the executor
    pub fn put_async<T, F>(&self, key: &str, value: T, callback: F)
    where
        T: Serialize + Send + 'static,
        F: FnOnce(Result<(), CacheError>) + Send + 'static,
    {
        self.put_async_with(key, value, NEVER, false, callback);
    }

    /// Runs [`put_with`](Self::put_with) on the executor and hands the outcome to `callback`
    pub fn put_async_with<T, F>(
        &self,
        key: &str,
        value: T,
        ttl_seconds: i64,
        allow_soft_expiry: bool,
        callback: F,
    ) where
        T: Serialize + Send + 'static,
        F: FnOnce(Result<(), CacheError>) + Send + 'static,
    {
        let manager = self.clone();
        let key = key.to_string();
        self.shared.executor.submit(Box::new(move || {
            callback(manager.put_with(&key, &value, ttl_seconds, allow_soft_expiry))
        }));
    }

    /// Empties both tiers
    ///
    /// Refills scheduled before the call are discarded when they run.
    pub fn clear(&self) -> Result<(), CacheError> {
        {
            let mut memory = mutex_lock(&self.shared.memory, SOURCE, "clear");
            self.shared.generation.fetch_add(1, Ordering::SeqCst);
            memory.clear();
        }
        self.shared.store.clear()?;
        Ok(())
    }

    /// Number of entries held in the memory tier
    pub fn memory_len(&self) -> usize {
        mutex_lock(&self.shared.memory, SOURCE, "memory_len").len()
    }

    /// TTL given to anti-stampede refills
    pub fn rush_seconds(&self) -> i64 {
        self.shared.rush_seconds
    }

    /// Rewrites an expired payload in the background with the rush TTL
    ///
    /// Concurrent readers of the same expired key may each schedule a
    /// refill; they all write the same payload. A refill is dropped if a
    /// `clear` ran since it was scheduled, or if the memory tier already
    /// holds an entry newer than the expired one. Failures are only logged.
    fn schedule_refill(&self, internal_key: &str, expired: &Entry) {
        let shared = Arc::clone(&self.shared);
        let internal_key = internal_key.to_string();
        let payload = expired.payload().to_string();
        let expired_created_at = expired.created_at();
        let generation = shared.generation.load(Ordering::SeqCst);
        debug!(key = %internal_key, rush_seconds = shared.rush_seconds, "Scheduling refill");

        self.shared.executor.submit(Box::new(move || {
            match shared.refill(&internal_key, expired_created_at, payload, generation) {
                Ok(true) => {}
                Ok(false) => debug!(key = %internal_key, "Refill superseded, skipped"),
                Err(e) => warn!(key = %internal_key, error = %e, "Anti-stampede refill failed"),
            }
        }));
    }
}
