//! Stored envelope and lookup results
//!
//! An [`Entry`] is what actually lands in both tiers: the encoded value plus
//! the timing metadata needed to decide its freshness at read time. Entries
//! are immutable; a later put under the same key replaces the whole entry.

use serde::{Deserialize, Serialize};

use super::expiry::NEVER;

/// Envelope for a cached value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// The encoded value, meaningful only together with the caller's type
    payload: String,
    /// Seconds since epoch when the entry was written
    created_at: i64,
    /// Lifetime in seconds, or [`NEVER`]
    ttl_seconds: i64,
    /// Deadline computed once at creation, or [`NEVER`]
    expires_at: i64,
    /// Whether the value may still be served, degraded, after the deadline
    soft_expiry: bool,
}

/// How an entry should be treated at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Never expiring, or before its deadline
    Fresh,
    /// Past its deadline but allowed to be served as degraded
    SoftExpired,
    /// Past its deadline and treated as absent
    HardExpired,
}

impl Entry {
    /// Wraps an encoded payload with its expiry policy
    ///
    /// A `ttl_seconds` of zero or less means the entry never expires.
    pub fn new(payload: String, ttl_seconds: i64, soft_expiry: bool, now: i64) -> Self {
        let ttl_seconds = if ttl_seconds <= 0 { NEVER } else { ttl_seconds };
        let expires_at = if ttl_seconds == NEVER {
            NEVER
        } else {
            now.saturating_add(ttl_seconds)
        };

        Self {
            payload,
            created_at: now,
            ttl_seconds,
            expires_at,
            soft_expiry,
        }
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    pub fn soft_expiry_allowed(&self) -> bool {
        self.soft_expiry
    }

    /// Returns true once `now` has reached the deadline
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at != NEVER && now >= self.expires_at
    }

    /// Returns true if expired but still servable as degraded
    pub fn is_soft_expired(&self, now: i64) -> bool {
        self.is_expired(now) && self.soft_expiry
    }

    pub fn freshness(&self, now: i64) -> Freshness {
        if !self.is_expired(now) {
            Freshness::Fresh
        } else if self.soft_expiry {
            Freshness::SoftExpired
        } else {
            Freshness::HardExpired
        }
    }
}

/// Outcome of a cache lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    /// The value is within its lifetime
    Fresh(T),
    /// The value is past its deadline but soft expiry allowed serving it
    Degraded(T),
    /// Nothing usable is cached
    Absent,
}

impl<T> Lookup<T> {
    pub fn is_fresh(&self) -> bool {
        matches!(self, Lookup::Fresh(_))
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Lookup::Degraded(_))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Lookup::Absent)
    }

    /// Returns the value, fresh or degraded
    pub fn value(self) -> Option<T> {
        match self {
            Lookup::Fresh(value) | Lookup::Degraded(value) => Some(value),
            Lookup::Absent => None,
        }
    }

    /// Returns the value only if it is fresh
    pub fn fresh(self) -> Option<T> {
        match self {
            Lookup::Fresh(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Lookup::Fresh(value) => Lookup::Fresh(f(value)),
            Lookup::Degraded(value) => Lookup::Degraded(f(value)),
            Lookup::Absent => Lookup::Absent,
        }
    }
}
