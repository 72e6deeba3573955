//! Internal cache key derivation
//!
//! Both tiers are keyed by a SHA-256 digest of the caller's logical key
//! followed by the fully-qualified name of the value type, rendered as
//! lowercase hex. Including the type keeps two callers that share a logical
//! key but expect different value types from reading each other's entries.

use sha2::{Digest, Sha256};

/// Length in characters of every derived key
pub const KEY_LEN: usize = 64;

/// Derives the internal key for a logical key and a type identity
///
/// Deterministic across processes (no salt), so persisted entries stay
/// reachable after a restart.
pub fn derive(logical_key: &str, type_identity: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(logical_key.as_bytes());
    hasher.update(type_identity.as_bytes());
    hex::encode(hasher.finalize())
}

/// Derives the internal key using `T`'s type name as the type identity
pub fn derive_for<T: ?Sized>(logical_key: &str) -> String {
    derive(logical_key, std::any::type_name::<T>())
}
