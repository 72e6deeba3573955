//! Value encoding
//!
//! The manager never interprets payloads itself; it hands values and entry
//! envelopes to a [`Codec`] and stores the resulting text.

use serde::{de::DeserializeOwned, Serialize};

use super::error::CacheError;

/// Converts typed values to and from a text representation
pub trait Codec: Send + Sync + 'static {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, CacheError>;

    /// Decodes `text` as a `T`, failing on malformed input or a type mismatch
    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T, CacheError>;
}

/// JSON codec backed by `serde_json`
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, CacheError> {
        serde_json::to_string(value).map_err(CacheError::serialization)
    }

    fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T, CacheError> {
        serde_json::from_str(text).map_err(CacheError::serialization)
    }
}
