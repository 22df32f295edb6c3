//! Time-bounded cache for raw remote data
//!
//! [Cache] hides which [CacheBackend] stores the entries. Keys and values are both turned into
//! JSON text before they reach the backend, so an in-process map and a networked store behave
//! identically: whatever goes in comes back out after a serialization round trip.
//!
//! Structured keys (see [CacheKey]) are serialized in field declaration order, which makes the
//! resulting backend key canonical.
mod memory;
#[cfg(feature = "redis")]
mod redis;

pub use memory::MemoryBackend;
#[cfg(feature = "redis")]
pub use self::redis::RedisBackend;

use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

/// Storage behind a [Cache]
///
/// Implementations must be safe to share between threads. Concurrent writers to the same key
/// resolve as last-writer-wins.
pub trait CacheBackend: Send + Sync {
    /// Stored text for `key`, `None` if missing or expired
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    fn set(&self, key: &str, value: String, ttl: Ttl) -> Result<(), CacheError>;
}

/// Lifetime of a cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    Never,
    After(Duration),
}

impl Ttl {
    /// Zero or negative seconds mean the entry never expires
    pub fn from_secs(seconds: i64) -> Self {
        match u64::try_from(seconds) {
            Ok(seconds) if seconds > 0 => Ttl::After(Duration::from_secs(seconds)),
            _ => Ttl::Never,
        }
    }
}

impl Default for Ttl {
    fn default() -> Self {
        Ttl::After(Duration::from_secs(60))
    }
}

/// Identifies the raw remote data of one query target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CacheKey {
    Outputs { stack: String, outputs: bool },
    Resource { stack: String, resource: String },
}

impl CacheKey {
    pub fn outputs(stack: &str) -> Self {
        CacheKey::Outputs {
            stack: stack.to_string(),
            outputs: true,
        }
    }

    pub fn resource(stack: &str, resource: &str) -> Self {
        CacheKey::Resource {
            stack: stack.to_string(),
            resource: resource.to_string(),
        }
    }
}

pub struct Cache {
    backend: Box<dyn CacheBackend>,
    ttl: Ttl,
}

impl Cache {
    pub fn new(backend: impl CacheBackend + 'static, ttl: Ttl) -> Self {
        Self {
            backend: Box::new(backend),
            ttl,
        }
    }

    pub fn in_memory(ttl: Ttl) -> Self {
        Self::new(MemoryBackend::default(), ttl)
    }

    pub fn ttl(&self) -> Ttl {
        self.ttl
    }

    pub fn get<V: DeserializeOwned>(&self, key: &impl Serialize) -> Result<Option<V>, CacheError> {
        let key = format_key(key)?;
        let Some(stored) = self.backend.get(&key)? else {
            tracing::trace!(%key, "cache miss");
            return Ok(None);
        };

        tracing::trace!(%key, "cache hit");
        Ok(Some(serde_json::from_str(&stored)?))
    }

    /// Store `value` with the cache wide ttl
    pub fn put<V: Serialize>(&self, key: &impl Serialize, value: &V) -> Result<(), CacheError> {
        self.put_with_ttl(key, value, self.ttl)
    }

    pub fn put_with_ttl<V: Serialize>(
        &self,
        key: &impl Serialize,
        value: &V,
        ttl: Ttl,
    ) -> Result<(), CacheError> {
        let key = format_key(key)?;
        let value = serde_json::to_string(value)?;
        self.backend.set(&key, value, ttl)
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache").field("ttl", &self.ttl).finish()
    }
}

/// Flatten a key into the text used by the backend
///
/// Plain strings are used as is, anything structured becomes compact JSON.
pub fn format_key(key: &impl Serialize) -> Result<String, CacheError> {
    match serde_json::to_value(key)? {
        serde_json::Value::String(key) => Ok(key),
        structured => Ok(structured.to_string()),
    }
}

#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    #[error("Unable to serialize or deserialize cache entry")]
    Serialization(#[from] serde_json::Error),
    #[cfg(feature = "redis")]
    #[error("Cache backend request failed")]
    Redis(#[from] ::redis::RedisError),
}
