use super::{CacheBackend, CacheError, Ttl};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

/// In-process backend with a per entry expiry instant
///
/// Expired entries are dropped when they are read and swept on every write, so the map holds at
/// most the live entries plus whatever expired since the last write.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, Entry>>,
}

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

impl MemoryBackend {
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        let Some(entry) = entries.get(key) else {
            return Ok(None);
        };

        if entry.is_expired(Instant::now()) {
            entries.remove(key);
            return Ok(None);
        }

        Ok(Some(entry.value.clone()))
    }

    fn set(&self, key: &str, value: String, ttl: Ttl) -> Result<(), CacheError> {
        let now = Instant::now();
        // a ttl past what Instant can represent never expires
        let expires_at = match ttl {
            Ttl::Never => None,
            Ttl::After(duration) => now.checked_add(duration),
        };

        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, entry| !entry.is_expired(now));
        entries.insert(key.to_string(), Entry { value, expires_at });

        Ok(())
    }
}
