//! Resolution cache
//!
//! A generic key/value cache with optional per-key expiry, injected into
//! the address resolver so it can be swapped for an external store or an
//! in-memory fake in tests. Kinship itself only stores address-to-identity
//! entries (no TTL), since identity bindings are immutable once attested.

use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};

use crate::types::Result;

/// Cache key for an address-to-identity entry
pub fn identity_address_key(address: &str) -> String {
    format!("identity:addr:{address}")
}

/// Key/value cache with optional per-key expiry
#[async_trait]
pub trait ResolutionCache: Send + Sync {
    /// Fetch a value; expired entries read as absent
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store a value; `ttl` of `None` means no forced expiry
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()>;
}

struct CachedEntry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl CachedEntry {
    fn live(&self) -> bool {
        match self.expires_at {
            Some(deadline) => deadline > Instant::now(),
            None => true,
        }
    }
}

/// In-memory cache with capacity-bounded eviction
pub struct MemoryCache {
    entries: DashMap<String, CachedEntry>,
    max_entries: usize,
}

impl MemoryCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries,
        }
    }

    fn evict(&self) {
        // Expired entries go first
        self.entries.retain(|_, e| e.live());

        // If still full, drop half (simple LRU approximation). At least
        // one entry goes so the bound holds at tiny capacities.
        if self.entries.len() >= self.max_entries {
            let doomed: Vec<String> = self
                .entries
                .iter()
                .take((self.entries.len() / 2).max(1))
                .map(|e| e.key().clone())
                .collect();
            for key in doomed {
                self.entries.remove(&key);
            }
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[async_trait]
impl ResolutionCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let expired = match self.entries.get(key) {
            Some(entry) => {
                if entry.live() {
                    return Ok(Some(entry.value.clone()));
                }
                true
            }
            None => false,
        };

        if expired {
            self.entries.remove(key);
        }

        Ok(None)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(key) {
            self.evict();
        }

        self.entries.insert(
            key.to_string(),
            CachedEntry {
                value,
                expires_at: ttl.map(|t| Instant::now() + t),
            },
        );

        Ok(())
    }
}
