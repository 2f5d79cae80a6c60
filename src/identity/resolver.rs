//! Cache-first address resolution
//!
//! Wraps the identity directory with the resolution cache. Positive
//! resolutions are cached with no expiry - identity bindings are immutable
//! once attested. Negative resolutions are never cached, so an address
//! with no known identity re-queries the directory on every call.
//! Directory failures are surfaced as errors and likewise never cached:
//! forgetting a real identity because of a transient outage would be a
//! correctness bug, not a cache policy choice.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::{identity_address_key, ResolutionCache};
use crate::directory::{IdentityDirectory, ResolutionHint};
use crate::identity::Identity;
use crate::types::Result;

/// Resolution counters, readable as a snapshot
#[derive(Debug, Default)]
pub struct ResolverStats {
    hits: AtomicU64,
    misses: AtomicU64,
    negatives: AtomicU64,
    failures: AtomicU64,
}

/// Point-in-time view of [`ResolverStats`]
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolverStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub negatives: u64,
    pub failures: u64,
}

/// Resolves one signing address to zero-or-one identity record
pub struct AddressIdentityResolver {
    directory: Arc<dyn IdentityDirectory>,
    cache: Arc<dyn ResolutionCache>,
    stats: ResolverStats,
}

impl AddressIdentityResolver {
    pub fn new(directory: Arc<dyn IdentityDirectory>, cache: Arc<dyn ResolutionCache>) -> Self {
        Self {
            directory,
            cache,
            stats: ResolverStats::default(),
        }
    }

    /// Resolve an address, checking the cache before the directory
    ///
    /// `Ok(None)` means the directory positively reported no bound identity.
    /// Concurrent callers may both miss the cache and both query the
    /// directory; the duplicate cache writes are value-equal, so no locking
    /// is needed.
    pub async fn resolve(
        &self,
        address: &str,
        hint: ResolutionHint,
    ) -> Result<Option<Identity>> {
        let key = identity_address_key(address);

        // Cache errors read as a miss, never as a failure
        match self.cache.get(&key).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<Identity>(&bytes) {
                Ok(identity) => {
                    self.stats.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(address = %address, "identity resolved from cache");
                    return Ok(Some(identity));
                }
                Err(e) => {
                    warn!(address = %address, error = %e, "discarding undecodable cache entry");
                }
            },
            Ok(None) => {}
            Err(e) => {
                warn!(address = %address, error = %e, "cache read failed, falling through");
            }
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);

        match self.directory.resolve_by_address(address, hint).await {
            Ok(Some(identity)) => {
                self.cache_identity(&key, &identity).await;
                Ok(Some(identity))
            }
            Ok(None) => {
                // Intentionally not cached: a later-established binding for
                // this address must stay discoverable
                self.stats.negatives.fetch_add(1, Ordering::Relaxed);
                debug!(address = %address, "no identity bound to address");
                Ok(None)
            }
            Err(e) => {
                self.stats.failures.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    async fn cache_identity(&self, key: &str, identity: &Identity) {
        match serde_json::to_vec(identity) {
            // No TTL: identity bindings are immutable once attested
            Ok(bytes) => {
                if let Err(e) = self.cache.set(key, bytes, None).await {
                    warn!(key = %key, error = %e, "cache write failed");
                }
            }
            Err(e) => {
                warn!(key = %key, error = %e, "identity serialization failed, skipping cache");
            }
        }
    }

    /// Snapshot of resolution counters
    pub fn stats(&self) -> ResolverStatsSnapshot {
        ResolverStatsSnapshot {
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            negatives: self.stats.negatives.load(Ordering::Relaxed),
            failures: self.stats.failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::types::KinshipError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;

    enum Scripted {
        Found(Identity),
        Absent,
        Unavailable,
    }

    struct ScriptedDirectory {
        by_address: HashMap<String, Scripted>,
        calls: AtomicUsize,
    }

    impl ScriptedDirectory {
        fn new(by_address: HashMap<String, Scripted>) -> Self {
            Self {
                by_address,
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl IdentityDirectory for ScriptedDirectory {
        async fn resolve_by_address(
            &self,
            address: &str,
            _hint: ResolutionHint,
        ) -> Result<Option<Identity>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.by_address.get(address) {
                Some(Scripted::Found(identity)) => Ok(Some(identity.clone())),
                Some(Scripted::Absent) | None => Ok(None),
                Some(Scripted::Unavailable) => {
                    Err(KinshipError::Directory("directory down".to_string()))
                }
            }
        }

        async fn resolve_by_key(&self, _id_key: &str) -> Result<Option<Identity>> {
            Ok(None)
        }
    }

    fn identity(id_key: &str, address: &str) -> Identity {
        Identity {
            id_key: id_key.to_string(),
            root_address: address.to_string(),
            current_address: address.to_string(),
            addresses: vec![],
            valid: true,
            profile: serde_json::Value::Null,
        }
    }

    fn resolver(directory: Arc<ScriptedDirectory>) -> AddressIdentityResolver {
        AddressIdentityResolver::new(directory, Arc::new(MemoryCache::new(64)))
    }

    #[tokio::test]
    async fn positive_resolution_is_cached() {
        let directory = Arc::new(ScriptedDirectory::new(HashMap::from([(
            "1A".to_string(),
            Scripted::Found(identity("idkey-a", "1A")),
        )])));
        let resolver = resolver(Arc::clone(&directory));

        let first = resolver.resolve("1A", ResolutionHint::default()).await.unwrap();
        let second = resolver.resolve("1A", ResolutionHint::default()).await.unwrap();

        assert_eq!(first.unwrap().id_key, "idkey-a");
        assert_eq!(second.unwrap().id_key, "idkey-a");
        // Second call short-circuited at the cache
        assert_eq!(directory.call_count(), 1);

        let stats = resolver.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn negative_resolution_is_not_cached() {
        let directory = Arc::new(ScriptedDirectory::new(HashMap::from([(
            "1X".to_string(),
            Scripted::Absent,
        )])));
        let resolver = resolver(Arc::clone(&directory));

        assert!(resolver
            .resolve("1X", ResolutionHint::default())
            .await
            .unwrap()
            .is_none());
        assert!(resolver
            .resolve("1X", ResolutionHint::default())
            .await
            .unwrap()
            .is_none());

        // Every negative re-queries the directory
        assert_eq!(directory.call_count(), 2);
        assert_eq!(resolver.stats().negatives, 2);
    }

    #[tokio::test]
    async fn directory_failure_is_an_error_and_not_cached() {
        let directory = Arc::new(ScriptedDirectory::new(HashMap::from([(
            "1F".to_string(),
            Scripted::Unavailable,
        )])));
        let resolver = resolver(Arc::clone(&directory));

        assert!(matches!(
            resolver.resolve("1F", ResolutionHint::default()).await,
            Err(KinshipError::Directory(_))
        ));
        assert!(resolver.resolve("1F", ResolutionHint::default()).await.is_err());

        // Failure must not be remembered as a negative
        assert_eq!(directory.call_count(), 2);
        assert_eq!(resolver.stats().failures, 2);
    }
}
