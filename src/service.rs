//! Friendship query orchestration
//!
//! One entry point: resolve the subject, collect its events, resolve
//! every distinct counterparty signer address concurrently, then run the
//! sequential fold. Partial failures degrade to a smaller-than-complete
//! but internally consistent result; only an unresolvable subject fails
//! the request.

use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::directory::{IdentityDirectory, ResolutionHint};
use crate::identity::{AddressIdentityResolver, Identity};
use crate::reconcile::{reduce, FriendEvent, ReconciliationResult};
use crate::store::{EventCollector, RelationshipRecordStore};
use crate::types::{KinshipError, Result};

pub struct FriendshipQueryService {
    directory: Arc<dyn IdentityDirectory>,
    resolver: Arc<AddressIdentityResolver>,
    collector: EventCollector,
    resolve_concurrency: usize,
}

impl FriendshipQueryService {
    pub fn new(
        directory: Arc<dyn IdentityDirectory>,
        resolver: Arc<AddressIdentityResolver>,
        store: Arc<dyn RelationshipRecordStore>,
        resolve_concurrency: usize,
    ) -> Self {
        Self {
            directory,
            resolver,
            collector: EventCollector::new(store),
            resolve_concurrency: resolve_concurrency.max(1),
        }
    }

    /// Reconcile the current relationships of one subject identity
    ///
    /// Fails with `IdentityNotFound` only when the subject itself cannot
    /// be resolved; a subject with no relationships yields empty buckets.
    pub async fn relationships(&self, subject_key: &str) -> Result<ReconciliationResult> {
        let subject = self
            .directory
            .resolve_by_key(subject_key)
            .await?
            .ok_or_else(|| KinshipError::IdentityNotFound(subject_key.to_string()))?;

        debug!(id_key = %subject.id_key, "subject resolved");

        let events = self.collector.collect(&subject).await?;
        debug!(id_key = %subject.id_key, events = events.len(), "events collected");

        let resolved = self.resolve_counterparties(&subject, &events).await;

        Ok(reduce(&subject, &events, &resolved))
    }

    /// Resolve every distinct foreign signer address to an identity key
    ///
    /// Unordered fan-out bounded by `resolve_concurrency`; completion
    /// order is irrelevant since only the final address-to-key map feeds
    /// the fold. Failed and negative resolutions are dropped from the map,
    /// which makes the affected events unattributable and skipped.
    async fn resolve_counterparties(
        &self,
        subject: &Identity,
        events: &[FriendEvent],
    ) -> HashMap<String, String> {
        // Distinct addresses, each with the hint from its earliest event
        let mut targets: HashMap<String, (u64, ResolutionHint)> = HashMap::new();
        for event in events {
            if subject.owns_address(&event.signer_address) {
                continue;
            }
            let hint = ResolutionHint {
                block: Some(event.log_position),
                timestamp: event.timestamp,
            };
            targets
                .entry(event.signer_address.clone())
                .and_modify(|(position, existing)| {
                    if event.log_position < *position {
                        *position = event.log_position;
                        *existing = hint;
                    }
                })
                .or_insert((event.log_position, hint));
        }

        let lookups = targets.into_iter().map(|(address, (_, hint))| {
            let resolver = Arc::clone(&self.resolver);
            async move {
                let outcome = resolver.resolve(&address, hint).await;
                (address, outcome)
            }
        });

        let outcomes = stream::iter(lookups)
            .buffer_unordered(self.resolve_concurrency)
            .collect::<Vec<_>>()
            .await;

        let mut resolved = HashMap::new();
        for (address, outcome) in outcomes {
            match outcome {
                Ok(Some(identity)) => {
                    resolved.insert(address, identity.id_key);
                }
                Ok(None) => {
                    debug!(address = %address, "no identity bound to signer address");
                }
                Err(e) => {
                    warn!(address = %address, error = %e, "counterparty resolution failed, events skipped");
                }
            }
        }

        resolved
    }
}
