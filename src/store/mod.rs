//! Relationship event store accessor
//!
//! Reads raw friend/unfriend records in both directions - records
//! addressed to the subject identity and records signed by any of the
//! subject's own addresses - and normalizes them into [`FriendEvent`]s.
//! Output ordering is not guaranteed here; ordering is the reducer's
//! responsibility.

use async_trait::async_trait;
use bson::doc;
use std::sync::Arc;
use tracing::warn;

use crate::db::schemas::{AttestationDoc, FRIEND_COLLECTION, UNFRIEND_COLLECTION};
use crate::db::{MongoClient, MongoCollection};
use crate::identity::Identity;
use crate::reconcile::{EventKind, FriendEvent};
use crate::types::Result;

/// Read access to the friend and unfriend record collections
#[async_trait]
pub trait RelationshipRecordStore: Send + Sync {
    /// Friend records addressed to the given identity key
    async fn friends_to(&self, id_key: &str) -> Result<Vec<AttestationDoc>>;

    /// Friend records signed by any of the given addresses
    async fn friends_from(&self, addresses: &[String]) -> Result<Vec<AttestationDoc>>;

    /// Unfriend records addressed to the given identity key
    async fn unfriends_to(&self, id_key: &str) -> Result<Vec<AttestationDoc>>;

    /// Unfriend records signed by any of the given addresses
    async fn unfriends_from(&self, addresses: &[String]) -> Result<Vec<AttestationDoc>>;
}

/// MongoDB-backed record store
pub struct MongoRecordStore {
    friends: MongoCollection<AttestationDoc>,
    // A deployment that has never recorded an unfriend simply has no
    // documents here; reads against the absent collection return empty.
    // Construction errors are real server faults and must propagate -
    // masking them as "zero retractions" would report retracted
    // relationships as active.
    unfriends: MongoCollection<AttestationDoc>,
}

impl MongoRecordStore {
    pub async fn new(client: &MongoClient) -> Result<Self> {
        let friends = client.collection::<AttestationDoc>(FRIEND_COLLECTION).await?;
        let unfriends = client.collection::<AttestationDoc>(UNFRIEND_COLLECTION).await?;

        Ok(Self { friends, unfriends })
    }
}

#[async_trait]
impl RelationshipRecordStore for MongoRecordStore {
    async fn friends_to(&self, id_key: &str) -> Result<Vec<AttestationDoc>> {
        self.friends.find_many(doc! { "target_id_key": id_key }).await
    }

    async fn friends_from(&self, addresses: &[String]) -> Result<Vec<AttestationDoc>> {
        self.friends
            .find_many(doc! { "signer_address": { "$in": addresses.to_vec() } })
            .await
    }

    async fn unfriends_to(&self, id_key: &str) -> Result<Vec<AttestationDoc>> {
        self.unfriends
            .find_many(doc! { "target_id_key": id_key })
            .await
    }

    async fn unfriends_from(&self, addresses: &[String]) -> Result<Vec<AttestationDoc>> {
        self.unfriends
            .find_many(doc! { "signer_address": { "$in": addresses.to_vec() } })
            .await
    }
}

/// Collects and normalizes a subject's relationship events
pub struct EventCollector {
    store: Arc<dyn RelationshipRecordStore>,
}

impl EventCollector {
    pub fn new(store: Arc<dyn RelationshipRecordStore>) -> Self {
        Self { store }
    }

    /// Fetch all four record subsets for a subject and normalize them
    ///
    /// Subset order is fixed (friends-to, friends-from, unfriends-to,
    /// unfriends-from) so that the per-run `seq` assigned here is a stable
    /// tie-break for events sharing a block.
    pub async fn collect(&self, subject: &Identity) -> Result<Vec<FriendEvent>> {
        let addresses = subject.all_addresses();

        let mut raw: Vec<(EventKind, AttestationDoc)> = Vec::new();
        for record in self.store.friends_to(&subject.id_key).await? {
            raw.push((EventKind::Friend, record));
        }
        for record in self.store.friends_from(&addresses).await? {
            raw.push((EventKind::Friend, record));
        }
        for record in self.store.unfriends_to(&subject.id_key).await? {
            raw.push((EventKind::Unfriend, record));
        }
        for record in self.store.unfriends_from(&addresses).await? {
            raw.push((EventKind::Unfriend, record));
        }

        let mut events = Vec::with_capacity(raw.len());
        for (seq, (kind, record)) in raw.into_iter().enumerate() {
            if let Some(event) = normalize(kind, record, seq as u64) {
                events.push(event);
            }
        }

        Ok(events)
    }
}

/// Turn one raw record into an event, or drop it with a diagnostic
fn normalize(kind: EventKind, record: AttestationDoc, seq: u64) -> Option<FriendEvent> {
    let signer_address = match record.signer_address.as_deref() {
        Some(addr) if !addr.is_empty() && bs58::decode(addr).into_vec().is_ok() => addr.to_string(),
        Some(addr) => {
            warn!(txid = %record.txid, signer = %addr, "dropping record with unusable signer address");
            return None;
        }
        None => {
            warn!(txid = %record.txid, "dropping record without signer address");
            return None;
        }
    };

    let log_position = match record.block {
        Some(block) => block,
        None => {
            warn!(txid = %record.txid, "dropping record without log position");
            return None;
        }
    };

    Some(FriendEvent {
        kind,
        log_position,
        seq,
        signer_address,
        target_id_key: record.target_id_key,
        exchange_key: record.exchange_key,
        timestamp: record.timestamp,
    })
}
