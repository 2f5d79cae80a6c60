//! Attestation record schema
//!
//! One document per signed friend or unfriend record persisted from the
//! transaction log. The friend and unfriend collections share this shape;
//! the collection a record lives in determines which kind it is.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;
use crate::db::schemas::Metadata;

/// Collection holding friend attestations
pub const FRIEND_COLLECTION: &str = "friend";

/// Collection holding unfriend attestations
///
/// May not exist on deployments that have never seen an unfriend; its
/// absence means "zero retractions", never an error.
pub const UNFRIEND_COLLECTION: &str = "unfriend";

/// Attestation document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct AttestationDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata
    #[serde(default)]
    pub metadata: Metadata,

    /// Transaction ID the record was replayed from
    pub txid: String,

    /// Block index assigned by the log; the sole ordering key.
    /// Absent for records not yet confirmed into a block.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<u64>,

    /// Block timestamp, if known (seconds since epoch)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,

    /// Address that signed the record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signer_address: Option<String>,

    /// Identity key the record is addressed to
    pub target_id_key: String,

    /// Public key carried by friend records, used once the
    /// relationship is mutual
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange_key: Option<String>,
}

impl IntoIndexes for AttestationDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Lookups by the identity a record is addressed to
            (
                doc! { "target_id_key": 1 },
                Some(
                    IndexOptions::builder()
                        .name("target_id_key_index".to_string())
                        .build(),
                ),
            ),
            // Lookups by signer address ($in over a subject's address set)
            (
                doc! { "signer_address": 1 },
                Some(
                    IndexOptions::builder()
                        .name("signer_address_index".to_string())
                        .build(),
                ),
            ),
            // Ordering key
            (
                doc! { "block": 1 },
                Some(IndexOptions::builder().name("block_index".to_string()).build()),
            ),
        ]
    }
}
