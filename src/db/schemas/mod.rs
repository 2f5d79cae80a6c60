//! Database schemas for Kinship
//!
//! Defines MongoDB document structures for friend/unfriend attestation
//! records replayed from the transaction log.

mod attestation;
mod metadata;

pub use attestation::{AttestationDoc, FRIEND_COLLECTION, UNFRIEND_COLLECTION};
pub use metadata::Metadata;
