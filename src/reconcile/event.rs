//! Normalized relationship events
//!
//! One event per stored attestation record, built by the accessor layer
//! so the reducer never deals with raw-document optionality. Events exist
//! only within a reconciliation run and are never persisted.

/// What an event asserts about the relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// One-directional friend assertion toward the target identity
    Friend,
    /// Withdrawal of the relationship, from either side
    Unfriend,
}

/// A normalized record derived from one raw log entry
#[derive(Debug, Clone)]
pub struct FriendEvent {
    pub kind: EventKind,

    /// Block index assigned by the log; primary ordering key
    pub log_position: u64,

    /// Stable input sequence assigned at collection time; breaks ties
    /// between events sharing a block
    pub seq: u64,

    /// Address that signed the record
    pub signer_address: String,

    /// Identity key the record is addressed to
    pub target_id_key: String,

    /// Public key carried by friend records
    pub exchange_key: Option<String>,

    /// Block timestamp, forwarded to the directory as a resolution hint
    pub timestamp: Option<i64>,
}
