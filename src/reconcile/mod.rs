//! Relationship reconciliation
//!
//! Relationship state is never stored directly - it is reconstructed by
//! replaying an unordered, bidirectional stream of friend/unfriend events
//! that reference the same pair of parties from either side. The fold is
//! deterministic: the log's block index orders events, with a stable
//! collection sequence breaking ties.

mod event;
mod reducer;

pub use event::{EventKind, FriendEvent};
pub use reducer::{reduce, MutualFriend, ReconciliationResult};
