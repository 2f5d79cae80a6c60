//! The reconciliation reducer
//!
//! A pure fold from an event list to classified relationship state.
//! No I/O: counterparty attribution uses a pre-resolved address-to-key
//! map built by the orchestrator, so the fold is fully unit-testable
//! with nothing but an event list.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::identity::Identity;
use crate::reconcile::event::{EventKind, FriendEvent};

/// Per-counterparty relationship state accumulated during the fold
#[derive(Debug, Clone, Default)]
struct RelationshipState {
    from_subject: bool,
    from_counterparty: bool,
    retracted: bool,
    subject_exchange_key: Option<String>,
    counterparty_exchange_key: Option<String>,
}

/// A confirmed mutual relationship with both exchange keys
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutualFriend {
    pub counterparty_key: String,
    pub subject_exchange_key: Option<String>,
    pub counterparty_exchange_key: Option<String>,
}

/// Classified output of one reconciliation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationResult {
    /// Both sides asserted, neither retracted
    pub mutual: Vec<MutualFriend>,
    /// Counterparty asserted, subject has not answered
    pub incoming: Vec<String>,
    /// Subject asserted, counterparty has not answered
    pub outgoing: Vec<String>,
}

/// Fold an event list into a classified relationship result
///
/// Events are ordered by `(log_position, seq)` and applied strictly left
/// to right; this must not be parallelized. Events whose signer cannot be
/// attributed to a known party, and events that do not reference the
/// subject in either role, are skipped.
pub fn reduce(
    subject: &Identity,
    events: &[FriendEvent],
    resolved: &HashMap<String, String>,
) -> ReconciliationResult {
    let mut ordered: Vec<&FriendEvent> = events.iter().collect();
    ordered.sort_by_key(|e| (e.log_position, e.seq));

    let mut states: BTreeMap<String, RelationshipState> = BTreeMap::new();

    for event in ordered {
        let requestor_key = if subject.owns_address(&event.signer_address) {
            subject.id_key.clone()
        } else if let Some(key) = resolved.get(&event.signer_address) {
            key.clone()
        } else {
            // Unattributable signer: skip rather than invent a counterparty
            debug!(
                signer = %event.signer_address,
                position = event.log_position,
                "skipping event with unresolved signer"
            );
            continue;
        };

        let requestor_is_subject = requestor_key == subject.id_key;
        let target_is_subject = event.target_id_key == subject.id_key;

        let counterparty_key = if !requestor_is_subject && target_is_subject {
            requestor_key
        } else if requestor_is_subject && !target_is_subject {
            event.target_id_key.clone()
        } else {
            // Self-referencing, or not about the subject at all
            debug!(
                position = event.log_position,
                target = %event.target_id_key,
                "skipping event that does not pair the subject with another party"
            );
            continue;
        };

        let state = states.entry(counterparty_key).or_default();
        apply(state, event, requestor_is_subject);
    }

    classify(states)
}

/// Apply a single event to one counterparty's state
fn apply(state: &mut RelationshipState, event: &FriendEvent, requestor_is_subject: bool) {
    match event.kind {
        EventKind::Unfriend => {
            // Retraction wipes both directions regardless of which side sent it
            state.retracted = true;
            state.from_subject = false;
            state.from_counterparty = false;
        }
        EventKind::Friend => {
            state.retracted = false;
            if requestor_is_subject {
                state.from_subject = true;
                state.subject_exchange_key = event.exchange_key.clone();
            } else {
                state.from_counterparty = true;
                state.counterparty_exchange_key = event.exchange_key.clone();
            }
        }
    }
}

/// Classify final per-counterparty states into the three buckets
fn classify(states: BTreeMap<String, RelationshipState>) -> ReconciliationResult {
    let mut result = ReconciliationResult::default();

    for (counterparty_key, state) in states {
        // Retracted relationships, and ones only ever touched by
        // retractions, are dead and excluded entirely
        if state.retracted {
            continue;
        }

        match (state.from_subject, state.from_counterparty) {
            (true, true) => result.mutual.push(MutualFriend {
                counterparty_key,
                subject_exchange_key: state.subject_exchange_key,
                counterparty_exchange_key: state.counterparty_exchange_key,
            }),
            (true, false) => result.outgoing.push(counterparty_key),
            (false, true) => result.incoming.push(counterparty_key),
            (false, false) => {}
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject() -> Identity {
        Identity {
            id_key: "idkey-subject".to_string(),
            root_address: "1SubjRoot".to_string(),
            current_address: "1SubjCurrent".to_string(),
            addresses: vec!["1SubjOld".to_string()],
            valid: true,
            profile: serde_json::Value::Null,
        }
    }

    fn resolved() -> HashMap<String, String> {
        HashMap::from([
            ("1BobAddr".to_string(), "idkey-bob".to_string()),
            ("1CarolAddr".to_string(), "idkey-carol".to_string()),
        ])
    }

    fn friend(pos: u64, seq: u64, signer: &str, target: &str, key: Option<&str>) -> FriendEvent {
        FriendEvent {
            kind: EventKind::Friend,
            log_position: pos,
            seq,
            signer_address: signer.to_string(),
            target_id_key: target.to_string(),
            exchange_key: key.map(str::to_string),
            timestamp: None,
        }
    }

    fn unfriend(pos: u64, seq: u64, signer: &str, target: &str) -> FriendEvent {
        FriendEvent {
            kind: EventKind::Unfriend,
            log_position: pos,
            seq,
            signer_address: signer.to_string(),
            target_id_key: target.to_string(),
            exchange_key: None,
            timestamp: None,
        }
    }

    #[test]
    fn both_sides_asserting_is_mutual() {
        let events = vec![
            friend(1, 0, "1SubjCurrent", "idkey-bob", Some("02subj")),
            friend(2, 1, "1BobAddr", "idkey-subject", Some("02bob")),
        ];

        let result = reduce(&subject(), &events, &resolved());

        assert_eq!(
            result.mutual,
            vec![MutualFriend {
                counterparty_key: "idkey-bob".to_string(),
                subject_exchange_key: Some("02subj".to_string()),
                counterparty_exchange_key: Some("02bob".to_string()),
            }]
        );
        assert!(result.incoming.is_empty());
        assert!(result.outgoing.is_empty());
    }

    #[test]
    fn unanswered_assertion_is_outgoing() {
        let events = vec![friend(1, 0, "1SubjCurrent", "idkey-bob", None)];

        let result = reduce(&subject(), &events, &resolved());

        assert_eq!(result.outgoing, vec!["idkey-bob".to_string()]);
        assert!(result.mutual.is_empty());
        assert!(result.incoming.is_empty());
    }

    #[test]
    fn counterparty_assertion_is_incoming() {
        let events = vec![friend(5, 0, "1BobAddr", "idkey-subject", Some("02bob"))];

        let result = reduce(&subject(), &events, &resolved());

        assert_eq!(result.incoming, vec!["idkey-bob".to_string()]);
        assert!(result.outgoing.is_empty());
    }

    #[test]
    fn refriend_after_retraction_restores_only_the_sender() {
        // Mutual, subject retracts, subject re-friends. Bob's earlier
        // assertion was wiped by the retraction and never resent.
        let events = vec![
            friend(1, 0, "1SubjCurrent", "idkey-bob", None),
            friend(2, 1, "1BobAddr", "idkey-subject", None),
            unfriend(3, 2, "1SubjCurrent", "idkey-bob"),
            friend(4, 3, "1SubjCurrent", "idkey-bob", None),
        ];

        let result = reduce(&subject(), &events, &resolved());

        assert_eq!(result.outgoing, vec!["idkey-bob".to_string()]);
        assert!(result.mutual.is_empty());
        assert!(result.incoming.is_empty());
    }

    #[test]
    fn retraction_dominates_regardless_of_which_side_sent_it() {
        let events = vec![
            friend(1, 0, "1SubjCurrent", "idkey-bob", None),
            friend(2, 1, "1BobAddr", "idkey-subject", None),
            unfriend(3, 2, "1BobAddr", "idkey-subject"),
        ];

        let result = reduce(&subject(), &events, &resolved());

        assert_eq!(result, ReconciliationResult::default());
    }

    #[test]
    fn retraction_only_history_is_excluded() {
        let events = vec![unfriend(1, 0, "1BobAddr", "idkey-subject")];

        let result = reduce(&subject(), &events, &resolved());

        assert_eq!(result, ReconciliationResult::default());
    }

    #[test]
    fn unresolved_signer_creates_no_phantom_counterparty() {
        let events = vec![
            friend(1, 0, "1SubjCurrent", "idkey-bob", None),
            friend(2, 1, "1UnknownAddr", "idkey-subject", None),
        ];

        let result = reduce(&subject(), &events, &resolved());

        assert_eq!(result.outgoing, vec!["idkey-bob".to_string()]);
        assert!(result.incoming.is_empty());
    }

    #[test]
    fn event_not_referencing_subject_is_skipped() {
        // Bob friending Carol is not about the subject
        let events = vec![friend(1, 0, "1BobAddr", "idkey-carol", None)];

        let result = reduce(&subject(), &events, &resolved());

        assert_eq!(result, ReconciliationResult::default());
    }

    #[test]
    fn self_referencing_event_is_skipped() {
        let events = vec![friend(1, 0, "1SubjCurrent", "idkey-subject", None)];

        let result = reduce(&subject(), &events, &resolved());

        assert_eq!(result, ReconciliationResult::default());
    }

    #[test]
    fn order_is_taken_from_log_position_not_input_order() {
        // Retraction carries the highest position even though it arrives first
        let events = vec![
            unfriend(9, 0, "1SubjCurrent", "idkey-bob"),
            friend(1, 1, "1SubjCurrent", "idkey-bob", None),
            friend(2, 2, "1BobAddr", "idkey-subject", None),
        ];

        let result = reduce(&subject(), &events, &resolved());

        assert_eq!(result, ReconciliationResult::default());
    }

    #[test]
    fn equal_positions_fall_back_to_collection_sequence() {
        let events = vec![
            unfriend(5, 0, "1SubjCurrent", "idkey-bob"),
            friend(5, 1, "1SubjCurrent", "idkey-bob", None),
        ];

        let result = reduce(&subject(), &events, &resolved());

        // seq 1 applies after seq 0, so the friend survives
        assert_eq!(result.outgoing, vec!["idkey-bob".to_string()]);
    }

    #[test]
    fn replay_is_idempotent_under_permutation() {
        let events = vec![
            friend(1, 0, "1SubjCurrent", "idkey-bob", Some("02subj")),
            friend(2, 1, "1BobAddr", "idkey-subject", Some("02bob")),
            friend(3, 2, "1CarolAddr", "idkey-subject", None),
            unfriend(4, 3, "1SubjCurrent", "idkey-carol"),
        ];

        let baseline = reduce(&subject(), &events, &resolved());

        let mut shuffled = events.clone();
        shuffled.reverse();
        assert_eq!(reduce(&subject(), &shuffled, &resolved()), baseline);

        let mut rotated = events.clone();
        rotated.rotate_left(2);
        assert_eq!(reduce(&subject(), &rotated, &resolved()), baseline);
    }

    #[test]
    fn buckets_are_emitted_in_counterparty_key_order() {
        let resolved = HashMap::from([
            ("1BobAddr".to_string(), "idkey-bob".to_string()),
            ("1CarolAddr".to_string(), "idkey-carol".to_string()),
            ("1AbeAddr".to_string(), "idkey-abe".to_string()),
        ]);
        let events = vec![
            friend(1, 0, "1CarolAddr", "idkey-subject", None),
            friend(2, 1, "1BobAddr", "idkey-subject", None),
            friend(3, 2, "1AbeAddr", "idkey-subject", None),
        ];

        let result = reduce(&subject(), &events, &resolved);

        assert_eq!(
            result.incoming,
            vec![
                "idkey-abe".to_string(),
                "idkey-bob".to_string(),
                "idkey-carol".to_string()
            ]
        );
    }

    #[test]
    fn latest_friend_event_overwrites_exchange_key() {
        let events = vec![
            friend(1, 0, "1SubjCurrent", "idkey-bob", Some("02old")),
            friend(2, 1, "1BobAddr", "idkey-subject", Some("02bob")),
            friend(3, 2, "1SubjCurrent", "idkey-bob", Some("02new")),
        ];

        let result = reduce(&subject(), &events, &resolved());

        assert_eq!(
            result.mutual[0].subject_exchange_key,
            Some("02new".to_string())
        );
    }

    #[test]
    fn subject_historical_address_attributes_to_subject() {
        let events = vec![friend(1, 0, "1SubjOld", "idkey-bob", None)];

        let result = reduce(&subject(), &events, &resolved());

        assert_eq!(result.outgoing, vec!["idkey-bob".to_string()]);
    }
}
