//! Portable identity model
//!
//! Identities are owned by the external directory; kinship only reads
//! them and caches copies. An identity is bound to a rotating set of
//! signing addresses - the root address it was attested with, the
//! currently active address, and every address it has rotated through.

mod resolver;

pub use resolver::{AddressIdentityResolver, ResolverStats, ResolverStatsSnapshot};

use serde::{Deserialize, Serialize};

/// A resolved portable identity
///
/// Field names follow the directory's JSON wire format.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Stable identity key
    pub id_key: String,

    /// Address the identity was first attested with
    pub root_address: String,

    /// Currently active signing address
    pub current_address: String,

    /// Historical signing addresses (order irrelevant)
    #[serde(default)]
    pub addresses: Vec<String>,

    /// Whether the directory considers the identity valid
    #[serde(default = "default_true")]
    pub valid: bool,

    /// Opaque profile data, passed through untouched
    #[serde(default)]
    pub profile: serde_json::Value,
}

fn default_true() -> bool {
    true
}

impl Identity {
    /// Whether the given address belongs to this identity's address set
    pub fn owns_address(&self, address: &str) -> bool {
        self.root_address == address
            || self.current_address == address
            || self.addresses.iter().any(|a| a == address)
    }

    /// The full address set: root + current + historical, deduplicated
    pub fn all_addresses(&self) -> Vec<String> {
        let mut all = vec![self.root_address.clone(), self.current_address.clone()];
        all.extend(self.addresses.iter().cloned());
        all.sort();
        all.dedup();
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        Identity {
            id_key: "idkey-alice".to_string(),
            root_address: "1RootAlice".to_string(),
            current_address: "1CurrentAlice".to_string(),
            addresses: vec!["1OldAlice".to_string(), "1CurrentAlice".to_string()],
            valid: true,
            profile: serde_json::Value::Null,
        }
    }

    #[test]
    fn owns_root_current_and_historical_addresses() {
        let id = identity();
        assert!(id.owns_address("1RootAlice"));
        assert!(id.owns_address("1CurrentAlice"));
        assert!(id.owns_address("1OldAlice"));
        assert!(!id.owns_address("1Bob"));
    }

    #[test]
    fn all_addresses_deduplicates() {
        let addrs = identity().all_addresses();
        assert_eq!(addrs.len(), 3);
        assert!(addrs.contains(&"1RootAlice".to_string()));
        assert!(addrs.contains(&"1CurrentAlice".to_string()));
        assert!(addrs.contains(&"1OldAlice".to_string()));
    }

    #[test]
    fn deserializes_directory_wire_format() {
        let json = r#"{
            "idKey": "idkey-bob",
            "rootAddress": "1RootBob",
            "currentAddress": "1CurrentBob"
        }"#;
        let id: Identity = serde_json::from_str(json).unwrap();
        assert_eq!(id.id_key, "idkey-bob");
        assert!(id.valid);
        assert!(id.addresses.is_empty());
    }
}
