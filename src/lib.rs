//! Kinship - relationship reconciliation for on-chain social attestations
//!
//! Indexes social-graph claims recorded as signed entries on a public
//! transaction log and answers one question: given two identities, or one
//! identity and the rest of the network, what is the current relationship?
//!
//! ## Services
//!
//! - **Directory**: HTTP client for the external identity directory
//! - **Cache**: key/value resolution cache (in-memory, swappable)
//! - **Identity**: identity model and cache-first address resolution
//! - **Store**: MongoDB accessor over friend/unfriend record collections
//! - **Reconcile**: deterministic event fold into classified relationships
//! - **Service**: per-request orchestration with bounded concurrent fan-out

pub mod cache;
pub mod config;
pub mod db;
pub mod directory;
pub mod identity;
pub mod reconcile;
pub mod service;
pub mod store;
pub mod types;

pub use config::Args;
pub use service::FriendshipQueryService;
pub use types::{KinshipError, Result};
