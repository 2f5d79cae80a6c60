//! Configuration for Kinship
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;

/// Kinship - relationship reconciliation for on-chain social attestations
#[derive(Parser, Debug, Clone)]
#[command(name = "kinship")]
#[command(about = "Reconciles friend/unfriend attestations into current relationship state")]
pub struct Args {
    /// Identity key of the subject to reconcile
    pub subject: String,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "kinship")]
    pub mongodb_db: String,

    /// Base URL of the identity directory service
    #[arg(long, env = "DIRECTORY_URL", default_value = "http://localhost:3000")]
    pub directory_url: String,

    /// Timeout for directory HTTP requests in milliseconds
    #[arg(long, env = "DIRECTORY_TIMEOUT_MS", default_value = "5000")]
    pub directory_timeout_ms: u64,

    /// Maximum concurrent counterparty resolutions per request
    #[arg(long, env = "RESOLVE_CONCURRENCY", default_value = "8")]
    pub resolve_concurrency: usize,

    /// Maximum entries held by the in-memory resolution cache
    #[arg(long, env = "CACHE_MAX_ENTRIES", default_value = "10000")]
    pub cache_max_entries: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Validate configuration before wiring services
    pub fn validate(&self) -> Result<(), String> {
        if self.subject.trim().is_empty() {
            return Err("subject identity key must not be empty".to_string());
        }

        if self.directory_url.trim().is_empty() {
            return Err("DIRECTORY_URL must not be empty".to_string());
        }

        if self.resolve_concurrency == 0 {
            return Err("RESOLVE_CONCURRENCY must be at least 1".to_string());
        }

        if self.cache_max_entries == 0 {
            return Err("CACHE_MAX_ENTRIES must be at least 1".to_string());
        }

        Ok(())
    }
}
