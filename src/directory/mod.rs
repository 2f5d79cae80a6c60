//! Identity directory client
//!
//! Remote lookup service mapping a signing address, or an identity key,
//! to identity metadata. Lookups return a status/result envelope; a
//! well-formed envelope with no result means "no identity bound", while
//! transport failures, timeouts, and malformed payloads surface as
//! `KinshipError::Directory` so callers never mistake an outage for a
//! definitive negative.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::identity::Identity;
use crate::types::{KinshipError, Result};

/// Optional block/time context for an address lookup
///
/// The directory uses the hint to disambiguate address reuse across time.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolutionHint {
    pub block: Option<u64>,
    pub timestamp: Option<i64>,
}

/// Remote identity lookup service
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// Resolve a signing address to the identity it is bound to
    async fn resolve_by_address(
        &self,
        address: &str,
        hint: ResolutionHint,
    ) -> Result<Option<Identity>>;

    /// Resolve an identity key directly
    async fn resolve_by_key(&self, id_key: &str) -> Result<Option<Identity>>;
}

/// Status/result envelope returned by the directory
#[derive(Debug, Deserialize)]
struct DirectoryEnvelope {
    status: String,
    #[serde(default)]
    result: Option<Identity>,
}

/// HTTP implementation of [`IdentityDirectory`]
pub struct HttpDirectory {
    base_url: String,
    client: reqwest::Client,
}

impl HttpDirectory {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("kinship/0.1")
            .build()
            .unwrap_or_default();

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    fn unwrap_envelope(&self, envelope: DirectoryEnvelope, subject: &str) -> Result<Option<Identity>> {
        match envelope.status.as_str() {
            "OK" => Ok(envelope.result),
            other => Err(KinshipError::Directory(format!(
                "directory returned status {other} for {subject}"
            ))),
        }
    }
}

#[async_trait]
impl IdentityDirectory for HttpDirectory {
    async fn resolve_by_address(
        &self,
        address: &str,
        hint: ResolutionHint,
    ) -> Result<Option<Identity>> {
        let url = format!("{}/identity/valid-by-address", self.base_url);
        debug!(address = %address, block = ?hint.block, "resolving address via directory");

        let body = serde_json::json!({
            "address": address,
            "block": hint.block,
            "timestamp": hint.timestamp,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| KinshipError::Directory(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(KinshipError::Directory(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let envelope: DirectoryEnvelope = response
            .json()
            .await
            .map_err(|e| KinshipError::Directory(e.to_string()))?;

        self.unwrap_envelope(envelope, address)
    }

    async fn resolve_by_key(&self, id_key: &str) -> Result<Option<Identity>> {
        let url = format!("{}/identity/{}", self.base_url, id_key);
        debug!(id_key = %id_key, "resolving identity key via directory");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| KinshipError::Directory(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(KinshipError::Directory(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let envelope: DirectoryEnvelope = response
            .json()
            .await
            .map_err(|e| KinshipError::Directory(e.to_string()))?;

        self.unwrap_envelope(envelope, id_key)
    }
}
