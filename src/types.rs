//! Error types shared across the crate

/// Errors surfaced by kinship services
#[derive(Debug, thiserror::Error)]
pub enum KinshipError {
    /// The subject identity could not be resolved at all.
    ///
    /// Distinct from "resolved but has no relationships", which yields an
    /// empty result. Callers map this to a 404-equivalent.
    #[error("identity not found: {0}")]
    IdentityNotFound(String),

    /// The remote identity directory failed or timed out.
    ///
    /// Never fold this into "no identity bound" - a transient outage must
    /// not be cached as a negative resolution.
    #[error("directory error: {0}")]
    Directory(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, KinshipError>;
