use async_trait::async_trait;
use thiserror::Error;

use crate::models::Link;

pub mod memory;
pub mod postgres;

pub use memory::MemoryLinkStore;
pub use postgres::PgLinkStore;

/// Which uniqueness guarantee an insert ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateKey {
    ShortId,
    OriginalUrl,
}

impl std::fmt::Display for DuplicateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DuplicateKey::ShortId => f.write_str("short_id"),
            DuplicateKey::OriginalUrl => f.write_str("original_url"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// The insert violated a uniqueness guarantee. The registry recovers from
    /// this locally; it never reaches a caller.
    #[error("duplicate {0}")]
    Duplicate(DuplicateKey),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Storage interface the registry runs against.
///
/// Uniqueness of both `short_id` and `original_url` is enforced here, at the
/// storage boundary, so concurrent creators cannot slip past the registry's
/// pre-insert check. Implementations: [`PgLinkStore`] for production,
/// [`MemoryLinkStore`] for tests and local runs.
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Insert a new record. Fails with [`StoreError::Duplicate`] if either
    /// key already exists.
    async fn insert(&self, short_id: &str, original_url: &str) -> Result<Link, StoreError>;

    /// Forward lookup: short_id -> record.
    async fn find_by_id(&self, short_id: &str) -> Result<Option<Link>, StoreError>;

    /// Reverse lookup: original_url -> record.
    async fn find_by_url(&self, original_url: &str) -> Result<Option<Link>, StoreError>;

    /// Most recently created records, newest first.
    async fn list_recent(&self, limit: i64) -> Result<Vec<Link>, StoreError>;
}
