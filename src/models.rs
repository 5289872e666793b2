use chrono::{DateTime, Utc};
use serde::Serialize;

/// A short-link record from the `links` table.
///
/// Records are append-only: once created they are never updated or deleted,
/// and short_id <-> original_url is a bijection.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Link {
    pub short_id: String,
    pub original_url: String,
    pub created_at: DateTime<Utc>,
}
