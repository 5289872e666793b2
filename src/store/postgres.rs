use async_trait::async_trait;
use sqlx::PgPool;

use super::{DuplicateKey, LinkStore, StoreError};
use crate::models::Link;

/// SQLSTATE for unique_violation.
const UNIQUE_VIOLATION: &str = "23505";

/// SQLSTATEs a concurrently starting worker can produce while both run the
/// idempotent schema statement: duplicate_table, duplicate_object, and the
/// catalog-level unique_violation Postgres raises when two CREATEs race.
const BENIGN_SCHEMA_RACES: &[&str] = &["42P07", "42710", "23505"];

const SCHEMA_SQL: &str = "\
CREATE TABLE IF NOT EXISTS links (
    short_id     TEXT PRIMARY KEY,
    original_url TEXT NOT NULL,
    created_at   TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT links_original_url_key UNIQUE (original_url)
)";

/// Postgres-backed store. All uniqueness guarantees live in the table
/// constraints; this type only translates constraint violations into the
/// [`StoreError::Duplicate`] kinds the registry acts on.
pub struct PgLinkStore {
    pool: PgPool,
}

impl PgLinkStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `links` table if it doesn't exist yet.
    ///
    /// Safe to run from every worker at startup: an already-exists error from
    /// a concurrent worker's CREATE means setup is done and is treated as
    /// success.
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        match sqlx::query(SCHEMA_SQL).execute(&self.pool).await {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(ref db))
                if db
                    .code()
                    .is_some_and(|code| BENIGN_SCHEMA_RACES.contains(&code.as_ref())) =>
            {
                tracing::debug!("Schema already created by a concurrent worker");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// Map a unique-constraint violation to the key that caused it; anything else
/// passes through as a database error.
fn classify(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db) = err {
        if db.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return match db.constraint() {
                Some("links_original_url_key") => StoreError::Duplicate(DuplicateKey::OriginalUrl),
                _ => StoreError::Duplicate(DuplicateKey::ShortId),
            };
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl LinkStore for PgLinkStore {
    async fn insert(&self, short_id: &str, original_url: &str) -> Result<Link, StoreError> {
        let link: Link = sqlx::query_as(
            "INSERT INTO links (short_id, original_url) VALUES ($1, $2)
             RETURNING short_id, original_url, created_at",
        )
        .bind(short_id)
        .bind(original_url)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)?;

        Ok(link)
    }

    async fn find_by_id(&self, short_id: &str) -> Result<Option<Link>, StoreError> {
        let link: Option<Link> = sqlx::query_as(
            "SELECT short_id, original_url, created_at FROM links WHERE short_id = $1",
        )
        .bind(short_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(link)
    }

    async fn find_by_url(&self, original_url: &str) -> Result<Option<Link>, StoreError> {
        let link: Option<Link> = sqlx::query_as(
            "SELECT short_id, original_url, created_at FROM links WHERE original_url = $1",
        )
        .bind(original_url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(link)
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<Link>, StoreError> {
        let links: Vec<Link> = sqlx::query_as(
            "SELECT short_id, original_url, created_at FROM links
             ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(links)
    }
}
