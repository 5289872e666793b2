use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{DuplicateKey, LinkStore, StoreError};
use crate::models::Link;

/// In-process store used by the test suite and for running without Postgres.
///
/// A single RwLock guards both indexes and the insertion-ordered record list,
/// so an insert checks and claims both keys atomically. That gives the memory
/// store the same insert-with-uniqueness-enforcement contract as the
/// Postgres constraints.
pub struct MemoryLinkStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    by_id: HashMap<String, usize>,
    by_url: HashMap<String, usize>,
    // Records in creation order; the maps index into it.
    records: Vec<Link>,
}

impl MemoryLinkStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.records.is_empty()
    }
}

impl Default for MemoryLinkStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LinkStore for MemoryLinkStore {
    async fn insert(&self, short_id: &str, original_url: &str) -> Result<Link, StoreError> {
        let mut inner = self.inner.write().await;

        if inner.by_url.contains_key(original_url) {
            return Err(StoreError::Duplicate(DuplicateKey::OriginalUrl));
        }
        if inner.by_id.contains_key(short_id) {
            return Err(StoreError::Duplicate(DuplicateKey::ShortId));
        }

        let link = Link {
            short_id: short_id.to_owned(),
            original_url: original_url.to_owned(),
            created_at: Utc::now(),
        };

        let idx = inner.records.len();
        inner.records.push(link.clone());
        inner.by_id.insert(link.short_id.clone(), idx);
        inner.by_url.insert(link.original_url.clone(), idx);

        Ok(link)
    }

    async fn find_by_id(&self, short_id: &str) -> Result<Option<Link>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_id
            .get(short_id)
            .map(|&idx| inner.records[idx].clone()))
    }

    async fn find_by_url(&self, original_url: &str) -> Result<Option<Link>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_url
            .get(original_url)
            .map(|&idx| inner.records[idx].clone()))
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<Link>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .records
            .iter()
            .rev()
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}
