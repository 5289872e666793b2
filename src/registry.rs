use std::sync::Arc;

use rand::Rng;

use crate::models::Link;
use crate::store::{DuplicateKey, LinkStore, StoreError};

const SHORT_ID_LEN: usize = 6;
const ID_ALPHABET: &[u8] = b"0123456789abcdef";

/// Generate a random lowercase-hex short id.
fn random_short_id() -> String {
    let mut rng = rand::thread_rng();
    (0..SHORT_ID_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

/// Owns the short_id <-> original_url mapping.
///
/// The registry does not lock around creation. Correctness under concurrent
/// callers rests on the store's uniqueness enforcement: the pre-insert check
/// is only a fast path, and a uniqueness violation on insert is the signal to
/// either retry with a fresh id or return the concurrent winner's record.
#[derive(Clone)]
pub struct Registry {
    store: Arc<dyn LinkStore>,
}

impl Registry {
    pub fn new(store: Arc<dyn LinkStore>) -> Self {
        Self { store }
    }

    /// Return the existing record for `original_url`, or allocate and persist
    /// a new one. Every call with the same URL yields the same short id, from
    /// any caller at any time.
    ///
    /// The caller is expected to have rejected empty input already; the
    /// registry stores arbitrary non-empty strings without validating them.
    pub async fn get_or_create(&self, original_url: &str) -> Result<Link, StoreError> {
        if let Some(existing) = self.store.find_by_url(original_url).await? {
            return Ok(existing);
        }

        loop {
            let candidate = random_short_id();
            match self.store.insert(&candidate, original_url).await {
                Ok(link) => return Ok(link),
                Err(StoreError::Duplicate(DuplicateKey::ShortId)) => {
                    tracing::debug!("Short id '{}' already taken, drawing another", candidate);
                }
                Err(StoreError::Duplicate(DuplicateKey::OriginalUrl)) => {
                    // A concurrent caller inserted this URL first; its record
                    // is the answer. Records are append-only, so if the read
                    // misses the winner we just go around again.
                    if let Some(winner) = self.store.find_by_url(original_url).await? {
                        return Ok(winner);
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Pure lookup. `None` is the normal outcome for an unknown id.
    pub async fn resolve(&self, short_id: &str) -> Result<Option<Link>, StoreError> {
        self.store.find_by_id(short_id).await
    }

    /// Most recently created records, newest first. Diagnostic use only.
    pub async fn list_recent(&self, limit: i64) -> Result<Vec<Link>, StoreError> {
        self.store.list_recent(limit).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::store::MemoryLinkStore;

    fn registry() -> (Registry, Arc<MemoryLinkStore>) {
        let store = Arc::new(MemoryLinkStore::new());
        (Registry::new(store.clone()), store)
    }

    fn assert_short_id_shape(id: &str) {
        assert_eq!(id.len(), 6, "short id should be 6 characters: {id:?}");
        assert!(
            id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()),
            "short id should be lowercase hex: {id:?}"
        );
    }

    #[tokio::test]
    async fn create_then_resolve_round_trips() {
        let (registry, _) = registry();

        let link = registry
            .get_or_create("https://example.com/docs")
            .await
            .unwrap();
        assert_short_id_shape(&link.short_id);

        let resolved = registry.resolve(&link.short_id).await.unwrap().unwrap();
        assert_eq!(resolved.original_url, "https://example.com/docs");

        // Never-allocated id is a normal miss, not an error.
        assert!(registry.resolve("000000").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn get_or_create_is_idempotent() {
        let (registry, store) = registry();

        let first = registry.get_or_create("https://example.com").await.unwrap();
        let second = registry.get_or_create("https://example.com").await.unwrap();

        assert_eq!(first.short_id, second.short_id);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn distinct_urls_get_distinct_ids() {
        let (registry, _) = registry();

        let a = registry.get_or_create("https://example.com/a").await.unwrap();
        let b = registry.get_or_create("https://example.com/b").await.unwrap();

        assert_ne!(a.short_id, b.short_id);
        assert_eq!(a.original_url, "https://example.com/a");
        assert_eq!(b.original_url, "https://example.com/b");
    }

    #[tokio::test]
    async fn concurrent_creates_converge_on_one_record() {
        let (registry, store) = registry();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry
                    .get_or_create("https://example.com/contended")
                    .await
                    .unwrap()
                    .short_id
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }

        ids.dedup();
        assert_eq!(ids.len(), 1, "all callers should see the same short id");
        assert_eq!(store.len().await, 1);
    }

    /// Wraps a store so the first `find_by_url` misses even though a winner
    /// record exists, reproducing the window where a concurrent caller commits
    /// between the registry's pre-check and its insert.
    struct LateWinnerStore {
        inner: MemoryLinkStore,
        misses: AtomicUsize,
    }

    #[async_trait]
    impl LinkStore for LateWinnerStore {
        async fn insert(&self, short_id: &str, original_url: &str) -> Result<Link, StoreError> {
            self.inner.insert(short_id, original_url).await
        }

        async fn find_by_id(&self, short_id: &str) -> Result<Option<Link>, StoreError> {
            self.inner.find_by_id(short_id).await
        }

        async fn find_by_url(&self, original_url: &str) -> Result<Option<Link>, StoreError> {
            if self.misses.load(Ordering::SeqCst) > 0 {
                self.misses.fetch_sub(1, Ordering::SeqCst);
                return Ok(None);
            }
            self.inner.find_by_url(original_url).await
        }

        async fn list_recent(&self, limit: i64) -> Result<Vec<Link>, StoreError> {
            self.inner.list_recent(limit).await
        }
    }

    #[tokio::test]
    async fn lost_insert_race_returns_the_winner() {
        let inner = MemoryLinkStore::new();
        let winner = inner.insert("cafe42", "https://example.com").await.unwrap();

        let store = Arc::new(LateWinnerStore {
            inner,
            misses: AtomicUsize::new(1),
        });
        let registry = Registry::new(store.clone());

        // Pre-check misses, insert hits the URL constraint, re-read returns
        // the winner; no error and no second record.
        let link = registry.get_or_create("https://example.com").await.unwrap();
        assert_eq!(link.short_id, winner.short_id);
        assert_eq!(store.list_recent(10).await.unwrap().len(), 1);
    }

    /// Reports a short-id collision for the first N insert attempts.
    struct CollidingStore {
        inner: MemoryLinkStore,
        collisions: AtomicUsize,
    }

    #[async_trait]
    impl LinkStore for CollidingStore {
        async fn insert(&self, short_id: &str, original_url: &str) -> Result<Link, StoreError> {
            if self.collisions.load(Ordering::SeqCst) > 0 {
                self.collisions.fetch_sub(1, Ordering::SeqCst);
                return Err(StoreError::Duplicate(DuplicateKey::ShortId));
            }
            self.inner.insert(short_id, original_url).await
        }

        async fn find_by_id(&self, short_id: &str) -> Result<Option<Link>, StoreError> {
            self.inner.find_by_id(short_id).await
        }

        async fn find_by_url(&self, original_url: &str) -> Result<Option<Link>, StoreError> {
            self.inner.find_by_url(original_url).await
        }

        async fn list_recent(&self, limit: i64) -> Result<Vec<Link>, StoreError> {
            self.inner.list_recent(limit).await
        }
    }

    #[tokio::test]
    async fn id_collisions_retry_with_fresh_candidates() {
        let store = Arc::new(CollidingStore {
            inner: MemoryLinkStore::new(),
            collisions: AtomicUsize::new(3),
        });
        let registry = Registry::new(store.clone());

        let link = registry.get_or_create("https://example.com").await.unwrap();
        assert_short_id_shape(&link.short_id);
        assert_eq!(store.list_recent(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn short_ids_are_random_hex() {
        let mut seen = std::collections::HashSet::new();
        for _ in 0..64 {
            let id = random_short_id();
            assert_short_id_shape(&id);
            seen.insert(id);
        }
        // 64 draws from a 16^6 space should essentially never collide.
        assert!(seen.len() > 32);
    }
}
