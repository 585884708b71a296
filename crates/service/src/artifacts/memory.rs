//! Artifacts kept in an expiring in-process map.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;

use super::{ArtifactError, ArtifactStore, FileId};

const ALLOCATE_ATTEMPTS: usize = 4;

/// In-memory store backed by a `moka` cache with a time-to-live.
///
/// Entries leave only by redemption or expiry. Once `max_entries` are
/// waiting, `put` fails with [`ArtifactError::Full`] instead of evicting.
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use service::artifacts::{ArtifactStore, MemoryArtifactStore};
/// let store = MemoryArtifactStore::new(Duration::from_secs(60), 16);
/// let id = tokio_test::block_on(store.put(b"xlsx".to_vec())).unwrap();
/// assert_eq!(tokio_test::block_on(store.take_once(&id)).unwrap(), b"xlsx");
/// assert!(tokio_test::block_on(store.take_once(&id)).is_err());
/// ```
#[derive(Clone)]
pub struct MemoryArtifactStore {
    cache: Cache<String, Arc<Vec<u8>>>,
    max_entries: u64,
}

impl MemoryArtifactStore {
    pub fn new(ttl: Duration, max_entries: u64) -> Self {
        let cache = Cache::builder().time_to_live(ttl).build();
        Self { cache, max_entries }
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn put(&self, bytes: Vec<u8>) -> Result<FileId, ArtifactError> {
        // flush pending writes and expiries so the count is exact
        self.cache.run_pending_tasks().await;
        if self.cache.entry_count() >= self.max_entries {
            return Err(ArtifactError::Full);
        }
        let bytes = Arc::new(bytes);
        for _ in 0..ALLOCATE_ATTEMPTS {
            let id = FileId::generate();
            let entry = self.cache.entry(id.as_str().to_string()).or_insert_with(async { Arc::clone(&bytes) }).await;
            if entry.is_fresh() {
                return Ok(id);
            }
        }
        Err(std::io::Error::new(std::io::ErrorKind::AlreadyExists, "could not allocate a free file id").into())
    }

    async fn take_once(&self, id: &FileId) -> Result<Vec<u8>, ArtifactError> {
        // `remove` hands the value to exactly one caller
        let bytes = self.cache.remove(id.as_str()).await.ok_or(ArtifactError::NotFound)?;
        Ok(Arc::try_unwrap(bytes).unwrap_or_else(|shared| shared.as_ref().clone()))
    }

    async fn purge_expired(&self) -> Result<usize, ArtifactError> {
        self.cache.run_pending_tasks().await;
        Ok(0)
    }
}
