//! Artifacts as files in a private directory.
//!
//! Redemption claims the file with `rename`, which is atomic within one
//! filesystem: of two concurrent downloads only one can move the file.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{ArtifactError, ArtifactStore, FileId};

const EXTENSION: &str = "xlsx";
const ALLOCATE_ATTEMPTS: usize = 4;

pub struct DirArtifactStore {
    dir: PathBuf,
    ttl: Duration,
}

impl DirArtifactStore {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self { dir: dir.into(), ttl }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &FileId) -> PathBuf {
        self.dir.join(format!("{id}.{EXTENSION}"))
    }

    fn scratch_path(&self, id: &FileId, kind: &str) -> PathBuf {
        self.dir.join(format!("{id}.{}.{kind}", Uuid::new_v4().simple()))
    }

    fn is_expired(&self, modified: SystemTime) -> bool {
        modified.elapsed().map(|age| age > self.ttl).unwrap_or(false)
    }
}

#[async_trait]
impl ArtifactStore for DirArtifactStore {
    async fn put(&self, bytes: Vec<u8>) -> Result<FileId, ArtifactError> {
        fs::create_dir_all(&self.dir).await?;
        for _ in 0..ALLOCATE_ATTEMPTS {
            let id = FileId::generate();
            let target = self.path_for(&id);
            if fs::try_exists(&target).await? {
                continue;
            }
            // write aside first so a half-written file is never redeemable
            let staging = self.scratch_path(&id, "part");
            fs::write(&staging, &bytes).await?;
            fs::rename(&staging, &target).await?;
            debug!(file_id = %id, size = bytes.len(), "artifact stored");
            return Ok(id);
        }
        Err(io::Error::new(io::ErrorKind::AlreadyExists, "could not allocate a free file id").into())
    }

    async fn take_once(&self, id: &FileId) -> Result<Vec<u8>, ArtifactError> {
        let claim = self.scratch_path(id, "claim");
        match fs::rename(self.path_for(id), &claim).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(ArtifactError::NotFound),
            Err(e) => return Err(e.into()),
        }

        let expired = fs::metadata(&claim)
            .await
            .ok()
            .and_then(|m| m.modified().ok())
            .map(|t| self.is_expired(t))
            .unwrap_or(false);
        let read = if expired { Err(ArtifactError::NotFound) } else { fs::read(&claim).await.map_err(Into::into) };

        if let Err(e) = fs::remove_file(&claim).await {
            warn!(file_id = %id, error = %e, "failed to remove claimed artifact");
        }
        read
    }

    async fn purge_expired(&self) -> Result<usize, ArtifactError> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let meta = match entry.metadata().await {
                Ok(m) if m.is_file() => m,
                _ => continue,
            };
            let stale = meta.modified().map(|t| self.is_expired(t)).unwrap_or(false);
            if !stale {
                continue;
            }
            match fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                // a concurrent download got there first
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %entry.path().display(), error = %e, "failed to purge artifact"),
            }
        }
        Ok(removed)
    }
}
