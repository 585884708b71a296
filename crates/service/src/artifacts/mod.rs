//! One-shot artifact hand-off between the generate and download requests.
//!
//! `put` stores bytes under a fresh handle; `take_once` returns them and
//! destroys the artifact in the same step, so at most one caller ever
//! redeems a handle.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use configs::{ArtifactBackend, ArtifactsConfig};

use crate::credentials;

pub mod dir;
pub mod memory;

pub use dir::DirArtifactStore;
pub use memory::MemoryArtifactStore;

static FILE_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9]+$").expect("static regex"));

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Illegal file_id")]
    IllegalId,
    #[error("File does not exist")]
    NotFound,
    #[error("artifact store is full")]
    Full,
    #[error("artifact io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Opaque handle of a stored artifact. Always `^[a-zA-Z0-9]+$`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FileId(String);

impl FileId {
    /// Validate caller input before it gets anywhere near storage.
    pub fn parse(raw: &str) -> Result<Self, ArtifactError> {
        if FILE_ID_RE.is_match(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(ArtifactError::IllegalId)
        }
    }

    pub(crate) fn generate() -> Self {
        Self(credentials::random_file_id())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store `bytes` and return the handle that redeems them.
    async fn put(&self, bytes: Vec<u8>) -> Result<FileId, ArtifactError>;

    /// Return the artifact and delete it. A second call for the same id fails with `NotFound`.
    async fn take_once(&self, id: &FileId) -> Result<Vec<u8>, ArtifactError>;

    /// Drop artifacts nobody redeemed in time. Returns how many were removed.
    async fn purge_expired(&self) -> Result<usize, ArtifactError> {
        Ok(0)
    }
}

/// Build the store selected in config.
pub fn from_config(cfg: &ArtifactsConfig) -> Arc<dyn ArtifactStore> {
    let ttl = Duration::from_secs(cfg.ttl_secs);
    match cfg.backend {
        ArtifactBackend::Dir => Arc::new(DirArtifactStore::new(cfg.dir.clone(), ttl)),
        ArtifactBackend::Memory => Arc::new(MemoryArtifactStore::new(ttl, cfg.max_entries)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_alphanumeric_ids() {
        assert!(FileId::parse("abc123XYZ").is_ok());
        assert!(FileId::parse(&credentials::random_file_id()).is_ok());
    }

    #[test]
    fn rejects_everything_else() {
        for bad in [
            "",
            "../../etc/passwd",
            "abc/def",
            "abc.xlsx",
            "abc\n",
            "abc def",
            "ab%2e%2e",
            "..",
            "ümlaut",
        ] {
            assert!(matches!(FileId::parse(bad), Err(ArtifactError::IllegalId)), "{bad:?} must be rejected");
        }
    }

    #[test]
    fn config_selects_backend() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = ArtifactsConfig { backend: ArtifactBackend::Dir, dir: tmp.path().to_path_buf(), ..Default::default() };
        let _dir = from_config(&cfg);
        let cfg = ArtifactsConfig { backend: ArtifactBackend::Memory, ..Default::default() };
        let _mem = from_config(&cfg);
    }
}
