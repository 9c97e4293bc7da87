//! Concord Storage - governance snapshots persisted as JSON files

pub mod error;

pub use error::StorageError;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use concord_governance::{GovernanceDao, GovernanceSnapshot};
use parking_lot::RwLock;

const SNAPSHOT_FILE: &str = "snapshot.json";

/// Directory-backed store holding the latest governance snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
    cache: Arc<RwLock<Option<GovernanceSnapshot>>>,
}

impl SnapshotStore {
    /// Open (or create) a store rooted at `path`, loading any snapshot
    /// already on disk.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if path.to_string_lossy().contains("..") {
            return Err(StorageError::InvalidPath(path.display().to_string()));
        }
        fs::create_dir_all(path)?;

        let file = path.join(SNAPSHOT_FILE);
        let cached = if file.exists() {
            tracing::debug!(path = %file.display(), "Reading snapshot");
            let content = fs::read_to_string(&file)?;
            let snapshot: GovernanceSnapshot = serde_json::from_str(&content)
                .map_err(|e| StorageError::Deserialization(e.to_string()))?;
            tracing::info!(
                path = %file.display(),
                proposals = snapshot.proposals.len(),
                "Snapshot loaded"
            );
            Some(snapshot)
        } else {
            None
        };

        Ok(Self {
            path: path.to_path_buf(),
            cache: Arc::new(RwLock::new(cached)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Latest saved snapshot, if any.
    pub fn load(&self) -> Option<GovernanceSnapshot> {
        self.cache.read().clone()
    }

    /// Write `snapshot` to disk and make it the cached copy.
    ///
    /// Clones share the cache lock; it is held from the temp-file write
    /// until the cache is updated.
    pub fn save(&self, snapshot: &GovernanceSnapshot) -> Result<(), StorageError> {
        let content = serde_json::to_string_pretty(snapshot)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let mut cache = self.cache.write();

        // write to a temp file, then rename into place
        let file = self.path.join(SNAPSHOT_FILE);
        let tmp = self.path.join(format!("{}.tmp", SNAPSHOT_FILE));
        tracing::debug!(path = %tmp.display(), "Writing snapshot");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &file)?;

        *cache = Some(snapshot.clone());
        drop(cache);
        tracing::info!(
            path = %file.display(),
            next_proposal_id = snapshot.next_proposal_id,
            "Snapshot saved"
        );
        Ok(())
    }

    pub fn save_dao(&self, dao: &GovernanceDao) -> Result<(), StorageError> {
        self.save(&dao.snapshot())
    }

    /// Rebuild a DAO from the stored snapshot.
    pub fn load_dao(&self) -> Result<Option<GovernanceDao>, StorageError> {
        match self.load() {
            Some(snapshot) => Ok(Some(GovernanceDao::restore(snapshot)?)),
            None => Ok(None),
        }
    }
}
