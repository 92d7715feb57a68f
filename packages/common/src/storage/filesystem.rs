use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::{debug, info, warn};

use super::error::StoreError;
use super::key::BlobKey;
use super::locks::KeyLocks;
use super::scan::{SidecarScan, SkipReason};
use super::sidecar::{BlobAttributes, Sidecar, sidecar_file_name};
use super::traits::{BlobRecord, KeyedBlobStore, PutReceipt, ReconcileReport};
use crate::config::StorageConfig;

/// Staging directory for in-flight writes, relative to the base path.
const TMP_DIR: &str = ".tmp";

/// Filesystem-backed keyed blob store.
///
/// Each record is a pair of files in `base_path`: the raw blob named `{id}`
/// and its JSON sidecar `{id}.json`. The sidecars are the only index; every
/// operation rescans them. Operations on the same key are serialized
/// in-process through [`KeyLocks`].
pub struct FilesystemKeyedStore {
    base_path: PathBuf,
    max_size: u64,
    locks: KeyLocks,
}

impl FilesystemKeyedStore {
    /// Open a store rooted at `base_path`, creating it if needed and
    /// clearing writes abandoned by a previous process.
    pub async fn new(base_path: PathBuf, max_size: u64) -> Result<Self, StoreError> {
        fs::create_dir_all(base_path.join(TMP_DIR))
            .await
            .map_err(StoreError::StoreUnavailable)?;

        let store = Self {
            base_path,
            max_size,
            locks: KeyLocks::new(),
        };
        store.clear_staging().await?;
        Ok(store)
    }

    pub async fn from_config(config: &StorageConfig) -> Result<Self, StoreError> {
        Self::new(config.directory.clone(), config.max_blob_size).await
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn blob_path(&self, id: &str) -> PathBuf {
        self.base_path.join(id)
    }

    fn sidecar_path(&self, id: &str) -> PathBuf {
        self.base_path.join(sidecar_file_name(id))
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(TMP_DIR)
            .join(uuid::Uuid::new_v4().to_string())
    }

    async fn clear_staging(&self) -> Result<(), StoreError> {
        let mut entries = fs::read_dir(self.base_path.join(TMP_DIR))
            .await
            .map_err(StoreError::StoreUnavailable)?;

        let mut cleared = 0usize;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(StoreError::StoreUnavailable)?
        {
            let path = entry.path();
            match fs::remove_file(&path).await {
                Ok(()) => cleared += 1,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to clear staging file");
                }
            }
        }

        if cleared > 0 {
            info!(cleared, "Cleared abandoned staging files");
        }
        Ok(())
    }

    /// Ids of every record whose sidecar carries `key`, in enumeration order.
    async fn matching_ids(&self, key: &BlobKey) -> Result<Vec<String>, StoreError> {
        let mut scan = SidecarScan::start(&self.base_path).await?;
        let mut ids = Vec::new();
        while let Some(entry) = scan.next().await? {
            if entry.sidecar.key == *key {
                ids.push(entry.id);
            }
        }
        Ok(ids)
    }

    async fn stage(&self, data: &[u8]) -> Result<PathBuf, StoreError> {
        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(StoreError::WriteFailed(e));
        }
        Ok(temp_path)
    }

    /// Persist a record. The sidecar is moved into place last, so scans
    /// never see a sidecar whose blob is still missing.
    async fn write_record(&self, id: &str, data: &[u8], sidecar: &Sidecar) -> Result<(), StoreError> {
        let json = serde_json::to_vec(sidecar)
            .map_err(|e| StoreError::WriteFailed(std::io::Error::other(e)))?;

        let blob_temp = self.stage(data).await?;
        let sidecar_temp = match self.stage(&json).await {
            Ok(path) => path,
            Err(e) => {
                let _ = fs::remove_file(&blob_temp).await;
                return Err(e);
            }
        };

        let blob_path = self.blob_path(id);
        if let Err(e) = fs::rename(&blob_temp, &blob_path).await {
            let _ = fs::remove_file(&blob_temp).await;
            let _ = fs::remove_file(&sidecar_temp).await;
            return Err(StoreError::WriteFailed(e));
        }

        if let Err(e) = fs::rename(&sidecar_temp, self.sidecar_path(id)).await {
            let _ = fs::remove_file(&sidecar_temp).await;
            let _ = fs::remove_file(&blob_path).await;
            return Err(StoreError::WriteFailed(e));
        }

        Ok(())
    }

    /// Best-effort removal of a record's files. Returns `false` if anything
    /// other than an already-missing file got in the way.
    async fn remove_record(&self, id: &str) -> bool {
        let mut removed = true;
        for path in [self.sidecar_path(id), self.blob_path(id)] {
            match fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(id = %id, path = %path.display(), error = %e, "Failed to delete superseded file");
                    removed = false;
                }
            }
        }
        removed
    }
}

#[async_trait]
impl KeyedBlobStore for FilesystemKeyedStore {
    async fn put(
        &self,
        key: &BlobKey,
        data: &[u8],
        attributes: BlobAttributes,
    ) -> Result<PutReceipt, StoreError> {
        let size = data.len() as u64;
        if size > self.max_size {
            return Err(StoreError::TooLarge {
                actual: size,
                limit: self.max_size,
            });
        }

        let _guard = self.locks.lock(key).await;

        let id = uuid::Uuid::now_v7().to_string();
        let replaced = self.matching_ids(key).await?;

        let blob_path = self.blob_path(&id);
        let sidecar = Sidecar {
            original_name: attributes.original_name,
            encoding: attributes.encoding,
            mime_type: attributes.mime_type,
            destination: format!("{}/", self.base_path.display()),
            filename: id.clone(),
            path: blob_path.display().to_string(),
            size,
            key: key.clone(),
            uploaded_at: Some(Utc::now()),
        };

        self.write_record(&id, data, &sidecar).await?;

        for old_id in &replaced {
            self.remove_record(old_id).await;
        }

        info!(id = %id, key = %key, size, replaced = replaced.len(), "Stored picture");
        Ok(PutReceipt { id, replaced })
    }

    async fn get(&self, key: &BlobKey) -> Result<BlobRecord, StoreError> {
        let _guard = self.locks.lock(key).await;

        let mut scan = SidecarScan::start(&self.base_path).await?;
        while let Some(entry) = scan.next().await? {
            if entry.sidecar.key != *key {
                continue;
            }

            match fs::read(self.blob_path(&entry.id)).await {
                Ok(bytes) => {
                    debug!(id = %entry.id, key = %key, "Found picture");
                    return Ok(BlobRecord {
                        id: entry.id,
                        sidecar: entry.sidecar,
                        bytes,
                    });
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    scan.skip(&entry.id, SkipReason::OrphanSidecar);
                }
                Err(e) => return Err(StoreError::StoreUnavailable(e)),
            }
        }

        Err(StoreError::NotFound {
            travel_id: key.travel_id.clone(),
            bicycle_id: key.bicycle_id.clone(),
        })
    }

    async fn reconcile(&self) -> Result<ReconcileReport, StoreError> {
        let mut report = ReconcileReport::default();
        let mut groups: HashMap<BlobKey, Vec<(Option<DateTime<Utc>>, String)>> = HashMap::new();
        let mut orphans: Vec<(BlobKey, String)> = Vec::new();

        let mut scan = SidecarScan::start(&self.base_path).await?;
        while let Some(entry) = scan.next().await? {
            report.scanned += 1;

            // Only records that `get` could serve compete for the slot.
            let has_blob = fs::try_exists(self.blob_path(&entry.id))
                .await
                .map_err(StoreError::StoreUnavailable)?;
            if !has_blob {
                scan.skip(&entry.id, SkipReason::OrphanSidecar);
                orphans.push((entry.sidecar.key, entry.id));
                continue;
            }

            groups
                .entry(entry.sidecar.key)
                .or_default()
                .push((entry.sidecar.uploaded_at, entry.id));
        }
        report.skipped = scan.skipped();
        report.kept = groups.len();

        for (key, id) in &orphans {
            let _guard = self.locks.lock(key).await;
            if self.remove_record(id).await {
                report.removed += 1;
                debug!(id = %id, key = %key, "Removed orphan sidecar");
            }
        }

        for (key, mut records) in groups {
            if records.len() < 2 {
                continue;
            }

            // Newest last: by upload time, then by time-ordered id.
            records.sort();
            records.pop();

            let _guard = self.locks.lock(&key).await;
            let mut removed = 0usize;
            for (_, id) in &records {
                if self.remove_record(id).await {
                    removed += 1;
                }
            }
            report.removed += removed;
            warn!(key = %key, removed, failed = records.len() - removed, "Collapsed duplicate records");
        }

        Ok(report)
    }
}
