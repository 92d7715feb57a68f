use std::path::Path;

use thiserror::Error;
use tokio::fs;
use tracing::debug;

use super::error::StoreError;
use super::sidecar::{Sidecar, sidecar_id};

/// Why a directory entry was left out of a scan.
#[derive(Debug, Error)]
pub enum SkipReason {
    #[error("sidecar unreadable: {0}")]
    Unreadable(#[source] std::io::Error),
    #[error("sidecar malformed: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("sidecar has no blob")]
    OrphanSidecar,
}

/// A successfully parsed sidecar and the record id it belongs to.
#[derive(Debug)]
pub(crate) struct ScanEntry {
    pub id: String,
    pub sidecar: Sidecar,
}

/// Lazy walk over the sidecars in a storage directory.
///
/// Entries that are not sidecars are ignored, and sidecars that cannot be
/// read or parsed are skipped. Only failure to list the directory itself is
/// an error.
pub(crate) struct SidecarScan {
    entries: fs::ReadDir,
    skipped: usize,
}

impl SidecarScan {
    pub async fn start(dir: &Path) -> Result<Self, StoreError> {
        let entries = fs::read_dir(dir)
            .await
            .map_err(StoreError::StoreUnavailable)?;
        Ok(Self {
            entries,
            skipped: 0,
        })
    }

    /// Next parsed sidecar in enumeration order.
    pub async fn next(&mut self) -> Result<Option<ScanEntry>, StoreError> {
        while let Some(entry) = self
            .entries
            .next_entry()
            .await
            .map_err(StoreError::StoreUnavailable)?
        {
            let file_name = entry.file_name();
            let Some(id) = file_name.to_str().and_then(sidecar_id) else {
                continue;
            };

            match read_sidecar(&entry.path()).await {
                Ok(sidecar) => {
                    return Ok(Some(ScanEntry {
                        id: id.to_string(),
                        sidecar,
                    }));
                }
                Err(reason) => self.skip(id, reason),
            }
        }

        Ok(None)
    }

    /// Record an entry the caller decided to leave out.
    pub fn skip(&mut self, id: &str, reason: SkipReason) {
        debug!(id = %id, reason = %reason, "Skipping storage entry");
        self.skipped += 1;
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

async fn read_sidecar(path: &Path) -> Result<Sidecar, SkipReason> {
    let raw = fs::read(path).await.map_err(SkipReason::Unreadable)?;
    serde_json::from_slice(&raw).map_err(SkipReason::Malformed)
}
