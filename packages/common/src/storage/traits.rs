use async_trait::async_trait;

use super::error::StoreError;
use super::key::BlobKey;
use super::sidecar::{BlobAttributes, Sidecar};

/// Acknowledgement of a successful `put`.
#[derive(Debug, Clone)]
pub struct PutReceipt {
    /// Id of the newly written record.
    pub id: String,
    /// Ids of the records it superseded.
    pub replaced: Vec<String>,
}

/// A record as returned by `get`.
#[derive(Debug, Clone)]
pub struct BlobRecord {
    pub id: String,
    pub sidecar: Sidecar,
    pub bytes: Vec<u8>,
}

impl BlobRecord {
    pub fn key(&self) -> &BlobKey {
        &self.sidecar.key
    }

    pub fn mime_type(&self) -> &str {
        &self.sidecar.mime_type
    }
}

/// Outcome of a duplicate-reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Sidecars parsed during the pass.
    pub scanned: usize,
    /// Entries skipped as unreadable or malformed.
    pub skipped: usize,
    /// Distinct keys, one surviving record each.
    pub kept: usize,
    /// Superseded records deleted.
    pub removed: usize,
}

/// Storage holding at most one blob per [`BlobKey`].
#[async_trait]
pub trait KeyedBlobStore: Send + Sync {
    /// Store `data` under `key`, replacing any record already held for it.
    async fn put(
        &self,
        key: &BlobKey,
        data: &[u8],
        attributes: BlobAttributes,
    ) -> Result<PutReceipt, StoreError>;

    /// Fetch the record currently held for `key`.
    async fn get(&self, key: &BlobKey) -> Result<BlobRecord, StoreError>;

    /// Collapse duplicate records per key down to the newest one.
    async fn reconcile(&self) -> Result<ReconcileReport, StoreError>;
}
