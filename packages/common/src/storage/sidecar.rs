use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::key::BlobKey;

/// Suffix that marks a directory entry as a sidecar.
pub const SIDECAR_SUFFIX: &str = ".json";

/// Descriptive attributes supplied by the caller of `put`.
#[derive(Debug, Clone, Default)]
pub struct BlobAttributes {
    /// Filename as sent by the client.
    pub original_name: String,
    /// Transfer encoding reported for the upload (e.g. `7bit`).
    pub encoding: String,
    /// MIME type the blob is served back with.
    pub mime_type: String,
}

/// JSON metadata stored next to each blob.
///
/// Field names match the layout written by the previous upload service so
/// that existing upload directories remain readable. Only the `metadata`
/// object is mandatory when parsing; a sidecar without it is not a record.
/// Older writers dropped an unset identifier from `metadata` entirely, which
/// reads back as the empty string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sidecar {
    #[serde(default)]
    pub original_name: String,
    #[serde(default)]
    pub encoding: String,
    #[serde(default, rename = "mimetype")]
    pub mime_type: String,
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub size: u64,
    #[serde(rename = "metadata")]
    pub key: BlobKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<DateTime<Utc>>,
}

/// Returns the record id encoded in a sidecar's file name, if it is one.
pub(crate) fn sidecar_id(file_name: &str) -> Option<&str> {
    file_name
        .strip_suffix(SIDECAR_SUFFIX)
        .filter(|id| !id.is_empty())
}

/// File name of the sidecar belonging to record `id`.
pub(crate) fn sidecar_file_name(id: &str) -> String {
    format!("{id}{SIDECAR_SUFFIX}")
}
