use std::path::PathBuf;

use serde::Deserialize;

/// Picture storage configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Directory holding blobs and their sidecars. Default: "uploads".
    #[serde(default = "default_storage_directory")]
    pub directory: PathBuf,
    /// Largest accepted blob in bytes. Default: 16 MiB.
    #[serde(default = "default_max_blob_size")]
    pub max_blob_size: u64,
    /// Collapse duplicate records per key when the server starts. Default: true.
    #[serde(default = "default_reconcile_on_start")]
    pub reconcile_on_start: bool,
}

fn default_storage_directory() -> PathBuf {
    PathBuf::from("uploads")
}
fn default_max_blob_size() -> u64 {
    16 * 1024 * 1024
}
fn default_reconcile_on_start() -> bool {
    true
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            directory: default_storage_directory(),
            max_blob_size: default_max_blob_size(),
            reconcile_on_start: default_reconcile_on_start(),
        }
    }
}
