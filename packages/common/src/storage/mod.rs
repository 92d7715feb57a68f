mod error;
mod key;
mod locks;
mod scan;
mod sidecar;
mod traits;

pub mod filesystem;

pub use error::StoreError;
pub use key::BlobKey;
pub use locks::{KeyGuard, KeyLocks};
pub use scan::SkipReason;
pub use sidecar::{BlobAttributes, SIDECAR_SUFFIX, Sidecar};
pub use traits::{BlobRecord, KeyedBlobStore, PutReceipt, ReconcileReport};
