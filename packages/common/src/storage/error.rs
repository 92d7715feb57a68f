use thiserror::Error;

/// Errors surfaced by the keyed blob store.
///
/// Per-entry failures during a directory scan never appear here; they are
/// reported as a [`SkipReason`](super::SkipReason) and the scan moves on.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The storage directory could not be created, listed or read.
    #[error("storage directory unavailable: {0}")]
    StoreUnavailable(#[source] std::io::Error),

    /// The new blob or its sidecar could not be persisted.
    #[error("failed to persist record: {0}")]
    WriteFailed(#[source] std::io::Error),

    /// No record exists for the requested key.
    #[error("no record for travelId={travel_id:?} bicycleId={bicycle_id:?}")]
    NotFound {
        travel_id: String,
        bicycle_id: String,
    },

    /// The blob exceeds the configured size limit.
    #[error("blob exceeds size limit ({actual} > {limit} bytes)")]
    TooLarge { actual: u64, limit: u64 },
}
