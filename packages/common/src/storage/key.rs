use std::fmt;

use serde::{Deserialize, Serialize};

/// Composite key identifying one picture slot.
///
/// Both components are opaque: matching is exact string equality, with no
/// trimming or case folding, and empty strings are valid. A component left
/// out of the serialized form reads as the empty string.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobKey {
    #[serde(default)]
    pub travel_id: String,
    #[serde(default)]
    pub bicycle_id: String,
}

impl BlobKey {
    pub fn new(travel_id: impl Into<String>, bicycle_id: impl Into<String>) -> Self {
        Self {
            travel_id: travel_id.into(),
            bicycle_id: bicycle_id.into(),
        }
    }
}

impl fmt::Debug for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobKey({:?}, {:?})", self.travel_id, self.bicycle_id)
    }
}

impl fmt::Display for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.travel_id, self.bicycle_id)
    }
}
