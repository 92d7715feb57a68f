use common::storage::{BlobKey, PutReceipt};
use serde::{Deserialize, Serialize};

/// Query parameters identifying a picture slot.
///
/// A missing parameter is treated as the empty string, which is itself a
/// valid key component.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PictureQuery {
    #[param(example = "T1")]
    #[serde(default)]
    pub travel_id: String,
    #[param(example = "B1")]
    #[serde(default)]
    pub bicycle_id: String,
}

impl From<PictureQuery> for BlobKey {
    fn from(query: PictureQuery) -> Self {
        BlobKey::new(query.travel_id, query.bicycle_id)
    }
}

/// Response DTO for a successful upload.
#[derive(Serialize, utoipa::ToSchema)]
pub struct UploadResponse {
    #[schema(example = "File uploaded successfully.")]
    pub message: String,
    /// Id of the stored record (UUIDv7).
    #[schema(example = "01936f0e-1234-7abc-8000-000000000001")]
    pub id: String,
    /// Number of earlier uploads for the same key that were replaced.
    #[schema(example = 1)]
    pub replaced: usize,
}

impl From<PutReceipt> for UploadResponse {
    fn from(receipt: PutReceipt) -> Self {
        Self {
            message: "File uploaded successfully.".into(),
            id: receipt.id,
            replaced: receipt.replaced.len(),
        }
    }
}
