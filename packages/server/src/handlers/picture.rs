use axum::Json;
use axum::body::Body;
use axum::extract::multipart::Field;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{StatusCode, header};
use axum::response::Response;
use common::storage::{BlobAttributes, BlobKey};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::query::AppQuery;
use crate::models::picture::{PictureQuery, UploadResponse};
use crate::state::AppState;

const OCTET_STREAM: &str = "application/octet-stream";

/// Body limit for the upload route: the blob limit plus room for the
/// identifier fields and multipart framing.
pub fn upload_body_limit(max_blob_size: u64) -> DefaultBodyLimit {
    let max_blob_size = usize::try_from(max_blob_size).unwrap_or(usize::MAX);
    DefaultBodyLimit::max(max_blob_size.saturating_add(64 * 1024))
}

#[utoipa::path(
    post,
    path = "/upload",
    tag = "Pictures",
    operation_id = "uploadPicture",
    summary = "Upload the picture for a travel/bicycle pair",
    description = "Stores the `file` multipart field under the key formed by the `travelId` and \
        `bicycleId` text fields. A missing identifier field counts as the empty string. \
        Any picture previously stored for the same pair is replaced.",
    request_body(content_type = "multipart/form-data", description = "File upload with travelId and bicycleId"),
    responses(
        (status = 200, description = "Picture stored", body = UploadResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 413, description = "File too large (PAYLOAD_TOO_LARGE)", body = ErrorBody),
        (status = 500, description = "Storage failure (INTERNAL_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, multipart))]
pub async fn upload_picture(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let max_size = state.config.storage.max_blob_size;

    let mut upload: Option<(Vec<u8>, BlobAttributes)> = None;
    let mut travel_id = String::new();
    let mut bicycle_id = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        match field.name() {
            Some("file") => upload = Some(read_file_field(field, max_size).await?),
            Some("travelId") => travel_id = read_text_field(field, "travelId").await?,
            Some("bicycleId") => bicycle_id = read_text_field(field, "bicycleId").await?,
            _ => {} // Ignore unknown fields.
        }
    }

    let (data, attributes) =
        upload.ok_or_else(|| AppError::Validation("Missing 'file' field".into()))?;

    let key = BlobKey::new(travel_id, bicycle_id);
    let receipt = state.store.put(&key, &data, attributes).await?;

    Ok(Json(UploadResponse::from(receipt)))
}

#[utoipa::path(
    get,
    path = "/picture",
    tag = "Pictures",
    operation_id = "getPicture",
    summary = "Fetch the picture for a travel/bicycle pair",
    description = "Returns the raw bytes of the current picture with its stored content type.",
    params(PictureQuery),
    responses(
        (status = 200, description = "Picture content"),
        (status = 404, description = "No picture for this pair (NOT_FOUND)", body = ErrorBody),
        (status = 500, description = "Storage failure (INTERNAL_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_picture(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PictureQuery>,
) -> Result<Response, AppError> {
    picture_response(&state, query.into()).await
}

#[utoipa::path(
    post,
    path = "/picture",
    tag = "Pictures",
    operation_id = "fetchPicture",
    summary = "Fetch the picture for a travel/bicycle pair (POST form)",
    description = "Same as `GET /picture`. Kept for clients of the previous service, which \
        only answered this route on POST.",
    params(PictureQuery),
    responses(
        (status = 200, description = "Picture content"),
        (status = 404, description = "No picture for this pair (NOT_FOUND)", body = ErrorBody),
        (status = 500, description = "Storage failure (INTERNAL_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn fetch_picture(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PictureQuery>,
) -> Result<Response, AppError> {
    picture_response(&state, query.into()).await
}

async fn picture_response(state: &AppState, key: BlobKey) -> Result<Response, AppError> {
    let record = state.store.get(&key).await?;

    let content_type = match record.mime_type() {
        "" => OCTET_STREAM.to_string(),
        mime => mime.to_string(),
    };
    let disposition = content_disposition_value(&record.sidecar.original_name, &content_type);
    let length = record.bytes.len();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, length.to_string())
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from(record.bytes))
        .map_err(|e| {
            AppError::Internal(
                "Failed to build the picture response.",
                format!("Failed to build response for record {}: {e}", record.id),
            )
        })
}

/// Buffer the `file` field, enforcing the blob size limit as chunks arrive.
async fn read_file_field(
    mut field: Field<'_>,
    max_size: u64,
) -> Result<(Vec<u8>, BlobAttributes), AppError> {
    let original_name = field
        .file_name()
        .map(str::to_string)
        .ok_or_else(|| AppError::Validation("File field must have a filename".into()))?;

    let mime_type = match field.content_type() {
        Some(declared) if declared != OCTET_STREAM => declared.to_string(),
        declared => mime_guess::from_path(&original_name)
            .first()
            .map(|m| m.to_string())
            .unwrap_or_else(|| declared.unwrap_or(OCTET_STREAM).to_string()),
    };

    let encoding = field
        .headers()
        .get("content-transfer-encoding")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("7bit")
        .to_string();

    let mut data = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| AppError::Validation(format!("Upload read error: {e}")))?
    {
        if (data.len() + chunk.len()) as u64 > max_size {
            return Err(AppError::PayloadTooLarge { limit: max_size });
        }
        data.extend_from_slice(&chunk);
    }

    Ok((
        data,
        BlobAttributes {
            original_name,
            encoding,
            mime_type,
        },
    ))
}

async fn read_text_field(field: Field<'_>, name: &str) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read {name}: {e}")))
}

/// `Content-Disposition` for a served picture.
///
/// Pictures are shown inline. The quoted `filename` keeps only the printable
/// ASCII of the uploaded name; when nothing survives it becomes `picture`
/// with an extension for the stored MIME type. `filename*` carries the exact
/// uploaded name percent-encoded (RFC 8187).
fn content_disposition_value(original_name: &str, mime_type: &str) -> String {
    let mut fallback: String = original_name
        .chars()
        .filter(|c| c.is_ascii_graphic() && !matches!(c, '"' | ';' | '\\'))
        .collect();
    if fallback.is_empty() {
        fallback = match mime_guess::get_mime_extensions_str(mime_type).and_then(|e| e.first()) {
            Some(ext) => format!("picture.{ext}"),
            None => "picture".to_string(),
        };
    }

    let mut encoded = String::with_capacity(original_name.len());
    for b in original_name.bytes() {
        if is_attr_char(b) {
            encoded.push(char::from(b));
        } else {
            encoded.push_str(&format!("%{b:02X}"));
        }
    }

    format!("inline; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}

fn is_attr_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&b)
}
