use axum::{
    Json,
    extract::{
        Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    AppState,
    auth::{Operation, Principal},
    error::{ApiError, ErrorBody},
    moderation::Verdict,
    models::UploadResponse,
    storage::sanitize_key,
};

pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
const ALLOWED_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

/// Body of a moderation rejection: the usual `error` plus the classifier's reason.
#[derive(Debug, Serialize, ToSchema)]
pub struct ModerationRejection {
    pub error: String,
    pub reason: String,
}

/// UploadError
///
/// The upload endpoint's failure: either a regular API error or a moderation
/// rejection, which carries an extra `reason` field.
pub enum UploadError {
    Api(ApiError),
    Rejected(String),
}

impl From<ApiError> for UploadError {
    fn from(e: ApiError) -> Self {
        UploadError::Api(e)
    }
}

impl From<MultipartError> for UploadError {
    fn from(e: MultipartError) -> Self {
        UploadError::Api(e.into())
    }
}

impl From<MultipartRejection> for UploadError {
    fn from(rejection: MultipartRejection) -> Self {
        UploadError::Api(rejection.into())
    }
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        match self {
            UploadError::Api(e) => e.into_response(),
            UploadError::Rejected(reason) => (
                StatusCode::BAD_REQUEST,
                Json(ModerationRejection {
                    error: "Image rejected by content moderation".to_string(),
                    reason,
                }),
            )
                .into_response(),
        }
    }
}

/// upload_image
///
/// [Admin, Owner] Accepts a single multipart `file` (JPEG, PNG or WebP, at most
/// 5 MB), screens it with the moderation classifier and stores it.
/// A classifier outage does not block the upload.
#[utoipa::path(
    post,
    path = "/admin/upload",
    tag = "upload",
    request_body(content_type = "multipart/form-data", description = "Form with a `file` field"),
    responses(
        (status = 200, description = "Stored", body = UploadResponse),
        (status = 400, description = "Missing, oversized or rejected image", body = ErrorBody),
        (status = 403, description = "Role not allowed", body = ErrorBody)
    )
)]
pub async fn upload_image(
    principal: Principal,
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, UploadError> {
    principal.authorize(Operation::UploadImage)?;
    let mut multipart = multipart?;

    let mut file = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;
        file = Some((file_name, content_type, bytes));
        break;
    }
    let Some((file_name, content_type, bytes)) = file else {
        return Err(ApiError::BadRequest("No file provided".to_string()).into());
    };

    if !ALLOWED_TYPES.contains(&content_type.as_str()) {
        return Err(ApiError::BadRequest(
            "Only JPEG, PNG, and WebP images are allowed".to_string(),
        )
        .into());
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(ApiError::BadRequest("File size must be less than 5MB".to_string()).into());
    }

    match state.moderator.review(&bytes, &content_type).await {
        Ok(Verdict::Approved) => {}
        Ok(Verdict::Rejected { reason }) => {
            tracing::info!(user_id = %principal.id, %reason, "upload rejected by moderation");
            return Err(UploadError::Rejected(reason));
        }
        Err(e) => {
            tracing::error!(error = %e, "image moderation unavailable, accepting upload");
        }
    }

    let filename = format!("{}-{}", Utc::now().timestamp_millis(), sanitize_key(&file_name));
    let key = format!("uploads/{}", filename);
    let size = bytes.len() as u64;

    let url = state
        .storage
        .put_object(&key, bytes.to_vec(), &content_type)
        .await
        .map_err(ApiError::internal)?;

    tracing::info!(user_id = %principal.id, %key, size, "image uploaded");

    Ok(Json(UploadResponse {
        url,
        filename,
        size,
        content_type,
    }))
}
