//! Upload relay: lets a browser front end push files to the asset store
//! without ever seeing the server-held credential.

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::assets::{UploadFailure, UploadOutcome, UploadedFile};
use crate::errors::AppError;
use crate::models::file::ResumeFile;
use crate::state::AppState;

/// Report returned by `POST /api/upload`.
#[derive(Debug, Serialize)]
pub struct UploadReport {
    pub success: bool,
    pub asset_ids: Vec<String>,
    pub files: Vec<UploadedFile>,
    pub total_files: usize,
    pub successful_uploads: usize,
    pub failed_uploads: usize,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<Value>,
}

impl UploadReport {
    pub fn from_outcome(outcome: UploadOutcome, submitted: usize) -> (StatusCode, Self) {
        let uploaded = outcome.asset_ids.len();
        let (status, total, failed, message) = match &outcome.error {
            Some(UploadFailure::NotConfigured) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                0,
                0,
                "LYZR_API_KEY not configured".to_string(),
            ),
            Some(UploadFailure::NoFiles) => {
                (StatusCode::BAD_REQUEST, 0, 0, "No files provided".to_string())
            }
            Some(UploadFailure::Rejected { status, .. }) => (
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
                submitted,
                submitted,
                format!("Upload failed with status {status}"),
            ),
            Some(UploadFailure::Transport { .. }) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                0,
                0,
                "Server error during upload".to_string(),
            ),
            None if uploaded > 0 => (
                StatusCode::OK,
                submitted,
                0,
                format!("Successfully uploaded {uploaded} file(s)"),
            ),
            None => (
                StatusCode::OK,
                submitted,
                submitted,
                "Upload succeeded but no asset IDs returned".to_string(),
            ),
        };

        let report = UploadReport {
            success: outcome.success,
            successful_uploads: uploaded,
            asset_ids: outcome.asset_ids,
            files: outcome.files,
            total_files: total,
            failed_uploads: failed,
            message,
            timestamp: Utc::now(),
            error: outcome.error.map(|e| e.to_string()),
            raw_response: outcome.raw_response,
        };
        (status, report)
    }
}

/// POST /api/upload
///
/// Accepts multipart `files` fields and forwards them to the asset store.
pub async fn handle_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<UploadReport>), AppError> {
    let files = read_files(multipart, "files").await?;
    let submitted = files.len();
    let outcome = state.uploader.upload(&files).await;
    let (status, report) = UploadReport::from_outcome(outcome, submitted);
    Ok((status, Json(report)))
}

/// Collects every multipart field named `field_name` into a `ResumeFile`.
pub async fn read_files(
    mut multipart: Multipart,
    field_name: &str,
) -> Result<Vec<ResumeFile>, AppError> {
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(field_name) {
            continue;
        }
        let name = field.file_name().unwrap_or("resume").to_string();
        let content_type = field.content_type().map(String::from);
        let bytes = field.bytes().await.map_err(multipart_error)?;
        files.push(ResumeFile {
            content_type,
            ..ResumeFile::new(name, bytes)
        });
    }
    Ok(files)
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::Validation(format!("Malformed multipart body: {}", err.body_text()))
    }
}
