//! Asset Uploader: forwards resume files to the Lyzr asset store and reports
//! the resulting asset ids.
//!
//! The uploader never fails with an error: every problem (missing credential,
//! remote rejection, transport failure) is folded into `UploadOutcome` so the
//! session orchestrator only ever sees structured outcomes.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::models::file::ResumeFile;

pub mod handlers;
pub mod shapes;

pub use shapes::UploadedFile;

/// Why an upload produced no usable asset ids.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadFailure {
    /// The server-held credential is absent. Not an upload failure as such:
    /// retrying cannot help until the deployment is fixed.
    #[error("credential not configured")]
    NotConfigured,

    #[error("No files provided")]
    NoFiles,

    /// The asset store answered with a non-2xx status; `body` is its text.
    #[error("{body}")]
    Rejected { status: u16, body: String },

    #[error("{message}")]
    Transport { message: String },
}

/// Result of one upload call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UploadOutcome {
    pub success: bool,
    /// In upload order. Non-empty whenever `success` is true.
    pub asset_ids: Vec<String>,
    pub error: Option<UploadFailure>,
    pub files: Vec<UploadedFile>,
    pub raw_response: Option<Value>,
}

impl UploadOutcome {
    pub fn failed(failure: UploadFailure) -> Self {
        Self {
            success: false,
            error: Some(failure),
            ..Self::default()
        }
    }

    /// Builds the outcome for a 2xx reply from the store.
    pub fn from_reply(body: Value) -> Self {
        let files = shapes::extract_uploaded_files(&body);
        let asset_ids = shapes::successful_asset_ids(&files);
        Self {
            success: !asset_ids.is_empty(),
            asset_ids,
            error: None,
            files,
            raw_response: Some(body),
        }
    }

    /// Asset ids only when the outcome is usable by the next step.
    pub fn usable_asset_ids(&self) -> Option<&[String]> {
        (self.success && !self.asset_ids.is_empty()).then_some(self.asset_ids.as_slice())
    }
}

/// Sends resume files to remote storage. Carried in `AppState` as
/// `Arc<dyn AssetUploader>` so tests can substitute a fake.
#[async_trait]
pub trait AssetUploader: Send + Sync {
    async fn upload(&self, files: &[ResumeFile]) -> UploadOutcome;
}

/// Uploader backed by the Lyzr `/v3/assets/upload` endpoint.
#[derive(Clone)]
pub struct LyzrAssetUploader {
    client: Client,
    upload_url: String,
    api_key: Option<String>,
}

impl LyzrAssetUploader {
    pub fn new(client: Client, upload_url: String, api_key: Option<String>) -> Self {
        Self {
            client,
            upload_url,
            api_key,
        }
    }

    async fn send(&self, api_key: &str, files: &[ResumeFile]) -> Result<UploadOutcome, reqwest::Error> {
        let mut form = Form::new();
        for file in files {
            let mut part = Part::bytes(file.bytes.to_vec()).file_name(file.name.clone());
            if let Some(content_type) = &file.content_type {
                // An unparseable content type is dropped rather than failing the upload.
                part = match part.mime_str(content_type) {
                    Ok(typed) => typed,
                    Err(_) => Part::bytes(file.bytes.to_vec()).file_name(file.name.clone()),
                };
            }
            form = form.part("files", part);
        }

        let response = self
            .client
            .post(&self.upload_url)
            .header("x-api-key", api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Upload API returned {}: {}", status, body);
            return Ok(UploadOutcome::failed(UploadFailure::Rejected {
                status: status.as_u16(),
                body,
            }));
        }

        let body: Value = response.json().await?;
        debug!("Asset store raw reply: {body}");

        Ok(UploadOutcome::from_reply(body))
    }
}

#[async_trait]
impl AssetUploader for LyzrAssetUploader {
    async fn upload(&self, files: &[ResumeFile]) -> UploadOutcome {
        let Some(api_key) = self.api_key.as_deref() else {
            error!("LYZR_API_KEY is not configured; refusing to upload");
            return UploadOutcome::failed(UploadFailure::NotConfigured);
        };
        if files.is_empty() {
            return UploadOutcome::failed(UploadFailure::NoFiles);
        }

        match self.send(api_key, files).await {
            Ok(outcome) => {
                info!(
                    "Uploaded {} file(s), extracted asset ids: {:?}",
                    files.len(),
                    outcome.asset_ids
                );
                outcome
            }
            Err(e) => {
                error!("File upload error: {e}");
                UploadOutcome::failed(UploadFailure::Transport {
                    message: e.to_string(),
                })
            }
        }
    }
}
