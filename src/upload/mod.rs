//! Template image upload
//!
//! [`TemplateUploader`] posts a user-selected image to the backend as an
//! `upload_template` JSON payload carrying a base64 data URL, either as the
//! original bytes or downsampled and re-encoded as JPEG. It also submits
//! `alignment_person` measurements. Network and HTTP failures are logged and
//! reported through [`UploadOutcome`]; they never propagate as errors.

pub mod compress;
pub mod payload;

pub use compress::{compress_image, jpeg_filename, scaled_dimensions, COMPRESSED_CONTENT_TYPE};
pub use payload::{data_url, AlignmentSubmission, BackendPayload, CenterPosition};

use crate::config::UploadConfig;
use crate::errors::{PushError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// A selected file: name, mime type and bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFile {
    pub filename: String,
    /// May be empty when the type is unknown
    pub content_type: String,
    pub data: Vec<u8>,
}

impl TemplateFile {
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            data,
        }
    }

    /// Read a file, inferring its content type from the extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .ok_or_else(|| PushError::InvalidArgument(format!("not a file path: {:?}", path)))?;
        let content_type = mime_for_extension(path).to_string();

        Ok(Self {
            filename,
            content_type,
            data,
        })
    }
}

fn mime_for_extension(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        "tif" | "tiff" => "image/tiff",
        "heic" => "image/heic",
        _ => "",
    }
}

/// Single-slot file picker. Uploads take the file out so it can be picked again.
#[derive(Debug, Default)]
pub struct FileInput {
    selected: Option<TemplateFile>,
}

impl FileInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, file: TemplateFile) {
        self.selected = Some(file);
    }

    pub fn take(&mut self) -> Option<TemplateFile> {
        self.selected.take()
    }

    pub fn selected(&self) -> Option<&TemplateFile> {
        self.selected.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_none()
    }
}

/// Result of one backend POST
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UploadOutcome {
    /// Nothing was selected
    Skipped,
    Delivered { status: u16 },
    Failed { reason: String },
}

impl UploadOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, UploadOutcome::Delivered { .. })
    }
}

pub struct TemplateUploader {
    client: reqwest::Client,
    endpoint: String,
    stream_url: String,
    max_dimension: u32,
    jpeg_quality: f32,
}

impl TemplateUploader {
    pub fn new(config: &UploadConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| PushError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            stream_url: config.stream_url.clone(),
            max_dimension: config.max_dimension,
            jpeg_quality: config.jpeg_quality,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Configured `(max_dimension, quality)` for [`Self::upload_compressed`]
    pub fn compression_defaults(&self) -> (u32, f32) {
        (self.max_dimension, self.jpeg_quality)
    }

    /// Build the `upload_template` body for a file as-is.
    pub fn template_payload(&self, file: &TemplateFile) -> BackendPayload {
        let mime = if file.content_type.is_empty() {
            FALLBACK_CONTENT_TYPE
        } else {
            file.content_type.as_str()
        };

        BackendPayload::UploadTemplate {
            filename: file.filename.clone(),
            content_type: file.content_type.clone(),
            stream_url: self.stream_url.clone(),
            data: data_url(mime, &file.data),
        }
    }

    /// Upload the selected file unchanged.
    pub async fn upload_raw(&self, input: &mut FileInput) -> UploadOutcome {
        let Some(file) = input.take() else {
            return UploadOutcome::Skipped;
        };

        log::info!(
            "Uploading template {} ({} bytes)",
            file.filename,
            file.data.len()
        );
        self.post(&self.template_payload(&file)).await
    }

    /// Downsample and re-encode the selected file as JPEG, then upload it.
    pub async fn upload_compressed(
        &self,
        input: &mut FileInput,
        max_dimension: u32,
        quality: f32,
    ) -> Result<UploadOutcome> {
        let Some(file) = input.take() else {
            return Ok(UploadOutcome::Skipped);
        };

        let TemplateFile { filename, data, .. } = file;
        let jpeg = tokio::task::spawn_blocking(move || compress_image(&data, max_dimension, quality))
            .await
            .map_err(|e| PushError::Upload(format!("Compression task failed: {}", e)))??;

        let compressed = TemplateFile::new(jpeg_filename(&filename), COMPRESSED_CONTENT_TYPE, jpeg);
        log::info!(
            "Uploading compressed template {} ({} bytes)",
            compressed.filename,
            compressed.data.len()
        );
        Ok(self.post(&self.template_payload(&compressed)).await)
    }

    pub async fn submit_alignment(&self, submission: AlignmentSubmission) -> Result<UploadOutcome> {
        submission.validate().map_err(PushError::InvalidArgument)?;
        Ok(self.post(&submission.into()).await)
    }

    async fn post(&self, payload: &BackendPayload) -> UploadOutcome {
        let response = self
            .client
            .post(&self.endpoint)
            .json(payload)
            .send()
            .await
            .and_then(|response| response.error_for_status());

        match response {
            Ok(response) => {
                let status = response.status().as_u16();
                log::debug!("Backend accepted payload with status {}", status);
                UploadOutcome::Delivered { status }
            }
            Err(e) => {
                log::error!("Upload to {} failed: {}", self.endpoint, e);
                UploadOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}
