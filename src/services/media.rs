use std::{path::Path, time::Duration};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{multipart, Client, StatusCode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::{config::CloudinaryConfig, utils::LocalFile};

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("media host request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("media host rejected the call: {status} - {body}")]
    Rejected { status: StatusCode, body: String },
    #[error("failed to read upload: {0}")]
    Io(#[from] std::io::Error),
    #[error("media host is not configured: {0}")]
    NotConfigured(&'static str),
}

/// What the media host reports for a stored asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedAsset {
    pub original_filename: String,
    pub secure_url: String,
    pub public_id: String,
    pub format: String,
    pub bytes: u64,
    pub resource_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyOutcome {
    Deleted,
    /// The host had no asset under that id.
    NotFound,
}

/// Remote binary storage.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload(&self, file: &LocalFile) -> Result<UploadedAsset, MediaError>;
    async fn destroy(&self, public_id: &str, resource_type: &str)
        -> Result<DestroyOutcome, MediaError>;
}

/// Signed client for the Cloudinary upload API.
///
/// Requests are signed with SHA-256, so the account's signature algorithm
/// must be set to SHA-256.
#[derive(Clone)]
pub struct CloudinaryClient {
    client: Client,
    base_url: String,
    cloud_name: String,
    api_key: String,
    api_secret: String,
    folder: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CloudinaryUploadResponse {
    public_id: String,
    secure_url: String,
    #[serde(default)]
    format: Option<String>,
    bytes: u64,
    resource_type: String,
}

#[derive(Debug, Deserialize)]
struct CloudinaryDestroyResponse {
    result: String,
}

impl CloudinaryClient {
    pub fn new(config: &CloudinaryConfig) -> Result<Self, MediaError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            folder: config.folder.clone().filter(|f| !f.is_empty()),
        })
    }

    fn endpoint(&self, resource_type: &str, action: &str) -> Result<String, MediaError> {
        if self.cloud_name.is_empty() {
            return Err(MediaError::NotConfigured("cloud_name"));
        }
        if self.api_key.is_empty() || self.api_secret.is_empty() {
            return Err(MediaError::NotConfigured("api credentials"));
        }
        Ok(format!(
            "{}/v1_1/{}/{}/{}",
            self.base_url, self.cloud_name, resource_type, action
        ))
    }

    async fn rejected(response: reqwest::Response) -> MediaError {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        MediaError::Rejected { status, body }
    }
}

#[async_trait]
impl MediaStore for CloudinaryClient {
    async fn upload(&self, file: &LocalFile) -> Result<UploadedAsset, MediaError> {
        let url = self.endpoint("auto", "upload")?;
        let timestamp = Utc::now().timestamp().to_string();

        let mut params = vec![("timestamp", timestamp.clone())];
        if let Some(folder) = &self.folder {
            params.push(("folder", folder.clone()));
        }
        let signature = sign_params(&params, &self.api_secret);

        let bytes = tokio::fs::read(&file.path).await?;
        let mut part = multipart::Part::bytes(bytes).file_name(file.original_name.clone());
        if let Some(content_type) = &file.content_type {
            part = part.mime_str(content_type)?;
        }

        let mut form = multipart::Form::new()
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature", signature)
            .part("file", part);
        if let Some(folder) = &self.folder {
            form = form.text("folder", folder.clone());
        }

        tracing::info!("Uploading {} ({} bytes) to media host", file.original_name, file.size);
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send upload request for {}: {}", file.original_name, e);
                e
            })?;

        if !response.status().is_success() {
            let err = Self::rejected(response).await;
            tracing::error!("Upload failed for {}: {}", file.original_name, err);
            return Err(err);
        }

        let result = response.json::<CloudinaryUploadResponse>().await?;
        tracing::info!("Uploaded {} as {}", file.original_name, result.public_id);

        // The host echoes the name without its extension; keep what the client sent.
        Ok(UploadedAsset {
            original_filename: file.original_name.clone(),
            secure_url: result.secure_url,
            public_id: result.public_id,
            format: result
                .format
                .unwrap_or_else(|| fallback_format(file)),
            bytes: result.bytes,
            resource_type: result.resource_type,
        })
    }

    async fn destroy(
        &self,
        public_id: &str,
        resource_type: &str,
    ) -> Result<DestroyOutcome, MediaError> {
        let url = self.endpoint(resource_type, "destroy")?;
        let timestamp = Utc::now().timestamp().to_string();
        let params = vec![
            ("public_id", public_id.to_string()),
            ("timestamp", timestamp.clone()),
        ];
        let signature = sign_params(&params, &self.api_secret);

        let form = [
            ("public_id", public_id.to_string()),
            ("timestamp", timestamp),
            ("api_key", self.api_key.clone()),
            ("signature", signature),
        ];

        let response = self.client.post(&url).form(&form).send().await?;
        if !response.status().is_success() {
            let err = Self::rejected(response).await;
            tracing::error!("Destroy failed for {}: {}", public_id, err);
            return Err(err);
        }

        let result = response.json::<CloudinaryDestroyResponse>().await?;
        match result.result.as_str() {
            "ok" => Ok(DestroyOutcome::Deleted),
            "not found" => Ok(DestroyOutcome::NotFound),
            other => Err(MediaError::Rejected {
                status: StatusCode::OK,
                body: format!("unexpected destroy result: {}", other),
            }),
        }
    }
}

/// Request signature: parameters sorted by name, joined as `k=v` with `&`,
/// followed by the API secret, SHA-256 hex encoded.
pub fn sign_params(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let payload = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let digest = Sha256::digest(format!("{}{}", payload, api_secret).as_bytes());
    format!("{:x}", digest)
}

fn fallback_format(file: &LocalFile) -> String {
    Path::new(&file.original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .or_else(|| file.content_type.clone())
        .unwrap_or_default()
}
