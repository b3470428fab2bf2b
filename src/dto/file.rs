use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::models::file::{FileDetail, FileRecord};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FileResponse {
    pub id: String,
    pub user: String,
    #[serde(rename = "fileDetails")]
    pub file_details: Vec<FileDetailResponse>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FileDetailResponse {
    pub name: String,
    pub url: String,
    pub public_id: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub size: u64,
}

impl From<&FileDetail> for FileDetailResponse {
    fn from(detail: &FileDetail) -> Self {
        Self {
            name: detail.name.clone(),
            url: detail.url.clone(),
            public_id: detail.public_id.clone(),
            content_type: detail.content_type.clone(),
            size: detail.size,
        }
    }
}

impl From<&FileRecord> for FileResponse {
    fn from(file: &FileRecord) -> Self {
        Self {
            id: file.id.map(|id| id.to_hex()).unwrap_or_default(),
            user: file.user.to_hex(),
            file_details: file.file_details.iter().map(FileDetailResponse::from).collect(),
            created_at: file.created_at.try_to_rfc3339_string().unwrap_or_default(),
            updated_at: file.updated_at.try_to_rfc3339_string().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RenameFileRequest {
    #[serde(default)]
    pub public_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct DeleteFileRequest {
    #[serde(default)]
    pub public_id: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchFilesQuery {
    /// Case-insensitive substring of the file name.
    #[serde(default)]
    pub name: Option<String>,
}
