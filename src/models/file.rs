use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

/// Upload record stored in the `files` collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileRecord {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    /// Owning user, fixed at creation.
    pub user: ObjectId,
    #[serde(rename = "fileDetails")]
    pub file_details: Vec<FileDetail>,
    /// Set while a delete is in flight; cleared records never carry it.
    #[serde(default)]
    pub pending_delete: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// One hosted asset. `public_id` is the media host's key for it and the only
/// field used to address a record for rename and delete.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileDetail {
    pub name: String,
    pub url: String,
    pub public_id: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub size: u64,
    #[serde(default = "default_resource_type")]
    pub resource_type: String,
}

pub fn default_resource_type() -> String {
    "image".to_string()
}

impl FileRecord {
    pub fn new(user: ObjectId, file_details: Vec<FileDetail>) -> Self {
        let now = DateTime::now();
        Self {
            id: None,
            user,
            file_details,
            pending_delete: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn detail(&self, public_id: &str) -> Option<&FileDetail> {
        self.file_details.iter().find(|d| d.public_id == public_id)
    }

    pub fn owned_by(&self, user: &ObjectId) -> bool {
        &self.user == user
    }
}
