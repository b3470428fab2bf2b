use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

/// Account document stored in the `users` collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    #[serde(default)]
    pub avatar: Option<Avatar>,
    /// Latest refresh token handed out; `None` once logged out.
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// Profile picture hosted by the media service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Avatar {
    pub url: String,
    pub public_id: String,
    pub resource_type: String,
}

impl User {
    /// Username and email are stored lower-cased so lookups are exact.
    pub fn new(username: &str, email: &str, full_name: &str, password_hash: String) -> Self {
        let now = DateTime::now();
        Self {
            id: None,
            username: normalize_identifier(username),
            email: normalize_identifier(email),
            full_name: full_name.trim().to_string(),
            password_hash,
            avatar: None,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id_hex(&self) -> String {
        self.id.map(|id| id.to_hex()).unwrap_or_default()
    }
}

pub fn normalize_identifier(value: &str) -> String {
    value.trim().to_lowercase()
}
