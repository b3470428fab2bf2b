//! Data access over the document store.
//!
//! Services only see the [`UserRepository`] and [`FileRepository`] traits.
//! [`mongo`] backs them with MongoDB, [`memory`] keeps everything in process
//! for tests and local runs.

pub mod memory;
pub mod mongo;

use async_trait::async_trait;
use futures::stream::BoxStream;
use mongodb::bson::oid::ObjectId;
use thiserror::Error;

use crate::models::{
    file::FileRecord,
    user::{Avatar, User},
};

pub use memory::{InMemoryFileRepository, InMemoryUserRepository};
pub use mongo::{MongoFileRepository, MongoUserRepository};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),
    #[error("document encoding error: {0}")]
    Encoding(#[from] mongodb::bson::ser::Error),
    #[error("duplicate key: {0}")]
    Duplicate(String),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Lazily produced query results.
pub type RecordStream<T> = BoxStream<'static, RepoResult<T>>;

#[derive(Debug, Clone, PartialEq)]
pub enum UserFilter {
    Username(String),
    Email(String),
    /// Matches either field; used by login and registration checks.
    UsernameOrEmail { username: String, email: String },
}

/// Partial update of a user. `None` leaves the field untouched;
/// `refresh_token: Some(None)` clears the stored token.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPatch {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub avatar: Option<Avatar>,
    pub refresh_token: Option<Option<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FileFilter {
    Id(ObjectId),
    /// Everything `owner` can see; records awaiting deletion are hidden.
    Owner(ObjectId),
    /// A detail entry with this public id, owned by `owner`.
    OwnedPublicId { owner: ObjectId, public_id: String },
    /// A detail entry with this public id, regardless of owner.
    PublicId(String),
    /// Case-insensitive literal substring match on detail names, visible
    /// records only.
    OwnerNameContains { owner: ObjectId, pattern: String },
    PendingDelete,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilePatch {
    /// Rename the detail entry addressed by `public_id`.
    RenameDetail { public_id: String, name: String },
    PendingDelete(bool),
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &ObjectId) -> RepoResult<Option<User>>;
    async fn find_one(&self, filter: &UserFilter) -> RepoResult<Option<User>>;
    async fn find(&self, filter: &UserFilter) -> RepoResult<RecordStream<User>>;
    /// Insert and return the stored document with its id.
    async fn create(&self, user: User) -> RepoResult<User>;
    /// Apply `patch`; returns the updated document when `return_updated`,
    /// the previous one otherwise, `None` when nothing matched.
    async fn find_by_id_and_update(
        &self,
        id: &ObjectId,
        patch: &UserPatch,
        return_updated: bool,
    ) -> RepoResult<Option<User>>;
    async fn find_one_and_delete(&self, filter: &UserFilter) -> RepoResult<Option<User>>;
}

#[async_trait]
pub trait FileRepository: Send + Sync {
    async fn find_by_id(&self, id: &ObjectId) -> RepoResult<Option<FileRecord>>;
    async fn find_one(&self, filter: &FileFilter) -> RepoResult<Option<FileRecord>>;
    async fn find(&self, filter: &FileFilter) -> RepoResult<RecordStream<FileRecord>>;
    async fn create(&self, file: FileRecord) -> RepoResult<FileRecord>;
    async fn find_by_id_and_update(
        &self,
        id: &ObjectId,
        patch: &FilePatch,
        return_updated: bool,
    ) -> RepoResult<Option<FileRecord>>;
    async fn find_one_and_delete(&self, filter: &FileFilter) -> RepoResult<Option<FileRecord>>;
}

/// Regex source matching `pattern` literally, used for name search.
pub fn literal_pattern(pattern: &str) -> String {
    regex::escape(pattern)
}
