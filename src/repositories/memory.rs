use std::sync::Arc;

use async_trait::async_trait;
use futures::{stream, StreamExt};
use mongodb::bson::{oid::ObjectId, DateTime};
use regex::RegexBuilder;
use tokio::sync::RwLock;

use super::{
    literal_pattern, FileFilter, FilePatch, FileRepository, RecordStream, RepoResult,
    RepositoryError, UserFilter, UserPatch, UserRepository,
};
use crate::models::{file::FileRecord, user::User};

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        match self {
            UserFilter::Username(username) => &user.username == username,
            UserFilter::Email(email) => &user.email == email,
            UserFilter::UsernameOrEmail { username, email } => {
                &user.username == username || &user.email == email
            }
        }
    }
}

impl UserPatch {
    pub fn apply(&self, user: &mut User) {
        if let Some(full_name) = &self.full_name {
            user.full_name = full_name.clone();
        }
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
        if let Some(password_hash) = &self.password_hash {
            user.password_hash = password_hash.clone();
        }
        if let Some(avatar) = &self.avatar {
            user.avatar = Some(avatar.clone());
        }
        if let Some(refresh_token) = &self.refresh_token {
            user.refresh_token = refresh_token.clone();
        }
        user.updated_at = DateTime::now();
    }
}

impl FileFilter {
    pub fn matches(&self, file: &FileRecord) -> bool {
        match self {
            FileFilter::Id(id) => file.id.as_ref() == Some(id),
            FileFilter::Owner(owner) => file.owned_by(owner) && !file.pending_delete,
            FileFilter::OwnedPublicId { owner, public_id } => {
                file.owned_by(owner) && file.detail(public_id).is_some()
            }
            FileFilter::PublicId(public_id) => file.detail(public_id).is_some(),
            FileFilter::OwnerNameContains { owner, pattern } => {
                // Same semantics as the `$regex` with `$options: "i"` query.
                let Ok(re) = RegexBuilder::new(&literal_pattern(pattern))
                    .case_insensitive(true)
                    .build()
                else {
                    return false;
                };
                file.owned_by(owner)
                    && !file.pending_delete
                    && file.file_details.iter().any(|d| re.is_match(&d.name))
            }
            FileFilter::PendingDelete => file.pending_delete,
        }
    }
}

impl FilePatch {
    pub fn apply(&self, file: &mut FileRecord) {
        match self {
            FilePatch::RenameDetail { public_id, name } => {
                for detail in file
                    .file_details
                    .iter_mut()
                    .filter(|d| &d.public_id == public_id)
                {
                    detail.name = name.clone();
                }
            }
            FilePatch::PendingDelete(pending) => file.pending_delete = *pending,
        }
        file.updated_at = DateTime::now();
    }
}

/// Process-local user store with the same semantics as the MongoDB one,
/// including unique username and email.
#[derive(Clone, Default)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<Vec<User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: &ObjectId) -> RepoResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id.as_ref() == Some(id)).cloned())
    }

    async fn find_one(&self, filter: &UserFilter) -> RepoResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| filter.matches(u)).cloned())
    }

    async fn find(&self, filter: &UserFilter) -> RepoResult<RecordStream<User>> {
        let matches: Vec<User> = {
            let users = self.users.read().await;
            users.iter().filter(|u| filter.matches(u)).cloned().collect()
        };
        Ok(stream::iter(matches.into_iter().map(Ok)).boxed())
    }

    async fn create(&self, mut user: User) -> RepoResult<User> {
        let mut users = self.users.write().await;
        if users
            .iter()
            .any(|u| u.username == user.username || u.email == user.email)
        {
            return Err(RepositoryError::Duplicate(format!(
                "username {} or email {} already taken",
                user.username, user.email
            )));
        }
        if user.id.is_none() {
            user.id = Some(ObjectId::new());
        }
        users.push(user.clone());
        Ok(user)
    }

    async fn find_by_id_and_update(
        &self,
        id: &ObjectId,
        patch: &UserPatch,
        return_updated: bool,
    ) -> RepoResult<Option<User>> {
        let mut users = self.users.write().await;

        if let Some(email) = &patch.email {
            if users
                .iter()
                .any(|u| u.id.as_ref() != Some(id) && &u.email == email)
            {
                return Err(RepositoryError::Duplicate(format!("email {} already taken", email)));
            }
        }

        let Some(user) = users.iter_mut().find(|u| u.id.as_ref() == Some(id)) else {
            return Ok(None);
        };
        let before = user.clone();
        patch.apply(user);

        Ok(Some(if return_updated { user.clone() } else { before }))
    }

    async fn find_one_and_delete(&self, filter: &UserFilter) -> RepoResult<Option<User>> {
        let mut users = self.users.write().await;
        let position = users.iter().position(|u| filter.matches(u));
        Ok(position.map(|i| users.remove(i)))
    }
}

#[derive(Clone, Default)]
pub struct InMemoryFileRepository {
    files: Arc<RwLock<Vec<FileRecord>>>,
}

impl InMemoryFileRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.files.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.files.read().await.is_empty()
    }
}

#[async_trait]
impl FileRepository for InMemoryFileRepository {
    async fn find_by_id(&self, id: &ObjectId) -> RepoResult<Option<FileRecord>> {
        let files = self.files.read().await;
        Ok(files.iter().find(|f| f.id.as_ref() == Some(id)).cloned())
    }

    async fn find_one(&self, filter: &FileFilter) -> RepoResult<Option<FileRecord>> {
        let files = self.files.read().await;
        Ok(files.iter().find(|f| filter.matches(f)).cloned())
    }

    async fn find(&self, filter: &FileFilter) -> RepoResult<RecordStream<FileRecord>> {
        let matches: Vec<FileRecord> = {
            let files = self.files.read().await;
            files.iter().filter(|f| filter.matches(f)).cloned().collect()
        };
        Ok(stream::iter(matches.into_iter().map(Ok)).boxed())
    }

    async fn create(&self, mut file: FileRecord) -> RepoResult<FileRecord> {
        if file.id.is_none() {
            file.id = Some(ObjectId::new());
        }
        self.files.write().await.push(file.clone());
        Ok(file)
    }

    async fn find_by_id_and_update(
        &self,
        id: &ObjectId,
        patch: &FilePatch,
        return_updated: bool,
    ) -> RepoResult<Option<FileRecord>> {
        let mut files = self.files.write().await;
        let Some(file) = files.iter_mut().find(|f| f.id.as_ref() == Some(id)) else {
            return Ok(None);
        };
        let before = file.clone();
        patch.apply(file);

        Ok(Some(if return_updated { file.clone() } else { before }))
    }

    async fn find_one_and_delete(&self, filter: &FileFilter) -> RepoResult<Option<FileRecord>> {
        let mut files = self.files.write().await;
        let position = files.iter().position(|f| filter.matches(f));
        Ok(position.map(|i| files.remove(i)))
    }
}
