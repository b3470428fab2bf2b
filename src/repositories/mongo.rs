use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use mongodb::{
    bson::{self, doc, oid::ObjectId, DateTime, Document},
    error::{ErrorKind, WriteFailure},
    options::{FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument},
    Collection, IndexModel,
};

use super::{
    literal_pattern, FileFilter, FilePatch, FileRepository, RecordStream, RepoResult,
    RepositoryError, UserFilter, UserPatch, UserRepository,
};
use crate::{
    models::{file::FileRecord, user::User},
    services::database::Database,
};

const DUPLICATE_KEY: i32 = 11000;

fn map_write_error(e: mongodb::error::Error) -> RepositoryError {
    let duplicate = match e.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => write_error.code == DUPLICATE_KEY,
        ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY,
        _ => false,
    };

    if duplicate {
        RepositoryError::Duplicate(e.to_string())
    } else {
        RepositoryError::Database(e)
    }
}

fn update_options(return_updated: bool) -> FindOneAndUpdateOptions {
    let return_document = if return_updated {
        ReturnDocument::After
    } else {
        ReturnDocument::Before
    };
    FindOneAndUpdateOptions::builder()
        .return_document(return_document)
        .build()
}

fn oldest_first() -> FindOptions {
    FindOptions::builder().sort(doc! { "created_at": 1 }).build()
}

impl UserFilter {
    pub fn to_document(&self) -> Document {
        match self {
            UserFilter::Username(username) => doc! { "username": username.as_str() },
            UserFilter::Email(email) => doc! { "email": email.as_str() },
            UserFilter::UsernameOrEmail { username, email } => doc! {
                "$or": [ { "username": username.as_str() }, { "email": email.as_str() } ]
            },
        }
    }
}

impl UserPatch {
    pub fn to_update(&self) -> RepoResult<Document> {
        let mut set = doc! { "updated_at": DateTime::now() };
        let mut unset = Document::new();

        if let Some(full_name) = &self.full_name {
            set.insert("full_name", full_name.as_str());
        }
        if let Some(email) = &self.email {
            set.insert("email", email.as_str());
        }
        if let Some(password_hash) = &self.password_hash {
            set.insert("password_hash", password_hash.as_str());
        }
        if let Some(avatar) = &self.avatar {
            set.insert("avatar", bson::to_bson(avatar)?);
        }
        match &self.refresh_token {
            Some(Some(token)) => {
                set.insert("refresh_token", token.as_str());
            }
            Some(None) => {
                unset.insert("refresh_token", "");
            }
            None => {}
        }

        let mut update = doc! { "$set": set };
        if !unset.is_empty() {
            update.insert("$unset", unset);
        }
        Ok(update)
    }
}

impl FileFilter {
    pub fn to_document(&self) -> Document {
        match self {
            FileFilter::Id(id) => doc! { "_id": *id },
            FileFilter::Owner(owner) => doc! {
                "user": *owner,
                "pending_delete": { "$ne": true },
            },
            FileFilter::OwnedPublicId { owner, public_id } => doc! {
                "user": *owner,
                "fileDetails.public_id": public_id.as_str(),
            },
            FileFilter::PublicId(public_id) => doc! { "fileDetails.public_id": public_id.as_str() },
            FileFilter::OwnerNameContains { owner, pattern } => doc! {
                "user": *owner,
                "pending_delete": { "$ne": true },
                "fileDetails.name": { "$regex": literal_pattern(pattern), "$options": "i" },
            },
            FileFilter::PendingDelete => doc! { "pending_delete": true },
        }
    }
}

impl FilePatch {
    /// Update document plus the array filters it needs.
    pub fn to_update(&self) -> (Document, Option<Vec<Document>>) {
        match self {
            FilePatch::RenameDetail { public_id, name } => (
                doc! { "$set": {
                    "fileDetails.$[detail].name": name.as_str(),
                    "updated_at": DateTime::now(),
                } },
                Some(vec![doc! { "detail.public_id": public_id.as_str() }]),
            ),
            FilePatch::PendingDelete(pending) => (
                doc! { "$set": { "pending_delete": *pending, "updated_at": DateTime::now() } },
                None,
            ),
        }
    }
}

#[derive(Clone)]
pub struct MongoUserRepository {
    collection: Collection<User>,
}

impl MongoUserRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.users(),
        }
    }

    pub async fn ensure_indexes(&self) -> RepoResult<()> {
        for keys in [doc! { "username": 1 }, doc! { "email": 1 }] {
            let index = IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().unique(true).build())
                .build();
            self.collection.create_index(index, None).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    async fn find_by_id(&self, id: &ObjectId) -> RepoResult<Option<User>> {
        Ok(self.collection.find_one(doc! { "_id": *id }, None).await?)
    }

    async fn find_one(&self, filter: &UserFilter) -> RepoResult<Option<User>> {
        Ok(self.collection.find_one(filter.to_document(), None).await?)
    }

    async fn find(&self, filter: &UserFilter) -> RepoResult<RecordStream<User>> {
        let cursor = self
            .collection
            .find(filter.to_document(), oldest_first())
            .await?;
        Ok(cursor.map_err(RepositoryError::from).boxed())
    }

    async fn create(&self, mut user: User) -> RepoResult<User> {
        let result = self
            .collection
            .insert_one(&user, None)
            .await
            .map_err(map_write_error)?;
        user.id = result.inserted_id.as_object_id();
        Ok(user)
    }

    async fn find_by_id_and_update(
        &self,
        id: &ObjectId,
        patch: &UserPatch,
        return_updated: bool,
    ) -> RepoResult<Option<User>> {
        self.collection
            .find_one_and_update(
                doc! { "_id": *id },
                patch.to_update()?,
                update_options(return_updated),
            )
            .await
            .map_err(map_write_error)
    }

    async fn find_one_and_delete(&self, filter: &UserFilter) -> RepoResult<Option<User>> {
        Ok(self
            .collection
            .find_one_and_delete(filter.to_document(), None)
            .await?)
    }
}

#[derive(Clone)]
pub struct MongoFileRepository {
    collection: Collection<FileRecord>,
}

impl MongoFileRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.files(),
        }
    }

    pub async fn ensure_indexes(&self) -> RepoResult<()> {
        for keys in [
            doc! { "user": 1 },
            doc! { "fileDetails.public_id": 1 },
            doc! { "pending_delete": 1 },
        ] {
            let index = IndexModel::builder().keys(keys).build();
            self.collection.create_index(index, None).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl FileRepository for MongoFileRepository {
    async fn find_by_id(&self, id: &ObjectId) -> RepoResult<Option<FileRecord>> {
        Ok(self.collection.find_one(doc! { "_id": *id }, None).await?)
    }

    async fn find_one(&self, filter: &FileFilter) -> RepoResult<Option<FileRecord>> {
        Ok(self.collection.find_one(filter.to_document(), None).await?)
    }

    async fn find(&self, filter: &FileFilter) -> RepoResult<RecordStream<FileRecord>> {
        let cursor = self
            .collection
            .find(filter.to_document(), oldest_first())
            .await?;
        Ok(cursor.map_err(RepositoryError::from).boxed())
    }

    async fn create(&self, mut file: FileRecord) -> RepoResult<FileRecord> {
        let result = self
            .collection
            .insert_one(&file, None)
            .await
            .map_err(map_write_error)?;
        file.id = result.inserted_id.as_object_id();
        Ok(file)
    }

    async fn find_by_id_and_update(
        &self,
        id: &ObjectId,
        patch: &FilePatch,
        return_updated: bool,
    ) -> RepoResult<Option<FileRecord>> {
        let (update, array_filters) = patch.to_update();
        let mut options = update_options(return_updated);
        options.array_filters = array_filters;

        Ok(self
            .collection
            .find_one_and_update(doc! { "_id": *id }, update, options)
            .await?)
    }

    async fn find_one_and_delete(&self, filter: &FileFilter) -> RepoResult<Option<FileRecord>> {
        Ok(self
            .collection
            .find_one_and_delete(filter.to_document(), None)
            .await?)
    }
}
