use std::sync::Arc;

use futures::TryStreamExt;
use mongodb::bson::oid::ObjectId;

use crate::{
    dto::{
        file::{DeleteFileRequest, FileResponse, RenameFileRequest, SearchFilesQuery},
        required,
    },
    error::{AppError, AppResult, OrAppError},
    models::{
        file::{default_resource_type, FileDetail, FileRecord},
        user::User,
    },
    repositories::{FileFilter, FilePatch, FileRepository, UserRepository},
    services::media::{DestroyOutcome, MediaStore},
    utils::LocalFile,
};

const MAX_FILE_NAME_LEN: usize = 255;

/// File operations: upload, rename, delete, search and listing, always on
/// behalf of an authenticated owner.
#[derive(Clone)]
pub struct FileService {
    files: Arc<dyn FileRepository>,
    users: Arc<dyn UserRepository>,
    media: Arc<dyn MediaStore>,
}

impl FileService {
    pub fn new(
        files: Arc<dyn FileRepository>,
        users: Arc<dyn UserRepository>,
        media: Arc<dyn MediaStore>,
    ) -> Self {
        Self {
            files,
            users,
            media,
        }
    }

    async fn require_owner(&self, owner: &ObjectId, message: &str, missing: &str) -> AppResult<User> {
        self.users
            .find_by_id(owner)
            .await
            .or_internal(message)?
            .ok_or_else(|| AppError::not_found(missing))
    }

    /// Forward a spooled upload to the media host and record it. The spooled
    /// copy is removed whatever the outcome.
    pub async fn upload_new_file(
        &self,
        owner: &ObjectId,
        file: Option<LocalFile>,
    ) -> AppResult<FileResponse> {
        let result = self.store_upload(owner, file.as_ref()).await;
        if let Some(file) = file {
            file.discard().await;
        }
        result
    }

    async fn store_upload(&self, owner: &ObjectId, file: Option<&LocalFile>) -> AppResult<FileResponse> {
        const FAILED: &str = "Error while uploading file";

        self.require_owner(owner, FAILED, "User profile not available").await?;
        let file = file.ok_or_else(|| AppError::validation("File is required"))?;

        let asset = self.media.upload(file).await.or_upstream(FAILED)?;

        let record = FileRecord::new(
            *owner,
            vec![FileDetail {
                name: asset.original_filename,
                url: asset.secure_url,
                public_id: asset.public_id.clone(),
                content_type: asset.format,
                size: asset.bytes,
                resource_type: asset.resource_type.clone(),
            }],
        );

        let created = match self.files.create(record).await {
            Ok(created) => created,
            Err(e) => {
                // Nothing references the hosted copy now; take it back down.
                if let Err(destroy_err) = self
                    .media
                    .destroy(&asset.public_id, &asset.resource_type)
                    .await
                {
                    tracing::warn!(
                        "Could not remove unrecorded upload {}: {}",
                        asset.public_id,
                        destroy_err
                    );
                }
                return Err(AppError::internal(FAILED, e));
            }
        };

        tracing::info!("User {} uploaded {}", owner, asset.public_id);
        Ok(FileResponse::from(&created))
    }

    pub async fn edit_file_name(
        &self,
        owner: &ObjectId,
        request: RenameFileRequest,
    ) -> AppResult<FileResponse> {
        const FAILED: &str = "Error while updating file details";

        let (Some(public_id), Some(name)) = (
            required(request.public_id.as_deref()),
            required(request.name.as_deref()),
        ) else {
            return Err(AppError::validation("All fields are required"));
        };
        if name.chars().count() > MAX_FILE_NAME_LEN {
            return Err(AppError::validation(format!(
                "Name must be at most {} characters",
                MAX_FILE_NAME_LEN
            )));
        }

        let filter = FileFilter::OwnedPublicId {
            owner: *owner,
            public_id: public_id.to_string(),
        };
        let existing = self
            .files
            .find_one(&filter)
            .await
            .or_internal(FAILED)?
            .ok_or_else(|| AppError::not_found("File does not exist"))?;
        let Some(id) = existing.id else {
            return Err(AppError::not_found("File does not exist"));
        };

        let patch = FilePatch::RenameDetail {
            public_id: public_id.to_string(),
            name: name.to_string(),
        };
        let updated = self
            .files
            .find_by_id_and_update(&id, &patch, true)
            .await
            .or_internal(FAILED)?
            .ok_or_else(|| AppError::not_found("File does not exist"))?;

        tracing::info!("User {} renamed {} to {:?}", owner, public_id, name);
        Ok(FileResponse::from(&updated))
    }

    /// Remote copy first, then the record. A remote failure leaves the record
    /// marked `pending_delete` for [`FileService::purge_pending_deletes`].
    pub async fn delete_file(&self, owner: &ObjectId, request: DeleteFileRequest) -> AppResult<()> {
        const FAILED: &str = "Error while deleting file";

        let public_id = required(request.public_id.as_deref())
            .ok_or_else(|| AppError::validation("Id is required"))?;

        let filter = FileFilter::OwnedPublicId {
            owner: *owner,
            public_id: public_id.to_string(),
        };
        let existing = self.files.find_one(&filter).await.or_internal(FAILED)?;

        let resource_type = match &existing {
            Some(record) => {
                if let Some(id) = &record.id {
                    self.files
                        .find_by_id_and_update(id, &FilePatch::PendingDelete(true), false)
                        .await
                        .or_internal(FAILED)?;
                }
                record
                    .detail(public_id)
                    .map(|d| d.resource_type.clone())
                    .unwrap_or_else(default_resource_type)
            }
            None => {
                // Never touch another user's hosted asset.
                let foreign = self
                    .files
                    .find_one(&FileFilter::PublicId(public_id.to_string()))
                    .await
                    .or_internal(FAILED)?;
                if foreign.is_some() {
                    return Err(AppError::not_found("File does not exist"));
                }
                default_resource_type()
            }
        };

        let outcome = self
            .media
            .destroy(public_id, &resource_type)
            .await
            .or_upstream(FAILED)?;
        if outcome == DestroyOutcome::NotFound {
            tracing::debug!("Media host had no asset {}", public_id);
        }

        match self.files.find_one_and_delete(&filter).await.or_internal(FAILED)? {
            Some(_) => {
                tracing::info!("User {} deleted {}", owner, public_id);
                Ok(())
            }
            None => Err(AppError::not_found("File does not exist")),
        }
    }

    /// Zero matches is reported as 404, unlike [`FileService::get_file_by_user`].
    pub async fn search_files_by_name(
        &self,
        owner: &ObjectId,
        query: SearchFilesQuery,
    ) -> AppResult<Vec<FileResponse>> {
        const FAILED: &str = "Error while retrieving files";

        let name = required(query.name.as_deref())
            .ok_or_else(|| AppError::validation("Search term is required"))?;
        self.require_owner(owner, FAILED, "User not found").await?;

        let files: Vec<FileRecord> = self
            .files
            .find(&FileFilter::OwnerNameContains {
                owner: *owner,
                pattern: name.to_string(),
            })
            .await
            .or_internal(FAILED)?
            .try_collect()
            .await
            .or_internal(FAILED)?;

        if files.is_empty() {
            return Err(AppError::not_found("No files found"));
        }

        Ok(files.iter().map(FileResponse::from).collect())
    }

    pub async fn get_file_by_user(&self, owner: &ObjectId) -> AppResult<Vec<FileResponse>> {
        const FAILED: &str = "Error while fetching data";

        let files: Vec<FileRecord> = self
            .files
            .find(&FileFilter::Owner(*owner))
            .await
            .or_internal(FAILED)?
            .try_collect()
            .await
            .or_internal(FAILED)?;

        Ok(files.iter().map(FileResponse::from).collect())
    }

    /// Finish deletes interrupted by a media host failure. Returns how many
    /// records were removed; failures stay marked for the next sweep.
    pub async fn purge_pending_deletes(&self) -> anyhow::Result<usize> {
        let pending: Vec<FileRecord> = self
            .files
            .find(&FileFilter::PendingDelete)
            .await?
            .try_collect()
            .await?;

        let mut purged = 0;
        'records: for record in pending {
            let Some(id) = record.id else { continue };

            for detail in &record.file_details {
                if let Err(e) = self
                    .media
                    .destroy(&detail.public_id, &detail.resource_type)
                    .await
                {
                    tracing::warn!("Pending delete of {} failed again: {}", detail.public_id, e);
                    continue 'records;
                }
            }

            if self.files.find_one_and_delete(&FileFilter::Id(id)).await?.is_some() {
                purged += 1;
            }
        }

        if purged > 0 {
            tracing::info!("Purged {} pending file deletes", purged);
        }
        Ok(purged)
    }
}
