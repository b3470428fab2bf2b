use std::path::Path;

use axum::extract::State;

use crate::{
    dto::{
        file::{DeleteFileRequest, FileResponse, RenameFileRequest, SearchFilesQuery},
        response::{ApiErrorBody, ApiResponse, Empty},
    },
    error::AppResult,
    extractors::{ApiJson, ApiMultipart, ApiQuery},
    middleware::AuthUser,
    utils::spool_upload,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/v1/files/upload",
    request_body(content_type = "multipart/form-data", description = "Form with a `file` part"),
    responses(
        (status = 200, description = "File uploaded successfully", body = FileResponse),
        (status = 400, description = "File is required", body = ApiErrorBody),
        (status = 404, description = "User profile not available", body = ApiErrorBody),
        (status = 500, description = "Error while uploading file", body = ApiErrorBody)
    ),
    tag = "file"
)]
pub async fn upload_file(
    State(state): State<AppState>,
    user: AuthUser,
    ApiMultipart(multipart): ApiMultipart,
) -> AppResult<ApiResponse<FileResponse>> {
    let file = spool_upload(multipart, "file", Path::new(&state.config.server.temp_dir)).await?;
    let created = state.file_service.upload_new_file(&user.id, file).await?;
    Ok(ApiResponse::ok(created, "File uploaded successfully"))
}

#[utoipa::path(
    patch,
    path = "/api/v1/files/rename",
    request_body = RenameFileRequest,
    responses(
        (status = 200, description = "File details updated successfully", body = FileResponse),
        (status = 400, description = "All fields are required", body = ApiErrorBody),
        (status = 404, description = "File does not exist", body = ApiErrorBody),
        (status = 500, description = "Error while updating file details", body = ApiErrorBody)
    ),
    tag = "file"
)]
pub async fn edit_file_name(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(request): ApiJson<RenameFileRequest>,
) -> AppResult<ApiResponse<FileResponse>> {
    let updated = state.file_service.edit_file_name(&user.id, request).await?;
    Ok(ApiResponse::ok(updated, "File details updated successfully"))
}

#[utoipa::path(
    delete,
    path = "/api/v1/files",
    request_body = DeleteFileRequest,
    responses(
        (status = 200, description = "File deleted successfully", body = Empty),
        (status = 400, description = "Id is required", body = ApiErrorBody),
        (status = 404, description = "File does not exist", body = ApiErrorBody),
        (status = 500, description = "Error while deleting file", body = ApiErrorBody)
    ),
    tag = "file"
)]
pub async fn delete_file(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(request): ApiJson<DeleteFileRequest>,
) -> AppResult<ApiResponse<Empty>> {
    state.file_service.delete_file(&user.id, request).await?;
    Ok(ApiResponse::ok(Empty::default(), "File deleted successfully"))
}

#[utoipa::path(
    get,
    path = "/api/v1/files/search",
    params(SearchFilesQuery),
    responses(
        (status = 200, description = "Files retrieved successfully", body = [FileResponse]),
        (status = 400, description = "Search term is required", body = ApiErrorBody),
        (status = 404, description = "No files found", body = ApiErrorBody)
    ),
    tag = "file"
)]
pub async fn search_files_by_name(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<SearchFilesQuery>,
) -> AppResult<ApiResponse<Vec<FileResponse>>> {
    let files = state.file_service.search_files_by_name(&user.id, query).await?;
    Ok(ApiResponse::ok(files, "Files retrieved successfully"))
}

#[utoipa::path(
    get,
    path = "/api/v1/files",
    responses(
        (status = 200, description = "Data fetched successfully", body = [FileResponse]),
        (status = 500, description = "Error while fetching data", body = ApiErrorBody)
    ),
    tag = "file"
)]
pub async fn get_file_by_user(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<ApiResponse<Vec<FileResponse>>> {
    let files = state.file_service.get_file_by_user(&user.id).await?;
    Ok(ApiResponse::ok(files, "Data fetched successfully"))
}
