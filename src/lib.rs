pub mod config;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod router;
pub mod services;
pub mod utils;

use std::sync::Arc;

use utoipa::OpenApi;

pub use config::AppConfig;
pub use router::create_router;
pub use services::{auth::AuthService, file::FileService, user::UserService};

use repositories::{FileRepository, UserRepository};
use services::media::MediaStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth: Arc<AuthService>,
    pub file_service: Arc<FileService>,
    pub user_service: Arc<UserService>,
}

impl AppState {
    /// Wire the services over the given stores.
    pub fn new(
        config: Arc<AppConfig>,
        users: Arc<dyn UserRepository>,
        files: Arc<dyn FileRepository>,
        media: Arc<dyn MediaStore>,
    ) -> Self {
        let auth = Arc::new(AuthService::new(&config.auth));
        let file_service = Arc::new(FileService::new(files, users.clone(), media.clone()));
        let user_service = Arc::new(UserService::new(users, media, auth.clone()));

        Self {
            config,
            auth,
            file_service,
            user_service,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::user::register,
        handlers::user::login,
        handlers::user::logout,
        handlers::user::refresh_access_token,
        handlers::user::change_current_password,
        handlers::user::get_current_user,
        handlers::user::update_account_details,
        handlers::user::update_user_avatar,
        handlers::file::upload_file,
        handlers::file::edit_file_name,
        handlers::file::delete_file,
        handlers::file::search_files_by_name,
        handlers::file::get_file_by_user,
    ),
    components(schemas(
        dto::response::ApiErrorBody,
        dto::response::Empty,
        dto::auth::RegisterRequest,
        dto::auth::LoginRequest,
        dto::auth::RefreshTokenRequest,
        dto::auth::TokenPair,
        dto::auth::LoginResponse,
        dto::user::UserResponse,
        dto::user::ChangePasswordRequest,
        dto::user::UpdateAccountRequest,
        dto::file::FileResponse,
        dto::file::FileDetailResponse,
        dto::file::RenameFileRequest,
        dto::file::DeleteFileRequest,
    )),
    tags(
        (name = "user", description = "Accounts and sessions"),
        (name = "file", description = "File management API")
    )
)]
pub struct ApiDoc;
