use std::sync::Arc;

use mongodb::bson::oid::ObjectId;

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest, TokenPair},
        required,
        user::{ChangePasswordRequest, UpdateAccountRequest, UserResponse},
    },
    error::{AppError, AppResult, OrAppError},
    models::user::{normalize_identifier, Avatar, User},
    repositories::{RepositoryError, UserFilter, UserPatch, UserRepository},
    services::{auth::AuthService, media::MediaStore},
    utils::LocalFile,
};

const MIN_PASSWORD_LEN: usize = 8;

/// Account operations: registration, session tokens and profile changes.
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
    media: Arc<dyn MediaStore>,
    auth: Arc<AuthService>,
}

fn check_email(email: &str) -> AppResult<()> {
    let valid = email
        .split_once('@')
        .map(|(local, domain)| !local.is_empty() && !domain.is_empty())
        .unwrap_or(false);
    if valid {
        Ok(())
    } else {
        Err(AppError::validation("Invalid email address"))
    }
}

fn check_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        media: Arc<dyn MediaStore>,
        auth: Arc<AuthService>,
    ) -> Self {
        Self { users, media, auth }
    }

    async fn require_user(&self, id: &ObjectId, message: &str) -> AppResult<User> {
        self.users
            .find_by_id(id)
            .await
            .or_internal(message)?
            .ok_or_else(|| AppError::not_found("User does not exist"))
    }

    /// Issue a token pair and remember the refresh token on the user.
    async fn issue_tokens(&self, user: &User, message: &str) -> AppResult<(User, TokenPair)> {
        let id = user
            .id
            .ok_or_else(|| AppError::not_found("User does not exist"))?;
        let pair = self.auth.generate_token_pair(user).or_internal(message)?;

        let patch = UserPatch {
            refresh_token: Some(Some(pair.refresh_token.clone())),
            ..UserPatch::default()
        };
        let updated = self
            .users
            .find_by_id_and_update(&id, &patch, true)
            .await
            .or_internal(message)?
            .ok_or_else(|| AppError::not_found("User does not exist"))?;

        Ok((updated, pair))
    }

    pub async fn register(&self, request: RegisterRequest) -> AppResult<UserResponse> {
        const FAILED: &str = "Something went wrong while registering the user";

        let (Some(username), Some(email), Some(full_name), Some(password)) = (
            required(request.username.as_deref()),
            required(request.email.as_deref()),
            required(request.full_name.as_deref()),
            request.password.as_deref().filter(|p| !p.is_empty()),
        ) else {
            return Err(AppError::validation("All fields are required"));
        };
        check_email(email)?;
        check_password(password)?;

        let filter = UserFilter::UsernameOrEmail {
            username: normalize_identifier(username),
            email: normalize_identifier(email),
        };
        if self.users.find_one(&filter).await.or_internal(FAILED)?.is_some() {
            return Err(AppError::Conflict(
                "User with email or username already exists".into(),
            ));
        }

        let password_hash = self.auth.hash_password(password).await.or_internal(FAILED)?;
        let created = match self
            .users
            .create(User::new(username, email, full_name, password_hash))
            .await
        {
            Ok(user) => user,
            Err(RepositoryError::Duplicate(_)) => {
                return Err(AppError::Conflict(
                    "User with email or username already exists".into(),
                ))
            }
            Err(e) => return Err(AppError::internal(FAILED, e)),
        };

        tracing::info!("Registered user {}", created.username);
        Ok(UserResponse::from(&created))
    }

    pub async fn login(&self, request: LoginRequest) -> AppResult<LoginResponse> {
        const FAILED: &str = "Something went wrong while logging in";

        let identifier = required(request.username.as_deref())
            .or_else(|| required(request.email.as_deref()))
            .ok_or_else(|| AppError::validation("Username or email is required"))?;
        let password = request
            .password
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| AppError::validation("Password is required"))?;

        let identifier = normalize_identifier(identifier);
        let user = self
            .users
            .find_one(&UserFilter::UsernameOrEmail {
                username: identifier.clone(),
                email: identifier,
            })
            .await
            .or_internal(FAILED)?
            .ok_or_else(|| AppError::not_found("User does not exist"))?;

        let valid = self
            .auth
            .verify_password(password, &user.password_hash)
            .await
            .or_internal(FAILED)?;
        if !valid {
            tracing::warn!("Failed login for {}", user.username);
            return Err(AppError::unauthorized("Invalid user credentials"));
        }

        let (user, pair) = self.issue_tokens(&user, FAILED).await?;
        tracing::info!("User {} logged in", user.username);

        Ok(LoginResponse {
            user: UserResponse::from(&user),
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        })
    }

    pub async fn logout(&self, user_id: &ObjectId) -> AppResult<()> {
        let patch = UserPatch {
            refresh_token: Some(None),
            ..UserPatch::default()
        };
        self.users
            .find_by_id_and_update(user_id, &patch, true)
            .await
            .or_internal("Something went wrong while logging out")?
            .ok_or_else(|| AppError::not_found("User does not exist"))?;

        tracing::info!("User {} logged out", user_id);
        Ok(())
    }

    /// Rotate the session. Only the most recently issued refresh token is
    /// accepted; anything else forces a new login.
    pub async fn refresh_access_token(&self, token: Option<&str>) -> AppResult<TokenPair> {
        let token = required(token).ok_or_else(|| AppError::unauthorized("Unauthorized request"))?;

        let claims = self.auth.validate_refresh_token(token).map_err(|e| {
            tracing::warn!("Refresh token rejected: {}", e);
            AppError::unauthorized("Invalid refresh token")
        })?;
        let user_id = AuthService::subject_id(&claims)
            .map_err(|_| AppError::unauthorized("Invalid refresh token"))?;

        let user = self
            .users
            .find_by_id(&user_id)
            .await
            .or_internal("Error while refreshing access token")?
            .ok_or_else(|| AppError::unauthorized("Invalid refresh token"))?;

        if user.refresh_token.as_deref() != Some(token) {
            tracing::warn!("Stale refresh token presented for {}", user.username);
            return Err(AppError::unauthorized("Refresh token is expired or used"));
        }

        let (_, pair) = self
            .issue_tokens(&user, "Error while refreshing access token")
            .await?;
        Ok(pair)
    }

    pub async fn change_current_password(
        &self,
        user_id: &ObjectId,
        request: ChangePasswordRequest,
    ) -> AppResult<()> {
        const FAILED: &str = "Error while changing password";

        let (Some(old_password), Some(new_password)) = (
            request.old_password.as_deref().filter(|p| !p.is_empty()),
            request.new_password.as_deref().filter(|p| !p.is_empty()),
        ) else {
            return Err(AppError::validation("All fields are required"));
        };
        check_password(new_password)?;

        let user = self.require_user(user_id, FAILED).await?;
        let valid = self
            .auth
            .verify_password(old_password, &user.password_hash)
            .await
            .or_internal(FAILED)?;
        if !valid {
            return Err(AppError::validation("Invalid old password"));
        }

        let password_hash = self.auth.hash_password(new_password).await.or_internal(FAILED)?;
        let patch = UserPatch {
            password_hash: Some(password_hash),
            ..UserPatch::default()
        };
        self.users
            .find_by_id_and_update(user_id, &patch, true)
            .await
            .or_internal(FAILED)?
            .ok_or_else(|| AppError::not_found("User does not exist"))?;

        tracing::info!("User {} changed password", user.username);
        Ok(())
    }

    pub async fn get_current_user(&self, user_id: &ObjectId) -> AppResult<UserResponse> {
        let user = self
            .require_user(user_id, "Error while fetching current user")
            .await?;
        Ok(UserResponse::from(&user))
    }

    pub async fn update_account_details(
        &self,
        user_id: &ObjectId,
        request: UpdateAccountRequest,
    ) -> AppResult<UserResponse> {
        const FAILED: &str = "Error while updating account details";

        let (Some(full_name), Some(email)) = (
            required(request.full_name.as_deref()),
            required(request.email.as_deref()),
        ) else {
            return Err(AppError::validation("All fields are required"));
        };
        check_email(email)?;

        let patch = UserPatch {
            full_name: Some(full_name.to_string()),
            email: Some(normalize_identifier(email)),
            ..UserPatch::default()
        };
        let updated = match self.users.find_by_id_and_update(user_id, &patch, true).await {
            Ok(Some(user)) => user,
            Ok(None) => return Err(AppError::not_found("User does not exist")),
            Err(RepositoryError::Duplicate(_)) => {
                return Err(AppError::Conflict("Email is already in use".into()))
            }
            Err(e) => return Err(AppError::internal(FAILED, e)),
        };

        tracing::info!("User {} updated account details", updated.username);
        Ok(UserResponse::from(&updated))
    }

    /// The spooled copy is removed whatever the outcome.
    pub async fn update_user_avatar(
        &self,
        user_id: &ObjectId,
        file: Option<LocalFile>,
    ) -> AppResult<UserResponse> {
        let result = self.store_avatar(user_id, file.as_ref()).await;
        if let Some(file) = file {
            file.discard().await;
        }
        result
    }

    async fn store_avatar(&self, user_id: &ObjectId, file: Option<&LocalFile>) -> AppResult<UserResponse> {
        const FAILED: &str = "Error while uploading avatar";

        let file = file.ok_or_else(|| AppError::validation("Avatar file is missing"))?;
        let user = self.require_user(user_id, FAILED).await?;

        let asset = self.media.upload(file).await.or_upstream(FAILED)?;
        let avatar = Avatar {
            url: asset.secure_url,
            public_id: asset.public_id,
            resource_type: asset.resource_type,
        };
        let patch = UserPatch {
            avatar: Some(avatar.clone()),
            ..UserPatch::default()
        };

        let updated = match self.users.find_by_id_and_update(user_id, &patch, true).await {
            Ok(Some(updated)) => updated,
            outcome => {
                if let Err(e) = self.media.destroy(&avatar.public_id, &avatar.resource_type).await {
                    tracing::warn!("Could not remove unrecorded avatar {}: {}", avatar.public_id, e);
                }
                return match outcome {
                    Err(e) => Err(AppError::internal(FAILED, e)),
                    _ => Err(AppError::not_found("User does not exist")),
                };
            }
        };

        if let Some(previous) = user.avatar {
            if let Err(e) = self
                .media
                .destroy(&previous.public_id, &previous.resource_type)
                .await
            {
                tracing::warn!("Could not remove previous avatar {}: {}", previous.public_id, e);
            }
        }

        tracing::info!("User {} updated avatar", updated.username);
        Ok(UserResponse::from(&updated))
    }
}
