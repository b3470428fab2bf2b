use std::path::Path;

use axum::{
    extract::State,
    http::header::{HeaderMap, HeaderValue, SET_COOKIE},
};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, RefreshTokenRequest, RegisterRequest, TokenPair},
        response::{ApiErrorBody, ApiResponse, Empty},
        user::{ChangePasswordRequest, UpdateAccountRequest, UserResponse},
    },
    error::{AppError, AppResult, OrAppError},
    extractors::{ApiBytes, ApiJson, ApiMultipart},
    middleware::{
        auth::{cookie_value, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE},
        AuthUser,
    },
    services::auth::AuthService,
    utils::spool_upload,
    AppState,
};

fn cookie(name: &str, value: &str, max_age: i64, secure: bool) -> AppResult<HeaderValue> {
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        name, value, max_age
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).or_internal("Could not build session cookie")
}

fn session_cookies(pair: &TokenPair, auth: &AuthService, secure: bool) -> AppResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.append(
        SET_COOKIE,
        cookie(ACCESS_TOKEN_COOKIE, &pair.access_token, auth.access_ttl_secs(), secure)?,
    );
    headers.append(
        SET_COOKIE,
        cookie(REFRESH_TOKEN_COOKIE, &pair.refresh_token, auth.refresh_ttl_secs(), secure)?,
    );
    Ok(headers)
}

fn cleared_cookies(secure: bool) -> AppResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.append(SET_COOKIE, cookie(ACCESS_TOKEN_COOKIE, "", 0, secure)?);
    headers.append(SET_COOKIE, cookie(REFRESH_TOKEN_COOKIE, "", 0, secure)?);
    Ok(headers)
}

#[utoipa::path(
    post,
    path = "/api/v1/users/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered successfully", body = UserResponse),
        (status = 400, description = "All fields are required", body = ApiErrorBody),
        (status = 409, description = "User with email or username already exists", body = ApiErrorBody)
    ),
    tag = "user"
)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> AppResult<ApiResponse<UserResponse>> {
    let user = state.user_service.register(request).await?;
    Ok(ApiResponse::created(user, "User registered successfully"))
}

#[utoipa::path(
    post,
    path = "/api/v1/users/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "User logged in successfully", body = LoginResponse),
        (status = 400, description = "Username or email is required", body = ApiErrorBody),
        (status = 401, description = "Invalid user credentials", body = ApiErrorBody),
        (status = 404, description = "User does not exist", body = ApiErrorBody)
    ),
    tag = "user"
)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> AppResult<(HeaderMap, ApiResponse<LoginResponse>)> {
    let session = state.user_service.login(request).await?;
    let pair = TokenPair {
        access_token: session.access_token.clone(),
        refresh_token: session.refresh_token.clone(),
    };
    let headers = session_cookies(&pair, &state.auth, state.config.auth.secure_cookies)?;

    Ok((headers, ApiResponse::ok(session, "User logged in successfully")))
}

#[utoipa::path(
    post,
    path = "/api/v1/users/logout",
    responses(
        (status = 200, description = "User logged out", body = Empty),
        (status = 401, description = "Unauthorized request", body = ApiErrorBody)
    ),
    tag = "user"
)]
pub async fn logout(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<(HeaderMap, ApiResponse<Empty>)> {
    state.user_service.logout(&user.id).await?;
    let headers = cleared_cookies(state.config.auth.secure_cookies)?;
    Ok((headers, ApiResponse::ok(Empty::default(), "User logged out")))
}

/// Accepts the refresh token from its cookie or from a JSON body.
#[utoipa::path(
    post,
    path = "/api/v1/users/refresh-token",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "Access token refreshed", body = TokenPair),
        (status = 401, description = "Invalid refresh token", body = ApiErrorBody),
        (status = 413, description = "Request body too large", body = ApiErrorBody)
    ),
    tag = "user"
)]
pub async fn refresh_access_token(
    State(state): State<AppState>,
    request_headers: HeaderMap,
    ApiBytes(body): ApiBytes,
) -> AppResult<(HeaderMap, ApiResponse<TokenPair>)> {
    let token = match cookie_value(&request_headers, REFRESH_TOKEN_COOKIE) {
        Some(token) => Some(token),
        None if body.iter().all(u8::is_ascii_whitespace) => None,
        None => {
            let request: RefreshTokenRequest = serde_json::from_slice(&body)
                .map_err(|_| AppError::validation("Invalid JSON request body"))?;
            request.refresh_token
        }
    };

    let pair = state.user_service.refresh_access_token(token.as_deref()).await?;
    let headers = session_cookies(&pair, &state.auth, state.config.auth.secure_cookies)?;

    Ok((headers, ApiResponse::ok(pair, "Access token refreshed")))
}

#[utoipa::path(
    post,
    path = "/api/v1/users/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed successfully", body = Empty),
        (status = 400, description = "Invalid old password", body = ApiErrorBody)
    ),
    tag = "user"
)]
pub async fn change_current_password(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(request): ApiJson<ChangePasswordRequest>,
) -> AppResult<ApiResponse<Empty>> {
    state.user_service.change_current_password(&user.id, request).await?;
    Ok(ApiResponse::ok(Empty::default(), "Password changed successfully"))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/current-user",
    responses(
        (status = 200, description = "User fetched successfully", body = UserResponse),
        (status = 401, description = "Unauthorized request", body = ApiErrorBody)
    ),
    tag = "user"
)]
pub async fn get_current_user(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<ApiResponse<UserResponse>> {
    let current = state.user_service.get_current_user(&user.id).await?;
    Ok(ApiResponse::ok(current, "User fetched successfully"))
}

#[utoipa::path(
    patch,
    path = "/api/v1/users/update-account",
    request_body = UpdateAccountRequest,
    responses(
        (status = 200, description = "Account details updated successfully", body = UserResponse),
        (status = 400, description = "All fields are required", body = ApiErrorBody),
        (status = 409, description = "Email is already in use", body = ApiErrorBody)
    ),
    tag = "user"
)]
pub async fn update_account_details(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(request): ApiJson<UpdateAccountRequest>,
) -> AppResult<ApiResponse<UserResponse>> {
    let updated = state.user_service.update_account_details(&user.id, request).await?;
    Ok(ApiResponse::ok(updated, "Account details updated successfully"))
}

#[utoipa::path(
    patch,
    path = "/api/v1/users/avatar",
    request_body(content_type = "multipart/form-data", description = "Form with an `avatar` part"),
    responses(
        (status = 200, description = "Avatar image updated successfully", body = UserResponse),
        (status = 400, description = "Avatar file is missing", body = ApiErrorBody),
        (status = 500, description = "Error while uploading avatar", body = ApiErrorBody)
    ),
    tag = "user"
)]
pub async fn update_user_avatar(
    State(state): State<AppState>,
    user: AuthUser,
    ApiMultipart(multipart): ApiMultipart,
) -> AppResult<ApiResponse<UserResponse>> {
    let file = spool_upload(multipart, "avatar", Path::new(&state.config.server.temp_dir)).await?;
    let updated = state.user_service.update_user_avatar(&user.id, file).await?;
    Ok(ApiResponse::ok(updated, "Avatar image updated successfully"))
}
