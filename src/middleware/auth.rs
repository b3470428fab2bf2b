use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use mongodb::bson::oid::ObjectId;

use crate::{error::AppError, services::auth::AuthService, AppState};

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

/// Identity of the caller, set by [`AuthMiddleware::auth_middleware`] and
/// taken by handlers as a parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: ObjectId,
    pub username: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| AppError::unauthorized("Unauthorized request"))
    }
}

pub struct AuthMiddleware;

impl AuthMiddleware {
    pub async fn auth_middleware(
        State(state): State<AppState>,
        mut request: Request,
        next: Next,
    ) -> Response {
        let token = match extract_token_from_headers(request.headers()) {
            Some(token) => token,
            None => {
                tracing::debug!("No auth token found in headers");
                return AppError::unauthorized("Unauthorized request").into_response();
            }
        };

        let claims = match state.auth.validate_access_token(&token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::warn!("Token validation failed: {}", e);
                return AppError::unauthorized("Invalid access token").into_response();
            }
        };

        let id = match AuthService::subject_id(&claims) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!("Token validation failed: {}", e);
                return AppError::unauthorized("Invalid access token").into_response();
            }
        };
        tracing::debug!("Token validation successful for user: {}", claims.username);

        request.extensions_mut().insert(AuthUser {
            id,
            username: claims.username,
        });

        next.run(request).await
    }
}

/// Bearer token from the `Authorization` header, else the access token cookie.
pub fn extract_token_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        if let Ok(header_str) = auth_header.to_str() {
            if let Some(token) = header_str.strip_prefix("Bearer ") {
                let token = token.trim();
                if !token.is_empty() {
                    return Some(token.to_string());
                }
            }
        }
    }

    cookie_value(headers, ACCESS_TOKEN_COOKIE)
}

pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|cookie| cookie.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}
