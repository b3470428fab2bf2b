//! Extractors whose rejections render as the error envelope.

use axum::{
    async_trait,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{BytesRejection, JsonRejection, QueryRejection},
        FromRequest, FromRequestParts, Multipart, Query, Request,
    },
    body::Bytes,
    http::{request::Parts, StatusCode},
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::AppError;

pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> AppError {
    let status = rejection.status();
    tracing::debug!("Rejected JSON body: {}", rejection.body_text());
    match status {
        StatusCode::PAYLOAD_TOO_LARGE => AppError::PayloadTooLarge("Request body too large".into()),
        StatusCode::UNSUPPORTED_MEDIA_TYPE => {
            AppError::validation("Expected request with `Content-Type: application/json`")
        }
        _ => AppError::validation("Invalid JSON request body"),
    }
}

/// Raw body buffered under the route's body limit.
pub struct ApiBytes(pub Bytes);

#[async_trait]
impl<S> FromRequest<S> for ApiBytes
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Bytes::from_request(req, state)
            .await
            .map(ApiBytes)
            .map_err(|rejection: BytesRejection| {
                tracing::debug!("Rejected request body: {}", rejection.body_text());
                match rejection.status() {
                    StatusCode::PAYLOAD_TOO_LARGE => {
                        AppError::PayloadTooLarge("Request body too large".into())
                    }
                    _ => AppError::validation("Invalid request body"),
                }
            })
    }
}

pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| ApiQuery(value))
            .map_err(|rejection: QueryRejection| {
                tracing::debug!("Rejected query string: {}", rejection.body_text());
                AppError::validation("Invalid query string")
            })
    }
}

/// Multipart extractor with envelope rejections.
pub struct ApiMultipart(pub Multipart);

#[async_trait]
impl<S> FromRequest<S> for ApiMultipart
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Multipart::from_request(req, state)
            .await
            .map(ApiMultipart)
            .map_err(|rejection: MultipartRejection| {
                tracing::debug!("Rejected multipart request: {}", rejection.body_text());
                AppError::validation("Expected a multipart/form-data request")
            })
    }
}

pub fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Uploaded file too large".into())
    } else {
        AppError::validation(format!("Malformed multipart body: {}", err.body_text()))
    }
}
