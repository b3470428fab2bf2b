use std::any::Any;

use axum::{
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};

use crate::dto::response::ApiErrorBody;

/// Panic handler for `CatchPanicLayer`.
///
/// A panicking handler must still answer with the error envelope instead of
/// dropping the connection.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    tracing::error!("Handler panicked: {}", detail);

    ApiErrorBody::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
}

/// Fallback for unmatched routes.
pub async fn route_not_found(uri: Uri) -> Response {
    tracing::debug!("No route for {}", uri.path());
    ApiErrorBody::new(StatusCode::NOT_FOUND, format!("Route {} not found", uri.path()))
        .into_response()
}

/// Method fallback for known paths, so a wrong verb still gets the envelope.
pub async fn method_not_allowed(method: Method, uri: Uri) -> Response {
    tracing::debug!("{} not allowed on {}", method, uri.path());
    ApiErrorBody::new(
        StatusCode::METHOD_NOT_ALLOWED,
        format!("Method {} not allowed on {}", method, uri.path()),
    )
    .into_response()
}
