use axum::{
    extract::DefaultBodyLimit,
    handler::HandlerWithoutStateExt,
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    handlers::{file, user},
    middleware::{
        failure::{method_not_allowed, panic_response, route_not_found},
        AuthMiddleware,
    },
    ApiDoc, AppState,
};

/// `*` mirrors the caller's origin so credentialed requests still work;
/// anything else is a comma separated allow list.
fn cors_layer(origin: &str) -> CorsLayer {
    let allow_origin = if origin.trim() == "*" {
        AllowOrigin::mirror_request()
    } else {
        let origins: Vec<HeaderValue> = origin
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .filter_map(|o| match o.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin {:?}", o);
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}

pub fn create_router(state: AppState) -> Router {
    let config = state.config.clone();
    let json_limit = DefaultBodyLimit::max(config.server.json_body_limit);
    let upload_limit = DefaultBodyLimit::max(config.server.upload_body_limit);

    // Public account routes - no authentication required
    let public_user_routes = Router::new()
        .route("/api/v1/users/register", post(user::register).fallback(method_not_allowed))
        .route("/api/v1/users/login", post(user::login).fallback(method_not_allowed))
        .route(
            "/api/v1/users/refresh-token",
            post(user::refresh_access_token).fallback(method_not_allowed),
        )
        .layer(json_limit);

    // Protected account routes
    let protected_user_routes = Router::new()
        .route("/api/v1/users/logout", post(user::logout).fallback(method_not_allowed))
        .route(
            "/api/v1/users/change-password",
            post(user::change_current_password).fallback(method_not_allowed),
        )
        .route(
            "/api/v1/users/current-user",
            get(user::get_current_user).fallback(method_not_allowed),
        )
        .route(
            "/api/v1/users/update-account",
            patch(user::update_account_details).fallback(method_not_allowed),
        )
        .layer(json_limit)
        .merge(
            Router::new()
                .route(
                    "/api/v1/users/avatar",
                    patch(user::update_user_avatar).fallback(method_not_allowed),
                )
                .layer(upload_limit),
        )
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            AuthMiddleware::auth_middleware,
        ));

    // Protected file routes
    let file_routes = Router::new()
        .route(
            "/api/v1/files",
            get(file::get_file_by_user)
                .delete(file::delete_file)
                .fallback(method_not_allowed),
        )
        .route("/api/v1/files/rename", patch(file::edit_file_name).fallback(method_not_allowed))
        .route("/api/v1/files/search", get(file::search_files_by_name).fallback(method_not_allowed))
        .layer(json_limit)
        .merge(
            Router::new()
                .route("/api/v1/files/upload", post(file::upload_file).fallback(method_not_allowed))
                .layer(upload_limit),
        )
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            AuthMiddleware::auth_middleware,
        ));

    // API Documentation - Swagger UI
    let api_docs_routes =
        SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi());

    // Static files; anything else is an enveloped 404
    let static_files = ServeDir::new(&config.server.static_dir)
        .call_fallback_on_method_not_allowed(true)
        .not_found_service(route_not_found.into_service());

    Router::new()
        .merge(public_user_routes)
        .merge(protected_user_routes)
        .merge(file_routes)
        .merge(api_docs_routes)
        .fallback_service(static_files)
        .with_state(state)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.server.cors_origin))
}
