use axum::handler::HandlerWithoutStateExt;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, get_service, post};
use axum::{Router, middleware};
use std::path::Path;
use tower_http::services::{ServeDir, ServeFile};
use tracing::error;

use crate::error::ErrorInfo;
use crate::run::AppState;

use super::middleware::{auth_middleware, form_middleware, require_auth_middleware};
use super::security_headers::add_security_headers;
use super::tokens::{
    cancel_token_handler, new_token_page_handler, post_create_token_handler, token_form_handler,
};
use super::{error_handler, handle_error};

pub fn all_routes(state: AppState, frontend_dir: &Path) -> Router {
    Router::new()
        .merge(private_routes(state))
        .merge(assets_routes(frontend_dir))
        .fallback(error_handler)
        .layer(middleware::from_fn(add_security_headers))
}

pub fn assets_routes(dir: &Path) -> Router {
    let target_dir = dir.join("public");
    Router::new()
        .route(
            "/favicon.ico",
            get_service(ServeFile::new(target_dir.join("favicon.ico"))),
        )
        .nest_service(
            "/assets",
            get_service(
                ServeDir::new(target_dir.join("assets"))
                    .not_found_service(file_not_found.into_service()),
            ),
        )
}

async fn file_not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "File not found")
}

pub fn private_routes(state: AppState) -> Router {
    Router::new()
        .nest("/settings/tokens/new", new_token_routes(state.clone()))
        .route_layer(middleware::from_fn(require_auth_middleware))
        .route_layer(middleware::from_fn(auth_middleware))
        // Outermost so that middleware errors are rendered too
        .layer(middleware::map_response(response_mapper))
        .with_state(state)
}

fn new_token_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(new_token_page_handler))
        .nest("/{form_id}", token_form_routes(state.clone()))
        .with_state(state)
}

fn token_form_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(post_create_token_handler))
        .route("/form", get(token_form_handler))
        .route("/cancel", post(cancel_token_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            form_middleware,
        ))
        .with_state(state)
}

async fn response_mapper(headers: HeaderMap, res: Response) -> Response {
    let error = res.extensions().get::<ErrorInfo>();
    if let Some(e) = error {
        if e.status_code.is_server_error() {
            error!("{}", e.message);
        }

        let full_page = headers.get("HX-Request").is_none();
        return handle_error(e.clone(), full_page);
    }
    res
}
