//! HTTP layer - page handlers, admin API and routing
//!
//! HTML pages are rendered through the template engine; the staff API
//! under `/api/v1` speaks JSON.

pub mod admin;
pub mod auth;
pub mod blog;
pub mod feeds;
pub mod middleware;

#[cfg(test)]
mod tests;

use axum::{middleware as axum_middleware, Router};
use tower_http::trace::TraceLayer;

pub use middleware::{ApiError, AppState, AuthenticatedUser, PageError};

/// Build the JSON API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Staff routes
    let admin_routes = Router::new()
        .nest("/admin", admin::router())
        .route_layer(axum_middleware::from_fn(middleware::require_staff))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Any logged-in user
    let protected_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ));

    Router::new()
        .nest("/auth", auth::public_router())
        .merge(admin_routes)
        .merge(protected_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(blog::router())
        .merge(feeds::router())
        .nest("/api/v1", build_api_router(state.clone()))
        .fallback(blog::page_not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::render_error_pages,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
