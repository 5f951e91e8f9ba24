//! Machine-readable views of the published posts
//!
//! - GET /sitemap.xml
//! - GET /blog/feed/  (Atom)

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};

use crate::api::middleware::{AppState, PageError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sitemap.xml", get(sitemap))
        .route("/blog/feed/", get(feed))
}

async fn sitemap(State(state): State<AppState>) -> Result<impl IntoResponse, PageError> {
    let xml = state.sitemap_service.urlset(&state.site.base_url).await?;
    Ok(([(header::CONTENT_TYPE, "application/xml")], xml))
}

async fn feed(State(state): State<AppState>) -> Result<impl IntoResponse, PageError> {
    let xml = state.feed_service.atom().await?;
    Ok(([(header::CONTENT_TYPE, "application/atom+xml; charset=utf-8")], xml))
}
