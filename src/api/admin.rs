//! Admin API endpoints (staff only)
//!
//! - GET    /api/v1/admin/posts?page=&per_page=&status=
//! - POST   /api/v1/admin/posts
//! - GET    /api/v1/admin/posts/{id}
//! - PUT    /api/v1/admin/posts/{id}
//! - DELETE /api/v1/admin/posts/{id}
//! - POST   /api/v1/admin/posts/{id}/publish
//! - GET    /api/v1/admin/comments?page=&per_page=&active=
//! - PUT    /api/v1/admin/comments/{id}   body: `{"active": bool}`
//! - DELETE /api/v1/admin/comments/{id}
//! - GET    /api/v1/admin/tags

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{
    Comment, CreatePostInput, ListParams, PagedResult, PostStatus, PostSummary, TagWithCount,
    UpdatePostInput,
};

const TAG_CLOUD_LIMIT: i64 = 100;

/// Build the admin router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/{id}", get(get_post).put(update_post).delete(delete_post))
        .route("/posts/{id}/publish", post(publish_post))
        .route("/comments", get(list_comments))
        .route("/comments/{id}", axum::routing::put(set_comment_active).delete(delete_comment))
        .route("/tags", get(list_tags))
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    20
}

#[derive(Debug, Deserialize)]
pub struct PostListQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    /// `draft` or `published`
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommentListQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CommentUpdateRequest {
    pub active: bool,
}

// ============================================================================
// Posts
// ============================================================================

async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PostListQuery>,
) -> Result<Json<PagedResult<PostSummary>>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(|s| s.parse::<PostStatus>())
        .transpose()
        .map_err(|e| ApiError::validation_error(e.to_string()))?;

    let params = ListParams::new(query.page, query.per_page);
    Ok(Json(state.post_service.list(&params, status).await?))
}

async fn create_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(body): Json<CreatePostInput>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state.post_service.create(user.0.id, body).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PostSummary>, ApiError> {
    Ok(Json(state.post_service.get(id).await?))
}

async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdatePostInput>,
) -> Result<Json<PostSummary>, ApiError> {
    Ok(Json(state.post_service.update(id, body).await?))
}

async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.post_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn publish_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PostSummary>, ApiError> {
    Ok(Json(state.post_service.publish(id).await?))
}

// ============================================================================
// Comments
// ============================================================================

async fn list_comments(
    State(state): State<AppState>,
    Query(query): Query<CommentListQuery>,
) -> Result<Json<PagedResult<Comment>>, ApiError> {
    let params = ListParams::new(query.page, query.per_page);
    Ok(Json(state.comment_service.list(&params, query.active).await?))
}

async fn set_comment_active(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<CommentUpdateRequest>,
) -> Result<Json<Comment>, ApiError> {
    Ok(Json(state.comment_service.set_active(id, body.active).await?))
}

async fn delete_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.comment_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Tags
// ============================================================================

async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<TagWithCount>>, ApiError> {
    Ok(Json(state.tag_service.tag_cloud(TAG_CLOUD_LIMIT).await?))
}
