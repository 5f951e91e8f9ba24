//! Shared HTTP plumbing
//!
//! - `AppState`: the services handed to every handler
//! - `ApiError`: JSON error body of the admin API
//! - `PageError`: HTML error pages (404.html / 500.html)
//! - session authentication and the staff check

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tera::Context as TeraContext;

use crate::cache::{create_cache, SharedCache};
use crate::config::{Config, SiteConfig};
use crate::db::repositories::{
    SqlxCommentRepository, SqlxPostRepository, SqlxSessionRepository, SqlxTagRepository,
    SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::User;
use crate::services::{
    CommentService, CommentServiceError, FeedService, Mailer, MarkdownRenderer, PostService,
    PostServiceError, ShareService, SidebarContext, SidebarService,
    SitemapService, TagService, TagServiceError, UserService, UserServiceError,
};
use crate::theme::TemplateEngine;

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub site: Arc<SiteConfig>,
    pub cache: SharedCache,
    pub session_days: i64,
    pub user_service: Arc<UserService>,
    pub post_service: Arc<PostService>,
    pub tag_service: Arc<TagService>,
    pub comment_service: Arc<CommentService>,
    pub share_service: Arc<ShareService>,
    pub sidebar_service: Arc<SidebarService>,
    pub sitemap_service: Arc<SitemapService>,
    pub feed_service: Arc<FeedService>,
    pub templates: Arc<TemplateEngine>,
}

impl AppState {
    /// Wire repositories, services and templates for `config`
    pub fn new(
        config: &Config,
        pool: DynDatabasePool,
        mailer: Arc<dyn Mailer>,
    ) -> anyhow::Result<Self> {
        let cache = create_cache(&config.cache);
        let site = config.site.clone();

        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let session_repo = SqlxSessionRepository::boxed(pool.clone());
        let post_repo = SqlxPostRepository::boxed(pool.clone());
        let tag_repo = SqlxTagRepository::boxed(pool.clone());
        let comment_repo = SqlxCommentRepository::boxed(pool);

        let templates = Arc::new(TemplateEngine::new(
            config.theme.path.as_deref(),
            MarkdownRenderer::new(),
        )?);

        Ok(Self {
            session_days: config.auth.session_days,
            user_service: Arc::new(UserService::with_session_days(
                user_repo,
                session_repo,
                config.auth.session_days,
            )),
            post_service: Arc::new(PostService::new(
                post_repo.clone(),
                tag_repo.clone(),
                cache.clone(),
                site.posts_per_page,
            )),
            tag_service: Arc::new(TagService::new(tag_repo)),
            comment_service: Arc::new(CommentService::new(
                comment_repo,
                post_repo.clone(),
                cache.clone(),
            )),
            share_service: Arc::new(ShareService::new(mailer)),
            sidebar_service: Arc::new(SidebarService::new(
                post_repo.clone(),
                cache.clone(),
                site.latest_posts_count,
                site.most_commented_count,
            )),
            sitemap_service: Arc::new(SitemapService::new(
                post_repo.clone(),
                cache.clone(),
                templates.clone(),
            )),
            feed_service: Arc::new(FeedService::new(post_repo, cache.clone(), site.clone())),
            templates,
            site: Arc::new(site),
            cache,
        })
    }

    /// Template context every blog page starts from: `site`, `sidebar`
    /// and the `latest_posts` list used by the latest-posts include
    pub async fn page_context(&self) -> anyhow::Result<TeraContext> {
        let sidebar = self.sidebar_service.context().await?;
        Ok(self.context_with_sidebar(&sidebar))
    }

    fn context_with_sidebar(&self, sidebar: &SidebarContext) -> TeraContext {
        let mut ctx = TeraContext::new();
        ctx.insert("site", &*self.site);
        ctx.insert("latest_posts", &sidebar.latest_posts);
        ctx.insert("sidebar", sidebar);
        ctx
    }
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

// ============================================================================
// JSON errors
// ============================================================================

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    /// Log the full error chain and hide it from the client
    fn internal(e: anyhow::Error) -> Self {
        tracing::error!("Internal error: {:#}", e);
        Self::internal_error("Internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

impl From<PostServiceError> for ApiError {
    fn from(e: PostServiceError) -> Self {
        match e {
            PostServiceError::NotFound(msg) => Self::not_found(msg),
            PostServiceError::ValidationError(msg) => Self::validation_error(msg),
            PostServiceError::DuplicateSlug { slug, day } => Self::with_details(
                "CONFLICT",
                format!("Slug '{}' is already used on {}", slug, day),
                serde_json::json!({ "field": "slug", "slug": slug, "publish_date": day }),
            ),
            PostServiceError::InternalError(e) => Self::internal(e),
        }
    }
}

impl From<CommentServiceError> for ApiError {
    fn from(e: CommentServiceError) -> Self {
        match e {
            CommentServiceError::NotFound(msg) => Self::not_found(msg),
            CommentServiceError::InternalError(e) => Self::internal(e),
        }
    }
}

impl From<TagServiceError> for ApiError {
    fn from(e: TagServiceError) -> Self {
        match e {
            TagServiceError::NotFound => Self::not_found("Tag not found"),
            TagServiceError::InternalError(e) => Self::internal(e),
        }
    }
}

impl From<UserServiceError> for ApiError {
    fn from(e: UserServiceError) -> Self {
        match e {
            UserServiceError::AuthenticationError(msg) => Self::unauthorized(msg),
            UserServiceError::ValidationError(msg) => Self::validation_error(msg),
            UserServiceError::UserExists(msg) => Self::conflict(msg),
            UserServiceError::InternalError(e) => Self::internal(e),
        }
    }
}

// ============================================================================
// HTML errors
// ============================================================================

/// Error of an HTML page handler.
///
/// The response it produces is empty; [`render_error_pages`] fills in the
/// body from `404.html` or `500.html`.
#[derive(Debug)]
pub enum PageError {
    NotFound(String),
    Internal(anyhow::Error),
}

/// Marker left on a response by [`PageError`]
#[derive(Debug, Clone)]
struct ErrorPage {
    message: String,
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            PageError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            PageError::Internal(e) => {
                tracing::error!("Page error: {:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, String::new())
            }
        };
        let mut response = status.into_response();
        response.extensions_mut().insert(ErrorPage { message });
        response
    }
}

impl From<anyhow::Error> for PageError {
    fn from(e: anyhow::Error) -> Self {
        PageError::Internal(e)
    }
}

impl From<PostServiceError> for PageError {
    fn from(e: PostServiceError) -> Self {
        match e {
            PostServiceError::NotFound(msg) => PageError::NotFound(msg),
            other => PageError::Internal(other.into()),
        }
    }
}

impl From<CommentServiceError> for PageError {
    fn from(e: CommentServiceError) -> Self {
        match e {
            CommentServiceError::NotFound(msg) => PageError::NotFound(msg),
            CommentServiceError::InternalError(e) => PageError::Internal(e),
        }
    }
}

/// Render the template of a [`PageError`] into its response
pub async fn render_error_pages(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    let Some(page) = response.extensions().get::<ErrorPage>().cloned() else {
        return response;
    };
    let status = response.status();

    let rendered = if status == StatusCode::NOT_FOUND {
        let mut ctx = match state.page_context().await {
            Ok(ctx) => ctx,
            Err(e) => {
                tracing::warn!("Sidebar unavailable on error page: {:#}", e);
                state.context_with_sidebar(&SidebarContext::default())
            }
        };
        if !page.message.is_empty() {
            ctx.insert("message", &page.message);
        }
        state.templates.render("404.html", &ctx)
    } else {
        state.templates.render("500.html", &TeraContext::new())
    };

    match rendered {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!("Failed to render error page: {:#}", e);
            (status, status.canonical_reason().unwrap_or_default()).into_response()
        }
    }
}

// ============================================================================
// Authentication
// ============================================================================

/// Session token from `Authorization: Bearer` or the `session` cookie
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
    }

    if let Some(cookie_header) = headers.get(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                let cookie = cookie.trim();
                if let Some(token) = cookie.strip_prefix("session=") {
                    if !token.is_empty() {
                        return Some(token.to_string());
                    }
                }
            }
        }
    }

    None
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_session_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    let user = state
        .user_service
        .validate_session(&token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Staff authorization middleware; runs after [`require_auth`]
pub async fn require_staff(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if !user.0.is_staff {
        return Err(ApiError::forbidden("Staff privileges required"));
    }

    Ok(next.run(request).await)
}
