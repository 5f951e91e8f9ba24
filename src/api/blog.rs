//! Blog pages
//!
//! - GET  /blog/                               - published posts, paginated
//! - GET  /blog/tag/{tag_slug}/                - same list filtered by tag
//! - GET  /blog/{year}/{month}/{day}/{slug}/   - post detail with comments
//! - GET  /blog/{id}/share/                    - share form
//! - POST /blog/{id}/share/                    - send the share e-mail
//! - POST /blog/{id}/comment/                  - add a comment

use axum::{
    extract::{Path, Query, State},
    response::{Html, Redirect},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use tera::Context as TeraContext;

use crate::api::middleware::{AppState, PageError};
use crate::models::{CommentForm, CommentView, PostSummary};
use crate::services::{FieldErrors, ShareForm, ShareServiceError};

const DELIVERY_FAILED: &str = "The e-mail could not be sent. Please try again later.";

/// Build the blog page router
pub fn router() -> Router<AppState> {
    // One parameter name per position: the segment after /blog/ is a year
    // on detail pages and a post id on the share and comment routes.
    Router::new()
        .route("/", get(index))
        .route("/blog/", get(post_list))
        .route("/blog/tag/{tag_slug}/", get(post_list_by_tag))
        .route("/blog/{segment}/{month}/{day}/{slug}/", get(post_detail))
        .route("/blog/{segment}/share/", get(post_share_form).post(post_share))
        .route("/blog/{segment}/comment/", post(post_comment))
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    /// Raw value; anything but a positive integer selects page 1
    pub page: Option<String>,
}

async fn index() -> Redirect {
    Redirect::permanent("/blog/")
}

/// Fallback for unknown paths
pub async fn page_not_found() -> PageError {
    PageError::NotFound("The page you requested does not exist.".to_string())
}

async fn post_list(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, PageError> {
    render_list(&state, None, query.page.as_deref()).await
}

async fn post_list_by_tag(
    State(state): State<AppState>,
    Path(tag_slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Html<String>, PageError> {
    render_list(&state, Some(&tag_slug), query.page.as_deref()).await
}

async fn render_list(
    state: &AppState,
    tag_slug: Option<&str>,
    page: Option<&str>,
) -> Result<Html<String>, PageError> {
    let list = state.post_service.list_published(page, tag_slug).await?;

    let mut ctx = state.page_context().await?;
    ctx.insert("page", &list.posts.page_info());
    ctx.insert("posts", &list.posts);
    ctx.insert("tag", &list.tag);
    render(state, "blog/post/list.html", &ctx)
}

async fn post_detail(
    State(state): State<AppState>,
    Path((year, month, day, slug)): Path<(String, String, String, String)>,
) -> Result<Html<String>, PageError> {
    let (Ok(year), Ok(month), Ok(day)) = (year.parse::<i32>(), month.parse::<u32>(), day.parse::<u32>())
    else {
        return Err(PageError::NotFound(format!("No post at {}/{}/{}/{}", year, month, day, slug)));
    };

    let post = state.post_service.get_detail(year, month, day, &slug).await?;
    let comments: Vec<CommentView> = state
        .comment_service
        .active_for_post(post.post.id)
        .await?
        .into_iter()
        .map(CommentView::from)
        .collect();
    let similar_posts = state
        .post_service
        .similar_posts(post.post.id, state.site.similar_posts_count)
        .await?;

    let mut ctx = state.page_context().await?;
    ctx.insert("post", &post);
    ctx.insert("comments", &comments);
    ctx.insert("similar_posts", &similar_posts);
    ctx.insert("form", &CommentForm::default());
    ctx.insert("errors", &FieldErrors::new());
    render(&state, "blog/post/detail.html", &ctx)
}

async fn post_share_form(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>, PageError> {
    let post = published_post(&state, &id).await?;
    render_share(&state, &post, &ShareForm::default(), &FieldErrors::new(), false, None).await
}

async fn post_share(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<ShareForm>,
) -> Result<Html<String>, PageError> {
    let post = published_post(&state, &id).await?;
    let post_url = state.site.absolute_url(&post.url);

    match state.share_service.share(&post.post, &form, &post_url).await {
        Ok(_) => render_share(&state, &post, &form, &FieldErrors::new(), true, None).await,
        Err(ShareServiceError::ValidationError(errors)) => {
            render_share(&state, &post, &form, &errors, false, None).await
        }
        Err(ShareServiceError::DeliveryError(_)) => {
            render_share(&state, &post, &form, &FieldErrors::new(), false, Some(DELIVERY_FAILED))
                .await
        }
    }
}

async fn render_share(
    state: &AppState,
    post: &PostSummary,
    form: &ShareForm,
    errors: &FieldErrors,
    sent: bool,
    delivery_error: Option<&str>,
) -> Result<Html<String>, PageError> {
    let mut ctx = state.page_context().await?;
    ctx.insert("post", post);
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    ctx.insert("sent", &sent);
    if let Some(message) = delivery_error {
        ctx.insert("delivery_error", message);
    }
    render(state, "blog/post/share.html", &ctx)
}

/// Comment submission. Valid or not, the answer is the comment page:
/// the confirmation, or the form again with its errors.
async fn post_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<CommentForm>,
) -> Result<Html<String>, PageError> {
    let post = published_post(&state, &id).await?;
    let outcome = state.comment_service.submit(post.post.id, &form).await?;

    let mut ctx = state.page_context().await?;
    ctx.insert("post", &post);
    ctx.insert("comment", &outcome.comment);
    ctx.insert("form", &form);
    ctx.insert("errors", &outcome.errors);
    render(&state, "blog/post/comment.html", &ctx)
}

async fn published_post(state: &AppState, id: &str) -> Result<PostSummary, PageError> {
    let id: i64 = id
        .parse()
        .map_err(|_| PageError::NotFound(format!("No post {}", id)))?;
    Ok(state.post_service.get_published_summary(id).await?)
}

fn render(state: &AppState, template: &str, ctx: &TeraContext) -> Result<Html<String>, PageError> {
    Ok(Html(state.templates.render(template, ctx)?))
}
