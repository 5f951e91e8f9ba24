//! Post service
//!
//! Business rules around posts:
//! - a title is required; the slug is derived from it when not given
//! - a slug may be used only once per publish day, since the public URL is
//!   `/blog/{year}/{month}/{day}/{slug}/`
//! - tags are given by name and created on first use
//! - every write invalidates the cached sidebar, sitemap and feed

use crate::cache::SharedCache;
use crate::db::repositories::{PostRepository, TagRepository};
use crate::models::{
    slugify, timestamp_now, CreatePostInput, ListParams, PagedResult, Post, PostStatus,
    PostSummary, Tag, UpdatePostInput,
};
use crate::services::invalidate_post_caches;
use anyhow::Context;
use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Longest accepted title and slug, in characters
pub const TITLE_MAX_LENGTH: usize = 250;

#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    /// Post (or the tag used to filter posts) does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Slug already used by another post on the same publish day
    #[error("Slug already used on that day: {slug} ({day})")]
    DuplicateSlug { slug: String, day: NaiveDate },

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// One page of the public post list, optionally narrowed to a tag
#[derive(Debug, Clone, Serialize)]
pub struct PostList {
    pub posts: PagedResult<PostSummary>,
    pub tag: Option<Tag>,
}

pub struct PostService {
    repo: Arc<dyn PostRepository>,
    tag_repo: Arc<dyn TagRepository>,
    cache: SharedCache,
    posts_per_page: u32,
}

impl PostService {
    pub fn new(
        repo: Arc<dyn PostRepository>,
        tag_repo: Arc<dyn TagRepository>,
        cache: SharedCache,
        posts_per_page: u32,
    ) -> Self {
        Self {
            repo,
            tag_repo,
            cache,
            posts_per_page,
        }
    }

    pub async fn create(
        &self,
        author_id: i64,
        input: CreatePostInput,
    ) -> Result<PostSummary, PostServiceError> {
        let title = validate_title(&input.title)?;
        let slug = match input.slug.as_deref().map(str::trim) {
            Some(slug) if !slug.is_empty() => validate_slug(slug)?,
            _ => derive_slug(&title)?,
        };
        let publish = input
            .publish
            .map(|p| p.trunc_subsecs(0))
            .unwrap_or_else(timestamp_now);

        self.ensure_slug_free(&slug, publish, None).await?;

        let now = timestamp_now();
        let post = self
            .repo
            .create(&Post {
                id: 0,
                title,
                slug,
                author_id,
                body: input.body,
                publish,
                created: now,
                updated: now,
                status: input.status,
            })
            .await
            .context("Failed to create post")?;

        if !input.tags.is_empty() {
            if let Err(e) = self.tag_repo.set_post_tags(post.id, &input.tags).await {
                if let Err(cleanup) = self.repo.delete(post.id).await {
                    tracing::error!("Failed to remove untagged post {}: {:#}", post.id, cleanup);
                }
                return Err(e.into());
            }
        }

        tracing::info!("Created post {} ({})", post.id, post.slug);
        invalidate_post_caches(&self.cache).await;
        self.get(post.id).await
    }

    pub async fn update(
        &self,
        id: i64,
        input: UpdatePostInput,
    ) -> Result<PostSummary, PostServiceError> {
        let mut post = self.find(id).await?;

        if let Some(title) = input.title {
            post.title = validate_title(&title)?;
        }
        if let Some(slug) = input.slug {
            post.slug = match slug.trim() {
                "" => derive_slug(&post.title)?,
                slug => validate_slug(slug)?,
            };
        }
        if let Some(body) = input.body {
            post.body = body;
        }
        if let Some(publish) = input.publish {
            post.publish = publish.trunc_subsecs(0);
        }
        if let Some(status) = input.status {
            post.status = status;
        }

        self.ensure_slug_free(&post.slug, post.publish, Some(post.id))
            .await?;

        post.updated = timestamp_now();
        self.repo
            .update(&post)
            .await
            .context("Failed to update post")?;

        let tagged = match input.tags {
            Some(tags) => self.tag_repo.set_post_tags(post.id, &tags).await.map(|_| ()),
            None => Ok(()),
        };

        // the post row changed even if the tags did not
        invalidate_post_caches(&self.cache).await;
        tagged?;
        self.get(post.id).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), PostServiceError> {
        if !self.repo.delete(id).await? {
            return Err(not_found(id));
        }
        tracing::info!("Deleted post {}", id);
        invalidate_post_caches(&self.cache).await;
        Ok(())
    }

    /// Make a post publicly visible
    pub async fn publish(&self, id: i64) -> Result<PostSummary, PostServiceError> {
        self.update(
            id,
            UpdatePostInput {
                status: Some(PostStatus::Published),
                ..Default::default()
            },
        )
        .await
    }

    /// Any post by id, drafts included
    pub async fn get(&self, id: i64) -> Result<PostSummary, PostServiceError> {
        self.repo.get_summary(id).await?.ok_or_else(|| not_found(id))
    }

    pub async fn get_published(&self, id: i64) -> Result<Post, PostServiceError> {
        self.repo
            .get_published_by_id(id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// Published post by id, with author, comment count and tags
    pub async fn get_published_summary(&self, id: i64) -> Result<PostSummary, PostServiceError> {
        let post = self.get_published(id).await?;
        self.get(post.id).await
    }

    /// Published post addressed by its publish date and slug
    pub async fn get_detail(
        &self,
        year: i32,
        month: u32,
        day: u32,
        slug: &str,
    ) -> Result<PostSummary, PostServiceError> {
        let post = self
            .repo
            .get_published_by_date_slug(year, month, day, slug)
            .await?
            .ok_or_else(|| {
                PostServiceError::NotFound(format!(
                    "No post {} on {:04}-{:02}-{:02}",
                    slug, year, month, day
                ))
            })?;
        self.get(post.id).await
    }

    /// Public list page.
    ///
    /// `page_query` is the raw `?page=` value: anything but a positive
    /// integer shows the first page and a page past the end shows the last.
    pub async fn list_published(
        &self,
        page_query: Option<&str>,
        tag_slug: Option<&str>,
    ) -> Result<PostList, PostServiceError> {
        let tag = match tag_slug {
            Some(slug) => Some(
                self.tag_repo
                    .get_by_slug(slug)
                    .await?
                    .ok_or_else(|| PostServiceError::NotFound(format!("Tag {}", slug)))?,
            ),
            None => None,
        };
        let tag_id = tag.as_ref().map(|t| t.id);

        let params = ListParams::from_query(page_query, self.posts_per_page);
        let mut posts = self.repo.list_published(&params, tag_id).await?;

        let clamped = params.clamped_to(posts.total);
        if clamped != params {
            posts = self.repo.list_published(&clamped, tag_id).await?;
        }

        Ok(PostList { posts, tag })
    }

    /// All posts for the admin API
    pub async fn list(
        &self,
        params: &ListParams,
        status: Option<PostStatus>,
    ) -> Result<PagedResult<PostSummary>, PostServiceError> {
        Ok(self.repo.list(params, status).await?)
    }

    pub async fn similar_posts(
        &self,
        post_id: i64,
        limit: u32,
    ) -> Result<Vec<PostSummary>, PostServiceError> {
        Ok(self.repo.similar_posts(post_id, limit as i64).await?)
    }

    async fn find(&self, id: i64) -> Result<Post, PostServiceError> {
        self.repo.get_by_id(id).await?.ok_or_else(|| not_found(id))
    }

    async fn ensure_slug_free(
        &self,
        slug: &str,
        publish: DateTime<Utc>,
        exclude_id: Option<i64>,
    ) -> Result<(), PostServiceError> {
        if self
            .repo
            .slug_taken_on_day(slug, publish.date_naive(), exclude_id)
            .await?
        {
            return Err(PostServiceError::DuplicateSlug {
                slug: slug.to_string(),
                day: publish.date_naive(),
            });
        }
        Ok(())
    }
}

fn not_found(id: i64) -> PostServiceError {
    PostServiceError::NotFound(format!("Post {}", id))
}

fn validate_title(title: &str) -> Result<String, PostServiceError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(PostServiceError::ValidationError(
            "Title is required".to_string(),
        ));
    }
    if title.chars().count() > TITLE_MAX_LENGTH {
        return Err(PostServiceError::ValidationError(format!(
            "Title must be at most {} characters",
            TITLE_MAX_LENGTH
        )));
    }
    Ok(title.to_string())
}

fn validate_slug(slug: &str) -> Result<String, PostServiceError> {
    let normalized = slugify(slug);
    if normalized != slug {
        return Err(PostServiceError::ValidationError(format!(
            "Slug may only contain lowercase letters, numbers, underscores and hyphens: {}",
            slug
        )));
    }
    if slug.chars().count() > TITLE_MAX_LENGTH {
        return Err(PostServiceError::ValidationError(format!(
            "Slug must be at most {} characters",
            TITLE_MAX_LENGTH
        )));
    }
    Ok(normalized)
}

fn derive_slug(title: &str) -> Result<String, PostServiceError> {
    let slug: String = slugify(title).chars().take(TITLE_MAX_LENGTH).collect();
    if slug.is_empty() {
        return Err(PostServiceError::ValidationError(
            "A slug cannot be derived from this title; give one explicitly".to_string(),
        ));
    }
    Ok(slug)
}
