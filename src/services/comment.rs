//! Comment service
//!
//! Readers comment on published posts through a plain form. An invalid form
//! is not an error: the outcome carries the field errors so the page can be
//! re-rendered with them. New comments are active immediately; staff can
//! hide or delete them through the admin API.

use crate::cache::SharedCache;
use crate::db::repositories::{CommentRepository, PostRepository};
use crate::models::{Comment, CommentForm, CreateCommentInput, ListParams, PagedResult};
use crate::services::invalidate_post_caches;
use crate::services::validation::{FieldErrors, EMAIL_MAX_LENGTH};
use std::sync::Arc;

pub const NAME_MAX_LENGTH: usize = 80;

#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Result of a comment submission
#[derive(Debug, Clone, Default)]
pub struct CommentOutcome {
    /// The stored comment, when the form was valid
    pub comment: Option<Comment>,
    pub errors: FieldErrors,
}

pub struct CommentService {
    repo: Arc<dyn CommentRepository>,
    post_repo: Arc<dyn PostRepository>,
    cache: SharedCache,
}

impl CommentService {
    pub fn new(
        repo: Arc<dyn CommentRepository>,
        post_repo: Arc<dyn PostRepository>,
        cache: SharedCache,
    ) -> Self {
        Self {
            repo,
            post_repo,
            cache,
        }
    }

    /// Field errors for a submitted form; empty when the form is valid
    pub fn validate(&self, form: &CommentForm) -> FieldErrors {
        let mut errors = FieldErrors::new();
        errors.require("name", &form.name, Some(NAME_MAX_LENGTH));
        errors.require("email", &form.email, Some(EMAIL_MAX_LENGTH));
        if !errors.has("email") {
            errors.require_email("email", &form.email);
        }
        errors.require("body", &form.body, None);
        errors
    }

    /// Validate and store a comment on a published post
    pub async fn submit(
        &self,
        post_id: i64,
        form: &CommentForm,
    ) -> Result<CommentOutcome, CommentServiceError> {
        if self.post_repo.get_published_by_id(post_id).await?.is_none() {
            return Err(CommentServiceError::NotFound(format!("Post {}", post_id)));
        }

        let errors = self.validate(form);
        if !errors.is_empty() {
            tracing::debug!("Rejected comment on post {}: {}", post_id, errors);
            return Ok(CommentOutcome {
                comment: None,
                errors,
            });
        }

        let comment = self
            .repo
            .create(&CreateCommentInput::from_form(post_id, form))
            .await?;
        tracing::info!("New comment {} on post {} by {}", comment.id, post_id, comment.name);
        invalidate_post_caches(&self.cache).await;

        Ok(CommentOutcome {
            comment: Some(comment),
            errors,
        })
    }

    /// Visible comments of a post, oldest first
    pub async fn active_for_post(&self, post_id: i64) -> Result<Vec<Comment>, CommentServiceError> {
        Ok(self.repo.list_active_for_post(post_id).await?)
    }

    pub async fn get(&self, id: i64) -> Result<Comment, CommentServiceError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// Show or hide a comment
    pub async fn set_active(&self, id: i64, active: bool) -> Result<Comment, CommentServiceError> {
        if !self.repo.set_active(id, active).await? {
            return Err(not_found(id));
        }
        invalidate_post_caches(&self.cache).await;
        self.get(id).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), CommentServiceError> {
        if !self.repo.delete(id).await? {
            return Err(not_found(id));
        }
        invalidate_post_caches(&self.cache).await;
        Ok(())
    }

    /// Admin listing, newest first, optionally filtered by visibility
    pub async fn list(
        &self,
        params: &ListParams,
        active: Option<bool>,
    ) -> Result<PagedResult<Comment>, CommentServiceError> {
        Ok(self.repo.list(params, active).await?)
    }
}

fn not_found(id: i64) -> CommentServiceError {
    CommentServiceError::NotFound(format!("Comment {}", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheLayer, MemoryCache};
    use crate::db::repositories::{SqlxCommentRepository, SqlxPostRepository};
    use crate::db::{create_test_pool, migrations};
    use std::time::Duration;

    async fn setup() -> (CommentService, SharedCache) {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        pool.execute(
            "INSERT INTO users (email, username, password_hash, date_joined) \
             VALUES ('a@example.com', 'a', 'x', '2024-01-01T00:00:00+00:00')",
        )
        .await
        .unwrap();
        for (slug, status) in [("live", "published"), ("draft", "draft")] {
            pool.execute(&format!(
                "INSERT INTO posts (title, slug, author_id, body, publish, created, updated, status) \
                 VALUES ('{0}', '{0}', 1, '', '2024-01-01T00:00:00+00:00', \
                 '2024-01-01T00:00:00+00:00', '2024-01-01T00:00:00+00:00', '{1}')",
                slug, status
            ))
            .await
            .unwrap();
        }
        let cache: SharedCache = Arc::new(MemoryCache::new());
        let service = CommentService::new(
            SqlxCommentRepository::boxed(pool.clone()),
            SqlxPostRepository::boxed(pool),
            cache.clone(),
        );
        (service, cache)
    }

    fn form(name: &str, email: &str, body: &str) -> CommentForm {
        CommentForm {
            name: name.to_string(),
            email: email.to_string(),
            body: body.to_string(),
        }
    }

    #[tokio::test]
    async fn test_validate_reports_each_field() {
        let (service, _) = setup().await;
        let errors = service.validate(&form("", "not-an-email", " "));
        assert_eq!(errors.get("name").unwrap(), ["This field is required."]);
        assert_eq!(errors.get("email").unwrap(), ["Enter a valid email address."]);
        assert_eq!(errors.get("body").unwrap(), ["This field is required."]);

        let long_name = "n".repeat(NAME_MAX_LENGTH + 1);
        let errors = service.validate(&form(&long_name, "a@example.com", "hi"));
        assert!(errors.has("name"));
        assert!(!errors.has("email"));

        assert!(service.validate(&form("Ann", "ann@example.com", "Hi")).is_empty());
    }

    #[tokio::test]
    async fn test_submit_valid_comment() {
        let (service, cache) = setup().await;
        cache
            .set("sidebar:most_commented:5", &Vec::<i64>::new(), Duration::from_secs(60))
            .await
            .unwrap();

        let outcome = service
            .submit(1, &form(" Ann ", "ann@example.com", "Great post"))
            .await
            .unwrap();
        assert!(outcome.comment.is_some());
        assert!(outcome.errors.is_empty());
        let comment = outcome.comment.unwrap();
        assert_eq!(comment.name, "Ann");
        assert!(comment.active);

        let stale: Option<Vec<i64>> = cache.get("sidebar:most_commented:5").await.unwrap();
        assert!(stale.is_none());
        assert_eq!(service.active_for_post(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_submit_invalid_form_stores_nothing() {
        let (service, _) = setup().await;
        let outcome = service.submit(1, &form("Ann", "", "Hi")).await.unwrap();
        assert!(outcome.comment.is_none());
        assert!(outcome.errors.has("email"));
        assert!(service.active_for_post(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_submit_to_missing_or_draft_post() {
        let (service, _) = setup().await;
        let valid = form("Ann", "ann@example.com", "Hi");
        assert!(matches!(
            service.submit(2, &valid).await,
            Err(CommentServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.submit(99, &valid).await,
            Err(CommentServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_moderation() {
        let (service, _) = setup().await;
        let comment = service
            .submit(1, &form("Ann", "ann@example.com", "Hi"))
            .await
            .unwrap()
            .comment
            .unwrap();

        let hidden = service.set_active(comment.id, false).await.unwrap();
        assert!(!hidden.active);
        assert!(service.active_for_post(1).await.unwrap().is_empty());

        let inactive = service.list(&ListParams::new(1, 10), Some(false)).await.unwrap();
        assert_eq!(inactive.total, 1);

        service.delete(comment.id).await.unwrap();
        assert!(matches!(
            service.delete(comment.id).await,
            Err(CommentServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.set_active(comment.id, true).await,
            Err(CommentServiceError::NotFound(_))
        ));
    }
}
