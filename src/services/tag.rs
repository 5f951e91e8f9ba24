//! Tag service

use crate::db::repositories::TagRepository;
use crate::models::{Tag, TagWithCount};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum TagServiceError {
    #[error("Tag not found")]
    NotFound,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct TagService {
    repo: Arc<dyn TagRepository>,
}

impl TagService {
    pub fn new(repo: Arc<dyn TagRepository>) -> Self {
        Self { repo }
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Tag, TagServiceError> {
        self.repo
            .get_by_slug(slug)
            .await?
            .ok_or(TagServiceError::NotFound)
    }

    /// Tags in use by published posts, most used first
    pub async fn tag_cloud(&self, limit: i64) -> Result<Vec<TagWithCount>, TagServiceError> {
        Ok(self.repo.tag_cloud(limit).await?)
    }

    pub async fn for_post(&self, post_id: i64) -> Result<Vec<Tag>, TagServiceError> {
        Ok(self.repo.list_for_post(post_id).await?)
    }

    /// Replace a post's tags with `names`
    pub async fn set_for_post(
        &self,
        post_id: i64,
        names: &[String],
    ) -> Result<Vec<Tag>, TagServiceError> {
        Ok(self.repo.set_post_tags(post_id, names).await?)
    }
}
