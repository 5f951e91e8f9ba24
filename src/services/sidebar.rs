//! Sidebar data shared by every blog page
//!
//! Tera templates cannot run queries, so the values the sidebar shows (post
//! count, latest posts, most commented posts) are computed here, cached,
//! and handed to templates as the `sidebar` context object.

use crate::cache::{get_or_load, SharedCache};
use crate::db::repositories::PostRepository;
use crate::models::PostSummary;
use crate::services::SIDEBAR_CACHE_PREFIX;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SidebarContext {
    pub total_posts: i64,
    pub latest_posts: Vec<SidebarPost>,
    pub most_commented_posts: Vec<SidebarPost>,
}

/// The few post fields the sidebar links show
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SidebarPost {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub comment_count: i64,
}

impl From<PostSummary> for SidebarPost {
    fn from(summary: PostSummary) -> Self {
        Self {
            id: summary.post.id,
            title: summary.post.title,
            url: summary.url,
            comment_count: summary.comment_count,
        }
    }
}

pub struct SidebarService {
    repo: Arc<dyn PostRepository>,
    cache: SharedCache,
    latest_count: u32,
    most_commented_count: u32,
}

impl SidebarService {
    pub fn new(
        repo: Arc<dyn PostRepository>,
        cache: SharedCache,
        latest_count: u32,
        most_commented_count: u32,
    ) -> Self {
        Self {
            repo,
            cache,
            latest_count,
            most_commented_count,
        }
    }

    /// Number of published posts
    pub async fn total_posts(&self) -> Result<i64> {
        let key = format!("{}total_posts", SIDEBAR_CACHE_PREFIX);
        get_or_load(&*self.cache, &key, self.cache.default_ttl(), || {
            self.repo.count_published()
        })
        .await
    }

    /// The `count` most recently published posts
    pub async fn latest_posts(&self, count: u32) -> Result<Vec<SidebarPost>> {
        let key = format!("{}latest:{}", SIDEBAR_CACHE_PREFIX, count);
        get_or_load(&*self.cache, &key, self.cache.default_ttl(), || async {
            let posts = self.repo.latest_published(count as i64).await?;
            Ok(posts.into_iter().map(SidebarPost::from).collect())
        })
        .await
    }

    /// The `count` published posts with the most active comments
    pub async fn most_commented_posts(&self, count: u32) -> Result<Vec<SidebarPost>> {
        let key = format!("{}most_commented:{}", SIDEBAR_CACHE_PREFIX, count);
        get_or_load(&*self.cache, &key, self.cache.default_ttl(), || async {
            let posts = self.repo.most_commented(count as i64).await?;
            Ok(posts.into_iter().map(SidebarPost::from).collect())
        })
        .await
    }

    /// Everything the sidebar shows, with the configured list sizes
    pub async fn context(&self) -> Result<SidebarContext> {
        Ok(SidebarContext {
            total_posts: self.total_posts().await?,
            latest_posts: self.latest_posts(self.latest_count).await?,
            most_commented_posts: self.most_commented_posts(self.most_commented_count).await?,
        })
    }
}
