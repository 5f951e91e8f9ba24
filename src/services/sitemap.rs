//! sitemap.xml generation
//!
//! The document is rendered from the `sitemap.xml` template.

use crate::cache::{get_or_load, SharedCache};
use crate::db::repositories::PostRepository;
use crate::models::Post;
use crate::services::SITEMAP_CACHE_KEY;
use crate::theme::TemplateEngine;
use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use tera::Context as TeraContext;

pub const CHANGEFREQ: &str = "weekly";
pub const PRIORITY: &str = "0.9";

const TEMPLATE: &str = "sitemap.xml";

/// One `<url>` entry
#[derive(Debug, Clone, Serialize)]
pub struct SitemapUrl {
    pub location: String,
    pub lastmod: Option<String>,
    pub changefreq: &'static str,
    pub priority: &'static str,
}

impl SitemapUrl {
    pub fn for_post(base_url: &str, post: &Post) -> Self {
        Self {
            location: format!("{}{}", base_url.trim_end_matches('/'), post.absolute_path()),
            lastmod: Some(post.updated.format("%Y-%m-%d").to_string()),
            changefreq: CHANGEFREQ,
            priority: PRIORITY,
        }
    }
}

pub struct SitemapService {
    repo: Arc<dyn PostRepository>,
    cache: SharedCache,
    templates: Arc<TemplateEngine>,
}

impl SitemapService {
    pub fn new(
        repo: Arc<dyn PostRepository>,
        cache: SharedCache,
        templates: Arc<TemplateEngine>,
    ) -> Self {
        Self {
            repo,
            cache,
            templates,
        }
    }

    /// `<urlset>` document listing every published post.
    ///
    /// `base_url` is prefixed to each post's path.
    pub async fn urlset(&self, base_url: &str) -> Result<String> {
        get_or_load(&*self.cache, SITEMAP_CACHE_KEY, self.cache.default_ttl(), || async {
            let posts = self.repo.list_all_published().await?;
            self.render(base_url, &posts)
        })
        .await
    }

    pub fn render(&self, base_url: &str, posts: &[Post]) -> Result<String> {
        let urlset: Vec<SitemapUrl> = posts
            .iter()
            .map(|post| SitemapUrl::for_post(base_url, post))
            .collect();
        let mut ctx = TeraContext::new();
        ctx.insert("urlset", &urlset);
        self.templates.render(TEMPLATE, &ctx)
    }
}
