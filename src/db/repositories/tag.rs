//! Tag repository
//!
//! Tags are created on demand from free-form names. Two names that slugify
//! identically get distinct slugs through a numeric suffix (`jazz`,
//! `jazz_1`, ...).

use crate::db::{DynDatabasePool, InsertId};
use crate::models::{slugify, PostStatus, Tag, TagWithCount};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Existing tag with exactly this name, or a newly created one
    async fn get_or_create(&self, name: &str) -> Result<Tag>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Tag>>;

    /// Tags of a post ordered by name
    async fn list_for_post(&self, post_id: i64) -> Result<Vec<Tag>>;

    /// Replace the post's tag set with `names` (blank names are skipped)
    async fn set_post_tags(&self, post_id: i64, names: &[String]) -> Result<Vec<Tag>>;

    /// Tags used by published posts, most used first
    async fn tag_cloud(&self, limit: i64) -> Result<Vec<TagWithCount>>;
}

pub struct SqlxTagRepository {
    pool: DynDatabasePool,
}

impl SqlxTagRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }

    async fn find_by(&self, column: &str, value: &str) -> Result<Option<Tag>> {
        let sql = format!("SELECT id, name, slug FROM tags WHERE {} = ?", column);
        let tag = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, Tag>(&sql)
                .bind(value)
                .fetch_optional(conn)
                .await
                .with_context(|| format!("Failed to get tag by {}", column))?
        });
        Ok(tag)
    }

    /// First free slug among `base`, `base_1`, `base_2`, ...
    async fn unique_slug(&self, base: &str) -> Result<String> {
        let mut candidate = base.to_string();
        let mut suffix = 1;
        while self.find_by("slug", &candidate).await?.is_some() {
            candidate = format!("{}_{}", base, suffix);
            suffix += 1;
        }
        Ok(candidate)
    }
}

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn get_or_create(&self, name: &str) -> Result<Tag> {
        let name = name.trim();
        if let Some(tag) = self.find_by("name", name).await? {
            return Ok(tag);
        }

        let base = match slugify(name) {
            slug if slug.is_empty() => "tag".to_string(),
            slug => slug,
        };
        let slug = self.unique_slug(&base).await?;

        let id = on_pool!(self.pool, conn => {
            sqlx::query("INSERT INTO tags (name, slug) VALUES (?, ?)")
                .bind(name)
                .bind(&slug)
                .execute(conn)
                .await
                .context("Failed to create tag")?
                .insert_id()
        });

        Ok(Tag {
            id,
            name: name.to_string(),
            slug,
        })
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Tag>> {
        self.find_by("slug", slug).await
    }

    async fn list_for_post(&self, post_id: i64) -> Result<Vec<Tag>> {
        let tags = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, Tag>(
                "SELECT t.id, t.name, t.slug FROM tags t \
                 JOIN post_tags pt ON pt.tag_id = t.id \
                 WHERE pt.post_id = ? ORDER BY t.name",
            )
            .bind(post_id)
            .fetch_all(conn)
            .await
            .context("Failed to list tags for post")?
        });
        Ok(tags)
    }

    async fn set_post_tags(&self, post_id: i64, names: &[String]) -> Result<Vec<Tag>> {
        let mut tags: Vec<Tag> = Vec::new();
        for name in names.iter().filter(|n| !n.trim().is_empty()) {
            let tag = self.get_or_create(name).await?;
            if !tags.iter().any(|t| t.id == tag.id) {
                tags.push(tag);
            }
        }

        on_pool!(self.pool, conn => {
            let mut tx = conn.begin().await.context("Failed to begin transaction")?;
            sqlx::query("DELETE FROM post_tags WHERE post_id = ?")
                .bind(post_id)
                .execute(&mut *tx)
                .await
                .context("Failed to clear post tags")?;
            for tag in &tags {
                sqlx::query("INSERT INTO post_tags (post_id, tag_id) VALUES (?, ?)")
                    .bind(post_id)
                    .bind(tag.id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to tag post")?;
            }
            tx.commit().await.context("Failed to commit post tags")?;
        });

        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn tag_cloud(&self, limit: i64) -> Result<Vec<TagWithCount>> {
        let tags = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, TagWithCount>(
                "SELECT t.id, t.name, t.slug, COUNT(p.id) AS post_count FROM tags t \
                 JOIN post_tags pt ON pt.tag_id = t.id \
                 JOIN posts p ON p.id = pt.post_id AND p.status = ? \
                 GROUP BY t.id, t.name, t.slug \
                 ORDER BY post_count DESC, t.name \
                 LIMIT ?",
            )
            .bind(PostStatus::Published.as_str())
            .bind(limit)
            .fetch_all(conn)
            .await
            .context("Failed to build tag cloud")?
        });
        Ok(tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> (DynDatabasePool, SqlxTagRepository) {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        pool.execute(
            "INSERT INTO users (email, username, password_hash, date_joined) \
             VALUES ('t@example.com', 't', 'x', '2024-01-01T00:00:00+00:00')",
        )
        .await
        .unwrap();
        for (slug, status) in [("one", "published"), ("two", "published"), ("three", "draft")] {
            pool.execute(&format!(
                "INSERT INTO posts (title, slug, author_id, body, publish, created, updated, status) \
                 VALUES ('{0}', '{0}', 1, '', '2024-01-01T00:00:00+00:00', \
                 '2024-01-01T00:00:00+00:00', '2024-01-01T00:00:00+00:00', '{1}')",
                slug, status
            ))
            .await
            .unwrap();
        }
        (pool.clone(), SqlxTagRepository::new(pool))
    }

    #[tokio::test]
    async fn test_get_or_create_reuses_existing() {
        let (_pool, repo) = setup().await;
        let first = repo.get_or_create("Jazz Guitar").await.unwrap();
        assert_eq!(first.slug, "jazz-guitar");

        let again = repo.get_or_create("  Jazz Guitar ").await.unwrap();
        assert_eq!(again.id, first.id);

        let found = repo.get_by_slug("jazz-guitar").await.unwrap();
        assert_eq!(found, Some(first));
    }

    #[tokio::test]
    async fn test_colliding_slugs_get_suffix() {
        let (_pool, repo) = setup().await;
        let a = repo.get_or_create("Rust").await.unwrap();
        let b = repo.get_or_create("rust!").await.unwrap();
        let c = repo.get_or_create("RUST?").await.unwrap();
        assert_eq!(a.slug, "rust");
        assert_eq!(b.slug, "rust_1");
        assert_eq!(c.slug, "rust_2");

        let symbols = repo.get_or_create("???").await.unwrap();
        assert_eq!(symbols.slug, "tag");
    }

    #[tokio::test]
    async fn test_set_post_tags_replaces_set() {
        let (_pool, repo) = setup().await;
        let names = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        let tags = repo
            .set_post_tags(1, &names(&["music", "jazz", "music", " "]))
            .await
            .unwrap();
        let tag_names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(tag_names, vec!["jazz", "music"]);

        repo.set_post_tags(1, &names(&["rust"])).await.unwrap();
        let current = repo.list_for_post(1).await.unwrap();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].name, "rust");
    }

    #[tokio::test]
    async fn test_tag_cloud_counts_published_posts() {
        let (_pool, repo) = setup().await;
        let names = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        repo.set_post_tags(1, &names(&["jazz", "music"])).await.unwrap();
        repo.set_post_tags(2, &names(&["jazz"])).await.unwrap();
        repo.set_post_tags(3, &names(&["music", "draft-only"])).await.unwrap();

        let cloud = repo.tag_cloud(10).await.unwrap();
        let counts: Vec<(&str, i64)> = cloud
            .iter()
            .map(|t| (t.tag.name.as_str(), t.post_count))
            .collect();
        assert_eq!(counts, vec![("jazz", 2), ("music", 1)]);
    }
}
