//! Post repository
//!
//! Besides plain CRUD this repository answers the queries behind the public
//! pages: the paginated list (optionally filtered by tag), date/slug lookup
//! for the detail page, and the sidebar aggregates (latest posts,
//! most-commented posts, similar posts by shared tags).
//!
//! List queries return [`PostSummary`] values, which carry the author's
//! display name, the number of active comments and the post's tags.

use crate::db::{DynDatabasePool, InsertId};
use crate::models::{ListParams, PagedResult, Post, PostStatus, PostSummary, Tag};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Arc;

const POST_COLUMNS: &str =
    "id, title, slug, author_id, body, publish, created, updated, status";

/// Post columns plus the author and the active comment count
const SUMMARY_SELECT: &str = r#"
    SELECT p.id, p.title, p.slug, p.author_id, p.body, p.publish, p.created,
           p.updated, p.status,
           u.username AS author_username,
           u.first_name AS author_first_name,
           u.last_name AS author_last_name,
           (SELECT COUNT(*) FROM comments c
             WHERE c.post_id = p.id AND c.active = 1) AS comment_count
    FROM posts p
    JOIN users u ON u.id = p.author_id
"#;

#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Insert a post; the returned copy carries the generated id
    async fn create(&self, post: &Post) -> Result<Post>;

    async fn update(&self, post: &Post) -> Result<Post>;

    /// Returns false when no post had that id
    async fn delete(&self, id: i64) -> Result<bool>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    async fn get_published_by_id(&self, id: i64) -> Result<Option<Post>>;

    /// Any post with its author, comment count and tags
    async fn get_summary(&self, id: i64) -> Result<Option<PostSummary>>;

    /// Published post with `slug` whose publish instant falls on the given
    /// UTC calendar day
    async fn get_published_by_date_slug(
        &self,
        year: i32,
        month: u32,
        day: u32,
        slug: &str,
    ) -> Result<Option<Post>>;

    /// Whether another post already uses `slug` on `day`
    async fn slug_taken_on_day(
        &self,
        slug: &str,
        day: NaiveDate,
        exclude_id: Option<i64>,
    ) -> Result<bool>;

    /// Published posts, newest first
    async fn list_published(
        &self,
        params: &ListParams,
        tag_id: Option<i64>,
    ) -> Result<PagedResult<PostSummary>>;

    /// All posts for the admin API, newest first
    async fn list(
        &self,
        params: &ListParams,
        status: Option<PostStatus>,
    ) -> Result<PagedResult<PostSummary>>;

    async fn count_published(&self) -> Result<i64>;

    async fn latest_published(&self, limit: i64) -> Result<Vec<PostSummary>>;

    /// Published posts ordered by active comment count, then newest first
    async fn most_commented(&self, limit: i64) -> Result<Vec<PostSummary>>;

    /// Every published post, newest first
    async fn list_all_published(&self) -> Result<Vec<Post>>;

    /// Published posts sharing at least one tag with `post_id`, most shared
    /// tags first
    async fn similar_posts(&self, post_id: i64, limit: i64) -> Result<Vec<PostSummary>>;
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    #[sqlx(flatten)]
    post: Post,
    author_username: String,
    author_first_name: String,
    author_last_name: String,
    comment_count: i64,
}

impl SummaryRow {
    fn author_name(&self) -> String {
        let full = format!("{} {}", self.author_first_name, self.author_last_name);
        let full = full.trim();
        if full.is_empty() {
            self.author_username.clone()
        } else {
            full.to_string()
        }
    }
}

#[derive(sqlx::FromRow)]
struct PostTagRow {
    post_id: i64,
    #[sqlx(flatten)]
    tag: Tag,
}

/// `[start, end)` of a UTC calendar day
fn day_bounds(day: NaiveDate) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = Utc.from_utc_datetime(&day.and_hms_opt(0, 0, 0)?);
    Some((start, start + Duration::days(1)))
}

pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }

    /// Tags of each post in `post_ids`, ordered by name
    async fn tags_by_post(&self, post_ids: &[i64]) -> Result<HashMap<i64, Vec<Tag>>> {
        let mut by_post: HashMap<i64, Vec<Tag>> = HashMap::new();
        if post_ids.is_empty() {
            return Ok(by_post);
        }

        let placeholders = vec!["?"; post_ids.len()].join(", ");
        let sql = format!(
            "SELECT pt.post_id, t.id, t.name, t.slug FROM post_tags pt \
             JOIN tags t ON t.id = pt.tag_id \
             WHERE pt.post_id IN ({}) ORDER BY t.name",
            placeholders
        );

        let rows = on_pool!(self.pool, conn => {
            let mut query = sqlx::query_as::<_, PostTagRow>(&sql);
            for id in post_ids {
                query = query.bind(*id);
            }
            query
                .fetch_all(conn)
                .await
                .context("Failed to load post tags")?
        });

        for row in rows {
            by_post.entry(row.post_id).or_default().push(row.tag);
        }
        Ok(by_post)
    }

    async fn into_summaries(&self, rows: Vec<SummaryRow>) -> Result<Vec<PostSummary>> {
        let ids: Vec<i64> = rows.iter().map(|r| r.post.id).collect();
        let mut tags = self.tags_by_post(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let author_name = row.author_name();
                let post_tags = tags.remove(&row.post.id).unwrap_or_default();
                PostSummary::new(row.post, author_name, row.comment_count, post_tags)
            })
            .collect())
    }

    /// Run a summary query whose SQL ends in `LIMIT ? OFFSET ?`, with
    /// `filter` bound first when present
    async fn fetch_summaries(
        &self,
        sql: &str,
        filter: Option<i64>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PostSummary>> {
        let rows = on_pool!(self.pool, conn => {
            let mut query = sqlx::query_as::<_, SummaryRow>(sql);
            if let Some(value) = filter {
                query = query.bind(value);
            }
            query
                .bind(limit)
                .bind(offset)
                .fetch_all(conn)
                .await
                .context("Failed to list posts")?
        });
        self.into_summaries(rows).await
    }
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, post: &Post) -> Result<Post> {
        let sql = r#"
            INSERT INTO posts (title, slug, author_id, body, publish, created, updated, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#;
        let id = on_pool!(self.pool, conn => {
            sqlx::query(sql)
                .bind(&post.title)
                .bind(&post.slug)
                .bind(post.author_id)
                .bind(&post.body)
                .bind(post.publish)
                .bind(post.created)
                .bind(post.updated)
                .bind(post.status.as_str())
                .execute(conn)
                .await
                .context("Failed to create post")?
                .insert_id()
        });

        Ok(Post {
            id,
            ..post.clone()
        })
    }

    async fn update(&self, post: &Post) -> Result<Post> {
        let sql = r#"
            UPDATE posts
            SET title = ?, slug = ?, body = ?, publish = ?, updated = ?, status = ?
            WHERE id = ?
        "#;
        on_pool!(self.pool, conn => {
            sqlx::query(sql)
                .bind(&post.title)
                .bind(&post.slug)
                .bind(&post.body)
                .bind(post.publish)
                .bind(post.updated)
                .bind(post.status.as_str())
                .bind(post.id)
                .execute(conn)
                .await
                .context("Failed to update post")?;
        });
        Ok(post.clone())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = on_pool!(self.pool, conn => {
            sqlx::query("DELETE FROM posts WHERE id = ?")
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to delete post")?
                .rows_affected()
        });
        Ok(affected > 0)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        let sql = format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS);
        let post = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, Post>(&sql)
                .bind(id)
                .fetch_optional(conn)
                .await
                .context("Failed to get post by ID")?
        });
        Ok(post)
    }

    async fn get_published_by_id(&self, id: i64) -> Result<Option<Post>> {
        let sql = format!("SELECT {} FROM posts WHERE id = ? AND status = ?", POST_COLUMNS);
        let post = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, Post>(&sql)
                .bind(id)
                .bind(PostStatus::Published.as_str())
                .fetch_optional(conn)
                .await
                .context("Failed to get published post")?
        });
        Ok(post)
    }

    async fn get_summary(&self, id: i64) -> Result<Option<PostSummary>> {
        let sql = format!("{} WHERE p.id = ? LIMIT ? OFFSET ?", SUMMARY_SELECT);
        let mut found = self.fetch_summaries(&sql, Some(id), 1, 0).await?;
        Ok(found.pop())
    }

    async fn get_published_by_date_slug(
        &self,
        year: i32,
        month: u32,
        day: u32,
        slug: &str,
    ) -> Result<Option<Post>> {
        let Some((start, end)) = NaiveDate::from_ymd_opt(year, month, day).and_then(day_bounds)
        else {
            return Ok(None);
        };

        let sql = format!(
            "SELECT {} FROM posts \
             WHERE slug = ? AND status = ? AND publish >= ? AND publish < ?",
            POST_COLUMNS
        );
        let post = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, Post>(&sql)
                .bind(slug)
                .bind(PostStatus::Published.as_str())
                .bind(start)
                .bind(end)
                .fetch_optional(conn)
                .await
                .context("Failed to get post by date and slug")?
        });
        Ok(post)
    }

    async fn slug_taken_on_day(
        &self,
        slug: &str,
        day: NaiveDate,
        exclude_id: Option<i64>,
    ) -> Result<bool> {
        let (start, end) = day_bounds(day).context("Invalid publish day")?;
        let count: i64 = on_pool!(self.pool, conn => {
            sqlx::query_scalar(
                "SELECT COUNT(*) FROM posts \
                 WHERE slug = ? AND publish >= ? AND publish < ? AND id <> ?",
            )
            .bind(slug)
            .bind(start)
            .bind(end)
            .bind(exclude_id.unwrap_or(0))
            .fetch_one(conn)
            .await
            .context("Failed to check slug")?
        });
        Ok(count > 0)
    }

    async fn list_published(
        &self,
        params: &ListParams,
        tag_id: Option<i64>,
    ) -> Result<PagedResult<PostSummary>> {
        let tag_clause = if tag_id.is_some() {
            " AND EXISTS (SELECT 1 FROM post_tags pt WHERE pt.post_id = p.id AND pt.tag_id = ?)"
        } else {
            ""
        };
        let published = PostStatus::Published.as_str();

        let count_sql = format!(
            "SELECT COUNT(*) FROM posts p WHERE p.status = '{}'{}",
            published, tag_clause
        );
        let total: i64 = on_pool!(self.pool, conn => {
            let mut query = sqlx::query_scalar(&count_sql);
            if let Some(tag_id) = tag_id {
                query = query.bind(tag_id);
            }
            query
                .fetch_one(conn)
                .await
                .context("Failed to count published posts")?
        });

        let list_sql = format!(
            "{} WHERE p.status = '{}'{} ORDER BY p.publish DESC, p.id DESC LIMIT ? OFFSET ?",
            SUMMARY_SELECT, published, tag_clause
        );
        let items = self
            .fetch_summaries(&list_sql, tag_id, params.limit(), params.offset())
            .await?;

        Ok(PagedResult::new(items, total, params))
    }

    async fn list(
        &self,
        params: &ListParams,
        status: Option<PostStatus>,
    ) -> Result<PagedResult<PostSummary>> {
        let where_clause = match status {
            Some(status) => format!(" WHERE p.status = '{}'", status.as_str()),
            None => String::new(),
        };

        let count_sql = format!("SELECT COUNT(*) FROM posts p{}", where_clause);
        let total: i64 = on_pool!(self.pool, conn => {
            sqlx::query_scalar(&count_sql)
                .fetch_one(conn)
                .await
                .context("Failed to count posts")?
        });

        let list_sql = format!(
            "{}{} ORDER BY p.publish DESC, p.id DESC LIMIT ? OFFSET ?",
            SUMMARY_SELECT, where_clause
        );
        let items = self
            .fetch_summaries(&list_sql, None, params.limit(), params.offset())
            .await?;

        Ok(PagedResult::new(items, total, params))
    }

    async fn count_published(&self) -> Result<i64> {
        let count: i64 = on_pool!(self.pool, conn => {
            sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE status = ?")
                .bind(PostStatus::Published.as_str())
                .fetch_one(conn)
                .await
                .context("Failed to count published posts")?
        });
        Ok(count)
    }

    async fn latest_published(&self, limit: i64) -> Result<Vec<PostSummary>> {
        let sql = format!(
            "{} WHERE p.status = '{}' ORDER BY p.publish DESC, p.id DESC LIMIT ? OFFSET ?",
            SUMMARY_SELECT,
            PostStatus::Published.as_str()
        );
        self.fetch_summaries(&sql, None, limit, 0).await
    }

    async fn most_commented(&self, limit: i64) -> Result<Vec<PostSummary>> {
        let sql = format!(
            "{} WHERE p.status = '{}' \
             ORDER BY comment_count DESC, p.publish DESC, p.id DESC LIMIT ? OFFSET ?",
            SUMMARY_SELECT,
            PostStatus::Published.as_str()
        );
        self.fetch_summaries(&sql, None, limit, 0).await
    }

    async fn list_all_published(&self) -> Result<Vec<Post>> {
        let sql = format!(
            "SELECT {} FROM posts WHERE status = ? ORDER BY publish DESC, id DESC",
            POST_COLUMNS
        );
        let posts = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, Post>(&sql)
                .bind(PostStatus::Published.as_str())
                .fetch_all(conn)
                .await
                .context("Failed to list published posts")?
        });
        Ok(posts)
    }

    async fn similar_posts(&self, post_id: i64, limit: i64) -> Result<Vec<PostSummary>> {
        let sql = format!(
            r#"{}
            JOIN (
                SELECT pt.post_id, COUNT(*) AS same_tags
                FROM post_tags pt
                WHERE pt.tag_id IN (SELECT tag_id FROM post_tags WHERE post_id = ?)
                  AND pt.post_id <> ?
                GROUP BY pt.post_id
            ) s ON s.post_id = p.id
            WHERE p.status = ?
            ORDER BY s.same_tags DESC, p.publish DESC, p.id DESC
            LIMIT ?"#,
            SUMMARY_SELECT
        );
        let rows = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, SummaryRow>(&sql)
                .bind(post_id)
                .bind(post_id)
                .bind(PostStatus::Published.as_str())
                .bind(limit)
                .fetch_all(conn)
                .await
                .context("Failed to find similar posts")?
        });
        self.into_summaries(rows).await
    }
}
