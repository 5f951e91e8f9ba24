//! Comment repository

use crate::db::{DynDatabasePool, InsertId};
use crate::models::{timestamp_now, Comment, CreateCommentInput, ListParams, PagedResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

const COMMENT_COLUMNS: &str = "id, post_id, name, email, body, created, updated, active";

#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Store a new, active comment
    async fn create(&self, input: &CreateCommentInput) -> Result<Comment>;

    /// Active comments of a post, oldest first
    async fn list_active_for_post(&self, post_id: i64) -> Result<Vec<Comment>>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// Returns false when no comment had that id
    async fn set_active(&self, id: i64, active: bool) -> Result<bool>;

    async fn delete(&self, id: i64) -> Result<bool>;

    /// Moderation listing, newest first, optionally filtered by `active`
    async fn list(&self, params: &ListParams, active: Option<bool>)
        -> Result<PagedResult<Comment>>;
}

pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, input: &CreateCommentInput) -> Result<Comment> {
        let now = timestamp_now();
        let id = on_pool!(self.pool, conn => {
            sqlx::query(
                "INSERT INTO comments (post_id, name, email, body, created, updated, active) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(input.post_id)
            .bind(&input.name)
            .bind(&input.email)
            .bind(&input.body)
            .bind(now)
            .bind(now)
            .bind(true)
            .execute(conn)
            .await
            .context("Failed to create comment")?
            .insert_id()
        });

        Ok(Comment {
            id,
            post_id: input.post_id,
            name: input.name.clone(),
            email: input.email.clone(),
            body: input.body.clone(),
            created: now,
            updated: now,
            active: true,
        })
    }

    async fn list_active_for_post(&self, post_id: i64) -> Result<Vec<Comment>> {
        let sql = format!(
            "SELECT {} FROM comments WHERE post_id = ? AND active = ? ORDER BY created, id",
            COMMENT_COLUMNS
        );
        let comments = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, Comment>(&sql)
                .bind(post_id)
                .bind(true)
                .fetch_all(conn)
                .await
                .context("Failed to list comments for post")?
        });
        Ok(comments)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        let sql = format!("SELECT {} FROM comments WHERE id = ?", COMMENT_COLUMNS);
        let comment = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, Comment>(&sql)
                .bind(id)
                .fetch_optional(conn)
                .await
                .context("Failed to get comment by ID")?
        });
        Ok(comment)
    }

    async fn set_active(&self, id: i64, active: bool) -> Result<bool> {
        let affected = on_pool!(self.pool, conn => {
            sqlx::query("UPDATE comments SET active = ?, updated = ? WHERE id = ?")
                .bind(active)
                .bind(timestamp_now())
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to update comment")?
                .rows_affected()
        });
        Ok(affected > 0)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = on_pool!(self.pool, conn => {
            sqlx::query("DELETE FROM comments WHERE id = ?")
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to delete comment")?
                .rows_affected()
        });
        Ok(affected > 0)
    }

    async fn list(
        &self,
        params: &ListParams,
        active: Option<bool>,
    ) -> Result<PagedResult<Comment>> {
        let where_clause = if active.is_some() { " WHERE active = ?" } else { "" };
        let count_sql = format!("SELECT COUNT(*) FROM comments{}", where_clause);
        let list_sql = format!(
            "SELECT {} FROM comments{} ORDER BY created DESC, id DESC LIMIT ? OFFSET ?",
            COMMENT_COLUMNS, where_clause
        );

        let (total, items): (i64, Vec<Comment>) = on_pool!(self.pool, conn => {
            let mut count = sqlx::query_scalar(&count_sql);
            let mut list = sqlx::query_as::<_, Comment>(&list_sql);
            if let Some(active) = active {
                count = count.bind(active);
                list = list.bind(active);
            }
            let total: i64 = count
                .fetch_one(conn)
                .await
                .context("Failed to count comments")?;
            let items = list
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(conn)
                .await
                .context("Failed to list comments")?;
            (total, items)
        });

        Ok(PagedResult::new(items, total, params))
    }
}
