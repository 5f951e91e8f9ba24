//! User repository
//!
//! - `UserRepository` trait defining user data access
//! - `SqlxUserRepository` implementing it for SQLite and MySQL

use crate::db::{DynDatabasePool, InsertId};
use crate::models::User;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

const USER_COLUMNS: &str = "id, email, username, first_name, last_name, mobile_number, \
     password_hash, is_active, is_staff, is_superuser, date_joined";

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user; the returned copy carries the generated id
    async fn create(&self, user: &User) -> Result<User>;

    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Whether `email` or `username` is already registered
    async fn exists(&self, email: &str, username: &str) -> Result<bool>;

    async fn count(&self) -> Result<i64>;
}

pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }

    async fn get_by_column(&self, column: &str, value: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE {} = ?", USER_COLUMNS, column);
        let user = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, User>(&sql)
                .bind(value)
                .fetch_optional(conn)
                .await
                .with_context(|| format!("Failed to get user by {}", column))?
        });
        Ok(user)
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        let sql = r#"
            INSERT INTO users (email, username, first_name, last_name, mobile_number,
                               password_hash, is_active, is_staff, is_superuser, date_joined)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#;
        let id = on_pool!(self.pool, conn => {
            sqlx::query(sql)
                .bind(&user.email)
                .bind(&user.username)
                .bind(&user.first_name)
                .bind(&user.last_name)
                .bind(&user.mobile_number)
                .bind(&user.password_hash)
                .bind(user.is_active)
                .bind(user.is_staff)
                .bind(user.is_superuser)
                .bind(user.date_joined)
                .execute(conn)
                .await
                .context("Failed to create user")?
                .insert_id()
        });

        Ok(User {
            id,
            ..user.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let user = on_pool!(self.pool, conn => {
            sqlx::query_as::<_, User>(&sql)
                .bind(id)
                .fetch_optional(conn)
                .await
                .context("Failed to get user by ID")?
        });
        Ok(user)
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        self.get_by_column("email", email).await
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        self.get_by_column("username", username).await
    }

    async fn exists(&self, email: &str, username: &str) -> Result<bool> {
        let count: i64 = on_pool!(self.pool, conn => {
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ? OR username = ?")
                .bind(email)
                .bind(username)
                .fetch_one(conn)
                .await
                .context("Failed to check user existence")?
        });
        Ok(count > 0)
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = on_pool!(self.pool, conn => {
            sqlx::query_scalar("SELECT COUNT(*) FROM users")
                .fetch_one(conn)
                .await
                .context("Failed to count users")?
        });
        Ok(count)
    }
}
