//! Database layer
//!
//! SQLite is the default backend; MySQL can be selected through
//! `database.driver`. Repositories write each query once and run it through
//! [`on_pool!`], which hands the body the concrete sqlx pool of whichever
//! backend is configured.
//!
//! ```ignore
//! use quillblog::config::DatabaseConfig;
//! use quillblog::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

/// Evaluate `$body` with `$conn` bound to the backend-specific sqlx pool.
///
/// The body is expanded once per backend, so any sqlx call that both
/// `SqlitePool` and `MySqlPool` support can be written a single time.
macro_rules! on_pool {
    ($pool:expr, $conn:ident => $body:expr) => {
        match $pool.driver() {
            $crate::config::DatabaseDriver::Sqlite => {
                let $conn = $pool
                    .as_sqlite()
                    .ok_or_else(|| ::anyhow::anyhow!("SQLite pool is not available"))?;
                $body
            }
            $crate::config::DatabaseDriver::Mysql => {
                let $conn = $pool
                    .as_mysql()
                    .ok_or_else(|| ::anyhow::anyhow!("MySQL pool is not available"))?;
                $body
            }
        }
    };
}

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, InsertId, MysqlDatabase,
    SqliteDatabase,
};
