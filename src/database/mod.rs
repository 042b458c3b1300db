// ABOUTME: SQLite persistence for accounts and the versioned fitness resources
// ABOUTME: Pool construction, schema migrations, and deadline-bounded query helpers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad

//! # Database Management
//!
//! [`Database`] owns the connection pool. Repository methods live in one file
//! per table group as `impl Database` blocks; multi-table writes go through
//! [`writer::OptimisticWriter`]. Every call made on behalf of a request runs
//! under the configured storage deadline.

/// Exercise catalogue and its muscle associations
pub mod exercises;
/// Muscle catalogue
pub mod muscles;
/// RAII transaction guard
pub mod transactions;
/// Account storage
pub mod users;
/// Owner-scoped workouts and their ordered entries
pub mod workouts;
/// Version-checked aggregate writes
pub mod writer;

use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::deadline::with_deadline;
use crate::errors::{AppError, AppResult, ErrorCode};

pub use writer::{Aggregate, OptimisticWriter, Stamp};

/// Database manager for accounts and resources
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    deadline: Duration,
}

impl Database {
    /// Open the pool described by `config` and run migrations
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid, the database cannot be opened,
    /// or a migration fails
    pub async fn connect(config: &DatabaseConfig, deadline: Duration) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| AppError::config(format!("Invalid DATABASE_URL: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(deadline);

        if let Some(parent) = options.get_filename().parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    AppError::config(format!("Cannot create database directory: {e}"))
                })?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        info!(
            "Connected to database {} (max {} connections)",
            config.url, config.max_connections
        );

        let db = Self { pool, deadline };
        db.migrate().await?;
        Ok(db)
    }

    /// Private in-memory database on a single connection
    ///
    /// Every connection to `sqlite::memory:` sees its own database, so the pool
    /// holds exactly one connection that is never recycled.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or a migration fails
    pub async fn in_memory(deadline: Duration) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self { pool, deadline };
        db.migrate().await?;
        Ok(db)
    }

    /// Connection pool, for queries outside the repository methods
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Writer for versioned aggregates sharing this pool and deadline
    #[must_use]
    pub fn writer(&self) -> OptimisticWriter {
        OptimisticWriter::new(self.pool.clone(), self.deadline)
    }

    /// Verify the database answers a trivial query
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or misses the deadline
    pub async fn health_check(&self) -> AppResult<()> {
        self.bounded("health check", sqlx::query("SELECT 1").execute(&self.pool))
            .await
            .map(|_| ())
    }

    /// Run one query future under the deadline
    pub(crate) async fn bounded<F, T, E>(&self, operation: &str, future: F) -> AppResult<T>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<AppError>,
    {
        with_deadline(self.deadline, operation, future).await
    }

    /// Create every table and index
    ///
    /// # Errors
    ///
    /// Returns an error if a statement fails
    pub async fn migrate(&self) -> AppResult<()> {
        self.migrate_users().await?;
        self.migrate_muscles().await?;
        self.migrate_exercises().await?;
        self.migrate_workouts().await?;
        Ok(())
    }

    async fn execute_all(&self, statements: &[&str]) -> AppResult<()> {
        for statement in statements {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

/// Reword a unique violation for `resource`, passing other errors through
pub(crate) fn taken(resource: &'static str) -> impl Fn(AppError) -> AppError {
    move |error| match error.code {
        ErrorCode::ResourceAlreadyExists => AppError::already_exists(resource),
        _ => error,
    }
}
