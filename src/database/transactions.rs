// ABOUTME: RAII transaction guard that rolls back unless explicitly committed
// ABOUTME: Commit consumes the guard; dropping it on any error path discards every write
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad

//! Transaction guard
//!
//! ```text
//! let mut guard = TransactionGuard::begin(&pool).await?;
//! sqlx::query("UPDATE exercises ...").execute(guard.executor()?).await?;
//! sqlx::query("INSERT INTO exercise_muscles ...").execute(guard.executor()?).await?;
//! guard.commit().await?;
//! ```
//!
//! If an error returns early, or the enclosing future is dropped because a
//! deadline elapsed, the guard drops with the transaction still open and
//! `SQLx` rolls it back.

use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tracing::{debug, warn};

use crate::errors::{AppError, AppResult};

/// Transaction that rolls back on drop unless committed
pub struct TransactionGuard<'c> {
    transaction: Option<Transaction<'c, Sqlite>>,
}

impl TransactionGuard<'static> {
    /// Begin a transaction on a pooled connection
    ///
    /// # Errors
    ///
    /// Returns an error if no connection can be acquired
    pub async fn begin(pool: &SqlitePool) -> AppResult<Self> {
        let transaction = pool.begin().await?;
        Ok(Self::new(transaction))
    }
}

impl<'c> TransactionGuard<'c> {
    /// Wrap an open transaction
    #[must_use]
    pub fn new(transaction: Transaction<'c, Sqlite>) -> Self {
        Self {
            transaction: Some(transaction),
        }
    }

    /// Connection to run statements on
    ///
    /// # Errors
    ///
    /// Returns an error if the guard was already committed or rolled back
    pub fn executor(&mut self) -> AppResult<&mut SqliteConnection> {
        self.transaction.as_deref_mut().ok_or_else(|| {
            AppError::internal("Transaction already consumed - guard used after commit/rollback")
        })
    }

    /// Commit and consume the guard
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails
    pub async fn commit(mut self) -> AppResult<()> {
        let transaction = self
            .transaction
            .take()
            .ok_or_else(|| AppError::internal("Transaction already consumed - cannot commit"))?;
        transaction
            .commit()
            .await
            .map_err(|e| AppError::database(format!("Transaction commit failed: {e}")))?;
        debug!("Transaction committed");
        Ok(())
    }

    /// Roll back explicitly and consume the guard
    ///
    /// # Errors
    ///
    /// Returns an error if the rollback fails
    pub async fn rollback(mut self) -> AppResult<()> {
        let transaction = self
            .transaction
            .take()
            .ok_or_else(|| AppError::internal("Transaction already consumed - cannot rollback"))?;
        transaction
            .rollback()
            .await
            .map_err(|e| AppError::database(format!("Transaction rollback failed: {e}")))?;
        debug!("Transaction rolled back explicitly");
        Ok(())
    }
}

impl Drop for TransactionGuard<'_> {
    fn drop(&mut self) {
        if self.transaction.is_some() {
            warn!("Transaction dropped without commit - rolling back");
        }
    }
}
