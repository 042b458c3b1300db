// ABOUTME: Version-checked writes for parent rows with ordered child rows
// ABOUTME: Resolves child references concurrently, then writes parent and children in one transaction
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad

//! # Optimistic Writer
//!
//! An aggregate is one parent row carrying a `version` column plus an ordered
//! list of child rows. Writes follow the same sequence for every aggregate:
//!
//! 1. validate the draft
//! 2. resolve every child reference on the pool, concurrently and bounded;
//!    the first failure cancels the remaining lookups and nothing is written
//! 3. open a transaction
//! 4. insert the parent, or compare-and-swap its version
//! 5. write the children in order
//! 6. commit
//!
//! Any error after step 3 drops the [`TransactionGuard`], which rolls back
//! the parent and every child together. Conflicts are reported, never retried.

use std::fmt;
use std::time::Duration;

use futures_util::{stream, StreamExt, TryStreamExt};
use jasad_core::constants::storage::REFERENCE_LOOKUP_CONCURRENCY;
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, instrument};

use super::transactions::TransactionGuard;
use crate::deadline::with_deadline;
use crate::errors::{AppError, AppResult};
use crate::validation::{validate_or_reject, Validate};

/// Version assigned to a newly created aggregate
pub const INITIAL_VERSION: i64 = 1;

/// Identity and version of a written aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stamp {
    /// Parent row id
    pub id: i64,
    /// Version after the write
    pub version: i64,
}

/// A value read together with its version
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    /// Parent row id
    pub id: i64,
    /// Version at read time
    pub version: i64,
    /// Editable state
    pub value: T,
}

/// Storage description of one aggregate type
#[async_trait::async_trait]
pub trait Aggregate: Send + Sync + 'static {
    /// Locates one aggregate, including any owner scope
    type Key: Send + Sync + fmt::Debug;
    /// Editable state: parent fields plus unresolved child references
    type Draft: Validate + Send + Sync;
    /// One unresolved child reference
    type Reference: Send + 'static;
    /// One resolved child row
    type Child: Send + Sync;

    /// Noun used in not-found messages
    const RESOURCE: &'static str;

    /// Parent row id addressed by `key`
    fn parent_id(key: &Self::Key) -> i64;

    /// Child references in write order
    fn references(draft: &Self::Draft) -> Vec<Self::Reference>;

    /// Resolve one reference outside any transaction
    async fn resolve(pool: &SqlitePool, reference: Self::Reference) -> AppResult<Self::Child>;

    /// Current state and version; `None` when absent or outside the key's scope
    async fn load(pool: &SqlitePool, key: &Self::Key) -> AppResult<Option<Versioned<Self::Draft>>>;

    /// Insert the parent row at [`INITIAL_VERSION`] and return its id
    async fn insert_parent(conn: &mut SqliteConnection, draft: &Self::Draft) -> AppResult<i64>;

    /// Update the parent row only if it is still at `expected_version`,
    /// incrementing the version; `None` when no row matched
    async fn swap_parent(
        conn: &mut SqliteConnection,
        key: &Self::Key,
        expected_version: i64,
        draft: &Self::Draft,
    ) -> AppResult<Option<i64>>;

    /// Whether the parent row exists within the key's scope
    async fn exists(conn: &mut SqliteConnection, key: &Self::Key) -> AppResult<bool>;

    /// Remove every child row of `parent_id`
    async fn delete_children(conn: &mut SqliteConnection, parent_id: i64) -> AppResult<()>;

    /// Insert one child row at 1-based `position`
    async fn insert_child(
        conn: &mut SqliteConnection,
        parent_id: i64,
        position: i64,
        child: &Self::Child,
    ) -> AppResult<()>;
}

/// Performs version-checked aggregate writes
#[derive(Clone)]
pub struct OptimisticWriter {
    pool: SqlitePool,
    deadline: Duration,
}

impl OptimisticWriter {
    /// Create a writer over `pool`, bounding each write by `deadline`
    #[must_use]
    pub const fn new(pool: SqlitePool, deadline: Duration) -> Self {
        Self { pool, deadline }
    }

    /// Insert a new aggregate
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if the draft is invalid
    /// - the resolver's error if a child reference does not resolve
    /// - `ResourceAlreadyExists` on a unique violation
    /// - `InternalError` if the deadline elapses
    #[instrument(skip_all, fields(resource = A::RESOURCE, id = tracing::field::Empty))]
    pub async fn create<A: Aggregate>(&self, draft: A::Draft) -> AppResult<Stamp> {
        validate_or_reject(&draft)?;

        let stamp = with_deadline(self.deadline, "aggregate create", async {
            let children = self.resolve_all::<A>(&draft).await?;

            let mut guard = TransactionGuard::begin(&self.pool).await?;
            let id = A::insert_parent(guard.executor()?, &draft).await?;
            Self::write_children::<A>(&mut guard, id, &children).await?;
            guard.commit().await?;

            Ok::<_, AppError>(Stamp {
                id,
                version: INITIAL_VERSION,
            })
        })
        .await?;

        tracing::Span::current().record("id", stamp.id);
        debug!("Aggregate created");
        Ok(stamp)
    }

    /// Apply `mutate` to the stored state and write it if the stored version
    /// still equals `expected_version`
    ///
    /// `mutate` runs on a snapshot read before the transaction; its result is
    /// validated and its references resolved before anything is written.
    ///
    /// # Errors
    ///
    /// - `ResourceNotFound` if the aggregate does not exist in the key's scope
    /// - `EditConflict` if another write moved the version first
    /// - `ValidationFailed` if the mutated draft is invalid
    /// - `ResourceAlreadyExists` on a unique violation
    /// - `InternalError` if the deadline elapses
    #[instrument(skip_all, fields(resource = A::RESOURCE, key = ?key, expected_version = expected_version))]
    pub async fn update<A, F>(&self, key: &A::Key, expected_version: i64, mutate: F) -> AppResult<Stamp>
    where
        A: Aggregate,
        F: FnOnce(A::Draft) -> A::Draft + Send,
    {
        let stamp = with_deadline(self.deadline, "aggregate update", async {
            let snapshot = A::load(&self.pool, key)
                .await?
                .ok_or_else(|| AppError::not_found(A::RESOURCE))?;
            if snapshot.version != expected_version {
                return Err(AppError::edit_conflict());
            }

            let draft = mutate(snapshot.value);
            validate_or_reject(&draft)?;
            let children = self.resolve_all::<A>(&draft).await?;

            let mut guard = TransactionGuard::begin(&self.pool).await?;
            let Some(version) =
                A::swap_parent(guard.executor()?, key, expected_version, &draft).await?
            else {
                let exists = A::exists(guard.executor()?, key).await?;
                return Err(if exists {
                    AppError::edit_conflict()
                } else {
                    AppError::not_found(A::RESOURCE)
                });
            };

            let id = A::parent_id(key);
            A::delete_children(guard.executor()?, id).await?;
            Self::write_children::<A>(&mut guard, id, &children).await?;
            guard.commit().await?;

            Ok::<_, AppError>(Stamp { id, version })
        })
        .await?;

        debug!(version = stamp.version, "Aggregate updated");
        Ok(stamp)
    }

    /// Resolve every reference with bounded concurrency, preserving order
    async fn resolve_all<A: Aggregate>(&self, draft: &A::Draft) -> AppResult<Vec<A::Child>> {
        let pool = self.pool.clone();

        let mut resolved: Vec<(usize, A::Child)> =
            stream::iter(A::references(draft).into_iter().enumerate())
                .map(move |(index, reference)| {
                    let pool = pool.clone();
                    async move { A::resolve(&pool, reference).await.map(|child| (index, child)) }
                })
                .buffer_unordered(REFERENCE_LOOKUP_CONCURRENCY)
                .try_collect()
                .await?;

        resolved.sort_unstable_by_key(|(index, _)| *index);
        Ok(resolved.into_iter().map(|(_, child)| child).collect())
    }

    async fn write_children<A: Aggregate>(
        guard: &mut TransactionGuard<'_>,
        parent_id: i64,
        children: &[A::Child],
    ) -> AppResult<()> {
        for (position, child) in (1_i64..).zip(children) {
            A::insert_child(guard.executor()?, parent_id, position, child).await?;
        }
        Ok(())
    }
}
