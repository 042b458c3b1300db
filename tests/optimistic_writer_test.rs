// ABOUTME: Integration tests for version-checked aggregate writes
// ABOUTME: Covers the concurrent update race and all-or-nothing child fan-out
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use std::time::Duration;

use jasad::database::exercises::{ExerciseAggregate, ExerciseDraft, ExercisePatch};
use jasad::database::muscles::NewMuscle;
use jasad::database::writer::{Versioned, INITIAL_VERSION};
use jasad::database::{Aggregate, Database};
use jasad::errors::{AppError, AppResult, ErrorCode, FieldError};
use jasad::validation::Validate;
use sqlx::{SqliteConnection, SqlitePool};

const DEADLINE: Duration = Duration::from_secs(5);

async fn catalogue() -> Database {
    let db = Database::in_memory(DEADLINE).await.unwrap();
    for (name, group) in [("chest", "push"), ("triceps", "push"), ("lats", "pull")] {
        db.create_muscle(&NewMuscle {
            name: name.to_owned(),
            group: group.to_owned(),
        })
        .await
        .unwrap();
    }
    db
}

fn bench_press() -> ExerciseDraft {
    ExerciseDraft {
        name: "bench press".to_owned(),
        description: "Press the bar from the chest".to_owned(),
        reference_video: None,
        muscles: vec!["chest".to_owned(), "triceps".to_owned()],
    }
}

fn rename(name: &str) -> impl FnOnce(ExerciseDraft) -> ExerciseDraft {
    let patch = ExercisePatch {
        name: Some(name.to_owned()),
        ..ExercisePatch::default()
    };
    move |draft| patch.apply(draft)
}

// ============================================================================
// Concurrent updates
// ============================================================================

#[tokio::test]
async fn test_two_writers_on_one_version_exactly_one_wins() {
    let db = catalogue().await;
    let writer = db.writer();

    let stamp = writer.create::<ExerciseAggregate>(bench_press()).await.unwrap();
    assert_eq!(stamp.version, INITIAL_VERSION);
    writer
        .update::<ExerciseAggregate, _>(&stamp.id, 1, rename("bench press 2"))
        .await
        .unwrap();
    writer
        .update::<ExerciseAggregate, _>(&stamp.id, 2, rename("bench press 3"))
        .await
        .unwrap();

    let pull_only = ExercisePatch {
        name: Some("pulldown".to_owned()),
        muscles: Some(vec!["lats".to_owned()]),
        ..ExercisePatch::default()
    };
    let (first, second) = tokio::join!(
        writer.update::<ExerciseAggregate, _>(&stamp.id, 3, rename("incline press")),
        writer.update::<ExerciseAggregate, _>(&stamp.id, 3, move |d| pull_only.apply(d)),
    );

    let (won, lost) = match (first, second) {
        (Ok(won), Err(lost)) | (Err(lost), Ok(won)) => (won, lost),
        other => panic!("expected exactly one winner, got {other:?}"),
    };
    assert_eq!(won.version, 4);
    assert_eq!(lost.code, ErrorCode::EditConflict);
    assert_eq!(lost.http_status(), 409);

    // The stored aggregate is entirely one writer's state
    let stored = db.get_exercise(stamp.id).await.unwrap();
    assert_eq!(stored.version, 4);
    let muscles: Vec<&str> = stored.muscles.iter().map(|m| m.name.as_str()).collect();
    match stored.name.as_str() {
        "incline press" => assert_eq!(muscles, ["chest", "triceps"]),
        "pulldown" => assert_eq!(muscles, ["lats"]),
        other => panic!("unexpected name {other}"),
    }
}

#[tokio::test]
async fn test_stale_writer_never_overwrites() {
    let db = catalogue().await;
    let writer = db.writer();
    let stamp = writer.create::<ExerciseAggregate>(bench_press()).await.unwrap();

    writer
        .update::<ExerciseAggregate, _>(&stamp.id, 1, rename("first"))
        .await
        .unwrap();
    let error = writer
        .update::<ExerciseAggregate, _>(&stamp.id, 1, rename("second"))
        .await
        .unwrap_err();

    assert_eq!(error.code, ErrorCode::EditConflict);
    assert_eq!(db.get_exercise(stamp.id).await.unwrap().name, "first");
}

#[tokio::test]
async fn test_conflict_and_duplicate_are_distinct() {
    let db = catalogue().await;
    let writer = db.writer();
    writer.create::<ExerciseAggregate>(bench_press()).await.unwrap();

    let duplicate = writer
        .create::<ExerciseAggregate>(bench_press())
        .await
        .unwrap_err();
    assert_eq!(duplicate.code, ErrorCode::ResourceAlreadyExists);
    assert_ne!(
        duplicate.client_message(),
        AppError::edit_conflict().client_message()
    );
}

// ============================================================================
// All-or-nothing child fan-out
// ============================================================================

/// Parent with integer children; the `ledger_lines` table rejects negatives
struct Ledger;

struct LedgerDraft {
    title: String,
    amounts: Vec<i64>,
}

impl Validate for LedgerDraft {
    fn validate(&self) -> Vec<FieldError> {
        Vec::new()
    }
}

async fn ledger_pool() -> (Database, SqlitePool) {
    let db = Database::in_memory(DEADLINE).await.unwrap();
    let pool = db.pool().clone();
    for statement in [
        "CREATE TABLE ledgers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            version INTEGER NOT NULL,
            title TEXT NOT NULL
        )",
        "CREATE TABLE ledger_lines (
            ledger_id INTEGER NOT NULL REFERENCES ledgers(id),
            position INTEGER NOT NULL,
            amount INTEGER NOT NULL CHECK (amount >= 0),
            PRIMARY KEY (ledger_id, position)
        )",
    ] {
        sqlx::query(statement).execute(&pool).await.unwrap();
    }
    (db, pool)
}

#[async_trait::async_trait]
impl Aggregate for Ledger {
    type Key = i64;
    type Draft = LedgerDraft;
    type Reference = i64;
    type Child = i64;

    const RESOURCE: &'static str = "ledger";

    fn parent_id(key: &i64) -> i64 {
        *key
    }

    fn references(draft: &LedgerDraft) -> Vec<i64> {
        draft.amounts.clone()
    }

    async fn resolve(_pool: &SqlitePool, amount: i64) -> AppResult<i64> {
        Ok(amount)
    }

    async fn load(pool: &SqlitePool, key: &i64) -> AppResult<Option<Versioned<LedgerDraft>>> {
        let row: Option<(i64, String)> =
            sqlx::query_as("SELECT version, title FROM ledgers WHERE id = ?")
                .bind(key)
                .fetch_optional(pool)
                .await?;
        let Some((version, title)) = row else {
            return Ok(None);
        };
        let amounts: Vec<i64> = sqlx::query_scalar(
            "SELECT amount FROM ledger_lines WHERE ledger_id = ? ORDER BY position",
        )
        .bind(key)
        .fetch_all(pool)
        .await?;
        Ok(Some(Versioned {
            id: *key,
            version,
            value: LedgerDraft { title, amounts },
        }))
    }

    async fn insert_parent(conn: &mut SqliteConnection, draft: &LedgerDraft) -> AppResult<i64> {
        let id = sqlx::query_scalar("INSERT INTO ledgers (version, title) VALUES (?, ?) RETURNING id")
            .bind(INITIAL_VERSION)
            .bind(&draft.title)
            .fetch_one(conn)
            .await?;
        Ok(id)
    }

    async fn swap_parent(
        conn: &mut SqliteConnection,
        key: &i64,
        expected_version: i64,
        draft: &LedgerDraft,
    ) -> AppResult<Option<i64>> {
        let version = sqlx::query_scalar(
            "UPDATE ledgers SET version = version + 1, title = ?
             WHERE id = ? AND version = ? RETURNING version",
        )
        .bind(&draft.title)
        .bind(key)
        .bind(expected_version)
        .fetch_optional(conn)
        .await?;
        Ok(version)
    }

    async fn exists(conn: &mut SqliteConnection, key: &i64) -> AppResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ledgers WHERE id = ?")
            .bind(key)
            .fetch_one(conn)
            .await?;
        Ok(count > 0)
    }

    async fn delete_children(conn: &mut SqliteConnection, parent_id: i64) -> AppResult<()> {
        sqlx::query("DELETE FROM ledger_lines WHERE ledger_id = ?")
            .bind(parent_id)
            .execute(conn)
            .await?;
        Ok(())
    }

    async fn insert_child(
        conn: &mut SqliteConnection,
        parent_id: i64,
        position: i64,
        amount: &i64,
    ) -> AppResult<()> {
        sqlx::query("INSERT INTO ledger_lines (ledger_id, position, amount) VALUES (?, ?, ?)")
            .bind(parent_id)
            .bind(position)
            .bind(amount)
            .execute(conn)
            .await?;
        Ok(())
    }
}

async fn row_counts(pool: &SqlitePool) -> (i64, i64) {
    let parents = sqlx::query_scalar("SELECT COUNT(*) FROM ledgers")
        .fetch_one(pool)
        .await
        .unwrap();
    let children = sqlx::query_scalar("SELECT COUNT(*) FROM ledger_lines")
        .fetch_one(pool)
        .await
        .unwrap();
    (parents, children)
}

#[tokio::test]
async fn test_failed_child_insert_leaves_no_rows() {
    let (db, pool) = ledger_pool().await;

    let result = db
        .writer()
        .create::<Ledger>(LedgerDraft {
            title: "march".to_owned(),
            amounts: vec![10, 20, -5, 40],
        })
        .await;

    assert!(result.is_err());
    assert_eq!(row_counts(&pool).await, (0, 0));
}

#[tokio::test]
async fn test_failed_update_keeps_previous_children() {
    let (db, pool) = ledger_pool().await;
    let writer = db.writer();

    let stamp = writer
        .create::<Ledger>(LedgerDraft {
            title: "april".to_owned(),
            amounts: vec![1, 2, 3],
        })
        .await
        .unwrap();
    assert_eq!(row_counts(&pool).await, (1, 3));

    let result = writer
        .update::<Ledger, _>(&stamp.id, stamp.version, |_| LedgerDraft {
            title: "april (revised)".to_owned(),
            amounts: vec![7, -1],
        })
        .await;
    assert!(result.is_err());

    let stored = Ledger::load(&pool, &stamp.id).await.unwrap().unwrap();
    assert_eq!(stored.version, stamp.version);
    assert_eq!(stored.value.title, "april");
    assert_eq!(stored.value.amounts, [1, 2, 3]);
}

#[tokio::test]
async fn test_update_of_missing_aggregate_is_not_found() {
    let (db, _pool) = ledger_pool().await;
    let error = db
        .writer()
        .update::<Ledger, _>(&404, 1, |draft| draft)
        .await
        .unwrap_err();
    assert_eq!(error.code, ErrorCode::ResourceNotFound);
}
