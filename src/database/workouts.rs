// ABOUTME: Owner-scoped workouts with their ordered exercise entries
// ABOUTME: A workout outside the caller's scope behaves exactly like a missing one
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};

use super::writer::{Aggregate, Versioned, INITIAL_VERSION};
use super::Database;
use crate::errors::{AppError, AppResult, FieldError};
use crate::models::UserId;
use crate::validation::{check, check_text, Validate};

const NAME_MAX_CHARS: usize = 50;
const SETS_MAX: i64 = 999;
const REPS_MAX: i64 = 999;
const WEIGHTS_LIMIT: f64 = 1000.0;
const REST_LIMIT_SECS: i64 = 900;

/// Locates one workout inside its owner's scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkoutKey {
    /// Owner
    pub user_id: UserId,
    /// Workout id
    pub id: i64,
}

/// One exercise inside a workout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutEntry {
    /// 1-based position; must match the entry's index in the list
    pub order: i64,
    /// Exercise performed
    pub exercise_id: i64,
    /// Number of sets
    pub sets: i64,
    /// Repetitions per set
    pub reps: i64,
    /// Load per repetition
    pub weights: f64,
    /// Rest after the entry, in seconds
    pub rest_after: i64,
    /// Whether the entry was completed
    #[serde(default)]
    pub done: bool,
}

impl WorkoutEntry {
    fn check(&self, index: usize, errors: &mut Vec<FieldError>) {
        let field = |name: &str| format!("entries[{index}].{name}");

        check(
            errors,
            usize::try_from(self.order).is_ok_and(|order| order == index + 1),
            &field("order"),
            &format!("must be {}", index + 1),
        );
        check(
            errors,
            (1..=SETS_MAX).contains(&self.sets),
            &field("sets"),
            "must be between 1 and 999",
        );
        check(
            errors,
            (0..=REPS_MAX).contains(&self.reps),
            &field("reps"),
            "must be between 0 and 999",
        );
        check(
            errors,
            self.weights.is_finite() && (0.0..WEIGHTS_LIMIT).contains(&self.weights),
            &field("weights"),
            "must be at least 0 and less than 1000",
        );
        check(
            errors,
            (0..REST_LIMIT_SECS).contains(&self.rest_after),
            &field("rest_after"),
            "must be at least 0 and less than 900 seconds",
        );
    }
}

/// Editable workout state
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorkoutDraft {
    /// Owner, taken from the request path
    #[serde(skip)]
    pub user_id: UserId,
    /// Display name
    pub name: String,
    /// Entries in order
    pub entries: Vec<WorkoutEntry>,
}

impl Validate for WorkoutDraft {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        check_text(&mut errors, "name", &self.name, NAME_MAX_CHARS);
        check(
            &mut errors,
            !self.entries.is_empty(),
            "entries",
            "must contain at least one exercise",
        );
        for (index, entry) in self.entries.iter().enumerate() {
            entry.check(index, &mut errors);
        }
        errors
    }
}

/// Partial update; absent fields keep their stored value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkoutPatch {
    /// New name
    pub name: Option<String>,
    /// Replacement entry list
    pub entries: Option<Vec<WorkoutEntry>>,
}

impl WorkoutPatch {
    /// Overlay the present fields on `draft`
    #[must_use]
    pub fn apply(self, mut draft: WorkoutDraft) -> WorkoutDraft {
        if let Some(name) = self.name {
            draft.name = name;
        }
        if let Some(entries) = self.entries {
            draft.entries = entries;
        }
        draft
    }
}

/// Workout as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Workout {
    /// Row id
    pub id: i64,
    /// Owner
    pub user_id: UserId,
    /// Optimistic concurrency version
    pub version: i64,
    /// Display name
    pub name: String,
    /// Entries in order
    pub entries: Vec<WorkoutEntry>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct WorkoutRow {
    id: i64,
    user_id: i64,
    version: i64,
    name: String,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct EntryRow {
    workout_id: i64,
    position: i64,
    exercise_id: i64,
    sets: i64,
    reps: i64,
    weights: f64,
    rest_after: i64,
    done: bool,
}

impl From<EntryRow> for WorkoutEntry {
    fn from(row: EntryRow) -> Self {
        Self {
            order: row.position,
            exercise_id: row.exercise_id,
            sets: row.sets,
            reps: row.reps,
            weights: row.weights,
            rest_after: row.rest_after,
            done: row.done,
        }
    }
}

impl WorkoutRow {
    fn into_workout(self, entries: Vec<WorkoutEntry>) -> Workout {
        Workout {
            id: self.id,
            user_id: self.user_id,
            version: self.version,
            name: self.name,
            entries,
            created_at: self.created_at,
        }
    }
}

const SELECT_WORKOUT: &str = "SELECT id, user_id, version, name, created_at FROM workouts";

const SELECT_ENTRIES: &str = r"
    SELECT we.workout_id, we.position, we.exercise_id, we.sets, we.reps,
           we.weights, we.rest_after, we.done
    FROM workout_exercises we
    JOIN workouts w ON w.id = we.workout_id
";

async fn fetch_workout(pool: &SqlitePool, key: WorkoutKey) -> AppResult<Option<Workout>> {
    let Some(row) = sqlx::query_as::<_, WorkoutRow>(&format!(
        "{SELECT_WORKOUT} WHERE id = ? AND user_id = ?"
    ))
    .bind(key.id)
    .bind(key.user_id)
    .fetch_optional(pool)
    .await?
    else {
        return Ok(None);
    };

    let entries = sqlx::query_as::<_, EntryRow>(&format!(
        "{SELECT_ENTRIES} WHERE we.workout_id = ? ORDER BY we.position"
    ))
    .bind(key.id)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(WorkoutEntry::from)
    .collect();

    Ok(Some(row.into_workout(entries)))
}

/// Storage description of the workout aggregate
pub struct WorkoutAggregate;

#[async_trait::async_trait]
impl Aggregate for WorkoutAggregate {
    type Key = WorkoutKey;
    type Draft = WorkoutDraft;
    type Reference = WorkoutEntry;
    type Child = WorkoutEntry;

    const RESOURCE: &'static str = "workout";

    fn parent_id(key: &WorkoutKey) -> i64 {
        key.id
    }

    fn references(draft: &WorkoutDraft) -> Vec<WorkoutEntry> {
        draft.entries.clone()
    }

    async fn resolve(pool: &SqlitePool, entry: WorkoutEntry) -> AppResult<WorkoutEntry> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM exercises WHERE id = ?")
            .bind(entry.exercise_id)
            .fetch_one(pool)
            .await?;
        if count == 0 {
            return Err(AppError::validation(vec![FieldError::new(
                format!("entries[{}].exercise_id", entry.order - 1),
                format!("unknown exercise {}", entry.exercise_id),
            )]));
        }
        Ok(entry)
    }

    async fn load(
        pool: &SqlitePool,
        key: &WorkoutKey,
    ) -> AppResult<Option<Versioned<WorkoutDraft>>> {
        Ok(fetch_workout(pool, *key).await?.map(|workout| Versioned {
            id: workout.id,
            version: workout.version,
            value: WorkoutDraft {
                user_id: workout.user_id,
                name: workout.name,
                entries: workout.entries,
            },
        }))
    }

    async fn insert_parent(conn: &mut SqliteConnection, draft: &WorkoutDraft) -> AppResult<i64> {
        Ok(sqlx::query_scalar::<_, i64>(
            r"
            INSERT INTO workouts (user_id, name, version, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING id
            ",
        )
        .bind(draft.user_id)
        .bind(&draft.name)
        .bind(INITIAL_VERSION)
        .bind(Utc::now())
        .fetch_one(conn)
        .await?)
    }

    async fn swap_parent(
        conn: &mut SqliteConnection,
        key: &WorkoutKey,
        expected_version: i64,
        draft: &WorkoutDraft,
    ) -> AppResult<Option<i64>> {
        Ok(sqlx::query_scalar::<_, i64>(
            r"
            UPDATE workouts
            SET name = ?, version = version + 1
            WHERE id = ? AND user_id = ? AND version = ?
            RETURNING version
            ",
        )
        .bind(&draft.name)
        .bind(key.id)
        .bind(key.user_id)
        .bind(expected_version)
        .fetch_optional(conn)
        .await?)
    }

    async fn exists(conn: &mut SqliteConnection, key: &WorkoutKey) -> AppResult<bool> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM workouts WHERE id = ? AND user_id = ?",
        )
        .bind(key.id)
        .bind(key.user_id)
        .fetch_one(conn)
        .await?;
        Ok(count > 0)
    }

    async fn delete_children(conn: &mut SqliteConnection, parent_id: i64) -> AppResult<()> {
        sqlx::query("DELETE FROM workout_exercises WHERE workout_id = ?")
            .bind(parent_id)
            .execute(conn)
            .await?;
        Ok(())
    }

    async fn insert_child(
        conn: &mut SqliteConnection,
        parent_id: i64,
        position: i64,
        entry: &WorkoutEntry,
    ) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO workout_exercises
                (workout_id, position, exercise_id, sets, reps, weights, rest_after, done)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(parent_id)
        .bind(position)
        .bind(entry.exercise_id)
        .bind(entry.sets)
        .bind(entry.reps)
        .bind(entry.weights)
        .bind(entry.rest_after)
        .bind(entry.done)
        .execute(conn)
        .await?;
        Ok(())
    }
}

impl Database {
    pub(super) async fn migrate_workouts(&self) -> AppResult<()> {
        self.execute_all(&[
            r"
            CREATE TABLE IF NOT EXISTS workouts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                version INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            )
            ",
            r"
            CREATE TABLE IF NOT EXISTS workout_exercises (
                workout_id INTEGER NOT NULL REFERENCES workouts(id) ON DELETE CASCADE,
                position INTEGER NOT NULL,
                exercise_id INTEGER NOT NULL REFERENCES exercises(id),
                sets INTEGER NOT NULL,
                reps INTEGER NOT NULL,
                weights REAL NOT NULL,
                rest_after INTEGER NOT NULL,
                done BOOLEAN NOT NULL DEFAULT 0,
                PRIMARY KEY (workout_id, position)
            )
            ",
            "CREATE INDEX IF NOT EXISTS idx_workouts_user ON workouts(user_id)",
            "CREATE INDEX IF NOT EXISTS idx_workout_exercises_exercise ON workout_exercises(exercise_id)",
        ])
        .await
    }

    /// Every workout owned by `user_id`, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or misses the deadline
    pub async fn list_workouts(&self, user_id: UserId) -> AppResult<Vec<Workout>> {
        self.bounded("workout list", async {
            let rows = sqlx::query_as::<_, WorkoutRow>(&format!(
                "{SELECT_WORKOUT} WHERE user_id = ? ORDER BY id DESC"
            ))
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

            let mut grouped: HashMap<i64, Vec<WorkoutEntry>> = HashMap::new();
            let entries = sqlx::query_as::<_, EntryRow>(&format!(
                "{SELECT_ENTRIES} WHERE w.user_id = ? ORDER BY we.workout_id, we.position"
            ))
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
            for entry in entries {
                grouped
                    .entry(entry.workout_id)
                    .or_default()
                    .push(WorkoutEntry::from(entry));
            }

            Ok::<_, AppError>(
                rows.into_iter()
                    .map(|row| {
                        let entries = grouped.remove(&row.id).unwrap_or_default();
                        row.into_workout(entries)
                    })
                    .collect(),
            )
        })
        .await
    }

    /// One workout within its owner's scope
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` if the workout is absent or owned by someone else
    pub async fn get_workout(&self, key: WorkoutKey) -> AppResult<Workout> {
        self.bounded("workout lookup", fetch_workout(&self.pool, key))
            .await?
            .ok_or_else(|| AppError::not_found(WorkoutAggregate::RESOURCE))
    }

    /// Remove a workout and its entries
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` if the workout is absent or owned by someone else
    pub async fn delete_workout(&self, key: WorkoutKey) -> AppResult<()> {
        let deleted = self
            .bounded(
                "workout delete",
                sqlx::query("DELETE FROM workouts WHERE id = ? AND user_id = ?")
                    .bind(key.id)
                    .bind(key.user_id)
                    .execute(&self.pool),
            )
            .await?;

        if deleted.rows_affected() == 0 {
            return Err(AppError::not_found(WorkoutAggregate::RESOURCE));
        }
        Ok(())
    }
}
