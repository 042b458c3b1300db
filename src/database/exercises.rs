// ABOUTME: Exercise catalogue with its ordered muscle associations
// ABOUTME: Exercises are versioned aggregates written through the optimistic writer
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use super::muscles::Muscle;
use super::writer::{Aggregate, Versioned, INITIAL_VERSION};
use super::{taken, Database};
use crate::errors::{AppError, AppResult, FieldError};
use crate::pagination::{PageMetadata, PageRequest};
use crate::validation::{check, check_text, check_unique, Validate};

const NAME_MIN_CHARS: usize = 3;
const NAME_MAX_CHARS: usize = 30;
const DESCRIPTION_MAX_CHARS: usize = 300;
const VIDEO_MAX_CHARS: usize = 2048;

/// Exercise as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Exercise {
    /// Row id
    pub id: i64,
    /// Optimistic concurrency version
    pub version: i64,
    /// Unique name
    pub name: String,
    /// How to perform it
    pub description: String,
    /// Demonstration link
    pub reference_video: Option<String>,
    /// Muscles worked, in submission order
    pub muscles: Vec<Muscle>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Editable exercise state; muscles are referenced by name
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExerciseDraft {
    /// Unique name
    pub name: String,
    /// How to perform it
    pub description: String,
    /// Demonstration link
    #[serde(default)]
    pub reference_video: Option<String>,
    /// Muscle names
    pub muscles: Vec<String>,
}

impl Validate for ExerciseDraft {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();

        check_text(&mut errors, "name", &self.name, NAME_MAX_CHARS);
        check(
            &mut errors,
            self.name.chars().count() >= NAME_MIN_CHARS,
            "name",
            "must be at least 3 characters long",
        );
        check_text(&mut errors, "description", &self.description, DESCRIPTION_MAX_CHARS);

        if let Some(video) = &self.reference_video {
            check(
                &mut errors,
                video.starts_with("https://") || video.starts_with("http://"),
                "reference_video",
                "must be an http or https URL",
            );
            check(
                &mut errors,
                video.len() <= VIDEO_MAX_CHARS,
                "reference_video",
                "must not be more than 2048 characters long",
            );
        }

        check(
            &mut errors,
            !self.muscles.is_empty(),
            "muscles",
            "must contain at least one muscle",
        );
        check_unique(&mut errors, "muscles", &self.muscles);
        errors
    }
}

/// Partial update; absent fields keep their stored value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExercisePatch {
    /// New name
    pub name: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New link; absent keeps the stored link, explicit `null` clears it
    #[serde(default, deserialize_with = "present")]
    pub reference_video: Option<Option<String>>,
    /// Replacement muscle list
    pub muscles: Option<Vec<String>>,
}

impl ExercisePatch {
    /// Overlay the present fields on `draft`
    #[must_use]
    pub fn apply(self, mut draft: ExerciseDraft) -> ExerciseDraft {
        if let Some(name) = self.name {
            draft.name = name;
        }
        if let Some(description) = self.description {
            draft.description = description;
        }
        if let Some(video) = self.reference_video {
            draft.reference_video = video;
        }
        if let Some(muscles) = self.muscles {
            draft.muscles = muscles;
        }
        draft
    }
}

/// Marks a field as present, so `null` becomes `Some(None)` and absence stays `None`
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Column an exercise search is ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExerciseSortField {
    /// Row id, the creation order
    Id,
    /// Exercise name
    Name,
}

/// Ordering of an exercise search; ties always break on ascending id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExerciseSort {
    /// Column to order by
    pub field: ExerciseSortField,
    /// Reverse order
    pub descending: bool,
}

impl Default for ExerciseSort {
    fn default() -> Self {
        Self {
            field: ExerciseSortField::Id,
            descending: false,
        }
    }
}

impl ExerciseSort {
    /// Accepted `sort` values; a leading `-` sorts descending
    pub const SAFELIST: [&'static str; 4] = ["id", "name", "-id", "-name"];

    /// Parse a `sort` query value against [`Self::SAFELIST`]
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let (descending, column) = raw
            .strip_prefix('-')
            .map_or((false, raw), |column| (true, column));
        let field = match column {
            "id" => ExerciseSortField::Id,
            "name" => ExerciseSortField::Name,
            _ => return None,
        };
        Some(Self { field, descending })
    }

    fn order_by(self) -> &'static str {
        match (self.field, self.descending) {
            (ExerciseSortField::Id, false) => "id ASC",
            (ExerciseSortField::Id, true) => "id DESC",
            (ExerciseSortField::Name, false) => "name ASC, id ASC",
            (ExerciseSortField::Name, true) => "name DESC, id ASC",
        }
    }
}

/// Exercise search: optional filters, ordering, and the requested page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExerciseSearch {
    /// Case-insensitive substring of the exercise name
    pub name: Option<String>,
    /// Exact name of a muscle the exercise works
    pub muscle: Option<String>,
    /// Ordering
    pub sort: ExerciseSort,
    /// Page to return
    pub page: PageRequest,
}

/// One page of exercises with its position in the full result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExercisePage {
    /// Exercises on this page
    pub exercises: Vec<Exercise>,
    /// Paging envelope
    pub metadata: PageMetadata,
}

#[derive(sqlx::FromRow)]
struct ExerciseRow {
    id: i64,
    version: i64,
    name: String,
    description: String,
    reference_video: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct SearchRow {
    total_records: i64,
    #[sqlx(flatten)]
    exercise: ExerciseRow,
}

#[derive(sqlx::FromRow)]
struct AssociationRow {
    exercise_id: i64,
    id: i64,
    name: String,
    muscle_group: String,
}

impl ExerciseRow {
    fn into_exercise(self, muscles: Vec<Muscle>) -> Exercise {
        Exercise {
            id: self.id,
            version: self.version,
            name: self.name,
            description: self.description,
            reference_video: self.reference_video,
            muscles,
            created_at: self.created_at,
        }
    }
}

const SELECT_EXERCISE: &str =
    "SELECT id, version, name, description, reference_video, created_at FROM exercises";

const SELECT_ASSOCIATIONS: &str = r"
    SELECT em.exercise_id, m.id, m.name, m.muscle_group
    FROM exercise_muscles em
    JOIN muscles m ON m.id = em.muscle_id
";

/// Muscle associations of `exercise_ids`, grouped by exercise, each list in position order
async fn associations(
    pool: &SqlitePool,
    exercise_ids: &[i64],
) -> AppResult<HashMap<i64, Vec<Muscle>>> {
    if exercise_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut query = QueryBuilder::<Sqlite>::new(SELECT_ASSOCIATIONS);
    query.push(" WHERE em.exercise_id IN (");
    let mut ids = query.separated(", ");
    for id in exercise_ids {
        ids.push_bind(*id);
    }
    ids.push_unseparated(") ORDER BY em.exercise_id, em.position");

    let rows = query
        .build_query_as::<AssociationRow>()
        .fetch_all(pool)
        .await?;

    let mut grouped: HashMap<i64, Vec<Muscle>> = HashMap::new();
    for row in rows {
        grouped.entry(row.exercise_id).or_default().push(Muscle {
            id: row.id,
            name: row.name,
            group: row.muscle_group,
        });
    }
    Ok(grouped)
}

async fn fetch_exercise(pool: &SqlitePool, id: i64) -> AppResult<Option<Exercise>> {
    let Some(row) = sqlx::query_as::<_, ExerciseRow>(&format!("{SELECT_EXERCISE} WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?
    else {
        return Ok(None);
    };

    let muscles = associations(pool, &[id])
        .await?
        .remove(&id)
        .unwrap_or_default();
    Ok(Some(row.into_exercise(muscles)))
}

/// Storage description of the exercise aggregate
pub struct ExerciseAggregate;

#[async_trait::async_trait]
impl Aggregate for ExerciseAggregate {
    type Key = i64;
    type Draft = ExerciseDraft;
    type Reference = String;
    type Child = i64;

    const RESOURCE: &'static str = "exercise";

    fn parent_id(key: &i64) -> i64 {
        *key
    }

    fn references(draft: &ExerciseDraft) -> Vec<String> {
        draft.muscles.clone()
    }

    async fn resolve(pool: &SqlitePool, name: String) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT id FROM muscles WHERE name = ?")
            .bind(&name)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| {
                AppError::validation(vec![FieldError::new(
                    "muscles",
                    format!("unknown muscle '{name}'"),
                )])
            })
    }

    async fn load(pool: &SqlitePool, key: &i64) -> AppResult<Option<Versioned<ExerciseDraft>>> {
        Ok(fetch_exercise(pool, *key).await?.map(|exercise| Versioned {
            id: exercise.id,
            version: exercise.version,
            value: ExerciseDraft {
                name: exercise.name,
                description: exercise.description,
                reference_video: exercise.reference_video,
                muscles: exercise.muscles.into_iter().map(|m| m.name).collect(),
            },
        }))
    }

    async fn insert_parent(conn: &mut SqliteConnection, draft: &ExerciseDraft) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>(
            r"
            INSERT INTO exercises (name, description, reference_video, version, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id
            ",
        )
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(&draft.reference_video)
        .bind(INITIAL_VERSION)
        .bind(Utc::now())
        .fetch_one(conn)
        .await
        .map_err(|e| taken("an exercise with this name")(e.into()))
    }

    async fn swap_parent(
        conn: &mut SqliteConnection,
        key: &i64,
        expected_version: i64,
        draft: &ExerciseDraft,
    ) -> AppResult<Option<i64>> {
        sqlx::query_scalar::<_, i64>(
            r"
            UPDATE exercises
            SET name = ?, description = ?, reference_video = ?, version = version + 1
            WHERE id = ? AND version = ?
            RETURNING version
            ",
        )
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(&draft.reference_video)
        .bind(key)
        .bind(expected_version)
        .fetch_optional(conn)
        .await
        .map_err(|e| taken("an exercise with this name")(e.into()))
    }

    async fn exists(conn: &mut SqliteConnection, key: &i64) -> AppResult<bool> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM exercises WHERE id = ?")
            .bind(key)
            .fetch_one(conn)
            .await?;
        Ok(count > 0)
    }

    async fn delete_children(conn: &mut SqliteConnection, parent_id: i64) -> AppResult<()> {
        sqlx::query("DELETE FROM exercise_muscles WHERE exercise_id = ?")
            .bind(parent_id)
            .execute(conn)
            .await?;
        Ok(())
    }

    async fn insert_child(
        conn: &mut SqliteConnection,
        parent_id: i64,
        position: i64,
        muscle_id: &i64,
    ) -> AppResult<()> {
        sqlx::query("INSERT INTO exercise_muscles (exercise_id, muscle_id, position) VALUES (?, ?, ?)")
            .bind(parent_id)
            .bind(muscle_id)
            .bind(position)
            .execute(conn)
            .await?;
        Ok(())
    }
}

impl Database {
    pub(super) async fn migrate_exercises(&self) -> AppResult<()> {
        self.execute_all(&[
            r"
            CREATE TABLE IF NOT EXISTS exercises (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                description TEXT NOT NULL,
                reference_video TEXT,
                version INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            )
            ",
            r"
            CREATE TABLE IF NOT EXISTS exercise_muscles (
                exercise_id INTEGER NOT NULL REFERENCES exercises(id) ON DELETE CASCADE,
                muscle_id INTEGER NOT NULL REFERENCES muscles(id),
                position INTEGER NOT NULL,
                PRIMARY KEY (exercise_id, muscle_id)
            )
            ",
            "CREATE INDEX IF NOT EXISTS idx_exercise_muscles_muscle ON exercise_muscles(muscle_id)",
        ])
        .await
    }

    /// One page of exercises matching `search`
    ///
    /// Empty filter values match everything. A page past the end is empty
    /// and carries empty metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or misses the deadline
    pub async fn search_exercises(&self, search: &ExerciseSearch) -> AppResult<ExercisePage> {
        let name = search.name.as_deref().filter(|n| !n.is_empty());
        let muscle = search.muscle.as_deref().filter(|m| !m.is_empty());

        self.bounded("exercise search", async {
            let rows = sqlx::query_as::<_, SearchRow>(&format!(
                r"
                SELECT COUNT(*) OVER () AS total_records,
                       id, version, name, description, reference_video, created_at
                FROM exercises
                WHERE (?1 IS NULL OR instr(lower(name), lower(?1)) > 0)
                AND (?2 IS NULL OR id IN (
                    SELECT em.exercise_id FROM exercise_muscles em
                    JOIN muscles m ON m.id = em.muscle_id
                    WHERE m.name = ?2
                ))
                ORDER BY {}
                LIMIT ?3 OFFSET ?4
                ",
                search.sort.order_by()
            ))
            .bind(name)
            .bind(muscle)
            .bind(search.page.limit())
            .bind(search.page.offset())
            .fetch_all(&self.pool)
            .await?;

            let total = rows
                .first()
                .map_or(0, |row| u64::try_from(row.total_records).unwrap_or(0));
            let ids: Vec<i64> = rows.iter().map(|row| row.exercise.id).collect();
            let mut grouped = associations(&self.pool, &ids).await?;

            let exercises = rows
                .into_iter()
                .map(|row| {
                    let muscles = grouped.remove(&row.exercise.id).unwrap_or_default();
                    row.exercise.into_exercise(muscles)
                })
                .collect();

            Ok::<_, AppError>(ExercisePage {
                exercises,
                metadata: PageMetadata::new(total, search.page),
            })
        })
        .await
    }

    /// One exercise with its muscles
    ///
    /// # Errors
    ///
    /// Returns `ResourceNotFound` if no exercise has this id
    pub async fn get_exercise(&self, id: i64) -> AppResult<Exercise> {
        self.bounded("exercise lookup", fetch_exercise(&self.pool, id))
            .await?
            .ok_or_else(|| AppError::not_found(ExerciseAggregate::RESOURCE))
    }

    /// Remove an exercise and its muscle associations
    ///
    /// # Errors
    ///
    /// - `ResourceNotFound` if no exercise has this id
    /// - `InvalidInput` if a workout still uses it
    pub async fn delete_exercise(&self, id: i64) -> AppResult<()> {
        let deleted = self
            .bounded("exercise delete", async {
                sqlx::query("DELETE FROM exercises WHERE id = ?")
                    .bind(id)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| match &e {
                        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                            AppError::invalid_input("exercise is still used by a workout")
                        }
                        _ => AppError::from(e),
                    })
            })
            .await?;

        if deleted.rows_affected() == 0 {
            return Err(AppError::not_found(ExerciseAggregate::RESOURCE));
        }
        Ok(())
    }
}
