// ABOUTME: Muscle catalogue storage
// ABOUTME: Names are unique and are how exercises refer to muscles
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad

use serde::{Deserialize, Serialize};

use super::{taken, Database};
use crate::errors::{AppResult, FieldError};
use crate::validation::{check_text, Validate};

const NAME_MAX_CHARS: usize = 20;
const GROUP_MAX_CHARS: usize = 20;

/// Stored muscle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Muscle {
    /// Row id
    pub id: i64,
    /// Unique name
    pub name: String,
    /// Body region, e.g. "upper body"
    #[serde(rename = "group")]
    #[sqlx(rename = "muscle_group")]
    pub group: String,
}

/// Body of a muscle creation request
#[derive(Debug, Clone, Deserialize)]
pub struct NewMuscle {
    /// Unique name
    pub name: String,
    /// Body region
    pub group: String,
}

impl Validate for NewMuscle {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        check_text(&mut errors, "name", &self.name, NAME_MAX_CHARS);
        check_text(&mut errors, "group", &self.group, GROUP_MAX_CHARS);
        errors
    }
}

impl Database {
    pub(super) async fn migrate_muscles(&self) -> AppResult<()> {
        self.execute_all(&[r"
            CREATE TABLE IF NOT EXISTS muscles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                muscle_group TEXT NOT NULL
            )
            "])
        .await
    }

    /// Add a muscle to the catalogue
    ///
    /// # Errors
    ///
    /// Returns `ResourceAlreadyExists` if the name is taken
    pub async fn create_muscle(&self, muscle: &NewMuscle) -> AppResult<Muscle> {
        self.bounded(
            "muscle insert",
            sqlx::query_as::<_, Muscle>(
                "INSERT INTO muscles (name, muscle_group) VALUES (?, ?) RETURNING id, name, muscle_group",
            )
            .bind(&muscle.name)
            .bind(&muscle.group)
            .fetch_one(&self.pool),
        )
        .await
        .map_err(taken("a muscle with this name"))
    }

    /// Every muscle, by name
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or misses the deadline
    pub async fn list_muscles(&self) -> AppResult<Vec<Muscle>> {
        self.bounded(
            "muscle list",
            sqlx::query_as::<_, Muscle>("SELECT id, name, muscle_group FROM muscles ORDER BY name")
                .fetch_all(&self.pool),
        )
        .await
    }
}
