// ABOUTME: Account storage: creation, lookup by name and id
// ABOUTME: Usernames are unique; roles are stored as text and parsed on read
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{taken, Database};
use crate::errors::{AppError, AppResult};
use crate::models::{Principal, Role, UserId};

/// Stored account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Account id
    pub id: UserId,
    /// Unique login name
    pub username: String,
    /// bcrypt hash
    pub password_hash: String,
    /// Access level
    pub role: Role,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Identity this account authenticates as
    #[must_use]
    pub const fn principal(&self) -> Principal {
        Principal::new(self.id, self.role)
    }
}

/// Account as returned to clients
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    /// Account id
    pub id: UserId,
    /// Login name
    pub username: String,
    /// Access level
    pub role: Role,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            role: user.role,
            created_at: user.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> AppResult<Self> {
        Ok(Self {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            role: row
                .role
                .parse()
                .map_err(|_| AppError::database(format!("user {} has unknown role", row.id)))?,
            created_at: row.created_at,
        })
    }
}

const SELECT_USER: &str = "SELECT id, username, password_hash, role, created_at FROM users";

impl Database {
    pub(super) async fn migrate_users(&self) -> AppResult<()> {
        self.execute_all(&[r"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'user' CHECK (role IN ('user', 'admin')),
                created_at TEXT NOT NULL
            )
            "])
        .await
    }

    /// Create an account
    ///
    /// # Errors
    ///
    /// Returns `ResourceAlreadyExists` if the username is taken
    pub async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role: Role,
    ) -> AppResult<User> {
        let row = self
            .bounded(
                "user insert",
                sqlx::query_as::<_, UserRow>(
                    r"
                    INSERT INTO users (username, password_hash, role, created_at)
                    VALUES (?, ?, ?, ?)
                    RETURNING id, username, password_hash, role, created_at
                    ",
                )
                .bind(username)
                .bind(password_hash)
                .bind(role.as_str())
                .bind(Utc::now())
                .fetch_one(&self.pool),
            )
            .await
            .map_err(taken("a user with this username"))?;
        User::try_from(row)
    }

    /// Look up an account by login name
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or misses the deadline
    pub async fn get_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        self.bounded(
            "user lookup",
            sqlx::query_as::<_, UserRow>(&format!("{SELECT_USER} WHERE username = ?"))
                .bind(username)
                .fetch_optional(&self.pool),
        )
        .await?
        .map(User::try_from)
        .transpose()
    }

    /// Look up an account by id
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or misses the deadline
    pub async fn get_user(&self, id: UserId) -> AppResult<Option<User>> {
        self.bounded(
            "user lookup",
            sqlx::query_as::<_, UserRow>(&format!("{SELECT_USER} WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool),
        )
        .await?
        .map(User::try_from)
        .transpose()
    }
}
