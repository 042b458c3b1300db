// ABOUTME: Opaque session tokens backed by the shared key-value store
// ABOUTME: Stores only the SHA-256 of each token, with the store's native TTL
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad

//! # Sessions
//!
//! A session token is 128 random bits handed to the caller once. The store
//! only ever sees `hex(SHA-256(token))` as the key, so reading the store does
//! not yield usable bearer values. Records expire through the store's TTL or
//! are deleted on sign out.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use jasad_core::constants::auth::SESSION_TOKEN_BYTES;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::deadline::with_deadline;
use crate::errors::{AppError, AppResult};
use crate::kv::KeyValueStore;
use crate::models::{Principal, Role, UserId};

/// A resolved session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Identity the session was created for
    pub principal: Principal,
    /// Wall-clock expiry
    pub expires_at: DateTime<Utc>,
}

/// Stored form of a session, keyed by the token hash
#[derive(Debug, Serialize, Deserialize)]
struct SessionRecord {
    principal_id: UserId,
    role: Role,
    expires_at: DateTime<Utc>,
}

/// Issues and resolves opaque session tokens
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
    deadline: Duration,
}

impl SessionStore {
    /// Create a session store over `store`, bounding every call by `deadline`
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, deadline: Duration) -> Self {
        Self { store, deadline }
    }

    /// Create a session and return the bearer token
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written before the deadline
    #[tracing::instrument(skip(self), fields(user_id = principal.id))]
    pub async fn create(&self, principal: &Principal, ttl: Duration) -> AppResult<String> {
        let token = generate_token();
        let lifetime = chrono::Duration::from_std(ttl)
            .map_err(|_| AppError::invalid_input("session lifetime out of range"))?;

        let record = SessionRecord {
            principal_id: principal.id,
            role: principal.role,
            expires_at: Utc::now() + lifetime,
        };
        let value = serde_json::to_vec(&record)?;

        with_deadline(
            self.deadline,
            "session write",
            self.store.set_ex(&token_key(&token), value, ttl),
        )
        .await?;

        tracing::debug!("Session created");
        Ok(token)
    }

    /// Resolve a bearer token to its session
    ///
    /// Absent, expired, and never-issued tokens fail identically.
    ///
    /// # Errors
    ///
    /// Returns `AuthInvalid` when no live session matches, or a storage error
    /// if the store cannot be read before the deadline
    pub async fn resolve(&self, token: &str) -> AppResult<Session> {
        let raw = with_deadline(
            self.deadline,
            "session lookup",
            self.store.get(&token_key(token)),
        )
        .await?
        .ok_or_else(|| AppError::auth_invalid("session not found"))?;

        let record: SessionRecord = serde_json::from_slice(&raw)
            .map_err(|e| AppError::storage(format!("corrupt session record: {e}")))?;

        if record.expires_at <= Utc::now() {
            return Err(AppError::auth_invalid("session not found"));
        }

        Ok(Session {
            principal: Principal::new(record.principal_id, record.role),
            expires_at: record.expires_at,
        })
    }

    /// Delete the session behind `token`; unknown tokens are ignored
    ///
    /// # Errors
    ///
    /// Returns a storage error if the record cannot be deleted before the deadline
    pub async fn revoke(&self, token: &str) -> AppResult<()> {
        with_deadline(
            self.deadline,
            "session revoke",
            self.store.remove(&token_key(token)),
        )
        .await?;
        tracing::debug!("Session revoked");
        Ok(())
    }
}

/// 128 random bits, base64url without padding
fn generate_token() -> String {
    let mut bytes = [0u8; SESSION_TOKEN_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Store key for a token: lowercase hex SHA-256
fn token_key(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
