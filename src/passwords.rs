// ABOUTME: bcrypt password hashing run on the blocking thread pool
// ABOUTME: Keeps CPU-bound hashing off the async executor
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad

use crate::errors::{AppError, AppResult};

/// Hash a password with bcrypt at `cost`
///
/// # Errors
///
/// Returns an internal error if hashing fails or the blocking task panics
pub async fn hash_password(password: &str, cost: u32) -> AppResult<String> {
    let password = password.to_owned();

    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::internal(format!("password hashing task failed: {e}")))?
        .map_err(|e| AppError::internal(format!("password hashing failed: {e}")))
}

/// Check a password against a stored bcrypt hash
///
/// # Errors
///
/// Returns an internal error if the stored hash cannot be parsed or the
/// blocking task panics; neither is a wrong password
pub async fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let password = password.to_owned();
    let hash = hash.to_owned();

    tokio::task::spawn_blocking(move || bcrypt::verify(&password, &hash))
        .await
        .map_err(|e| AppError::internal(format!("password check task failed: {e}")))?
        .map_err(|e| AppError::internal(format!("stored password hash is unusable: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hash = hash_password("pa55word-long", 4).await.unwrap();
        assert!(verify_password("pa55word-long", &hash).await.unwrap());
        assert!(!verify_password("wrong-password", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_hash_is_an_internal_error() {
        let error = verify_password("anything", "not-a-bcrypt-hash")
            .await
            .unwrap_err();
        assert_eq!(error.code, crate::errors::ErrorCode::InternalError);
        assert_eq!(error.http_status(), 500);
    }
}
