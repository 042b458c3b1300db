// ABOUTME: Deadline wrapper applied to every key-value and database call
// ABOUTME: Converts an elapsed deadline into an internal error instead of hanging the request
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad

use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;

use crate::errors::{AppError, AppResult};

/// Run a storage operation under `deadline`
///
/// The operation is dropped when the deadline elapses, which cancels any
/// in-flight query and rolls back an open transaction guard.
///
/// # Errors
///
/// Returns the operation's own error, or an internal error when the deadline
/// elapses first
///
/// # Example
/// ```rust,no_run
/// use std::time::Duration;
/// use jasad::deadline::with_deadline;
///
/// # async fn example() -> jasad::errors::AppResult<()> {
/// let value = with_deadline(Duration::from_secs(5), "lookup", async {
///     Ok::<_, jasad::errors::AppError>(42)
/// })
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn with_deadline<F, T, E>(deadline: Duration, operation: &str, future: F) -> AppResult<T>
where
    F: Future<Output = Result<T, E>>,
    E: Into<AppError>,
{
    (timeout(deadline, future).await).map_or_else(
        |_| {
            Err(AppError::internal(format!(
                "{operation} timed out after {}ms",
                deadline.as_millis()
            )))
        },
        |result| result.map_err(Into::into),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;

    #[tokio::test(start_paused = true)]
    async fn test_deadline_elapses() {
        let result: AppResult<()> = with_deadline(Duration::from_secs(1), "slow call", async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, AppError>(())
        })
        .await;

        let error = result.unwrap_err();
        assert_eq!(error.code, ErrorCode::InternalError);
        assert!(error.message.contains("slow call"));
    }

    #[tokio::test]
    async fn test_inner_error_passes_through() {
        let result: AppResult<()> = with_deadline(Duration::from_secs(1), "call", async {
            Err(AppError::edit_conflict())
        })
        .await;

        assert_eq!(result.unwrap_err().code, ErrorCode::EditConflict);
    }
}
