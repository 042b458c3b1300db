// ABOUTME: Whole-request deadline that answers with the standard error body
// ABOUTME: An elapsed request becomes a generic 500, the same as an elapsed storage call
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad

use std::time::Duration;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::deadline::with_deadline;
use crate::errors::AppError;

/// Bound the rest of the stack by `deadline`
///
/// Dropping the inner future on expiry cancels in-flight storage calls and
/// rolls back any open transaction guard.
pub async fn request_deadline(
    State(deadline): State<Duration>,
    request: Request,
    next: Next,
) -> Response {
    with_deadline(deadline, "request", async {
        Ok::<_, AppError>(next.run(request).await)
    })
    .await
    .unwrap_or_else(IntoResponse::into_response)
}
