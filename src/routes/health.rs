// ABOUTME: Health check route handlers for service monitoring
// ABOUTME: Liveness always answers; readiness pings the database and the key-value store
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::deadline::with_deadline;
use crate::errors::AppResult;
use crate::resources::ServerResources;

/// Health routes implementation
pub struct HealthRoutes;

impl HealthRoutes {
    /// Create all health check routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/health", get(Self::handle_health))
            .route("/ready", get(Self::handle_ready))
            .with_state(resources)
    }

    async fn handle_health() -> Json<Value> {
        Json(json!({
            "status": "healthy",
            "timestamp": chrono::Utc::now().to_rfc3339()
        }))
    }

    async fn handle_ready(State(resources): State<Arc<ServerResources>>) -> AppResult<Json<Value>> {
        resources.database.health_check().await?;
        with_deadline(
            resources.config.timeouts.storage,
            "key-value health check",
            resources.kv.health_check(),
        )
        .await?;

        Ok(Json(json!({
            "status": "ready",
            "key_value_store": resources.kv.backend_name(),
            "timestamp": chrono::Utc::now().to_rfc3339()
        })))
    }
}
