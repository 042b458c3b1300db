// ABOUTME: Muscle catalogue route handlers
// ABOUTME: Anyone may list muscles; only administrators add them
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use http::StatusCode;
use tracing::info;

use super::ApiJson;
use crate::database::muscles::{Muscle, NewMuscle};
use crate::errors::AppResult;
use crate::middleware::auth::require;
use crate::middleware::AccessPolicy;
use crate::resources::ServerResources;
use crate::validation::validate_or_reject;

/// Muscle routes implementation
pub struct MuscleRoutes;

impl MuscleRoutes {
    /// Create all muscle routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        let admin_only = middleware::from_fn_with_state(
            (Arc::clone(&resources), AccessPolicy::ADMIN),
            require,
        );

        Router::new()
            .route(
                "/api/v1/muscles",
                get(Self::handle_list).merge(post(Self::handle_create).route_layer(admin_only)),
            )
            .with_state(resources)
    }

    async fn handle_list(
        State(resources): State<Arc<ServerResources>>,
    ) -> AppResult<Json<Vec<Muscle>>> {
        Ok(Json(resources.database.list_muscles().await?))
    }

    async fn handle_create(
        State(resources): State<Arc<ServerResources>>,
        ApiJson(muscle): ApiJson<NewMuscle>,
    ) -> AppResult<(StatusCode, Json<Muscle>)> {
        validate_or_reject(&muscle)?;
        let created = resources.database.create_muscle(&muscle).await?;
        info!(muscle_id = created.id, name = %created.name, "Muscle added");
        Ok((StatusCode::CREATED, Json(created)))
    }
}
