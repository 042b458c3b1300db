// ABOUTME: Owner-scoped workout route handlers
// ABOUTME: Every route addresses /users/:user/workouts and is reachable only by that user or an admin
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad

//! Workout routes
//!
//! The owner comes from the path, never from the body. Lookups are scoped to
//! that owner, so another user's workout id answers 404 even for a valid
//! workout.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{middleware, Json, Router};
use http::StatusCode;
use tracing::info;

use super::{ApiJson, ApiPath, VersionedPatch};
use crate::database::workouts::{Workout, WorkoutAggregate, WorkoutDraft, WorkoutKey, WorkoutPatch};
use crate::database::Stamp;
use crate::errors::AppResult;
use crate::middleware::auth::require;
use crate::middleware::AccessPolicy;
use crate::models::UserId;
use crate::resources::ServerResources;

/// Workout routes implementation
pub struct WorkoutRoutes;

impl WorkoutRoutes {
    /// Create all workout routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(
                "/api/v1/users/:user/workouts",
                get(Self::handle_list).post(Self::handle_create),
            )
            .route(
                "/api/v1/users/:user/workouts/:workout",
                get(Self::handle_get)
                    .put(Self::handle_update)
                    .delete(Self::handle_delete),
            )
            .route_layer(middleware::from_fn_with_state(
                (Arc::clone(&resources), AccessPolicy::OWNER),
                require,
            ))
            .with_state(resources)
    }

    async fn handle_list(
        State(resources): State<Arc<ServerResources>>,
        ApiPath(user_id): ApiPath<UserId>,
    ) -> AppResult<Json<Vec<Workout>>> {
        Ok(Json(resources.database.list_workouts(user_id).await?))
    }

    async fn handle_get(
        State(resources): State<Arc<ServerResources>>,
        ApiPath((user_id, id)): ApiPath<(UserId, i64)>,
    ) -> AppResult<Json<Workout>> {
        let workout = resources
            .database
            .get_workout(WorkoutKey { user_id, id })
            .await?;
        Ok(Json(workout))
    }

    async fn handle_create(
        State(resources): State<Arc<ServerResources>>,
        ApiPath(user_id): ApiPath<UserId>,
        ApiJson(mut draft): ApiJson<WorkoutDraft>,
    ) -> AppResult<(StatusCode, Json<Workout>)> {
        draft.user_id = user_id;
        let stamp = resources
            .database
            .writer()
            .create::<WorkoutAggregate>(draft)
            .await?;
        info!(user_id, workout_id = stamp.id, "Workout created");

        let workout = resources
            .database
            .get_workout(WorkoutKey {
                user_id,
                id: stamp.id,
            })
            .await?;
        Ok((StatusCode::CREATED, Json(workout)))
    }

    async fn handle_update(
        State(resources): State<Arc<ServerResources>>,
        ApiPath((user_id, id)): ApiPath<(UserId, i64)>,
        ApiJson(body): ApiJson<VersionedPatch<WorkoutPatch>>,
    ) -> AppResult<Json<Stamp>> {
        let VersionedPatch { version, patch } = body;
        let key = WorkoutKey { user_id, id };
        let stamp = resources
            .database
            .writer()
            .update::<WorkoutAggregate, _>(&key, version, |draft| patch.apply(draft))
            .await?;
        info!(user_id, workout_id = id, version = stamp.version, "Workout updated");
        Ok(Json(stamp))
    }

    async fn handle_delete(
        State(resources): State<Arc<ServerResources>>,
        ApiPath((user_id, id)): ApiPath<(UserId, i64)>,
    ) -> AppResult<StatusCode> {
        resources
            .database
            .delete_workout(WorkoutKey { user_id, id })
            .await?;
        info!(user_id, workout_id = id, "Workout deleted");
        Ok(StatusCode::NO_CONTENT)
    }
}
