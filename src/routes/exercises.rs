// ABOUTME: Exercise catalogue route handlers
// ABOUTME: Public paged search and reads; administrator writes go through the optimistic aggregate writer
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post, put};
use axum::{middleware, Json, Router};
use http::StatusCode;
use serde::Deserialize;
use tracing::info;

use super::{ApiJson, ApiPath, ApiQuery, VersionedPatch};
use crate::database::exercises::{
    Exercise, ExerciseAggregate, ExerciseDraft, ExercisePage, ExercisePatch, ExerciseSearch,
    ExerciseSort,
};
use crate::database::Stamp;
use crate::errors::{AppError, AppResult, FieldError};
use crate::pagination::PageRequest;
use crate::middleware::auth::require;
use crate::middleware::AccessPolicy;
use crate::resources::ServerResources;

/// Raw search query; numbers stay text so bad values become field errors
#[derive(Debug, Default, Deserialize)]
pub struct ExerciseQuery {
    /// Name substring
    pub name: Option<String>,
    /// Muscle name
    pub muscle: Option<String>,
    /// Page number
    pub page: Option<String>,
    /// Items per page
    pub page_size: Option<String>,
    /// One of [`ExerciseSort::SAFELIST`]
    pub sort: Option<String>,
}

impl ExerciseQuery {
    /// Parse into a search
    ///
    /// # Errors
    ///
    /// Returns `ValidationFailed` listing every bad paging or sort value
    pub fn into_search(self) -> AppResult<ExerciseSearch> {
        let mut errors = Vec::new();
        let page = PageRequest::parse(self.page.as_deref(), self.page_size.as_deref(), &mut errors);

        let sort = match self.sort.as_deref().filter(|s| !s.is_empty()) {
            None => ExerciseSort::default(),
            Some(raw) => ExerciseSort::parse(raw).unwrap_or_else(|| {
                errors.push(FieldError::new(
                    "sort",
                    format!("must be one of {}", ExerciseSort::SAFELIST.join(", ")),
                ));
                ExerciseSort::default()
            }),
        };

        if !errors.is_empty() {
            return Err(AppError::validation(errors));
        }
        Ok(ExerciseSearch {
            name: self.name,
            muscle: self.muscle,
            sort,
            page,
        })
    }
}

/// Exercise routes implementation
pub struct ExerciseRoutes;

impl ExerciseRoutes {
    /// Create all exercise routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        let admin_only = middleware::from_fn_with_state(
            (Arc::clone(&resources), AccessPolicy::ADMIN),
            require,
        );

        Router::new()
            .route(
                "/api/v1/exercises",
                get(Self::handle_search)
                    .merge(post(Self::handle_create).route_layer(admin_only.clone())),
            )
            .route(
                "/api/v1/exercises/:id",
                get(Self::handle_get).merge(
                    put(Self::handle_update)
                        .delete(Self::handle_delete)
                        .route_layer(admin_only),
                ),
            )
            .with_state(resources)
    }

    async fn handle_search(
        State(resources): State<Arc<ServerResources>>,
        ApiQuery(query): ApiQuery<ExerciseQuery>,
    ) -> AppResult<Json<ExercisePage>> {
        let search = query.into_search()?;
        Ok(Json(resources.database.search_exercises(&search).await?))
    }

    async fn handle_get(
        State(resources): State<Arc<ServerResources>>,
        ApiPath(id): ApiPath<i64>,
    ) -> AppResult<Json<Exercise>> {
        Ok(Json(resources.database.get_exercise(id).await?))
    }

    async fn handle_create(
        State(resources): State<Arc<ServerResources>>,
        ApiJson(draft): ApiJson<ExerciseDraft>,
    ) -> AppResult<(StatusCode, Json<Exercise>)> {
        let stamp = resources
            .database
            .writer()
            .create::<ExerciseAggregate>(draft)
            .await?;
        info!(exercise_id = stamp.id, "Exercise created");

        let exercise = resources.database.get_exercise(stamp.id).await?;
        Ok((StatusCode::CREATED, Json(exercise)))
    }

    async fn handle_update(
        State(resources): State<Arc<ServerResources>>,
        ApiPath(id): ApiPath<i64>,
        ApiJson(body): ApiJson<VersionedPatch<ExercisePatch>>,
    ) -> AppResult<Json<Stamp>> {
        let VersionedPatch { version, patch } = body;
        let stamp = resources
            .database
            .writer()
            .update::<ExerciseAggregate, _>(&id, version, |draft| patch.apply(draft))
            .await?;
        info!(exercise_id = id, version = stamp.version, "Exercise updated");
        Ok(Json(stamp))
    }

    async fn handle_delete(
        State(resources): State<Arc<ServerResources>>,
        ApiPath(id): ApiPath<i64>,
    ) -> AppResult<StatusCode> {
        resources.database.delete_exercise(id).await?;
        info!(exercise_id = id, "Exercise deleted");
        Ok(StatusCode::NO_CONTENT)
    }
}
