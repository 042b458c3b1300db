// ABOUTME: Route module organization for the Jasad HTTP API
// ABOUTME: Assembles domain routers and the shared layer stack into one application router
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad

//! Route module for the Jasad API
//!
//! Each domain module exposes a `*Routes::routes(resources)` constructor that
//! returns a finished router; [`router`] merges them and wraps the result in
//! the request-id, tracing, timeout, and address-throttle layers. Handlers
//! stay thin and delegate to the database and session components.

/// Sign up, sign in, and access-token issuance
pub mod auth;
/// Exercise catalogue routes
pub mod exercises;
/// Health check and readiness routes
pub mod health;
/// Muscle catalogue routes
pub mod muscles;
/// Account routes
pub mod users;
/// Owner-scoped workout routes
pub mod workouts;

use std::sync::Arc;

use axum::extract::{FromRequest, FromRequestParts};
use axum::{middleware, Router};
use serde::Deserialize;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::errors::AppError;
use crate::middleware::{
    create_request_span, ip_rate_limit, record_response_status, request_deadline, MakeRequestUuid,
    REQUEST_ID_HEADER,
};
use crate::resources::ServerResources;

pub use auth::AuthRoutes;
pub use exercises::ExerciseRoutes;
pub use health::HealthRoutes;
pub use muscles::MuscleRoutes;
pub use users::UserRoutes;
pub use workouts::WorkoutRoutes;

/// JSON body extractor whose rejections use the API error body
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Path extractor whose rejections use the API error body
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Query extractor whose rejections use the API error body
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Update body: the version the client last read plus the changed fields
#[derive(Debug, Deserialize)]
pub struct VersionedPatch<P> {
    /// Version the client based its changes on
    pub version: i64,
    /// Changed fields
    #[serde(flatten)]
    pub patch: P,
}

/// Build the complete application router
#[must_use]
pub fn router(resources: &Arc<ServerResources>) -> Router {
    let request_timeout = resources.config.timeouts.storage * 2;

    Router::new()
        .merge(HealthRoutes::routes(Arc::clone(resources)))
        .merge(AuthRoutes::routes(Arc::clone(resources)))
        .merge(UserRoutes::routes(Arc::clone(resources)))
        .merge(MuscleRoutes::routes(Arc::clone(resources)))
        .merge(ExerciseRoutes::routes(Arc::clone(resources)))
        .merge(WorkoutRoutes::routes(Arc::clone(resources)))
        .layer(middleware::from_fn_with_state(
            Arc::clone(resources),
            ip_rate_limit,
        ))
        .layer(middleware::from_fn_with_state(
            request_timeout,
            request_deadline,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(create_request_span)
                .on_response(record_response_status),
        )
        .layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER))
        .layer(SetRequestIdLayer::new(REQUEST_ID_HEADER, MakeRequestUuid))
}
