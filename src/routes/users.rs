// ABOUTME: Account route handlers
// ABOUTME: Returns the public view of an account to its owner or an administrator
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{middleware, Json, Router};

use super::ApiPath;
use crate::database::users::UserView;
use crate::errors::{AppError, AppResult};
use crate::middleware::auth::require;
use crate::middleware::AccessPolicy;
use crate::models::UserId;
use crate::resources::ServerResources;

/// Account routes implementation
pub struct UserRoutes;

impl UserRoutes {
    /// Create all account routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/v1/users/:user", get(Self::handle_get_user))
            .route_layer(middleware::from_fn_with_state(
                (Arc::clone(&resources), AccessPolicy::OWNER),
                require,
            ))
            .with_state(resources)
    }

    async fn handle_get_user(
        State(resources): State<Arc<ServerResources>>,
        ApiPath(user_id): ApiPath<UserId>,
    ) -> AppResult<Json<UserView>> {
        let user = resources
            .database
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("user"))?;
        Ok(Json(UserView::from(&user)))
    }
}
