// ABOUTME: Authentication route handlers: sign up, sign in, sign out, and access-token issuance
// ABOUTME: Sign in consults the per-username throttle and counts only wrong passwords for real accounts
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad

//! Authentication routes
//!
//! Sign in runs in this order:
//!
//! 1. refuse with 429 if `login:<username>` is already at its limit
//! 2. unknown username: 401, counter untouched
//! 3. wrong password: count the failure, then 401 (429 if this failure
//!    crossed the limit)
//! 4. success: new session, counter untouched
//!
//! Sign out and access-token issuance both require a session; an access
//! token can neither mint another nor be revoked.

use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{middleware, Extension, Json, Router};
use chrono::{DateTime, Utc};
use http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::ApiJson;
use crate::database::users::{User, UserView};
use crate::errors::{AppError, AppResult, FieldError};
use crate::logging::AppLogger;
use crate::middleware::auth::{presented_credential, require};
use crate::middleware::{AccessPolicy, AuthMethod, CurrentUser};
use crate::models::Role;
use crate::passwords::{hash_password, verify_password};
use crate::resources::ServerResources;
use crate::security::cookies::{clear_session_cookie, set_session_cookie};
use crate::validation::{check, check_password, check_username, validate_or_reject, Validate};

/// Sign up request
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    /// Requested login name
    pub username: String,
    /// Plain-text password
    pub password: String,
}

impl Validate for SignupRequest {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        check_username(&mut errors, "username", &self.username);
        check_password(&mut errors, "password", &self.password);
        errors
    }
}

/// Sign in request
#[derive(Debug, Deserialize)]
pub struct SigninRequest {
    /// Login name
    pub username: String,
    /// Plain-text password
    pub password: String,
}

impl Validate for SigninRequest {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        check(&mut errors, !self.username.is_empty(), "username", "must be provided");
        check(&mut errors, !self.password.is_empty(), "password", "must be provided");
        errors
    }
}

/// Body returned after sign up and sign in
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    /// The signed-in account
    pub user: UserView,
    /// Session bearer token, also set as the `id` cookie
    pub token: String,
}

/// Body returned by access-token issuance
#[derive(Debug, Serialize)]
pub struct AccessTokenResponse {
    /// Signed access token
    pub token: String,
    /// Expiry of the token
    pub expires_at: DateTime<Utc>,
}

/// Authentication routes implementation
pub struct AuthRoutes;

impl AuthRoutes {
    /// Create all authentication routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        let access_token = post(Self::handle_access_token).route_layer(
            middleware::from_fn_with_state(
                (Arc::clone(&resources), AccessPolicy::AUTHENTICATED),
                require,
            ),
        );

        let signout = post(Self::handle_signout).route_layer(middleware::from_fn_with_state(
            (Arc::clone(&resources), AccessPolicy::AUTHENTICATED),
            require,
        ));

        Router::new()
            .route("/api/v1/users/signup", post(Self::handle_signup))
            .route("/api/v1/users/signin", post(Self::handle_signin))
            .route("/api/v1/users/signout", signout)
            .route("/api/v1/tokens/access", access_token)
            .with_state(resources)
    }

    async fn handle_signup(
        State(resources): State<Arc<ServerResources>>,
        ApiJson(request): ApiJson<SignupRequest>,
    ) -> AppResult<Response> {
        validate_or_reject(&request)?;

        let hash = hash_password(&request.password, resources.config.auth.bcrypt_cost).await?;
        let user = resources
            .database
            .create_user(&request.username, &hash, Role::User)
            .await?;

        AppLogger::log_auth_event(&user.id.to_string(), "signup", true, None);
        info!(user_id = user.id, "Account created");

        Self::start_session(&resources, &user, StatusCode::CREATED).await
    }

    async fn handle_signin(
        State(resources): State<Arc<ServerResources>>,
        ApiJson(request): ApiJson<SigninRequest>,
    ) -> AppResult<Response> {
        validate_or_reject(&request)?;
        let throttle = &resources.login_throttle;

        let standing = throttle.check(&request.username).await?;
        if !standing.allowed {
            AppLogger::log_security_event(
                "login_throttled",
                "medium",
                &format!("{} failed attempts in window", standing.count),
                Some(&request.username),
            );
            return Err(AppError::rate_limit_exceeded(standing.retry_after_secs()));
        }

        let Some(user) = resources
            .database
            .get_user_by_username(&request.username)
            .await?
        else {
            AppLogger::log_auth_event(&request.username, "signin", false, Some("unknown user"));
            return Err(AppError::auth_invalid("unknown username"));
        };

        if !verify_password(&request.password, &user.password_hash).await? {
            let decision = throttle.record_failure(&request.username).await?;
            AppLogger::log_auth_event(&request.username, "signin", false, Some("wrong password"));
            decision.into_result()?;
            return Err(AppError::auth_invalid("wrong password"));
        }

        AppLogger::log_auth_event(&user.id.to_string(), "signin", true, None);
        Self::start_session(&resources, &user, StatusCode::OK).await
    }

    /// Revoke the presented session and clear the cookie
    async fn handle_signout(
        State(resources): State<Arc<ServerResources>>,
        CurrentUser(principal): CurrentUser,
        Extension(method): Extension<AuthMethod>,
        headers: HeaderMap,
    ) -> AppResult<Response> {
        if method != AuthMethod::Session {
            return Err(AppError::permission_denied());
        }

        if let Some(token) = presented_credential(&headers)? {
            resources.sessions.revoke(&token).await?;
        }

        let mut response_headers = HeaderMap::new();
        clear_session_cookie(&mut response_headers, resources.config.auth.cookie_secure)?;

        AppLogger::log_auth_event(&principal.id.to_string(), "signout", true, None);
        Ok((StatusCode::NO_CONTENT, response_headers).into_response())
    }

    async fn handle_access_token(
        State(resources): State<Arc<ServerResources>>,
        CurrentUser(principal): CurrentUser,
        Extension(method): Extension<AuthMethod>,
    ) -> AppResult<Json<AccessTokenResponse>> {
        if method != AuthMethod::Session {
            return Err(AppError::permission_denied());
        }

        let ttl = resources.config.auth.access_token_ttl;
        let token = resources.tokens.issue(&principal, ttl)?;
        let expires_at = Utc::now()
            + chrono::Duration::from_std(ttl)
                .map_err(|_| AppError::config("access token lifetime out of range"))?;

        AppLogger::log_auth_event(&principal.id.to_string(), "access_token_issued", true, None);
        Ok(Json(AccessTokenResponse { token, expires_at }))
    }

    async fn start_session(
        resources: &ServerResources,
        user: &User,
        status: StatusCode,
    ) -> AppResult<Response> {
        let auth = &resources.config.auth;
        let token = resources
            .sessions
            .create(&user.principal(), auth.session_ttl)
            .await?;

        let mut headers = HeaderMap::new();
        set_session_cookie(&mut headers, &token, auth.session_ttl, auth.cookie_secure)?;

        let body = SessionResponse {
            user: UserView::from(user),
            token,
        };
        Ok((status, headers, Json(body)).into_response())
    }
}
