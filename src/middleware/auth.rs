// ABOUTME: Authorization gate turning bearer material into a typed Principal
// ABOUTME: Authenticates access tokens and sessions, then applies role and ownership policy
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad

//! # Authorization Gate
//!
//! Each protected route runs the same pipeline after the per-address
//! throttle:
//!
//! 1. extract bearer material from `Authorization: Bearer` or the `id` cookie
//! 2. resolve it: three dot-separated segments are an access token, anything
//!    else is a session token
//! 3. check the route's [`AccessPolicy`]: accepted roles and, for
//!    owner-scoped routes, the owner id from the path (admins pass both)
//! 4. attach the [`Principal`] and its [`AuthMethod`] to the request extensions
//!
//! Every authentication failure is reported as the same 401.

use std::sync::Arc;

use axum::extract::{FromRequestParts, RawPathParams, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http::header::AUTHORIZATION;
use http::request::Parts;
use http::HeaderMap;
use tracing::{debug, Span};

use crate::auth::TokenCodec;
use crate::errors::{AppError, AppResult};
use crate::logging::AppLogger;
use crate::models::{Principal, Role, UserId};
use crate::resources::ServerResources;
use crate::security::cookies::session_token;
use crate::sessions::SessionStore;

/// How a request authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    /// Signed short-lived access token
    AccessToken,
    /// Opaque session token from the header or cookie
    Session,
}

impl AuthMethod {
    /// Label used in spans and logs
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AccessToken => "access_token",
            Self::Session => "session",
        }
    }
}

/// Route-level authorization requirements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessPolicy {
    /// Roles accepted in addition to the implicit admin override
    pub roles: &'static [Role],
    /// Path parameter holding the owning user id, for owner-scoped routes
    pub owner_param: Option<&'static str>,
}

impl AccessPolicy {
    /// Any signed-in account
    pub const AUTHENTICATED: Self = Self {
        roles: &[Role::User],
        owner_param: None,
    };

    /// Administrators only
    pub const ADMIN: Self = Self {
        roles: &[],
        owner_param: None,
    };

    /// The account named by the `user` path parameter, or an administrator
    pub const OWNER: Self = Self {
        roles: &[Role::User],
        owner_param: Some("user"),
    };
}

/// Authenticates and authorizes requests
#[derive(Clone)]
pub struct AuthorizationGate {
    tokens: Arc<TokenCodec>,
    sessions: SessionStore,
}

impl AuthorizationGate {
    /// Create a gate over the token codec and session store
    #[must_use]
    pub const fn new(tokens: Arc<TokenCodec>, sessions: SessionStore) -> Self {
        Self { tokens, sessions }
    }

    /// Resolve the request's bearer material to a principal
    ///
    /// # Errors
    ///
    /// - `AuthRequired` when no credential is present
    /// - `AuthInvalid` when the credential is malformed, forged, expired, or unknown
    /// - a storage error when the session store cannot be read
    #[tracing::instrument(
        skip_all,
        fields(
            auth_method = tracing::field::Empty,
            user_id = tracing::field::Empty,
            success = tracing::field::Empty,
        )
    )]
    pub async fn authenticate(&self, headers: &HeaderMap) -> AppResult<(Principal, AuthMethod)> {
        let result = self.resolve(headers).await;

        let span = Span::current();
        match &result {
            Ok((principal, method)) => {
                span.record("auth_method", method.as_str())
                    .record("user_id", principal.id)
                    .record("success", true);
                debug!("Request authenticated");
            }
            Err(error) => {
                span.record("success", false);
                AppLogger::log_security_event(
                    "authentication_failed",
                    "low",
                    &error.message,
                    None,
                );
            }
        }
        result
    }

    async fn resolve(&self, headers: &HeaderMap) -> AppResult<(Principal, AuthMethod)> {
        let token = presented_credential(headers)?.ok_or_else(AppError::auth_required)?;

        if looks_like_access_token(&token) {
            let claims = self.tokens.verify(&token)?;
            Ok((claims.principal()?, AuthMethod::AccessToken))
        } else {
            let session = self.sessions.resolve(&token).await?;
            Ok((session.principal, AuthMethod::Session))
        }
    }

    /// Apply `policy` to `principal`
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` if the role is not accepted or the principal
    /// does not own the addressed resource
    pub fn authorize(
        principal: &Principal,
        policy: AccessPolicy,
        owner: Option<UserId>,
    ) -> AppResult<()> {
        let role_ok = principal.has_any_role(policy.roles);
        let owner_ok = owner.is_none_or(|owner| principal.may_act_for(owner));

        if role_ok && owner_ok {
            Ok(())
        } else {
            AppLogger::log_security_event(
                "authorization_denied",
                "medium",
                if role_ok { "not the resource owner" } else { "role not accepted" },
                Some(&principal.id.to_string()),
            );
            Err(AppError::permission_denied())
        }
    }
}

/// Token from `Authorization: Bearer <token>`
///
/// A present header with any other shape is rejected rather than ignored.
fn bearer_token(headers: &HeaderMap) -> AppResult<Option<String>> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let token = value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::auth_invalid("malformed authorization header"))?;
    Ok(Some(token.to_owned()))
}

/// Bearer material as the gate reads it: the `Authorization` header first, then the cookie
///
/// # Errors
///
/// Returns `AuthInvalid` if an `Authorization` header is present but not a bearer token
pub fn presented_credential(headers: &HeaderMap) -> AppResult<Option<String>> {
    Ok(bearer_token(headers)?.or_else(|| session_token(headers)))
}

/// Access tokens are three dot-separated segments; session tokens contain no dots
fn looks_like_access_token(token: &str) -> bool {
    token.split('.').count() == 3
}

/// Owner id from the path parameter named by `policy`
async fn owner_from_path(parts: &mut Parts, policy: AccessPolicy) -> AppResult<Option<UserId>> {
    let Some(name) = policy.owner_param else {
        return Ok(None);
    };

    let params = RawPathParams::from_request_parts(parts, &())
        .await
        .map_err(|_| AppError::internal(format!("route is missing the `{name}` parameter")))?;
    let raw = params
        .iter()
        .find_map(|(key, value)| (key == name).then_some(value))
        .ok_or_else(|| AppError::internal(format!("route is missing the `{name}` parameter")))?;

    raw.parse::<UserId>()
        .map(Some)
        .map_err(|_| AppError::not_found("user"))
}

/// Middleware state: the shared resources plus the route's policy
pub type GateState = (Arc<ServerResources>, AccessPolicy);

/// Gate middleware; install with `route_layer` so path parameters are available
pub async fn require(
    State((resources, policy)): State<GateState>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();

    let outcome = async {
        let (principal, method) = resources.gate.authenticate(&parts.headers).await?;
        let owner = owner_from_path(&mut parts, policy).await?;
        AuthorizationGate::authorize(&principal, policy, owner)?;
        Ok::<_, AppError>((principal, method))
    }
    .await;

    match outcome {
        Ok((principal, method)) => {
            Span::current().record("user_id", principal.id);
            parts.extensions.insert(principal);
            parts.extensions.insert(method);
            next.run(Request::from_parts(parts, body)).await
        }
        Err(error) => error.into_response(),
    }
}

/// Extractor for the principal attached by [`require`]
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub Principal);

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .copied()
            .map(Self)
            .ok_or_else(AppError::auth_required)
    }
}
