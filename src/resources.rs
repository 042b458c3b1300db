// ABOUTME: Shared resource container built once at startup and injected into every handler
// ABOUTME: Holds configuration, storage handles, the token codec, sessions, and throttles
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad

//! # Server Resources
//!
//! Every long-lived collaborator is constructed here exactly once and shared
//! through `Arc`. Handlers and middleware receive the container as axum
//! state; nothing reads configuration or opens connections on its own.

use std::sync::Arc;

use tracing::info;

use crate::auth::TokenCodec;
use crate::config::ServerConfig;
use crate::database::Database;
use crate::errors::AppResult;
use crate::kv::{KeyValueStore, KvFactory};
use crate::middleware::auth::AuthorizationGate;
use crate::rate_limiting::{IpRateLimit, LoginThrottle, RateLimiter};
use crate::sessions::SessionStore;

/// Centralized resource container for dependency injection
#[derive(Clone)]
pub struct ServerResources {
    /// Startup configuration
    pub config: Arc<ServerConfig>,
    /// Relational store
    pub database: Arc<Database>,
    /// Shared key-value store
    pub kv: Arc<dyn KeyValueStore>,
    /// Access-token signer and verifier
    pub tokens: Arc<TokenCodec>,
    /// Opaque session tokens
    pub sessions: SessionStore,
    /// Per-address throttle; `None` when disabled
    pub ip_rate_limit: Option<IpRateLimit>,
    /// Per-username failed login throttle
    pub login_throttle: LoginThrottle,
    /// Authentication and authorization pipeline
    pub gate: AuthorizationGate,
}

impl ServerResources {
    /// Assemble resources around already-opened stores
    #[must_use]
    pub fn new(config: ServerConfig, database: Database, kv: Arc<dyn KeyValueStore>) -> Self {
        let deadline = config.timeouts.storage;
        let limiter = RateLimiter::new(Arc::clone(&kv), deadline);

        let ip_rate_limit = config
            .rate_limit
            .ip_enabled
            .then(|| IpRateLimit::new(limiter.clone(), config.rate_limit.ip));

        let tokens = Arc::new(TokenCodec::new(&config.auth.jwt_secret));
        let sessions = SessionStore::new(Arc::clone(&kv), deadline);

        Self {
            gate: AuthorizationGate::new(Arc::clone(&tokens), sessions.clone()),
            tokens,
            sessions,
            login_throttle: LoginThrottle::new(limiter, config.rate_limit.login),
            ip_rate_limit,
            database: Arc::new(database),
            kv,
            config: Arc::new(config),
        }
    }

    /// Open the database and key-value store described by `config`
    ///
    /// # Errors
    ///
    /// Returns an error if either store cannot be opened
    pub async fn from_config(config: ServerConfig) -> AppResult<Self> {
        let database = Database::connect(&config.database, config.timeouts.storage).await?;
        let kv = KvFactory::from_config(&config.kv).await?;
        info!(backend = kv.backend_name(), "Key-value store ready");
        Ok(Self::new(config, database, kv))
    }
}
