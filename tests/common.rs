// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Builds an in-memory configuration, resources, and signed-in accounts
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]
//! Shared test utilities for `jasad`

use std::sync::{Arc, Once};
use std::time::Duration;

use jasad::config::{
    AuthConfig, DatabaseConfig, Environment, KvConfig, RateLimitConfig, ServerConfig,
    ThrottlePolicyConfig, TimeoutConfig,
};
use jasad::database::muscles::NewMuscle;
use jasad::database::users::User;
use jasad::database::Database;
use jasad::kv::{InMemoryStore, KeyValueStore};
use jasad::models::{Principal, Role};
use jasad::passwords::hash_password;
use jasad::resources::ServerResources;

static INIT_LOGGER: Once = Once::new();

/// Password used for every seeded account
pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Configuration with cheap hashing, in-memory stores, and small throttle limits
pub fn test_config() -> ServerConfig {
    ServerConfig {
        http_port: 0,
        host: "127.0.0.1".to_owned(),
        environment: Environment::Testing,
        database: DatabaseConfig {
            url: "sqlite::memory:".to_owned(),
            max_connections: 1,
        },
        kv: KvConfig {
            enable_background_cleanup: false,
            ..KvConfig::default()
        },
        auth: AuthConfig {
            jwt_secret: b"integration-test-secret-0123456789".to_vec(),
            access_token_ttl: Duration::from_secs(900),
            session_ttl: Duration::from_secs(3600),
            cookie_secure: false,
            bcrypt_cost: 4,
        },
        rate_limit: RateLimitConfig {
            ip_enabled: true,
            ip: ThrottlePolicyConfig {
                limit: 1000,
                window: Duration::from_secs(60),
            },
            login: ThrottlePolicyConfig {
                limit: 5,
                window: Duration::from_secs(300),
            },
        },
        timeouts: TimeoutConfig::default(),
    }
}

/// Resources over a private in-memory database and key-value store
pub async fn create_test_resources(config: ServerConfig) -> Arc<ServerResources> {
    let kv: Arc<dyn KeyValueStore> =
        Arc::new(InMemoryStore::without_cleanup(config.kv.max_entries));
    create_test_resources_with_kv(config, kv).await
}

/// Resources over a private in-memory database and the given key-value store
pub async fn create_test_resources_with_kv(
    config: ServerConfig,
    kv: Arc<dyn KeyValueStore>,
) -> Arc<ServerResources> {
    init_test_logging();
    let database = Database::in_memory(config.timeouts.storage)
        .await
        .expect("in-memory database");
    Arc::new(ServerResources::new(config, database, kv))
}

/// Default resources
pub async fn default_resources() -> Arc<ServerResources> {
    create_test_resources(test_config()).await
}

/// Insert an account with [`TEST_PASSWORD`]
pub async fn create_user(resources: &ServerResources, username: &str, role: Role) -> User {
    let hash = hash_password(TEST_PASSWORD, resources.config.auth.bcrypt_cost)
        .await
        .expect("hash");
    resources
        .database
        .create_user(username, &hash, role)
        .await
        .expect("create user")
}

/// Insert an account and open a session for it
pub async fn signed_in(resources: &ServerResources, username: &str, role: Role) -> (User, String) {
    let user = create_user(resources, username, role).await;
    let token = session_for(resources, user.principal()).await;
    (user, token)
}

/// Open a session for `principal`
pub async fn session_for(resources: &ServerResources, principal: Principal) -> String {
    resources
        .sessions
        .create(&principal, resources.config.auth.session_ttl)
        .await
        .expect("create session")
}

/// Seed the muscle catalogue
pub async fn seed_muscles(resources: &ServerResources, names: &[(&str, &str)]) {
    for (name, group) in names {
        resources
            .database
            .create_muscle(&NewMuscle {
                name: (*name).to_owned(),
                group: (*group).to_owned(),
            })
            .await
            .expect("create muscle");
    }
}
