// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Parses environment variables into typed sections with documented defaults
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad

//! Environment-based configuration management for production deployment

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use jasad_core::constants::{auth, network, rate_limits, storage};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::{AppError, AppResult};

/// Environment type for security-sensitive defaults
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development
    #[default]
    Development,
    /// Production deployment
    Production,
    /// Test runs
    Testing,
}

impl Environment {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "testing" | "test" => Self::Testing,
            _ => Self::Development,
        }
    }

    /// Check if this is a production environment
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::Testing => write!(f, "testing"),
        }
    }
}

/// Top-level server configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listener port
    pub http_port: u16,
    /// HTTP bind address
    pub host: String,
    /// Deployment environment
    pub environment: Environment,
    /// Relational store
    pub database: DatabaseConfig,
    /// Shared key-value store
    pub kv: KvConfig,
    /// Credentials
    pub auth: AuthConfig,
    /// Abuse mitigation
    pub rate_limit: RateLimitConfig,
    /// Storage deadlines
    pub timeouts: TimeoutConfig,
}

/// Relational store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL
    pub url: String,
    /// Maximum pooled connections
    pub max_connections: u32,
}

/// Shared key-value store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KvConfig {
    /// Redis URL; the in-memory store is used when absent
    pub redis_url: Option<String>,
    /// Capacity of the in-memory store
    pub max_entries: usize,
    /// Sweep interval for expired in-memory entries
    pub cleanup_interval: Duration,
    /// Whether the in-memory store runs its background sweep
    pub enable_background_cleanup: bool,
}

impl Default for KvConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            max_entries: storage::DEFAULT_KV_MAX_ENTRIES,
            cleanup_interval: Duration::from_secs(storage::DEFAULT_KV_CLEANUP_INTERVAL_SECS),
            enable_background_cleanup: true,
        }
    }
}

/// Credential configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC key for access tokens
    #[serde(skip_serializing)]
    pub jwt_secret: Vec<u8>,
    /// Access-token lifetime
    pub access_token_ttl: Duration,
    /// Session lifetime
    pub session_ttl: Duration,
    /// Whether the session cookie carries the `Secure` attribute
    pub cookie_secure: bool,
    /// bcrypt work factor
    pub bcrypt_cost: u32,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("access_token_ttl", &self.access_token_ttl)
            .field("session_ttl", &self.session_ttl)
            .field("cookie_secure", &self.cookie_secure)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}

/// One `limit` events per `window` throttle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ThrottlePolicyConfig {
    /// Events allowed per window
    pub limit: u64,
    /// Window length
    pub window: Duration,
}

/// Abuse mitigation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Whether the per-address policy runs
    pub ip_enabled: bool,
    /// Per-address request budget
    pub ip: ThrottlePolicyConfig,
    /// Per-username failed login budget
    pub login: ThrottlePolicyConfig,
}

/// Storage deadline configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Deadline applied to every store and database call
    pub storage: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            storage: Duration::from_secs(storage::DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if `JWT_SECRET` is missing in production or the
    /// resulting configuration fails validation
    pub fn from_env() -> AppResult<Self> {
        info!("Loading configuration from environment variables");

        let environment = Environment::from_str_or_default(&env_var_or("ENVIRONMENT", "development"));

        let config = Self {
            http_port: parse_env_or("HTTP_PORT", network::DEFAULT_HTTP_PORT),
            host: env_var_or("HOST", network::DEFAULT_HOST),
            environment,
            database: DatabaseConfig {
                url: env_var_or("DATABASE_URL", storage::DEFAULT_DATABASE_URL),
                max_connections: parse_env_or(
                    "DATABASE_MAX_CONNECTIONS",
                    storage::DEFAULT_DATABASE_MAX_CONNECTIONS,
                ),
            },
            kv: KvConfig {
                redis_url: env::var("REDIS_URL").ok().filter(|url| !url.is_empty()),
                max_entries: parse_env_or("KV_MAX_ENTRIES", storage::DEFAULT_KV_MAX_ENTRIES),
                cleanup_interval: Duration::from_secs(parse_env_or(
                    "KV_CLEANUP_INTERVAL_SECS",
                    storage::DEFAULT_KV_CLEANUP_INTERVAL_SECS,
                )),
                enable_background_cleanup: true,
            },
            auth: AuthConfig {
                jwt_secret: load_jwt_secret(environment)?,
                access_token_ttl: Duration::from_secs(parse_env_or(
                    "ACCESS_TOKEN_TTL_SECS",
                    auth::DEFAULT_ACCESS_TOKEN_TTL_SECS,
                )),
                session_ttl: Duration::from_secs(
                    parse_env_or("SESSION_TTL_HOURS", auth::DEFAULT_SESSION_TTL_HOURS) * 3600,
                ),
                cookie_secure: parse_env_or("SESSION_COOKIE_SECURE", true),
                bcrypt_cost: parse_env_or("BCRYPT_COST", auth::DEFAULT_BCRYPT_COST),
            },
            rate_limit: RateLimitConfig {
                ip_enabled: parse_env_or("IP_RATE_LIMIT_ENABLED", true),
                ip: ThrottlePolicyConfig {
                    limit: parse_env_or(
                        "IP_RATE_LIMIT_MAX_REQUESTS",
                        rate_limits::DEFAULT_IP_MAX_REQUESTS,
                    ),
                    window: Duration::from_secs(parse_env_or(
                        "IP_RATE_LIMIT_WINDOW_SECS",
                        rate_limits::DEFAULT_IP_WINDOW_SECS,
                    )),
                },
                login: ThrottlePolicyConfig {
                    limit: parse_env_or(
                        "LOGIN_ATTEMPTS_LIMIT",
                        rate_limits::DEFAULT_LOGIN_ATTEMPTS_LIMIT,
                    ),
                    window: Duration::from_secs(parse_env_or(
                        "LOGIN_ATTEMPTS_WINDOW_SECS",
                        rate_limits::DEFAULT_LOGIN_WINDOW_SECS,
                    )),
                },
            },
            timeouts: TimeoutConfig {
                storage: Duration::from_secs(parse_env_or(
                    "REQUEST_TIMEOUT_SECS",
                    storage::DEFAULT_REQUEST_TIMEOUT_SECS,
                )),
            },
        };

        config.validate()?;
        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error if a limit, window, or lifetime is zero, or the bcrypt
    /// cost is outside the range bcrypt accepts
    pub fn validate(&self) -> AppResult<()> {
        let policies = [("IP_RATE_LIMIT", self.rate_limit.ip), ("LOGIN_ATTEMPTS", self.rate_limit.login)];
        for (name, policy) in policies {
            if policy.limit == 0 || policy.window.is_zero() {
                return Err(AppError::config(format!(
                    "{name} limit and window must both be positive"
                )));
            }
        }

        if self.auth.access_token_ttl.is_zero() || self.auth.session_ttl.is_zero() {
            return Err(AppError::config("token and session lifetimes must be positive"));
        }

        if !(4..=31).contains(&self.auth.bcrypt_cost) {
            return Err(AppError::config("BCRYPT_COST must be between 4 and 31"));
        }

        if self.timeouts.storage.is_zero() {
            return Err(AppError::config("REQUEST_TIMEOUT_SECS must be positive"));
        }

        Ok(())
    }

    /// Get a summary of the configuration for logging (without secrets)
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Jasad Server Configuration:\n\
             - Environment: {}\n\
             - HTTP: {}:{}\n\
             - Database: {} (max {} connections)\n\
             - Key-value store: {}\n\
             - Access token TTL: {}s\n\
             - Session TTL: {}h\n\
             - IP rate limit: {}\n\
             - Login throttle: {} attempts / {}s\n\
             - Storage deadline: {}s",
            self.environment,
            self.host,
            self.http_port,
            self.database.url,
            self.database.max_connections,
            if self.kv.redis_url.is_some() {
                "Redis"
            } else {
                "in-memory"
            },
            self.auth.access_token_ttl.as_secs(),
            self.auth.session_ttl.as_secs() / 3600,
            if self.rate_limit.ip_enabled {
                format!(
                    "{} requests / {}s",
                    self.rate_limit.ip.limit,
                    self.rate_limit.ip.window.as_secs()
                )
            } else {
                "Disabled".to_owned()
            },
            self.rate_limit.login.limit,
            self.rate_limit.login.window.as_secs(),
            self.timeouts.storage.as_secs(),
        )
    }
}

/// Read `JWT_SECRET`, or generate a per-process secret outside production
fn load_jwt_secret(environment: Environment) -> AppResult<Vec<u8>> {
    match env::var("JWT_SECRET") {
        Ok(secret) if !secret.is_empty() => Ok(secret.into_bytes()),
        _ if environment.is_production() => Err(AppError::config(
            "JWT_SECRET must be set in production",
        )),
        _ => {
            warn!("JWT_SECRET not set; generating a per-process secret (tokens will not survive restarts)");
            let mut secret = vec![0u8; 64];
            rand::rngs::OsRng.fill_bytes(&mut secret);
            Ok(secret)
        }
    }
}

/// Get environment variable or default value
fn env_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

/// Parse environment variable, falling back to `default` when unset or invalid
fn parse_env_or<T: FromStr + fmt::Display + Copy>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Invalid value '{raw}' for {key}, using default {default}");
            default
        }),
        Err(_) => default,
    }
}
