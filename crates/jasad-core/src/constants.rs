// ABOUTME: Application constants organized by domain
// ABOUTME: Key-value key prefixes, cookie attributes, default TTLs and limits
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad

/// Key-value store key conventions
pub mod key_prefixes {
    /// Per-username failed login counter: `login:<username>`
    pub const LOGIN_ATTEMPTS: &str = "login:";
    /// Per-address request counter: `ratelimit:<address>`
    pub const IP_RATE_LIMIT: &str = "ratelimit:";
}

/// Session and access-token defaults
pub mod auth {
    /// Name of the session cookie
    pub const SESSION_COOKIE_NAME: &str = "id";
    /// Random bytes in an opaque session token (128 bits)
    pub const SESSION_TOKEN_BYTES: usize = 16;
    /// Default session lifetime
    pub const DEFAULT_SESSION_TTL_HOURS: u64 = 72;
    /// Default access-token lifetime (15 minutes)
    pub const DEFAULT_ACCESS_TOKEN_TTL_SECS: u64 = 15 * 60;
    /// Default bcrypt cost
    pub const DEFAULT_BCRYPT_COST: u32 = 12;
}

/// Throttling defaults
pub mod rate_limits {
    /// Requests allowed per address per window
    pub const DEFAULT_IP_MAX_REQUESTS: u64 = 4;
    /// Per-address window
    pub const DEFAULT_IP_WINDOW_SECS: u64 = 1;
    /// Failed logins allowed per username per window
    pub const DEFAULT_LOGIN_ATTEMPTS_LIMIT: u64 = 5;
    /// Login throttle window (5 minutes)
    pub const DEFAULT_LOGIN_WINDOW_SECS: u64 = 5 * 60;
}

/// Storage defaults
pub mod storage {
    /// Per-call deadline for store and database operations
    pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;
    /// Default relational store location
    pub const DEFAULT_DATABASE_URL: &str = "sqlite:./data/jasad.db";
    /// Default pool size
    pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 5;
    /// Default in-memory key-value capacity
    pub const DEFAULT_KV_MAX_ENTRIES: usize = 10_000;
    /// Default interval between sweeps of expired in-memory entries
    pub const DEFAULT_KV_CLEANUP_INTERVAL_SECS: u64 = 60;
    /// Concurrent reference lookups made before a write transaction opens
    pub const REFERENCE_LOOKUP_CONCURRENCY: usize = 8;
}

/// Network defaults
pub mod network {
    /// Default listener port
    pub const DEFAULT_HTTP_PORT: u16 = 8081;
    /// Default bind address
    pub const DEFAULT_HOST: &str = "127.0.0.1";
}

/// Service identity used in logs
pub mod service_names {
    /// Server binary name
    pub const JASAD_SERVER: &str = "jasad-server";
}
