// ABOUTME: Shared key-value store abstraction backing sessions and rate counters
// ABOUTME: Pluggable backend support (in-memory, Redis) with atomic windowed counters
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad

//! Key-value store used for every piece of state shared across requests
//!
//! Sessions and rate counters are the only cross-request state in the server,
//! and both live behind [`KeyValueStore`]. Every operation is a single atomic
//! step on the backend, so callers never hold an in-process lock across an
//! await point.

/// Factory selecting a backend from configuration
pub mod factory;
/// In-memory backend with LRU eviction and TTL support
pub mod memory;
/// Redis backend
pub mod redis;

use std::time::Duration;

use crate::errors::AppResult;

pub use factory::KvFactory;
pub use memory::InMemoryStore;
pub use self::redis::RedisStore;

/// State of a windowed counter after an atomic step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCount {
    /// Events recorded in the current window, including this one
    pub count: u64,
    /// Remaining lifetime of the window, when the backend reports one
    pub ttl: Option<Duration>,
}

/// Shared key-value store with per-key TTL
///
/// Absent and expired keys are indistinguishable to callers.
#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch a value; `None` when the key is absent or expired
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable
    async fn get(&self, key: &str) -> AppResult<Option<Vec<u8>>>;

    /// Store a value with a TTL in one atomic operation
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable
    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl: Duration) -> AppResult<()>;

    /// Atomically increment a windowed counter
    ///
    /// The expiry is set to `window` only when the post-increment count is
    /// exactly 1, so the window is owned by the event that opened it and later
    /// increments never extend it.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or the key holds a
    /// non-counter value
    async fn increment_window(&self, key: &str, window: Duration) -> AppResult<WindowCount>;

    /// Read a windowed counter without incrementing it
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or the key holds a
    /// non-counter value
    async fn get_count(&self, key: &str) -> AppResult<Option<WindowCount>>;

    /// Delete a key; deleting an absent key is not an error
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable
    async fn remove(&self, key: &str) -> AppResult<()>;

    /// Verify the backend is healthy
    ///
    /// # Errors
    ///
    /// Returns an error if the health check fails
    async fn health_check(&self) -> AppResult<()>;

    /// Short backend name for logs
    fn backend_name(&self) -> &'static str;
}

/// Parse a counter stored as decimal text, the representation both backends share
pub(crate) fn parse_counter(key: &str, raw: &[u8]) -> AppResult<u64> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|text| text.parse().ok())
        .ok_or_else(|| {
            crate::errors::AppError::storage(format!("key '{key}' does not hold a counter"))
        })
}
