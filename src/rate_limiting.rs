// ABOUTME: Fixed-window rate limiting over the shared key-value store
// ABOUTME: One Allow primitive reused by the per-address and per-username login policies
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad

//! # Rate Limiting
//!
//! [`RateLimiter::allow`] counts events per key in a fixed window. The first
//! event of a window creates the counter and sets its expiry; later events
//! only increment. Rejected events still count, so retrying while blocked does
//! not reset the budget. Both steps happen in one atomic store operation.
//!
//! Two policies share the primitive:
//! - per address, `ratelimit:<addr>`, applied to every request before
//!   authentication
//! - per username, `login:<username>`, incremented only for a wrong password
//!   on an existing account

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use jasad_core::constants::key_prefixes;

use crate::config::ThrottlePolicyConfig;
use crate::deadline::with_deadline;
use crate::errors::{AppError, AppResult};
use crate::kv::KeyValueStore;

/// Outcome of one `allow` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    /// Whether the event fits in the budget
    pub allowed: bool,
    /// Events counted in the current window, including this one
    pub count: u64,
    /// Budget for the window
    pub limit: u64,
    /// Time until the window closes, when known
    pub retry_after: Option<Duration>,
}

impl RateDecision {
    /// Whole seconds until retry, rounded up, for the `Retry-After` header
    #[must_use]
    pub fn retry_after_secs(&self) -> Option<u64> {
        self.retry_after
            .map(|d| d.as_secs() + u64::from(d.subsec_nanos() > 0))
    }

    /// Convert a rejection into a 429 error
    ///
    /// # Errors
    ///
    /// Returns `RateLimitExceeded` when the event was not allowed
    pub fn into_result(self) -> AppResult<()> {
        if self.allowed {
            Ok(())
        } else {
            Err(AppError::rate_limit_exceeded(self.retry_after_secs()))
        }
    }
}

/// Counts events per key within a window
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn KeyValueStore>,
    deadline: Duration,
}

impl RateLimiter {
    /// Create a limiter over `store`, bounding every call by `deadline`
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, deadline: Duration) -> Self {
        Self { store, deadline }
    }

    /// Record one event for `key` and decide whether it fits in the budget
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached before the deadline
    pub async fn allow(&self, key: &str, limit: u64, window: Duration) -> AppResult<RateDecision> {
        let counter = with_deadline(
            self.deadline,
            "rate counter increment",
            self.store.increment_window(key, window),
        )
        .await?;

        Ok(RateDecision {
            allowed: counter.count <= limit,
            count: counter.count,
            limit,
            retry_after: counter.ttl,
        })
    }

    /// Inspect the budget for `key` without recording an event
    ///
    /// An absent counter is a fresh window.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached before the deadline
    pub async fn peek(&self, key: &str, limit: u64) -> AppResult<RateDecision> {
        let counter = with_deadline(
            self.deadline,
            "rate counter read",
            self.store.get_count(key),
        )
        .await?;

        Ok(counter.map_or(
            RateDecision {
                allowed: true,
                count: 0,
                limit,
                retry_after: None,
            },
            |c| RateDecision {
                allowed: c.count < limit,
                count: c.count,
                limit,
                retry_after: c.ttl,
            },
        ))
    }
}

/// Per-address request throttle
#[derive(Clone)]
pub struct IpRateLimit {
    limiter: RateLimiter,
    policy: ThrottlePolicyConfig,
}

impl IpRateLimit {
    /// Create the policy
    #[must_use]
    pub const fn new(limiter: RateLimiter, policy: ThrottlePolicyConfig) -> Self {
        Self { limiter, policy }
    }

    /// Counter key for an address
    #[must_use]
    pub fn key(addr: IpAddr) -> String {
        format!("{}{addr}", key_prefixes::IP_RATE_LIMIT)
    }

    /// Count one request from `addr`
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached before the deadline
    pub async fn check(&self, addr: IpAddr) -> AppResult<RateDecision> {
        self.limiter
            .allow(&Self::key(addr), self.policy.limit, self.policy.window)
            .await
    }
}

/// Per-username failed login throttle
#[derive(Clone)]
pub struct LoginThrottle {
    limiter: RateLimiter,
    policy: ThrottlePolicyConfig,
}

impl LoginThrottle {
    /// Create the policy
    #[must_use]
    pub const fn new(limiter: RateLimiter, policy: ThrottlePolicyConfig) -> Self {
        Self { limiter, policy }
    }

    /// Counter key for a username
    #[must_use]
    pub fn key(username: &str) -> String {
        format!("{}{username}", key_prefixes::LOGIN_ATTEMPTS)
    }

    /// Whether `username` may attempt a login now, without counting the attempt
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached before the deadline
    pub async fn check(&self, username: &str) -> AppResult<RateDecision> {
        self.limiter.peek(&Self::key(username), self.policy.limit).await
    }

    /// Count a wrong password for an existing account
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached before the deadline
    pub async fn record_failure(&self, username: &str) -> AppResult<RateDecision> {
        self.limiter
            .allow(&Self::key(username), self.policy.limit, self.policy.window)
            .await
    }
}
