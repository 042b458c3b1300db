// ABOUTME: Configuration module loaded once at startup and injected into every component
// ABOUTME: Re-exports the environment-driven ServerConfig and its sections
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad

//! Environment-only configuration
//!
//! Configuration is read from environment variables exactly once, in the
//! binary, and then passed by reference into [`crate::resources::ServerResources`].
//! Nothing reads the environment after startup.

/// Environment-variable parsing into typed configuration sections
pub mod environment;

pub use environment::{
    AuthConfig, DatabaseConfig, Environment, KvConfig, RateLimitConfig, ServerConfig,
    ThrottlePolicyConfig, TimeoutConfig,
};
