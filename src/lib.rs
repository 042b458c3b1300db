// ABOUTME: Main library entry point for the Jasad fitness API
// ABOUTME: Exposes the storage, session, throttling, gate, and HTTP route layers to the binary and tests
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad

#![deny(unsafe_code)]

//! # Jasad
//!
//! A JSON-over-HTTP service for a shared exercise catalogue and per-user
//! workout plans.
//!
//! ## Architecture
//!
//! - **Storage**: `SQLite` through `sqlx`, with aggregates written under
//!   optimistic version checks
//! - **Key-value store**: Redis or a bounded in-memory map, holding sessions
//!   and throttle counters
//! - **Gate**: access tokens and sessions resolve to a typed principal that
//!   route policies check for role and ownership
//! - **Routes**: `axum` routers per domain, merged behind request-id, trace,
//!   timeout, and per-address throttle layers
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use jasad::config::ServerConfig;
//! use jasad::errors::AppResult;
//! use jasad::resources::ServerResources;
//!
//! #[tokio::main]
//! async fn main() -> AppResult<()> {
//!     let config = ServerConfig::from_env()?;
//!     let resources = Arc::new(ServerResources::from_config(config).await?);
//!     let _app = jasad::routes::router(&resources);
//!     Ok(())
//! }
//! ```

/// Signed access tokens
pub mod auth;

/// Environment-driven configuration
pub mod config;

/// Relational storage and the optimistic aggregate writer
pub mod database;

/// Deadline wrapper for storage calls
pub mod deadline;

/// Error types and HTTP mapping
pub mod errors;

/// Key-value store abstraction with Redis and in-memory backends
pub mod kv;

/// Structured logging setup and event helpers
pub mod logging;

/// HTTP middleware: request ids, tracing, address throttle, authorization gate
pub mod middleware;

/// Identity models
pub mod models;

/// Page-number pagination for list endpoints
pub mod pagination;

/// Password hashing
pub mod passwords;

/// Fixed-window rate limiting
pub mod rate_limiting;

/// Shared server resources
pub mod resources;

/// HTTP routes
pub mod routes;

/// Session cookies
pub mod security;

/// Opaque session tokens
pub mod sessions;

/// Field-level input validation
pub mod validation;
