// ABOUTME: HTTP middleware for request tracing, address throttling, and authorization
// ABOUTME: Layers run in order: request id, trace span, address throttle, authorization gate
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad

/// Authorization gate and principal extractor
pub mod auth;
/// Per-address request throttle
pub mod rate_limiting;
/// Whole-request deadline
pub mod timeout;
/// Request id and span creation
pub mod tracing;

pub use auth::{AccessPolicy, AuthMethod, AuthorizationGate, CurrentUser};
pub use rate_limiting::ip_rate_limit;
pub use timeout::request_deadline;
pub use self::tracing::{
    create_request_span, record_response_status, MakeRequestUuid, REQUEST_ID_HEADER,
};
