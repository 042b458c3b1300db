// ABOUTME: Error types re-exported from jasad-core for use across the main crate
// ABOUTME: Single import point for AppError, ErrorCode, FieldError, and AppResult
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad

//! # Unified Error Handling
//!
//! The closed error set lives in `jasad-core` so the HTTP mapping and the
//! storage conversions are compiled once. This module re-exports it under
//! `crate::errors` for the rest of the crate.

pub use jasad_core::errors::{
    AppError, AppResult, ErrorCode, ErrorResponse, FieldError, GENERIC_SERVER_ERROR, UNAUTHORIZED,
};
