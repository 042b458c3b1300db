// ABOUTME: Core types and constants for the Jasad fitness API
// ABOUTME: Foundation crate with error handling, the principal model, and constants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad

#![deny(unsafe_code)]

//! # Jasad Core
//!
//! Foundation crate shared by every layer of the Jasad API. It changes rarely,
//! which keeps incremental builds of the main crate cheap.
//!
//! ## Modules
//!
//! - **errors**: the closed `ErrorCode` set, `AppError`, and the HTTP error body
//! - **models**: `Role` and `Principal`, the identity attached to every authorized request
//! - **constants**: key prefixes, cookie names, and default limits
//! - **pagination**: page requests and the metadata envelope for list endpoints

/// Unified error handling with a closed set of error codes and HTTP mapping
pub mod errors;

/// Identity models resolved by the authorization gate
pub mod models;

/// Application constants organized by domain
pub mod constants;

/// Page-number pagination for list endpoints
pub mod pagination;
