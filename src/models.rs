// ABOUTME: Identity models re-exported from jasad-core for use across the main crate
// ABOUTME: Single import point for Role, Principal, and UserId
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad

pub use jasad_core::models::{Principal, Role, UserId};
