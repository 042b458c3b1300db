// ABOUTME: Security helpers shared by the gate and the account routes
// ABOUTME: Session cookie construction and parsing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad

/// Session cookie helpers
pub mod cookies;
