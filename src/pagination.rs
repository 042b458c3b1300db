// ABOUTME: Re-exports pagination types from jasad-core
// ABOUTME: Single import point for PageRequest and PageMetadata
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad

pub use jasad_core::pagination::*;
