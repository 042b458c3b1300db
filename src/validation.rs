// ABOUTME: Per-type request validation producing ordered field errors
// ABOUTME: Shared field checks plus the conversion of failures into a 422 response
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad

//! Request validation
//!
//! Each request type implements [`Validate`] on its own; the checks below are
//! free functions that append to the caller's list, so errors come back in
//! the order the checks ran.

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::LazyLock;

use regex::Regex;

use crate::errors::{AppError, AppResult, FieldError};

/// Letter first, then 3 to 19 letters, digits, or underscores
static USERNAME_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9_]{3,19}$").ok());

/// bcrypt only hashes the first 72 bytes
const PASSWORD_MAX_BYTES: usize = 72;
const PASSWORD_MIN_BYTES: usize = 8;

/// A type that can check its own fields
pub trait Validate {
    /// Field errors in check order; empty when valid
    fn validate(&self) -> Vec<FieldError>;
}

/// Reject `value` with a 422 carrying every field error
///
/// # Errors
///
/// Returns `ValidationFailed` when any check fails
pub fn validate_or_reject<T: Validate + ?Sized>(value: &T) -> AppResult<()> {
    let errors = value.validate();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::validation(errors))
    }
}

/// Append `message` for `field` unless `ok`
pub fn check(errors: &mut Vec<FieldError>, ok: bool, field: &str, message: &str) {
    if !ok {
        errors.push(FieldError::new(field, message));
    }
}

/// Non-blank text of at most `max_chars` characters
pub fn check_text(errors: &mut Vec<FieldError>, field: &str, value: &str, max_chars: usize) {
    if value.trim().is_empty() {
        errors.push(FieldError::new(field, "must be provided"));
    } else {
        check(
            errors,
            value.chars().count() <= max_chars,
            field,
            &format!("must not be more than {max_chars} characters long"),
        );
    }
}

/// Account name rules
pub fn check_username(errors: &mut Vec<FieldError>, field: &str, value: &str) {
    let matches = USERNAME_PATTERN
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(value));
    check(
        errors,
        matches,
        field,
        "must start with a letter and contain 4 to 20 letters, digits, or underscores",
    );
}

/// Password length in bytes
pub fn check_password(errors: &mut Vec<FieldError>, field: &str, value: &str) {
    if value.len() < PASSWORD_MIN_BYTES {
        errors.push(FieldError::new(
            field,
            format!("must be at least {PASSWORD_MIN_BYTES} bytes long"),
        ));
    } else {
        check(
            errors,
            value.len() <= PASSWORD_MAX_BYTES,
            field,
            &format!("must not be more than {PASSWORD_MAX_BYTES} bytes long"),
        );
    }
}

/// No repeated items
pub fn check_unique<T: Eq + Hash>(errors: &mut Vec<FieldError>, field: &str, items: &[T]) {
    let mut seen = HashSet::with_capacity(items.len());
    check(
        errors,
        items.iter().all(|item| seen.insert(item)),
        field,
        "must not contain duplicate values",
    );
}
