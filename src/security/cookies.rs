// ABOUTME: Session cookie construction and extraction
// ABOUTME: Builds HttpOnly SameSite=Lax cookies and reads the session token back out of requests
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad

use std::time::Duration;

use http::header::{COOKIE, SET_COOKIE};
use http::{HeaderMap, HeaderValue};
use jasad_core::constants::auth::SESSION_COOKIE_NAME;

use crate::errors::{AppError, AppResult};

/// `Set-Cookie` value carrying a session token
///
/// # Errors
///
/// Returns an error if the token contains bytes not allowed in a header
pub fn session_cookie(token: &str, ttl: Duration, secure: bool) -> AppResult<HeaderValue> {
    let secure_attr = if secure { "; Secure" } else { "" };
    let cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax{secure_attr}",
        ttl.as_secs()
    );
    HeaderValue::from_str(&cookie)
        .map_err(|e| AppError::internal(format!("invalid session cookie: {e}")))
}

/// Append a session cookie to response headers
///
/// # Errors
///
/// Returns an error if the cookie value cannot be encoded
pub fn set_session_cookie(
    headers: &mut HeaderMap,
    token: &str,
    ttl: Duration,
    secure: bool,
) -> AppResult<()> {
    headers.append(SET_COOKIE, session_cookie(token, ttl, secure)?);
    Ok(())
}

/// Replace the session cookie with an immediately expiring empty one
///
/// # Errors
///
/// Returns an error if the cookie value cannot be encoded
pub fn clear_session_cookie(headers: &mut HeaderMap, secure: bool) -> AppResult<()> {
    headers.append(SET_COOKIE, session_cookie("", Duration::ZERO, secure)?);
    Ok(())
}

/// Session token from the request's `Cookie` headers, if present and non-empty
#[must_use]
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE_NAME && !value.is_empty())
        .map(|(_, value)| value.to_owned())
}
