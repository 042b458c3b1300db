// ABOUTME: HMAC-SHA256 signed access tokens carrying subject, role, and lifetime claims
// ABOUTME: Issues and verifies stateless tokens with typed failure reasons
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad

//! # Access Tokens
//!
//! Access tokens are compact JWS strings: `header.payload.signature`, each
//! segment base64url encoded, signed with HS256. They need no store lookup to
//! verify, and are short-lived because they cannot be revoked.
//!
//! Expiry is checked here rather than by the JWT library so that an expired
//! token is reported as [`TokenError::Expired`] only after its signature has
//! been verified, and so that no leeway is applied.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::{AppError, AppResult};
use crate::models::{Principal, Role, UserId};

/// Why a token was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Segments do not parse as a signed token
    #[error("token is malformed: {0}")]
    Malformed(String),
    /// Signature does not match header and payload under the configured key
    #[error("token signature is invalid")]
    InvalidSignature,
    /// Signature is valid but the token is past its expiry
    #[error("token expired at {expired_at}")]
    Expired {
        /// Expiry as Unix seconds
        expired_at: i64,
    },
}

impl From<TokenError> for AppError {
    fn from(error: TokenError) -> Self {
        Self::auth_invalid(error.to_string())
    }
}

/// Claims carried by an access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Principal id, as a decimal string
    pub sub: String,
    /// Role at issue time
    pub role: Role,
    /// Issued at, Unix seconds
    pub iat: i64,
    /// Expires at, Unix seconds
    pub exp: i64,
}

impl Claims {
    /// Principal named by these claims
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Malformed`] if the subject is not a numeric id
    pub fn principal(&self) -> Result<Principal, TokenError> {
        let id: UserId = self
            .sub
            .parse()
            .map_err(|_| TokenError::Malformed("subject is not a user id".into()))?;
        Ok(Principal::new(id, self.role))
    }
}

/// Signs and verifies access tokens with one symmetric key
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    /// Create a codec keyed by `secret`
    #[must_use]
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.required_spec_claims.clear();

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Issue a token for `principal` valid for `ttl`
    ///
    /// # Errors
    ///
    /// Returns an error if the claims cannot be serialized or signed
    pub fn issue(&self, principal: &Principal, ttl: Duration) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let lifetime = i64::try_from(ttl.as_secs())
            .map_err(|_| AppError::invalid_input("token lifetime out of range"))?;

        let claims = Claims {
            sub: principal.id.to_string(),
            role: principal.role,
            iat: now,
            exp: now.saturating_add(lifetime),
        };
        self.encode_claims(&claims)
    }

    /// Verify a token and return its claims
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Malformed`], [`TokenError::InvalidSignature`], or
    /// [`TokenError::Expired`]
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let claims: Claims = self.decode_claims(token)?;

        let now = Utc::now().timestamp();
        if now > claims.exp {
            tracing::debug!(sub = %claims.sub, exp = claims.exp, "Access token expired");
            return Err(TokenError::Expired {
                expired_at: claims.exp,
            });
        }

        Ok(claims)
    }

    /// Sign arbitrary claims
    ///
    /// # Errors
    ///
    /// Returns an error if the claims cannot be serialized or signed
    pub fn encode_claims<C: Serialize>(&self, claims: &C) -> AppResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("failed to sign token: {e}")))
    }

    /// Verify the signature and decode arbitrary claims without any expiry check
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Malformed`] or [`TokenError::InvalidSignature`]
    pub fn decode_claims<C: DeserializeOwned>(&self, token: &str) -> Result<C, TokenError> {
        decode::<C>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| convert_jwt_error(&e))
    }
}

fn convert_jwt_error(e: &jsonwebtoken::errors::Error) -> TokenError {
    match e.kind() {
        ErrorKind::InvalidSignature => TokenError::InvalidSignature,
        ErrorKind::InvalidToken => TokenError::Malformed("token format is invalid".into()),
        ErrorKind::Base64(err) => TokenError::Malformed(format!("invalid base64: {err}")),
        ErrorKind::Json(err) => TokenError::Malformed(format!("invalid JSON: {err}")),
        ErrorKind::Utf8(err) => TokenError::Malformed(format!("invalid UTF-8: {err}")),
        _ => TokenError::Malformed(format!("token validation failed: {e}")),
    }
}
