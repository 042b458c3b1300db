// ABOUTME: Identity models shared by the token codec, session store, and gate
// ABOUTME: Defines Role and Principal, the typed request-scoped identity
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Numeric user identifier as stored in the relational store
pub type UserId = i64;

/// Access level of a principal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular account
    User,
    /// Administrator; satisfies every role requirement and ownership check
    Admin,
}

impl Role {
    /// Wire and storage representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    /// Whether this role carries the admin override
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(AppError::invalid_input(format!("unknown role: {other}"))),
        }
    }
}

/// Authenticated identity attached to a request once the gate resolves it
///
/// Immutable for the lifetime of the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// User id
    pub id: UserId,
    /// Role at the time the credential was issued
    pub role: Role,
}

impl Principal {
    /// Create a principal
    #[must_use]
    pub const fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }

    /// Role check with the implicit admin override
    #[must_use]
    pub fn has_any_role(&self, accepted: &[Role]) -> bool {
        self.role.is_admin() || accepted.contains(&self.role)
    }

    /// Ownership check with the implicit admin override
    #[must_use]
    pub const fn may_act_for(&self, owner: UserId) -> bool {
        self.role.is_admin() || self.id == owner
    }
}
