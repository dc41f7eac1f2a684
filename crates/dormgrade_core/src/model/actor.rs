//! Actor identity and granted capability records.
//!
//! # Invariants
//! - `role` is fixed for the lifetime of an actor session.
//! - Grants are additive and do not expire on their own.

use crate::model::capability::Capability;
use crate::model::validation::ValidationError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ActorId = Uuid;
pub type GrantId = Uuid;

const USERNAME_MIN_CHARS: usize = 4;

/// Primary role of an authenticated actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Super administrator. Bypasses every capability check.
    #[serde(rename = "ADMIN")]
    Administrator,
    /// Dormitory member with a linked member profile.
    Member,
    /// Outside staff, e.g. a dormitory head.
    External,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Administrator => "ADMIN",
            Self::Member => "MEMBER",
            Self::External => "EXTERNAL",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value {
            "ADMIN" => Ok(Self::Administrator),
            "MEMBER" => Ok(Self::Member),
            "EXTERNAL" => Ok(Self::External),
            other => Err(ValidationError::UnknownValue {
                field: "role",
                value: other.to_string(),
            }),
        }
    }
}

/// Authenticated identity as seen by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub username: String,
    pub role: Role,
}

impl Actor {
    /// Creates an actor with a generated id.
    pub fn new(username: impl Into<String>, role: Role) -> Result<Self, ValidationError> {
        let username = username.into().trim().to_string();
        if username.chars().count() < USERNAME_MIN_CHARS {
            return Err(ValidationError::UsernameTooShort {
                min_chars: USERNAME_MIN_CHARS,
            });
        }
        Ok(Self {
            id: Uuid::new_v4(),
            username,
            role,
        })
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Administrator
    }
}

/// One delegated capability held by an actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantRecord {
    pub id: GrantId,
    pub actor_id: ActorId,
    pub capability: Capability,
    /// Administrator who issued the grant.
    pub granted_by: ActorId,
    /// Unix epoch milliseconds.
    pub granted_at: i64,
}
