//! Append-only audit entries for privileged actions.

use crate::model::actor::ActorId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub type AuditEntryId = Uuid;

/// Kind of privileged action recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    GrantPermission,
    RevokePermission,
    VerifyTask,
    InputBoardingRecord,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GrantPermission => "GRANT_PERMISSION",
            Self::RevokePermission => "REVOKE_PERMISSION",
            Self::VerifyTask => "VERIFY_TASK",
            Self::InputBoardingRecord => "INPUT_BOARDING_RECORD",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "GRANT_PERMISSION" => Some(Self::GrantPermission),
            "REVOKE_PERMISSION" => Some(Self::RevokePermission),
            "VERIFY_TASK" => Some(Self::VerifyTask),
            "INPUT_BOARDING_RECORD" => Some(Self::InputBoardingRecord),
            _ => None,
        }
    }
}

/// Immutable audit record. Never updated or deleted once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: AuditEntryId,
    pub actor_id: ActorId,
    pub action: AuditAction,
    /// Storage table of the affected record, e.g. `tasks`.
    pub target_table: String,
    pub target_id: Uuid,
    /// Before/after detail payload.
    pub details: Value,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

impl AuditEntry {
    pub fn new(
        actor_id: ActorId,
        action: AuditAction,
        target_table: &str,
        target_id: Uuid,
        details: Value,
        created_at: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor_id,
            action,
            target_table: target_table.to_string(),
            target_id,
            details,
            created_at,
        }
    }
}
