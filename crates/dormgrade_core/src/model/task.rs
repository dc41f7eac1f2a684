//! Member task domain model.
//!
//! # Responsibility
//! - Define the recurring task record submitted by members.
//! - Own the one-way verification transition.
//!
//! # Invariants
//! - `status` moves only `Pending -> Completed | Rejected`, never back.
//! - `verified_by`/`verified_at` are set iff `status != Pending`.
//! - `title` has at least 5 characters.

use crate::model::actor::ActorId;
use crate::model::member::MemberId;
use crate::model::validation::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type TaskId = Uuid;

const TITLE_MIN_CHARS: usize = 5;

static PROOF_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://[^\s/$.?#][^\s]*$").expect("valid proof link regex"));

/// Verification lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Submitted, awaiting verification.
    Pending,
    /// Approved by a verifier.
    Completed,
    /// Rejected by a verifier.
    Rejected,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
            Self::Rejected => "REJECTED",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value {
            "PENDING" => Ok(Self::Pending),
            "COMPLETED" => Ok(Self::Completed),
            "REJECTED" => Ok(Self::Rejected),
            other => Err(ValidationError::UnknownValue {
                field: "task status",
                value: other.to_string(),
            }),
        }
    }
}

/// Recurrence declared by the member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskFrequency {
    Daily,
    Weekly,
    Monthly,
}

impl TaskFrequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "DAILY",
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value {
            "DAILY" => Ok(Self::Daily),
            "WEEKLY" => Ok(Self::Weekly),
            "MONTHLY" => Ok(Self::Monthly),
            other => Err(ValidationError::UnknownValue {
                field: "task frequency",
                value: other.to_string(),
            }),
        }
    }
}

/// Verifier decision for a pending task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerifyDecision {
    Approve,
    Reject,
}

impl VerifyDecision {
    pub fn target_status(self) -> TaskStatus {
        match self {
            Self::Approve => TaskStatus::Completed,
            Self::Reject => TaskStatus::Rejected,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Approve => "APPROVE",
            Self::Reject => "REJECT",
        }
    }
}

/// Member-submitted task fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub frequency: TaskFrequency,
    /// Unix epoch milliseconds.
    pub deadline: i64,
    pub constraints: String,
    pub solutions: String,
    pub proof_link: Option<String>,
}

impl NewTask {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().chars().count() < TITLE_MIN_CHARS {
            return Err(ValidationError::TitleTooShort {
                min_chars: TITLE_MIN_CHARS,
            });
        }
        if let Some(link) = self.proof_link.as_deref() {
            if !PROOF_LINK_RE.is_match(link.trim()) {
                return Err(ValidationError::InvalidProofLink(link.to_string()));
            }
        }
        Ok(())
    }
}

/// Persisted task record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub member_id: MemberId,
    pub title: String,
    pub frequency: TaskFrequency,
    /// Unix epoch milliseconds.
    pub deadline: i64,
    pub constraints: String,
    pub solutions: String,
    pub proof_link: Option<String>,
    pub status: TaskStatus,
    pub verified_by: Option<ActorId>,
    /// Unix epoch milliseconds.
    pub verified_at: Option<i64>,
}

impl Task {
    /// Creates a pending task for `member_id` after field validation.
    pub fn new(member_id: MemberId, fields: NewTask) -> Result<Self, ValidationError> {
        fields.validate()?;
        Ok(Self {
            id: Uuid::new_v4(),
            member_id,
            title: fields.title.trim().to_string(),
            frequency: fields.frequency,
            deadline: fields.deadline,
            constraints: fields.constraints,
            solutions: fields.solutions,
            proof_link: fields.proof_link.map(|link| link.trim().to_string()),
            status: TaskStatus::Pending,
            verified_by: None,
            verified_at: None,
        })
    }

    /// Applies a verifier decision. Only pending tasks can be verified.
    pub fn verify(
        &mut self,
        decision: VerifyDecision,
        verifier: ActorId,
        verified_at: i64,
    ) -> Result<(), ValidationError> {
        if self.status != TaskStatus::Pending {
            return Err(ValidationError::TaskAlreadyVerified {
                status: self.status.as_str(),
            });
        }
        self.status = decision.target_status();
        self.verified_by = Some(verifier);
        self.verified_at = Some(verified_at);
        Ok(())
    }
}
