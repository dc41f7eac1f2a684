//! Member profile model and letter grades.
//!
//! # Invariants
//! - Each profile links to exactly one actor with `Role::Member`.
//! - `current_grade` is only written by the monthly grading job.

use crate::model::actor::ActorId;
use crate::model::validation::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type MemberId = Uuid;

/// Membership lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemberStatus {
    #[serde(rename = "ACTIVE")]
    Active,
    /// First-stage disciplinary probation.
    #[serde(rename = "SP1")]
    Probation1,
    /// Second-stage disciplinary probation.
    #[serde(rename = "SP2")]
    Probation2,
    #[serde(rename = "INACTIVE")]
    Inactive,
    #[serde(rename = "GRADUATED")]
    Graduated,
    #[serde(rename = "EXPELLED")]
    Expelled,
}

impl MemberStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Probation1 => "SP1",
            Self::Probation2 => "SP2",
            Self::Inactive => "INACTIVE",
            Self::Graduated => "GRADUATED",
            Self::Expelled => "EXPELLED",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value {
            "ACTIVE" => Ok(Self::Active),
            "SP1" => Ok(Self::Probation1),
            "SP2" => Ok(Self::Probation2),
            "INACTIVE" => Ok(Self::Inactive),
            "GRADUATED" => Ok(Self::Graduated),
            "EXPELLED" => Ok(Self::Expelled),
            other => Err(ValidationError::UnknownValue {
                field: "member status",
                value: other.to_string(),
            }),
        }
    }

    /// Probation states cap the achievable final score.
    pub fn is_probation(self) -> bool {
        matches!(self, Self::Probation1 | Self::Probation2)
    }
}

/// Letter grade, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    E,
}

impl Grade {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::E => "E",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            "C" => Ok(Self::C),
            "D" => Ok(Self::D),
            "E" => Ok(Self::E),
            other => Err(ValidationError::UnknownValue {
                field: "grade",
                value: other.to_string(),
            }),
        }
    }
}

impl Display for Grade {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dormitory member profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberProfile {
    pub id: MemberId,
    pub actor_id: ActorId,
    pub full_name: String,
    pub division: String,
    pub status: MemberStatus,
    pub current_grade: Option<Grade>,
    /// Unix epoch milliseconds.
    pub join_date: i64,
}

impl MemberProfile {
    /// Creates an active, ungraded profile for `actor_id`.
    pub fn new(
        actor_id: ActorId,
        full_name: impl Into<String>,
        division: impl Into<String>,
        join_date: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor_id,
            full_name: full_name.into(),
            division: division.into(),
            status: MemberStatus::Active,
            current_grade: None,
            join_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Grade, MemberStatus};

    #[test]
    fn only_sp_states_are_probation() {
        assert!(MemberStatus::Probation1.is_probation());
        assert!(MemberStatus::Probation2.is_probation());
        assert!(!MemberStatus::Active.is_probation());
        assert!(!MemberStatus::Expelled.is_probation());
    }

    #[test]
    fn status_and_grade_strings_roundtrip() {
        assert_eq!(MemberStatus::parse("SP2").expect("known"), MemberStatus::Probation2);
        assert!(MemberStatus::parse("active").is_err());
        assert_eq!(Grade::parse("C").expect("known"), Grade::C);
        assert!(Grade::parse("F").is_err());
        assert!(Grade::A < Grade::E);
    }
}
