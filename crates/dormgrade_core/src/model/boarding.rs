//! Monthly boarding (discipline) record.
//!
//! # Invariants
//! - `discipline_score` is finite and within `[0, 100]`.
//! - Nothing prevents two records for the same `(member, period)`; readers
//!   pick the most recently created one.

use crate::model::actor::ActorId;
use crate::model::member::MemberId;
use crate::model::period::Period;
use crate::model::validation::ValidationError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type BoardingRecordId = Uuid;

pub const DISCIPLINE_SCORE_MIN: f64 = 0.0;
pub const DISCIPLINE_SCORE_MAX: f64 = 100.0;

/// Validates a discipline score without clamping.
pub fn validate_discipline_score(score: f64) -> Result<f64, ValidationError> {
    if !score.is_finite() || !(DISCIPLINE_SCORE_MIN..=DISCIPLINE_SCORE_MAX).contains(&score) {
        return Err(ValidationError::DisciplineScoreOutOfRange(score));
    }
    Ok(score)
}

/// Officer-submitted boarding record fields.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBoardingRecord {
    pub member_id: MemberId,
    pub period: Period,
    pub discipline_score: f64,
    pub liabilities: Option<String>,
    pub achievements: Option<String>,
    pub notes: Option<String>,
}

/// Persisted boarding record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardingRecord {
    pub id: BoardingRecordId,
    pub member_id: MemberId,
    pub period: Period,
    pub discipline_score: f64,
    pub liabilities: Option<String>,
    pub achievements: Option<String>,
    pub notes: Option<String>,
    pub input_by: ActorId,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

impl BoardingRecord {
    pub fn new(
        fields: NewBoardingRecord,
        input_by: ActorId,
        created_at: i64,
    ) -> Result<Self, ValidationError> {
        let discipline_score = validate_discipline_score(fields.discipline_score)?;
        Ok(Self {
            id: Uuid::new_v4(),
            member_id: fields.member_id,
            period: fields.period,
            discipline_score,
            liabilities: fields.liabilities,
            achievements: fields.achievements,
            notes: fields.notes,
            input_by,
            created_at,
        })
    }
}
