//! Grade calculator: blends task ratio and discipline score into a letter.
//!
//! # Invariants
//! - The result is a pure function of `(task_ratio, discipline_score, status)`.
//! - Probation members never score above [`PROBATION_SCORE_CAP`].
//! - Letter bands are inclusive on their lower bound.

use crate::model::boarding::{DISCIPLINE_SCORE_MAX, DISCIPLINE_SCORE_MIN};
use crate::model::member::{Grade, MemberStatus};
use crate::model::validation::ValidationError;
use serde::Serialize;

pub const TASK_WEIGHT: f64 = 0.6;
pub const DISCIPLINE_WEIGHT: f64 = 0.4;
pub const PROBATION_SCORE_CAP: f64 = 50.0;

/// Descending lower bounds; first match wins.
const GRADE_BANDS: [(f64, Grade); 4] = [
    (90.0, Grade::A),
    (75.0, Grade::B),
    (60.0, Grade::C),
    (40.0, Grade::D),
];

/// Final score and letter for one member-period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GradeResult {
    /// Weighted score in `[0, 100]`, after any probation cap.
    pub final_score: f64,
    pub grade: Grade,
}

/// Computes the final score and letter grade.
///
/// `task_ratio` must lie in `[0, 1]`. A finite `discipline_score` outside
/// `[0, 100]` is clamped; non-finite inputs are rejected.
pub fn calculate_grade(
    task_ratio: f64,
    discipline_score: f64,
    status: MemberStatus,
) -> Result<GradeResult, ValidationError> {
    if !task_ratio.is_finite() || !(0.0..=1.0).contains(&task_ratio) {
        return Err(ValidationError::TaskRatioOutOfRange(task_ratio));
    }
    if !discipline_score.is_finite() {
        return Err(ValidationError::DisciplineScoreOutOfRange(discipline_score));
    }
    let discipline_score = discipline_score.clamp(DISCIPLINE_SCORE_MIN, DISCIPLINE_SCORE_MAX);

    let mut final_score = task_ratio * 100.0 * TASK_WEIGHT + discipline_score * DISCIPLINE_WEIGHT;
    if status.is_probation() {
        final_score = final_score.min(PROBATION_SCORE_CAP);
    }

    Ok(GradeResult {
        final_score,
        grade: letter_for_score(final_score),
    })
}

/// Maps a final score to its letter band.
pub fn letter_for_score(score: f64) -> Grade {
    GRADE_BANDS
        .iter()
        .find(|(lower_bound, _)| score >= *lower_bound)
        .map_or(Grade::E, |(_, grade)| *grade)
}

#[cfg(test)]
mod tests {
    use super::{calculate_grade, letter_for_score};
    use crate::model::member::{Grade, MemberStatus};
    use crate::model::validation::ValidationError;

    fn assert_score(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected score {expected}, got {actual}"
        );
    }

    #[test]
    fn perfect_active_member_gets_a() {
        let result = calculate_grade(1.0, 100.0, MemberStatus::Active).unwrap();
        assert_score(result.final_score, 100.0);
        assert_eq!(result.grade, Grade::A);
    }

    #[test]
    fn half_tasks_with_eighty_discipline_gets_c() {
        let result = calculate_grade(0.5, 80.0, MemberStatus::Active).unwrap();
        assert_score(result.final_score, 62.0);
        assert_eq!(result.grade, Grade::C);
    }

    #[test]
    fn probation_caps_perfect_scores_at_fifty() {
        for status in [MemberStatus::Probation1, MemberStatus::Probation2] {
            let result = calculate_grade(1.0, 100.0, status).unwrap();
            assert_score(result.final_score, 50.0);
            assert_eq!(result.grade, Grade::D);
        }
    }

    #[test]
    fn probation_cap_leaves_lower_scores_alone() {
        let result = calculate_grade(0.0, 100.0, MemberStatus::Probation1).unwrap();
        assert_score(result.final_score, 40.0);
        assert_eq!(result.grade, Grade::D);
    }

    #[test]
    fn letter_boundaries_are_inclusive_on_lower_bound() {
        let cases = [
            (100.0, Grade::A),
            (90.0, Grade::A),
            (89.99, Grade::B),
            (75.0, Grade::B),
            (74.99, Grade::C),
            (60.0, Grade::C),
            (59.99, Grade::D),
            (40.0, Grade::D),
            (39.99, Grade::E),
            (0.0, Grade::E),
        ];
        for (score, expected) in cases {
            assert_eq!(letter_for_score(score), expected, "score {score}");
        }
    }

    #[test]
    fn zero_activity_with_default_discipline_is_d() {
        let result = calculate_grade(0.0, 100.0, MemberStatus::Active).unwrap();
        assert_score(result.final_score, 40.0);
        assert_eq!(result.grade, Grade::D);
    }

    #[test]
    fn rejects_task_ratio_out_of_range() {
        assert_eq!(
            calculate_grade(1.2, 50.0, MemberStatus::Active).unwrap_err(),
            ValidationError::TaskRatioOutOfRange(1.2)
        );
        assert!(calculate_grade(f64::NAN, 50.0, MemberStatus::Active).is_err());
        assert!(calculate_grade(-0.1, 50.0, MemberStatus::Active).is_err());
    }

    #[test]
    fn clamps_finite_discipline_score_and_rejects_nan() {
        let high = calculate_grade(0.0, 140.0, MemberStatus::Active).unwrap();
        assert_score(high.final_score, 40.0);
        let low = calculate_grade(1.0, -20.0, MemberStatus::Active).unwrap();
        assert_score(low.final_score, 60.0);
        assert!(calculate_grade(0.5, f64::INFINITY, MemberStatus::Active).is_err());
    }

    #[test]
    fn recomputation_is_deterministic() {
        let first = calculate_grade(0.7, 65.0, MemberStatus::Active).unwrap();
        let second = calculate_grade(0.7, 65.0, MemberStatus::Active).unwrap();
        assert_eq!(first, second);
    }
}
