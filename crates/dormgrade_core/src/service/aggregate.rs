//! Activity aggregator: per-member, per-period task and discipline inputs.
//!
//! # Invariants
//! - Tasks count toward a period when `start <= deadline < end`.
//! - No tasks in a period means `task_ratio = 0` (no activity, no credit).
//! - No boarding record means `discipline_score = 100` (no complaint on file).
//!
//! The two defaults are intentionally asymmetric.

use crate::model::member::{MemberId, MemberProfile};
use crate::model::period::Period;
use crate::model::task::TaskStatus;
use crate::repo::boarding_repo::BoardingRepository;
use crate::repo::member_repo::MemberRepository;
use crate::repo::task_repo::TaskRepository;
use crate::repo::RepoResult;
use crate::service::{ServiceError, ServiceResult};
use serde::Serialize;

/// Discipline score assumed when no boarding record exists for the period.
pub const DEFAULT_DISCIPLINE_SCORE: f64 = 100.0;

/// Aggregated grading inputs for one member and period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivitySummary {
    pub member_id: MemberId,
    pub period: Period,
    /// Completed / total tasks in `[0, 1]`.
    pub task_ratio: f64,
    /// Discipline score in `[0, 100]`.
    pub discipline_score: f64,
    pub task_count: usize,
    pub completed_count: usize,
    pub boarding_record_found: bool,
}

/// Reads raw activity records and reduces them to grading inputs.
pub struct ActivityAggregator<R> {
    store: R,
}

impl<R: TaskRepository + BoardingRepository> ActivityAggregator<R> {
    pub fn new(store: R) -> Self {
        Self { store }
    }

    /// Aggregates an already-loaded member profile.
    pub fn aggregate_member(
        &self,
        member: &MemberProfile,
        period: Period,
    ) -> RepoResult<ActivitySummary> {
        let tasks =
            self.store
                .find_tasks(member.id, period.start_epoch_ms(), period.end_epoch_ms())?;
        let task_count = tasks.len();
        let completed_count = tasks
            .iter()
            .filter(|task| task.status == TaskStatus::Completed)
            .count();
        let task_ratio = if task_count == 0 {
            0.0
        } else {
            completed_count as f64 / task_count as f64
        };

        let record = self.store.find_boarding_record(member.id, period)?;
        let boarding_record_found = record.is_some();
        let discipline_score =
            record.map_or(DEFAULT_DISCIPLINE_SCORE, |record| record.discipline_score);

        Ok(ActivitySummary {
            member_id: member.id,
            period,
            task_ratio,
            discipline_score,
            task_count,
            completed_count,
            boarding_record_found,
        })
    }
}

impl<R: MemberRepository + TaskRepository + BoardingRepository> ActivityAggregator<R> {
    /// Aggregates `member_id` for `period`. Unknown members are `NotFound`.
    pub fn aggregate(&self, member_id: MemberId, period: Period) -> ServiceResult<ActivitySummary> {
        let member = self
            .store
            .get_member(member_id)?
            .ok_or(ServiceError::NotFound {
                entity: "member",
                id: member_id,
            })?;
        Ok(self.aggregate_member(&member, period)?)
    }
}
