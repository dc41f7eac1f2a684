//! Monthly grading job.
//!
//! # Responsibility
//! - Grade every active member for the last full calendar month.
//! - Persist `current_grade` per member and report a batch summary.
//!
//! # Invariants
//! - At most one run holds the [`GradingLock`] at a time; an overlapping
//!   trigger is refused with `AlreadyRunning`.
//! - The database grading lease extends that exclusion across processes
//!   sharing one database. A lease older than [`GRADING_LEASE_TTL_MS`] is
//!   considered abandoned and taken over.
//! - One member's failure never aborts the batch.
//! - Aggregation runs under the per-member budget; queries still running at
//!   the deadline are interrupted and the member is reported `Skipped`.
//! - Re-running within the same month targets the same period and
//!   overwrites grades with identical values when inputs are unchanged.
//! - Member selection (`ACTIVE`) and the probation cap are independent
//!   predicates.

use crate::model::member::{Grade, MemberId, MemberProfile};
use crate::model::now_epoch_ms;
use crate::model::period::Period;
use crate::repo::boarding_repo::BoardingRepository;
use crate::repo::lease_repo::GradingLeaseRepository;
use crate::repo::member_repo::MemberRepository;
use crate::repo::task_repo::TaskRepository;
use crate::repo::{QueryBudget, RepoError};
use crate::service::aggregate::{ActivityAggregator, ActivitySummary};
use crate::service::grade::{calculate_grade, GradeResult};
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Per-member aggregation budget used when none is configured.
pub const DEFAULT_MEMBER_BUDGET: Duration = Duration::from_millis(5_000);

/// Age after which a grading lease left by a dead run may be taken over.
pub const GRADING_LEASE_TTL_MS: i64 = 6 * 60 * 60 * 1000;

/// In-process mutual-exclusion guard for grading runs.
///
/// Clones share one lock, so jobs built on separate connections still
/// refuse to overlap without touching the database.
#[derive(Debug, Clone, Default)]
pub struct GradingLock {
    inner: Arc<Mutex<()>>,
}

/// Held while a grading run is in progress.
pub struct GradingLockGuard<'lock> {
    _guard: MutexGuard<'lock, ()>,
}

impl GradingLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock without waiting. `None` when a run is in progress.
    pub fn try_acquire(&self) -> Option<GradingLockGuard<'_>> {
        match self.inner.try_lock() {
            Ok(guard) => Some(GradingLockGuard { _guard: guard }),
            // A panicked run leaves no partial state behind the lock itself.
            Err(TryLockError::Poisoned(poisoned)) => Some(GradingLockGuard {
                _guard: poisoned.into_inner(),
            }),
            Err(TryLockError::WouldBlock) => None,
        }
    }
}

/// Batch-level failures. Per-member failures are reported in the summary.
#[derive(Debug)]
pub enum GradingJobError {
    /// Another run holds the grading lock or the database lease.
    AlreadyRunning,
    /// The lease could not be taken or active members could not be listed;
    /// nothing was graded.
    Storage(RepoError),
}

impl Display for GradingJobError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyRunning => write!(f, "monthly grading is already running"),
            Self::Storage(err) => write!(f, "grading run could not start: {err}"),
        }
    }
}

impl Error for GradingJobError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::AlreadyRunning => None,
            Self::Storage(err) => Some(err),
        }
    }
}

/// Result of grading one member.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberOutcome {
    Graded {
        member_id: MemberId,
        activity: ActivitySummary,
        result: GradeResult,
    },
    Failed {
        member_id: MemberId,
        error: String,
    },
    /// Aggregation was interrupted at the per-member budget; nothing was
    /// persisted.
    Skipped {
        member_id: MemberId,
        elapsed_ms: u128,
    },
}

impl MemberOutcome {
    pub fn member_id(&self) -> MemberId {
        match self {
            Self::Graded { member_id, .. }
            | Self::Failed { member_id, .. }
            | Self::Skipped { member_id, .. } => *member_id,
        }
    }
}

/// Summary of one grading run.
#[derive(Debug, Clone, PartialEq)]
pub struct GradingSummary {
    pub period: Period,
    pub graded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub outcomes: Vec<MemberOutcome>,
}

impl GradingSummary {
    fn new(period: Period) -> Self {
        Self {
            period,
            graded: 0,
            failed: 0,
            skipped: 0,
            outcomes: Vec::new(),
        }
    }

    fn push(&mut self, outcome: MemberOutcome) {
        match outcome {
            MemberOutcome::Graded { .. } => self.graded += 1,
            MemberOutcome::Failed { .. } => self.failed += 1,
            MemberOutcome::Skipped { .. } => self.skipped += 1,
        }
        self.outcomes.push(outcome);
    }

    /// Grade written for `member_id` in this run, if any.
    pub fn grade_for(&self, member_id: MemberId) -> Option<Grade> {
        self.outcomes.iter().find_map(|outcome| match outcome {
            MemberOutcome::Graded {
                member_id: graded_id,
                result,
                ..
            } if *graded_id == member_id => Some(result.grade),
            _ => None,
        })
    }
}

/// Period graded by a run triggered at `now`: the previous calendar month.
pub fn target_period(now: DateTime<Utc>) -> Period {
    Period::containing(now).previous()
}

/// First instant of the calendar month after `now`, i.e. the next trigger.
pub fn next_run_after(now: DateTime<Utc>) -> DateTime<Utc> {
    Period::containing(now).next().start()
}

/// Orchestrates aggregation, grading and persistence across members.
pub struct MonthlyGradingJob<S> {
    store: S,
    lock: GradingLock,
    member_budget: Duration,
}

impl<S> MonthlyGradingJob<S>
where
    S: MemberRepository + TaskRepository + BoardingRepository + QueryBudget + GradingLeaseRepository,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            lock: GradingLock::new(),
            member_budget: DEFAULT_MEMBER_BUDGET,
        }
    }

    /// Shares `lock` with other job instances.
    pub fn with_lock(mut self, lock: GradingLock) -> Self {
        self.lock = lock;
        self
    }

    pub fn with_member_budget(mut self, budget: Duration) -> Self {
        self.member_budget = budget;
        self
    }

    /// Grades the month before `now` for every active member.
    pub fn run_monthly_grading(
        &self,
        now: DateTime<Utc>,
    ) -> Result<GradingSummary, GradingJobError> {
        self.grade_period(target_period(now))
    }

    /// Grades an explicit period. Used for reruns and backfills.
    pub fn grade_period(&self, period: Period) -> Result<GradingSummary, GradingJobError> {
        let Some(_guard) = self.lock.try_acquire() else {
            warn!("event=grading_run module=grading status=refused period={period} reason=already_running");
            return Err(GradingJobError::AlreadyRunning);
        };

        let holder = Uuid::new_v4();
        let now_ms = now_epoch_ms();
        let acquired = self
            .store
            .try_acquire_grading_lease(
                holder,
                period,
                now_ms,
                now_ms.saturating_sub(GRADING_LEASE_TTL_MS),
            )
            .map_err(|err| {
                error!(
                    "event=grading_run module=grading status=error period={} error_code=lease_failed error={}",
                    period, err
                );
                GradingJobError::Storage(err)
            })?;
        if !acquired {
            warn!("event=grading_run module=grading status=refused period={period} reason=lease_held");
            return Err(GradingJobError::AlreadyRunning);
        }

        let result = self.grade_members(period);
        if let Err(err) = self.store.release_grading_lease(holder) {
            error!(
                "event=grading_run module=grading status=error period={} error_code=lease_release_failed error={}",
                period, err
            );
        }
        result
    }

    fn grade_members(&self, period: Period) -> Result<GradingSummary, GradingJobError> {
        let started_at = Instant::now();
        info!("event=grading_run module=grading status=start period={period}");

        let members = self.store.find_active_members().map_err(|err| {
            error!(
                "event=grading_run module=grading status=error period={} error_code=load_members_failed error={}",
                period, err
            );
            GradingJobError::Storage(err)
        })?;

        let aggregator = ActivityAggregator::new(&self.store);
        let mut summary = GradingSummary::new(period);
        for member in &members {
            summary.push(self.grade_member(&aggregator, member, period));
        }

        info!(
            "event=grading_run module=grading status=ok period={} members={} graded={} failed={} skipped={} duration_ms={}",
            period,
            members.len(),
            summary.graded,
            summary.failed,
            summary.skipped,
            started_at.elapsed().as_millis()
        );
        Ok(summary)
    }

    fn grade_member(
        &self,
        aggregator: &ActivityAggregator<&S>,
        member: &MemberProfile,
        period: Period,
    ) -> MemberOutcome {
        let started_at = Instant::now();
        let aggregated = self
            .store
            .with_deadline(self.member_budget, || aggregator.aggregate_member(member, period));
        let activity = match aggregated {
            Ok(activity) => activity,
            Err(RepoError::DeadlineExceeded { budget }) => {
                let elapsed = started_at.elapsed();
                warn!(
                    "event=grading_member module=grading status=skipped member_id={} period={} elapsed_ms={} budget_ms={}",
                    member.id,
                    period,
                    elapsed.as_millis(),
                    budget.as_millis()
                );
                return MemberOutcome::Skipped {
                    member_id: member.id,
                    elapsed_ms: elapsed.as_millis(),
                };
            }
            Err(err) => return self.member_failed(member.id, period, "aggregate_failed", &err),
        };

        let result = match calculate_grade(activity.task_ratio, activity.discipline_score, member.status)
        {
            Ok(result) => result,
            Err(err) => return self.member_failed(member.id, period, "grade_invalid_input", &err),
        };

        if let Err(err) = self.store.update_member_grade(member.id, result.grade) {
            return self.member_failed(member.id, period, "grade_write_failed", &err);
        }

        info!(
            "event=grading_member module=grading status=ok member_id={} period={} tasks={} completed={} discipline={} final_score={:.2} grade={}",
            member.id,
            period,
            activity.task_count,
            activity.completed_count,
            activity.discipline_score,
            result.final_score,
            result.grade
        );
        MemberOutcome::Graded {
            member_id: member.id,
            activity,
            result,
        }
    }

    fn member_failed(
        &self,
        member_id: MemberId,
        period: Period,
        error_code: &str,
        err: &dyn Error,
    ) -> MemberOutcome {
        error!(
            "event=grading_member module=grading status=error member_id={} period={} error_code={} error={}",
            member_id, period, error_code, err
        );
        MemberOutcome::Failed {
            member_id,
            error: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{next_run_after, target_period, GradingLock};
    use chrono::{TimeZone, Utc};

    #[test]
    fn target_period_is_previous_month() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(target_period(now).to_string(), "2024-02-01");
        let late = Utc.with_ymd_and_hms(2024, 3, 31, 23, 59, 59).unwrap();
        assert_eq!(target_period(late), target_period(now));
    }

    #[test]
    fn target_period_wraps_into_previous_year() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(target_period(now).to_string(), "2024-12-01");
    }

    #[test]
    fn next_run_is_first_instant_of_next_month() {
        let now = Utc.with_ymd_and_hms(2024, 12, 15, 8, 30, 0).unwrap();
        assert_eq!(
            next_run_after(now),
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
        );
        let boundary = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            next_run_after(boundary),
            Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn lock_refuses_second_holder_until_released() {
        let lock = GradingLock::new();
        let shared = lock.clone();
        let guard = lock.try_acquire().expect("first acquire");
        assert!(shared.try_acquire().is_none());
        drop(guard);
        assert!(shared.try_acquire().is_some());
    }
}
