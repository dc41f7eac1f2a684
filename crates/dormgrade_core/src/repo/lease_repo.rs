//! Grading run lease, shared by every process using the same database.
//!
//! # Invariants
//! - At most one lease row exists; whoever holds it may run grading.
//! - A lease older than the caller's staleness cutoff is taken over, so a
//!   crashed run cannot block later months forever.
//! - Release only removes the caller's own lease.

use crate::model::period::Period;
use crate::repo::{invalid_column, parse_uuid, RepoResult, SqliteStore};
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

/// The lease row as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradingLease {
    pub holder: Uuid,
    pub period: Period,
    pub acquired_at: i64,
}

pub trait GradingLeaseRepository {
    /// Claims the lease for `holder`.
    ///
    /// Returns `false` when another holder acquired it at or after
    /// `stale_before_ms`.
    fn try_acquire_grading_lease(
        &self,
        holder: Uuid,
        period: Period,
        now_ms: i64,
        stale_before_ms: i64,
    ) -> RepoResult<bool>;
    fn release_grading_lease(&self, holder: Uuid) -> RepoResult<()>;
    fn current_grading_lease(&self) -> RepoResult<Option<GradingLease>>;
}

impl<T: GradingLeaseRepository + ?Sized> GradingLeaseRepository for &T {
    fn try_acquire_grading_lease(
        &self,
        holder: Uuid,
        period: Period,
        now_ms: i64,
        stale_before_ms: i64,
    ) -> RepoResult<bool> {
        (**self).try_acquire_grading_lease(holder, period, now_ms, stale_before_ms)
    }

    fn release_grading_lease(&self, holder: Uuid) -> RepoResult<()> {
        (**self).release_grading_lease(holder)
    }

    fn current_grading_lease(&self) -> RepoResult<Option<GradingLease>> {
        (**self).current_grading_lease()
    }
}

impl GradingLeaseRepository for SqliteStore<'_> {
    fn try_acquire_grading_lease(
        &self,
        holder: Uuid,
        period: Period,
        now_ms: i64,
        stale_before_ms: i64,
    ) -> RepoResult<bool> {
        let changed = self.conn().execute(
            "INSERT INTO grading_lease (id, holder, period_month, acquired_at)
             VALUES (1, ?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
                holder = excluded.holder,
                period_month = excluded.period_month,
                acquired_at = excluded.acquired_at
             WHERE grading_lease.acquired_at < ?4;",
            params![holder.to_string(), period.to_string(), now_ms, stale_before_ms],
        )?;
        Ok(changed == 1)
    }

    fn release_grading_lease(&self, holder: Uuid) -> RepoResult<()> {
        self.conn().execute(
            "DELETE FROM grading_lease WHERE id = 1 AND holder = ?1;",
            [holder.to_string()],
        )?;
        Ok(())
    }

    fn current_grading_lease(&self) -> RepoResult<Option<GradingLease>> {
        let row = self
            .conn()
            .query_row(
                "SELECT holder, period_month, acquired_at FROM grading_lease WHERE id = 1;",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()?;
        let Some((holder, period, acquired_at)) = row else {
            return Ok(None);
        };
        Ok(Some(GradingLease {
            holder: parse_uuid(&holder, "grading_lease.holder")?,
            period: Period::parse(&period)
                .map_err(|err| invalid_column("grading_lease.period_month", err))?,
            acquired_at,
        }))
    }
}
