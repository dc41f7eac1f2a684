//! Core grading and permission engine for dormgrade.
//! This crate is the single source of truth for grading and access invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::CoreConfig;
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status, LogTarget};
pub use model::actor::{Actor, ActorId, GrantRecord, Role};
pub use model::capability::{parse_capability, Capability};
pub use model::member::{Grade, MemberId, MemberProfile, MemberStatus};
pub use model::period::Period;
pub use model::validation::ValidationError;
pub use repo::{RepoError, RepoResult, SqliteStore};
pub use service::grade::{calculate_grade, GradeResult};
pub use service::grading_job::{
    next_run_after, GradingJobError, GradingLock, GradingSummary, MemberOutcome,
    MonthlyGradingJob,
};
pub use service::permission::{Access, PermissionResolver};
pub use service::{ServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
