//! Domain model for actors, members, tasks, boarding records and audit log.
//!
//! # Responsibility
//! - Define canonical data structures used by grading and permission logic.
//! - Own field validation and one-way state transitions.
//!
//! # Invariants
//! - Every record is identified by a stable UUID.
//! - Timestamps are Unix epoch milliseconds; periods are first-of-month dates.

pub mod actor;
pub mod audit;
pub mod boarding;
pub mod capability;
pub mod member;
pub mod period;
pub mod task;
pub mod validation;

/// Current wall-clock time as Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
