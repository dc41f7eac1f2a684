//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define one data-access contract per concern (actors, grants, members,
//!   tasks, boarding records, audit log).
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Every SQLite implementation lives on `SqliteStore`, which only accepts
//!   fully migrated connections.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.
//! - Read paths reject invalid persisted state instead of masking it.
//! - A change and its audit entry commit together through [`Transactional`].
//! - Work run under [`QueryBudget`] is interrupted inside SQLite once its
//!   deadline passes and surfaces as `DeadlineExceeded`.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::validation::ValidationError;
use rusqlite::{Connection, ErrorCode, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{Duration, Instant};
use uuid::Uuid;

pub mod actor_repo;
pub mod audit_repo;
pub mod boarding_repo;
pub mod grant_repo;
pub mod lease_repo;
pub mod member_repo;
pub mod task_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    /// Referenced record does not exist.
    NotFound { entity: &'static str, id: Uuid },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Persisted data cannot be converted to a valid domain record.
    InvalidData(String),
    /// Work under a [`QueryBudget`] was interrupted at its deadline.
    DeadlineExceeded { budget: Duration },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::DeadlineExceeded { budget } => {
                write!(f, "query interrupted after {} ms budget", budget.as_millis())
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound { .. }
            | Self::UninitializedConnection { .. }
            | Self::InvalidData(_)
            | Self::DeadlineExceeded { .. } => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// SQLite-backed store implementing every repository trait.
///
/// Borrowing the connection keeps ownership with the caller, so one
/// connection can back several services in the same request.
#[derive(Clone, Copy)]
pub struct SqliteStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStore<'conn> {
    /// Wraps a connection after checking migrations were applied.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let expected_version = latest_version();
        let actual_version = current_user_version(conn)?;
        if actual_version != expected_version {
            return Err(RepoError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }

    pub(crate) fn conn(&self) -> &'conn Connection {
        self.conn
    }
}

/// Runs several repository writes as one unit.
pub trait Transactional {
    /// Runs `work` inside one transaction.
    ///
    /// Commits when `work` returns `Ok`; any `Err` rolls back every write
    /// made inside it. Not reentrant.
    fn atomically<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<RepoError>;
}

impl<S: Transactional + ?Sized> Transactional for &S {
    fn atomically<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<RepoError>,
    {
        (**self).atomically(work)
    }
}

impl Transactional for SqliteStore<'_> {
    fn atomically<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<RepoError>,
    {
        // Write lock is taken at BEGIN, not at the first write.
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(RepoError::from)?;
        let value = work()?;
        tx.commit().map_err(RepoError::from)?;
        Ok(value)
    }
}

/// Bounds how long a unit of read work may run.
pub trait QueryBudget {
    /// Runs `work`, interrupting in-flight queries once `budget` elapses.
    ///
    /// An interrupted query yields `RepoError::DeadlineExceeded`.
    fn with_deadline<T, F>(&self, budget: Duration, work: F) -> RepoResult<T>
    where
        F: FnOnce() -> RepoResult<T>;
}

impl<S: QueryBudget + ?Sized> QueryBudget for &S {
    fn with_deadline<T, F>(&self, budget: Duration, work: F) -> RepoResult<T>
    where
        F: FnOnce() -> RepoResult<T>,
    {
        (**self).with_deadline(budget, work)
    }
}

/// VM instructions between deadline checks.
const DEADLINE_CHECK_INTERVAL: i32 = 100;

impl QueryBudget for SqliteStore<'_> {
    fn with_deadline<T, F>(&self, budget: Duration, work: F) -> RepoResult<T>
    where
        F: FnOnce() -> RepoResult<T>,
    {
        let deadline = Instant::now().checked_add(budget);
        self.conn.progress_handler(
            DEADLINE_CHECK_INTERVAL,
            Some(move || deadline.is_some_and(|deadline| Instant::now() >= deadline)),
        );
        let result = work();
        self.conn.progress_handler(0, None::<fn() -> bool>);

        result.map_err(|err| {
            if is_interrupted(&err) {
                RepoError::DeadlineExceeded { budget }
            } else {
                err
            }
        })
    }
}

fn is_interrupted(err: &RepoError) -> bool {
    matches!(
        err,
        RepoError::Db(DbError::Sqlite(sqlite))
            if sqlite.sqlite_error_code() == Some(ErrorCode::OperationInterrupted)
    )
}

pub(crate) fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

pub(crate) fn parse_optional_uuid(value: Option<String>, column: &str) -> RepoResult<Option<Uuid>> {
    value.map(|text| parse_uuid(&text, column)).transpose()
}

/// Maps a domain parse failure on a stored column to `InvalidData`.
pub(crate) fn invalid_column(column: &str, err: ValidationError) -> RepoError {
    RepoError::InvalidData(format!("{err} in {column}"))
}
