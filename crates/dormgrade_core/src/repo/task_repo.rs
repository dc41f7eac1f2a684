//! Task repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist member tasks and their verification state.
//! - Serve period-scoped task lookups for the activity aggregator.
//!
//! # Invariants
//! - Period lookups use a half-open deadline window `[start, end)`.
//! - Verification writes only succeed for rows still in `PENDING`, so two
//!   verifiers racing on one task cannot both win.
//! - List ordering is deterministic: `deadline ASC, id ASC`.

use crate::model::member::MemberId;
use crate::model::task::{Task, TaskFrequency, TaskId, TaskStatus};
use crate::model::validation::ValidationError;
use crate::repo::{
    invalid_column, parse_optional_uuid, parse_uuid, RepoError, RepoResult, SqliteStore,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};

const TASK_SELECT_SQL: &str = "SELECT
    id,
    member_id,
    title,
    frequency,
    deadline,
    constraints,
    solutions,
    proof_link,
    status,
    verified_by,
    verified_at
FROM tasks";

/// Query options for listing tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskListQuery {
    pub member_id: Option<MemberId>,
    pub status: Option<TaskStatus>,
}

/// Repository interface for member tasks.
pub trait TaskRepository {
    fn create_task(&self, task: &Task) -> RepoResult<TaskId>;
    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>>;
    /// Tasks of `member_id` with `start_ms <= deadline < end_ms`.
    fn find_tasks(&self, member_id: MemberId, start_ms: i64, end_ms: i64)
        -> RepoResult<Vec<Task>>;
    fn list_tasks(&self, query: &TaskListQuery) -> RepoResult<Vec<Task>>;
    /// Persists a verification decision made on a pending task.
    fn update_task_verification(&self, task: &Task) -> RepoResult<()>;
}

impl<T: TaskRepository + ?Sized> TaskRepository for &T {
    fn create_task(&self, task: &Task) -> RepoResult<TaskId> {
        (**self).create_task(task)
    }

    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>> {
        (**self).get_task(id)
    }

    fn find_tasks(
        &self,
        member_id: MemberId,
        start_ms: i64,
        end_ms: i64,
    ) -> RepoResult<Vec<Task>> {
        (**self).find_tasks(member_id, start_ms, end_ms)
    }

    fn list_tasks(&self, query: &TaskListQuery) -> RepoResult<Vec<Task>> {
        (**self).list_tasks(query)
    }

    fn update_task_verification(&self, task: &Task) -> RepoResult<()> {
        (**self).update_task_verification(task)
    }
}

impl TaskRepository for SqliteStore<'_> {
    fn create_task(&self, task: &Task) -> RepoResult<TaskId> {
        self.conn().execute(
            "INSERT INTO tasks (
                id,
                member_id,
                title,
                frequency,
                deadline,
                constraints,
                solutions,
                proof_link,
                status,
                verified_by,
                verified_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
            params![
                task.id.to_string(),
                task.member_id.to_string(),
                task.title.as_str(),
                task.frequency.as_str(),
                task.deadline,
                task.constraints.as_str(),
                task.solutions.as_str(),
                task.proof_link.as_deref(),
                task.status.as_str(),
                task.verified_by.map(|id| id.to_string()),
                task.verified_at,
            ],
        )?;
        Ok(task.id)
    }

    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>> {
        self.conn()
            .query_row(
                &format!("{TASK_SELECT_SQL} WHERE id = ?1;"),
                [id.to_string()],
                read_task_columns,
            )
            .optional()?
            .map(parse_task)
            .transpose()
    }

    fn find_tasks(
        &self,
        member_id: MemberId,
        start_ms: i64,
        end_ms: i64,
    ) -> RepoResult<Vec<Task>> {
        let mut stmt = self.conn().prepare(&format!(
            "{TASK_SELECT_SQL}
             WHERE member_id = ?1
               AND deadline >= ?2
               AND deadline < ?3
             ORDER BY deadline ASC, id ASC;"
        ))?;
        let rows = stmt.query_map(
            params![member_id.to_string(), start_ms, end_ms],
            read_task_columns,
        )?;
        let mut tasks = Vec::new();
        for columns in rows {
            tasks.push(parse_task(columns?)?);
        }
        Ok(tasks)
    }

    fn list_tasks(&self, query: &TaskListQuery) -> RepoResult<Vec<Task>> {
        let mut sql = format!("{TASK_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(member_id) = query.member_id {
            sql.push_str(" AND member_id = ?");
            bind_values.push(Value::Text(member_id.to_string()));
        }
        if let Some(status) = query.status {
            sql.push_str(" AND status = ?");
            bind_values.push(Value::Text(status.as_str().to_string()));
        }
        sql.push_str(" ORDER BY deadline ASC, id ASC;");

        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(bind_values), read_task_columns)?;
        let mut tasks = Vec::new();
        for columns in rows {
            tasks.push(parse_task(columns?)?);
        }
        Ok(tasks)
    }

    fn update_task_verification(&self, task: &Task) -> RepoResult<()> {
        let changed = self.conn().execute(
            "UPDATE tasks
             SET
                status = ?1,
                verified_by = ?2,
                verified_at = ?3
             WHERE id = ?4
               AND status = 'PENDING';",
            params![
                task.status.as_str(),
                task.verified_by.map(|id| id.to_string()),
                task.verified_at,
                task.id.to_string(),
            ],
        )?;
        if changed == 1 {
            return Ok(());
        }

        match self.get_task(task.id)? {
            Some(current) => Err(RepoError::Validation(
                ValidationError::TaskAlreadyVerified {
                    status: current.status.as_str(),
                },
            )),
            None => Err(RepoError::NotFound {
                entity: "task",
                id: task.id,
            }),
        }
    }
}

type TaskColumns = (
    String,
    String,
    String,
    String,
    i64,
    String,
    String,
    Option<String>,
    String,
    Option<String>,
    Option<i64>,
);

fn read_task_columns(row: &Row<'_>) -> rusqlite::Result<TaskColumns> {
    Ok((
        row.get("id")?,
        row.get("member_id")?,
        row.get("title")?,
        row.get("frequency")?,
        row.get("deadline")?,
        row.get("constraints")?,
        row.get("solutions")?,
        row.get("proof_link")?,
        row.get("status")?,
        row.get("verified_by")?,
        row.get("verified_at")?,
    ))
}

fn parse_task(columns: TaskColumns) -> RepoResult<Task> {
    let (
        id,
        member_id,
        title,
        frequency,
        deadline,
        constraints,
        solutions,
        proof_link,
        status,
        verified_by,
        verified_at,
    ) = columns;

    Ok(Task {
        id: parse_uuid(&id, "tasks.id")?,
        member_id: parse_uuid(&member_id, "tasks.member_id")?,
        title,
        frequency: TaskFrequency::parse(&frequency)
            .map_err(|err| invalid_column("tasks.frequency", err))?,
        deadline,
        constraints,
        solutions,
        proof_link,
        status: TaskStatus::parse(&status).map_err(|err| invalid_column("tasks.status", err))?,
        verified_by: parse_optional_uuid(verified_by, "tasks.verified_by")?,
        verified_at,
    })
}
