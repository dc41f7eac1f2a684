//! Append-only audit log repository.
//!
//! # Invariants
//! - The trait exposes no update or delete; storage triggers reject both.
//! - Each append is a single INSERT, so an entry is either fully visible or
//!   absent.

use crate::model::audit::{AuditAction, AuditEntry};
use crate::repo::{parse_uuid, RepoError, RepoResult, SqliteStore};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Row};
use uuid::Uuid;

/// Filter for audit log reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditListQuery {
    pub target_table: Option<String>,
    pub target_id: Option<Uuid>,
}

/// Repository interface for the audit log.
pub trait AuditRepository {
    fn append_audit_entry(&self, entry: &AuditEntry) -> RepoResult<()>;
    /// Lists entries in append order.
    fn list_audit_entries(&self, query: &AuditListQuery) -> RepoResult<Vec<AuditEntry>>;
}

impl<T: AuditRepository + ?Sized> AuditRepository for &T {
    fn append_audit_entry(&self, entry: &AuditEntry) -> RepoResult<()> {
        (**self).append_audit_entry(entry)
    }

    fn list_audit_entries(&self, query: &AuditListQuery) -> RepoResult<Vec<AuditEntry>> {
        (**self).list_audit_entries(query)
    }
}

impl AuditRepository for SqliteStore<'_> {
    fn append_audit_entry(&self, entry: &AuditEntry) -> RepoResult<()> {
        let details = serde_json::to_string(&entry.details)
            .map_err(|err| RepoError::InvalidData(format!("audit details not serializable: {err}")))?;
        self.conn().execute(
            "INSERT INTO audit_logs (
                id,
                actor_id,
                action,
                target_table,
                target_id,
                details,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                entry.id.to_string(),
                entry.actor_id.to_string(),
                entry.action.as_str(),
                entry.target_table.as_str(),
                entry.target_id.to_string(),
                details,
                entry.created_at,
            ],
        )?;
        Ok(())
    }

    fn list_audit_entries(&self, query: &AuditListQuery) -> RepoResult<Vec<AuditEntry>> {
        let mut sql = String::from(
            "SELECT
                id,
                actor_id,
                action,
                target_table,
                target_id,
                details,
                created_at
             FROM audit_logs
             WHERE 1 = 1",
        );
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(target_table) = query.target_table.as_ref() {
            sql.push_str(" AND target_table = ?");
            bind_values.push(Value::Text(target_table.clone()));
        }
        if let Some(target_id) = query.target_id {
            sql.push_str(" AND target_id = ?");
            bind_values.push(Value::Text(target_id.to_string()));
        }
        sql.push_str(" ORDER BY created_at ASC, rowid ASC;");

        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(bind_values), read_audit_columns)?;
        let mut entries = Vec::new();
        for columns in rows {
            entries.push(parse_audit_entry(columns?)?);
        }
        Ok(entries)
    }
}

type AuditColumns = (String, String, String, String, String, String, i64);

fn read_audit_columns(row: &Row<'_>) -> rusqlite::Result<AuditColumns> {
    Ok((
        row.get("id")?,
        row.get("actor_id")?,
        row.get("action")?,
        row.get("target_table")?,
        row.get("target_id")?,
        row.get("details")?,
        row.get("created_at")?,
    ))
}

fn parse_audit_entry(
    (id, actor_id, action, target_table, target_id, details, created_at): AuditColumns,
) -> RepoResult<AuditEntry> {
    let action = AuditAction::parse(&action).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid action `{action}` in audit_logs.action"))
    })?;
    let details = serde_json::from_str(&details)
        .map_err(|err| RepoError::InvalidData(format!("{err} in audit_logs.details")))?;
    Ok(AuditEntry {
        id: parse_uuid(&id, "audit_logs.id")?,
        actor_id: parse_uuid(&actor_id, "audit_logs.actor_id")?,
        action,
        target_table,
        target_id: parse_uuid(&target_id, "audit_logs.target_id")?,
        details,
        created_at,
    })
}
