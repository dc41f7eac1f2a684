//! Granted capability repository contract and SQLite implementation.
//!
//! # Invariants
//! - At most one grant exists per `(actor_id, permission_key)`.
//! - Lookups always read committed rows; nothing is cached.

use crate::model::actor::{ActorId, GrantRecord};
use crate::model::capability::{parse_capability, Capability};
use crate::repo::{parse_uuid, RepoError, RepoResult, SqliteStore};
use rusqlite::{params, OptionalExtension, Row};

const GRANT_SELECT_SQL: &str = "SELECT
    id,
    actor_id,
    permission_key,
    granted_by,
    granted_at
FROM permissions";

/// Repository interface for per-actor capability grants.
pub trait GrantRepository {
    fn find_granted_capability(
        &self,
        actor_id: ActorId,
        capability: Capability,
    ) -> RepoResult<Option<GrantRecord>>;
    fn insert_grant(&self, grant: &GrantRecord) -> RepoResult<()>;
    /// Removes one grant. Returns the removed record, if any existed.
    fn delete_grant(
        &self,
        actor_id: ActorId,
        capability: Capability,
    ) -> RepoResult<Option<GrantRecord>>;
    fn list_grants(&self, actor_id: ActorId) -> RepoResult<Vec<GrantRecord>>;
}

impl<T: GrantRepository + ?Sized> GrantRepository for &T {
    fn find_granted_capability(
        &self,
        actor_id: ActorId,
        capability: Capability,
    ) -> RepoResult<Option<GrantRecord>> {
        (**self).find_granted_capability(actor_id, capability)
    }

    fn insert_grant(&self, grant: &GrantRecord) -> RepoResult<()> {
        (**self).insert_grant(grant)
    }

    fn delete_grant(
        &self,
        actor_id: ActorId,
        capability: Capability,
    ) -> RepoResult<Option<GrantRecord>> {
        (**self).delete_grant(actor_id, capability)
    }

    fn list_grants(&self, actor_id: ActorId) -> RepoResult<Vec<GrantRecord>> {
        (**self).list_grants(actor_id)
    }
}

impl GrantRepository for SqliteStore<'_> {
    fn find_granted_capability(
        &self,
        actor_id: ActorId,
        capability: Capability,
    ) -> RepoResult<Option<GrantRecord>> {
        self.conn()
            .query_row(
                &format!("{GRANT_SELECT_SQL} WHERE actor_id = ?1 AND permission_key = ?2;"),
                params![actor_id.to_string(), capability.as_str()],
                read_grant_columns,
            )
            .optional()?
            .map(parse_grant)
            .transpose()
    }

    fn insert_grant(&self, grant: &GrantRecord) -> RepoResult<()> {
        self.conn().execute(
            "INSERT INTO permissions (
                id,
                actor_id,
                permission_key,
                granted_by,
                granted_at
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                grant.id.to_string(),
                grant.actor_id.to_string(),
                grant.capability.as_str(),
                grant.granted_by.to_string(),
                grant.granted_at,
            ],
        )?;
        Ok(())
    }

    fn delete_grant(
        &self,
        actor_id: ActorId,
        capability: Capability,
    ) -> RepoResult<Option<GrantRecord>> {
        // Single statement, so it composes with an enclosing transaction.
        let removed = self
            .conn()
            .query_row(
                "DELETE FROM permissions
                 WHERE actor_id = ?1 AND permission_key = ?2
                 RETURNING id, actor_id, permission_key, granted_by, granted_at;",
                params![actor_id.to_string(), capability.as_str()],
                read_grant_columns,
            )
            .optional()?;
        removed.map(parse_grant).transpose()
    }

    fn list_grants(&self, actor_id: ActorId) -> RepoResult<Vec<GrantRecord>> {
        let mut stmt = self.conn().prepare(&format!(
            "{GRANT_SELECT_SQL}
             WHERE actor_id = ?1
             ORDER BY permission_key ASC;"
        ))?;
        let rows = stmt.query_map([actor_id.to_string()], read_grant_columns)?;
        let mut grants = Vec::new();
        for columns in rows {
            grants.push(parse_grant(columns?)?);
        }
        Ok(grants)
    }
}

type GrantColumns = (String, String, String, String, i64);

fn read_grant_columns(row: &Row<'_>) -> rusqlite::Result<GrantColumns> {
    Ok((
        row.get("id")?,
        row.get("actor_id")?,
        row.get("permission_key")?,
        row.get("granted_by")?,
        row.get("granted_at")?,
    ))
}

fn parse_grant(
    (id, actor_id, permission_key, granted_by, granted_at): GrantColumns,
) -> RepoResult<GrantRecord> {
    let capability = parse_capability(&permission_key).map_err(|err| {
        RepoError::InvalidData(format!("{err} in permissions.permission_key"))
    })?;
    Ok(GrantRecord {
        id: parse_uuid(&id, "permissions.id")?,
        actor_id: parse_uuid(&actor_id, "permissions.actor_id")?,
        capability,
        granted_by: parse_uuid(&granted_by, "permissions.granted_by")?,
        granted_at,
    })
}
