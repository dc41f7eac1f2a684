//! Member profile repository contract and SQLite implementation.
//!
//! # Invariants
//! - `find_active_members` ordering is deterministic: `full_name ASC, id ASC`.
//! - Grade updates are single-statement writes; a partial grade is never
//!   visible.

use crate::model::actor::ActorId;
use crate::model::member::{Grade, MemberId, MemberProfile, MemberStatus};
use crate::repo::{invalid_column, parse_uuid, RepoError, RepoResult, SqliteStore};
use rusqlite::{params, OptionalExtension, Row};

const MEMBER_SELECT_SQL: &str = "SELECT
    id,
    actor_id,
    full_name,
    division,
    status,
    current_grade,
    join_date
FROM members";

/// Repository interface for member profiles.
pub trait MemberRepository {
    fn create_member(&self, member: &MemberProfile) -> RepoResult<MemberId>;
    fn get_member(&self, id: MemberId) -> RepoResult<Option<MemberProfile>>;
    fn find_member_by_actor(&self, actor_id: ActorId) -> RepoResult<Option<MemberProfile>>;
    /// Members selected for automatic grading (`status = ACTIVE`).
    fn find_active_members(&self) -> RepoResult<Vec<MemberProfile>>;
    fn update_member_grade(&self, id: MemberId, grade: Grade) -> RepoResult<()>;
    fn update_member_status(&self, id: MemberId, status: MemberStatus) -> RepoResult<()>;
}

impl<T: MemberRepository + ?Sized> MemberRepository for &T {
    fn create_member(&self, member: &MemberProfile) -> RepoResult<MemberId> {
        (**self).create_member(member)
    }

    fn get_member(&self, id: MemberId) -> RepoResult<Option<MemberProfile>> {
        (**self).get_member(id)
    }

    fn find_member_by_actor(&self, actor_id: ActorId) -> RepoResult<Option<MemberProfile>> {
        (**self).find_member_by_actor(actor_id)
    }

    fn find_active_members(&self) -> RepoResult<Vec<MemberProfile>> {
        (**self).find_active_members()
    }

    fn update_member_grade(&self, id: MemberId, grade: Grade) -> RepoResult<()> {
        (**self).update_member_grade(id, grade)
    }

    fn update_member_status(&self, id: MemberId, status: MemberStatus) -> RepoResult<()> {
        (**self).update_member_status(id, status)
    }
}

impl MemberRepository for SqliteStore<'_> {
    fn create_member(&self, member: &MemberProfile) -> RepoResult<MemberId> {
        self.conn().execute(
            "INSERT INTO members (
                id,
                actor_id,
                full_name,
                division,
                status,
                current_grade,
                join_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                member.id.to_string(),
                member.actor_id.to_string(),
                member.full_name.as_str(),
                member.division.as_str(),
                member.status.as_str(),
                member.current_grade.map(Grade::as_str),
                member.join_date,
            ],
        )?;
        Ok(member.id)
    }

    fn get_member(&self, id: MemberId) -> RepoResult<Option<MemberProfile>> {
        self.conn()
            .query_row(
                &format!("{MEMBER_SELECT_SQL} WHERE id = ?1;"),
                [id.to_string()],
                read_member_columns,
            )
            .optional()?
            .map(parse_member)
            .transpose()
    }

    fn find_member_by_actor(&self, actor_id: ActorId) -> RepoResult<Option<MemberProfile>> {
        self.conn()
            .query_row(
                &format!("{MEMBER_SELECT_SQL} WHERE actor_id = ?1;"),
                [actor_id.to_string()],
                read_member_columns,
            )
            .optional()?
            .map(parse_member)
            .transpose()
    }

    fn find_active_members(&self) -> RepoResult<Vec<MemberProfile>> {
        let mut stmt = self.conn().prepare(&format!(
            "{MEMBER_SELECT_SQL}
             WHERE status = ?1
             ORDER BY full_name ASC, id ASC;"
        ))?;
        let rows = stmt.query_map([MemberStatus::Active.as_str()], read_member_columns)?;
        let mut members = Vec::new();
        for columns in rows {
            members.push(parse_member(columns?)?);
        }
        Ok(members)
    }

    fn update_member_grade(&self, id: MemberId, grade: Grade) -> RepoResult<()> {
        let changed = self.conn().execute(
            "UPDATE members
             SET
                current_grade = ?1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?2;",
            params![grade.as_str(), id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "member",
                id,
            });
        }
        Ok(())
    }

    fn update_member_status(&self, id: MemberId, status: MemberStatus) -> RepoResult<()> {
        let changed = self.conn().execute(
            "UPDATE members
             SET
                status = ?1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?2;",
            params![status.as_str(), id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "member",
                id,
            });
        }
        Ok(())
    }
}

type MemberColumns = (String, String, String, String, String, Option<String>, i64);

fn read_member_columns(row: &Row<'_>) -> rusqlite::Result<MemberColumns> {
    Ok((
        row.get("id")?,
        row.get("actor_id")?,
        row.get("full_name")?,
        row.get("division")?,
        row.get("status")?,
        row.get("current_grade")?,
        row.get("join_date")?,
    ))
}

fn parse_member(
    (id, actor_id, full_name, division, status, current_grade, join_date): MemberColumns,
) -> RepoResult<MemberProfile> {
    let current_grade = current_grade
        .map(|value| Grade::parse(&value))
        .transpose()
        .map_err(|err| invalid_column("members.current_grade", err))?;
    Ok(MemberProfile {
        id: parse_uuid(&id, "members.id")?,
        actor_id: parse_uuid(&actor_id, "members.actor_id")?,
        full_name,
        division,
        status: MemberStatus::parse(&status)
            .map_err(|err| invalid_column("members.status", err))?,
        current_grade,
        join_date,
    })
}
