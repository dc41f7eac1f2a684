//! Boarding record repository contract and SQLite implementation.
//!
//! # Invariants
//! - Duplicate `(member, period)` rows are allowed; `find_boarding_record`
//!   returns the most recently created one (`created_at DESC`, then latest
//!   insert).
//! - Stored discipline scores are re-validated on read.

use crate::model::boarding::{validate_discipline_score, BoardingRecord, BoardingRecordId};
use crate::model::member::MemberId;
use crate::model::period::Period;
use crate::repo::{invalid_column, parse_uuid, RepoResult, SqliteStore};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};

const BOARDING_SELECT_SQL: &str = "SELECT
    id,
    member_id,
    period_month,
    discipline_score,
    liabilities,
    achievements,
    notes,
    input_by,
    created_at
FROM boarding_records";

/// Query options for listing boarding records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardingListQuery {
    pub member_id: Option<MemberId>,
    pub period: Option<Period>,
}

/// Repository interface for boarding records.
pub trait BoardingRepository {
    fn create_boarding_record(&self, record: &BoardingRecord) -> RepoResult<BoardingRecordId>;
    fn find_boarding_record(
        &self,
        member_id: MemberId,
        period: Period,
    ) -> RepoResult<Option<BoardingRecord>>;
    /// Lists records, newest period first.
    fn list_boarding_records(&self, query: &BoardingListQuery) -> RepoResult<Vec<BoardingRecord>>;
}

impl<T: BoardingRepository + ?Sized> BoardingRepository for &T {
    fn create_boarding_record(&self, record: &BoardingRecord) -> RepoResult<BoardingRecordId> {
        (**self).create_boarding_record(record)
    }

    fn find_boarding_record(
        &self,
        member_id: MemberId,
        period: Period,
    ) -> RepoResult<Option<BoardingRecord>> {
        (**self).find_boarding_record(member_id, period)
    }

    fn list_boarding_records(&self, query: &BoardingListQuery) -> RepoResult<Vec<BoardingRecord>> {
        (**self).list_boarding_records(query)
    }
}

impl BoardingRepository for SqliteStore<'_> {
    fn create_boarding_record(&self, record: &BoardingRecord) -> RepoResult<BoardingRecordId> {
        validate_discipline_score(record.discipline_score)?;
        self.conn().execute(
            "INSERT INTO boarding_records (
                id,
                member_id,
                period_month,
                discipline_score,
                liabilities,
                achievements,
                notes,
                input_by,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                record.id.to_string(),
                record.member_id.to_string(),
                record.period.to_string(),
                record.discipline_score,
                record.liabilities.as_deref(),
                record.achievements.as_deref(),
                record.notes.as_deref(),
                record.input_by.to_string(),
                record.created_at,
            ],
        )?;
        Ok(record.id)
    }

    fn find_boarding_record(
        &self,
        member_id: MemberId,
        period: Period,
    ) -> RepoResult<Option<BoardingRecord>> {
        self.conn()
            .query_row(
                &format!(
                    "{BOARDING_SELECT_SQL}
                     WHERE member_id = ?1
                       AND period_month = ?2
                     ORDER BY created_at DESC, rowid DESC
                     LIMIT 1;"
                ),
                params![member_id.to_string(), period.to_string()],
                read_boarding_columns,
            )
            .optional()?
            .map(parse_boarding_record)
            .transpose()
    }

    fn list_boarding_records(&self, query: &BoardingListQuery) -> RepoResult<Vec<BoardingRecord>> {
        let mut sql = format!("{BOARDING_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(member_id) = query.member_id {
            sql.push_str(" AND member_id = ?");
            bind_values.push(Value::Text(member_id.to_string()));
        }
        if let Some(period) = query.period {
            sql.push_str(" AND period_month = ?");
            bind_values.push(Value::Text(period.to_string()));
        }
        sql.push_str(" ORDER BY period_month DESC, created_at DESC, rowid DESC;");

        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(bind_values), read_boarding_columns)?;
        let mut records = Vec::new();
        for columns in rows {
            records.push(parse_boarding_record(columns?)?);
        }
        Ok(records)
    }
}

type BoardingColumns = (
    String,
    String,
    String,
    f64,
    Option<String>,
    Option<String>,
    Option<String>,
    String,
    i64,
);

fn read_boarding_columns(row: &Row<'_>) -> rusqlite::Result<BoardingColumns> {
    Ok((
        row.get("id")?,
        row.get("member_id")?,
        row.get("period_month")?,
        row.get("discipline_score")?,
        row.get("liabilities")?,
        row.get("achievements")?,
        row.get("notes")?,
        row.get("input_by")?,
        row.get("created_at")?,
    ))
}

fn parse_boarding_record(columns: BoardingColumns) -> RepoResult<BoardingRecord> {
    let (
        id,
        member_id,
        period_month,
        discipline_score,
        liabilities,
        achievements,
        notes,
        input_by,
        created_at,
    ) = columns;

    Ok(BoardingRecord {
        id: parse_uuid(&id, "boarding_records.id")?,
        member_id: parse_uuid(&member_id, "boarding_records.member_id")?,
        period: Period::parse(&period_month)
            .map_err(|err| invalid_column("boarding_records.period_month", err))?,
        discipline_score: validate_discipline_score(discipline_score)
            .map_err(|err| invalid_column("boarding_records.discipline_score", err))?,
        liabilities,
        achievements,
        notes,
        input_by: parse_uuid(&input_by, "boarding_records.input_by")?,
        created_at,
    })
}
