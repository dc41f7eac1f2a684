//! Boarding record use-case service.
//!
//! # Invariants
//! - Input requires `DISCIPLINE_OFFICER` (or administrator) for every
//!   non-admin role.
//! - Scores outside `[0, 100]` are rejected, never clamped, on input.
//! - Every accepted record is paired with an `INPUT_BOARDING_RECORD` entry
//!   written in the same transaction.
//! - A member actor without a profile gets `NotFound` when listing.

use crate::model::actor::{Actor, Role};
use crate::model::audit::{AuditAction, AuditEntry};
use crate::model::boarding::{BoardingRecord, NewBoardingRecord};
use crate::model::capability::Capability;
use crate::repo::audit_repo::AuditRepository;
use crate::repo::boarding_repo::{BoardingListQuery, BoardingRepository};
use crate::repo::grant_repo::GrantRepository;
use crate::repo::member_repo::MemberRepository;
use crate::repo::Transactional;
use crate::service::permission::PermissionResolver;
use crate::service::{ServiceError, ServiceResult};
use log::info;
use serde_json::json;

pub struct BoardingService<S> {
    store: S,
}

impl<S> BoardingService<S>
where
    S: MemberRepository + BoardingRepository + GrantRepository + AuditRepository + Transactional,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Records a monthly discipline assessment for a member.
    pub fn input_boarding_record(
        &self,
        actor: &Actor,
        fields: NewBoardingRecord,
        now_ms: i64,
    ) -> ServiceResult<BoardingRecord> {
        PermissionResolver::new(&self.store)
            .check_permission(actor, Capability::DisciplineOfficer)?;

        if self.store.get_member(fields.member_id)?.is_none() {
            return Err(ServiceError::NotFound {
                entity: "member",
                id: fields.member_id,
            });
        }

        let record = BoardingRecord::new(fields, actor.id, now_ms)?;
        self.store.atomically(|| -> ServiceResult<()> {
            self.store.create_boarding_record(&record)?;
            self.store.append_audit_entry(&AuditEntry::new(
                actor.id,
                AuditAction::InputBoardingRecord,
                "boarding_records",
                record.id,
                json!({
                    "memberId": record.member_id.to_string(),
                    "periodMonth": record.period.to_string(),
                    "disciplineScore": record.discipline_score,
                }),
                now_ms,
            ))?;
            Ok(())
        })?;
        info!(
            "event=boarding_input module=boarding status=ok actor_id={} member_id={} period={} record_id={}",
            actor.id, record.member_id, record.period, record.id
        );
        Ok(record)
    }

    /// Lists boarding records; members only see their own.
    pub fn list_boarding_records(
        &self,
        actor: &Actor,
        query: BoardingListQuery,
    ) -> ServiceResult<Vec<BoardingRecord>> {
        let query = if actor.role == Role::Member {
            let member = self
                .store
                .find_member_by_actor(actor.id)?
                .ok_or(ServiceError::NotFound {
                    entity: "member",
                    id: actor.id,
                })?;
            BoardingListQuery {
                member_id: Some(member.id),
                ..query
            }
        } else {
            query
        };
        Ok(self.store.list_boarding_records(&query)?)
    }
}
