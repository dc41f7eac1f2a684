//! Actor registration and member enrollment.

use crate::model::actor::{Actor, ActorId, Role};
use crate::model::member::{MemberId, MemberProfile, MemberStatus};
use crate::model::validation::ValidationError;
use crate::repo::actor_repo::ActorRepository;
use crate::repo::member_repo::MemberRepository;
use crate::service::permission::require_administrator;
use crate::service::{ServiceError, ServiceResult};
use log::info;

pub struct MemberService<S> {
    store: S,
}

impl<S: ActorRepository + MemberRepository> MemberService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn register_actor(&self, username: &str, role: Role) -> ServiceResult<Actor> {
        let actor = Actor::new(username, role)?;
        self.store.create_actor(&actor)?;
        info!(
            "event=actor_register module=member status=ok actor_id={} role={}",
            actor.id,
            actor.role.as_str()
        );
        Ok(actor)
    }

    pub fn get_actor(&self, id: ActorId) -> ServiceResult<Actor> {
        self.store
            .get_actor(id)?
            .ok_or(ServiceError::NotFound { entity: "actor", id })
    }

    /// Creates an active member profile linked to a `MEMBER` actor.
    pub fn enroll_member(
        &self,
        actor_id: ActorId,
        full_name: &str,
        division: &str,
        join_date: i64,
    ) -> ServiceResult<MemberProfile> {
        let actor = self.get_actor(actor_id)?;
        if actor.role != Role::Member {
            return Err(ValidationError::ActorNotMember.into());
        }
        let member = MemberProfile::new(actor.id, full_name.trim(), division.trim(), join_date);
        self.store.create_member(&member)?;
        info!(
            "event=member_enroll module=member status=ok actor_id={} member_id={}",
            actor.id, member.id
        );
        Ok(member)
    }

    pub fn get_member(&self, id: MemberId) -> ServiceResult<MemberProfile> {
        self.store
            .get_member(id)?
            .ok_or(ServiceError::NotFound { entity: "member", id })
    }

    /// Moves a member to `status`. Administrator only.
    pub fn set_member_status(
        &self,
        admin: &Actor,
        member_id: MemberId,
        status: MemberStatus,
    ) -> ServiceResult<MemberProfile> {
        require_administrator(admin)?;
        self.store.update_member_status(member_id, status)?;
        info!(
            "event=member_status module=member status=ok actor_id={} member_id={} new_status={}",
            admin.id,
            member_id,
            status.as_str()
        );
        self.get_member(member_id)
    }
}
