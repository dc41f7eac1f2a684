//! Task use-case service.
//!
//! # Responsibility
//! - Let members submit tasks against their own profile.
//! - Let verifiers approve or reject pending tasks, with an audit entry.
//!
//! # Invariants
//! - Verification requires `TASK_VERIFIER` (or administrator).
//! - A task leaves `PENDING` at most once, and the transition commits
//!   together with its `VERIFY_TASK` entry or not at all.
//! - Members without `TASK_VERIFIER` only ever see their own tasks; a member
//!   without a profile sees `NotFound`, never an empty list.

use crate::model::actor::{Actor, Role};
use crate::model::audit::{AuditAction, AuditEntry};
use crate::model::capability::Capability;
use crate::model::member::MemberId;
use crate::model::task::{NewTask, Task, TaskId, TaskStatus, VerifyDecision};
use crate::repo::audit_repo::AuditRepository;
use crate::repo::grant_repo::GrantRepository;
use crate::repo::member_repo::MemberRepository;
use crate::repo::task_repo::{TaskListQuery, TaskRepository};
use crate::repo::Transactional;
use crate::service::permission::PermissionResolver;
use crate::service::{ServiceError, ServiceResult};
use log::info;
use serde_json::json;

/// Use-case service for member tasks.
pub struct TaskService<S> {
    store: S,
}

impl<S> TaskService<S>
where
    S: MemberRepository + TaskRepository + GrantRepository + AuditRepository + Transactional,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Submits a new pending task owned by `actor`'s member profile.
    pub fn create_task(&self, actor: &Actor, fields: NewTask) -> ServiceResult<Task> {
        let member = self
            .store
            .find_member_by_actor(actor.id)?
            .ok_or(ServiceError::NotFound {
                entity: "member",
                id: actor.id,
            })?;
        let task = Task::new(member.id, fields)?;
        self.store.create_task(&task)?;
        info!(
            "event=task_create module=task status=ok actor_id={} member_id={} task_id={}",
            actor.id, member.id, task.id
        );
        Ok(task)
    }

    pub fn get_task(&self, id: TaskId) -> ServiceResult<Task> {
        self.store
            .get_task(id)?
            .ok_or(ServiceError::NotFound { entity: "task", id })
    }

    /// Lists tasks visible to `actor`.
    ///
    /// A member without `TASK_VERIFIER` is scoped to their own profile
    /// regardless of the requested `member_id`.
    pub fn list_tasks(
        &self,
        actor: &Actor,
        status: Option<TaskStatus>,
        member_id: Option<MemberId>,
    ) -> ServiceResult<Vec<Task>> {
        let resolver = PermissionResolver::new(&self.store);
        let can_see_all =
            actor.role != Role::Member || resolver.resolve(actor, Capability::TaskVerifier)?.is_allowed();

        let member_id = if can_see_all {
            member_id
        } else {
            let member = self
                .store
                .find_member_by_actor(actor.id)?
                .ok_or(ServiceError::NotFound {
                    entity: "member",
                    id: actor.id,
                })?;
            Some(member.id)
        };

        Ok(self.store.list_tasks(&TaskListQuery { member_id, status })?)
    }

    /// Approves or rejects a pending task and appends a `VERIFY_TASK` entry.
    pub fn verify_task(
        &self,
        actor: &Actor,
        task_id: TaskId,
        decision: VerifyDecision,
        now_ms: i64,
    ) -> ServiceResult<Task> {
        PermissionResolver::new(&self.store).check_permission(actor, Capability::TaskVerifier)?;

        let (task, old_status) = self.store.atomically(|| -> ServiceResult<(Task, TaskStatus)> {
            let mut task = self.get_task(task_id)?;
            let old_status = task.status;
            task.verify(decision, actor.id, now_ms)?;
            self.store.update_task_verification(&task)?;
            self.store.append_audit_entry(&AuditEntry::new(
                actor.id,
                AuditAction::VerifyTask,
                "tasks",
                task.id,
                json!({
                    "oldStatus": old_status.as_str(),
                    "newStatus": task.status.as_str(),
                    "action": decision.as_str(),
                }),
                now_ms,
            ))?;
            Ok((task, old_status))
        })?;
        info!(
            "event=task_verify module=task status=ok actor_id={} task_id={} decision={} old_status={}",
            actor.id,
            task.id,
            decision.as_str(),
            old_status.as_str()
        );
        Ok(task)
    }
}
