//! Permission resolver and capability administration.
//!
//! # Responsibility
//! - Decide whether an actor may perform a privileged action.
//! - Let administrators grant and revoke capabilities, with audit entries.
//!
//! # Invariants
//! - Administrators are always allowed, without a storage lookup.
//! - Non-admins are allowed iff a matching grant row exists right now.
//! - A denial never says whether the capability key exists.
//! - Resolution is read-only and holds no state between calls.
//! - A grant or revocation commits together with its audit entry.

use crate::model::actor::{Actor, ActorId, GrantRecord};
use crate::model::audit::{AuditAction, AuditEntry};
use crate::model::capability::{parse_capability, Capability};
use crate::repo::actor_repo::ActorRepository;
use crate::repo::audit_repo::AuditRepository;
use crate::repo::grant_repo::GrantRepository;
use crate::repo::{RepoResult, Transactional};
use crate::service::{ServiceError, ServiceResult};
use log::{debug, info, warn};
use serde_json::json;
use uuid::Uuid;

/// Outcome of a permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allowed,
    Denied,
}

impl Access {
    pub fn is_allowed(self) -> bool {
        self == Self::Allowed
    }
}

/// Guard for administrator-only operations (e.g. granting capabilities).
///
/// This is a role check, not a capability check: no grant can make a
/// non-admin an administrator.
pub fn require_administrator(actor: &Actor) -> ServiceResult<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        warn!(
            "event=permission_check module=permission status=denied actor_id={} required=ADMIN",
            actor.id
        );
        Err(ServiceError::Forbidden)
    }
}

/// Resolves actor privileges against the grant store.
pub struct PermissionResolver<R> {
    grants: R,
}

impl<R: GrantRepository> PermissionResolver<R> {
    pub fn new(grants: R) -> Self {
        Self { grants }
    }

    /// Resolves `actor` against `capability`.
    pub fn resolve(&self, actor: &Actor, capability: Capability) -> RepoResult<Access> {
        if actor.is_admin() {
            return Ok(Access::Allowed);
        }
        let grant = self
            .grants
            .find_granted_capability(actor.id, capability)?;
        Ok(if grant.is_some() {
            Access::Allowed
        } else {
            Access::Denied
        })
    }

    /// Guard form of [`Self::resolve`]; denial becomes `Forbidden`.
    pub fn check_permission(&self, actor: &Actor, capability: Capability) -> ServiceResult<()> {
        match self.resolve(actor, capability)? {
            Access::Allowed => {
                debug!(
                    "event=permission_check module=permission status=allowed actor_id={} capability={}",
                    actor.id, capability
                );
                Ok(())
            }
            Access::Denied => {
                warn!(
                    "event=permission_check module=permission status=denied actor_id={} capability={}",
                    actor.id, capability
                );
                Err(ServiceError::Forbidden)
            }
        }
    }

    /// Checks a raw capability key from request input.
    ///
    /// Unknown keys are indistinguishable from ungranted ones.
    pub fn check_permission_key(&self, actor: &Actor, key: &str) -> ServiceResult<()> {
        if actor.is_admin() {
            return Ok(());
        }
        match parse_capability(key) {
            Ok(capability) => self.check_permission(actor, capability),
            Err(_) => {
                warn!(
                    "event=permission_check module=permission status=denied actor_id={} capability=unrecognized",
                    actor.id
                );
                Err(ServiceError::Forbidden)
            }
        }
    }

    /// Lists capabilities explicitly granted to `actor_id`.
    pub fn list_capabilities(&self, actor_id: ActorId) -> ServiceResult<Vec<GrantRecord>> {
        Ok(self.grants.list_grants(actor_id)?)
    }
}

impl<R> PermissionResolver<R>
where
    R: GrantRepository + ActorRepository + AuditRepository + Transactional,
{
    /// Grants `capability` to `target`. Administrator only.
    ///
    /// Granting an already-held capability returns the existing grant and
    /// writes no audit entry.
    pub fn grant_capability(
        &self,
        admin: &Actor,
        target: ActorId,
        capability: Capability,
        now_ms: i64,
    ) -> ServiceResult<GrantRecord> {
        require_administrator(admin)?;
        let outcome = self.grants.atomically(|| -> ServiceResult<(GrantRecord, bool)> {
            if self.grants.get_actor(target)?.is_none() {
                return Err(ServiceError::NotFound {
                    entity: "actor",
                    id: target,
                });
            }
            if let Some(existing) = self.grants.find_granted_capability(target, capability)? {
                return Ok((existing, false));
            }

            let grant = GrantRecord {
                id: Uuid::new_v4(),
                actor_id: target,
                capability,
                granted_by: admin.id,
                granted_at: now_ms,
            };
            self.grants.insert_grant(&grant)?;
            self.grants.append_audit_entry(&AuditEntry::new(
                admin.id,
                AuditAction::GrantPermission,
                "permissions",
                grant.id,
                json!({
                    "permissionKey": capability.as_str(),
                    "targetUserId": target.to_string(),
                }),
                now_ms,
            ))?;
            Ok((grant, true))
        })?;
        let (grant, created) = outcome;
        if !created {
            debug!(
                "event=grant_capability module=permission status=noop actor_id={} target_id={} capability={}",
                admin.id, target, capability
            );
            return Ok(grant);
        }
        info!(
            "event=grant_capability module=permission status=ok actor_id={} target_id={} capability={}",
            admin.id, target, capability
        );
        Ok(grant)
    }

    /// Revokes `capability` from `target`. Administrator only.
    pub fn revoke_capability(
        &self,
        admin: &Actor,
        target: ActorId,
        capability: Capability,
        now_ms: i64,
    ) -> ServiceResult<GrantRecord> {
        require_administrator(admin)?;
        let removed = self.grants.atomically(|| -> ServiceResult<GrantRecord> {
            let Some(removed) = self.grants.delete_grant(target, capability)? else {
                return Err(ServiceError::NotFound {
                    entity: "grant",
                    id: target,
                });
            };
            self.grants.append_audit_entry(&AuditEntry::new(
                admin.id,
                AuditAction::RevokePermission,
                "permissions",
                removed.id,
                json!({
                    "permissionKey": capability.as_str(),
                    "targetUserId": target.to_string(),
                    "grantedBy": removed.granted_by.to_string(),
                }),
                now_ms,
            ))?;
            Ok(removed)
        })?;
        info!(
            "event=revoke_capability module=permission status=ok actor_id={} target_id={} capability={}",
            admin.id, target, capability
        );
        Ok(removed)
    }
}
