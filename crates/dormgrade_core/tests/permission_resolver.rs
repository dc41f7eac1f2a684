use dormgrade_core::model::audit::AuditAction;
use dormgrade_core::repo::actor_repo::ActorRepository;
use dormgrade_core::repo::audit_repo::{AuditListQuery, AuditRepository};
use dormgrade_core::repo::grant_repo::GrantRepository;
use dormgrade_core::repo::RepoResult;
use dormgrade_core::{
    open_db_in_memory, Access, Actor, ActorId, Capability, GrantRecord, PermissionResolver, Role,
    ServiceError, SqliteStore,
};
use rusqlite::Connection;
use std::cell::Cell;

const NOW: i64 = 1_717_200_000_000;

fn actor(store: SqliteStore<'_>, username: &str, role: Role) -> Actor {
    let actor = Actor::new(username, role).unwrap();
    store.create_actor(&actor).unwrap();
    actor
}

fn setup(conn: &Connection) -> (SqliteStore<'_>, Actor, Actor) {
    let store = SqliteStore::try_new(conn).unwrap();
    let admin = actor(store, "warden", Role::Administrator);
    let member = actor(store, "santri01", Role::Member);
    (store, admin, member)
}

#[test]
fn administrator_is_allowed_for_every_capability_without_grants() {
    let conn = open_db_in_memory().unwrap();
    let (store, admin, _) = setup(&conn);
    let resolver = PermissionResolver::new(store);

    for capability in Capability::ALL {
        assert_eq!(resolver.resolve(&admin, capability).unwrap(), Access::Allowed);
        resolver.check_permission(&admin, capability).unwrap();
    }
    assert!(resolver.list_capabilities(admin.id).unwrap().is_empty());
}

/// Counts grant lookups to prove the administrator path never touches storage.
struct CountingGrants {
    lookups: Cell<usize>,
}

impl GrantRepository for CountingGrants {
    fn find_granted_capability(
        &self,
        _actor_id: ActorId,
        _capability: Capability,
    ) -> RepoResult<Option<GrantRecord>> {
        self.lookups.set(self.lookups.get() + 1);
        Ok(None)
    }

    fn insert_grant(&self, _grant: &GrantRecord) -> RepoResult<()> {
        Ok(())
    }

    fn delete_grant(
        &self,
        _actor_id: ActorId,
        _capability: Capability,
    ) -> RepoResult<Option<GrantRecord>> {
        Ok(None)
    }

    fn list_grants(&self, _actor_id: ActorId) -> RepoResult<Vec<GrantRecord>> {
        Ok(Vec::new())
    }
}

#[test]
fn administrator_bypass_performs_no_lookup() {
    let grants = CountingGrants {
        lookups: Cell::new(0),
    };
    let resolver = PermissionResolver::new(&grants);
    let admin = Actor::new("warden", Role::Administrator).unwrap();
    let member = Actor::new("santri01", Role::Member).unwrap();

    assert!(resolver
        .resolve(&admin, Capability::TaskVerifier)
        .unwrap()
        .is_allowed());
    assert_eq!(grants.lookups.get(), 0);

    assert_eq!(
        resolver.resolve(&member, Capability::TaskVerifier).unwrap(),
        Access::Denied
    );
    assert_eq!(grants.lookups.get(), 1);
}

#[test]
fn grant_then_revoke_flips_resolution() {
    let conn = open_db_in_memory().unwrap();
    let (store, admin, member) = setup(&conn);
    let resolver = PermissionResolver::new(store);

    assert_eq!(
        resolver
            .resolve(&member, Capability::TaskVerifier)
            .unwrap(),
        Access::Denied
    );

    let grant = resolver
        .grant_capability(&admin, member.id, Capability::TaskVerifier, NOW)
        .unwrap();
    assert_eq!(grant.granted_by, admin.id);
    assert_eq!(
        resolver
            .resolve(&member, Capability::TaskVerifier)
            .unwrap(),
        Access::Allowed
    );
    // Grants are per capability.
    assert_eq!(
        resolver
            .resolve(&member, Capability::DisciplineOfficer)
            .unwrap(),
        Access::Denied
    );

    resolver
        .revoke_capability(&admin, member.id, Capability::TaskVerifier, NOW + 1)
        .unwrap();
    assert_eq!(
        resolver
            .resolve(&member, Capability::TaskVerifier)
            .unwrap(),
        Access::Denied
    );
}

#[test]
fn grant_and_revoke_append_audit_entries() {
    let conn = open_db_in_memory().unwrap();
    let (store, admin, member) = setup(&conn);
    let resolver = PermissionResolver::new(store);

    resolver
        .grant_capability(&admin, member.id, Capability::DisciplineOfficer, NOW)
        .unwrap();
    resolver
        .revoke_capability(&admin, member.id, Capability::DisciplineOfficer, NOW + 5)
        .unwrap();

    let entries = store
        .list_audit_entries(&AuditListQuery {
            target_table: Some("permissions".to_string()),
            target_id: None,
        })
        .unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].action, AuditAction::GrantPermission);
    assert_eq!(entries[1].action, AuditAction::RevokePermission);
    assert_eq!(entries[0].actor_id, admin.id);
    assert_eq!(entries[0].details["permissionKey"], "DISCIPLINE_OFFICER");
    assert_eq!(entries[0].details["targetUserId"], member.id.to_string());
}

#[test]
fn granting_twice_is_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let (store, admin, member) = setup(&conn);
    let resolver = PermissionResolver::new(store);

    let first = resolver
        .grant_capability(&admin, member.id, Capability::TaskVerifier, NOW)
        .unwrap();
    let second = resolver
        .grant_capability(&admin, member.id, Capability::TaskVerifier, NOW + 10)
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(resolver.list_capabilities(member.id).unwrap().len(), 1);
    assert_eq!(
        store
            .list_audit_entries(&AuditListQuery::default())
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn only_administrators_may_grant_or_revoke() {
    let conn = open_db_in_memory().unwrap();
    let (store, admin, member) = setup(&conn);
    let resolver = PermissionResolver::new(store);
    let external = actor(store, "auditor", Role::External);

    resolver
        .grant_capability(&admin, member.id, Capability::TaskVerifier, NOW)
        .unwrap();

    // Holding a capability does not confer the right to delegate it.
    let err = resolver
        .grant_capability(&member, external.id, Capability::TaskVerifier, NOW)
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden));
    let err = resolver
        .revoke_capability(&external, member.id, Capability::TaskVerifier, NOW)
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden));
    assert!(resolver
        .resolve(&member, Capability::TaskVerifier)
        .unwrap()
        .is_allowed());
}

#[test]
fn grant_to_unknown_actor_and_revoke_missing_grant_are_not_found() {
    let conn = open_db_in_memory().unwrap();
    let (store, admin, member) = setup(&conn);
    let resolver = PermissionResolver::new(store);

    let ghost = Actor::new("ghost01", Role::Member).unwrap();
    assert!(matches!(
        resolver.grant_capability(&admin, ghost.id, Capability::TaskVerifier, NOW),
        Err(ServiceError::NotFound { entity: "actor", .. })
    ));
    assert!(matches!(
        resolver.revoke_capability(&admin, member.id, Capability::TaskVerifier, NOW),
        Err(ServiceError::NotFound { entity: "grant", .. })
    ));
}

#[test]
fn denial_is_forbidden_without_detail() {
    let conn = open_db_in_memory().unwrap();
    let (store, admin, member) = setup(&conn);
    let resolver = PermissionResolver::new(store);

    let err = resolver
        .check_permission(&member, Capability::DisciplineOfficer)
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden));
    assert_eq!(err.to_string(), "forbidden");

    // Unknown keys look exactly like ungranted ones.
    let unknown = resolver
        .check_permission_key(&member, "SUPER_ADMIN")
        .unwrap_err();
    assert_eq!(unknown.to_string(), "forbidden");
    assert!(resolver
        .check_permission_key(&member, "task_verifier")
        .is_err());

    resolver
        .grant_capability(&admin, member.id, Capability::TaskVerifier, NOW)
        .unwrap();
    resolver
        .check_permission_key(&member, "TASK_VERIFIER")
        .unwrap();
    resolver.check_permission_key(&admin, "ANYTHING").unwrap();
}

fn fail_audit_writes(conn: &Connection) {
    conn.execute_batch(
        "CREATE TRIGGER audit_logs_full
         BEFORE INSERT ON audit_logs
         BEGIN
             SELECT RAISE(ABORT, 'disk full');
         END;",
    )
    .unwrap();
}

fn restore_audit_writes(conn: &Connection) {
    conn.execute_batch("DROP TRIGGER audit_logs_full;").unwrap();
}

#[test]
fn grant_is_rolled_back_when_audit_entry_cannot_be_written() {
    let conn = open_db_in_memory().unwrap();
    let (store, admin, member) = setup(&conn);
    let resolver = PermissionResolver::new(store);

    fail_audit_writes(&conn);
    let err = resolver
        .grant_capability(&admin, member.id, Capability::TaskVerifier, NOW)
        .unwrap_err();
    assert!(matches!(err, ServiceError::Storage(_)));
    assert!(err.to_string().contains("disk full"));
    assert_eq!(
        resolver.resolve(&member, Capability::TaskVerifier).unwrap(),
        Access::Denied
    );
    assert!(resolver.list_capabilities(member.id).unwrap().is_empty());

    restore_audit_writes(&conn);
    resolver
        .grant_capability(&admin, member.id, Capability::TaskVerifier, NOW + 1)
        .unwrap();
    let entries = store.list_audit_entries(&AuditListQuery::default()).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, AuditAction::GrantPermission);
}

#[test]
fn revoke_is_rolled_back_when_audit_entry_cannot_be_written() {
    let conn = open_db_in_memory().unwrap();
    let (store, admin, member) = setup(&conn);
    let resolver = PermissionResolver::new(store);
    resolver
        .grant_capability(&admin, member.id, Capability::DisciplineOfficer, NOW)
        .unwrap();

    fail_audit_writes(&conn);
    let err = resolver
        .revoke_capability(&admin, member.id, Capability::DisciplineOfficer, NOW + 1)
        .unwrap_err();
    assert!(matches!(err, ServiceError::Storage(_)));
    assert!(resolver
        .resolve(&member, Capability::DisciplineOfficer)
        .unwrap()
        .is_allowed());

    restore_audit_writes(&conn);
    resolver
        .revoke_capability(&admin, member.id, Capability::DisciplineOfficer, NOW + 2)
        .unwrap();
    let entries = store.list_audit_entries(&AuditListQuery::default()).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].action, AuditAction::RevokePermission);
}
