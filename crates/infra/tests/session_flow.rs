//! End-to-end session resolution against the in-memory directory.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use hrgate_auth::{
    Action, AuthorizationPolicy, CanonicalArea, EmployeeProfile, EmployeeRecord, ModuleGrant, ModuleKey,
    ModulePermissionRow, Placement, RoleName, RoleRecord, Scope, authorize,
};
use hrgate_core::{EmployeeId, Identity, IdentityId, RoleId};
use hrgate_events::{AuthEvent, EventBus, InMemoryEventBus};
use hrgate_infra::{InMemoryDirectory, InMemoryIdentityProvider, PolicyConfig};
use hrgate_session::{
    Directory, DirectoryError, SessionError, SessionManager, SessionNotice, SessionSnapshot, SessionStatus,
};

// ─────────────────────────────────────────────────────────────────────────────
// Fixtures
// ─────────────────────────────────────────────────────────────────────────────

struct Employee {
    email: &'static str,
    role: &'static str,
    position: &'static str,
    location: &'static str,
    business_unit: &'static str,
    web_access: bool,
}

impl Employee {
    fn new(email: &'static str, role: &'static str, position: &'static str) -> Self {
        Self {
            email,
            role,
            position,
            location: "Lima",
            business_unit: "Operaciones",
            web_access: true,
        }
    }

    fn at(mut self, location: &'static str, business_unit: &'static str) -> Self {
        self.location = location;
        self.business_unit = business_unit;
        self
    }

    fn without_web_access(mut self) -> Self {
        self.web_access = false;
        self
    }

    fn seed(&self, directory: &InMemoryDirectory, rows: &[(ModuleKey, ModuleGrant)]) -> Identity {
        let role_id = RoleId::new();
        let role = RoleName::from(self.role.to_string());
        directory.upsert_role(RoleRecord {
            id: role_id,
            name: role.clone(),
            web_access: self.web_access,
        });
        directory.upsert_profile(EmployeeProfile {
            id: EmployeeId::new(),
            full_name: format!("Employee {}", self.email),
            email: self.email.to_string(),
            position: self.position.to_string(),
            location: self.location.to_string(),
            business_unit: self.business_unit.to_string(),
            role_id: Some(role_id),
            is_active: true,
        });
        directory.set_permissions(
            &role,
            rows.iter()
                .map(|(module, grant)| ModulePermissionRow::new(role.clone(), module.clone(), *grant))
                .collect(),
        );
        Identity::new(IdentityId::new(), self.email)
    }
}

struct Harness {
    directory: Arc<InMemoryDirectory>,
    provider: Arc<InMemoryIdentityProvider>,
    manager: Arc<SessionManager>,
}

fn harness() -> Harness {
    let directory = Arc::new(InMemoryDirectory::default());
    let provider = Arc::new(InMemoryIdentityProvider::new());
    let manager = Arc::new(SessionManager::new(
        directory.clone(),
        provider.clone(),
        AuthorizationPolicy::default(),
    ));
    Harness {
        directory,
        provider,
        manager,
    }
}

/// Directory whose profile lookups block until released.
struct GatedDirectory {
    inner: Arc<InMemoryDirectory>,
    started: Notify,
    release: Notify,
}

impl GatedDirectory {
    fn new(inner: Arc<InMemoryDirectory>) -> Self {
        Self {
            inner,
            started: Notify::new(),
            release: Notify::new(),
        }
    }
}

#[async_trait]
impl Directory for GatedDirectory {
    async fn profile_by_email(&self, email: &str) -> Result<Option<EmployeeProfile>, DirectoryError> {
        self.started.notify_one();
        self.release.notified().await;
        self.inner.profile_by_email(email).await
    }

    async fn role_by_id(&self, id: RoleId) -> Result<Option<RoleRecord>, DirectoryError> {
        self.inner.role_by_id(id).await
    }

    async fn permissions_for_role(&self, role: &RoleName) -> Result<Vec<ModulePermissionRow>, DirectoryError> {
        self.inner.permissions_for_role(role).await
    }
}

fn gated_harness() -> (Arc<GatedDirectory>, Arc<InMemoryDirectory>, Arc<SessionManager>) {
    let store = Arc::new(InMemoryDirectory::default());
    let gated = Arc::new(GatedDirectory::new(store.clone()));
    let manager = Arc::new(SessionManager::new(
        gated.clone(),
        Arc::new(InMemoryIdentityProvider::new()),
        AuthorizationPolicy::default(),
    ));
    (gated, store, manager)
}

async fn wait_for(manager: &SessionManager, done: impl Fn(&SessionSnapshot) -> bool) -> Arc<SessionSnapshot> {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let snapshot = manager.snapshot();
            if done(&snapshot) {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("session did not reach the expected state")
}

fn placement(position: &str, location: &str, business_unit: &str) -> Placement {
    Placement {
        position: position.to_string(),
        location: location.to_string(),
        business_unit: business_unit.to_string(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization outcomes
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn admin_role_is_allowed_everything() {
    let h = harness();
    let who = Employee::new("root@example.com", "Super Admin", "Administrador").seed(&h.directory, &[]);

    h.manager.handle_event(AuthEvent::signed_in(who)).await.unwrap();

    let ctx = h.manager.context().unwrap();
    assert!(ctx.is_global_admin());
    assert_eq!(ctx.scope(), &Scope::Global);
    for module in ModuleKey::ALL.iter().chain([&ModuleKey::from("payroll")]) {
        for action in Action::ALL {
            assert_eq!(authorize(&ctx, module, action), Ok(()), "{module} {action:?}");
        }
    }
    assert_eq!(h.directory.calls().permissions, 0);
}

#[tokio::test]
async fn supervisor_sees_only_their_area_across_locations() {
    let h = harness();
    let who = Employee::new("jefe.ops@example.com", "Jefe", "Jefe de Operaciones")
        .seed(&h.directory, &[(ModuleKey::EMPLOYEES, ModuleGrant::READ_WRITE)]);

    h.manager.handle_event(AuthEvent::signed_in(who)).await.unwrap();

    let ctx = h.manager.context().unwrap();
    assert_eq!(
        ctx.scope(),
        &Scope::AreaRestricted {
            area: CanonicalArea::Operaciones
        }
    );
    assert!(h.manager.authorize(&ModuleKey::EMPLOYEES, Action::Write).is_ok());
    assert!(h.manager.authorize(&ModuleKey::EMPLOYEES, Action::Delete).is_err());
    assert!(h.manager.authorize(&ModuleKey::VACATIONS, Action::Write).is_ok());

    let records: Vec<EmployeeRecord> = [
        placement("Operario de Operaciones", "Lima", "Operaciones"),
        placement("Vendedor Comercial", "Lima", "Comercial"),
        placement("Asistente de Operaciones", "Trujillo", "Operaciones"),
        placement("Ejecutivo Comercial", "Piura", "Comercial"),
        placement("Analista Comercial", "Cusco", "Comercial"),
    ]
    .into_iter()
    .map(|placement| EmployeeRecord {
        id: EmployeeId::new(),
        full_name: String::new(),
        placement,
        is_active: true,
    })
    .collect();

    let visible = h.manager.visible(&records);
    assert_eq!(visible.len(), 2);
    assert!(visible.iter().all(|r| r.placement.position.contains("Operaciones")));
}

#[tokio::test]
async fn hr_supervisor_is_scoped_to_own_location() {
    let h = harness();
    let who = Employee::new("analista.gente@example.com", "Analista", "Analista de Gente y Gestión")
        .at("Arequipa", "Operaciones")
        .seed(&h.directory, &[(ModuleKey::EMPLOYEES, ModuleGrant::READ_WRITE)]);

    h.manager.handle_event(AuthEvent::signed_in(who)).await.unwrap();

    let ctx = h.manager.context().unwrap();
    assert!(!ctx.is_global_admin());
    assert!(matches!(ctx.scope(), Scope::LocationRestricted { location: Some(l), .. } if l == "AREQUIPA"));
}

#[tokio::test]
async fn people_analyst_at_central_admin_gets_global_scope() {
    let h = harness();
    let who = Employee::new("ana.gente@example.com", "Analista de Gente y Gestión", "Analista")
        .at("Adm. Central", "Administración")
        .seed(&h.directory, &[]);

    h.manager.handle_event(AuthEvent::signed_in(who)).await.unwrap();

    let ctx = h.manager.context().unwrap();
    assert!(ctx.is_global_admin());
    assert_eq!(ctx.override_rule(), Some("people-analyst-central-admin"));
}

#[tokio::test]
async fn configured_admin_roles_are_honored() {
    let directory = Arc::new(InMemoryDirectory::default());
    let policy = PolicyConfig::from_json(r#"{ "admin_roles": ["Gerente General"] }"#)
        .unwrap()
        .into_policy();
    let manager = SessionManager::new(directory.clone(), Arc::new(InMemoryIdentityProvider::new()), policy);
    let who = Employee::new("gg@example.com", "Gerente General", "Gerente").seed(&directory, &[]);

    manager.handle_event(AuthEvent::signed_in(who)).await.unwrap();
    assert!(manager.context().unwrap().is_global_admin());
}

// ─────────────────────────────────────────────────────────────────────────────
// Event handling and fetch discipline
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn token_refresh_after_resolution_fetches_nothing() {
    let h = harness();
    let who = Employee::new("maria@example.com", "Empleado", "Asistente")
        .seed(&h.directory, &[(ModuleKey::DASHBOARD, ModuleGrant::FULL)]);

    h.manager.handle_event(AuthEvent::signed_in(who.clone())).await.unwrap();
    let before = h.directory.calls();
    let context = h.manager.context();

    h.manager.handle_event(AuthEvent::token_refreshed(Some(who))).await.unwrap();
    h.manager.handle_event(AuthEvent::token_refreshed(None)).await.unwrap();

    assert_eq!(h.directory.calls(), before);
    assert_eq!(h.manager.context(), context);
}

#[tokio::test]
async fn token_refresh_after_unknown_profile_fetches_again() {
    let h = harness();
    let who = Identity::new(IdentityId::new(), "late.hire@example.com");

    let snapshot = h.manager.handle_event(AuthEvent::signed_in(who.clone())).await.unwrap();
    assert_eq!(snapshot.notice, Some(SessionNotice::ProfileNotFound));
    assert_eq!(h.directory.calls().profiles, 1);

    Employee::new("late.hire@example.com", "Empleado", "Asistente")
        .seed(&h.directory, &[(ModuleKey::DASHBOARD, ModuleGrant::FULL)]);
    let snapshot = h.manager.handle_event(AuthEvent::token_refreshed(Some(who))).await.unwrap();

    assert_eq!(h.directory.calls().profiles, 2);
    assert_eq!(snapshot.status, SessionStatus::Authorized);
}

#[tokio::test]
async fn token_refresh_after_directory_failure_fetches_again() {
    let h = harness();
    let who = Employee::new("maria@example.com", "Empleado", "Asistente")
        .seed(&h.directory, &[(ModuleKey::DASHBOARD, ModuleGrant::FULL)]);
    h.directory.set_unavailable(true);

    h.manager.handle_event(AuthEvent::signed_in(who)).await.unwrap_err();
    assert_eq!(h.manager.snapshot().status, SessionStatus::FallbackIdentity);
    assert_eq!(h.directory.calls().profiles, 1);

    h.directory.set_unavailable(false);
    let snapshot = h.manager.handle_event(AuthEvent::token_refreshed(None)).await.unwrap();

    assert_eq!(h.directory.calls().profiles, 2);
    assert_eq!(snapshot.status, SessionStatus::Authorized);
    assert!(h.manager.authorize(&ModuleKey::DASHBOARD, Action::Read).is_ok());
}

#[tokio::test]
async fn refresh_twice_yields_identical_context() {
    let h = harness();
    let who = Employee::new("maria@example.com", "Empleado", "Asistente")
        .seed(&h.directory, &[(ModuleKey::REQUESTS, ModuleGrant::READ_WRITE)]);
    h.manager.handle_event(AuthEvent::signed_in(who)).await.unwrap();

    let first = h.manager.refresh().await.unwrap();
    let second = h.manager.refresh().await.unwrap();

    assert_eq!(first.context, second.context);
    assert!(second.generation > first.generation);
    assert_eq!(h.directory.calls().profiles, 3);
}

#[tokio::test]
async fn sign_out_while_fetching_discards_the_late_result() {
    let (gate, store, manager) = gated_harness();
    let who = Employee::new("root@example.com", "Admin", "Administrador").seed(&store, &[]);

    let pending = manager.accept(AuthEvent::signed_in(who)).unwrap();
    let task = tokio::spawn({
        let manager = manager.clone();
        async move { manager.complete(pending).await }
    });

    gate.started.notified().await;
    assert!(manager.accept(AuthEvent::signed_out()).is_none());
    gate.release.notify_one();

    let result = task.await.unwrap();
    assert!(matches!(result, Err(SessionError::Stale { .. })));

    let snapshot = manager.snapshot();
    assert_eq!(snapshot.status, SessionStatus::Unauthenticated);
    assert!(snapshot.context.is_none());
    assert!(manager.authorize(&ModuleKey::DASHBOARD, Action::Read).is_err());
}

#[tokio::test]
async fn event_stream_applies_sign_out_while_fetch_is_pending() {
    let (gate, store, manager) = gated_harness();
    let who = Employee::new("root@example.com", "Admin", "Administrador").seed(&store, &[]);
    let bus = InMemoryEventBus::new();
    let runner = tokio::spawn(manager.clone().run(bus.subscribe()));

    bus.publish(AuthEvent::signed_in(who)).unwrap();
    gate.started.notified().await;
    bus.publish(AuthEvent::signed_out()).unwrap();

    wait_for(&manager, |s| s.status == SessionStatus::Unauthenticated && s.generation >= 2).await;
    gate.release.notify_one();

    // Give the released fetch a chance to (wrongly) publish.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(manager.snapshot().status, SessionStatus::Unauthenticated);
    assert!(manager.context().is_none());

    drop(bus);
    runner.await.unwrap();
}

#[tokio::test]
async fn duplicate_triggers_share_one_fetch() {
    let (gate, store, manager) = gated_harness();
    let who = Employee::new("maria@example.com", "Empleado", "Asistente").seed(&store, &[]);

    let pending = manager.accept(AuthEvent::signed_in(who.clone())).unwrap();
    let task = tokio::spawn({
        let manager = manager.clone();
        async move { manager.complete(pending).await }
    });
    gate.started.notified().await;

    assert!(manager.accept(AuthEvent::signed_in(who.clone())).is_none());
    assert!(manager.accept(AuthEvent::token_refreshed(Some(who))).is_none());
    let joined = manager.refresh().await.unwrap();
    assert_eq!(joined.status, SessionStatus::Resolving);

    gate.release.notify_one();
    let snapshot = task.await.unwrap().unwrap();
    assert_eq!(snapshot.status, SessionStatus::Authorized);
    assert_eq!(store.calls().profiles, 1);
}

#[tokio::test]
async fn abandoned_resolution_does_not_block_refresh() {
    let (gate, store, manager) = gated_harness();
    let who = Employee::new("maria@example.com", "Empleado", "Asistente")
        .seed(&store, &[(ModuleKey::DASHBOARD, ModuleGrant::FULL)]);

    let abandoned = tokio::time::timeout(
        Duration::from_millis(20),
        manager.handle_event(AuthEvent::signed_in(who.clone())),
    )
    .await;
    assert!(abandoned.is_err());
    assert_eq!(manager.snapshot().status, SessionStatus::Resolving);
    assert_eq!(store.calls().profiles, 0);

    gate.release.notify_one();
    let snapshot = manager.refresh().await.unwrap();

    assert_eq!(snapshot.status, SessionStatus::Authorized);
    assert_eq!(snapshot.identity.as_ref(), Some(&who));
    assert_eq!(store.calls().profiles, 1);
    assert!(manager.authorize(&ModuleKey::DASHBOARD, Action::Read).is_ok());
}

#[tokio::test]
async fn switching_identity_supersedes_the_previous_resolution() {
    let (gate, store, manager) = gated_harness();
    let first = Employee::new("first@example.com", "Empleado", "Asistente").seed(&store, &[]);
    let second = Employee::new("second@example.com", "Empleado", "Asistente").seed(&store, &[]);

    let stale = manager.accept(AuthEvent::signed_in(first)).unwrap();
    let current = manager.accept(AuthEvent::signed_in(second.clone())).unwrap();
    assert!(current.generation() > stale.generation());

    gate.release.notify_one();
    assert!(matches!(manager.complete(stale).await, Err(SessionError::Stale { .. })));
    gate.release.notify_one();
    let snapshot = manager.complete(current).await.unwrap();
    assert_eq!(snapshot.identity.as_ref(), Some(&second));
}

// ─────────────────────────────────────────────────────────────────────────────
// Denials and failures
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn role_without_web_access_is_signed_out() {
    let h = harness();
    let who = Employee::new("operario@example.com", "Operario", "Operario de Almacén")
        .without_web_access()
        .seed(&h.directory, &[(ModuleKey::WILDCARD, ModuleGrant::FULL)]);

    let err = h.manager.handle_event(AuthEvent::signed_in(who)).await.unwrap_err();

    assert_eq!(err, SessionError::WebAccessDenied { role: "OPERARIO".to_string() });
    let snapshot = h.manager.snapshot();
    assert_eq!(snapshot.status, SessionStatus::Unauthenticated);
    assert!(snapshot.context.is_none());
    assert_eq!(
        snapshot.notice,
        Some(SessionNotice::WebAccessDenied { role: "OPERARIO".to_string() })
    );
    assert_eq!(h.provider.sign_outs(), 1);
    assert_eq!(h.directory.calls().permissions, 0);
}

#[tokio::test]
async fn directory_failure_never_elevates() {
    let h = harness();
    let who = Employee::new("root@example.com", "Admin", "Administrador").seed(&h.directory, &[]);
    h.directory.set_unavailable(true);

    let err = h.manager.handle_event(AuthEvent::signed_in(who)).await.unwrap_err();
    assert!(matches!(err, SessionError::Directory(DirectoryError::Unavailable(_))));

    let snapshot = h.manager.snapshot();
    assert_eq!(snapshot.status, SessionStatus::FallbackIdentity);
    assert!(matches!(snapshot.notice, Some(SessionNotice::DirectoryUnavailable { .. })));

    let ctx = snapshot.context().unwrap();
    assert!(!ctx.is_global_admin());
    assert!(ModuleKey::ALL.iter().all(|m| !ctx.allows(m, Action::Read)));
    assert!(h.manager.visible(&[placement("Jefe", "Lima", "Operaciones")]).is_empty());

    // Recovers on the next refresh once the directory is back.
    h.directory.set_unavailable(false);
    let snapshot = h.manager.refresh().await.unwrap();
    assert!(snapshot.context().unwrap().is_global_admin());
}

#[tokio::test]
async fn unknown_employee_gets_fallback_identity() {
    let h = harness();
    let who = Identity::new(IdentityId::new(), "ghost.user@example.com");

    let snapshot = h.manager.handle_event(AuthEvent::signed_in(who)).await.unwrap();

    assert_eq!(snapshot.status, SessionStatus::FallbackIdentity);
    assert_eq!(snapshot.notice, Some(SessionNotice::ProfileNotFound));
    let ctx = snapshot.context().unwrap();
    assert_eq!(ctx.display_name(), "Ghost User");
    assert!(!ctx.is_authoritative());
    assert!(h.manager.authorize(&ModuleKey::DASHBOARD, Action::Read).is_err());
}

#[tokio::test]
async fn user_deletion_ends_the_session() {
    let h = harness();
    let who = Employee::new("maria@example.com", "Empleado", "Asistente")
        .seed(&h.directory, &[(ModuleKey::DASHBOARD, ModuleGrant::FULL)]);
    h.manager.handle_event(AuthEvent::signed_in(who)).await.unwrap();

    h.manager.handle_event(AuthEvent::user_deleted()).await.unwrap();

    assert_eq!(h.manager.snapshot().status, SessionStatus::Unauthenticated);
    assert_eq!(h.manager.refresh().await.unwrap_err(), SessionError::NotSignedIn);
}
