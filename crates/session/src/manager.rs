//! Session state machine.
//!
//! ```text
//! Unauthenticated ──SIGNED_IN──▶ Resolving ──▶ Authorized
//!                                    │    └──▶ FallbackIdentity (restrictive)
//!                                    └──────▶ Unauthenticated (web access denied)
//! any ──SIGNED_OUT / USER_DELETED──▶ Unauthenticated
//! ```
//!
//! Events are accepted synchronously, in arrival order. Each accepted
//! resolution is tagged with the generation current at that moment; its
//! result is published only if that generation is still the latest. There is
//! no way to abort a directory call, so a superseded resolution simply has its
//! result dropped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;

use hrgate_auth::{
    AccessDenied, Action, AuthorizationContext, AuthorizationPolicy, ContextSource, EmployeeProfile,
    ModuleKey, PermissionMatrix, RecordFilter, ScopedRecord, authorize,
};
use hrgate_core::Identity;
use hrgate_events::{AuthEvent, AuthEventKind, Subscription};

use crate::{Directory, DirectoryError, IdentityProvider, SessionError, SessionNotice, SessionSnapshot, SessionStatus};

/// A resolution accepted by [`SessionManager::accept`] and not yet completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingResolution {
    generation: u64,
    identity: Identity,
}

impl PendingResolution {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }
}

#[derive(Debug)]
struct SessionState {
    generation: u64,
    /// Generation of the resolution currently fetching for the snapshot's identity.
    in_flight: Option<u64>,
    snapshot: Arc<SessionSnapshot>,
}

enum Outcome {
    Authorized {
        profile: EmployeeProfile,
        context: AuthorizationContext,
    },
    ProfileNotFound,
    ProfileInactive {
        profile: EmployeeProfile,
    },
    DirectoryFailure(DirectoryError),
    WebAccessDenied {
        role: String,
    },
}

/// Owns the single current session and publishes immutable snapshots of it.
pub struct SessionManager {
    directory: Arc<dyn Directory>,
    provider: Arc<dyn IdentityProvider>,
    policy: Arc<AuthorizationPolicy>,
    filter: RecordFilter,
    state: Mutex<SessionState>,
}

impl SessionManager {
    pub fn new(
        directory: Arc<dyn Directory>,
        provider: Arc<dyn IdentityProvider>,
        policy: AuthorizationPolicy,
    ) -> Self {
        let filter = policy.record_filter();
        Self {
            directory,
            provider,
            policy: Arc::new(policy),
            filter,
            state: Mutex::new(SessionState {
                generation: 0,
                in_flight: None,
                snapshot: Arc::new(SessionSnapshot::unauthenticated(0, None)),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<SessionSnapshot> {
        Arc::clone(&self.lock().snapshot)
    }

    /// Current context, if any has been published.
    pub fn context(&self) -> Option<Arc<AuthorizationContext>> {
        self.lock().snapshot.context.clone()
    }

    pub fn policy(&self) -> &AuthorizationPolicy {
        &self.policy
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Event intake
    // ─────────────────────────────────────────────────────────────────────────

    /// Accept an event in arrival order.
    ///
    /// Sign-out and deletion take effect immediately. Returns the resolution
    /// to run, if the event needs one and no fetch for the same identity is
    /// already in flight.
    pub fn accept(&self, event: AuthEvent) -> Option<PendingResolution> {
        let mut state = self.lock();

        match event.kind {
            AuthEventKind::SignedOut | AuthEventKind::UserDeleted => {
                Self::clear(&mut state, None);
                tracing::info!(kind = ?event.kind, generation = state.generation, "session cleared");
                None
            }
            AuthEventKind::SignedIn => {
                let Some(identity) = event.identity else {
                    tracing::warn!("sign-in event without identity; ignoring");
                    return None;
                };
                Self::begin(&mut state, identity)
            }
            AuthEventKind::TokenRefreshed => {
                let Some(identity) = event.identity.or_else(|| state.snapshot.identity.clone()) else {
                    tracing::debug!("token refreshed without identity; ignoring");
                    return None;
                };
                let current = state.snapshot.identity.as_ref() == Some(&identity);
                if current && state.snapshot.profile.is_some() {
                    tracing::debug!(email = identity.email(), "token refreshed; context already current");
                    return None;
                }
                Self::begin(&mut state, identity)
            }
        }
    }

    fn clear(state: &mut SessionState, notice: Option<SessionNotice>) {
        state.generation += 1;
        state.in_flight = None;
        state.snapshot = Arc::new(SessionSnapshot::unauthenticated(state.generation, notice));
    }

    fn begin(state: &mut SessionState, identity: Identity) -> Option<PendingResolution> {
        let same_identity = state.snapshot.identity.as_ref() == Some(&identity);
        if same_identity && state.in_flight.is_some() {
            tracing::debug!(email = identity.email(), "resolution already in flight; not fetching again");
            return None;
        }

        state.generation += 1;
        let generation = state.generation;
        state.in_flight = Some(generation);
        state.snapshot = Arc::new(state.snapshot.resolving(generation, identity.clone()));
        tracing::info!(email = identity.email(), generation, "resolving session");

        Some(PendingResolution { generation, identity })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Resolution
    // ─────────────────────────────────────────────────────────────────────────

    /// Accept an event and run the resolution it triggers to completion.
    pub async fn handle_event(&self, event: AuthEvent) -> Result<Arc<SessionSnapshot>, SessionError> {
        match self.accept(event) {
            Some(pending) => self.complete(pending).await,
            None => Ok(self.snapshot()),
        }
    }

    /// Force re-resolution of the current identity.
    ///
    /// Joins a fetch already in flight for it instead of issuing another.
    pub async fn refresh(&self) -> Result<Arc<SessionSnapshot>, SessionError> {
        let pending = {
            let mut state = self.lock();
            let Some(identity) = state.snapshot.identity.clone() else {
                return Err(SessionError::NotSignedIn);
            };
            Self::begin(&mut state, identity)
        };

        match pending {
            Some(pending) => self.complete(pending).await,
            None => Ok(self.snapshot()),
        }
    }

    /// Run an accepted resolution and publish its result if still current.
    ///
    /// Dropping the returned future before it finishes, even unpolled,
    /// releases the in-flight marker so the next trigger fetches again.
    pub fn complete(
        &self,
        pending: PendingResolution,
    ) -> impl Future<Output = Result<Arc<SessionSnapshot>, SessionError>> + '_ {
        let guard = InFlightGuard {
            manager: self,
            generation: pending.generation,
        };
        async move {
            let _guard = guard;
            let outcome = self.resolve(&pending).await?;
            self.publish(pending, outcome).await
        }
    }

    fn ensure_current(&self, generation: u64) -> Result<(), SessionError> {
        if self.lock().generation == generation {
            Ok(())
        } else {
            tracing::debug!(generation, "dropping superseded resolution");
            Err(SessionError::Stale { generation })
        }
    }

    async fn resolve(&self, pending: &PendingResolution) -> Result<Outcome, SessionError> {
        let generation = pending.generation;

        let fetched = self.directory.profile_by_email(pending.identity.email()).await;
        self.ensure_current(generation)?;
        let profile = match fetched {
            Ok(Some(profile)) => profile,
            Ok(None) => return Ok(Outcome::ProfileNotFound),
            Err(error) => return Ok(Outcome::DirectoryFailure(error)),
        };

        let role = match profile.role_id {
            Some(role_id) => {
                let fetched = self.directory.role_by_id(role_id).await;
                self.ensure_current(generation)?;
                match fetched {
                    Ok(role) => role,
                    Err(error) => return Ok(Outcome::DirectoryFailure(error)),
                }
            }
            None => None,
        };

        if let Some(role) = role.as_ref().filter(|r| !r.web_access) {
            return Ok(Outcome::WebAccessDenied {
                role: role.name.to_string(),
            });
        }
        if !profile.is_active {
            return Ok(Outcome::ProfileInactive { profile });
        }

        let role_name = role.map(|r| r.name).filter(|name| !name.is_empty());
        let display_name = display_name(&profile, &pending.identity);

        if let Some(hit) = self.policy.exception_override(&profile, role_name.as_ref()) {
            let context = AuthorizationContext::global_admin(role_name, display_name, hit.rule_id);
            return Ok(Outcome::Authorized { profile, context });
        }

        let rows = match &role_name {
            Some(name) => {
                let fetched = self.directory.permissions_for_role(name).await;
                self.ensure_current(generation)?;
                match fetched {
                    Ok(rows) => rows,
                    Err(error) => return Ok(Outcome::DirectoryFailure(error)),
                }
            }
            None => Vec::new(),
        };
        if rows.is_empty() {
            tracing::debug!(role = ?role_name, "no permission rows; falling back to defaults");
        }

        let matrix = PermissionMatrix::from_rows(rows);
        let context = AuthorizationContext::scoped(
            role_name.clone(),
            display_name,
            matrix.permissions_for(role_name.as_ref(), Some(&profile.position)),
            self.policy.scope_for(&profile, role_name.as_ref()),
        );
        Ok(Outcome::Authorized { profile, context })
    }

    async fn publish(&self, pending: PendingResolution, outcome: Outcome) -> Result<Arc<SessionSnapshot>, SessionError> {
        let PendingResolution { generation, identity } = pending;

        let result = {
            let mut state = self.lock();
            if state.generation != generation {
                tracing::debug!(generation, latest = state.generation, "dropping superseded resolution");
                return Err(SessionError::Stale { generation });
            }
            state.in_flight = None;

            let fallback = |notice: SessionNotice, profile: Option<EmployeeProfile>, source: ContextSource| {
                let context = AuthorizationContext::restricted(identity.email_display_name(), source);
                SessionSnapshot {
                    status: SessionStatus::FallbackIdentity,
                    generation,
                    identity: Some(identity.clone()),
                    profile,
                    context: Some(Arc::new(context)),
                    resolved_at: Some(Utc::now()),
                    notice: Some(notice),
                }
            };

            match outcome {
                Outcome::Authorized { profile, context } => {
                    tracing::info!(
                        email = identity.email(),
                        generation,
                        global_admin = context.is_global_admin(),
                        scope = ?context.scope(),
                        "session authorized"
                    );
                    state.snapshot = Arc::new(SessionSnapshot {
                        status: SessionStatus::Authorized,
                        generation,
                        identity: Some(identity.clone()),
                        profile: Some(profile),
                        context: Some(Arc::new(context)),
                        resolved_at: Some(Utc::now()),
                        notice: None,
                    });
                    Ok(Arc::clone(&state.snapshot))
                }
                Outcome::ProfileNotFound => {
                    tracing::warn!(email = identity.email(), "no employee profile for identity");
                    state.snapshot = Arc::new(fallback(SessionNotice::ProfileNotFound, None, ContextSource::Fallback));
                    Ok(Arc::clone(&state.snapshot))
                }
                Outcome::ProfileInactive { profile } => {
                    tracing::warn!(email = identity.email(), "employee profile is inactive");
                    state.snapshot = Arc::new(fallback(
                        SessionNotice::ProfileInactive,
                        Some(profile),
                        ContextSource::Directory,
                    ));
                    Ok(Arc::clone(&state.snapshot))
                }
                Outcome::DirectoryFailure(error) => {
                    tracing::warn!(email = identity.email(), %error, "directory lookup failed; restricting session");
                    let notice = SessionNotice::DirectoryUnavailable {
                        message: error.to_string(),
                    };
                    state.snapshot = Arc::new(fallback(notice, None, ContextSource::Fallback));
                    Err(SessionError::Directory(error))
                }
                Outcome::WebAccessDenied { role } => {
                    tracing::warn!(email = identity.email(), %role, "role has no web access; signing out");
                    Self::clear(&mut state, Some(SessionNotice::WebAccessDenied { role: role.clone() }));
                    Err(SessionError::WebAccessDenied { role })
                }
            }
        };

        if matches!(result, Err(SessionError::WebAccessDenied { .. })) {
            if let Err(error) = self.provider.sign_out().await {
                tracing::warn!(%error, "forced sign-out failed");
            }
        }

        result
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Gates bound to the current context
    // ─────────────────────────────────────────────────────────────────────────

    /// View-level gate for the current session.
    pub fn authorize(&self, module: &ModuleKey, action: Action) -> Result<(), AccessDenied> {
        match self.context() {
            Some(ctx) => authorize(&ctx, module, action),
            None => Err(AccessDenied::not_authenticated(module, action)),
        }
    }

    /// List-level gate for the current session. Nothing is visible without a
    /// context.
    pub fn visible<'a, R: ScopedRecord>(&self, records: &'a [R]) -> Vec<&'a R> {
        match self.context() {
            Some(ctx) => self.filter.filter(records, &ctx),
            None => Vec::new(),
        }
    }

    /// Drain an event subscription, accepting events in order and running
    /// resolutions in the background so later events are never held up.
    pub async fn run(self: Arc<Self>, mut events: Subscription<AuthEvent>) {
        while let Some(event) = events.recv().await {
            if let Some(pending) = self.accept(event) {
                let manager = Arc::clone(&self);
                tokio::spawn(async move {
                    if let Err(error) = manager.complete(pending).await {
                        tracing::debug!(%error, "background resolution ended without publishing an authorization");
                    }
                });
            }
        }
        tracing::debug!("auth event stream closed");
    }
}

/// Clears `in_flight` when a resolution ends without publishing.
struct InFlightGuard<'a> {
    manager: &'a SessionManager,
    generation: u64,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.manager.lock();
        if state.generation == self.generation && state.in_flight == Some(self.generation) {
            tracing::debug!(generation = self.generation, "resolution abandoned; releasing in-flight marker");
            state.in_flight = None;
        }
    }
}

fn display_name(profile: &EmployeeProfile, identity: &Identity) -> String {
    let name = profile.full_name.trim();
    if name.is_empty() {
        identity.email_display_name()
    } else {
        name.to_string()
    }
}

impl core::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &*self.lock())
            .finish_non_exhaustive()
    }
}
