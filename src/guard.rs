//! Route guards: one parametrized guard for every role portal.
//!
//! A guard starts in `Checking`, reads the client's session and settles on one terminal state:
//! - `Authorized`: the wrapped page runs with the request unchanged.
//! - `Redirecting(target)`: exactly one redirect; to the portal login when there is no session,
//!   to the principal's own dashboard on a role mismatch, to the portal dashboard when the
//!   required permission is missing.
//! - `Denied`: the redirect target would be the requested page itself, so a 403 is served instead.
//!
//! The login page of the guarded portal is never checked.

use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Router;
use tracing::{debug, info};

use crate::error::AppError;
use crate::identity::{has_permission, Permission, Principal, SessionStore};
use crate::routes::GuardRole;
use crate::server::{client_id_from_headers, AppState};

/// What a guard knows about the client when it decides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub principal: Principal,
    /// Stored role string resolved to a portal, falling back to the user's entity type.
    pub role: Option<GuardRole>,
    pub token: Option<String>,
}

impl SessionSnapshot {
    pub fn read(store: &SessionStore) -> Self {
        let principal = store.principal();
        let Some(user) = principal.user() else { return Self::default(); };
        let role = store
            .role()
            .as_deref()
            .and_then(GuardRole::from_role_str)
            .or_else(|| user.effective_entity_type().map(GuardRole::from_entity_type));
        let token = store.token();
        Self { principal, role, token }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardState {
    Checking,
    Authorized,
    Redirecting(String),
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Guard {
    pub role: GuardRole,
    pub permission: Option<Permission>,
}

fn same_path(a: &str, b: &str) -> bool {
    a.trim_end_matches('/') == b.trim_end_matches('/')
}

impl GuardState {
    pub fn is_terminal(&self) -> bool { !matches!(self, GuardState::Checking) }

    pub fn advance(self, guard: &Guard, session: &SessionSnapshot, path: &str) -> GuardState {
        if self.is_terminal() { return self; }
        if same_path(path, guard.role.login_path()) { return GuardState::Authorized; }

        let redirect = |target: &str| {
            if same_path(target, path) { GuardState::Denied } else { GuardState::Redirecting(target.to_string()) }
        };

        if !session.principal.is_authenticated() {
            return redirect(guard.role.login_path());
        }
        match session.role {
            None => return redirect(guard.role.login_path()),
            Some(r) if r != guard.role => return redirect(r.dashboard_path()),
            Some(_) => {}
        }
        if let Some(p) = guard.permission {
            if !has_permission(&session.principal, p) {
                return redirect(guard.role.dashboard_path());
            }
        }
        GuardState::Authorized
    }
}

impl Guard {
    pub fn new(role: GuardRole) -> Self { Self { role, permission: None } }

    pub fn requiring(mut self, permission: Permission) -> Self {
        self.permission = Some(permission);
        self
    }

    pub fn with_permission(mut self, permission: Option<Permission>) -> Self {
        self.permission = permission;
        self
    }

    pub fn check(&self, session: &SessionSnapshot, path: &str) -> GuardState {
        GuardState::Checking.advance(self, session, path)
    }
}

#[derive(Clone)]
pub struct GuardContext {
    pub state: AppState,
    pub guard: Guard,
}

/// axum middleware running a guard in front of the wrapped routes.
/// Authorized requests carry the `SessionSnapshot` in their extensions.
pub async fn guard_layer(State(ctx): State<GuardContext>, mut req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let session = client_id_from_headers(req.headers())
        .and_then(|id| ctx.state.vault.get(&id))
        .map(|store| SessionSnapshot::read(&store))
        .unwrap_or_default();
    let who = session.principal.user().map(|u| u.display_name().to_string()).unwrap_or_else(|| "<anonymous>".into());

    match ctx.guard.check(&session, &path) {
        GuardState::Authorized => {
            debug!(target: "bizdesk::guard", "guard={} path={} user={} authorized", ctx.guard.role, path, who);
            req.extensions_mut().insert(session);
            next.run(req).await
        }
        GuardState::Redirecting(target) => {
            info!(target: "bizdesk::guard", "guard={} path={} user={} redirect={}", ctx.guard.role, path, who, target);
            Redirect::to(&target).into_response()
        }
        GuardState::Denied | GuardState::Checking => {
            info!(target: "bizdesk::guard", "guard={} path={} user={} denied", ctx.guard.role, path, who);
            AppError::forbidden("forbidden", "insufficient permissions").into_response()
        }
    }
}

/// Wrap every route currently in `router` with `guard`.
pub fn guarded<S>(router: Router<S>, state: AppState, guard: Guard) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.route_layer(middleware::from_fn_with_state(GuardContext { state, guard }, guard_layer))
}

#[cfg(test)]
#[path = "guard_tests.rs"]
mod guard_tests;
