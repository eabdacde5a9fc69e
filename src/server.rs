//!
//! bizdesk HTTP/WS server
//! ----------------------
//! This module defines the Axum-based portal server.
//!
//! Responsibilities:
//! - Client identification with a cookie; each client owns one session store in the vault.
//! - Per-portal login endpoints backed by the configured authentication backend.
//! - Guarded portal pages built from the navigation tables.
//! - Guarded pass-through of data calls to the remote API with the stored bearer token.
//! - WebSocket stream of session changes so open tabs can re-check their state.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::config::PortalConfig;
use crate::error::{AppError, AppResult};
use crate::guard::{self, Guard, SessionSnapshot};
use crate::identity::{
    is_invalid_credentials, is_super_admin, is_valid_client_id, new_client_id, ApiClient, AuthBackend, ClientVault,
    LocalAuthProvider, LoginRequest, Principal, RemoteAuthProvider, SessionEvent, User,
};
use crate::navigation::{self, NavLink};
use crate::routes::GuardRole;

const CLIENT_COOKIE: &str = "bizdesk_client";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<PortalConfig>,
    pub vault: Arc<ClientVault>,
    pub auth: Arc<AuthBackend>,
    pub api: Option<ApiClient>,
}

impl AppState {
    pub fn new(config: PortalConfig, auth: AuthBackend, api: Option<ApiClient>) -> Self {
        let vault = ClientVault::new(config.keys.clone(), config.storage_dir.clone());
        Self { config: Arc::new(config), vault: Arc::new(vault), auth: Arc::new(auth), api }
    }

    /// Local user directory wins over the remote API for logins; data calls always use the API.
    pub fn from_config(config: PortalConfig) -> anyhow::Result<Self> {
        let api = match &config.api_base {
            Some(base) => Some(ApiClient::new(base, config.api_timeout())?),
            None => None,
        };
        let auth = if let Some(path) = &config.users_file {
            AuthBackend::Local(LocalAuthProvider::from_file(path)?)
        } else if let Some(api) = &api {
            AuthBackend::Remote(RemoteAuthProvider::new(api.clone()))
        } else {
            return Err(anyhow!("no authentication backend: set BIZDESK_USERS_FILE or BIZDESK_API_BASE"));
        };
        Ok(Self::new(config, auth, api))
    }
}

fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie = headers.get("cookie").or_else(|| headers.get("Cookie"))?;
    let s = cookie.to_str().ok()?;
    for part in s.split(';') {
        let p = part.trim();
        if let Some(eq) = p.find('=') {
            let (k, v) = p.split_at(eq);
            if k == name { return Some(v[1..].to_string()); }
        }
    }
    None
}

pub fn client_id_from_headers(headers: &HeaderMap) -> Option<String> {
    parse_cookie(headers, CLIENT_COOKIE).filter(|id| is_valid_client_id(id))
}

fn set_client_cookie(client_id: &str) -> AppResult<HeaderValue> {
    // HttpOnly cookie scoped to path / with SameSite=Strict
    HeaderValue::from_str(&format!("{}={}; HttpOnly; Secure; SameSite=Strict; Path=/", CLIENT_COOKIE, client_id))
        .map_err(|_| AppError::internal("cookie_error", "client id is not a valid cookie value"))
}

/// Portal a freshly authenticated user belongs to. Super-admins by either rule land in the admin portal.
fn portal_for(user: &User) -> Option<GuardRole> {
    if is_super_admin(&Principal::Authenticated(user.clone())) {
        return Some(GuardRole::Admin);
    }
    user.effective_entity_type().map(GuardRole::from_entity_type)
}

pub fn router(state: AppState) -> Router {
    let mut app: Router<AppState> = Router::new()
        .route("/", get(|| async { "bizdesk ok" }))
        .route("/logout", post(logout))
        .route("/session/watch", get(watch_session));

    for role in GuardRole::ALL {
        app = app.route(
            role.login_path(),
            get(move || login_page(role)).post(
                move |State(st): State<AppState>, headers: HeaderMap, Json(payload): Json<LoginPayload>| {
                    login(role, st, headers, payload)
                },
            ),
        );
        for link in navigation::links_for(Some(role)) {
            let page = Router::<AppState>::new().route(
                link.href,
                get(move |Extension(session): Extension<SessionSnapshot>| render_page(role, link, session)),
            );
            app = app.merge(guard::guarded(page, state.clone(), Guard::new(role).with_permission(link.permission)));
        }
        let data = Router::<AppState>::new().route(&format!("/{}/data/{{*path}}", role.slug()), get(proxy_data));
        app = app.merge(guard::guarded(data, state.clone(), Guard::new(role)));
    }

    app.with_state(state)
}

/// Convenience entry point reading configuration from the environment.
pub async fn run() -> anyhow::Result<()> {
    run_with_config(PortalConfig::from_env()).await
}

pub async fn run_with_config(config: PortalConfig) -> anyhow::Result<()> {
    let port = config.http_port;
    let state = AppState::from_config(config).context("While building portal state")?;
    let app = router(state);

    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Debug, Deserialize)]
struct LoginPayload { username: String, password: String }

async fn login_page(role: GuardRole) -> Json<Value> {
    Json(json!({"status": "ok", "portal": role, "action": role.login_path()}))
}

async fn login(role: GuardRole, state: AppState, headers: HeaderMap, payload: LoginPayload) -> Response {
    let req = LoginRequest { username: payload.username, password: payload.password, role: role.slug().to_string() };
    let resp = match state.auth.login(&req).await {
        Ok(r) => r,
        Err(e) if is_invalid_credentials(&e) => {
            info!(target: "bizdesk::auth", "login rejected user={} portal={}", req.username, role);
            return (StatusCode::UNAUTHORIZED, Json(json!({"status": "unauthorized"}))).into_response();
        }
        Err(e) => {
            error!("login error: {e}");
            return AppError::from(e).into_response();
        }
    };

    if portal_for(&resp.user) != Some(role) {
        info!(target: "bizdesk::auth", "login for wrong portal user={} portal={}", resp.user.display_name(), role);
        return AppError::Forbidden {
            code: "wrong_portal".into(),
            message: format!("account cannot sign in to the {} portal", role),
        }
        .into_response();
    }

    // Client storage is only opened once the account is accepted for this portal.
    let (client_id, fresh) = match client_id_from_headers(&headers) {
        Some(id) => (id, false),
        None => (new_client_id(), true),
    };
    let Some(store) = state.vault.get_or_create(&client_id) else {
        return AppError::internal("vault_error", "cannot open client storage").into_response();
    };
    if let Err(e) = store.set_stored_auth(&resp.token, &resp.user, role.slug()) {
        error!("storing session failed: {e}");
        return AppError::from(e).into_response();
    }
    info!(target: "bizdesk::auth", "login ok user={} portal={}", resp.user.display_name(), role);

    let mut h = HeaderMap::new();
    if fresh {
        match set_client_cookie(&client_id) {
            Ok(v) => { h.insert(SET_COOKIE, v); }
            Err(e) => return e.into_response(),
        }
    }
    (StatusCode::OK, h, Json(json!({"status": "ok", "redirect": role.dashboard_path()}))).into_response()
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(client_id) = client_id_from_headers(&headers) else {
        return Json(json!({"status": "ok"})).into_response();
    };
    if let Some(store) = state.vault.get(&client_id) {
        // watchers still see the sign-out before the store is dropped
        let cleared = store.clear_stored_auth().and_then(|_| state.vault.remove(&client_id));
        if let Err(e) = cleared {
            error!("clearing session failed: {e}");
            return AppError::from(e).into_response();
        }
    }
    Json(json!({"status": "ok"})).into_response()
}

async fn render_page(role: GuardRole, link: &'static NavLink, session: SessionSnapshot) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "portal": role,
        "page": link.label,
        "path": link.href,
        "user": session.principal.user().map(|u| u.display_name()),
        "super_admin": is_super_admin(&session.principal),
        "nav": navigation::visible_links(&session.principal, session.role),
    }))
}

async fn proxy_data(
    State(state): State<AppState>,
    Extension(session): Extension<SessionSnapshot>,
    Path(path): Path<String>,
    uri: Uri,
) -> AppResult<Json<Value>> {
    let Some(api) = state.api.as_ref() else {
        return Err(AppError::not_found("api_not_configured", "no remote API configured"));
    };
    let target = match uri.query() {
        Some(q) => format!("{}?{}", path, q),
        None => path,
    };
    if let Err(e) = api.url(&target) {
        warn!(target: "bizdesk::api", "rejected data path: {}", e);
        return Err(AppError::user("bad_path", "path may not leave the API root"));
    }
    match api.get_json(&target, session.token.as_deref()).await {
        Ok(v) => Ok(Json(v)),
        Err(e) => {
            warn!(target: "bizdesk::api", "GET {} failed: {}", target, e);
            Err(e.into())
        }
    }
}

async fn watch_session(State(state): State<AppState>, headers: HeaderMap, ws: WebSocketUpgrade) -> Response {
    let Some(store) = client_id_from_headers(&headers).and_then(|id| state.vault.get(&id)) else {
        return AppError::auth("unauthorized", "no client session").into_response();
    };
    let rx = store.subscribe();
    ws.on_upgrade(move |socket| forward_session_events(socket, rx))
}

async fn forward_session_events(socket: WebSocket, mut rx: broadcast::Receiver<SessionEvent>) {
    let (mut sender, mut receiver) = socket.split();
    loop {
        tokio::select! {
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            ev = rx.recv() => match ev {
                Ok(ev) => {
                    let Ok(text) = serde_json::to_string(&ev) else { continue; };
                    if sender.send(Message::Text(text.into())).await.is_err() { break; }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    debug!(target: "bizdesk::session", "session watcher lagged, {} events dropped", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
}
