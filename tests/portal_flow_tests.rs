//! End-to-end portal tests against the full router with a local user directory.

use anyhow::Result;
use argon2::{Algorithm, Argon2, Params, PasswordHasher, Version};
use axum::body::Body;
use axum::http::{header::LOCATION, header::SET_COOKIE, Request, StatusCode};
use axum::Router;
use password_hash::SaltString;
use serde_json::{json, Value};
use tower::ServiceExt;

use bizdesk::config::PortalConfig;
use bizdesk::identity::{AuthBackend, EntityType, LocalAuthProvider, LocalUserRecord, Permission, Role, User};
use bizdesk::server::{router, AppState};

// Low-cost parameters keep the tests fast; verification reads the parameters from the PHC string.
fn cheap_hash(password: &str) -> String {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).expect("salt");
    let salt = SaltString::encode_b64(&salt_bytes).expect("salt b64");
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, Params::new(8, 1, 1, None).unwrap());
    argon2.hash_password(password.as_bytes(), &salt).unwrap().to_string()
}

fn record(id: &str, username: &str, password: &str, role: Role) -> LocalUserRecord {
    let entity_type = role.entity_type;
    LocalUserRecord {
        password_hash: cheap_hash(password),
        user: User { id: id.into(), username: Some(username.into()), email: None, role: Some(role), entity_type },
    }
}

fn app() -> Router {
    app_with_state().0
}

fn app_with_state() -> (Router, AppState) {
    let users = vec![
        record(
            "1",
            "exec",
            "exec-pw",
            Role::new("Sales Executive", EntityType::Executive).with_permissions([Permission::ShowProspectsNav]),
        ),
        record("2", "editor", "editor-pw", Role::new("Editor", EntityType::Editor)),
        record("3", "root", "root-pw", Role::new("Owner", EntityType::SupAdmin)),
    ];
    let state = AppState::new(PortalConfig::default(), AuthBackend::Local(LocalAuthProvider::new(users)), None);
    (router(state.clone()), state)
}

struct Reply {
    status: StatusCode,
    location: Option<String>,
    cookie: Option<String>,
    body: Value,
}

async fn send(app: &Router, method: &str, path: &str, cookie: Option<&str>, body: Option<Value>) -> Reply {
    let mut b = Request::builder().method(method).uri(path);
    if let Some(c) = cookie {
        b = b.header("cookie", c);
    }
    let req = match body {
        Some(v) => b.header("content-type", "application/json").body(Body::from(v.to_string())).unwrap(),
        None => b.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let location = resp.headers().get(LOCATION).and_then(|v| v.to_str().ok()).map(str::to_string);
    let cookie = resp
        .headers()
        .get(SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(';').next())
        .map(|s| s.trim().to_string());
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    Reply { status, location, cookie, body }
}

async fn login(app: &Router, portal: &str, username: &str, password: &str) -> Reply {
    let path = format!("/{}/login", portal);
    send(app, "POST", &path, None, Some(json!({"username": username, "password": password}))).await
}

#[tokio::test]
async fn executive_login_dashboard_and_logout() -> Result<()> {
    let app = app();

    let r = login(&app, "executive", "exec", "exec-pw").await;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(r.body["redirect"], "/executive/dashboard");
    let cookie = r.cookie.expect("client cookie issued");
    assert!(cookie.starts_with("bizdesk_client="));

    let dash = send(&app, "GET", "/executive/dashboard", Some(&cookie), None).await;
    assert_eq!(dash.status, StatusCode::OK);
    assert_eq!(dash.body["user"], "exec");
    assert_eq!(dash.body["super_admin"], false);
    let hrefs: Vec<&str> = dash.body["nav"].as_array().unwrap().iter().map(|l| l["href"].as_str().unwrap()).collect();
    assert_eq!(hrefs, vec!["/executive/dashboard", "/executive/prospects"]);

    let prospects = send(&app, "GET", "/executive/prospects", Some(&cookie), None).await;
    assert_eq!(prospects.status, StatusCode::OK);
    assert_eq!(prospects.body["page"], "Prospects");

    let tx = send(&app, "GET", "/executive/transactions", Some(&cookie), None).await;
    assert_eq!(tx.status, StatusCode::SEE_OTHER);
    assert_eq!(tx.location.as_deref(), Some("/executive/dashboard"));

    let other = send(&app, "GET", "/editor/dashboard", Some(&cookie), None).await;
    assert_eq!(other.status, StatusCode::SEE_OTHER);
    assert_eq!(other.location.as_deref(), Some("/executive/dashboard"));

    let out = send(&app, "POST", "/logout", Some(&cookie), None).await;
    assert_eq!(out.status, StatusCode::OK);
    let after = send(&app, "GET", "/executive/dashboard", Some(&cookie), None).await;
    assert_eq!(after.status, StatusCode::SEE_OTHER);
    assert_eq!(after.location.as_deref(), Some("/executive/login"));
    Ok(())
}

#[tokio::test]
async fn bad_credentials_and_wrong_portal_are_rejected() -> Result<()> {
    let app = app();

    let bad = login(&app, "executive", "exec", "wrong").await;
    assert_eq!(bad.status, StatusCode::UNAUTHORIZED);
    assert!(bad.cookie.is_none());

    let wrong = login(&app, "executive", "editor", "editor-pw").await;
    assert_eq!(wrong.status, StatusCode::FORBIDDEN);
    assert_eq!(wrong.body["code"], "wrong_portal");
    Ok(())
}

#[tokio::test]
async fn supadmin_sees_every_admin_page() -> Result<()> {
    let app = app();
    let r = login(&app, "admin", "root", "root-pw").await;
    assert_eq!(r.status, StatusCode::OK);
    let cookie = r.cookie.unwrap();

    for path in ["/admin/users", "/admin/services", "/admin/roles", "/admin/finance"] {
        let page = send(&app, "GET", path, Some(&cookie), None).await;
        assert_eq!(page.status, StatusCode::OK, "{}", path);
        assert_eq!(page.body["super_admin"], true);
    }
    let dash = send(&app, "GET", "/admin/dashboard", Some(&cookie), None).await;
    assert_eq!(dash.body["nav"].as_array().unwrap().len(), 5);
    Ok(())
}

#[tokio::test]
async fn login_pages_are_open_and_data_calls_need_an_api() -> Result<()> {
    let app = app();
    let page = send(&app, "GET", "/editor/login", None, None).await;
    assert_eq!(page.status, StatusCode::OK);
    assert_eq!(page.body["portal"], "editor");

    let anon = send(&app, "GET", "/editor/data/journals", None, None).await;
    assert_eq!(anon.status, StatusCode::SEE_OTHER);
    assert_eq!(anon.location.as_deref(), Some("/editor/login"));

    let cookie = login(&app, "editor", "editor", "editor-pw").await.cookie.unwrap();
    let data = send(&app, "GET", "/editor/data/journals", Some(&cookie), None).await;
    assert_eq!(data.status, StatusCode::NOT_FOUND);
    assert_eq!(data.body["code"], "api_not_configured");
    Ok(())
}

#[tokio::test]
async fn second_login_on_same_client_keeps_the_cookie() -> Result<()> {
    let app = app();
    let cookie = login(&app, "executive", "exec", "exec-pw").await.cookie.unwrap();
    let again = send(
        &app,
        "POST",
        "/editor/login",
        Some(&cookie),
        Some(json!({"username": "editor", "password": "editor-pw"})),
    )
    .await;
    assert_eq!(again.status, StatusCode::OK);
    assert!(again.cookie.is_none(), "existing client id is reused");

    // last write wins: the client is now an editor
    let dash = send(&app, "GET", "/executive/dashboard", Some(&cookie), None).await;
    assert_eq!(dash.location.as_deref(), Some("/editor/dashboard"));
    Ok(())
}

#[tokio::test]
async fn rejected_logins_leave_no_client_state() -> Result<()> {
    let (app, state) = app_with_state();
    for _ in 0..50 {
        let r = login(&app, "editor", "editor", "wrong").await;
        assert_eq!(r.status, StatusCode::UNAUTHORIZED);
    }
    let wrong = login(&app, "editor", "exec", "exec-pw").await;
    assert_eq!(wrong.status, StatusCode::FORBIDDEN);
    assert!(wrong.cookie.is_none());
    assert!(state.vault.is_empty());
    Ok(())
}

#[tokio::test]
async fn logout_drops_the_client_store() -> Result<()> {
    let (app, state) = app_with_state();
    let cookie = login(&app, "editor", "editor", "editor-pw").await.cookie.unwrap();
    assert_eq!(state.vault.len(), 1);

    let out = send(&app, "POST", "/logout", Some(&cookie), None).await;
    assert_eq!(out.status, StatusCode::OK);
    assert!(state.vault.is_empty());

    let again = send(&app, "POST", "/logout", Some(&cookie), None).await;
    assert_eq!(again.status, StatusCode::OK);
    Ok(())
}
