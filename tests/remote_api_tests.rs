//! Remote backend tests against a throwaway in-process API server.

use std::time::Duration;

use anyhow::Result;
use axum::body::Body;
use axum::http::{header::AUTHORIZATION, header::SET_COOKIE, HeaderMap, Request, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower::ServiceExt;

use bizdesk::config::PortalConfig;
use bizdesk::identity::{
    is_invalid_credentials, ApiClient, EntityType, LoginRequest, Permission, RemoteAuthProvider, Role, User,
};
use bizdesk::server::{router, AppState};

const REMOTE_TOKEN: &str = "remote-tok";

fn editor() -> User {
    User {
        id: "42".into(),
        username: Some("ed".into()),
        email: None,
        role: Some(Role::new("Editor", EntityType::Editor).with_permissions([Permission::ShowJournalsNav])),
        entity_type: Some(EntityType::Editor),
    }
}

async fn remote_login(Json(req): Json<Value>) -> axum::response::Response {
    match (req["username"].as_str(), req["password"].as_str()) {
        (Some("ed"), Some("pw")) => Json(json!({"token": REMOTE_TOKEN, "user": editor()})).into_response(),
        (Some("blank"), _) => Json(json!({"token": "", "user": editor()})).into_response(),
        _ => (StatusCode::UNAUTHORIZED, Json(json!({"status": "unauthorized"}))).into_response(),
    }
}

// Echoes the bearer header and query so callers can see what was forwarded.
async fn journals(headers: HeaderMap, uri: Uri) -> axum::response::Response {
    let auth = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()).map(str::to_string);
    let expected = format!("Bearer {}", REMOTE_TOKEN);
    if auth.as_deref() != Some(expected.as_str()) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"status": "unauthorized"}))).into_response();
    }
    Json(json!({"items": [{"id": 1, "title": "Q3 review"}], "auth": auth, "query": uri.query()})).into_response()
}

/// Start the fake API on an ephemeral port and return its base URL.
async fn fake_api() -> Result<String> {
    let api = Router::new()
        .route("/v1/auth/login", post(remote_login))
        .route("/v1/journals", get(journals))
        .route("/v1/broken", get(|| async { "not json" }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, api).await;
    });
    Ok(format!("http://{}/v1", addr))
}

fn login_req(username: &str, password: &str) -> LoginRequest {
    LoginRequest { username: username.into(), password: password.into(), role: "editor".into() }
}

#[tokio::test]
async fn remote_login_maps_statuses() -> Result<()> {
    let base = fake_api().await?;
    let provider = RemoteAuthProvider::new(ApiClient::new(&base, Duration::from_secs(5))?);

    let ok = provider.login(&login_req("ed", "pw")).await?;
    assert_eq!(ok.token, REMOTE_TOKEN);
    assert_eq!(ok.user, editor());

    let bad = provider.login(&login_req("ed", "nope")).await;
    assert!(bad.as_ref().is_err_and(is_invalid_credentials));

    let blank = provider.login(&login_req("blank", "pw")).await;
    assert!(blank.as_ref().is_err_and(|e| !is_invalid_credentials(e)));
    Ok(())
}

#[tokio::test]
async fn api_client_sends_the_bearer_token() -> Result<()> {
    let base = fake_api().await?;
    let api = ApiClient::new(&base, Duration::from_secs(5))?;

    let v = api.get_json("journals?page=2", Some(REMOTE_TOKEN)).await?;
    assert_eq!(v["auth"], format!("Bearer {}", REMOTE_TOKEN));
    assert_eq!(v["query"], "page=2");

    assert!(api.get_json("journals", None).await.is_err());
    assert!(api.get_json("broken", Some(REMOTE_TOKEN)).await.is_err(), "non-JSON success body is an error");
    Ok(())
}

async fn call(app: &Router, method: &str, path: &str, cookie: Option<&str>, body: Option<Value>) -> (StatusCode, HeaderMap, Value) {
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
    let headers = resp.headers().clone();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, headers, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn portal_forwards_data_calls_to_the_remote_api() -> Result<()> {
    let base = fake_api().await?;
    let config = PortalConfig { api_base: Some(base), ..PortalConfig::default() };
    let app = router(AppState::from_config(config)?);

    let (status, _, body) =
        call(&app, "POST", "/editor/login", None, Some(json!({"username": "ed", "password": "wrong"}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], "unauthorized");

    let (status, headers, _) =
        call(&app, "POST", "/editor/login", None, Some(json!({"username": "ed", "password": "pw"}))).await;
    assert_eq!(status, StatusCode::OK);
    let cookie = headers[SET_COOKIE].to_str()?.split(';').next().unwrap_or_default().to_string();

    let (status, _, body) = call(&app, "GET", "/editor/data/journals?page=2", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"][0]["title"], "Q3 review");
    assert_eq!(body["auth"], format!("Bearer {}", REMOTE_TOKEN));
    assert_eq!(body["query"], "page=2");

    let (status, _, body) = call(&app, "GET", "/editor/data/broken", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "upstream_error");

    let (status, _, body) = call(&app, "GET", "/editor/data/https:/evil.example.net/x", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_path");
    Ok(())
}
