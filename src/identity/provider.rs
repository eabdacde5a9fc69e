use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use base64::Engine;
use password_hash::{PasswordHash, SaltString};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::principal::User;
use crate::tprintln;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    /// Portal the login was submitted to (guard role slug).
    #[serde(default)]
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

pub fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let phc = Argon2::default().hash_password(password.as_bytes(), &salt).map_err(|e| anyhow!(e.to_string()))?.to_string();
    Ok(phc)
}

pub fn verify_password(hash: &str, password: &str) -> bool {
    if let Ok(parsed) = PasswordHash::new(hash) {
        Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok()
    } else { false }
}

fn gen_token() -> String {
    let mut buf = [0u8; 32];
    let _ = getrandom::getrandom(&mut buf);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf)
}

// --- Local user directory (development and tests) ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalUserRecord {
    pub password_hash: String,
    pub user: User,
}

#[derive(Debug, Clone, Default)]
pub struct LocalAuthProvider {
    users: Vec<LocalUserRecord>,
}

impl LocalAuthProvider {
    pub fn new(users: Vec<LocalUserRecord>) -> Self { Self { users } }

    /// Load a JSON array of `{ "password_hash": "<argon2 PHC>", "user": {...} }` records.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("While reading user directory {}", path.display()))?;
        let users: Vec<LocalUserRecord> = serde_json::from_str(&text)
            .with_context(|| format!("While parsing user directory {}", path.display()))?;
        debug!(target: "bizdesk::auth", "loaded {} local users from {}", users.len(), path.display());
        Ok(Self { users })
    }

    pub fn add_user(&mut self, user: User, password: &str) -> Result<()> {
        let password_hash = hash_password(password)?;
        self.users.push(LocalUserRecord { password_hash, user });
        Ok(())
    }

    fn find(&self, login: &str) -> Option<&LocalUserRecord> {
        self.users.iter().find(|r| {
            r.user.username.as_deref().is_some_and(|u| u.eq_ignore_ascii_case(login))
                || r.user.email.as_deref().is_some_and(|e| e.eq_ignore_ascii_case(login))
        })
    }

    pub fn login(&self, req: &LoginRequest) -> Result<LoginResponse> {
        let Some(rec) = self.find(&req.username) else { return Err(anyhow!("invalid_credentials")); };
        if !verify_password(&rec.password_hash, &req.password) {
            return Err(anyhow!("invalid_credentials"));
        }
        tprintln!("auth.login(local) user={} portal={}", req.username, req.role);
        Ok(LoginResponse { token: gen_token(), user: rec.user.clone() })
    }
}

// --- Remote REST API ---

/// Thin JSON client for the remote API. Attaches the session token as a bearer header.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base: Url,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base: &str, timeout: Duration) -> Result<Self> {
        // Url::join drops the last segment unless the base ends with '/'
        let normalized = if base.ends_with('/') { base.to_string() } else { format!("{}/", base) };
        let base = Url::parse(&normalized).context("invalid API base URL")?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { base, client })
    }

    pub fn base(&self) -> &Url { &self.base }

    /// Resolve `path` under the base URL. Anything that would leave the base (absolute URLs,
    /// scheme-relative paths, backslashes, dot segments) is rejected.
    pub fn url(&self, path: &str) -> Result<Url> {
        let rel = path.trim_start_matches('/');
        let path_part = rel.split(['?', '#']).next().unwrap_or_default();
        if path_part.contains(':') || path_part.contains('\\') {
            return Err(anyhow!("API path '{}' is not relative to the API base", path));
        }
        let joined = self.base.join(rel).with_context(|| format!("invalid API path '{}'", path))?;
        if !joined.as_str().starts_with(self.base.as_str()) {
            return Err(anyhow!("API path '{}' leaves the API base", path));
        }
        Ok(joined)
    }

    fn bearer(token: &str) -> Result<HeaderValue> {
        HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| anyhow!("token is not a valid header value"))
    }

    pub async fn get_json(&self, path: &str, token: Option<&str>) -> Result<serde_json::Value> {
        let mut rb = self.client.get(self.url(path)?);
        if let Some(t) = token { rb = rb.header(AUTHORIZATION, Self::bearer(t)?); }
        let resp = rb.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let val: serde_json::Value = resp.json().await.unwrap_or(serde_json::json!({"status":"error"}));
            return Err(anyhow!("remote error: HTTP {} {}", status, val));
        }
        resp.json().await.with_context(|| format!("remote reply for '{}' is not JSON", path))
    }

    pub async fn post_json<T: Serialize + ?Sized>(&self, path: &str, body: &T, token: Option<&str>) -> Result<reqwest::Response> {
        let mut rb = self.client.post(self.url(path)?).json(body);
        if let Some(t) = token { rb = rb.header(AUTHORIZATION, Self::bearer(t)?); }
        Ok(rb.send().await?)
    }
}

#[derive(Debug, Clone)]
pub struct RemoteAuthProvider {
    api: ApiClient,
}

impl RemoteAuthProvider {
    pub fn new(api: ApiClient) -> Self { Self { api } }

    pub async fn login(&self, req: &LoginRequest) -> Result<LoginResponse> {
        let resp = self.api.post_json("auth/login", req, None).await?;
        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(anyhow!("invalid_credentials"));
        }
        if !status.is_success() {
            return Err(anyhow!("login failed: HTTP {}", status));
        }
        let out: LoginResponse = resp.json().await.context("login response is not {token, user}")?;
        if out.token.is_empty() {
            warn!(target: "bizdesk::auth", "remote login for {} returned an empty token", req.username);
            return Err(anyhow!("login failed: empty token"));
        }
        Ok(out)
    }
}

/// Authentication backend selected at startup.
#[derive(Debug, Clone)]
pub enum AuthBackend {
    Local(LocalAuthProvider),
    Remote(RemoteAuthProvider),
}

impl AuthBackend {
    pub async fn login(&self, req: &LoginRequest) -> Result<LoginResponse> {
        match self {
            AuthBackend::Local(l) => l.login(req),
            AuthBackend::Remote(r) => r.login(req).await,
        }
    }
}

pub fn is_invalid_credentials(err: &anyhow::Error) -> bool {
    err.to_string() == "invalid_credentials"
}
