use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::identity::SessionKeys;

/// Portal settings. Every field has an environment override (`BIZDESK_*`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortalConfig {
    pub http_port: u16,
    /// Base URL of the remote REST API (e.g. https://api.example.com/v1)
    pub api_base: Option<String>,
    /// JSON user directory for local authentication; takes precedence over the remote API for logins
    pub users_file: Option<PathBuf>,
    /// Directory for per-client session documents; sessions stay in memory when unset
    pub storage_dir: Option<PathBuf>,
    pub api_timeout_secs: u64,
    pub keys: SessionKeys,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            http_port: 7979,
            api_base: None,
            users_file: None,
            storage_dir: None,
            api_timeout_secs: 15,
            keys: SessionKeys::default(),
        }
    }
}

fn parse_or<T: std::str::FromStr>(name: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(s) => s.trim().parse().unwrap_or_else(|_| {
            warn!(target: "bizdesk::config", "ignoring unparseable {}='{}'", name, s);
            default
        }),
    }
}

impl PortalConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |k: &str| lookup(k).filter(|v| !v.trim().is_empty());
        let d = Self::default();
        let dk = SessionKeys::default();
        Self {
            http_port: parse_or("BIZDESK_HTTP_PORT", get("BIZDESK_HTTP_PORT"), d.http_port),
            api_base: get("BIZDESK_API_BASE"),
            users_file: get("BIZDESK_USERS_FILE").map(PathBuf::from),
            storage_dir: get("BIZDESK_STORAGE_DIR").map(PathBuf::from),
            api_timeout_secs: parse_or("BIZDESK_API_TIMEOUT_SECS", get("BIZDESK_API_TIMEOUT_SECS"), d.api_timeout_secs),
            keys: SessionKeys {
                token: get("BIZDESK_TOKEN_KEY").unwrap_or(dk.token),
                user: get("BIZDESK_USER_KEY").unwrap_or(dk.user),
                logged_in: get("BIZDESK_LOGGED_IN_KEY").unwrap_or(dk.logged_in),
                role: get("BIZDESK_ROLE_KEY").unwrap_or(dk.role),
            },
        }
    }

    pub fn api_timeout(&self) -> Duration { Duration::from_secs(self.api_timeout_secs) }
}
