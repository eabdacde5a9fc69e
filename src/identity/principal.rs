use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use super::permissions::Permission;

/// Role-domain discriminator carried by users and roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    #[serde(rename = "SupAdmin")]
    SupAdmin,
    #[serde(rename = "executive")]
    Executive,
    #[serde(rename = "editor")]
    Editor,
    #[serde(rename = "leads")]
    Leads,
    #[serde(rename = "clients")]
    Clients,
    #[serde(rename = "author")]
    Author,
}

impl EntityType {
    pub const ALL: [EntityType; 6] = [
        EntityType::SupAdmin,
        EntityType::Executive,
        EntityType::Editor,
        EntityType::Leads,
        EntityType::Clients,
        EntityType::Author,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::SupAdmin => "SupAdmin",
            EntityType::Executive => "executive",
            EntityType::Editor => "editor",
            EntityType::Leads => "leads",
            EntityType::Clients => "clients",
            EntityType::Author => "author",
        }
    }
}

impl Display for EntityType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        EntityType::ALL
            .into_iter()
            .find(|e| e.as_str().eq_ignore_ascii_case(t))
            .ok_or_else(|| format!("unknown entity type '{}'", s))
    }
}

// Unknown entity types from the API degrade to None instead of rejecting the whole record.
fn lenient_entity_type<'de, D: Deserializer<'de>>(d: D) -> Result<Option<EntityType>, D::Error> {
    let raw: Option<String> = Option::deserialize(d)?;
    Ok(raw.and_then(|s| s.parse().ok()))
}

// The API hands out numeric ids for some records and string ids for others.
fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(d)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("expected string or number id, got {}", other))),
    }
}

/// Permission as carried on the wire: a name plus an optional description.
/// Names outside the registry are kept so they can still be matched exactly.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermissionEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl From<Permission> for PermissionEntry {
    fn from(p: Permission) -> Self {
        Self { name: p.as_str().to_string(), description: Some(p.description().to_string()) }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Role {
    pub name: String,
    #[serde(default, deserialize_with = "lenient_entity_type", skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<EntityType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<PermissionEntry>>,
}

impl Role {
    pub fn new(name: impl Into<String>, entity_type: EntityType) -> Self {
        Self { name: name.into(), entity_type: Some(entity_type), permissions: Some(Vec::new()) }
    }

    pub fn with_permissions<I, P>(mut self, perms: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PermissionEntry>,
    {
        self.permissions = Some(perms.into_iter().map(Into::into).collect());
        self
    }
}

/// User record as returned by the login endpoint and kept in client storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, deserialize_with = "lenient_entity_type", skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<EntityType>,
}

impl User {
    pub fn display_name(&self) -> &str {
        self.username
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(self.id.as_str())
    }

    /// The user's own entity type, falling back to the one declared on the role.
    pub fn effective_entity_type(&self) -> Option<EntityType> {
        self.entity_type.or_else(|| self.role.as_ref().and_then(|r| r.entity_type))
    }

    pub fn permissions(&self) -> Option<&[PermissionEntry]> {
        self.role.as_ref()?.permissions.as_deref()
    }
}

/// The actor behind a request: nobody, or a user restored from the client's session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Principal {
    #[default]
    Anonymous,
    Authenticated(User),
}

impl Principal {
    pub fn user(&self) -> Option<&User> {
        match self {
            Principal::Anonymous => None,
            Principal::Authenticated(u) => Some(u),
        }
    }

    pub fn is_authenticated(&self) -> bool { matches!(self, Principal::Authenticated(_)) }
}

impl From<Option<User>> for Principal {
    fn from(u: Option<User>) -> Self {
        u.map(Principal::Authenticated).unwrap_or_default()
    }
}
