//! Routing table for the role portals: where each role logs in and where it lands.

use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::identity::EntityType;

/// Portal a guard protects. `Admin` is the super-admin portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardRole {
    Admin,
    Editor,
    Executive,
    Leads,
    Clients,
    Author,
}

impl GuardRole {
    pub const ALL: [GuardRole; 6] = [
        GuardRole::Admin,
        GuardRole::Editor,
        GuardRole::Executive,
        GuardRole::Leads,
        GuardRole::Clients,
        GuardRole::Author,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            GuardRole::Admin => "admin",
            GuardRole::Editor => "editor",
            GuardRole::Executive => "executive",
            GuardRole::Leads => "leads",
            GuardRole::Clients => "clients",
            GuardRole::Author => "author",
        }
    }

    pub fn login_path(&self) -> &'static str {
        match self {
            GuardRole::Admin => "/admin/login",
            GuardRole::Editor => "/editor/login",
            GuardRole::Executive => "/executive/login",
            GuardRole::Leads => "/leads/login",
            GuardRole::Clients => "/clients/login",
            GuardRole::Author => "/author/login",
        }
    }

    pub fn dashboard_path(&self) -> &'static str {
        match self {
            GuardRole::Admin => "/admin/dashboard",
            GuardRole::Editor => "/editor/dashboard",
            GuardRole::Executive => "/executive/dashboard",
            GuardRole::Leads => "/leads/dashboard",
            GuardRole::Clients => "/clients/dashboard",
            GuardRole::Author => "/author/dashboard",
        }
    }

    pub fn entity_type(&self) -> EntityType {
        match self {
            GuardRole::Admin => EntityType::SupAdmin,
            GuardRole::Editor => EntityType::Editor,
            GuardRole::Executive => EntityType::Executive,
            GuardRole::Leads => EntityType::Leads,
            GuardRole::Clients => EntityType::Clients,
            GuardRole::Author => EntityType::Author,
        }
    }

    pub fn from_entity_type(et: EntityType) -> Self {
        match et {
            EntityType::SupAdmin => GuardRole::Admin,
            EntityType::Editor => GuardRole::Editor,
            EntityType::Executive => GuardRole::Executive,
            EntityType::Leads => GuardRole::Leads,
            EntityType::Clients => GuardRole::Clients,
            EntityType::Author => GuardRole::Author,
        }
    }

    /// Accepts a portal slug ("admin", "leads", ...) or an entity type ("SupAdmin", ...).
    pub fn from_role_str(s: &str) -> Option<Self> {
        let t = s.trim();
        if let Some(r) = GuardRole::ALL.into_iter().find(|r| r.slug().eq_ignore_ascii_case(t)) {
            return Some(r);
        }
        t.parse::<EntityType>().ok().map(GuardRole::from_entity_type)
    }
}

impl Display for GuardRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}
