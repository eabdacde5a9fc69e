//! Boolean access decisions over a principal's role and permission list.

use super::principal::{EntityType, Principal};
use super::session::SessionStore;

/// Super-admin by entity type, or by a role name that contains "superadmin" in any case.
pub fn is_super_admin(principal: &Principal) -> bool {
    let Some(role) = principal.user().and_then(|u| u.role.as_ref()) else { return false; };
    if role.entity_type == Some(EntityType::SupAdmin) { return true; }
    role.name.to_lowercase().contains("superadmin")
}

/// Exact-name permission check. Super-admins pass before the list is consulted;
/// a missing principal, role or permission list denies.
pub fn has_permission(principal: &Principal, permission: impl AsRef<str>) -> bool {
    if is_super_admin(principal) { return true; }
    let Some(perms) = principal.user().and_then(|u| u.permissions()) else { return false; };
    let wanted = permission.as_ref();
    perms.iter().any(|p| p.name == wanted)
}

pub fn current_user_has_permission(store: &SessionStore, permission: impl AsRef<str>) -> bool {
    has_permission(&store.principal(), permission)
}

#[cfg(test)]
#[path = "evaluator_tests.rs"]
mod evaluator_tests;
