//! Navigation link sets per role portal.

use serde::Serialize;

use crate::identity::{has_permission, Permission, Principal};
use crate::routes::GuardRole;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavLink {
    pub label: &'static str,
    pub href: &'static str,
    /// Permission the link (and the page behind it) requires, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission: Option<Permission>,
}

const fn link(label: &'static str, href: &'static str, permission: Option<Permission>) -> NavLink {
    NavLink { label, href, permission }
}

static ADMIN_LINKS: &[NavLink] = &[
    link("Dashboard", "/admin/dashboard", None),
    link("Users", "/admin/users", Some(Permission::ShowUsersNav)),
    link("Roles", "/admin/roles", Some(Permission::ManageRoles)),
    link("Services", "/admin/services", Some(Permission::ShowSvcTab)),
    link("Finance", "/admin/finance", Some(Permission::ShowFinanceNav)),
];

static EXECUTIVE_LINKS: &[NavLink] = &[
    link("Dashboard", "/executive/dashboard", None),
    link("Prospects", "/executive/prospects", Some(Permission::ShowProspectsNav)),
    link("Registrations", "/executive/registrations", Some(Permission::ShowRegistrationNav)),
    link("Transactions", "/executive/transactions", Some(Permission::ShowTransactionsNav)),
    link("Services", "/executive/services", Some(Permission::ShowServicesNav)),
];

static EDITOR_LINKS: &[NavLink] = &[
    link("Dashboard", "/editor/dashboard", None),
    link("Journals", "/editor/journals", Some(Permission::ShowJournalsNav)),
    link("Submissions", "/editor/submissions", Some(Permission::ShowSubmissionsNav)),
];

static LEADS_LINKS: &[NavLink] = &[
    link("Dashboard", "/leads/dashboard", None),
    link("Leads", "/leads/leads", Some(Permission::ShowLeadsNav)),
    link("Follow-ups", "/leads/followups", Some(Permission::ShowFollowupsNav)),
];

static CLIENTS_LINKS: &[NavLink] = &[
    link("Dashboard", "/clients/dashboard", None),
    link("My Services", "/clients/services", None),
    link("Invoices", "/clients/invoices", None),
];

static AUTHOR_LINKS: &[NavLink] = &[
    link("Dashboard", "/author/dashboard", None),
    link("My Submissions", "/author/submissions", None),
    link("New Submission", "/author/submit", None),
];

/// Link set for a resolved role; an unrecognized role gets no links.
pub fn links_for(role: Option<GuardRole>) -> &'static [NavLink] {
    match role {
        Some(GuardRole::Admin) => ADMIN_LINKS,
        Some(GuardRole::Executive) => EXECUTIVE_LINKS,
        Some(GuardRole::Editor) => EDITOR_LINKS,
        Some(GuardRole::Leads) => LEADS_LINKS,
        Some(GuardRole::Clients) => CLIENTS_LINKS,
        Some(GuardRole::Author) => AUTHOR_LINKS,
        None => &[],
    }
}

/// Links of the role the principal may actually open.
pub fn visible_links(principal: &Principal, role: Option<GuardRole>) -> Vec<&'static NavLink> {
    links_for(role)
        .iter()
        .filter(|l| l.permission.map_or(true, |p| has_permission(principal, p)))
        .collect()
}
