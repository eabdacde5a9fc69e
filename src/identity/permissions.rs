//! Closed registry of permission identifiers.
//! Identifiers are stable snake_case strings; matching anywhere in the portal is exact string equality.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role domain a permission belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionGroup {
    Executive,
    Editor,
    Admin,
    Leads,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    // executive
    ShowProspectsNav,
    CreateProspect,
    EditProspect,
    ShowRegistrationNav,
    ShowTransactionsNav,
    CreateTransaction,
    ShowServicesNav,
    // editor
    ShowJournalsNav,
    ShowSubmissionsNav,
    AssignReviewer,
    UpdateSubmissionStatus,
    // admin
    ShowUsersNav,
    CreateUser,
    ManageRoles,
    ShowSvcTab,
    ManageServices,
    ShowFinanceNav,
    // leads
    ShowLeadsNav,
    ConvertLead,
    AssignLead,
    ShowFollowupsNav,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown permission '{0}'")]
pub struct UnknownPermission(pub String);

impl Permission {
    pub const ALL: [Permission; 21] = [
        Permission::ShowProspectsNav,
        Permission::CreateProspect,
        Permission::EditProspect,
        Permission::ShowRegistrationNav,
        Permission::ShowTransactionsNav,
        Permission::CreateTransaction,
        Permission::ShowServicesNav,
        Permission::ShowJournalsNav,
        Permission::ShowSubmissionsNav,
        Permission::AssignReviewer,
        Permission::UpdateSubmissionStatus,
        Permission::ShowUsersNav,
        Permission::CreateUser,
        Permission::ManageRoles,
        Permission::ShowSvcTab,
        Permission::ManageServices,
        Permission::ShowFinanceNav,
        Permission::ShowLeadsNav,
        Permission::ConvertLead,
        Permission::AssignLead,
        Permission::ShowFollowupsNav,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ShowProspectsNav => "show_prospects_nav",
            Permission::CreateProspect => "create_prospect",
            Permission::EditProspect => "edit_prospect",
            Permission::ShowRegistrationNav => "show_registration_nav",
            Permission::ShowTransactionsNav => "show_transactions_nav",
            Permission::CreateTransaction => "create_transaction",
            Permission::ShowServicesNav => "show_services_nav",
            Permission::ShowJournalsNav => "show_journals_nav",
            Permission::ShowSubmissionsNav => "show_submissions_nav",
            Permission::AssignReviewer => "assign_reviewer",
            Permission::UpdateSubmissionStatus => "update_submission_status",
            Permission::ShowUsersNav => "show_users_nav",
            Permission::CreateUser => "create_user",
            Permission::ManageRoles => "manage_roles",
            Permission::ShowSvcTab => "show_svc_tab",
            Permission::ManageServices => "manage_services",
            Permission::ShowFinanceNav => "show_finance_nav",
            Permission::ShowLeadsNav => "show_leads_nav",
            Permission::ConvertLead => "convert_lead",
            Permission::AssignLead => "assign_lead",
            Permission::ShowFollowupsNav => "show_followups_nav",
        }
    }

    pub fn group(&self) -> PermissionGroup {
        use Permission::*;
        match self {
            ShowProspectsNav | CreateProspect | EditProspect | ShowRegistrationNav
            | ShowTransactionsNav | CreateTransaction | ShowServicesNav => PermissionGroup::Executive,
            ShowJournalsNav | ShowSubmissionsNav | AssignReviewer | UpdateSubmissionStatus => PermissionGroup::Editor,
            ShowUsersNav | CreateUser | ManageRoles | ShowSvcTab | ManageServices | ShowFinanceNav => PermissionGroup::Admin,
            ShowLeadsNav | ConvertLead | AssignLead | ShowFollowupsNav => PermissionGroup::Leads,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Permission::ShowProspectsNav => "See the prospects section in navigation",
            Permission::CreateProspect => "Record a new prospect",
            Permission::EditProspect => "Edit an existing prospect",
            Permission::ShowRegistrationNav => "See the registrations section in navigation",
            Permission::ShowTransactionsNav => "See the transactions section in navigation",
            Permission::CreateTransaction => "Record a finance transaction",
            Permission::ShowServicesNav => "See the service catalog in navigation",
            Permission::ShowJournalsNav => "See the journals section in navigation",
            Permission::ShowSubmissionsNav => "See the submissions section in navigation",
            Permission::AssignReviewer => "Assign a reviewer to a submission",
            Permission::UpdateSubmissionStatus => "Move a submission to another status",
            Permission::ShowUsersNav => "See the users section in navigation",
            Permission::CreateUser => "Create portal users",
            Permission::ManageRoles => "Create and edit roles",
            Permission::ShowSvcTab => "See the services tab",
            Permission::ManageServices => "Edit the service catalog",
            Permission::ShowFinanceNav => "See the finance section in navigation",
            Permission::ShowLeadsNav => "See the leads section in navigation",
            Permission::ConvertLead => "Convert a lead into a client",
            Permission::AssignLead => "Assign a lead to a conversion agent",
            Permission::ShowFollowupsNav => "See the follow-ups section in navigation",
        }
    }

    pub fn in_group(group: PermissionGroup) -> impl Iterator<Item = Permission> {
        Permission::ALL.into_iter().filter(move |p| p.group() == group)
    }
}

impl AsRef<str> for Permission {
    fn as_ref(&self) -> &str { self.as_str() }
}

impl Display for Permission {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = UnknownPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownPermission(s.to_string()))
    }
}
