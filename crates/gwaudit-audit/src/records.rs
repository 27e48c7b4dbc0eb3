//! Report rows, one struct per CSV report.
//!
//! Field order is column order. Every record type is built from a top-level
//! item plus its [`Enrichment`], so a failed secondary fetch still yields a
//! row with the failure in its notes column.

use std::collections::BTreeMap;

use gwaudit_core::Enrichment;
use gwaudit_google::model::{
    Drive, DriveFile, Group, Permission, Project, ServiceAccount, Token, User,
};
use serde::{Deserialize, Serialize};

/// A CSV report: file name and fixed header row.
pub trait Report: Serialize {
    const FILE_NAME: &'static str;
    const HEADERS: &'static [&'static str];
}

fn note<R>(enrichment: &Enrichment<R>) -> String {
    enrichment.note().unwrap_or_default().to_string()
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

/// Service account as written into the projects report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAccountSummary {
    pub email: String,
    pub oauth_2_client_id: String,
    pub project_id: String,
    pub unique_id: String,
}

impl From<ServiceAccount> for ServiceAccountSummary {
    fn from(sa: ServiceAccount) -> Self {
        Self {
            email: sa.email,
            oauth_2_client_id: sa.oauth2_client_id,
            project_id: sa.project_id,
            unique_id: sa.unique_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectRecord {
    pub project_id: String,
    pub project_number: i64,
    pub project_name: String,
    /// JSON array of [`ServiceAccountSummary`].
    pub service_accounts: String,
    pub notes: String,
}

impl ProjectRecord {
    pub fn new(project: Project, accounts: Enrichment<Vec<ServiceAccount>>) -> Self {
        let notes = note(&accounts);
        let summaries: Vec<ServiceAccountSummary> = accounts
            .unwrap_or_default()
            .into_iter()
            .map(Into::into)
            .collect();
        Self {
            project_id: project.project_id,
            project_number: project.project_number,
            project_name: project.name,
            service_accounts: to_json(&summaries),
            notes,
        }
    }
}

impl Report for ProjectRecord {
    const FILE_NAME: &'static str = "projects.csv";
    const HEADERS: &'static [&'static str] = &[
        "project_id",
        "project_number",
        "project_name",
        "service_accounts",
        "notes",
    ];
}

/// One row of `users.csv`. Also read back by the offline token analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: String,
    pub primary_email: String,
    pub archived: bool,
    pub is_admin: bool,
    pub is_delegated_admin: bool,
    pub is_suspended: bool,
    pub last_login_time: String,
    pub is_mailbox_setup: bool,
    /// JSON array of tokens; empty when the token fetch failed.
    pub tokens: String,
    pub notes: String,
}

impl UserRecord {
    pub fn new(user: User, tokens: Enrichment<Vec<Token>>) -> Self {
        let notes = note(&tokens);
        let tokens = match tokens {
            Enrichment::Found(t) => to_json(&t),
            Enrichment::Empty => "[]".to_string(),
            Enrichment::Failed(_) => String::new(),
        };
        Self {
            user_id: user.id,
            primary_email: user.primary_email,
            archived: user.archived,
            is_admin: user.is_admin,
            is_delegated_admin: user.is_delegated_admin,
            is_suspended: user.suspended,
            last_login_time: user.last_login_time,
            is_mailbox_setup: user.is_mailbox_setup,
            tokens,
            notes,
        }
    }
}

impl Report for UserRecord {
    const FILE_NAME: &'static str = "users.csv";
    const HEADERS: &'static [&'static str] = &[
        "user_id",
        "primary_email",
        "archived",
        "is_admin",
        "is_delegated_admin",
        "is_suspended",
        "last_login_time",
        "is_mailbox_setup",
        "tokens",
        "notes",
    ];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupRecord {
    pub email: String,
    pub name: String,
    pub member_count: i64,
    pub admin_created: bool,
}

impl From<&Group> for GroupRecord {
    fn from(g: &Group) -> Self {
        Self {
            email: g.email.clone(),
            name: g.name.clone(),
            member_count: g.direct_members_count,
            admin_created: g.admin_created,
        }
    }
}

impl Report for GroupRecord {
    const FILE_NAME: &'static str = "groups.csv";
    const HEADERS: &'static [&'static str] = &["email", "name", "member_count", "admin_created"];
}

/// Owners, managers and parent groups of one group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupMembership {
    pub owners: Vec<String>,
    pub managers: Vec<String>,
    pub subscriptions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct GroupMapRecord {
    pub group_email: String,
    pub members_count: i64,
    pub owner_count: usize,
    pub owners: String,
    pub manager_count: usize,
    pub managers: String,
    pub sub_count: usize,
    pub subscriptions: String,
    pub notes: String,
}

impl GroupMapRecord {
    pub fn new(group: Group, membership: Enrichment<GroupMembership>) -> Self {
        let notes = note(&membership);
        let m = membership.unwrap_or_default();
        Self {
            group_email: group.email,
            members_count: group.direct_members_count,
            owner_count: m.owners.len(),
            owners: m.owners.join(","),
            manager_count: m.managers.len(),
            managers: m.managers.join(","),
            sub_count: m.subscriptions.len(),
            subscriptions: m.subscriptions.join(","),
            notes,
        }
    }
}

impl Report for GroupMapRecord {
    const FILE_NAME: &'static str = "groupsMap.csv";
    const HEADERS: &'static [&'static str] = &[
        "GROUP_EMAIL",
        "MEMBERS_COUNT",
        "OWNER_COUNT",
        "OWNERS",
        "MANAGER_COUNT",
        "MANAGERS",
        "SUB_COUNT",
        "SUBSCRIPTIONS",
        "NOTES",
    ];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct SharedDriveRecord {
    pub drive_id: String,
    pub drive_name: String,
    pub owner_count: usize,
    pub organizer_count: usize,
    pub file_organizer_count: usize,
    pub writer_count: usize,
    pub commenter_count: usize,
    pub reader_count: usize,
    /// JSON object of group email to role; empty when no group has access.
    pub groups: String,
    pub notes: String,
}

impl SharedDriveRecord {
    pub fn new(drive: Drive, perms: Enrichment<Vec<Permission>>) -> Self {
        let notes = note(&perms);
        let perms = perms.unwrap_or_default();
        let count = |role: &str| perms.iter().filter(|p| p.role == role).count();

        let groups: BTreeMap<&str, &str> = perms
            .iter()
            .filter(|p| p.grantee_type == "group")
            .map(|p| (p.email_address.as_str(), p.role.as_str()))
            .collect();
        let groups = if groups.is_empty() {
            String::new()
        } else {
            to_json(&groups)
        };

        Self {
            owner_count: count("owner"),
            organizer_count: count("organizer"),
            file_organizer_count: count("fileOrganizer"),
            writer_count: count("writer"),
            commenter_count: count("commenter"),
            reader_count: count("reader"),
            drive_id: drive.id,
            drive_name: drive.name,
            groups,
            notes,
        }
    }
}

impl Report for SharedDriveRecord {
    const FILE_NAME: &'static str = "sharedDrivesMap.csv";
    const HEADERS: &'static [&'static str] = &[
        "DRIVE_ID",
        "DRIVE_NAME",
        "OWNER_COUNT",
        "ORGANIZER_COUNT",
        "FILE_ORGANIZER_COUNT",
        "WRITER_COUNT",
        "COMMENTER_COUNT",
        "READER_COUNT",
        "GROUPS",
        "NOTES",
    ];
}

/// One Apps Script project owned by a user. A user whose search failed
/// gets a single row carrying the error instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppsScriptRecord {
    pub owner: String,
    pub file_id: String,
    pub file_name: String,
    pub created: String,
    pub last_viewed: String,
    pub shared: bool,
    pub team_drive_id: String,
    pub notes: String,
}

impl AppsScriptRecord {
    pub fn new(user_email: &str, file: DriveFile) -> Self {
        let owner = file
            .owners
            .into_iter()
            .next()
            .map(|o| o.email_address)
            .unwrap_or_else(|| user_email.to_string());
        Self {
            owner,
            file_id: file.id,
            file_name: file.name,
            created: file.created_time,
            last_viewed: file.viewed_by_me_time,
            shared: file.shared,
            team_drive_id: file.drive_id,
            notes: String::new(),
        }
    }

    pub fn failed(user_email: &str, note: &str) -> Self {
        Self {
            owner: user_email.to_string(),
            file_id: String::new(),
            file_name: String::new(),
            created: String::new(),
            last_viewed: String::new(),
            shared: false,
            team_drive_id: String::new(),
            notes: note.to_string(),
        }
    }

    /// All rows for one user's search outcome.
    pub fn rows(user_email: &str, files: Enrichment<Vec<DriveFile>>) -> Vec<Self> {
        match files {
            Enrichment::Found(files) => files
                .into_iter()
                .map(|f| Self::new(user_email, f))
                .collect(),
            Enrichment::Empty => Vec::new(),
            Enrichment::Failed(note) => vec![Self::failed(user_email, &note)],
        }
    }
}

impl Report for AppsScriptRecord {
    const FILE_NAME: &'static str = "userOwnedGoogleAppsScripts.csv";
    const HEADERS: &'static [&'static str] = &[
        "OWNER",
        "FILE_ID",
        "FILE_NAME",
        "CREATED",
        "LAST_VIEWED",
        "SHARED",
        "TEAM_DRIVE_ID",
        "NOTES",
    ];
}

/// One (user, token) pair from the offline analysis of `users.csv`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRow {
    pub user_email: String,
    pub archived: bool,
    pub is_admin: bool,
    pub is_delegated_admin: bool,
    pub suspended: bool,
    pub last_login_time: String,
    pub is_mailbox_setup: bool,
    #[serde(rename = "clientID")]
    pub client_id: String,
    pub display_text: String,
    pub kind: String,
    /// Space-separated, bracketed scope list.
    pub scopes: String,
}

impl TokenRow {
    pub fn new(user: &UserRecord, token: Token) -> Self {
        Self {
            user_email: user.primary_email.clone(),
            archived: user.archived,
            is_admin: user.is_admin,
            is_delegated_admin: user.is_delegated_admin,
            suspended: user.is_suspended,
            last_login_time: user.last_login_time.clone(),
            is_mailbox_setup: user.is_mailbox_setup,
            client_id: token.client_id,
            display_text: token.display_text,
            kind: token.kind,
            scopes: format!("[{}]", token.scopes.join(" ")),
        }
    }
}

impl Report for TokenRow {
    const FILE_NAME: &'static str = "output.csv";
    const HEADERS: &'static [&'static str] = &[
        "userEmail",
        "archived",
        "isAdmin",
        "isDelegatedAdmin",
        "suspended",
        "lastLoginTime",
        "isMailboxSetup",
        "clientID",
        "displayText",
        "kind",
        "scopes",
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perm(kind: &str, role: &str, email: &str) -> Permission {
        Permission {
            grantee_type: kind.into(),
            role: role.into(),
            email_address: email.into(),
            ..Default::default()
        }
    }

    #[test]
    fn failed_project_keeps_row_with_note() {
        let project = Project {
            project_id: "audit-prod".into(),
            project_number: 42,
            name: "Audit".into(),
            ..Default::default()
        };
        let rec = ProjectRecord::new(
            project,
            Enrichment::Failed("googleapi: Error 403: denied".into()),
        );
        assert_eq!(rec.project_id, "audit-prod");
        assert_eq!(rec.service_accounts, "[]");
        assert_eq!(rec.notes, "googleapi: Error 403: denied");
    }

    #[test]
    fn service_accounts_use_report_keys() {
        let sa = ServiceAccount {
            email: "sa@p.iam.gserviceaccount.com".into(),
            oauth2_client_id: "123".into(),
            ..Default::default()
        };
        let rec = ProjectRecord::new(Project::default(), Enrichment::Found(vec![sa]));
        assert!(rec.service_accounts.contains("\"oauth_2_client_id\":\"123\""));
        assert!(rec.notes.is_empty());
    }

    #[test]
    fn user_tokens_column_by_outcome() {
        let user = User {
            primary_email: "ada@example.com".into(),
            ..Default::default()
        };
        let empty = UserRecord::new(user.clone(), Enrichment::Empty);
        assert_eq!(empty.tokens, "[]");
        let failed = UserRecord::new(user, Enrichment::Failed("boom".into()));
        assert_eq!(failed.tokens, "");
        assert_eq!(failed.notes, "boom");
    }

    #[test]
    fn script_rows_per_outcome() {
        let file = DriveFile {
            id: "1AbC".into(),
            name: "Mail merge".into(),
            shared: true,
            ..Default::default()
        };
        let rows = AppsScriptRecord::rows("ada@example.com", Enrichment::Found(vec![file]));
        assert_eq!(rows.len(), 1);
        // No owner list in the response: the searched user owns it.
        assert_eq!(rows[0].owner, "ada@example.com");
        assert!(rows[0].shared);

        assert!(AppsScriptRecord::rows("ada@example.com", Enrichment::Empty).is_empty());

        let failed = AppsScriptRecord::rows(
            "ada@example.com",
            Enrichment::Failed("token command failed".into()),
        );
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].file_id, "");
        assert_eq!(failed[0].notes, "token command failed");
    }

    #[test]
    fn drive_roles_counted_and_groups_mapped() {
        let drive = Drive {
            id: "0A1".into(),
            name: "Finance".into(),
        };
        let perms = vec![
            perm("user", "organizer", "ada@example.com"),
            perm("group", "writer", "eng@example.com"),
            perm("group", "reader", "all@example.com"),
            perm("domain", "reader", ""),
        ];
        let rec = SharedDriveRecord::new(drive, Enrichment::Found(perms));
        assert_eq!(rec.organizer_count, 1);
        assert_eq!(rec.writer_count, 1);
        assert_eq!(rec.reader_count, 2);
        assert_eq!(rec.owner_count, 0);
        assert_eq!(
            rec.groups,
            r#"{"all@example.com":"reader","eng@example.com":"writer"}"#
        );
    }

    #[test]
    fn drive_without_groups_has_empty_groups_column() {
        let rec = SharedDriveRecord::new(Drive::default(), Enrichment::Empty);
        assert_eq!(rec.groups, "");
        assert_eq!(rec.reader_count, 0);
    }

    #[test]
    fn group_map_joins_emails() {
        let group = Group {
            email: "eng@example.com".into(),
            direct_members_count: 12,
            ..Default::default()
        };
        let m = GroupMembership {
            owners: vec!["a@x".into(), "b@x".into()],
            managers: vec![],
            subscriptions: vec!["all@x".into()],
        };
        let rec = GroupMapRecord::new(group, Enrichment::Found(m));
        assert_eq!(rec.owners, "a@x,b@x");
        assert_eq!(rec.owner_count, 2);
        assert_eq!(rec.manager_count, 0);
        assert_eq!(rec.sub_count, 1);
    }

    #[test]
    fn token_scopes_formatted_like_a_list() {
        let user = UserRecord::new(User::default(), Enrichment::Empty);
        let token = Token {
            client_id: "123.apps".into(),
            scopes: vec!["email".into(), "profile".into()],
            ..Default::default()
        };
        assert_eq!(TokenRow::new(&user, token).scopes, "[email profile]");
    }
}
