//! End-to-end pipeline runs against in-memory sources.

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use gwaudit_audit::{
    APPS_SCRIPT_QUERY, AuditContext, CloudSource, DirectorySource, DriveSource, UserFilesSource,
    apps_scripts, group_memberships, projects, runner, shared_drives, users,
};
use gwaudit_core::FetchError;
use gwaudit_google::model::{
    Drive, DriveFile, FileOwner, Group, Member, Permission, Project, ServiceAccount, Token, User,
};

type Lookup<T> = Arc<HashMap<String, Result<Vec<T>, String>>>;

fn lookup<T>(entries: Vec<(&str, Result<Vec<T>, String>)>) -> Lookup<T> {
    Arc::new(entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
}

fn answer<T: Clone>(table: &Lookup<T>, key: &str) -> Result<Vec<T>, FetchError> {
    match table.get(key) {
        Some(Ok(v)) => Ok(v.clone()),
        Some(Err(msg)) => Err(FetchError::Fatal(msg.clone())),
        None => Ok(Vec::new()),
    }
}

#[derive(Clone, Default)]
struct Fixture {
    projects: Option<Arc<Vec<Project>>>,
    accounts: Lookup<ServiceAccount>,
    users: Option<Arc<Vec<User>>>,
    tokens: Lookup<Token>,
    groups: Option<Arc<Vec<Group>>>,
    /// Keyed by `"<group>/<ROLE>"`.
    members: Lookup<Member>,
    subscriptions: Lookup<Group>,
    drives: Option<Arc<Vec<Drive>>>,
    permissions: Lookup<Permission>,
    /// Keyed by user email; only answers the Apps Script search.
    user_files: Lookup<DriveFile>,
}

fn listing<T: Clone>(data: &Option<Arc<Vec<T>>>) -> Result<Vec<T>, FetchError> {
    data.as_ref()
        .map(|v| v.as_ref().clone())
        .ok_or_else(|| FetchError::Fatal("googleapi: Error 403: Forbidden, forbidden".into()))
}

impl CloudSource for Fixture {
    fn projects(&self) -> impl Future<Output = Result<Vec<Project>, FetchError>> + Send {
        let out = listing(&self.projects);
        async move { out }
    }

    fn service_accounts(
        &self,
        project_id: &str,
    ) -> impl Future<Output = Result<Vec<ServiceAccount>, FetchError>> + Send {
        let out = answer(&self.accounts, project_id);
        async move { out }
    }
}

impl DirectorySource for Fixture {
    fn users(&self) -> impl Future<Output = Result<Vec<User>, FetchError>> + Send {
        let out = listing(&self.users);
        async move { out }
    }

    fn user_tokens(
        &self,
        user_key: &str,
    ) -> impl Future<Output = Result<Vec<Token>, FetchError>> + Send {
        let out = answer(&self.tokens, user_key);
        async move { out }
    }

    fn groups(&self) -> impl Future<Output = Result<Vec<Group>, FetchError>> + Send {
        let out = listing(&self.groups);
        async move { out }
    }

    fn members(
        &self,
        group_key: &str,
        role: &str,
    ) -> impl Future<Output = Result<Vec<Member>, FetchError>> + Send {
        let out = answer(&self.members, &format!("{group_key}/{role}"));
        async move { out }
    }

    fn subscriptions(
        &self,
        member_key: &str,
    ) -> impl Future<Output = Result<Vec<Group>, FetchError>> + Send {
        let out = answer(&self.subscriptions, member_key);
        async move { out }
    }
}

impl DriveSource for Fixture {
    fn shared_drives(&self) -> impl Future<Output = Result<Vec<Drive>, FetchError>> + Send {
        let out = listing(&self.drives);
        async move { out }
    }

    fn permissions(
        &self,
        drive_id: &str,
    ) -> impl Future<Output = Result<Vec<Permission>, FetchError>> + Send {
        let out = answer(&self.permissions, drive_id);
        async move { out }
    }
}

impl UserFilesSource for Fixture {
    fn user_files(
        &self,
        user_email: &str,
        query: &str,
    ) -> impl Future<Output = Result<Vec<DriveFile>, FetchError>> + Send {
        let out = if query == APPS_SCRIPT_QUERY {
            answer(&self.user_files, user_email)
        } else {
            Err(FetchError::Fatal(format!("unexpected query {query}")))
        };
        async move { out }
    }
}

fn read_rows(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers = reader.headers().unwrap().iter().map(String::from).collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect();
    (headers, rows)
}

fn column<'a>(headers: &[String], row: &'a [String], name: &str) -> &'a str {
    let idx = headers.iter().position(|h| h == name).unwrap();
    &row[idx]
}

fn project(id: &str) -> Project {
    Project {
        project_id: id.to_string(),
        project_number: 42,
        name: format!("{id} name"),
        lifecycle_state: "ACTIVE".to_string(),
    }
}

fn user(email: &str) -> User {
    User {
        id: format!("id-{email}"),
        primary_email: email.to_string(),
        ..Default::default()
    }
}

fn group(email: &str, count: i64) -> Group {
    Group {
        email: email.to_string(),
        name: email.to_string(),
        direct_members_count: count,
        ..Default::default()
    }
}

fn member(email: &str) -> Member {
    Member {
        email: email.to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn failed_service_account_fetch_still_writes_project_row() {
    let tmp = tempfile::tempdir().unwrap();
    let mut ctx = AuditContext::new(tmp.path());
    ctx.batch.project_service_accounts = 2;

    let source = Fixture {
        projects: Some(Arc::new(vec![project("p1"), project("p2"), project("p3")])),
        accounts: lookup(vec![
            (
                "p1",
                Ok(vec![ServiceAccount {
                    email: "sa@p1.iam".to_string(),
                    ..Default::default()
                }]),
            ),
            ("p2", Err("googleapi: Error 403: IAM disabled".to_string())),
        ]),
        ..Default::default()
    };

    let summary = projects(&ctx, &source).await.unwrap();
    assert_eq!(summary.rows, 3);
    assert_eq!(summary.failed_items, 1);

    let (headers, rows) = read_rows(&summary.report);
    let ids: Vec<&str> = rows.iter().map(|r| column(&headers, r, "project_id")).collect();
    assert_eq!(ids, vec!["p1", "p2", "p3"]);
    assert!(column(&headers, &rows[0], "service_accounts").contains("sa@p1.iam"));
    assert_eq!(column(&headers, &rows[1], "service_accounts"), "[]");
    assert_eq!(
        column(&headers, &rows[1], "notes"),
        "googleapi: Error 403: IAM disabled"
    );
    assert_eq!(column(&headers, &rows[2], "notes"), "");
}

#[tokio::test]
async fn users_report_distinguishes_empty_and_failed_tokens() {
    let tmp = tempfile::tempdir().unwrap();
    let ctx = AuditContext::new(tmp.path());
    let source = Fixture {
        users: Some(Arc::new(vec![user("a@x"), user("b@x"), user("c@x")])),
        tokens: lookup(vec![
            (
                "a@x",
                Ok(vec![Token {
                    client_id: "client-1".to_string(),
                    ..Default::default()
                }]),
            ),
            ("c@x", Err("googleapi: Error 500: backend".to_string())),
        ]),
        ..Default::default()
    };

    let summary = users(&ctx, &source).await.unwrap();
    assert_eq!(summary.rows, 3);

    let (headers, rows) = read_rows(&summary.report);
    assert!(column(&headers, &rows[0], "tokens").contains("client-1"));
    assert_eq!(column(&headers, &rows[1], "tokens"), "[]");
    assert_eq!(column(&headers, &rows[2], "tokens"), "");
    assert_eq!(
        column(&headers, &rows[2], "notes"),
        "googleapi: Error 500: backend"
    );
}

#[tokio::test]
async fn listing_failure_aborts_only_that_pipeline() {
    let tmp = tempfile::tempdir().unwrap();
    let ctx = AuditContext::new(tmp.path());
    let source = Fixture {
        projects: Some(Arc::new(vec![project("p1")])),
        users: None,
        groups: Some(Arc::new(vec![group("g@x", 3)])),
        ..Default::default()
    };

    let summary = runner::inventory(&ctx, &source).await;
    assert!(!summary.is_success());
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].0, "users");
    assert!(summary.failed[0].1.contains("403"));

    let names: Vec<&str> = summary.completed.iter().map(|s| s.name).collect();
    assert_eq!(names, vec!["projects", "groups"]);
    assert!(tmp.path().join("projects.csv").exists());
    assert!(tmp.path().join("groups.csv").exists());
    assert!(!tmp.path().join("users.csv").exists());
}

#[tokio::test]
async fn group_map_is_sorted_by_member_count() {
    let tmp = tempfile::tempdir().unwrap();
    let ctx = AuditContext::new(tmp.path());
    let source = Fixture {
        groups: Some(Arc::new(vec![
            group("small@x", 2),
            group("big@x", 50),
            group("mid@x", 10),
        ])),
        members: lookup(vec![
            ("big@x/OWNER", Ok(vec![member("o1@x"), member("o2@x")])),
            ("big@x/MANAGER", Ok(vec![member("m1@x")])),
            ("mid@x/OWNER", Err("googleapi: Error 404: gone".to_string())),
        ]),
        subscriptions: lookup(vec![("small@x", Ok(vec![group("parent@x", 9)]))]),
        ..Default::default()
    };

    let summary = group_memberships(&ctx, &source).await.unwrap();
    assert_eq!(summary.rows, 3);
    assert_eq!(summary.failed_items, 1);

    let (headers, rows) = read_rows(&summary.report);
    let order: Vec<&str> = rows.iter().map(|r| column(&headers, r, "GROUP_EMAIL")).collect();
    assert_eq!(order, vec!["big@x", "mid@x", "small@x"]);

    assert_eq!(column(&headers, &rows[0], "OWNER_COUNT"), "2");
    assert_eq!(column(&headers, &rows[0], "OWNERS"), "o1@x,o2@x");
    assert_eq!(column(&headers, &rows[0], "MANAGERS"), "m1@x");
    assert_eq!(
        column(&headers, &rows[1], "NOTES"),
        "owners: googleapi: Error 404: gone"
    );
    assert_eq!(column(&headers, &rows[2], "SUBSCRIPTIONS"), "parent@x");
}

#[tokio::test]
async fn shared_drive_roles_are_counted() {
    let tmp = tempfile::tempdir().unwrap();
    let ctx = AuditContext::new(tmp.path());
    let perm = |kind: &str, role: &str, email: &str| Permission {
        grantee_type: kind.to_string(),
        role: role.to_string(),
        email_address: email.to_string(),
        ..Default::default()
    };
    let source = Fixture {
        drives: Some(Arc::new(vec![
            Drive {
                id: "d1".to_string(),
                name: "Finance".to_string(),
            },
            Drive {
                id: "d2".to_string(),
                name: "Legal".to_string(),
            },
        ])),
        permissions: lookup(vec![(
            "d1",
            Ok(vec![
                perm("user", "organizer", "a@x"),
                perm("group", "writer", "team@x"),
                perm("user", "reader", "b@x"),
            ]),
        )]),
        ..Default::default()
    };

    let summary = shared_drives(&ctx, &source).await.unwrap();
    let (headers, rows) = read_rows(&summary.report);
    assert_eq!(rows.len(), 2);
    assert_eq!(column(&headers, &rows[0], "ORGANIZER_COUNT"), "1");
    assert_eq!(column(&headers, &rows[0], "WRITER_COUNT"), "1");
    assert_eq!(column(&headers, &rows[0], "READER_COUNT"), "1");
    assert_eq!(column(&headers, &rows[0], "GROUPS"), r#"{"team@x":"writer"}"#);
    assert_eq!(column(&headers, &rows[1], "OWNER_COUNT"), "0");
    assert_eq!(column(&headers, &rows[1], "GROUPS"), "");
}

#[tokio::test]
async fn cancelled_run_still_writes_every_row() {
    let tmp = tempfile::tempdir().unwrap();
    let ctx = AuditContext::new(tmp.path());
    ctx.cancel.cancel();
    let source = Fixture {
        users: Some(Arc::new(vec![user("a@x"), user("b@x")])),
        ..Default::default()
    };

    let summary = users(&ctx, &source).await.unwrap();
    assert_eq!(summary.rows, 2);
    assert_eq!(summary.failed_items, 2);

    let (headers, rows) = read_rows(&summary.report);
    assert_eq!(column(&headers, &rows[0], "notes"), "cancelled before start");
}

#[tokio::test]
async fn apps_scripts_one_row_per_script_and_failed_user() {
    let tmp = tempfile::tempdir().unwrap();
    let mut ctx = AuditContext::new(tmp.path());
    ctx.batch.user_scripts = 2;

    let script = |id: &str, owner: &str| DriveFile {
        id: id.to_string(),
        name: format!("{id} project"),
        owners: vec![FileOwner {
            email_address: owner.to_string(),
            ..Default::default()
        }],
        created_time: "2023-01-01T00:00:00.000Z".to_string(),
        shared: id == "s2",
        ..Default::default()
    };
    let source = Fixture {
        users: Some(Arc::new(vec![user("a@x"), user("b@x"), user("c@x")])),
        user_files: lookup(vec![
            ("a@x", Ok(vec![script("s1", "a@x"), script("s2", "a@x")])),
            ("c@x", Err("token command failed for c@x".to_string())),
        ]),
        ..Default::default()
    };

    let summary = apps_scripts(&ctx, &source, &source).await.unwrap();
    assert_eq!(summary.rows, 3);
    assert_eq!(summary.failed_items, 1);
    assert!(summary.report.ends_with("userOwnedGoogleAppsScripts.csv"));

    let (headers, rows) = read_rows(&summary.report);
    assert_eq!(
        headers,
        vec![
            "OWNER",
            "FILE_ID",
            "FILE_NAME",
            "CREATED",
            "LAST_VIEWED",
            "SHARED",
            "TEAM_DRIVE_ID",
            "NOTES"
        ]
    );
    let ids: Vec<&str> = rows.iter().map(|r| column(&headers, r, "FILE_ID")).collect();
    assert_eq!(ids, vec!["s1", "s2", ""]);
    assert_eq!(column(&headers, &rows[1], "SHARED"), "true");
    assert_eq!(column(&headers, &rows[2], "OWNER"), "c@x");
    assert_eq!(
        column(&headers, &rows[2], "NOTES"),
        "token command failed for c@x"
    );
}

#[tokio::test]
async fn apps_scripts_need_the_user_listing() {
    let tmp = tempfile::tempdir().unwrap();
    let ctx = AuditContext::new(tmp.path());
    let source = Fixture::default();

    let summary = runner::apps_scripts(&ctx, &source, &source).await;
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].0, "apps scripts");
    assert!(!tmp.path().join("userOwnedGoogleAppsScripts.csv").exists());
}
