//! Data sources the pipelines read from.
//!
//! Pipelines are generic over these traits so they can be driven by the
//! Google adapters in production and by in-memory fixtures in tests.

use std::future::Future;

use gwaudit_core::FetchError;
use gwaudit_google::model::{
    Drive, DriveFile, Group, Member, Permission, Project, ServiceAccount, Token, User,
};
use gwaudit_google::{DirectoryApi, DriveApi, GoogleClient, IamApi, ResourceManagerApi};

use crate::context::AuditContext;

/// Cloud projects and their service accounts.
pub trait CloudSource: Clone + Send + Sync + 'static {
    fn projects(&self) -> impl Future<Output = Result<Vec<Project>, FetchError>> + Send;

    fn service_accounts(
        &self,
        project_id: &str,
    ) -> impl Future<Output = Result<Vec<ServiceAccount>, FetchError>> + Send;
}

/// Directory users, groups and their relations.
pub trait DirectorySource: Clone + Send + Sync + 'static {
    fn users(&self) -> impl Future<Output = Result<Vec<User>, FetchError>> + Send;

    fn user_tokens(
        &self,
        user_key: &str,
    ) -> impl Future<Output = Result<Vec<Token>, FetchError>> + Send;

    fn groups(&self) -> impl Future<Output = Result<Vec<Group>, FetchError>> + Send;

    /// Members of `group_key` holding `role` (`OWNER`, `MANAGER`, `MEMBER`).
    fn members(
        &self,
        group_key: &str,
        role: &str,
    ) -> impl Future<Output = Result<Vec<Member>, FetchError>> + Send;

    /// Groups `member_key` is itself a member of.
    fn subscriptions(
        &self,
        member_key: &str,
    ) -> impl Future<Output = Result<Vec<Group>, FetchError>> + Send;
}

/// Shared drives and their permissions.
pub trait DriveSource: Clone + Send + Sync + 'static {
    fn shared_drives(&self) -> impl Future<Output = Result<Vec<Drive>, FetchError>> + Send;

    fn permissions(
        &self,
        drive_id: &str,
    ) -> impl Future<Output = Result<Vec<Permission>, FetchError>> + Send;
}

/// Files owned by individual users, searched with each user's own
/// credentials.
pub trait UserFilesSource: Clone + Send + Sync + 'static {
    /// Files visible to `user_email` matching the Drive search `query`.
    fn user_files(
        &self,
        user_email: &str,
        query: &str,
    ) -> impl Future<Output = Result<Vec<DriveFile>, FetchError>> + Send;
}

/// Access tokens issued on behalf of a single user (domain-wide delegation).
pub trait DelegatedTokens: Clone + Send + Sync + 'static {
    fn token_for(&self, subject: &str) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// Destination of the packaged reports.
pub trait ReportUploader {
    fn upload_report(
        &self,
        data: Vec<u8>,
        name: &str,
        folder: &str,
    ) -> impl Future<Output = Result<DriveFile, FetchError>> + Send;
}

/// The Google adapters for one run, each with its own retry policy.
#[derive(Debug, Clone)]
pub struct GoogleApis {
    pub directory: DirectoryApi,
    pub resource_manager: ResourceManagerApi,
    pub iam: IamApi,
    pub drive: DriveApi,
}

impl GoogleApis {
    pub fn new(client: GoogleClient, ctx: &AuditContext) -> Self {
        Self {
            directory: DirectoryApi::new(
                client.clone(),
                ctx.customer_id.clone(),
                ctx.fetcher("directory", ctx.retry.directory),
            ),
            resource_manager: ResourceManagerApi::new(
                client.clone(),
                ctx.fetcher("resource manager", ctx.retry.resource_manager),
            ),
            iam: IamApi::new(client.clone(), ctx.fetcher("iam", ctx.retry.iam)),
            drive: DriveApi::new(client, ctx.fetcher("drive", ctx.retry.drive)),
        }
    }
}

impl CloudSource for GoogleApis {
    fn projects(&self) -> impl Future<Output = Result<Vec<Project>, FetchError>> + Send {
        self.resource_manager.projects()
    }

    fn service_accounts(
        &self,
        project_id: &str,
    ) -> impl Future<Output = Result<Vec<ServiceAccount>, FetchError>> + Send {
        self.iam.service_accounts(project_id)
    }
}

impl DirectorySource for GoogleApis {
    fn users(&self) -> impl Future<Output = Result<Vec<User>, FetchError>> + Send {
        self.directory.users("")
    }

    fn user_tokens(
        &self,
        user_key: &str,
    ) -> impl Future<Output = Result<Vec<Token>, FetchError>> + Send {
        self.directory.user_tokens(user_key)
    }

    fn groups(&self) -> impl Future<Output = Result<Vec<Group>, FetchError>> + Send {
        self.directory.groups("")
    }

    fn members(
        &self,
        group_key: &str,
        role: &str,
    ) -> impl Future<Output = Result<Vec<Member>, FetchError>> + Send {
        self.directory.members(group_key, Some(role))
    }

    fn subscriptions(
        &self,
        member_key: &str,
    ) -> impl Future<Output = Result<Vec<Group>, FetchError>> + Send {
        self.directory.subscriptions(member_key)
    }
}

impl DriveSource for GoogleApis {
    fn shared_drives(&self) -> impl Future<Output = Result<Vec<Drive>, FetchError>> + Send {
        self.drive.shared_drives()
    }

    fn permissions(
        &self,
        drive_id: &str,
    ) -> impl Future<Output = Result<Vec<Permission>, FetchError>> + Send {
        self.drive.permissions(drive_id)
    }
}

impl ReportUploader for GoogleApis {
    fn upload_report(
        &self,
        data: Vec<u8>,
        name: &str,
        folder: &str,
    ) -> impl Future<Output = Result<DriveFile, FetchError>> + Send {
        self.drive.upload(data, name, folder)
    }
}
