//! gwaudit-audit - Workspace audit report pipelines
//!
//! Lists projects, users, groups and shared drives through the source
//! traits, enriches every item in batches and writes one CSV report per
//! pipeline. Apps Script ownership is searched per user through delegated
//! tokens. The reports directory is then zipped and optionally uploaded
//! to Drive.

pub mod archive;
pub mod context;
pub mod delegation;
pub mod pipeline;
pub mod records;
pub mod report;
pub mod runner;
pub mod source;

pub use archive::{archive_path, package, zip_directory};
pub use context::AuditContext;
pub use delegation::{CommandTokens, DelegatedDrive};
pub use pipeline::{
    APPS_SCRIPT_QUERY, PipelineSummary, analyze_users, apps_scripts, group_inventory,
    group_memberships, projects, shared_drives, users,
};
pub use records::Report;
pub use report::write_report;
pub use runner::RunSummary;
pub use source::{
    CloudSource, DelegatedTokens, DirectorySource, DriveSource, GoogleApis, ReportUploader,
    UserFilesSource,
};
