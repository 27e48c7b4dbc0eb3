use std::time::Instant;

use anyhow::{Context, Result};
use gwaudit_core::{assemble, fmt_num};

use super::PipelineSummary;
use crate::context::AuditContext;
use crate::records::{AppsScriptRecord, Report};
use crate::report::write_report;
use crate::source::{DirectorySource, UserFilesSource};

/// Drive search for standalone Apps Script projects the user owns.
pub const APPS_SCRIPT_QUERY: &str =
    "mimeType='application/vnd.google-apps.script' AND 'me' in owners";

/// Every Apps Script project owned by a user, written to
/// `userOwnedGoogleAppsScripts.csv`.
///
/// Each user's files are searched with that user's own credentials. A user
/// whose search failed contributes one row with the error in its notes.
pub async fn apps_scripts<D, F>(
    ctx: &AuditContext,
    directory: &D,
    files: &F,
) -> Result<PipelineSummary>
where
    D: DirectorySource,
    F: UserFilesSource,
{
    let start = Instant::now();
    let stage = ctx.progress.stage_line("apps scripts");

    stage.set_message("listing users...");
    log::info!("Pulling all users from the domain...");
    let users = directory.users().await.context("Error getting users")?;
    log::info!("Scanning {} users for Apps Scripts", fmt_num(users.len()));

    stage.set_message("searching user files...");
    let executor = ctx.executor("User Apps Scripts", ctx.batch.user_scripts, users.len());
    let src = files.clone();
    let result = executor
        .run(users, move |user| {
            let src = src.clone();
            async move { src.user_files(&user.primary_email, APPS_SCRIPT_QUERY).await }
        })
        .await;
    let failed_items = result.failure_count();

    let records: Vec<AppsScriptRecord> = assemble(result, |user, found| {
        AppsScriptRecord::rows(&user.primary_email, found.or_empty())
    })
    .into_iter()
    .flatten()
    .collect();
    let report = ctx.report_path(AppsScriptRecord::FILE_NAME);
    let rows = write_report(&report, &records)?;

    stage.finish_with_message(format!("{} scripts", fmt_num(rows)));
    Ok(PipelineSummary {
        name: "apps scripts",
        report,
        rows,
        failed_items,
        elapsed: start.elapsed(),
    })
}
