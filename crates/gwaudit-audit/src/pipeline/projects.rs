use std::time::Instant;

use anyhow::{Context, Result};
use gwaudit_core::{assemble, fmt_num};

use super::PipelineSummary;
use crate::context::AuditContext;
use crate::records::{ProjectRecord, Report};
use crate::report::write_report;
use crate::source::CloudSource;

/// Every project with its service accounts, written to `projects.csv`.
pub async fn projects<S: CloudSource>(ctx: &AuditContext, source: &S) -> Result<PipelineSummary> {
    let start = Instant::now();
    let stage = ctx.progress.stage_line("projects");

    stage.set_message("listing projects...");
    log::info!("Getting all projects...");
    let projects = source
        .projects()
        .await
        .context("Unable to get all projects")?;
    log::info!("Found {} projects", fmt_num(projects.len()));

    stage.set_message("fetching service accounts...");
    log::info!("Getting all service accounts for all projects");
    let executor = ctx.executor(
        "Get ServiceAccounts",
        ctx.batch.project_service_accounts,
        projects.len(),
    );
    let src = source.clone();
    let result = executor
        .run(projects, move |project| {
            let src = src.clone();
            async move { src.service_accounts(&project.project_id).await }
        })
        .await;
    let failed_items = result.failure_count();

    let records = assemble(result, |project, accounts| {
        ProjectRecord::new(project, accounts.or_empty())
    });
    let report = ctx.report_path(ProjectRecord::FILE_NAME);
    let rows = write_report(&report, &records)?;

    stage.finish_with_message(format!("{} projects", fmt_num(rows)));
    Ok(PipelineSummary {
        name: "projects",
        report,
        rows,
        failed_items,
        elapsed: start.elapsed(),
    })
}
