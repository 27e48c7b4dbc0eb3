use std::time::Instant;

use anyhow::{Context, Result};
use gwaudit_core::{Enrichment, assemble, fmt_num};

use super::PipelineSummary;
use crate::context::AuditContext;
use crate::records::{Report, UserRecord};
use crate::report::write_report;
use crate::source::DirectorySource;

/// Every user with the OAuth tokens they granted, written to `users.csv`.
///
/// Users whose tokens could not be fetched are still written, with the
/// error in the notes column.
pub async fn users<S: DirectorySource>(ctx: &AuditContext, source: &S) -> Result<PipelineSummary> {
    let start = Instant::now();
    let stage = ctx.progress.stage_line("users");

    stage.set_message("listing users...");
    log::info!("Getting all users...");
    let users = source.users().await.context("Error getting users")?;
    log::info!(
        "Time to get {} users: {:.1}s",
        fmt_num(users.len()),
        start.elapsed().as_secs_f64()
    );

    stage.set_message("fetching tokens...");
    let executor = ctx.executor("Users Tokens", ctx.batch.user_tokens, users.len());
    let src = source.clone();
    let result = executor
        .run(users, move |user| {
            let src = src.clone();
            async move { src.user_tokens(&user.primary_email).await }
        })
        .await;
    let failed_items = result.failure_count();

    let records = assemble(result, |user, tokens| {
        let tokens = tokens.or_empty();
        if matches!(tokens, Enrichment::Empty) {
            log::debug!("No tokens for user: {}", user.primary_email);
        }
        UserRecord::new(user, tokens)
    });
    let report = ctx.report_path(UserRecord::FILE_NAME);
    let rows = write_report(&report, &records)?;

    stage.finish_with_message(format!("{} users", fmt_num(rows)));
    Ok(PipelineSummary {
        name: "users",
        report,
        rows,
        failed_items,
        elapsed: start.elapsed(),
    })
}
