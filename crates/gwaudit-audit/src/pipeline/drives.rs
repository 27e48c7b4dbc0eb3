use std::time::Instant;

use anyhow::{Context, Result};
use gwaudit_core::{assemble, fmt_num};

use super::PipelineSummary;
use crate::context::AuditContext;
use crate::records::{Report, SharedDriveRecord};
use crate::report::write_report;
use crate::source::DriveSource;

/// Permission role counts and group access per shared drive, written to
/// `sharedDrivesMap.csv`.
pub async fn shared_drives<S: DriveSource>(
    ctx: &AuditContext,
    source: &S,
) -> Result<PipelineSummary> {
    let start = Instant::now();
    let stage = ctx.progress.stage_line("drives");

    stage.set_message("listing shared drives...");
    let drives = source
        .shared_drives()
        .await
        .context("Error getting shared drives")?;
    log::info!("Found {} shared drives", fmt_num(drives.len()));

    stage.set_message("fetching permissions...");
    let executor = ctx.executor(
        "Drive Permissions",
        ctx.batch.drive_permissions,
        drives.len(),
    );
    let src = source.clone();
    let result = executor
        .run(drives, move |drive| {
            let src = src.clone();
            async move { src.permissions(&drive.id).await }
        })
        .await;
    let failed_items = result.failure_count();

    let records = assemble(result, |drive, perms| {
        SharedDriveRecord::new(drive, perms.or_empty())
    });
    let report = ctx.report_path(SharedDriveRecord::FILE_NAME);
    let rows = write_report(&report, &records)?;

    stage.finish_with_message(format!("{} shared drives", fmt_num(rows)));
    Ok(PipelineSummary {
        name: "shared drives",
        report,
        rows,
        failed_items,
        elapsed: start.elapsed(),
    })
}
