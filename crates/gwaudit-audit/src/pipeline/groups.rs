use std::convert::Infallible;
use std::time::Instant;

use anyhow::{Context, Result};
use gwaudit_core::{assemble, fmt_num};
use gwaudit_google::model::{Group, Member};

use super::PipelineSummary;
use crate::context::AuditContext;
use crate::records::{GroupMapRecord, GroupMembership, GroupRecord, Report};
use crate::report::write_report;
use crate::source::DirectorySource;

async fn list_groups<S: DirectorySource>(source: &S) -> Result<Vec<Group>> {
    log::info!("Getting all groups...");
    let groups = source.groups().await.context("Error getting groups")?;
    log::info!("Found {} groups", fmt_num(groups.len()));
    Ok(groups)
}

/// Flat inventory of every group, written to `groups.csv`.
pub async fn group_inventory<S: DirectorySource>(
    ctx: &AuditContext,
    source: &S,
) -> Result<PipelineSummary> {
    let start = Instant::now();
    let stage = ctx.progress.stage_line("groups");

    stage.set_message("listing groups...");
    let groups = list_groups(source).await?;

    let executor = ctx.executor("Groups", ctx.batch.group_inventory, groups.len());
    let result = executor
        .run(groups, |group| async move {
            Ok::<_, Infallible>(GroupRecord::from(&group))
        })
        .await;

    // Only cancellation leaves an item without its record.
    let records = assemble(result, |group, record| {
        record
            .found()
            .cloned()
            .unwrap_or_else(|| GroupRecord::from(&group))
    });
    let report = ctx.report_path(GroupRecord::FILE_NAME);
    let rows = write_report(&report, &records)?;

    stage.finish_with_message(format!("{} groups", fmt_num(rows)));
    Ok(PipelineSummary {
        name: "groups",
        report,
        rows,
        failed_items: 0,
        elapsed: start.elapsed(),
    })
}

/// Order groups for the membership fan-out: largest first, ties keep their
/// listing order.
pub(crate) fn by_member_count(groups: &mut [Group]) {
    groups.sort_by(|a, b| b.direct_members_count.cmp(&a.direct_members_count));
}

async fn membership<S: DirectorySource>(
    source: &S,
    email: &str,
) -> Result<GroupMembership, String> {
    let emails = |members: Vec<Member>| {
        members.into_iter().map(|m| m.email).collect::<Vec<_>>()
    };
    let owners = source
        .members(email, "OWNER")
        .await
        .map_err(|e| format!("owners: {e}"))?;
    let managers = source
        .members(email, "MANAGER")
        .await
        .map_err(|e| format!("managers: {e}"))?;
    let subscriptions = source
        .subscriptions(email)
        .await
        .map_err(|e| format!("subscriptions: {e}"))?;

    Ok(GroupMembership {
        owners: emails(owners),
        managers: emails(managers),
        subscriptions: subscriptions.into_iter().map(|g| g.email).collect(),
    })
}

/// Owners, managers and parent groups of every group, written to
/// `groupsMap.csv`.
pub async fn group_memberships<S: DirectorySource>(
    ctx: &AuditContext,
    source: &S,
) -> Result<PipelineSummary> {
    let start = Instant::now();
    let stage = ctx.progress.stage_line("groups map");

    stage.set_message("listing groups...");
    let mut groups = list_groups(source).await?;
    by_member_count(&mut groups);

    stage.set_message("fetching memberships...");
    let executor = ctx.executor(
        "Group Memberships",
        ctx.batch.group_memberships,
        groups.len(),
    );
    let src = source.clone();
    let result = executor
        .run(groups, move |group| {
            let src = src.clone();
            async move { membership(&src, &group.email).await }
        })
        .await;
    let failed_items = result.failure_count();

    let records = assemble(result, GroupMapRecord::new);
    let report = ctx.report_path(GroupMapRecord::FILE_NAME);
    let rows = write_report(&report, &records)?;

    stage.finish_with_message(format!("{} groups mapped", fmt_num(rows)));
    Ok(PipelineSummary {
        name: "groups map",
        report,
        rows,
        failed_items,
        elapsed: start.elapsed(),
    })
}
