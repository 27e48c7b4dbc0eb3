//! Audit subcommands - run report pipelines against the live APIs

use std::time::Duration;

use anyhow::{Context, Result};
use gwaudit_audit::{
    AuditContext, CommandTokens, DelegatedDrive, GoogleApis, RunSummary, package, runner,
};
use gwaudit_core::{cancel_on_ctrl_c, fmt_num};
use gwaudit_google::GoogleClient;

use super::print_summary;

/// Which pipelines a command runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audit {
    Inventory,
    Groups,
    SharedDrives,
    AppsScripts,
}

impl Audit {
    fn title(self) -> &'static str {
        match self {
            Self::Inventory => "Inventory",
            Self::Groups => "Groups map",
            Self::SharedDrives => "Shared drives",
            Self::AppsScripts => "Apps Scripts",
        }
    }
}

/// Run `audit` into `ctx.reports_dir`, then zip (and upload) the reports.
pub fn run(
    audit: Audit,
    mut ctx: AuditContext,
    access_token: &str,
    timeout: Duration,
    delegated_token_command: Vec<String>,
) -> Result<()> {
    let client = GoogleClient::new(access_token, timeout).context("Cannot build HTTP client")?;
    let apis = GoogleApis::new(client, &ctx);
    let user_drive = if audit == Audit::AppsScripts {
        let tokens = CommandTokens::new(delegated_token_command)
            .context("Apps Script audit needs [auth] delegated_token_command")?;
        Some(DelegatedDrive::new(
            tokens,
            timeout,
            ctx.fetcher("drive (delegated)", ctx.retry.drive),
        ))
    } else {
        None
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Cannot start async runtime")?;

    let (summary, archive) = runtime.block_on(async {
        let ctrl_c = cancel_on_ctrl_c(ctx.cancel.clone());

        let summary = match audit {
            Audit::Inventory => runner::inventory(&ctx, &apis).await,
            Audit::Groups => runner::groups(&ctx, &apis).await,
            Audit::SharedDrives => runner::shared_drives(&ctx, &apis).await,
            Audit::AppsScripts => match &user_drive {
                Some(files) => runner::apps_scripts(&ctx, &apis, files).await,
                None => RunSummary::empty(),
            },
        };
        summary.log();

        if ctx.cancel.is_cancelled() {
            log::warn!("Run interrupted, archive will not be uploaded");
            ctx.upload = false;
        }
        let archive = package(&ctx, &apis).await;
        ctrl_c.abort();
        (summary, archive)
    });

    let mut rows = report_rows(&summary);
    match &archive {
        Ok(path) => rows.push(("Archive".to_string(), path.display().to_string())),
        Err(e) => rows.push(("Archive".to_string(), format!("FAILED: {e:#}"))),
    }
    print_summary(audit.title(), &rows);

    archive?;
    if !summary.is_success() {
        anyhow::bail!("{} pipeline(s) failed", summary.failed.len());
    }
    Ok(())
}

fn report_rows(summary: &RunSummary) -> Vec<(String, String)> {
    let mut rows: Vec<(String, String)> = summary
        .completed
        .iter()
        .map(|s| {
            (
                s.name.to_string(),
                format!(
                    "{} rows ({} with missing data) in {:.1}s",
                    fmt_num(s.rows),
                    fmt_num(s.failed_items),
                    s.elapsed.as_secs_f64()
                ),
            )
        })
        .collect();
    rows.extend(
        summary
            .failed
            .iter()
            .map(|(name, err)| (name.to_string(), format!("FAILED: {err}"))),
    );
    rows.push((
        "Time".to_string(),
        format!("{:.1}s", summary.elapsed.as_secs_f64()),
    ));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use gwaudit_audit::PipelineSummary;
    use std::path::PathBuf;

    #[test]
    fn report_rows_list_failures_after_successes() {
        let mut summary = RunSummary::empty();
        summary.record(
            "projects",
            Ok(PipelineSummary {
                name: "projects",
                report: PathBuf::from("out/projects.csv"),
                rows: 1200,
                failed_items: 3,
                elapsed: Duration::from_secs(2),
            }),
        );
        summary.record("users", Err(anyhow::anyhow!("quota")));

        let rows = report_rows(&summary);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].0, "projects");
        assert!(rows[0].1.starts_with(&format!("{} rows (3", fmt_num(1200))));
        assert_eq!(rows[1], ("users".to_string(), "FAILED: quota".to_string()));
        assert_eq!(rows[2].0, "Time");
    }
}
