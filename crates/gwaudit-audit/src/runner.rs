//! Run orchestration: which pipelines a command runs and how their
//! outcomes are summarised.

use std::time::{Duration, Instant};

use anyhow::Result;
use gwaudit_core::fmt_num;

use crate::context::AuditContext;
use crate::pipeline::{self, PipelineSummary};
use crate::source::{CloudSource, DirectorySource, DriveSource, UserFilesSource};

/// Outcome of every pipeline a command ran.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub completed: Vec<PipelineSummary>,
    /// Pipelines that aborted, with the error chain that stopped them.
    pub failed: Vec<(&'static str, String)>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Record one pipeline's outcome; a failure is logged and kept.
    pub fn record(&mut self, name: &'static str, outcome: Result<PipelineSummary>) {
        match outcome {
            Ok(summary) => self.completed.push(summary),
            Err(e) => {
                log::error!("{name} failed: {e:#}");
                self.failed.push((name, format!("{e:#}")));
            }
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn rows(&self) -> usize {
        self.completed.iter().map(|s| s.rows).sum()
    }

    pub fn failed_items(&self) -> usize {
        self.completed.iter().map(|s| s.failed_items).sum()
    }

    pub fn log(&self) {
        log::info!("=== Run Summary ===");
        for summary in &self.completed {
            summary.log();
        }
        for (name, err) in &self.failed {
            log::error!("{name}: FAILED ({err})");
        }
        log::info!(
            "Pipelines: {}/{} completed, {} rows ({} with missing data)",
            self.completed.len(),
            self.completed.len() + self.failed.len(),
            fmt_num(self.rows()),
            fmt_num(self.failed_items())
        );
        log::info!("Time: {:.1}s", self.elapsed.as_secs_f64());
    }
}

/// Projects, users and groups inventory, run concurrently.
///
/// One pipeline failing does not stop the others.
pub async fn inventory<S>(ctx: &AuditContext, source: &S) -> RunSummary
where
    S: CloudSource + DirectorySource,
{
    let start = Instant::now();
    let (projects, users, groups) = tokio::join!(
        pipeline::projects(ctx, source),
        pipeline::users(ctx, source),
        pipeline::group_inventory(ctx, source),
    );

    let mut summary = RunSummary::empty();
    summary.record("projects", projects);
    summary.record("users", users);
    summary.record("groups", groups);
    summary.elapsed = start.elapsed();
    summary
}

/// Group owners, managers and subscriptions.
pub async fn groups<S: DirectorySource>(ctx: &AuditContext, source: &S) -> RunSummary {
    let start = Instant::now();
    let mut summary = RunSummary::empty();
    summary.record("groups map", pipeline::group_memberships(ctx, source).await);
    summary.elapsed = start.elapsed();
    summary
}

/// Shared drive permissions.
pub async fn shared_drives<S: DriveSource>(ctx: &AuditContext, source: &S) -> RunSummary {
    let start = Instant::now();
    let mut summary = RunSummary::empty();
    summary.record("shared drives", pipeline::shared_drives(ctx, source).await);
    summary.elapsed = start.elapsed();
    summary
}

/// Apps Script projects owned by each user.
pub async fn apps_scripts<D, F>(ctx: &AuditContext, directory: &D, files: &F) -> RunSummary
where
    D: DirectorySource,
    F: UserFilesSource,
{
    let start = Instant::now();
    let mut summary = RunSummary::empty();
    summary.record(
        "apps scripts",
        pipeline::apps_scripts(ctx, directory, files).await,
    );
    summary.elapsed = start.elapsed();
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn done(name: &'static str, rows: usize, failed_items: usize) -> PipelineSummary {
        PipelineSummary {
            name,
            report: PathBuf::from(format!("out/{name}.csv")),
            rows,
            failed_items,
            elapsed: Duration::from_millis(1500),
        }
    }

    #[test]
    fn record_keeps_failures_apart() {
        let mut summary = RunSummary::empty();
        summary.record("projects", Ok(done("projects", 3, 1)));
        summary.record(
            "users",
            Err(anyhow::anyhow!("googleapi: Error 403: forbidden").context("Error getting users")),
        );
        summary.record("groups", Ok(done("groups", 10, 0)));

        assert!(!summary.is_success());
        assert_eq!(summary.completed.len(), 2);
        assert_eq!(summary.rows(), 13);
        assert_eq!(summary.failed_items(), 1);
        assert_eq!(summary.failed[0].0, "users");
        assert_eq!(
            summary.failed[0].1,
            "Error getting users: googleapi: Error 403: forbidden"
        );
    }

    #[test]
    fn empty_summary_is_success() {
        assert!(RunSummary::empty().is_success());
    }

    #[test]
    fn run_summary_log_does_not_panic() {
        let mut summary = RunSummary::empty();
        summary.record("projects", Ok(done("projects", 1000, 2)));
        summary.record("users", Err(anyhow::anyhow!("boom")));
        summary.elapsed = Duration::from_secs(5);
        summary.log();
    }
}
