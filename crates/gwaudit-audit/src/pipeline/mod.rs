//! Report pipelines.
//!
//! Each pipeline lists a top-level collection, fans out the per-item
//! enrichment in batches, assembles exactly one record per listed item and
//! writes its CSV report. A listing failure aborts that pipeline only.

mod drives;
mod groups;
mod projects;
mod scripts;
mod tokens;
mod users;

use std::path::PathBuf;
use std::time::Duration;

use gwaudit_core::fmt_num;

pub use drives::shared_drives;
pub use groups::{group_inventory, group_memberships};
pub use projects::projects;
pub use scripts::{APPS_SCRIPT_QUERY, apps_scripts};
pub use tokens::analyze_users;
pub use users::users;

/// Outcome of one successful pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSummary {
    pub name: &'static str,
    pub report: PathBuf,
    /// Rows written; one per top-level item except for the Apps Script
    /// report, which has one per script.
    pub rows: usize,
    /// Rows whose secondary data could not be fetched.
    pub failed_items: usize,
    pub elapsed: Duration,
}

impl PipelineSummary {
    pub fn log(&self) {
        log::info!(
            "{}: {} rows written to {} ({} with missing data) in {:.1}s",
            self.name,
            fmt_num(self.rows),
            self.report.display(),
            fmt_num(self.failed_items),
            self.elapsed.as_secs_f64()
        );
    }
}
