//! Run context shared by every pipeline of one invocation

use std::path::PathBuf;
use std::sync::Arc;

use gwaudit_core::{
    BatchExecutor, BatchSizes, CancellationToken, PageFetcher, ProgressContext, RetryPolicy,
    RetrySettings, SharedProgress,
};
use gwaudit_google::{ApiFetcher, Classifier, MY_CUSTOMER};

/// Everything a pipeline needs to know about the current run.
///
/// Built once at startup and passed by reference; pipelines never reach for
/// process-wide state.
#[derive(Clone)]
pub struct AuditContext {
    /// Directory the CSV reports of this run are written to.
    pub reports_dir: PathBuf,
    pub customer_id: String,
    pub batch: BatchSizes,
    pub retry: RetrySettings,
    pub classifier: Classifier,
    /// Drive folder id the archive is uploaded into.
    pub drive_folder: String,
    pub upload: bool,
    pub cancel: CancellationToken,
    pub progress: SharedProgress,
}

impl AuditContext {
    /// Context with default tuning and hidden progress output.
    pub fn new(reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            reports_dir: reports_dir.into(),
            customer_id: MY_CUSTOMER.to_string(),
            batch: BatchSizes::default(),
            retry: RetrySettings::default(),
            classifier: Classifier::default(),
            drive_folder: "root".to_string(),
            upload: true,
            cancel: CancellationToken::new(),
            progress: Arc::new(ProgressContext::hidden()),
        }
    }

    pub fn report_path(&self, file_name: &str) -> PathBuf {
        self.reports_dir.join(file_name)
    }

    /// Fetcher for one API, wired to this run's cancellation token.
    pub fn fetcher(&self, label: &str, policy: RetryPolicy) -> ApiFetcher {
        PageFetcher::new(label, policy)
            .with_classifier(self.classifier)
            .with_cancel(self.cancel.clone())
    }

    /// Executor for one fan-out over `total` items, with a progress bar.
    pub fn executor(&self, label: &str, batch_size: usize, total: usize) -> BatchExecutor {
        BatchExecutor::new(label, batch_size)
            .with_cancel(self.cancel.clone())
            .with_progress(self.progress.batch_bar(label, total))
    }
}
