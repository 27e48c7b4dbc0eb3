//! Per-operation tuning values shared by every pipeline.

use serde::Deserialize;

use crate::retry::RetryPolicy;

/// Batch size (concurrency ceiling) per fan-out operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BatchSizes {
    pub project_service_accounts: usize,
    pub user_tokens: usize,
    /// Purely local aggregation, so the ceiling is high.
    pub group_inventory: usize,
    pub group_memberships: usize,
    /// Permission listings are heavy per drive.
    pub drive_permissions: usize,
    /// Each user needs a delegated token before its file search.
    pub user_scripts: usize,
}

impl Default for BatchSizes {
    fn default() -> Self {
        Self {
            project_service_accounts: 100,
            user_tokens: 100,
            group_inventory: 1000,
            group_memberships: 100,
            drive_permissions: 10,
            user_scripts: 10,
        }
    }
}

/// Retry policy per remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub directory: RetryPolicy,
    pub resource_manager: RetryPolicy,
    pub iam: RetryPolicy,
    pub drive: RetryPolicy,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            directory: RetryPolicy::with_quota_sleep(2),
            resource_manager: RetryPolicy::with_quota_sleep(2),
            iam: RetryPolicy::with_quota_sleep(60),
            drive: RetryPolicy::with_quota_sleep(3),
        }
    }
}
