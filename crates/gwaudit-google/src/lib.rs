//! gwaudit Google adapters
//!
//! Each adapter binds one Google REST listing endpoint to the
//! `page_fn(cursor)` shape and runs it through a [`PageFetcher`] configured
//! with that API's retry policy.

pub mod client;
pub mod directory;
pub mod drive;
pub mod iam;
pub mod model;
pub mod resource_manager;

use gwaudit_core::PageFetcher;

pub use client::{ApiError, Classifier, GoogleClient, StatusClassifier};
pub use directory::{DirectoryApi, MY_CUSTOMER};
pub use drive::DriveApi;
pub use iam::IamApi;
pub use resource_manager::ResourceManagerApi;

/// Fetcher type every adapter is built with.
pub type ApiFetcher = PageFetcher<Classifier>;
