//! gwaudit core - resilient listing and bounded fan-out
//!
//! This crate provides the pieces every audit pipeline is built from: a
//! cursor-walking fetcher with quota/server retry, a fixed-size batch
//! executor, and the record assembly discipline on top of both. It knows
//! nothing about Google.

pub mod aggregate;
pub mod batch;
pub mod config;
pub mod error;
pub mod logging;
pub mod pagination;
pub mod progress;
pub mod retry;
pub mod shutdown;

// Re-exports for convenience
pub use aggregate::{Enrichment, assemble};
pub use batch::{BatchExecutor, BatchResult, ItemOutcome, batch_count, run_batches};
pub use config::{BatchSizes, RetrySettings};
pub use error::{FetchError, ItemFailure};
pub use logging::{IndicatifLogger, init_logging};
pub use pagination::{Page, PageFetcher};
pub use progress::{ProgressContext, SharedProgress, fmt_num};
pub use retry::{RetryClass, RetryClassifier, RetryPolicy, Sleeper, SubstringClassifier, TokioSleeper};
pub use shutdown::{CancellationToken, cancel_on_ctrl_c};
