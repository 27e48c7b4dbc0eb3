//! Bounded fan-out over a materialized collection.
//!
//! Items are processed in fixed-size batches: every item of a batch runs as its
//! own tokio task, and the next batch starts only after the whole current batch
//! has finished. `batch_size` is therefore the concurrency ceiling.
//!
//! Results are collected by the single task driving the run (each spawned task
//! hands its outcome back through its `JoinSet` handle), so no accumulator is
//! shared between tasks.

use std::collections::HashMap;
use std::future::Future;
use std::time::Instant;

use indicatif::ProgressBar;
use tokio::task::{Id, JoinSet};

use crate::error::ItemFailure;
use crate::progress::fmt_num;
use crate::shutdown::CancellationToken;

/// Outcome of one work item.
#[derive(Debug)]
pub struct ItemOutcome<W, R, E> {
    /// Position of the item in the input collection.
    pub index: usize,
    pub item: W,
    pub result: Result<R, ItemFailure<E>>,
}

/// All outcomes of one executor run, in input order.
#[derive(Debug)]
pub struct BatchResult<W, R, E> {
    outcomes: Vec<ItemOutcome<W, R, E>>,
}

impl<W, R, E> BatchResult<W, R, E> {
    fn from_unordered(mut outcomes: Vec<ItemOutcome<W, R, E>>) -> Self {
        outcomes.sort_by_key(|o| o.index);
        Self { outcomes }
    }

    /// Number of items processed (succeeded + failed).
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn outcomes(&self) -> &[ItemOutcome<W, R, E>] {
        &self.outcomes
    }

    pub fn into_outcomes(self) -> Vec<ItemOutcome<W, R, E>> {
        self.outcomes
    }

    pub fn succeeded(&self) -> impl Iterator<Item = (&W, &R)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(|r| (&o.item, r)))
    }

    pub fn failed(&self) -> impl Iterator<Item = (&W, &ItemFailure<E>)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (&o.item, e)))
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.len() - self.success_count()
    }
}

/// Number of batches needed for `len` items.
pub fn batch_count(len: usize, batch_size: usize) -> usize {
    len.div_ceil(batch_size.max(1))
}

/// Fixed-size batch executor.
pub struct BatchExecutor {
    label: String,
    batch_size: usize,
    cancel: Option<CancellationToken>,
    progress: ProgressBar,
}

impl BatchExecutor {
    pub fn new(label: impl Into<String>, batch_size: usize) -> Self {
        let label = label.into();
        let batch_size = if batch_size == 0 {
            log::warn!("{label}: batch size 0 is invalid, using 1");
            1
        } else {
            batch_size
        };
        Self {
            label,
            batch_size,
            cancel: None,
            progress: ProgressBar::hidden(),
        }
    }

    /// Stop launching new batches once `token` is cancelled.
    ///
    /// The running batch is always allowed to finish; items of later batches
    /// are reported as [`ItemFailure::Cancelled`].
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Advance `pb` by one per completed item.
    pub fn with_progress(mut self, pb: ProgressBar) -> Self {
        self.progress = pb;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Apply `worker` to every item and collect one outcome per item.
    ///
    /// A worker error (or panic) is recorded for that item and never aborts
    /// the batch or the run.
    pub async fn run<W, R, E, F, Fut>(&self, items: Vec<W>, worker: F) -> BatchResult<W, R, E>
    where
        W: Clone + Send + 'static,
        R: Send + 'static,
        E: std::fmt::Display + Send + 'static,
        F: Fn(W) -> Fut,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
    {
        let total = items.len();
        let total_batches = batch_count(total, self.batch_size);
        let mut outcomes: Vec<ItemOutcome<W, R, E>> = Vec::with_capacity(total);
        self.progress.set_length(total as u64);

        let mut remaining = items.into_iter().enumerate().peekable();
        let mut batch_idx = 0;
        while remaining.peek().is_some() {
            batch_idx += 1;

            if self.cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
                log::warn!(
                    "{}: cancelled before batch [{batch_idx}] of [{total_batches}]",
                    self.label
                );
                outcomes.extend(remaining.map(|(index, item)| ItemOutcome {
                    index,
                    item,
                    result: Err(ItemFailure::Cancelled),
                }));
                break;
            }

            let started = Instant::now();
            let batch: Vec<(usize, W)> = remaining.by_ref().take(self.batch_size).collect();
            let batch_len = batch.len();
            log::info!(
                "<----- {} Batch [{batch_idx}] of [{total_batches}] ({} items) ----->",
                self.label,
                fmt_num(batch_len)
            );

            let mut tasks = JoinSet::new();
            let mut in_flight: HashMap<Id, (usize, W)> = HashMap::with_capacity(batch_len);
            for (index, item) in batch {
                let fut = worker(item.clone());
                let handle = tasks.spawn(fut);
                in_flight.insert(handle.id(), (index, item));
            }

            // Barrier: drain every task of this batch before the next one starts.
            while let Some(joined) = tasks.join_next_with_id().await {
                let (id, result) = match joined {
                    Ok((id, Ok(r))) => (id, Ok(r)),
                    Ok((id, Err(e))) => (id, Err(ItemFailure::Worker(e))),
                    Err(join_err) => {
                        let msg = panic_message(&join_err);
                        (join_err.id(), Err(ItemFailure::Panicked(msg)))
                    }
                };
                let Some((index, item)) = in_flight.remove(&id) else {
                    continue;
                };
                if let Err(e) = &result {
                    log::warn!("{}: item {} failed: {e}", self.label, index + 1);
                }
                self.progress.inc(1);
                outcomes.push(ItemOutcome {
                    index,
                    item,
                    result,
                });
            }

            log::debug!(
                "{}: batch [{batch_idx}] of [{total_batches}] completed in {:.1}s",
                self.label,
                started.elapsed().as_secs_f64()
            );
        }

        let result = BatchResult::from_unordered(outcomes);
        log::info!(
            "{}: {} items processed ({} failed)",
            self.label,
            fmt_num(result.len()),
            fmt_num(result.failure_count())
        );
        result
    }
}

/// Run `worker` over `items` in batches of `batch_size` with no cancellation.
pub async fn run_batches<W, R, E, F, Fut>(
    items: Vec<W>,
    batch_size: usize,
    worker: F,
) -> BatchResult<W, R, E>
where
    W: Clone + Send + 'static,
    R: Send + 'static,
    E: std::fmt::Display + Send + 'static,
    F: Fn(W) -> Fut,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
{
    BatchExecutor::new("batch", batch_size)
        .run(items, worker)
        .await
}

fn panic_message(err: &tokio::task::JoinError) -> String {
    if err.is_cancelled() {
        return "task cancelled".to_string();
    }
    err.to_string()
}
