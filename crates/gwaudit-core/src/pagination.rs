//! Cursor-driven listing with quota/server-error retry.
//!
//! A listing endpoint is adapted to a `page_fn(cursor)` closure returning one
//! [`Page`]. [`PageFetcher::fetch_all`] walks the cursor chain until the remote
//! side returns an empty `next_cursor`, retrying transient failures according
//! to the fetcher's [`RetryPolicy`].
//!
//! Failure is fail-fast: a fatal or exhausted error abandons the whole listing
//! and discards the pages accumulated so far.

use std::future::Future;
use std::time::Instant;

use crate::error::FetchError;
use crate::progress::fmt_num;
use crate::retry::{
    RetryClassifier, RetryPolicy, RetryState, Sleeper, SubstringClassifier, TokioSleeper, Verdict,
};
use crate::shutdown::{CancellationToken, Interrupt};

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Empty string means there are no further pages.
    pub next_cursor: String,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_cursor: impl Into<String>) -> Self {
        Self {
            items,
            next_cursor: next_cursor.into(),
        }
    }

    /// Terminal page.
    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, String::new())
    }

    pub fn is_last(&self) -> bool {
        self.next_cursor.is_empty()
    }
}

/// Drives listing endpoints to exhaustion.
///
/// Cheap to construct; build one per API and reuse it across fetches. Retry
/// counters live inside each `fetch_all`/`call` invocation, never on the
/// fetcher itself.
#[derive(Debug, Clone)]
pub struct PageFetcher<C = SubstringClassifier, S = TokioSleeper> {
    label: String,
    policy: RetryPolicy,
    classifier: C,
    sleeper: S,
    interrupt: Interrupt,
    log_progress: bool,
}

impl PageFetcher {
    /// Fetcher with the default substring classifier and tokio sleeps.
    pub fn new(label: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            label: label.into(),
            policy,
            classifier: SubstringClassifier,
            sleeper: TokioSleeper,
            interrupt: Interrupt::default(),
            log_progress: true,
        }
    }
}

impl<C, S> PageFetcher<C, S> {
    pub fn with_classifier<C2>(self, classifier: C2) -> PageFetcher<C2, S> {
        PageFetcher {
            label: self.label,
            policy: self.policy,
            classifier,
            sleeper: self.sleeper,
            interrupt: self.interrupt,
            log_progress: self.log_progress,
        }
    }

    pub fn with_sleeper<S2>(self, sleeper: S2) -> PageFetcher<C, S2> {
        PageFetcher {
            label: self.label,
            policy: self.policy,
            classifier: self.classifier,
            sleeper,
            interrupt: self.interrupt,
            log_progress: self.log_progress,
        }
    }

    /// Abort at the next call or backoff sleep once `token` is cancelled.
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.interrupt.cancel = Some(token);
        self
    }

    /// Abort once `deadline` passes.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.interrupt.deadline = Some(deadline);
        self
    }

    /// Same fetcher under a different log label.
    pub fn labelled(&self, label: impl Into<String>) -> Self
    where
        C: Clone,
        S: Clone,
    {
        Self {
            label: label.into(),
            ..self.clone()
        }
    }

    /// Silence the per-page running total (used for per-item fan-out fetches).
    pub fn quiet(mut self) -> Self {
        self.log_progress = false;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

impl<C, S: Sleeper> PageFetcher<C, S> {
    /// Walk the cursor chain starting at `initial_cursor` and return the
    /// concatenation of every page's items, in retrieval order.
    pub async fn fetch_all<T, E, F, Fut>(
        &self,
        initial_cursor: &str,
        mut page_fn: F,
    ) -> Result<Vec<T>, FetchError>
    where
        C: RetryClassifier<E>,
        E: std::fmt::Display,
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<Page<T>, E>>,
    {
        let mut state = RetryState::default();
        let mut cursor = initial_cursor.to_string();
        let mut accumulated: Vec<T> = Vec::new();

        loop {
            self.interrupt.check()?;
            let result = self.interrupt.race(page_fn(cursor.clone())).await?;
            match result {
                Ok(page) => {
                    accumulated.extend(page.items);
                    if self.log_progress {
                        log::info!("{} thus far: {}", self.label, fmt_num(accumulated.len()));
                    }
                    if page.next_cursor.is_empty() {
                        return Ok(accumulated);
                    }
                    cursor = page.next_cursor;
                }
                Err(e) => self.back_off(&mut state, &e).await?,
            }
        }
    }

    /// Run a single non-paginated remote call under the same retry discipline.
    pub async fn call<T, E, F, Fut>(&self, mut call_fn: F) -> Result<T, FetchError>
    where
        C: RetryClassifier<E>,
        E: std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut state = RetryState::default();
        loop {
            self.interrupt.check()?;
            match self.interrupt.race(call_fn()).await? {
                Ok(v) => return Ok(v),
                Err(e) => self.back_off(&mut state, &e).await?,
            }
        }
    }

    /// Classify `err`, then either sleep for the retry delay or give up.
    async fn back_off<E>(&self, state: &mut RetryState, err: &E) -> Result<(), FetchError>
    where
        C: RetryClassifier<E>,
        E: std::fmt::Display,
    {
        let class = self.classifier.classify(err);
        match state.on_error(class, err.to_string(), &self.policy) {
            Verdict::Retry { class, delay } => {
                log::warn!(
                    "{}: {err}, sleeping for {} seconds ({class} retry {})...",
                    self.label,
                    delay.as_secs(),
                    state.attempts(class)
                );
                self.interrupt.race(self.sleeper.sleep(delay)).await
            }
            Verdict::GiveUp(e) => {
                log::error!("{}: {e}", self.label);
                Err(e)
            }
        }
    }
}
