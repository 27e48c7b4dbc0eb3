//! Graceful shutdown support via a shared cancellation token

use std::future::Future;
use std::time::Instant;

pub use tokio_util::sync::CancellationToken;

use crate::error::FetchError;

/// Cancel `token` on the first Ctrl-C.
///
/// In-flight remote calls finish; fetchers and executors observe the token at
/// their next call or backoff sleep.
pub fn cancel_on_ctrl_c(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupt received, cancelling outstanding work...");
            token.cancel();
        }
    })
}

/// Optional stop conditions for a fetch. Both default to "never".
#[derive(Clone, Debug, Default)]
pub(crate) struct Interrupt {
    pub(crate) cancel: Option<CancellationToken>,
    pub(crate) deadline: Option<Instant>,
}

impl Interrupt {
    /// Fail if the token fired or the deadline passed.
    pub(crate) fn check(&self) -> Result<(), FetchError> {
        if self.cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
            return Err(FetchError::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(FetchError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Drive `fut` to completion unless cancellation or the deadline comes first.
    pub(crate) async fn race<F: Future>(&self, fut: F) -> Result<F::Output, FetchError> {
        self.check()?;
        let cancelled = async {
            match &self.cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };
        let expired = async {
            match self.deadline {
                Some(d) => tokio::time::sleep_until(tokio::time::Instant::from_std(d)).await,
                None => std::future::pending().await,
            }
        };
        tokio::select! {
            out = fut => Ok(out),
            () = cancelled => Err(FetchError::Cancelled),
            () = expired => Err(FetchError::DeadlineExceeded),
        }
    }
}
