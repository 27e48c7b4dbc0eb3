//! Error types returned by the fetcher and the batch executor

use crate::retry::RetryClass;

/// Terminal error of a paginated fetch or a retried call.
///
/// Every variant is fatal from the caller's point of view: the fetch has been
/// abandoned and any items accumulated so far were discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Classified as fatal on first occurrence, never retried.
    Fatal(String),
    /// A retryable class hit its attempt cap.
    Exhausted {
        class: RetryClass,
        attempts: u32,
        message: String,
    },
    /// The cancellation token fired before the fetch completed.
    Cancelled,
    /// The configured deadline passed before the fetch completed.
    DeadlineExceeded,
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fatal(message) => f.write_str(message),
            Self::Exhausted {
                class,
                attempts,
                message,
            } => write!(f, "{message} (gave up after {attempts} {class} retries)"),
            Self::Cancelled => f.write_str("cancelled"),
            Self::DeadlineExceeded => f.write_str("deadline exceeded"),
        }
    }
}

impl std::error::Error for FetchError {}

impl FetchError {
    /// The underlying remote error text, if the error came from a remote call.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Fatal(message) | Self::Exhausted { message, .. } => Some(message),
            Self::Cancelled | Self::DeadlineExceeded => None,
        }
    }

    /// True when the fetch stopped because of cancellation or a deadline
    /// rather than a remote failure.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }
}

/// Why a single work item did not produce a result.
#[derive(Debug)]
pub enum ItemFailure<E> {
    /// The worker returned an error.
    Worker(E),
    /// The worker task panicked; the payload message is kept.
    Panicked(String),
    /// The run was cancelled before this item's batch started.
    Cancelled,
}

impl<E: std::fmt::Display> std::fmt::Display for ItemFailure<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Worker(e) => write!(f, "{e}"),
            Self::Panicked(msg) => write!(f, "worker panicked: {msg}"),
            Self::Cancelled => f.write_str("cancelled before start"),
        }
    }
}

impl<E: std::fmt::Debug + std::fmt::Display> std::error::Error for ItemFailure<E> {}

impl<E> ItemFailure<E> {
    /// Borrow the worker error, if that is what failed.
    pub fn worker_error(&self) -> Option<&E> {
        match self {
            Self::Worker(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_displays_remote_message() {
        let err = FetchError::Fatal("googleapi: Error 404: Not Found, notFound".to_string());
        assert_eq!(
            format!("{err}"),
            "googleapi: Error 404: Not Found, notFound"
        );
    }

    #[test]
    fn exhausted_mentions_attempts() {
        let err = FetchError::Exhausted {
            class: RetryClass::ServerTransient,
            attempts: 10,
            message: "HTTP 500".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.starts_with("HTTP 500"));
        assert!(msg.contains("10"));
        assert!(msg.contains("server"));
    }

    #[test]
    fn message_absent_for_interruptions() {
        assert_eq!(FetchError::Cancelled.message(), None);
        assert_eq!(FetchError::DeadlineExceeded.message(), None);
        assert!(FetchError::Cancelled.is_interrupted());
        assert!(!FetchError::Fatal("x".to_string()).is_interrupted());
    }

    #[test]
    fn item_failure_display() {
        let worker: ItemFailure<FetchError> = ItemFailure::Worker(FetchError::Fatal("boom".into()));
        assert_eq!(format!("{worker}"), "boom");
        assert!(worker.worker_error().is_some());

        let panicked: ItemFailure<FetchError> = ItemFailure::Panicked("oops".into());
        assert!(format!("{panicked}").contains("oops"));
        assert!(panicked.worker_error().is_none());
    }
}
