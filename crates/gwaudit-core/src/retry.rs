//! Retry classification and fixed-delay retry policy for remote list calls

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;

use crate::error::FetchError;

/// How a failed remote call should be treated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RetryClass {
    /// Rate-limit rejection. Retried after the policy's quota sleep.
    Quota,
    /// 5xx-style failure. Retried up to `max_tries` with the server sleep.
    ServerTransient,
    /// Anything else. Never retried.
    Fatal,
}

impl std::fmt::Display for RetryClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Quota => "quota",
            Self::ServerTransient => "server",
            Self::Fatal => "fatal",
        })
    }
}

/// Decides the retry class of an error.
///
/// Implemented generically so a structured classifier can replace the default
/// one at a call site without touching the fetch loop.
pub trait RetryClassifier<E>: Send + Sync {
    fn classify(&self, err: &E) -> RetryClass;
}

/// Default classifier: sniffs the rendered error message.
///
/// `"quota"` wins over `"500"`; both matches are case-sensitive.
#[derive(Clone, Copy, Debug, Default)]
pub struct SubstringClassifier;

impl SubstringClassifier {
    pub fn classify_message(message: &str) -> RetryClass {
        if message.contains("quota") {
            RetryClass::Quota
        } else if message.contains("500") {
            RetryClass::ServerTransient
        } else {
            RetryClass::Fatal
        }
    }
}

impl<E: std::fmt::Display> RetryClassifier<E> for SubstringClassifier {
    fn classify(&self, err: &E) -> RetryClass {
        Self::classify_message(&err.to_string())
    }
}

/// Fixed-delay retry policy for one API.
///
/// `quota_max_tries = None` retries quota errors forever. Under sustained
/// throttling a fetch with this setting never returns; set a cap to opt out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub quota_sleep_secs: u64,
    pub server_sleep_secs: u64,
    pub max_tries: u32,
    pub quota_max_tries: Option<u32>,
}

/// Sleep between server-error retries
pub const SERVER_SLEEP_SECS: u64 = 60;

/// Server-error retry cap
pub const DEFAULT_MAX_TRIES: u32 = 10;

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            quota_sleep_secs: 2,
            server_sleep_secs: SERVER_SLEEP_SECS,
            max_tries: DEFAULT_MAX_TRIES,
            quota_max_tries: None,
        }
    }
}

impl RetryPolicy {
    /// Default policy with a specific quota sleep.
    pub const fn with_quota_sleep(secs: u64) -> Self {
        Self {
            quota_sleep_secs: secs,
            server_sleep_secs: SERVER_SLEEP_SECS,
            max_tries: DEFAULT_MAX_TRIES,
            quota_max_tries: None,
        }
    }

    /// Opt into a cap on quota retries.
    pub const fn bounded_quota(mut self, max: u32) -> Self {
        self.quota_max_tries = Some(max);
        self
    }

    pub fn quota_sleep(&self) -> Duration {
        Duration::from_secs(self.quota_sleep_secs)
    }

    pub fn server_sleep(&self) -> Duration {
        Duration::from_secs(self.server_sleep_secs)
    }
}

/// Outcome of feeding one failure into [`RetryState`].
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Verdict {
    Retry { class: RetryClass, delay: Duration },
    GiveUp(FetchError),
}

/// Attempt counters for one fetch invocation.
///
/// Created fresh by every `fetch_all`/`call` and dropped when it returns.
#[derive(Debug, Default)]
pub(crate) struct RetryState {
    server_attempts: u32,
    quota_attempts: u32,
}

impl RetryState {
    pub(crate) fn on_error(
        &mut self,
        class: RetryClass,
        message: String,
        policy: &RetryPolicy,
    ) -> Verdict {
        match class {
            RetryClass::Quota => match policy.quota_max_tries {
                Some(cap) if self.quota_attempts >= cap => Verdict::GiveUp(FetchError::Exhausted {
                    class,
                    attempts: self.quota_attempts,
                    message,
                }),
                _ => {
                    self.quota_attempts = self.quota_attempts.saturating_add(1);
                    Verdict::Retry {
                        class,
                        delay: policy.quota_sleep(),
                    }
                }
            },
            RetryClass::ServerTransient if self.server_attempts < policy.max_tries => {
                self.server_attempts += 1;
                Verdict::Retry {
                    class,
                    delay: policy.server_sleep(),
                }
            }
            RetryClass::ServerTransient => Verdict::GiveUp(FetchError::Exhausted {
                class,
                attempts: self.server_attempts,
                message,
            }),
            RetryClass::Fatal => Verdict::GiveUp(FetchError::Fatal(message)),
        }
    }

    pub(crate) fn attempts(&self, class: RetryClass) -> u32 {
        match class {
            RetryClass::Quota => self.quota_attempts,
            RetryClass::ServerTransient => self.server_attempts,
            RetryClass::Fatal => 0,
        }
    }
}

/// Backoff wait used between retries.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// Production sleeper backed by the tokio timer.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_substring_is_quota() {
        assert_eq!(
            SubstringClassifier::classify_message(
                "googleapi: Error 403: Quota exceeded for quota metric 'Queries', rateLimitExceeded"
            ),
            RetryClass::Quota
        );
    }

    #[test]
    fn quota_match_is_case_sensitive() {
        assert_eq!(
            SubstringClassifier::classify_message("Quota exceeded"),
            RetryClass::Fatal
        );
    }

    #[test]
    fn server_500_is_transient() {
        assert_eq!(
            SubstringClassifier::classify_message("googleapi: Error 500: Internal Error, backendError"),
            RetryClass::ServerTransient
        );
    }

    #[test]
    fn quota_wins_over_500() {
        assert_eq!(
            SubstringClassifier::classify_message("500 quota"),
            RetryClass::Quota
        );
    }

    #[test]
    fn other_status_is_fatal() {
        assert_eq!(
            SubstringClassifier::classify_message("googleapi: Error 503: Service Unavailable"),
            RetryClass::Fatal
        );
        assert_eq!(
            SubstringClassifier::classify_message("googleapi: Error 404: Not Found"),
            RetryClass::Fatal
        );
    }

    #[test]
    fn classifier_trait_uses_display() {
        let err = std::io::Error::other("HTTP 500 from upstream");
        assert_eq!(
            SubstringClassifier.classify(&err),
            RetryClass::ServerTransient
        );
    }

    #[test]
    fn default_policy_matches_historic_values() {
        let p = RetryPolicy::default();
        assert_eq!(p.server_sleep(), Duration::from_secs(60));
        assert_eq!(p.max_tries, 10);
        assert_eq!(p.quota_max_tries, None);
        assert_eq!(RetryPolicy::with_quota_sleep(60).quota_sleep(), Duration::from_secs(60));
    }

    #[test]
    fn unbounded_quota_never_gives_up() {
        let policy = RetryPolicy::default();
        let mut state = RetryState::default();
        for _ in 0..1_000 {
            assert!(matches!(
                state.on_error(RetryClass::Quota, "quota".into(), &policy),
                Verdict::Retry { class: RetryClass::Quota, .. }
            ));
        }
        assert_eq!(state.attempts(RetryClass::Quota), 1_000);
        assert_eq!(state.attempts(RetryClass::ServerTransient), 0);
    }

    #[test]
    fn bounded_quota_gives_up_after_cap() {
        let policy = RetryPolicy::default().bounded_quota(2);
        let mut state = RetryState::default();
        for _ in 0..2 {
            assert!(matches!(
                state.on_error(RetryClass::Quota, "quota".into(), &policy),
                Verdict::Retry { .. }
            ));
        }
        assert_eq!(
            state.on_error(RetryClass::Quota, "quota".into(), &policy),
            Verdict::GiveUp(FetchError::Exhausted {
                class: RetryClass::Quota,
                attempts: 2,
                message: "quota".into(),
            })
        );
    }

    #[test]
    fn server_errors_capped_at_max_tries() {
        let policy = RetryPolicy::default();
        let mut state = RetryState::default();
        for _ in 0..policy.max_tries {
            assert_eq!(
                state.on_error(RetryClass::ServerTransient, "500".into(), &policy),
                Verdict::Retry {
                    class: RetryClass::ServerTransient,
                    delay: Duration::from_secs(60),
                }
            );
        }
        assert!(matches!(
            state.on_error(RetryClass::ServerTransient, "500".into(), &policy),
            Verdict::GiveUp(FetchError::Exhausted { attempts: 10, .. })
        ));
    }

    #[test]
    fn fatal_gives_up_immediately() {
        let mut state = RetryState::default();
        assert_eq!(
            state.on_error(RetryClass::Fatal, "nope".into(), &RetryPolicy::default()),
            Verdict::GiveUp(FetchError::Fatal("nope".into()))
        );
    }
}
