//! Bearer-token HTTP client and the error shape shared by every adapter.

use std::sync::Arc;
use std::time::Duration;

use gwaudit_core::{Page, RetryClass, RetryClassifier, SubstringClassifier};
use reqwest::{RequestBuilder, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::model::ListResponse;

/// Connect timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Error returned by a single Google REST call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Non-2xx response.
    Http {
        status: u16,
        message: String,
        reason: String,
    },
    /// Connection, timeout or body read failure.
    Transport(String),
    /// 2xx response whose body did not match the expected shape.
    Decode(String),
    /// A path segment could not be turned into a URL.
    InvalidUrl(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http {
                status,
                message,
                reason,
            } if reason.is_empty() => write!(f, "googleapi: Error {status}: {message}"),
            Self::Http {
                status,
                message,
                reason,
            } => write!(f, "googleapi: Error {status}: {message}, {reason}"),
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
            Self::Decode(msg) => write!(f, "invalid response body: {msg}"),
            Self::InvalidUrl(msg) => write!(f, "invalid URL: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    fn from_reqwest(e: reqwest::Error) -> Self {
        // Strip URL to keep query parameters out of logs
        Self::Transport(e.without_url().to_string())
    }

    /// Build an error from a non-2xx status and its JSON error body.
    pub fn from_response(status: u16, body: &str) -> Self {
        #[derive(Deserialize)]
        struct Envelope {
            error: Body,
        }
        #[derive(Deserialize)]
        struct Body {
            #[serde(default)]
            message: String,
            #[serde(default)]
            errors: Vec<Detail>,
        }
        #[derive(Deserialize)]
        struct Detail {
            #[serde(default)]
            reason: String,
        }

        match serde_json::from_str::<Envelope>(body) {
            Ok(env) => Self::Http {
                status,
                message: env.error.message,
                reason: env
                    .error
                    .errors
                    .into_iter()
                    .next()
                    .map(|d| d.reason)
                    .unwrap_or_default(),
            },
            Err(_) => Self::Http {
                status,
                message: body.trim().to_string(),
                reason: String::new(),
            },
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Structured classifier keyed on status codes and Google error reasons.
///
/// 429 and the rate-limit reasons are quota errors, any 5xx is transient,
/// everything else is fatal. Transport failures count as transient.
#[derive(Clone, Copy, Debug, Default)]
pub struct StatusClassifier;

const QUOTA_REASONS: &[&str] = &["quotaExceeded", "rateLimitExceeded", "userRateLimitExceeded"];

impl RetryClassifier<ApiError> for StatusClassifier {
    fn classify(&self, err: &ApiError) -> RetryClass {
        match err {
            ApiError::Http { status: 429, .. } => RetryClass::Quota,
            ApiError::Http { reason, .. } if QUOTA_REASONS.contains(&reason.as_str()) => {
                RetryClass::Quota
            }
            ApiError::Http { status, .. } if (500..=599).contains(status) => {
                RetryClass::ServerTransient
            }
            ApiError::Transport(_) => RetryClass::ServerTransient,
            _ => RetryClass::Fatal,
        }
    }
}

/// Classifier selected by configuration. Message sniffing unless asked otherwise.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classifier {
    #[default]
    Substring,
    Status,
}

impl RetryClassifier<ApiError> for Classifier {
    fn classify(&self, err: &ApiError) -> RetryClass {
        match self {
            Self::Substring => SubstringClassifier.classify(err),
            Self::Status => StatusClassifier.classify(err),
        }
    }
}

/// Authorized client shared by all adapters. Cheap to clone.
#[derive(Clone)]
pub struct GoogleClient {
    http: reqwest::Client,
    token: Arc<str>,
}

impl std::fmt::Debug for GoogleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleClient")
            .field("token", &"<redacted>")
            .finish()
    }
}

impl GoogleClient {
    pub fn new(access_token: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(timeout)
            .pool_max_idle_per_host(16)
            .build()
            .map_err(ApiError::from_reqwest)?;
        Ok(Self {
            http,
            token: Arc::from(access_token),
        })
    }

    pub(crate) fn get(&self, url: Url) -> RequestBuilder {
        self.http.get(url).bearer_auth(&self.token)
    }

    pub(crate) fn post(&self, url: Url) -> RequestBuilder {
        self.http.post(url).bearer_auth(&self.token)
    }

    pub(crate) fn patch(&self, url: Url) -> RequestBuilder {
        self.http.patch(url).bearer_auth(&self.token)
    }

    /// Send `req` and decode a 2xx JSON body.
    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
    ) -> Result<T, ApiError> {
        let resp = req.send().await.map_err(ApiError::from_reqwest)?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(ApiError::from_reqwest)?;
        decode_body(status, &body)
    }

    /// GET `url` with `query`, plus `pageToken` unless `cursor` is empty.
    pub(crate) fn list_request(
        &self,
        url: Url,
        query: &[(&str, String)],
        cursor: &str,
    ) -> RequestBuilder {
        let req = self.get(url).query(query);
        if cursor.is_empty() {
            req
        } else {
            req.query(&[("pageToken", cursor)])
        }
    }

    /// One list call, as a [`Page`].
    pub(crate) async fn list_page<R>(
        &self,
        url: Url,
        query: &[(&str, String)],
        cursor: &str,
    ) -> Result<Page<R::Item>, ApiError>
    where
        R: ListResponse + DeserializeOwned,
    {
        let resp: R = self
            .send_json(self.list_request(url, query, cursor))
            .await?;
        Ok(resp.into_page())
    }
}

/// Decode a response body: JSON `T` on 2xx, [`ApiError::Http`] otherwise.
pub(crate) fn decode_body<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, ApiError> {
    if !(200..300).contains(&status) {
        return Err(ApiError::from_response(status, body));
    }
    serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))
}

/// `base` with `segments` appended, each percent-encoded as one path segment.
pub(crate) fn endpoint(base: &str, segments: &[&str]) -> Result<Url, ApiError> {
    let mut url = Url::parse(base).map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|()| ApiError::InvalidUrl(base.to_string()))?
        .extend(segments);
    Ok(url)
}
