use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Failure of a single outbound request.
///
/// Fetch errors never cross a strategy boundary: each strategy records them in
/// its attempt and reports "no result".
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("too many redirects (limit {0})")]
    TooManyRedirects(usize),
    #[error("failed to read response body: {0}")]
    Body(String),
    #[error("http error: {0}")]
    Http(String),
}

impl FetchError {
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else if err.is_body() || err.is_decode() {
            Self::Body(err.to_string())
        } else {
            Self::Http(err.to_string())
        }
    }
}

/// Reason an individual attempt produced no result.
///
/// Recorded inside a [`ResolutionAttempt`](crate::ResolutionAttempt) and absorbed
/// by the orchestrator.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("network failure: {0}")]
    Network(#[from] FetchError),
    #[error("malformed upstream response: {0}")]
    MalformedResponse(String),
    #[error("upstream returned status {0}")]
    UnexpectedStatus(u16),
    #[error("no match: {0}")]
    NoMatch(String),
    #[error("skipped: {0}")]
    Skipped(String),
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// Why a resolution call ended without a media URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveError {
    #[error("no video identifier could be extracted from the input")]
    NoIdentifierFound,
    #[error("all strategies exhausted without a media url")]
    AllStrategiesExhausted,
    #[error("resolution deadline exceeded")]
    DeadlineExceeded,
}

impl ResolveError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoIdentifierFound => "no_identifier_found",
            Self::AllStrategiesExhausted => "all_strategies_exhausted",
            Self::DeadlineExceeded => "deadline_exceeded",
        }
    }
}
