//! Diagnostic record of every attempt made during one resolution call.

use serde::{Deserialize, Serialize};

use crate::error::AttemptError;
use crate::fetcher::FetchResult;

/// One strategy's attempt. Built up before it is appended and never touched
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionAttempt {
    pub strategy: String,
    pub requested_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub redirect_chain: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
    /// An earlier request made by the same strategy, when it needed two.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior: Option<Box<ResolutionAttempt>>,
}

impl ResolutionAttempt {
    pub fn new(strategy: impl Into<String>) -> Self {
        Self {
            strategy: strategy.into(),
            requested_url: None,
            response_status: None,
            final_url: None,
            redirect_chain: Vec::new(),
            matched_pattern: None,
            error: None,
            elapsed_ms: 0,
            prior: None,
        }
    }

    pub fn requested(mut self, url: impl Into<String>) -> Self {
        self.requested_url = Some(url.into());
        self
    }

    /// Copies status, final URL and redirect chain from a response.
    pub fn fetched(mut self, result: &FetchResult) -> Self {
        self.response_status = Some(result.status);
        self.final_url = Some(result.final_url.clone());
        self.redirect_chain = result.redirect_chain.clone();
        self
    }

    pub fn matched(mut self, pattern: impl Into<String>) -> Self {
        self.matched_pattern = Some(pattern.into());
        self
    }

    pub fn failed(mut self, error: &AttemptError) -> Self {
        self.error = Some(error.to_string());
        self
    }

    /// Keeps `earlier` as this attempt's first request.
    pub fn after(mut self, earlier: ResolutionAttempt) -> Self {
        self.prior = Some(Box::new(earlier));
        self
    }

    pub fn elapsed(mut self, elapsed: std::time::Duration) -> Self {
        self.elapsed_ms = elapsed.as_millis() as u64;
        self
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Append-only, ordered by strategy priority.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolutionTrace {
    attempts: Vec<ResolutionAttempt>,
}

impl ResolutionTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, attempt: ResolutionAttempt) {
        self.attempts.push(attempt);
    }

    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    pub fn attempts(&self) -> &[ResolutionAttempt] {
        &self.attempts
    }

    pub fn last(&self) -> Option<&ResolutionAttempt> {
        self.attempts.last()
    }

    pub fn strategies(&self) -> impl Iterator<Item = &str> {
        self.attempts.iter().map(|a| a.strategy.as_str())
    }
}
