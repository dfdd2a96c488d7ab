//! Runs the strategy chain for one input and assembles the outcome.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ResolverConfig;
use crate::error::{AttemptError, FetchError, ResolveError};
use crate::fetcher::{Fetch, HttpFetcher};
use crate::patterns::{VideoId, extract_video_id, normalize_input};
use crate::strategies::{self, Strategy, StrategyContext, redirect};
use crate::trace::{ResolutionAttempt, ResolutionTrace};

/// A media URL and what is known about it.
#[derive(Debug, Clone, Serialize)]
pub struct Resolved {
    pub media_url: String,
    pub title: Option<String>,
    pub cover_image: Option<String>,
    pub video_id: VideoId,
    /// Which strategy produced `media_url`.
    pub provenance: String,
    pub original_url: String,
    pub trace: ResolutionTrace,
}

impl Resolved {
    /// The scraped title, or a placeholder derived from the identifier.
    pub fn display_title(&self) -> String {
        match &self.title {
            Some(title) => title.clone(),
            None => format!("抖音视频_{}", self.video_id),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Unresolved {
    pub reason: ResolveError,
    pub original_url: String,
    pub video_id: Option<VideoId>,
    pub trace: ResolutionTrace,
}

/// Outcome of [`Resolver::resolve`]. Both sides carry the full trace.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResolutionResult {
    Success(Resolved),
    Failure(Unresolved),
}

impl ResolutionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn trace(&self) -> &ResolutionTrace {
        match self {
            Self::Success(resolved) => &resolved.trace,
            Self::Failure(unresolved) => &unresolved.trace,
        }
    }

    pub fn into_result(self) -> Result<Resolved, Unresolved> {
        match self {
            Self::Success(resolved) => Ok(resolved),
            Self::Failure(unresolved) => Err(unresolved),
        }
    }
}

enum Bounded<T> {
    Done(T),
    Panicked,
    TimedOut,
}

/// Runs `fut` until it finishes, panics, or `deadline` passes.
async fn bounded<F: Future>(deadline: Option<tokio::time::Instant>, fut: F) -> Bounded<F::Output> {
    let guarded = AssertUnwindSafe(fut).catch_unwind();
    let outcome = match deadline {
        Some(at) => match tokio::time::timeout_at(at, guarded).await {
            Ok(outcome) => outcome,
            Err(_) => return Bounded::TimedOut,
        },
        None => guarded.await,
    };
    match outcome {
        Ok(value) => Bounded::Done(value),
        Err(_) => Bounded::Panicked,
    }
}

/// Resolves share links into direct media URLs.
///
/// Holds no per-call state; one instance can serve concurrent calls.
pub struct Resolver {
    fetcher: Arc<dyn Fetch>,
    config: ResolverConfig,
    strategies: Vec<Box<dyn Strategy>>,
}

impl Resolver {
    /// Builds a resolver backed by a real HTTP client.
    pub fn new(config: ResolverConfig) -> Result<Self, FetchError> {
        let fetcher = HttpFetcher::new(&config)?;
        Ok(Self::with_fetcher(config, Arc::new(fetcher)))
    }

    pub fn with_fetcher(config: ResolverConfig, fetcher: Arc<dyn Fetch>) -> Self {
        Self {
            fetcher,
            config,
            strategies: strategies::default_chain(),
        }
    }

    /// Replaces the strategy chain. Strategies run in the given order.
    pub fn with_strategies(mut self, strategies: Vec<Box<dyn Strategy>>) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolves `input` (a share link, a canonical URL, or share text
    /// containing one).
    ///
    /// Never fails outright: every outcome, including total failure, comes
    /// back as a [`ResolutionResult`] with its trace.
    pub async fn resolve(&self, input: &str) -> ResolutionResult {
        let started = Instant::now();
        let deadline = self
            .config
            .deadline
            .map(|budget| tokio::time::Instant::now() + budget);
        let url = normalize_input(input);
        let mut trace = ResolutionTrace::new();

        let mut video_id = extract_video_id(&url);
        if video_id.is_none() {
            let attempt_started = Instant::now();
            let expansion = redirect::follow(self.fetcher.as_ref(), &self.config, &url);
            match bounded(deadline, expansion).await {
                Bounded::Done((attempt, found)) => {
                    trace.push(attempt.elapsed(attempt_started.elapsed()));
                    video_id = found;
                }
                Bounded::Panicked => {
                    let attempt = ResolutionAttempt::new(redirect::NAME)
                        .requested(&url)
                        .failed(&AttemptError::MalformedResponse("share link expansion panicked".into()));
                    trace.push(attempt.elapsed(attempt_started.elapsed()));
                }
                Bounded::TimedOut => {
                    let attempt = ResolutionAttempt::new(redirect::NAME)
                        .requested(&url)
                        .failed(&AttemptError::DeadlineExceeded);
                    trace.push(attempt.elapsed(attempt_started.elapsed()));
                    return self.fail(ResolveError::DeadlineExceeded, url, None, trace);
                }
            }
        }

        let Some(video_id) = video_id else {
            for strategy in &self.strategies {
                let skipped = AttemptError::Skipped("no video identifier".into());
                trace.push(ResolutionAttempt::new(strategy.name()).failed(&skipped));
            }
            return self.fail(ResolveError::NoIdentifierFound, url, None, trace);
        };
        debug!(%url, %video_id, "Running strategy chain");

        let ctx = StrategyContext {
            video_id: &video_id,
            fetcher: self.fetcher.as_ref(),
            config: &self.config,
        };
        let mut expired = false;
        for strategy in &self.strategies {
            let attempt_started = Instant::now();
            if expired && strategy.needs_network() {
                let attempt = ResolutionAttempt::new(strategy.name())
                    .failed(&AttemptError::Skipped("deadline exceeded".into()));
                trace.push(attempt);
                continue;
            }
            // Past the deadline only offline strategies get here.
            let limit = if expired { None } else { deadline };
            let report = match bounded(limit, strategy.run(&ctx)).await {
                Bounded::Done(report) => report,
                Bounded::Panicked => {
                    warn!(strategy = strategy.name(), %video_id, "Strategy panicked");
                    let attempt = ResolutionAttempt::new(strategy.name())
                        .failed(&AttemptError::MalformedResponse("strategy panicked".into()));
                    trace.push(attempt.elapsed(attempt_started.elapsed()));
                    continue;
                }
                Bounded::TimedOut => {
                    warn!(strategy = strategy.name(), %video_id, "Resolution deadline exceeded");
                    let attempt = ResolutionAttempt::new(strategy.name())
                        .failed(&AttemptError::DeadlineExceeded);
                    trace.push(attempt.elapsed(attempt_started.elapsed()));
                    expired = true;
                    continue;
                }
            };

            trace.push(report.attempt.elapsed(attempt_started.elapsed()));
            if let Some(hit) = report.hit {
                info!(
                    %video_id,
                    provenance = hit.provenance,
                    attempts = trace.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Resolved media url"
                );
                return ResolutionResult::Success(Resolved {
                    media_url: hit.media_url,
                    title: hit.title,
                    cover_image: hit.cover_image,
                    video_id,
                    provenance: hit.provenance.to_string(),
                    original_url: url,
                    trace,
                });
            }
            debug!(
                strategy = strategy.name(),
                error = trace.last().and_then(|a| a.error.as_deref()),
                "Strategy produced no result"
            );
        }

        if expired {
            return self.fail(ResolveError::DeadlineExceeded, url, Some(video_id), trace);
        }
        self.fail(ResolveError::AllStrategiesExhausted, url, Some(video_id), trace)
    }

    fn fail(
        &self,
        reason: ResolveError,
        original_url: String,
        video_id: Option<VideoId>,
        trace: ResolutionTrace,
    ) -> ResolutionResult {
        warn!(
            url = %original_url,
            reason = reason.code(),
            attempts = trace.len(),
            "Resolution failed"
        );
        ResolutionResult::Failure(Unresolved {
            reason,
            original_url,
            video_id,
            trace,
        })
    }
}
