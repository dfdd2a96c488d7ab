//! The ordered strategy chain.
//!
//! Every strategy is independent: it gets the video identifier, makes its own
//! requests with a freshly spoofed identity and reports exactly one
//! [`ResolutionAttempt`]. Network and parse failures stay inside the report.

use async_trait::async_trait;

use crate::config::{Endpoints, ResolverConfig};
use crate::error::{AttemptError, FetchError};
use crate::fetcher::{Fetch, FetchRequest, FetchResult};
use crate::identity::{HeaderProfile, SpoofedIdentity, random_suffix, unix_timestamp};
use crate::patterns::VideoId;
use crate::trace::ResolutionAttempt;

mod direct_link;
mod mobile_page;
pub(crate) mod models;
mod official_api;
mod play_api;
pub(crate) mod redirect;
mod universal_probe;

pub use direct_link::DirectLink;
pub use mobile_page::MobilePage;
pub use official_api::OfficialApi;
pub use play_api::PlayApi;
pub use universal_probe::UniversalProbe;

/// Everything a strategy may use.
pub struct StrategyContext<'a> {
    pub video_id: &'a VideoId,
    pub fetcher: &'a dyn Fetch,
    pub config: &'a ResolverConfig,
}

impl StrategyContext<'_> {
    pub fn endpoints(&self) -> &Endpoints {
        &self.config.endpoints
    }

    /// GET `url` with the identity's headers for `profile`.
    pub async fn get(
        &self,
        url: &str,
        identity: &SpoofedIdentity,
        profile: HeaderProfile,
    ) -> Result<FetchResult, FetchError> {
        let headers = identity.headers(profile, &self.config.endpoints.referer);
        let request = FetchRequest::get(url, headers).timeout(self.config.request_timeout);
        self.fetcher.fetch(request).await
    }
}

/// A media URL found by a strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyHit {
    pub media_url: String,
    pub title: Option<String>,
    pub cover_image: Option<String>,
    /// Which strategy, and which variant of it, produced the URL.
    pub provenance: &'static str,
}

impl StrategyHit {
    pub fn new(media_url: impl Into<String>, provenance: &'static str) -> Self {
        Self {
            media_url: media_url.into(),
            title: None,
            cover_image: None,
            provenance,
        }
    }
}

/// What one strategy run produced: its attempt, and a hit if it found one.
#[derive(Debug)]
pub struct StrategyReport {
    pub attempt: ResolutionAttempt,
    pub hit: Option<StrategyHit>,
}

impl StrategyReport {
    pub fn hit(attempt: ResolutionAttempt, hit: StrategyHit) -> Self {
        Self {
            attempt,
            hit: Some(hit),
        }
    }

    pub fn miss(attempt: ResolutionAttempt, error: AttemptError) -> Self {
        Self {
            attempt: attempt.failed(&error),
            hit: None,
        }
    }
}

#[async_trait]
pub trait Strategy: Send + Sync {
    /// Stable name, recorded in the trace.
    fn name(&self) -> &'static str;

    /// Whether the strategy talks to upstream at all. Strategies that do not
    /// still run after the overall deadline has passed.
    fn needs_network(&self) -> bool {
        true
    }

    /// Runs the strategy once. Must not fail: every problem is reported
    /// through [`StrategyReport::miss`].
    async fn run(&self, ctx: &StrategyContext<'_>) -> StrategyReport;
}

/// Official API, mobile page, playApi, universal probe, direct link.
pub fn default_chain() -> Vec<Box<dyn Strategy>> {
    vec![
        Box::new(OfficialApi),
        Box::new(MobilePage),
        Box::new(PlayApi),
        Box::new(UniversalProbe),
        Box::new(DirectLink),
    ]
}

/// Non-watermarked play URL for `id`, with a fresh cache-busting `t`.
pub(crate) fn special_play_url(endpoints: &Endpoints, id: &VideoId) -> String {
    format!(
        "{}?video_id={id}&ratio=720p&line=0&media_type=4&vr_type=0&improve_bitrate=0\
         &is_play_url=1&is_support_h265=0&source=PackSourceEnum_PUBLISH&t={}{}",
        endpoints.play,
        unix_timestamp(),
        random_suffix(8)
    )
}
