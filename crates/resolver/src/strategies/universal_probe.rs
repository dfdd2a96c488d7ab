use async_trait::async_trait;
use tracing::debug;

use super::{Strategy, StrategyContext, StrategyHit, StrategyReport, special_play_url};
use crate::error::AttemptError;
use crate::fetcher::FetchResult;
use crate::identity::{HeaderProfile, MOBILE_UAS, SpoofedIdentity, random_suffix, unix_timestamp};
use crate::trace::ResolutionAttempt;

/// Probes the play endpoints and watches where they redirect.
///
/// A generic watermarked probe with a known-good identifier goes first; if it
/// does not land on the CDN the non-watermarked endpoint is tried with the
/// real identifier. The CDN host is looked for in the final URL, then in the
/// redirect hops.
pub struct UniversalProbe;

fn landed<'a>(
    result: &'a FetchResult,
    marker: &str,
    provenance: (&'static str, &'static str),
) -> Option<(&'a str, &'static str)> {
    result
        .find_marked(marker)
        .map(|(url, via_chain)| (url, if via_chain { provenance.1 } else { provenance.0 }))
}

#[async_trait]
impl Strategy for UniversalProbe {
    fn name(&self) -> &'static str {
        "universal_probe"
    }

    async fn run(&self, ctx: &StrategyContext<'_>) -> StrategyReport {
        let endpoints = ctx.endpoints();
        let marker = endpoints.cdn_host_marker.as_str();

        let probe_url = format!(
            "{}?video_id={}&ratio=720p&line=0&t={}{}",
            endpoints.play_watermarked,
            endpoints.probe_video_id,
            unix_timestamp(),
            random_suffix(8)
        );
        let probe = ResolutionAttempt::new(self.name()).requested(&probe_url);
        let probe = match ctx
            .get(&probe_url, &SpoofedIdentity::mobile(), HeaderProfile::Page)
            .await
        {
            Ok(result) => {
                let found = landed(
                    &result,
                    marker,
                    ("universal_probe_final", "universal_probe_redirect"),
                );
                if let Some((media_url, provenance)) = found {
                    debug!(%media_url, provenance, "Generic probe landed on the CDN");
                    let attempt = probe.fetched(&result).matched(provenance);
                    return StrategyReport::hit(attempt, StrategyHit::new(media_url, provenance));
                }
                let err = AttemptError::NoMatch(format!(
                    "generic probe ended at {}",
                    result.final_url
                ));
                probe.fetched(&result).failed(&err)
            }
            Err(e) => probe.failed(&AttemptError::Network(e)),
        };
        debug!(
            video_id = %ctx.video_id,
            reason = probe.error.as_deref(),
            "Falling back to the play endpoint"
        );

        let special_url = special_play_url(endpoints, ctx.video_id);
        let attempt = ResolutionAttempt::new(self.name())
            .requested(&special_url)
            .after(probe);
        let identity = SpoofedIdentity::new(MOBILE_UAS[0]);
        let result = match ctx.get(&special_url, &identity, HeaderProfile::Minimal).await {
            Ok(result) => result,
            Err(e) => return StrategyReport::miss(attempt, e.into()),
        };
        let attempt = attempt.fetched(&result);
        match landed(&result, marker, ("special_api_final", "special_api_redirect")) {
            Some((media_url, provenance)) => {
                let hit = StrategyHit::new(media_url, provenance);
                StrategyReport::hit(attempt.matched(provenance), hit)
            }
            None => StrategyReport::miss(
                attempt,
                AttemptError::NoMatch("play endpoint never reached the CDN".into()),
            ),
        }
    }
}
