use async_trait::async_trait;
use tracing::debug;

use super::models::ItemInfoResponse;
use super::{Strategy, StrategyContext, StrategyHit, StrategyReport};
use crate::error::AttemptError;
use crate::identity::{HeaderProfile, SpoofedIdentity};
use crate::trace::ResolutionAttempt;

/// Queries the JSON item-info endpoint.
///
/// The play address it returns is watermarked; swapping `playwm` for `play`
/// yields the clean stream.
pub struct OfficialApi;

#[async_trait]
impl Strategy for OfficialApi {
    fn name(&self) -> &'static str {
        "official_api"
    }

    async fn run(&self, ctx: &StrategyContext<'_>) -> StrategyReport {
        let url = format!("{}?item_ids={}", ctx.endpoints().item_info, ctx.video_id);
        let attempt = ResolutionAttempt::new(self.name()).requested(&url);

        let result = match ctx
            .get(&url, &SpoofedIdentity::mobile(), HeaderProfile::Api)
            .await
        {
            Ok(result) => result,
            Err(e) => return StrategyReport::miss(attempt, e.into()),
        };
        let attempt = attempt.fetched(&result);
        if !result.is_success() {
            return StrategyReport::miss(attempt, AttemptError::UnexpectedStatus(result.status));
        }

        let response: ItemInfoResponse = match serde_json::from_str(&result.body) {
            Ok(response) => response,
            Err(e) => {
                return StrategyReport::miss(attempt, AttemptError::MalformedResponse(e.to_string()));
            }
        };
        let Some(item) = response.item_list.first() else {
            return StrategyReport::miss(attempt, AttemptError::NoMatch("empty item_list".into()));
        };
        let Some(play_url) = item.play_url() else {
            return StrategyReport::miss(
                attempt,
                AttemptError::NoMatch("item has no play address".into()),
            );
        };

        let media_url = play_url.replace("playwm", "play");
        debug!(video_id = %ctx.video_id, %media_url, "Item info returned a play address");
        let mut hit = StrategyHit::new(media_url, "official_api");
        hit.title = item.title().map(ToOwned::to_owned);
        hit.cover_image = item.cover_url().map(ToOwned::to_owned);
        StrategyReport::hit(attempt.matched("item_list[0].video.play_addr"), hit)
    }
}
