use async_trait::async_trait;

use super::{Strategy, StrategyContext, StrategyHit, StrategyReport, special_play_url};
use crate::trace::ResolutionAttempt;

/// Last resort: builds the play URL from the identifier without fetching it.
///
/// The URL is never verified, so the provenance says so.
pub struct DirectLink;

#[async_trait]
impl Strategy for DirectLink {
    fn name(&self) -> &'static str {
        "direct_link"
    }

    fn needs_network(&self) -> bool {
        false
    }

    async fn run(&self, ctx: &StrategyContext<'_>) -> StrategyReport {
        let media_url = special_play_url(ctx.endpoints(), ctx.video_id);
        let mut attempt = ResolutionAttempt::new(self.name()).matched("constructed");
        attempt.final_url = Some(media_url.clone());
        StrategyReport::hit(attempt, StrategyHit::new(media_url, "direct_link_unverified"))
    }
}
