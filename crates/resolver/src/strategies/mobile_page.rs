use async_trait::async_trait;
use tracing::debug;

use super::{Strategy, StrategyContext, StrategyHit, StrategyReport};
use crate::error::AttemptError;
use crate::identity::{HeaderProfile, SpoofedIdentity};
use crate::patterns::{extract_media_candidates, find_marked_url};
use crate::trace::ResolutionAttempt;

/// Scrapes the canonical video page with a mobile identity.
///
/// A CDN URL anywhere in the markup wins; otherwise the media pattern family
/// runs in order.
pub struct MobilePage;

#[async_trait]
impl Strategy for MobilePage {
    fn name(&self) -> &'static str {
        "mobile_page"
    }

    async fn run(&self, ctx: &StrategyContext<'_>) -> StrategyReport {
        let url = format!("{}{}", ctx.endpoints().video_page, ctx.video_id);
        let attempt = ResolutionAttempt::new(self.name()).requested(&url);

        let result = match ctx
            .get(&url, &SpoofedIdentity::mobile(), HeaderProfile::Page)
            .await
        {
            Ok(result) => result,
            Err(e) => return StrategyReport::miss(attempt, e.into()),
        };
        let attempt = attempt.fetched(&result);

        // Error pages sometimes still embed the player config, so the body
        // is scanned regardless of status.
        let candidates = extract_media_candidates(&result.body);
        let cdn_url = find_marked_url(&result.body, &ctx.endpoints().cdn_host_marker);
        let (media_url, pattern) = match (cdn_url, candidates.video_url) {
            (Some(url), _) => (url, "cdn_host_literal"),
            (None, Some(url)) => (url, candidates.matched_pattern.unwrap_or("media_url")),
            (None, None) => {
                let err = AttemptError::NoMatch(format!(
                    "no media url in {} bytes of markup",
                    result.body.len()
                ));
                return StrategyReport::miss(attempt, err);
            }
        };

        debug!(video_id = %ctx.video_id, pattern, %media_url, "Found media url in page");
        let mut hit = StrategyHit::new(media_url, "mobile_page");
        hit.title = candidates.title;
        hit.cover_image = candidates.cover_image;
        StrategyReport::hit(attempt.matched(pattern), hit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::VideoId;
    use crate::test_support::{config_for, fetcher_for, serve};

    use axum::Router;
    use axum::extract::Path;
    use axum::routing::get;

    async fn page(Path(id): Path<String>) -> String {
        match id.as_str() {
            "1" => r#"<script>{"playAddr":"https:\/\/media.example\/v\/1.mp4?x=1",
                "desc":"walking the dog","cover":"https://p.example/c.jpg"}</script>"#
                .to_string(),
            "2" => format!(
                r#"<video src="http://127.0.0.1/elsewhere.mp4"></video>
                <script>"url":"http:\/\/cdn.example\/cdn\/video\/tos\/{id}\/"</script>"#
            ),
            _ => "<html><body>nothing here</body></html>".to_string(),
        }
    }

    async fn run_for(id: &str) -> StrategyReport {
        let app = Router::new().route("/video/{id}", get(page));
        let base = serve(app).await;
        let config = config_for(&base);
        let fetcher = fetcher_for(&config);
        let video_id = VideoId::new(id);
        let ctx = StrategyContext {
            video_id: &video_id,
            fetcher: fetcher.as_ref(),
            config: &config,
        };
        MobilePage.run(&ctx).await
    }

    #[tokio::test]
    async fn scrapes_embedded_player_config() {
        let report = run_for("1").await;
        let hit = report.hit.expect("page embeds a play address");
        assert_eq!(hit.media_url, "https://media.example/v/1.mp4?x=1");
        assert_eq!(hit.provenance, "mobile_page");
        assert_eq!(hit.title.as_deref(), Some("walking the dog"));
        assert_eq!(hit.cover_image.as_deref(), Some("https://p.example/c.jpg"));
        assert_eq!(report.attempt.matched_pattern.as_deref(), Some("play_addr_json"));
    }

    #[tokio::test]
    async fn prefers_cdn_urls() {
        let report = run_for("2").await;
        let hit = report.hit.unwrap();
        assert_eq!(hit.media_url, "http://cdn.example/cdn/video/tos/2/");
        assert_eq!(report.attempt.matched_pattern.as_deref(), Some("cdn_host_literal"));
    }

    #[tokio::test]
    async fn markup_without_media_is_a_miss() {
        let report = run_for("3").await;
        assert!(report.hit.is_none());
        assert!(report.attempt.error.unwrap().starts_with("no match"));
        assert_eq!(report.attempt.response_status, Some(200));
    }
}
