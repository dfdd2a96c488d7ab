use async_trait::async_trait;
use tracing::debug;

use super::{Strategy, StrategyContext, StrategyHit, StrategyReport};
use crate::config::Endpoints;
use crate::error::AttemptError;
use crate::identity::{HeaderProfile, SpoofedIdentity, unix_timestamp};
use crate::patterns::{extract_play_api, extract_video_id_param, find_marked_url};
use crate::trace::ResolutionAttempt;

const CDN_QUERY: &str = "?a=1128&ch=0&cr=0&dr=0&cd=0%7C0%7C0%7C0&cv=1&br=1064&bt=1064&cs=0&ds=3\
    &ft=bvjPVvmzEm0WD12ql1T10.UBfa&mime_type=video_mp4&qs=0\
    &rc=ZDU4OWk0OTM3aDg7NWc5OkBpM2c6OTw6ZnFyZzMzNGkzM0A0YjRgLWBjXjMxYC8vYTFeYSMuby5ecjRnMGJgLS1kLS9zcw%3D%3D\
    &btag=e00028000";

/// Scrapes the desktop page for a CDN URL or its embedded `playApi` field.
///
/// A literal CDN URL in the desktop markup wins. Failing that, a `playApi`
/// carrying a `video_id` has its CDN URL rebuilt from a fixed template, and
/// any other playApi URL is followed and its redirect chain searched for the
/// CDN host.
pub struct PlayApi;

fn reconstruct(endpoints: &Endpoints, play_video_id: &str) -> String {
    format!(
        "{}{play_video_id}/{CDN_QUERY}&dy_q={}",
        endpoints.cdn_template,
        unix_timestamp()
    )
}

#[async_trait]
impl Strategy for PlayApi {
    fn name(&self) -> &'static str {
        "play_api"
    }

    async fn run(&self, ctx: &StrategyContext<'_>) -> StrategyReport {
        let page_url = format!("{}{}", ctx.endpoints().video_page, ctx.video_id);
        let attempt = ResolutionAttempt::new(self.name()).requested(&page_url);

        let page = match ctx
            .get(&page_url, &SpoofedIdentity::desktop(), HeaderProfile::Page)
            .await
        {
            Ok(page) => page,
            Err(e) => return StrategyReport::miss(attempt, e.into()),
        };
        let attempt = attempt.fetched(&page);
        let marker = ctx.endpoints().cdn_host_marker.as_str();
        if let Some(media_url) = find_marked_url(&page.body, marker) {
            debug!(video_id = %ctx.video_id, %media_url, "Found CDN url in desktop page");
            return StrategyReport::hit(
                attempt.matched("cdn_host_literal"),
                StrategyHit::new(media_url, "play_api_page_literal"),
            );
        }
        let Some(play_api) = extract_play_api(&page.body) else {
            return StrategyReport::miss(attempt, AttemptError::NoMatch("no playApi field".into()));
        };

        if let Some(play_video_id) = extract_video_id_param(&play_api) {
            let media_url = reconstruct(ctx.endpoints(), play_video_id);
            debug!(video_id = %ctx.video_id, play_video_id, "Rebuilt CDN url from playApi");
            return StrategyReport::hit(
                attempt.matched("playApi.video_id"),
                StrategyHit::new(media_url, "play_api_reconstructed"),
            );
        }

        let play_api = if play_api.starts_with("//") {
            format!("https:{play_api}")
        } else {
            play_api
        };
        let attempt = ResolutionAttempt::new(self.name())
            .requested(&play_api)
            .after(attempt.matched("playApi"));
        let followed = match ctx
            .get(&play_api, &SpoofedIdentity::mobile(), HeaderProfile::Page)
            .await
        {
            Ok(followed) => followed,
            Err(e) => return StrategyReport::miss(attempt, e.into()),
        };
        let attempt = attempt.fetched(&followed);
        match followed.find_marked(marker) {
            Some((media_url, _)) => {
                let hit = StrategyHit::new(media_url, "play_api_redirect");
                StrategyReport::hit(attempt.matched("playApi.redirect"), hit)
            }
            None => StrategyReport::miss(
                attempt,
                AttemptError::NoMatch("playApi redirect never reached the CDN".into()),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::VideoId;
    use crate::test_support::{config_for, fetcher_for};

    use axum::Router;
    use axum::extract::{Path, State};
    use axum::response::Redirect;
    use axum::routing::get;

    async fn page(State(base): State<String>, Path(id): Path<String>) -> String {
        match id.as_str() {
            "1" => r#"{"playApi": "\/\/aweme.example\/aweme\/v1\/play\/?video_id=v0300fg1&ratio=720p"}"#
                .to_string(),
            "2" => format!(r#"{{"playApi":"{base}\/redirect-me"}}"#),
            "4" => format!(
                r#"<script>{{"playApi":"{base}\/redirect-me",
                "srcUrl":"{base}\/cdn\/video\/tos\/desktop.mp4?line=0"}}</script>"#
            ),
            _ => "<html></html>".to_string(),
        }
    }

    async fn run_for(id: &str) -> (StrategyReport, String) {
        let app = Router::new()
            .route(
                "/redirect-me",
                get(|| async { Redirect::temporary("/cdn/video/tos/abc.mp4") }),
            )
            .route("/cdn/video/tos/abc.mp4", get(|| async { "bytes" }));
        let base = serve_with_pages(app).await;
        let config = config_for(&base);
        let fetcher = fetcher_for(&config);
        let video_id = VideoId::new(id);
        let ctx = StrategyContext {
            video_id: &video_id,
            fetcher: fetcher.as_ref(),
            config: &config,
        };
        (PlayApi.run(&ctx).await, base)
    }

    async fn serve_with_pages(app: Router) -> String {
        // The page handler needs the server's own address.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let app = app.merge(
            Router::new()
                .route("/video/{id}", get(page))
                .with_state(base.clone()),
        );
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        base
    }

    #[tokio::test]
    async fn rebuilds_cdn_url_from_video_id_param() {
        let (report, base) = run_for("1").await;
        let hit = report.hit.unwrap();
        assert_eq!(hit.provenance, "play_api_reconstructed");
        assert!(hit.media_url.starts_with(&format!(
            "{base}/cdn/video/tos/cn/tos-cn-ve-15c001-alinc2/v0300fg1/?a=1128&"
        )));
        assert!(hit.media_url.contains("&btag=e00028000&dy_q="));
    }

    #[tokio::test]
    async fn follows_play_api_without_video_id() {
        let (report, base) = run_for("2").await;
        let hit = report.hit.unwrap();
        assert_eq!(hit.provenance, "play_api_redirect");
        assert_eq!(hit.media_url, format!("{base}/cdn/video/tos/abc.mp4"));
        assert_eq!(report.attempt.requested_url, Some(format!("{base}/redirect-me")));

        let page = report.attempt.prior.as_deref().unwrap();
        assert_eq!(page.requested_url, Some(format!("{base}/video/2")));
        assert_eq!(page.response_status, Some(200));
        assert_eq!(page.matched_pattern.as_deref(), Some("playApi"));
    }

    #[tokio::test]
    async fn cdn_literal_in_desktop_page_wins() {
        let (report, base) = run_for("4").await;
        let hit = report.hit.unwrap();
        assert_eq!(hit.provenance, "play_api_page_literal");
        assert_eq!(hit.media_url, format!("{base}/cdn/video/tos/desktop.mp4?line=0"));
        assert_eq!(report.attempt.matched_pattern.as_deref(), Some("cdn_host_literal"));
        assert!(report.attempt.prior.is_none());
    }

    #[tokio::test]
    async fn page_without_play_api_is_a_miss() {
        let (report, _) = run_for("3").await;
        assert!(report.hit.is_none());
        assert_eq!(report.attempt.error.as_deref(), Some("no match: no playApi field"));
    }
}
