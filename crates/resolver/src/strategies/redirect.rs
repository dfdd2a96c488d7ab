//! Share-link expansion.
//!
//! Only runs when the pasted URL carries no identifier of its own.

use tracing::debug;

use crate::config::ResolverConfig;
use crate::error::AttemptError;
use crate::fetcher::{Fetch, FetchRequest};
use crate::identity::{HeaderProfile, SpoofedIdentity};
use crate::patterns::{VideoId, extract_video_id};
use crate::trace::ResolutionAttempt;

pub const NAME: &str = "redirect_follow";

/// Follows `url` and extracts an identifier from where it lands.
///
/// The final URL is checked first, then the redirect hops from last to first.
pub(crate) async fn follow(
    fetcher: &dyn Fetch,
    config: &ResolverConfig,
    url: &str,
) -> (ResolutionAttempt, Option<VideoId>) {
    let attempt = ResolutionAttempt::new(NAME).requested(url);
    let identity = SpoofedIdentity::desktop();
    let headers = identity.headers(HeaderProfile::Page, &config.endpoints.referer);
    let request = FetchRequest::get(url, headers).timeout(config.request_timeout);

    let result = match fetcher.fetch(request).await {
        Ok(result) => result,
        Err(e) => {
            debug!(url, error = %e, "Share link expansion failed");
            return (attempt.failed(&AttemptError::Network(e)), None);
        }
    };

    let attempt = attempt.fetched(&result);
    let found = extract_video_id(&result.final_url).or_else(|| {
        result
            .redirect_chain
            .iter()
            .rev()
            .find_map(|hop| extract_video_id(hop))
    });

    match found {
        Some(id) => {
            debug!(url, video_id = %id, final_url = %result.final_url, "Expanded share link");
            (attempt.matched("video_id"), Some(id))
        }
        None => {
            let err = AttemptError::NoMatch(format!(
                "no video identifier in {}",
                result.final_url
            ));
            (attempt.failed(&err), None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{config_for, fetcher_for, serve};

    use axum::Router;
    use axum::response::Redirect;
    use axum::routing::get;

    #[tokio::test]
    async fn extracts_identifier_from_landing_url() {
        let app = Router::new()
            .route(
                "/s/ABC123/",
                get(|| async { Redirect::temporary("/video/7300000000000000001?previous_page=app") }),
            )
            .route("/video/{id}", get(|| async { "<html></html>" }));
        let base = serve(app).await;
        let config = config_for(&base);
        let fetcher = fetcher_for(&config);

        let (attempt, id) = follow(fetcher.as_ref(), &config, &format!("{base}/s/ABC123/")).await;
        assert_eq!(id, Some(VideoId::new("7300000000000000001")));
        assert_eq!(attempt.strategy, NAME);
        assert_eq!(attempt.response_status, Some(200));
        assert_eq!(attempt.redirect_chain.len(), 1);
        assert!(!attempt.is_failure());
    }

    #[tokio::test]
    async fn falls_back_to_identifier_on_a_hop() {
        let app = Router::new()
            .route(
                "/s/XYZ789/",
                get(|| async { Redirect::temporary("/video/7300000000000000002") }),
            )
            .route(
                "/video/{id}",
                get(|| async { Redirect::temporary("/landing?from=share") }),
            )
            .route("/landing", get(|| async { "<html></html>" }));
        let base = serve(app).await;
        let config = config_for(&base);
        let fetcher = fetcher_for(&config);

        let (attempt, id) = follow(fetcher.as_ref(), &config, &format!("{base}/s/XYZ789/")).await;
        assert_eq!(id, Some(VideoId::new("7300000000000000002")));
        assert_eq!(attempt.final_url, Some(format!("{base}/landing?from=share")));
        assert_eq!(attempt.redirect_chain.len(), 2);
        assert_eq!(attempt.matched_pattern.as_deref(), Some("video_id"));
    }

    #[tokio::test]
    async fn reports_missing_identifier() {
        let app = Router::new().route("/s/ABC123/", get(|| async { "not a video" }));
        let base = serve(app).await;
        let config = config_for(&base);
        let fetcher = fetcher_for(&config);

        let (attempt, id) = follow(fetcher.as_ref(), &config, &format!("{base}/s/ABC123/")).await;
        assert!(id.is_none());
        assert!(attempt.error.unwrap().starts_with("no match"));
    }
}
