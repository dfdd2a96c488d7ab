//! Single outbound GET with a spoofed header set.
//!
//! Redirects are followed manually so the intermediate hops stay inspectable:
//! several strategies find their answer on a hop rather than on the final URL.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap};
use reqwest::{Client, StatusCode, redirect};
use tracing::{debug, trace};
use url::Url;

use crate::config::{DEFAULT_REQUEST_TIMEOUT, ResolverConfig};
use crate::error::FetchError;

/// One GET request.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub headers: HeaderMap,
    pub follow_redirects: bool,
    pub timeout: Duration,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>, headers: HeaderMap) -> Self {
        Self {
            url: url.into(),
            headers,
            follow_redirects: true,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }
}

/// Outcome of a completed request.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// URL of the last response, after redirects.
    pub final_url: String,
    pub status: u16,
    pub body: String,
    /// URLs that answered with a redirect, in request order.
    pub redirect_chain: Vec<String>,
}

impl FetchResult {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The final URL if it contains `marker`, otherwise the first redirect hop
    /// that does. The flag is `true` when the match came from the chain.
    pub fn find_marked(&self, marker: &str) -> Option<(&str, bool)> {
        if self.final_url.contains(marker) {
            return Some((self.final_url.as_str(), false));
        }
        self.redirect_chain
            .iter()
            .find(|hop| hop.contains(marker))
            .map(|hop| (hop.as_str(), true))
    }
}

/// Outbound HTTP seam. Strategies only talk to the network through this.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResult, FetchError>;
}

pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            // Another crate got there first.
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// [`Fetch`] implementation backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    max_redirects: usize,
}

impl HttpFetcher {
    pub fn new(config: &ResolverConfig) -> Result<Self, FetchError> {
        install_rustls_provider();
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| FetchError::Http(e.to_string()))?;
        Ok(Self {
            client,
            max_redirects: config.max_redirects,
        })
    }

    async fn run(&self, request: &FetchRequest) -> Result<FetchResult, FetchError> {
        let mut current = Url::parse(&request.url)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {e}", request.url)))?;
        let mut redirect_chain = Vec::new();

        loop {
            let response = self
                .client
                .get(current.clone())
                .headers(request.headers.clone())
                .timeout(request.timeout)
                .send()
                .await
                .map_err(|e| FetchError::from_reqwest(e, request.timeout))?;

            let status = response.status();
            let location = redirect_target(&current, status, response.headers());

            match location {
                Some(next) if request.follow_redirects => {
                    if redirect_chain.len() >= self.max_redirects {
                        return Err(FetchError::TooManyRedirects(self.max_redirects));
                    }
                    trace!(
                        from = %current,
                        to = %next,
                        status = status.as_u16(),
                        "Following redirect"
                    );
                    redirect_chain.push(current.to_string());
                    current = next;
                }
                _ => {
                    let body = response
                        .text()
                        .await
                        .map_err(|e| FetchError::from_reqwest(e, request.timeout))?;
                    return Ok(FetchResult {
                        final_url: current.to_string(),
                        status: status.as_u16(),
                        body,
                        redirect_chain,
                    });
                }
            }
        }
    }
}

fn redirect_target(current: &Url, status: StatusCode, headers: &HeaderMap) -> Option<Url> {
    if !status.is_redirection() {
        return None;
    }
    let location = headers.get(header::LOCATION)?.to_str().ok()?;
    match current.join(location) {
        Ok(next) => Some(next),
        Err(e) => {
            debug!(location, error = %e, "Ignoring unparsable redirect location");
            None
        }
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResult, FetchError> {
        // Covers the whole redirect chain, not just a single hop.
        match tokio::time::timeout(request.timeout, self.run(&request)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(request.timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MAX_REDIRECTS;

    use axum::Router;
    use axum::http::HeaderMap as AxumHeaderMap;
    use axum::response::Redirect;
    use axum::routing::get;
    use tokio::net::TcpListener;

    async fn spawn_upstream() -> String {
        let app = Router::new()
            .route("/short", get(|| async { Redirect::temporary("/hop") }))
            .route("/hop", get(|| async { Redirect::permanent("/final?x=1") }))
            .route("/final", get(|| async { "landed" }))
            .route("/loop", get(|| async { Redirect::temporary("/loop") }))
            .route(
                "/echo-ua",
                get(|headers: AxumHeaderMap| async move {
                    headers
                        .get("user-agent")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string()
                }),
            )
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "late"
                }),
            );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(&ResolverConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn keeps_redirect_chain() {
        let base = spawn_upstream().await;
        let result = fetcher()
            .fetch(FetchRequest::get(format!("{base}/short"), HeaderMap::new()))
            .await
            .unwrap();
        assert_eq!(result.status, 200);
        assert_eq!(result.body, "landed");
        assert_eq!(result.final_url, format!("{base}/final?x=1"));
        assert_eq!(
            result.redirect_chain,
            vec![format!("{base}/short"), format!("{base}/hop")]
        );
        let hop = format!("{base}/hop");
        assert_eq!(result.find_marked("/hop"), Some((hop.as_str(), true)));
        assert_eq!(result.find_marked("/final").map(|(_, hop)| hop), Some(false));
    }

    #[tokio::test]
    async fn does_not_follow_when_disabled() {
        let base = spawn_upstream().await;
        let result = fetcher()
            .fetch(
                FetchRequest::get(format!("{base}/short"), HeaderMap::new())
                    .follow_redirects(false),
            )
            .await
            .unwrap();
        assert_eq!(result.status, 307);
        assert!(result.redirect_chain.is_empty());
        assert_eq!(result.final_url, format!("{base}/short"));
    }

    #[tokio::test]
    async fn redirect_loop_is_bounded() {
        let base = spawn_upstream().await;
        let err = fetcher()
            .fetch(FetchRequest::get(format!("{base}/loop"), HeaderMap::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::TooManyRedirects(DEFAULT_MAX_REDIRECTS)));
    }

    #[tokio::test]
    async fn sends_given_headers() {
        let base = spawn_upstream().await;
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, "probe/1.0".parse().unwrap());
        let result = fetcher()
            .fetch(FetchRequest::get(format!("{base}/echo-ua"), headers))
            .await
            .unwrap();
        assert_eq!(result.body, "probe/1.0");
    }

    #[tokio::test]
    async fn times_out() {
        let base = spawn_upstream().await;
        let err = fetcher()
            .fetch(
                FetchRequest::get(format!("{base}/slow"), HeaderMap::new())
                    .timeout(Duration::from_millis(200)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Timeout(_)));
    }

    #[tokio::test]
    async fn rejects_invalid_url() {
        let err = fetcher()
            .fetch(FetchRequest::get("not a url", HeaderMap::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }
}
