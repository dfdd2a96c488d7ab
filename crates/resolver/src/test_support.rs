//! Local stand-in for the upstream hosts.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;

use crate::config::{Endpoints, ResolverConfig};
use crate::fetcher::HttpFetcher;

/// Serves `app` on an ephemeral port and returns its base URL.
pub(crate) async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Config whose endpoints all point at `base`.
pub(crate) fn config_for(base: &str) -> ResolverConfig {
    ResolverConfig::default()
        .with_endpoints(Endpoints::rebased(base))
        .with_request_timeout(Duration::from_secs(2))
}

pub(crate) fn fetcher_for(config: &ResolverConfig) -> Arc<HttpFetcher> {
    Arc::new(HttpFetcher::new(config).unwrap())
}
