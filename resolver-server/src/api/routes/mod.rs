//! API route definitions.

pub mod admin;
pub mod auth;
pub mod info;
pub mod parse;

use axum::{Router, middleware};

use crate::api::auth::{require_access, require_admin};
use crate::api::server::AppState;

/// Create the main API router with all routes.
pub fn create_router(state: AppState) -> Router {
    let gated = Router::new()
        .merge(parse::router())
        .merge(info::gated_router())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_access));

    let admin = admin::router().route_layer(middleware::from_fn_with_state(
        state.clone(),
        require_admin,
    ));

    Router::new()
        .merge(gated)
        .merge(admin)
        .merge(auth::router())
        .merge(info::public_router())
        .with_state(state)
}

#[cfg(test)]
pub(crate) use test_support::test_state;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use async_trait::async_trait;
    use shortlink_resolver::{Fetch, FetchError, FetchRequest, FetchResult, Resolver, ResolverConfig};

    use crate::api::server::AppState;
    use crate::config::{AccessConfig, AccessConfigStore, SharedAccessConfig};

    /// Upstream that refuses every connection.
    pub(crate) struct Unreachable;

    #[async_trait]
    impl Fetch for Unreachable {
        async fn fetch(&self, _: FetchRequest) -> Result<FetchResult, FetchError> {
            Err(FetchError::Connect("connection refused".into()))
        }
    }

    /// State with default credentials, an offline resolver and a throwaway
    /// config file.
    pub(crate) fn test_state() -> AppState {
        let dir = tempfile::tempdir().unwrap().keep();
        let store = AccessConfigStore::new(dir.join("api_config.json"));
        store.save(&AccessConfig::default()).unwrap();
        let resolver = Resolver::with_fetcher(ResolverConfig::default(), Arc::new(Unreachable));
        AppState::new(
            Arc::new(resolver),
            SharedAccessConfig::new(AccessConfig::default()),
            store,
        )
    }
}
