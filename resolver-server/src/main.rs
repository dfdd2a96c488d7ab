use std::sync::Arc;

use resolver_server::api::{ApiServer, ApiServerConfig, AppState};
use resolver_server::config::{AccessConfigStore, ServerConfig, SharedAccessConfig, spawn_refresh};
use resolver_server::logging::init_logging;
use shortlink_resolver::{Resolver, ResolverConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let server_config = ServerConfig::from_env_or_default();
    let store = AccessConfigStore::new(&server_config.access_config_path);
    let access = SharedAccessConfig::new(store.load_or_init());
    tracing::info!(
        path = %store.path().display(),
        refresh_secs = server_config.refresh_interval.as_secs(),
        "Access config loaded"
    );

    let resolver = Arc::new(Resolver::new(ResolverConfig::default())?);
    let state = AppState::new(resolver, access.clone(), store.clone());
    let server = ApiServer::new(ApiServerConfig::from_env_or_default(), state);

    let cancel = server.cancel_token();
    let refresh = spawn_refresh(store, access, server_config.refresh_interval, cancel.clone());

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            return;
        }
        cancel.cancel();
    });

    server.run().await?;
    refresh.await?;
    Ok(())
}
