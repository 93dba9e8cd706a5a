mod config;
mod error;
mod network;
mod rate_limit;
mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use config::AppConfig;
use routes::{app_router, AppState, Coordinator};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Only load .env in development; production uses platform-native env injection.
    #[cfg(debug_assertions)]
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bizsync_api=info".parse().expect("valid directive"))
                .add_directive("bizsync_core=info".parse().expect("valid directive")),
        )
        .init();

    let config = Arc::new(AppConfig::from_env()?);
    tracing::info!("Starting bizsync-api with config: {:?}", config);

    let state = AppState::from_config(Arc::clone(&config)).await?;
    spawn_presence_pruner(state.coordinator(), config.presence_ttl);

    let bind_addr = config.bind_addr.clone();
    let router = app_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("bizsync-api listening on {}", bind_addr);
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

/// Expired presence is already invisible to discovery; this only reclaims memory.
fn spawn_presence_pruner(coordinator: Arc<Coordinator>, every: std::time::Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.tick().await;
        loop {
            interval.tick().await;
            let pruned = coordinator.prune_presence().await;
            if pruned > 0 {
                tracing::debug!(pruned, "Pruned stale device presence");
            }
        }
    });
}
