use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use bizsync_core::clock::{Clock, SystemClock};
use bizsync_core::db::{EntityStore, LibSqlEntityStore, ReplicaConfig};
use bizsync_core::presence::InMemoryPresenceStore;
use bizsync_core::util::device_fingerprint;
use bizsync_core::{Action, SyncCoordinator, SyncRequest, SyncResponse};
use chrono::Utc;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::network::{attach_network_id, NetworkId};
use crate::rate_limit::{RateLimitMetricsSnapshot, SyncRateLimiter};

pub type Coordinator<S = LibSqlEntityStore> = SyncCoordinator<S, InMemoryPresenceStore>;

pub struct AppState<S = LibSqlEntityStore> {
    pub config: Arc<AppConfig>,
    coordinator: Arc<Coordinator<S>>,
    rate_limiter: Arc<SyncRateLimiter>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            coordinator: Arc::clone(&self.coordinator),
            rate_limiter: Arc::clone(&self.rate_limiter),
        }
    }
}

impl AppState {
    /// Open the entity store described by `config` and wire up the coordinator
    pub async fn from_config(config: Arc<AppConfig>) -> bizsync_core::Result<Self> {
        let store = match config.replica.as_ref() {
            Some(replica) => {
                let replica = ReplicaConfig::new(replica.url.clone(), replica.auth_token.clone());
                LibSqlEntityStore::open_replica(&config.database_path, replica).await?
            }
            None if config.database_path == ":memory:" => LibSqlEntityStore::open_in_memory().await?,
            None => LibSqlEntityStore::open_path(&config.database_path).await?,
        };
        Ok(Self::new(config, store, Arc::new(SystemClock)))
    }
}

impl<S: EntityStore> AppState<S> {
    pub fn new(config: Arc<AppConfig>, store: S, clock: Arc<dyn Clock>) -> Self {
        let coordinator = SyncCoordinator::new(
            store,
            Arc::new(InMemoryPresenceStore::new()),
            config.presence_ttl,
            clock,
        );
        Self {
            rate_limiter: Arc::new(SyncRateLimiter::from_config(config.as_ref())),
            coordinator: Arc::new(coordinator),
            config,
        }
    }

    pub fn coordinator(&self) -> Arc<Coordinator<S>> {
        Arc::clone(&self.coordinator)
    }
}

pub fn app_router<S: EntityStore + 'static>(state: AppState<S>) -> Router {
    let device_routes = Router::new()
        .route("/", post(handle_action::<S>).options(preflight))
        .route("/v1/device-sync", post(handle_action::<S>).options(preflight))
        .route_layer(middleware::from_fn(attach_network_id));

    Router::new()
        .route("/healthz", get(healthz::<S>))
        .merge(device_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
    live_devices: usize,
    rate_limit: RateLimitMetricsSnapshot,
}

async fn healthz<S: EntityStore + 'static>(
    State(state): State<AppState<S>>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
        live_devices: state.coordinator.live_devices().await,
        rate_limit: state.rate_limiter.metrics_snapshot().await,
    })
}

/// Bare `OPTIONS` without CORS request headers still gets a 200
async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn handle_action<S: EntityStore + 'static>(
    State(state): State<AppState<S>>,
    Extension(network_id): Extension<NetworkId>,
    payload: Result<Json<SyncRequest>, JsonRejection>,
) -> Result<Json<SyncResponse>, AppError> {
    let Json(request) = payload.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;

    // Only well-formed syncs count against the device's window
    let action = request.validate()?;
    if action == Action::Sync {
        state.rate_limiter.check(request.device_id.trim()).await?;
    }

    let timeout = state.config.sync_timeout;
    let response = tokio::time::timeout(
        timeout,
        state.coordinator.handle(&request, network_id.as_str()),
    )
    .await
    .map_err(|_| {
        tracing::warn!(
            device = device_fingerprint(&request.device_id),
            "Request exceeded sync timeout"
        );
        AppError::Timeout(timeout.as_secs())
    })??;

    tracing::info!(
        action = action.as_str(),
        device = device_fingerprint(&request.device_id),
        "Handled device request"
    );
    Ok(Json(response))
}
