//! HTTP API over the published sensor snapshot and its configuration

use crate::config::Config;
use crate::entity::EntitySnapshot;
use crate::error::{DayAheadError, Result};
use crate::service::ServiceCommand;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc, watch};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::WatchStream;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    pub snapshot_rx: watch::Receiver<Arc<EntitySnapshot>>,
    pub config: Arc<RwLock<Config>>,
    pub commands: mpsc::UnboundedSender<ServiceCommand>,
}

impl AppState {
    pub fn new(
        snapshot_rx: watch::Receiver<Arc<EntitySnapshot>>,
        config: Config,
        commands: mpsc::UnboundedSender<ServiceCommand>,
    ) -> Self {
        Self {
            snapshot_rx,
            config: Arc::new(RwLock::new(config)),
            commands,
        }
    }
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn version() -> impl IntoResponse {
    Json(serde_json::json!({ "version": env!("APP_VERSION") }))
}

async fn sensor(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.snapshot_rx.borrow().clone();
    Json(snapshot.as_ref().clone())
}

/// Server-sent events: the current snapshot, then one event per publish
async fn sensor_events(State(state): State<AppState>) -> impl IntoResponse {
    let stream = WatchStream::new(state.snapshot_rx.clone())
        .map(|snapshot| Event::default().event("sensor").json_data(snapshot.as_ref()));
    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn get_config(State(state): State<AppState>) -> impl IntoResponse {
    let config = state.config.read().await;
    Json(serde_json::to_value(&*config).unwrap_or(serde_json::json!({"error":"serialization"})))
}

/// Validate a new configuration and reload the sensor with it
async fn put_config(
    State(state): State<AppState>,
    Json(new_cfg_value): Json<serde_json::Value>,
) -> impl IntoResponse {
    let new_cfg: Config = match serde_json::from_value(new_cfg_value) {
        Ok(c) => c,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error":"bad request"})),
            );
        }
    };
    if let Err(e) = new_cfg.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": e.to_string()})),
        );
    }
    let mut config = state.config.write().await;
    if state
        .commands
        .send(ServiceCommand::Reload(Box::new(new_cfg.clone())))
        .is_err()
    {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({"error":"sensor not running"})),
        );
    }
    *config = new_cfg;
    (StatusCode::OK, Json(serde_json::json!({"ok":true})))
}

async fn get_config_schema() -> impl IntoResponse {
    let schema = schemars::schema_for!(Config);
    Json(serde_json::to_value(&schema).unwrap_or(serde_json::json!({"error":"schema"})))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/version", get(version))
        .route("/api/sensor", get(sensor))
        .route("/api/sensor/events", get(sensor_events))
        .route("/api/config", get(get_config).put(put_config))
        .route("/api/config/schema", get(get_config_schema))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

pub async fn serve(state: AppState, host: &str, port: u16) -> Result<()> {
    let router = build_router(state);
    let logger = crate::logging::get_logger("web");
    logger.info(&format!(
        "Starting web server; requested host={}, port={}",
        host, port
    ));

    let addr = match host.parse::<IpAddr>() {
        Ok(ip) => SocketAddr::new(ip, port),
        Err(_) => {
            logger.warn(&format!("Invalid host '{}'; falling back to 127.0.0.1", host));
            ([127, 0, 0, 1], port).into()
        }
    };

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| DayAheadError::web(format!("Failed to bind {}: {}", addr, e)))?;
    let local_addr = listener.local_addr()?;
    logger.info(&format!(
        "Web server listening at http://{}:{} (API /api)",
        local_addr.ip(),
        local_addr.port()
    ));

    axum::serve(listener, router)
        .await
        .map_err(|e| DayAheadError::web(e.to_string()))
}
