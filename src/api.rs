//! Read-only status API
//!
//! A small HTTP surface exposing the engine's tables as JSON for
//! operators and monitoring, fed by the daemon's status snapshot feed.
//! Strictly observational: nothing here can mutate engine state.

use axum::Router;
use axum::extract::State;
use axum::response::Json;
use axum::routing::get;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

use crate::engine::StatusSnapshot;

#[derive(Clone)]
struct ApiState {
    status: watch::Receiver<StatusSnapshot>,
}

/// Builds the status router over a live snapshot feed.
#[must_use]
pub fn router(status: watch::Receiver<StatusSnapshot>) -> Router {
    Router::new()
        .route("/status", get(full_status))
        .route("/neighbors", get(neighbors))
        .route("/topology", get(topology))
        .route("/routes", get(routes))
        .with_state(ApiState { status })
}

/// Binds `addr` and serves the status API until the process exits.
///
/// # Errors
///
/// Returns any bind or accept-loop error from the underlying listener.
pub async fn serve(
    addr: &str,
    status: watch::Receiver<StatusSnapshot>,
) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "status api listening");
    axum::serve(listener, router(status)).await
}

async fn full_status(State(state): State<ApiState>) -> Json<StatusSnapshot> {
    Json(state.status.borrow().clone())
}

async fn neighbors(State(state): State<ApiState>) -> Json<Value> {
    let snapshot = state.status.borrow().clone();
    Json(json!({
        "node": snapshot.node,
        "neighbors": snapshot.neighbors,
        "two_hop": snapshot.two_hop,
        "mpr_set": snapshot.mpr_set,
        "mpr_selectors": snapshot.mpr_selectors,
    }))
}

async fn topology(State(state): State<ApiState>) -> Json<Value> {
    let snapshot = state.status.borrow().clone();
    Json(json!({
        "node": snapshot.node,
        "links": snapshot.topology,
    }))
}

async fn routes(State(state): State<ApiState>) -> Json<Value> {
    let snapshot = state.status.borrow().clone();
    Json(json!({
        "node": snapshot.node,
        "routes": snapshot.routes,
    }))
}
