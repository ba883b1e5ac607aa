//! Axum router wiring for the ops endpoint.

use std::net::SocketAddr;

use axum::{routing::get, Router};

use qat_rpc_core::error::{Result, RpcError};

use crate::{app_state::OpsState, ops};

pub fn build_router(state: OpsState) -> Router {
    Router::new()
        .route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz))
        .route("/metrics", get(ops::metrics))
        .with_state(state)
}

/// Serve the ops router on `0.0.0.0:<port>` until the task is dropped.
pub async fn serve_ops(port: u16, state: OpsState) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| RpcError::Transport(format!("bind ops endpoint {addr}: {e}")))?;
    tracing::info!(%addr, "ops endpoint listening");
    axum::serve(listener, build_router(state))
        .await
        .map_err(|e| RpcError::Transport(format!("ops endpoint failed: {e}")))
}
