//! Axum router wiring.

use axum::{routing::get, Router};

use crate::{app_state::AppState, ops};

pub fn build_router(state: AppState) -> Router {
    let path = state.cfg().exporter.path.clone();
    Router::new()
        .route(&path, get(ops::metrics))
        .route("/healthz", get(ops::healthz))
        .with_state(state)
}
