//! Operational HTTP endpoints.
//!
//! - `/healthz` : liveness
//! - `/metrics` : Prometheus text format, one fresh collection pass per request

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::app_state::AppState;

pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    match state.export().await {
        Ok(exposition) => {
            tracing::debug!(
                samples = exposition.samples,
                skipped = exposition.skipped.len(),
                "scrape served"
            );
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, CONTENT_TYPE)],
                exposition.text,
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!(class = e.class().as_str(), error = %e, "export failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
