use axum::{middleware as axum_mw, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::handlers;
use crate::middleware::stamping;
use crate::AppState;

/// Builds the full Axum `Router` with all routes and middleware.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // ── Informational endpoints ─────────────────────────────
        .route("/", get(handlers::info::index))
        .route("/osi", get(handlers::info::osi))
        .route("/service", get(handlers::info::service))
        // ── Simulation endpoints (admission-gated) ──────────────
        .route("/slow", get(handlers::simulate::slow))
        .route("/loss", get(handlers::simulate::loss))
        // ── QoS metrics ─────────────────────────────────────────
        .route("/qos", get(handlers::qos::get_qos))
        .route("/qos/reset", get(handlers::qos::reset_qos))
        .route("/qos/stream", get(handlers::qos::qos_stream))
        // ── Provide shared state to all routes above ────────────
        .with_state(state.clone())
        // ── Global middleware (applied bottom-up) ───────────────
        .layer(axum_mw::from_fn_with_state(
            state,
            stamping::stamp_and_record,
        ))
        .layer(CorsLayer::permissive())
}
