use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::AppState;

use super::AppError;

/// Upper bound on a requested simulated delay, so one client cannot
/// park a connection for minutes.
const MAX_SIMULATED_MS: u64 = 10_000;

// ─── Request types ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SlowParams {
    /// Simulated processing time (ms)
    #[serde(default = "default_ms")]
    pub ms: u64,
}

fn default_ms() -> u64 {
    200
}

#[derive(Debug, Deserialize)]
pub struct LossParams {
    /// Probability of a simulated error, in [0, 1]
    #[serde(default = "default_p")]
    pub p: f64,
}

fn default_p() -> f64 {
    0.1
}

// ─── GET /slow ───────────────────────────────────────────────────
/// Admission-gated latency simulation: sleep for the requested
/// duration, then report it back.

pub async fn slow(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SlowParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    let admission = state.bucket.admit();
    if !admission.allowed {
        return Err(AppError::RateLimited {
            retry_after_secs: admission.retry_after_secs,
        });
    }

    if params.ms > MAX_SIMULATED_MS {
        return Err(AppError::BadRequest(format!(
            "ms must be between 0 and {MAX_SIMULATED_MS}"
        )));
    }

    tokio::time::sleep(Duration::from_millis(params.ms)).await;

    Ok(Json(json!({
        "ok": true,
        "simulated_processing_ms": params.ms,
    })))
}

// ─── GET /loss ───────────────────────────────────────────────────
/// Admission-gated loss simulation: fail with 503 with the requested
/// probability.

pub async fn loss(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LossParams>,
) -> Result<Response, AppError> {
    let admission = state.bucket.admit();
    if !admission.allowed {
        return Err(AppError::RateLimited {
            retry_after_secs: admission.retry_after_secs,
        });
    }

    if !(0.0..=1.0).contains(&params.p) {
        return Err(AppError::BadRequest(
            "p must be between 0 and 1".into(),
        ));
    }

    if rand::random::<f64>() < params.p {
        let body = json!({"ok": false, "simulated": "loss/error"});
        return Ok((StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response());
    }

    Ok(Json(json!({"ok": true, "simulated": "no_loss"})).into_response())
}
