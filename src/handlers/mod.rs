pub mod info;
pub mod qos;
pub mod simulate;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

// ─── Rate-limit marker ───────────────────────────────────────────

/// Extension attached to denied responses so the stamping middleware
/// knows the request never performed work and must not be sampled.
#[derive(Debug, Clone, Copy)]
pub struct RateLimited;

// ─── Unified error type ──────────────────────────────────────────

#[derive(Debug)]
pub enum AppError {
    RateLimited { retry_after_secs: u64 },
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::RateLimited { retry_after_secs } => {
                let body = serde_json::json!({
                    "error": "rate_limited",
                    "retry_after_s": retry_after_secs,
                });
                let mut response =
                    (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
                if let Ok(val) = retry_after_secs.to_string().parse() {
                    response.headers_mut().insert(header::RETRY_AFTER, val);
                }
                response.extensions_mut().insert(RateLimited);
                response
            }
            Self::BadRequest(message) => {
                let body = serde_json::json!({
                    "error":  message,
                    "status": StatusCode::BAD_REQUEST.as_u16(),
                });
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
        }
    }
}
