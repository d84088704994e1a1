use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use rand::Rng;

use crate::handlers::RateLimited;
use crate::AppState;

pub const SERVICE_NAME: &str = "network-lab";
pub const SERVICE_VERSION: &str = "1.0";

/// Tower-compatible middleware wrapping every route:
///
///   - records a completed-request sample into the metrics window
///     (skipped for rate-limited requests, which did no work, and for
///     the never-ending SSE stream)
///   - stamps contract-ish response headers: X-Service-Name,
///     X-Service-Version, X-Request-Id
///
/// Also prints a coloured one-liner to stdout for development.
pub async fn stamp_and_record(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    let start = Instant::now();
    let mut response = next.run(req).await;
    let duration_ms = start.elapsed().as_millis() as u64;

    let status = response.status().as_u16();
    let denied = response.extensions().get::<RateLimited>().is_some();
    if !denied && !path.ends_with("/stream") {
        state.recorder.record(&path, duration_ms, status);
    }

    // ── Inject response headers ─────────────────────────────────
    if let Ok(val) = SERVICE_NAME.parse() {
        response.headers_mut().insert("X-Service-Name", val);
    }
    if let Ok(val) = SERVICE_VERSION.parse() {
        response.headers_mut().insert("X-Service-Version", val);
    }
    let request_id = format!(
        "{}-{}",
        chrono::Utc::now().timestamp_millis(),
        rand::thread_rng().gen_range(1000..10000),
    );
    if let Ok(val) = request_id.parse() {
        response.headers_mut().insert("X-Request-Id", val);
    }

    // ── Console log ─────────────────────────────────────────────
    let colour = match status {
        200..=299 => "\x1b[32m", // green
        400..=499 => "\x1b[33m", // yellow
        _ => "\x1b[31m",         // red
    };
    if !path.contains("/stream") {
        println!(
            "  {colour}{status}\x1b[0m  {method:<5} {path:<25} {duration_ms:>5}ms"
        );
    }

    response
}
