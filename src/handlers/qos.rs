use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use serde_json::{json, Value};
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;

use crate::qos::MetricsSnapshot;
use crate::AppState;

// ─── GET /qos ────────────────────────────────────────────────────
/// Single JSON snapshot of the sliding-window metrics. Returns `{}`
/// until the first request completes.

pub async fn get_qos(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.recorder.snapshot())
}

// ─── GET /qos/reset ──────────────────────────────────────────────
/// Clears the metrics window. Safe to call repeatedly.

pub async fn reset_qos(State(state): State<Arc<AppState>>) -> Json<Value> {
    state.recorder.reset();
    Json(json!({"ok": true, "message": "metrics window cleared"}))
}

// ─── GET /qos/stream ─────────────────────────────────────────────
/// Server-Sent Events feed: pushes a fresh snapshot every 500 ms.

pub async fn qos_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let interval = tokio::time::interval(Duration::from_millis(500));

    let stream = IntervalStream::new(interval).map(move |_| {
        let snapshot = state.recorder.snapshot();
        let json = serde_json::to_string(&snapshot).unwrap_or_default();
        Ok(Event::default().data(json))
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
