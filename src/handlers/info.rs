use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, Method, Uri},
    response::Html,
    Json,
};
use serde_json::{json, Value};

use crate::middleware::stamping::{SERVICE_NAME, SERVICE_VERSION};
use crate::AppState;

// ─── GET / ───────────────────────────────────────────────────────
/// Landing page listing the lab's endpoints.

pub async fn index() -> Html<&'static str> {
    Html(
        r#"
    <h1>Network Lab (Rust)</h1>
    <ul>
      <li><a href="/osi">/osi</a> &mdash; OSI mapping</li>
      <li><a href="/service">/service</a> &mdash; service contract &amp; dependencies</li>
      <li><a href="/slow?ms=300">/slow</a> &mdash; simulate latency</li>
      <li><a href="/loss?p=0.2">/loss</a> &mdash; simulate errors/loss</li>
      <li><a href="/qos">/qos</a> &mdash; live QoS metrics</li>
      <li><a href="/qos/stream">/qos/stream</a> &mdash; QoS metrics over SSE</li>
      <li><a href="/qos/reset">/qos/reset</a> &mdash; reset window</li>
    </ul>
    "#,
    )
}

// ─── GET /osi ────────────────────────────────────────────────────
/// What an application can observe of each OSI layer (mostly L7/L4,
/// hints of the rest). Echoes a subset of the incoming request.

pub async fn osi(
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
) -> Json<Value> {
    let mut subset = serde_json::Map::new();
    for name in ["host", "user-agent", "accept", "content-type"] {
        let value = headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|v| Value::String(v.to_owned()))
            .unwrap_or(Value::Null);
        subset.insert(name.to_owned(), value);
    }

    Json(json!({
        "L7_Application": {
            "http_method": method.as_str(),
            "path": uri.path(),
            "headers_subset": subset,
        },
        "L6_Presentation": "Often handled by libraries: JSON (UTF-8), TLS details not exposed here",
        "L5_Session": "HTTP keep-alive; session mgmt at app/framework level",
        "L4_Transport": {
            "remote_addr": remote.to_string(),
            "note": "TCP used under the hood for HTTP(S). Handshake not visible to the handler.",
        },
        "L3_Network": "IP routing happens below; we see the client IP (possibly via proxy).",
        "L2_DataLink": "Ethernet/Wi-Fi frames not visible to the application.",
        "L1_Physical": "Cables/radio not visible to the application.",
    }))
}

// ─── GET /service ────────────────────────────────────────────────
/// Service = interface + contract + dependencies + SLO targets.

pub async fn service(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "service": SERVICE_NAME,
        "version": SERVICE_VERSION,
        "endpoints": [
            {"path": "/slow", "method": "GET", "params": {"ms": "int (simulated processing time)"}},
            {"path": "/loss", "method": "GET", "params": {"p": "float in [0,1] (error probability)"}},
            {"path": "/qos", "method": "GET", "desc": "QoS metrics computed server-side"},
        ],
        "dependencies": [
            {"type": "runtime", "name": "Tokio + Axum"},
            {"type": "network", "name": "Internet / DNS / TLS termination (platform-managed)"},
        ],
        "qos_policy": {
            "token_bucket": state.config.policy,
        },
        "slo_examples": {
            "availability": "99.5% monthly (example)",
            "latency_p95_ms": 400,
            "error_rate": "< 1%",
        },
    }))
}
