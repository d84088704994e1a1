use std::net::SocketAddr;
use std::sync::Arc;

mod clock;
mod config;
mod handlers;
mod middleware;
mod qos;
mod server;

use clock::{Clock, SystemClock};
use config::QosConfig;
use qos::{MetricsRecorder, TokenBucket};

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    /// Static QoS policy, resolved once at startup.
    pub config: QosConfig,

    /// Admission controller — consulted before any simulated work runs.
    pub bucket: TokenBucket,

    /// Sliding-window metrics engine — middleware pushes samples,
    /// /qos reads snapshots.
    pub recorder: MetricsRecorder,
}

#[tokio::main]
async fn main() {
    println!();
    println!("╔══════════════════════════════════════════════════╗");
    println!("║   🧪  NETWORK LAB — QoS ADMISSION & METRICS      ║");
    println!("╚══════════════════════════════════════════════════╝");
    println!();

    // ── 1. Resolve configuration ─────────────────────────────────
    let config = QosConfig::from_env().expect("invalid QoS configuration");
    println!(
        "QoS policy: {} tokens/s, burst {}, window {} samples",
        config.policy.tokens_per_sec, config.policy.burst, config.window_capacity,
    );

    // ── 2. Build shared state ────────────────────────────────────
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let state = Arc::new(AppState {
        config,
        bucket: TokenBucket::new(config.policy, clock.clone()),
        recorder: MetricsRecorder::new(config.window_capacity, config.policy, clock),
    });

    // ── 3. Build Axum router ─────────────────────────────────────
    let app = server::create_router(state);

    // ── 4. Bind & serve ──────────────────────────────────────────
    let addr = "0.0.0.0:5000";
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to port 5000 — is it already in use?");

    println!();
    println!("Server listening on http://localhost:5000");
    println!("Metrics JSON    → http://localhost:5000/qos");
    println!("Metrics SSE     → http://localhost:5000/qos/stream");
    println!();

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server exited with error");
}
