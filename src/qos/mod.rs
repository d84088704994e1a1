pub mod bucket;
pub mod recorder;

pub use bucket::{Admission, TokenBucket};
pub use recorder::{MetricsRecorder, MetricsSnapshot};

use std::time::Instant;

/// One completed-request observation held in the sliding window.
/// The stamping middleware creates these; snapshots derive everything
/// else from them. Immutable once recorded.
#[derive(Debug, Clone)]
pub struct Sample {
    /// Completion time, from the injected clock.
    pub recorded_at: Instant,
    /// e.g. "/slow"
    pub endpoint: String,
    /// Wall time spent handling the request (ms).
    pub duration_ms: u64,
    /// HTTP-style status code; >= 400 counts as an error.
    pub status: u16,
}
