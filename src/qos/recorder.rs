use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;

use crate::clock::Clock;
use crate::config::TokenBucketPolicy;

use super::Sample;

// ─── Configuration ───────────────────────────────────────────────

/// Throughput is always reported over this fixed span, regardless of
/// how much of it has actually elapsed. An approximation, not a true
/// rate; kept for compatibility.
const THROUGHPUT_WINDOW_SECS: u64 = 60;

// ─── Public types ────────────────────────────────────────────────

/// Thread-safe sliding-window metrics engine.
/// The stamping middleware calls `record()`, the /qos handlers call
/// `snapshot()` and `reset()`.
pub struct MetricsRecorder {
    policy: TokenBucketPolicy,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
}

/// Point-in-time statistics derived from the window. Serializes to an
/// empty JSON object when no samples have been recorded, so callers
/// can tell "no traffic yet" apart from a failure.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum MetricsSnapshot {
    Empty {},
    Stats(WindowStats),
}

impl MetricsSnapshot {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty {})
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WindowStats {
    pub count: usize,
    pub error_rate: f64,
    pub rps_last_60s: f64,
    pub latency_ms: LatencySummary,
    pub jitter_ms_avg_absdiff: f64,
    pub qos_policy: QosPolicy,
}

/// Nearest-rank percentiles over the sorted window durations.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LatencySummary {
    pub p50: u64,
    pub p90: u64,
    pub p95: u64,
    pub p99: u64,
    pub max: u64,
}

/// Static admission policy, echoed for observability only — never
/// the live token count.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct QosPolicy {
    pub token_bucket: TokenBucketPolicy,
}

// ─── Internal state ──────────────────────────────────────────────

struct Inner {
    window: VecDeque<Sample>,
    capacity: usize,
}

// ─── MetricsRecorder impl ────────────────────────────────────────

impl MetricsRecorder {
    pub fn new(capacity: usize, policy: TokenBucketPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy,
            clock,
            inner: Mutex::new(Inner {
                window: VecDeque::with_capacity(capacity),
                capacity,
            }),
        }
    }

    /// Append one completed-request sample, evicting the oldest once
    /// the window is full. Bounded memory by construction; never fails.
    pub fn record(&self, endpoint: &str, duration_ms: u64, status: u16) {
        let recorded_at = self.clock.now();
        let mut inner = self.inner.lock();
        if inner.window.len() == inner.capacity {
            inner.window.pop_front();
        }
        inner.window.push_back(Sample {
            recorded_at,
            endpoint: endpoint.to_owned(),
            duration_ms,
            status,
        });
    }

    /// Clear the window. Idempotent.
    pub fn reset(&self) {
        self.inner.lock().window.clear();
    }

    /// Derive statistics from the current window contents.
    ///
    /// Copy-on-read: the lock is held only long enough to copy the
    /// raw samples, so a slow computation never blocks `record()`.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let now = self.clock.now();
        let samples: Vec<(Instant, u64, u16)> = {
            let inner = self.inner.lock();
            inner
                .window
                .iter()
                .map(|s| (s.recorded_at, s.duration_ms, s.status))
                .collect()
        };

        if samples.is_empty() {
            return MetricsSnapshot::Empty {};
        }

        let total = samples.len();
        let mut durations: Vec<u64> = samples.iter().map(|&(_, d, _)| d).collect();
        durations.sort_unstable();

        let errors = samples.iter().filter(|&&(_, _, st)| st >= 400).count();
        let error_rate = round_to(errors as f64 / total as f64, 4);

        // Count samples completed in the last 60 s; an empty slice
        // means zero throughput, not a division by zero.
        let cutoff = now.checked_sub(Duration::from_secs(THROUGHPUT_WINDOW_SECS));
        let recent = match cutoff {
            Some(cutoff) => samples.iter().filter(|&&(t, _, _)| t >= cutoff).count(),
            None => total,
        };
        let rps_last_60s = if recent > 0 {
            round_to(recent as f64 / THROUGHPUT_WINDOW_SECS as f64, 3)
        } else {
            0.0
        };

        let latency_ms = LatencySummary {
            p50: nearest_rank(&durations, 50.0),
            p90: nearest_rank(&durations, 90.0),
            p95: nearest_rank(&durations, 95.0),
            p99: nearest_rank(&durations, 99.0),
            max: durations[total - 1],
        };

        MetricsSnapshot::Stats(WindowStats {
            count: total,
            error_rate,
            rps_last_60s,
            latency_ms,
            jitter_ms_avg_absdiff: jitter(&durations),
            qos_policy: QosPolicy {
                token_bucket: self.policy,
            },
        })
    }
}

// ─── Derivation helpers ──────────────────────────────────────────

/// Nearest-rank percentile: round the fractional rank to an existing
/// index of the sorted slice, no interpolation between ranks.
fn nearest_rank(sorted: &[u64], p: f64) -> u64 {
    let last = sorted.len() - 1;
    let idx = ((p / 100.0) * last as f64).round() as usize;
    sorted[idx.min(last)]
}

/// Mean absolute difference between adjacent elements of the *sorted*
/// durations. A dispersion proxy for the latency distribution, not
/// successive-request variance. Zero for a singleton window.
fn jitter(sorted: &[u64]) -> f64 {
    if sorted.len() < 2 {
        return 0.0;
    }
    let sum: u64 = sorted.windows(2).map(|w| w[1] - w[0]).sum();
    round_to(sum as f64 / (sorted.len() - 1) as f64, 2)
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn recorder(capacity: usize) -> (MetricsRecorder, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let policy = TokenBucketPolicy {
            tokens_per_sec: 5,
            burst: 10,
        };
        (
            MetricsRecorder::new(capacity, policy, clock.clone()),
            clock,
        )
    }

    fn stats(recorder: &MetricsRecorder) -> WindowStats {
        match recorder.snapshot() {
            MetricsSnapshot::Stats(stats) => stats,
            MetricsSnapshot::Empty {} => panic!("expected a populated snapshot"),
        }
    }

    #[test]
    fn eviction_drops_the_oldest_samples() {
        let (recorder, _clock) = recorder(2000);
        for i in 0..2005 {
            recorder.record(&format!("GET /slow#{i}"), i, 200);
        }

        let inner = recorder.inner.lock();
        assert_eq!(inner.window.len(), 2000);
        let oldest = inner.window.front().unwrap();
        assert_eq!(oldest.endpoint, "GET /slow#5");
        assert_eq!(oldest.duration_ms, 5);
    }

    #[test]
    fn empty_window_snapshots_to_an_empty_object() {
        let (recorder, _clock) = recorder(16);
        let snapshot = recorder.snapshot();
        assert!(snapshot.is_empty());
        assert_eq!(serde_json::to_string(&snapshot).unwrap(), "{}");
    }

    #[test]
    fn percentiles_use_nearest_rank() {
        let (recorder, _clock) = recorder(16);
        // Recorded out of order; the snapshot sorts.
        for d in [30, 10, 50, 20, 40] {
            recorder.record("GET /slow", d, 200);
        }

        let stats = stats(&recorder);
        assert_eq!(stats.count, 5);
        // round(0.50 * 4) = 2 → 30
        assert_eq!(stats.latency_ms.p50, 30);
        // round(0.90 * 4) = 4 → 50
        assert_eq!(stats.latency_ms.p90, 50);
        assert_eq!(stats.latency_ms.p95, 50);
        assert_eq!(stats.latency_ms.p99, 50);
        assert_eq!(stats.latency_ms.max, 50);
    }

    #[test]
    fn error_rate_counts_status_400_and_up() {
        let (recorder, _clock) = recorder(16);
        for status in [200, 404, 200, 500] {
            recorder.record("GET /loss", 10, status);
        }
        assert_eq!(stats(&recorder).error_rate, 0.5);
    }

    #[test]
    fn error_rate_is_rounded_to_four_places() {
        let (recorder, _clock) = recorder(16);
        recorder.record("GET /loss", 10, 503);
        recorder.record("GET /loss", 10, 200);
        recorder.record("GET /loss", 10, 200);
        assert_eq!(stats(&recorder).error_rate, 0.3333);
    }

    #[test]
    fn singleton_window_has_zero_jitter() {
        let (recorder, _clock) = recorder(16);
        recorder.record("GET /slow", 123, 200);
        assert_eq!(stats(&recorder).jitter_ms_avg_absdiff, 0.0);
    }

    #[test]
    fn jitter_averages_adjacent_sorted_diffs() {
        let (recorder, _clock) = recorder(16);
        // Sorted: [10, 15, 21] → diffs [5, 6] → mean 5.5
        for d in [21, 10, 15] {
            recorder.record("GET /slow", d, 200);
        }
        assert_eq!(stats(&recorder).jitter_ms_avg_absdiff, 5.5);
    }

    #[test]
    fn throughput_only_counts_the_last_minute() {
        let (recorder, clock) = recorder(16);
        recorder.record("GET /slow", 10, 200);
        recorder.record("GET /slow", 10, 200);
        recorder.record("GET /slow", 10, 200);

        clock.advance(Duration::from_secs(120));
        recorder.record("GET /slow", 10, 200);
        recorder.record("GET /slow", 10, 200);

        // 2 samples in the last 60 s → 2/60 rounded to 3 places.
        assert_eq!(stats(&recorder).rps_last_60s, 0.033);
    }

    #[test]
    fn throughput_is_zero_when_all_samples_are_stale() {
        let (recorder, clock) = recorder(16);
        recorder.record("GET /slow", 10, 200);
        clock.advance(Duration::from_secs(120));

        let stats = stats(&recorder);
        assert_eq!(stats.count, 1);
        assert_eq!(stats.rps_last_60s, 0.0);
    }

    #[test]
    fn reset_is_idempotent() {
        let (recorder, _clock) = recorder(16);
        recorder.record("GET /slow", 10, 200);

        recorder.reset();
        assert!(recorder.snapshot().is_empty());

        recorder.reset();
        assert!(recorder.snapshot().is_empty());
    }

    #[test]
    fn snapshot_echoes_the_static_policy() {
        let (recorder, _clock) = recorder(16);
        recorder.record("GET /slow", 10, 200);

        let policy = stats(&recorder).qos_policy.token_bucket;
        assert_eq!(policy.tokens_per_sec, 5);
        assert_eq!(policy.burst, 10);
    }
}
