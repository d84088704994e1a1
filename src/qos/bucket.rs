use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::clock::Clock;
use crate::config::TokenBucketPolicy;

// ─── Configuration ───────────────────────────────────────────────

/// Retry hint returned on every denial. A constant, not a computed
/// time-to-next-token: with a refill rate below 1 token/s the true
/// wait can exceed this. Kept as-is for compatibility.
pub const RETRY_AFTER_SECS: u64 = 1;

// ─── Public types ────────────────────────────────────────────────

/// Outcome of a single admission check.
#[derive(Debug, Clone, Copy)]
pub struct Admission {
    pub allowed: bool,
    pub retry_after_secs: u64,
}

/// Process-global token-bucket admission controller.
///
/// `admit()` runs refill + decrement as one critical section, so
/// concurrent callers can never double-spend a token or under-count
/// a refill.
pub struct TokenBucket {
    policy: TokenBucketPolicy,
    clock: Arc<dyn Clock>,
    state: Mutex<BucketState>,
}

// ─── Internal state ──────────────────────────────────────────────

struct BucketState {
    tokens: u64,
    last_refill: Instant,
}

impl BucketState {
    /// Coarse refill: only whole tokens accrue, and `last_refill` only
    /// advances when at least one token is added. Fractional elapsed
    /// time is not carried between calls.
    fn refill(&mut self, now: Instant, policy: TokenBucketPolicy) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        let add = (elapsed.as_secs_f64() * policy.tokens_per_sec as f64).floor() as u64;
        if add > 0 {
            self.tokens = self.tokens.saturating_add(add).min(policy.burst as u64);
            self.last_refill = now;
        }
    }
}

// ─── TokenBucket impl ────────────────────────────────────────────

impl TokenBucket {
    /// Create a full bucket. `tokens = burst` at process start.
    pub fn new(policy: TokenBucketPolicy, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            policy,
            clock,
            state: Mutex::new(BucketState {
                tokens: policy.burst as u64,
                last_refill: now,
            }),
        }
    }

    /// Decide whether one unit of work may proceed. Never blocks and
    /// never fails; a drained bucket yields an immediate denial with
    /// the fixed [`RETRY_AFTER_SECS`] hint.
    pub fn admit(&self) -> Admission {
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.refill(now, self.policy);

        if state.tokens > 0 {
            state.tokens -= 1;
            Admission {
                allowed: true,
                retry_after_secs: 0,
            }
        } else {
            Admission {
                allowed: false,
                retry_after_secs: RETRY_AFTER_SECS,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::time::Duration;

    fn bucket(burst: u32, tokens_per_sec: u32) -> (Arc<TokenBucket>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let policy = TokenBucketPolicy {
            tokens_per_sec,
            burst,
        };
        (
            Arc::new(TokenBucket::new(policy, clock.clone())),
            clock,
        )
    }

    #[test]
    fn burst_then_starvation_then_recovery() {
        let (bucket, clock) = bucket(10, 5);

        for _ in 0..10 {
            assert!(bucket.admit().allowed);
        }

        let denied = bucket.admit();
        assert!(!denied.allowed);
        assert_eq!(denied.retry_after_secs, 1);

        clock.advance(Duration::from_secs(1));
        assert!(bucket.admit().allowed);
    }

    #[test]
    fn zero_rate_never_refills() {
        let (bucket, clock) = bucket(2, 0);
        assert!(bucket.admit().allowed);
        assert!(bucket.admit().allowed);

        clock.advance(Duration::from_secs(3600));
        assert!(!bucket.admit().allowed);
    }

    #[test]
    fn zero_burst_denies_everything() {
        let (bucket, clock) = bucket(0, 5);
        assert!(!bucket.admit().allowed);
        clock.advance(Duration::from_secs(10));
        assert!(!bucket.admit().allowed);
    }

    #[test]
    fn refill_is_capped_at_burst() {
        let (bucket, clock) = bucket(3, 5);
        assert!(bucket.admit().allowed);

        // Way more than enough elapsed time to overfill.
        clock.advance(Duration::from_secs(100));
        assert!(bucket.admit().allowed);
        assert_eq!(bucket.state.lock().tokens, 2);

        for _ in 0..2 {
            assert!(bucket.admit().allowed);
        }
        assert!(!bucket.admit().allowed);
    }

    #[test]
    fn fractional_elapsed_time_is_not_lost_while_last_refill_holds() {
        let (bucket, clock) = bucket(10, 5);
        for _ in 0..10 {
            assert!(bucket.admit().allowed);
        }

        // 100 ms at 5 tokens/s is half a token: nothing accrues and
        // last_refill does not advance.
        clock.advance(Duration::from_millis(100));
        assert!(!bucket.admit().allowed);

        // Another 100 ms makes 200 ms total since the last refill,
        // which is one whole token.
        clock.advance(Duration::from_millis(100));
        assert!(bucket.admit().allowed);
    }

    #[test]
    fn tokens_stay_within_bounds() {
        let (bucket, clock) = bucket(10, 5);
        for step in 0..50 {
            if step % 3 == 0 {
                clock.advance(Duration::from_millis(700));
            }
            let _ = bucket.admit();
            let tokens = bucket.state.lock().tokens;
            assert!(tokens <= 10, "tokens {tokens} exceeded burst");
        }
    }

    #[test]
    fn concurrent_admission_spends_each_token_once() {
        // Rate 0 so the token count is fixed at the burst for the
        // whole test.
        let (bucket, _clock) = bucket(4, 0);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let bucket = bucket.clone();
                std::thread::spawn(move || bucket.admit().allowed)
            })
            .collect();

        let allowed = handles
            .into_iter()
            .map(|h| h.join().expect("admit thread panicked"))
            .filter(|&allowed| allowed)
            .count();
        assert_eq!(allowed, 4);
    }
}
