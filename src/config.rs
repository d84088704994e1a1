use std::fmt;
use std::str::FromStr;

use serde::Serialize;

// ─── Defaults ────────────────────────────────────────────────────

/// Steady-state refill rate of the admission bucket (tokens/second).
pub const DEFAULT_TOKENS_PER_SEC: u32 = 5;

/// Burst size of the admission bucket.
pub const DEFAULT_BURST: u32 = 10;

/// How many completed-request samples the metrics window keeps.
pub const DEFAULT_WINDOW_CAPACITY: usize = 2000;

// ─── Public types ────────────────────────────────────────────────

/// The static token-bucket policy, echoed verbatim inside every
/// metrics snapshot under `qos_policy.token_bucket`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TokenBucketPolicy {
    pub tokens_per_sec: u32,
    pub burst: u32,
}

/// Immutable process-wide QoS configuration, resolved once at startup.
///
/// Zero values are legal: `tokens_per_sec = 0` means the bucket never
/// refills once drained, `burst = 0` means every request is denied.
/// A zero-capacity window is rejected — it could never hold a sample.
#[derive(Debug, Clone, Copy)]
pub struct QosConfig {
    pub policy: TokenBucketPolicy,
    pub window_capacity: usize,
}

#[derive(Debug)]
pub struct ConfigError(String);

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid configuration: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

// ─── QosConfig impl ──────────────────────────────────────────────

impl Default for QosConfig {
    fn default() -> Self {
        Self {
            policy: TokenBucketPolicy {
                tokens_per_sec: DEFAULT_TOKENS_PER_SEC,
                burst: DEFAULT_BURST,
            },
            window_capacity: DEFAULT_WINDOW_CAPACITY,
        }
    }
}

impl QosConfig {
    /// Resolve configuration from `NETLAB_*` environment variables,
    /// falling back to the defaults above. Unparseable values are a
    /// startup-time fatal error, not a silent fallback.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            policy: TokenBucketPolicy {
                tokens_per_sec: read_env("NETLAB_TOKENS_PER_SEC", DEFAULT_TOKENS_PER_SEC)?,
                burst: read_env("NETLAB_BURST", DEFAULT_BURST)?,
            },
            window_capacity: read_env("NETLAB_WINDOW_CAPACITY", DEFAULT_WINDOW_CAPACITY)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_capacity == 0 {
            return Err(ConfigError(
                "window capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn read_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| ConfigError(format!("{key}={raw:?}: {e}"))),
        Err(std::env::VarError::NotPresent) => Ok(default),
        Err(e) => Err(ConfigError(format!("{key}: {e}"))),
    }
}
