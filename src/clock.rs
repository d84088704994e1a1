use std::time::Instant;

/// Injectable time source.
///
/// The token bucket and the metrics window both make decisions based on
/// "now". Production wiring uses [`SystemClock`]; tests drive a
/// [`ManualClock`] so refill and throughput-window behaviour can be
/// checked deterministically.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Real clock backed by `Instant::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Test clock that only moves when told to.
#[cfg(test)]
#[derive(Debug)]
pub struct ManualClock {
    current: parking_lot::Mutex<Instant>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new() -> Self {
        Self {
            current: parking_lot::Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: std::time::Duration) {
        *self.current.lock() += by;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.current.lock()
    }
}
