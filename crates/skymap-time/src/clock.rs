//! Clock capability and the simple clocks

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use skymap_core::Timestamp;

/// A source of "current time".
///
/// Implementations are queried from the render thread every frame and must
/// be cheap and infallible.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock
#[derive(Clone, Copy, Debug, Default)]
pub struct RealClock;

impl RealClock {
    pub fn new() -> Self {
        RealClock
    }
}

impl Clock for RealClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Clock that only moves when told to.
///
/// Shared between threads through `Arc`; used to drive deterministic
/// simulations and tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        ManualClock {
            millis: AtomicI64::new(start.as_millis()),
        }
    }

    pub fn set(&self, t: Timestamp) {
        self.millis.store(t.as_millis(), Ordering::SeqCst);
    }

    pub fn advance(&self, dt: Duration) {
        self.advance_millis(dt.as_millis() as i64);
    }

    pub fn advance_millis(&self, millis: i64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.millis.load(Ordering::SeqCst))
    }
}
