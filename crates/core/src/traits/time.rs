//! Monotonic time base for the commander and navigator cycles.
//!
//! All timestamps in the decision core are microseconds since boot. The
//! runtime samples a `TimeSource` once per cycle and passes the value down,
//! so a whole cycle observes a single instant.

use core::cell::Cell;

/// Platform-agnostic monotonic clock.
///
/// # Example
///
/// ```
/// use warden_core::traits::{MockTime, TimeSource};
///
/// let time = MockTime::new();
/// let boot = time.now_us();
/// time.advance(500_000);
/// assert_eq!(time.elapsed_since(boot), 500_000);
/// ```
pub trait TimeSource: Clone + Send + Sync {
    /// Microseconds since system start.
    fn now_us(&self) -> u64;

    /// Milliseconds since system start.
    fn now_ms(&self) -> u64 {
        self.now_us() / 1000
    }

    /// Elapsed microseconds since `reference_us`, saturating at zero.
    fn elapsed_since(&self, reference_us: u64) -> u64 {
        self.now_us().saturating_sub(reference_us)
    }
}

/// Convert seconds (as configured in parameters) to microseconds.
///
/// Negative and non-finite values map to zero.
pub fn secs_to_us(seconds: f32) -> u64 {
    if seconds.is_finite() && seconds > 0.0 {
        (seconds as f64 * 1_000_000.0) as u64
    } else {
        0
    }
}

/// Mock clock with manual advancement for deterministic host tests.
#[derive(Clone, Default)]
pub struct MockTime {
    current_us: Cell<u64>,
}

// Safety: MockTime only lives in single-threaded test contexts. The
// Send + Sync bound on TimeSource exists for the embedded executors.
unsafe impl Send for MockTime {}
unsafe impl Sync for MockTime {}

impl MockTime {
    pub fn new() -> Self {
        Self {
            current_us: Cell::new(0),
        }
    }

    pub fn with_initial(us: u64) -> Self {
        Self {
            current_us: Cell::new(us),
        }
    }

    pub fn set(&self, us: u64) {
        self.current_us.set(us);
    }

    pub fn advance(&self, us: u64) {
        self.current_us.set(self.current_us.get() + us);
    }
}

impl TimeSource for MockTime {
    fn now_us(&self) -> u64 {
        self.current_us.get()
    }
}
