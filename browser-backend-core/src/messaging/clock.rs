use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic time source.
///
/// `std::time::Instant` is unavailable on `wasm32-unknown-unknown`, so the
/// browser runtime injects `performance.now()` instead.
pub type Clock = Arc<dyn Fn() -> Duration + Send + Sync + 'static>;

/// Clock backed by `Instant`, counting from its creation.
pub fn system_clock() -> Clock {
    let origin = Instant::now();
    Arc::new(move || origin.elapsed())
}

/// Clock driven by hand, for tests and deterministic hosts.
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Arc<parking_lot::Mutex<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }

    pub fn now(&self) -> Duration {
        *self.now.lock()
    }

    pub fn as_clock(&self) -> Clock {
        let now = Arc::clone(&self.now);
        Arc::new(move || *now.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_moves_only_when_advanced() {
        let manual = ManualClock::new();
        let clock = manual.as_clock();
        assert_eq!(clock(), Duration::ZERO);

        manual.advance(Duration::from_millis(5));
        assert_eq!(clock(), Duration::from_millis(5));
    }
}
