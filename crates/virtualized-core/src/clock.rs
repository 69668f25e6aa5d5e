use std::cell::Cell;
use std::rc::Rc;

use web_time::{Duration, Instant};

/// Source of "now" for schedulers.
pub trait Clock: 'static {
    fn now(&self) -> Instant;
}

/// Wall-clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock you can drive deterministically. Clones share the same time.
#[derive(Clone)]
pub struct TestClock {
    origin: Instant,
    elapsed: Rc<Cell<Duration>>,
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TestClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Rc::new(Cell::new(Duration::ZERO)),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed.get()
    }

    pub fn advance(&self, by: Duration) {
        self.elapsed.set(self.elapsed.get() + by);
    }

    /// Moves to `at`. Time never goes backwards; earlier values are ignored.
    pub fn set_elapsed(&self, at: Duration) {
        if at > self.elapsed.get() {
            self.elapsed.set(at);
        }
    }
}

impl Clock for TestClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed.get()
    }
}
