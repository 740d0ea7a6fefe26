//! Nullable clock: time that moves only when a test moves it.

use likewatch_types::{Clock, Timestamp};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A controllable clock.
///
/// Clones share the same instant, so a test can keep a handle after moving
/// the clock into the engine.
#[derive(Clone, Debug)]
pub struct NullClock {
    secs: Arc<AtomicU64>,
}

impl NullClock {
    pub fn new(initial_secs: u64) -> Self {
        Self {
            secs: Arc::new(AtomicU64::new(initial_secs)),
        }
    }

    pub fn advance(&self, secs: u64) {
        self.secs.fetch_add(secs, Ordering::SeqCst);
    }

    /// Jump to `secs`, possibly backwards.
    pub fn set(&self, secs: u64) {
        self.secs.store(secs, Ordering::SeqCst);
    }
}

impl Clock for NullClock {
    fn now(&self) -> Timestamp {
        Timestamp::new(self.secs.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_time() {
        let clock = NullClock::new(100);
        let handle = clock.clone();
        handle.advance(5);
        assert_eq!(clock.now(), Timestamp::new(105));
        handle.set(10);
        assert_eq!(clock.now(), Timestamp::new(10));
    }
}
