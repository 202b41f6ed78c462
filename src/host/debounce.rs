//! Timer-replacement debouncing
//!
//! A burst of triggers collapses into one action that runs after the
//! trigger has been quiet for the configured delay.

use crate::host::{TaskCallback, TimerHandle, Viewport};
use std::time::Duration;

/// Coalesces bursts of triggers into a single delayed action
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<TimerHandle>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `action`, replacing whatever was pending
    pub fn schedule(&mut self, viewport: &dyn Viewport, action: TaskCallback) {
        self.cancel();
        self.pending = Some(viewport.set_timeout(self.delay, action));
    }

    /// Drop the pending action, if any
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::headless::HeadlessViewport;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counting_action(count: &Rc<Cell<u32>>) -> TaskCallback {
        let count = Rc::clone(count);
        Box::new(move || count.set(count.get() + 1))
    }

    #[test]
    fn test_burst_fires_once_after_quiet_period() {
        let viewport = HeadlessViewport::new();
        let fired = Rc::new(Cell::new(0));
        let mut debouncer = Debouncer::new(Duration::from_millis(100));
        assert_eq!(debouncer.delay(), Duration::from_millis(100));

        for _ in 0..5 {
            debouncer.schedule(&viewport, counting_action(&fired));
            viewport.advance(Duration::from_millis(50));
        }
        assert_eq!(fired.get(), 0);
        assert_eq!(viewport.pending_timers(), 1);

        viewport.advance(Duration::from_millis(50));
        assert_eq!(fired.get(), 1);

        viewport.advance(Duration::from_secs(1));
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn test_cancel_drops_pending_action() {
        let viewport = HeadlessViewport::new();
        let fired = Rc::new(Cell::new(0));
        let mut debouncer = Debouncer::new(Duration::from_millis(100));

        debouncer.schedule(&viewport, counting_action(&fired));
        debouncer.cancel();
        viewport.advance(Duration::from_secs(1));

        assert_eq!(fired.get(), 0);
        assert_eq!(viewport.pending_timers(), 0);
    }
}
