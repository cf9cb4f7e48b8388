/// Window used for scroll and mutation bursts.
pub const RESCAN_DEBOUNCE_MS: i64 = 1000;

/// Cancelable single-shot timer that collapses a burst of triggers into one
/// invocation, fired `window_ms` after the last trigger.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window_ms: i64,
    deadline: Option<i64>,
}

impl Debouncer {
    pub fn new(window_ms: i64) -> Self {
        Self {
            window_ms,
            deadline: None,
        }
    }

    /// Arm the timer, or restart it if already pending.
    pub fn trigger(&mut self, now_ms: i64) {
        self.deadline = Some(now_ms.saturating_add(self.window_ms));
    }

    /// Drop the pending invocation. No-op when nothing is pending.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Consume the pending invocation if its window has elapsed.
    pub fn fire_due(&mut self, now_ms: i64) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now_ms => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn deadline(&self) -> Option<i64> {
        self.deadline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_collapses_to_one_invocation() {
        let mut d = Debouncer::new(RESCAN_DEBOUNCE_MS);
        let mut fired = 0;
        for t in [0, 50, 100, 150, 200] {
            d.trigger(t);
            if d.fire_due(t) {
                fired += 1;
            }
        }
        for t in (200..=3000).step_by(100) {
            if d.fire_due(t) {
                fired += 1;
            }
        }
        assert_eq!(fired, 1);
        assert_eq!(d.deadline(), None);
    }

    #[test]
    fn test_window_measured_from_last_trigger() {
        let mut d = Debouncer::new(1000);
        d.trigger(0);
        d.trigger(900);
        assert!(!d.fire_due(1000));
        assert!(!d.fire_due(1899));
        assert!(d.fire_due(1900));
        assert_eq!(d.deadline(), None);
    }

    #[test]
    fn test_cancel_without_pending_is_noop() {
        let mut d = Debouncer::new(1000);
        d.cancel();
        assert_eq!(d.deadline(), None);
        d.trigger(10);
        d.cancel();
        assert!(!d.fire_due(5000));
    }

    #[test]
    fn test_separate_bursts_fire_separately() {
        let mut d = Debouncer::new(1000);
        d.trigger(0);
        assert!(d.fire_due(1000));
        d.trigger(1500);
        assert_eq!(d.deadline(), Some(2500));
        assert!(d.fire_due(2500));
    }
}
