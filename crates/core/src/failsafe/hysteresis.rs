//! Time hysteresis on a boolean condition
//!
//! A requested state only becomes the reported state after it has been
//! requested continuously for the configured delay. Separate delays apply
//! to the false→true and true→false directions.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hysteresis {
    state: bool,
    requested: bool,
    requested_since_us: u64,
    delay_from_false_us: u64,
    delay_from_true_us: u64,
}

impl Hysteresis {
    pub const fn new(initial: bool) -> Self {
        Self {
            state: initial,
            requested: initial,
            requested_since_us: 0,
            delay_from_false_us: 0,
            delay_from_true_us: 0,
        }
    }

    /// Delay before leaving `from_state`
    pub fn set_hysteresis_time_from(&mut self, from_state: bool, delay_us: u64) {
        if from_state {
            self.delay_from_true_us = delay_us;
        } else {
            self.delay_from_false_us = delay_us;
        }
    }

    pub fn state(&self) -> bool {
        self.state
    }

    /// Request `new_state` and advance the timer.
    pub fn set_state_and_update(&mut self, new_state: bool, now_us: u64) {
        if new_state != self.state {
            if new_state != self.requested {
                self.requested = new_state;
                self.requested_since_us = now_us;
            }
        } else {
            self.requested = self.state;
        }

        self.update(now_us);
    }

    pub fn update(&mut self, now_us: u64) {
        if self.requested == self.state {
            return;
        }

        let delay = if self.state {
            self.delay_from_true_us
        } else {
            self.delay_from_false_us
        };

        if now_us.saturating_sub(self.requested_since_us) >= delay {
            self.state = self.requested;
        }
    }

    /// Jump to `state` immediately, discarding any pending request
    pub fn reset(&mut self, state: bool) {
        self.state = state;
        self.requested = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rising_delay() {
        let mut h = Hysteresis::new(false);
        h.set_hysteresis_time_from(false, 1_000);

        h.set_state_and_update(true, 100);
        assert!(!h.state());
        h.set_state_and_update(true, 1_099);
        assert!(!h.state());
        h.set_state_and_update(true, 1_100);
        assert!(h.state());
    }

    #[test]
    fn test_interrupted_request_restarts_timer() {
        let mut h = Hysteresis::new(false);
        h.set_hysteresis_time_from(false, 1_000);

        h.set_state_and_update(true, 0);
        h.set_state_and_update(false, 500);
        h.set_state_and_update(true, 900);
        h.set_state_and_update(true, 1_800);
        assert!(!h.state());
        h.set_state_and_update(true, 1_900);
        assert!(h.state());
    }

    #[test]
    fn test_falling_without_delay() {
        let mut h = Hysteresis::new(true);
        h.set_hysteresis_time_from(false, 1_000);
        h.set_state_and_update(false, 10);
        assert!(!h.state());
    }

    #[test]
    fn test_reset_discards_pending() {
        let mut h = Hysteresis::new(false);
        h.set_hysteresis_time_from(false, 1_000);
        h.set_state_and_update(true, 0);
        h.reset(false);
        h.update(5_000);
        assert!(!h.state());
    }
}
