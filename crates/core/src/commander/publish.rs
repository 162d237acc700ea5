//! Publish rate limiting
//!
//! State records are republished on a fixed period, or immediately when a
//! tracked field changed.

/// Default republish period
pub const PUBLISH_PERIOD_US: u64 = 500_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishGate {
    period_us: u64,
    last_publish_us: Option<u64>,
}

impl PublishGate {
    pub const fn new(period_us: u64) -> Self {
        Self {
            period_us,
            last_publish_us: None,
        }
    }

    /// Whether to publish now. Records the publish time when it returns `true`.
    pub fn should_publish(&mut self, changed: bool, now_us: u64) -> bool {
        let due = match self.last_publish_us {
            None => true,
            Some(last) => now_us.saturating_sub(last) >= self.period_us,
        };

        if changed || due {
            self.last_publish_us = Some(now_us);
            true
        } else {
            false
        }
    }
}

impl Default for PublishGate {
    fn default() -> Self {
        Self::new(PUBLISH_PERIOD_US)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_periodic_and_on_change() {
        let mut gate = PublishGate::new(500);
        assert!(gate.should_publish(false, 0));
        assert!(!gate.should_publish(false, 100));
        assert!(gate.should_publish(true, 200));
        assert!(!gate.should_publish(false, 600));
        assert!(gate.should_publish(false, 700));
    }
}
