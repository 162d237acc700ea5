//! One-shot latches and edge detectors
//!
//! Side effects that must happen exactly once per triggering edge (parachute
//! release, lockdown, geofence warnings) are gated through these types
//! instead of loose booleans, so idempotence is visible at the call site.

/// Latch that fires once until explicitly reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OneShot {
    fired: bool,
}

impl OneShot {
    pub const fn new() -> Self {
        Self { fired: false }
    }

    /// Fire the latch. Returns `true` only on the first call after a reset.
    pub fn trigger(&mut self) -> bool {
        if self.fired {
            false
        } else {
            self.fired = true;
            true
        }
    }

    pub fn is_set(&self) -> bool {
        self.fired
    }

    pub fn reset(&mut self) {
        self.fired = false;
    }
}

/// Transition reported by [`EdgeDetector::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
    None,
}

/// Previous-value/current-value comparator for boolean signals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeDetector {
    previous: bool,
}

impl EdgeDetector {
    pub const fn new(initial: bool) -> Self {
        Self { previous: initial }
    }

    pub fn update(&mut self, current: bool) -> Edge {
        let edge = match (self.previous, current) {
            (false, true) => Edge::Rising,
            (true, false) => Edge::Falling,
            _ => Edge::None,
        };
        self.previous = current;
        edge
    }

    pub fn previous(&self) -> bool {
        self.previous
    }

    pub fn reset(&mut self, value: bool) {
        self.previous = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_shot_fires_once() {
        let mut latch = OneShot::new();
        assert!(latch.trigger());
        assert!(!latch.trigger());
        assert!(latch.is_set());

        latch.reset();
        assert!(!latch.is_set());
        assert!(latch.trigger());
    }

    #[test]
    fn test_edge_detector_sequence() {
        let mut edge = EdgeDetector::new(false);
        assert_eq!(edge.update(false), Edge::None);
        assert_eq!(edge.update(true), Edge::Rising);
        assert_eq!(edge.update(true), Edge::None);
        assert_eq!(edge.update(false), Edge::Falling);
        assert!(!edge.previous());
    }
}
