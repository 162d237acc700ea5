//! Health and arming checks collaborator.

use crate::vehicle::NavState;

/// Sensor and system health evaluation consumed by the arming state machine.
pub trait HealthChecks {
    /// Re-evaluate all checks. `force` bypasses any internal rate limit.
    fn update(&mut self, force: bool);

    /// Whether arming is allowed for the given navigation state
    fn can_arm(&self, nav_state: NavState) -> bool;

    /// Aggregated pass/fail result of the last evaluation
    fn checks_pass(&self) -> bool {
        self.can_arm(NavState::Manual)
    }
}

/// Scriptable health checks for host tests
#[derive(Debug, Clone, Default)]
pub struct MockHealthChecks {
    pub arming_allowed: bool,
    pub updates: u32,
    pub forced_updates: u32,
}

impl MockHealthChecks {
    pub fn passing() -> Self {
        Self {
            arming_allowed: true,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self::default()
    }
}

impl HealthChecks for MockHealthChecks {
    fn update(&mut self, force: bool) {
        self.updates += 1;
        if force {
            self.forced_updates += 1;
        }
    }

    fn can_arm(&self, _nav_state: NavState) -> bool {
        self.arming_allowed
    }
}
