//! Physical safety flags and the derived control-mode flags.

use super::status::NavState;

/// Actuator safety record
///
/// `lockdown` and `force_failsafe` are only cleared by an explicit
/// termination-cancel command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActuatorArmed {
    pub timestamp: u64,
    pub armed: bool,
    pub prearmed: bool,
    pub ready_to_arm: bool,
    pub lockdown: bool,
    pub manual_lockdown: bool,
    pub force_failsafe: bool,
    pub in_esc_calibration_mode: bool,
}

impl ActuatorArmed {
    /// Field comparison ignoring the timestamp, used for publish gating
    pub fn same_flags(&self, other: &Self) -> bool {
        self.armed == other.armed
            && self.prearmed == other.prearmed
            && self.ready_to_arm == other.ready_to_arm
            && self.lockdown == other.lockdown
            && self.manual_lockdown == other.manual_lockdown
            && self.force_failsafe == other.force_failsafe
            && self.in_esc_calibration_mode == other.in_esc_calibration_mode
    }

    /// Motors are commanded off regardless of arming state
    pub fn is_locked_down(&self) -> bool {
        self.lockdown || self.manual_lockdown
    }
}

/// Which controllers are engaged for the current navigation state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VehicleControlMode {
    pub timestamp: u64,
    pub armed: bool,
    pub manual_enabled: bool,
    pub auto_enabled: bool,
    pub offboard_enabled: bool,
    pub position_enabled: bool,
    pub velocity_enabled: bool,
    pub altitude_enabled: bool,
    pub climb_rate_enabled: bool,
    pub attitude_enabled: bool,
    pub rates_enabled: bool,
    pub termination_enabled: bool,
}

impl VehicleControlMode {
    pub fn for_nav_state(nav_state: NavState, armed: bool) -> Self {
        let mut mode = Self {
            armed,
            ..Self::default()
        };

        match nav_state {
            NavState::Manual => {
                mode.manual_enabled = true;
                mode.attitude_enabled = true;
                mode.rates_enabled = true;
            }
            NavState::Stab => {
                mode.manual_enabled = true;
                mode.attitude_enabled = true;
                mode.rates_enabled = true;
            }
            NavState::Acro => {
                mode.manual_enabled = true;
                mode.rates_enabled = true;
            }
            NavState::Altctl => {
                mode.manual_enabled = true;
                mode.altitude_enabled = true;
                mode.climb_rate_enabled = true;
                mode.attitude_enabled = true;
                mode.rates_enabled = true;
            }
            NavState::Posctl => {
                mode.manual_enabled = true;
                mode.set_position_chain();
            }
            NavState::Orbit => {
                mode.set_position_chain();
            }
            NavState::Offboard => {
                mode.offboard_enabled = true;
                mode.set_position_chain();
            }
            NavState::Descend => {
                mode.auto_enabled = true;
                mode.climb_rate_enabled = true;
                mode.attitude_enabled = true;
                mode.rates_enabled = true;
            }
            NavState::Termination => {
                mode.termination_enabled = true;
            }
            NavState::AutoMission
            | NavState::AutoLoiter
            | NavState::AutoRtl
            | NavState::AutoTakeoff
            | NavState::AutoLand
            | NavState::AutoFollowTarget
            | NavState::AutoPrecland
            | NavState::AutoVtolTakeoff => {
                mode.auto_enabled = true;
                mode.set_position_chain();
            }
        }

        mode
    }

    fn set_position_chain(&mut self) {
        self.position_enabled = true;
        self.velocity_enabled = true;
        self.altitude_enabled = true;
        self.climb_rate_enabled = true;
        self.attitude_enabled = true;
        self.rates_enabled = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_flags_ignores_timestamp() {
        let a = ActuatorArmed {
            timestamp: 1,
            armed: true,
            ..Default::default()
        };
        let mut b = a;
        b.timestamp = 99;
        assert!(a.same_flags(&b));
        b.lockdown = true;
        assert!(!a.same_flags(&b));
    }

    #[test]
    fn test_control_mode_manual_has_no_climb_rate() {
        let mode = VehicleControlMode::for_nav_state(NavState::Manual, false);
        assert!(mode.manual_enabled);
        assert!(!mode.climb_rate_enabled);
        assert!(!mode.auto_enabled);
    }

    #[test]
    fn test_control_mode_auto_and_termination() {
        let mode = VehicleControlMode::for_nav_state(NavState::AutoMission, true);
        assert!(mode.auto_enabled && mode.position_enabled && mode.armed);

        let mode = VehicleControlMode::for_nav_state(NavState::Termination, true);
        assert!(mode.termination_enabled);
        assert!(!mode.rates_enabled);
    }
}
