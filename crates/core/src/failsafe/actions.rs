//! Configured failsafe reactions, decoded from integer parameters.

use bitflags::bitflags;

/// Reaction to RC or data-link loss (NAV_RCL_ACT / NAV_DLL_ACT)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkLossAction {
    #[default]
    Disabled,
    Loiter,
    ReturnToLaunch,
    Land,
    Terminate,
    Lockdown,
}

impl LinkLossAction {
    pub fn from_param(value: i32) -> Self {
        match value {
            1 => LinkLossAction::Loiter,
            2 => LinkLossAction::ReturnToLaunch,
            3 => LinkLossAction::Land,
            5 => LinkLossAction::Terminate,
            6 => LinkLossAction::Lockdown,
            _ => LinkLossAction::Disabled,
        }
    }
}

/// Reaction to offboard signal loss (COM_OBL_ACT)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffboardLossAction {
    #[default]
    Land,
    Loiter,
    ReturnToLaunch,
    Terminate,
    Lockdown,
}

impl OffboardLossAction {
    pub fn from_param(value: i32) -> Self {
        match value {
            1 => OffboardLossAction::Loiter,
            2 => OffboardLossAction::ReturnToLaunch,
            3 => OffboardLossAction::Terminate,
            4 => OffboardLossAction::Lockdown,
            _ => OffboardLossAction::Land,
        }
    }
}

/// Reaction to battery warning escalation (COM_LOW_BAT_ACT)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LowBatteryAction {
    #[default]
    Warning,
    ReturnToLaunch,
    Land,
    ReturnOrLand,
}

impl LowBatteryAction {
    pub fn from_param(value: i32) -> Self {
        match value {
            1 => LowBatteryAction::ReturnToLaunch,
            2 => LowBatteryAction::Land,
            3 => LowBatteryAction::ReturnOrLand,
            _ => LowBatteryAction::Warning,
        }
    }
}

/// Reaction to a detected motor failure (COM_ACT_FAIL_ACT)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActuatorFailureAction {
    #[default]
    Disabled,
    Loiter,
    Land,
    ReturnToLaunch,
    Terminate,
}

impl ActuatorFailureAction {
    pub fn from_param(value: i32) -> Self {
        match value {
            1 => ActuatorFailureAction::Loiter,
            2 => ActuatorFailureAction::Land,
            3 => ActuatorFailureAction::ReturnToLaunch,
            4 => ActuatorFailureAction::Terminate,
            _ => ActuatorFailureAction::Disabled,
        }
    }
}

/// Reaction to a geofence violation (GF_ACTION)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeofenceAction {
    None,
    #[default]
    Warn,
    Loiter,
    ReturnToLaunch,
    Terminate,
    Land,
}

impl GeofenceAction {
    pub fn from_param(value: i32) -> Self {
        match value {
            0 => GeofenceAction::None,
            2 => GeofenceAction::Loiter,
            3 => GeofenceAction::ReturnToLaunch,
            4 => GeofenceAction::Terminate,
            5 => GeofenceAction::Land,
            _ => GeofenceAction::Warn,
        }
    }

    /// Action that moves the vehicle or stops the flight
    pub fn is_escape(self) -> bool {
        !matches!(self, GeofenceAction::None | GeofenceAction::Warn)
    }
}

/// Return policy (RTL_TYPE)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RtlType {
    /// Fly straight to home and land
    #[default]
    Home,
    /// Fly to the mission landing sequence and land through it
    MissionLanding,
    /// Fly the mission backwards to home, or forward to its landing
    MissionLandingReversed,
    /// Whichever of home or the mission landing is closer
    Closest,
}

impl RtlType {
    pub fn from_param(value: i32) -> Self {
        match value {
            1 => RtlType::MissionLanding,
            2 => RtlType::MissionLandingReversed,
            3 => RtlType::Closest,
            _ => RtlType::Home,
        }
    }
}

/// Reaction to predicted traffic conflicts (NAV_TRAFF_AVOID)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrafficAvoidAction {
    Disabled,
    #[default]
    Warn,
    ReturnToLaunch,
    Land,
    PositionHold,
}

impl TrafficAvoidAction {
    pub fn from_param(value: i32) -> Self {
        match value {
            0 => TrafficAvoidAction::Disabled,
            2 => TrafficAvoidAction::ReturnToLaunch,
            3 => TrafficAvoidAction::Land,
            4 => TrafficAvoidAction::PositionHold,
            _ => TrafficAvoidAction::Warn,
        }
    }
}

bitflags! {
    /// Modes in which RC loss is tolerated (COM_RCL_EXCEPT)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RcLossExceptions: u8 {
        const MISSION = 1 << 0;
        const HOLD = 1 << 1;
        const OFFBOARD = 1 << 2;
    }
}

bitflags! {
    /// Modes the pilot may override by moving the sticks (COM_RC_OVERRIDE)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RcOverrideModes: u8 {
        const AUTO = 1 << 0;
        const OFFBOARD = 1 << 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_loss_decoding_skips_reserved_value() {
        assert_eq!(LinkLossAction::from_param(2), LinkLossAction::ReturnToLaunch);
        assert_eq!(LinkLossAction::from_param(4), LinkLossAction::Disabled);
        assert_eq!(LinkLossAction::from_param(6), LinkLossAction::Lockdown);
    }

    #[test]
    fn test_geofence_escape_actions() {
        assert!(!GeofenceAction::from_param(0).is_escape());
        assert!(!GeofenceAction::from_param(1).is_escape());
        assert!(GeofenceAction::from_param(2).is_escape());
        assert!(GeofenceAction::from_param(5).is_escape());
    }

    #[test]
    fn test_unknown_values_fall_back() {
        assert_eq!(LowBatteryAction::from_param(42), LowBatteryAction::Warning);
        assert_eq!(RtlType::from_param(-1), RtlType::Home);
        assert_eq!(TrafficAvoidAction::from_param(9), TrafficAvoidAction::Warn);
    }

    #[test]
    fn test_rc_bitmasks_truncate_unknown_bits() {
        let except = RcLossExceptions::from_bits_truncate(0xFF);
        assert!(except.contains(RcLossExceptions::MISSION | RcLossExceptions::OFFBOARD));
        let override_modes = RcOverrideModes::from_bits_truncate(1);
        assert!(override_modes.contains(RcOverrideModes::AUTO));
        assert!(!override_modes.contains(RcOverrideModes::OFFBOARD));
    }
}
