//! Vehicle status record: identity, arming state and navigation state.

use core::fmt;

use super::inputs::FailureFlags;

/// Airframe class used by the arbitration rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VehicleType {
    #[default]
    RotaryWing,
    FixedWing,
    Rover,
}

impl VehicleType {
    /// Classify a MAV_TYPE value. Returns the type and whether it is a VTOL.
    ///
    /// VTOL airframes boot in rotary-wing configuration.
    pub fn from_mav_type(mav_type: i32) -> (Self, bool) {
        match mav_type {
            1 | 16 | 17 => (VehicleType::FixedWing, false),
            10 | 11 | 12 => (VehicleType::Rover, false),
            19..=22 => (VehicleType::RotaryWing, true),
            _ => (VehicleType::RotaryWing, false),
        }
    }
}

/// Arming state owned by the arming state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArmingState {
    #[default]
    Init,
    Standby,
    Armed,
    StandbyError,
    Shutdown,
    InAirRestore,
}

impl fmt::Display for ArmingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArmingState::Init => "INIT",
            ArmingState::Standby => "STANDBY",
            ArmingState::Armed => "ARMED",
            ArmingState::StandbyError => "STANDBY_ERROR",
            ArmingState::Shutdown => "SHUTDOWN",
            ArmingState::InAirRestore => "IN_AIR_RESTORE",
        };
        f.write_str(name)
    }
}

/// Arbitrated navigation state that drives the navigator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NavState {
    #[default]
    Manual,
    Altctl,
    Posctl,
    AutoMission,
    AutoLoiter,
    AutoRtl,
    Acro,
    Offboard,
    Stab,
    AutoTakeoff,
    AutoLand,
    AutoFollowTarget,
    AutoPrecland,
    Orbit,
    AutoVtolTakeoff,
    Descend,
    Termination,
}

impl NavState {
    /// Whether the state is flown by the navigator rather than the pilot
    pub fn is_auto(self) -> bool {
        matches!(
            self,
            NavState::AutoMission
                | NavState::AutoLoiter
                | NavState::AutoRtl
                | NavState::AutoTakeoff
                | NavState::AutoLand
                | NavState::AutoFollowTarget
                | NavState::AutoPrecland
                | NavState::AutoVtolTakeoff
                | NavState::Descend
        )
    }
}

impl NavState {
    /// Operator-facing mode name
    pub fn as_str(&self) -> &'static str {
        match self {
            NavState::Manual => "Manual",
            NavState::Altctl => "Altitude",
            NavState::Posctl => "Position",
            NavState::AutoMission => "Mission",
            NavState::AutoLoiter => "Hold",
            NavState::AutoRtl => "Return",
            NavState::Acro => "Acro",
            NavState::Offboard => "Offboard",
            NavState::Stab => "Stabilized",
            NavState::AutoTakeoff => "Takeoff",
            NavState::AutoLand => "Land",
            NavState::AutoFollowTarget => "Follow Target",
            NavState::AutoPrecland => "Precision Land",
            NavState::Orbit => "Orbit",
            NavState::AutoVtolTakeoff => "VTOL Takeoff",
            NavState::Descend => "Descend",
            NavState::Termination => "Termination",
        }
    }
}

impl fmt::Display for NavState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate vehicle status, written only by the commander
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VehicleStatus {
    pub timestamp: u64,
    pub system_id: u8,
    pub component_id: u8,
    pub vehicle_type: VehicleType,
    pub is_vtol: bool,
    pub in_transition_mode: bool,
    pub arming_state: ArmingState,
    pub nav_state: NavState,
    /// Refreshed exactly when `nav_state` changes
    pub nav_state_timestamp: u64,
    pub armed_time: u64,
    pub takeoff_time: u64,
    pub failsafe: bool,
    pub rc_signal_lost: bool,
    pub data_link_lost: bool,
    pub high_latency_data_link_lost: bool,
    pub geofence_violated: bool,
    pub failure_detector_status: FailureFlags,
}

impl VehicleStatus {
    pub fn is_armed(&self) -> bool {
        self.arming_state == ArmingState::Armed
    }

    pub fn is_rotary_wing(&self) -> bool {
        self.vehicle_type == VehicleType::RotaryWing
    }

    pub fn is_fixed_wing(&self) -> bool {
        self.vehicle_type == VehicleType::FixedWing
    }

    pub fn is_ground_vehicle(&self) -> bool {
        self.vehicle_type == VehicleType::Rover
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::format;

    use super::*;

    #[test]
    fn test_mav_type_classification() {
        assert_eq!(VehicleType::from_mav_type(2), (VehicleType::RotaryWing, false));
        assert_eq!(VehicleType::from_mav_type(1), (VehicleType::FixedWing, false));
        assert_eq!(VehicleType::from_mav_type(10), (VehicleType::Rover, false));
        assert_eq!(VehicleType::from_mav_type(20), (VehicleType::RotaryWing, true));
    }

    #[test]
    fn test_auto_states() {
        assert!(NavState::AutoMission.is_auto());
        assert!(NavState::Descend.is_auto());
        assert!(!NavState::Posctl.is_auto());
        assert!(!NavState::Orbit.is_auto());
        assert!(!NavState::Termination.is_auto());
    }

    #[test]
    fn test_display_names() {
        assert_eq!(format!("{}", ArmingState::InAirRestore), "IN_AIR_RESTORE");
        assert_eq!(format!("{}", NavState::AutoLoiter), "Hold");
    }
}
