//! Pilot/mission selected main state and its transition table
//!
//! `main_state_transition` is pure: its result depends only on the requested
//! state, the vehicle status, the status flags and the commander state
//! record it updates.

use crate::transition::TransitionResult;
use crate::vehicle::{NavState, VehicleStatus, VehicleStatusFlags, VehicleType};

/// High-level flight mode selected by the pilot or a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MainState {
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
}

impl MainState {
    /// Navigation state flown when no failsafe overrides the selection
    pub fn nav_state(self) -> NavState {
        match self {
            MainState::Manual => NavState::Manual,
            MainState::Altctl => NavState::Altctl,
            MainState::Posctl => NavState::Posctl,
            MainState::AutoMission => NavState::AutoMission,
            MainState::AutoLoiter => NavState::AutoLoiter,
            MainState::AutoRtl => NavState::AutoRtl,
            MainState::Acro => NavState::Acro,
            MainState::Offboard => NavState::Offboard,
            MainState::Stab => NavState::Stab,
            MainState::AutoTakeoff => NavState::AutoTakeoff,
            MainState::AutoLand => NavState::AutoLand,
            MainState::AutoFollowTarget => NavState::AutoFollowTarget,
            MainState::AutoPrecland => NavState::AutoPrecland,
            MainState::Orbit => NavState::Orbit,
            MainState::AutoVtolTakeoff => NavState::AutoVtolTakeoff,
        }
    }

    /// Pilot sticks drive the vehicle directly
    pub fn is_manual(self) -> bool {
        matches!(
            self,
            MainState::Manual
                | MainState::Altctl
                | MainState::Posctl
                | MainState::Acro
                | MainState::Stab
        )
    }

    pub fn is_auto(self) -> bool {
        matches!(
            self,
            MainState::AutoMission
                | MainState::AutoLoiter
                | MainState::AutoRtl
                | MainState::AutoTakeoff
                | MainState::AutoLand
                | MainState::AutoFollowTarget
                | MainState::AutoPrecland
                | MainState::AutoVtolTakeoff
                | MainState::Orbit
        )
    }
}

/// Commander state record: the selected main state plus change bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommanderState {
    pub timestamp: u64,
    pub main_state: MainState,
    /// Never decreases
    pub main_state_changes: u32,
}

/// Request a main state change.
pub fn main_state_transition(
    status: &VehicleStatus,
    new_state: MainState,
    flags: &VehicleStatusFlags,
    state: &mut CommanderState,
    now_us: u64,
) -> TransitionResult {
    let global = flags.global_position_valid;
    let local = flags.local_position_valid;

    let allowed = match new_state {
        MainState::Manual | MainState::Stab | MainState::Acro => true,
        MainState::Altctl => flags.local_altitude_valid || global,
        MainState::Posctl => local || global,
        MainState::Orbit => global && status.vehicle_type != VehicleType::FixedWing,
        MainState::AutoFollowTarget | MainState::AutoLoiter => global,
        MainState::AutoMission => global && flags.auto_mission_available,
        MainState::AutoRtl => global && flags.home_position_valid,
        MainState::AutoTakeoff | MainState::AutoLand | MainState::AutoPrecland => local || global,
        MainState::AutoVtolTakeoff => status.is_vtol && (local || global),
        MainState::Offboard => !flags.offboard_control_signal_lost,
    };

    if !allowed {
        return TransitionResult::Denied;
    }

    if state.main_state == new_state {
        return TransitionResult::NotChanged;
    }

    state.main_state = new_state;
    state.main_state_changes = state.main_state_changes.saturating_add(1);
    state.timestamp = now_us;
    TransitionResult::Changed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags_all_valid() -> VehicleStatusFlags {
        VehicleStatusFlags {
            global_position_valid: true,
            local_position_valid: true,
            local_altitude_valid: true,
            home_position_valid: true,
            auto_mission_available: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_manual_always_allowed() {
        let status = VehicleStatus::default();
        let mut state = CommanderState {
            main_state: MainState::Posctl,
            ..Default::default()
        };
        let result = main_state_transition(
            &status,
            MainState::Manual,
            &VehicleStatusFlags::default(),
            &mut state,
            10,
        );
        assert_eq!(result, TransitionResult::Changed);
        assert_eq!(state.main_state_changes, 1);
        assert_eq!(state.timestamp, 10);
    }

    #[test]
    fn test_position_modes_need_estimate() {
        let status = VehicleStatus::default();
        let flags = VehicleStatusFlags::default();
        for target in [
            MainState::Posctl,
            MainState::AutoLoiter,
            MainState::AutoRtl,
            MainState::AutoMission,
            MainState::Orbit,
        ] {
            let mut state = CommanderState::default();
            let before = state;
            let result = main_state_transition(&status, target, &flags, &mut state, 5);
            assert_eq!(result, TransitionResult::Denied, "{:?}", target);
            assert_eq!(state, before);
        }
    }

    #[test]
    fn test_mission_needs_valid_mission() {
        let status = VehicleStatus::default();
        let mut flags = flags_all_valid();
        flags.auto_mission_available = false;
        let mut state = CommanderState::default();
        assert!(main_state_transition(&status, MainState::AutoMission, &flags, &mut state, 0)
            .is_denied());

        flags.auto_mission_available = true;
        assert!(main_state_transition(&status, MainState::AutoMission, &flags, &mut state, 0)
            .is_changed());
    }

    #[test]
    fn test_orbit_denied_for_fixed_wing() {
        let status = VehicleStatus {
            vehicle_type: VehicleType::FixedWing,
            ..Default::default()
        };
        let mut state = CommanderState::default();
        assert!(main_state_transition(&status, MainState::Orbit, &flags_all_valid(), &mut state, 0)
            .is_denied());
    }

    #[test]
    fn test_vtol_takeoff_needs_vtol() {
        let mut status = VehicleStatus::default();
        let mut state = CommanderState::default();
        let flags = flags_all_valid();
        assert!(
            main_state_transition(&status, MainState::AutoVtolTakeoff, &flags, &mut state, 0)
                .is_denied()
        );
        status.is_vtol = true;
        assert!(
            main_state_transition(&status, MainState::AutoVtolTakeoff, &flags, &mut state, 0)
                .is_changed()
        );
    }

    #[test]
    fn test_same_state_not_changed_and_counter_monotonic() {
        let status = VehicleStatus::default();
        let flags = flags_all_valid();
        let mut state = CommanderState::default();
        let sequence = [
            MainState::Posctl,
            MainState::Posctl,
            MainState::AutoLoiter,
            MainState::Offboard,
            MainState::Manual,
            MainState::Manual,
        ];
        let mut last = state.main_state_changes;
        for target in sequence {
            let _ = main_state_transition(&status, target, &flags, &mut state, 0);
            assert!(state.main_state_changes >= last);
            last = state.main_state_changes;
        }
        assert_eq!(state.main_state_changes, 4);
        assert_eq!(
            main_state_transition(&status, MainState::Manual, &flags, &mut state, 0),
            TransitionResult::NotChanged
        );
    }

    #[test]
    fn test_offboard_needs_signal() {
        let status = VehicleStatus::default();
        let mut flags = flags_all_valid();
        flags.offboard_control_signal_lost = true;
        let mut state = CommanderState::default();
        assert!(main_state_transition(&status, MainState::Offboard, &flags, &mut state, 0)
            .is_denied());
    }
}
