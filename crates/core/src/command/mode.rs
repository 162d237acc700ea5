//! Base/custom mode encoding used by SET_MODE and the heartbeat.
//!
//! The custom mode word packs the main mode in bits 16..24 and the sub
//! mode in bits 24..32.

use bitflags::bitflags;

use crate::commander::MainState;
use crate::vehicle::NavState;

bitflags! {
    /// MAV_MODE_FLAG bits of the base mode byte
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct BaseMode: u8 {
        const CUSTOM_MODE_ENABLED = 1;
        const TEST_ENABLED = 2;
        const AUTO_ENABLED = 4;
        const GUIDED_ENABLED = 8;
        const STABILIZE_ENABLED = 16;
        const HIL_ENABLED = 32;
        const MANUAL_INPUT_ENABLED = 64;
        const SAFETY_ARMED = 128;
    }
}

pub mod custom_main {
    pub const MANUAL: u8 = 1;
    pub const ALTCTL: u8 = 2;
    pub const POSCTL: u8 = 3;
    pub const AUTO: u8 = 4;
    pub const ACRO: u8 = 5;
    pub const OFFBOARD: u8 = 6;
    pub const STABILIZED: u8 = 7;
}

pub mod custom_sub_auto {
    pub const READY: u8 = 1;
    pub const TAKEOFF: u8 = 2;
    pub const LOITER: u8 = 3;
    pub const MISSION: u8 = 4;
    pub const RTL: u8 = 5;
    pub const LAND: u8 = 6;
    pub const FOLLOW_TARGET: u8 = 8;
    pub const PRECLAND: u8 = 9;
    pub const VTOL_TAKEOFF: u8 = 10;
}

pub const CUSTOM_SUB_POSCTL_ORBIT: u8 = 1;

/// Decode SET_MODE parameters into a main state.
///
/// Custom mode takes precedence over base-mode flags. Returns `None` for
/// unknown custom modes.
pub fn main_state_for_mode(base_mode: u8, custom_main: u8, custom_sub: u8) -> Option<MainState> {
    let base = BaseMode::from_bits_truncate(base_mode);

    if base.contains(BaseMode::CUSTOM_MODE_ENABLED) {
        return match custom_main {
            custom_main::MANUAL => Some(MainState::Manual),
            custom_main::ALTCTL => Some(MainState::Altctl),
            custom_main::POSCTL if custom_sub == CUSTOM_SUB_POSCTL_ORBIT => Some(MainState::Orbit),
            custom_main::POSCTL => Some(MainState::Posctl),
            custom_main::AUTO => match custom_sub {
                0 | custom_sub_auto::MISSION => Some(MainState::AutoMission),
                custom_sub_auto::TAKEOFF => Some(MainState::AutoTakeoff),
                custom_sub_auto::LOITER => Some(MainState::AutoLoiter),
                custom_sub_auto::RTL => Some(MainState::AutoRtl),
                custom_sub_auto::LAND => Some(MainState::AutoLand),
                custom_sub_auto::FOLLOW_TARGET => Some(MainState::AutoFollowTarget),
                custom_sub_auto::PRECLAND => Some(MainState::AutoPrecland),
                custom_sub_auto::VTOL_TAKEOFF => Some(MainState::AutoVtolTakeoff),
                _ => None,
            },
            custom_main::ACRO => Some(MainState::Acro),
            custom_main::OFFBOARD => Some(MainState::Offboard),
            custom_main::STABILIZED => Some(MainState::Stab),
            _ => None,
        };
    }

    if base.contains(BaseMode::AUTO_ENABLED) {
        Some(MainState::AutoMission)
    } else if base.contains(BaseMode::MANUAL_INPUT_ENABLED) {
        if base.contains(BaseMode::GUIDED_ENABLED) {
            Some(MainState::Posctl)
        } else if base.contains(BaseMode::STABILIZE_ENABLED) {
            Some(MainState::Stab)
        } else {
            Some(MainState::Manual)
        }
    } else {
        None
    }
}

/// Packed custom mode word reported for a navigation state
pub fn custom_mode_for_nav_state(nav_state: NavState) -> u32 {
    let (main, sub) = match nav_state {
        NavState::Manual => (custom_main::MANUAL, 0),
        NavState::Altctl => (custom_main::ALTCTL, 0),
        NavState::Posctl => (custom_main::POSCTL, 0),
        NavState::Orbit => (custom_main::POSCTL, CUSTOM_SUB_POSCTL_ORBIT),
        NavState::AutoMission => (custom_main::AUTO, custom_sub_auto::MISSION),
        NavState::AutoLoiter => (custom_main::AUTO, custom_sub_auto::LOITER),
        NavState::AutoRtl => (custom_main::AUTO, custom_sub_auto::RTL),
        NavState::AutoTakeoff => (custom_main::AUTO, custom_sub_auto::TAKEOFF),
        NavState::AutoLand | NavState::Descend => (custom_main::AUTO, custom_sub_auto::LAND),
        NavState::AutoFollowTarget => (custom_main::AUTO, custom_sub_auto::FOLLOW_TARGET),
        NavState::AutoPrecland => (custom_main::AUTO, custom_sub_auto::PRECLAND),
        NavState::AutoVtolTakeoff => (custom_main::AUTO, custom_sub_auto::VTOL_TAKEOFF),
        NavState::Acro => (custom_main::ACRO, 0),
        NavState::Offboard => (custom_main::OFFBOARD, 0),
        NavState::Stab => (custom_main::STABILIZED, 0),
        NavState::Termination => (custom_main::MANUAL, 0),
    };
    ((main as u32) << 16) | ((sub as u32) << 24)
}
