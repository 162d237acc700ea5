//! Navigation state arbitration
//!
//! [`resolve`] maps the selected main state and every failure source to the
//! navigation state that is actually flown. Sources are evaluated in a fixed
//! order and the first one that applies wins:
//!
//! 1. flight termination and lockdown
//! 2. RC loss
//! 3. data link loss
//! 4. geofence violation
//! 5. battery reaction
//! 6. offboard signal loss
//! 7. mission result
//! 8. the selected main state
//!
//! The result is finally checked against the available position estimates
//! and degraded (RTL → Land → Descend) when the chosen state cannot be
//! flown. The function reads only its inputs.

use crate::commander::MainState;
use crate::parameters::CommanderParams;
use crate::vehicle::{
    ActuatorArmed, GeofenceResult, MissionResult, NavState, VehicleStatus, VehicleStatusFlags,
};

use super::{
    BatteryOverride, GeofenceAction, LinkLossAction, OffboardLossAction, RcLossExceptions,
};

/// Which input decided the navigation state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailsafeSource {
    #[default]
    None,
    Termination,
    Lockdown,
    RcLoss,
    DataLinkLoss,
    Geofence,
    Battery,
    OffboardLoss,
    Mission,
    PositionLoss,
}

/// Resolver inputs, borrowed from the commander context
#[derive(Debug, Clone, Copy)]
pub struct FailsafeInputs<'a> {
    pub main_state: MainState,
    pub status: &'a VehicleStatus,
    pub flags: &'a VehicleStatusFlags,
    pub armed: &'a ActuatorArmed,
    pub geofence: &'a GeofenceResult,
    pub mission: &'a MissionResult,
    pub battery: Option<BatteryOverride>,
    pub params: &'a CommanderParams,
}

/// Outcome of one resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailsafeDecision {
    pub nav_state: NavState,
    /// A failure source overrides the selected main state
    pub failsafe: bool,
    pub source: FailsafeSource,
    /// The chosen action needs the lockdown latch
    pub request_lockdown: bool,
    /// The chosen action needs flight termination
    pub request_termination: bool,
}

impl FailsafeDecision {
    fn nominal(nav_state: NavState) -> Self {
        Self {
            nav_state,
            failsafe: false,
            source: FailsafeSource::None,
            request_lockdown: false,
            request_termination: false,
        }
    }

    fn failsafe(nav_state: NavState, source: FailsafeSource) -> Self {
        Self {
            nav_state,
            failsafe: true,
            source,
            request_lockdown: false,
            request_termination: false,
        }
    }
}

/// Compute the authoritative navigation state.
pub fn resolve(inputs: &FailsafeInputs<'_>) -> FailsafeDecision {
    let status = inputs.status;
    let main = inputs.main_state;
    let main_nav = main.nav_state();
    let armed = status.is_armed();

    if inputs.armed.force_failsafe {
        return FailsafeDecision::failsafe(NavState::Termination, FailsafeSource::Termination);
    }

    if inputs.armed.is_locked_down() {
        return FailsafeDecision::failsafe(main_nav, FailsafeSource::Lockdown);
    }

    if !armed {
        return FailsafeDecision::nominal(main_nav);
    }

    let decision = rc_loss_decision(inputs, main_nav)
        .or_else(|| data_link_decision(inputs, main_nav))
        .or_else(|| geofence_decision(inputs.geofence, main_nav))
        .or_else(|| inputs.battery.map(battery_decision))
        .or_else(|| offboard_loss_decision(inputs))
        .or_else(|| mission_decision(inputs))
        .unwrap_or_else(|| FailsafeDecision::nominal(main_nav));

    degrade_for_position(decision, inputs)
}

/// Apply a decision to the status record. Returns `true` when the
/// navigation state changed; the change timestamp moves only then.
pub fn apply_decision(status: &mut VehicleStatus, decision: &FailsafeDecision, now_us: u64) -> bool {
    status.failsafe = decision.failsafe;

    if status.nav_state == decision.nav_state {
        return false;
    }

    status.nav_state = decision.nav_state;
    status.nav_state_timestamp = now_us;
    true
}

fn rc_loss_decision(inputs: &FailsafeInputs<'_>, main_nav: NavState) -> Option<FailsafeDecision> {
    if !inputs.status.rc_signal_lost || !inputs.flags.rc_signal_found_once {
        return None;
    }

    let except = inputs.params.rc_loss_exceptions;
    let required = match inputs.main_state {
        MainState::AutoMission => !except.contains(RcLossExceptions::MISSION),
        MainState::AutoLoiter => !except.contains(RcLossExceptions::HOLD),
        MainState::Offboard => !except.contains(RcLossExceptions::OFFBOARD),
        MainState::Orbit | MainState::AutoFollowTarget => true,
        state => state.is_manual(),
    };

    if !required {
        return None;
    }
    link_loss_decision(inputs.params.rc_loss_action, main_nav, FailsafeSource::RcLoss)
}

fn data_link_decision(inputs: &FailsafeInputs<'_>, main_nav: NavState) -> Option<FailsafeDecision> {
    if !inputs.status.data_link_lost || !data_link_required(inputs.main_state) {
        return None;
    }
    link_loss_decision(inputs.params.dl_loss_action, main_nav, FailsafeSource::DataLinkLoss)
}

fn battery_decision(reaction: BatteryOverride) -> FailsafeDecision {
    let nav = match reaction {
        BatteryOverride::Loiter => NavState::AutoLoiter,
        BatteryOverride::ReturnToLaunch => NavState::AutoRtl,
        BatteryOverride::Land => NavState::AutoLand,
    };
    FailsafeDecision::failsafe(nav, FailsafeSource::Battery)
}

/// Modes flown without a pilot, where the ground station is the only
/// supervisor
fn data_link_required(main: MainState) -> bool {
    matches!(
        main,
        MainState::AutoMission
            | MainState::AutoLoiter
            | MainState::AutoFollowTarget
            | MainState::Orbit
            | MainState::Offboard
    )
}

fn link_loss_decision(
    action: LinkLossAction,
    main_nav: NavState,
    source: FailsafeSource,
) -> Option<FailsafeDecision> {
    let decision = match action {
        LinkLossAction::Disabled => return None,
        LinkLossAction::Loiter => FailsafeDecision::failsafe(NavState::AutoLoiter, source),
        LinkLossAction::ReturnToLaunch => FailsafeDecision::failsafe(NavState::AutoRtl, source),
        LinkLossAction::Land => FailsafeDecision::failsafe(NavState::AutoLand, source),
        LinkLossAction::Terminate => FailsafeDecision {
            request_termination: true,
            ..FailsafeDecision::failsafe(NavState::Termination, source)
        },
        LinkLossAction::Lockdown => FailsafeDecision {
            request_lockdown: true,
            ..FailsafeDecision::failsafe(main_nav, source)
        },
    };
    Some(decision)
}

fn geofence_decision(geofence: &GeofenceResult, main_nav: NavState) -> Option<FailsafeDecision> {
    if !geofence.geofence_violated {
        return None;
    }

    let nav = match geofence.geofence_action {
        GeofenceAction::None | GeofenceAction::Warn => return None,
        GeofenceAction::Loiter => NavState::AutoLoiter,
        GeofenceAction::ReturnToLaunch => NavState::AutoRtl,
        GeofenceAction::Land => NavState::AutoLand,
        GeofenceAction::Terminate => {
            return Some(FailsafeDecision {
                request_termination: true,
                ..FailsafeDecision::failsafe(NavState::Termination, FailsafeSource::Geofence)
            })
        }
    };

    // Already flying the escape mode
    if nav == main_nav {
        return Some(FailsafeDecision {
            source: FailsafeSource::Geofence,
            ..FailsafeDecision::nominal(nav)
        });
    }

    Some(FailsafeDecision::failsafe(nav, FailsafeSource::Geofence))
}

fn offboard_loss_decision(inputs: &FailsafeInputs<'_>) -> Option<FailsafeDecision> {
    if inputs.main_state != MainState::Offboard || !inputs.flags.offboard_control_signal_lost {
        return None;
    }

    let source = FailsafeSource::OffboardLoss;
    let decision = match inputs.params.offboard_loss_action {
        OffboardLossAction::Land => FailsafeDecision::failsafe(NavState::AutoLand, source),
        OffboardLossAction::Loiter => FailsafeDecision::failsafe(NavState::AutoLoiter, source),
        OffboardLossAction::ReturnToLaunch => FailsafeDecision::failsafe(NavState::AutoRtl, source),
        OffboardLossAction::Terminate => FailsafeDecision {
            request_termination: true,
            ..FailsafeDecision::failsafe(NavState::Termination, source)
        },
        OffboardLossAction::Lockdown => FailsafeDecision {
            request_lockdown: true,
            ..FailsafeDecision::failsafe(NavState::AutoLand, source)
        },
    };
    Some(decision)
}

fn mission_decision(inputs: &FailsafeInputs<'_>) -> Option<FailsafeDecision> {
    if inputs.main_state != MainState::AutoMission {
        return None;
    }

    let mission = inputs.mission;
    let status = inputs.status;

    if mission.stay_in_failsafe && status.failsafe {
        return Some(FailsafeDecision::failsafe(status.nav_state, FailsafeSource::Mission));
    }

    if mission.failure || !inputs.flags.auto_mission_available {
        return Some(FailsafeDecision::failsafe(NavState::AutoLoiter, FailsafeSource::Mission));
    }

    if mission.finished {
        return Some(FailsafeDecision {
            source: FailsafeSource::Mission,
            ..FailsafeDecision::nominal(NavState::AutoLoiter)
        });
    }

    None
}

fn degrade_for_position(decision: FailsafeDecision, inputs: &FailsafeInputs<'_>) -> FailsafeDecision {
    let flags = inputs.flags;
    let global = flags.global_position_valid;
    let local = flags.local_position_valid;
    let altitude = flags.local_altitude_valid || global;

    let land_or_descend = if local || global {
        NavState::AutoLand
    } else {
        NavState::Descend
    };

    let nav = match decision.nav_state {
        NavState::AutoRtl if !(global && flags.home_position_valid) => land_or_descend,
        NavState::AutoMission
        | NavState::AutoLoiter
        | NavState::AutoFollowTarget
        | NavState::Orbit
            if !global =>
        {
            land_or_descend
        }
        NavState::AutoLand | NavState::AutoPrecland | NavState::AutoTakeoff
            if !(local || global) =>
        {
            NavState::Descend
        }
        NavState::Posctl if !(local || global) => {
            if altitude {
                NavState::Altctl
            } else {
                NavState::Stab
            }
        }
        NavState::Altctl if !altitude => NavState::Stab,
        _ => return decision,
    };

    FailsafeDecision {
        nav_state: nav,
        failsafe: true,
        source: if decision.failsafe {
            decision.source
        } else {
            FailsafeSource::PositionLoss
        },
        ..decision
    }
}
