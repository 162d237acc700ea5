//! Arming and disarming denial reasons
//!
//! Each denial maps to a stable event identifier and a user-facing message.

use core::fmt;

use crate::vehicle::ArmingState;

/// Why an arm request was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmingDenied {
    /// Climb-rate mode with throttle above center
    ThrottleAboveCenter,
    /// Manual thrust mode with throttle not at minimum
    ThrottleNotLow,
    /// RC gestures may only arm in a manual mode
    NotInManualMode,
    /// Geofence return action configured without a valid home
    GeofenceNeedsHome,
    /// Health checks refused arming
    PreflightChecksFailed,
    /// Arming state table forbids the transition
    InvalidTransition { from: ArmingState, to: ArmingState },
}

impl ArmingDenied {
    pub fn event_id(&self) -> &'static str {
        match self {
            ArmingDenied::ThrottleAboveCenter => "commander_arm_denied_throttle_center",
            ArmingDenied::ThrottleNotLow => "commander_arm_denied_throttle_high",
            ArmingDenied::NotInManualMode => "commander_arm_denied_not_manual",
            ArmingDenied::GeofenceNeedsHome => "commander_arm_denied_geofence_rtl",
            ArmingDenied::PreflightChecksFailed => "commander_arm_denied_preflight",
            ArmingDenied::InvalidTransition { .. } => "commander_arm_denied_transition",
        }
    }
}

impl fmt::Display for ArmingDenied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArmingDenied::ThrottleAboveCenter => {
                write!(f, "Arming denied: throttle above center")
            }
            ArmingDenied::ThrottleNotLow => write!(f, "Arming denied: high throttle"),
            ArmingDenied::NotInManualMode => {
                write!(f, "Not arming! Switch to a manual mode first")
            }
            ArmingDenied::GeofenceNeedsHome => {
                write!(f, "Arming denied: Geofence RTL requires valid home")
            }
            ArmingDenied::PreflightChecksFailed => write!(f, "Arming denied: checks failed"),
            ArmingDenied::InvalidTransition { from, to } => {
                write!(f, "Arming denied: {} to {} not allowed", from, to)
            }
        }
    }
}

/// Why a disarm request was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisarmDenied {
    /// Airborne and not in a pilot-thrust mode commanded by RC
    NotLanded,
    InvalidTransition { from: ArmingState },
}

impl DisarmDenied {
    pub fn event_id(&self) -> &'static str {
        match self {
            DisarmDenied::NotLanded => "commander_disarm_denied_not_landed",
            DisarmDenied::InvalidTransition { .. } => "commander_disarm_denied_transition",
        }
    }
}

impl fmt::Display for DisarmDenied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisarmDenied::NotLanded => write!(f, "Disarming denied: not landed"),
            DisarmDenied::InvalidTransition { from } => {
                write!(f, "Disarming denied: not allowed from {}", from)
            }
        }
    }
}
