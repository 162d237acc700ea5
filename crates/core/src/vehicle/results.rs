//! Results published by the navigator and read back by the commander.

use crate::failsafe::GeofenceAction;
use crate::mission::ExecutionMode;

/// Outcome of the most recent periodic geofence check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GeofenceResult {
    pub timestamp: u64,
    pub geofence_violated: bool,
    pub dist_to_home_exceeded: bool,
    pub max_altitude_exceeded: bool,
    pub fence_violation: bool,
    pub geofence_action: GeofenceAction,
    pub home_required: bool,
}

/// Mission progress reported by the navigator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MissionResult {
    pub timestamp: u64,
    pub valid: bool,
    pub seq_current: u16,
    pub seq_reached: i32,
    pub seq_total: u16,
    pub finished: bool,
    pub failure: bool,
    /// Keep the failsafe navigation state after the triggering condition clears
    pub stay_in_failsafe: bool,
    pub execution_mode: ExecutionMode,
    /// The navigator gave up on the flight and asks for termination
    pub flight_termination: bool,
}
