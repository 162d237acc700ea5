//! Named health conditions shared between health checks and arbitration.

/// Battery warning level, ordered by severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum BatteryWarning {
    #[default]
    None,
    Low,
    Critical,
    Emergency,
}

/// Status flags owned by the commander
///
/// Health checks write the estimator validity fields; arbitration writes
/// the calibration and link bookkeeping fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VehicleStatusFlags {
    pub timestamp: u64,
    pub home_position_valid: bool,
    pub global_position_valid: bool,
    pub local_position_valid: bool,
    pub local_altitude_valid: bool,
    pub local_velocity_valid: bool,
    pub rc_signal_found_once: bool,
    pub rc_calibration_in_progress: bool,
    pub calibration_enabled: bool,
    pub pre_flight_checks_pass: bool,
    pub auto_mission_available: bool,
    pub offboard_control_signal_lost: bool,
    pub battery_low_remaining_time: bool,
    pub battery_unhealthy: bool,
    pub battery_warning: BatteryWarning,
}
