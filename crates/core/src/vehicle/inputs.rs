//! Records produced by collaborators outside the decision core.

use bitflags::bitflags;

use super::flags::BatteryWarning;

/// Pilot stick input, throttle normalized to `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ManualControlSetpoint {
    pub timestamp: u64,
    pub throttle: f32,
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub valid: bool,
    pub sticks_moving: bool,
}

/// Last heartbeat times seen on the telemetry links, 0 if never
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TelemetryStatus {
    pub timestamp: u64,
    pub heartbeat_gcs_us: u64,
    pub heartbeat_high_latency_us: u64,
}

/// Aggregated battery state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryStatus {
    pub timestamp: u64,
    pub connected: bool,
    pub warning: BatteryWarning,
    /// Estimated remaining flight time in seconds, NaN when unknown
    pub time_remaining_s: f32,
    /// Estimated time needed to return and land, NaN when unknown
    pub rtl_time_s: f32,
}

impl Default for BatteryStatus {
    fn default() -> Self {
        Self {
            timestamp: 0,
            connected: false,
            warning: BatteryWarning::None,
            time_remaining_s: f32::NAN,
            rtl_time_s: f32::NAN,
        }
    }
}

impl BatteryStatus {
    /// Remaining flight time is shorter than the time needed to return
    pub fn low_remaining_time(&self) -> bool {
        self.time_remaining_s.is_finite()
            && self.rtl_time_s.is_finite()
            && self.time_remaining_s < self.rtl_time_s
    }
}

bitflags! {
    /// Failure detector status bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FailureFlags: u16 {
        const ROLL = 1 << 0;
        const PITCH = 1 << 1;
        const ALT = 1 << 2;
        const EXT = 1 << 3;
        const ARM_ESC = 1 << 4;
        const BATTERY = 1 << 5;
        const IMBALANCED_PROP = 1 << 6;
        const MOTOR = 1 << 7;
    }
}

impl FailureFlags {
    /// Failures that end the flight through lockdown or termination
    pub fn attitude_or_altitude(self) -> bool {
        self.intersects(FailureFlags::ROLL | FailureFlags::PITCH | FailureFlags::ALT | FailureFlags::EXT)
    }
}

/// Safety switch state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SafetyState {
    pub button_available: bool,
    pub safety_off: bool,
}

impl SafetyState {
    /// Safety button present and still engaged
    pub fn is_engaged(&self) -> bool {
        self.button_available && !self.safety_off
    }
}

/// Direct actuator control request produced by ACTUATOR_TEST
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActuatorTest {
    pub timestamp: u64,
    /// Output function id (motor block at 101, servo block at 201)
    pub function: u16,
    pub value: f32,
    /// `false` releases the actuator back to normal control
    pub active: bool,
    pub timeout_ms: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_remaining_time_needs_both_estimates() {
        let mut battery = BatteryStatus::default();
        assert!(!battery.low_remaining_time());

        battery.time_remaining_s = 60.0;
        assert!(!battery.low_remaining_time());

        battery.rtl_time_s = 90.0;
        assert!(battery.low_remaining_time());

        battery.rtl_time_s = 30.0;
        assert!(!battery.low_remaining_time());
    }

    #[test]
    fn test_failure_groups() {
        assert!(FailureFlags::ROLL.attitude_or_altitude());
        assert!(FailureFlags::EXT.attitude_or_altitude());
        assert!(!FailureFlags::MOTOR.attitude_or_altitude());
        assert!(!FailureFlags::empty().attitude_or_altitude());
    }

    #[test]
    fn test_safety_engaged() {
        assert!(!SafetyState::default().is_engaged());
        let safety = SafetyState {
            button_available: true,
            safety_off: false,
        };
        assert!(safety.is_engaged());
    }
}
