//! Position setpoint triplet
//!
//! The navigator's output: the previous, current and next setpoint the
//! position controller tracks. Altitudes are AMSL meters.

/// What the position controller should do at a setpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SetpointType {
    /// Fly to the position
    Position,
    /// Follow a velocity
    Velocity,
    /// Hold at the position (orbit for fixed wing)
    Loiter,
    /// Climb out at the position
    Takeoff,
    /// Descend and land at the position
    Land,
    /// Motors idle, nothing to track
    #[default]
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSetpoint {
    pub timestamp: u64,
    pub valid: bool,
    pub setpoint_type: SetpointType,
    pub lat: f64,
    pub lon: f64,
    pub alt: f32,
    /// Yaw in radians, NaN leaves heading to the controller
    pub yaw: f32,
    pub loiter_radius: f32,
    /// Negative for counter-clockwise loiter
    pub loiter_direction: i8,
    pub acceptance_radius: f32,
    /// Cruise speed (m/s), negative for the vehicle default
    pub cruising_speed: f32,
    /// Cruise throttle in 0..1, negative for the vehicle default
    pub cruising_throttle: f32,
}

impl Default for PositionSetpoint {
    fn default() -> Self {
        Self {
            timestamp: 0,
            valid: false,
            setpoint_type: SetpointType::Idle,
            lat: f64::NAN,
            lon: f64::NAN,
            alt: f32::NAN,
            yaw: f32::NAN,
            loiter_radius: 0.0,
            loiter_direction: 1,
            acceptance_radius: 0.0,
            cruising_speed: -1.0,
            cruising_throttle: -1.0,
        }
    }
}

impl PositionSetpoint {
    /// Valid setpoint of `setpoint_type` at a position
    pub fn at(setpoint_type: SetpointType, lat: f64, lon: f64, alt: f32) -> Self {
        Self {
            valid: true,
            setpoint_type,
            lat,
            lon,
            alt,
            ..Default::default()
        }
    }

    pub fn has_position(&self) -> bool {
        self.valid && self.lat.is_finite() && self.lon.is_finite()
    }

    pub fn is_loiter(&self) -> bool {
        self.valid && self.setpoint_type == SetpointType::Loiter
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PositionSetpointTriplet {
    pub timestamp: u64,
    pub previous: PositionSetpoint,
    pub current: PositionSetpoint,
    pub next: PositionSetpoint,
}

impl PositionSetpointTriplet {
    /// Invalidate all three setpoints
    pub fn reset(&mut self) {
        self.previous = PositionSetpoint::default();
        self.current = PositionSetpoint::default();
        self.next = PositionSetpoint::default();
    }

    /// Shift the current setpoint into previous and install a new current
    pub fn advance(&mut self, current: PositionSetpoint) {
        if self.current.valid {
            self.previous = self.current;
        }
        self.current = current;
        self.next = PositionSetpoint::default();
    }

    pub fn is_valid(&self) -> bool {
        self.current.valid
    }
}
