//! Position and landing records consumed by both tasks.

/// Global position estimate (WGS84, AMSL altitude)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GlobalPosition {
    pub timestamp: u64,
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lon: f64,
    /// Altitude AMSL in meters
    pub alt: f32,
}

/// Local NED kinematics
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LocalPosition {
    pub timestamp: u64,
    pub vx: f32,
    pub vy: f32,
    /// Down-positive vertical velocity
    pub vz: f32,
    /// Heading in radians
    pub heading: f32,
    pub xy_valid: bool,
    pub z_valid: bool,
    pub v_xy_valid: bool,
    pub v_z_valid: bool,
}

impl LocalPosition {
    pub fn ground_speed(&self) -> f32 {
        libm::sqrtf(self.vx * self.vx + self.vy * self.vy)
    }
}

/// Home position
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HomePosition {
    pub timestamp: u64,
    pub lat: f64,
    pub lon: f64,
    pub alt: f32,
    /// Yaw in radians, NaN when unknown
    pub yaw: f32,
    pub valid_hpos: bool,
    pub valid_alt: bool,
    pub manual_home: bool,
}

impl HomePosition {
    pub fn is_valid(&self) -> bool {
        self.valid_hpos && self.valid_alt
    }
}

/// Land detector output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LandDetected {
    pub timestamp: u64,
    pub landed: bool,
    pub maybe_landed: bool,
    pub ground_contact: bool,
}

impl Default for LandDetected {
    fn default() -> Self {
        Self {
            timestamp: 0,
            landed: true,
            maybe_landed: true,
            ground_contact: true,
        }
    }
}
