//! Records shared by the navigator behaviors
//!
//! [`NavContext`] is the read-only view of one cycle (vehicle state,
//! parameters, mission plan). [`NavShared`] holds what the behaviors write:
//! the setpoint triplet, the command buffers, the mission result and the
//! outgoing events and commands.

use crate::commander::Outbox;
use crate::events::EventLog;
use crate::geo::distance_to_point;
use crate::mission::MissionPlan;
use crate::parameters::{GeofenceParams, NavigatorParams};
use crate::vehicle::{
    GlobalPosition, HomePosition, LandDetected, LocalPosition, MissionResult, VehicleStatus,
    VehicleType,
};

use super::triplet::{PositionSetpoint, PositionSetpointTriplet, SetpointType};

/// What the position controller reports about the setpoint it tracks
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PositionControllerStatus {
    pub timestamp: u64,
    /// Bearing to the tracked setpoint (rad)
    pub nav_bearing: f32,
    /// Turn radius the fixed-wing controller needs to switch waypoints (m)
    pub acceptance_radius: f32,
    /// Altitude acceptance the controller uses while climbing (m)
    pub altitude_acceptance: f32,
}

/// Landing target estimate for precision landing
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LandingTarget {
    pub timestamp: u64,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoiMode {
    #[default]
    None,
    WaypointNext,
    Waypoint,
    Location,
    Target,
}

impl RoiMode {
    pub fn from_param(value: f32) -> Self {
        match value as i32 {
            1 => RoiMode::WaypointNext,
            2 => RoiMode::Waypoint,
            3 => RoiMode::Location,
            4 => RoiMode::Target,
            _ => RoiMode::None,
        }
    }
}

/// Region of interest for the gimbal
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VehicleRoi {
    pub timestamp: u64,
    pub mode: RoiMode,
    pub lat: f64,
    pub lon: f64,
    pub alt: f32,
    /// Offsets (rad) applied while pointing at the next waypoint
    pub pitch_offset: f32,
    pub roll_offset: f32,
    pub yaw_offset: f32,
}

/// Parameters of the last NAV_VTOL_TAKEOFF command
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VtolTakeoffRequest {
    /// AMSL altitude of the front transition (m)
    pub transition_alt: f32,
    pub loiter_lat: f64,
    pub loiter_lon: f64,
    /// Loiter height above home after the transition (m)
    pub loiter_height: f32,
}

impl Default for VtolTakeoffRequest {
    fn default() -> Self {
        Self {
            transition_alt: f32::NAN,
            loiter_lat: f64::NAN,
            loiter_lon: f64::NAN,
            loiter_height: f32::NAN,
        }
    }
}

/// Cruise speed and throttle overrides from DO_CHANGE_SPEED
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CruiseOverrides {
    mc_speed: f32,
    fw_speed: f32,
    throttle: f32,
}

impl Default for CruiseOverrides {
    fn default() -> Self {
        Self {
            mc_speed: -1.0,
            fw_speed: -1.0,
            throttle: -1.0,
        }
    }
}

impl CruiseOverrides {
    /// Override for the vehicle type, negative when unset
    pub fn speed(&self, vehicle_type: VehicleType) -> f32 {
        match vehicle_type {
            VehicleType::FixedWing => self.fw_speed,
            _ => self.mc_speed,
        }
    }

    pub fn set_speed(&mut self, vehicle_type: VehicleType, speed: f32) {
        match vehicle_type {
            VehicleType::FixedWing => self.fw_speed = speed,
            _ => self.mc_speed = speed,
        }
    }

    pub fn reset_speed(&mut self) {
        self.mc_speed = -1.0;
        self.fw_speed = -1.0;
    }

    pub fn throttle(&self) -> f32 {
        self.throttle
    }

    /// Throttle in 0..1, negative for the vehicle default
    pub fn set_throttle(&mut self, throttle: f32) {
        self.throttle = throttle;
    }

    pub fn reset_throttle(&mut self) {
        self.throttle = -1.0;
    }
}

/// Read-only inputs of one navigator cycle
#[derive(Debug, Clone, Copy)]
pub struct NavContext<'a> {
    pub now_us: u64,
    pub status: &'a VehicleStatus,
    pub land: &'a LandDetected,
    /// Last received global position
    pub position: &'a GlobalPosition,
    pub local: &'a LocalPosition,
    pub home: &'a HomePosition,
    pub params: &'a NavigatorParams,
    pub geofence_params: &'a GeofenceParams,
    pub plan: &'a MissionPlan,
    pub position_controller: Option<&'a PositionControllerStatus>,
    /// Fresh landing target, `None` when none is tracked
    pub landing_target: Option<&'a LandingTarget>,
}

impl NavContext<'_> {
    pub fn is_armed(&self) -> bool {
        self.status.is_armed()
    }

    pub fn landed(&self) -> bool {
        self.land.landed
    }

    /// Horizontal acceptance radius. Fixed wing widens it to the turn
    /// radius its controller reports.
    pub fn acceptance_radius(&self) -> f32 {
        let radius = self.params.acceptance_radius;
        match self.position_controller {
            Some(pc)
                if self.status.is_fixed_wing()
                    && pc.acceptance_radius.is_finite()
                    && pc.acceptance_radius > radius =>
            {
                pc.acceptance_radius
            }
            _ => radius,
        }
    }

    /// Vertical acceptance radius for `current`
    pub fn altitude_acceptance_radius(&self, current: &PositionSetpoint) -> f32 {
        match self.status.vehicle_type {
            VehicleType::FixedWing => self.params.fw_altitude_acceptance_radius,
            VehicleType::Rover => f32::INFINITY,
            VehicleType::RotaryWing => {
                let radius = self.params.mc_altitude_acceptance_radius;
                match self.position_controller {
                    // Only a report about the setpoint we sent counts
                    Some(pc)
                        if pc.timestamp >= current.timestamp
                            && pc.altitude_acceptance.is_finite()
                            && pc.altitude_acceptance > radius =>
                    {
                        pc.altitude_acceptance
                    }
                    _ => radius,
                }
            }
        }
    }

    pub fn loiter_radius(&self) -> f32 {
        self.params.loiter_radius
    }

    pub fn distance_to(&self, lat: f64, lon: f64) -> f32 {
        distance_to_point(self.position.lat, self.position.lon, lat, lon)
    }

    /// Within the horizontal and vertical acceptance of `sp`
    pub fn has_reached(&self, sp: &PositionSetpoint) -> bool {
        if !sp.has_position() {
            return false;
        }
        let radius = if sp.acceptance_radius > 0.0 {
            sp.acceptance_radius
        } else {
            self.acceptance_radius()
        };
        self.distance_to(sp.lat, sp.lon) <= radius && self.altitude_reached(sp)
    }

    pub fn altitude_reached(&self, sp: &PositionSetpoint) -> bool {
        !sp.alt.is_finite()
            || libm::fabsf(self.position.alt - sp.alt) <= self.altitude_acceptance_radius(sp)
    }

    /// Default cruise speed of the vehicle type (m/s)
    pub fn default_cruising_speed(&self) -> f32 {
        if self.status.is_fixed_wing() {
            self.params.fw_cruise_speed
        } else {
            self.params.mc_cruise_speed
        }
    }
}

/// Records the behaviors write
#[derive(Debug, Default)]
pub struct NavShared {
    pub triplet: PositionSetpointTriplet,
    /// Set whenever the triplet changed this cycle
    pub triplet_updated: bool,
    /// DO_REPOSITION / DO_ORBIT target, consumed by loiter
    pub reposition: PositionSetpointTriplet,
    /// NAV_TAKEOFF target, consumed by takeoff
    pub takeoff: PositionSetpointTriplet,
    pub vtol_takeoff: VtolTakeoffRequest,
    pub mission_result: MissionResult,
    pub mission_result_updated: bool,
    pub cruise: CruiseOverrides,
    pub roi: VehicleRoi,
    pub roi_updated: bool,
    pub events: EventLog,
    pub outbox: Outbox,
}

impl NavShared {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cruise speed, the override when set
    pub fn cruising_speed(&self, ctx: &NavContext<'_>) -> f32 {
        let speed = self.cruise.speed(ctx.status.vehicle_type);
        if speed > 0.0 {
            speed
        } else {
            ctx.default_cruising_speed()
        }
    }

    pub fn cruising_throttle(&self) -> f32 {
        self.cruise.throttle()
    }

    /// Setpoint with the radii and cruise values of this cycle filled in
    pub fn setpoint(
        &self,
        ctx: &NavContext<'_>,
        setpoint_type: SetpointType,
        lat: f64,
        lon: f64,
        alt: f32,
    ) -> PositionSetpoint {
        PositionSetpoint {
            timestamp: ctx.now_us,
            loiter_radius: ctx.loiter_radius(),
            acceptance_radius: ctx.acceptance_radius(),
            cruising_speed: self.cruising_speed(ctx),
            cruising_throttle: self.cruising_throttle(),
            ..PositionSetpoint::at(setpoint_type, lat, lon, alt)
        }
    }

    /// Idle setpoint at the current position, used once on the ground
    pub fn idle_setpoint(&self, ctx: &NavContext<'_>) -> PositionSetpoint {
        self.setpoint(
            ctx,
            SetpointType::Idle,
            ctx.position.lat,
            ctx.position.lon,
            ctx.position.alt,
        )
    }

    /// Install a new current setpoint, keeping the old one as previous
    pub fn set_current(&mut self, ctx: &NavContext<'_>, current: PositionSetpoint) {
        self.triplet.advance(current);
        self.triplet.timestamp = ctx.now_us;
        self.triplet_updated = true;
    }

    /// Replace the whole triplet
    pub fn set_triplet(&mut self, ctx: &NavContext<'_>, triplet: PositionSetpointTriplet) {
        self.triplet = triplet;
        self.triplet.timestamp = ctx.now_us;
        self.triplet_updated = true;
    }

    pub fn reset_triplet(&mut self, now_us: u64) {
        self.triplet.reset();
        self.triplet.timestamp = now_us;
        self.triplet_updated = true;
    }

    pub fn set_mission_finished(&mut self, finished: bool) {
        if self.mission_result.finished != finished {
            self.mission_result.finished = finished;
            self.mission_result_updated = true;
        }
    }

    pub fn set_flight_termination(&mut self, terminate: bool) {
        if self.mission_result.flight_termination != terminate {
            self.mission_result.flight_termination = terminate;
            self.mission_result_updated = true;
        }
    }
}
