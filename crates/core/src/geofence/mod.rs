//! Geofence monitoring
//!
//! [`GeofenceMonitor`] runs the periodic fence check on the navigator side:
//! it predicts a test point (see [`breach`]), evaluates it against a
//! [`Geofence`] implementation such as [`FenceSet`], publishes the
//! [`GeofenceResult`] the commander ingests, and on the first violation
//! while armed warns once and, for the loiter action, produces a loiter
//! setpoint inside the fence for the reposition buffer.

pub mod breach;
pub mod fence;

pub use breach::{BreachAvoidance, BreachState, ViolationType};
pub use fence::{FenceError, FenceSet, FenceShape, Vertex};

use crate::events::{EventLog, Severity};
use crate::failsafe::GeofenceAction;
use crate::latch::OneShot;
use crate::navigator::{PositionSetpoint, SetpointType};
use crate::parameters::{GeofenceParams, GEOFENCE_CHECK_INTERVAL_US};
use crate::traits::Geofence;
use crate::vehicle::{GeofenceResult, GlobalPosition, HomePosition, LocalPosition, VehicleType};

/// What the fence check reads for one evaluation
#[derive(Debug, Clone, Copy)]
pub struct FenceCheckInputs<'a> {
    pub vehicle_type: VehicleType,
    pub armed: bool,
    /// Position from the configured source, `None` until one arrives
    pub position: Option<&'a GlobalPosition>,
    pub local_position: Option<&'a LocalPosition>,
    pub home: &'a HomePosition,
    /// Bearing the fixed-wing position controller is tracking
    pub nav_bearing: Option<f32>,
    pub loiter_radius: f32,
    pub acceptance_radius: f32,
    pub cruising_speed: f32,
    pub cruising_throttle: f32,
}

/// Outcome of one executed check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FenceCheck {
    pub result: GeofenceResult,
    pub violation: ViolationType,
    /// Loiter setpoint for the reposition buffer
    pub reposition: Option<PositionSetpoint>,
}

#[derive(Debug, Default)]
pub struct GeofenceMonitor {
    last_check_us: Option<u64>,
    warning_sent: OneShot,
    result: GeofenceResult,
}

impl GeofenceMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn result(&self) -> &GeofenceResult {
        &self.result
    }

    /// Home is needed once any limit is relative to it or the reaction
    /// flies back to it
    pub fn home_required(params: &GeofenceParams) -> bool {
        params.max_hor_distance > 0.0
            || params.max_ver_distance > 0.0
            || params.action == GeofenceAction::ReturnToLaunch
    }

    /// Run the fence check if it is due. Returns `None` when skipped:
    /// no position yet, action disabled or within the check interval.
    pub fn check<G: Geofence>(
        &mut self,
        fence: &G,
        params: &GeofenceParams,
        inputs: &FenceCheckInputs<'_>,
        now_us: u64,
        events: &mut EventLog,
    ) -> Option<FenceCheck> {
        let position = inputs.position?;
        if params.action == GeofenceAction::None {
            return None;
        }
        if let Some(last) = self.last_check_us {
            if now_us.saturating_sub(last) <= GEOFENCE_CHECK_INTERVAL_US {
                return None;
            }
        }
        self.last_check_us = Some(now_us);

        let local = inputs.local_position.copied().unwrap_or_default();
        let state = BreachState {
            lat: position.lat,
            lon: position.lon,
            alt: position.alt,
            vx: local.vx,
            vy: local.vy,
            vz: local.vz,
        };

        let rotary = inputs.vehicle_type != VehicleType::FixedWing;
        let mut avoidance = if rotary {
            BreachAvoidance::for_multirotor(state, params)
        } else {
            BreachAvoidance::for_fixed_wing(state, inputs.loiter_radius, inputs.nav_bearing)
        };

        let warning = if params.predict {
            "Approaching on geofence"
        } else {
            avoidance = avoidance.without_prediction();
            "Geofence exceeded"
        };

        let violation = avoidance.evaluate(fence, inputs.home);

        self.result.timestamp = now_us;
        self.result.geofence_action = params.action;
        self.result.home_required = Self::home_required(params);
        self.result.dist_to_home_exceeded = violation.dist_to_home_exceeded;
        self.result.max_altitude_exceeded = violation.max_altitude_exceeded;
        self.result.fence_violation = violation.fence_violation;
        self.result.geofence_violated = violation.any();

        let mut reposition = None;
        if violation.any() {
            if inputs.armed && self.warning_sent.trigger() {
                events.push("navigator_geofence_violation", Severity::Warning, warning);

                if params.action == GeofenceAction::Loiter {
                    reposition = Some(loiter_setpoint(&avoidance, violation, fence, inputs, &local, now_us));
                }
            }
        } else {
            self.warning_sent.reset();
        }

        Some(FenceCheck {
            result: self.result,
            violation,
            reposition,
        })
    }
}

/// Whether a commanded target is acceptable to the fence. Only enforced
/// when the configured action would move the vehicle.
pub fn allows_position<G: Geofence>(
    fence: &G,
    params: &GeofenceParams,
    home: &HomePosition,
    lat: f64,
    lon: f64,
    alt: f32,
) -> bool {
    if !params.action.is_escape() || !lat.is_finite() || !lon.is_finite() {
        return true;
    }
    fence.is_inside_polygon_or_circle(lat, lon, alt)
        && fence.is_closer_than_max_dist_to_home(lat, lon, alt, home)
        && fence.is_below_max_altitude(alt, home)
}

fn loiter_setpoint<G: Geofence>(
    avoidance: &BreachAvoidance,
    violation: ViolationType,
    fence: &G,
    inputs: &FenceCheckInputs<'_>,
    local: &LocalPosition,
    now_us: u64,
) -> PositionSetpoint {
    let ((lat, lon), alt) = if inputs.vehicle_type == VehicleType::FixedWing {
        (
            avoidance.generate_loiter_point_fixed_wing(violation, fence.max_hor_dist_home(), inputs.home),
            avoidance.generate_loiter_altitude_fixed_wing(violation),
        )
    } else {
        (
            avoidance.generate_loiter_point_multirotor(violation, fence, inputs.home),
            avoidance.generate_loiter_altitude_multirotor(violation),
        )
    };

    PositionSetpoint {
        timestamp: now_us,
        yaw: local.heading,
        loiter_radius: inputs.loiter_radius,
        acceptance_radius: inputs.acceptance_radius,
        cruising_speed: inputs.cruising_speed,
        cruising_throttle: inputs.cruising_throttle,
        ..PositionSetpoint::at(SetpointType::Loiter, lat, lon, alt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::waypoint_from_heading_and_distance;

    const LAT: f64 = 47.397742;
    const LON: f64 = 8.545594;

    fn position() -> GlobalPosition {
        GlobalPosition {
            timestamp: 1,
            lat: LAT,
            lon: LON,
            alt: 500.0,
        }
    }

    fn moving_north(speed: f32) -> LocalPosition {
        LocalPosition {
            vx: speed,
            xy_valid: true,
            z_valid: true,
            v_xy_valid: true,
            v_z_valid: true,
            ..Default::default()
        }
    }

    fn fence_north_edge(north_m: f32) -> FenceSet {
        let (n_lat, _) = waypoint_from_heading_and_distance(LAT, LON, 0.0, north_m);
        let mut fence = FenceSet::new();
        fence
            .add_polygon(
                &[
                    Vertex { lat: LAT - 0.01, lon: LON - 0.01 },
                    Vertex { lat: LAT - 0.01, lon: LON + 0.01 },
                    Vertex { lat: n_lat, lon: LON + 0.01 },
                    Vertex { lat: n_lat, lon: LON - 0.01 },
                ],
                true,
            )
            .unwrap();
        fence
    }

    fn inputs<'a>(
        position: &'a GlobalPosition,
        local: &'a LocalPosition,
        home: &'a HomePosition,
    ) -> FenceCheckInputs<'a> {
        FenceCheckInputs {
            vehicle_type: VehicleType::RotaryWing,
            armed: true,
            position: Some(position),
            local_position: Some(local),
            home,
            nav_bearing: None,
            loiter_radius: 80.0,
            acceptance_radius: 10.0,
            cruising_speed: -1.0,
            cruising_throttle: f32::NAN,
        }
    }

    fn loiter_params() -> GeofenceParams {
        GeofenceParams {
            action: GeofenceAction::Loiter,
            ..Default::default()
        }
    }

    #[test]
    fn test_skipped_without_position_or_action() {
        let mut monitor = GeofenceMonitor::new();
        let mut events = EventLog::new();
        let fence = FenceSet::new();
        let (pos, local, home) = (position(), moving_north(0.0), HomePosition::default());

        let mut no_position = inputs(&pos, &local, &home);
        no_position.position = None;
        assert!(monitor
            .check(&fence, &loiter_params(), &no_position, 0, &mut events)
            .is_none());

        let disabled = GeofenceParams {
            action: GeofenceAction::None,
            ..Default::default()
        };
        assert!(monitor
            .check(&fence, &disabled, &inputs(&pos, &local, &home), 0, &mut events)
            .is_none());
    }

    #[test]
    fn test_check_interval() {
        let mut monitor = GeofenceMonitor::new();
        let mut events = EventLog::new();
        let fence = FenceSet::new();
        let (pos, local, home) = (position(), moving_north(0.0), HomePosition::default());
        let i = inputs(&pos, &local, &home);

        assert!(monitor.check(&fence, &loiter_params(), &i, 1_000_000, &mut events).is_some());
        assert!(monitor.check(&fence, &loiter_params(), &i, 1_100_000, &mut events).is_none());
        assert!(monitor.check(&fence, &loiter_params(), &i, 1_200_001, &mut events).is_some());
    }

    #[test]
    fn test_predicted_violation_warns_once_and_repositions_inside() {
        let mut monitor = GeofenceMonitor::new();
        let mut events = EventLog::new();
        let fence = fence_north_edge(40.0);
        let (pos, local, home) = (position(), moving_north(15.0), HomePosition::default());
        let i = inputs(&pos, &local, &home);

        let check = monitor
            .check(&fence, &loiter_params(), &i, 1_000_000, &mut events)
            .unwrap();
        assert!(check.result.geofence_violated);
        assert!(check.result.fence_violation);
        assert_eq!(check.result.geofence_action, GeofenceAction::Loiter);
        assert_eq!(events.count("navigator_geofence_violation"), 1);

        let sp = check.reposition.unwrap();
        assert!(sp.is_loiter());
        assert_eq!(sp.loiter_radius, 80.0);
        assert!(fence.is_inside_polygon_or_circle(sp.lat, sp.lon, sp.alt));

        // Latched until the violation clears
        let again = monitor
            .check(&fence, &loiter_params(), &i, 1_300_000, &mut events)
            .unwrap();
        assert!(again.result.geofence_violated);
        assert!(again.reposition.is_none());
        assert_eq!(events.count("navigator_geofence_violation"), 1);

        let stopped = moving_north(0.0);
        let clear = monitor
            .check(&fence, &loiter_params(), &inputs(&pos, &stopped, &home), 1_600_000, &mut events)
            .unwrap();
        assert!(!clear.result.geofence_violated);

        let _ = monitor.check(&fence, &loiter_params(), &i, 1_900_000, &mut events);
        assert_eq!(events.count("navigator_geofence_violation"), 2);
    }

    #[test]
    fn test_no_prediction_checks_current_position() {
        let mut monitor = GeofenceMonitor::new();
        let mut events = EventLog::new();
        let fence = fence_north_edge(40.0);
        let (pos, local, home) = (position(), moving_north(15.0), HomePosition::default());
        let params = GeofenceParams {
            predict: false,
            ..loiter_params()
        };

        let check = monitor
            .check(&fence, &params, &inputs(&pos, &local, &home), 1_000_000, &mut events)
            .unwrap();
        assert!(!check.result.geofence_violated);
    }

    #[test]
    fn test_disarmed_reports_without_warning() {
        let mut monitor = GeofenceMonitor::new();
        let mut events = EventLog::new();
        let fence = fence_north_edge(40.0);
        let (pos, local, home) = (position(), moving_north(15.0), HomePosition::default());
        let mut i = inputs(&pos, &local, &home);
        i.armed = false;

        let check = monitor
            .check(&fence, &loiter_params(), &i, 1_000_000, &mut events)
            .unwrap();
        assert!(check.result.geofence_violated);
        assert!(check.reposition.is_none());
        assert!(events.is_empty());
    }

    #[test]
    fn test_allows_position_only_for_escape_actions() {
        let fence = fence_north_edge(40.0);
        let home = HomePosition::default();
        let (outside_lat, _) = waypoint_from_heading_and_distance(LAT, LON, 0.0, 100.0);

        assert!(allows_position(&fence, &loiter_params(), &home, LAT, LON, 500.0));
        assert!(!allows_position(&fence, &loiter_params(), &home, outside_lat, LON, 500.0));

        let warn = GeofenceParams {
            action: GeofenceAction::Warn,
            ..Default::default()
        };
        assert!(allows_position(&fence, &warn, &home, outside_lat, LON, 500.0));
    }

    #[test]
    fn test_home_required() {
        assert!(!GeofenceMonitor::home_required(&GeofenceParams::default()));
        assert!(GeofenceMonitor::home_required(&GeofenceParams {
            max_hor_distance: 100.0,
            ..Default::default()
        }));
    }
}
