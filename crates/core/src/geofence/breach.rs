//! Breach prediction and escape-point generation
//!
//! Before the vehicle crosses the fence, a test point is projected along
//! its direction of travel at the distance it needs to stop. When the test
//! point violates the fence, a loiter point is generated that lies inside
//! the fence on the same line.

use libm::{atan2f, fabsf, sqrtf};

use crate::geo::{bearing_to_point, distance_to_point, waypoint_from_heading_and_distance};
use crate::parameters::GeofenceParams;
use crate::traits::Geofence;
use crate::vehicle::HomePosition;

/// Horizontal margin kept from the fence when generating a loiter point (m)
pub const MIN_HOR_DIST_TO_FENCE_MC: f32 = 5.0;
/// Vertical margin kept from the altitude ceiling (m)
pub const MIN_VER_DIST_TO_FENCE_MC: f32 = 2.0;
/// Vertical test distance for fixed wing (m)
pub const FW_VERTICAL_TEST_DISTANCE: f32 = 5.0;

const MIN_BRAKING_SPEED: f32 = 0.5;
const BINARY_SEARCH_RESOLUTION: f32 = 0.5;

/// Distance to stop from `velocity` under an acceleration limit. The
/// jerk-limited ramp up to full deceleration is flown at constant speed.
fn braking_distance(velocity: f32, accel: f32, jerk: f32) -> f32 {
    if velocity <= 0.0 || accel <= 0.0 {
        return 0.0;
    }
    let ramp_delay = if jerk > 0.0 { accel / jerk } else { 0.0 };
    velocity * (velocity / (2.0 * accel) + ramp_delay)
}

/// Which checks the test point failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViolationType {
    pub dist_to_home_exceeded: bool,
    pub max_altitude_exceeded: bool,
    pub fence_violation: bool,
}

impl ViolationType {
    pub fn any(&self) -> bool {
        self.dist_to_home_exceeded || self.max_altitude_exceeded || self.fence_violation
    }
}

/// Current kinematic state used for the prediction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreachState {
    pub lat: f64,
    pub lon: f64,
    pub alt: f32,
    /// North/east/down velocity (m/s)
    pub vx: f32,
    pub vy: f32,
    pub vz: f32,
}

/// Prediction for one fence check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreachAvoidance {
    pub state: BreachState,
    /// Direction of the test point (rad)
    pub test_point_bearing: f32,
    /// Horizontal distance of the test point (m)
    pub test_point_distance: f32,
    /// Altitude added to the current altitude for the ceiling check (m)
    pub vertical_test_point_distance: f32,
    pub multirotor_braking_distance: f32,
    pub multirotor_vertical_braking_distance: f32,
}

impl BreachAvoidance {
    /// Rotary-wing prediction from velocity and the braking model
    pub fn for_multirotor(state: BreachState, params: &GeofenceParams) -> Self {
        let speed_hor = sqrtf(state.vx * state.vx + state.vy * state.vy);
        let climb_rate = -state.vz;

        let hor = braking_distance(speed_hor, params.mc_acc_hor, params.mc_jerk);
        let ver = braking_distance(climb_rate, params.mc_acc_up, params.mc_jerk);

        Self {
            state,
            test_point_bearing: atan2f(state.vy, state.vx),
            test_point_distance: hor,
            vertical_test_point_distance: ver,
            multirotor_braking_distance: hor,
            multirotor_vertical_braking_distance: ver,
        }
    }

    /// Fixed-wing prediction: a fixed look-ahead of one loiter diameter.
    /// `nav_bearing` from the position controller takes precedence over
    /// the velocity direction.
    pub fn for_fixed_wing(state: BreachState, loiter_radius: f32, nav_bearing: Option<f32>) -> Self {
        let bearing = nav_bearing
            .filter(|b| b.is_finite())
            .unwrap_or_else(|| atan2f(state.vy, state.vx));
        Self {
            state,
            test_point_bearing: bearing,
            test_point_distance: 2.0 * loiter_radius,
            vertical_test_point_distance: FW_VERTICAL_TEST_DISTANCE,
            multirotor_braking_distance: 0.0,
            multirotor_vertical_braking_distance: 0.0,
        }
    }

    /// Check the current position instead of a projected point
    pub fn without_prediction(mut self) -> Self {
        self.test_point_distance = 0.0;
        self.vertical_test_point_distance = 0.0;
        self
    }

    pub fn test_point(&self) -> (f64, f64) {
        if self.test_point_distance <= 0.0 {
            return (self.state.lat, self.state.lon);
        }
        waypoint_from_heading_and_distance(
            self.state.lat,
            self.state.lon,
            self.test_point_bearing,
            self.test_point_distance,
        )
    }

    pub fn test_altitude(&self) -> f32 {
        self.state.alt + self.vertical_test_point_distance
    }

    pub fn evaluate<G: Geofence>(&self, fence: &G, home: &HomePosition) -> ViolationType {
        let (lat, lon) = self.test_point();
        let alt = self.state.alt;
        ViolationType {
            dist_to_home_exceeded: !fence.is_closer_than_max_dist_to_home(lat, lon, alt, home),
            max_altitude_exceeded: !fence.is_below_max_altitude(self.test_altitude(), home),
            fence_violation: !fence.is_inside_polygon_or_circle(lat, lon, alt),
        }
    }

    /// Point along the test bearing `distance_m` from home, clamped to
    /// the segment between home and the test point
    fn waypoint_from_home_towards_test_point(&self, home: &HomePosition, distance_m: f32) -> (f64, f64) {
        let (t_lat, t_lon) = self.test_point();
        let bearing = bearing_to_point(home.lat, home.lon, t_lat, t_lon);
        let max = distance_to_point(home.lat, home.lon, t_lat, t_lon);
        waypoint_from_heading_and_distance(home.lat, home.lon, bearing, distance_m.min(max))
    }

    /// Binary search for the distance along the test bearing at which the
    /// fence is first crossed
    fn distance_to_fence<G: Geofence>(&self, fence: &G) -> f32 {
        let mut min = 0.0_f32;
        let mut max = self.test_point_distance;
        let mut current = max / 2.0;

        while fabsf(max - min) > BINARY_SEARCH_RESOLUTION {
            let (lat, lon) = waypoint_from_heading_and_distance(
                self.state.lat,
                self.state.lon,
                self.test_point_bearing,
                current,
            );
            if fence.is_inside_polygon_or_circle(lat, lon, self.state.alt) {
                min = current;
            } else {
                max = current;
            }
            current = (min + max) / 2.0;
        }
        min
    }

    /// Loiter point for a rotary-wing vehicle: where it stops on the
    /// current track, pulled back to keep a margin from the fence
    pub fn generate_loiter_point_multirotor<G: Geofence>(
        &self,
        violation: ViolationType,
        fence: &G,
        home: &HomePosition,
    ) -> (f64, f64) {
        let current = (self.state.lat, self.state.lon);

        if violation.fence_violation {
            let to_fence = self.distance_to_fence(fence);
            let stop_at = to_fence - MIN_HOR_DIST_TO_FENCE_MC;
            let along = self.multirotor_braking_distance.min(stop_at);
            let (bearing, distance) = if along < 0.0 {
                (self.test_point_bearing + core::f32::consts::PI, -along)
            } else {
                (self.test_point_bearing, along)
            };
            return waypoint_from_heading_and_distance(
                self.state.lat,
                self.state.lon,
                bearing,
                distance,
            );
        }

        if violation.dist_to_home_exceeded && home.valid_hpos {
            let radius = (fence.max_hor_dist_home() - MIN_HOR_DIST_TO_FENCE_MC).max(0.0);
            return self.waypoint_from_home_towards_test_point(home, radius);
        }

        if self.multirotor_braking_distance > 0.0
            && self.test_point_distance > 0.0
            && sqrtf(self.state.vx * self.state.vx + self.state.vy * self.state.vy)
                > MIN_BRAKING_SPEED
        {
            return self.test_point();
        }
        current
    }

    pub fn generate_loiter_altitude_multirotor(&self, violation: ViolationType) -> f32 {
        if violation.max_altitude_exceeded {
            self.state.alt + self.multirotor_vertical_braking_distance - MIN_VER_DIST_TO_FENCE_MC
        } else {
            self.state.alt
        }
    }

    /// Loiter point for a fixed-wing vehicle: turn back along the track by
    /// one loiter diameter, or towards home when out of range
    pub fn generate_loiter_point_fixed_wing(
        &self,
        violation: ViolationType,
        fence_max_hor: f32,
        home: &HomePosition,
    ) -> (f64, f64) {
        if violation.fence_violation {
            return waypoint_from_heading_and_distance(
                self.state.lat,
                self.state.lon,
                self.test_point_bearing + core::f32::consts::PI,
                self.test_point_distance,
            );
        }
        if violation.dist_to_home_exceeded && home.valid_hpos {
            let radius = (fence_max_hor - self.test_point_distance).max(0.0);
            return self.waypoint_from_home_towards_test_point(home, radius);
        }
        (self.state.lat, self.state.lon)
    }

    pub fn generate_loiter_altitude_fixed_wing(&self, violation: ViolationType) -> f32 {
        if violation.max_altitude_exceeded {
            self.state.alt - 2.0 * self.vertical_test_point_distance
        } else {
            self.state.alt
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geofence::fence::{FenceSet, Vertex};

    const LAT: f64 = 47.397742;
    const LON: f64 = 8.545594;

    fn state(vx: f32, vy: f32, vz: f32) -> BreachState {
        BreachState {
            lat: LAT,
            lon: LON,
            alt: 500.0,
            vx,
            vy,
            vz,
        }
    }

    fn home() -> HomePosition {
        HomePosition {
            lat: LAT,
            lon: LON,
            alt: 488.0,
            valid_hpos: true,
            valid_alt: true,
            ..Default::default()
        }
    }

    /// Square inclusion fence with its north edge `north_m` ahead
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

    #[test]
    fn test_braking_distance_grows_with_speed() {
        let params = GeofenceParams::default();
        let slow = BreachAvoidance::for_multirotor(state(2.0, 0.0, 0.0), &params);
        let fast = BreachAvoidance::for_multirotor(state(10.0, 0.0, 0.0), &params);
        assert!(fast.test_point_distance > slow.test_point_distance);
        // 10 * (10 / 6 + 3 / 4)
        assert!((fast.test_point_distance - 24.167).abs() < 0.01);
        assert_eq!(fast.vertical_test_point_distance, 0.0);
    }

    #[test]
    fn test_climb_adds_vertical_distance() {
        let params = GeofenceParams::default();
        let avoidance = BreachAvoidance::for_multirotor(state(0.0, 0.0, -4.0), &params);
        assert!(avoidance.vertical_test_point_distance > 0.0);
        assert!(avoidance.test_altitude() > 500.0);
    }

    #[test]
    fn test_predicted_violation_before_crossing() {
        let params = GeofenceParams::default();
        let fence = fence_north_edge(20.0);
        let avoidance = BreachAvoidance::for_multirotor(state(10.0, 0.0, 0.0), &params);

        let violation = avoidance.evaluate(&fence, &home());
        assert!(violation.fence_violation);
        assert!(!violation.dist_to_home_exceeded);

        let current = avoidance.without_prediction().evaluate(&fence, &home());
        assert!(!current.any());
    }

    #[test]
    fn test_multirotor_loiter_point_inside_fence() {
        let params = GeofenceParams::default();
        let fence = fence_north_edge(60.0);
        let avoidance = BreachAvoidance::for_multirotor(state(18.0, 0.0, 0.0), &params);
        let violation = avoidance.evaluate(&fence, &home());
        assert!(violation.fence_violation);

        let (lat, lon) = avoidance.generate_loiter_point_multirotor(violation, &fence, &home());
        assert!(fence.is_inside_polygon_or_circle(lat, lon, 500.0));
        assert!(lat > LAT);
        let travelled = distance_to_point(LAT, LON, lat, lon);
        assert!(travelled <= 60.0 - MIN_HOR_DIST_TO_FENCE_MC + 0.5);
    }

    #[test]
    fn test_multirotor_too_close_backs_off() {
        let params = GeofenceParams::default();
        let fence = fence_north_edge(3.0);
        let avoidance = BreachAvoidance::for_multirotor(state(10.0, 0.0, 0.0), &params);
        let violation = avoidance.evaluate(&fence, &home());

        let (lat, lon) = avoidance.generate_loiter_point_multirotor(violation, &fence, &home());
        assert!(lat < LAT);
        assert!(fence.is_inside_polygon_or_circle(lat, lon, 500.0));
    }

    #[test]
    fn test_home_distance_loiter_point() {
        let params = GeofenceParams::default();
        let mut fence = FenceSet::new();
        fence.set_home_limits(100.0, 0.0);
        let (lat, lon) = waypoint_from_heading_and_distance(LAT, LON, 0.0, 95.0);
        let avoidance = BreachAvoidance::for_multirotor(
            BreachState { lat, lon, ..state(10.0, 0.0, 0.0) },
            &params,
        );

        let violation = avoidance.evaluate(&fence, &home());
        assert!(violation.dist_to_home_exceeded);
        let (l_lat, l_lon) = avoidance.generate_loiter_point_multirotor(violation, &fence, &home());
        let d = distance_to_point(LAT, LON, l_lat, l_lon);
        assert!((d - 95.0).abs() < 1.0);
    }

    #[test]
    fn test_fixed_wing_turns_back() {
        let fence = fence_north_edge(100.0);
        let avoidance = BreachAvoidance::for_fixed_wing(state(20.0, 0.0, 0.0), 80.0, None);
        assert_eq!(avoidance.test_point_distance, 160.0);

        let violation = avoidance.evaluate(&fence, &home());
        assert!(violation.fence_violation);
        let (lat, _) = avoidance.generate_loiter_point_fixed_wing(violation, 0.0, &home());
        assert!(lat < LAT);
    }

    #[test]
    fn test_loiter_altitude_below_ceiling() {
        let params = GeofenceParams::default();
        let mut fence = FenceSet::new();
        fence.set_home_limits(0.0, 13.0);
        let avoidance = BreachAvoidance::for_multirotor(state(0.0, 0.0, -3.0), &params);
        let violation = avoidance.evaluate(&fence, &home());
        assert!(violation.max_altitude_exceeded);

        let alt = avoidance.generate_loiter_altitude_multirotor(violation);
        assert!(alt < avoidance.test_altitude());
    }
}
