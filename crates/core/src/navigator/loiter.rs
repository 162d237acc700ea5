//! Loiter behavior
//!
//! Holds position. Entering it keeps an established loiter setpoint,
//! otherwise it stops where the vehicle can brake to. A pending reposition
//! (DO_REPOSITION, fixed-wing DO_ORBIT or a geofence escape point) is
//! applied whenever one arrives.

use crate::geofence::{BreachAvoidance, BreachState};
use crate::latch::EdgeDetector;

use super::behavior::NavigationBehavior;
use super::context::{NavContext, NavShared};
use super::triplet::{PositionSetpoint, PositionSetpointTriplet, SetpointType};

/// Where a rotary-wing vehicle comes to rest from its current velocity
pub fn braking_stop_point(ctx: &NavContext<'_>) -> (f64, f64) {
    let state = BreachState {
        lat: ctx.position.lat,
        lon: ctx.position.lon,
        alt: ctx.position.alt,
        vx: ctx.local.vx,
        vy: ctx.local.vy,
        vz: ctx.local.vz,
    };
    BreachAvoidance::for_multirotor(state, ctx.geofence_params).test_point()
}

#[derive(Debug, Default)]
pub struct LoiterBehavior {
    activity: EdgeDetector,
}

impl LoiterBehavior {
    pub fn new() -> Self {
        Self::default()
    }

    fn set_loiter_position(&mut self, ctx: &NavContext<'_>, shared: &mut NavShared) {
        if ctx.landed() {
            let idle = shared.idle_setpoint(ctx);
            shared.set_current(ctx, idle);
            return;
        }

        let current = shared.triplet.current;
        if current.is_loiter() && current.has_position() {
            return;
        }

        let (lat, lon) = if ctx.status.is_rotary_wing() && current.setpoint_type != SetpointType::Takeoff {
            braking_stop_point(ctx)
        } else {
            (ctx.position.lat, ctx.position.lon)
        };
        let hold = PositionSetpoint {
            yaw: ctx.local.heading,
            ..shared.setpoint(ctx, SetpointType::Loiter, lat, lon, ctx.position.alt)
        };
        shared.set_current(ctx, hold);
    }

    fn reposition(&mut self, ctx: &NavContext<'_>, shared: &mut NavShared) {
        let rep = shared.reposition;
        shared.reposition.reset();

        // A reposition is only flown while armed
        if !ctx.is_armed() || !rep.current.has_position() {
            return;
        }

        let previous = if rep.previous.has_position() {
            PositionSetpoint {
                valid: true,
                setpoint_type: SetpointType::Position,
                ..rep.previous
            }
        } else {
            shared.triplet.current
        };
        let current = PositionSetpoint {
            valid: true,
            setpoint_type: SetpointType::Loiter,
            timestamp: ctx.now_us,
            ..rep.current
        };
        shared.set_triplet(
            ctx,
            PositionSetpointTriplet {
                timestamp: ctx.now_us,
                previous,
                current,
                next: PositionSetpoint::default(),
            },
        );
    }
}

impl NavigationBehavior for LoiterBehavior {
    fn activity(&mut self) -> &mut EdgeDetector {
        &mut self.activity
    }

    fn is_active(&self) -> bool {
        self.activity.previous()
    }

    fn on_activation(&mut self, ctx: &NavContext<'_>, shared: &mut NavShared) {
        if shared.reposition.current.valid {
            self.reposition(ctx, shared);
        } else {
            self.set_loiter_position(ctx, shared);
        }
    }

    fn on_active(&mut self, ctx: &NavContext<'_>, shared: &mut NavShared) {
        if shared.reposition.current.valid {
            self.reposition(ctx, shared);
        }
        if ctx.landed() && shared.triplet.current.setpoint_type != SetpointType::Idle {
            let idle = shared.idle_setpoint(ctx);
            shared.set_current(ctx, idle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigator::context::fixtures::*;

    #[test]
    fn test_rotary_wing_stops_ahead() {
        let mut world = World::flying();
        world.local.vx = 10.0;
        let mut loiter = LoiterBehavior::new();
        let mut shared = NavShared::new();

        loiter.run(true, &world.ctx(), &mut shared);
        let sp = shared.triplet.current;
        assert!(sp.is_loiter());
        assert!(sp.lat > LAT);
        assert_eq!(sp.alt, world.position.alt);
        assert!(shared.triplet_updated);
    }

    #[test]
    fn test_keeps_established_loiter() {
        let world = World::flying();
        let ctx = world.ctx();
        let mut shared = NavShared::new();
        let established = shared.setpoint(&ctx, SetpointType::Loiter, LAT + 0.01, LON, 600.0);
        shared.triplet.current = established;

        let mut loiter = LoiterBehavior::new();
        loiter.run(true, &ctx, &mut shared);
        assert_eq!(shared.triplet.current, established);
        assert!(!shared.triplet_updated);
    }

    #[test]
    fn test_applies_reposition_while_armed() {
        let mut world = World::flying();
        let mut loiter = LoiterBehavior::new();
        let mut shared = NavShared::new();
        loiter.run(true, &world.ctx(), &mut shared);

        shared.reposition.current = PositionSetpoint::at(SetpointType::Loiter, LAT + 0.002, LON, 550.0);
        loiter.run(true, &world.ctx(), &mut shared);
        assert_eq!(shared.triplet.current.lat, LAT + 0.002);
        assert!(!shared.reposition.current.valid);

        world.status.arming_state = crate::vehicle::ArmingState::Standby;
        shared.reposition.current = PositionSetpoint::at(SetpointType::Loiter, LAT + 0.005, LON, 550.0);
        loiter.run(true, &world.ctx(), &mut shared);
        assert_eq!(shared.triplet.current.lat, LAT + 0.002);
        assert!(!shared.reposition.current.valid);
    }

    #[test]
    fn test_idle_when_landed() {
        let mut world = World::flying();
        world.land.landed = true;
        let mut loiter = LoiterBehavior::new();
        let mut shared = NavShared::new();
        loiter.run(true, &world.ctx(), &mut shared);
        assert_eq!(shared.triplet.current.setpoint_type, SetpointType::Idle);
    }
}
