//! Landing behaviors
//!
//! [`LandBehavior`] descends at the current position. A fixed-wing VTOL
//! first requests the back transition. [`PrecisionLandBehavior`] lands on a
//! tracked landing target: it searches at a set height above home when no
//! target is visible and falls back to a normal landing once the search
//! times out.

use crate::events::Severity;
use crate::latch::EdgeDetector;
use crate::traits::secs_to_us;

use super::behavior::NavigationBehavior;
use super::context::{NavContext, NavShared};
use super::takeoff::{vtol_transition_command, VTOL_STATE_MC};
use super::triplet::{PositionSetpoint, PositionSetpointTriplet, SetpointType};

fn land_here(ctx: &NavContext<'_>, shared: &mut NavShared, lat: f64, lon: f64) {
    let current = PositionSetpoint {
        yaw: ctx.local.heading,
        ..shared.setpoint(ctx, SetpointType::Land, lat, lon, ctx.position.alt)
    };
    shared.set_triplet(
        ctx,
        PositionSetpointTriplet {
            timestamp: ctx.now_us,
            previous: PositionSetpoint::default(),
            current,
            next: PositionSetpoint::default(),
        },
    );
}

/// Idle and report done once touched down
fn check_touchdown(ctx: &NavContext<'_>, shared: &mut NavShared) -> bool {
    if !ctx.landed() {
        return false;
    }
    if shared.triplet.current.setpoint_type != SetpointType::Idle {
        let idle = shared.idle_setpoint(ctx);
        shared.set_current(ctx, idle);
    }
    shared.set_mission_finished(true);
    true
}

#[derive(Debug, Default)]
pub struct LandBehavior {
    activity: EdgeDetector,
}

impl LandBehavior {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NavigationBehavior for LandBehavior {
    fn activity(&mut self) -> &mut EdgeDetector {
        &mut self.activity
    }

    fn is_active(&self) -> bool {
        self.activity.previous()
    }

    fn on_activation(&mut self, ctx: &NavContext<'_>, shared: &mut NavShared) {
        if ctx.status.is_vtol && ctx.status.is_fixed_wing() {
            shared.outbox.push_command(vtol_transition_command(ctx, VTOL_STATE_MC));
        }
        land_here(ctx, shared, ctx.position.lat, ctx.position.lon);
        shared.set_mission_finished(false);
    }

    fn on_active(&mut self, ctx: &NavContext<'_>, shared: &mut NavShared) {
        // A reposition moves the touchdown point
        let rep = shared.reposition.current;
        if rep.valid {
            shared.reposition.reset();
            if rep.has_position() {
                land_here(ctx, shared, rep.lat, rep.lon);
            }
        }
        check_touchdown(ctx, shared);
    }
}

/// Phases of a precision landing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrecisionLandStage {
    #[default]
    Start,
    /// Descending onto the target
    DescendAboveTarget,
    /// Holding at search height waiting for a target
    Search,
    /// Target never found, landing at the current position
    Fallback,
    Done,
}

#[derive(Debug, Default)]
pub struct PrecisionLandBehavior {
    activity: EdgeDetector,
    stage: PrecisionLandStage,
    search_started_us: u64,
}

impl PrecisionLandBehavior {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> PrecisionLandStage {
        self.stage
    }

    fn start_search(&mut self, ctx: &NavContext<'_>, shared: &mut NavShared) {
        let alt = ctx.position.alt.max(ctx.home.alt + ctx.params.precland_search_alt);
        let hold = shared.setpoint(
            ctx,
            SetpointType::Position,
            ctx.position.lat,
            ctx.position.lon,
            alt,
        );
        shared.set_current(ctx, hold);
        self.search_started_us = ctx.now_us;
        self.stage = PrecisionLandStage::Search;
        shared.events.push(
            "navigator_precland_search",
            Severity::Info,
            "Searching for landing target",
        );
    }

    fn descend_on_target(&mut self, ctx: &NavContext<'_>, shared: &mut NavShared) -> bool {
        let Some(target) = ctx.landing_target else {
            return false;
        };
        let current = shared.triplet.current;
        let moved = current.setpoint_type != SetpointType::Land
            || current.lat != target.lat
            || current.lon != target.lon;
        if moved {
            land_here(ctx, shared, target.lat, target.lon);
        }
        self.stage = PrecisionLandStage::DescendAboveTarget;
        true
    }
}

impl NavigationBehavior for PrecisionLandBehavior {
    fn activity(&mut self) -> &mut EdgeDetector {
        &mut self.activity
    }

    fn is_active(&self) -> bool {
        self.activity.previous()
    }

    fn on_activation(&mut self, ctx: &NavContext<'_>, shared: &mut NavShared) {
        self.stage = PrecisionLandStage::Start;
        shared.set_mission_finished(false);
        if !self.descend_on_target(ctx, shared) {
            self.start_search(ctx, shared);
        }
    }

    fn on_active(&mut self, ctx: &NavContext<'_>, shared: &mut NavShared) {
        if check_touchdown(ctx, shared) {
            self.stage = PrecisionLandStage::Done;
            return;
        }

        match self.stage {
            PrecisionLandStage::Start | PrecisionLandStage::Search => {
                if self.descend_on_target(ctx, shared) {
                    return;
                }
                if self.stage == PrecisionLandStage::Start {
                    self.start_search(ctx, shared);
                    return;
                }
                let timeout = secs_to_us(ctx.params.precland_search_timeout_s);
                if ctx.now_us.saturating_sub(self.search_started_us) > timeout {
                    land_here(ctx, shared, ctx.position.lat, ctx.position.lon);
                    self.stage = PrecisionLandStage::Fallback;
                    shared.events.push(
                        "navigator_precland_fallback",
                        Severity::Warning,
                        "Landing target not found, landing",
                    );
                }
            }
            PrecisionLandStage::DescendAboveTarget => {
                // A lost target keeps the last touchdown point
                let _ = self.descend_on_target(ctx, shared);
            }
            PrecisionLandStage::Fallback | PrecisionLandStage::Done => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::opcode;
    use crate::navigator::context::fixtures::*;
    use crate::navigator::context::LandingTarget;
    use crate::vehicle::VehicleType;

    #[test]
    fn test_land_descends_here_and_idles() {
        let mut world = World::flying();
        let mut land = LandBehavior::new();
        let mut shared = NavShared::new();

        land.run(true, &world.ctx(), &mut shared);
        assert_eq!(shared.triplet.current.setpoint_type, SetpointType::Land);
        assert_eq!(shared.triplet.current.lat, LAT);
        assert_eq!(shared.outbox.command_count(opcode::DO_VTOL_TRANSITION), 0);

        world.land.landed = true;
        land.run(true, &world.ctx(), &mut shared);
        assert_eq!(shared.triplet.current.setpoint_type, SetpointType::Idle);
        assert!(shared.mission_result.finished);
    }

    #[test]
    fn test_vtol_back_transition_before_landing() {
        let mut world = World::flying();
        world.status.is_vtol = true;
        world.status.vehicle_type = VehicleType::FixedWing;
        let mut shared = NavShared::new();
        LandBehavior::new().run(true, &world.ctx(), &mut shared);
        assert_eq!(shared.outbox.command_count(opcode::DO_VTOL_TRANSITION), 1);
    }

    #[test]
    fn test_precision_land_on_target() {
        let mut world = World::flying();
        world.landing_target = Some(LandingTarget {
            timestamp: 1,
            lat: LAT + 0.0001,
            lon: LON,
        });
        let mut precland = PrecisionLandBehavior::new();
        let mut shared = NavShared::new();

        precland.run(true, &world.ctx(), &mut shared);
        assert_eq!(precland.stage(), PrecisionLandStage::DescendAboveTarget);
        assert_eq!(shared.triplet.current.lat, LAT + 0.0001);

        // Target lost: keep descending on the last estimate
        world.landing_target = None;
        precland.run(true, &world.ctx(), &mut shared);
        assert_eq!(shared.triplet.current.setpoint_type, SetpointType::Land);
        assert_eq!(shared.triplet.current.lat, LAT + 0.0001);
    }

    #[test]
    fn test_precision_land_search_falls_back() {
        let mut world = World::flying();
        let mut precland = PrecisionLandBehavior::new();
        let mut shared = NavShared::new();

        precland.run(true, &world.ctx(), &mut shared);
        assert_eq!(precland.stage(), PrecisionLandStage::Search);
        assert!(shared.events.contains("navigator_precland_search"));

        world.now_us += 5_000_000;
        precland.run(true, &world.ctx(), &mut shared);
        assert_eq!(precland.stage(), PrecisionLandStage::Search);

        world.now_us += 6_000_000;
        precland.run(true, &world.ctx(), &mut shared);
        assert_eq!(precland.stage(), PrecisionLandStage::Fallback);
        assert_eq!(shared.triplet.current.setpoint_type, SetpointType::Land);
        assert_eq!(shared.events.count("navigator_precland_fallback"), 1);
    }
}
