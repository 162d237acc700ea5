//! Return behavior
//!
//! Climbs to the return altitude, flies to the destination, descends to
//! the descend altitude and lands. The destination is home, or the start
//! of the mission landing sequence when the return policy asks for it. In
//! the latter case the dispatcher hands over to the mission behavior once
//! the vehicle arrived there.

use crate::failsafe::RtlType;
use crate::geo::{bearing_to_point, distance_to_point};
use crate::latch::EdgeDetector;
use crate::mission::MissionPlan;

use super::behavior::NavigationBehavior;
use super::context::{NavContext, NavShared};
use super::triplet::{PositionSetpoint, SetpointType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum RtlStage {
    #[default]
    Climb,
    Return,
    Descend,
    Land,
    Landed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RtlDestination {
    #[default]
    Home,
    MissionLanding,
}

/// First position item of the landing sequence
fn mission_landing_location(plan: &MissionPlan, home_alt: f32) -> Option<(f64, f64, f32)> {
    let start = plan.land_start_index()?;
    let index = plan.next_position_item(start, true)?;
    let item = plan.get(index)?;
    Some((item.latitude(), item.longitude(), item.altitude_amsl(home_alt)))
}

#[derive(Debug, Default)]
pub struct RtlBehavior {
    activity: EdgeDetector,
    stage: RtlStage,
    destination: RtlDestination,
    dest_lat: f64,
    dest_lon: f64,
    dest_alt: f32,
    return_alt: f32,
    /// Return at the current altitude (traffic avoidance)
    return_alt_min: bool,
}

impl RtlBehavior {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> RtlStage {
        self.stage
    }

    pub fn destination(&self) -> RtlDestination {
        self.destination
    }

    pub fn set_return_alt_min(&mut self, min: bool) {
        self.return_alt_min = min;
    }

    /// Arrived at the mission landing sequence, the mission behavior takes over
    pub fn should_engage_mission_for_landing(&self) -> bool {
        self.destination == RtlDestination::MissionLanding && self.stage > RtlStage::Return
    }

    fn choose_destination(&mut self, ctx: &NavContext<'_>) {
        let home = (ctx.home.lat, ctx.home.lon, ctx.home.alt);
        let landing = mission_landing_location(ctx.plan, ctx.home.alt);

        let (destination, (lat, lon, alt)) = match (ctx.params.rtl_type, landing) {
            (RtlType::MissionLanding, Some(landing)) => (RtlDestination::MissionLanding, landing),
            (RtlType::Closest, Some(landing)) => {
                let to_home = ctx.distance_to(home.0, home.1);
                let to_landing = ctx.distance_to(landing.0, landing.1);
                if to_landing < to_home {
                    (RtlDestination::MissionLanding, landing)
                } else {
                    (RtlDestination::Home, home)
                }
            }
            _ => (RtlDestination::Home, home),
        };
        self.destination = destination;
        self.dest_lat = lat;
        self.dest_lon = lon;
        self.dest_alt = alt;
    }

    fn stage_setpoint(&self, ctx: &NavContext<'_>, shared: &NavShared) -> PositionSetpoint {
        match self.stage {
            RtlStage::Climb => shared.setpoint(
                ctx,
                SetpointType::Position,
                ctx.position.lat,
                ctx.position.lon,
                self.return_alt,
            ),
            RtlStage::Return => PositionSetpoint {
                yaw: bearing_to_point(ctx.position.lat, ctx.position.lon, self.dest_lat, self.dest_lon),
                ..shared.setpoint(ctx, SetpointType::Position, self.dest_lat, self.dest_lon, self.return_alt)
            },
            RtlStage::Descend => {
                let alt = (self.dest_alt + ctx.params.rtl_descend_alt).min(self.return_alt);
                shared.setpoint(ctx, SetpointType::Loiter, self.dest_lat, self.dest_lon, alt)
            }
            RtlStage::Land => PositionSetpoint {
                yaw: ctx.home.yaw,
                ..shared.setpoint(ctx, SetpointType::Land, self.dest_lat, self.dest_lon, self.dest_alt)
            },
            RtlStage::Landed => shared.idle_setpoint(ctx),
        }
    }

    fn stage_complete(&self, ctx: &NavContext<'_>, sp: &PositionSetpoint) -> bool {
        match self.stage {
            RtlStage::Climb => ctx.position.alt >= sp.alt - ctx.altitude_acceptance_radius(sp),
            RtlStage::Return => {
                distance_to_point(ctx.position.lat, ctx.position.lon, self.dest_lat, self.dest_lon)
                    <= ctx.acceptance_radius()
            }
            RtlStage::Descend => ctx.altitude_reached(sp),
            RtlStage::Land => ctx.landed(),
            RtlStage::Landed => false,
        }
    }

    fn enter(&mut self, stage: RtlStage, ctx: &NavContext<'_>, shared: &mut NavShared) {
        self.stage = stage;
        let sp = self.stage_setpoint(ctx, shared);
        shared.set_current(ctx, sp);
    }
}

impl NavigationBehavior for RtlBehavior {
    fn activity(&mut self) -> &mut EdgeDetector {
        &mut self.activity
    }

    fn is_active(&self) -> bool {
        self.activity.previous()
    }

    fn on_activation(&mut self, ctx: &NavContext<'_>, shared: &mut NavShared) {
        self.choose_destination(ctx);

        if ctx.landed() {
            self.enter(RtlStage::Landed, ctx, shared);
            return;
        }

        self.return_alt = if self.return_alt_min {
            ctx.position.alt
        } else {
            ctx.position.alt.max(self.dest_alt + ctx.params.rtl_return_alt)
        };

        let close = ctx.distance_to(self.dest_lat, self.dest_lon) <= ctx.acceptance_radius();
        let first = if close { RtlStage::Descend } else { RtlStage::Climb };
        self.enter(first, ctx, shared);
    }

    fn on_active(&mut self, ctx: &NavContext<'_>, shared: &mut NavShared) {
        if ctx.landed() && self.stage != RtlStage::Landed {
            self.enter(RtlStage::Landed, ctx, shared);
            return;
        }

        let sp = shared.triplet.current;
        if !self.stage_complete(ctx, &sp) {
            return;
        }
        let next = match self.stage {
            RtlStage::Climb => RtlStage::Return,
            RtlStage::Return => RtlStage::Descend,
            RtlStage::Descend => RtlStage::Land,
            RtlStage::Land | RtlStage::Landed => RtlStage::Landed,
        };
        if next != self.stage {
            self.enter(next, ctx, shared);
        }
    }

    fn on_inactivation(&mut self, _ctx: &NavContext<'_>, _shared: &mut NavShared) {
        self.return_alt_min = false;
    }
}
