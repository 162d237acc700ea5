//! Takeoff behaviors
//!
//! [`TakeoffBehavior`] climbs to the takeoff altitude and then turns its
//! setpoint into a loiter at that altitude, which the loiter behavior keeps
//! when the commander hands over. [`VtolTakeoffBehavior`] climbs vertically
//! to the transition altitude, transitions to forward flight and then
//! establishes a loiter at the requested location.

use crate::command::{opcode, VehicleCommand};
use crate::events::Severity;
use crate::latch::EdgeDetector;

use super::behavior::NavigationBehavior;
use super::context::{NavContext, NavShared, VtolTakeoffRequest};
use super::triplet::{PositionSetpoint, PositionSetpointTriplet, SetpointType};

/// DO_VTOL_TRANSITION target state for hover
pub const VTOL_STATE_MC: f32 = 3.0;
/// DO_VTOL_TRANSITION target state for forward flight
pub const VTOL_STATE_FW: f32 = 4.0;

/// Internal DO_VTOL_TRANSITION addressed to ourselves
pub(super) fn vtol_transition_command(ctx: &NavContext<'_>, state: f32) -> VehicleCommand {
    let mut cmd = VehicleCommand::new(opcode::DO_VTOL_TRANSITION);
    cmd.timestamp = ctx.now_us;
    cmd.param1 = state;
    cmd.target_system = ctx.status.system_id;
    cmd.target_component = ctx.status.component_id;
    cmd.source_system = ctx.status.system_id;
    cmd.source_component = ctx.status.component_id;
    cmd
}

#[derive(Debug, Default)]
pub struct TakeoffBehavior {
    activity: EdgeDetector,
    complete: bool,
}

impl TakeoffBehavior {
    pub fn new() -> Self {
        Self::default()
    }

    fn set_takeoff_position(&mut self, ctx: &NavContext<'_>, shared: &mut NavShared) {
        let request = shared.takeoff.current;
        shared.takeoff.reset();
        self.complete = false;

        let min_alt = ctx.home.alt + ctx.params.takeoff_alt;
        let mut alt = if request.valid && request.alt.is_finite() {
            request.alt
        } else {
            min_alt
        };
        if alt < ctx.position.alt {
            alt = ctx.position.alt;
            shared.events.push(
                "navigator_takeoff_already_higher",
                Severity::Info,
                "Already higher than takeoff altitude",
            );
        }

        let (lat, lon) = if request.has_position() {
            (request.lat, request.lon)
        } else {
            (ctx.position.lat, ctx.position.lon)
        };
        let yaw = if request.valid && request.yaw.is_finite() {
            request.yaw
        } else {
            ctx.local.heading
        };

        let current = PositionSetpoint {
            yaw,
            ..shared.setpoint(ctx, SetpointType::Takeoff, lat, lon, alt)
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
        shared.set_mission_finished(false);
    }
}

impl NavigationBehavior for TakeoffBehavior {
    fn activity(&mut self) -> &mut EdgeDetector {
        &mut self.activity
    }

    fn is_active(&self) -> bool {
        self.activity.previous()
    }

    fn on_activation(&mut self, ctx: &NavContext<'_>, shared: &mut NavShared) {
        self.set_takeoff_position(ctx, shared);
    }

    fn on_active(&mut self, ctx: &NavContext<'_>, shared: &mut NavShared) {
        if shared.takeoff.current.valid {
            // New NAV_TAKEOFF while climbing
            self.set_takeoff_position(ctx, shared);
            return;
        }
        if self.complete {
            return;
        }

        let sp = shared.triplet.current;
        if ctx.landed() || ctx.position.alt < sp.alt - ctx.altitude_acceptance_radius(&sp) {
            return;
        }

        self.complete = true;
        let hold = PositionSetpoint {
            yaw: sp.yaw,
            ..shared.setpoint(ctx, SetpointType::Loiter, sp.lat, sp.lon, sp.alt)
        };
        shared.set_current(ctx, hold);
        shared.set_mission_finished(true);
    }
}

/// Phases of a VTOL takeoff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VtolTakeoffStage {
    #[default]
    Climb,
    Transition,
    Loiter,
}

#[derive(Debug, Default)]
pub struct VtolTakeoffBehavior {
    activity: EdgeDetector,
    stage: VtolTakeoffStage,
    transition_alt: f32,
    loiter_lat: f64,
    loiter_lon: f64,
    loiter_alt: f32,
}

impl VtolTakeoffBehavior {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> VtolTakeoffStage {
        self.stage
    }

    fn plan(&mut self, ctx: &NavContext<'_>, request: &VtolTakeoffRequest) {
        let default_alt = ctx.home.alt + ctx.params.vtol_loiter_alt;
        self.transition_alt = if request.transition_alt.is_finite() {
            request.transition_alt
        } else {
            default_alt
        };
        (self.loiter_lat, self.loiter_lon) =
            if request.loiter_lat.is_finite() && request.loiter_lon.is_finite() {
                (request.loiter_lat, request.loiter_lon)
            } else {
                (ctx.position.lat, ctx.position.lon)
            };
        self.loiter_alt = if request.loiter_height.is_finite() && request.loiter_height > 0.0 {
            ctx.home.alt + request.loiter_height
        } else {
            default_alt
        };
    }
}

impl NavigationBehavior for VtolTakeoffBehavior {
    fn activity(&mut self) -> &mut EdgeDetector {
        &mut self.activity
    }

    fn is_active(&self) -> bool {
        self.activity.previous()
    }

    fn on_activation(&mut self, ctx: &NavContext<'_>, shared: &mut NavShared) {
        let request = shared.vtol_takeoff;
        self.plan(ctx, &request);
        self.stage = VtolTakeoffStage::Climb;

        let climb = PositionSetpoint {
            yaw: ctx.local.heading,
            ..shared.setpoint(
                ctx,
                SetpointType::Takeoff,
                ctx.position.lat,
                ctx.position.lon,
                self.transition_alt.max(ctx.position.alt),
            )
        };
        shared.set_current(ctx, climb);
        shared.set_mission_finished(false);
    }

    fn on_active(&mut self, ctx: &NavContext<'_>, shared: &mut NavShared) {
        match self.stage {
            VtolTakeoffStage::Climb => {
                let sp = shared.triplet.current;
                if ctx.position.alt >= sp.alt - ctx.altitude_acceptance_radius(&sp) {
                    shared.outbox.push_command(vtol_transition_command(ctx, VTOL_STATE_FW));
                    let toward = shared.setpoint(
                        ctx,
                        SetpointType::Position,
                        self.loiter_lat,
                        self.loiter_lon,
                        sp.alt,
                    );
                    shared.set_current(ctx, toward);
                    self.stage = VtolTakeoffStage::Transition;
                }
            }
            VtolTakeoffStage::Transition => {
                if ctx.status.is_fixed_wing() && !ctx.status.in_transition_mode {
                    let hold = shared.setpoint(
                        ctx,
                        SetpointType::Loiter,
                        self.loiter_lat,
                        self.loiter_lon,
                        self.loiter_alt,
                    );
                    shared.set_current(ctx, hold);
                    shared.set_mission_finished(true);
                    self.stage = VtolTakeoffStage::Loiter;
                }
            }
            VtolTakeoffStage::Loiter => {}
        }
    }

    fn on_inactivation(&mut self, _ctx: &NavContext<'_>, shared: &mut NavShared) {
        shared.vtol_takeoff = VtolTakeoffRequest::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigator::context::fixtures::*;
    use crate::vehicle::VehicleType;

    #[test]
    fn test_takeoff_climbs_then_loiters() {
        let mut world = World::flying();
        world.position.alt = HOME_ALT;
        let mut takeoff = TakeoffBehavior::new();
        let mut shared = NavShared::new();

        takeoff.run(true, &world.ctx(), &mut shared);
        let sp = shared.triplet.current;
        assert_eq!(sp.setpoint_type, SetpointType::Takeoff);
        assert_eq!(sp.alt, HOME_ALT + 2.5);
        assert!(!shared.mission_result.finished);

        world.position.alt = HOME_ALT + 1.0;
        takeoff.run(true, &world.ctx(), &mut shared);
        assert!(!shared.mission_result.finished);

        world.position.alt = HOME_ALT + 2.4;
        takeoff.run(true, &world.ctx(), &mut shared);
        assert!(shared.triplet.current.is_loiter());
        assert_eq!(shared.triplet.current.alt, HOME_ALT + 2.5);
        assert!(shared.mission_result.finished);
    }

    #[test]
    fn test_takeoff_uses_command_target() {
        let mut world = World::flying();
        world.position.alt = HOME_ALT;
        let mut shared = NavShared::new();
        shared.takeoff.current = PositionSetpoint::at(SetpointType::Takeoff, f64::NAN, f64::NAN, HOME_ALT + 30.0);

        let mut takeoff = TakeoffBehavior::new();
        takeoff.run(true, &world.ctx(), &mut shared);
        assert_eq!(shared.triplet.current.alt, HOME_ALT + 30.0);
        assert_eq!(shared.triplet.current.lat, LAT);
        assert!(!shared.takeoff.current.valid);
    }

    #[test]
    fn test_takeoff_already_higher() {
        let world = World::flying();
        let mut shared = NavShared::new();
        let mut takeoff = TakeoffBehavior::new();
        takeoff.run(true, &world.ctx(), &mut shared);
        assert_eq!(shared.triplet.current.alt, world.position.alt);
        assert!(shared.events.contains("navigator_takeoff_already_higher"));
    }

    #[test]
    fn test_vtol_takeoff_stages() {
        let mut world = World::flying();
        world.position.alt = HOME_ALT;
        world.status.is_vtol = true;
        let mut shared = NavShared::new();
        shared.vtol_takeoff = VtolTakeoffRequest {
            transition_alt: HOME_ALT + 40.0,
            loiter_lat: LAT + 0.01,
            loiter_lon: LON,
            loiter_height: 100.0,
        };

        let mut vtol = VtolTakeoffBehavior::new();
        vtol.run(true, &world.ctx(), &mut shared);
        assert_eq!(vtol.stage(), VtolTakeoffStage::Climb);
        assert_eq!(shared.triplet.current.alt, HOME_ALT + 40.0);

        world.position.alt = HOME_ALT + 40.0;
        vtol.run(true, &world.ctx(), &mut shared);
        assert_eq!(vtol.stage(), VtolTakeoffStage::Transition);
        assert_eq!(shared.outbox.command_count(opcode::DO_VTOL_TRANSITION), 1);

        // Still hovering: no loiter yet
        vtol.run(true, &world.ctx(), &mut shared);
        assert_eq!(vtol.stage(), VtolTakeoffStage::Transition);

        world.status.vehicle_type = VehicleType::FixedWing;
        vtol.run(true, &world.ctx(), &mut shared);
        assert_eq!(vtol.stage(), VtolTakeoffStage::Loiter);
        let sp = shared.triplet.current;
        assert!(sp.is_loiter());
        assert_eq!(sp.lat, LAT + 0.01);
        assert_eq!(sp.alt, HOME_ALT + 100.0);
        assert!(shared.mission_result.finished);
    }
}
