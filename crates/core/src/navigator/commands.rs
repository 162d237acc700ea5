//! Vehicle commands handled on the navigator side
//!
//! Most of these only fill a buffer that a behavior consumes later:
//! DO_REPOSITION and fixed-wing DO_ORBIT fill the reposition triplet,
//! NAV_TAKEOFF the takeoff triplet and NAV_VTOL_TAKEOFF the VTOL request.
//! The mode switch that makes the behavior run is the commander's job, and
//! so is the acknowledgment of those commands.

use crate::command::{opcode, CommandAck, CommandResult, VehicleCommand};
use crate::events::Severity;
use crate::geofence;
use crate::traits::Geofence;
use crate::vehicle::{NavState, VehicleType};

use super::context::{NavContext, NavShared, RoiMode, VehicleRoi};
use super::loiter::braking_stop_point;
use super::mission::MissionBehavior;
use super::triplet::{PositionSetpoint, SetpointType};

/// Below this DO_CHANGE_SPEED treats a value as unset
const SPEED_EPSILON: f32 = f32::EPSILON;

/// Dispatch one command. `fence_ready` is false until the position source
/// the fence uses has delivered data.
pub fn handle_command<G: Geofence>(
    cmd: &VehicleCommand,
    ctx: &NavContext<'_>,
    fence: &G,
    fence_ready: bool,
    mission: &mut MissionBehavior,
    shared: &mut NavShared,
) {
    match cmd.command {
        opcode::DO_GO_AROUND => accept(cmd, ctx, shared),
        opcode::DO_REPOSITION if ctx.is_armed() => reposition(cmd, ctx, fence, fence_ready, shared),
        opcode::DO_ORBIT if ctx.status.vehicle_type == VehicleType::FixedWing => {
            orbit(cmd, ctx, fence, fence_ready, shared)
        }
        opcode::NAV_TAKEOFF => takeoff(cmd, ctx, shared),
        opcode::NAV_VTOL_TAKEOFF => {
            shared.vtol_takeoff.transition_alt = cmd.param7;
            shared.vtol_takeoff.loiter_lat = cmd.param5;
            shared.vtol_takeoff.loiter_lon = cmd.param6;
            shared.vtol_takeoff.loiter_height = cmd.param1;
        }
        opcode::DO_LAND_START => {
            match ctx.plan.land_start_index() {
                Some(index) => {
                    let mut start = VehicleCommand::new(opcode::MISSION_START);
                    start.timestamp = ctx.now_us;
                    start.param1 = f32::from(index);
                    start.target_system = ctx.status.system_id;
                    start.target_component = ctx.status.component_id;
                    start.source_system = ctx.status.system_id;
                    start.source_component = ctx.status.component_id;
                    shared.outbox.push_command(start);
                }
                None => shared.events.push(
                    "navigator_land_start_unavailable",
                    Severity::Warning,
                    "Planned mission landing not available",
                ),
            }
            accept(cmd, ctx, shared);
        }
        opcode::MISSION_START => {
            if shared.mission_result.valid
                && cmd.param1.is_finite()
                && cmd.param1 >= 0.0
                && !mission.set_current_index(cmd.param1 as u16, ctx.plan)
            {
                shared.events.push(
                    "navigator_mission_start_failed",
                    Severity::Warning,
                    "Mission start index invalid",
                );
            }
        }
        opcode::DO_CHANGE_SPEED => {
            change_speed(cmd, ctx, shared);
            accept(cmd, ctx, shared);
        }
        opcode::DO_SET_ROI
        | opcode::NAV_ROI
        | opcode::DO_SET_ROI_LOCATION
        | opcode::DO_SET_ROI_WPNEXT_OFFSET
        | opcode::DO_SET_ROI_NONE => {
            shared.roi = roi_from_command(cmd, ctx.now_us);
            shared.roi_updated = true;
            accept(cmd, ctx, shared);
        }
        opcode::DO_VTOL_TRANSITION if ctx.status.nav_state != NavState::AutoVtolTakeoff => {
            // Cruise values are per flight mode, the new one starts at its defaults
            shared.cruise.reset_speed();
            shared.cruise.reset_throttle();
            shared.reposition = shared.triplet;
            shared.reposition.current.cruising_speed = shared.cruising_speed(ctx);
            shared.reposition.current.cruising_throttle = shared.cruising_throttle();
        }
        _ => {}
    }
}

fn accept(cmd: &VehicleCommand, ctx: &NavContext<'_>, shared: &mut NavShared) {
    shared
        .outbox
        .push_ack(CommandAck::for_command(cmd, CommandResult::Accepted, ctx.now_us));
}

fn reposition<G: Geofence>(
    cmd: &VehicleCommand,
    ctx: &NavContext<'_>,
    fence: &G,
    fence_ready: bool,
    shared: &mut NavShared,
) {
    let target_alt = if cmd.param7.is_finite() { cmd.param7 } else { ctx.position.alt };
    if fence_ready
        && !geofence::allows_position(
            fence,
            ctx.geofence_params,
            ctx.home,
            cmd.param5,
            cmd.param6,
            target_alt,
        )
    {
        shared.events.push(
            "navigator_reposition_outside_geofence",
            Severity::Error,
            "Reposition is outside geofence",
        );
        return;
    }

    let cruising_speed = if cmd.param1.is_finite() && cmd.param1 > 0.0 {
        cmd.param1
    } else {
        shared.cruising_speed(ctx)
    };

    let curr = shared.triplet.current;
    let mut current = PositionSetpoint {
        timestamp: ctx.now_us,
        loiter_radius: ctx.loiter_radius(),
        acceptance_radius: ctx.acceptance_radius(),
        cruising_speed,
        cruising_throttle: shared.cruising_throttle(),
        yaw: cmd.param4,
        ..PositionSetpoint::at(SetpointType::Loiter, f64::NAN, f64::NAN, target_alt)
    };

    if cmd.param5.is_finite() && cmd.param6.is_finite() {
        current.lat = cmd.param5;
        current.lon = cmd.param6;
    } else if cmd.param7.is_finite() || cmd.param4.is_finite() {
        // Keep the horizontal target
        current.lat = if curr.lat.is_finite() { curr.lat } else { ctx.position.lat };
        current.lon = if curr.lon.is_finite() { curr.lon } else { ctx.position.lon };
        if cmd.param7.is_finite() {
            // Altitude change only: keep circling the same way
            if curr.loiter_radius.is_finite() && curr.loiter_radius > 0.0 {
                current.loiter_radius = curr.loiter_radius;
            }
            current.loiter_direction = curr.loiter_direction;
        }
    } else if ctx.status.is_rotary_wing() && curr.setpoint_type != SetpointType::Takeoff {
        // Nothing given: pause where the vehicle can stop
        (current.lat, current.lon) = braking_stop_point(ctx);
        current.yaw = ctx.local.heading;
    } else {
        current.lat = ctx.position.lat;
        current.lon = ctx.position.lon;
    }

    shared.reposition.previous = PositionSetpoint {
        timestamp: ctx.now_us,
        yaw: ctx.local.heading,
        ..PositionSetpoint::at(
            SetpointType::Position,
            ctx.position.lat,
            ctx.position.lon,
            ctx.position.alt,
        )
    };
    shared.reposition.current = current;
    shared.reposition.next = PositionSetpoint::default();
    shared.reposition.timestamp = ctx.now_us;
}

fn orbit<G: Geofence>(
    cmd: &VehicleCommand,
    ctx: &NavContext<'_>,
    fence: &G,
    fence_ready: bool,
    shared: &mut NavShared,
) {
    let lat = if cmd.param5.is_finite() { cmd.param5 } else { ctx.position.lat };
    let lon = if cmd.param6.is_finite() { cmd.param6 } else { ctx.position.lon };
    let alt = if cmd.param7.is_finite() { cmd.param7 } else { ctx.position.alt };

    if fence_ready && !geofence::allows_position(fence, ctx.geofence_params, ctx.home, lat, lon, alt) {
        shared.events.push(
            "navigator_orbit_outside_geofence",
            Severity::Error,
            "Orbit is outside geofence",
        );
        return;
    }

    let (loiter_radius, loiter_direction) = if cmd.param1.is_finite() {
        (libm::fabsf(cmd.param1), if cmd.param1 < 0.0 { -1 } else { 1 })
    } else {
        (ctx.loiter_radius(), 1)
    };

    shared.reposition.current = PositionSetpoint {
        timestamp: ctx.now_us,
        loiter_radius,
        loiter_direction,
        acceptance_radius: ctx.acceptance_radius(),
        cruising_speed: shared.cruising_speed(ctx),
        cruising_throttle: shared.cruising_throttle(),
        ..PositionSetpoint::at(SetpointType::Loiter, lat, lon, alt)
    };
}

fn takeoff(cmd: &VehicleCommand, ctx: &NavContext<'_>, shared: &mut NavShared) {
    // The commanded yaw is only meaningful with a known true heading
    let heading_known = ctx.home.is_valid();

    let (lat, lon) = if cmd.param5.is_finite() && cmd.param6.is_finite() {
        (cmd.param5, cmd.param6)
    } else {
        (ctx.position.lat, ctx.position.lon)
    };

    shared.takeoff.previous = if heading_known {
        PositionSetpoint {
            timestamp: ctx.now_us,
            yaw: ctx.local.heading,
            ..PositionSetpoint::at(
                SetpointType::Position,
                ctx.position.lat,
                ctx.position.lon,
                ctx.position.alt,
            )
        }
    } else {
        PositionSetpoint::default()
    };
    shared.takeoff.current = PositionSetpoint {
        timestamp: ctx.now_us,
        loiter_radius: ctx.loiter_radius(),
        yaw: if heading_known { cmd.param4 } else { ctx.local.heading },
        ..PositionSetpoint::at(SetpointType::Takeoff, lat, lon, cmd.param7)
    };
    shared.takeoff.next = PositionSetpoint::default();
    shared.takeoff.timestamp = ctx.now_us;
}

fn change_speed(cmd: &VehicleCommand, ctx: &NavContext<'_>, shared: &mut NavShared) {
    if cmd.param2 > SPEED_EPSILON {
        shared.cruise.set_speed(ctx.status.vehicle_type, cmd.param2);
        return;
    }
    shared.cruise.reset_speed();
    // Throttle in percent, only used without a speed target
    if cmd.param3 > SPEED_EPSILON {
        shared.cruise.set_throttle(cmd.param3 / 100.0);
    } else {
        shared.cruise.reset_throttle();
    }
}

fn roi_from_command(cmd: &VehicleCommand, now_us: u64) -> VehicleRoi {
    let mut roi = VehicleRoi {
        timestamp: now_us,
        ..Default::default()
    };
    match cmd.command {
        opcode::DO_SET_ROI | opcode::NAV_ROI => roi.mode = RoiMode::from_param(cmd.param1),
        opcode::DO_SET_ROI_LOCATION => {
            roi.mode = RoiMode::Location;
            roi.lat = cmd.param5;
            roi.lon = cmd.param6;
            roi.alt = cmd.param7;
        }
        opcode::DO_SET_ROI_WPNEXT_OFFSET => {
            roi.mode = RoiMode::WaypointNext;
            roi.pitch_offset = (cmd.param5 as f32).to_radians();
            roi.roll_offset = (cmd.param6 as f32).to_radians();
            roi.yaw_offset = cmd.param7.to_radians();
        }
        _ => roi.mode = RoiMode::None,
    }
    roi
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failsafe::GeofenceAction;
    use crate::geo::waypoint_from_heading_and_distance;
    use crate::geofence::FenceSet;
    use crate::mission::MissionItem;
    use crate::navigator::context::fixtures::*;
    use crate::vehicle::ArmingState;

    fn command(op: u16) -> VehicleCommand {
        VehicleCommand::new(op)
    }

    fn run(world: &World, cmd: &VehicleCommand, shared: &mut NavShared) {
        let mut mission = MissionBehavior::new();
        handle_command(cmd, &world.ctx(), &FenceSet::new(), true, &mut mission, shared);
    }

    #[test]
    fn test_reposition_to_location() {
        let world = World::flying();
        let mut shared = NavShared::new();
        let mut cmd = command(opcode::DO_REPOSITION);
        cmd.param1 = 7.0;
        cmd.param5 = LAT + 0.001;
        cmd.param6 = LON;
        cmd.param7 = HOME_ALT + 50.0;

        run(&world, &cmd, &mut shared);
        let rep = shared.reposition;
        assert!(rep.current.is_loiter());
        assert_eq!(rep.current.lat, LAT + 0.001);
        assert_eq!(rep.current.alt, HOME_ALT + 50.0);
        assert_eq!(rep.current.cruising_speed, 7.0);
        assert_eq!(rep.previous.lat, world.position.lat);
        // Acknowledged by the commander
        assert_eq!(shared.outbox.ack_count(), 0);
    }

    #[test]
    fn test_reposition_ignored_while_disarmed() {
        let mut world = World::flying();
        world.status.arming_state = ArmingState::Standby;
        let mut shared = NavShared::new();
        let mut cmd = command(opcode::DO_REPOSITION);
        cmd.param5 = LAT;
        cmd.param6 = LON;

        run(&world, &cmd, &mut shared);
        assert!(!shared.reposition.current.valid);
    }

    #[test]
    fn test_reposition_altitude_only_keeps_loiter_shape() {
        let world = World::flying();
        let mut shared = NavShared::new();
        shared.triplet.current = PositionSetpoint {
            loiter_radius: 120.0,
            loiter_direction: -1,
            ..PositionSetpoint::at(SetpointType::Loiter, LAT + 0.002, LON, HOME_ALT + 30.0)
        };
        let mut cmd = command(opcode::DO_REPOSITION);
        cmd.param7 = HOME_ALT + 90.0;

        run(&world, &cmd, &mut shared);
        let current = shared.reposition.current;
        assert_eq!(current.lat, LAT + 0.002);
        assert_eq!(current.alt, HOME_ALT + 90.0);
        assert_eq!(current.loiter_radius, 120.0);
        assert_eq!(current.loiter_direction, -1);
    }

    #[test]
    fn test_reposition_without_target_pauses() {
        let mut world = World::flying();
        world.local.vx = 8.0;
        let mut shared = NavShared::new();

        run(&world, &command(opcode::DO_REPOSITION), &mut shared);
        let current = shared.reposition.current;
        assert!(current.valid);
        assert!(current.lat > LAT);
        assert_eq!(current.alt, world.position.alt);
    }

    #[test]
    fn test_reposition_outside_fence_rejected() {
        let mut world = World::flying();
        world.geofence_params.action = GeofenceAction::Loiter;
        let mut fence = FenceSet::new();
        fence.add_circle(LAT, LON, 100.0, true).unwrap();
        let (far_lat, _) = waypoint_from_heading_and_distance(LAT, LON, 0.0, 500.0);
        let mut cmd = command(opcode::DO_REPOSITION);
        cmd.param5 = far_lat;
        cmd.param6 = LON;

        let mut shared = NavShared::new();
        let mut mission = MissionBehavior::new();
        handle_command(&cmd, &world.ctx(), &fence, true, &mut mission, &mut shared);
        assert!(!shared.reposition.current.valid);
        assert!(shared.events.contains("navigator_reposition_outside_geofence"));
    }

    #[test]
    fn test_fixed_wing_orbit_direction() {
        let mut world = World::flying();
        world.status.vehicle_type = VehicleType::FixedWing;
        let mut shared = NavShared::new();
        let mut cmd = command(opcode::DO_ORBIT);
        cmd.param1 = -150.0;

        run(&world, &cmd, &mut shared);
        let current = shared.reposition.current;
        assert_eq!(current.loiter_radius, 150.0);
        assert_eq!(current.loiter_direction, -1);
        assert_eq!(current.lat, LAT);

        // Multicopters orbit in the position controller
        world.status.vehicle_type = VehicleType::RotaryWing;
        let mut shared = NavShared::new();
        run(&world, &cmd, &mut shared);
        assert!(!shared.reposition.current.valid);
    }

    #[test]
    fn test_takeoff_and_vtol_takeoff_buffers() {
        let world = World::flying();
        let mut shared = NavShared::new();
        let mut cmd = command(opcode::NAV_TAKEOFF);
        cmd.param7 = HOME_ALT + 15.0;
        run(&world, &cmd, &mut shared);
        assert_eq!(shared.takeoff.current.setpoint_type, SetpointType::Takeoff);
        assert_eq!(shared.takeoff.current.lat, LAT);
        assert_eq!(shared.takeoff.current.alt, HOME_ALT + 15.0);

        let mut cmd = command(opcode::NAV_VTOL_TAKEOFF);
        cmd.param1 = 80.0;
        cmd.param7 = HOME_ALT + 30.0;
        run(&world, &cmd, &mut shared);
        assert_eq!(shared.vtol_takeoff.loiter_height, 80.0);
        assert_eq!(shared.vtol_takeoff.transition_alt, HOME_ALT + 30.0);
    }

    #[test]
    fn test_land_start_emits_mission_start() {
        let mut world = World::flying();
        world.plan.add_item(MissionItem::waypoint(0, LAT, LON, 20.0)).unwrap();
        world
            .plan
            .add_item(MissionItem::with_command(1, opcode::DO_LAND_START, 0.0, 0.0, 0.0))
            .unwrap();
        let mut shared = NavShared::new();

        run(&world, &command(opcode::DO_LAND_START), &mut shared);
        let start = shared.outbox.pop_command().unwrap();
        assert_eq!(start.command, opcode::MISSION_START);
        assert_eq!(start.param1, 1.0);
        assert_eq!(shared.outbox.pop_ack().unwrap().result, CommandResult::Accepted);

        // Without a landing sequence it is still acknowledged
        let world = World::flying();
        let mut shared = NavShared::new();
        run(&world, &command(opcode::DO_LAND_START), &mut shared);
        assert_eq!(shared.outbox.command_count(opcode::MISSION_START), 0);
        assert_eq!(shared.outbox.ack_count(), 1);
    }

    #[test]
    fn test_mission_start_sets_index_for_valid_mission() {
        let mut world = World::flying();
        for seq in 0..3 {
            world
                .plan
                .add_item(MissionItem::waypoint(seq, LAT + f64::from(seq) * 0.001, LON, 20.0))
                .unwrap();
        }
        let mut mission = MissionBehavior::new();
        mission.sync_plan(&world.plan);
        let mut shared = NavShared::new();
        let mut cmd = command(opcode::MISSION_START);
        cmd.param1 = 2.0;

        handle_command(&cmd, &world.ctx(), &FenceSet::new(), true, &mut mission, &mut shared);
        assert_eq!(mission.current_index(), 0);

        shared.mission_result.valid = true;
        handle_command(&cmd, &world.ctx(), &FenceSet::new(), true, &mut mission, &mut shared);
        assert_eq!(mission.current_index(), 2);
    }

    #[test]
    fn test_change_speed_and_throttle() {
        let world = World::flying();
        let ctx = world.ctx();
        let mut shared = NavShared::new();
        let mut cmd = command(opcode::DO_CHANGE_SPEED);
        cmd.param2 = 9.0;
        run(&world, &cmd, &mut shared);
        assert_eq!(shared.cruising_speed(&ctx), 9.0);

        cmd.param2 = -1.0;
        cmd.param3 = 40.0;
        run(&world, &cmd, &mut shared);
        assert_eq!(shared.cruising_speed(&ctx), world.params.mc_cruise_speed);
        assert_eq!(shared.cruising_throttle(), 0.4);
        assert_eq!(shared.outbox.ack_count(), 2);
    }

    #[test]
    fn test_roi_commands() {
        let world = World::flying();
        let mut shared = NavShared::new();
        let mut cmd = command(opcode::DO_SET_ROI_LOCATION);
        cmd.param5 = LAT;
        cmd.param6 = LON;
        cmd.param7 = 500.0;
        run(&world, &cmd, &mut shared);
        assert!(shared.roi_updated);
        assert_eq!(shared.roi.mode, RoiMode::Location);
        assert_eq!(shared.roi.alt, 500.0);

        run(&world, &command(opcode::DO_SET_ROI_NONE), &mut shared);
        assert_eq!(shared.roi.mode, RoiMode::None);
        assert_eq!(shared.outbox.ack_count(), 2);
    }

    #[test]
    fn test_vtol_transition_resets_cruise() {
        let world = World::flying();
        let ctx = world.ctx();
        let mut shared = NavShared::new();
        shared.cruise.set_speed(VehicleType::RotaryWing, 12.0);
        shared.triplet.current = shared.setpoint(&ctx, SetpointType::Position, LAT, LON, 500.0);

        run(&world, &command(opcode::DO_VTOL_TRANSITION), &mut shared);
        assert!(shared.cruise.speed(VehicleType::RotaryWing) < 0.0);
        assert!(shared.reposition.current.valid);
        assert_eq!(shared.reposition.current.cruising_speed, world.params.mc_cruise_speed);
    }

    #[test]
    fn test_go_around_acknowledged() {
        let world = World::flying();
        let mut shared = NavShared::new();
        run(&world, &command(opcode::DO_GO_AROUND), &mut shared);
        assert_eq!(shared.outbox.pop_ack().unwrap().result, CommandResult::Accepted);
    }
}
