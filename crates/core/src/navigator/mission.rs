//! Mission behavior
//!
//! Flies the uploaded plan item by item. Besides normal execution the
//! return policies use it in two other modes: fast forward through the
//! landing sequence after DO_LAND_START, and reverse back along the
//! position items towards the start.

use crate::command::opcode;
use crate::events::Severity;
use crate::latch::EdgeDetector;
use crate::mission::{
    is_landing_command, is_loiter_command, is_takeoff_command, ExecutionMode, MissionItem,
    MissionPlan, MAX_MISSION_ITEMS,
};
use crate::traits::secs_to_us;

use super::behavior::NavigationBehavior;
use super::context::{NavContext, NavShared, RoiMode, VehicleRoi};
use super::triplet::{PositionSetpoint, SetpointType};

/// Upper bound on items visited while looking for the next position item
const MAX_ITEM_WALK: usize = MAX_MISSION_ITEMS * 4;

#[derive(Debug)]
pub struct MissionBehavior {
    activity: EdgeDetector,
    current_index: u16,
    reached_index: Option<u16>,
    execution_mode: ExecutionMode,
    finished: bool,
    plan_generation: Option<u32>,
    waypoints_changed: bool,
    /// The current setpoint no longer matches `current_index`
    index_changed: bool,
    landing_in_progress: bool,
    hold_until_us: Option<u64>,
    /// Completed repetitions per DO_JUMP item
    jump_counts: [u16; MAX_MISSION_ITEMS],
}

impl Default for MissionBehavior {
    fn default() -> Self {
        Self::new()
    }
}

impl MissionBehavior {
    pub fn new() -> Self {
        Self {
            activity: EdgeDetector::new(false),
            current_index: 0,
            reached_index: None,
            execution_mode: ExecutionMode::Normal,
            finished: false,
            plan_generation: None,
            waypoints_changed: false,
            index_changed: false,
            landing_in_progress: false,
            hold_until_us: None,
            jump_counts: [0; MAX_MISSION_ITEMS],
        }
    }

    pub fn current_index(&self) -> u16 {
        self.current_index
    }

    pub fn execution_mode(&self) -> ExecutionMode {
        self.execution_mode
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The plan was replaced since the closest item was last chosen
    pub fn waypoints_changed(&self) -> bool {
        self.waypoints_changed
    }

    /// Pick up a new upload. Returns `true` when the plan changed.
    pub fn sync_plan(&mut self, plan: &MissionPlan) -> bool {
        let generation = plan.generation();
        if self.plan_generation == Some(generation) {
            return false;
        }
        if self.plan_generation.is_some() {
            self.waypoints_changed = true;
        }
        self.plan_generation = Some(generation);
        if self.current_index >= plan.count() {
            self.current_index = 0;
        }
        self.jump_counts = [0; MAX_MISSION_ITEMS];
        self.reached_index = None;
        self.finished = false;
        self.landing_in_progress = false;
        self.index_changed = true;
        true
    }

    pub fn set_execution_mode(&mut self, mode: ExecutionMode, plan: &MissionPlan) {
        if self.execution_mode == mode {
            return;
        }
        let previous = self.execution_mode;
        self.execution_mode = mode;

        match (previous, mode) {
            (ExecutionMode::Normal | ExecutionMode::FastForward, ExecutionMode::Reverse) => {
                if self.finished {
                    // Start over from the last item and fly it all back
                    if let Some(last) = plan.next_position_item(plan.count().saturating_sub(1), false)
                    {
                        self.current_index = last;
                        self.finished = false;
                    }
                } else if let Some(previous_item) = self
                    .current_index
                    .checked_sub(1)
                    .and_then(|i| plan.next_position_item(i, false))
                {
                    // The vehicle was on its way from there
                    self.current_index = previous_item;
                }
            }
            (ExecutionMode::Reverse, ExecutionMode::Normal | ExecutionMode::FastForward) => {
                if let Some(next) = plan.next_position_item(self.current_index.saturating_add(1), true) {
                    self.current_index = next;
                }
            }
            _ => {}
        }
        self.index_changed = true;
    }

    /// Make `index` the next item to fly to
    pub fn set_current_index(&mut self, index: u16, plan: &MissionPlan) -> bool {
        if index >= plan.count() {
            return false;
        }
        self.current_index = index;
        self.finished = false;
        self.landing_in_progress = plan.land_start_index().is_some_and(|start| index >= start);
        self.index_changed = true;
        true
    }

    /// Continue from the position item nearest the vehicle
    pub fn set_closest_item_as_current(&mut self, plan: &MissionPlan, lat: f64, lon: f64) {
        if let Some(index) = plan.closest_item_index(lat, lon) {
            self.current_index = index;
            self.finished = false;
            self.index_changed = true;
        }
        self.waypoints_changed = false;
    }

    pub fn land_start_available(&self, plan: &MissionPlan) -> bool {
        plan.has_land_start()
    }

    /// Jump to the DO_LAND_START marker
    pub fn start_mission_landing(&mut self, plan: &MissionPlan) -> bool {
        let Some(start) = plan.land_start_index() else {
            return false;
        };
        self.current_index = start;
        self.finished = false;
        self.landing_in_progress = true;
        self.index_changed = true;
        true
    }

    /// Flying the landing sequence of the plan
    pub fn on_mission_landing(&self, plan: &MissionPlan) -> bool {
        self.landing_in_progress
            && plan
                .land_start_index()
                .is_some_and(|start| self.current_index >= start)
    }

    /// Copy progress into the mission result
    pub fn update_result(&self, plan: &MissionPlan, shared: &mut NavShared) {
        let result = &mut shared.mission_result;
        let before = *result;
        result.valid = !plan.is_empty();
        result.seq_total = plan.count();
        result.seq_current = self.current_index;
        result.seq_reached = self.reached_index.map_or(-1, i32::from);
        result.execution_mode = self.execution_mode;
        if *result != before {
            shared.mission_result_updated = true;
        }
    }

    fn set_mission_items(&mut self, ctx: &NavContext<'_>, shared: &mut NavShared) {
        self.index_changed = false;
        self.hold_until_us = None;

        let Some(index) = self.next_item_index(ctx, shared, self.current_index) else {
            self.finish(ctx, shared);
            return;
        };
        let Some(item) = ctx.plan.get(index).copied() else {
            self.finish(ctx, shared);
            return;
        };
        self.current_index = index;
        self.finished = false;
        shared.set_mission_finished(false);

        let current = self.item_setpoint(ctx, shared, &item);
        shared.set_current(ctx, current);

        let forward = self.execution_mode != ExecutionMode::Reverse;
        let following = if forward {
            index
                .checked_add(1)
                .and_then(|i| ctx.plan.next_position_item(i, true))
        } else {
            index
                .checked_sub(1)
                .and_then(|i| ctx.plan.next_position_item(i, false))
                .filter(|&i| ctx.plan.get(i).is_some_and(|it| !is_takeoff_command(it.command)))
        };
        let next = following
            .and_then(|i| ctx.plan.get(i).copied())
            .map(|it| self.item_setpoint(ctx, shared, &it))
            .unwrap_or_default();
        shared.triplet.next = next;
    }

    /// Index of the next position item at or after `from` in the current
    /// direction. DO items on the way are executed in normal mode.
    fn next_item_index(&mut self, ctx: &NavContext<'_>, shared: &mut NavShared, from: u16) -> Option<u16> {
        let plan = ctx.plan;
        let mut index = from;

        for _ in 0..MAX_ITEM_WALK {
            let item = *plan.get(index)?;

            if self.execution_mode == ExecutionMode::Reverse {
                if is_takeoff_command(item.command) {
                    return None;
                }
                if item.has_location() && !is_landing_command(item.command) {
                    return Some(index);
                }
                index = index.checked_sub(1)?;
                continue;
            }

            if item.has_location() {
                return Some(index);
            }

            if self.execution_mode == ExecutionMode::Normal {
                if let Some(target) = self.execute_do_item(ctx, shared, &item, index) {
                    index = target;
                    continue;
                }
            }
            index = index.checked_add(1)?;
        }
        None
    }

    /// Apply a DO item. Returns the jump target for a pending DO_JUMP.
    fn execute_do_item(
        &mut self,
        ctx: &NavContext<'_>,
        shared: &mut NavShared,
        item: &MissionItem,
        index: u16,
    ) -> Option<u16> {
        match item.command {
            opcode::DO_JUMP => {
                let target = item.param1;
                let repeat = item.param2;
                let count = self.jump_counts.get_mut(index as usize)?;
                if target >= 0.0 && (target as u16) < ctx.plan.count() && f32::from(*count) < repeat {
                    *count += 1;
                    return Some(target as u16);
                }
            }
            opcode::DO_CHANGE_SPEED => {
                if item.param2 > 0.0 {
                    shared.cruise.set_speed(ctx.status.vehicle_type, item.param2);
                }
                if item.param3 > 0.0 {
                    shared.cruise.set_throttle(item.param3 / 100.0);
                }
            }
            opcode::DO_SET_ROI_LOCATION => {
                shared.roi = VehicleRoi {
                    timestamp: ctx.now_us,
                    mode: RoiMode::Location,
                    lat: item.latitude(),
                    lon: item.longitude(),
                    alt: item.altitude_amsl(ctx.home.alt),
                    ..Default::default()
                };
                shared.roi_updated = true;
            }
            opcode::DO_SET_ROI_NONE => {
                shared.roi = VehicleRoi {
                    timestamp: ctx.now_us,
                    ..Default::default()
                };
                shared.roi_updated = true;
            }
            _ => {}
        }
        None
    }

    fn item_setpoint(&self, ctx: &NavContext<'_>, shared: &NavShared, item: &MissionItem) -> PositionSetpoint {
        let (lat, lon) = if item.x == 0 && item.y == 0 {
            (ctx.position.lat, ctx.position.lon)
        } else {
            (item.latitude(), item.longitude())
        };
        let mut alt = item.altitude_amsl(ctx.home.alt);

        let setpoint_type = if self.execution_mode == ExecutionMode::Reverse {
            SetpointType::Position
        } else if is_takeoff_command(item.command) {
            alt = alt.max(ctx.home.alt + ctx.params.takeoff_alt);
            SetpointType::Takeoff
        } else if is_landing_command(item.command) {
            SetpointType::Land
        } else if is_loiter_command(item.command) {
            SetpointType::Loiter
        } else {
            SetpointType::Position
        };

        let mut sp = shared.setpoint(ctx, setpoint_type, lat, lon, alt);

        if item.command == opcode::NAV_WAYPOINT {
            if item.param2 > 0.0 {
                sp.acceptance_radius = item.param2;
            }
            if item.param4.is_finite() {
                sp.yaw = crate::geo::wrap_pi(item.param4.to_radians());
            }
        }
        if is_loiter_command(item.command) && item.param3.is_finite() && item.param3 != 0.0 {
            sp.loiter_radius = libm::fabsf(item.param3);
            sp.loiter_direction = if item.param3 < 0.0 { -1 } else { 1 };
        }
        sp
    }

    fn item_reached(&mut self, ctx: &NavContext<'_>, shared: &NavShared, item: &MissionItem) -> bool {
        let sp = &shared.triplet.current;

        if self.execution_mode != ExecutionMode::Reverse {
            if is_landing_command(item.command) {
                return ctx.landed();
            }
            if is_takeoff_command(item.command) {
                return ctx.position.alt >= sp.alt - ctx.altitude_acceptance_radius(sp);
            }
            if item.command == opcode::NAV_LOITER_UNLIM {
                return false;
            }
        }

        if !ctx.has_reached(sp) {
            return false;
        }

        let hold_s = match (self.execution_mode, item.command) {
            (ExecutionMode::Normal, opcode::NAV_WAYPOINT)
            | (ExecutionMode::Normal, crate::mission::command::MAV_CMD_NAV_LOITER_TIME) => {
                item.param1.max(0.0)
            }
            _ => 0.0,
        };
        if hold_s <= 0.0 {
            return true;
        }
        let until = *self
            .hold_until_us
            .get_or_insert(ctx.now_us.saturating_add(secs_to_us(hold_s)));
        ctx.now_us >= until
    }

    fn finish(&mut self, ctx: &NavContext<'_>, shared: &mut NavShared) {
        let first_time = !self.finished;
        self.finished = true;
        shared.set_mission_finished(true);

        let hold = if ctx.landed() {
            shared.idle_setpoint(ctx)
        } else {
            let last = shared.triplet.current;
            let (lat, lon, alt) = if last.has_position() {
                (last.lat, last.lon, last.alt)
            } else {
                (ctx.position.lat, ctx.position.lon, ctx.position.alt)
            };
            shared.setpoint(ctx, SetpointType::Loiter, lat, lon, alt)
        };
        shared.set_current(ctx, hold);

        if first_time {
            shared
                .events
                .push("navigator_mission_finished", Severity::Info, "Mission finished");
        }
    }

    fn advance(&mut self, ctx: &NavContext<'_>, shared: &mut NavShared) {
        self.reached_index = Some(self.current_index);
        let next = if self.execution_mode == ExecutionMode::Reverse {
            self.current_index.checked_sub(1)
        } else {
            self.current_index.checked_add(1)
        };
        match next {
            Some(index) if index < ctx.plan.count() => {
                self.current_index = index;
                self.set_mission_items(ctx, shared);
            }
            _ => self.finish(ctx, shared),
        }
    }
}

impl NavigationBehavior for MissionBehavior {
    fn activity(&mut self) -> &mut EdgeDetector {
        &mut self.activity
    }

    fn is_active(&self) -> bool {
        self.activity.previous()
    }

    fn on_activation(&mut self, ctx: &NavContext<'_>, shared: &mut NavShared) {
        if self.finished && !self.index_changed {
            // Nothing left to fly, hold where we are
            self.finish(ctx, shared);
            return;
        }
        self.set_mission_items(ctx, shared);
    }

    fn on_active(&mut self, ctx: &NavContext<'_>, shared: &mut NavShared) {
        if self.index_changed {
            self.set_mission_items(ctx, shared);
            return;
        }
        if self.finished {
            if ctx.landed() && shared.triplet.current.setpoint_type != SetpointType::Idle {
                let idle = shared.idle_setpoint(ctx);
                shared.set_current(ctx, idle);
            }
            return;
        }

        let Some(item) = ctx.plan.get(self.current_index).copied() else {
            self.finish(ctx, shared);
            return;
        };
        if !self.item_reached(ctx, shared, &item) {
            return;
        }

        if self.execution_mode == ExecutionMode::Normal && !item.autocontinue {
            // Wait at the item until the index is changed by command
            self.reached_index = Some(self.current_index);
            let current = shared.triplet.current;
            if !current.is_loiter() {
                let hold = shared.setpoint(ctx, SetpointType::Loiter, current.lat, current.lon, current.alt);
                shared.set_current(ctx, hold);
            }
            return;
        }

        self.advance(ctx, shared);
    }

    fn on_inactivation(&mut self, _ctx: &NavContext<'_>, _shared: &mut NavShared) {
        self.hold_until_us = None;
    }

    fn on_inactive(&mut self, ctx: &NavContext<'_>, _shared: &mut NavShared) {
        // Back on the ground after a completed mission: rewind for the next flight
        if self.finished && ctx.landed() && !ctx.is_armed() {
            self.current_index = 0;
            self.reached_index = None;
            self.finished = false;
            self.landing_in_progress = false;
            self.execution_mode = ExecutionMode::Normal;
            self.jump_counts = [0; MAX_MISSION_ITEMS];
            self.index_changed = true;
        }
    }
}
