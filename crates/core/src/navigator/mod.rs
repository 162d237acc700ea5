//! Navigation mode dispatcher
//!
//! The navigator turns the arbitrated navigation state into a position
//! setpoint triplet. Each cycle it picks at most one behavior from
//! [`BehaviorKind`] and runs all of them, the selected one with
//! `active = true`. On a behavior change the triplet is reset, except when
//! a takeoff hands over to loiter or loiter starts on an already valid
//! loiter setpoint.
//!
//! Besides the behaviors a cycle handles the navigator-side vehicle
//! commands, predicts traffic conflicts and runs the periodic geofence
//! check whose loiter point feeds the reposition buffer. A flight that
//! loses its global position for longer than `NAV_GPSF_LT` gets a
//! termination request in the mission result.

pub mod behavior;
pub mod commands;
pub mod context;
pub mod land;
pub mod loiter;
pub mod mission;
pub mod rtl;
pub mod takeoff;
pub mod traffic;
pub mod triplet;

pub use behavior::{BehaviorKind, NavigationBehavior};
pub use context::{
    CruiseOverrides, LandingTarget, NavContext, NavShared, PositionControllerStatus, RoiMode,
    VehicleRoi, VtolTakeoffRequest,
};
pub use land::{LandBehavior, PrecisionLandBehavior, PrecisionLandStage};
pub use loiter::LoiterBehavior;
pub use mission::MissionBehavior;
pub use rtl::{RtlBehavior, RtlDestination, RtlStage};
pub use takeoff::{TakeoffBehavior, VtolTakeoffBehavior, VtolTakeoffStage};
pub use traffic::{TrafficAvoidance, TrafficConflict, TransponderFlags, TransponderReport};
pub use triplet::{PositionSetpoint, PositionSetpointTriplet, SetpointType};

use crate::command::VehicleCommand;
use crate::commander::Outbox;
use crate::events::{EventLog, Severity};
use crate::failsafe::RtlType;
use crate::geofence::{FenceCheckInputs, GeofenceMonitor};
use crate::mission::{ExecutionMode, MissionPlan};
use crate::parameters::{GeofenceParams, NavigatorParams, ParameterStore};
use crate::traits::{secs_to_us, Geofence};
use crate::vehicle::{
    GeofenceResult, GlobalPosition, HomePosition, LandDetected, LocalPosition, MissionResult,
    NavState, VehicleStatus,
};

use takeoff::{vtol_transition_command, VTOL_STATE_MC};

/// GF_SOURCE value selecting the raw GNSS position
pub const GEOFENCE_SOURCE_GNSS: u8 = 1;

/// Everything the navigator reads in one cycle
#[derive(Debug, Clone, Copy, Default)]
pub struct NavigatorInputs<'a> {
    /// Reloaded while disarmed when its generation changed
    pub parameters: Option<&'a ParameterStore>,
    pub status: VehicleStatus,
    pub land: LandDetected,
    pub global_position: Option<GlobalPosition>,
    pub gps_position: Option<GlobalPosition>,
    pub local_position: Option<LocalPosition>,
    pub home: HomePosition,
    pub position_controller: Option<PositionControllerStatus>,
    pub landing_target: Option<LandingTarget>,
    pub commands: &'a [VehicleCommand],
    pub traffic: &'a [TransponderReport],
}

/// What one cycle did
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavigatorReport {
    pub behavior: Option<BehaviorKind>,
    pub behavior_changed: bool,
    pub triplet_updated: bool,
    pub mission_result_updated: bool,
    pub roi_updated: bool,
    /// Result of the fence check, when one ran this cycle
    pub geofence: Option<GeofenceResult>,
}

/// The behavior instances, run in [`BehaviorKind::ALL`] order
#[derive(Debug, Default)]
pub struct Behaviors {
    pub mission: MissionBehavior,
    pub loiter: LoiterBehavior,
    pub rtl: RtlBehavior,
    pub takeoff: TakeoffBehavior,
    pub vtol_takeoff: VtolTakeoffBehavior,
    pub land: LandBehavior,
    pub precision_land: PrecisionLandBehavior,
}

impl Behaviors {
    pub fn run(&mut self, kind: BehaviorKind, active: bool, ctx: &NavContext<'_>, shared: &mut NavShared) {
        match kind {
            BehaviorKind::Mission => self.mission.run(active, ctx, shared),
            BehaviorKind::Loiter => self.loiter.run(active, ctx, shared),
            BehaviorKind::Rtl => self.rtl.run(active, ctx, shared),
            BehaviorKind::Takeoff => self.takeoff.run(active, ctx, shared),
            BehaviorKind::VtolTakeoff => self.vtol_takeoff.run(active, ctx, shared),
            BehaviorKind::Land => self.land.run(active, ctx, shared),
            BehaviorKind::PrecisionLand => self.precision_land.run(active, ctx, shared),
        }
    }

    pub fn is_active(&self, kind: BehaviorKind) -> bool {
        match kind {
            BehaviorKind::Mission => self.mission.is_active(),
            BehaviorKind::Loiter => self.loiter.is_active(),
            BehaviorKind::Rtl => self.rtl.is_active(),
            BehaviorKind::Takeoff => self.takeoff.is_active(),
            BehaviorKind::VtolTakeoff => self.vtol_takeoff.is_active(),
            BehaviorKind::Land => self.land.is_active(),
            BehaviorKind::PrecisionLand => self.precision_land.is_active(),
        }
    }

    pub fn active_count(&self) -> usize {
        BehaviorKind::ALL
            .iter()
            .filter(|&&kind| self.is_active(kind))
            .count()
    }
}

pub struct Navigator<G: Geofence> {
    params: NavigatorParams,
    geofence_params: GeofenceParams,
    param_generation: Option<u32>,

    fence: G,
    plan: MissionPlan,

    status: VehicleStatus,
    land: LandDetected,
    /// Last received global position, valid once `have_position`
    position: GlobalPosition,
    have_position: bool,
    position_lost_since: Option<u64>,
    gps_position: Option<GlobalPosition>,
    local: LocalPosition,
    home: HomePosition,
    position_controller: Option<PositionControllerStatus>,
    landing_target: Option<LandingTarget>,

    behaviors: Behaviors,
    selected: Option<BehaviorKind>,
    previous_nav_state: NavState,
    invalid_published_once: bool,

    geofence: GeofenceMonitor,
    traffic: TrafficAvoidance,
    shared: NavShared,
}

impl<G: Geofence> Navigator<G> {
    pub fn new(fence: G) -> Self {
        Self::with_params(fence, NavigatorParams::default(), GeofenceParams::default())
    }

    pub fn with_params(fence: G, params: NavigatorParams, geofence_params: GeofenceParams) -> Self {
        Self {
            params,
            geofence_params,
            param_generation: None,
            fence,
            plan: MissionPlan::new(),
            status: VehicleStatus::default(),
            land: LandDetected::default(),
            position: GlobalPosition::default(),
            have_position: false,
            position_lost_since: None,
            gps_position: None,
            local: LocalPosition::default(),
            home: HomePosition::default(),
            position_controller: None,
            landing_target: None,
            behaviors: Behaviors::default(),
            selected: None,
            previous_nav_state: NavState::default(),
            invalid_published_once: false,
            geofence: GeofenceMonitor::new(),
            traffic: TrafficAvoidance::new(),
            shared: NavShared::new(),
        }
    }

    pub fn params(&self) -> &NavigatorParams {
        &self.params
    }

    pub fn geofence_params(&self) -> &GeofenceParams {
        &self.geofence_params
    }

    pub fn fence(&self) -> &G {
        &self.fence
    }

    pub fn fence_mut(&mut self) -> &mut G {
        &mut self.fence
    }

    pub fn plan(&self) -> &MissionPlan {
        &self.plan
    }

    /// Mission upload. The change is picked up on the next cycle.
    pub fn plan_mut(&mut self) -> &mut MissionPlan {
        &mut self.plan
    }

    pub fn behaviors(&self) -> &Behaviors {
        &self.behaviors
    }

    pub fn selected(&self) -> Option<BehaviorKind> {
        self.selected
    }

    pub fn triplet(&self) -> &PositionSetpointTriplet {
        &self.shared.triplet
    }

    pub fn mission_result(&self) -> &MissionResult {
        &self.shared.mission_result
    }

    pub fn geofence_result(&self) -> &GeofenceResult {
        self.geofence.result()
    }

    pub fn roi(&self) -> &VehicleRoi {
        &self.shared.roi
    }

    pub fn events(&self) -> &EventLog {
        &self.shared.events
    }

    pub fn events_mut(&mut self) -> &mut EventLog {
        &mut self.shared.events
    }

    pub fn outbox_mut(&mut self) -> &mut Outbox {
        &mut self.shared.outbox
    }

    pub fn run_cycle(&mut self, inputs: &NavigatorInputs<'_>, now_us: u64) -> NavigatorReport {
        self.reload_params(inputs.parameters);
        self.update_inputs(inputs);

        self.shared.triplet_updated = false;
        self.shared.mission_result_updated = false;
        self.shared.roi_updated = false;
        self.check_position_loss(inputs.global_position.is_some(), now_us);
        let plan_changed = self.behaviors.mission.sync_plan(&self.plan);

        let fence_position = if self.geofence_params.source == GEOFENCE_SOURCE_GNSS {
            self.gps_position.as_ref()
        } else if self.have_position {
            Some(&self.position)
        } else {
            None
        };
        let fence_ready = fence_position.is_some();

        let ctx = NavContext {
            now_us,
            status: &self.status,
            land: &self.land,
            position: &self.position,
            local: &self.local,
            home: &self.home,
            params: &self.params,
            geofence_params: &self.geofence_params,
            plan: &self.plan,
            position_controller: self.position_controller.as_ref(),
            landing_target: self.landing_target.as_ref(),
        };

        for cmd in inputs.commands {
            commands::handle_command(
                cmd,
                &ctx,
                &self.fence,
                fence_ready,
                &mut self.behaviors.mission,
                &mut self.shared,
            );
        }

        if self.have_position {
            self.traffic.check(
                inputs.traffic,
                &self.position,
                &self.params,
                &self.status,
                &mut self.behaviors.rtl,
                &mut self.shared.events,
                &mut self.shared.outbox,
                now_us,
            );
        }

        let fence_inputs = FenceCheckInputs {
            vehicle_type: self.status.vehicle_type,
            armed: self.status.is_armed(),
            position: fence_position,
            local_position: Some(&self.local),
            home: &self.home,
            nav_bearing: self.position_controller.map(|pc| pc.nav_bearing),
            loiter_radius: ctx.loiter_radius(),
            acceptance_radius: ctx.acceptance_radius(),
            cruising_speed: self.shared.cruising_speed(&ctx),
            cruising_throttle: self.shared.cruising_throttle(),
        };
        let fence_check = self.geofence.check(
            &self.fence,
            &self.geofence_params,
            &fence_inputs,
            now_us,
            &mut self.shared.events,
        );
        if let Some(sp) = fence_check.and_then(|check| check.reposition) {
            self.shared.reposition.current = sp;
            self.shared.reposition.previous = PositionSetpoint::default();
            self.shared.reposition.next = PositionSetpoint::default();
            self.shared.reposition.timestamp = now_us;
        }

        let nav_state = self.status.nav_state;
        let rtl_activated = nav_state == NavState::AutoRtl && self.previous_nav_state != NavState::AutoRtl;
        let mut selected = select_behavior(
            nav_state,
            rtl_activated,
            self.selected,
            plan_changed,
            &ctx,
            &mut self.behaviors,
            &mut self.shared,
        );
        // Nothing runs while disarmed
        if !self.status.is_armed() {
            selected = None;
        }
        self.previous_nav_state = nav_state;

        let behavior_changed = selected != self.selected;
        if behavior_changed {
            let takeoff_to_loiter = self.selected == Some(BehaviorKind::Takeoff)
                && selected == Some(BehaviorKind::Loiter);
            let loiter_on_loiter = selected == Some(BehaviorKind::Loiter)
                && self.shared.triplet.current.is_loiter();
            if !takeoff_to_loiter && !loiter_on_loiter {
                self.shared.reset_triplet(now_us);
            }
            if selected == Some(BehaviorKind::Mission) {
                self.shared
                    .set_mission_finished(self.behaviors.mission.is_finished());
            }

            if nav_state == NavState::Descend && self.status.is_vtol && self.status.is_fixed_wing() {
                self.shared
                    .outbox
                    .push_command(vtol_transition_command(&ctx, VTOL_STATE_MC));
                self.shared.events.push(
                    "navigator_transition_descend",
                    Severity::Critical,
                    "Transition to hover mode and descend",
                );
            }
        }
        self.selected = selected;
        if selected.is_some() {
            self.invalid_published_once = false;
        }

        for kind in BehaviorKind::ALL {
            self.behaviors
                .run(kind, selected == Some(kind), &ctx, &mut self.shared);
        }

        if selected.is_none() && !self.invalid_published_once {
            self.invalid_published_once = true;
            self.shared.reset_triplet(now_us);
        }

        self.behaviors.mission.update_result(&self.plan, &mut self.shared);
        if self.shared.mission_result_updated {
            self.shared.mission_result.timestamp = now_us;
        }

        NavigatorReport {
            behavior: selected,
            behavior_changed,
            triplet_updated: self.shared.triplet_updated,
            mission_result_updated: self.shared.mission_result_updated,
            roi_updated: self.shared.roi_updated,
            geofence: fence_check.map(|check| check.result),
        }
    }

    fn reload_params(&mut self, store: Option<&ParameterStore>) {
        let Some(store) = store else {
            return;
        };
        if self.status.is_armed() || self.param_generation == Some(store.generation()) {
            return;
        }
        self.params = NavigatorParams::from_store(store);
        self.geofence_params = GeofenceParams::from_store(store);
        self.param_generation = Some(store.generation());
    }

    fn check_position_loss(&mut self, position_present: bool, now_us: u64) {
        if !self.status.is_armed() {
            self.position_lost_since = None;
            self.shared.set_flight_termination(false);
            return;
        }
        if position_present || self.land.landed {
            self.position_lost_since = None;
            return;
        }

        let lost_since = *self.position_lost_since.get_or_insert(now_us);
        if now_us.saturating_sub(lost_since) >= secs_to_us(self.params.gps_failure_loiter_s)
            && !self.shared.mission_result.flight_termination
        {
            self.shared.set_flight_termination(true);
            self.shared.events.push(
                "navigator_gps_failure_terminate",
                Severity::Emergency,
                "Global position lost, requesting flight termination",
            );
        }
    }

    fn update_inputs(&mut self, inputs: &NavigatorInputs<'_>) {
        self.status = inputs.status;
        self.land = inputs.land;
        if let Some(position) = inputs.global_position {
            self.position = position;
            self.have_position = true;
        }
        if inputs.gps_position.is_some() {
            self.gps_position = inputs.gps_position;
        }
        if let Some(local) = inputs.local_position {
            self.local = local;
        }
        self.home = inputs.home;
        if inputs.position_controller.is_some() {
            self.position_controller = inputs.position_controller;
        }
        self.landing_target = inputs.landing_target;
    }
}

/// Behavior for `nav_state`. The return sub-policies may reconfigure the
/// mission behavior on the way.
fn select_behavior(
    nav_state: NavState,
    rtl_activated: bool,
    previous: Option<BehaviorKind>,
    plan_changed: bool,
    ctx: &NavContext<'_>,
    behaviors: &mut Behaviors,
    shared: &mut NavShared,
) -> Option<BehaviorKind> {
    match nav_state {
        NavState::AutoMission => {
            behaviors.mission.set_execution_mode(ExecutionMode::Normal, ctx.plan);
            Some(BehaviorKind::Mission)
        }
        NavState::AutoLoiter => Some(BehaviorKind::Loiter),
        NavState::AutoRtl => Some(select_return(rtl_activated, previous, plan_changed, ctx, behaviors, shared)),
        NavState::AutoTakeoff => Some(BehaviorKind::Takeoff),
        NavState::AutoVtolTakeoff => Some(BehaviorKind::VtolTakeoff),
        NavState::AutoLand => Some(BehaviorKind::Land),
        NavState::AutoPrecland => Some(BehaviorKind::PrecisionLand),
        _ => None,
    }
}

fn select_return(
    rtl_activated: bool,
    previous: Option<BehaviorKind>,
    plan_changed: bool,
    ctx: &NavContext<'_>,
    behaviors: &mut Behaviors,
    shared: &mut NavShared,
) -> BehaviorKind {
    let mission = &mut behaviors.mission;
    let plan = ctx.plan;

    match ctx.params.rtl_type {
        RtlType::MissionLanding | RtlType::Closest => {
            if !rtl_activated && behaviors.rtl.should_engage_mission_for_landing() {
                mission.set_execution_mode(ExecutionMode::FastForward, plan);
                if !mission.on_mission_landing(plan) && ctx.is_armed() && !ctx.landed() {
                    mission.start_mission_landing(plan);
                }
                BehaviorKind::Mission
            } else {
                BehaviorKind::Rtl
            }
        }
        RtlType::MissionLandingReversed => {
            if mission.land_start_available(plan) && !ctx.landed() {
                mission.set_execution_mode(ExecutionMode::FastForward, plan);
                match previous {
                    Some(BehaviorKind::Mission) => {}
                    // From a manual mode: head for the landing
                    None => {
                        if !mission.on_mission_landing(plan) {
                            mission.start_mission_landing(plan);
                        }
                    }
                    Some(_) => mission.set_closest_item_as_current(plan, ctx.position.lat, ctx.position.lon),
                }
                if rtl_activated {
                    shared.events.push(
                        "navigator_rtl_mission_activated",
                        Severity::Info,
                        "RTL Mission activated, continue mission",
                    );
                }
                return BehaviorKind::Mission;
            }

            mission.set_execution_mode(ExecutionMode::Reverse, plan);
            let from_auto = previous.is_some_and(|p| p != BehaviorKind::Rtl || plan_changed);
            if from_auto && !mission.is_finished() && !ctx.landed() {
                if previous != Some(BehaviorKind::Mission)
                    && (rtl_activated || mission.waypoints_changed())
                {
                    mission.set_closest_item_as_current(plan, ctx.position.lat, ctx.position.lon);
                }
                if rtl_activated {
                    shared.events.push(
                        "navigator_rtl_mission_activated_rev",
                        Severity::Info,
                        "RTL Mission activated, fly mission in reverse",
                    );
                }
                BehaviorKind::Mission
            } else {
                if rtl_activated {
                    shared.events.push(
                        "navigator_rtl_mission_activated_home",
                        Severity::Info,
                        "RTL Mission activated, fly to home",
                    );
                }
                BehaviorKind::Rtl
            }
        }
        RtlType::Home => {
            if rtl_activated {
                shared
                    .events
                    .push("navigator_rtl_home_activated", Severity::Info, "RTL activated");
            }
            BehaviorKind::Rtl
        }
    }
}
