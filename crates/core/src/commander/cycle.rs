//! Periodic commander cycle
//!
//! One call to [`Commander::run_cycle`] ingests the latest records,
//! advances every timer and latch, handles the queued commands and pilot
//! action, arbitrates the navigation state and decides whether to publish.
//! The order of the steps below is part of the behavior: commands see the
//! link state of this cycle and the resolver sees the commands.

use crate::arming::{ArmDisarmReason, ArmRequest};
use crate::command::VehicleCommand;
use crate::events::Severity;
use crate::failsafe::{
    apply_decision, resolve, ActuatorFailureAction, BatteryContext, FailsafeDecision,
    FailsafeInputs, LinkEvent, LinkStatus, RcOverrideModes,
};
use crate::latch::Edge;
use crate::parameters::{CommanderParams, ParameterStore};
use crate::traits::{secs_to_us, HealthChecks, WorkerStatus, WorkerTask};
use crate::vehicle::{
    ArmingState, BatteryStatus, FailureFlags, GeofenceResult, GlobalPosition, LandDetected,
    LocalPosition, ManualControlSetpoint, MissionResult, NavState, SafetyState, TelemetryStatus,
    VehicleControlMode,
};

use super::{
    main_state_transition, ActionRequest, Commander, MainState, Published,
    INAIR_RESTART_HOLDOFF_US, TERMINATION_NOTICE_US, THROTTLE_CENTER, THROTTLE_LOW,
};

/// Everything the commander reads in one cycle
#[derive(Debug, Clone, Copy)]
pub struct CycleInputs<'a> {
    /// Reloaded while disarmed when its generation changed
    pub parameters: Option<&'a ParameterStore>,
    pub land: LandDetected,
    pub global_position: Option<GlobalPosition>,
    pub local_position: Option<LocalPosition>,
    pub manual_control: ManualControlSetpoint,
    pub telemetry: TelemetryStatus,
    pub battery: BatteryStatus,
    pub safety: SafetyState,
    pub failure_flags: FailureFlags,
    pub geofence: GeofenceResult,
    pub mission: MissionResult,
    pub offboard_signal_lost: bool,
    pub commands: &'a [VehicleCommand],
    pub action_request: Option<ActionRequest>,
}

impl Default for CycleInputs<'_> {
    fn default() -> Self {
        Self {
            parameters: None,
            land: LandDetected::default(),
            global_position: None,
            local_position: None,
            manual_control: ManualControlSetpoint::default(),
            telemetry: TelemetryStatus::default(),
            battery: BatteryStatus::default(),
            safety: SafetyState::default(),
            failure_flags: FailureFlags::empty(),
            geofence: GeofenceResult::default(),
            mission: MissionResult::default(),
            offboard_signal_lost: true,
            commands: &[],
            action_request: None,
        }
    }
}

/// What one cycle did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub nav_state_changed: bool,
    pub published: bool,
    pub decision: FailsafeDecision,
}

impl<H: HealthChecks, W: WorkerTask> Commander<H, W> {
    pub fn run_cycle(&mut self, inputs: &CycleInputs<'_>, now_us: u64) -> CycleReport {
        self.reload_params(inputs.parameters);
        self.update_inputs(inputs, now_us);
        self.check_auto_disarm(now_us);
        self.check_battery(now_us);
        self.check_init_complete(now_us);
        self.check_geofence(inputs.geofence);
        self.check_manual_control(now_us);
        self.check_data_links(now_us);
        self.select_default_mode(now_us);

        for cmd in inputs.commands {
            let _ = self.handle_command(cmd, now_us);
        }
        if let Some(request) = inputs.action_request {
            let _ = self.execute_action_request(&request, now_us);
        }

        self.check_failure_detector(inputs.failure_flags, now_us);
        self.check_mission_termination(now_us);
        self.check_flight_time(now_us);
        self.update_armed_edges(now_us);

        let nav_state_changed = self.update_nav_state(now_us);
        let published = self.publish(nav_state_changed, now_us);

        self.poll_worker();

        CycleReport {
            nav_state_changed,
            published,
            decision: self.last_decision,
        }
    }

    fn reload_params(&mut self, store: Option<&ParameterStore>) {
        let Some(store) = store else {
            return;
        };
        if self.arm_state.is_armed() || self.param_generation == Some(store.generation()) {
            return;
        }
        self.params = CommanderParams::from_store(store);
        self.param_generation = Some(store.generation());
        self.apply_identity();
    }

    fn update_inputs(&mut self, inputs: &CycleInputs<'_>, now_us: u64) {
        self.land = inputs.land;
        self.global_position = inputs.global_position;
        self.local_position = inputs.local_position;
        self.manual_control = inputs.manual_control;
        self.telemetry = inputs.telemetry;
        self.battery = inputs.battery;
        self.safety = inputs.safety;
        self.mission = inputs.mission;

        let local = inputs.local_position;
        self.flags.global_position_valid = inputs.global_position.is_some();
        self.flags.local_position_valid = local.is_some_and(|l| l.xy_valid);
        self.flags.local_altitude_valid = local.is_some_and(|l| l.z_valid);
        self.flags.local_velocity_valid = local.is_some_and(|l| l.v_xy_valid);
        self.flags.auto_mission_available = inputs.mission.valid && inputs.mission.seq_total > 0;
        self.flags.offboard_control_signal_lost = inputs.offboard_signal_lost;

        // Hand over to loiter once the navigator reports the climb done
        if self.arm_state.is_armed()
            && !self.land.landed
            && matches!(
                self.status.nav_state,
                NavState::AutoTakeoff | NavState::AutoVtolTakeoff
            )
            && inputs.mission.finished
            && inputs.mission.timestamp >= self.status.nav_state_timestamp
        {
            let _ = main_state_transition(
                &self.status,
                MainState::AutoLoiter,
                &self.flags,
                &mut self.commander_state,
                now_us,
            );
        }

        if !self.arm_state.is_armed()
            && self.params.home_enabled
            && !self.flags.home_position_valid
            && now_us > INAIR_RESTART_HOLDOFF_US
        {
            let _ = self.set_home_position(now_us);
        }
    }

    fn check_auto_disarm(&mut self, now_us: u64) {
        if !self.arm_state.is_armed() {
            self.auto_disarm_landed.reset(false);
            self.auto_disarm_killed.reset(false);
            return;
        }

        // An unfinished mission may still hold a takeoff or a second leg
        let mission_active = self.commander_state.main_state == MainState::AutoMission
            && !self.mission.finished;

        if self.have_taken_off && self.params.disarm_land_s > 0.0 {
            self.auto_disarm_landed
                .set_hysteresis_time_from(false, secs_to_us(self.params.disarm_land_s));
            self.auto_disarm_landed
                .set_state_and_update(self.land.landed && !mission_active, now_us);
        } else if !self.have_taken_off && self.params.disarm_preflight_s > 0.0 {
            self.auto_disarm_landed
                .set_hysteresis_time_from(false, secs_to_us(self.params.disarm_preflight_s));
            self.auto_disarm_landed.set_state_and_update(true, now_us);
        }

        if self.auto_disarm_landed.state() {
            let reason = if self.have_taken_off {
                ArmDisarmReason::AutoDisarmLand
            } else {
                ArmDisarmReason::AutoDisarmPreflight
            };
            let _ = self.disarm(reason, false, now_us);
            self.auto_disarm_landed.reset(false);
        }

        let killed = self.armed.is_locked_down();
        self.auto_disarm_killed
            .set_hysteresis_time_from(false, secs_to_us(self.params.kill_disarm_s));
        self.auto_disarm_killed.set_state_and_update(killed, now_us);

        if self.auto_disarm_killed.state() {
            let reason = if self.armed.manual_lockdown {
                ArmDisarmReason::KillSwitch
            } else {
                ArmDisarmReason::Lockdown
            };
            let _ = self.disarm(reason, true, now_us);
            self.auto_disarm_killed.reset(false);
        }
    }

    fn check_battery(&mut self, now_us: u64) {
        let ctx = BatteryContext {
            armed: self.arm_state.is_armed(),
            home_valid: self.flags.home_position_valid,
            main_state_changes: self.commander_state.main_state_changes,
            action: self.params.low_battery_action,
            reaction_delay_us: secs_to_us(self.params.battery_action_delay_s),
        };
        self.battery_failsafe
            .update(&self.battery, &ctx, now_us, &mut self.events);

        self.flags.battery_warning = self.battery.warning;
        self.flags.battery_low_remaining_time = self.battery.low_remaining_time();
    }

    /// INIT → STANDBY once boot settled and no worker task holds INIT
    fn check_init_complete(&mut self, now_us: u64) {
        if !self.arm_state.is_init()
            || now_us <= INAIR_RESTART_HOLDOFF_US
            || self.flags.calibration_enabled
            || self.worker.is_busy()
        {
            return;
        }

        let request = ArmRequest::new(ArmingState::Standby, ArmDisarmReason::TransitionToStandby);
        let _ = self.arm_state.request(
            &request,
            &mut self.status,
            &mut self.armed,
            &mut self.health,
            now_us,
            &mut self.events,
        );
    }

    fn check_geofence(&mut self, geofence: GeofenceResult) {
        self.geofence = geofence;
        self.status.geofence_violated = geofence.geofence_violated;

        let armed = self.arm_state.is_armed();
        if self.geofence_edge.update(geofence.geofence_violated && armed) == Edge::Rising {
            self.events.push_fmt(
                "commander_geofence_violation",
                Severity::Critical,
                format_args!("Geofence violated, action {:?}", geofence.geofence_action),
            );
        }
    }

    fn check_manual_control(&mut self, now_us: u64) {
        let manual = self.manual_control;
        let last_seen = if manual.valid { manual.timestamp } else { 0 };
        let timeout = secs_to_us(self.params.rc_loss_timeout_s);
        let armed = self.arm_state.is_armed();

        match self.rc_link.update(last_seen, now_us, timeout) {
            LinkEvent::Connected => {
                self.flags.rc_signal_found_once = true;
                self.status.rc_signal_lost = false;
                self.events
                    .push("commander_rc_found", Severity::Info, "Manual control found");
            }
            LinkEvent::Lost => {
                self.status.rc_signal_lost = true;
                if armed {
                    self.events
                        .push("commander_rc_lost", Severity::Critical, "Manual control lost");
                }
            }
            LinkEvent::Regained => {
                self.status.rc_signal_lost = false;
                self.events.push(
                    "commander_rc_regained",
                    Severity::Info,
                    "Manual control regained",
                );
            }
            LinkEvent::None => {}
        }

        if self.status.rc_signal_lost {
            return;
        }

        self.throttle_low = manual.throttle < THROTTLE_LOW;
        self.throttle_above_center = manual.throttle > THROTTLE_CENTER;

        if armed {
            self.check_pilot_override(now_us);
        } else if self.commander_state.main_state_changes == 0 {
            // First RC contact on the ground picks position control
            let _ = main_state_transition(
                &self.status,
                MainState::Posctl,
                &self.flags,
                &mut self.commander_state,
                now_us,
            );
        }
    }

    /// Stick movement takes over an automatic or offboard multicopter.
    fn check_pilot_override(&mut self, now_us: u64) {
        let main_state = self.commander_state.main_state;
        let auto = self.params.rc_override.contains(RcOverrideModes::AUTO)
            && matches!(
                main_state,
                MainState::AutoTakeoff
                    | MainState::AutoLoiter
                    | MainState::AutoMission
                    | MainState::AutoRtl
                    | MainState::AutoLand
                    | MainState::AutoPrecland
            );
        let offboard = self.params.rc_override.contains(RcOverrideModes::OFFBOARD)
            && main_state == MainState::Offboard;

        if !self.manual_control.sticks_moving
            || self.flags.rc_calibration_in_progress
            || !self.status.is_rotary_wing()
            || self.status.in_transition_mode
            || !(auto || offboard)
        {
            return;
        }

        for target in [MainState::Posctl, MainState::Altctl] {
            let result = main_state_transition(
                &self.status,
                target,
                &self.flags,
                &mut self.commander_state,
                now_us,
            );
            if result.is_changed() {
                self.events.push_fmt(
                    "commander_rc_override",
                    Severity::Info,
                    format_args!("Pilot took over {} using sticks", target.nav_state()),
                );
                return;
            }
        }
    }

    fn check_data_links(&mut self, now_us: u64) {
        let timeout = secs_to_us(self.params.dl_loss_timeout_s);

        match self
            .gcs_link
            .update(self.telemetry.heartbeat_gcs_us, now_us, timeout)
        {
            LinkEvent::Connected => self.status.data_link_lost = false,
            LinkEvent::Lost => {
                self.status.data_link_lost = true;
                self.events.push(
                    "commander_gcs_lost",
                    Severity::Critical,
                    "Connection to ground station lost",
                );
            }
            LinkEvent::Regained => {
                self.status.data_link_lost = false;
                self.events.push(
                    "commander_gcs_regained",
                    Severity::Info,
                    "Data link regained",
                );
            }
            LinkEvent::None => {}
        }

        let _ = self
            .high_latency_link
            .update(self.telemetry.heartbeat_high_latency_us, now_us, timeout);
        self.status.high_latency_data_link_lost =
            self.high_latency_link.status() != LinkStatus::Active;
    }

    /// Without RC a vehicle that never selected a mode defaults to hold
    fn select_default_mode(&mut self, now_us: u64) {
        if self.arm_state.is_armed()
            || self.commander_state.main_state_changes != 0
            || !self.status.rc_signal_lost
            || !self.flags.global_position_valid
        {
            return;
        }

        let _ = main_state_transition(
            &self.status,
            MainState::AutoLoiter,
            &self.flags,
            &mut self.commander_state,
            now_us,
        );
    }

    fn check_failure_detector(&mut self, failures: FailureFlags, now_us: u64) {
        self.status.failure_detector_status = failures;

        if !self.arm_state.is_armed() || failures.is_empty() {
            return;
        }

        let spoolup_us = secs_to_us(self.params.spoolup_time_s);
        if failures.contains(FailureFlags::ARM_ESC)
            && now_us.saturating_sub(self.status.armed_time) < spoolup_us
            && self
                .disarm(ArmDisarmReason::FailureDetector, false, now_us)
                .is_changed()
        {
            self.events.push(
                "commander_fd_arm_esc",
                Severity::Critical,
                "ESCs did not respond to arm request",
            );
        }

        if failures.attitude_or_altitude() {
            let since_takeoff = now_us.saturating_sub(self.status.takeoff_time);
            let lockdown_window =
                !self.have_taken_off || since_takeoff < secs_to_us(self.params.lockdown_takeoff_s);

            if lockdown_window {
                if self.trigger_lockdown(
                    "commander_fd_lockdown",
                    "Critical failure detected: lockdown",
                ) {
                    self.status_changed = true;
                }
            } else if !self.params.flight_termination_disabled
                && self.trigger_termination(
                    "commander_fd_terminate",
                    "Critical failure detected: terminate flight",
                    now_us,
                )
            {
                self.status_changed = true;
            }
        }

        if failures.contains(FailureFlags::MOTOR) && self.motor_failure_latch.trigger() {
            self.events.push(
                "commander_fd_motor_failure",
                Severity::Critical,
                "Motor failure detected",
            );
            match self.params.actuator_failure_action {
                ActuatorFailureAction::Disabled => {}
                ActuatorFailureAction::Loiter => {
                    let _ = self.request_main_state(MainState::AutoLoiter, now_us);
                }
                ActuatorFailureAction::Land => {
                    let _ = self.request_main_state(MainState::AutoLand, now_us);
                }
                ActuatorFailureAction::ReturnToLaunch => {
                    let _ = self.request_main_state(MainState::AutoRtl, now_us);
                }
                ActuatorFailureAction::Terminate => {
                    if !self.params.flight_termination_disabled
                        && self.trigger_termination(
                            "commander_fd_motor_terminate",
                            "Motor failure: terminate flight",
                            now_us,
                        )
                    {
                        self.status_changed = true;
                    }
                }
            }
        }
    }

    /// Termination requested by the navigator, then a periodic reminder
    /// while any termination is active.
    fn check_mission_termination(&mut self, now_us: u64) {
        if self.arm_state.is_armed()
            && self.mission.flight_termination
            && !self.params.flight_termination_disabled
            && self.trigger_termination(
                "commander_mission_termination",
                "Navigator requested flight termination",
                now_us,
            )
        {
            self.status_changed = true;
        }

        if !self.armed.force_failsafe {
            return;
        }
        let due = self
            .termination_notice_us
            .map_or(true, |last| now_us.saturating_sub(last) >= TERMINATION_NOTICE_US);
        if due {
            self.events.push(
                "commander_termination_notice",
                Severity::Critical,
                "Flight termination active",
            );
            self.termination_notice_us = Some(now_us);
        }
    }

    fn check_flight_time(&mut self, now_us: u64) {
        if !self.arm_state.is_armed() || !self.have_taken_off {
            return;
        }

        let max_us = secs_to_us(self.params.flight_time_max_s);
        if max_us > 0
            && now_us.saturating_sub(self.status.takeoff_time) > max_us
            && self.flight_time_latch.trigger()
        {
            self.events.push(
                "commander_max_flight_time",
                Severity::Critical,
                "Maximum flight time reached, returning",
            );
            let _ = self.request_main_state(MainState::AutoRtl, now_us);
        }
    }

    fn update_armed_edges(&mut self, now_us: u64) {
        let armed = self.arm_state.is_armed();

        match self.armed_edge.update(armed) {
            Edge::Rising => self.have_taken_off = false,
            Edge::Falling => {
                self.last_disarm_us = Some(now_us);
                self.flight_time_latch.reset();
                self.motor_failure_latch.reset();

                // Do not arm straight back into a landing or a completed mission
                let main_state = self.commander_state.main_state;
                let landing = matches!(
                    main_state,
                    MainState::AutoLand | MainState::AutoPrecland | MainState::AutoRtl
                );
                if landing || (main_state == MainState::AutoMission && self.mission.finished) {
                    let _ = main_state_transition(
                        &self.status,
                        MainState::AutoLoiter,
                        &self.flags,
                        &mut self.commander_state,
                        now_us,
                    );
                }
            }
            Edge::None => {}
        }

        if armed && !self.have_taken_off && !self.land.landed {
            self.have_taken_off = true;
            self.status.takeoff_time = now_us;
            // Drop a preflight countdown started before liftoff
            self.auto_disarm_landed.reset(false);
            self.events
                .push("commander_takeoff", Severity::Info, "Takeoff detected");
        }
    }

    fn update_nav_state(&mut self, now_us: u64) -> bool {
        // A pending battery reaction outranks a fence breach until it fires
        let geofence = if self.battery_failsafe.is_delaying() {
            GeofenceResult {
                geofence_violated: false,
                ..self.geofence
            }
        } else {
            self.geofence
        };

        let mut decision = resolve(&FailsafeInputs {
            main_state: self.commander_state.main_state,
            status: &self.status,
            flags: &self.flags,
            armed: &self.armed,
            geofence: &geofence,
            mission: &self.mission,
            battery: self
                .battery_failsafe
                .override_mode(self.commander_state.main_state_changes),
            params: &self.params,
        });

        if decision.request_lockdown
            && self.trigger_lockdown("commander_failsafe_lockdown", "Failsafe: lockdown")
        {
            self.status_changed = true;
        }

        if decision.request_termination {
            if self.params.flight_termination_disabled {
                decision.nav_state = if self.flags.local_position_valid
                    || self.flags.global_position_valid
                {
                    NavState::AutoLand
                } else {
                    NavState::Descend
                };
                decision.request_termination = false;
            } else if self.trigger_termination(
                "commander_failsafe_terminate",
                "Failsafe: terminating flight",
                now_us,
            ) {
                self.status_changed = true;
            }
        }

        let changed = apply_decision(&mut self.status, &decision, now_us);

        match self.failsafe_edge.update(decision.failsafe) {
            Edge::Rising => self.events.push_fmt(
                "commander_failsafe_activated",
                Severity::Warning,
                format_args!("Failsafe activated: {}", self.status.nav_state),
            ),
            Edge::Falling => self.events.push(
                "commander_failsafe_cleared",
                Severity::Info,
                "Failsafe cleared",
            ),
            Edge::None => {}
        }

        self.control_mode =
            VehicleControlMode::for_nav_state(self.status.nav_state, self.arm_state.is_armed());
        self.last_decision = decision;
        changed
    }

    fn publish(&mut self, nav_state_changed: bool, now_us: u64) -> bool {
        self.armed.prearmed = self.armed.armed || (self.safety.button_available && self.safety.safety_off);

        if !self.arm_state.is_armed() {
            self.health.update(false);
            self.flags.pre_flight_checks_pass = self.health.checks_pass();
        }

        let tracked = self.tracked();
        let changed = nav_state_changed || self.status_changed || tracked != self.last_published;
        if !self.publish_gate.should_publish(changed, now_us) {
            return false;
        }

        self.status_changed = false;
        self.status.timestamp = now_us;
        self.flags.timestamp = now_us;
        self.armed.timestamp = now_us;
        self.control_mode.timestamp = now_us;
        self.last_published = tracked;
        true
    }

    fn tracked(&self) -> Published {
        let mut snapshot = Published {
            status: self.status,
            flags: self.flags,
            armed: self.armed,
            commander_state: self.commander_state,
        };
        snapshot.status.timestamp = 0;
        snapshot.status.nav_state_timestamp = 0;
        snapshot.flags.timestamp = 0;
        snapshot.armed.timestamp = 0;
        snapshot.commander_state.timestamp = 0;
        snapshot
    }

    /// Collect a finished worker task
    pub(super) fn poll_worker(&mut self) {
        if !self.worker.has_result() {
            return;
        }

        let result = self.worker.get_result_and_reset();
        self.armed.in_esc_calibration_mode = false;
        let calibration = core::mem::replace(&mut self.flags.calibration_enabled, false);

        match (calibration, result) {
            (true, WorkerStatus::Success) => {
                self.events
                    .push("commander_calibration_done", Severity::Info, "Calibration done")
            }
            (true, WorkerStatus::Failed(code)) => self.events.push_fmt(
                "commander_calibration_failed",
                Severity::Critical,
                format_args!("Calibration failed ({})", code),
            ),
            (false, WorkerStatus::Success) => {
                self.events
                    .push("commander_worker_done", Severity::Info, "Parameter operation done")
            }
            (false, WorkerStatus::Failed(code)) => self.events.push_fmt(
                "commander_worker_failed",
                Severity::Critical,
                format_args!("Parameter operation failed ({})", code),
            ),
        }

        self.health.update(true);
    }
}
