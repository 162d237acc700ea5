//! Commander: arming, mode arbitration and failure escalation
//!
//! [`Commander`] owns the vehicle status, the actuator safety flags, the
//! commander state and every latch and timer of the arbitration layer.
//! The runtime drives it through three entry points:
//!
//! - [`Commander::handle_command`] for inbound vehicle commands
//! - [`Commander::execute_action_request`] for pilot gestures
//! - [`Commander::run_cycle`] once per period, which also dispatches the
//!   commands and action request carried by its inputs
//!
//! Every call finishes its work before returning. Produced records
//! (acknowledgments, internal commands, actuator tests) are queued in the
//! [`Outbox`] and user-facing messages in the [`EventLog`].

pub mod action;
pub mod cycle;
pub mod dispatch;
pub mod main_state;
pub mod outbox;
pub mod publish;

pub use action::{Action, ActionRequest, ActionSource};
pub use cycle::{CycleInputs, CycleReport};
pub use main_state::{main_state_transition, CommanderState, MainState};
pub use outbox::Outbox;
pub use publish::PublishGate;

use crate::arming::{
    ArmDisarmReason, ArmRequest, ArmStateMachine, ArmingDenied, DisarmDenied,
};
use crate::events::{EventLog, Severity};
use crate::failsafe::{
    BatteryFailsafe, FailsafeDecision, FailsafeSource, GeofenceAction, Hysteresis, LinkMonitor,
};
use crate::latch::{EdgeDetector, OneShot};
use crate::parameters::CommanderParams;
use crate::traits::{HealthChecks, WorkerTask};
use crate::transition::TransitionResult;
use crate::vehicle::{
    ActuatorArmed, ArmingState, BatteryStatus, GeofenceResult, GlobalPosition, HomePosition,
    LandDetected, LocalPosition, ManualControlSetpoint, MissionResult, NavState, SafetyState,
    TelemetryStatus, VehicleControlMode, VehicleStatus, VehicleStatusFlags, VehicleType,
};

/// Arming within this window after a disarm skips preflight checks for
/// pilot gestures
pub const REARM_GRACE_US: u64 = 5_000_000;

/// Hold-off after boot before home capture and INIT→STANDBY
pub const INAIR_RESTART_HOLDOFF_US: u64 = 500_000;

/// Throttle below this counts as low
pub const THROTTLE_LOW: f32 = 0.1;

/// Throttle above this counts as above center
pub const THROTTLE_CENTER: f32 = 0.6;

/// Repeat period of the "Flight termination active" notice
pub const TERMINATION_NOTICE_US: u64 = 4_000_000;

pub struct Commander<H: HealthChecks, W: WorkerTask> {
    params: CommanderParams,
    param_generation: Option<u32>,

    status: VehicleStatus,
    flags: VehicleStatusFlags,
    armed: ActuatorArmed,
    commander_state: CommanderState,
    control_mode: VehicleControlMode,
    home: HomePosition,

    land: LandDetected,
    global_position: Option<GlobalPosition>,
    local_position: Option<LocalPosition>,
    manual_control: ManualControlSetpoint,
    telemetry: TelemetryStatus,
    battery: BatteryStatus,
    safety: SafetyState,
    geofence: GeofenceResult,
    mission: MissionResult,

    arm_state: ArmStateMachine,
    health: H,
    worker: W,
    events: EventLog,
    outbox: Outbox,

    lockdown_latch: OneShot,
    termination_latch: OneShot,
    kill_latch: OneShot,
    motor_failure_latch: OneShot,
    flight_time_latch: OneShot,
    armed_edge: EdgeDetector,
    geofence_edge: EdgeDetector,
    failsafe_edge: EdgeDetector,

    auto_disarm_landed: Hysteresis,
    auto_disarm_killed: Hysteresis,
    rc_link: LinkMonitor,
    gcs_link: LinkMonitor,
    high_latency_link: LinkMonitor,
    battery_failsafe: BatteryFailsafe,
    publish_gate: PublishGate,

    kill_source: Option<ActionSource>,
    last_disarm_us: Option<u64>,
    have_taken_off: bool,
    throttle_low: bool,
    throttle_above_center: bool,
    last_decision: FailsafeDecision,
    last_published: Published,
    /// Forces the next publish after a lockdown or termination edge
    status_changed: bool,
    termination_notice_us: Option<u64>,
}

/// Snapshot of the tracked fields at the last publish, timestamps zeroed
#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct Published {
    status: VehicleStatus,
    flags: VehicleStatusFlags,
    armed: ActuatorArmed,
    commander_state: CommanderState,
}

impl<H: HealthChecks, W: WorkerTask> Commander<H, W> {
    pub fn new(params: CommanderParams, health: H, worker: W) -> Self {
        let mut commander = Self {
            params,
            param_generation: None,
            status: VehicleStatus {
                rc_signal_lost: true,
                ..VehicleStatus::default()
            },
            flags: VehicleStatusFlags::default(),
            armed: ActuatorArmed::default(),
            commander_state: CommanderState::default(),
            control_mode: VehicleControlMode::default(),
            home: HomePosition {
                yaw: f32::NAN,
                ..HomePosition::default()
            },
            land: LandDetected::default(),
            global_position: None,
            local_position: None,
            manual_control: ManualControlSetpoint::default(),
            telemetry: TelemetryStatus::default(),
            battery: BatteryStatus::default(),
            safety: SafetyState::default(),
            geofence: GeofenceResult::default(),
            mission: MissionResult::default(),
            arm_state: ArmStateMachine::new(),
            health,
            worker,
            events: EventLog::new(),
            outbox: Outbox::new(),
            lockdown_latch: OneShot::new(),
            termination_latch: OneShot::new(),
            kill_latch: OneShot::new(),
            motor_failure_latch: OneShot::new(),
            flight_time_latch: OneShot::new(),
            armed_edge: EdgeDetector::new(false),
            geofence_edge: EdgeDetector::new(false),
            failsafe_edge: EdgeDetector::new(false),
            auto_disarm_landed: Hysteresis::new(false),
            auto_disarm_killed: Hysteresis::new(false),
            rc_link: LinkMonitor::new(),
            gcs_link: LinkMonitor::new(),
            high_latency_link: LinkMonitor::new(),
            battery_failsafe: BatteryFailsafe::new(),
            publish_gate: PublishGate::default(),
            kill_source: None,
            last_disarm_us: None,
            have_taken_off: false,
            throttle_low: false,
            throttle_above_center: false,
            last_decision: FailsafeDecision {
                nav_state: NavState::Manual,
                failsafe: false,
                source: FailsafeSource::None,
                request_lockdown: false,
                request_termination: false,
            },
            last_published: Published::default(),
            status_changed: false,
            termination_notice_us: None,
        };
        commander.apply_identity();
        commander
    }

    pub fn params(&self) -> &CommanderParams {
        &self.params
    }

    /// Replace the parameters. Ignored while armed.
    pub fn set_params(&mut self, params: CommanderParams) -> bool {
        if self.arm_state.is_armed() {
            return false;
        }
        self.params = params;
        self.apply_identity();
        true
    }

    pub fn status(&self) -> &VehicleStatus {
        &self.status
    }

    pub fn flags(&self) -> &VehicleStatusFlags {
        &self.flags
    }

    pub fn armed(&self) -> &ActuatorArmed {
        &self.armed
    }

    pub fn commander_state(&self) -> &CommanderState {
        &self.commander_state
    }

    pub fn control_mode(&self) -> &VehicleControlMode {
        &self.control_mode
    }

    pub fn home(&self) -> &HomePosition {
        &self.home
    }

    pub fn geofence_result(&self) -> &GeofenceResult {
        &self.geofence
    }

    pub fn last_decision(&self) -> &FailsafeDecision {
        &self.last_decision
    }

    pub fn arming_state(&self) -> ArmingState {
        self.arm_state.state()
    }

    pub fn have_taken_off(&self) -> bool {
        self.have_taken_off
    }

    pub fn events_mut(&mut self) -> &mut EventLog {
        &mut self.events
    }

    pub fn outbox_mut(&mut self) -> &mut Outbox {
        &mut self.outbox
    }

    pub fn health_mut(&mut self) -> &mut H {
        &mut self.health
    }

    pub fn worker_mut(&mut self) -> &mut W {
        &mut self.worker
    }

    fn apply_identity(&mut self) {
        let (vehicle_type, is_vtol) = VehicleType::from_mav_type(self.params.mav_type);
        self.status.system_id = self.params.system_id;
        self.status.component_id = self.params.component_id;
        self.status.vehicle_type = vehicle_type;
        self.status.is_vtol = is_vtol;
    }

    /// Request a main state change and report denials.
    fn request_main_state(&mut self, target: MainState, now_us: u64) -> TransitionResult {
        let result = main_state_transition(
            &self.status,
            target,
            &self.flags,
            &mut self.commander_state,
            now_us,
        );

        if result.is_denied() {
            self.events.push_fmt(
                "commander_mode_denied",
                Severity::Critical,
                format_args!("Switching to {} is currently not available", target.nav_state()),
            );
        }

        result
    }

    /// Arm, applying the pilot-gesture and geofence gates first.
    fn arm(
        &mut self,
        reason: ArmDisarmReason,
        run_preflight_checks: bool,
        now_us: u64,
    ) -> TransitionResult {
        if self.arm_state.is_armed() {
            return TransitionResult::NotChanged;
        }

        let within_grace = self
            .last_disarm_us
            .is_some_and(|t| now_us.saturating_sub(t) < REARM_GRACE_US);
        let run_checks = run_preflight_checks && !(reason.is_rc() && within_grace);

        if run_checks {
            if let Some(denied) = self.arm_gate(reason) {
                self.events
                    .push_fmt(denied.event_id(), Severity::Critical, format_args!("{}", denied));
                return TransitionResult::Denied;
            }
        }

        let request = ArmRequest {
            run_preflight_checks: run_checks,
            ..ArmRequest::new(ArmingState::Armed, reason)
        };
        let result = self.arm_state.request(
            &request,
            &mut self.status,
            &mut self.armed,
            &mut self.health,
            now_us,
            &mut self.events,
        );

        if result.is_changed() {
            self.events.push_fmt(
                "commander_armed_by",
                Severity::Info,
                format_args!("Armed by {}", reason),
            );
            self.have_taken_off = false;
            if self.params.home_enabled && now_us > INAIR_RESTART_HOLDOFF_US {
                let _ = self.set_home_position(now_us);
            }
        }

        result
    }

    fn arm_gate(&self, reason: ArmDisarmReason) -> Option<ArmingDenied> {
        let rc_available = !self.status.rc_signal_lost;

        if self.control_mode.manual_enabled {
            if self.control_mode.climb_rate_enabled && rc_available && self.throttle_above_center {
                return Some(ArmingDenied::ThrottleAboveCenter);
            }
            if !self.control_mode.climb_rate_enabled
                && rc_available
                && !self.throttle_low
                && !self.status.is_ground_vehicle()
            {
                return Some(ArmingDenied::ThrottleNotLow);
            }
        } else if reason.is_rc() {
            return Some(ArmingDenied::NotInManualMode);
        }

        if self.geofence.geofence_action == GeofenceAction::ReturnToLaunch
            && !self.flags.home_position_valid
        {
            return Some(ArmingDenied::GeofenceNeedsHome);
        }

        None
    }

    /// Disarm. Unless forced, requires the vehicle to be landed or a
    /// rotary-wing in manual thrust disarmed by a pilot gesture.
    fn disarm(&mut self, reason: ArmDisarmReason, forced: bool, now_us: u64) -> TransitionResult {
        if !self.arm_state.is_armed() {
            return TransitionResult::NotChanged;
        }

        let landed =
            self.land.landed || self.land.maybe_landed || self.status.is_ground_vehicle();
        let manual_thrust = self.status.is_rotary_wing()
            && self.control_mode.manual_enabled
            && !self.control_mode.climb_rate_enabled;
        let safe_to_disarm = landed || (manual_thrust && reason.is_rc());

        if !forced && !safe_to_disarm {
            if reason != ArmDisarmReason::CommandInternal {
                let denied = DisarmDenied::NotLanded;
                self.events
                    .push_fmt(denied.event_id(), Severity::Critical, format_args!("{}", denied));
            }
            return TransitionResult::Denied;
        }

        let request = ArmRequest {
            forced,
            safe_to_disarm,
            ..ArmRequest::new(ArmingState::Standby, reason)
        };
        let result = self.arm_state.request(
            &request,
            &mut self.status,
            &mut self.armed,
            &mut self.health,
            now_us,
            &mut self.events,
        );

        if result.is_changed() {
            self.events.push_fmt(
                "commander_disarmed_by",
                Severity::Info,
                format_args!("Disarmed by {}", reason),
            );
            self.last_disarm_us = Some(now_us);
        }

        result
    }

    /// Capture home from the current global position.
    fn set_home_position(&mut self, now_us: u64) -> bool {
        let Some(position) = self.global_position.filter(|_| self.flags.global_position_valid)
        else {
            return false;
        };

        let yaw = self
            .local_position
            .map(|local| local.heading)
            .unwrap_or(f32::NAN);

        self.home = HomePosition {
            timestamp: now_us,
            lat: position.lat,
            lon: position.lon,
            alt: position.alt,
            yaw,
            valid_hpos: true,
            valid_alt: true,
            manual_home: false,
        };
        self.flags.home_position_valid = true;
        self.events
            .push("commander_home_set", Severity::Info, "Home position set");
        true
    }

    /// Motors off, reversible. Returns `true` on the latching call.
    fn trigger_lockdown(&mut self, id: &'static str, text: &str) -> bool {
        if !self.lockdown_latch.trigger() {
            return false;
        }
        self.armed.lockdown = true;
        self.events.push(id, Severity::Emergency, text);
        true
    }

    /// Automatic termination with parachute release. Refused once a
    /// lockdown latched, at most once until cleared by command.
    fn trigger_termination(&mut self, id: &'static str, text: &str, now_us: u64) -> bool {
        if self.lockdown_latch.is_set() {
            return false;
        }
        self.latch_termination(id, text, now_us)
    }

    /// Termination regardless of a prior lockdown, for the explicit command.
    fn latch_termination(&mut self, id: &'static str, text: &str, now_us: u64) -> bool {
        if !self.termination_latch.trigger() {
            return false;
        }
        self.armed.force_failsafe = true;
        self.events.push(id, Severity::Emergency, text);
        self.outbox.push_parachute_release(
            self.status.system_id,
            self.status.component_id,
            now_us,
        );
        self.termination_notice_us = Some(now_us);
        true
    }

    fn clear_termination(&mut self) {
        self.armed.force_failsafe = false;
        self.armed.lockdown = false;
        self.lockdown_latch.reset();
        self.termination_latch.reset();
        self.termination_notice_us = None;
        self.status_changed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::VehicleCommand;
    use crate::traits::{MockHealthChecks, MockWorker};

    pub(crate) type TestCommander = Commander<MockHealthChecks, MockWorker>;

    pub(crate) fn commander() -> TestCommander {
        Commander::new(
            CommanderParams::default(),
            MockHealthChecks::passing(),
            MockWorker::default(),
        )
    }

    /// Command from a ground station addressed to system 1
    pub(crate) fn gcs_command(command: u16) -> VehicleCommand {
        let mut cmd = VehicleCommand::new(command);
        cmd.target_system = 1;
        cmd.target_component = 1;
        cmd.source_system = 255;
        cmd.source_component = 190;
        cmd.from_external = true;
        cmd
    }

    /// Run one idle cycle past the boot hold-off so the vehicle reaches STANDBY
    pub(crate) fn standby(c: &mut TestCommander) {
        let _ = c.run_cycle(&CycleInputs::default(), 1_000_000);
        assert_eq!(c.arming_state(), ArmingState::Standby);
    }

    #[test]
    fn test_initial_state() {
        let c = commander();
        assert_eq!(c.arming_state(), ArmingState::Init);
        assert!(c.status().rc_signal_lost);
        assert_eq!(c.status().system_id, 1);
        assert_eq!(c.commander_state().main_state, MainState::Manual);
    }

    #[test]
    fn test_params_rejected_while_armed() {
        let mut c = commander();
        c.arm_state
            .force_arm_state(ArmingState::Armed, &mut c.status, &mut c.armed, 0);
        let params = CommanderParams {
            system_id: 7,
            ..CommanderParams::default()
        };
        assert!(!c.set_params(params.clone()));
        assert_eq!(c.status().system_id, 1);

        c.arm_state
            .force_arm_state(ArmingState::Standby, &mut c.status, &mut c.armed, 0);
        assert!(c.set_params(params));
        assert_eq!(c.status().system_id, 7);
    }

    #[test]
    fn test_termination_latches_once() {
        let mut c = commander();
        assert!(c.trigger_termination("test_terminate", "terminate", 0));
        assert!(!c.trigger_termination("test_terminate", "terminate", 1));
        assert_eq!(
            c.outbox_mut().command_count(crate::command::opcode::DO_PARACHUTE),
            1
        );

        c.clear_termination();
        assert!(!c.armed().force_failsafe);
        assert!(c.trigger_termination("test_terminate", "terminate", 2));
    }

    #[test]
    fn test_lockdown_blocks_automatic_termination() {
        let mut c = commander();
        assert!(c.trigger_lockdown("test_lockdown", "lockdown"));
        assert!(!c.trigger_lockdown("test_lockdown", "lockdown"));
        assert!(!c.trigger_termination("test_terminate", "terminate", 1));
        assert!(!c.armed().force_failsafe);
        assert_eq!(
            c.outbox_mut().command_count(crate::command::opcode::DO_PARACHUTE),
            0
        );

        // The explicit command still terminates
        assert!(c.latch_termination("test_terminate", "terminate", 2));
        assert!(c.armed().force_failsafe);
    }

    #[test]
    fn test_home_needs_global_position() {
        let mut c = commander();
        assert!(!c.set_home_position(0));

        c.global_position = Some(GlobalPosition {
            lat: 47.0,
            lon: 8.0,
            alt: 400.0,
            ..Default::default()
        });
        c.flags.global_position_valid = true;
        assert!(c.set_home_position(10));
        assert!(c.flags().home_position_valid);
        assert_eq!(c.home().lat, 47.0);
    }
}
