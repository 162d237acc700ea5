//! Vehicle command dispatch
//!
//! Every command addressed to this vehicle is answered with exactly one
//! acknowledgment, except those delegated to another subsystem. Commands
//! addressed elsewhere are dropped silently.

use crate::arming::{ArmDisarmReason, ArmRequest};
use crate::command::{
    main_state_for_mode, ActuatorTestRequest, ArmAction, ArmDisarm, Calibration, Command,
    CommandAck, CommandDecodeError, CommandDisposition, CommandResult, PowerAction, SetHome,
    StorageAction, TerminationLevel, VehicleCommand,
};
use crate::events::Severity;
use crate::failsafe::LinkStatus;
use crate::traits::{HealthChecks, WorkerRequest, WorkerTask};
use crate::vehicle::{ActuatorTest, ArmingState, HomePosition};

use super::{Commander, MainState};

/// Upper bound and default for actuator test durations
pub const ACTUATOR_TEST_MAX_MS: u32 = 3000;

impl<H: HealthChecks, W: WorkerTask> Commander<H, W> {
    /// Handle one inbound command.
    pub fn handle_command(&mut self, cmd: &VehicleCommand, now_us: u64) -> CommandDisposition {
        if !cmd.is_addressed_to(self.status.system_id, self.status.component_id) {
            return CommandDisposition::NotForUs;
        }

        let result = match Command::decode(cmd) {
            Ok(Command::Delegated) | Ok(Command::Calibration(Calibration::Temperature)) => {
                return CommandDisposition::Delegated;
            }
            Ok(command) => self.execute_command(cmd, command, now_us),
            Err(err) => self.reject_malformed(err),
        };

        let ack = CommandAck::for_command(cmd, result, now_us);
        self.outbox.push_ack(ack);
        CommandDisposition::Answered(ack)
    }

    fn reject_malformed(&mut self, err: CommandDecodeError) -> CommandResult {
        match err {
            CommandDecodeError::InvalidArmAction(_) => {
                self.events.push_fmt(
                    "commander_unsupported_arm_disarm_param",
                    Severity::Error,
                    format_args!("{}", err),
                );
                CommandResult::Unsupported
            }
            CommandDecodeError::NonFiniteHome => {
                self.events.push_fmt(
                    "commander_set_home_invalid",
                    Severity::Error,
                    format_args!("{}", err),
                );
                CommandResult::Denied
            }
            _ => CommandResult::Unsupported,
        }
    }

    fn execute_command(
        &mut self,
        cmd: &VehicleCommand,
        command: Command,
        now_us: u64,
    ) -> CommandResult {
        let reason = if cmd.from_external {
            ArmDisarmReason::CommandExternal
        } else {
            ArmDisarmReason::CommandInternal
        };

        match command {
            Command::ArmDisarm(request) => self.handle_arm_disarm(cmd, request, reason, now_us),
            Command::SetMode {
                base_mode,
                custom_main,
                custom_sub,
            } => match main_state_for_mode(base_mode, custom_main, custom_sub) {
                Some(target) => self.mode_result(target, now_us),
                None => {
                    self.events.push_fmt(
                        "commander_unsupported_mode",
                        Severity::Error,
                        format_args!("Unsupported mode {}/{}", custom_main, custom_sub),
                    );
                    CommandResult::Denied
                }
            },
            Command::Reposition { switch_to_loiter } => {
                if switch_to_loiter {
                    self.mode_result(MainState::AutoLoiter, now_us)
                } else {
                    CommandResult::Accepted
                }
            }
            Command::ReturnToLaunch => self.mode_result(MainState::AutoRtl, now_us),
            Command::Takeoff => self.mode_result(MainState::AutoTakeoff, now_us),
            Command::VtolTakeoff => {
                if self.status.is_vtol {
                    self.mode_result(MainState::AutoVtolTakeoff, now_us)
                } else {
                    self.events.push(
                        "commander_vtol_takeoff_denied",
                        Severity::Critical,
                        "VTOL takeoff only allowed for VTOL vehicles",
                    );
                    CommandResult::Denied
                }
            }
            Command::Land => self.mode_result(MainState::AutoLand, now_us),
            Command::PrecisionLand => self.mode_result(MainState::AutoPrecland, now_us),
            Command::Orbit => {
                if self.status.in_transition_mode {
                    CommandResult::TemporarilyRejected
                } else if self.status.is_fixed_wing() {
                    // Fixed-wing orbits are flown as a loiter
                    self.mode_result(MainState::AutoLoiter, now_us)
                } else {
                    self.mode_result(MainState::Orbit, now_us)
                }
            }
            Command::MissionStart { first_item } => self.handle_mission_start(first_item, now_us),
            Command::FlightTermination(level) => {
                self.handle_flight_termination(level, now_us);
                CommandResult::Accepted
            }
            Command::SetHome(home) => self.handle_set_home(home, now_us),
            Command::ControlHighLatency => {
                if self.high_latency_link.status() == LinkStatus::Active {
                    CommandResult::Accepted
                } else {
                    self.events.push(
                        "commander_high_latency_unavailable",
                        Severity::Critical,
                        "Control high latency failed, link unavailable",
                    );
                    CommandResult::Failed
                }
            }
            Command::ActuatorTest(request) => self.handle_actuator_test(request, now_us),
            Command::RebootShutdown(action) => self.handle_reboot_shutdown(action, reason, now_us),
            Command::Calibration(calibration) => {
                match self.prepare_worker(reason, now_us) {
                    Ok(()) => self.handle_calibration(calibration),
                    Err(result) => result,
                }
            }
            Command::MagCalibrationQuick {
                heading_rad,
                lat,
                lon,
            } => match self.prepare_worker(reason, now_us) {
                Ok(()) => {
                    self.start_calibration(WorkerRequest::MagCalibrationQuick {
                        heading_rad,
                        lat,
                        lon,
                    });
                    CommandResult::Accepted
                }
                Err(result) => result,
            },
            Command::Storage(action) => match self.prepare_worker(reason, now_us) {
                Ok(()) => {
                    self.worker.start_task(match action {
                        StorageAction::LoadDefault => WorkerRequest::ParamLoadDefault,
                        StorageAction::SaveDefault => WorkerRequest::ParamSaveDefault,
                        StorageAction::ResetAllConfig => WorkerRequest::ParamResetAllConfig,
                        StorageAction::ResetSensorFactory => WorkerRequest::ParamResetSensorFactory,
                        StorageAction::ResetAll => WorkerRequest::ParamResetAll,
                    });
                    CommandResult::Accepted
                }
                Err(result) => result,
            },
            Command::RunPrearmChecks => {
                self.health.update(true);
                self.flags.pre_flight_checks_pass = self.health.checks_pass();
                CommandResult::Accepted
            }
            Command::Delegated => CommandResult::Accepted,
        }
    }

    /// Main state request answered as accepted unless denied
    fn mode_result(&mut self, target: MainState, now_us: u64) -> CommandResult {
        if self.request_main_state(target, now_us).is_denied() {
            CommandResult::TemporarilyRejected
        } else {
            CommandResult::Accepted
        }
    }

    fn handle_arm_disarm(
        &mut self,
        cmd: &VehicleCommand,
        request: ArmDisarm,
        reason: ArmDisarmReason,
        now_us: u64,
    ) -> CommandResult {
        let result = match request.action {
            ArmAction::Arm => {
                let from_self = cmd.source_system == self.status.system_id
                    && cmd.source_component == self.status.component_id;

                if !request.forced && request.from_io && from_self && !self.arm_state.is_armed() {
                    self.arm_state.force_arm_state(
                        ArmingState::InAirRestore,
                        &mut self.status,
                        &mut self.armed,
                        now_us,
                    );
                    self.events.push(
                        "commander_in_air_restore",
                        Severity::Warning,
                        "In-air restart, restoring armed state",
                    );
                    self.arm(reason, false, now_us)
                } else {
                    self.arm(reason, cmd.from_external || !request.forced, now_us)
                }
            }
            ArmAction::Disarm => self.disarm(reason, request.forced, now_us),
        };

        if result.is_denied() {
            CommandResult::TemporarilyRejected
        } else {
            CommandResult::Accepted
        }
    }

    fn handle_mission_start(&mut self, first_item: f32, now_us: u64) -> CommandResult {
        if !self.flags.auto_mission_available {
            self.events.push(
                "commander_mission_start_no_mission",
                Severity::Critical,
                "Mission start denied, no valid mission",
            );
            return CommandResult::Denied;
        }

        let index_valid = first_item.is_finite()
            && first_item >= -1.0
            && first_item < self.mission.seq_total as f32;
        if !index_valid {
            return CommandResult::Denied;
        }

        if self.request_main_state(MainState::AutoMission, now_us).is_denied()
            || self.arm(ArmDisarmReason::MissionStart, true, now_us).is_denied()
        {
            self.events.push(
                "commander_mission_start_denied",
                Severity::Critical,
                "Mission start denied",
            );
            return CommandResult::Denied;
        }

        CommandResult::Accepted
    }

    fn handle_flight_termination(&mut self, level: TerminationLevel, now_us: u64) {
        match level {
            TerminationLevel::Lockdown => {
                if self.trigger_lockdown("commander_lockdown", "Lockdown engaged, motors off") {
                    self.status_changed = true;
                } else {
                    self.events
                        .push("commander_lockdown_active", Severity::Debug, "Lockdown already engaged");
                }
            }
            TerminationLevel::Terminate => {
                if self.latch_termination(
                    "commander_flight_termination",
                    "Flight termination commanded",
                    now_us,
                ) {
                    self.status_changed = true;
                } else {
                    self.events.push(
                        "commander_termination_active",
                        Severity::Debug,
                        "Flight termination already active",
                    );
                }
            }
            TerminationLevel::Clear => {
                self.clear_termination();
                self.events.push(
                    "commander_termination_cleared",
                    Severity::Warning,
                    "Lockdown and termination cleared",
                );
            }
        }
    }

    fn handle_set_home(&mut self, home: SetHome, now_us: u64) -> CommandResult {
        match home {
            SetHome::UseCurrentPosition => {
                if self.set_home_position(now_us) {
                    CommandResult::Accepted
                } else {
                    CommandResult::TemporarilyRejected
                }
            }
            SetHome::Location { lat, lon, alt, yaw } => {
                self.home = HomePosition {
                    timestamp: now_us,
                    lat,
                    lon,
                    alt,
                    yaw,
                    valid_hpos: true,
                    valid_alt: true,
                    manual_home: true,
                };
                self.flags.home_position_valid = true;
                self.events
                    .push("commander_home_set", Severity::Info, "Home position set");
                CommandResult::Accepted
            }
        }
    }

    fn handle_actuator_test(&mut self, request: ActuatorTestRequest, now_us: u64) -> CommandResult {
        if self.arm_state.is_armed() || self.safety.is_engaged() {
            self.events.push(
                "commander_actuator_test_denied",
                Severity::Critical,
                "Actuator test denied, disarm and disable safety first",
            );
            return CommandResult::Denied;
        }

        if !self.params.motor_test_enabled {
            self.events.push(
                "commander_motor_test_disabled",
                Severity::Critical,
                "Actuator test disabled by COM_MOT_TEST_EN",
            );
            return CommandResult::Denied;
        }

        let timeout_ms = if request.timeout_ms <= 0 || request.timeout_ms as u32 > ACTUATOR_TEST_MAX_MS {
            ACTUATOR_TEST_MAX_MS
        } else {
            request.timeout_ms as u32
        };

        self.outbox.set_actuator_test(ActuatorTest {
            timestamp: now_us,
            function: request.function,
            value: request.value,
            active: request.timeout_ms > 0,
            timeout_ms,
        });
        CommandResult::Accepted
    }

    fn handle_reboot_shutdown(
        &mut self,
        action: PowerAction,
        reason: ArmDisarmReason,
        now_us: u64,
    ) -> CommandResult {
        if action == PowerAction::None {
            return CommandResult::Accepted;
        }

        let request = ArmRequest {
            worker_busy: self.worker.is_busy(),
            ..ArmRequest::new(ArmingState::Shutdown, reason)
        };
        let result = self.arm_state.request(
            &request,
            &mut self.status,
            &mut self.armed,
            &mut self.health,
            now_us,
            &mut self.events,
        );

        if result.is_denied() {
            CommandResult::Denied
        } else {
            self.outbox.request_power(action);
            CommandResult::Accepted
        }
    }

    /// Gate shared by calibration and storage commands: refuse while armed,
    /// shutting down or busy, then drop back to INIT without checks.
    fn prepare_worker(&mut self, reason: ArmDisarmReason, now_us: u64) -> Result<(), CommandResult> {
        if self.arm_state.is_armed() || self.arm_state.is_shutdown() || self.worker.is_busy() {
            return Err(CommandResult::TemporarilyRejected);
        }

        let request = ArmRequest::new(ArmingState::Init, reason);
        let result = self.arm_state.request(
            &request,
            &mut self.status,
            &mut self.armed,
            &mut self.health,
            now_us,
            &mut self.events,
        );

        if result.is_denied() {
            Err(CommandResult::Denied)
        } else {
            Ok(())
        }
    }

    fn start_calibration(&mut self, request: WorkerRequest) {
        self.flags.calibration_enabled = true;
        self.worker.start_task(request);
    }

    fn handle_calibration(&mut self, calibration: Calibration) -> CommandResult {
        let request = match calibration {
            Calibration::Gyro => WorkerRequest::GyroCalibration,
            Calibration::Mag => WorkerRequest::MagCalibration,
            Calibration::Baro => WorkerRequest::BaroCalibration,
            Calibration::RcTrim => WorkerRequest::RcTrimCalibration,
            Calibration::Accel => WorkerRequest::AccelCalibration,
            Calibration::Level => WorkerRequest::LevelCalibration,
            Calibration::AccelQuick => WorkerRequest::AccelCalibrationQuick,
            Calibration::Airspeed => WorkerRequest::AirspeedCalibration,
            Calibration::RcStart => {
                self.flags.rc_calibration_in_progress = true;
                self.events.push(
                    "commander_calib_rc_off",
                    Severity::Info,
                    "Calibration: disabling RC input",
                );
                return CommandResult::Accepted;
            }
            Calibration::RcEnd => {
                if self.flags.rc_calibration_in_progress {
                    self.flags.rc_calibration_in_progress = false;
                    self.events.push(
                        "commander_calib_rc_on",
                        Severity::Info,
                        "Calibration: restoring RC input",
                    );
                }
                return CommandResult::Accepted;
            }
            Calibration::Esc => {
                if self.battery.connected {
                    self.events.push(
                        "commander_esc_calibration_battery",
                        Severity::Critical,
                        "ESC calibration denied, disconnect battery first",
                    );
                    return CommandResult::Denied;
                }
                if self.safety.is_engaged() {
                    self.events.push(
                        "commander_esc_calibration_denied",
                        Severity::Critical,
                        "ESC calibration denied, press safety button first",
                    );
                    return CommandResult::Denied;
                }
                self.armed.in_esc_calibration_mode = true;
                WorkerRequest::EscCalibration
            }
            // Answered by the temperature calibration module before dispatch
            Calibration::Temperature => return CommandResult::Accepted,
        };

        self.start_calibration(request);
        CommandResult::Accepted
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{commander, gcs_command, standby};
    use super::*;
    use crate::command::opcode;
    use crate::commander::CycleInputs;
    use crate::traits::{MockHealthChecks, WorkerStatus};
    use crate::vehicle::{ArmingState, LandDetected, SafetyState};

    fn arm_command(arm: bool, force: bool) -> VehicleCommand {
        let mut cmd = gcs_command(opcode::COMPONENT_ARM_DISARM);
        cmd.param1 = if arm { 1.0 } else { 0.0 };
        cmd.param2 = if force { 21196.0 } else { 0.0 };
        cmd
    }

    #[test]
    fn test_command_for_other_system_ignored() {
        let mut c = commander();
        let mut cmd = arm_command(true, false);
        cmd.target_system = 42;
        assert_eq!(c.handle_command(&cmd, 0), CommandDisposition::NotForUs);
        assert_eq!(c.outbox_mut().ack_count(), 0);
    }

    #[test]
    fn test_arm_denied_by_preflight_checks() {
        let mut c = commander();
        standby(&mut c);
        c.health_mut().arming_allowed = false;

        let disposition = c.handle_command(&arm_command(true, false), 2_000_000);
        assert_eq!(disposition.result(), Some(CommandResult::TemporarilyRejected));
        assert!(!c.armed().armed);
        assert_eq!(c.arming_state(), ArmingState::Standby);
        assert!(c.events_mut().contains("commander_arm_denied_preflight"));
    }

    #[test]
    fn test_arm_accepted_and_ack_routed() {
        let mut c = commander();
        standby(&mut c);

        let disposition = c.handle_command(&arm_command(true, false), 2_000_000);
        assert_eq!(disposition.result(), Some(CommandResult::Accepted));
        assert!(c.armed().armed);
        assert_eq!(c.status().armed_time, 2_000_000);

        let ack = c.outbox_mut().pop_ack().unwrap();
        assert_eq!(ack.target_system, 255);
        assert_eq!(ack.target_component, 190);
    }

    #[test]
    fn test_disarm_in_air_rejected_unless_forced() {
        let mut c = commander();
        standby(&mut c);
        let _ = c.handle_command(&arm_command(true, false), 2_000_000);
        c.land = LandDetected {
            landed: false,
            maybe_landed: false,
            ground_contact: false,
            ..Default::default()
        };
        c.commander_state.main_state = MainState::AutoLoiter;
        c.control_mode = crate::vehicle::VehicleControlMode::for_nav_state(
            crate::vehicle::NavState::AutoLoiter,
            true,
        );

        let disposition = c.handle_command(&arm_command(false, false), 3_000_000);
        assert_eq!(disposition.result(), Some(CommandResult::TemporarilyRejected));
        assert!(c.armed().armed);
        assert!(c.events_mut().contains("commander_disarm_denied_not_landed"));

        let disposition = c.handle_command(&arm_command(false, true), 3_100_000);
        assert_eq!(disposition.result(), Some(CommandResult::Accepted));
        assert!(!c.armed().armed);
    }

    #[test]
    fn test_invalid_arm_param_unsupported() {
        let mut c = commander();
        let mut cmd = arm_command(true, false);
        cmd.param1 = 3.0;
        let disposition = c.handle_command(&cmd, 0);
        assert_eq!(disposition.result(), Some(CommandResult::Unsupported));
        assert!(c.events_mut().contains("commander_unsupported_arm_disarm_param"));
    }

    #[test]
    fn test_in_air_restore_from_io() {
        let mut c = Commander::new(
            Default::default(),
            MockHealthChecks::failing(),
            crate::traits::MockWorker::default(),
        );
        let mut cmd = VehicleCommand::new(opcode::COMPONENT_ARM_DISARM);
        cmd.param1 = 1.0;
        cmd.param3 = 1234.0;
        cmd.source_system = 1;
        cmd.source_component = 1;

        let disposition = c.handle_command(&cmd, 100);
        assert_eq!(disposition.result(), Some(CommandResult::Accepted));
        assert_eq!(c.arming_state(), ArmingState::Armed);
    }

    #[test]
    fn test_set_mode_unknown_denied() {
        let mut c = commander();
        let mut cmd = gcs_command(opcode::DO_SET_MODE);
        cmd.param1 = 1.0;
        cmd.param2 = 99.0;
        cmd.param3 = 0.0;
        assert_eq!(
            c.handle_command(&cmd, 0).result(),
            Some(CommandResult::Denied)
        );
    }

    #[test]
    fn test_rtl_without_position_rejected() {
        let mut c = commander();
        let cmd = gcs_command(opcode::NAV_RETURN_TO_LAUNCH);
        assert_eq!(
            c.handle_command(&cmd, 0).result(),
            Some(CommandResult::TemporarilyRejected)
        );
        assert!(c.events_mut().contains("commander_mode_denied"));
    }

    #[test]
    fn test_termination_fires_parachute_once() {
        let mut c = commander();
        let mut cmd = gcs_command(opcode::DO_FLIGHTTERMINATION);
        cmd.param1 = 1.0;

        for _ in 0..2 {
            assert_eq!(
                c.handle_command(&cmd, 0).result(),
                Some(CommandResult::Accepted)
            );
        }
        assert!(c.armed().force_failsafe);
        assert_eq!(c.outbox_mut().command_count(opcode::DO_PARACHUTE), 1);
        assert_eq!(c.events_mut().count("commander_flight_termination"), 1);
        assert_eq!(c.events_mut().count("commander_termination_active"), 1);

        cmd.param1 = 0.0;
        let _ = c.handle_command(&cmd, 0);
        assert!(!c.armed().force_failsafe);
        assert!(!c.armed().lockdown);
    }

    #[test]
    fn test_lockdown_idempotent() {
        let mut c = commander();
        let mut cmd = gcs_command(opcode::DO_FLIGHTTERMINATION);
        cmd.param1 = 2.0;
        let _ = c.handle_command(&cmd, 0);
        let _ = c.handle_command(&cmd, 1);
        assert!(c.armed().lockdown);
        assert_eq!(c.events_mut().count("commander_lockdown"), 1);
        assert_eq!(c.events_mut().count("commander_lockdown_active"), 1);
        assert_eq!(c.outbox_mut().command_count(opcode::DO_PARACHUTE), 0);
    }

    #[test]
    fn test_lockdown_command_publishes_on_edge_only() {
        let mut c = commander();
        standby(&mut c);
        let _ = c.run_cycle(&CycleInputs::default(), 1_600_000);

        let mut cmd = gcs_command(opcode::DO_FLIGHTTERMINATION);
        cmd.param1 = 2.0;
        let commands = [cmd];
        let inputs = CycleInputs {
            commands: &commands,
            ..CycleInputs::default()
        };
        assert!(c.run_cycle(&inputs, 1_700_000).published);
        // Repeat within the rate limit changes nothing and stays quiet
        assert!(!c.run_cycle(&inputs, 1_800_000).published);
    }

    #[test]
    fn test_set_home_explicit_location() {
        let mut c = commander();
        let mut cmd = gcs_command(opcode::DO_SET_HOME);
        cmd.param1 = 0.0;
        cmd.param4 = 0.0;
        cmd.param5 = 47.4;
        cmd.param6 = 8.5;
        cmd.param7 = 500.0;
        assert_eq!(
            c.handle_command(&cmd, 10).result(),
            Some(CommandResult::Accepted)
        );
        assert!(c.home().manual_home);
        assert!(c.flags().home_position_valid);

        cmd.param7 = f32::INFINITY;
        assert_eq!(
            c.handle_command(&cmd, 20).result(),
            Some(CommandResult::Denied)
        );
    }

    #[test]
    fn test_calibration_gating() {
        let mut c = commander();
        standby(&mut c);

        let mut cmd = gcs_command(opcode::PREFLIGHT_CALIBRATION);
        cmd.param1 = 1.0;

        assert_eq!(
            c.handle_command(&cmd, 2_000_000).result(),
            Some(CommandResult::Accepted)
        );
        assert_eq!(c.arming_state(), ArmingState::Init);
        assert!(c.flags().calibration_enabled);
        assert_eq!(c.worker_mut().started, Some(WorkerRequest::GyroCalibration));

        // Only one worker task in flight
        assert_eq!(
            c.handle_command(&cmd, 2_100_000).result(),
            Some(CommandResult::TemporarilyRejected)
        );
        assert_eq!(c.worker_mut().start_count, 1);

        c.worker_mut().complete(WorkerStatus::Success);
        c.poll_worker();
        assert!(!c.flags().calibration_enabled);
    }

    #[test]
    fn test_calibration_rejected_while_armed() {
        let mut c = commander();
        standby(&mut c);
        let _ = c.handle_command(&arm_command(true, false), 2_000_000);

        let mut cmd = gcs_command(opcode::PREFLIGHT_CALIBRATION);
        cmd.param1 = 1.0;
        assert_eq!(
            c.handle_command(&cmd, 2_100_000).result(),
            Some(CommandResult::TemporarilyRejected)
        );
        assert_eq!(c.worker_mut().start_count, 0);
    }

    #[test]
    fn test_esc_calibration_requires_disconnected_battery() {
        let mut c = commander();
        standby(&mut c);
        c.battery.connected = true;

        let mut cmd = gcs_command(opcode::PREFLIGHT_CALIBRATION);
        cmd.param1 = 0.0;
        cmd.param2 = 0.0;
        cmd.param3 = 0.0;
        cmd.param4 = 0.0;
        cmd.param5 = 0.0;
        cmd.param6 = 0.0;
        cmd.param7 = 1.0;
        assert_eq!(
            c.handle_command(&cmd, 2_000_000).result(),
            Some(CommandResult::Denied)
        );

        c.battery.connected = false;
        assert_eq!(
            c.handle_command(&cmd, 2_100_000).result(),
            Some(CommandResult::Accepted)
        );
        assert!(c.armed().in_esc_calibration_mode);
    }

    #[test]
    fn test_rc_calibration_flag() {
        let mut c = commander();
        standby(&mut c);

        let mut cmd = gcs_command(opcode::PREFLIGHT_CALIBRATION);
        cmd.param1 = 0.0;
        cmd.param2 = 0.0;
        cmd.param3 = 0.0;
        cmd.param4 = 1.0;
        cmd.param5 = 0.0;
        cmd.param6 = 0.0;
        cmd.param7 = 0.0;
        let _ = c.handle_command(&cmd, 2_000_000);
        assert!(c.flags().rc_calibration_in_progress);

        cmd.param4 = 0.0;
        let _ = c.handle_command(&cmd, 2_100_000);
        assert!(!c.flags().rc_calibration_in_progress);
        assert!(c.events_mut().contains("commander_calib_rc_on"));
    }

    #[test]
    fn test_temperature_calibration_delegated() {
        let mut c = commander();
        let mut cmd = gcs_command(opcode::PREFLIGHT_CALIBRATION);
        cmd.param1 = 3.0;
        assert_eq!(c.handle_command(&cmd, 0), CommandDisposition::Delegated);
        assert_eq!(c.outbox_mut().ack_count(), 0);
    }

    #[test]
    fn test_storage_commands() {
        let mut c = commander();
        standby(&mut c);

        let mut cmd = gcs_command(opcode::PREFLIGHT_STORAGE);
        cmd.param1 = 9.0;
        assert_eq!(
            c.handle_command(&cmd, 2_000_000).result(),
            Some(CommandResult::Unsupported)
        );

        cmd.param1 = 4.0;
        assert_eq!(
            c.handle_command(&cmd, 2_000_000).result(),
            Some(CommandResult::Accepted)
        );
        assert_eq!(c.worker_mut().started, Some(WorkerRequest::ParamResetAll));
        assert!(!c.flags().calibration_enabled);
    }

    #[test]
    fn test_actuator_test_rules() {
        let mut c = commander();
        c.safety = SafetyState {
            button_available: true,
            safety_off: false,
        };

        let mut cmd = gcs_command(opcode::ACTUATOR_TEST);
        cmd.param1 = 0.3;
        cmd.param2 = 10.0;
        cmd.param5 = 2.0;
        assert_eq!(
            c.handle_command(&cmd, 0).result(),
            Some(CommandResult::Denied)
        );

        c.safety.safety_off = true;
        assert_eq!(
            c.handle_command(&cmd, 0).result(),
            Some(CommandResult::Accepted)
        );
        let test = c.outbox_mut().take_actuator_test().unwrap();
        assert_eq!(test.function, 102);
        assert!(test.active);
        assert_eq!(test.timeout_ms, ACTUATOR_TEST_MAX_MS);

        c.params.motor_test_enabled = false;
        assert_eq!(
            c.handle_command(&cmd, 0).result(),
            Some(CommandResult::Denied)
        );
    }

    #[test]
    fn test_reboot_requires_disarmed() {
        let mut c = commander();
        standby(&mut c);
        let _ = c.handle_command(&arm_command(true, false), 2_000_000);

        let mut cmd = gcs_command(opcode::PREFLIGHT_REBOOT_SHUTDOWN);
        cmd.param1 = 1.0;
        assert_eq!(
            c.handle_command(&cmd, 2_100_000).result(),
            Some(CommandResult::Denied)
        );
        assert_eq!(c.outbox_mut().take_power_request(), None);

        let _ = c.handle_command(&arm_command(false, false), 2_200_000);
        assert_eq!(
            c.handle_command(&cmd, 2_300_000).result(),
            Some(CommandResult::Accepted)
        );
        assert_eq!(c.outbox_mut().take_power_request(), Some(PowerAction::Reboot));
        assert_eq!(c.arming_state(), ArmingState::Shutdown);

        cmd.param1 = 0.0;
        assert_eq!(
            c.handle_command(&cmd, 2_400_000).result(),
            Some(CommandResult::Accepted)
        );
    }

    #[test]
    fn test_delegated_command_not_acked() {
        let mut c = commander();
        let cmd = gcs_command(opcode::DO_CHANGE_SPEED);
        assert_eq!(c.handle_command(&cmd, 0), CommandDisposition::Delegated);
        assert_eq!(c.outbox_mut().ack_count(), 0);
    }

    #[test]
    fn test_unknown_command_unsupported() {
        let mut c = commander();
        let cmd = gcs_command(opcode::NAV_WAYPOINT);
        assert_eq!(
            c.handle_command(&cmd, 0).result(),
            Some(CommandResult::Unsupported)
        );
    }

    #[test]
    fn test_high_latency_without_link_fails() {
        let mut c = commander();
        let cmd = gcs_command(opcode::CONTROL_HIGH_LATENCY);
        assert_eq!(
            c.handle_command(&cmd, 0).result(),
            Some(CommandResult::Failed)
        );
    }
}
