//! MAVLink wire adapter
//!
//! Converts between wire records and the decision core's typed records.
//! This is the only place that knows about the bit-packed MAVLink
//! representation.
//!
//! # Inbound
//!
//! - `COMMAND_LONG` / `COMMAND_INT` → [`VehicleCommand`] on the command topic
//! - `HEARTBEAT` from a ground station → [`TelemetryStatus`] link times
//!
//! # Outbound
//!
//! - [`CommandAck`] from the ack queue → `COMMAND_ACK`, only for commands
//!   that arrived over the link
//! - `HEARTBEAT` built from the latest published vehicle status

use heapless::{Deque, Vec};
use mavlink::common::{
    MavAutopilot, MavCmd, MavFrame, MavMessage, MavModeFlag, MavResult, MavState, MavType,
    COMMAND_ACK_DATA, COMMAND_INT_DATA, COMMAND_LONG_DATA, HEARTBEAT_DATA,
};
use mavlink::MavHeader;
use warden_core::command::{custom_mode_for_nav_state, CommandAck, CommandResult, VehicleCommand};
use warden_core::vehicle::{
    ArmingState, NavState, TelemetryStatus, VehicleControlMode, VehicleStatus, VehicleType,
};

use crate::bus::{Bus, ACK_QUEUE_LEN};

/// Wire command ids remembered for routing acknowledgments back
const ORIGIN_LEN: usize = 8;

/// `COMMAND_INT` x/y value meaning "not set"
const INT_PARAM_UNSET: i32 = i32::MAX;

pub fn vehicle_command_from_long(
    msg: &COMMAND_LONG_DATA,
    header: &MavHeader,
    now_us: u64,
) -> VehicleCommand {
    VehicleCommand {
        timestamp: now_us,
        command: msg.command as u16,
        param1: msg.param1,
        param2: msg.param2,
        param3: msg.param3,
        param4: msg.param4,
        param5: msg.param5 as f64,
        param6: msg.param6 as f64,
        param7: msg.param7,
        target_system: msg.target_system,
        target_component: msg.target_component,
        source_system: header.system_id,
        source_component: header.component_id,
        confirmation: msg.confirmation,
        from_external: true,
    }
}

fn int_position(value: i32, frame: MavFrame) -> f64 {
    if value == INT_PARAM_UNSET {
        return f64::NAN;
    }
    match frame {
        MavFrame::MAV_FRAME_LOCAL_NED | MavFrame::MAV_FRAME_LOCAL_ENU | MavFrame::MAV_FRAME_MISSION => {
            value as f64
        }
        // Global frames carry degrees * 1e7
        _ => value as f64 * 1e-7,
    }
}

pub fn vehicle_command_from_int(
    msg: &COMMAND_INT_DATA,
    header: &MavHeader,
    now_us: u64,
) -> VehicleCommand {
    VehicleCommand {
        timestamp: now_us,
        command: msg.command as u16,
        param1: msg.param1,
        param2: msg.param2,
        param3: msg.param3,
        param4: msg.param4,
        param5: int_position(msg.x, msg.frame),
        param6: int_position(msg.y, msg.frame),
        param7: msg.z,
        target_system: msg.target_system,
        target_component: msg.target_component,
        source_system: header.system_id,
        source_component: header.component_id,
        confirmation: 0,
        from_external: true,
    }
}

pub fn mav_result(result: CommandResult) -> MavResult {
    match result {
        CommandResult::Accepted => MavResult::MAV_RESULT_ACCEPTED,
        CommandResult::TemporarilyRejected => MavResult::MAV_RESULT_TEMPORARILY_REJECTED,
        CommandResult::Denied => MavResult::MAV_RESULT_DENIED,
        CommandResult::Unsupported => MavResult::MAV_RESULT_UNSUPPORTED,
        CommandResult::Failed => MavResult::MAV_RESULT_FAILED,
        CommandResult::InProgress => MavResult::MAV_RESULT_IN_PROGRESS,
    }
}

pub fn command_ack_data(ack: &CommandAck, command: MavCmd) -> COMMAND_ACK_DATA {
    COMMAND_ACK_DATA {
        command,
        result: mav_result(ack.result),
        progress: 0,
        result_param2: 0,
        target_system: ack.target_system,
        target_component: ack.target_component,
    }
}

fn mav_type(status: &VehicleStatus) -> MavType {
    match (status.vehicle_type, status.is_vtol) {
        (_, true) => MavType::MAV_TYPE_VTOL_TILTROTOR,
        (VehicleType::RotaryWing, false) => MavType::MAV_TYPE_QUADROTOR,
        (VehicleType::FixedWing, false) => MavType::MAV_TYPE_FIXED_WING,
        (VehicleType::Rover, false) => MavType::MAV_TYPE_GROUND_ROVER,
    }
}

fn system_state(status: &VehicleStatus) -> MavState {
    if status.nav_state == NavState::Termination {
        return MavState::MAV_STATE_FLIGHT_TERMINATION;
    }
    match status.arming_state {
        ArmingState::Init => MavState::MAV_STATE_BOOT,
        ArmingState::Standby => MavState::MAV_STATE_STANDBY,
        ArmingState::StandbyError => MavState::MAV_STATE_CRITICAL,
        ArmingState::Shutdown => MavState::MAV_STATE_POWEROFF,
        ArmingState::Armed | ArmingState::InAirRestore if status.failsafe => {
            MavState::MAV_STATE_CRITICAL
        }
        ArmingState::Armed | ArmingState::InAirRestore => MavState::MAV_STATE_ACTIVE,
    }
}

pub fn heartbeat_data(status: &VehicleStatus, control_mode: &VehicleControlMode) -> HEARTBEAT_DATA {
    let mut base_mode = MavModeFlag::MAV_MODE_FLAG_CUSTOM_MODE_ENABLED;
    if status.is_armed() {
        base_mode |= MavModeFlag::MAV_MODE_FLAG_SAFETY_ARMED;
    }
    if control_mode.manual_enabled {
        base_mode |= MavModeFlag::MAV_MODE_FLAG_MANUAL_INPUT_ENABLED;
    }
    if control_mode.attitude_enabled {
        base_mode |= MavModeFlag::MAV_MODE_FLAG_STABILIZE_ENABLED;
    }
    if control_mode.position_enabled {
        base_mode |= MavModeFlag::MAV_MODE_FLAG_GUIDED_ENABLED;
    }
    if control_mode.auto_enabled {
        base_mode |= MavModeFlag::MAV_MODE_FLAG_AUTO_ENABLED;
    }

    HEARTBEAT_DATA {
        custom_mode: custom_mode_for_nav_state(status.nav_state),
        mavtype: mav_type(status),
        autopilot: MavAutopilot::MAV_AUTOPILOT_PX4,
        base_mode,
        system_status: system_state(status),
        mavlink_version: 3,
    }
}

/// Link-side bridge between the wire and the bus
pub struct MavlinkAdapter<'b> {
    bus: &'b Bus,
    origins: Deque<(u16, MavCmd), ORIGIN_LEN>,
    telemetry: TelemetryStatus,
}

impl<'b> MavlinkAdapter<'b> {
    pub fn new(bus: &'b Bus) -> Self {
        Self {
            bus,
            origins: Deque::new(),
            telemetry: TelemetryStatus::default(),
        }
    }

    /// Feed one received message. Returns `true` when it was consumed.
    pub fn handle_message(&mut self, header: &MavHeader, msg: &MavMessage, now_us: u64) -> bool {
        match msg {
            MavMessage::COMMAND_LONG(data) => {
                crate::log_debug!("Received COMMAND_LONG: command={}", data.command as u32);
                self.remember_origin(data.command);
                self.bus
                    .vehicle_command
                    .publish(vehicle_command_from_long(data, header, now_us));
                true
            }
            MavMessage::COMMAND_INT(data) => {
                crate::log_debug!("Received COMMAND_INT: command={}", data.command as u32);
                self.remember_origin(data.command);
                self.bus
                    .vehicle_command
                    .publish(vehicle_command_from_int(data, header, now_us));
                true
            }
            MavMessage::HEARTBEAT(data) if data.mavtype == MavType::MAV_TYPE_GCS => {
                self.telemetry.timestamp = now_us;
                self.telemetry.heartbeat_gcs_us = now_us;
                self.bus.telemetry_status.publish(self.telemetry);
                true
            }
            _ => false,
        }
    }

    fn remember_origin(&mut self, command: MavCmd) {
        let opcode = command as u16;
        if let Some(index) = self.origins.iter().position(|(op, _)| *op == opcode) {
            // Keep the most recent entry at the back
            let mut kept = Deque::new();
            for (i, entry) in self.origins.iter().enumerate() {
                if i != index {
                    let _ = kept.push_back(*entry);
                }
            }
            self.origins = kept;
        }
        if self.origins.is_full() {
            self.origins.pop_front();
        }
        let _ = self.origins.push_back((opcode, command));
    }

    fn origin(&self, opcode: u16) -> Option<MavCmd> {
        self.origins
            .iter()
            .find(|(op, _)| *op == opcode)
            .map(|(_, command)| *command)
    }

    /// Drain the ack queue into wire acknowledgments
    ///
    /// Acks for commands generated on board are dropped here; they were
    /// only meant for the bus.
    pub fn take_acks(&mut self) -> Vec<COMMAND_ACK_DATA, ACK_QUEUE_LEN> {
        let mut acks = Vec::new();
        while let Some(ack) = self.bus.command_ack.pop() {
            if !ack.from_external {
                continue;
            }
            match self.origin(ack.command) {
                Some(command) => {
                    let _ = acks.push(command_ack_data(&ack, command));
                }
                None => crate::log_warn!("No wire origin for ack of command {}", ack.command),
            }
        }
        acks
    }

    /// Heartbeat for the latest published status, once the commander
    /// published one
    pub fn heartbeat(&self) -> Option<HEARTBEAT_DATA> {
        let status = self.bus.vehicle_status.latest()?;
        let control_mode = self.bus.control_mode.latest().unwrap_or_default();
        Some(heartbeat_data(&status, &control_mode))
    }
}
