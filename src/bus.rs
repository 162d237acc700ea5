//! Message bus shared by the commander, navigator and link tasks
//!
//! One [`Topic`] per published record plus the acknowledgment queue.
//! Firmware uses the [`BUS`] static; host tests build their own instance.

use warden_core::command::{CommandAck, PowerAction, VehicleCommand};
use warden_core::commander::{ActionRequest, CommanderState};
use warden_core::navigator::{PositionSetpointTriplet, VehicleRoi};
use warden_core::vehicle::{
    ActuatorArmed, ActuatorTest, GeofenceResult, HomePosition, MissionResult, TelemetryStatus,
    VehicleControlMode, VehicleStatus, VehicleStatusFlags,
};

use crate::topic::{Queue, Topic};

/// Acknowledgments buffered for the link task
pub const ACK_QUEUE_LEN: usize = 16;

pub struct Bus {
    // Inbound
    pub vehicle_command: Topic<VehicleCommand>,
    pub action_request: Topic<ActionRequest>,
    pub telemetry_status: Topic<TelemetryStatus>,

    // Commander
    pub vehicle_status: Topic<VehicleStatus>,
    pub status_flags: Topic<VehicleStatusFlags>,
    pub actuator_armed: Topic<ActuatorArmed>,
    pub control_mode: Topic<VehicleControlMode>,
    pub commander_state: Topic<CommanderState>,
    pub home_position: Topic<HomePosition>,
    pub actuator_test: Topic<ActuatorTest>,
    pub power_request: Topic<PowerAction>,

    // Navigator
    pub geofence_result: Topic<GeofenceResult>,
    pub position_setpoint_triplet: Topic<PositionSetpointTriplet>,
    pub mission_result: Topic<MissionResult>,
    pub vehicle_roi: Topic<VehicleRoi>,

    pub command_ack: Queue<CommandAck, ACK_QUEUE_LEN>,
}

impl Bus {
    pub const fn new() -> Self {
        Self {
            vehicle_command: Topic::new(),
            action_request: Topic::new(),
            telemetry_status: Topic::new(),
            vehicle_status: Topic::new(),
            status_flags: Topic::new(),
            actuator_armed: Topic::new(),
            control_mode: Topic::new(),
            commander_state: Topic::new(),
            home_position: Topic::new(),
            actuator_test: Topic::new(),
            power_request: Topic::new(),
            geofence_result: Topic::new(),
            position_setpoint_triplet: Topic::new(),
            mission_result: Topic::new(),
            vehicle_roi: Topic::new(),
            command_ack: Queue::new(),
        }
    }

    /// Queue an acknowledgment, logging when an older one had to go
    pub fn push_ack(&self, ack: CommandAck) {
        if let Err(_err) = self.command_ack.push(ack) {
            crate::log_warn!("Command ack queue full, oldest dropped");
        }
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

pub static BUS: Bus = Bus::new();
