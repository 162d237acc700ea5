//! Vehicle command records
//!
//! Commands arrive as flat records (opcode plus seven numeric parameters),
//! are decoded once into a typed [`Command`] and are answered with exactly
//! one [`CommandAck`] unless delegated to another subsystem.

use core::fmt;

pub mod decode;
pub mod mode;

pub use decode::{
    ActuatorTestRequest, ArmAction, ArmDisarm, Calibration, Command, CommandDecodeError,
    PowerAction, SetHome, StorageAction, TerminationLevel,
};
pub use mode::{custom_mode_for_nav_state, main_state_for_mode, BaseMode};

/// Command opcodes (MAV_CMD numbering)
pub mod opcode {
    pub const CUSTOM_0: u16 = 0;
    pub const CUSTOM_1: u16 = 1;
    pub const CUSTOM_2: u16 = 2;
    pub const NAV_WAYPOINT: u16 = 16;
    pub const NAV_LOITER_UNLIM: u16 = 17;
    pub const NAV_RETURN_TO_LAUNCH: u16 = 20;
    pub const NAV_LAND: u16 = 21;
    pub const NAV_TAKEOFF: u16 = 22;
    pub const NAV_PRECLAND: u16 = 23;
    pub const DO_ORBIT: u16 = 34;
    pub const DO_WINCH: u16 = 42;
    pub const NAV_ROI: u16 = 80;
    pub const NAV_VTOL_TAKEOFF: u16 = 84;
    pub const NAV_VTOL_LAND: u16 = 85;
    pub const NAV_DELAY: u16 = 93;
    pub const DO_SET_MODE: u16 = 176;
    pub const DO_JUMP: u16 = 177;
    pub const DO_CHANGE_SPEED: u16 = 178;
    pub const DO_SET_HOME: u16 = 179;
    pub const DO_FLIGHTTERMINATION: u16 = 185;
    pub const DO_SET_ACTUATOR: u16 = 187;
    pub const DO_LAND_START: u16 = 189;
    pub const DO_GO_AROUND: u16 = 191;
    pub const DO_REPOSITION: u16 = 192;
    pub const DO_SET_ROI_LOCATION: u16 = 195;
    pub const DO_SET_ROI_WPNEXT_OFFSET: u16 = 196;
    pub const DO_SET_ROI_NONE: u16 = 197;
    pub const DO_SET_ROI: u16 = 201;
    pub const DO_DIGICAM_CONTROL: u16 = 203;
    pub const DO_MOUNT_CONFIGURE: u16 = 204;
    pub const DO_MOUNT_CONTROL: u16 = 205;
    pub const DO_SET_CAM_TRIGG_DIST: u16 = 206;
    pub const DO_PARACHUTE: u16 = 208;
    pub const DO_GRIPPER: u16 = 211;
    pub const DO_SET_CAM_TRIGG_INTERVAL: u16 = 214;
    pub const DO_MOUNT_CONTROL_QUAT: u16 = 220;
    pub const PREFLIGHT_CALIBRATION: u16 = 241;
    pub const PREFLIGHT_SET_SENSOR_OFFSETS: u16 = 242;
    pub const PREFLIGHT_UAVCAN: u16 = 243;
    pub const PREFLIGHT_STORAGE: u16 = 245;
    pub const PREFLIGHT_REBOOT_SHUTDOWN: u16 = 246;
    pub const OBLIQUE_SURVEY: u16 = 260;
    pub const MISSION_START: u16 = 300;
    pub const ACTUATOR_TEST: u16 = 310;
    pub const CONFIGURE_ACTUATOR: u16 = 311;
    pub const COMPONENT_ARM_DISARM: u16 = 400;
    pub const RUN_PREARM_CHECKS: u16 = 401;
    pub const INJECT_FAILURE: u16 = 420;
    pub const START_RX_PAIR: u16 = 500;
    pub const REQUEST_MESSAGE: u16 = 512;
    pub const SET_CAMERA_MODE: u16 = 530;
    pub const SET_CAMERA_ZOOM: u16 = 531;
    pub const SET_CAMERA_FOCUS: u16 = 532;
    pub const GIMBAL_MANAGER_PITCHYAW: u16 = 1000;
    pub const GIMBAL_MANAGER_CONFIGURE: u16 = 1001;
    pub const IMAGE_START_CAPTURE: u16 = 2000;
    pub const IMAGE_STOP_CAPTURE: u16 = 2001;
    pub const DO_TRIGGER_CONTROL: u16 = 2003;
    pub const VIDEO_START_CAPTURE: u16 = 2500;
    pub const VIDEO_STOP_CAPTURE: u16 = 2501;
    pub const LOGGING_START: u16 = 2510;
    pub const LOGGING_STOP: u16 = 2511;
    pub const CONTROL_HIGH_LATENCY: u16 = 2600;
    pub const DO_VTOL_TRANSITION: u16 = 3000;
    pub const PAYLOAD_PREPARE_DEPLOY: u16 = 30001;
    pub const PAYLOAD_CONTROL_DEPLOY: u16 = 30002;
    pub const FIXED_MAG_CAL_YAW: u16 = 42006;
}

/// Inbound command record
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VehicleCommand {
    pub timestamp: u64,
    pub command: u16,
    pub param1: f32,
    pub param2: f32,
    pub param3: f32,
    pub param4: f32,
    /// Latitude for positional commands (degrees)
    pub param5: f64,
    /// Longitude for positional commands (degrees)
    pub param6: f64,
    pub param7: f32,
    pub target_system: u8,
    pub target_component: u8,
    pub source_system: u8,
    pub source_component: u8,
    pub confirmation: u8,
    /// Arrived over a telemetry link rather than from an onboard module
    pub from_external: bool,
}

impl VehicleCommand {
    pub fn new(command: u16) -> Self {
        Self {
            command,
            param1: f32::NAN,
            param2: f32::NAN,
            param3: f32::NAN,
            param4: f32::NAN,
            param5: f64::NAN,
            param6: f64::NAN,
            param7: f32::NAN,
            ..Self::default()
        }
    }

    /// Addressed to `system`/`component`, where 0 means broadcast
    pub fn is_addressed_to(&self, system: u8, component: u8) -> bool {
        (self.target_system == system || self.target_system == 0)
            && (self.target_component == component || self.target_component == 0)
    }
}

/// Command acknowledgment result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandResult {
    Accepted,
    TemporarilyRejected,
    Denied,
    Unsupported,
    Failed,
    InProgress,
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            CommandResult::Accepted => "accepted",
            CommandResult::TemporarilyRejected => "temporarily rejected",
            CommandResult::Denied => "denied",
            CommandResult::Unsupported => "unsupported",
            CommandResult::Failed => "failed",
            CommandResult::InProgress => "in progress",
        };
        f.write_str(text)
    }
}

/// Acknowledgment for one command, routed back to its origin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandAck {
    pub timestamp: u64,
    pub command: u16,
    pub result: CommandResult,
    pub target_system: u8,
    pub target_component: u8,
    pub from_external: bool,
}

impl CommandAck {
    pub fn for_command(cmd: &VehicleCommand, result: CommandResult, now_us: u64) -> Self {
        Self {
            timestamp: now_us,
            command: cmd.command,
            result,
            target_system: cmd.source_system,
            target_component: cmd.source_component,
            from_external: cmd.from_external,
        }
    }
}

/// How the dispatcher disposed of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandDisposition {
    /// Addressed to another system or component; no ack
    NotForUs,
    /// Handled by another subsystem, which answers it
    Delegated,
    Answered(CommandAck),
}

impl CommandDisposition {
    pub fn ack(&self) -> Option<&CommandAck> {
        match self {
            CommandDisposition::Answered(ack) => Some(ack),
            _ => None,
        }
    }

    pub fn result(&self) -> Option<CommandResult> {
        self.ack().map(|ack| ack.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addressing_with_broadcast() {
        let mut cmd = VehicleCommand::new(opcode::NAV_LAND);
        cmd.target_system = 1;
        cmd.target_component = 0;
        assert!(cmd.is_addressed_to(1, 1));

        cmd.target_system = 2;
        assert!(!cmd.is_addressed_to(1, 1));

        cmd.target_system = 0;
        cmd.target_component = 190;
        assert!(!cmd.is_addressed_to(1, 1));
    }

    #[test]
    fn test_ack_routes_back_to_source() {
        let mut cmd = VehicleCommand::new(opcode::NAV_LAND);
        cmd.source_system = 255;
        cmd.source_component = 190;
        cmd.from_external = true;

        let ack = CommandAck::for_command(&cmd, CommandResult::Accepted, 7);
        assert_eq!(ack.target_system, 255);
        assert_eq!(ack.target_component, 190);
        assert_eq!(ack.command, opcode::NAV_LAND);
        assert!(ack.from_external);
    }
}
