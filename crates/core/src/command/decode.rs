//! Typed decoding of command parameters
//!
//! Floating-point parameters that encode booleans, integers or selectors
//! are interpreted here once. Everything downstream matches on [`Command`].

use core::fmt;

use super::{opcode, VehicleCommand};

/// Force-arm/disarm magic in ARM_DISARM param2
pub const ARM_FORCE_MAGIC: i32 = 21196;

/// In-air restore marker in ARM_DISARM param3
pub const ARM_IO_RESTORE_MAGIC: i32 = 1234;

/// Temperature calibration selector value
const CALIBRATION_TEMPERATURE: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmAction {
    Disarm,
    Arm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmDisarm {
    pub action: ArmAction,
    /// Checks bypassed (param2 == 21196)
    pub forced: bool,
    /// In-air restart marker from the IO co-processor (param3 == 1234)
    pub from_io: bool,
}

/// Severity requested by DO_FLIGHTTERMINATION param1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationLevel {
    /// Motors off, reversible (param1 > 1.5)
    Lockdown,
    /// Real termination with parachute release (param1 > 0.5)
    Terminate,
    /// Clear both latches
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SetHome {
    UseCurrentPosition,
    /// Explicit location; yaw in radians wrapped to `[0, 2pi)`, NaN if absent
    Location { lat: f64, lon: f64, alt: f32, yaw: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Calibration {
    Gyro,
    /// Delegated to the temperature calibration module, never acked here
    Temperature,
    Mag,
    Baro,
    RcStart,
    RcTrim,
    Accel,
    Level,
    AccelQuick,
    Airspeed,
    Esc,
    RcEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageAction {
    LoadDefault,
    SaveDefault,
    ResetAllConfig,
    ResetSensorFactory,
    ResetAll,
}

/// Power action requested by PREFLIGHT_REBOOT_SHUTDOWN param1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerAction {
    None,
    Reboot,
    Shutdown,
    RebootToBootloader,
}

/// Actuator test target decoded from param5
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActuatorTestRequest {
    /// Output function id (motors from 101, servos from 201)
    pub function: u16,
    pub value: f32,
    /// Timeout in ms; 0 or less releases the actuator
    pub timeout_ms: i32,
}

/// Strongly typed command
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    ArmDisarm(ArmDisarm),
    SetMode { base_mode: u8, custom_main: u8, custom_sub: u8 },
    Reposition { switch_to_loiter: bool },
    ReturnToLaunch,
    Takeoff,
    VtolTakeoff,
    Land,
    PrecisionLand,
    Orbit,
    MissionStart { first_item: f32 },
    FlightTermination(TerminationLevel),
    SetHome(SetHome),
    ControlHighLatency,
    ActuatorTest(ActuatorTestRequest),
    RebootShutdown(PowerAction),
    Calibration(Calibration),
    MagCalibrationQuick { heading_rad: f32, lat: f32, lon: f32 },
    Storage(StorageAction),
    RunPrearmChecks,
    /// Answered by another subsystem
    Delegated,
}

/// Parameters that could not be decoded into a [`Command`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommandDecodeError {
    /// ARM_DISARM param1 is neither 0 nor 1
    InvalidArmAction(f32),
    /// SET_HOME location parameters are not all finite
    NonFiniteHome,
    /// PREFLIGHT_CALIBRATION has no recognized selector
    UnsupportedCalibration,
    /// PREFLIGHT_STORAGE param1 outside 0..=4
    UnsupportedStorage(i32),
    /// PREFLIGHT_REBOOT_SHUTDOWN param1 outside 0..=3
    UnsupportedPowerAction(i32),
    /// ACTUATOR_TEST function outside the motor/servo ranges
    UnsupportedActuator(i32),
    /// Opcode not handled by the commander
    UnknownCommand(u16),
}

impl fmt::Display for CommandDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandDecodeError::InvalidArmAction(value) => {
                write!(f, "Unsupported ARM_DISARM param: {:.3}", value)
            }
            CommandDecodeError::NonFiniteHome => write!(f, "Set home location not finite"),
            CommandDecodeError::UnsupportedCalibration => {
                write!(f, "Unsupported calibration selector")
            }
            CommandDecodeError::UnsupportedStorage(value) => {
                write!(f, "Unsupported storage action: {}", value)
            }
            CommandDecodeError::UnsupportedPowerAction(value) => {
                write!(f, "Unsupported reboot/shutdown action: {}", value)
            }
            CommandDecodeError::UnsupportedActuator(value) => {
                write!(f, "Unsupported actuator function: {}", value)
            }
            CommandDecodeError::UnknownCommand(value) => write!(f, "Unknown command: {}", value),
        }
    }
}

/// Maximum motors addressable by ACTUATOR_TEST
pub const MAX_MOTORS: i32 = 12;
/// Maximum servos addressable by ACTUATOR_TEST
pub const MAX_SERVOS: i32 = 8;
const FUNCTION_MOTOR1: i32 = 101;
const FUNCTION_SERVO1: i32 = 201;
const MAV_ACTUATOR_OUTPUT_FUNCTION_MOTOR1: i32 = 1;
const MAV_ACTUATOR_OUTPUT_FUNCTION_SERVO1: i32 = 33;

fn round_i32(value: f32) -> i32 {
    libm::roundf(value) as i32
}

fn wrap_2pi(angle: f32) -> f32 {
    let two_pi = 2.0 * core::f32::consts::PI;
    let wrapped = libm::fmodf(angle, two_pi);
    if wrapped < 0.0 {
        wrapped + two_pi
    } else {
        wrapped
    }
}

/// Commands answered by other subsystems (camera, mount, payload, logging,
/// VTOL transition, speed changes handled by the navigator, ...)
fn is_delegated(command: u16) -> bool {
    use opcode::*;

    matches!(
        command,
        START_RX_PAIR
            | CUSTOM_0
            | CUSTOM_1
            | CUSTOM_2
            | DO_MOUNT_CONTROL
            | DO_MOUNT_CONFIGURE
            | DO_MOUNT_CONTROL_QUAT
            | PREFLIGHT_SET_SENSOR_OFFSETS
            | PREFLIGHT_UAVCAN
            | PAYLOAD_PREPARE_DEPLOY
            | PAYLOAD_CONTROL_DEPLOY
            | DO_VTOL_TRANSITION
            | DO_TRIGGER_CONTROL
            | DO_DIGICAM_CONTROL
            | DO_SET_CAM_TRIGG_DIST
            | DO_SET_CAM_TRIGG_INTERVAL
            | OBLIQUE_SURVEY
            | SET_CAMERA_MODE
            | SET_CAMERA_ZOOM
            | SET_CAMERA_FOCUS
            | IMAGE_START_CAPTURE
            | IMAGE_STOP_CAPTURE
            | VIDEO_START_CAPTURE
            | VIDEO_STOP_CAPTURE
            | DO_CHANGE_SPEED
            | DO_LAND_START
            | DO_GO_AROUND
            | LOGGING_START
            | LOGGING_STOP
            | NAV_DELAY
            | DO_SET_ROI
            | NAV_ROI
            | DO_SET_ROI_LOCATION
            | DO_SET_ROI_WPNEXT_OFFSET
            | DO_SET_ROI_NONE
            | INJECT_FAILURE
            | GIMBAL_MANAGER_PITCHYAW
            | GIMBAL_MANAGER_CONFIGURE
            | CONFIGURE_ACTUATOR
            | DO_SET_ACTUATOR
            | REQUEST_MESSAGE
            | DO_WINCH
            | DO_GRIPPER
    )
}

impl Command {
    /// Decode a command record.
    pub fn decode(cmd: &VehicleCommand) -> Result<Command, CommandDecodeError> {
        use opcode::*;

        let command = match cmd.command {
            COMPONENT_ARM_DISARM => Command::ArmDisarm(decode_arm_disarm(cmd)?),
            DO_SET_MODE => Command::SetMode {
                base_mode: round_i32(cmd.param1).clamp(0, 255) as u8,
                custom_main: round_i32(cmd.param2).clamp(0, 255) as u8,
                custom_sub: round_i32(cmd.param3).clamp(0, 255) as u8,
            },
            DO_REPOSITION => Command::Reposition {
                switch_to_loiter: cmd.param2.is_finite() && (cmd.param2 as i32) & 1 != 0,
            },
            NAV_RETURN_TO_LAUNCH => Command::ReturnToLaunch,
            NAV_TAKEOFF => Command::Takeoff,
            NAV_VTOL_TAKEOFF => Command::VtolTakeoff,
            NAV_LAND => Command::Land,
            NAV_PRECLAND => Command::PrecisionLand,
            DO_ORBIT => Command::Orbit,
            MISSION_START => Command::MissionStart {
                first_item: cmd.param1,
            },
            DO_FLIGHTTERMINATION => Command::FlightTermination(if cmd.param1 > 1.5 {
                TerminationLevel::Lockdown
            } else if cmd.param1 > 0.5 {
                TerminationLevel::Terminate
            } else {
                TerminationLevel::Clear
            }),
            DO_SET_HOME => Command::SetHome(decode_set_home(cmd)?),
            CONTROL_HIGH_LATENCY => Command::ControlHighLatency,
            ACTUATOR_TEST => Command::ActuatorTest(decode_actuator_test(cmd)?),
            PREFLIGHT_REBOOT_SHUTDOWN => Command::RebootShutdown(match cmd.param1 as i32 {
                0 => PowerAction::None,
                1 => PowerAction::Reboot,
                2 => PowerAction::Shutdown,
                3 => PowerAction::RebootToBootloader,
                other => return Err(CommandDecodeError::UnsupportedPowerAction(other)),
            }),
            PREFLIGHT_CALIBRATION => Command::Calibration(decode_calibration(cmd)?),
            FIXED_MAG_CAL_YAW => decode_mag_quick(cmd),
            PREFLIGHT_STORAGE => Command::Storage(match cmd.param1 as i32 {
                0 => StorageAction::LoadDefault,
                1 => StorageAction::SaveDefault,
                2 => StorageAction::ResetAllConfig,
                3 => StorageAction::ResetSensorFactory,
                4 => StorageAction::ResetAll,
                other => return Err(CommandDecodeError::UnsupportedStorage(other)),
            }),
            RUN_PREARM_CHECKS => Command::RunPrearmChecks,
            other if is_delegated(other) => Command::Delegated,
            other => return Err(CommandDecodeError::UnknownCommand(other)),
        };

        Ok(command)
    }
}

fn decode_arm_disarm(cmd: &VehicleCommand) -> Result<ArmDisarm, CommandDecodeError> {
    let action = match libm::roundf(cmd.param1) {
        v if v == 1.0 => ArmAction::Arm,
        v if v == 0.0 => ArmAction::Disarm,
        _ => return Err(CommandDecodeError::InvalidArmAction(cmd.param1)),
    };

    Ok(ArmDisarm {
        action,
        forced: round_i32(cmd.param2) == ARM_FORCE_MAGIC,
        from_io: round_i32(cmd.param3) == ARM_IO_RESTORE_MAGIC,
    })
}

fn decode_set_home(cmd: &VehicleCommand) -> Result<SetHome, CommandDecodeError> {
    if cmd.param1 > 0.5 {
        return Ok(SetHome::UseCurrentPosition);
    }

    let yaw = if cmd.param4.is_finite() {
        wrap_2pi(cmd.param4.to_radians())
    } else {
        f32::NAN
    };

    let (lat, lon, alt) = (cmd.param5, cmd.param6, cmd.param7);
    if lat.is_finite() && lon.is_finite() && alt.is_finite() {
        Ok(SetHome::Location { lat, lon, alt, yaw })
    } else {
        Err(CommandDecodeError::NonFiniteHome)
    }
}

fn decode_actuator_test(cmd: &VehicleCommand) -> Result<ActuatorTestRequest, CommandDecodeError> {
    let raw = (cmd.param5 + 0.5) as i32;

    let function = if raw < 1000 {
        let motor = MAV_ACTUATOR_OUTPUT_FUNCTION_MOTOR1;
        let servo = MAV_ACTUATOR_OUTPUT_FUNCTION_SERVO1;
        if (motor..motor + MAX_MOTORS).contains(&raw) {
            raw - motor + FUNCTION_MOTOR1
        } else if (servo..servo + MAX_SERVOS).contains(&raw) {
            raw - servo + FUNCTION_SERVO1
        } else {
            return Err(CommandDecodeError::UnsupportedActuator(raw));
        }
    } else {
        raw - 1000
    };

    if !(0..=u16::MAX as i32).contains(&function) {
        return Err(CommandDecodeError::UnsupportedActuator(raw));
    }

    Ok(ActuatorTestRequest {
        function: function as u16,
        value: cmd.param1,
        timeout_ms: (cmd.param2 * 1000.0 + 0.5) as i32,
    })
}

/// Selector order matters: the first matching parameter wins.
fn decode_calibration(cmd: &VehicleCommand) -> Result<Calibration, CommandDecodeError> {
    let p = |value: f32| value as i32;

    let calibration = if p(cmd.param1) == 1 {
        Calibration::Gyro
    } else if p(cmd.param1) == CALIBRATION_TEMPERATURE
        || p(cmd.param5 as f32) == CALIBRATION_TEMPERATURE
        || p(cmd.param7) == CALIBRATION_TEMPERATURE
    {
        Calibration::Temperature
    } else if p(cmd.param2) == 1 {
        Calibration::Mag
    } else if p(cmd.param3) == 1 {
        Calibration::Baro
    } else if p(cmd.param4) == 1 {
        Calibration::RcStart
    } else if p(cmd.param4) == 2 {
        Calibration::RcTrim
    } else if p(cmd.param5 as f32) == 1 {
        Calibration::Accel
    } else if p(cmd.param5 as f32) == 2 {
        Calibration::Level
    } else if p(cmd.param5 as f32) == 4 {
        Calibration::AccelQuick
    } else if p(cmd.param6 as f32) == 1 || p(cmd.param6 as f32) == 2 {
        Calibration::Airspeed
    } else if p(cmd.param7) == 1 {
        Calibration::Esc
    } else if p(cmd.param4) == 0 {
        Calibration::RcEnd
    } else {
        return Err(CommandDecodeError::UnsupportedCalibration);
    };

    Ok(calibration)
}

fn decode_mag_quick(cmd: &VehicleCommand) -> Command {
    // Assume north when no heading is given
    let heading_rad = if cmd.param1.is_finite() {
        libm::roundf(cmd.param1).to_radians()
    } else {
        0.0
    };

    // Zero lat and lon together means "unknown"
    let (lat, lon) = if cmd.param3.is_finite()
        && cmd.param4.is_finite()
        && libm::fabsf(cmd.param3) > 0.0
        && libm::fabsf(cmd.param4) > 0.0
    {
        (cmd.param3, cmd.param4)
    } else {
        (f32::NAN, f32::NAN)
    };

    Command::MagCalibrationQuick {
        heading_rad,
        lat,
        lon,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(command: u16) -> VehicleCommand {
        VehicleCommand::new(command)
    }

    #[test]
    fn test_arm_disarm_decoding() {
        let mut c = cmd(opcode::COMPONENT_ARM_DISARM);
        c.param1 = 1.0;
        c.param2 = 21196.0;
        assert_eq!(
            Command::decode(&c),
            Ok(Command::ArmDisarm(ArmDisarm {
                action: ArmAction::Arm,
                forced: true,
                from_io: false,
            }))
        );

        c.param1 = 0.2;
        c.param2 = 0.0;
        c.param3 = 1234.0;
        assert_eq!(
            Command::decode(&c),
            Ok(Command::ArmDisarm(ArmDisarm {
                action: ArmAction::Disarm,
                forced: false,
                from_io: true,
            }))
        );

        c.param1 = 2.0;
        assert_eq!(
            Command::decode(&c),
            Err(CommandDecodeError::InvalidArmAction(2.0))
        );
    }

    #[test]
    fn test_termination_levels() {
        let mut c = cmd(opcode::DO_FLIGHTTERMINATION);
        c.param1 = 2.0;
        assert_eq!(
            Command::decode(&c),
            Ok(Command::FlightTermination(TerminationLevel::Lockdown))
        );
        c.param1 = 1.0;
        assert_eq!(
            Command::decode(&c),
            Ok(Command::FlightTermination(TerminationLevel::Terminate))
        );
        c.param1 = 0.0;
        assert_eq!(
            Command::decode(&c),
            Ok(Command::FlightTermination(TerminationLevel::Clear))
        );
    }

    #[test]
    fn test_set_home_validation() {
        let mut c = cmd(opcode::DO_SET_HOME);
        c.param1 = 1.0;
        assert_eq!(
            Command::decode(&c),
            Ok(Command::SetHome(SetHome::UseCurrentPosition))
        );

        c.param1 = 0.0;
        c.param4 = -90.0;
        c.param5 = 47.0;
        c.param6 = 8.0;
        c.param7 = 500.0;
        match Command::decode(&c) {
            Ok(Command::SetHome(SetHome::Location { lat, yaw, .. })) => {
                assert_eq!(lat, 47.0);
                let expected = 1.5 * core::f32::consts::PI;
                assert!((yaw - expected).abs() < 1e-4);
            }
            other => panic!("unexpected {:?}", other),
        }

        c.param6 = f64::NAN;
        assert_eq!(Command::decode(&c), Err(CommandDecodeError::NonFiniteHome));
    }

    #[test]
    fn test_actuator_function_mapping() {
        let mut c = cmd(opcode::ACTUATOR_TEST);
        c.param1 = 0.5;
        c.param2 = 1.0;
        c.param5 = 1.0;
        assert_eq!(
            Command::decode(&c),
            Ok(Command::ActuatorTest(ActuatorTestRequest {
                function: 101,
                value: 0.5,
                timeout_ms: 1000,
            }))
        );

        c.param5 = 34.0;
        match Command::decode(&c) {
            Ok(Command::ActuatorTest(req)) => assert_eq!(req.function, 202),
            other => panic!("unexpected {:?}", other),
        }

        c.param5 = 1105.0;
        match Command::decode(&c) {
            Ok(Command::ActuatorTest(req)) => assert_eq!(req.function, 105),
            other => panic!("unexpected {:?}", other),
        }

        c.param5 = 20.0;
        assert_eq!(
            Command::decode(&c),
            Err(CommandDecodeError::UnsupportedActuator(20))
        );
    }

    #[test]
    fn test_calibration_selectors() {
        let mut c = cmd(opcode::PREFLIGHT_CALIBRATION);
        c.param1 = 0.0;
        c.param2 = 0.0;
        c.param3 = 0.0;
        c.param4 = 0.0;
        c.param5 = 0.0;
        c.param6 = 0.0;
        c.param7 = 0.0;
        assert_eq!(Command::decode(&c), Ok(Command::Calibration(Calibration::RcEnd)));

        c.param5 = 3.0;
        assert_eq!(
            Command::decode(&c),
            Ok(Command::Calibration(Calibration::Temperature))
        );

        c.param5 = 4.0;
        assert_eq!(
            Command::decode(&c),
            Ok(Command::Calibration(Calibration::AccelQuick))
        );

        c.param5 = 0.0;
        c.param1 = 1.0;
        c.param2 = 1.0;
        assert_eq!(Command::decode(&c), Ok(Command::Calibration(Calibration::Gyro)));

        c.param1 = 0.0;
        c.param2 = 0.0;
        c.param4 = 5.0;
        assert_eq!(
            Command::decode(&c),
            Err(CommandDecodeError::UnsupportedCalibration)
        );
    }

    #[test]
    fn test_storage_range() {
        let mut c = cmd(opcode::PREFLIGHT_STORAGE);
        c.param1 = 4.0;
        assert_eq!(
            Command::decode(&c),
            Ok(Command::Storage(StorageAction::ResetAll))
        );
        c.param1 = 7.0;
        assert_eq!(
            Command::decode(&c),
            Err(CommandDecodeError::UnsupportedStorage(7))
        );
    }

    #[test]
    fn test_mag_quick_unknown_position() {
        let mut c = cmd(opcode::FIXED_MAG_CAL_YAW);
        c.param1 = 90.0;
        c.param3 = 0.0;
        c.param4 = 8.5;
        match Command::decode(&c) {
            Ok(Command::MagCalibrationQuick { heading_rad, lat, lon }) => {
                assert!((heading_rad - core::f32::consts::FRAC_PI_2).abs() < 1e-5);
                assert!(lat.is_nan() && lon.is_nan());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_delegated_and_unknown() {
        assert_eq!(
            Command::decode(&cmd(opcode::DO_CHANGE_SPEED)),
            Ok(Command::Delegated)
        );
        assert_eq!(
            Command::decode(&cmd(opcode::NAV_WAYPOINT)),
            Err(CommandDecodeError::UnknownCommand(opcode::NAV_WAYPOINT))
        );
    }

    #[test]
    fn test_reposition_mode_switch_bit() {
        let mut c = cmd(opcode::DO_REPOSITION);
        assert_eq!(
            Command::decode(&c),
            Ok(Command::Reposition {
                switch_to_loiter: false
            })
        );
        c.param2 = 1.0;
        assert_eq!(
            Command::decode(&c),
            Ok(Command::Reposition {
                switch_to_loiter: true
            })
        );
    }
}
