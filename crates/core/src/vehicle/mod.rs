//! Shared vehicle records
//!
//! Plain data exchanged between the commander, the navigator and the
//! runtime topics. Each record carries a `timestamp` refreshed on publish.

pub mod armed;
pub mod flags;
pub mod inputs;
pub mod position;
pub mod results;
pub mod status;

pub use armed::{ActuatorArmed, VehicleControlMode};
pub use flags::{BatteryWarning, VehicleStatusFlags};
pub use inputs::{
    ActuatorTest, BatteryStatus, FailureFlags, ManualControlSetpoint, SafetyState,
    TelemetryStatus,
};
pub use position::{GlobalPosition, HomePosition, LandDetected, LocalPosition};
pub use results::{GeofenceResult, MissionResult};
pub use status::{ArmingState, NavState, VehicleStatus, VehicleType};
