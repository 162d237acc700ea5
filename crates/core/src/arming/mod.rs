//! Arming state machine, arm/disarm reasons and denial reasons

pub mod error;
pub mod reason;
pub mod state_machine;

pub use error::{ArmingDenied, DisarmDenied};
pub use reason::ArmDisarmReason;
pub use state_machine::{ArmRequest, ArmStateMachine};
