//! Failsafe handling
//!
//! - [`actions`]: configured reactions decoded from parameters
//! - [`link`]: RC and data-link loss detection
//! - [`battery`]: battery warning escalation with reaction delay
//! - [`hysteresis`]: time hysteresis used by the auto-disarm checks
//! - [`resolver`]: fixed-precedence navigation state arbitration

pub mod actions;
pub mod battery;
pub mod hysteresis;
pub mod link;
pub mod resolver;

pub use actions::{
    ActuatorFailureAction, GeofenceAction, LinkLossAction, LowBatteryAction, OffboardLossAction,
    RcLossExceptions, RcOverrideModes, RtlType, TrafficAvoidAction,
};
pub use battery::{BatteryContext, BatteryFailsafe, BatteryOverride};
pub use hysteresis::Hysteresis;
pub use link::{LinkEvent, LinkMonitor, LinkStatus};
pub use resolver::{apply_decision, resolve, FailsafeDecision, FailsafeInputs, FailsafeSource};
