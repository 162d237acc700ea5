//! Collaborator interfaces for the decision core.
//!
//! # Design
//!
//! - Trait definitions are pure and have no feature gates
//! - Mock implementations are always available for host testing
//! - Runtime implementations (worker slot, embassy clock) live in the root crate

pub mod geofence;
pub mod health;
pub mod time;
pub mod worker;

pub use geofence::Geofence;
pub use health::{HealthChecks, MockHealthChecks};
pub use time::{secs_to_us, MockTime, TimeSource};
pub use worker::{MockWorker, WorkerRequest, WorkerStatus, WorkerTask};
