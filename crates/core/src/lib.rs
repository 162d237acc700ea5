//! warden_core - Pure no_std decision logic for the warden autopilot core
//!
//! This crate contains the arbitration layer (arming, mode selection,
//! failsafe resolution, command handling) and the navigation dispatch layer
//! (behavior selection, setpoint continuity, geofence breach avoidance).
//! Everything here is platform-agnostic and runs on the host in tests.
//!
//! # Design Principles
//!
//! - **Zero cfg**: No `#[cfg(feature = ...)]` directives allowed
//! - **Pure no_std**: No std library dependencies
//! - **Explicit context**: Components receive the records they read and the
//!   records they own by reference; there is no ambient global state
//! - **Tri-state transitions**: Every state transition reports
//!   [`TransitionResult`] and a denied transition leaves state untouched
//!
//! # Modules
//!
//! - [`traits`]: Collaborator interfaces (time, health checks, geofence, worker)
//! - [`vehicle`]: Shared records (vehicle status, actuator flags, positions)
//! - [`events`]: Stable-identifier event log drained by the runtime
//! - [`latch`]: One-shot latches and edge detectors
//! - [`arming`]: Arming state machine and arm/disarm reasons
//! - [`commander`]: Main state machine, command and action dispatch, cycle
//! - [`command`]: Vehicle command records and typed decoding
//! - [`failsafe`]: Failsafe actions, link monitors, battery escalation, resolver
//! - [`geo`]: Geodesy helpers on WGS84 lat/lon
//! - [`geofence`]: Fence geometry, breach prediction, periodic fence check
//! - [`mission`]: Mission plan storage and item classification
//! - [`navigator`]: Navigation behaviors and the navigation mode dispatcher
//! - [`parameters`]: Parameter store and typed parameter blocks

#![no_std]

pub mod arming;
pub mod command;
pub mod commander;
pub mod events;
pub mod failsafe;
pub mod geo;
pub mod geofence;
pub mod latch;
pub mod mission;
pub mod navigator;
pub mod parameters;
pub mod traits;
pub mod transition;
pub mod vehicle;

pub use transition::TransitionResult;
