#![cfg_attr(not(test), no_std)]

//! warden - Runtime glue for the warden commander/navigator decision core
//!
//! The decision logic lives in `warden_core`. This crate connects it to the
//! outside world: message topics between tasks, the worker-task slot, the
//! task drivers with rate-limited publishing, the STATUSTEXT queue and the
//! MAVLink wire adapter.

// Logging macros, declared first so every module can use them
pub mod logging;

pub mod bus;
pub mod config;
pub mod mavlink_adapter;
pub mod runtime;
pub mod status_notifier;
pub mod topic;
pub mod worker;

// Async task loops on the embassy executor
#[cfg(feature = "embassy")]
pub mod tasks;

pub use warden_core;
