//! Logging abstraction
//!
//! Unified logging macros for every target:
//! - `defmt` feature: forwards to the `defmt` macros (embedded targets)
//! - Host tests: `println!` / `eprintln!` with a level prefix
//! - Host non-test: compiled out
//!
//! Arguments must be plain values (`str`, integers, floats, bools) so the
//! same call site works with both `defmt` and `core::fmt`.

/// Log informational message
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        ::defmt::info!($($arg)*);

        #[cfg(all(not(feature = "defmt"), test))]
        println!("[INFO] {}", format!($($arg)*));
    }};
}

/// Log warning message
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        ::defmt::warn!($($arg)*);

        #[cfg(all(not(feature = "defmt"), test))]
        println!("[WARN] {}", format!($($arg)*));
    }};
}

/// Log error message
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        ::defmt::error!($($arg)*);

        #[cfg(all(not(feature = "defmt"), test))]
        eprintln!("[ERROR] {}", format!($($arg)*));
    }};
}

/// Log debug message
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        ::defmt::debug!($($arg)*);

        #[cfg(all(not(feature = "defmt"), test))]
        println!("[DEBUG] {}", format!($($arg)*));
    }};
}

/// Log trace message
#[macro_export]
macro_rules! log_trace {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        ::defmt::trace!($($arg)*);

        #[cfg(all(not(feature = "defmt"), test))]
        println!("[TRACE] {}", format!($($arg)*));
    }};
}

use warden_core::events::{Event, Severity};

/// Forward a drained core event to the log macros at its severity
pub fn log_event(event: &Event) {
    let _id = event.id;
    let _text = event.text.as_str();
    match event.severity {
        Severity::Emergency | Severity::Alert | Severity::Critical | Severity::Error => {
            crate::log_error!("{}: {}", _id, _text);
        }
        Severity::Warning => crate::log_warn!("{}: {}", _id, _text),
        Severity::Notice | Severity::Info => crate::log_info!("{}: {}", _id, _text),
        Severity::Debug => crate::log_debug!("{}: {}", _id, _text),
    }
}
