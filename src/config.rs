//! Parameter store setup
//!
//! Registers every parameter block of the decision core and applies the
//! identity defaults baked in at build time (`WARDEN_SYS_ID`,
//! `WARDEN_COMP_ID`, `WARDEN_MAV_TYPE`, see `build.rs`).

use warden_core::parameters::{register_all, ParamValue, ParameterError, ParameterStore};

/// Build-time identity overrides, empty when not configured
const BUILD_IDENTITY: [(&str, &str); 3] = [
    ("MAV_SYS_ID", env!("WARDEN_SYS_ID")),
    ("MAV_COMP_ID", env!("WARDEN_COMP_ID")),
    ("MAV_TYPE", env!("WARDEN_MAV_TYPE")),
];

/// Store with all blocks registered and build-time identity applied
pub fn build_parameter_store() -> Result<ParameterStore, ParameterError> {
    let mut store = ParameterStore::new();
    register_all(&mut store)?;
    apply_overrides(&mut store, &BUILD_IDENTITY)?;
    Ok(store)
}

/// Set integer parameters from `(name, text)` pairs, skipping empty text
pub fn apply_overrides(
    store: &mut ParameterStore,
    overrides: &[(&str, &str)],
) -> Result<(), ParameterError> {
    for (name, text) in overrides {
        if text.is_empty() {
            continue;
        }
        match text.trim().parse::<i32>() {
            Ok(value) => store.set(name, ParamValue::Int(value))?,
            Err(_) => crate::log_warn!("Ignoring non-numeric build default for {}", *name),
        }
    }
    Ok(())
}
