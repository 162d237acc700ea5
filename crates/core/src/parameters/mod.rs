//! Parameter management types and typed parameter blocks
//!
//! Each block follows the same pattern: `register_defaults(&mut store)`
//! adds its entries, `from_store(&store)` reads them back with defaults for
//! missing or mistyped values.

pub mod commander;
pub mod geofence;
pub mod navigator;
pub mod storage;

pub use commander::{CommanderParams, CBRK_FLIGHTTERM_KEY};
pub use geofence::{GeofenceParams, GEOFENCE_CHECK_INTERVAL_US};
pub use navigator::NavigatorParams;
pub use storage::{ParamFlags, ParamMetadata, ParamValue, ParameterError, ParameterStore};
pub use storage::{MAX_PARAMS, MAX_STRING_LEN, PARAM_NAME_LEN};

/// Register every block's defaults in one store
pub fn register_all(store: &mut ParameterStore) -> Result<(), ParameterError> {
    CommanderParams::register_defaults(store)?;
    NavigatorParams::register_defaults(store)?;
    GeofenceParams::register_defaults(store)?;
    Ok(())
}
