//! Geofence Parameter Definitions
//!
//! # Parameters
//!
//! - `GF_ACTION` - Violation reaction (0 none, 1 warn, 2 hold, 3 return, 4 terminate, 5 land)
//! - `GF_PREDICT` - Check the braking-distance test point instead of the current position
//! - `GF_MAX_HOR_DIST` / `GF_MAX_VER_DIST` - Limits from home (m, 0 disables)
//! - `GF_SOURCE` - Position source (0 global position, 1 raw GNSS)
//! - `MPC_ACC_HOR` / `MPC_ACC_UP_MAX` / `MPC_JERK_AUTO` - Braking model for rotary wing

use super::storage::{ParamFlags, ParamValue, ParameterError, ParameterStore};
use crate::failsafe::GeofenceAction;

/// Geofence check period
pub const GEOFENCE_CHECK_INTERVAL_US: u64 = 200_000;

#[derive(Debug, Clone, PartialEq)]
pub struct GeofenceParams {
    pub action: GeofenceAction,
    pub predict: bool,
    pub max_hor_distance: f32,
    pub max_ver_distance: f32,
    pub source: u8,
    pub mc_acc_hor: f32,
    pub mc_acc_up: f32,
    pub mc_jerk: f32,
}

impl Default for GeofenceParams {
    fn default() -> Self {
        Self {
            action: GeofenceAction::Warn,
            predict: true,
            max_hor_distance: 0.0,
            max_ver_distance: 0.0,
            source: 0,
            mc_acc_hor: 3.0,
            mc_acc_up: 4.0,
            mc_jerk: 4.0,
        }
    }
}

impl GeofenceParams {
    pub fn register_defaults(store: &mut ParameterStore) -> Result<(), ParameterError> {
        let d = Self::default();
        store.register("GF_ACTION", ParamValue::Int(1), ParamFlags::empty())?;
        store.register("GF_PREDICT", ParamValue::Int(1), ParamFlags::empty())?;
        store.register("GF_MAX_HOR_DIST", ParamValue::Float(d.max_hor_distance), ParamFlags::empty())?;
        store.register("GF_MAX_VER_DIST", ParamValue::Float(d.max_ver_distance), ParamFlags::empty())?;
        store.register("GF_SOURCE", ParamValue::Int(0), ParamFlags::empty())?;
        store.register("MPC_ACC_HOR", ParamValue::Float(d.mc_acc_hor), ParamFlags::empty())?;
        store.register("MPC_ACC_UP_MAX", ParamValue::Float(d.mc_acc_up), ParamFlags::empty())?;
        store.register("MPC_JERK_AUTO", ParamValue::Float(d.mc_jerk), ParamFlags::empty())?;
        Ok(())
    }

    pub fn from_store(store: &ParameterStore) -> Self {
        let d = Self::default();
        Self {
            action: GeofenceAction::from_param(store.int_or("GF_ACTION", 1)),
            predict: store.bool_or("GF_PREDICT", d.predict),
            max_hor_distance: store.float_or("GF_MAX_HOR_DIST", d.max_hor_distance),
            max_ver_distance: store.float_or("GF_MAX_VER_DIST", d.max_ver_distance),
            source: store.int_or("GF_SOURCE", 0).clamp(0, 1) as u8,
            mc_acc_hor: store.float_or("MPC_ACC_HOR", d.mc_acc_hor),
            mc_acc_up: store.float_or("MPC_ACC_UP_MAX", d.mc_acc_up),
            mc_jerk: store.float_or("MPC_JERK_AUTO", d.mc_jerk),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_then_load_matches_defaults() {
        let mut store = ParameterStore::new();
        GeofenceParams::register_defaults(&mut store).unwrap();
        assert_eq!(GeofenceParams::from_store(&store), GeofenceParams::default());
    }

    #[test]
    fn test_action_loiter() {
        let mut store = ParameterStore::new();
        GeofenceParams::register_defaults(&mut store).unwrap();
        store.set("GF_ACTION", ParamValue::Int(2)).unwrap();
        store.set("GF_PREDICT", ParamValue::Int(0)).unwrap();

        let params = GeofenceParams::from_store(&store);
        assert_eq!(params.action, GeofenceAction::Loiter);
        assert!(!params.predict);
    }
}
