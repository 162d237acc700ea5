//! Navigator Parameter Definitions
//!
//! # Parameters
//!
//! - `NAV_ACC_RAD` / `NAV_LOITER_RAD` - Acceptance and loiter radius (m)
//! - `NAV_MC_ALT_RAD` / `NAV_FW_ALT_RAD` - Altitude acceptance radius (m)
//! - `RTL_TYPE` / `RTL_RETURN_ALT` / `RTL_DESCEND_ALT` - Return policy and altitudes (m)
//! - `MIS_TAKEOFF_ALT` / `VTO_LOITER_ALT` - Takeoff altitudes above home (m)
//! - `PLD_SRCH_ALT` / `PLD_SRCH_TOUT` - Precision landing search altitude (m) and timeout (s)
//! - `NAV_TRAFF_AVOID` / `NAV_TRAFF_A_HOR` / `NAV_TRAFF_A_VER` / `NAV_TRAFF_COLL_T` - Traffic avoidance
//! - `MPC_XY_CRUISE` / `FW_AIRSPD_TRIM` - Default cruise speeds (m/s)
//! - `NAV_GPSF_LT` - Time without global position in flight before termination is requested (s)

use super::storage::{ParamFlags, ParamValue, ParameterError, ParameterStore};
use crate::failsafe::{RtlType, TrafficAvoidAction};

/// Navigator parameters loaded from parameter store
#[derive(Debug, Clone, PartialEq)]
pub struct NavigatorParams {
    pub acceptance_radius: f32,
    pub loiter_radius: f32,
    pub mc_altitude_acceptance_radius: f32,
    pub fw_altitude_acceptance_radius: f32,
    pub rtl_type: RtlType,
    pub rtl_return_alt: f32,
    pub rtl_descend_alt: f32,
    pub takeoff_alt: f32,
    pub vtol_loiter_alt: f32,
    pub precland_search_alt: f32,
    pub precland_search_timeout_s: f32,
    pub traffic_avoid: TrafficAvoidAction,
    pub traffic_horizontal_sep: f32,
    pub traffic_vertical_sep: f32,
    pub traffic_collision_time_s: f32,
    pub mc_cruise_speed: f32,
    pub fw_cruise_speed: f32,
    pub gps_failure_loiter_s: f32,
}

impl Default for NavigatorParams {
    fn default() -> Self {
        Self {
            acceptance_radius: 10.0,
            loiter_radius: 80.0,
            mc_altitude_acceptance_radius: 0.8,
            fw_altitude_acceptance_radius: 10.0,
            rtl_type: RtlType::Home,
            rtl_return_alt: 60.0,
            rtl_descend_alt: 30.0,
            takeoff_alt: 2.5,
            vtol_loiter_alt: 80.0,
            precland_search_alt: 10.0,
            precland_search_timeout_s: 10.0,
            traffic_avoid: TrafficAvoidAction::Warn,
            traffic_horizontal_sep: 500.0,
            traffic_vertical_sep: 500.0,
            traffic_collision_time_s: 60.0,
            mc_cruise_speed: 5.0,
            fw_cruise_speed: 15.0,
            gps_failure_loiter_s: 30.0,
        }
    }
}

impl NavigatorParams {
    pub fn register_defaults(store: &mut ParameterStore) -> Result<(), ParameterError> {
        let d = Self::default();
        let floats: [(&str, f32); 16] = [
            ("NAV_ACC_RAD", d.acceptance_radius),
            ("NAV_LOITER_RAD", d.loiter_radius),
            ("NAV_MC_ALT_RAD", d.mc_altitude_acceptance_radius),
            ("NAV_FW_ALT_RAD", d.fw_altitude_acceptance_radius),
            ("RTL_RETURN_ALT", d.rtl_return_alt),
            ("RTL_DESCEND_ALT", d.rtl_descend_alt),
            ("MIS_TAKEOFF_ALT", d.takeoff_alt),
            ("VTO_LOITER_ALT", d.vtol_loiter_alt),
            ("PLD_SRCH_ALT", d.precland_search_alt),
            ("PLD_SRCH_TOUT", d.precland_search_timeout_s),
            ("NAV_TRAFF_A_HOR", d.traffic_horizontal_sep),
            ("NAV_TRAFF_A_VER", d.traffic_vertical_sep),
            ("NAV_TRAFF_COLL_T", d.traffic_collision_time_s),
            ("MPC_XY_CRUISE", d.mc_cruise_speed),
            ("FW_AIRSPD_TRIM", d.fw_cruise_speed),
            ("NAV_GPSF_LT", d.gps_failure_loiter_s),
        ];
        for (name, value) in floats {
            store.register(name, ParamValue::Float(value), ParamFlags::empty())?;
        }
        store.register("RTL_TYPE", ParamValue::Int(0), ParamFlags::empty())?;
        store.register("NAV_TRAFF_AVOID", ParamValue::Int(1), ParamFlags::empty())?;
        Ok(())
    }

    pub fn from_store(store: &ParameterStore) -> Self {
        let d = Self::default();
        Self {
            acceptance_radius: store.float_or("NAV_ACC_RAD", d.acceptance_radius),
            loiter_radius: store.float_or("NAV_LOITER_RAD", d.loiter_radius),
            mc_altitude_acceptance_radius: store
                .float_or("NAV_MC_ALT_RAD", d.mc_altitude_acceptance_radius),
            fw_altitude_acceptance_radius: store
                .float_or("NAV_FW_ALT_RAD", d.fw_altitude_acceptance_radius),
            rtl_type: RtlType::from_param(store.int_or("RTL_TYPE", 0)),
            rtl_return_alt: store.float_or("RTL_RETURN_ALT", d.rtl_return_alt),
            rtl_descend_alt: store.float_or("RTL_DESCEND_ALT", d.rtl_descend_alt),
            takeoff_alt: store.float_or("MIS_TAKEOFF_ALT", d.takeoff_alt),
            vtol_loiter_alt: store.float_or("VTO_LOITER_ALT", d.vtol_loiter_alt),
            precland_search_alt: store.float_or("PLD_SRCH_ALT", d.precland_search_alt),
            precland_search_timeout_s: store
                .float_or("PLD_SRCH_TOUT", d.precland_search_timeout_s),
            traffic_avoid: TrafficAvoidAction::from_param(store.int_or("NAV_TRAFF_AVOID", 1)),
            traffic_horizontal_sep: store.float_or("NAV_TRAFF_A_HOR", d.traffic_horizontal_sep),
            traffic_vertical_sep: store.float_or("NAV_TRAFF_A_VER", d.traffic_vertical_sep),
            traffic_collision_time_s: store
                .float_or("NAV_TRAFF_COLL_T", d.traffic_collision_time_s),
            mc_cruise_speed: store.float_or("MPC_XY_CRUISE", d.mc_cruise_speed),
            fw_cruise_speed: store.float_or("FW_AIRSPD_TRIM", d.fw_cruise_speed),
            gps_failure_loiter_s: store.float_or("NAV_GPSF_LT", d.gps_failure_loiter_s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_then_load_matches_defaults() {
        let mut store = ParameterStore::new();
        NavigatorParams::register_defaults(&mut store).unwrap();
        assert_eq!(NavigatorParams::from_store(&store), NavigatorParams::default());
    }

    #[test]
    fn test_rtl_type_from_store() {
        let mut store = ParameterStore::new();
        NavigatorParams::register_defaults(&mut store).unwrap();
        store.set("RTL_TYPE", ParamValue::Int(2)).unwrap();
        store.set("NAV_ACC_RAD", ParamValue::Float(2.0)).unwrap();

        let params = NavigatorParams::from_store(&store);
        assert_eq!(params.rtl_type, RtlType::MissionLandingReversed);
        assert_eq!(params.acceptance_radius, 2.0);
    }
}
