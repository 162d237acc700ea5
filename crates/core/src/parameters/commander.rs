//! Commander Parameter Definitions
//!
//! Arming, failsafe and link-loss configuration read by the commander.
//!
//! # Parameters
//!
//! - `MAV_SYS_ID` / `MAV_COMP_ID` / `MAV_TYPE` - Identity and airframe
//! - `COM_DISARM_LAND` / `COM_DISARM_PRFLT` - Auto-disarm delays (s, <= 0 disables)
//! - `COM_RC_LOSS_T` / `COM_DL_LOSS_T` - Link loss timeouts (s)
//! - `COM_RCL_EXCEPT` - Modes that tolerate RC loss (bitmask)
//! - `NAV_RCL_ACT` / `NAV_DLL_ACT` / `COM_OBL_ACT` - Link loss reactions
//! - `COM_LOW_BAT_ACT` / `COM_BAT_ACT_T` - Battery reaction and delay (s)
//! - `COM_ACT_FAIL_ACT` - Motor failure reaction
//! - `COM_FLT_TIME_MAX` - Maximum flight time before return (s, < 0 disables)
//! - `COM_HOME_EN` / `COM_MOT_TEST_EN` - Home capture and motor test enables
//! - `COM_SPOOLUP_TIME` / `COM_LKDOWN_TKO` - Failure detector windows (s)
//! - `COM_RC_OVERRIDE` - Modes the pilot may override (bitmask)
//! - `COM_FORCE_SAFETY` - Re-engage safety on disarm
//! - `COM_KILL_DISARM` - Kill switch duration before disarm (s)
//! - `CBRK_FLIGHTTERM` - Flight termination circuit breaker (121212 disables)

use super::storage::{ParamFlags, ParamValue, ParameterError, ParameterStore};
use crate::failsafe::{
    ActuatorFailureAction, LinkLossAction, LowBatteryAction, OffboardLossAction,
    RcLossExceptions, RcOverrideModes,
};

/// Circuit breaker magic that disables flight termination
pub const CBRK_FLIGHTTERM_KEY: i32 = 121212;

/// Commander parameters loaded from parameter store
#[derive(Debug, Clone, PartialEq)]
pub struct CommanderParams {
    pub system_id: u8,
    pub component_id: u8,
    pub mav_type: i32,
    pub disarm_land_s: f32,
    pub disarm_preflight_s: f32,
    pub rc_loss_timeout_s: f32,
    pub dl_loss_timeout_s: f32,
    pub rc_loss_exceptions: RcLossExceptions,
    pub rc_loss_action: LinkLossAction,
    pub dl_loss_action: LinkLossAction,
    pub offboard_loss_action: OffboardLossAction,
    pub low_battery_action: LowBatteryAction,
    pub battery_action_delay_s: f32,
    pub actuator_failure_action: ActuatorFailureAction,
    pub flight_time_max_s: f32,
    pub home_enabled: bool,
    pub motor_test_enabled: bool,
    pub spoolup_time_s: f32,
    pub lockdown_takeoff_s: f32,
    pub rc_override: RcOverrideModes,
    pub force_safety: bool,
    pub kill_disarm_s: f32,
    pub flight_termination_disabled: bool,
}

impl Default for CommanderParams {
    fn default() -> Self {
        Self {
            system_id: 1,
            component_id: 1,
            mav_type: 2,
            disarm_land_s: 2.0,
            disarm_preflight_s: 10.0,
            rc_loss_timeout_s: 0.5,
            dl_loss_timeout_s: 10.0,
            rc_loss_exceptions: RcLossExceptions::empty(),
            rc_loss_action: LinkLossAction::ReturnToLaunch,
            dl_loss_action: LinkLossAction::Disabled,
            offboard_loss_action: OffboardLossAction::Land,
            low_battery_action: LowBatteryAction::Warning,
            battery_action_delay_s: 5.0,
            actuator_failure_action: ActuatorFailureAction::Disabled,
            flight_time_max_s: -1.0,
            home_enabled: true,
            motor_test_enabled: true,
            spoolup_time_s: 1.0,
            lockdown_takeoff_s: 3.0,
            rc_override: RcOverrideModes::AUTO,
            force_safety: false,
            kill_disarm_s: 5.0,
            flight_termination_disabled: true,
        }
    }
}

impl CommanderParams {
    /// Register commander parameters with default values
    pub fn register_defaults(store: &mut ParameterStore) -> Result<(), ParameterError> {
        let d = Self::default();
        store.register("MAV_SYS_ID", ParamValue::Int(d.system_id as i32), ParamFlags::empty())?;
        store.register("MAV_COMP_ID", ParamValue::Int(d.component_id as i32), ParamFlags::empty())?;
        store.register("MAV_TYPE", ParamValue::Int(d.mav_type), ParamFlags::empty())?;
        store.register("COM_DISARM_LAND", ParamValue::Float(d.disarm_land_s), ParamFlags::empty())?;
        store.register("COM_DISARM_PRFLT", ParamValue::Float(d.disarm_preflight_s), ParamFlags::empty())?;
        store.register("COM_RC_LOSS_T", ParamValue::Float(d.rc_loss_timeout_s), ParamFlags::empty())?;
        store.register("COM_DL_LOSS_T", ParamValue::Float(d.dl_loss_timeout_s), ParamFlags::empty())?;
        store.register("COM_RCL_EXCEPT", ParamValue::Int(0), ParamFlags::empty())?;
        store.register("NAV_RCL_ACT", ParamValue::Int(2), ParamFlags::empty())?;
        store.register("NAV_DLL_ACT", ParamValue::Int(0), ParamFlags::empty())?;
        store.register("COM_OBL_ACT", ParamValue::Int(0), ParamFlags::empty())?;
        store.register("COM_LOW_BAT_ACT", ParamValue::Int(0), ParamFlags::empty())?;
        store.register("COM_BAT_ACT_T", ParamValue::Float(d.battery_action_delay_s), ParamFlags::empty())?;
        store.register("COM_ACT_FAIL_ACT", ParamValue::Int(0), ParamFlags::empty())?;
        store.register("COM_FLT_TIME_MAX", ParamValue::Float(d.flight_time_max_s), ParamFlags::empty())?;
        store.register("COM_HOME_EN", ParamValue::Int(1), ParamFlags::empty())?;
        store.register("COM_MOT_TEST_EN", ParamValue::Int(1), ParamFlags::empty())?;
        store.register("COM_SPOOLUP_TIME", ParamValue::Float(d.spoolup_time_s), ParamFlags::empty())?;
        store.register("COM_LKDOWN_TKO", ParamValue::Float(d.lockdown_takeoff_s), ParamFlags::empty())?;
        store.register("COM_RC_OVERRIDE", ParamValue::Int(1), ParamFlags::empty())?;
        store.register("COM_FORCE_SAFETY", ParamValue::Int(0), ParamFlags::empty())?;
        store.register("COM_KILL_DISARM", ParamValue::Float(d.kill_disarm_s), ParamFlags::empty())?;
        // Hidden: only settable by someone who knows the key
        store.register("CBRK_FLIGHTTERM", ParamValue::Int(CBRK_FLIGHTTERM_KEY), ParamFlags::HIDDEN)?;
        Ok(())
    }

    /// Load commander parameters from parameter store
    pub fn from_store(store: &ParameterStore) -> Self {
        let d = Self::default();
        Self {
            system_id: store.int_or("MAV_SYS_ID", d.system_id as i32).clamp(1, 255) as u8,
            component_id: store.int_or("MAV_COMP_ID", d.component_id as i32).clamp(1, 255) as u8,
            mav_type: store.int_or("MAV_TYPE", d.mav_type),
            disarm_land_s: store.float_or("COM_DISARM_LAND", d.disarm_land_s),
            disarm_preflight_s: store.float_or("COM_DISARM_PRFLT", d.disarm_preflight_s),
            rc_loss_timeout_s: store.float_or("COM_RC_LOSS_T", d.rc_loss_timeout_s),
            dl_loss_timeout_s: store.float_or("COM_DL_LOSS_T", d.dl_loss_timeout_s),
            rc_loss_exceptions: RcLossExceptions::from_bits_truncate(
                store.int_or("COM_RCL_EXCEPT", 0) as u8,
            ),
            rc_loss_action: LinkLossAction::from_param(store.int_or("NAV_RCL_ACT", 2)),
            dl_loss_action: LinkLossAction::from_param(store.int_or("NAV_DLL_ACT", 0)),
            offboard_loss_action: OffboardLossAction::from_param(store.int_or("COM_OBL_ACT", 0)),
            low_battery_action: LowBatteryAction::from_param(store.int_or("COM_LOW_BAT_ACT", 0)),
            battery_action_delay_s: store.float_or("COM_BAT_ACT_T", d.battery_action_delay_s),
            actuator_failure_action: ActuatorFailureAction::from_param(
                store.int_or("COM_ACT_FAIL_ACT", 0),
            ),
            flight_time_max_s: store.float_or("COM_FLT_TIME_MAX", d.flight_time_max_s),
            home_enabled: store.bool_or("COM_HOME_EN", d.home_enabled),
            motor_test_enabled: store.int_or("COM_MOT_TEST_EN", 1) == 1,
            spoolup_time_s: store.float_or("COM_SPOOLUP_TIME", d.spoolup_time_s),
            lockdown_takeoff_s: store.float_or("COM_LKDOWN_TKO", d.lockdown_takeoff_s),
            rc_override: RcOverrideModes::from_bits_truncate(store.int_or("COM_RC_OVERRIDE", 1) as u8),
            force_safety: store.bool_or("COM_FORCE_SAFETY", d.force_safety),
            kill_disarm_s: store.float_or("COM_KILL_DISARM", d.kill_disarm_s),
            flight_termination_disabled: store.int_or("CBRK_FLIGHTTERM", CBRK_FLIGHTTERM_KEY)
                == CBRK_FLIGHTTERM_KEY,
        }
    }
}
