//! Arm/disarm request origin.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmDisarmReason {
    TransitionToStandby,
    RcStick,
    RcSwitch,
    RcButton,
    CommandInternal,
    CommandExternal,
    MissionStart,
    AutoDisarmLand,
    AutoDisarmPreflight,
    KillSwitch,
    Lockdown,
    FailureDetector,
    Shutdown,
    UnitTest,
}

impl ArmDisarmReason {
    /// Request came from a direct pilot gesture
    pub fn is_rc(self) -> bool {
        matches!(
            self,
            ArmDisarmReason::RcStick | ArmDisarmReason::RcSwitch | ArmDisarmReason::RcButton
        )
    }
}

impl fmt::Display for ArmDisarmReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ArmDisarmReason::TransitionToStandby => "",
            ArmDisarmReason::RcStick => "RC",
            ArmDisarmReason::RcSwitch => "RC (switch)",
            ArmDisarmReason::RcButton => "RC (button)",
            ArmDisarmReason::CommandInternal => "internal command",
            ArmDisarmReason::CommandExternal => "external command",
            ArmDisarmReason::MissionStart => "mission start",
            ArmDisarmReason::AutoDisarmLand => "landing",
            ArmDisarmReason::AutoDisarmPreflight => "auto preflight disarming",
            ArmDisarmReason::KillSwitch => "kill-switch",
            ArmDisarmReason::Lockdown => "lockdown",
            ArmDisarmReason::FailureDetector => "failure detector",
            ArmDisarmReason::Shutdown => "shutdown request",
            ArmDisarmReason::UnitTest => "unit tests",
        };
        f.write_str(text)
    }
}
