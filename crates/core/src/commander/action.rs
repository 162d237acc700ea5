//! Pilot action requests
//!
//! Stick gestures, switches and buttons decoded by the RC layer arrive as
//! a small closed set of actions mapped onto the same arm, disarm and main
//! state calls the command path uses.

use crate::arming::ArmDisarmReason;
use crate::events::Severity;
use crate::traits::{HealthChecks, WorkerTask};
use crate::transition::TransitionResult;

use super::{Commander, MainState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionSource {
    RcStickGesture,
    RcSwitch,
    RcButton,
    RcModeSlot,
}

impl ActionSource {
    fn arm_reason(self) -> ArmDisarmReason {
        match self {
            ActionSource::RcStickGesture => ArmDisarmReason::RcStick,
            ActionSource::RcSwitch | ActionSource::RcModeSlot => ArmDisarmReason::RcSwitch,
            ActionSource::RcButton => ArmDisarmReason::RcButton,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Arm,
    Disarm,
    ToggleArming,
    Kill,
    Unkill,
    SwitchMode(MainState),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionRequest {
    pub timestamp: u64,
    pub source: ActionSource,
    pub action: Action,
}

impl ActionRequest {
    pub fn new(source: ActionSource, action: Action, timestamp: u64) -> Self {
        Self {
            timestamp,
            source,
            action,
        }
    }
}

impl<H: HealthChecks, W: WorkerTask> Commander<H, W> {
    /// Execute one pilot action. Returns `None` when the request was
    /// ignored without evaluation.
    pub fn execute_action_request(
        &mut self,
        request: &ActionRequest,
        now_us: u64,
    ) -> Option<TransitionResult> {
        // Sticks and switches are meaningless while being calibrated
        if self.flags.rc_calibration_in_progress {
            return None;
        }

        let reason = request.source.arm_reason();

        let result = match request.action {
            Action::Arm => self.arm(reason, true, now_us),
            Action::Disarm => self.disarm(reason, false, now_us),
            Action::ToggleArming => {
                if self.arm_state.is_armed() {
                    self.disarm(reason, false, now_us)
                } else {
                    self.arm(reason, true, now_us)
                }
            }
            Action::Kill => self.engage_kill(request.source, now_us),
            Action::Unkill => {
                if self.kill_source != Some(request.source) {
                    return None;
                }
                self.release_kill()
            }
            Action::SwitchMode(target) => {
                if request.source == ActionSource::RcModeSlot
                    && self.commander_state.main_state_changes == 0
                {
                    self.set_initial_main_state(target, now_us)
                } else {
                    self.request_main_state(target, now_us)
                }
            }
        };

        Some(result)
    }

    fn engage_kill(&mut self, source: ActionSource, now_us: u64) -> TransitionResult {
        if self.armed.manual_lockdown {
            return TransitionResult::NotChanged;
        }

        self.armed.manual_lockdown = true;
        self.kill_source = Some(source);
        self.events
            .push("commander_kill_engaged", Severity::Emergency, "Kill-switch engaged");

        if self.arm_state.is_armed() && self.kill_latch.trigger() {
            self.outbox.push_parachute_release(
                self.status.system_id,
                self.status.component_id,
                now_us,
            );
        }
        TransitionResult::Changed
    }

    fn release_kill(&mut self) -> TransitionResult {
        if !self.armed.manual_lockdown {
            return TransitionResult::NotChanged;
        }

        self.armed.manual_lockdown = false;
        self.kill_source = None;
        self.kill_latch.reset();
        self.events
            .push("commander_kill_disengaged", Severity::Info, "Kill-switch disengaged");
        TransitionResult::Changed
    }

    /// First mode selection before any transition took place. Applied
    /// without the availability table so a vehicle without position can
    /// still leave its boot default.
    fn set_initial_main_state(&mut self, target: MainState, now_us: u64) -> TransitionResult {
        if self.commander_state.main_state == target {
            return TransitionResult::NotChanged;
        }
        self.commander_state.main_state = target;
        self.commander_state.main_state_changes = 1;
        self.commander_state.timestamp = now_us;
        TransitionResult::Changed
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{commander, standby};
    use super::*;
    use crate::command::opcode;
    use crate::vehicle::ArmingState;

    fn request(source: ActionSource, action: Action) -> ActionRequest {
        ActionRequest::new(source, action, 0)
    }

    #[test]
    fn test_stick_arm_and_toggle() {
        let mut c = commander();
        standby(&mut c);

        let result = c.execute_action_request(
            &request(ActionSource::RcStickGesture, Action::Arm),
            2_000_000,
        );
        assert_eq!(result, Some(TransitionResult::Changed));
        assert_eq!(c.arming_state(), ArmingState::Armed);

        let result = c.execute_action_request(
            &request(ActionSource::RcButton, Action::ToggleArming),
            2_100_000,
        );
        assert_eq!(result, Some(TransitionResult::Changed));
        assert_eq!(c.arming_state(), ArmingState::Standby);
    }

    #[test]
    fn test_rearm_grace_skips_checks_for_gestures() {
        let mut c = commander();
        standby(&mut c);
        let _ = c.execute_action_request(&request(ActionSource::RcSwitch, Action::Arm), 2_000_000);
        let _ = c.execute_action_request(&request(ActionSource::RcSwitch, Action::Disarm), 3_000_000);

        c.health_mut().arming_allowed = false;
        let result =
            c.execute_action_request(&request(ActionSource::RcSwitch, Action::Arm), 4_000_000);
        assert_eq!(result, Some(TransitionResult::Changed));

        let _ = c.execute_action_request(&request(ActionSource::RcSwitch, Action::Disarm), 4_100_000);
        let result =
            c.execute_action_request(&request(ActionSource::RcSwitch, Action::Arm), 10_000_000);
        assert_eq!(result, Some(TransitionResult::Denied));
    }

    #[test]
    fn test_suppressed_during_rc_calibration() {
        let mut c = commander();
        standby(&mut c);
        c.flags.rc_calibration_in_progress = true;
        assert_eq!(
            c.execute_action_request(&request(ActionSource::RcSwitch, Action::Arm), 2_000_000),
            None
        );
        assert_eq!(c.arming_state(), ArmingState::Standby);
    }

    #[test]
    fn test_kill_releases_parachute_once_per_edge() {
        let mut c = commander();
        standby(&mut c);
        let _ = c.execute_action_request(&request(ActionSource::RcSwitch, Action::Arm), 2_000_000);

        let kill = request(ActionSource::RcSwitch, Action::Kill);
        assert_eq!(c.execute_action_request(&kill, 2_100_000), Some(TransitionResult::Changed));
        assert_eq!(c.execute_action_request(&kill, 2_200_000), Some(TransitionResult::NotChanged));
        assert!(c.armed().manual_lockdown);
        assert_eq!(c.outbox_mut().command_count(opcode::DO_PARACHUTE), 1);

        // A button cannot release a switch kill
        assert_eq!(
            c.execute_action_request(&request(ActionSource::RcButton, Action::Unkill), 2_300_000),
            None
        );
        assert!(c.armed().manual_lockdown);

        let unkill = request(ActionSource::RcSwitch, Action::Unkill);
        assert_eq!(c.execute_action_request(&unkill, 2_400_000), Some(TransitionResult::Changed));
        assert!(!c.armed().manual_lockdown);

        let _ = c.execute_action_request(&kill, 2_500_000);
        assert_eq!(c.outbox_mut().command_count(opcode::DO_PARACHUTE), 2);
    }

    #[test]
    fn test_mode_slot_bootstraps_initial_state() {
        let mut c = commander();
        let slot = request(ActionSource::RcModeSlot, Action::SwitchMode(MainState::Posctl));

        // No position yet, but nothing was ever selected
        assert_eq!(c.execute_action_request(&slot, 0), Some(TransitionResult::Changed));
        assert_eq!(c.commander_state().main_state, MainState::Posctl);
        assert_eq!(c.commander_state().main_state_changes, 1);

        // Later selections go through the availability table
        let slot = request(ActionSource::RcModeSlot, Action::SwitchMode(MainState::AutoLoiter));
        assert_eq!(c.execute_action_request(&slot, 10), Some(TransitionResult::Denied));
        assert_eq!(c.commander_state().main_state, MainState::Posctl);
    }
}
