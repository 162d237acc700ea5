//! Arming state machine
//!
//! The only writer of `ActuatorArmed::armed` and `VehicleStatus::arming_state`.
//! Transitions are gated by a fixed table plus contextual predicates; a denied
//! transition leaves every record untouched.

use super::error::{ArmingDenied, DisarmDenied};
use super::reason::ArmDisarmReason;
use crate::events::{EventLog, Severity};
use crate::traits::HealthChecks;
use crate::transition::TransitionResult;
use crate::vehicle::{ActuatorArmed, ArmingState, VehicleStatus};

/// Context evaluated by the caller for one transition request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmRequest {
    pub target: ArmingState,
    pub reason: ArmDisarmReason,
    pub run_preflight_checks: bool,
    pub forced: bool,
    /// Landed, or manual thrust commanded directly by the pilot
    pub safe_to_disarm: bool,
    /// A worker task is running
    pub worker_busy: bool,
}

impl ArmRequest {
    pub fn new(target: ArmingState, reason: ArmDisarmReason) -> Self {
        Self {
            target,
            reason,
            run_preflight_checks: false,
            forced: false,
            safe_to_disarm: false,
            worker_busy: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ArmStateMachine {
    state: ArmingState,
}

/// Static transition table; contextual predicates are applied on top.
fn transition_allowed(from: ArmingState, to: ArmingState) -> bool {
    use ArmingState::*;

    match (from, to) {
        (InAirRestore, Armed) => true,
        (InAirRestore, _) => false,
        (_, InAirRestore) => false,
        (Standby, Armed) => true,
        (_, Armed) => false,
        (Armed, Standby) => true,
        (Armed, _) => false,
        (Init | StandbyError | Shutdown, Standby) => true,
        (Standby | StandbyError | Shutdown, Init) => true,
        (Init | Standby | StandbyError, Shutdown) => true,
        (Init | Standby, StandbyError) => true,
        _ => false,
    }
}

impl ArmStateMachine {
    pub fn new() -> Self {
        Self {
            state: ArmingState::Init,
        }
    }

    pub fn state(&self) -> ArmingState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        self.state == ArmingState::Armed
    }

    pub fn is_init(&self) -> bool {
        self.state == ArmingState::Init
    }

    pub fn is_standby(&self) -> bool {
        self.state == ArmingState::Standby
    }

    pub fn is_shutdown(&self) -> bool {
        self.state == ArmingState::Shutdown
    }

    /// Whether a request to `target` would pass the static table
    pub fn can_transition_to(&self, target: ArmingState) -> bool {
        self.state == target || transition_allowed(self.state, target)
    }

    /// Request a transition to `req.target`.
    #[allow(clippy::too_many_arguments)]
    pub fn request<H: HealthChecks>(
        &mut self,
        req: &ArmRequest,
        status: &mut VehicleStatus,
        armed: &mut ActuatorArmed,
        checks: &mut H,
        now_us: u64,
        events: &mut EventLog,
    ) -> TransitionResult {
        let from = self.state;
        let to = req.target;

        if from == to {
            return TransitionResult::NotChanged;
        }

        if !transition_allowed(from, to) {
            if to == ArmingState::Armed {
                let denied = ArmingDenied::InvalidTransition { from, to };
                events.push_fmt(denied.event_id(), Severity::Critical, format_args!("{}", denied));
            } else if from == ArmingState::Armed {
                let denied = DisarmDenied::InvalidTransition { from };
                events.push_fmt(denied.event_id(), Severity::Critical, format_args!("{}", denied));
            } else {
                events.push_fmt(
                    "commander_arming_transition_denied",
                    Severity::Warning,
                    format_args!("Arming state {} to {} denied", from, to),
                );
            }
            return TransitionResult::Denied;
        }

        if from == ArmingState::Armed && !req.safe_to_disarm && !req.forced {
            // Caller already reported the user-facing reason
            return TransitionResult::Denied;
        }

        if to == ArmingState::Shutdown && req.worker_busy {
            events.push(
                "commander_shutdown_denied_busy",
                Severity::Warning,
                "Shutdown denied: worker task running",
            );
            return TransitionResult::Denied;
        }

        if to == ArmingState::Armed && req.run_preflight_checks {
            checks.update(false);
            if !checks.can_arm(status.nav_state) {
                let denied = ArmingDenied::PreflightChecksFailed;
                events.push_fmt(denied.event_id(), Severity::Critical, format_args!("{}", denied));
                return TransitionResult::Denied;
            }
        }

        self.apply(to, status, armed, now_us);
        TransitionResult::Changed
    }

    /// Set the state without checks. Only for trusted internal paths such as
    /// restoring an in-air restart.
    pub fn force_arm_state(
        &mut self,
        state: ArmingState,
        status: &mut VehicleStatus,
        armed: &mut ActuatorArmed,
        now_us: u64,
    ) {
        self.apply(state, status, armed, now_us);
    }

    fn apply(
        &mut self,
        to: ArmingState,
        status: &mut VehicleStatus,
        armed: &mut ActuatorArmed,
        now_us: u64,
    ) {
        if to == ArmingState::Armed && self.state != ArmingState::Armed {
            status.armed_time = now_us;
        }
        self.state = to;
        status.arming_state = to;
        armed.armed = to == ArmingState::Armed;
        armed.ready_to_arm = matches!(to, ArmingState::Armed | ArmingState::Standby);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MockHealthChecks;

    struct Fixture {
        sm: ArmStateMachine,
        status: VehicleStatus,
        armed: ActuatorArmed,
        checks: MockHealthChecks,
        events: EventLog,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                sm: ArmStateMachine::new(),
                status: VehicleStatus::default(),
                armed: ActuatorArmed::default(),
                checks: MockHealthChecks::passing(),
                events: EventLog::new(),
            }
        }

        fn request(&mut self, req: ArmRequest, now_us: u64) -> TransitionResult {
            self.sm.request(
                &req,
                &mut self.status,
                &mut self.armed,
                &mut self.checks,
                now_us,
                &mut self.events,
            )
        }

        fn to_standby(&mut self) {
            let req = ArmRequest::new(ArmingState::Standby, ArmDisarmReason::TransitionToStandby);
            assert_eq!(self.request(req, 0), TransitionResult::Changed);
        }
    }

    #[test]
    fn test_arm_from_init_denied() {
        let mut f = Fixture::new();
        let req = ArmRequest::new(ArmingState::Armed, ArmDisarmReason::CommandExternal);
        assert_eq!(f.request(req, 0), TransitionResult::Denied);
        assert!(!f.armed.armed);
        assert_eq!(f.status.arming_state, ArmingState::Init);
        assert!(f.events.contains("commander_arm_denied_transition"));
    }

    #[test]
    fn test_arm_from_standby_sets_armed_time() {
        let mut f = Fixture::new();
        f.to_standby();
        let req = ArmRequest::new(ArmingState::Armed, ArmDisarmReason::CommandExternal);
        assert_eq!(f.request(req, 1_000), TransitionResult::Changed);
        assert!(f.armed.armed);
        assert!(f.armed.ready_to_arm);
        assert_eq!(f.status.armed_time, 1_000);
        assert_eq!(f.status.arming_state, ArmingState::Armed);
    }

    #[test]
    fn test_preflight_failure_leaves_state_untouched() {
        let mut f = Fixture::new();
        f.to_standby();
        f.checks.arming_allowed = false;
        let before_status = f.status;
        let before_armed = f.armed;

        let mut req = ArmRequest::new(ArmingState::Armed, ArmDisarmReason::CommandExternal);
        req.run_preflight_checks = true;
        assert_eq!(f.request(req, 5), TransitionResult::Denied);
        assert_eq!(f.status, before_status);
        assert_eq!(f.armed, before_armed);
        assert_eq!(f.checks.updates, 1);
    }

    #[test]
    fn test_preflight_skipped_when_not_requested() {
        let mut f = Fixture::new();
        f.to_standby();
        f.checks.arming_allowed = false;
        let req = ArmRequest::new(ArmingState::Armed, ArmDisarmReason::CommandExternal);
        assert_eq!(f.request(req, 5), TransitionResult::Changed);
        assert_eq!(f.checks.updates, 0);
    }

    #[test]
    fn test_disarm_requires_safe_or_forced() {
        let mut f = Fixture::new();
        f.to_standby();
        let arm = ArmRequest::new(ArmingState::Armed, ArmDisarmReason::CommandExternal);
        assert!(f.request(arm, 0).is_changed());

        let mut disarm = ArmRequest::new(ArmingState::Standby, ArmDisarmReason::CommandExternal);
        assert_eq!(f.request(disarm, 1), TransitionResult::Denied);
        assert!(f.armed.armed);

        disarm.forced = true;
        assert_eq!(f.request(disarm, 2), TransitionResult::Changed);
        assert!(!f.armed.armed);
    }

    #[test]
    fn test_shutdown_rules() {
        let mut f = Fixture::new();
        f.to_standby();

        let mut req = ArmRequest::new(ArmingState::Shutdown, ArmDisarmReason::Shutdown);
        req.worker_busy = true;
        assert_eq!(f.request(req, 0), TransitionResult::Denied);

        req.worker_busy = false;
        assert_eq!(f.request(req, 0), TransitionResult::Changed);

        let mut f = Fixture::new();
        f.to_standby();
        let arm = ArmRequest::new(ArmingState::Armed, ArmDisarmReason::CommandExternal);
        assert!(f.request(arm, 0).is_changed());
        let shutdown = ArmRequest::new(ArmingState::Shutdown, ArmDisarmReason::Shutdown);
        assert_eq!(f.request(shutdown, 0), TransitionResult::Denied);
        let init = ArmRequest::new(ArmingState::Init, ArmDisarmReason::CommandInternal);
        assert_eq!(f.request(init, 0), TransitionResult::Denied);
    }

    #[test]
    fn test_in_air_restore_only_to_armed() {
        let mut f = Fixture::new();
        f.sm.force_arm_state(ArmingState::InAirRestore, &mut f.status, &mut f.armed, 0);

        let standby = ArmRequest::new(ArmingState::Standby, ArmDisarmReason::CommandInternal);
        assert_eq!(f.request(standby, 0), TransitionResult::Denied);

        let arm = ArmRequest::new(ArmingState::Armed, ArmDisarmReason::CommandInternal);
        assert_eq!(f.request(arm, 0), TransitionResult::Changed);
    }

    #[test]
    fn test_same_state_not_changed() {
        let mut f = Fixture::new();
        let req = ArmRequest::new(ArmingState::Init, ArmDisarmReason::CommandInternal);
        assert_eq!(f.request(req, 0), TransitionResult::NotChanged);
    }

    #[test]
    fn test_armed_only_from_standby_or_restore() {
        use ArmingState::*;
        for from in [Init, Standby, Armed, StandbyError, Shutdown, InAirRestore] {
            let allowed = transition_allowed(from, Armed);
            assert_eq!(allowed, matches!(from, Standby | InAirRestore), "from {:?}", from);
        }
    }
}
