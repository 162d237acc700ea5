//! Tri-state transition result shared by the arming and main state machines.

/// Outcome of a state transition request.
///
/// Callers must branch on the result. A `Denied` transition never mutates
/// the state record it was asked to change.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionResult {
    /// The state changed to the requested value
    Changed,
    /// The requested state was already active
    NotChanged,
    /// The transition is not allowed in the current context
    Denied,
}

impl TransitionResult {
    pub fn is_changed(self) -> bool {
        self == TransitionResult::Changed
    }

    pub fn is_denied(self) -> bool {
        self == TransitionResult::Denied
    }
}

impl core::fmt::Display for TransitionResult {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TransitionResult::Changed => write!(f, "changed"),
            TransitionResult::NotChanged => write!(f, "not changed"),
            TransitionResult::Denied => write!(f, "denied"),
        }
    }
}
