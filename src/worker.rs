//! Worker-task slot
//!
//! Long calibration and parameter-storage jobs run outside the commander
//! task. The commander hands a request to a [`WorkerSlot`] through
//! [`SlotWorker`] and polls it every cycle; the worker context takes the
//! request, does the work and posts the status back. One job at a time.

use core::cell::RefCell;
use critical_section::Mutex;
use warden_core::traits::{WorkerRequest, WorkerStatus, WorkerTask};

#[derive(Debug, Clone, Copy, PartialEq)]
enum SlotState {
    Idle,
    /// Started, not yet picked up by the worker
    Pending(WorkerRequest),
    Running(WorkerRequest),
    Done(WorkerStatus),
}

/// Shared mailbox between the commander and the worker context
pub struct WorkerSlot {
    state: Mutex<RefCell<SlotState>>,
}

impl WorkerSlot {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(SlotState::Idle)),
        }
    }

    /// Worker side: take the pending request, if any
    pub fn take_request(&self) -> Option<WorkerRequest> {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            match *state {
                SlotState::Pending(request) => {
                    *state = SlotState::Running(request);
                    Some(request)
                }
                _ => None,
            }
        })
    }

    /// Worker side: finish the running request
    pub fn post_result(&self, status: WorkerStatus) {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            if matches!(*state, SlotState::Running(_) | SlotState::Pending(_)) {
                *state = SlotState::Done(status);
            } else {
                crate::log_warn!("Worker result posted without a running task");
            }
        });
    }

    pub fn running(&self) -> Option<WorkerRequest> {
        critical_section::with(|cs| match *self.state.borrow_ref(cs) {
            SlotState::Pending(request) | SlotState::Running(request) => Some(request),
            _ => None,
        })
    }

    fn start(&self, request: WorkerRequest) -> bool {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            if matches!(*state, SlotState::Pending(_) | SlotState::Running(_)) {
                return false;
            }
            *state = SlotState::Pending(request);
            true
        })
    }

    fn is_busy(&self) -> bool {
        self.running().is_some()
    }

    fn has_result(&self) -> bool {
        critical_section::with(|cs| matches!(*self.state.borrow_ref(cs), SlotState::Done(_)))
    }

    fn take_result(&self) -> WorkerStatus {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            let status = match *state {
                SlotState::Done(status) => status,
                _ => WorkerStatus::Success,
            };
            *state = SlotState::Idle;
            status
        })
    }
}

impl Default for WorkerSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Commander-side handle implementing [`WorkerTask`]
#[derive(Clone, Copy)]
pub struct SlotWorker<'a> {
    slot: &'a WorkerSlot,
}

impl<'a> SlotWorker<'a> {
    pub fn new(slot: &'a WorkerSlot) -> Self {
        Self { slot }
    }
}

impl WorkerTask for SlotWorker<'_> {
    fn start_task(&mut self, request: WorkerRequest) {
        if !self.slot.start(request) {
            crate::log_error!("Worker busy, request dropped");
        }
    }

    fn is_busy(&self) -> bool {
        self.slot.is_busy()
    }

    fn has_result(&self) -> bool {
        self.slot.has_result()
    }

    fn get_result_and_reset(&mut self) -> WorkerStatus {
        self.slot.take_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_result_cycle() {
        let slot = WorkerSlot::new();
        let mut worker = SlotWorker::new(&slot);
        assert!(!worker.is_busy());

        worker.start_task(WorkerRequest::GyroCalibration);
        assert!(worker.is_busy());
        assert!(!worker.has_result());

        assert_eq!(slot.take_request(), Some(WorkerRequest::GyroCalibration));
        assert!(slot.take_request().is_none());
        assert!(worker.is_busy());

        slot.post_result(WorkerStatus::Failed(-1));
        assert!(!worker.is_busy());
        assert!(worker.has_result());
        assert_eq!(worker.get_result_and_reset(), WorkerStatus::Failed(-1));
        assert!(!worker.has_result());
    }

    #[test]
    fn test_second_start_while_busy_is_ignored() {
        let slot = WorkerSlot::new();
        let mut worker = SlotWorker::new(&slot);
        worker.start_task(WorkerRequest::MagCalibration);
        worker.start_task(WorkerRequest::BaroCalibration);
        assert_eq!(slot.running(), Some(WorkerRequest::MagCalibration));
    }
}
