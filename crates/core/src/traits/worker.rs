//! Worker-task interface for long-running out-of-band operations.
//!
//! Calibration and parameter storage operations run on a separate execution
//! context. The commander starts at most one task and polls for its result
//! every cycle instead of blocking.

/// Work item handed to the worker
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WorkerRequest {
    GyroCalibration,
    MagCalibration,
    BaroCalibration,
    RcTrimCalibration,
    AccelCalibration,
    LevelCalibration,
    AccelCalibrationQuick,
    AirspeedCalibration,
    EscCalibration,
    /// Quick magnetometer calibration from a known heading (radians) and position,
    /// latitude and longitude NaN when unknown
    MagCalibrationQuick { heading_rad: f32, lat: f32, lon: f32 },
    ParamLoadDefault,
    ParamSaveDefault,
    ParamResetAllConfig,
    ParamResetSensorFactory,
    ParamResetAll,
}

/// Terminal status of a worker task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStatus {
    Success,
    Failed(i32),
}

pub trait WorkerTask {
    /// Start a task. Callers check `is_busy` first.
    fn start_task(&mut self, request: WorkerRequest);

    fn is_busy(&self) -> bool;

    fn has_result(&self) -> bool;

    /// Take the result and return the worker to idle
    fn get_result_and_reset(&mut self) -> WorkerStatus;
}

/// Worker that records requests and completes on demand
#[derive(Debug, Clone, Default)]
pub struct MockWorker {
    pub started: Option<WorkerRequest>,
    pub start_count: u32,
    busy: bool,
    result: Option<WorkerStatus>,
}

impl MockWorker {
    /// Finish the running task with `status`
    pub fn complete(&mut self, status: WorkerStatus) {
        self.busy = false;
        self.result = Some(status);
    }
}

impl WorkerTask for MockWorker {
    fn start_task(&mut self, request: WorkerRequest) {
        self.started = Some(request);
        self.start_count += 1;
        self.busy = true;
        self.result = None;
    }

    fn is_busy(&self) -> bool {
        self.busy
    }

    fn has_result(&self) -> bool {
        self.result.is_some()
    }

    fn get_result_and_reset(&mut self) -> WorkerStatus {
        self.busy = false;
        self.result.take().unwrap_or(WorkerStatus::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_worker_lifecycle() {
        let mut worker = MockWorker::default();
        assert!(!worker.is_busy());

        worker.start_task(WorkerRequest::GyroCalibration);
        assert!(worker.is_busy());
        assert!(!worker.has_result());

        worker.complete(WorkerStatus::Failed(-1));
        assert!(worker.has_result());
        assert_eq!(worker.get_result_and_reset(), WorkerStatus::Failed(-1));
        assert!(!worker.has_result());
        assert!(!worker.is_busy());
    }
}
