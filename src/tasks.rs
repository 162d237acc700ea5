//! Embassy task loops
//!
//! Each loop sleeps until its period elapses or another task signals new
//! input, then runs exactly one cycle to completion. A signal raised while
//! a cycle runs is kept and wakes the next wait immediately.
//!
//! # Usage
//!
//! ```ignore
//! #[embassy_executor::task]
//! async fn commander(runner: &'static mut CommanderRunner<'static, Checks, SlotWorker<'static>>) {
//!     commander_loop(runner, |now_us| sample_commander_inputs(now_us)).await
//! }
//! ```

use embassy_futures::select::select;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, Timer};
use mavlink::common::MavMessage;
use mavlink::MavHeader;
use warden_core::commander::CycleInputs;
use warden_core::navigator::NavigatorInputs;
use warden_core::traits::{Geofence, HealthChecks, WorkerRequest, WorkerStatus, WorkerTask};

use crate::mavlink_adapter::MavlinkAdapter;
use crate::runtime::{CommanderRunner, NavigatorRunner};
use crate::worker::WorkerSlot;

/// Longest commander sleep without input
pub const COMMANDER_PERIOD_MS: u64 = 10;

/// Longest navigator sleep without input
pub const NAVIGATOR_PERIOD_MS: u64 = 50;

/// Worker slot poll period
pub const WORKER_POLL_MS: u64 = 100;

pub static COMMANDER_WAKE: Signal<CriticalSectionRawMutex, ()> = Signal::new();
pub static NAVIGATOR_WAKE: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Wake both decision tasks
pub fn wake_all() {
    COMMANDER_WAKE.signal(());
    NAVIGATOR_WAKE.signal(());
}

/// Feed a received message to the adapter and wake the decision tasks
/// when it produced input for them
pub fn on_link_message(
    adapter: &mut MavlinkAdapter<'_>,
    header: &MavHeader,
    msg: &MavMessage,
) -> bool {
    let consumed = adapter.handle_message(header, msg, Instant::now().as_micros());
    if consumed {
        wake_all();
    }
    consumed
}

async fn wait_for_input(wake: &Signal<CriticalSectionRawMutex, ()>, period_ms: u64) {
    let _ = select(Timer::after(Duration::from_millis(period_ms)), wake.wait()).await;
}

/// Commander loop. `sample` returns the sensor records for the cycle at
/// the given time.
pub async fn commander_loop<'p, H, W, F>(runner: &mut CommanderRunner<'_, H, W>, mut sample: F) -> !
where
    H: HealthChecks,
    W: WorkerTask,
    F: FnMut(u64) -> CycleInputs<'p>,
{
    crate::log_info!("Commander task started");
    loop {
        wait_for_input(&COMMANDER_WAKE, COMMANDER_PERIOD_MS).await;
        let now_us = Instant::now().as_micros();
        let sensors = sample(now_us);
        let report = runner.step(&sensors, now_us);
        if report.nav_state_changed {
            // Setpoints follow the new navigation state without waiting a period
            NAVIGATOR_WAKE.signal(());
        }
    }
}

/// Navigator loop. `sample` returns the sensor records for the cycle at
/// the given time.
pub async fn navigator_loop<'p, G, F>(runner: &mut NavigatorRunner<'_, G>, mut sample: F) -> !
where
    G: Geofence,
    F: FnMut(u64) -> NavigatorInputs<'p>,
{
    crate::log_info!("Navigator task started");
    loop {
        wait_for_input(&NAVIGATOR_WAKE, NAVIGATOR_PERIOD_MS).await;
        let now_us = Instant::now().as_micros();
        let sensors = sample(now_us);
        let report = runner.step(&sensors, now_us);
        if report.geofence.is_some_and(|result| result.geofence_violated) {
            COMMANDER_WAKE.signal(());
        }
    }
}

/// Worker loop running calibration and storage jobs one at a time
pub async fn worker_loop<F>(slot: &WorkerSlot, mut run: F) -> !
where
    F: FnMut(WorkerRequest) -> WorkerStatus,
{
    loop {
        Timer::after(Duration::from_millis(WORKER_POLL_MS)).await;
        if let Some(request) = slot.take_request() {
            let status = run(request);
            slot.post_result(status);
            COMMANDER_WAKE.signal(());
        }
    }
}
