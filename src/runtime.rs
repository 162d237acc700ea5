//! Commander and navigator task drivers
//!
//! Each runner wraps one decision-core component and connects it to the
//! [`Bus`]. A call to `step` is one complete cycle:
//!
//! 1. Take the latest command (and action request) from the bus, logging
//!    any overwritten generations
//! 2. Run the component cycle with the caller's sensor records merged with
//!    the records other tasks published
//! 3. Publish the component's records, rate limited unless they changed
//! 4. Forward acknowledgments and generated commands to the bus
//! 5. Drain the event log into the log macros and the STATUSTEXT queue
//!
//! The runners never block. Without the `embassy` feature the caller
//! (tests, a simulator loop) decides when to step them.

use warden_core::command::VehicleCommand;
use warden_core::commander::{
    ActionRequest, Commander, CycleInputs, CycleReport, Outbox, PublishGate,
};
use warden_core::events::EventLog;
use warden_core::navigator::{Navigator, NavigatorInputs, NavigatorReport};
use warden_core::traits::{Geofence, HealthChecks, WorkerTask};

use crate::bus::Bus;
use crate::logging::log_event;
use crate::status_notifier;
use crate::topic::Subscriber;

/// Take the newest value, reporting generations that were overwritten
fn poll_latest<T: Copy>(subscriber: &mut Subscriber<'_, T>, _topic: &str) -> Option<T> {
    let update = subscriber.poll()?;
    if let Err(_err) = update.gap() {
        crate::log_warn!("{}: {} message(s) lost", _topic, update.missed);
    }
    Some(update.value)
}

fn drain_events(events: &mut EventLog) {
    while let Some(event) = events.pop() {
        log_event(&event);
        status_notifier::notify_event(&event);
    }
}

fn forward_acks_and_commands(outbox: &mut Outbox, bus: &Bus) {
    while let Some(ack) = outbox.pop_ack() {
        bus.push_ack(ack);
    }
    while let Some(command) = outbox.pop_command() {
        bus.vehicle_command.publish(command);
    }
}

pub struct CommanderRunner<'b, H: HealthChecks, W: WorkerTask> {
    commander: Commander<H, W>,
    bus: &'b Bus,
    commands: Subscriber<'b, VehicleCommand>,
    actions: Subscriber<'b, ActionRequest>,
}

impl<'b, H: HealthChecks, W: WorkerTask> CommanderRunner<'b, H, W> {
    pub fn new(commander: Commander<H, W>, bus: &'b Bus) -> Self {
        Self {
            commander,
            bus,
            commands: bus.vehicle_command.subscribe(),
            actions: bus.action_request.subscribe(),
        }
    }

    pub fn commander(&self) -> &Commander<H, W> {
        &self.commander
    }

    pub fn commander_mut(&mut self) -> &mut Commander<H, W> {
        &mut self.commander
    }

    /// Run one commander cycle
    ///
    /// Commands and the action request come from the bus. Link times,
    /// the geofence result and the mission result come from the bus once
    /// published there, otherwise from `sensors`.
    pub fn step(&mut self, sensors: &CycleInputs<'_>, now_us: u64) -> CycleReport {
        let command = poll_latest(&mut self.commands, "vehicle_command");
        let action_request = poll_latest(&mut self.actions, "action_request");

        let inputs = CycleInputs {
            telemetry: self.bus.telemetry_status.latest().unwrap_or(sensors.telemetry),
            geofence: self.bus.geofence_result.latest().unwrap_or(sensors.geofence),
            mission: self.bus.mission_result.latest().unwrap_or(sensors.mission),
            commands: command.as_slice(),
            action_request,
            ..*sensors
        };

        let report = self.commander.run_cycle(&inputs, now_us);
        if report.nav_state_changed {
            crate::log_info!("Navigation state: {}", self.commander.status().nav_state.as_str());
        }
        if report.published {
            self.publish();
        }

        let outbox = self.commander.outbox_mut();
        forward_acks_and_commands(outbox, self.bus);
        if let Some(test) = outbox.take_actuator_test() {
            self.bus.actuator_test.publish(test);
        }
        if let Some(action) = outbox.take_power_request() {
            crate::log_warn!("Power action requested");
            self.bus.power_request.publish(action);
        }

        drain_events(self.commander.events_mut());
        report
    }

    fn publish(&self) {
        let c = &self.commander;
        self.bus.vehicle_status.publish(*c.status());
        self.bus.status_flags.publish(*c.flags());
        self.bus.actuator_armed.publish(*c.armed());
        self.bus.control_mode.publish(*c.control_mode());
        self.bus.commander_state.publish(*c.commander_state());
        self.bus.home_position.publish(*c.home());
    }
}

pub struct NavigatorRunner<'b, G: Geofence> {
    navigator: Navigator<G>,
    bus: &'b Bus,
    commands: Subscriber<'b, VehicleCommand>,
    publish_gate: PublishGate,
}

impl<'b, G: Geofence> NavigatorRunner<'b, G> {
    pub fn new(navigator: Navigator<G>, bus: &'b Bus) -> Self {
        Self {
            navigator,
            bus,
            commands: bus.vehicle_command.subscribe(),
            publish_gate: PublishGate::default(),
        }
    }

    pub fn navigator(&self) -> &Navigator<G> {
        &self.navigator
    }

    pub fn navigator_mut(&mut self) -> &mut Navigator<G> {
        &mut self.navigator
    }

    /// Run one navigator cycle
    ///
    /// The vehicle status and home position come from the commander's
    /// topics once published, otherwise from `sensors`.
    pub fn step(&mut self, sensors: &NavigatorInputs<'_>, now_us: u64) -> NavigatorReport {
        let command = poll_latest(&mut self.commands, "vehicle_command");

        let inputs = NavigatorInputs {
            status: self.bus.vehicle_status.latest().unwrap_or(sensors.status),
            home: self.bus.home_position.latest().unwrap_or(sensors.home),
            commands: command.as_slice(),
            ..*sensors
        };

        let report = self.navigator.run_cycle(&inputs, now_us);

        if let Some(result) = report.geofence {
            self.bus.geofence_result.publish(result);
        }

        let changed = report.triplet_updated || report.mission_result_updated;
        if self.publish_gate.should_publish(changed, now_us) {
            let mut triplet = *self.navigator.triplet();
            triplet.timestamp = now_us;
            self.bus.position_setpoint_triplet.publish(triplet);

            let mut mission = *self.navigator.mission_result();
            mission.timestamp = now_us;
            self.bus.mission_result.publish(mission);
        }

        if report.roi_updated {
            let mut roi = *self.navigator.roi();
            roi.timestamp = now_us;
            self.bus.vehicle_roi.publish(roi);
        }

        forward_acks_and_commands(self.navigator.outbox_mut(), self.bus);
        drain_events(self.navigator.events_mut());
        report
    }
}
