//! Records produced by the commander for other subsystems
//!
//! Acknowledgments, internal vehicle commands (parachute release), the
//! direct actuator test request and power requests are queued here and
//! drained by the runtime after each call.

use heapless::Deque;

use crate::command::{opcode, CommandAck, PowerAction, VehicleCommand};
use crate::vehicle::ActuatorTest;

/// Acknowledgments buffered between two drains
pub const ACK_QUEUE_LEN: usize = 8;

/// Internal vehicle commands buffered between two drains
pub const COMMAND_QUEUE_LEN: usize = 4;

/// DO_PARACHUTE param1 value for release
pub const PARACHUTE_RELEASE: f32 = 2.0;

#[derive(Debug, Default)]
pub struct Outbox {
    acks: Deque<CommandAck, ACK_QUEUE_LEN>,
    commands: Deque<VehicleCommand, COMMAND_QUEUE_LEN>,
    actuator_test: Option<ActuatorTest>,
    power_request: Option<PowerAction>,
    dropped: u32,
}

impl Outbox {
    pub const fn new() -> Self {
        Self {
            acks: Deque::new(),
            commands: Deque::new(),
            actuator_test: None,
            power_request: None,
            dropped: 0,
        }
    }

    pub fn push_ack(&mut self, ack: CommandAck) {
        if self.acks.is_full() {
            let _ = self.acks.pop_front();
            self.dropped = self.dropped.saturating_add(1);
        }
        let _ = self.acks.push_back(ack);
    }

    pub fn pop_ack(&mut self) -> Option<CommandAck> {
        self.acks.pop_front()
    }

    pub fn ack_count(&self) -> usize {
        self.acks.len()
    }

    pub fn push_command(&mut self, command: VehicleCommand) {
        if self.commands.is_full() {
            let _ = self.commands.pop_front();
            self.dropped = self.dropped.saturating_add(1);
        }
        let _ = self.commands.push_back(command);
    }

    pub fn pop_command(&mut self) -> Option<VehicleCommand> {
        self.commands.pop_front()
    }

    /// Queued internal commands with opcode `command`
    pub fn command_count(&self, command: u16) -> usize {
        self.commands.iter().filter(|c| c.command == command).count()
    }

    /// Queue a parachute release addressed to ourselves
    pub fn push_parachute_release(&mut self, system_id: u8, component_id: u8, now_us: u64) {
        let mut cmd = VehicleCommand::new(opcode::DO_PARACHUTE);
        cmd.timestamp = now_us;
        cmd.param1 = PARACHUTE_RELEASE;
        cmd.target_system = system_id;
        cmd.target_component = component_id;
        cmd.source_system = system_id;
        cmd.source_component = component_id;
        self.push_command(cmd);
    }

    pub fn set_actuator_test(&mut self, test: ActuatorTest) {
        self.actuator_test = Some(test);
    }

    pub fn take_actuator_test(&mut self) -> Option<ActuatorTest> {
        self.actuator_test.take()
    }

    pub fn request_power(&mut self, action: PowerAction) {
        self.power_request = Some(action);
    }

    pub fn take_power_request(&mut self) -> Option<PowerAction> {
        self.power_request.take()
    }

    /// Records lost to a full queue
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}
