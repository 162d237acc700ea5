//! Battery warning escalation
//!
//! A rising warning level while armed selects a reaction from
//! COM_LOW_BAT_ACT. The reaction is held off for COM_BAT_ACT_T, during
//! which the vehicle loiters. The resulting override stays in force until
//! the pilot selects another main state.

use crate::events::{EventLog, Severity};
use crate::latch::OneShot;
use crate::vehicle::{BatteryStatus, BatteryWarning};

use super::LowBatteryAction;

/// Navigation override requested by the battery failsafe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatteryOverride {
    Loiter,
    ReturnToLaunch,
    Land,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pending {
    reaction: BatteryOverride,
    deadline_us: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Active {
    reaction: BatteryOverride,
    main_state_changes: u32,
}

/// Inputs sampled once per cycle
#[derive(Debug, Clone, Copy)]
pub struct BatteryContext {
    pub armed: bool,
    pub home_valid: bool,
    pub main_state_changes: u32,
    pub action: LowBatteryAction,
    pub reaction_delay_us: u64,
}

#[derive(Debug, Clone, Default)]
pub struct BatteryFailsafe {
    warning: BatteryWarning,
    pending: Option<Pending>,
    active: Option<Active>,
    remaining_time_rtl: OneShot,
}

impl BatteryFailsafe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warning(&self) -> BatteryWarning {
        self.warning
    }

    /// Reaction delay running
    pub fn is_delaying(&self) -> bool {
        self.pending.is_some()
    }

    /// Current override, `None` once the pilot changed the main state
    pub fn override_mode(&self, main_state_changes: u32) -> Option<BatteryOverride> {
        if self.pending.is_some() {
            return Some(BatteryOverride::Loiter);
        }

        self.active
            .filter(|active| active.main_state_changes == main_state_changes)
            .map(|active| active.reaction)
    }

    pub fn update(
        &mut self,
        battery: &BatteryStatus,
        ctx: &BatteryContext,
        now_us: u64,
        events: &mut EventLog,
    ) {
        if !ctx.armed {
            self.warning = battery.warning;
            self.pending = None;
            self.active = None;
            self.remaining_time_rtl.reset();
            return;
        }

        if battery.warning > self.warning {
            self.escalate(battery.warning, ctx, now_us, events);
        }
        self.warning = battery.warning;

        if let Some(pending) = self.pending {
            if now_us >= pending.deadline_us {
                self.pending = None;
                self.activate(pending.reaction, ctx.main_state_changes);
            }
        }

        if battery.low_remaining_time() && self.remaining_time_rtl.trigger() {
            events.push(
                "commander_remaining_flight_time_low",
                Severity::Critical,
                "Remaining flight time low, returning to land",
            );
            if ctx.home_valid && self.pending.is_none() {
                self.activate(BatteryOverride::ReturnToLaunch, ctx.main_state_changes);
            }
        }
    }

    fn escalate(
        &mut self,
        level: BatteryWarning,
        ctx: &BatteryContext,
        now_us: u64,
        events: &mut EventLog,
    ) {
        let reaction = match (level, ctx.action) {
            (BatteryWarning::None, _) => return,
            (BatteryWarning::Low, _) => {
                events.push(
                    "commander_low_battery",
                    Severity::Warning,
                    "Low battery level, return advised",
                );
                return;
            }
            (BatteryWarning::Critical, LowBatteryAction::ReturnToLaunch)
            | (BatteryWarning::Critical, LowBatteryAction::ReturnOrLand) => {
                if ctx.home_valid {
                    BatteryOverride::ReturnToLaunch
                } else {
                    BatteryOverride::Land
                }
            }
            (BatteryWarning::Critical, LowBatteryAction::Land) => BatteryOverride::Land,
            (BatteryWarning::Emergency, LowBatteryAction::Land)
            | (BatteryWarning::Emergency, LowBatteryAction::ReturnOrLand) => BatteryOverride::Land,
            (BatteryWarning::Critical, _) => {
                events.push(
                    "commander_critical_battery",
                    Severity::Critical,
                    "Critical battery level, land now",
                );
                return;
            }
            (BatteryWarning::Emergency, _) => {
                events.push(
                    "commander_emergency_battery",
                    Severity::Emergency,
                    "Emergency battery level, land immediately",
                );
                return;
            }
        };

        events.push_fmt(
            "commander_battery_failsafe",
            Severity::Critical,
            format_args!("Battery {:?}, executing {:?}", level, reaction),
        );

        if ctx.reaction_delay_us > 0 {
            self.pending = Some(Pending {
                reaction,
                deadline_us: now_us.saturating_add(ctx.reaction_delay_us),
            });
        } else {
            self.activate(reaction, ctx.main_state_changes);
        }
    }

    fn activate(&mut self, reaction: BatteryOverride, main_state_changes: u32) {
        self.active = Some(Active {
            reaction,
            main_state_changes,
        });
    }
}
