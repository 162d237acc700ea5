//! Traffic avoidance
//!
//! Each transponder report is projected along its heading for the
//! collision time horizon. Traffic that is vertically close and whose path
//! passes within the horizontal separation of the vehicle is a conflict.
//! A conflict is reported once per aircraft per [`TRAFFIC_WARNING_INTERVAL_US`]
//! and answered with the configured action.

use bitflags::bitflags;
use heapless::Vec;

use crate::command::mode::{custom_main, custom_sub_auto, BaseMode};
use crate::command::{opcode, VehicleCommand};
use crate::commander::Outbox;
use crate::events::{EventLog, Severity};
use crate::failsafe::TrafficAvoidAction;
use crate::geo::{crosstrack_error, distance_to_point, waypoint_from_heading_and_distance};
use crate::parameters::NavigatorParams;
use crate::vehicle::{GlobalPosition, VehicleStatus};

use super::rtl::RtlBehavior;

/// Aircraft remembered for warning rate limiting
pub const TRAFFIC_BUFFER_LEN: usize = 10;

/// Minimum time between two warnings about the same aircraft
pub const TRAFFIC_WARNING_INTERVAL_US: u64 = 60_000_000;

bitflags! {
    /// Validity flags of a transponder report
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TransponderFlags: u16 {
        const VALID_COORDS = 1 << 0;
        const VALID_ALTITUDE = 1 << 1;
        const VALID_HEADING = 1 << 2;
        const VALID_VELOCITY = 1 << 3;
        const VALID_CALLSIGN = 1 << 4;
        const VALID_SQUAWK = 1 << 5;
        const SIMULATED = 1 << 6;
    }
}

/// ADS-B report about another aircraft
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TransponderReport {
    pub timestamp: u64,
    pub icao_address: u32,
    pub lat: f64,
    pub lon: f64,
    /// AMSL altitude (m)
    pub altitude: f32,
    /// Course over ground (rad)
    pub heading: f32,
    pub hor_velocity: f32,
    /// Climb rate, positive up (m/s)
    pub ver_velocity: f32,
    pub callsign: [u8; 9],
    pub flags: TransponderFlags,
}

impl TransponderReport {
    fn required_flags() -> TransponderFlags {
        TransponderFlags::VALID_COORDS
            | TransponderFlags::VALID_ALTITUDE
            | TransponderFlags::VALID_HEADING
            | TransponderFlags::VALID_VELOCITY
    }

    fn callsign(&self) -> Option<&str> {
        if !self.flags.contains(TransponderFlags::VALID_CALLSIGN) {
            return None;
        }
        let len = self
            .callsign
            .iter()
            .position(|&c| c == 0)
            .unwrap_or(self.callsign.len());
        core::str::from_utf8(&self.callsign[..len])
            .ok()
            .map(str::trim_end)
            .filter(|s| !s.is_empty())
    }
}

/// A predicted conflict
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrafficConflict {
    pub icao_address: u32,
    /// Closest horizontal distance of the traffic path (m)
    pub separation: f32,
    /// Direction the traffic comes from (deg)
    pub direction_deg: i32,
}

#[derive(Debug, Default)]
pub struct TrafficAvoidance {
    /// Last warning time per aircraft
    warned: Vec<(u32, u64), TRAFFIC_BUFFER_LEN>,
}

impl TrafficAvoidance {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a conflict with `report` is predicted
    pub fn predict(
        report: &TransponderReport,
        position: &GlobalPosition,
        params: &NavigatorParams,
    ) -> Option<TrafficConflict> {
        if !report.flags.contains(TransponderReport::required_flags()) {
            return None;
        }

        let horizontal = params.traffic_horizontal_sep;
        let vertical = params.traffic_vertical_sep;
        let horizon = params.traffic_collision_time_s;

        let end_alt = report.altitude + report.ver_velocity * horizon;
        let close_now = libm::fabsf(position.alt - report.altitude) < vertical;
        let close_later = libm::fabsf(position.alt - end_alt) < vertical;
        if !close_now && !close_later {
            return None;
        }

        let d_hor = distance_to_point(position.lat, position.lon, report.lat, report.lon);
        let prediction = (report.hor_velocity * horizon).max(0.0);
        let separation = if d_hor < horizontal {
            d_hor
        } else {
            let (end_lat, end_lon) =
                waypoint_from_heading_and_distance(report.lat, report.lon, report.heading, prediction);
            let (_, cross) = crosstrack_error(
                position.lat,
                position.lon,
                report.lat,
                report.lon,
                end_lat,
                end_lon,
            )?;
            libm::fabsf(cross)
        };
        if separation >= horizontal {
            return None;
        }

        let direction_deg = (libm::roundf(report.heading.to_degrees()) as i32 + 180).rem_euclid(360);
        Some(TrafficConflict {
            icao_address: report.icao_address,
            separation,
            direction_deg,
        })
    }

    /// Rate limit per aircraft. Returns `true` when an action is due.
    fn buffer_air_traffic(&mut self, icao_address: u32, now_us: u64) -> bool {
        if let Some(entry) = self.warned.iter_mut().find(|(icao, _)| *icao == icao_address) {
            if now_us.saturating_sub(entry.1) < TRAFFIC_WARNING_INTERVAL_US {
                return false;
            }
            entry.1 = now_us;
            return true;
        }
        if self.warned.is_full() {
            // Forget the aircraft warned about longest ago
            if let Some(oldest) = self
                .warned
                .iter()
                .enumerate()
                .min_by_key(|(_, (_, t))| *t)
                .map(|(i, _)| i)
            {
                self.warned.swap_remove(oldest);
            }
        }
        let _ = self.warned.push((icao_address, now_us));
        true
    }

    /// Check the reports received this cycle and react
    #[allow(clippy::too_many_arguments)]
    pub fn check(
        &mut self,
        reports: &[TransponderReport],
        position: &GlobalPosition,
        params: &NavigatorParams,
        status: &VehicleStatus,
        rtl: &mut RtlBehavior,
        events: &mut EventLog,
        outbox: &mut Outbox,
        now_us: u64,
    ) {
        if params.traffic_avoid == TrafficAvoidAction::Disabled {
            return;
        }

        for report in reports {
            let Some(conflict) = Self::predict(report, position, params) else {
                continue;
            };
            if !self.buffer_air_traffic(conflict.icao_address, now_us) {
                continue;
            }

            let mut id_buf = [0u8; 8];
            let who = report
                .callsign()
                .unwrap_or_else(|| icao_hex(conflict.icao_address, &mut id_buf));
            let dst = conflict.separation as i32;
            let hdg = conflict.direction_deg;

            match params.traffic_avoid {
                TrafficAvoidAction::Disabled => {}
                TrafficAvoidAction::Warn => {
                    events.push_fmt(
                        "navigator_traffic",
                        Severity::Critical,
                        format_args!("Warning TRAFFIC {}! dst {}, hdg {}", who, dst, hdg),
                    );
                }
                TrafficAvoidAction::ReturnToLaunch => {
                    events.push_fmt(
                        "navigator_traffic_rtl",
                        Severity::Critical,
                        format_args!("TRAFFIC: {} Returning home! dst {}, hdg {}", who, dst, hdg),
                    );
                    rtl.set_return_alt_min(true);
                    outbox.push_command(self_command(status, opcode::NAV_RETURN_TO_LAUNCH, now_us));
                }
                TrafficAvoidAction::Land => {
                    events.push_fmt(
                        "navigator_traffic_land",
                        Severity::Critical,
                        format_args!("TRAFFIC: {} Landing! dst {}, hdg {}", who, dst, hdg),
                    );
                    outbox.push_command(self_command(status, opcode::NAV_LAND, now_us));
                }
                TrafficAvoidAction::PositionHold => {
                    events.push_fmt(
                        "navigator_traffic_hold",
                        Severity::Critical,
                        format_args!("TRAFFIC: {} Holding position! dst {}, hdg {}", who, dst, hdg),
                    );
                    let mut cmd = self_command(status, opcode::DO_SET_MODE, now_us);
                    cmd.param1 = f32::from(BaseMode::CUSTOM_MODE_ENABLED.bits());
                    cmd.param2 = f32::from(custom_main::AUTO);
                    cmd.param3 = f32::from(custom_sub_auto::LOITER);
                    outbox.push_command(cmd);
                }
            }
        }
    }
}

fn self_command(status: &VehicleStatus, command: u16, now_us: u64) -> VehicleCommand {
    let mut cmd = VehicleCommand::new(command);
    cmd.timestamp = now_us;
    cmd.target_system = status.system_id;
    cmd.target_component = status.component_id;
    cmd.source_system = status.system_id;
    cmd.source_component = status.component_id;
    cmd
}

fn icao_hex(icao: u32, buf: &mut [u8; 8]) -> &str {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    for (i, slot) in buf.iter_mut().enumerate() {
        *slot = HEX[((icao >> (28 - 4 * i)) & 0xf) as usize];
    }
    core::str::from_utf8(&buf[2..]).unwrap_or("?")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigator::context::fixtures::*;

    fn ownship() -> GlobalPosition {
        GlobalPosition {
            timestamp: 1,
            lat: LAT,
            lon: LON,
            alt: 500.0,
        }
    }

    /// Aircraft 2 km south, flying north straight at us
    fn inbound(icao: u32) -> TransponderReport {
        let (lat, lon) = waypoint_from_heading_and_distance(LAT, LON, core::f32::consts::PI, 2000.0);
        TransponderReport {
            timestamp: 1,
            icao_address: icao,
            lat,
            lon,
            altitude: 550.0,
            heading: 0.0,
            hor_velocity: 50.0,
            ver_velocity: 0.0,
            callsign: *b"DLH42\0\0\0\0",
            flags: TransponderReport::required_flags() | TransponderFlags::VALID_CALLSIGN,
        }
    }

    #[test]
    fn test_predicts_head_on_conflict() {
        let params = NavigatorParams::default();
        let conflict = TrafficAvoidance::predict(&inbound(0xabc123), &ownship(), &params).unwrap();
        assert!(conflict.separation < 1.0);
        assert_eq!(conflict.direction_deg, 180);
    }

    #[test]
    fn test_ignores_distant_or_incomplete_reports() {
        let params = NavigatorParams::default();

        let high = TransponderReport {
            altitude: 5000.0,
            ..inbound(1)
        };
        assert!(TrafficAvoidance::predict(&high, &ownship(), &params).is_none());

        let away = TransponderReport {
            heading: core::f32::consts::PI,
            ..inbound(2)
        };
        assert!(TrafficAvoidance::predict(&away, &ownship(), &params).is_none());

        let no_velocity = TransponderReport {
            flags: TransponderFlags::VALID_COORDS | TransponderFlags::VALID_ALTITUDE,
            ..inbound(3)
        };
        assert!(TrafficAvoidance::predict(&no_velocity, &ownship(), &params).is_none());
    }

    #[test]
    fn test_warns_once_per_aircraft_per_interval() {
        let params = NavigatorParams::default();
        let status = VehicleStatus::default();
        let mut traffic = TrafficAvoidance::new();
        let mut rtl = RtlBehavior::new();
        let mut events = EventLog::new();
        let mut outbox = Outbox::new();
        let reports = [inbound(7)];

        for t in [0, 1_000_000, 2_000_000] {
            traffic.check(&reports, &ownship(), &params, &status, &mut rtl, &mut events, &mut outbox, t);
        }
        assert_eq!(events.count("navigator_traffic"), 1);
        let event = events.pop().unwrap();
        assert!(event.text.contains("DLH42"));

        traffic.check(&reports, &ownship(), &params, &status, &mut rtl, &mut events, &mut outbox, 61_000_000);
        assert_eq!(events.count("navigator_traffic"), 1);
    }

    #[test]
    fn test_actions_emit_commands() {
        let status = VehicleStatus::default();
        let mut rtl = RtlBehavior::new();
        let mut events = EventLog::new();
        let mut outbox = Outbox::new();
        let reports = [inbound(9)];

        let params = NavigatorParams {
            traffic_avoid: TrafficAvoidAction::ReturnToLaunch,
            ..Default::default()
        };
        TrafficAvoidance::new().check(&reports, &ownship(), &params, &status, &mut rtl, &mut events, &mut outbox, 0);
        assert!(events.contains("navigator_traffic_rtl"));
        assert_eq!(outbox.command_count(opcode::NAV_RETURN_TO_LAUNCH), 1);

        let params = NavigatorParams {
            traffic_avoid: TrafficAvoidAction::PositionHold,
            ..Default::default()
        };
        TrafficAvoidance::new().check(&reports, &ownship(), &params, &status, &mut rtl, &mut events, &mut outbox, 0);
        assert!(events.contains("navigator_traffic_hold"));
        assert_eq!(outbox.command_count(opcode::DO_SET_MODE), 1);

        let params = NavigatorParams {
            traffic_avoid: TrafficAvoidAction::Disabled,
            ..Default::default()
        };
        TrafficAvoidance::new().check(&reports, &ownship(), &params, &status, &mut rtl, &mut events, &mut outbox, 0);
        assert_eq!(outbox.command_count(opcode::NAV_LAND), 0);
    }

    #[test]
    fn test_icao_hex() {
        let mut buf = [0u8; 8];
        assert_eq!(icao_hex(0x00abc123, &mut buf), "abc123");
    }
}
