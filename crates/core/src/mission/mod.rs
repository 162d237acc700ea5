//! Mission Plan
//!
//! In-memory mission item storage consumed by the navigator's mission
//! behavior.
//!
//! # Item Format
//!
//! - MAVLink MISSION_ITEM_INT layout (latitude/longitude scaled by 1e7)
//! - Frame 0 is AMSL, frame 3 is relative to home
//! - Fixed capacity of [`MAX_MISSION_ITEMS`]
//!
//! # Queries
//!
//! The navigator needs more than sequential access: the index of the
//! DO_LAND_START marker for mission landings, the item closest to the
//! vehicle when a reverse return starts mid-mission, and the next item
//! with a location in either direction.

pub mod command;

use core::fmt;

use heapless::Vec;

use crate::command::opcode;
use crate::geo::distance_to_point;

pub use command::{
    is_landing_command, is_loiter_command, is_nav_command, is_takeoff_command, item_has_location,
    MAV_CMD_NAV_LAST,
};

/// Maximum number of items in a mission
pub const MAX_MISSION_ITEMS: usize = 64;

/// MAV_FRAME_GLOBAL
pub const FRAME_GLOBAL: u8 = 0;
/// MAV_FRAME_GLOBAL_RELATIVE_ALT
pub const FRAME_GLOBAL_RELATIVE_ALT: u8 = 3;

/// Direction and pacing of mission execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    #[default]
    Normal,
    /// Fly the position items backwards towards the start
    Reverse,
    /// Skip DO items and holds on the way to the landing
    FastForward,
}

/// Errors from mission plan updates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissionError {
    /// Plan already holds `MAX_MISSION_ITEMS`
    Full,
    /// Index past the end of the plan
    OutOfRange,
}

impl fmt::Display for MissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissionError::Full => write!(f, "mission full"),
            MissionError::OutOfRange => write!(f, "mission index out of range"),
        }
    }
}

/// One mission item
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MissionItem {
    pub seq: u16,
    pub frame: u8,
    pub command: u16,
    pub autocontinue: bool,
    /// Hold time (s) for waypoints and timed loiters
    pub param1: f32,
    /// Acceptance radius (m) for waypoints, zero for the default
    pub param2: f32,
    pub param3: f32,
    /// Yaw (deg), NaN to leave heading free
    pub param4: f32,
    /// Latitude in degrees * 1e7
    pub x: i32,
    /// Longitude in degrees * 1e7
    pub y: i32,
    /// Altitude (m) in `frame`
    pub z: f32,
}

impl Default for MissionItem {
    fn default() -> Self {
        Self {
            seq: 0,
            frame: FRAME_GLOBAL_RELATIVE_ALT,
            command: opcode::NAV_WAYPOINT,
            autocontinue: true,
            param1: 0.0,
            param2: 0.0,
            param3: 0.0,
            param4: f32::NAN,
            x: 0,
            y: 0,
            z: 0.0,
        }
    }
}

impl MissionItem {
    /// Waypoint at a position given in degrees, altitude relative to home
    pub fn waypoint(seq: u16, lat: f64, lon: f64, alt: f32) -> Self {
        Self::with_command(seq, opcode::NAV_WAYPOINT, lat, lon, alt)
    }

    pub fn with_command(seq: u16, command: u16, lat: f64, lon: f64, alt: f32) -> Self {
        Self {
            seq,
            command,
            x: (lat * 1e7) as i32,
            y: (lon * 1e7) as i32,
            z: alt,
            ..Default::default()
        }
    }

    pub fn latitude(&self) -> f64 {
        self.x as f64 / 1e7
    }

    pub fn longitude(&self) -> f64 {
        self.y as f64 / 1e7
    }

    /// Altitude above mean sea level given the home altitude
    pub fn altitude_amsl(&self, home_alt: f32) -> f32 {
        if self.frame == FRAME_GLOBAL {
            self.z
        } else {
            home_alt + self.z
        }
    }

    pub fn has_location(&self) -> bool {
        item_has_location(self.command)
    }
}

/// Mission plan storage
#[derive(Debug, Clone, Default)]
pub struct MissionPlan {
    items: Vec<MissionItem, MAX_MISSION_ITEMS>,
    /// Bumped on every change so consumers can detect a new upload
    generation: u32,
}

impl MissionPlan {
    pub const fn new() -> Self {
        Self {
            items: Vec::new(),
            generation: 0,
        }
    }

    pub fn count(&self) -> u16 {
        self.items.len() as u16
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn add_item(&mut self, item: MissionItem) -> Result<(), MissionError> {
        self.items.push(item).map_err(|_| MissionError::Full)?;
        self.generation = self.generation.wrapping_add(1);
        Ok(())
    }

    pub fn set_item(&mut self, seq: u16, item: MissionItem) -> Result<(), MissionError> {
        let slot = self
            .items
            .get_mut(seq as usize)
            .ok_or(MissionError::OutOfRange)?;
        *slot = item;
        self.generation = self.generation.wrapping_add(1);
        Ok(())
    }

    pub fn get(&self, seq: u16) -> Option<&MissionItem> {
        self.items.get(seq as usize)
    }

    pub fn items(&self) -> &[MissionItem] {
        &self.items
    }

    /// Index of the first DO_LAND_START marker
    pub fn land_start_index(&self) -> Option<u16> {
        self.items
            .iter()
            .position(|item| item.command == opcode::DO_LAND_START)
            .map(|i| i as u16)
    }

    pub fn has_land_start(&self) -> bool {
        self.land_start_index().is_some()
    }

    /// Whether the plan ends in a landing
    pub fn has_landing(&self) -> bool {
        self.items.iter().any(|item| is_landing_command(item.command))
    }

    /// First item at or after `from` (or at or before it in reverse) that
    /// carries a position
    pub fn next_position_item(&self, from: u16, forward: bool) -> Option<u16> {
        let from = from as usize;
        if forward {
            self.items
                .iter()
                .enumerate()
                .skip(from)
                .find(|(_, item)| item.has_location())
                .map(|(i, _)| i as u16)
        } else {
            let end = from.min(self.items.len().saturating_sub(1));
            if self.items.is_empty() {
                return None;
            }
            (0..=end)
                .rev()
                .find(|&i| self.items[i].has_location())
                .map(|i| i as u16)
        }
    }

    /// Position item closest to the given position, ignoring takeoffs
    pub fn closest_item_index(&self, lat: f64, lon: f64) -> Option<u16> {
        let mut best: Option<(u16, f32)> = None;
        for (i, item) in self.items.iter().enumerate() {
            if !item.has_location() || is_takeoff_command(item.command) {
                continue;
            }
            let d = distance_to_point(lat, lon, item.latitude(), item.longitude());
            if best.map_or(true, |(_, best_d)| d < best_d) {
                best = Some((i as u16, d));
            }
        }
        best.map(|(i, _)| i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAT: f64 = 47.397742;
    const LON: f64 = 8.545594;

    fn plan_with_landing() -> MissionPlan {
        let mut plan = MissionPlan::new();
        plan.add_item(MissionItem::with_command(0, opcode::NAV_TAKEOFF, LAT, LON, 10.0))
            .unwrap();
        plan.add_item(MissionItem::waypoint(1, LAT + 0.001, LON, 20.0)).unwrap();
        plan.add_item(MissionItem::waypoint(2, LAT + 0.002, LON, 20.0)).unwrap();
        plan.add_item(MissionItem::with_command(3, opcode::DO_LAND_START, 0.0, 0.0, 0.0))
            .unwrap();
        plan.add_item(MissionItem::waypoint(4, LAT + 0.001, LON + 0.001, 15.0)).unwrap();
        plan.add_item(MissionItem::with_command(5, opcode::NAV_LAND, LAT, LON + 0.001, 0.0))
            .unwrap();
        plan
    }

    #[test]
    fn test_item_coordinates() {
        let item = MissionItem::waypoint(0, 37.0, -122.0, 100.0);
        assert!((item.latitude() - 37.0).abs() < 1e-6);
        assert!((item.longitude() + 122.0).abs() < 1e-6);
        assert_eq!(item.altitude_amsl(400.0), 500.0);

        let absolute = MissionItem { frame: FRAME_GLOBAL, ..item };
        assert_eq!(absolute.altitude_amsl(400.0), 100.0);
    }

    #[test]
    fn test_land_start_and_landing() {
        let plan = plan_with_landing();
        assert_eq!(plan.land_start_index(), Some(3));
        assert!(plan.has_landing());

        let mut empty = MissionPlan::new();
        assert!(!empty.has_land_start());
        empty.add_item(MissionItem::waypoint(0, LAT, LON, 10.0)).unwrap();
        assert!(!empty.has_landing());
    }

    #[test]
    fn test_next_position_item_skips_do_items() {
        let plan = plan_with_landing();
        assert_eq!(plan.next_position_item(3, true), Some(4));
        assert_eq!(plan.next_position_item(3, false), Some(2));
        assert_eq!(plan.next_position_item(6, true), None);
        assert_eq!(MissionPlan::new().next_position_item(0, false), None);
    }

    #[test]
    fn test_closest_item_ignores_takeoff() {
        let plan = plan_with_landing();
        assert_eq!(plan.closest_item_index(LAT + 0.0021, LON), Some(2));
        // Takeoff sits exactly here but does not count
        assert_ne!(plan.closest_item_index(LAT, LON), Some(0));
    }

    #[test]
    fn test_generation_and_capacity() {
        let mut plan = MissionPlan::new();
        let g0 = plan.generation();
        for i in 0..MAX_MISSION_ITEMS {
            plan.add_item(MissionItem::waypoint(i as u16, LAT, LON, 10.0)).unwrap();
        }
        assert_eq!(
            plan.add_item(MissionItem::waypoint(0, LAT, LON, 10.0)),
            Err(MissionError::Full)
        );
        assert!(plan.generation() != g0);
        assert_eq!(
            plan.set_item(200, MissionItem::default()),
            Err(MissionError::OutOfRange)
        );
    }
}
