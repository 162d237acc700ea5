//! Mission Item Classification
//!
//! Helpers for classifying mission item commands. Command IDs at or below
//! `MAV_CMD_NAV_LAST` (95) drive navigation; anything above is an
//! immediate DO/condition action executed on the way.

use crate::command::opcode;

/// Command IDs at or below this value are NAV commands
pub const MAV_CMD_NAV_LAST: u16 = 95;

pub const MAV_CMD_NAV_LOITER_TURNS: u16 = 18;
pub const MAV_CMD_NAV_LOITER_TIME: u16 = 19;
pub const MAV_CMD_NAV_LOITER_TO_ALT: u16 = 31;

pub fn is_nav_command(command_id: u16) -> bool {
    command_id <= MAV_CMD_NAV_LAST
}

/// NAV command that carries a target latitude/longitude
pub fn item_has_location(command_id: u16) -> bool {
    is_nav_command(command_id)
        && !matches!(
            command_id,
            opcode::NAV_RETURN_TO_LAUNCH | opcode::NAV_DELAY | opcode::NAV_ROI
        )
}

pub fn is_landing_command(command_id: u16) -> bool {
    matches!(command_id, opcode::NAV_LAND | opcode::NAV_VTOL_LAND)
}

pub fn is_takeoff_command(command_id: u16) -> bool {
    matches!(command_id, opcode::NAV_TAKEOFF | opcode::NAV_VTOL_TAKEOFF)
}

pub fn is_loiter_command(command_id: u16) -> bool {
    matches!(
        command_id,
        opcode::NAV_LOITER_UNLIM
            | MAV_CMD_NAV_LOITER_TURNS
            | MAV_CMD_NAV_LOITER_TIME
            | MAV_CMD_NAV_LOITER_TO_ALT
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_nav_command_at_boundary() {
        assert!(is_nav_command(0));
        assert!(is_nav_command(95));
        assert!(!is_nav_command(96));
        assert!(!is_nav_command(opcode::DO_CHANGE_SPEED));
    }

    #[test]
    fn test_location_items() {
        assert!(item_has_location(opcode::NAV_WAYPOINT));
        assert!(item_has_location(opcode::NAV_LAND));
        assert!(!item_has_location(opcode::NAV_RETURN_TO_LAUNCH));
        assert!(!item_has_location(opcode::NAV_DELAY));
        assert!(!item_has_location(opcode::DO_LAND_START));
    }

    #[test]
    fn test_item_kinds() {
        assert!(is_landing_command(opcode::NAV_VTOL_LAND));
        assert!(is_takeoff_command(opcode::NAV_TAKEOFF));
        assert!(is_loiter_command(MAV_CMD_NAV_LOITER_TIME));
        assert!(!is_loiter_command(opcode::NAV_WAYPOINT));
    }
}
