//! Geofence geometry queries consumed by breach avoidance.

use crate::vehicle::HomePosition;

/// Containment and distance queries against the loaded fence.
///
/// Altitudes are AMSL meters. Limits of zero or less are disabled.
pub trait Geofence {
    /// Inside every inclusion area and outside every exclusion area
    fn is_inside_polygon_or_circle(&self, lat: f64, lon: f64, alt: f32) -> bool;

    /// Within the horizontal and vertical distance limits from home
    fn is_closer_than_max_dist_to_home(&self, lat: f64, lon: f64, alt: f32, home: &HomePosition) -> bool;

    /// Below the altitude ceiling relative to home
    fn is_below_max_altitude(&self, alt: f32, home: &HomePosition) -> bool;

    fn max_hor_dist_home(&self) -> f32;

    fn max_ver_dist_home(&self) -> f32;
}
