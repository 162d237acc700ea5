//! Geodesy helpers on WGS84 latitude/longitude
//!
//! Spherical-earth formulas, accurate to well under a meter over the
//! distances a fence or a mission leg spans. Latitude and longitude are
//! degrees in `f64`; distances are meters and bearings radians clockwise
//! from true north.

use core::f32::consts::PI;

use libm::{asin, atan2, cos, sin, sqrt};

/// Mean earth radius (m)
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two positions in meters
pub fn distance_to_point(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f32 {
    let lat1 = lat1.to_radians();
    let lat2 = lat2.to_radians();
    let d_lat = lat2 - lat1;
    let d_lon = (lon2 - lon1).to_radians();

    let sin_dlat = sin(d_lat / 2.0);
    let sin_dlon = sin(d_lon / 2.0);
    let a = sin_dlat * sin_dlat + cos(lat1) * cos(lat2) * sin_dlon * sin_dlon;
    let c = 2.0 * atan2(sqrt(a), sqrt(1.0 - a));
    (EARTH_RADIUS_M * c) as f32
}

/// Initial bearing from the first position towards the second, in
/// radians within [-π, π]
pub fn bearing_to_point(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f32 {
    let lat1 = lat1.to_radians();
    let lat2 = lat2.to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let y = sin(d_lon) * cos(lat2);
    let x = cos(lat1) * sin(lat2) - sin(lat1) * cos(lat2) * cos(d_lon);
    atan2(y, x) as f32
}

/// Position reached after travelling `distance_m` along `bearing_rad`
pub fn waypoint_from_heading_and_distance(
    lat: f64,
    lon: f64,
    bearing_rad: f32,
    distance_m: f32,
) -> (f64, f64) {
    let bearing = wrap_2pi(bearing_rad) as f64;
    let radius_ratio = distance_m as f64 / EARTH_RADIUS_M;

    let lat_start = lat.to_radians();
    let lon_start = lon.to_radians();

    let lat_target = asin(
        sin(lat_start) * cos(radius_ratio) + cos(lat_start) * sin(radius_ratio) * cos(bearing),
    );
    let lon_target = lon_start
        + atan2(
            sin(bearing) * sin(radius_ratio) * cos(lat_start),
            cos(radius_ratio) - sin(lat_start) * sin(lat_target),
        );

    (lat_target.to_degrees(), lon_target.to_degrees())
}

/// Local north/east offset (m) of a position relative to a reference,
/// using an equirectangular projection around the reference
pub fn local_offset(ref_lat: f64, ref_lon: f64, lat: f64, lon: f64) -> (f32, f32) {
    let north = (lat - ref_lat).to_radians() * EARTH_RADIUS_M;
    let east = (lon - ref_lon).to_radians() * EARTH_RADIUS_M * cos(ref_lat.to_radians());
    (north as f32, east as f32)
}

/// Along-track and cross-track distance of a position relative to the
/// segment from `start` to `end`.
///
/// Returns `None` when the position lies before the start or beyond the
/// end of the segment. Cross-track is positive to the right of the track.
pub fn crosstrack_error(
    lat_now: f64,
    lon_now: f64,
    lat_start: f64,
    lon_start: f64,
    lat_end: f64,
    lon_end: f64,
) -> Option<(f32, f32)> {
    let track_length = distance_to_point(lat_start, lon_start, lat_end, lon_end);
    if track_length < 0.1 {
        return None;
    }

    let distance = distance_to_point(lat_start, lon_start, lat_now, lon_now);
    let bearing_track = bearing_to_point(lat_start, lon_start, lat_end, lon_end);
    let bearing_now = bearing_to_point(lat_start, lon_start, lat_now, lon_now);
    let angle = wrap_pi(bearing_now - bearing_track);

    let along = distance * libm::cosf(angle);
    if along < 0.0 || along > track_length {
        return None;
    }

    Some((along, distance * libm::sinf(angle)))
}

/// Wrap an angle to [-π, π)
pub fn wrap_pi(angle: f32) -> f32 {
    if !angle.is_finite() {
        return angle;
    }
    let mut a = libm::fmodf(angle + PI, 2.0 * PI);
    if a < 0.0 {
        a += 2.0 * PI;
    }
    a - PI
}

/// Wrap an angle to [0, 2π)
pub fn wrap_2pi(angle: f32) -> f32 {
    if !angle.is_finite() {
        return angle;
    }
    let a = libm::fmodf(angle, 2.0 * PI);
    if a < 0.0 {
        a + 2.0 * PI
    } else {
        a
    }
}
