//! Fence geometry
//!
//! A [`FenceSet`] holds up to [`MAX_FENCE_SHAPES`] polygons and circles,
//! each either an inclusion (stay inside) or an exclusion (stay outside)
//! area, plus the distance limits from home.

use heapless::Vec;

use crate::geo::distance_to_point;
use crate::traits::Geofence;
use crate::vehicle::HomePosition;

pub const MAX_FENCE_SHAPES: usize = 8;
pub const MAX_POLYGON_VERTICES: usize = 16;

/// Errors from loading a fence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceError {
    /// More shapes than `MAX_FENCE_SHAPES`
    TooManyShapes,
    /// More vertices than `MAX_POLYGON_VERTICES`
    TooManyVertices,
    /// Polygon with fewer than three vertices
    DegeneratePolygon,
    /// Circle with a non-positive or non-finite radius
    InvalidRadius,
}

impl core::fmt::Display for FenceError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FenceError::TooManyShapes => write!(f, "too many fence shapes"),
            FenceError::TooManyVertices => write!(f, "too many polygon vertices"),
            FenceError::DegeneratePolygon => write!(f, "polygon needs at least three vertices"),
            FenceError::InvalidRadius => write!(f, "invalid circle radius"),
        }
    }
}

/// Latitude/longitude vertex in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FenceShape {
    Polygon {
        vertices: Vec<Vertex, MAX_POLYGON_VERTICES>,
        inclusion: bool,
    },
    Circle {
        lat: f64,
        lon: f64,
        radius: f32,
        inclusion: bool,
    },
}

impl FenceShape {
    fn is_inclusion(&self) -> bool {
        match self {
            FenceShape::Polygon { inclusion, .. } | FenceShape::Circle { inclusion, .. } => {
                *inclusion
            }
        }
    }

    fn contains(&self, lat: f64, lon: f64) -> bool {
        match self {
            FenceShape::Polygon { vertices, .. } => polygon_contains(vertices, lat, lon),
            FenceShape::Circle {
                lat: c_lat,
                lon: c_lon,
                radius,
                ..
            } => distance_to_point(*c_lat, *c_lon, lat, lon) < *radius,
        }
    }
}

/// Even-odd ray casting in the lat/lon plane
fn polygon_contains(vertices: &[Vertex], lat: f64, lon: f64) -> bool {
    let mut inside = false;
    let mut j = vertices.len() - 1;
    for (i, vi) in vertices.iter().enumerate() {
        let vj = vertices[j];
        if (vi.lon > lon) != (vj.lon > lon)
            && lat < (vj.lat - vi.lat) * (lon - vi.lon) / (vj.lon - vi.lon) + vi.lat
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Loaded fence plus distance limits from home
#[derive(Debug, Clone, Default)]
pub struct FenceSet {
    shapes: Vec<FenceShape, MAX_FENCE_SHAPES>,
    max_hor_distance: f32,
    max_ver_distance: f32,
}

impl FenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_polygon(&mut self, vertices: &[Vertex], inclusion: bool) -> Result<(), FenceError> {
        if vertices.len() < 3 {
            return Err(FenceError::DegeneratePolygon);
        }
        let vertices =
            Vec::from_slice(vertices).map_err(|_| FenceError::TooManyVertices)?;
        self.shapes
            .push(FenceShape::Polygon {
                vertices,
                inclusion,
            })
            .map_err(|_| FenceError::TooManyShapes)
    }

    pub fn add_circle(
        &mut self,
        lat: f64,
        lon: f64,
        radius: f32,
        inclusion: bool,
    ) -> Result<(), FenceError> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(FenceError::InvalidRadius);
        }
        self.shapes
            .push(FenceShape::Circle {
                lat,
                lon,
                radius,
                inclusion,
            })
            .map_err(|_| FenceError::TooManyShapes)
    }

    /// Horizontal and vertical limits from home (m, zero disables)
    pub fn set_home_limits(&mut self, max_hor_distance: f32, max_ver_distance: f32) {
        self.max_hor_distance = max_hor_distance;
        self.max_ver_distance = max_ver_distance;
    }

    pub fn clear(&mut self) {
        self.shapes.clear();
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }
}

impl Geofence for FenceSet {
    fn is_inside_polygon_or_circle(&self, lat: f64, lon: f64, _alt: f32) -> bool {
        let mut has_inclusion = false;
        let mut inside_inclusion = false;

        for shape in &self.shapes {
            let contains = shape.contains(lat, lon);
            if shape.is_inclusion() {
                has_inclusion = true;
                inside_inclusion |= contains;
            } else if contains {
                return false;
            }
        }

        !has_inclusion || inside_inclusion
    }

    fn is_closer_than_max_dist_to_home(
        &self,
        lat: f64,
        lon: f64,
        alt: f32,
        home: &HomePosition,
    ) -> bool {
        if !home.is_valid() {
            return true;
        }
        if self.max_hor_distance > 0.0
            && distance_to_point(home.lat, home.lon, lat, lon) > self.max_hor_distance
        {
            return false;
        }
        self.is_below_max_altitude(alt, home)
    }

    fn is_below_max_altitude(&self, alt: f32, home: &HomePosition) -> bool {
        if self.max_ver_distance <= 0.0 || !home.valid_alt {
            return true;
        }
        alt - home.alt <= self.max_ver_distance
    }

    fn max_hor_dist_home(&self) -> f32 {
        self.max_hor_distance
    }

    fn max_ver_dist_home(&self) -> f32 {
        self.max_ver_distance
    }
}
