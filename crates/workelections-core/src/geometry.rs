//! Planar polygon geometry for jurisdiction boundaries.
//!
//! Jurisdiction boundaries arrive as GeoJSON `Polygon` or `MultiPolygon`
//! geometries and are normalised to [`MultiPolygon`]. Coordinates are
//! `(x, y) = (longitude, latitude)` in the GeoJSON order.
//!
//! Containment follows the OGC `Contains` predicate: only interior points
//! count. A point lying on any edge of a polygon (exterior ring or hole)
//! is not contained.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

const EDGE_EPSILON: f64 = 1e-12;
const EARTH_RADIUS_KM: f64 = 6371.0088;

/// A position in `(x, y) = (longitude, latitude)` order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Parse an `"x,y"` pair, as accepted by the `contains` query parameter.
    pub fn parse_pair(raw: &str) -> Result<Self, CoreError> {
        let invalid = || CoreError::InvalidCoordinates(raw.to_string());

        let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
        if parts.len() != 2 {
            return Err(invalid());
        }

        let x: f64 = parts[0].parse().map_err(|_| invalid())?;
        let y: f64 = parts[1].parse().map_err(|_| invalid())?;
        if !x.is_finite() || !y.is_finite() {
            return Err(invalid());
        }

        Ok(Self { x, y })
    }
}

/// A polygon with one exterior ring and zero or more holes.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub exterior: Vec<Point>,
    pub holes: Vec<Vec<Point>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum RingPosition {
    Inside,
    Boundary,
    Outside,
}

impl Polygon {
    pub fn contains(&self, p: Point) -> bool {
        match ring_position(&self.exterior, p) {
            RingPosition::Outside | RingPosition::Boundary => false,
            RingPosition::Inside => self
                .holes
                .iter()
                .all(|hole| ring_position(hole, p) == RingPosition::Outside),
        }
    }
}

/// A set of polygons; the normalised form of every stored boundary.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MultiPolygon(pub Vec<Polygon>);

impl MultiPolygon {
    pub fn contains(&self, p: Point) -> bool {
        self.0.iter().any(|poly| poly.contains(p))
    }

    /// Bounding box over all exterior rings, or `None` for an empty geometry.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let mut points = self.0.iter().flat_map(|poly| poly.exterior.iter());
        let first = points.next()?;
        let mut bbox = BoundingBox {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        for p in points {
            bbox.min_x = bbox.min_x.min(p.x);
            bbox.min_y = bbox.min_y.min(p.y);
            bbox.max_x = bbox.max_x.max(p.x);
            bbox.max_y = bbox.max_y.max(p.y);
        }
        Some(bbox)
    }

    /// Parse a GeoJSON geometry object (`Polygon` or `MultiPolygon`).
    pub fn from_geojson(value: &serde_json::Value) -> Result<Self, CoreError> {
        let raw: GeoJsonGeometry = serde_json::from_value(value.clone())
            .map_err(|e| CoreError::InvalidGeometry(e.to_string()))?;

        let polygons = match raw {
            GeoJsonGeometry::Polygon(rings) => vec![polygon_from_rings(rings)?],
            GeoJsonGeometry::MultiPolygon(polys) => polys
                .into_iter()
                .map(polygon_from_rings)
                .collect::<Result<Vec<_>, _>>()?,
        };

        Ok(MultiPolygon(polygons))
    }

    /// Serialise as a GeoJSON `MultiPolygon` geometry object.
    pub fn to_geojson(&self) -> serde_json::Value {
        let ring = |r: &Vec<Point>| -> Vec<[f64; 2]> { r.iter().map(|p| [p.x, p.y]).collect() };
        let coordinates: Vec<Vec<Vec<[f64; 2]>>> = self
            .0
            .iter()
            .map(|poly| {
                std::iter::once(&poly.exterior)
                    .chain(poly.holes.iter())
                    .map(ring)
                    .collect()
            })
            .collect();

        serde_json::json!({
            "type": "MultiPolygon",
            "coordinates": coordinates,
        })
    }
}

/// Axis-aligned bounding box, inclusive on every side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }
}

/// Great-circle distance in kilometres between two lon/lat points.
pub fn haversine_km(a: Point, b: Point) -> f64 {
    let (lat1, lat2) = (a.y.to_radians(), b.y.to_radians());
    let d_lat = (b.y - a.y).to_radians();
    let d_lon = (b.x - a.x).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

// ============ GeoJSON parsing ============

#[derive(Deserialize)]
#[serde(tag = "type", content = "coordinates")]
enum GeoJsonGeometry {
    Polygon(Vec<Vec<Vec<f64>>>),
    MultiPolygon(Vec<Vec<Vec<Vec<f64>>>>),
}

fn polygon_from_rings(rings: Vec<Vec<Vec<f64>>>) -> Result<Polygon, CoreError> {
    let mut rings = rings
        .into_iter()
        .map(ring_from_positions)
        .collect::<Result<Vec<_>, _>>()?
        .into_iter();

    let exterior = rings
        .next()
        .ok_or_else(|| CoreError::InvalidGeometry("polygon has no exterior ring".to_string()))?;

    Ok(Polygon {
        exterior,
        holes: rings.collect(),
    })
}

fn ring_from_positions(positions: Vec<Vec<f64>>) -> Result<Vec<Point>, CoreError> {
    if positions.len() < 3 {
        return Err(CoreError::InvalidGeometry(format!(
            "ring needs at least 3 positions, got {}",
            positions.len()
        )));
    }

    positions
        .into_iter()
        .map(|pos| match pos.as_slice() {
            [x, y, ..] if x.is_finite() && y.is_finite() => Ok(Point::new(*x, *y)),
            _ => Err(CoreError::InvalidGeometry(format!(
                "invalid position {:?}",
                pos
            ))),
        })
        .collect()
}

// ============ Ring tests ============

fn ring_position(ring: &[Point], p: Point) -> RingPosition {
    if ring.len() < 3 {
        return RingPosition::Outside;
    }

    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (a, b) = (ring[j], ring[i]);
        if on_segment(a, b, p) {
            return RingPosition::Boundary;
        }
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }

    if inside {
        RingPosition::Inside
    } else {
        RingPosition::Outside
    }
}

fn on_segment(a: Point, b: Point, p: Point) -> bool {
    let cross = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
    if cross.abs() > EDGE_EPSILON {
        return false;
    }
    p.x >= a.x.min(b.x) - EDGE_EPSILON
        && p.x <= a.x.max(b.x) + EDGE_EPSILON
        && p.y >= a.y.min(b.y) - EDGE_EPSILON
        && p.y <= a.y.max(b.y) + EDGE_EPSILON
}
