//! Geometric measurements used by the generalization code
//!
//! Areas and lengths are planar, in layer units.

use geo::{Area as GeoArea, Coord, CoordsIter, Euclidean, Geometry, Length};
use std::f64::consts::{PI, TAU};

/// Unsigned area of a geometry; zero for points and lines.
pub fn area(geom: &Geometry<f64>) -> f64 {
    match geom {
        Geometry::Polygon(p) => p.unsigned_area(),
        Geometry::MultiPolygon(mp) => mp.unsigned_area(),
        Geometry::Rect(r) => r.unsigned_area(),
        Geometry::Triangle(t) => t.unsigned_area(),
        Geometry::GeometryCollection(gc) => gc.0.iter().map(area).sum(),
        _ => 0.0,
    }
}

/// Length of the linear parts of a geometry.
pub fn length(geom: &Geometry<f64>) -> f64 {
    match geom {
        Geometry::LineString(ls) => ls.length::<Euclidean>(),
        Geometry::MultiLineString(mls) => mls.0.iter().map(|ls| ls.length::<Euclidean>()).sum(),
        Geometry::Line(l) => (l.end.x - l.start.x).hypot(l.end.y - l.start.y),
        Geometry::GeometryCollection(gc) => gc.0.iter().map(length).sum(),
        _ => 0.0,
    }
}

/// Total ring length (exterior plus holes) of the polygonal parts.
pub fn perimeter(geom: &Geometry<f64>) -> f64 {
    match geom {
        Geometry::Polygon(p) => {
            p.exterior().length::<Euclidean>()
                + p.interiors().iter().map(|r| r.length::<Euclidean>()).sum::<f64>()
        }
        Geometry::MultiPolygon(mp) => mp
            .0
            .iter()
            .map(|p| perimeter(&Geometry::Polygon(p.clone())))
            .sum(),
        Geometry::GeometryCollection(gc) => gc.0.iter().map(perimeter).sum(),
        _ => 0.0,
    }
}

/// Number of coordinates, closing vertices included.
pub fn vertex_count(geom: &Geometry<f64>) -> usize {
    geom.coords_count()
}

/// Shoelace area of a coordinate ring; positive when counter-clockwise.
///
/// The ring does not need to repeat its first coordinate.
pub fn signed_ring_area(coords: &[Coord<f64>]) -> f64 {
    if coords.len() < 3 {
        return 0.0;
    }
    let n = coords.len();
    let mut twice = 0.0;
    for k in 0..n {
        let a = coords[k];
        let b = coords[(k + 1) % n];
        twice += a.x * b.y - b.x * a.y;
    }
    twice / 2.0
}

/// Area scaled by the compactness index `4πA / P²`.
///
/// A circle keeps 3/4 of its area; elongated shapes grow. Degenerate
/// shapes (no area or no perimeter) have an adjusted area of zero.
pub fn adjusted_area(area: f64, perimeter: f64) -> f64 {
    if area <= 0.0 || perimeter <= 0.0 {
        return 0.0;
    }
    let compactness_index = 4.0 * area * PI / perimeter.powi(2);
    area * (0.75 / compactness_index)
}

/// Adjusted area of a circle of the given diameter.
pub fn min_adjusted_area(diameter: f64) -> f64 {
    0.75 * PI * (diameter / 2.0).powi(2)
}

/// Angle at `p2` going from `p1` to `p3`, in radians within `[0, 2π)`.
///
/// Values below π and above π distinguish the two turning directions.
pub fn angle_between(p1: Coord<f64>, p2: Coord<f64>, p3: Coord<f64>) -> f64 {
    let at1 = (p1.y - p2.y).atan2(p1.x - p2.x);
    let at2 = (p3.y - p2.y).atan2(p3.x - p2.x);
    let angle = (at1 - at2).rem_euclid(TAU);
    if angle >= TAU {
        0.0
    } else {
        angle
    }
}
