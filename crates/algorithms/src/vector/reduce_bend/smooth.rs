//! Smoothing of the straight bases left by bend reduction.
//!
//! A long base replacing a bend can look unnatural next to the rest of the
//! line. When the base is still a single segment with a vertex on each side,
//! it is replaced by a gentle 3-segment line bulging towards the removed bend.

use super::epsilon::Epsilon;
use super::record::{distance, Record};
use crate::vector::measurements::angle_between;
use geo::{Centroid, Coord, LineString, Polygon};
use std::f64::consts::PI;

/// A bend that was reduced to its base
#[derive(Debug, Clone)]
pub(crate) struct BendReduced {
    pub record_id: usize,
    start: Coord<f64>,
    end: Coord<f64>,
    /// Polygon of the bend before it was reduced
    polygon: Polygon<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SmoothCase {
    /// Neighbours on the same side of the base, bend on the other
    OppositeBend,
    /// Neighbours and bend on the same side
    SameSide,
    /// Neighbours on opposite sides
    Crossing,
}

impl BendReduced {
    pub fn new(record_id: usize, start: Coord<f64>, end: Coord<f64>, polygon: Polygon<f64>) -> Self {
        Self {
            record_id,
            start,
            end,
            polygon,
        }
    }

    /// Vertex indices `(i, i + 1)` of the base when it can be smoothed.
    ///
    /// The base must be longer than two thirds of the diameter, still be a
    /// single segment of the record and have a vertex before and after it.
    pub fn smoothable_site(&self, record: &Record, diameter_tol: f64, eps: &Epsilon) -> Option<(usize, usize)> {
        if distance(self.start, self.end) <= diameter_tol * (2.0 / 3.0) {
            return None;
        }

        let i = closest_vertex(record, self.start, eps)?;
        let j = closest_vertex(record, self.end, eps)?;
        if i + 1 == j && i >= 1 && j + 2 <= record.num_points() {
            Some((i, j))
        } else {
            None
        }
    }

    /// Replacement line for the segment `i -> j` of `record`.
    pub fn smooth_line(&self, record: &Record, i: usize, j: usize) -> LineString<f64> {
        let origin = record.vertex(i);
        let target = record.vertex(j);
        let theta = (target.y - origin.y).atan2(target.x - origin.x);

        // Move the base onto the positive x axis
        let to_local = |c: Coord<f64>| rotate(translate(c, -origin.x, -origin.y), -theta);
        let ro = [
            to_local(record.vertex(i - 1)),
            to_local(origin),
            to_local(target),
            to_local(record.vertex(j + 1)),
        ];
        let centroid_y = self
            .polygon
            .centroid()
            .map(|p| to_local(p.0).y)
            .unwrap_or(0.0);

        let base_length = ro[2].x;
        let p0_x = base_length / 3.0;
        let p1_x = base_length * (2.0 / 3.0);

        let case = if ro[0].y * ro[3].y > 0.0 {
            if ro[0].y * centroid_y < 0.0 {
                SmoothCase::OppositeBend
            } else {
                SmoothCase::SameSide
            }
        } else {
            SmoothCase::Crossing
        };

        let reflect = |a: f64| if a > PI { 2.0 * PI - a } else { a };
        let angle_i = reflect(angle_between(ro[0], ro[1], ro[2]));
        let angle_j = reflect(angle_between(ro[1], ro[2], ro[3]));
        let corner = angle_i.max(angle_j);

        let smooth_angle = match case {
            SmoothCase::OppositeBend => ((PI - corner) / 1.5).min(30f64.to_radians()),
            SmoothCase::SameSide => ((PI - corner) / 2.5).min(20f64.to_radians()),
            SmoothCase::Crossing => ((PI - corner) / 1.5).min(20f64.to_radians()),
        };

        let mut p0_y = smooth_angle.tan() * p0_x;
        if ro[0].y > 0.0 {
            p0_y = -p0_y;
        }
        let p1_y = match case {
            SmoothCase::Crossing => -p0_y,
            _ => p0_y,
        };

        let to_world = |c: Coord<f64>| translate(rotate(c, theta), origin.x, origin.y);
        LineString::new(vec![
            origin,
            to_world(Coord { x: p0_x, y: p0_y }),
            to_world(Coord { x: p1_x, y: p1_y }),
            target,
        ])
    }
}

fn closest_vertex(record: &Record, target: Coord<f64>, eps: &Epsilon) -> Option<usize> {
    record
        .coords()
        .iter()
        .enumerate()
        .map(|(k, &c)| (k, distance(c, target)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .filter(|&(_, d)| d < eps.zero_relative)
        .map(|(k, _)| k)
}

fn translate(c: Coord<f64>, dx: f64, dy: f64) -> Coord<f64> {
    Coord {
        x: c.x + dx,
        y: c.y + dy,
    }
}

/// Counter-clockwise rotation around the origin
fn rotate(c: Coord<f64>, angle: f64) -> Coord<f64> {
    let (sin, cos) = angle.sin_cos();
    Coord {
        x: c.x * cos - c.y * sin,
        y: c.x * sin + c.y * cos,
    }
}
