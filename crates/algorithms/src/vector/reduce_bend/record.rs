//! Geometry records: the unit of work of the bend reduction.
//!
//! A feature is broken into one record per point, line or polygon ring.
//! Records are stored in an arena and addressed by their index.

use super::bend::Bend;
use super::epsilon::Epsilon;
use crate::vector::measurements::{angle_between, signed_ring_area};
use geo::{Coord, Euclidean, Length, LineString};

/// What a record was cut from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RecordKind {
    Point,
    LineString,
    /// Exterior or interior ring of a polygon
    Ring,
}

#[derive(Debug, Clone)]
pub(crate) struct Record {
    pub id: usize,
    pub kind: RecordKind,
    /// Points hold a single coordinate
    pub line: LineString<f64>,
    /// Nothing left to reduce
    pub is_simplest: bool,
    pub is_closed: bool,
    /// The start/end vertex should move onto a bend that is kept
    pub need_pivot: bool,
    pub bends: Vec<Bend>,
}

impl Record {
    pub fn new(id: usize, kind: RecordKind, line: LineString<f64>, eps: &Epsilon) -> Self {
        let mut record = Self {
            id,
            kind,
            line,
            is_simplest: false,
            is_closed: false,
            need_pivot: false,
            bends: Vec::new(),
        };

        match kind {
            RecordKind::Point => record.is_simplest = true,
            RecordKind::LineString => {
                if record.length() < eps.zero_relative {
                    // Zero length line
                    record.is_simplest = true;
                } else if record.line.is_closed() {
                    if signed_ring_area(&record.line.0).abs() > eps.zero_relative {
                        record.is_closed = true;
                        record.need_pivot = true;
                    } else {
                        record.is_simplest = true;
                    }
                }
            }
            RecordKind::Ring => {
                if signed_ring_area(&record.line.0).abs() > eps.zero_relative {
                    record.is_closed = true;
                    record.need_pivot = true;
                } else {
                    record.is_simplest = true;
                }
            }
        }

        record
    }

    pub fn num_points(&self) -> usize {
        self.line.0.len()
    }

    pub fn vertex(&self, i: usize) -> Coord<f64> {
        self.line.0[i]
    }

    pub fn coords(&self) -> &[Coord<f64>] {
        &self.line.0
    }

    pub fn length(&self) -> f64 {
        self.line.length::<Euclidean>()
    }

    /// Angle at every vertex that has two neighbours.
    ///
    /// Open lines have no angle at their end points, so `angles[k]` belongs to
    /// vertex `k + 1`. Closed lines get an angle at vertex 0 (its predecessor
    /// is the second-last vertex) and none at the repeated last vertex, so
    /// `angles[k]` belongs to vertex `k`.
    pub fn angles(&self) -> Vec<f64> {
        if self.kind == RecordKind::Point {
            return Vec::new();
        }

        let coords = &self.line.0;
        let mut xy: Vec<Coord<f64>> = Vec::with_capacity(coords.len() + 1);
        if self.is_closed && coords.len() >= 2 {
            xy.push(coords[coords.len() - 2]);
        }
        xy.extend_from_slice(coords);

        if xy.len() < 3 {
            return Vec::new();
        }
        (1..xy.len() - 1)
            .map(|i| angle_between(xy[i - 1], xy[i], xy[i + 1]))
            .collect()
    }

    /// Remove consecutive vertices closer than `tolerance`, keeping both ends.
    pub fn remove_duplicate_nodes(&mut self, tolerance: f64) {
        let coords = &self.line.0;
        if coords.len() < 3 {
            return;
        }

        let last = coords[coords.len() - 1];
        let mut kept: Vec<Coord<f64>> = Vec::with_capacity(coords.len());
        kept.push(coords[0]);
        for &c in &coords[1..coords.len() - 1] {
            if distance(*kept.last().unwrap_or(&c), c) > tolerance {
                kept.push(c);
            }
        }
        // The end point wins over a duplicate just before it
        if kept.len() >= 2 && distance(kept[kept.len() - 1], last) <= tolerance {
            kept.pop();
        }
        kept.push(last);

        self.line = LineString::new(kept);
    }
}

pub(crate) fn distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}
