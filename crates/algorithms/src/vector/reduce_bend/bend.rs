//! Bend detection, classification and selection.
//!
//! A bend is a run of vertices turning the same way. Bends are cut at the
//! inflexion points of the line, where the turning direction changes.

use super::epsilon::Epsilon;
use super::record::{distance, Record};
use crate::vector::measurements::{adjusted_area, min_adjusted_area};
use geo::{Area, BoundingRect, Centroid, Contains, Coord, Euclidean, Length, Line, LineString, Polygon, Rect};
use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Orientation {
    Clockwise,
    AntiClockwise,
}

impl Orientation {
    fn of(angle: f64) -> Self {
        if angle >= PI {
            Orientation::Clockwise
        } else {
            Orientation::AntiClockwise
        }
    }

    fn opposite(self) -> Self {
        match self {
            Orientation::Clockwise => Orientation::AntiClockwise,
            Orientation::AntiClockwise => Orientation::Clockwise,
        }
    }
}

/// Side of a closed line a bend bulges to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BendDirection {
    In,
    Out,
}

#[derive(Debug, Clone)]
pub(crate) struct Bend {
    /// First vertex of the bend
    pub i: usize,
    /// Last vertex of the bend
    pub j: usize,
    /// Vertices `i..=j` closed back to `i`
    pub polygon: Polygon<f64>,
    pub area: f64,
    pub adj_area: f64,
    pub to_reduce: bool,
    pub direction: Option<BendDirection>,
}

impl Bend {
    pub fn new(i: usize, j: usize, coords: &[Coord<f64>]) -> Self {
        let mut ring: Vec<Coord<f64>> = coords[i..=j].to_vec();
        ring.push(coords[i]);
        let polygon = Polygon::new(LineString::new(ring), vec![]);
        let area = polygon.unsigned_area();
        let perimeter = polygon.exterior().length::<Euclidean>();

        Self {
            i,
            j,
            polygon,
            area,
            adj_area: adjusted_area(area, perimeter),
            to_reduce: false,
            direction: None,
        }
    }

    pub fn bounding_rect(&self) -> Rect<f64> {
        self.polygon
            .exterior()
            .bounding_rect()
            .unwrap_or_else(|| Rect::new((0.0, 0.0), (0.0, 0.0)))
    }

    /// Straight line replacing the bend
    pub fn base(&self, record: &Record) -> Line<f64> {
        Line::new(record.vertex(self.i), record.vertex(self.j))
    }

    /// Base shortened by `zero_relative` at both ends, so that it does not
    /// touch the segments sharing its end points.
    pub fn trimmed_base(&self, record: &Record, eps: &Epsilon) -> Line<f64> {
        let base = self.base(record);
        let len = distance(base.start, base.end);
        if len < eps.zero_relative * 100.0 {
            // Near zero length, probably an error in the input data
            return base;
        }
        let t = eps.zero_relative / len;
        let delta = base.delta();
        Line::new(
            Coord {
                x: base.start.x + delta.x * t,
                y: base.start.y + delta.y * t,
            },
            Coord {
                x: base.end.x - delta.x * t,
                y: base.end.y - delta.y * t,
            },
        )
    }
}

/// Find the bends of a record, replacing any previous ones.
///
/// Returns the number of bends. A record without inflexion is marked
/// simplest.
pub(crate) fn detect_bends(record: &mut Record) -> usize {
    record.bends.clear();

    let mut orientation: Vec<Orientation> =
        record.angles().into_iter().map(Orientation::of).collect();
    if record.is_closed {
        if orientation.windows(2).all(|w| w[0] == w[1]) {
            // Convex ring: one single bend, nothing to reduce
            orientation.clear();
        } else {
            // The start/end vertex angle is not used
            orientation.remove(0);
        }
    }

    if let (Some(&first), Some(&last)) = (orientation.first(), orientation.last()) {
        orientation.insert(0, first.opposite());
        orientation.push(last.opposite());
    }

    let inflexion: Vec<usize> = (0..orientation.len().saturating_sub(1))
        .filter(|&k| orientation[k] != orientation[k + 1])
        .collect();

    if inflexion.is_empty() {
        record.is_simplest = true;
    } else {
        let coords = record.coords();
        let bends: Vec<Bend> = inflexion
            .windows(2)
            .map(|w| Bend::new(w[0], w[1] + 1, coords))
            .collect();
        record.bends = bends;
    }

    if record.is_closed {
        set_bend_direction(record);
    }

    record.bends.len()
}

/// The first bend of a closed line goes inside or outside the ring; the
/// following ones alternate.
fn set_bend_direction(record: &mut Record) {
    let Some(first) = record.bends.first() else {
        return;
    };
    let ring = Polygon::new(record.line.clone(), vec![]);
    let first_direction = match first.polygon.centroid() {
        Some(c) if ring.contains(&c) => BendDirection::In,
        _ => BendDirection::Out,
    };

    let mut direction = first_direction;
    for bend in record.bends.iter_mut() {
        bend.direction = Some(direction);
        direction = match direction {
            BendDirection::In => BendDirection::Out,
            BendDirection::Out => BendDirection::In,
        };
    }
}

/// Move the start/end vertex of a closed line into a bend that is kept.
///
/// The bend reduction never reduces the first and last bend of a closed
/// line, which avoids handling the circularity of the vertex array.
pub(crate) fn pivot_closed_line(record: &mut Record, diameter_tol: f64) {
    if !(record.is_closed && record.need_pivot) {
        return;
    }

    let min_adj_area = min_adjusted_area(diameter_tol);
    let mut location: Option<(usize, usize)> = None;
    let mut largest = 0.0;
    for bend in &record.bends {
        if bend.area > largest {
            location = Some((bend.i, bend.j));
            largest = bend.area;
        }
        // Ideal pivot bend has at least 4 vertices
        if bend.j - bend.i >= 4 && bend.area >= min_adj_area {
            location = Some((bend.i, bend.j));
            if bend.direction == Some(BendDirection::Out) {
                record.need_pivot = false;
                break;
            }
        }
    }

    if let Some((i, j)) = location {
        let coords = record.coords();
        let start = (i + j) / 2;
        let mut rotated: Vec<Coord<f64>> = Vec::with_capacity(coords.len());
        rotated.extend_from_slice(&coords[start..]);
        rotated.extend_from_slice(&coords[1..=start]);
        record.line = LineString::new(rotated);
    }
}

/// Flag the bends under the diameter tolerance, smallest first, never two
/// neighbours in the same pass.
pub(crate) fn flag_bends_to_reduce(record: &mut Record, diameter_tol: f64) {
    let min_adj_area = min_adjusted_area(diameter_tol);

    if record.is_closed && record.bends.len() >= 3 {
        // The start/end vertex lies on a bend that is kept
        record.bends.remove(0);
        record.bends.pop();
    }

    let mut candidates: Vec<(f64, usize)> = record
        .bends
        .iter()
        .enumerate()
        .filter(|(_, b)| b.area < min_adj_area)
        .map(|(k, b)| (b.adj_area, k))
        .collect();
    candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

    let bends = &mut record.bends;
    let end = bends.len().saturating_sub(1);
    let single = candidates.len() == 1;
    for (adj_area, k) in candidates {
        if adj_area > min_adj_area {
            break;
        }
        let previous_flagged = k > 0 && bends[k - 1].to_reduce;
        let next_flagged = k < end && bends[k + 1].to_reduce;
        if single || !(previous_flagged || next_flagged) {
            bends[k].to_reduce = true;
        }
    }

    if bends.is_empty() {
        record.is_simplest = true;
    }
}

/// Sub-bends of `bend` to try when its base crosses the line, largest area
/// first.
pub(crate) fn alternate_bends(bend: &Bend, coords: &[Coord<f64>]) -> Vec<Bend> {
    let mut alternates = Vec::new();
    for j in (bend.i + 2..=bend.j).rev() {
        for i in bend.i..=j - 2 {
            if i == bend.i && j == bend.j {
                continue;
            }
            alternates.push(Bend::new(i, j, coords));
        }
    }
    alternates.sort_by(|a, b| b.area.total_cmp(&a.area));
    alternates
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::record::RecordKind;
    use geo::line_string;

    fn eps() -> Epsilon {
        Epsilon::from_extent(None)
    }

    /// Straight line with one small spike and one big loop
    fn wavy() -> Record {
        Record::new(
            0,
            RecordKind::LineString,
            line_string![
                (x: 0.0, y: 0.0),
                (x: 10.0, y: 0.0),
                (x: 11.0, y: 1.0),
                (x: 12.0, y: 0.0),
                (x: 20.0, y: 0.0),
                (x: 25.0, y: -10.0),
                (x: 30.0, y: 0.0),
                (x: 40.0, y: 0.0)
            ],
            &eps(),
        )
    }

    #[test]
    fn test_detect_bends_open_line() {
        let mut r = wavy();
        let n = detect_bends(&mut r);
        assert!(n >= 2);
        assert!(!r.is_simplest);
        for b in &r.bends {
            assert!(b.j >= b.i + 2);
            assert!(b.area > 0.0);
        }
        // The spike 10..12 is one bend of area 1
        assert!(r.bends.iter().any(|b| b.i == 1 && b.j == 3 && (b.area - 1.0).abs() < 1e-9));
    }

    #[test]
    fn test_straight_line_has_no_bend() {
        let mut r = Record::new(
            0,
            RecordKind::LineString,
            line_string![(x: 0.0, y: 0.0), (x: 5.0, y: 0.0)],
            &eps(),
        );
        assert_eq!(detect_bends(&mut r), 0);
        assert!(r.is_simplest);
    }

    #[test]
    fn test_convex_ring_is_simplest() {
        let mut r = Record::new(
            0,
            RecordKind::Ring,
            line_string![
                (x: 0.0, y: 0.0),
                (x: 4.0, y: 0.0),
                (x: 4.0, y: 4.0),
                (x: 0.0, y: 4.0),
                (x: 0.0, y: 0.0)
            ],
            &eps(),
        );
        assert_eq!(detect_bends(&mut r), 0);
        assert!(r.is_simplest);
    }

    #[test]
    fn test_closed_bends_alternate_direction() {
        // Square with a notch cut in the bottom edge
        let mut r = Record::new(
            0,
            RecordKind::Ring,
            line_string![
                (x: 0.0, y: 0.0),
                (x: 4.0, y: 0.0),
                (x: 5.0, y: 1.0),
                (x: 6.0, y: 0.0),
                (x: 10.0, y: 0.0),
                (x: 10.0, y: 10.0),
                (x: 0.0, y: 10.0),
                (x: 0.0, y: 0.0)
            ],
            &eps(),
        );
        detect_bends(&mut r);
        assert!(r.bends.len() >= 2);
        for w in r.bends.windows(2) {
            assert!(w[0].direction.is_some());
            assert_ne!(w[0].direction, w[1].direction);
        }
        // The notch triangle lies outside the ring, the bend before it inside
        let notch = r.bends.iter().find(|b| b.i == 1 && b.j == 3).unwrap();
        assert_eq!(notch.direction, Some(BendDirection::Out));
        assert_eq!(r.bends[0].direction, Some(BendDirection::In));
    }

    #[test]
    fn test_flag_skips_neighbours() {
        let mut r = wavy();
        detect_bends(&mut r);
        // Every bend is smaller than a 100 unit circle
        flag_bends_to_reduce(&mut r, 100.0);
        let flags: Vec<bool> = r.bends.iter().map(|b| b.to_reduce).collect();
        assert!(flags.iter().any(|&f| f));
        for w in flags.windows(2) {
            assert!(!(w[0] && w[1]), "two neighbouring bends flagged: {:?}", flags);
        }
    }

    #[test]
    fn test_flag_nothing_under_zero_tolerance() {
        let mut r = wavy();
        detect_bends(&mut r);
        flag_bends_to_reduce(&mut r, 0.0);
        assert!(r.bends.iter().all(|b| !b.to_reduce));
    }

    #[test]
    fn test_trimmed_base_is_inside_base() {
        let mut r = wavy();
        detect_bends(&mut r);
        let e = eps();
        let bend = &r.bends[0];
        let base = bend.base(&r);
        let trimmed = bend.trimmed_base(&r, &e);
        let full = distance(base.start, base.end);
        let short = distance(trimmed.start, trimmed.end);
        assert!((full - short - 2.0 * e.zero_relative).abs() < 1e-9);
    }

    #[test]
    fn test_alternate_bends_sorted_and_nested() {
        let r = wavy();
        let bend = Bend::new(0, 4, r.coords());
        let alternates = alternate_bends(&bend, r.coords());
        // (1,4) (2,4) (0,3) (1,3) (0,2)
        assert_eq!(alternates.len(), 5);
        for a in &alternates {
            assert!(a.i >= bend.i && a.j <= bend.j && a.j - a.i >= 2);
            assert!(!(a.i == bend.i && a.j == bend.j));
        }
        for w in alternates.windows(2) {
            assert!(w[0].area >= w[1].area);
        }
    }

    #[test]
    fn test_pivot_keeps_ring_closed() {
        let mut r = Record::new(
            0,
            RecordKind::Ring,
            line_string![
                (x: 0.0, y: 0.0),
                (x: 4.0, y: 0.0),
                (x: 5.0, y: 1.0),
                (x: 6.0, y: 0.0),
                (x: 10.0, y: 0.0),
                (x: 10.0, y: 10.0),
                (x: 6.0, y: 10.0),
                (x: 5.0, y: 11.0),
                (x: 4.0, y: 10.0),
                (x: 0.0, y: 10.0),
                (x: 0.0, y: 0.0)
            ],
            &eps(),
        );
        let before = r.num_points();
        detect_bends(&mut r);
        pivot_closed_line(&mut r, 1.0);
        assert_eq!(r.num_points(), before);
        assert!(r.line.is_closed());
    }
}
