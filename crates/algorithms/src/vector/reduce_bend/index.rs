//! Spatial index of every line segment and point being generalized.
//!
//! Lines are stored segment by segment rather than whole: a bend query only
//! returns the few segments around the bend, and a reduction only touches
//! the segments it removes or creates. The index must mirror the record
//! geometries at all times, so every vertex edit goes through it.

use super::epsilon::Epsilon;
use super::record::{distance, Record, RecordKind};
use geo::{Coord, Line, LineString, Point, Rect};
use geosim_core::{Error, Result};
use rstar::{RTree, RTreeObject, AABB};

#[derive(Debug, Clone, Copy)]
enum Shape {
    Point(Coord<f64>),
    Segment(Coord<f64>, Coord<f64>),
}

#[derive(Debug, Clone)]
struct Entry {
    id: u64,
    /// Record the entry belongs to
    owner: usize,
    shape: Shape,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl RTreeObject for Entry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        match self.shape {
            Shape::Point(c) => AABB::from_point([c.x, c.y]),
            Shape::Segment(a, b) => AABB::from_corners([a.x, a.y], [b.x, b.y]),
        }
    }
}

/// Geometries found around a bend
#[derive(Debug, Default)]
pub(crate) struct Neighbourhood {
    /// Segments of the record being reduced
    pub own: Vec<Line<f64>>,
    /// Segments of every other record
    pub others: Vec<Line<f64>>,
    pub points: Vec<Point<f64>>,
}

pub(crate) struct SegmentIndex {
    tree: RTree<Entry>,
    next_id: u64,
    /// Query boxes are grown by this much to avoid degenerate boxes
    grow: f64,
    /// Distance under which two segment end points match
    tolerance: f64,
}

impl SegmentIndex {
    /// Bulk load the segments and points of all records.
    pub fn new(records: &[Record], eps: &Epsilon) -> Self {
        let mut next_id = 0u64;
        let mut entries = Vec::new();
        for record in records {
            match record.kind {
                RecordKind::Point => {
                    if let Some(&c) = record.coords().first() {
                        entries.push(Entry {
                            id: next_id,
                            owner: record.id,
                            shape: Shape::Point(c),
                        });
                        next_id += 1;
                    }
                }
                RecordKind::LineString | RecordKind::Ring => {
                    for w in record.coords().windows(2) {
                        entries.push(Entry {
                            id: next_id,
                            owner: record.id,
                            shape: Shape::Segment(w[0], w[1]),
                        });
                        next_id += 1;
                    }
                }
            }
        }

        Self {
            tree: RTree::bulk_load(entries),
            next_id,
            grow: eps.zero_relative * 100.0,
            tolerance: eps.zero_relative,
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    fn insert_segment(&mut self, owner: usize, a: Coord<f64>, b: Coord<f64>) {
        self.tree.insert(Entry {
            id: self.next_id,
            owner,
            shape: Shape::Segment(a, b),
        });
        self.next_id += 1;
    }

    fn query_box(&self, min: Coord<f64>, max: Coord<f64>) -> AABB<[f64; 2]> {
        AABB::from_corners(
            [min.x - self.grow, min.y - self.grow],
            [max.x + self.grow, max.y + self.grow],
        )
    }

    /// Everything intersecting `rect`, split by ownership.
    pub fn neighbourhood(&self, rect: Rect<f64>, owner: usize) -> Neighbourhood {
        let envelope = self.query_box(rect.min(), rect.max());
        let mut hood = Neighbourhood::default();
        for entry in self.tree.locate_in_envelope_intersecting(&envelope) {
            match entry.shape {
                Shape::Point(c) => hood.points.push(Point::from(c)),
                Shape::Segment(a, b) if entry.owner == owner => hood.own.push(Line::new(a, b)),
                Shape::Segment(a, b) => hood.others.push(Line::new(a, b)),
            }
        }
        hood
    }

    /// Remove the segment `a -> b` of `owner`.
    ///
    /// The lookup box is a tiny box at the middle of the segment, which
    /// usually matches a single entry.
    fn delete_segment(&mut self, owner: usize, a: Coord<f64>, b: Coord<f64>) -> Result<()> {
        let mid = Coord {
            x: (a.x + b.x) / 2.0,
            y: (a.y + b.y) / 2.0,
        };
        let envelope = self.query_box(mid, mid);
        let found = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .find(|e| {
                e.owner == owner
                    && match e.shape {
                        Shape::Segment(s, t) => {
                            distance(s, a) <= self.tolerance && distance(t, b) <= self.tolerance
                        }
                        Shape::Point(_) => false,
                    }
            })
            .cloned();

        match found {
            Some(entry) => self.tree.remove(&entry).map(|_| ()).ok_or_else(|| {
                Error::StructureCorruption("unable to delete entry in the spatial index".into())
            }),
            None => Err(Error::StructureCorruption(format!(
                "segment ({}, {}) -> ({}, {}) of record {} is not indexed",
                a.x, a.y, b.x, b.y, owner
            ))),
        }
    }

    /// Delete the vertices `start..=end` of a record.
    ///
    /// The segments around the deleted vertices are replaced by the single
    /// segment joining `start - 1` and `end + 1`. The first and last vertex of
    /// a line cannot be deleted.
    pub fn delete_vertex(&mut self, record: &mut Record, start: usize, end: usize) -> Result<()> {
        if start == 0 || end + 1 >= record.num_points() || start > end {
            return Err(Error::Algorithm(format!(
                "cannot delete vertices {}..={} of a line with {} vertices",
                start,
                end,
                record.num_points()
            )));
        }

        for k in start - 1..=end {
            self.delete_segment(record.id, record.vertex(k), record.vertex(k + 1))?;
        }
        self.insert_segment(record.id, record.vertex(start - 1), record.vertex(end + 1));
        record.line.0.drain(start..=end);

        Ok(())
    }

    /// Replace the segment `i -> j` of a record with `subline`.
    ///
    /// `subline` runs from vertex `i` to vertex `j`; its interior vertices
    /// are inserted in the record.
    pub fn add_vertex(
        &mut self,
        record: &mut Record,
        i: usize,
        j: usize,
        subline: &LineString<f64>,
    ) -> Result<()> {
        self.delete_segment(record.id, record.vertex(i), record.vertex(j))?;

        let points = &subline.0;
        if points.len() > 2 {
            let interior = points[1..points.len() - 1].iter().copied();
            record.line.0.splice(j..j, interior);
        }

        for w in points.windows(2) {
            self.insert_segment(record.id, w[0], w[1]);
        }
        Ok(())
    }

    /// Check that the index holds exactly the segments of `records`.
    ///
    /// Every segment is removed in turn, so the index is empty of segments
    /// afterwards. Only call this once the reduction is over.
    pub fn validate(&mut self, records: &[Record]) -> bool {
        for record in records.iter().filter(|r| r.kind != RecordKind::Point) {
            for w in record.coords().windows(2) {
                if self.delete_segment(record.id, w[0], w[1]).is_err() {
                    return false;
                }
            }
        }
        self.tree
            .iter()
            .all(|e| matches!(e.shape, Shape::Point(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::line_string;

    fn eps() -> Epsilon {
        Epsilon::from_extent(Some(Rect::new((0.0, 0.0), (100.0, 100.0))))
    }

    fn records() -> Vec<Record> {
        let e = eps();
        vec![
            Record::new(
                0,
                RecordKind::LineString,
                line_string![
                    (x: 0.0, y: 0.0),
                    (x: 10.0, y: 0.0),
                    (x: 11.0, y: 1.0),
                    (x: 12.0, y: 0.0),
                    (x: 20.0, y: 0.0)
                ],
                &e,
            ),
            Record::new(
                1,
                RecordKind::LineString,
                line_string![(x: 0.0, y: 5.0), (x: 20.0, y: 5.0)],
                &e,
            ),
            Record::new(2, RecordKind::Point, LineString::new(vec![(11.0, 0.5).into()]), &e),
        ]
    }

    #[test]
    fn test_bulk_load() {
        let recs = records();
        let index = SegmentIndex::new(&recs, &eps());
        assert_eq!(index.len(), 4 + 1 + 1);
    }

    #[test]
    fn test_neighbourhood_split() {
        let recs = records();
        let index = SegmentIndex::new(&recs, &eps());
        let hood = index.neighbourhood(Rect::new((9.0, -1.0), (13.0, 2.0)), 0);
        assert_eq!(hood.own.len(), 4);
        assert!(hood.others.is_empty());
        assert_eq!(hood.points.len(), 1);

        let wide = index.neighbourhood(Rect::new((9.0, -1.0), (13.0, 6.0)), 0);
        assert_eq!(wide.others.len(), 1);
    }

    #[test]
    fn test_delete_vertex_keeps_index_in_sync() {
        let mut recs = records();
        let mut index = SegmentIndex::new(&recs, &eps());
        index.delete_vertex(&mut recs[0], 2, 2).unwrap();
        assert_eq!(recs[0].num_points(), 4);
        assert_eq!(index.len(), 3 + 1 + 1);
        assert!(index.validate(&recs));
    }

    #[test]
    fn test_delete_range_of_vertices() {
        let mut recs = records();
        let mut index = SegmentIndex::new(&recs, &eps());
        index.delete_vertex(&mut recs[0], 1, 3).unwrap();
        assert_eq!(
            recs[0].line,
            line_string![(x: 0.0, y: 0.0), (x: 20.0, y: 0.0)]
        );
        assert!(index.validate(&recs));
    }

    #[test]
    fn test_end_points_cannot_be_deleted() {
        let mut recs = records();
        let mut index = SegmentIndex::new(&recs, &eps());
        assert!(index.delete_vertex(&mut recs[0], 0, 1).is_err());
        assert!(index.delete_vertex(&mut recs[0], 3, 4).is_err());
    }

    #[test]
    fn test_add_vertex() {
        let mut recs = records();
        let mut index = SegmentIndex::new(&recs, &eps());
        let subline = line_string![
            (x: 12.0, y: 0.0),
            (x: 14.0, y: 1.0),
            (x: 18.0, y: 1.0),
            (x: 20.0, y: 0.0)
        ];
        index.add_vertex(&mut recs[0], 3, 4, &subline).unwrap();
        assert_eq!(recs[0].num_points(), 7);
        assert_eq!(recs[0].vertex(4), Coord { x: 14.0, y: 1.0 });
        assert_eq!(recs[0].vertex(5), Coord { x: 18.0, y: 1.0 });
        assert!(index.validate(&recs));
    }

    #[test]
    fn test_validate_detects_desync() {
        let mut recs = records();
        let mut index = SegmentIndex::new(&recs, &eps());
        // Edit the geometry behind the index's back
        recs[0].line.0.remove(2);
        assert!(!index.validate(&recs));
    }

    #[test]
    fn test_same_segment_other_owner_is_not_deleted() {
        let e = eps();
        let mut recs = vec![
            Record::new(
                0,
                RecordKind::LineString,
                line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0), (x: 2.0, y: 0.0)],
                &e,
            ),
            Record::new(
                1,
                RecordKind::LineString,
                line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0), (x: 2.0, y: 0.0)],
                &e,
            ),
        ];
        let mut index = SegmentIndex::new(&recs, &e);
        index.delete_vertex(&mut recs[1], 1, 1).unwrap();
        assert!(index.validate(&recs));
    }
}
