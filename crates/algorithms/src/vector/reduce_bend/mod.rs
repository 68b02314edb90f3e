//! Reduce Bend line and polygon generalization
//!
//! Implements the bend simplification operator of Wang & Müller (1998):
//! lines are cut into bends at their inflexion points and every bend whose
//! adjusted area is under the area of a circle of the requested diameter is
//! replaced by its base. Bends are reduced smallest first, over as many
//! passes as needed, while keeping the topology of the whole layer:
//!
//! - a line never crosses itself (simplicity)
//! - a line never crosses another feature (intersection)
//! - a feature never changes side of a line (sidedness)
//!
//! Reference:
//! Wang, Z., Müller, J.-C. (1998). Line Generalization Based on Analysis of
//! Shape Characteristics. Cartography and Geographic Information Systems,
//! 25(1), 3-15.

mod bend;
mod epsilon;
mod index;
mod record;
mod smooth;

pub use epsilon::Epsilon;

use self::bend::{alternate_bends, detect_bends, flag_bends_to_reduce, pivot_closed_line, Bend};
use self::index::{Neighbourhood, SegmentIndex};
use self::record::{Record, RecordKind};
use self::smooth::BendReduced;
use crate::feedback::{Feedback, LogFeedback};
use crate::maybe_rayon::*;
use crate::vector::measurements::{adjusted_area, min_adjusted_area};
use crate::vector::normalize_features;
use geo::{Area, Contains, Euclidean, Geometry, Intersects, Length, Line, LineString, Point, Polygon};
use geosim_core::{Algorithm, Error, Feature, FeatureCollection, GeometryKind, Result};
use std::f64::consts::PI;
use tracing::{debug, info};

/// Passes run before a closed line is pivoted whatever its bend count
const MIN_NBR_PASS: usize = 1;

/// Parameters for bend reduction
#[derive(Debug, Clone)]
pub struct ReduceBendParams {
    /// Diameter of the minimum adjusted area bend to keep (layer units)
    pub diameter_tol: f64,
    /// Replace long straight bases by a smooth line
    pub smooth_line: bool,
    /// Delete polygons whose exterior ring is under the minimum adjusted area
    pub exclude_polygon: bool,
    /// Delete polygon holes under the minimum adjusted area
    pub exclude_hole: bool,
    /// Check the internal spatial index at the end of the run (debugging)
    pub validate_structure: bool,
}

impl Default for ReduceBendParams {
    fn default() -> Self {
        Self {
            diameter_tol: 0.0,
            smooth_line: false,
            exclude_polygon: true,
            exclude_hole: true,
            validate_structure: false,
        }
    }
}

/// Generalized features and run statistics
#[derive(Debug, Clone, Default)]
pub struct ReduceBendResults {
    pub in_nbr_features: usize,
    pub out_nbr_features: usize,
    /// Index of the last pass run
    pub nbr_pass: usize,
    /// Bends found during the first pass
    pub nbr_bend_detected: usize,
    pub nbr_bend_reduced: usize,
    pub nbr_pol_del: usize,
    pub nbr_hole_del: usize,
    pub nbr_line_smooth: usize,
    /// `None` unless structure validation was requested
    pub is_structure_valid: Option<bool>,
    /// One summary line per pass
    pub lines_log_info: Vec<String>,
    pub features_out: FeatureCollection,
}

/// Reduce Bend algorithm
#[derive(Debug, Clone, Default)]
pub struct ReduceBend;

impl Algorithm for ReduceBend {
    type Input = FeatureCollection;
    type Output = ReduceBendResults;
    type Params = ReduceBendParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Reduce Bend"
    }

    fn description(&self) -> &'static str {
        "Generalize lines and polygons by reducing bends under a diameter (Wang & Müller 1998)"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let (features, _) = normalize_features(&input);
        reduce_bend(&features, &params, &LogFeedback::new())
    }
}

/// Geometry parts of one feature, before they become records
struct FeatureParts {
    kind: GeometryKind,
    lines: Vec<LineString<f64>>,
}

/// A kept feature and the records holding its geometry
struct FeatureSlot {
    feature: usize,
    kind: Option<GeometryKind>,
    records: Vec<usize>,
}

/// Reduce the bends of single-part features.
///
/// Features must hold points, line strings or polygons; use
/// [`normalize_features`] first on multi-part data. Features without
/// geometry are passed through.
///
/// # Arguments
/// * `features` - Features to generalize
/// * `params` - Diameter tolerance and options
/// * `feedback` - Progress, cancellation and user messages
pub fn reduce_bend(
    features: &FeatureCollection,
    params: &ReduceBendParams,
    feedback: &dyn Feedback,
) -> Result<ReduceBendResults> {
    let diameter_tol = params.diameter_tol;
    if !diameter_tol.is_finite() || diameter_tol < 0.0 {
        return Err(Error::InvalidParameter {
            name: "diameter_tol",
            value: diameter_tol.to_string(),
            reason: "must be a finite number >= 0".into(),
        });
    }

    let input = &features.features;
    let parts: Vec<Option<FeatureParts>> = input
        .into_par_iter()
        .map(feature_parts)
        .collect::<Result<Vec<_>>>()?;

    let eps = Epsilon::from_features(input);
    debug!(
        "epsilon: relative {:e}, absolute {:e}, angle {:e}",
        eps.zero_relative, eps.zero_absolute, eps.zero_angle
    );

    let mut results = ReduceBendResults {
        in_nbr_features: input.len(),
        ..Default::default()
    };

    // Small polygons and holes
    let min_adj_area = min_adjusted_area(diameter_tol);
    let pruned: Vec<(Option<FeatureParts>, bool, usize)> = parts
        .into_par_iter()
        .map(|p| prune_rings(p, min_adj_area, params))
        .collect();

    let mut records: Vec<Record> = Vec::new();
    let mut slots: Vec<FeatureSlot> = Vec::with_capacity(input.len());
    for (feature, (parts, polygon_deleted, holes_deleted)) in pruned.into_iter().enumerate() {
        results.nbr_hole_del += holes_deleted;
        if polygon_deleted {
            results.nbr_pol_del += 1;
            continue;
        }
        let mut slot = FeatureSlot {
            feature,
            kind: parts.as_ref().map(|p| p.kind),
            records: Vec::new(),
        };
        if let Some(parts) = parts {
            let kind = match parts.kind {
                GeometryKind::Point => RecordKind::Point,
                GeometryKind::LineString => RecordKind::LineString,
                _ => RecordKind::Ring,
            };
            for line in parts.lines {
                let id = records.len();
                let mut record = Record::new(id, kind, line, &eps);
                if kind != RecordKind::Point && !record.is_simplest {
                    record.remove_duplicate_nodes(eps.zero_relative);
                }
                records.push(record);
                slot.records.push(id);
            }
        }
        slots.push(slot);
    }

    let mut index = SegmentIndex::new(&records, &eps);
    debug!(
        "{} geometry records, {} entries in the spatial index",
        records.len(),
        index.len()
    );

    let mut reduced_bends = if params.smooth_line {
        Some(Vec::new())
    } else {
        None
    };

    let progress_step = if records.is_empty() {
        0.0
    } else {
        100.0 / records.len() as f64
    };
    let mut nbr_pass = 0;
    loop {
        let nbr_done = records.iter().filter(|r| r.is_simplest).count();
        feedback.set_progress(((nbr_done as f64 * progress_step) as u32).max(1));

        let mut nbr_bend_detected = 0;
        let mut nbr_bend_reduced = 0;
        for record in records.iter_mut() {
            if feedback.is_canceled() {
                break;
            }
            if record.is_simplest {
                continue;
            }
            nbr_bend_detected += manage_bend_creation(record, &mut index, nbr_pass, diameter_tol, &eps)?;
            flag_bends_to_reduce(record, diameter_tol);
            nbr_bend_reduced +=
                process_bends(record, &mut index, &eps, feedback, reduced_bends.as_mut())?;
        }

        results.lines_log_info.push(format!(
            "Iteration: {}; Bends detected: {}; Bend reduced: {}; Tolerance used: {}",
            nbr_pass, nbr_bend_detected, nbr_bend_reduced, diameter_tol
        ));
        if nbr_pass == 0 {
            results.nbr_bend_detected = nbr_bend_detected;
        }
        results.nbr_bend_reduced += nbr_bend_reduced;

        if feedback.is_canceled() {
            info!("bend reduction cancelled after pass {}", nbr_pass);
            break;
        }
        if nbr_pass > MIN_NBR_PASS && nbr_bend_reduced == 0 {
            break;
        }
        nbr_pass += 1;
    }
    results.nbr_pass = nbr_pass;

    if let Some(reduced_bends) = reduced_bends {
        for reduced in &reduced_bends {
            let record = &mut records[reduced.record_id];
            if let Some((i, j)) = reduced.smoothable_site(record, diameter_tol, &eps) {
                let smooth = reduced.smooth_line(record, i, j);
                index.add_vertex(record, i, j, &smooth)?;
                results.nbr_line_smooth += 1;
            }
        }
    }

    let features_out: FeatureCollection = slots
        .iter()
        .map(|slot| rebuild_feature(&input[slot.feature], slot, &records))
        .collect();
    results.out_nbr_features = features_out.len();
    results.features_out = features_out;

    if params.validate_structure {
        results.is_structure_valid = Some(index.validate(&records));
    }

    info!(
        "reduce bend: {} passes, {} bends reduced, {} -> {} features",
        results.nbr_pass, results.nbr_bend_reduced, results.in_nbr_features, results.out_nbr_features
    );
    Ok(results)
}

fn feature_parts(feature: &Feature) -> Result<Option<FeatureParts>> {
    let Some(geometry) = feature.geometry.as_ref() else {
        return Ok(None);
    };
    let parts = match geometry {
        Geometry::Point(p) => FeatureParts {
            kind: GeometryKind::Point,
            lines: vec![LineString::new(vec![p.0])],
        },
        Geometry::LineString(ls) => FeatureParts {
            kind: GeometryKind::LineString,
            lines: vec![ls.clone()],
        },
        Geometry::Polygon(p) => {
            let mut lines = Vec::with_capacity(1 + p.interiors().len());
            lines.push(p.exterior().clone());
            lines.extend(p.interiors().iter().cloned());
            FeatureParts {
                kind: GeometryKind::Polygon,
                lines,
            }
        }
        other => {
            return Err(Error::UnsupportedGeometry(format!(
                "{} (explode multi-part geometries first)",
                GeometryKind::of(other)
            )))
        }
    };
    Ok(Some(parts))
}

/// Drop the rings under the minimum adjusted area.
///
/// Returns the remaining parts, whether the whole polygon went, and the
/// number of holes deleted.
fn prune_rings(
    parts: Option<FeatureParts>,
    min_adj_area: f64,
    params: &ReduceBendParams,
) -> (Option<FeatureParts>, bool, usize) {
    let Some(mut parts) = parts else {
        return (None, false, 0);
    };
    if parts.kind != GeometryKind::Polygon || !(params.exclude_polygon || params.exclude_hole) {
        return (Some(parts), false, 0);
    }

    let mut holes_deleted = 0;
    for k in (0..parts.lines.len()).rev() {
        let ring = Polygon::new(parts.lines[k].clone(), vec![]);
        let adj_area = adjusted_area(ring.unsigned_area(), ring.exterior().length::<Euclidean>());
        if k == 0 {
            if params.exclude_polygon && adj_area < min_adj_area {
                return (None, true, holes_deleted);
            }
        } else if params.exclude_hole && adj_area < min_adj_area {
            parts.lines.remove(k);
            holes_deleted += 1;
        }
    }
    (Some(parts), false, holes_deleted)
}

/// Delete the co-linear and flat-angle vertices of a record.
///
/// The start vertex of a closed line is kept even when co-linear.
fn delete_co_linear(record: &mut Record, index: &mut SegmentIndex, eps: &Epsilon) -> Result<()> {
    let mut angles = record.angles();
    if record.is_closed && !angles.is_empty() {
        angles.remove(0);
    }

    let to_delete: Vec<usize> = angles
        .iter()
        .enumerate()
        .filter(|&(_, &a)| (a - PI).abs() <= eps.zero_angle || a.abs() <= eps.zero_angle)
        .map(|(k, _)| k + 1)
        .collect();
    for &v in to_delete.iter().rev() {
        index.delete_vertex(record, v, v)?;
    }

    if record.length() <= eps.zero_relative {
        // Something is wrong with this line; leave it alone
        record.is_simplest = true;
    }
    Ok(())
}

/// Clean and cut a record into bends; returns the number of bends.
///
/// Pivoting a closed line is costly, so it waits for the first passes to
/// remove the small bends unless the line has few bends.
fn manage_bend_creation(
    record: &mut Record,
    index: &mut SegmentIndex,
    nbr_pass: usize,
    diameter_tol: f64,
    eps: &Epsilon,
) -> Result<usize> {
    delete_co_linear(record, index, eps)?;
    let mut nbr_bends = detect_bends(record);
    if record.is_closed && (nbr_pass >= MIN_NBR_PASS || record.bends.len() < 10) {
        // Rotating a ring keeps the same set of segments in the index
        pivot_closed_line(record, diameter_tol);
        delete_co_linear(record, index, eps)?;
        nbr_bends = detect_bends(record);
    }
    Ok(nbr_bends)
}

/// Reduce the flagged bends that pass the topological constraints.
///
/// Bends are visited last to first so the vertex indices of the remaining
/// bends stay valid.
fn process_bends(
    record: &mut Record,
    index: &mut SegmentIndex,
    eps: &Epsilon,
    feedback: &dyn Feedback,
    mut reduced_bends: Option<&mut Vec<BendReduced>>,
) -> Result<usize> {
    let mut nbr_reduced = 0;
    for k in (0..record.bends.len()).rev() {
        if !record.bends[k].to_reduce {
            continue;
        }
        let Some(bend) = validate_spatial_constraints(&record.bends[k], record, index, eps, feedback)
        else {
            continue;
        };

        if let Some(reduced) = reduced_bends.as_deref_mut() {
            reduced.push(BendReduced::new(
                record.id,
                record.vertex(bend.i),
                record.vertex(bend.j),
                bend.polygon.clone(),
            ));
        }
        index.delete_vertex(record, bend.i + 1, bend.j - 1)?;
        record.bends[k] = bend;
        nbr_reduced += 1;
    }
    Ok(nbr_reduced)
}

/// The bend to reduce in place of `bend`, if any keeps the topology.
///
/// When the base of `bend` would cross its own line, the largest sub-bend
/// whose base does not is tried instead. Intersection and sidedness are
/// then checked on the retained bend.
fn validate_spatial_constraints(
    bend: &Bend,
    record: &Record,
    index: &SegmentIndex,
    eps: &Epsilon,
    feedback: &dyn Feedback,
) -> Option<Bend> {
    let hood = index.neighbourhood(bend.bounding_rect(), record.id);
    let base = bend.base(record);

    let mut retained = bend.clone();
    if base.length::<Euclidean>() >= eps.zero_relative {
        if crosses_itself(&bend.trimmed_base(record, eps), &hood) {
            retained = alternate_bends(bend, record.coords())
                .into_iter()
                .find(|alt| !crosses_itself(&alt.trimmed_base(record, eps), &hood))?;
        }
    } else {
        feedback.push_info(&format!(
            "Possibly non OGC simple feature at {},{} use Fix geometries",
            base.start.x, base.start.y
        ));
    }

    let base = retained.base(record);
    let intersects_others = hood.others.iter().any(|s| s.intersects(&base))
        || hood.points.iter().any(|p| base.intersects(&p.0));
    if intersects_others {
        return None;
    }

    let swallows_others = hood.others.iter().any(|s| retained.polygon.contains(s))
        || hood.points.iter().any(|p: &Point<f64>| retained.polygon.contains(p));
    if swallows_others {
        return None;
    }

    Some(retained)
}

fn crosses_itself(base: &Line<f64>, hood: &Neighbourhood) -> bool {
    hood.own.iter().any(|s| s.intersects(base))
}

fn rebuild_feature(original: &Feature, slot: &FeatureSlot, records: &[Record]) -> Feature {
    let mut lines = slot.records.iter().map(|&id| records[id].line.clone());
    let geometry = match slot.kind {
        Some(GeometryKind::Point) => lines
            .next()
            .and_then(|l| l.0.first().copied())
            .map(|c| Geometry::Point(Point::from(c))),
        Some(GeometryKind::LineString) => lines.next().map(Geometry::LineString),
        Some(_) => lines.next().map(|exterior| {
            Geometry::Polygon(Polygon::new(exterior, lines.collect()))
        }),
        None => None,
    };

    match geometry {
        Some(g) => original.with_geometry(g),
        None => original.clone(),
    }
}
