//! End-to-end behaviour of Reduce Bend on synthetic layers.
//!
//! Every run checks the internal spatial index and the properties a
//! generalized layer must keep: feature count, line end points, no new
//! vertices, no crossing between features.

use geo::{Area, Coord, Geometry, Intersects, LineString, Polygon};
use geosim_algorithms::prelude::*;
use geosim_core::io::{parse_geojson, to_geojson_string};

// ── Synthetic data ────────────────────────────────────────────────────

/// Line along x with a sine wiggle of the given amplitude.
fn wavy_line(len: f64, y0: f64, amplitude: f64, step: f64) -> LineString<f64> {
    let n = (len / step) as usize;
    (0..=n)
        .map(|k| {
            let x = k as f64 * step;
            Coord {
                x,
                y: y0 + amplitude * (x * 2.0).sin(),
            }
        })
        .collect()
}

/// Circle with a tooth on every second vertex.
fn gear(cx: f64, cy: f64, radius: f64, tooth: f64, step_deg: usize) -> LineString<f64> {
    let mut coords: Vec<Coord<f64>> = (0..360 / step_deg)
        .map(|k| {
            let a = ((k * step_deg) as f64).to_radians();
            let r = if k % 2 == 0 { radius } else { radius + tooth };
            Coord {
                x: cx + r * a.cos(),
                y: cy + r * a.sin(),
            }
        })
        .collect();
    coords.push(coords[0]);
    LineString::new(coords)
}

fn run(features: FeatureCollection, diameter_tol: f64) -> ReduceBendResults {
    let params = ReduceBendParams {
        diameter_tol,
        validate_structure: true,
        ..Default::default()
    };
    let results = reduce_bend(&features, &params, &LogFeedback::new()).unwrap();
    assert_eq!(results.is_structure_valid, Some(true));
    results
}

fn line_of(feature: &Feature) -> &LineString<f64> {
    match feature.geometry.as_ref() {
        Some(Geometry::LineString(ls)) => ls,
        other => panic!("expected a line string, got {:?}", other),
    }
}

// ── Lines ─────────────────────────────────────────────────────────────

#[test]
fn wavy_line_is_generalized() {
    let input = wavy_line(100.0, 0.0, 0.3, 0.25);
    let fc: FeatureCollection = vec![Feature::new(input.clone().into())].into_iter().collect();

    let res = run(fc, 5.0);
    assert!(res.nbr_bend_detected > 0);
    assert!(res.nbr_bend_reduced > 0);
    assert_eq!(res.out_nbr_features, 1);
    assert_eq!(res.lines_log_info.len(), res.nbr_pass + 1);

    let out = line_of(&res.features_out.features[0]);
    assert!(out.0.len() < input.0.len());
    assert_eq!(out.0.first(), input.0.first());
    assert_eq!(out.0.last(), input.0.last());
}

#[test]
fn parallel_lines_never_cross() {
    let a = wavy_line(60.0, 0.0, 0.4, 0.2);
    let b = wavy_line(60.0, 1.0, 0.4, 0.2);
    assert!(!a.intersects(&b));
    let fc: FeatureCollection = vec![Feature::new(a.into()), Feature::new(b.into())]
        .into_iter()
        .collect();

    let res = run(fc, 4.0);
    assert_eq!(res.out_nbr_features, 2);
    let out_a = line_of(&res.features_out.features[0]);
    let out_b = line_of(&res.features_out.features[1]);
    assert!(!out_a.intersects(out_b));
}

#[test]
fn larger_diameter_removes_more() {
    let input = wavy_line(100.0, 0.0, 1.0, 0.2);
    let fc: FeatureCollection = vec![Feature::new(input.into())].into_iter().collect();

    let small = run(fc.clone(), 0.5);
    let large = run(fc, 10.0);
    let vertices = |r: &ReduceBendResults| line_of(&r.features_out.features[0]).0.len();
    assert!(vertices(&large) <= vertices(&small));
    assert!(large.nbr_bend_reduced >= small.nbr_bend_reduced);
}

// ── Polygons ──────────────────────────────────────────────────────────

#[test]
fn gear_polygon_keeps_its_shape() {
    let exterior = gear(0.0, 0.0, 50.0, 1.0, 2);
    let hole = gear(0.0, 0.0, 10.0, 0.5, 10);
    let input = Polygon::new(exterior.clone(), vec![hole]);
    let fc: FeatureCollection = vec![Feature::new(input.into())].into_iter().collect();

    let res = run(fc, 3.0);
    assert!(res.nbr_bend_reduced > 0);
    assert_eq!(res.nbr_pol_del, 0);
    assert_eq!(res.nbr_hole_del, 0);

    let Some(Geometry::Polygon(out)) = &res.features_out.features[0].geometry else {
        panic!("expected a polygon");
    };
    assert!(out.exterior().is_closed());
    assert!(out.exterior().0.len() < exterior.0.len());
    assert_eq!(out.interiors().len(), 1);

    let area = out.unsigned_area();
    let pi = std::f64::consts::PI;
    assert!(area > pi * 49.0 * 49.0 - pi * 11.0 * 11.0);
    assert!(area < pi * 52.0 * 52.0);
}

#[test]
fn islands_under_tolerance_are_dropped() {
    let big = Polygon::new(gear(0.0, 0.0, 50.0, 1.0, 4), vec![]);
    let islands: Vec<Feature> = (0..5)
        .map(|k| {
            let island = Polygon::new(gear(200.0 + 10.0 * k as f64, 0.0, 1.0, 0.2, 30), vec![]);
            Feature::new(island.into())
        })
        .collect();
    let fc: FeatureCollection = std::iter::once(Feature::new(big.into()))
        .chain(islands)
        .collect();

    let res = run(fc, 5.0);
    assert_eq!(res.in_nbr_features, 6);
    assert_eq!(res.nbr_pol_del, 5);
    assert_eq!(res.out_nbr_features, 1);
}

// ── GeoJSON pipeline ──────────────────────────────────────────────────

const RIVERS: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "id": "r1",
      "properties": {"name": "North fork", "order": 2},
      "geometry": {
        "type": "MultiLineString",
        "coordinates": [
          [[0, 0], [10, 0], [11, 1], [12, 0], [30, 0]],
          [[0, 10], [10, 10], [11, 9], [12, 10], [30, 10]]
        ]
      }
    }
  ]
}"#;

#[test]
fn geojson_multi_part_pipeline() {
    let fc = parse_geojson(RIVERS).unwrap();
    let (single, kind) = normalize_features(&fc);
    assert_eq!(kind, Some(GeometryKind::LineString));
    assert_eq!(single.len(), 2);

    let res = run(single, 5.0);
    assert_eq!(res.nbr_bend_reduced, 2);

    let text = to_geojson_string(&res.features_out).unwrap();
    let back = parse_geojson(&text).unwrap();
    assert_eq!(back.len(), 2);
    for feature in back.iter() {
        assert_eq!(feature.id.as_ref().and_then(FeatureId::as_str), Some("r1"));
        assert_eq!(
            feature.get_property("name"),
            Some(&AttributeValue::String("North fork".into()))
        );
        assert_eq!(line_of(feature).0.len(), 2);
    }
}

#[test]
fn algorithm_trait_entry_point() {
    let fc = parse_geojson(RIVERS).unwrap();
    let res = ReduceBend
        .execute(
            fc,
            ReduceBendParams {
                diameter_tol: 5.0,
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(res.in_nbr_features, 2);
    assert_eq!(res.out_nbr_features, 2);
    assert_eq!(res.is_structure_valid, None);
}
