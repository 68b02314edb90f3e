//! Layer normalization: multi-part to single-part.
//!
//! Every part of a multi geometry becomes its own feature carrying a copy of
//! the attributes. Lines, rectangles and triangles are coerced to
//! LineString / Polygon and features without geometry are dropped.

use geo::{Geometry, LineString};
use geosim_core::{FeatureCollection, GeometryKind};
use tracing::debug;

/// Explode a collection into single-part features.
///
/// Returns the normalized collection and the geometry kind of its first
/// feature (`None` for an empty result).
pub fn normalize_features(input: &FeatureCollection) -> (FeatureCollection, Option<GeometryKind>) {
    let mut output = FeatureCollection::new();
    for feature in input.iter() {
        let Some(geometry) = feature.geometry.as_ref() else {
            continue;
        };
        for part in explode(geometry) {
            output.push(feature.with_geometry(part));
        }
    }

    let kind = output.features.first().and_then(|f| f.kind());
    debug!(
        "normalized {} features into {} single parts",
        input.len(),
        output.len()
    );
    (output, kind)
}

fn explode(geometry: &Geometry<f64>) -> Vec<Geometry<f64>> {
    match geometry {
        Geometry::Point(_) | Geometry::LineString(_) | Geometry::Polygon(_) => {
            vec![geometry.clone()]
        }
        Geometry::MultiPoint(mp) => mp.0.iter().map(|p| Geometry::Point(*p)).collect(),
        Geometry::MultiLineString(mls) => {
            mls.0.iter().cloned().map(Geometry::LineString).collect()
        }
        Geometry::MultiPolygon(mp) => mp.0.iter().cloned().map(Geometry::Polygon).collect(),
        Geometry::GeometryCollection(gc) => gc.0.iter().flat_map(explode).collect(),
        Geometry::Line(l) => vec![Geometry::LineString(LineString::new(vec![l.start, l.end]))],
        Geometry::Rect(r) => vec![Geometry::Polygon(r.to_polygon())],
        Geometry::Triangle(t) => vec![Geometry::Polygon(t.to_polygon())],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, point, polygon, Line, MultiLineString, MultiPolygon};
    use geosim_core::{AttributeValue, Feature};

    #[test]
    fn test_multipolygon_is_exploded_with_attributes() {
        let mp = MultiPolygon::new(vec![
            polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)],
            polygon![(x: 5.0, y: 5.0), (x: 6.0, y: 5.0), (x: 6.0, y: 6.0)],
        ]);
        let mut f = Feature::new(Geometry::MultiPolygon(mp));
        f.set_property("class", AttributeValue::Int(4));
        let fc: FeatureCollection = vec![f].into_iter().collect();

        let (out, kind) = normalize_features(&fc);
        assert_eq!(out.len(), 2);
        assert_eq!(kind, Some(GeometryKind::Polygon));
        assert!(out
            .iter()
            .all(|f| f.get_property("class") == Some(&AttributeValue::Int(4))));
    }

    #[test]
    fn test_mixed_collection() {
        let mls = MultiLineString::new(vec![
            line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)],
            line_string![(x: 2.0, y: 0.0), (x: 3.0, y: 0.0)],
        ]);
        let fc: FeatureCollection = vec![
            Feature::new(Geometry::MultiLineString(mls)),
            Feature::empty(),
            Feature::new(Geometry::Line(Line::new((0.0, 0.0), (4.0, 4.0)))),
            Feature::new(point!(x: 9.0, y: 9.0).into()),
        ]
        .into_iter()
        .collect();

        let (out, kind) = normalize_features(&fc);
        assert_eq!(out.len(), 4);
        assert_eq!(kind, Some(GeometryKind::LineString));
        assert_eq!(out.features[2].kind(), Some(GeometryKind::LineString));
        assert_eq!(out.features[3].kind(), Some(GeometryKind::Point));
    }

    #[test]
    fn test_empty_collection() {
        let (out, kind) = normalize_features(&FeatureCollection::new());
        assert!(out.is_empty());
        assert_eq!(kind, None);
    }
}
