//! GeoJSON reading/writing
//!
//! Uses the `geojson` crate and its geo-types conversions. Only the first two
//! ordinates of each position are kept, so Z and M values are dropped on read.

use crate::error::{Error, Result};
use crate::vector::{AttributeValue, Feature, FeatureCollection, FeatureId};
use geo_types::Geometry;
use geojson::feature::Id;
use geojson::{GeoJson, JsonObject};
use std::fs;
use std::path::Path;

/// Read a GeoJSON file into a FeatureCollection
pub fn read_geojson<P: AsRef<Path>>(path: P) -> Result<FeatureCollection> {
    let text = fs::read_to_string(path.as_ref())?;
    parse_geojson(&text)
}

/// Parse GeoJSON text.
///
/// Accepts a FeatureCollection, a single Feature or a bare Geometry.
pub fn parse_geojson(text: &str) -> Result<FeatureCollection> {
    let geojson: GeoJson = text.parse()?;

    match geojson {
        GeoJson::FeatureCollection(fc) => fc.features.into_iter().map(convert_feature).collect(),
        GeoJson::Feature(f) => Ok(FeatureCollection {
            features: vec![convert_feature(f)?],
        }),
        GeoJson::Geometry(g) => {
            let geometry = Geometry::<f64>::try_from(g)?;
            Ok(FeatureCollection {
                features: vec![Feature::new(geometry)],
            })
        }
    }
}

fn convert_feature(feature: geojson::Feature) -> Result<Feature> {
    let geometry = match feature.geometry {
        Some(g) => Some(Geometry::<f64>::try_from(g)?),
        None => None,
    };

    let properties = feature
        .properties
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| (k, AttributeValue::from(v)))
        .collect();

    let id = feature.id.map(|id| match id {
        Id::String(s) => FeatureId::String(s),
        Id::Number(n) => FeatureId::Number(n),
    });

    Ok(Feature {
        geometry,
        properties,
        id,
    })
}

/// Serialize a FeatureCollection to GeoJSON text
pub fn to_geojson_string(collection: &FeatureCollection) -> Result<String> {
    let features = collection
        .iter()
        .map(|f| {
            let properties: JsonObject = f
                .properties
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                .collect();

            geojson::Feature {
                bbox: None,
                geometry: f
                    .geometry
                    .as_ref()
                    .map(|g| geojson::Geometry::new(geojson::Value::from(g))),
                id: f.id.clone().map(|id| match id {
                    FeatureId::String(s) => Id::String(s),
                    FeatureId::Number(n) => Id::Number(n),
                }),
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    let fc = geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };

    serde_json::to_string(&fc).map_err(|e| Error::Other(format!("GeoJSON encode error: {}", e)))
}

/// Write a FeatureCollection as a GeoJSON file
pub fn write_geojson<P: AsRef<Path>>(collection: &FeatureCollection, path: P) -> Result<()> {
    let text = to_geojson_string(collection)?;
    fs::write(path.as_ref(), text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::GeometryKind;

    const ROADS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "id": 7,
                "properties": { "name": "main", "lanes": 2 },
                "geometry": { "type": "LineString", "coordinates": [[0, 0, 12.5], [1, 1, 13.0], [2, 0, 11.0]] }
            },
            {
                "type": "Feature",
                "properties": null,
                "geometry": null
            }
        ]
    }"#;

    #[test]
    fn test_parse_feature_collection() {
        let fc = parse_geojson(ROADS).unwrap();
        assert_eq!(fc.len(), 2);

        let road = &fc.features[0];
        assert_eq!(road.id, Some(FeatureId::from(7)));
        assert_eq!(road.kind(), Some(GeometryKind::LineString));
        assert_eq!(
            road.get_property("name"),
            Some(&AttributeValue::String("main".into()))
        );
        assert_eq!(road.get_property("lanes"), Some(&AttributeValue::Int(2)));
        assert!(fc.features[1].geometry.is_none());
    }

    #[test]
    fn test_parse_bare_geometry() {
        let fc = parse_geojson(r#"{"type": "Point", "coordinates": [3.0, 4.0]}"#).unwrap();
        assert_eq!(fc.len(), 1);
        assert_eq!(fc.features[0].kind(), Some(GeometryKind::Point));
    }

    #[test]
    fn test_invalid_geojson() {
        assert!(parse_geojson("{\"type\": \"Nope\"}").is_err());
    }

    #[test]
    fn test_write_then_read_file() {
        let fc = parse_geojson(ROADS).unwrap();
        let tmp = tempfile::NamedTempFile::new().unwrap();
        write_geojson(&fc, tmp.path()).unwrap();

        let reloaded = read_geojson(tmp.path()).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.features[0].geometry, fc.features[0].geometry);
        assert_eq!(reloaded.features[0].id, Some(FeatureId::from(7)));
    }

    #[test]
    fn test_feature_ids_keep_their_type() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "id": 5, "properties": {}, "geometry": null },
                { "type": "Feature", "id": "5", "properties": {}, "geometry": null },
                { "type": "Feature", "id": 2.5, "properties": {}, "geometry": null }
            ]
        }"#;
        let fc = parse_geojson(text).unwrap();
        let out = to_geojson_string(&fc).unwrap();

        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        let ids: Vec<&serde_json::Value> = value["features"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| &f["id"])
            .collect();
        assert_eq!(ids[0], &serde_json::json!(5));
        assert_eq!(ids[1], &serde_json::json!("5"));
        assert_eq!(ids[2], &serde_json::json!(2.5));

        assert_eq!(parse_geojson(&out).unwrap(), fc);
    }
}
