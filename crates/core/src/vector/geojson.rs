//! Minimal GeoJSON reader for polygon layers
//!
//! Handles `FeatureCollection` documents whose features carry `Polygon`
//! or `MultiPolygon` geometries. Other geometry types are kept as features
//! without geometry so attribute order is preserved.

use super::{AttributeValue, Feature, FeatureCollection};
use crate::error::{Error, Result};
use geo_types::{Coord, Geometry, LineString, MultiPolygon, Polygon};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

impl FeatureCollection {
    /// Parse a GeoJSON `FeatureCollection`
    pub fn from_geojson_str(text: &str) -> Result<Self> {
        let doc: Value = serde_json::from_str(text)
            .map_err(|e| Error::Other(format!("GeoJSON parse error: {}", e)))?;

        if doc.get("type").and_then(Value::as_str) != Some("FeatureCollection") {
            return Err(Error::Other("GeoJSON root is not a FeatureCollection".into()));
        }
        let features = doc
            .get("features")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::Other("GeoJSON FeatureCollection has no features array".into()))?;

        features.iter().map(parse_feature).collect()
    }

    /// Load a GeoJSON `FeatureCollection` from disk.
    ///
    /// Failures are reported as [`Error::Dataset`] naming the file.
    pub fn from_geojson_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let dataset = |reason: String| Error::Dataset {
            name: path.display().to_string(),
            reason,
        };
        let text = std::fs::read_to_string(path).map_err(|e| dataset(e.to_string()))?;
        Self::from_geojson_str(&text).map_err(|e| dataset(e.to_string()))
    }
}

fn parse_feature(value: &Value) -> Result<Feature> {
    let geometry = match value.get("geometry") {
        Some(Value::Null) | None => None,
        Some(g) => parse_geometry(g)?,
    };

    let properties: HashMap<String, AttributeValue> = value
        .get("properties")
        .and_then(Value::as_object)
        .map(|obj| {
            obj.iter()
                .map(|(k, v)| (k.clone(), attribute(v)))
                .collect()
        })
        .unwrap_or_default();

    let id = value.get("id").map(|v| match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    });

    Ok(Feature {
        geometry,
        properties,
        id,
    })
}

fn attribute(v: &Value) -> AttributeValue {
    match v {
        Value::Null => AttributeValue::Null,
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => AttributeValue::Int(i),
            None => n.as_f64().map_or(AttributeValue::Null, AttributeValue::Float),
        },
        Value::String(s) => AttributeValue::String(s.clone()),
        other => AttributeValue::String(other.to_string()),
    }
}

fn parse_geometry(g: &Value) -> Result<Option<Geometry<f64>>> {
    let kind = g.get("type").and_then(Value::as_str).unwrap_or_default();
    let coords = g.get("coordinates");
    match (kind, coords) {
        ("Polygon", Some(c)) => Ok(Some(Geometry::Polygon(polygon(c)?))),
        ("MultiPolygon", Some(Value::Array(parts))) => {
            let polys = parts.iter().map(polygon).collect::<Result<Vec<_>>>()?;
            Ok(Some(Geometry::MultiPolygon(MultiPolygon(polys))))
        }
        _ => Ok(None),
    }
}

fn polygon(value: &Value) -> Result<Polygon<f64>> {
    let rings = value
        .as_array()
        .ok_or_else(|| Error::Other("polygon coordinates must be an array of rings".into()))?;
    let mut rings = rings.iter().map(ring);
    let exterior = rings
        .next()
        .ok_or_else(|| Error::Other("polygon without exterior ring".into()))??;
    let interiors = rings.collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn ring(value: &Value) -> Result<LineString<f64>> {
    let positions = value
        .as_array()
        .ok_or_else(|| Error::Other("ring must be an array of positions".into()))?;
    positions
        .iter()
        .map(|p| {
            let xy = p.as_array().filter(|a| a.len() >= 2);
            match xy.and_then(|a| Some((a[0].as_f64()?, a[1].as_f64()?))) {
                Some((x, y)) => Ok(Coord { x, y }),
                None => Err(Error::Other(format!("invalid position {}", p))),
            }
        })
        .collect::<Result<Vec<_>>>()
        .map(LineString::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ZONES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "id": 7,
             "properties": {"zone": -3.5, "name": "NST"},
             "geometry": {"type": "Polygon",
                          "coordinates": [[[-60,40],[-50,40],[-50,50],[-60,50],[-60,40]]]}},
            {"type": "Feature",
             "properties": {"zone": 1},
             "geometry": {"type": "MultiPolygon",
                          "coordinates": [[[[0,0],[10,0],[10,10],[0,0]]],
                                          [[[20,0],[30,0],[30,10],[20,0]]]]}},
            {"type": "Feature", "properties": {"zone": 0}, "geometry": null}
        ]
    }"#;

    #[test]
    fn test_parse_feature_collection() {
        let fc = FeatureCollection::from_geojson_str(ZONES).unwrap();
        assert_eq!(fc.len(), 3);
        assert_eq!(fc.features[0].id.as_deref(), Some("7"));
        assert_eq!(fc.features[0].get_property("zone"), Some(&AttributeValue::Float(-3.5)));
        assert_eq!(fc.features[1].get_property("zone"), Some(&AttributeValue::Int(1)));
        assert!(matches!(fc.features[1].geometry, Some(Geometry::MultiPolygon(ref m)) if m.0.len() == 2));
        assert!(fc.features[2].geometry.is_none());
    }

    #[test]
    fn test_reject_non_collection() {
        assert!(FeatureCollection::from_geojson_str(r#"{"type": "Feature"}"#).is_err());
        assert!(FeatureCollection::from_geojson_str("not json").is_err());
    }

    #[test]
    fn test_missing_file_is_dataset_error() {
        let err = FeatureCollection::from_geojson_path("/nonexistent/time_zones.geojson").unwrap_err();
        assert!(matches!(err, Error::Dataset { .. }));
    }
}
