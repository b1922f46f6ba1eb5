//! GeoJSON view of the locations table.

use std::path::Path;

use serde_json::{json, Value};
use tracing::info;

use roma_core::errors::StorageError;
use roma_core::types::LocationRow;

/// Build a FeatureCollection over the location rows. Geometry is a Point in
/// [lon, lat] order, per the GeoJSON spec.
pub fn locations_to_geojson(locations: &[LocationRow]) -> Value {
    let features: Vec<Value> = locations
        .iter()
        .map(|loc| {
            json!({
                "type": "Feature",
                "geometry": {
                    "type": "Point",
                    "coordinates": [loc.longitude, loc.latitude],
                },
                "properties": {
                    "id": loc.id,
                    "name_latin": loc.name_latin,
                    "name_modern": loc.name_modern,
                    "type": loc.location_type,
                    "province_id": loc.province_id,
                    "confidence": loc.confidence,
                    "founding_year": loc.founding_year,
                    "destruction_year": loc.destruction_year,
                },
            })
        })
        .collect();

    json!({
        "type": "FeatureCollection",
        "features": features,
    })
}

/// Write the FeatureCollection to disk.
pub fn write_geojson(locations: &[LocationRow], path: &Path) -> Result<(), StorageError> {
    let collection = locations_to_geojson(locations);
    let content = serde_json::to_string_pretty(&collection).map_err(|e| StorageError::IoError {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    std::fs::write(path, content).map_err(|e| StorageError::IoError {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    info!(features = locations.len(), path = %path.display(), "geojson written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> LocationRow {
        LocationRow {
            id: "loc_1".to_string(),
            name_latin: "Roma".to_string(),
            name_modern: Some("Rome".to_string()),
            location_type: "city".to_string(),
            latitude: 41.9,
            longitude: 12.5,
            founding_year: Some(-753),
            destruction_year: None,
            peak_population: None,
            province_id: None,
            description: None,
            confidence: "certain".to_string(),
            pleiades_uri: None,
            wikidata_id: None,
            topostext_url: None,
        }
    }

    #[test]
    fn test_feature_collection_shape() {
        let value = locations_to_geojson(&[row()]);
        assert_eq!(value["type"], "FeatureCollection");
        let feature = &value["features"][0];
        // GeoJSON wants [lon, lat].
        assert_eq!(feature["geometry"]["coordinates"][0], 12.5);
        assert_eq!(feature["geometry"]["coordinates"][1], 41.9);
        assert_eq!(feature["properties"]["name_latin"], "Roma");
    }
}
