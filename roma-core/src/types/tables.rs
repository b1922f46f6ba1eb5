//! Relational table rows — the assembled, referentially consistent output.
//!
//! Column sets follow the downstream store's schema. Cross-references are
//! either a valid id in the referenced table or `None`; assembly guarantees
//! no dangling references survive.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationRow {
    pub id: String,
    pub name_latin: String,
    pub name_modern: Option<String>,
    pub location_type: String,
    pub latitude: f64,
    pub longitude: f64,
    pub founding_year: Option<i64>,
    pub destruction_year: Option<i64>,
    pub peak_population: Option<i64>,
    pub province_id: Option<String>,
    pub description: Option<String>,
    pub confidence: String,
    pub pleiades_uri: Option<String>,
    pub wikidata_id: Option<String>,
    pub topostext_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvinceRow {
    pub id: String,
    pub name: String,
    pub name_latin: String,
    pub start_year: i64,
    pub end_year: Option<i64>,
    pub polygon_geojson: String,
    pub centroid_lat: Option<f64>,
    pub centroid_lon: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoadRow {
    pub id: String,
    pub name: Option<String>,
    pub name_latin: Option<String>,
    pub path_geojson: String,
    pub construction_year: Option<i64>,
    pub length_km: Option<f64>,
    pub road_type: String,
    pub confidence: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonRow {
    pub id: String,
    pub name: String,
    pub name_latin: Option<String>,
    pub birth_year: Option<i64>,
    pub death_year: Option<i64>,
    pub birth_location_id: Option<String>,
    pub death_location_id: Option<String>,
    pub role: Option<String>,
    pub description: Option<String>,
    pub wikidata_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRow {
    pub id: String,
    pub name: String,
    pub year: i64,
    pub end_year: Option<i64>,
    pub event_type: String,
    pub location_id: Option<String>,
    pub description: Option<String>,
    pub outcome: Option<String>,
    pub wikidata_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TravelEdgeRow {
    pub id: String,
    pub source_location_id: String,
    pub target_location_id: String,
    pub source_name: String,
    pub target_name: String,
    pub distance_km: f64,
    pub travel_days_foot: Option<f64>,
    pub travel_days_horse: Option<f64>,
    pub travel_days_cart: Option<f64>,
    pub travel_days_ship: Option<f64>,
    pub cost_denarii_per_kg: Option<f64>,
    pub seasonal: bool,
    pub data_source: String,
}

/// The full relational handoff to downstream consumers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssembledTables {
    pub locations: Vec<LocationRow>,
    pub provinces: Vec<ProvinceRow>,
    pub roads: Vec<RoadRow>,
    pub people: Vec<PersonRow>,
    pub events: Vec<EventRow>,
    pub travel_network: Vec<TravelEdgeRow>,
}

impl AssembledTables {
    pub fn row_counts(&self) -> [(&'static str, usize); 6] {
        [
            ("locations", self.locations.len()),
            ("provinces", self.provinces.len()),
            ("roads", self.roads.len()),
            ("people", self.people.len()),
            ("events", self.events.len()),
            ("travel_network", self.travel_network.len()),
        ]
    }
}
