//! Database schema — the six assembled tables plus their indexes.

pub const CREATE_TABLES_SQL: &str = r#"
-- Locations: one row per resolved canonical place.
CREATE TABLE IF NOT EXISTS locations (
    id TEXT PRIMARY KEY,
    name_latin TEXT NOT NULL,
    name_modern TEXT,
    type TEXT NOT NULL DEFAULT 'other',
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    founding_year INTEGER,
    destruction_year INTEGER,
    peak_population INTEGER,
    province_id TEXT,
    description TEXT,
    confidence TEXT NOT NULL DEFAULT 'probable',
    pleiades_uri TEXT,
    wikidata_id TEXT,
    topostext_url TEXT
) STRICT;

CREATE INDEX IF NOT EXISTS idx_locations_coords ON locations(latitude, longitude);
CREATE INDEX IF NOT EXISTS idx_locations_type ON locations(type);
CREATE INDEX IF NOT EXISTS idx_locations_province ON locations(province_id)
    WHERE province_id IS NOT NULL;

CREATE TABLE IF NOT EXISTS provinces (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    name_latin TEXT NOT NULL,
    start_year INTEGER NOT NULL,
    end_year INTEGER,
    polygon_geojson TEXT NOT NULL,
    centroid_lat REAL,
    centroid_lon REAL
) STRICT;

CREATE INDEX IF NOT EXISTS idx_provinces_years ON provinces(start_year, end_year);

CREATE TABLE IF NOT EXISTS roads (
    id TEXT PRIMARY KEY,
    name TEXT,
    name_latin TEXT,
    path_geojson TEXT NOT NULL,
    construction_year INTEGER,
    length_km REAL,
    road_type TEXT NOT NULL DEFAULT 'secondary',
    confidence TEXT NOT NULL DEFAULT 'probable'
) STRICT;

CREATE INDEX IF NOT EXISTS idx_roads_year ON roads(construction_year);

CREATE TABLE IF NOT EXISTS people (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    name_latin TEXT,
    birth_year INTEGER,
    death_year INTEGER,
    birth_location_id TEXT,
    death_location_id TEXT,
    role TEXT,
    description TEXT,
    wikidata_id TEXT
) STRICT;

CREATE INDEX IF NOT EXISTS idx_people_years ON people(birth_year, death_year);

CREATE TABLE IF NOT EXISTS events (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    year INTEGER NOT NULL,
    end_year INTEGER,
    type TEXT NOT NULL DEFAULT 'other',
    location_id TEXT,
    description TEXT,
    outcome TEXT,
    wikidata_id TEXT
) STRICT;

CREATE INDEX IF NOT EXISTS idx_events_year ON events(year);
CREATE INDEX IF NOT EXISTS idx_events_type ON events(type);

-- Travel network: both endpoints are guaranteed to exist in locations.
CREATE TABLE IF NOT EXISTS travel_network (
    id TEXT PRIMARY KEY,
    source_location_id TEXT NOT NULL,
    target_location_id TEXT NOT NULL,
    source_name TEXT,
    target_name TEXT,
    distance_km REAL NOT NULL,
    travel_days_foot REAL,
    travel_days_horse REAL,
    travel_days_cart REAL,
    travel_days_ship REAL,
    cost_denarii_per_kg REAL,
    seasonal INTEGER NOT NULL DEFAULT 0,
    data_source TEXT NOT NULL
) STRICT;

CREATE INDEX IF NOT EXISTS idx_travel_network_source ON travel_network(source_location_id);
CREATE INDEX IF NOT EXISTS idx_travel_network_target ON travel_network(target_location_id);
"#;
