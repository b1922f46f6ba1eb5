//! Grid-partitioned spatial index over WGS84 coordinates.
//!
//! Entities land in fixed-size degree cells; a radius query scans only the
//! cell window covering the radius and filters by haversine distance, so
//! lookups stay cheap as the canonical set grows to tens of thousands of
//! entries. Records without coordinates are never inserted.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use roma_core::constants::EARTH_RADIUS_KM;
use roma_core::types::EntityId;

/// Kilometres per degree of latitude (and of longitude at the equator).
const KM_PER_DEG: f64 = 111.0;

#[derive(Debug, Clone, Copy)]
struct SpatialEntry {
    id: EntityId,
    lat: f64,
    lon: f64,
}

/// Grid-based spatial index for proximity queries.
pub struct SpatialIndex {
    cell_deg: f64,
    grid: FxHashMap<(i32, i32), SmallVec<[SpatialEntry; 4]>>,
    len: usize,
}

impl SpatialIndex {
    /// Create an index with the given cell size in degrees.
    pub fn new(cell_deg: f64) -> Self {
        debug_assert!(cell_deg > 0.0);
        Self {
            cell_deg,
            grid: FxHashMap::default(),
            len: 0,
        }
    }

    /// Insert an entity's coordinates. The caller guarantees the
    /// coordinates are inside the WGS84 envelope.
    pub fn insert(&mut self, id: EntityId, lat: f64, lon: f64) {
        let cell = self.cell_of(lat, lon);
        self.grid
            .entry(cell)
            .or_default()
            .push(SpatialEntry { id, lat, lon });
        self.len += 1;
    }

    /// All entities within `radius_km` of the given point, ordered by
    /// increasing distance, ties by id.
    pub fn query_near(&self, lat: f64, lon: f64, radius_km: f64) -> Vec<(EntityId, f64)> {
        if self.len == 0 || radius_km <= 0.0 {
            return Vec::new();
        }

        // Cell window covering the radius. Longitude degrees shrink with
        // latitude, so widen the window accordingly.
        let lat_span = radius_km / KM_PER_DEG;
        let cos_lat = lat.to_radians().cos().abs().max(0.05);
        let lon_span = radius_km / (KM_PER_DEG * cos_lat);

        let (min_row, min_col) = self.cell_of(lat - lat_span, lon - lon_span);
        let (max_row, max_col) = self.cell_of(lat + lat_span, lon + lon_span);

        let mut hits: Vec<(EntityId, f64)> = Vec::new();
        for row in min_row..=max_row {
            for col in min_col..=max_col {
                let Some(entries) = self.grid.get(&(row, col)) else {
                    continue;
                };
                for entry in entries {
                    let dist = haversine_km(lat, lon, entry.lat, entry.lon);
                    if dist <= radius_km {
                        hits.push((entry.id, dist));
                    }
                }
            }
        }

        hits.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        hits
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn cell_of(&self, lat: f64, lon: f64) -> (i32, i32) {
        (
            (lat / self.cell_deg).floor() as i32,
            (lon / self.cell_deg).floor() as i32,
        )
    }
}

/// Great-circle distance in km between two WGS84 points.
pub fn haversine_km(lat_a: f64, lon_a: f64, lat_b: f64, lon_b: f64) -> f64 {
    let d_lat = (lat_b - lat_a).to_radians();
    let d_lon = (lon_b - lon_a).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat_a.to_radians().cos() * lat_b.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use roma_core::types::SourceName;

    fn id(n: u32) -> EntityId {
        EntityId::from_seed(SourceName::Pleiades, &n.to_string())
    }

    #[test]
    fn test_haversine_rome_ostia() {
        // Rome to Ostia Antica is roughly 23 km.
        let d = haversine_km(41.8902, 12.4922, 41.7554, 12.2919);
        assert!((20.0..28.0).contains(&d), "got {d}");
    }

    #[test]
    fn test_query_orders_by_distance() {
        let mut index = SpatialIndex::new(0.5);
        index.insert(id(1), 41.9, 12.5); // Rome
        index.insert(id(2), 41.75, 12.29); // Ostia
        index.insert(id(3), 40.85, 14.27); // Naples, outside radius

        let hits = index.query_near(41.89, 12.49, 30.0);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0, id(1));
        assert_eq!(hits[1].0, id(2));
        assert!(hits[0].1 < hits[1].1);
    }

    #[test]
    fn test_query_crosses_cell_boundaries() {
        let mut index = SpatialIndex::new(0.5);
        // Two points straddling a 0.5-degree cell edge.
        index.insert(id(1), 41.999, 12.499);
        index.insert(id(2), 42.001, 12.501);

        let hits = index.query_near(42.0, 12.5, 5.0);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_empty_index() {
        let index = SpatialIndex::new(0.5);
        assert!(index.query_near(41.9, 12.5, 50.0).is_empty());
    }
}
