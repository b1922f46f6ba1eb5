//! SQLite export — one BEGIN IMMEDIATE transaction, cached statements.

use std::path::Path;

use rusqlite::{params, Connection};
use tracing::info;

use roma_core::errors::StorageError;
use roma_core::types::AssembledTables;

use crate::schema::CREATE_TABLES_SQL;

/// Rows written per table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportCounts {
    pub locations: usize,
    pub provinces: usize,
    pub roads: usize,
    pub people: usize,
    pub events: usize,
    pub travel_network: usize,
}

pub struct SqliteExporter;

impl SqliteExporter {
    /// Write the assembled tables to a fresh database at `path`.
    pub fn export(tables: &AssembledTables, path: &Path) -> Result<ExportCounts, StorageError> {
        let mut conn = Connection::open(path).map_err(sqlite_err)?;
        conn.execute_batch(CREATE_TABLES_SQL).map_err(sqlite_err)?;

        let counts = with_immediate_transaction(&mut conn, |tx| {
            let mut counts = ExportCounts::default();

            {
                let mut stmt = tx
                    .prepare_cached(
                        "INSERT INTO locations (id, name_latin, name_modern, type, latitude,
                             longitude, founding_year, destruction_year, peak_population,
                             province_id, description, confidence, pleiades_uri, wikidata_id,
                             topostext_url)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                    )
                    .map_err(sqlite_err)?;
                for row in &tables.locations {
                    stmt.execute(params![
                        row.id,
                        row.name_latin,
                        row.name_modern,
                        row.location_type,
                        row.latitude,
                        row.longitude,
                        row.founding_year,
                        row.destruction_year,
                        row.peak_population,
                        row.province_id,
                        row.description,
                        row.confidence,
                        row.pleiades_uri,
                        row.wikidata_id,
                        row.topostext_url,
                    ])
                    .map_err(sqlite_err)?;
                    counts.locations += 1;
                }
            }

            {
                let mut stmt = tx
                    .prepare_cached(
                        "INSERT INTO provinces (id, name, name_latin, start_year, end_year,
                             polygon_geojson, centroid_lat, centroid_lon)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    )
                    .map_err(sqlite_err)?;
                for row in &tables.provinces {
                    stmt.execute(params![
                        row.id,
                        row.name,
                        row.name_latin,
                        row.start_year,
                        row.end_year,
                        row.polygon_geojson,
                        row.centroid_lat,
                        row.centroid_lon,
                    ])
                    .map_err(sqlite_err)?;
                    counts.provinces += 1;
                }
            }

            {
                let mut stmt = tx
                    .prepare_cached(
                        "INSERT INTO roads (id, name, name_latin, path_geojson,
                             construction_year, length_km, road_type, confidence)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    )
                    .map_err(sqlite_err)?;
                for row in &tables.roads {
                    stmt.execute(params![
                        row.id,
                        row.name,
                        row.name_latin,
                        row.path_geojson,
                        row.construction_year,
                        row.length_km,
                        row.road_type,
                        row.confidence,
                    ])
                    .map_err(sqlite_err)?;
                    counts.roads += 1;
                }
            }

            {
                let mut stmt = tx
                    .prepare_cached(
                        "INSERT INTO people (id, name, name_latin, birth_year, death_year,
                             birth_location_id, death_location_id, role, description, wikidata_id)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                    )
                    .map_err(sqlite_err)?;
                for row in &tables.people {
                    stmt.execute(params![
                        row.id,
                        row.name,
                        row.name_latin,
                        row.birth_year,
                        row.death_year,
                        row.birth_location_id,
                        row.death_location_id,
                        row.role,
                        row.description,
                        row.wikidata_id,
                    ])
                    .map_err(sqlite_err)?;
                    counts.people += 1;
                }
            }

            {
                let mut stmt = tx
                    .prepare_cached(
                        "INSERT INTO events (id, name, year, end_year, type, location_id,
                             description, outcome, wikidata_id)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    )
                    .map_err(sqlite_err)?;
                for row in &tables.events {
                    stmt.execute(params![
                        row.id,
                        row.name,
                        row.year,
                        row.end_year,
                        row.event_type,
                        row.location_id,
                        row.description,
                        row.outcome,
                        row.wikidata_id,
                    ])
                    .map_err(sqlite_err)?;
                    counts.events += 1;
                }
            }

            {
                let mut stmt = tx
                    .prepare_cached(
                        "INSERT INTO travel_network (id, source_location_id, target_location_id,
                             source_name, target_name, distance_km, travel_days_foot,
                             travel_days_horse, travel_days_cart, travel_days_ship,
                             cost_denarii_per_kg, seasonal, data_source)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                    )
                    .map_err(sqlite_err)?;
                for row in &tables.travel_network {
                    stmt.execute(params![
                        row.id,
                        row.source_location_id,
                        row.target_location_id,
                        row.source_name,
                        row.target_name,
                        row.distance_km,
                        row.travel_days_foot,
                        row.travel_days_horse,
                        row.travel_days_cart,
                        row.travel_days_ship,
                        row.cost_denarii_per_kg,
                        row.seasonal as i64,
                        row.data_source,
                    ])
                    .map_err(sqlite_err)?;
                    counts.travel_network += 1;
                }
            }

            Ok(counts)
        })?;

        check_references(&conn)?;
        info!(
            locations = counts.locations,
            travel_network = counts.travel_network,
            path = %path.display(),
            "database exported"
        );
        Ok(counts)
    }
}

/// Execute a write operation inside a BEGIN IMMEDIATE transaction.
/// Acquiring the write lock at transaction start avoids SQLITE_BUSY from
/// late lock upgrades.
fn with_immediate_transaction<F, T>(conn: &mut Connection, f: F) -> Result<T, StorageError>
where
    F: FnOnce(&rusqlite::Transaction<'_>) -> Result<T, StorageError>,
{
    // Open a single BEGIN IMMEDIATE transaction (auto-rollback on drop,
    // commit below). Acquiring the write lock up front avoids SQLITE_BUSY
    // from late lock upgrades.
    let tx = conn
        .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)
        .map_err(sqlite_err)?;
    let result = f(&tx)?;
    tx.commit().map_err(sqlite_err)?;
    Ok(result)
}

/// Re-verify cross-table references after writing. The core already
/// guarantees these; a failure here means the export itself is defective.
fn check_references(conn: &Connection) -> Result<(), StorageError> {
    let dangling: i64 = conn
        .query_row(
            "SELECT
                 (SELECT COUNT(*) FROM travel_network t
                   WHERE t.source_location_id NOT IN (SELECT id FROM locations)
                      OR t.target_location_id NOT IN (SELECT id FROM locations))
               + (SELECT COUNT(*) FROM locations l
                   WHERE l.province_id IS NOT NULL
                     AND l.province_id NOT IN (SELECT id FROM provinces))
               + (SELECT COUNT(*) FROM people p
                   WHERE (p.birth_location_id IS NOT NULL
                          AND p.birth_location_id NOT IN (SELECT id FROM locations))
                      OR (p.death_location_id IS NOT NULL
                          AND p.death_location_id NOT IN (SELECT id FROM locations)))
               + (SELECT COUNT(*) FROM events e
                   WHERE e.location_id IS NOT NULL
                     AND e.location_id NOT IN (SELECT id FROM locations))",
            [],
            |row| row.get(0),
        )
        .map_err(sqlite_err)?;

    if dangling > 0 {
        return Err(StorageError::ForeignKeyCheckFailed(dangling as usize));
    }
    Ok(())
}

fn sqlite_err(e: rusqlite::Error) -> StorageError {
    StorageError::SqliteError {
        message: e.to_string(),
    }
}
