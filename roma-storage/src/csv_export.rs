//! CSV dumps of the assembled tables, one file per table.

use std::path::Path;

use serde::Serialize;
use tracing::info;

use roma_core::errors::StorageError;
use roma_core::types::AssembledTables;

/// Write every table as `<dir>/<table>.csv`.
pub fn export_all_csv(tables: &AssembledTables, dir: &Path) -> Result<(), StorageError> {
    write_table(dir, "locations", &tables.locations)?;
    write_table(dir, "provinces", &tables.provinces)?;
    write_table(dir, "roads", &tables.roads)?;
    write_table(dir, "people", &tables.people)?;
    write_table(dir, "events", &tables.events)?;
    write_table(dir, "travel_network", &tables.travel_network)?;
    info!(dir = %dir.display(), "csv export complete");
    Ok(())
}

fn write_table<T: Serialize>(dir: &Path, name: &str, rows: &[T]) -> Result<(), StorageError> {
    let path = dir.join(format!("{name}.csv"));
    let io_err = |message: String| StorageError::IoError {
        path: path.display().to_string(),
        message,
    };

    let mut writer = csv::Writer::from_path(&path).map_err(|e| io_err(e.to_string()))?;
    for row in rows {
        writer.serialize(row).map_err(|e| io_err(e.to_string()))?;
    }
    writer.flush().map_err(|e| io_err(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use roma_core::types::ProvinceRow;

    #[test]
    fn test_writes_one_file_per_table() {
        let dir = tempfile::tempdir().unwrap();
        let mut tables = AssembledTables::default();
        tables.provinces.push(ProvinceRow {
            id: "awmc_italia".to_string(),
            name: "Italia".to_string(),
            name_latin: "Italia".to_string(),
            start_year: -27,
            end_year: Some(476),
            polygon_geojson: "{}".to_string(),
            centroid_lat: Some(42.5),
            centroid_lon: Some(12.8),
        });

        export_all_csv(&tables, dir.path()).unwrap();

        for table in ["locations", "provinces", "roads", "people", "events", "travel_network"] {
            assert!(dir.path().join(format!("{table}.csv")).exists());
        }
        let content = std::fs::read_to_string(dir.path().join("provinces.csv")).unwrap();
        assert!(content.contains("awmc_italia"));
        assert!(content.contains("Italia"));
    }
}
