//! roma-storage: downstream export of the assembled tables.
//!
//! Consumes the relational handoff from roma-resolve and writes the
//! persistent artifacts: the SQLite database, GeoJSON views and CSV dumps.
//! The core guarantees referential integrity of what it hands over; this
//! crate re-checks it once after writing, then trusts it.

pub mod csv_export;
pub mod geojson;
pub mod schema;
pub mod sqlite;

pub use csv_export::export_all_csv;
pub use geojson::{locations_to_geojson, write_geojson};
pub use sqlite::{ExportCounts, SqliteExporter};
