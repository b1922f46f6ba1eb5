//! roma-core: Shared foundation for the roma aggregation pipeline
//!
//! This crate provides the pieces every stage of the pipeline agrees on:
//! - Types: the normalized record model, canonical entities, table rows
//! - Config: layered configuration with the versioned source-priority table
//! - Errors: one error enum per subsystem, aggregated at the pipeline level
//! - Diagnostics: the structured non-fatal record of everything skipped,
//!   dropped or overridden during a run
//! - Constants: domain tables (travel speeds, known road dates, epithets)

pub mod cancel;
pub mod config;
pub mod constants;
pub mod diagnostics;
pub mod errors;
pub mod telemetry;
pub mod types;

// Re-exports for convenience
pub use cancel::{Cancellable, CancellationToken};
pub use config::{AssemblyConfig, NetworkConfig, PriorityTable, ResolveConfig, RomaConfig};
pub use diagnostics::{Diagnostic, DiagnosticKind, RunReport};
pub use errors::{
    AssemblyError, ConfigError, NetworkError, PipelineError, ResolveError, RomaErrorCode,
    StorageError,
};
pub use types::{
    AssembledTables, AttributeKey, AttributeValue, CanonicalEntity, Confidence, EntityId,
    EventRow, FieldOverride, LocationRow, NameVariant, NormalizedRecord, PersonRow,
    ProvenanceRef, ProvinceRow, RawTravelEdge, RecordType, RoadRow, RouteType, SourceName,
    TravelEdgeRow,
};
