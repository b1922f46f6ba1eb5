//! Core data types shared across the pipeline.

mod edge;
mod entity;
mod record;
mod tables;

pub use edge::{RawTravelEdge, RouteType};
pub use entity::{CanonicalEntity, EntityId, FieldOverride, ProvenanceRef};
pub use record::{
    AttributeKey, AttributeValue, Confidence, NameVariant, NormalizedRecord, RecordType,
    SourceName,
};
pub use tables::{
    AssembledTables, EventRow, LocationRow, PersonRow, ProvinceRow, RoadRow, TravelEdgeRow,
};
