//! roma-resolve: Cross-source entity resolution and schema assembly
//!
//! This crate is the core of the aggregation pipeline:
//! - Spatial: grid-partitioned proximity index over WGS84 coordinates
//! - Names: normalization and similarity scoring for ancient place names
//! - Matcher: the match decision between a record and existing entities
//! - Merge: field-level conflict resolution between disagreeing sources
//! - Resolver: source-by-source ingestion into the canonical entity arena
//! - Assemble: relational table construction with referential integrity
//! - Network: travel-edge endpoint resolution and graph assembly
//! - Pipeline: staged batch orchestration

pub mod assemble;
pub mod matcher;
pub mod merge;
pub mod names;
pub mod network;
pub mod pipeline;
pub mod resolver;
pub mod spatial;

// Re-exports for convenience
pub use assemble::SchemaAssembler;
pub use matcher::{EntityMatcher, MatchOutcome};
pub use merge::MergePolicy;
pub use names::{normalize_name, tokenize, NameMatcher};
pub use network::{NetworkStats, TravelNetwork, TravelNetworkBuilder};
pub use pipeline::{Pipeline, RunOutput, SourceBatch};
pub use resolver::{EntityResolver, SealedEntities};
pub use spatial::SpatialIndex;
