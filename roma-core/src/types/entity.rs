//! Canonical entities — the merged representation of a real-world place.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use xxhash_rust::xxh3::xxh3_64;

use super::record::{
    AttributeKey, AttributeValue, Confidence, NameVariant, RecordType, SourceName,
};

/// Stable identifier for a canonical entity.
///
/// Derived from the seed record's source identity, so re-running resolution
/// on the same input assigns the same ids. Immutable once assigned.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct EntityId(u64);

impl EntityId {
    /// Derive the id from the seed record's `(source, source_id)` pair.
    pub fn from_seed(source: SourceName, source_id: &str) -> Self {
        Self(xxh3_64(format!("{}:{}", source.as_str(), source_id).as_bytes()))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "loc_{:016x}", self.0)
    }
}

/// A reference back to one contributing source record. Never discarded,
/// even when every field of that record has been overridden.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceRef {
    pub source_name: SourceName,
    pub source_id: String,
}

/// Record of one field value losing to a higher-priority source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldOverride {
    /// The affected field, by name ("coordinates", "founding_year", ...).
    pub field: String,
    pub previous_source: SourceName,
    pub winning_source: SourceName,
}

/// The single merged representation of a real-world place.
///
/// Owned exclusively by the resolver while the run is open; handed out
/// immutably once the entity set is sealed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalEntity {
    pub entity_id: EntityId,
    /// Union of name variants across contributing records, deduplicated by
    /// normalized form. The first variant is the primary display name.
    pub names: SmallVec<[NameVariant; 4]>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub record_type: RecordType,
    /// Conflict-resolved attributes.
    pub merged_attributes: BTreeMap<AttributeKey, AttributeValue>,
    pub confidence: Option<Confidence>,
    /// Contributing records in merge order. Invariant: never empty.
    pub provenance: Vec<ProvenanceRef>,
    /// Every priority override applied during merging.
    pub overrides: Vec<FieldOverride>,
    /// Set when an equal-score ambiguous match was resolved by tie-break.
    pub low_confidence_match: bool,
}

impl CanonicalEntity {
    /// The surfaced display name.
    pub fn primary_name(&self) -> Option<&str> {
        self.names.first().map(|n| n.text.as_str())
    }

    /// Coordinates inside the WGS84 envelope, or absent entirely.
    pub fn coords_valid(&self) -> bool {
        match (self.latitude, self.longitude) {
            (None, None) => true,
            (Some(lat), Some(lon)) => {
                (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
            }
            _ => false,
        }
    }
}
