//! The normalized record model — the common shape every source adapter
//! produces before records enter the resolution core.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// The academic sources the pipeline knows how to reconcile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceName {
    /// Pleiades gazetteer of ancient places.
    Pleiades,
    /// AWMC political boundary data (provinces).
    Awmc,
    /// Itiner-e Roman road segments.
    Itinere,
    /// Wikidata SPARQL extracts (people, events).
    Wikidata,
    /// ORBIS travel network model (sites and edges).
    Orbis,
    /// ToposText ancient-place citation index.
    ToposText,
}

impl SourceName {
    /// All known sources, in declaration order.
    pub const ALL: [SourceName; 6] = [
        SourceName::Pleiades,
        SourceName::Awmc,
        SourceName::Itinere,
        SourceName::Wikidata,
        SourceName::Orbis,
        SourceName::ToposText,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceName::Pleiades => "pleiades",
            SourceName::Awmc => "awmc",
            SourceName::Itinere => "itinere",
            SourceName::Wikidata => "wikidata",
            SourceName::Orbis => "orbis",
            SourceName::ToposText => "topostext",
        }
    }
}

impl fmt::Display for SourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of real-world thing a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Location,
    Road,
    Province,
    Person,
    Event,
}

/// Positional/attestation confidence, ordered most to least confident.
/// Merging takes the minimum: sources disagreeing pull the result down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Certain,
    Probable,
    Possible,
    Approximate,
}

impl Confidence {
    /// Rank with 0 = most confident. Used for the conservative-merge rule.
    pub fn rank(&self) -> u8 {
        match self {
            Confidence::Certain => 0,
            Confidence::Probable => 1,
            Confidence::Possible => 2,
            Confidence::Approximate => 3,
        }
    }

    /// The more conservative (less confident) of two values.
    pub fn min_confidence(a: Confidence, b: Confidence) -> Confidence {
        if a.rank() >= b.rank() {
            a
        } else {
            b
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Certain => "certain",
            Confidence::Probable => "probable",
            Confidence::Possible => "possible",
            Confidence::Approximate => "approximate",
        }
    }
}

/// A single name attestation with an optional language tag
/// (`"la"`, `"en"`, `"grc"`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameVariant {
    pub text: String,
    pub lang: Option<String>,
}

impl NameVariant {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            lang: None,
        }
    }

    pub fn with_lang(text: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            lang: Some(lang.into()),
        }
    }
}

/// Closed set of attribute keys the relational schema understands, with an
/// escape hatch for source-specific extras that are carried through
/// verbatim but never merged field-by-field.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKey {
    FoundingYear,
    DestructionYear,
    PeakPopulation,
    Description,
    LocationType,
    PleiadesUri,
    WikidataId,
    PolygonGeojson,
    PathGeojson,
    LengthKm,
    RoadType,
    ConstructionYear,
    StartYear,
    EndYear,
    BirthYear,
    DeathYear,
    BirthPlace,
    DeathPlace,
    Role,
    EventYear,
    EventEndYear,
    EventType,
    Outcome,
    PlaceRef,
    ProvinceRef,
    ToposTextUrl,
    TextCount,
    ReferenceCount,
    Extra(String),
}

impl AttributeKey {
    /// Stable snake_case field name, matching the relational column names.
    pub fn name(&self) -> String {
        match self {
            AttributeKey::FoundingYear => "founding_year".to_string(),
            AttributeKey::DestructionYear => "destruction_year".to_string(),
            AttributeKey::PeakPopulation => "peak_population".to_string(),
            AttributeKey::Description => "description".to_string(),
            AttributeKey::LocationType => "location_type".to_string(),
            AttributeKey::PleiadesUri => "pleiades_uri".to_string(),
            AttributeKey::WikidataId => "wikidata_id".to_string(),
            AttributeKey::PolygonGeojson => "polygon_geojson".to_string(),
            AttributeKey::PathGeojson => "path_geojson".to_string(),
            AttributeKey::LengthKm => "length_km".to_string(),
            AttributeKey::RoadType => "road_type".to_string(),
            AttributeKey::ConstructionYear => "construction_year".to_string(),
            AttributeKey::StartYear => "start_year".to_string(),
            AttributeKey::EndYear => "end_year".to_string(),
            AttributeKey::BirthYear => "birth_year".to_string(),
            AttributeKey::DeathYear => "death_year".to_string(),
            AttributeKey::BirthPlace => "birth_place".to_string(),
            AttributeKey::DeathPlace => "death_place".to_string(),
            AttributeKey::Role => "role".to_string(),
            AttributeKey::EventYear => "event_year".to_string(),
            AttributeKey::EventEndYear => "event_end_year".to_string(),
            AttributeKey::EventType => "event_type".to_string(),
            AttributeKey::Outcome => "outcome".to_string(),
            AttributeKey::PlaceRef => "place_ref".to_string(),
            AttributeKey::ProvinceRef => "province_ref".to_string(),
            AttributeKey::ToposTextUrl => "topostext_url".to_string(),
            AttributeKey::TextCount => "text_count".to_string(),
            AttributeKey::ReferenceCount => "reference_count".to_string(),
            AttributeKey::Extra(name) => name.clone(),
        }
    }
}

/// An attribute value. Kept deliberately small: sources hand over scalars,
/// and anything structured (polygons, paths) travels as pre-serialized text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl AttributeValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            AttributeValue::Float(v) => Some(*v),
            AttributeValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

/// A source record after per-source normalization, before resolution.
///
/// The upstream adapter layer guarantees `record_type` is set and `names`
/// is non-empty for records it considers valid; the resolver re-checks and
/// rejects rather than trusting that contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedRecord {
    /// Source-scoped unique identifier (e.g. a Pleiades place id).
    pub source_id: String,
    pub source_name: SourceName,
    /// Name variants in source order; the first is the source's preferred form.
    pub names: SmallVec<[NameVariant; 4]>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub record_type: RecordType,
    /// Source-specific fields retained verbatim.
    pub attributes: BTreeMap<AttributeKey, AttributeValue>,
    pub confidence: Option<Confidence>,
}

impl NormalizedRecord {
    pub fn new(
        source_name: SourceName,
        source_id: impl Into<String>,
        record_type: RecordType,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            source_name,
            names: SmallVec::new(),
            latitude: None,
            longitude: None,
            record_type,
            attributes: BTreeMap::new(),
            confidence: None,
        }
    }

    /// Both coordinates present and inside the WGS84 envelope.
    pub fn has_valid_coords(&self) -> bool {
        matches!(
            (self.latitude, self.longitude),
            (Some(lat), Some(lon)) if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
        )
    }

    pub fn attr(&self, key: &AttributeKey) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_conservative_merge() {
        assert_eq!(
            Confidence::min_confidence(Confidence::Certain, Confidence::Probable),
            Confidence::Probable
        );
        assert_eq!(
            Confidence::min_confidence(Confidence::Approximate, Confidence::Certain),
            Confidence::Approximate
        );
    }

    #[test]
    fn test_coord_validity() {
        let mut rec = NormalizedRecord::new(SourceName::Pleiades, "423025", RecordType::Location);
        assert!(!rec.has_valid_coords());
        rec.latitude = Some(41.9);
        rec.longitude = Some(12.5);
        assert!(rec.has_valid_coords());
        rec.latitude = Some(95.0);
        assert!(!rec.has_valid_coords());
    }
}
