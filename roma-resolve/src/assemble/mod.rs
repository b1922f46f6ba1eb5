//! Relational table assembly with referential integrity.
//!
//! Locations come from the sealed entity set; provinces, roads, people and
//! events come from their raw records. Cross-references either resolve to
//! an existing row or become null with a diagnostic; a dangling reference
//! never survives assembly. A row that cannot satisfy its own mandatory
//! columns fails alone; the run continues.

use rustc_hash::FxHashSet;
use tracing::{info, warn};

use roma_core::config::AssemblyConfig;
use roma_core::constants::{known_road_date, ROMAN_START_YEAR};
use roma_core::diagnostics::{Diagnostic, DiagnosticKind, RunReport};
use roma_core::errors::AssemblyError;
use roma_core::types::{
    AssembledTables, AttributeKey, CanonicalEntity, Confidence, EventRow, LocationRow,
    NormalizedRecord, PersonRow, ProvinceRow, RecordType, RoadRow,
};

use crate::names::normalize_name;
use crate::resolver::SealedEntities;

pub struct SchemaAssembler {
    config: AssemblyConfig,
}

impl SchemaAssembler {
    pub fn new(config: &AssemblyConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Build all relational tables. `raw` carries the non-location records
    /// that bypass entity resolution.
    pub fn assemble(
        &self,
        sealed: &SealedEntities,
        raw: &[NormalizedRecord],
        report: &mut RunReport,
    ) -> Result<AssembledTables, AssemblyError> {
        let mut tables = AssembledTables::default();

        self.assemble_locations(sealed, &mut tables, report)?;
        self.assemble_provinces(raw, &mut tables, report);
        self.assign_provinces(&mut tables, report);
        self.assemble_roads(raw, &mut tables, report);

        // Location lookup for people/event references: row ids that were
        // actually emitted, plus normalized names mapped onto them.
        let emitted: FxHashSet<String> = tables.locations.iter().map(|l| l.id.clone()).collect();
        let resolver = LocationRefResolver { sealed, emitted };

        self.assemble_people(raw, &resolver, &mut tables, report);
        self.assemble_events(raw, &resolver, &mut tables, report);

        info!(
            locations = tables.locations.len(),
            provinces = tables.provinces.len(),
            roads = tables.roads.len(),
            people = tables.people.len(),
            events = tables.events.len(),
            "tables assembled"
        );
        Ok(tables)
    }

    fn assemble_locations(
        &self,
        sealed: &SealedEntities,
        tables: &mut AssembledTables,
        report: &mut RunReport,
    ) -> Result<(), AssemblyError> {
        let mut seen: FxHashSet<String> = FxHashSet::default();
        for entity in sealed.entities() {
            let id = entity.entity_id.to_string();
            if !seen.insert(id.clone()) {
                return Err(AssemblyError::IntegrityViolation(format!(
                    "duplicate location row id {id}"
                )));
            }
            let (Some(lat), Some(lon)) = (entity.latitude, entity.longitude) else {
                report.push(Diagnostic::new(
                    DiagnosticKind::MalformedRecord,
                    None,
                    id,
                    "entity has no coordinates; excluded from locations table",
                ));
                continue;
            };
            let Some(name_latin) = entity.primary_name() else {
                return Err(AssemblyError::IntegrityViolation(format!(
                    "entity {id} reached assembly without a name"
                )));
            };

            tables.locations.push(LocationRow {
                id,
                name_latin: name_latin.to_string(),
                name_modern: modern_name(entity),
                location_type: entity
                    .merged_attributes
                    .get(&AttributeKey::LocationType)
                    .and_then(|v| v.as_text())
                    .unwrap_or("other")
                    .to_string(),
                latitude: lat,
                longitude: lon,
                founding_year: attr_int(entity, &AttributeKey::FoundingYear),
                destruction_year: attr_int(entity, &AttributeKey::DestructionYear),
                peak_population: attr_int(entity, &AttributeKey::PeakPopulation),
                // Validated against the province table once it exists.
                province_id: attr_text(entity, &AttributeKey::ProvinceRef),
                description: attr_text(entity, &AttributeKey::Description),
                confidence: entity
                    .confidence
                    .unwrap_or(Confidence::Probable)
                    .as_str()
                    .to_string(),
                pleiades_uri: attr_text(entity, &AttributeKey::PleiadesUri),
                wikidata_id: attr_text(entity, &AttributeKey::WikidataId),
                topostext_url: attr_text(entity, &AttributeKey::ToposTextUrl),
            });
        }
        Ok(())
    }

    fn assemble_provinces(
        &self,
        raw: &[NormalizedRecord],
        tables: &mut AssembledTables,
        report: &mut RunReport,
    ) {
        let mut seen: FxHashSet<String> = FxHashSet::default();
        for record in raw.iter().filter(|r| r.record_type == RecordType::Province) {
            let id = row_id(record);
            if !seen.insert(id.clone()) {
                duplicate_row(record, &id, report);
                continue;
            }
            let Some(name) = record.names.first() else {
                missing(record, "province record has no name", report);
                continue;
            };
            let Some(polygon) = record
                .attributes
                .get(&AttributeKey::PolygonGeojson)
                .and_then(|v| v.as_text())
            else {
                missing(record, "province record has no polygon", report);
                continue;
            };

            tables.provinces.push(ProvinceRow {
                id,
                name: name.text.clone(),
                name_latin: latin_name(record).unwrap_or_else(|| name.text.clone()),
                start_year: record
                    .attr(&AttributeKey::StartYear)
                    .and_then(|v| v.as_int())
                    .unwrap_or(ROMAN_START_YEAR),
                end_year: record.attr(&AttributeKey::EndYear).and_then(|v| v.as_int()),
                polygon_geojson: polygon.to_string(),
                centroid_lat: record.latitude,
                centroid_lon: record.longitude,
            });
        }
    }

    /// Validate source-declared province references, then assign each
    /// location still lacking a province to the nearest province centroid,
    /// if one lies within the configured cutoff.
    fn assign_provinces(&self, tables: &mut AssembledTables, report: &mut RunReport) {
        let province_ids: FxHashSet<String> =
            tables.provinces.iter().map(|p| p.id.clone()).collect();
        for loc in &mut tables.locations {
            let Some(pid) = &loc.province_id else { continue };
            if !province_ids.contains(pid.as_str()) {
                report.push(Diagnostic::new(
                    DiagnosticKind::UnresolvedReference,
                    None,
                    loc.id.clone(),
                    format!("province_id: '{pid}' matches no assembled province"),
                ));
                loc.province_id = None;
            }
        }

        let centroids: Vec<(&str, f64, f64)> = tables
            .provinces
            .iter()
            .filter_map(|p| Some((p.id.as_str(), p.centroid_lat?, p.centroid_lon?)))
            .collect();
        if centroids.is_empty() {
            return;
        }

        let assigned: Vec<Option<String>> = tables
            .locations
            .iter()
            .map(|loc| {
                if loc.province_id.is_some() {
                    return loc.province_id.clone();
                }
                let mut best: Option<(&str, f64)> = None;
                for &(id, plat, plon) in &centroids {
                    let d = (loc.latitude - plat).powi(2) + (loc.longitude - plon).powi(2);
                    if best.map_or(true, |(_, bd)| d < bd) {
                        best = Some((id, d));
                    }
                }
                best.filter(|(_, d)| *d < self.config.province_max_sq_deg)
                    .map(|(id, _)| id.to_string())
            })
            .collect();
        for (loc, province_id) in tables.locations.iter_mut().zip(assigned) {
            loc.province_id = province_id;
        }
    }

    fn assemble_roads(
        &self,
        raw: &[NormalizedRecord],
        tables: &mut AssembledTables,
        report: &mut RunReport,
    ) {
        let mut seen: FxHashSet<String> = FxHashSet::default();
        for record in raw.iter().filter(|r| r.record_type == RecordType::Road) {
            let id = row_id(record);
            if !seen.insert(id.clone()) {
                duplicate_row(record, &id, report);
                continue;
            }
            let Some(path) = record
                .attributes
                .get(&AttributeKey::PathGeojson)
                .and_then(|v| v.as_text())
            else {
                missing(record, "road record has no path geometry", report);
                continue;
            };

            let name = record.names.first().map(|n| n.text.clone());
            let construction_year = record
                .attr(&AttributeKey::ConstructionYear)
                .and_then(|v| v.as_int())
                .or_else(|| {
                    name.as_deref()
                        .and_then(|n| known_road_date(&normalize_name(n)))
                });

            tables.roads.push(RoadRow {
                id,
                name_latin: latin_name(record).or_else(|| name.clone()),
                name,
                path_geojson: path.to_string(),
                construction_year,
                length_km: record
                    .attr(&AttributeKey::LengthKm)
                    .and_then(|v| v.as_float()),
                road_type: record
                    .attr(&AttributeKey::RoadType)
                    .and_then(|v| v.as_text())
                    .unwrap_or("secondary")
                    .to_string(),
                confidence: record
                    .confidence
                    .unwrap_or(Confidence::Probable)
                    .as_str()
                    .to_string(),
            });
        }
    }

    fn assemble_people(
        &self,
        raw: &[NormalizedRecord],
        resolver: &LocationRefResolver<'_>,
        tables: &mut AssembledTables,
        report: &mut RunReport,
    ) {
        let mut seen: FxHashSet<String> = FxHashSet::default();
        for record in raw.iter().filter(|r| r.record_type == RecordType::Person) {
            let id = row_id(record);
            if !seen.insert(id.clone()) {
                duplicate_row(record, &id, report);
                continue;
            }
            let Some(name) = record.names.first() else {
                missing(record, "person record has no name", report);
                continue;
            };

            let birth_location_id =
                resolver.resolve_attr(record, &AttributeKey::BirthPlace, report);
            let death_location_id =
                resolver.resolve_attr(record, &AttributeKey::DeathPlace, report);

            tables.people.push(PersonRow {
                id,
                name: name.text.clone(),
                name_latin: latin_name(record),
                birth_year: record
                    .attr(&AttributeKey::BirthYear)
                    .and_then(|v| v.as_int()),
                death_year: record
                    .attr(&AttributeKey::DeathYear)
                    .and_then(|v| v.as_int()),
                birth_location_id,
                death_location_id,
                role: attr_text_raw(record, &AttributeKey::Role),
                description: attr_text_raw(record, &AttributeKey::Description),
                wikidata_id: attr_text_raw(record, &AttributeKey::WikidataId),
            });
        }
    }

    fn assemble_events(
        &self,
        raw: &[NormalizedRecord],
        resolver: &LocationRefResolver<'_>,
        tables: &mut AssembledTables,
        report: &mut RunReport,
    ) {
        let mut seen: FxHashSet<String> = FxHashSet::default();
        for record in raw.iter().filter(|r| r.record_type == RecordType::Event) {
            let id = row_id(record);
            if !seen.insert(id.clone()) {
                duplicate_row(record, &id, report);
                continue;
            }
            let Some(name) = record.names.first() else {
                missing(record, "event record has no name", report);
                continue;
            };
            let Some(year) = record.attr(&AttributeKey::EventYear).and_then(|v| v.as_int())
            else {
                missing(record, "event record has no year", report);
                continue;
            };

            let location_id = resolver.resolve_attr(record, &AttributeKey::PlaceRef, report);

            tables.events.push(EventRow {
                id,
                name: name.text.clone(),
                year,
                end_year: record
                    .attr(&AttributeKey::EventEndYear)
                    .and_then(|v| v.as_int()),
                event_type: record
                    .attr(&AttributeKey::EventType)
                    .and_then(|v| v.as_text())
                    .unwrap_or("other")
                    .to_string(),
                location_id,
                description: attr_text_raw(record, &AttributeKey::Description),
                outcome: attr_text_raw(record, &AttributeKey::Outcome),
                wikidata_id: attr_text_raw(record, &AttributeKey::WikidataId),
            });
        }
    }
}

/// Resolves free-form place references against the emitted location rows.
struct LocationRefResolver<'a> {
    sealed: &'a SealedEntities,
    emitted: FxHashSet<String>,
}

impl LocationRefResolver<'_> {
    /// Resolve a textual place reference to a location row id: a literal
    /// row id first, then exact normalized-name lookup. Unresolved
    /// references become null, with a diagnostic.
    fn resolve_attr(
        &self,
        record: &NormalizedRecord,
        key: &AttributeKey,
        report: &mut RunReport,
    ) -> Option<String> {
        let reference = record.attr(key).and_then(|v| v.as_text())?;

        if self.emitted.contains(reference) {
            return Some(reference.to_string());
        }
        let norm = normalize_name(reference);
        for id in self.sealed.ids_for_name(&norm) {
            let row_id = id.to_string();
            if self.emitted.contains(row_id.as_str()) {
                return Some(row_id);
            }
        }

        warn!(
            source = %record.source_name,
            record = %record.source_id,
            reference,
            "place reference unresolved"
        );
        report.push(Diagnostic::new(
            DiagnosticKind::UnresolvedReference,
            Some(record.source_name),
            record.source_id.clone(),
            format!("{}: '{}' matches no resolved location", key.name(), reference),
        ));
        None
    }
}

fn row_id(record: &NormalizedRecord) -> String {
    format!("{}_{}", record.source_name, record.source_id)
}

fn latin_name(record: &NormalizedRecord) -> Option<String> {
    record
        .names
        .iter()
        .find(|n| n.lang.as_deref() == Some("la"))
        .map(|n| n.text.clone())
}

fn modern_name(entity: &CanonicalEntity) -> Option<String> {
    entity
        .names
        .iter()
        .find(|n| n.lang.as_deref().is_some_and(|l| l.starts_with("en")))
        .map(|n| n.text.clone())
}

fn attr_int(entity: &CanonicalEntity, key: &AttributeKey) -> Option<i64> {
    entity.merged_attributes.get(key).and_then(|v| v.as_int())
}

fn attr_text(entity: &CanonicalEntity, key: &AttributeKey) -> Option<String> {
    entity
        .merged_attributes
        .get(key)
        .and_then(|v| v.as_text())
        .map(|s| s.to_string())
}

fn attr_text_raw(record: &NormalizedRecord, key: &AttributeKey) -> Option<String> {
    record.attr(key).and_then(|v| v.as_text()).map(|s| s.to_string())
}

fn missing(record: &NormalizedRecord, detail: &str, report: &mut RunReport) {
    report.push(Diagnostic::new(
        DiagnosticKind::MalformedRecord,
        Some(record.source_name),
        record.source_id.clone(),
        detail,
    ));
}

fn duplicate_row(record: &NormalizedRecord, id: &str, report: &mut RunReport) {
    report.push(Diagnostic::new(
        DiagnosticKind::MalformedRecord,
        Some(record.source_name),
        record.source_id.clone(),
        format!("duplicate row id {id}; record skipped"),
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use roma_core::config::PriorityTable;
    use roma_core::config::ResolveConfig;
    use roma_core::types::{AttributeValue, NameVariant, SourceName};
    use smallvec::smallvec;

    use crate::resolver::EntityResolver;

    fn sealed_with_roma() -> (SealedEntities, RunReport) {
        let mut resolver =
            EntityResolver::new(&ResolveConfig::default(), PriorityTable::default());
        let mut rec =
            NormalizedRecord::new(SourceName::Pleiades, "423025", RecordType::Location);
        rec.names = smallvec![NameVariant::with_lang("Roma", "la")];
        rec.latitude = Some(41.9);
        rec.longitude = Some(12.5);
        resolver.ingest_source(SourceName::Pleiades, vec![rec]).unwrap();
        resolver.seal().unwrap()
    }

    fn person(source_id: &str, name: &str, birth_place: Option<&str>) -> NormalizedRecord {
        let mut rec = NormalizedRecord::new(SourceName::Wikidata, source_id, RecordType::Person);
        rec.names = smallvec![NameVariant::new(name)];
        if let Some(place) = birth_place {
            rec.attributes.insert(
                AttributeKey::BirthPlace,
                AttributeValue::Text(place.to_string()),
            );
        }
        rec
    }

    #[test]
    fn test_location_rows_from_entities() {
        let (sealed, mut report) = sealed_with_roma();
        let assembler = SchemaAssembler::new(&AssemblyConfig::default());
        let tables = assembler.assemble(&sealed, &[], &mut report).unwrap();
        assert_eq!(tables.locations.len(), 1);
        assert_eq!(tables.locations[0].name_latin, "Roma");
        assert_eq!(tables.locations[0].confidence, "probable");
    }

    #[test]
    fn test_person_birth_place_resolves_by_name() {
        let (sealed, mut report) = sealed_with_roma();
        let assembler = SchemaAssembler::new(&AssemblyConfig::default());
        let raw = vec![person("Q1048", "Iulius Caesar", Some("Roma"))];
        let tables = assembler.assemble(&sealed, &raw, &mut report).unwrap();
        assert_eq!(tables.people.len(), 1);
        let expected = tables.locations[0].id.clone();
        assert_eq!(tables.people[0].birth_location_id.as_deref(), Some(expected.as_str()));
    }

    #[test]
    fn test_unresolved_reference_nulled_with_diagnostic() {
        let (sealed, mut report) = sealed_with_roma();
        let assembler = SchemaAssembler::new(&AssemblyConfig::default());
        let raw = vec![person("Q42", "Hannibal", Some("Carthago"))];
        let tables = assembler.assemble(&sealed, &raw, &mut report).unwrap();
        assert_eq!(tables.people.len(), 1);
        assert!(tables.people[0].birth_location_id.is_none());
        assert_eq!(report.count_of(DiagnosticKind::UnresolvedReference), 1);
    }

    #[test]
    fn test_event_without_year_fails_row_only() {
        let (sealed, mut report) = sealed_with_roma();
        let assembler = SchemaAssembler::new(&AssemblyConfig::default());
        let mut event = NormalizedRecord::new(SourceName::Wikidata, "Q99", RecordType::Event);
        event.names = smallvec![NameVariant::new("Battle of Nowhere")];
        let tables = assembler.assemble(&sealed, &[event], &mut report).unwrap();
        assert!(tables.events.is_empty());
        assert_eq!(report.count_of(DiagnosticKind::MalformedRecord), 1);
        // Locations are untouched by the failed event row.
        assert_eq!(tables.locations.len(), 1);
    }

    #[test]
    fn test_declared_province_ref_validated() {
        let mut resolver =
            EntityResolver::new(&ResolveConfig::default(), PriorityTable::default());
        let mut rec =
            NormalizedRecord::new(SourceName::Pleiades, "423025", RecordType::Location);
        rec.names = smallvec![NameVariant::new("Roma")];
        rec.latitude = Some(41.9);
        rec.longitude = Some(12.5);
        rec.attributes.insert(
            AttributeKey::ProvinceRef,
            AttributeValue::Text("awmc_atlantis".to_string()),
        );
        resolver.ingest_source(SourceName::Pleiades, vec![rec]).unwrap();
        let (sealed, mut report) = resolver.seal().unwrap();

        let assembler = SchemaAssembler::new(&AssemblyConfig::default());
        let tables = assembler.assemble(&sealed, &[], &mut report).unwrap();

        // The declared province does not exist: nulled, diagnosed.
        assert!(tables.locations[0].province_id.is_none());
        assert_eq!(report.count_of(DiagnosticKind::UnresolvedReference), 1);
    }

    #[test]
    fn test_province_assignment_within_cutoff() {
        let (sealed, mut report) = sealed_with_roma();
        let assembler = SchemaAssembler::new(&AssemblyConfig::default());

        let mut province =
            NormalizedRecord::new(SourceName::Awmc, "italia", RecordType::Province);
        province.names = smallvec![NameVariant::new("Italia")];
        province.latitude = Some(42.5);
        province.longitude = Some(12.8);
        province.attributes.insert(
            AttributeKey::PolygonGeojson,
            AttributeValue::Text("{\"type\":\"Polygon\",\"coordinates\":[]}".to_string()),
        );

        let tables = assembler.assemble(&sealed, &[province], &mut report).unwrap();
        assert_eq!(tables.provinces.len(), 1);
        assert_eq!(
            tables.locations[0].province_id.as_deref(),
            Some("awmc_italia")
        );
    }
}
