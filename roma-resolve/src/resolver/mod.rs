//! Source-by-source ingestion into the canonical entity set.
//!
//! Sources are ingested in the configured priority order; the merge outcome
//! for a later source depends on the entities earlier sources created.
//! Record preparation (name normalization) is parallelized; every mutation
//! of the arena and spatial index goes through the single resolve loop.

mod arena;

pub use arena::{ArenaEntry, EntityArena, PreparedRecord};

use rayon::prelude::*;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::collections::BTreeMap;
use tracing::{debug, info};

use roma_core::config::{PriorityTable, ResolveConfig};
use roma_core::diagnostics::{Diagnostic, DiagnosticKind, RunReport};
use roma_core::errors::ResolveError;
use roma_core::types::{
    CanonicalEntity, EntityId, NormalizedRecord, ProvenanceRef, SourceName,
};

use crate::matcher::{EntityMatcher, MatchOutcome};
use crate::merge::MergePolicy;
use crate::names::normalize_name;
use crate::spatial::SpatialIndex;

/// The resolved, immutable entity set handed to the assembler. Once this
/// exists the run is sealed: no further merges are possible.
pub struct SealedEntities {
    entities: Vec<CanonicalEntity>,
    id_index: FxHashMap<EntityId, usize>,
    name_index: BTreeMap<String, SmallVec<[EntityId; 4]>>,
    spatial: SpatialIndex,
}

impl SealedEntities {
    pub fn get(&self, id: EntityId) -> Option<&CanonicalEntity> {
        self.id_index.get(&id).map(|&i| &self.entities[i])
    }

    /// Entity ids carrying the exact normalized name.
    pub fn ids_for_name(&self, norm: &str) -> &[EntityId] {
        self.name_index.get(norm).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Iterate normalized names and their carriers, in lexical order.
    pub fn names(&self) -> impl Iterator<Item = (&str, &[EntityId])> {
        self.name_index.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn query_near(&self, lat: f64, lon: f64, radius_km: f64) -> Vec<(EntityId, f64)> {
        self.spatial.query_near(lat, lon, radius_km)
    }

    pub fn entities(&self) -> &[CanonicalEntity] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// The resolution orchestrator. Owns the arena and the spatial index for
/// the duration of the run.
pub struct EntityResolver {
    matcher: EntityMatcher,
    policy: MergePolicy,
    arena: EntityArena,
    spatial: SpatialIndex,
    report: RunReport,
    next_seq: usize,
}

impl EntityResolver {
    pub fn new(config: &ResolveConfig, priorities: PriorityTable) -> Self {
        Self {
            matcher: EntityMatcher::new(config.match_radius_km, config.name_threshold),
            policy: MergePolicy::new(priorities),
            arena: EntityArena::new(),
            spatial: SpatialIndex::new(config.grid_cell_deg),
            report: RunReport::default(),
            next_seq: 0,
        }
    }

    /// Ingest one source's location records, in stream order.
    ///
    /// Malformed records (no usable name, out-of-envelope coordinates) are
    /// rejected with a diagnostic and never abort the run; only internal
    /// invariant failures do.
    pub fn ingest_source(
        &mut self,
        source: SourceName,
        records: Vec<NormalizedRecord>,
    ) -> Result<(), ResolveError> {
        let total = records.len();

        // Read-only preparation in parallel; order is preserved.
        let prepared: Vec<PreparedRecord> = records
            .into_par_iter()
            .map(|record| {
                let mut norm_names: SmallVec<[String; 4]> = SmallVec::new();
                let mut kept = SmallVec::new();
                for variant in &record.names {
                    let norm = normalize_name(&variant.text);
                    if !norm.is_empty() && !norm_names.iter().any(|n| *n == norm) {
                        norm_names.push(norm);
                        kept.push(variant.clone());
                    }
                }
                let mut record = record;
                record.names = kept;
                PreparedRecord { record, norm_names }
            })
            .collect();

        // Single-writer resolve loop.
        let mut merged = 0usize;
        let mut created = 0usize;
        for prepared in prepared {
            if let Some(reason) = validate(&prepared) {
                self.report.push(Diagnostic::new(
                    DiagnosticKind::MalformedRecord,
                    Some(source),
                    prepared.record.source_id.clone(),
                    reason,
                ));
                continue;
            }
            match self.matcher.find_match(&prepared, &self.arena, &self.spatial) {
                MatchOutcome::Matched { id, score, ambiguous } => {
                    self.apply_merge(id, &prepared, score, ambiguous)?;
                    merged += 1;
                }
                MatchOutcome::NoMatch => {
                    self.create_entity(prepared)?;
                    created += 1;
                }
            }
        }

        self.report.records_accepted += created;
        self.report.records_merged += merged;
        info!(
            source = %source,
            records = total,
            created,
            merged,
            "source ingested"
        );
        Ok(())
    }

    /// Seal the run: no further merges. Hands the entity set out immutably
    /// together with the accumulated diagnostics.
    pub fn seal(self) -> Result<(SealedEntities, RunReport), ResolveError> {
        // Re-check the entity invariants before handing off; a violation
        // here is a logic defect.
        for entry in self.arena.iter() {
            if entry.entity.provenance.is_empty() {
                return Err(ResolveError::IntegrityViolation(format!(
                    "entity {} has no provenance",
                    entry.entity.entity_id
                )));
            }
            if !entry.entity.coords_valid() {
                return Err(ResolveError::IntegrityViolation(format!(
                    "entity {} has invalid coordinates",
                    entry.entity.entity_id
                )));
            }
        }

        let spatial = self.spatial;
        let (entities, name_index) = self.arena.into_parts();
        let id_index: FxHashMap<EntityId, usize> = entities
            .iter()
            .enumerate()
            .map(|(i, e)| (e.entity_id, i))
            .collect();
        if id_index.len() != entities.len() {
            return Err(ResolveError::IntegrityViolation(
                "duplicate entity id in sealed set".to_string(),
            ));
        }

        info!(entities = entities.len(), "entity set sealed");
        Ok((
            SealedEntities {
                entities,
                id_index,
                name_index,
                spatial,
            },
            self.report,
        ))
    }

    pub fn entity_count(&self) -> usize {
        self.arena.len()
    }

    fn apply_merge(
        &mut self,
        id: EntityId,
        prepared: &PreparedRecord,
        score: f64,
        ambiguous: bool,
    ) -> Result<(), ResolveError> {
        let source = prepared.record.source_name;
        let entry = self
            .arena
            .get_mut(id)
            .ok_or_else(|| ResolveError::IntegrityViolation(format!("matched unknown id {id}")))?;

        if ambiguous {
            entry.entity.low_confidence_match = true;
        }
        let effects = self.policy.merge(entry, prepared);
        if !entry.entity.coords_valid() {
            return Err(ResolveError::IntegrityViolation(format!(
                "entity {id} coordinates left the valid envelope after merge"
            )));
        }
        debug!(entity = %id, source = %source, score, "record merged");

        for norm in effects.new_names {
            self.arena.register_name(norm, id);
        }
        for fo in effects.overrides {
            self.report.push(Diagnostic::new(
                DiagnosticKind::FieldOverride,
                Some(fo.winning_source),
                id.to_string(),
                format!(
                    "{}: {} overrides {}",
                    fo.field, fo.winning_source, fo.previous_source
                ),
            ));
        }
        if ambiguous {
            self.report.push(Diagnostic::new(
                DiagnosticKind::AmbiguousMatch,
                Some(source),
                prepared.record.source_id.clone(),
                format!("equal-score candidates above threshold; kept {id}"),
            ));
        }
        Ok(())
    }

    fn create_entity(&mut self, prepared: PreparedRecord) -> Result<(), ResolveError> {
        let record = prepared.record;
        let source = record.source_name;
        let id = EntityId::from_seed(source, &record.source_id);

        // Validation upstream guarantees coordinates are either absent or
        // a valid pair.
        let entity = CanonicalEntity {
            entity_id: id,
            names: record.names.clone(),
            latitude: record.latitude,
            longitude: record.longitude,
            record_type: record.record_type,
            merged_attributes: record.attributes.clone(),
            confidence: record.confidence,
            provenance: vec![ProvenanceRef {
                source_name: source,
                source_id: record.source_id.clone(),
            }],
            overrides: Vec::new(),
            low_confidence_match: false,
        };

        if let (Some(lat), Some(lon)) = (entity.latitude, entity.longitude) {
            self.spatial.insert(id, lat, lon);
        }

        let field_sources = record
            .attributes
            .keys()
            .map(|k| (k.clone(), source))
            .collect();

        self.arena.insert(ArenaEntry {
            coord_source: entity.latitude.map(|_| source),
            entity,
            norm_names: prepared.norm_names,
            seq: self.next_seq,
            primary_source: source,
            field_sources,
        })?;
        self.next_seq += 1;
        Ok(())
    }
}

/// Mandatory-field validation. Returns the rejection reason, if any.
fn validate(prepared: &PreparedRecord) -> Option<String> {
    if prepared.record.names.is_empty() || prepared.norm_names.is_empty() {
        return Some("record has no usable name".to_string());
    }
    match (prepared.record.latitude, prepared.record.longitude) {
        (None, None) => None,
        (Some(_), Some(_)) if prepared.record.has_valid_coords() => None,
        _ => Some("coordinates missing a component or out of range".to_string()),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use roma_core::types::{NameVariant, RecordType};
    use smallvec::smallvec;

    fn record(
        source: SourceName,
        source_id: &str,
        names: &[&str],
        coords: Option<(f64, f64)>,
    ) -> NormalizedRecord {
        let mut r = NormalizedRecord::new(source, source_id, RecordType::Location);
        r.names = names.iter().map(|n| NameVariant::new(*n)).collect();
        if let Some((lat, lon)) = coords {
            r.latitude = Some(lat);
            r.longitude = Some(lon);
        }
        r
    }

    fn resolver() -> EntityResolver {
        EntityResolver::new(&ResolveConfig::default(), PriorityTable::default())
    }

    #[test]
    fn test_same_place_two_sources_one_entity() {
        let mut r = resolver();
        r.ingest_source(
            SourceName::Pleiades,
            vec![record(SourceName::Pleiades, "423025", &["Roma"], Some((41.9, 12.5)))],
        )
        .unwrap();
        r.ingest_source(
            SourceName::Orbis,
            vec![record(SourceName::Orbis, "50327", &["Rome"], Some((41.89, 12.49)))],
        )
        .unwrap();

        assert_eq!(r.entity_count(), 1);
        let (sealed, report) = r.seal().unwrap();
        let entity = &sealed.entities()[0];
        assert_eq!(entity.provenance.len(), 2);
        assert_eq!(report.records_accepted, 1);
        assert_eq!(report.records_merged, 1);
    }

    #[test]
    fn test_record_without_names_rejected() {
        let mut r = resolver();
        r.ingest_source(
            SourceName::Pleiades,
            vec![record(SourceName::Pleiades, "99", &[], Some((41.0, 12.0)))],
        )
        .unwrap();
        assert_eq!(r.entity_count(), 0);
        let (_, report) = r.seal().unwrap();
        assert_eq!(report.records_rejected, 1);
        assert_eq!(
            report.diagnostics[0].kind,
            roma_core::diagnostics::DiagnosticKind::MalformedRecord
        );
    }

    #[test]
    fn test_out_of_range_coords_rejected() {
        let mut r = resolver();
        r.ingest_source(
            SourceName::Pleiades,
            vec![record(SourceName::Pleiades, "99", &["Nusquam"], Some((95.0, 12.0)))],
        )
        .unwrap();
        assert_eq!(r.entity_count(), 0);
    }

    #[test]
    fn test_unlocated_distinct_names_never_merge() {
        let mut r = resolver();
        r.ingest_source(
            SourceName::Wikidata,
            vec![
                record(SourceName::Wikidata, "Q1", &["Roma"], None),
                record(SourceName::Wikidata, "Q2", &["Rome"], None),
            ],
        )
        .unwrap();
        assert_eq!(r.entity_count(), 2);
    }

    #[test]
    fn test_sealed_set_lookups() {
        let mut r = resolver();
        r.ingest_source(
            SourceName::Pleiades,
            vec![record(SourceName::Pleiades, "1", &["Roma"], Some((41.9, 12.5)))],
        )
        .unwrap();
        let (sealed, _) = r.seal().unwrap();
        let id = sealed.entities()[0].entity_id;
        assert_eq!(sealed.ids_for_name("roma"), &[id]);
        assert_eq!(sealed.get(id).unwrap().primary_name(), Some("Roma"));
        assert_eq!(sealed.query_near(41.9, 12.5, 1.0).len(), 1);
    }
}
