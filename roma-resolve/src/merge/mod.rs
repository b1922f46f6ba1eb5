//! Field-level conflict resolution between disagreeing sources.
//!
//! Rules, per field class:
//! - Coordinates: the higher-priority source wins; the same source
//!   contributing twice averages.
//! - Names: union of all variants, deduplicated by normalized form; the
//!   highest-priority contributing source surfaces the primary name.
//! - Scalar attributes: first writer wins unless the newcomer strictly
//!   outranks it, and every override is recorded, never silent.
//! - Confidence: the most conservative value wins.
//!
//! Every merge appends to provenance; nothing is ever removed from it.

use roma_core::config::PriorityTable;
use roma_core::types::{Confidence, FieldOverride, NameVariant, ProvenanceRef};

use crate::names::normalize_name;
use crate::resolver::{ArenaEntry, PreparedRecord};

/// Effects of a merge that the resolver must act on: normalized names that
/// are new to the entity (for the arena's name index) and the overrides
/// applied (for diagnostics).
#[derive(Debug, Default)]
pub struct MergeEffects {
    pub new_names: Vec<String>,
    pub overrides: Vec<FieldOverride>,
}

/// Applies the declared field rules for one record merging into one entity.
pub struct MergePolicy {
    priorities: PriorityTable,
}

impl MergePolicy {
    pub fn new(priorities: PriorityTable) -> Self {
        Self { priorities }
    }

    /// Merge a record into an existing arena entry. Returns the effects;
    /// the provenance append happens here unconditionally.
    pub fn merge(&self, entry: &mut ArenaEntry, prepared: &PreparedRecord) -> MergeEffects {
        let record = &prepared.record;
        let source = record.source_name;
        let mut effects = MergeEffects::default();

        // Coordinates. Records reach merge pre-validated, so a present pair
        // is inside the envelope.
        if let (Some(lat), Some(lon)) = (record.latitude, record.longitude) {
            match entry.coord_source {
                None => {
                    entry.entity.latitude = Some(lat);
                    entry.entity.longitude = Some(lon);
                    entry.coord_source = Some(source);
                }
                Some(owner) if self.priorities.outranks(source, owner) => {
                    entry.entity.latitude = Some(lat);
                    entry.entity.longitude = Some(lon);
                    entry.coord_source = Some(source);
                    let fo = FieldOverride {
                        field: "coordinates".to_string(),
                        previous_source: owner,
                        winning_source: source,
                    };
                    entry.entity.overrides.push(fo.clone());
                    effects.overrides.push(fo);
                }
                Some(owner) if self.priorities.rank(owner) == self.priorities.rank(source) => {
                    // Priority tie: average.
                    entry.entity.latitude =
                        entry.entity.latitude.map(|cur| (cur + lat) / 2.0);
                    entry.entity.longitude =
                        entry.entity.longitude.map(|cur| (cur + lon) / 2.0);
                }
                Some(_) => {}
            }
        }

        // Names: union, never discard.
        for variant in &record.names {
            let norm = normalize_name(&variant.text);
            if norm.is_empty() {
                continue;
            }
            if !entry.norm_names.iter().any(|n| *n == norm) {
                entry.norm_names.push(norm.clone());
                entry.entity.names.push(variant.clone());
                effects.new_names.push(norm);
            }
        }
        // Primary display name follows the preferred-source order.
        if self.priorities.outranks(source, entry.primary_source) {
            if let Some(first) = record.names.first() {
                self.surface_primary(entry, first);
                entry.primary_source = source;
            }
        }

        // Scalar attributes: first writer wins unless strictly outranked.
        for (key, value) in &record.attributes {
            match entry.field_sources.get(key).copied() {
                None => {
                    entry.entity.merged_attributes.insert(key.clone(), value.clone());
                    entry.field_sources.insert(key.clone(), source);
                }
                Some(owner) if self.priorities.outranks(source, owner) => {
                    entry.entity.merged_attributes.insert(key.clone(), value.clone());
                    entry.field_sources.insert(key.clone(), source);
                    let fo = FieldOverride {
                        field: key.name(),
                        previous_source: owner,
                        winning_source: source,
                    };
                    entry.entity.overrides.push(fo.clone());
                    effects.overrides.push(fo);
                }
                Some(_) => {}
            }
        }

        // Confidence: most conservative wins.
        if let Some(c) = record.confidence {
            entry.entity.confidence = Some(match entry.entity.confidence {
                Some(cur) => Confidence::min_confidence(cur, c),
                None => c,
            });
        }

        // Provenance always grows, exactly once per merged record.
        entry.entity.provenance.push(ProvenanceRef {
            source_name: source,
            source_id: record.source_id.clone(),
        });

        effects
    }

    /// Move the variant matching `preferred` to the front of the name list.
    fn surface_primary(&self, entry: &mut ArenaEntry, preferred: &NameVariant) {
        let norm = normalize_name(&preferred.text);
        if let Some(pos) = entry
            .norm_names
            .iter()
            .position(|n| *n == norm)
        {
            // norm_names and entity.names are kept index-aligned.
            let name = entry.entity.names.remove(pos);
            let norm = entry.norm_names.remove(pos);
            entry.entity.names.insert(0, name);
            entry.norm_names.insert(0, norm);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::tests_support::{entry_from, prepared_record};
    use roma_core::types::{AttributeKey, AttributeValue, SourceName};

    fn policy() -> MergePolicy {
        MergePolicy::new(PriorityTable::default())
    }

    #[test]
    fn test_lower_priority_never_overrides_scalars() {
        // Pleiades seeds, ToposText (lower priority) arrives second.
        let mut entry = entry_from(SourceName::Pleiades, "1", "Roma", Some((41.9, 12.5)));
        entry.entity.merged_attributes.insert(
            AttributeKey::Description,
            AttributeValue::Text("caput mundi".into()),
        );
        entry
            .field_sources
            .insert(AttributeKey::Description, SourceName::Pleiades);

        let mut rec = prepared_record(SourceName::ToposText, "tt9", "Rome", Some((41.89, 12.49)));
        rec.record.attributes.insert(
            AttributeKey::Description,
            AttributeValue::Text("city in Latium".into()),
        );

        let effects = policy().merge(&mut entry, &rec);
        assert!(effects.overrides.is_empty());
        assert_eq!(
            entry.entity.merged_attributes[&AttributeKey::Description]
                .as_text()
                .unwrap(),
            "caput mundi"
        );
        assert_eq!(entry.entity.provenance.len(), 2);
    }

    #[test]
    fn test_higher_priority_overrides_and_records_it() {
        let mut entry = entry_from(SourceName::ToposText, "tt9", "Roma", Some((41.8, 12.4)));
        entry.entity.merged_attributes.insert(
            AttributeKey::PeakPopulation,
            AttributeValue::Int(500_000),
        );
        entry
            .field_sources
            .insert(AttributeKey::PeakPopulation, SourceName::ToposText);

        let mut rec = prepared_record(SourceName::Pleiades, "423025", "Roma", Some((41.9, 12.5)));
        rec.record
            .attributes
            .insert(AttributeKey::PeakPopulation, AttributeValue::Int(1_000_000));

        let effects = policy().merge(&mut entry, &rec);
        assert_eq!(effects.overrides.len(), 2); // coordinates + peak_population
        assert_eq!(
            entry.entity.merged_attributes[&AttributeKey::PeakPopulation].as_int(),
            Some(1_000_000)
        );
        assert_eq!(entry.entity.latitude, Some(41.9));
        assert_eq!(entry.entity.overrides.len(), 2);
    }

    #[test]
    fn test_name_union_and_primary_selection() {
        let mut entry = entry_from(SourceName::Orbis, "5", "Rome", Some((41.89, 12.49)));
        let rec = prepared_record(SourceName::Pleiades, "423025", "Roma", Some((41.9, 12.5)));

        let effects = policy().merge(&mut entry, &rec);
        assert_eq!(effects.new_names, vec!["roma".to_string()]);
        // Pleiades outranks Orbis, so its variant surfaces as primary.
        assert_eq!(entry.entity.primary_name(), Some("Roma"));
        assert_eq!(entry.entity.names.len(), 2);
    }

    #[test]
    fn test_confidence_conservative() {
        let mut entry = entry_from(SourceName::Pleiades, "1", "Roma", Some((41.9, 12.5)));
        entry.entity.confidence = Some(roma_core::types::Confidence::Certain);

        let mut rec = prepared_record(SourceName::Orbis, "5", "Roma", Some((41.9, 12.5)));
        rec.record.confidence = Some(roma_core::types::Confidence::Probable);

        policy().merge(&mut entry, &rec);
        assert_eq!(
            entry.entity.confidence,
            Some(roma_core::types::Confidence::Probable)
        );
    }

    #[test]
    fn test_same_source_twice_averages_coordinates() {
        let mut entry = entry_from(SourceName::Pleiades, "1", "Roma", Some((41.0, 12.0)));
        let rec = prepared_record(SourceName::Pleiades, "2", "Roma", Some((42.0, 13.0)));

        policy().merge(&mut entry, &rec);
        assert_eq!(entry.entity.latitude, Some(41.5));
        assert_eq!(entry.entity.longitude, Some(12.5));
    }
}
