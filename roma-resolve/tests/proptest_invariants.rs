//! Property-based tests for the resolution invariants.
//!
//! Uses proptest to fuzz-verify:
//!   - Name similarity bounds and symmetry
//!   - No fuzzy merge without location support
//!   - Provenance union growth under repeated merging
//!   - Referential integrity of the promoted travel network
//!   - Idempotent entity-id assignment across reruns

use proptest::prelude::*;
use smallvec::smallvec;

use roma_core::config::{PriorityTable, ResolveConfig, RomaConfig};
use roma_core::types::{
    NameVariant, NormalizedRecord, RawTravelEdge, RecordType, RouteType, SourceName,
};
use roma_resolve::{normalize_name, EntityResolver, NameMatcher, Pipeline, SourceBatch};

fn location(
    source: SourceName,
    id: String,
    name: &str,
    coords: Option<(f64, f64)>,
) -> NormalizedRecord {
    let mut rec = NormalizedRecord::new(source, id, RecordType::Location);
    rec.names = smallvec![NameVariant::new(name)];
    if let Some((lat, lon)) = coords {
        rec.latitude = Some(lat);
        rec.longitude = Some(lon);
    }
    rec
}

proptest! {
    /// Similarity is always in [0, 1] and symmetric, for any input pair.
    #[test]
    fn prop_similarity_bounded_and_symmetric(a in "\\PC{0,32}", b in "\\PC{0,32}") {
        let m = NameMatcher::new();
        let ab = m.similarity(&a, &b);
        let ba = m.similarity(&b, &a);
        prop_assert!((0.0..=1.0).contains(&ab), "out of bounds: {}", ab);
        prop_assert!((ab - ba).abs() < 1e-12, "asymmetric: {} vs {}", ab, ba);
    }

    /// Two unlocated records whose names differ after normalization never
    /// merge, however similar the spellings are.
    #[test]
    fn prop_no_unlocated_fuzzy_merge(a in "[A-Za-z]{3,12}", b in "[A-Za-z]{3,12}") {
        let na = normalize_name(&a);
        let nb = normalize_name(&b);
        prop_assume!(!na.is_empty() && !nb.is_empty() && na != nb);

        let mut resolver =
            EntityResolver::new(&ResolveConfig::default(), PriorityTable::default());
        resolver
            .ingest_source(
                SourceName::Wikidata,
                vec![
                    location(SourceName::Wikidata, "p1".to_string(), &a, None),
                    location(SourceName::Wikidata, "p2".to_string(), &b, None),
                ],
            )
            .unwrap();
        prop_assert_eq!(resolver.entity_count(), 2);
    }

    /// Records describing the same place accumulate provenance one entry
    /// per record, and linkage never depends on how many there were.
    #[test]
    fn prop_provenance_union_grows(k in 1usize..6) {
        let mut resolver =
            EntityResolver::new(&ResolveConfig::default(), PriorityTable::default());
        let records = (0..k)
            .map(|i| {
                location(
                    SourceName::Wikidata,
                    format!("w{i}"),
                    "Roma",
                    Some((41.9, 12.5)),
                )
            })
            .collect();
        resolver.ingest_source(SourceName::Wikidata, records).unwrap();

        prop_assert_eq!(resolver.entity_count(), 1);
        let (sealed, _) = resolver.seal().unwrap();
        prop_assert_eq!(sealed.entities()[0].provenance.len(), k);
    }

    /// Every promoted travel edge references locations that exist; edges
    /// referencing unknown places are dropped, not half-linked.
    #[test]
    fn prop_travel_network_integrity(
        targets in prop::collection::vec("[a-z]{4,10}", 1..8),
    ) {
        let known = ["roma", "ostia", "capua"];
        let mut batch = SourceBatch::new(SourceName::Orbis);
        batch.records = known
            .iter()
            .enumerate()
            .map(|(i, name)| {
                location(
                    SourceName::Orbis,
                    i.to_string(),
                    name,
                    Some((40.0 + i as f64, 12.0 + i as f64)),
                )
            })
            .collect();
        batch.edges = targets
            .iter()
            .enumerate()
            .map(|(i, target)| RawTravelEdge {
                edge_id: format!("e{i}"),
                data_source: SourceName::Orbis,
                source_ref: "roma".to_string(),
                target_ref: target.clone(),
                source_coords: None,
                target_coords: None,
                distance_km: 100.0,
                travel_days: None,
                cost_denarii_per_kg: None,
                route_type: RouteType::Road,
            })
            .collect();

        let output = Pipeline::new(RomaConfig::default()).run(vec![batch]).unwrap();

        let ids: std::collections::HashSet<&str> = output
            .tables
            .locations
            .iter()
            .map(|l| l.id.as_str())
            .collect();
        for row in &output.tables.travel_network {
            prop_assert!(ids.contains(row.source_location_id.as_str()));
            prop_assert!(ids.contains(row.target_location_id.as_str()));
        }
        prop_assert_eq!(
            output.tables.travel_network.len() + output.report.edges_dropped,
            targets.len()
        );
    }

    /// Resolution is idempotent: the same input yields the same entity ids
    /// and field values, run after run.
    #[test]
    fn prop_idempotent_reruns(
        places in prop::collection::vec(("[a-z]{4,10}", -60.0f64..60.0, -120.0f64..120.0), 1..10),
    ) {
        let build = || {
            let mut batch = SourceBatch::new(SourceName::Pleiades);
            batch.records = places
                .iter()
                .enumerate()
                .map(|(i, (name, lat, lon))| {
                    location(SourceName::Pleiades, i.to_string(), name, Some((*lat, *lon)))
                })
                .collect();
            vec![batch]
        };

        let pipeline = Pipeline::new(RomaConfig::default());
        let first = pipeline.run(build()).unwrap();
        let second = pipeline.run(build()).unwrap();

        let ids = |o: &roma_resolve::RunOutput| {
            o.tables.locations.iter().map(|l| l.id.clone()).collect::<Vec<_>>()
        };
        prop_assert_eq!(ids(&first), ids(&second));
        prop_assert_eq!(
            serde_json::to_value(&first.tables).unwrap(),
            serde_json::to_value(&second.tables).unwrap()
        );
    }
}
