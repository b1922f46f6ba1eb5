//! Travel-network assembly.
//!
//! Raw edges arrive with endpoint references in their source's vocabulary.
//! Each endpoint is resolved against the canonical location set: exact
//! normalized name first, then fuzzy name match above threshold, confirmed
//! spatially when the edge carries endpoint coordinates. An edge with
//! either endpoint unresolved is dropped with a diagnostic, never
//! fabricated with a partial identifier. Distances and supplied travel
//! times pass through unmodified; missing per-mode times are derived from
//! the standard speed table.

use petgraph::algo::connected_components;
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{info, warn};

use roma_core::config::NetworkConfig;
use roma_core::constants::{
    SPEED_CART_KM_PER_DAY, SPEED_FOOT_KM_PER_DAY, SPEED_HORSE_KM_PER_DAY,
    SPEED_SHIP_KM_PER_DAY,
};
use roma_core::diagnostics::{Diagnostic, DiagnosticKind, RunReport};
use roma_core::errors::NetworkError;
use roma_core::types::{LocationRow, RawTravelEdge, RouteType, TravelEdgeRow};

use crate::names::{normalize_name, NameMatcher};
use crate::resolver::SealedEntities;

/// Size and connectivity of the assembled network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkStats {
    pub nodes: usize,
    pub edges: usize,
    /// Weakly connected components.
    pub components: usize,
}

/// The assembled travel network: relational rows plus the graph view.
pub struct TravelNetwork {
    pub rows: Vec<TravelEdgeRow>,
    /// Nodes carry location row ids; edge weights are distances in km.
    pub graph: DiGraph<String, f64>,
    pub stats: NetworkStats,
}

pub struct TravelNetworkBuilder {
    config: NetworkConfig,
    names: NameMatcher,
}

impl TravelNetworkBuilder {
    pub fn new(config: &NetworkConfig) -> Self {
        Self {
            config: config.clone(),
            names: NameMatcher::new(),
        }
    }

    /// Resolve every edge against the location table and build the network.
    pub fn build(
        &self,
        sealed: &SealedEntities,
        locations: &[LocationRow],
        edges: Vec<RawTravelEdge>,
        report: &mut RunReport,
    ) -> Result<TravelNetwork, NetworkError> {
        let emitted: FxHashSet<&str> = locations.iter().map(|l| l.id.as_str()).collect();

        let mut rows: Vec<TravelEdgeRow> = Vec::new();
        let mut seen: FxHashSet<String> = FxHashSet::default();
        for edge in edges {
            let row_id = format!("{}_{}", edge.data_source, edge.edge_id);
            if !seen.insert(row_id.clone()) {
                report.push(Diagnostic::new(
                    DiagnosticKind::MalformedRecord,
                    Some(edge.data_source),
                    edge.edge_id.clone(),
                    format!("duplicate edge id {row_id}; edge skipped"),
                ));
                continue;
            }

            let source_id =
                self.resolve_endpoint(sealed, &emitted, &edge.source_ref, edge.source_coords);
            let target_id =
                self.resolve_endpoint(sealed, &emitted, &edge.target_ref, edge.target_coords);

            let (source_id, target_id) = match (source_id, target_id) {
                (Some(s), Some(t)) => (s, t),
                (s, _) => {
                    let unresolved = if s.is_none() {
                        &edge.source_ref
                    } else {
                        &edge.target_ref
                    };
                    warn!(
                        edge = %row_id,
                        endpoint = %unresolved,
                        "edge endpoint unresolved; edge dropped"
                    );
                    report.push(Diagnostic::new(
                        DiagnosticKind::UnresolvedReference,
                        Some(edge.data_source),
                        edge.edge_id.clone(),
                        format!("endpoint '{unresolved}' matches no resolved location"),
                    ));
                    report.push(Diagnostic::new(
                        DiagnosticKind::DroppedEdge,
                        Some(edge.data_source),
                        edge.edge_id.clone(),
                        "one or both endpoints unresolved",
                    ));
                    continue;
                }
            };

            rows.push(promote(edge, row_id, source_id, target_id));
        }

        // Final referential check: a promoted row pointing outside the
        // location table is a logic defect, not bad input.
        for row in &rows {
            if !emitted.contains(row.source_location_id.as_str())
                || !emitted.contains(row.target_location_id.as_str())
            {
                return Err(NetworkError::IntegrityViolation(format!(
                    "edge {} references a location outside the assembled table",
                    row.id
                )));
            }
        }

        let graph = build_graph(&rows);
        let stats = NetworkStats {
            nodes: graph.node_count(),
            edges: graph.edge_count(),
            components: connected_components(&graph),
        };
        report.edges_promoted += rows.len();
        info!(
            nodes = stats.nodes,
            edges = stats.edges,
            components = stats.components,
            "travel network assembled"
        );

        Ok(TravelNetwork { rows, graph, stats })
    }

    /// Resolve one endpoint reference to a location row id.
    fn resolve_endpoint(
        &self,
        sealed: &SealedEntities,
        emitted: &FxHashSet<&str>,
        reference: &str,
        coords: Option<(f64, f64)>,
    ) -> Option<String> {
        // A literal row id needs no matching.
        if emitted.contains(reference) {
            return Some(reference.to_string());
        }

        // Exact normalized name.
        let norm = normalize_name(reference);
        if norm.is_empty() {
            return None;
        }
        for id in sealed.ids_for_name(&norm) {
            let row_id = id.to_string();
            if emitted.contains(row_id.as_str()) {
                return Some(row_id);
            }
        }

        // With coordinates: fuzzy name match among spatial neighbours.
        if let Some((lat, lon)) = coords {
            let mut best: Option<(String, f64, f64)> = None;
            for (id, dist) in sealed.query_near(lat, lon, self.config.spatial_confirm_km) {
                let Some(entity) = sealed.get(id) else { continue };
                let row_id = id.to_string();
                if !emitted.contains(row_id.as_str()) {
                    continue;
                }
                for variant in &entity.names {
                    let score = self
                        .names
                        .similarity_normalized(&norm, &normalize_name(&variant.text));
                    if score < self.config.name_threshold {
                        continue;
                    }
                    let better = match &best {
                        None => true,
                        Some((_, bs, bd)) => {
                            score > *bs || (score == *bs && dist < *bd)
                        }
                    };
                    if better {
                        best = Some((row_id.clone(), score, dist));
                    }
                }
            }
            return best.map(|(id, _, _)| id);
        }

        // Without coordinates: fuzzy scan over the (lexically ordered)
        // canonical name set.
        let mut best: Option<(String, f64)> = None;
        for (name, ids) in sealed.names() {
            let score = self.names.similarity_normalized(&norm, name);
            if score < self.config.name_threshold {
                continue;
            }
            let candidate = ids
                .iter()
                .map(|id| id.to_string())
                .find(|row_id| emitted.contains(row_id.as_str()));
            let Some(row_id) = candidate else { continue };
            if best.as_ref().map_or(true, |(_, bs)| score > *bs) {
                best = Some((row_id, score));
            }
        }
        best.map(|(id, _)| id)
    }
}

/// Turn a resolved edge into its relational row, deriving per-mode travel
/// days where the source supplied only a distance.
fn promote(
    edge: RawTravelEdge,
    row_id: String,
    source_location_id: String,
    target_location_id: String,
) -> TravelEdgeRow {
    let d = edge.distance_km;
    let (foot, horse, cart) = if d > 0.0 {
        (
            Some(d / SPEED_FOOT_KM_PER_DAY),
            Some(d / SPEED_HORSE_KM_PER_DAY),
            Some(d / SPEED_CART_KM_PER_DAY),
        )
    } else {
        (edge.travel_days, edge.travel_days, edge.travel_days)
    };
    let ship = if edge.route_type.is_water() {
        edge.travel_days
            .or_else(|| (d > 0.0).then(|| d / SPEED_SHIP_KM_PER_DAY))
    } else {
        None
    };

    TravelEdgeRow {
        id: row_id,
        source_location_id,
        target_location_id,
        source_name: edge.source_ref,
        target_name: edge.target_ref,
        distance_km: edge.distance_km,
        travel_days_foot: foot,
        travel_days_horse: horse,
        travel_days_cart: cart,
        travel_days_ship: ship,
        cost_denarii_per_kg: edge.cost_denarii_per_kg,
        seasonal: edge.route_type == RouteType::Sea,
        data_source: edge.data_source.to_string(),
    }
}

fn build_graph(rows: &[TravelEdgeRow]) -> DiGraph<String, f64> {
    let mut graph: DiGraph<String, f64> = DiGraph::new();
    let mut nodes: FxHashMap<&str, NodeIndex> = FxHashMap::default();
    for row in rows {
        let src = *nodes
            .entry(row.source_location_id.as_str())
            .or_insert_with(|| graph.add_node(row.source_location_id.clone()));
        let tgt = *nodes
            .entry(row.target_location_id.as_str())
            .or_insert_with(|| graph.add_node(row.target_location_id.clone()));
        graph.add_edge(src, tgt, row.distance_km);
    }
    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use roma_core::config::{PriorityTable, ResolveConfig};
    use roma_core::types::{NameVariant, NormalizedRecord, RecordType, SourceName};
    use smallvec::smallvec;

    use crate::assemble::SchemaAssembler;
    use crate::resolver::EntityResolver;
    use roma_core::config::AssemblyConfig;

    fn location(source_id: &str, name: &str, lat: f64, lon: f64) -> NormalizedRecord {
        let mut rec = NormalizedRecord::new(SourceName::Orbis, source_id, RecordType::Location);
        rec.names = smallvec![NameVariant::new(name)];
        rec.latitude = Some(lat);
        rec.longitude = Some(lon);
        rec
    }

    fn edge(id: &str, source_ref: &str, target_ref: &str, km: f64) -> RawTravelEdge {
        RawTravelEdge {
            edge_id: id.to_string(),
            data_source: SourceName::Orbis,
            source_ref: source_ref.to_string(),
            target_ref: target_ref.to_string(),
            source_coords: None,
            target_coords: None,
            distance_km: km,
            travel_days: None,
            cost_denarii_per_kg: None,
            route_type: RouteType::Road,
        }
    }

    fn fixture() -> (crate::resolver::SealedEntities, Vec<LocationRow>, RunReport) {
        let mut resolver =
            EntityResolver::new(&ResolveConfig::default(), PriorityTable::default());
        resolver
            .ingest_source(
                SourceName::Orbis,
                vec![
                    location("1", "Roma", 41.9, 12.5),
                    location("2", "Ostia", 41.75, 12.29),
                ],
            )
            .unwrap();
        let (sealed, mut report) = resolver.seal().unwrap();
        let tables = SchemaAssembler::new(&AssemblyConfig::default())
            .assemble(&sealed, &[], &mut report)
            .unwrap();
        (sealed, tables.locations, report)
    }

    #[test]
    fn test_edge_promoted_with_derived_days() {
        let (sealed, locations, mut report) = fixture();
        let builder = TravelNetworkBuilder::new(&NetworkConfig::default());
        let network = builder
            .build(&sealed, &locations, vec![edge("e0", "Roma", "Ostia", 30.0)], &mut report)
            .unwrap();

        assert_eq!(network.rows.len(), 1);
        let row = &network.rows[0];
        assert_eq!(row.travel_days_foot, Some(1.0));
        assert_eq!(row.travel_days_cart, Some(1.5));
        assert_eq!(row.travel_days_ship, None);
        assert!(!row.seasonal);
        assert_eq!(network.stats.nodes, 2);
        assert_eq!(network.stats.components, 1);
    }

    #[test]
    fn test_unresolved_endpoint_drops_edge() {
        let (sealed, locations, mut report) = fixture();
        let builder = TravelNetworkBuilder::new(&NetworkConfig::default());
        let network = builder
            .build(
                &sealed,
                &locations,
                vec![edge("e1", "Roma", "Carthago", 600.0)],
                &mut report,
            )
            .unwrap();

        assert!(network.rows.is_empty());
        assert_eq!(report.edges_dropped, 1);
        assert_eq!(report.count_of(DiagnosticKind::UnresolvedReference), 1);
    }

    #[test]
    fn test_fuzzy_endpoint_resolves_transliteration() {
        let (sealed, locations, mut report) = fixture();
        let builder = TravelNetworkBuilder::new(&NetworkConfig::default());
        // "Rome" is not an exact canonical name but clears the threshold.
        let network = builder
            .build(&sealed, &locations, vec![edge("e2", "Rome", "Ostia", 30.0)], &mut report)
            .unwrap();
        assert_eq!(network.rows.len(), 1);
    }

    #[test]
    fn test_sea_route_gets_ship_days_and_seasonal_flag() {
        let (sealed, locations, mut report) = fixture();
        let builder = TravelNetworkBuilder::new(&NetworkConfig::default());
        let mut sea = edge("e3", "Roma", "Ostia", 200.0);
        sea.route_type = RouteType::Sea;
        let network = builder
            .build(&sealed, &locations, vec![sea], &mut report)
            .unwrap();
        let row = &network.rows[0];
        assert_eq!(row.travel_days_ship, Some(2.0));
        assert!(row.seasonal);
    }
}
