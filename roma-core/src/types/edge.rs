//! Raw travel edges, prior to endpoint resolution.

use serde::{Deserialize, Serialize};

use super::record::SourceName;

/// How an edge is traversed. Water routes get ship travel times and the
/// seasonal flag (mare clausum closes sea lanes in winter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteType {
    Road,
    Sea,
    River,
    Coastal,
}

impl RouteType {
    pub fn is_water(&self) -> bool {
        matches!(self, RouteType::Sea | RouteType::River | RouteType::Coastal)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RouteType::Road => "road",
            RouteType::Sea => "sea",
            RouteType::River => "river",
            RouteType::Coastal => "coastal",
        }
    }
}

/// A travel-network edge as delivered by a source, with endpoint references
/// still in the source's own vocabulary (names or source-scoped ids).
///
/// Lifecycle: created by the adapter layer, resolved against the canonical
/// location set by the network builder, then either promoted to a
/// `TravelEdgeRow` or dropped with a diagnostic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTravelEdge {
    /// Source-scoped edge identifier.
    pub edge_id: String,
    pub data_source: SourceName,
    /// Endpoint references as the source spells them.
    pub source_ref: String,
    pub target_ref: String,
    /// Optional endpoint coordinates, used to confirm fuzzy name matches.
    pub source_coords: Option<(f64, f64)>,
    pub target_coords: Option<(f64, f64)>,
    pub distance_km: f64,
    /// Per-mode travel days as supplied; missing modes are derived from the
    /// standard speed table when the distance is known.
    pub travel_days: Option<f64>,
    pub cost_denarii_per_kg: Option<f64>,
    pub route_type: RouteType,
}
