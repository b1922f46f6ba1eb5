//! The match decision: does this record describe an entity we already have?
//!
//! Located records are matched against spatial candidates within a radius,
//! scored by the best pairwise name similarity across all variants.
//! Unlocated records fall back to exact normalized-name equality only: a
//! fuzzy name match without location support is how false merges happen,
//! and a false merge is worse than a missed one.

use roma_core::types::EntityId;

use crate::names::NameMatcher;
use crate::resolver::{EntityArena, PreparedRecord};
use crate::spatial::SpatialIndex;

/// Outcome of a match attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchOutcome {
    /// Matched an existing entity.
    Matched {
        id: EntityId,
        score: f64,
        /// Set when an equally-scored competitor existed and the winner was
        /// chosen by tie-break.
        ambiguous: bool,
    },
    /// Nothing cleared the threshold; the record seeds a new entity.
    NoMatch,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    id: EntityId,
    score: f64,
    distance_km: f64,
    seq: usize,
}

/// Combines spatial and name evidence into a deterministic match decision.
pub struct EntityMatcher {
    radius_km: f64,
    threshold: f64,
    names: NameMatcher,
}

impl EntityMatcher {
    pub fn new(radius_km: f64, threshold: f64) -> Self {
        Self {
            radius_km,
            threshold,
            names: NameMatcher::new(),
        }
    }

    /// Find the best existing entity for a record, if any.
    pub fn find_match(
        &self,
        prepared: &PreparedRecord,
        arena: &EntityArena,
        spatial: &SpatialIndex,
    ) -> MatchOutcome {
        if prepared.norm_names.is_empty() {
            return MatchOutcome::NoMatch;
        }
        if prepared.record.has_valid_coords() {
            self.match_located(prepared, arena, spatial)
        } else {
            self.match_by_exact_name(prepared, arena)
        }
    }

    fn match_located(
        &self,
        prepared: &PreparedRecord,
        arena: &EntityArena,
        spatial: &SpatialIndex,
    ) -> MatchOutcome {
        let lat = prepared.record.latitude.unwrap_or_default();
        let lon = prepared.record.longitude.unwrap_or_default();

        let mut candidates: Vec<Candidate> = Vec::new();
        for (id, distance_km) in spatial.query_near(lat, lon, self.radius_km) {
            let Some(entry) = arena.get(id) else { continue };
            let score = self.best_pairwise(&prepared.norm_names, &entry.norm_names);
            if score >= self.threshold {
                candidates.push(Candidate {
                    id,
                    score,
                    distance_km,
                    seq: entry.seq,
                });
            }
        }

        if candidates.is_empty() {
            return MatchOutcome::NoMatch;
        }

        // Deterministic order: score desc, distance asc, earliest ingested.
        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    a.distance_km
                        .partial_cmp(&b.distance_km)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| a.seq.cmp(&b.seq))
        });

        let winner = candidates[0];
        let ambiguous = candidates.len() > 1 && candidates[1].score == winner.score;
        MatchOutcome::Matched {
            id: winner.id,
            score: winner.score,
            ambiguous,
        }
    }

    /// Unlocated fallback: exact normalized-name equality only.
    fn match_by_exact_name(&self, prepared: &PreparedRecord, arena: &EntityArena) -> MatchOutcome {
        let mut hits: Vec<(usize, EntityId)> = Vec::new();
        for name in &prepared.norm_names {
            for &id in arena.ids_for_name(name) {
                if let Some(entry) = arena.get(id) {
                    if !hits.iter().any(|(_, h)| *h == id) {
                        hits.push((entry.seq, id));
                    }
                }
            }
        }
        if hits.is_empty() {
            return MatchOutcome::NoMatch;
        }
        hits.sort();
        MatchOutcome::Matched {
            id: hits[0].1,
            score: 1.0,
            ambiguous: hits.len() > 1,
        }
    }

    fn best_pairwise(&self, a: &[String], b: &[String]) -> f64 {
        let mut best = 0.0_f64;
        for x in a {
            for y in b {
                let s = self.names.similarity_normalized(x, y);
                if s > best {
                    best = s;
                }
            }
        }
        best
    }
}
