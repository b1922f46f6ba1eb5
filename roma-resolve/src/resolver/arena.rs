//! The resolver-owned entity arena.
//!
//! All canonical entities live here, keyed by id, in ingestion order. The
//! arena is the single shared mutable resource of the run; only the
//! resolver writes to it.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use roma_core::errors::ResolveError;
use roma_core::types::{
    AttributeKey, CanonicalEntity, EntityId, NormalizedRecord, SourceName,
};

/// A record with its name variants pre-normalized. Normalization is the
/// expensive string work, so it happens once, in parallel, before the
/// serial resolve loop.
#[derive(Debug, Clone)]
pub struct PreparedRecord {
    pub record: NormalizedRecord,
    /// Normalized forms of `record.names`, deduplicated, empty forms dropped.
    pub norm_names: SmallVec<[String; 4]>,
}

/// One arena slot: the entity plus the merge bookkeeping that never leaves
/// the resolver.
#[derive(Debug, Clone)]
pub struct ArenaEntry {
    pub entity: CanonicalEntity,
    /// Normalized forms of every name variant on the entity.
    pub norm_names: SmallVec<[String; 4]>,
    /// Ingestion sequence number; the final matcher tie-break.
    pub seq: usize,
    /// Source currently owning the coordinates.
    pub coord_source: Option<SourceName>,
    /// Source currently owning the primary display name.
    pub primary_source: SourceName,
    /// First-writer source per merged attribute.
    pub field_sources: BTreeMap<AttributeKey, SourceName>,
}

/// Insertion-ordered arena keyed by entity id.
#[derive(Debug, Default)]
pub struct EntityArena {
    entries: Vec<ArenaEntry>,
    id_index: FxHashMap<EntityId, usize>,
    /// Normalized name -> entity ids carrying it. B-tree keeps iteration
    /// deterministic for the name-only fallback path.
    name_index: BTreeMap<String, SmallVec<[EntityId; 4]>>,
}

impl EntityArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a freshly seeded entity. Duplicate id assignment is a logic
    /// defect and aborts the run.
    pub fn insert(&mut self, entry: ArenaEntry) -> Result<(), ResolveError> {
        let id = entry.entity.entity_id;
        if self.id_index.contains_key(&id) {
            return Err(ResolveError::IntegrityViolation(format!(
                "duplicate entity id {id}"
            )));
        }
        for name in &entry.norm_names {
            self.register_name(name.clone(), id);
        }
        self.id_index.insert(id, self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    pub fn get(&self, id: EntityId) -> Option<&ArenaEntry> {
        self.id_index.get(&id).map(|&i| &self.entries[i])
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut ArenaEntry> {
        let i = *self.id_index.get(&id)?;
        Some(&mut self.entries[i])
    }

    /// Register an additional normalized name for an existing entity.
    pub fn register_name(&mut self, norm: String, id: EntityId) {
        let ids = self.name_index.entry(norm).or_default();
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    /// Entity ids carrying the exact normalized name.
    pub fn ids_for_name(&self, norm: &str) -> &[EntityId] {
        self.name_index.get(norm).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ArenaEntry> {
        self.entries.iter()
    }

    /// Consume the arena, yielding entities in ingestion order plus the
    /// name index for downstream lookups.
    pub fn into_parts(
        self,
    ) -> (
        Vec<CanonicalEntity>,
        BTreeMap<String, SmallVec<[EntityId; 4]>>,
    ) {
        (
            self.entries.into_iter().map(|e| e.entity).collect(),
            self.name_index,
        )
    }
}
