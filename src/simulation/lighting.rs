//! Incremental lighting engine
//!
//! Invalidation is two-phase: callers queue lights for reset/propagation while
//! entities change, then [`Lighting::update_queued`] drains both queues. Every
//! queued reset completes before any propagation starts, so a light is never
//! recomputed against chunk state that still holds another light's stale
//! contribution.

use std::collections::{BTreeSet, HashMap, HashSet};

use glam::IVec2;

use super::flood_fill::FloodFill;
use super::light::{Contribution, Light, LightEmitter};
use super::path_traced::PathTraced;
use crate::config::{LightAlgorithm, LightingConfig};
use crate::entity::{Entity, EntityId};
use crate::world::{Chunk, ChunkMap};

/// Read-only view of the level a strategy propagates through
pub struct LightField<'a> {
    chunks: &'a ChunkMap,
}

impl<'a> LightField<'a> {
    pub fn new(chunks: &'a ChunkMap) -> Self {
        Self { chunks }
    }

    /// Whether an occluder stands on the tile
    #[inline]
    pub fn is_blocked(&self, pos: IVec2) -> bool {
        self.chunks.is_blocked(pos)
    }

    /// Light accumulated at the tile by already-committed sources
    #[inline]
    pub fn light_at(&self, pos: IVec2) -> Light {
        self.chunks.light_at(pos)
    }
}

/// A light propagation algorithm.
///
/// `propagate` computes a source's full contribution without touching chunk
/// state; the engine commits it. `reset` subtracts a previously committed
/// contribution exactly.
pub trait LightStrategy {
    fn name(&self) -> &'static str;

    fn propagate(&self, origin: IVec2, emitter: &LightEmitter, field: &LightField<'_>)
        -> Contribution;

    fn reset(&self, source: EntityId, contribution: &Contribution, chunks: &mut ChunkMap) {
        let layout = chunks.layout();
        let mut touched = HashSet::new();
        for (&pos, &light) in contribution.tiles.iter() {
            let coord = layout.level_to_chunk(pos);
            if let Some(chunk) = chunks.get_mut(coord) {
                chunk.sub_light(pos, light);
                touched.insert(coord);
            }
        }
        for coord in touched {
            if let Some(chunk) = chunks.get_mut(coord) {
                chunk.remove_lit_by(source);
            }
        }
        for &pos in &contribution.blocked {
            if let Some(chunk) = chunks.chunk_at_mut(pos) {
                chunk.unmark_blocking_light_at(pos, source);
            }
        }
    }
}

/// Work done by one [`Lighting::update_queued`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LightingStats {
    pub reset: usize,
    pub propagated: usize,
}

/// Lighting state of a level: strategy, contribution records and work queues
pub struct Lighting {
    enabled: bool,
    strategy: Box<dyn LightStrategy>,
    /// Contribution currently committed by each light
    records: HashMap<EntityId, Contribution>,
    reset_queue: BTreeSet<EntityId>,
    propagate_queue: BTreeSet<EntityId>,
}

impl Lighting {
    pub fn new(config: &LightingConfig) -> Self {
        let strategy: Box<dyn LightStrategy> = match config.algorithm {
            LightAlgorithm::FloodFill => Box::new(FloodFill),
            LightAlgorithm::PathTraced => Box::new(PathTraced::new(config.max_indirect)),
        };
        Self::with_strategy(config.enabled, strategy)
    }

    pub fn with_strategy(enabled: bool, strategy: Box<dyn LightStrategy>) -> Self {
        Self {
            enabled,
            strategy,
            records: HashMap::new(),
            reset_queue: BTreeSet::new(),
            propagate_queue: BTreeSet::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Contribution currently committed by a light
    pub fn contribution(&self, id: EntityId) -> Option<&Contribution> {
        self.records.get(&id)
    }

    /// Whether any work is waiting for `update_queued`
    pub fn has_pending(&self) -> bool {
        !self.reset_queue.is_empty() || !self.propagate_queue.is_empty()
    }

    /// Queue subtraction of a light's committed contribution
    pub fn queue_reset(&mut self, id: EntityId) {
        if self.enabled && self.records.contains_key(&id) {
            self.reset_queue.insert(id);
        }
    }

    /// Queue recomputation of an emitting entity (resetting it first if it has a record)
    pub fn queue_propagate(&mut self, entity: &Entity) {
        if !self.enabled || !entity.emits_light() {
            return;
        }
        self.queue_reset(entity.id());
        self.propagate_queue.insert(entity.id());
    }

    /// Queue reset+propagate for a light known only by id
    fn queue_relight(&mut self, id: EntityId) {
        self.queue_reset(id);
        self.propagate_queue.insert(id);
    }

    /// Relight every source recorded against a chunk (it gained an occluder)
    pub fn queue_lit_by(&mut self, chunk: &Chunk) {
        if !self.enabled {
            return;
        }
        for id in chunk.lit_by() {
            self.queue_relight(id);
        }
    }

    /// Relight every source stopped at a tile (its occluder left)
    pub fn queue_blocked_by(&mut self, chunks: &ChunkMap, pos: IVec2) {
        if !self.enabled {
            return;
        }
        if let Some(chunk) = chunks.chunk_at(pos) {
            for id in chunk.lights_blocked_at(pos) {
                self.queue_relight(id);
            }
        }
    }

    /// Drain both queues: all resets, then all propagations
    pub fn update_queued(
        &mut self,
        chunks: &mut ChunkMap,
        entities: &HashMap<EntityId, Entity>,
    ) -> LightingStats {
        let mut stats = LightingStats::default();
        if !self.enabled || !self.has_pending() {
            return stats;
        }
        let resets = std::mem::take(&mut self.reset_queue);
        let propagations = std::mem::take(&mut self.propagate_queue);

        for id in resets {
            if let Some(record) = self.records.remove(&id) {
                self.strategy.reset(id, &record, chunks);
                stats.reset += 1;
            }
        }

        for id in propagations {
            let Some(entity) = entities.get(&id) else {
                continue;
            };
            let Some(emitter) = entity.emitter().filter(|e| e.is_active()).copied() else {
                continue;
            };
            debug_assert!(
                !self.records.contains_key(&id),
                "{id} propagated without a reset"
            );
            let contribution =
                self.strategy
                    .propagate(entity.position(), &emitter, &LightField::new(chunks));
            commit(id, &contribution, chunks);
            self.records.insert(id, contribution);
            stats.propagated += 1;
        }

        if stats.reset > 0 || stats.propagated > 0 {
            log::debug!(
                "{} lighting: reset {} lights, propagated {}",
                self.strategy.name(),
                stats.reset,
                stats.propagated
            );
        }
        stats
    }
}

/// Add a freshly computed contribution to the chunk grids
fn commit(source: EntityId, contribution: &Contribution, chunks: &mut ChunkMap) {
    for (&pos, &light) in contribution.tiles.iter() {
        let chunk = chunks.chunk_at_or_create(pos);
        chunk.add_light(pos, light);
        chunk.add_lit_by(source);
    }
    for &pos in &contribution.blocked {
        chunks.chunk_at_or_create(pos).mark_blocking_light_at(pos, source);
    }
}
