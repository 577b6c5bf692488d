//! Level - owns entities and chunks and drives the update/tick cycle
//!
//! A frame is `update` (reconcile, then update and draw the camera window) and
//! `tick` (advance hot chunks, reconcile, generate queued chunks). Entity
//! changes made between or during frames are collected as dirty flags and
//! reconciled in one pass before lighting is recomputed.

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use glam::IVec2;
use instant::Instant;

use super::{
    Camera, Chunk, ChunkGenerator, ChunkLayout, ChunkMap, DrawEntry, GenerationQueue,
    LevelObserver,
};
use crate::config::LevelConfig;
use crate::entity::{DirtyFlags, Entity, EntityId, TickContext};
use crate::error::{ConfigError, LevelError, TransformError};
use crate::render::{Canvas, ComposedGlyph};
use crate::simulation::{Contribution, Light, LightEmitter, Lighting, LightingStats};

/// Which part of the frame the level is executing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    /// Between frames
    #[default]
    Idle,
    /// Inside `Level::update`; entities may not be added or removed
    Update,
    /// Inside `Level::tick`; the only phase where owned entities may move
    Tick,
}

/// Time information passed to `update`/`tick` and on to behaviours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameTime {
    /// Time since the level started
    pub elapsed: Duration,
    /// Time since the previous frame
    pub delta: Duration,
}

impl FrameTime {
    pub fn new(elapsed: Duration, delta: Duration) -> Self {
        Self { elapsed, delta }
    }

    /// The next frame after `delta`
    pub fn advance(self, delta: Duration) -> Self {
        Self {
            elapsed: self.elapsed + delta,
            delta,
        }
    }

    pub fn delta_secs(&self) -> f32 {
        self.delta.as_secs_f32()
    }
}

/// A chunked tile world with incremental lighting
pub struct Level {
    config: LevelConfig,
    camera: Option<Camera>,
    phase: Phase,

    entities: HashMap<EntityId, Entity>,
    chunks: ChunkMap,
    /// Entities with changes waiting for reconciliation
    dirty: BTreeSet<EntityId>,

    lighting: Lighting,

    generation: GenerationQueue,
    generator: Option<Box<dyn ChunkGenerator>>,
    observers: Vec<Box<dyn LevelObserver>>,
}

impl Level {
    pub fn new(config: LevelConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let layout = ChunkLayout::new(config.chunk_width, config.chunk_height);
        let camera = config.camera.map(|c| Camera::new(c.width, c.height));
        let lighting = Lighting::new(&config.lighting);

        log::info!(
            "Created {} level: {}x{} chunks, {} lighting{}",
            if camera.is_some() { "client" } else { "server" },
            layout.width(),
            layout.height(),
            lighting.strategy_name(),
            if lighting.is_enabled() { "" } else { " (disabled)" }
        );

        Ok(Self {
            config,
            camera,
            phase: Phase::Idle,
            entities: HashMap::new(),
            chunks: ChunkMap::new(layout),
            dirty: BTreeSet::new(),
            lighting,
            generation: GenerationQueue::new(),
            generator: None,
            observers: Vec::new(),
        })
    }

    pub fn with_generator(mut self, generator: impl ChunkGenerator + 'static) -> Self {
        self.generator = Some(Box::new(generator));
        self
    }

    pub fn set_generator(&mut self, generator: Box<dyn ChunkGenerator>) {
        self.generator = Some(generator);
    }

    pub fn add_observer(&mut self, observer: Box<dyn LevelObserver>) {
        self.observers.push(observer);
    }

    pub fn config(&self) -> &LevelConfig {
        &self.config
    }

    pub fn layout(&self) -> ChunkLayout {
        self.chunks.layout()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether this level renders (has a camera)
    pub fn is_client(&self) -> bool {
        self.camera.is_some()
    }

    pub fn lighting(&self) -> &Lighting {
        &self.lighting
    }

    /// Chunks waiting for the generator
    pub fn pending_generation(&self) -> usize {
        self.generation.len()
    }

    fn ensure_not_updating(&self, operation: &'static str) -> Result<(), LevelError> {
        if self.phase == Phase::Update {
            return Err(LevelError::PhaseViolation {
                operation,
                phase: self.phase,
            });
        }
        Ok(())
    }

    fn begin(&mut self, phase: Phase, operation: &'static str) -> Result<(), LevelError> {
        if self.phase != Phase::Idle {
            return Err(LevelError::PhaseViolation {
                operation,
                phase: self.phase,
            });
        }
        self.phase = phase;
        Ok(())
    }

    fn finish(&mut self) {
        for chunk in self.chunks.values_mut() {
            chunk.compact();
        }
        self.enqueue_created();
        self.phase = Phase::Idle;
    }

    fn enqueue_created(&mut self) {
        let created = self.chunks.take_created();
        self.generation.extend(created);
    }

    // ---- membership ------------------------------------------------------

    /// Take ownership of an entity, placing it in its chunk and queueing its light.
    ///
    /// Illegal during `Update`.
    pub fn add(&mut self, mut entity: Entity) -> Result<EntityId, LevelError> {
        self.ensure_not_updating("add")?;
        let id = entity.id();
        if self.entities.contains_key(&id) {
            return Err(LevelError::DuplicateEntity(id));
        }

        let position = entity.position;
        entity.reconciled_position = position;
        entity.dirty = DirtyFlags::empty();
        entity.registered_blocker = None;

        let chunk = self.chunks.chunk_at_or_create(position);
        chunk.add(DrawEntry {
            id,
            layer: entity.layer,
            position,
        });
        if entity.blocks_light {
            chunk.add_occluder(position);
            entity.registered_blocker = Some(position);
            self.lighting.queue_lit_by(chunk);
        }
        self.lighting.queue_propagate(&entity);

        for observer in self.observers.iter_mut() {
            observer.on_entity_added(&entity);
        }
        log::trace!("Added {} at {}", id, position);
        self.entities.insert(id, entity);
        self.enqueue_created();
        Ok(id)
    }

    /// Give up ownership of an entity, resetting its light and relighting
    /// anything it blocked. Unknown ids are ignored.
    ///
    /// Illegal during `Update`.
    pub fn remove(&mut self, id: EntityId) -> Result<Option<Entity>, LevelError> {
        self.ensure_not_updating("remove")?;
        let Some(mut entity) = self.entities.remove(&id) else {
            return Ok(None);
        };

        self.lighting.queue_reset(id);
        if let Some(tile) = entity.registered_blocker.take() {
            if let Some(chunk) = self.chunks.chunk_at_mut(tile) {
                chunk.remove_occluder(tile);
            }
            self.lighting.queue_blocked_by(&self.chunks, tile);
        }
        if let Some(chunk) = self.chunks.chunk_at_mut(entity.reconciled_position) {
            chunk.remove(id);
        }
        self.dirty.remove(&id);
        entity.dirty = DirtyFlags::empty();
        entity.reconciled_position = entity.position;

        for observer in self.observers.iter_mut() {
            observer.on_entity_removed(id);
        }
        log::trace!("Removed {}", id);
        Ok(Some(entity))
    }

    // ---- mutation --------------------------------------------------------

    /// Move an owned entity. Only legal during `Tick`.
    pub fn set_position(&mut self, id: EntityId, position: IVec2) -> Result<(), LevelError> {
        if self.phase != Phase::Tick {
            return Err(LevelError::PhaseViolation {
                operation: "set_position",
                phase: self.phase,
            });
        }
        self.mutate(id, DirtyFlags::POSITION, |entity| {
            if entity.position == position {
                return false;
            }
            entity.position = position;
            true
        })
    }

    /// Change (or clear) an owned entity's light profile
    pub fn set_emitter(
        &mut self,
        id: EntityId,
        emitter: Option<LightEmitter>,
    ) -> Result<(), LevelError> {
        self.mutate(id, DirtyFlags::LIGHT, |entity| {
            if entity.emitter == emitter {
                return false;
            }
            entity.emitter = emitter;
            true
        })
    }

    pub fn set_blocks_light(&mut self, id: EntityId, blocks_light: bool) -> Result<(), LevelError> {
        self.mutate(id, DirtyFlags::LIGHT, |entity| {
            if entity.blocks_light == blocks_light {
                return false;
            }
            entity.blocks_light = blocks_light;
            true
        })
    }

    pub fn set_layer(&mut self, id: EntityId, layer: i32) -> Result<(), LevelError> {
        self.mutate(id, DirtyFlags::LAYER, |entity| {
            if entity.layer == layer {
                return false;
            }
            entity.layer = layer;
            true
        })
    }

    fn mutate(
        &mut self,
        id: EntityId,
        flags: DirtyFlags,
        apply: impl FnOnce(&mut Entity) -> bool,
    ) -> Result<(), LevelError> {
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(LevelError::UnknownEntity(id))?;
        if apply(entity) {
            entity.mark_dirty(flags);
            self.dirty.insert(id);
        }
        Ok(())
    }

    /// Reconcile pending entity changes and recompute queued lights now.
    ///
    /// `update` and `tick` do this on their own; call it to observe lighting
    /// between frames.
    pub fn flush(&mut self) -> Result<LightingStats, LevelError> {
        self.ensure_not_updating("flush")?;
        Ok(self.flush_dirty())
    }

    fn flush_dirty(&mut self) -> LightingStats {
        let dirty = std::mem::take(&mut self.dirty);
        let layout = self.chunks.layout();
        let mut moves = Vec::new();

        for &id in &dirty {
            let Some(entity) = self.entities.get_mut(&id) else {
                continue;
            };
            let flags = std::mem::take(&mut entity.dirty);
            let previous = entity.reconciled_position;
            let position = entity.position;
            let moved = previous != position;

            if moved {
                let (from, to) = (layout.level_to_chunk(previous), layout.level_to_chunk(position));
                if from == to {
                    if let Some(chunk) = self.chunks.get_mut(to) {
                        chunk.set_entry_position(id, position);
                    }
                } else {
                    if let Some(chunk) = self.chunks.get_mut(from) {
                        chunk.remove(id);
                    }
                    self.chunks.get_or_create(to).add(DrawEntry {
                        id,
                        layer: entity.layer,
                        position,
                    });
                }
                entity.reconciled_position = position;
                moves.push((id, previous));
                log::trace!("{} moved {} -> {}", id, previous, position);
            }

            if flags.contains(DirtyFlags::LAYER) {
                if let Some(chunk) = self.chunks.chunk_at_mut(position) {
                    chunk.set_entry_layer(id, entity.layer);
                }
            }

            sync_blocker(&mut self.chunks, &mut self.lighting, entity);

            if moved || flags.contains(DirtyFlags::LIGHT) {
                if entity.emits_light() {
                    self.lighting.queue_propagate(entity);
                } else {
                    self.lighting.queue_reset(id);
                }
            }

            for observer in self.observers.iter_mut() {
                observer.on_entity_changed(entity);
            }
        }

        let stats = self.lighting.update_queued(&mut self.chunks, &self.entities);

        for (id, previous) in moves {
            self.notify_moved(id, previous);
        }
        self.enqueue_created();

        if !dirty.is_empty() {
            log::debug!("Reconciled {} dirty entities", dirty.len());
        }
        stats
    }

    fn notify_moved(&mut self, id: EntityId, previous: IVec2) {
        let Some(entity) = self.entities.get_mut(&id) else {
            return;
        };
        if let Some(mut behavior) = entity.behavior.take() {
            behavior.moved(entity, previous);
            entity.behavior = Some(behavior);
        }
    }

    // ---- frame -----------------------------------------------------------

    /// Reconcile changes, then update and draw every chunk in the camera
    /// window. Server levels update their hot chunks and draw nothing.
    pub fn update(&mut self, time: FrameTime, canvas: &mut dyn Canvas) -> Result<(), LevelError> {
        self.begin(Phase::Update, "update")?;
        self.flush_dirty();

        if let Some(camera) = self.camera {
            let coords = self
                .chunks
                .layout()
                .chunks_in_window(camera.position, camera.size);
            let load_ticks = self.config.load_ticks;
            for &coord in &coords {
                self.chunks.get_or_create(coord).keep_loaded(load_ticks);
                self.update_chunk(coord, time);
            }
            for &coord in &coords {
                self.draw_chunk(coord, &camera, canvas);
            }
        } else {
            for coord in self.chunks.coords_sorted() {
                if self.chunks.get(coord).is_some_and(Chunk::is_loaded) {
                    self.update_chunk(coord, time);
                }
            }
        }

        self.finish();
        Ok(())
    }

    fn update_chunk(&mut self, coord: IVec2, time: FrameTime) {
        let Some(ids) = self.chunks.get(coord).map(Chunk::live_ids) else {
            return;
        };
        for id in ids {
            let Some(entity) = self.entities.get_mut(&id) else {
                continue;
            };
            if let Some(mut behavior) = entity.behavior.take() {
                behavior.update(entity, time);
                entity.behavior = Some(behavior);
            }
        }
    }

    fn draw_chunk(&self, coord: IVec2, camera: &Camera, canvas: &mut dyn Canvas) {
        let Some(chunk) = self.chunks.get(coord) else {
            return;
        };
        let lit = self.lighting.is_enabled();

        for entry in chunk.entries() {
            if !camera.contains(entry.position) {
                continue;
            }
            let Some(entity) = self.entities.get(&entry.id) else {
                continue;
            };
            let light = chunk.light_at(entry.position);
            if lit && !light.is_visible() {
                continue;
            }
            if self.is_covered(chunk, entry) {
                continue;
            }
            let glyph = if lit {
                ComposedGlyph::compose(entity.glyph(), light)
            } else {
                ComposedGlyph::unlit(entity.glyph())
            };
            canvas.draw(camera.level_to_screen(entry.position), glyph);
        }
    }

    /// Whether an occluder on a strictly higher layer hides the entry
    fn is_covered(&self, chunk: &Chunk, entry: &DrawEntry) -> bool {
        let Some(above) = entry.layer.checked_add(1) else {
            return false;
        };
        chunk
            .objects_at(entry.position, Some(above))
            .any(|other| self.entities.get(&other.id).is_some_and(Entity::blocks_light))
    }

    /// Advance every hot chunk one tick, reconcile, then drain the
    /// generation queue within the configured budget.
    pub fn tick(&mut self, time: FrameTime) -> Result<(), LevelError> {
        self.begin(Phase::Tick, "tick")?;

        let origin = self.chunks.layout().level_to_chunk(IVec2::ZERO);
        self.chunks.get_or_create(origin).keep_loaded(1);

        for coord in self.chunks.coords_sorted() {
            let hot = self.chunks.get_mut(coord).is_some_and(Chunk::consume_tick);
            if !hot {
                continue;
            }
            let ids = self.chunks.get(coord).map(Chunk::live_ids).unwrap_or_default();
            for id in ids {
                self.tick_entity(id, time);
            }
        }

        self.flush_dirty();
        self.drain_generation();
        // Entities added by the generator
        self.flush_dirty();

        self.finish();
        Ok(())
    }

    fn tick_entity(&mut self, id: EntityId, time: FrameTime) {
        let Some(entity) = self.entities.get_mut(&id) else {
            return;
        };
        let Some(mut behavior) = entity.behavior.take() else {
            return;
        };
        behavior.tick(&mut TickContext::new(entity, time));
        entity.behavior = Some(behavior);
        if entity.is_dirty() {
            self.dirty.insert(id);
        }
    }

    fn drain_generation(&mut self) {
        self.enqueue_created();
        if self.generation.is_empty() {
            return;
        }
        let Some(mut generator) = self.generator.take() else {
            // Nothing will ever generate these
            self.generation.clear();
            return;
        };

        let budget = Duration::from_millis(self.config.generation_budget_ms);
        let started = Instant::now();
        let mut generated = 0;
        while let Some(coord) = self.generation.pop() {
            match self.chunks.layout().checked_chunk_origin(coord) {
                Some(origin) => {
                    generator.generate_chunk(origin, self);
                    generated += 1;
                }
                None => log::warn!("Skipping generation of chunk {}: origin out of range", coord),
            }
            self.enqueue_created();
            if !budget.is_zero() && started.elapsed() >= budget {
                break;
            }
        }
        if self.generator.is_none() {
            self.generator = Some(generator);
        }

        log::debug!(
            "Generated {} chunks in {:?}, {} pending",
            generated,
            started.elapsed(),
            self.generation.len()
        );
    }

    /// Keep the chunk containing `pos` hot for `load_ticks` more ticks
    pub fn load_chunk_at(&mut self, pos: IVec2) {
        let ticks = self.config.load_ticks;
        self.chunks.chunk_at_or_create(pos).load(ticks);
        self.enqueue_created();
    }

    // ---- queries ---------------------------------------------------------

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn chunks(&self) -> &ChunkMap {
        &self.chunks
    }

    /// Chunk at chunk coordinates
    pub fn chunk(&self, coord: IVec2) -> Option<&Chunk> {
        self.chunks.get(coord)
    }

    /// Chunk containing a level tile
    pub fn chunk_at(&self, pos: IVec2) -> Option<&Chunk> {
        self.chunks.chunk_at(pos)
    }

    pub fn light_at(&self, pos: IVec2) -> Light {
        self.chunks.light_at(pos)
    }

    /// Occluder count at a tile
    pub fn visibility_at(&self, pos: IVec2) -> u16 {
        self.chunks.visibility_at(pos)
    }

    /// Sum of accumulated light over every tile of the level
    pub fn total_light(&self) -> Light {
        self.chunks
            .iter()
            .fold(Light::ZERO, |acc, (_, chunk)| acc + chunk.total_light())
    }

    /// Light currently committed by an emitting entity
    pub fn contribution(&self, id: EntityId) -> Option<&Contribution> {
        self.lighting.contribution(id)
    }

    /// Entities at a tile in draw order, optionally at or above `min_layer`
    /// and of a given kind
    pub fn objects_at(&self, pos: IVec2, min_layer: Option<i32>, kind: Option<&str>) -> Vec<&Entity> {
        let Some(chunk) = self.chunks.chunk_at(pos) else {
            return Vec::new();
        };
        chunk
            .objects_at(pos, min_layer)
            .filter_map(|entry| self.entities.get(&entry.id))
            .filter(|entity| kind.map_or(true, |k| entity.is_kind(k)))
            .collect()
    }

    pub fn has_object_at(&self, pos: IVec2, min_layer: Option<i32>, kind: Option<&str>) -> bool {
        !self.objects_at(pos, min_layer, kind).is_empty()
    }

    /// Topmost matching entity at a tile
    pub fn try_get_object_at(
        &self,
        pos: IVec2,
        min_layer: Option<i32>,
        kind: Option<&str>,
    ) -> Option<&Entity> {
        self.objects_at(pos, min_layer, kind).pop()
    }

    // ---- camera ----------------------------------------------------------

    pub fn camera(&self) -> Option<&Camera> {
        self.camera.as_ref()
    }

    pub fn camera_mut(&mut self) -> Result<&mut Camera, TransformError> {
        self.camera.as_mut().ok_or(TransformError::ServerMode)
    }

    pub fn level_to_screen(&self, pos: IVec2) -> Result<IVec2, TransformError> {
        self.camera
            .map(|camera| camera.level_to_screen(pos))
            .ok_or(TransformError::ServerMode)
    }

    pub fn screen_to_level(&self, pos: IVec2) -> Result<IVec2, TransformError> {
        self.camera
            .map(|camera| camera.screen_to_level(pos))
            .ok_or(TransformError::ServerMode)
    }
}

/// Move an entity's occluder registration to match its current state
fn sync_blocker(chunks: &mut ChunkMap, lighting: &mut Lighting, entity: &mut Entity) {
    let wanted = entity.blocks_light.then_some(entity.position);
    if entity.registered_blocker == wanted {
        return;
    }
    if let Some(old) = entity.registered_blocker.take() {
        if let Some(chunk) = chunks.chunk_at_mut(old) {
            chunk.remove_occluder(old);
        }
        lighting.queue_blocked_by(chunks, old);
    }
    if let Some(tile) = wanted {
        let chunk = chunks.chunk_at_or_create(tile);
        chunk.add_occluder(tile);
        lighting.queue_lit_by(chunk);
        entity.registered_blocker = Some(tile);
    }
}

impl std::fmt::Debug for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Level")
            .field("phase", &self.phase)
            .field("entities", &self.entities.len())
            .field("chunks", &self.chunks.len())
            .field("dirty", &self.dirty.len())
            .field("pending_generation", &self.generation.len())
            .finish_non_exhaustive()
    }
}
