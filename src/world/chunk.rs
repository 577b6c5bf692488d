//! Chunk - fixed-size region owning a draw list and per-tile light grids

use std::collections::BTreeSet;

use ahash::AHashMap;
use glam::IVec2;

use super::ChunkLayout;
use crate::entity::EntityId;
use crate::simulation::Light;

/// Draw-list slot for a live entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawEntry {
    pub id: EntityId,
    pub layer: i32,
    /// Level position the chunk was last reconciled with
    pub position: IVec2,
}

/// A rectangular group of tiles
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Chunk coordinates (in chunk space, not tile space)
    pub coord: IVec2,

    layout: ChunkLayout,

    /// Entities sorted ascending by layer, ties in insertion order.
    /// Removed entries become `None` until the next compaction.
    draw_list: Vec<Option<DrawEntry>>,
    tombstones: usize,

    /// Accumulated light per tile, row-major
    lighting: Vec<Light>,

    /// Occluder count per tile, row-major
    occluders: Vec<u16>,

    /// Tile index -> lights whose propagation stopped at an occluder there
    blocked_lights: AHashMap<usize, BTreeSet<EntityId>>,

    /// Lights contributing to at least one tile of this chunk
    lit_by: BTreeSet<EntityId>,

    /// Remaining ticks to simulate
    ticks_remaining: u32,
}

impl Chunk {
    pub fn new(coord: IVec2, layout: ChunkLayout) -> Self {
        Self {
            coord,
            layout,
            draw_list: Vec::new(),
            tombstones: 0,
            lighting: vec![Light::ZERO; layout.area()],
            occluders: vec![0; layout.area()],
            blocked_lights: AHashMap::new(),
            lit_by: BTreeSet::new(),
            ticks_remaining: 0,
        }
    }

    /// Level tile of this chunk's origin
    pub fn origin(&self) -> IVec2 {
        self.layout.chunk_to_level(self.coord)
    }

    /// Whether a level tile lies inside this chunk
    pub fn contains(&self, pos: IVec2) -> bool {
        self.layout.level_to_chunk(pos) == self.coord
    }

    fn index_of(&self, pos: IVec2) -> usize {
        debug_assert!(self.contains(pos), "{pos} outside chunk {}", self.coord);
        self.layout.tile_index(self.layout.level_to_in_chunk(pos))
    }

    // ---- draw list -------------------------------------------------------

    /// Insert keeping the list sorted by layer (after existing entries of the same layer)
    pub fn add(&mut self, entry: DrawEntry) {
        let slot = self
            .draw_list
            .iter()
            .rposition(|slot| slot.is_some_and(|e| e.layer <= entry.layer))
            .map_or(0, |i| i + 1);
        self.draw_list.insert(slot, Some(entry));
    }

    /// Tombstone the entity's slot; returns false if it was not present
    pub fn remove(&mut self, id: EntityId) -> bool {
        for slot in self.draw_list.iter_mut() {
            if slot.is_some_and(|e| e.id == id) {
                *slot = None;
                self.tombstones += 1;
                return true;
            }
        }
        false
    }

    /// Update the recorded position of an entity that moved within this chunk
    pub fn set_entry_position(&mut self, id: EntityId, position: IVec2) {
        if let Some(entry) = self.entry_mut(id) {
            entry.position = position;
        }
    }

    /// Re-insert an entity at its new layer
    pub fn set_entry_layer(&mut self, id: EntityId, layer: i32) {
        if let Some(mut entry) = self.entry_mut(id).copied() {
            self.remove(id);
            entry.layer = layer;
            self.add(entry);
        }
    }

    fn entry_mut(&mut self, id: EntityId) -> Option<&mut DrawEntry> {
        self.draw_list
            .iter_mut()
            .flatten()
            .find(|entry| entry.id == id)
    }

    /// Drop tombstoned slots
    pub fn compact(&mut self) {
        if self.has_tombstones() {
            self.draw_list.retain(Option::is_some);
            self.tombstones = 0;
        }
    }

    pub fn has_tombstones(&self) -> bool {
        self.tombstones > 0
    }

    /// Live entries in draw order
    pub fn entries(&self) -> impl Iterator<Item = &DrawEntry> {
        self.draw_list.iter().flatten()
    }

    /// Snapshot of live ids in draw order
    pub fn live_ids(&self) -> Vec<EntityId> {
        self.entries().map(|e| e.id).collect()
    }

    pub fn len(&self) -> usize {
        self.draw_list.len() - self.tombstones
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ---- spatial queries -------------------------------------------------

    /// Entities at a level tile, optionally at or above `min_layer`
    pub fn objects_at(
        &self,
        pos: IVec2,
        min_layer: Option<i32>,
    ) -> impl Iterator<Item = &DrawEntry> {
        self.entries().filter(move |e| {
            e.position == pos && min_layer.map_or(true, |min| e.layer >= min)
        })
    }

    pub fn has_object_at(&self, pos: IVec2, min_layer: Option<i32>) -> bool {
        self.objects_at(pos, min_layer).next().is_some()
    }

    /// Topmost entity at a level tile
    pub fn try_get_object_at(&self, pos: IVec2, min_layer: Option<i32>) -> Option<EntityId> {
        self.objects_at(pos, min_layer).last().map(|e| e.id)
    }

    // ---- lighting --------------------------------------------------------

    /// Accumulated light at a level tile
    #[inline]
    pub fn light_at(&self, pos: IVec2) -> Light {
        self.lighting[self.index_of(pos)]
    }

    /// Occluder count at a level tile
    #[inline]
    pub fn visibility_at(&self, pos: IVec2) -> u16 {
        self.occluders[self.index_of(pos)]
    }

    #[inline]
    pub fn is_blocked(&self, pos: IVec2) -> bool {
        self.visibility_at(pos) > 0
    }

    /// Row-major accumulated light grid
    pub fn lighting(&self) -> &[Light] {
        &self.lighting
    }

    /// Row-major occluder count grid
    pub fn visibility(&self) -> &[u16] {
        &self.occluders
    }

    pub fn add_light(&mut self, pos: IVec2, light: Light) {
        let idx = self.index_of(pos);
        self.lighting[idx] += light;
    }

    pub fn sub_light(&mut self, pos: IVec2, light: Light) {
        let idx = self.index_of(pos);
        self.lighting[idx] -= light;
    }

    pub fn add_occluder(&mut self, pos: IVec2) {
        let idx = self.index_of(pos);
        self.occluders[idx] = self.occluders[idx].saturating_add(1);
    }

    pub fn remove_occluder(&mut self, pos: IVec2) {
        let idx = self.index_of(pos);
        debug_assert!(self.occluders[idx] > 0, "occluder count underflow at {pos}");
        self.occluders[idx] = self.occluders[idx].saturating_sub(1);
    }

    /// Record that `light` stopped at an occluder on this tile
    pub fn mark_blocking_light_at(&mut self, pos: IVec2, light: EntityId) {
        let idx = self.index_of(pos);
        self.blocked_lights.entry(idx).or_default().insert(light);
    }

    pub fn unmark_blocking_light_at(&mut self, pos: IVec2, light: EntityId) {
        let idx = self.index_of(pos);
        if let Some(lights) = self.blocked_lights.get_mut(&idx) {
            lights.remove(&light);
            if lights.is_empty() {
                self.blocked_lights.remove(&idx);
            }
        }
    }

    /// Lights currently stopped at this tile
    pub fn lights_blocked_at(&self, pos: IVec2) -> Vec<EntityId> {
        self.blocked_lights
            .get(&self.index_of(pos))
            .map(|lights| lights.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn add_lit_by(&mut self, light: EntityId) {
        self.lit_by.insert(light);
    }

    pub fn remove_lit_by(&mut self, light: EntityId) {
        self.lit_by.remove(&light);
    }

    /// Lights contributing to any tile of this chunk
    pub fn lit_by(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.lit_by.iter().copied()
    }

    /// Sum of accumulated light over every tile
    pub fn total_light(&self) -> Light {
        self.lighting.iter().fold(Light::ZERO, |acc, l| acc + *l)
    }

    // ---- tick scheduling -------------------------------------------------

    /// Keep the chunk hot for `ticks` more ticks
    pub fn load(&mut self, ticks: u32) {
        self.ticks_remaining = self.ticks_remaining.saturating_add(ticks);
    }

    /// Ensure the chunk simulates at least the next `ticks` ticks
    pub fn keep_loaded(&mut self, ticks: u32) {
        self.ticks_remaining = self.ticks_remaining.max(ticks);
    }

    pub fn ticks_remaining(&self) -> u32 {
        self.ticks_remaining
    }

    pub fn is_loaded(&self) -> bool {
        self.ticks_remaining > 0
    }

    /// Consume one tick; false if the chunk is cold
    pub fn consume_tick(&mut self) -> bool {
        if self.ticks_remaining == 0 {
            return false;
        }
        self.ticks_remaining -= 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: EntityId, layer: i32) -> DrawEntry {
        DrawEntry {
            id,
            layer,
            position: IVec2::new(1, 1),
        }
    }

    #[test]
    fn test_draw_list_sorted_and_stable() {
        let mut chunk = Chunk::new(IVec2::ZERO, ChunkLayout::new(16, 16));
        let ids: Vec<EntityId> = (0..5).map(|_| EntityId::new()).collect();
        chunk.add(entry(ids[0], 2));
        chunk.add(entry(ids[1], 0));
        chunk.add(entry(ids[2], 2));
        chunk.add(entry(ids[3], 1));
        chunk.add(entry(ids[4], 0));
        assert_eq!(
            chunk.live_ids(),
            vec![ids[1], ids[4], ids[3], ids[0], ids[2]]
        );
    }

    #[test]
    fn test_remove_tombstones_until_compaction() {
        let mut chunk = Chunk::new(IVec2::ZERO, ChunkLayout::new(16, 16));
        let a = EntityId::new();
        let b = EntityId::new();
        chunk.add(entry(a, 0));
        chunk.add(entry(b, 0));
        assert!(chunk.remove(a));
        assert!(!chunk.remove(a));
        assert!(chunk.has_tombstones());
        assert_eq!(chunk.len(), 1);
        assert_eq!(chunk.live_ids(), vec![b]);

        // Insert around a tombstone keeps order
        let c = EntityId::new();
        chunk.add(entry(c, -1));
        assert_eq!(chunk.live_ids(), vec![c, b]);

        chunk.compact();
        assert!(!chunk.has_tombstones());
        assert_eq!(chunk.live_ids(), vec![c, b]);
    }

    #[test]
    fn test_spatial_queries() {
        let mut chunk = Chunk::new(IVec2::ZERO, ChunkLayout::new(16, 16));
        let floor = EntityId::new();
        let item = EntityId::new();
        chunk.add(entry(floor, 0));
        chunk.add(entry(item, 3));
        assert!(chunk.has_object_at(IVec2::new(1, 1), None));
        assert!(!chunk.has_object_at(IVec2::new(2, 1), None));
        assert_eq!(chunk.try_get_object_at(IVec2::new(1, 1), None), Some(item));
        assert_eq!(chunk.objects_at(IVec2::new(1, 1), Some(1)).count(), 1);
        assert!(!chunk.has_object_at(IVec2::new(1, 1), Some(4)));
    }

    #[test]
    fn test_layer_change_resorts() {
        let mut chunk = Chunk::new(IVec2::ZERO, ChunkLayout::new(16, 16));
        let a = EntityId::new();
        let b = EntityId::new();
        chunk.add(entry(a, 0));
        chunk.add(entry(b, 1));
        chunk.set_entry_layer(a, 5);
        assert_eq!(chunk.live_ids(), vec![b, a]);
    }

    #[test]
    fn test_blocking_marks() {
        let mut chunk = Chunk::new(IVec2::new(-1, 0), ChunkLayout::new(16, 16));
        let pos = IVec2::new(-3, 4);
        let light = EntityId::new();
        chunk.add_occluder(pos);
        assert!(chunk.is_blocked(pos));
        chunk.mark_blocking_light_at(pos, light);
        assert_eq!(chunk.lights_blocked_at(pos), vec![light]);
        chunk.unmark_blocking_light_at(pos, light);
        assert!(chunk.lights_blocked_at(pos).is_empty());
        chunk.remove_occluder(pos);
        assert_eq!(chunk.visibility_at(pos), 0);
    }

    #[test]
    fn test_occluder_count_saturates() {
        let mut chunk = Chunk::new(IVec2::ZERO, ChunkLayout::new(4, 4));
        let pos = IVec2::new(2, 3);
        for _ in 0..=u32::from(u16::MAX) {
            chunk.add_occluder(pos);
        }
        assert_eq!(chunk.visibility_at(pos), u16::MAX);
        chunk.remove_occluder(pos);
        assert!(chunk.is_blocked(pos));
    }

    #[test]
    fn test_tick_counter() {
        let mut chunk = Chunk::new(IVec2::ZERO, ChunkLayout::new(8, 8));
        assert!(!chunk.consume_tick());
        chunk.load(2);
        assert!(chunk.consume_tick());
        assert!(chunk.consume_tick());
        assert!(!chunk.is_loaded());
        chunk.keep_loaded(1);
        assert_eq!(chunk.ticks_remaining(), 1);
        chunk.load(3);
        chunk.keep_loaded(2);
        assert_eq!(chunk.ticks_remaining(), 4);
    }
}
