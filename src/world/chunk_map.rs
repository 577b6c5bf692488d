//! Chunk storage - lazily created, never destroyed

use std::collections::HashMap;

use glam::IVec2;

use super::{Chunk, ChunkLayout};
use crate::simulation::Light;

/// All chunks of a level, keyed by chunk coordinate
#[derive(Debug, Clone)]
pub struct ChunkMap {
    layout: ChunkLayout,
    chunks: HashMap<IVec2, Chunk>,
    /// Chunks created since the last `take_created`
    created: Vec<IVec2>,
}

impl ChunkMap {
    pub fn new(layout: ChunkLayout) -> Self {
        Self {
            layout,
            chunks: HashMap::new(),
            created: Vec::new(),
        }
    }

    #[inline]
    pub fn layout(&self) -> ChunkLayout {
        self.layout
    }

    /// Get chunk at chunk coordinates (not level coordinates)
    pub fn get(&self, coord: IVec2) -> Option<&Chunk> {
        self.chunks.get(&coord)
    }

    pub fn get_mut(&mut self, coord: IVec2) -> Option<&mut Chunk> {
        self.chunks.get_mut(&coord)
    }

    /// Get or lazily create the chunk at chunk coordinates
    pub fn get_or_create(&mut self, coord: IVec2) -> &mut Chunk {
        let layout = self.layout;
        let created = &mut self.created;
        self.chunks.entry(coord).or_insert_with(|| {
            created.push(coord);
            Chunk::new(coord, layout)
        })
    }

    /// Chunk containing a level tile
    pub fn chunk_at(&self, pos: IVec2) -> Option<&Chunk> {
        self.get(self.layout.level_to_chunk(pos))
    }

    pub fn chunk_at_mut(&mut self, pos: IVec2) -> Option<&mut Chunk> {
        self.get_mut(self.layout.level_to_chunk(pos))
    }

    /// Chunk containing a level tile, created if missing
    pub fn chunk_at_or_create(&mut self, pos: IVec2) -> &mut Chunk {
        let coord = self.layout.level_to_chunk(pos);
        self.get_or_create(coord)
    }

    pub fn contains(&self, coord: IVec2) -> bool {
        self.chunks.contains_key(&coord)
    }

    /// Accumulated light at a level tile (dark where no chunk exists)
    pub fn light_at(&self, pos: IVec2) -> Light {
        self.chunk_at(pos).map_or(Light::ZERO, |c| c.light_at(pos))
    }

    /// Occluder count at a level tile
    pub fn visibility_at(&self, pos: IVec2) -> u16 {
        self.chunk_at(pos).map_or(0, |c| c.visibility_at(pos))
    }

    pub fn is_blocked(&self, pos: IVec2) -> bool {
        self.visibility_at(pos) > 0
    }

    /// Coordinates of chunks created since the last call
    pub fn take_created(&mut self) -> Vec<IVec2> {
        std::mem::take(&mut self.created)
    }

    /// Chunk coordinates in row-major order (y, then x)
    pub fn coords_sorted(&self) -> Vec<IVec2> {
        let mut coords: Vec<IVec2> = self.chunks.keys().copied().collect();
        coords.sort_by_key(|c| (c.y, c.x));
        coords
    }

    pub fn iter(&self) -> impl Iterator<Item = (&IVec2, &Chunk)> {
        self.chunks.iter()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut Chunk> {
        self.chunks.values_mut()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}
