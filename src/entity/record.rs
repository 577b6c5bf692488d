//! Entity record - position, layer, occlusion and light profile

use glam::IVec2;

use super::{Behavior, DirtyFlags, EntityId};
use crate::simulation::{LightEmitter, Rgb};

/// Character and base color an entity is drawn with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph {
    pub ch: char,
    pub color: Rgb,
}

impl Glyph {
    pub const fn new(ch: char, color: Rgb) -> Self {
        Self { ch, color }
    }
}

impl Default for Glyph {
    fn default() -> Self {
        Self::new('?', Rgb::WHITE)
    }
}

/// An object on the tile grid.
///
/// A free entity (not yet added to a level) can be configured freely. Once a
/// [`crate::world::Level`] owns it, mutations go through the level so chunk
/// membership and lighting stay consistent.
pub struct Entity {
    id: EntityId,
    pub(crate) position: IVec2,
    pub(crate) layer: i32,
    pub(crate) blocks_light: bool,
    pub(crate) emitter: Option<LightEmitter>,
    glyph: Glyph,
    kind: &'static str,
    pub(crate) behavior: Option<Box<dyn Behavior>>,

    /// Pending changes since the last reconciliation
    pub(crate) dirty: DirtyFlags,
    /// Position the owning chunk was last reconciled with
    pub(crate) reconciled_position: IVec2,
    /// Tile where this entity is currently counted as an occluder
    pub(crate) registered_blocker: Option<IVec2>,
}

impl Entity {
    pub fn new(position: IVec2) -> Self {
        Self {
            id: EntityId::new(),
            position,
            layer: 0,
            blocks_light: false,
            emitter: None,
            glyph: Glyph::default(),
            kind: "entity",
            behavior: None,
            dirty: DirtyFlags::empty(),
            reconciled_position: position,
            registered_blocker: None,
        }
    }

    /// Restore a known identity (e.g. an entity recreated from saved state)
    pub fn with_id(mut self, id: EntityId) -> Self {
        self.id = id;
        self
    }

    pub fn with_layer(mut self, layer: i32) -> Self {
        self.layer = layer;
        self
    }

    pub fn with_glyph(mut self, ch: char, color: Rgb) -> Self {
        self.glyph = Glyph::new(ch, color);
        self
    }

    /// Mark the entity as an occluder
    pub fn blocking_light(mut self) -> Self {
        self.blocks_light = true;
        self
    }

    pub fn with_emitter(mut self, emitter: LightEmitter) -> Self {
        self.emitter = Some(emitter);
        self
    }

    /// Tag used by type-filtered spatial queries
    pub fn with_kind(mut self, kind: &'static str) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_behavior(mut self, behavior: impl Behavior + 'static) -> Self {
        self.behavior = Some(Box::new(behavior));
        self
    }

    #[inline]
    pub fn id(&self) -> EntityId {
        self.id
    }

    #[inline]
    pub fn position(&self) -> IVec2 {
        self.position
    }

    /// Move a free entity. Owned entities move through `Level::set_position`.
    pub fn set_position(&mut self, position: IVec2) {
        self.position = position;
        self.reconciled_position = position;
    }

    #[inline]
    pub fn layer(&self) -> i32 {
        self.layer
    }

    #[inline]
    pub fn blocks_light(&self) -> bool {
        self.blocks_light
    }

    #[inline]
    pub fn emitter(&self) -> Option<&LightEmitter> {
        self.emitter.as_ref()
    }

    /// Whether the entity currently lights anything
    pub fn emits_light(&self) -> bool {
        self.emitter.is_some_and(|e| e.is_active())
    }

    #[inline]
    pub fn glyph(&self) -> Glyph {
        self.glyph
    }

    #[inline]
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind == kind
    }

    /// Whether changes are waiting for the next flush
    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub(crate) fn mark_dirty(&mut self, flags: DirtyFlags) {
        self.dirty |= flags;
    }
}

impl std::fmt::Debug for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("position", &self.position)
            .field("layer", &self.layer)
            .field("blocks_light", &self.blocks_light)
            .field("emitter", &self.emitter)
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let entity = Entity::new(IVec2::new(3, -2))
            .with_layer(5)
            .with_glyph('#', Rgb::new(120, 120, 120))
            .blocking_light()
            .with_kind("wall");
        assert_eq!(entity.position(), IVec2::new(3, -2));
        assert_eq!(entity.layer(), 5);
        assert!(entity.blocks_light());
        assert!(!entity.emits_light());
        assert!(entity.is_kind("wall"));
        assert_eq!(entity.glyph().ch, '#');
        assert!(!entity.is_dirty());
    }

    #[test]
    fn test_zero_radius_emitter_does_not_emit() {
        let entity = Entity::new(IVec2::ZERO).with_emitter(LightEmitter::new(Rgb::WHITE, 0, 0));
        assert!(entity.emitter().is_some());
        assert!(!entity.emits_light());
    }

    #[test]
    fn test_free_entity_moves_freely() {
        let mut entity = Entity::new(IVec2::ZERO);
        entity.set_position(IVec2::new(-40, 7));
        assert_eq!(entity.position(), IVec2::new(-40, 7));
        assert!(!entity.is_dirty());
    }
}
