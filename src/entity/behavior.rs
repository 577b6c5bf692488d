//! Consumer-specific entity behaviour, attached by composition

use glam::IVec2;

use super::{DirtyFlags, Entity, EntityId};
use crate::simulation::LightEmitter;
use crate::world::coords::wrapping_add;
use crate::world::FrameTime;

/// Per-entity hooks driven by the level's update/tick cycle.
///
/// All methods default to no-ops.
pub trait Behavior {
    /// Called once per `Level::update` while the entity's chunk is in view
    fn update(&mut self, _entity: &Entity, _time: FrameTime) {}

    /// Called once per `Level::tick` while the entity's chunk is hot
    fn tick(&mut self, _ctx: &mut TickContext<'_>) {}

    /// Called after a position change has been reconciled with chunks and lighting
    fn moved(&mut self, _entity: &Entity, _previous: IVec2) {}
}

/// Mutable view of an entity handed to [`Behavior::tick`].
///
/// Changes are recorded as dirty flags and reconciled when the tick flushes.
pub struct TickContext<'a> {
    entity: &'a mut Entity,
    time: FrameTime,
}

impl<'a> TickContext<'a> {
    pub(crate) fn new(entity: &'a mut Entity, time: FrameTime) -> Self {
        Self { entity, time }
    }

    pub fn id(&self) -> EntityId {
        self.entity.id()
    }

    pub fn time(&self) -> FrameTime {
        self.time
    }

    pub fn entity(&self) -> &Entity {
        self.entity
    }

    pub fn position(&self) -> IVec2 {
        self.entity.position
    }

    pub fn set_position(&mut self, position: IVec2) {
        if self.entity.position != position {
            self.entity.position = position;
            self.entity.mark_dirty(DirtyFlags::POSITION);
        }
    }

    /// Move by `offset`, wrapping across the edges of the grid like the camera
    pub fn translate(&mut self, offset: IVec2) {
        let target = wrapping_add(self.entity.position, offset);
        self.set_position(target);
    }

    pub fn set_emitter(&mut self, emitter: Option<LightEmitter>) {
        if self.entity.emitter != emitter {
            self.entity.emitter = emitter;
            self.entity.mark_dirty(DirtyFlags::LIGHT);
        }
    }

    pub fn set_blocks_light(&mut self, blocks_light: bool) {
        if self.entity.blocks_light != blocks_light {
            self.entity.blocks_light = blocks_light;
            self.entity.mark_dirty(DirtyFlags::LIGHT);
        }
    }
}
