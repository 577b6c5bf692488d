//! Level event observer trait

use crate::entity::{Entity, EntityId};

/// Receives entity lifecycle events from a [`super::Level`].
///
/// This lets UI refresh or achievement systems follow the level without the
/// level depending on them. All methods default to no-ops.
pub trait LevelObserver {
    /// An entity was added and reconciled with its chunk
    fn on_entity_added(&mut self, _entity: &Entity) {}

    /// An entity left the level
    fn on_entity_removed(&mut self, _id: EntityId) {}

    /// A dirty entity was reconciled
    fn on_entity_changed(&mut self, _entity: &Entity) {}
}

/// An observer that ignores every event
#[derive(Debug, Default)]
pub struct NoopObserver;

impl LevelObserver for NoopObserver {}
