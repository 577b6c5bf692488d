//! Entities - identity, spatial record and attached behaviour

mod behavior;
mod record;

pub use behavior::{Behavior, TickContext};
pub use record::{Entity, Glyph};

use std::sync::atomic::{AtomicU64, Ordering};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Unique identifier for entities in the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

static NEXT_ENTITY_ID: AtomicU64 = AtomicU64::new(1);

impl EntityId {
    /// Generate a new unique entity ID
    pub fn new() -> Self {
        EntityId(NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw u64 value (useful for debugging/serialization)
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

bitflags! {
    /// Pending changes not yet reconciled with chunks and lighting
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DirtyFlags: u8 {
        const POSITION = 1 << 0;
        /// Emission profile or light-blocking flag changed
        const LIGHT = 1 << 1;
        /// Draw order changed
        const LAYER = 1 << 2;
    }
}
