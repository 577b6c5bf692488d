//! # Umbra - chunked 2D tile world with incremental lighting
//!
//! Entities live on an unbounded integer grid partitioned into fixed-size
//! chunks. Every tile carries an accumulated light and visibility value that
//! is kept up to date incrementally as light sources and occluders appear,
//! move and disappear.

pub mod config;
pub mod entity;
pub mod error;
pub mod render;
pub mod simulation;
pub mod world;

/// Common imports
pub mod prelude {
    pub use crate::config::{CameraConfig, LevelConfig, LightAlgorithm, LightingConfig};
    pub use crate::entity::{Behavior, Entity, EntityId, Glyph, TickContext};
    pub use crate::error::{ConfigError, LevelError, TransformError};
    pub use crate::render::{Canvas, ComposedGlyph, NullCanvas, TextCanvas};
    pub use crate::simulation::{Light, LightEmitter, Rgb};
    pub use crate::world::{ChunkGenerator, FrameTime, Level, LevelObserver, Phase};
    pub use glam::IVec2;
}
