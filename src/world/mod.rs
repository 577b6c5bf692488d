//! World management - coordinates, chunks, the level and chunk generation

mod chunk;
mod chunk_map;
pub mod coords;
pub mod generation;
mod level;
pub mod observer;

pub use chunk::{Chunk, DrawEntry};
pub use chunk_map::ChunkMap;
pub use coords::{Camera, ChunkLayout};
pub use generation::{ChunkGenerator, GenerationQueue};
pub use level::{FrameTime, Level, Phase};
pub use observer::{LevelObserver, NoopObserver};
