//! Level configuration - serializable parameters for chunking, lighting and generation
//!
//! Configurations can be written as RON presets:
//!
//! ```ron
//! (
//!     chunk_width: 16,
//!     chunk_height: 16,
//!     generation_budget_ms: 4,
//!     camera: Some((width: 80, height: 24)),
//!     lighting: (enabled: true, algorithm: PathTraced, max_indirect: 2),
//! )
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default chunk edge length in tiles
pub const DEFAULT_CHUNK_SIZE: i32 = 16;

/// Ticks a chunk stays hot after [`crate::world::Level::load_chunk_at`]
pub const DEFAULT_LOAD_TICKS: u32 = 2;

/// Complete level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    /// Chunk width in tiles
    pub chunk_width: i32,
    /// Chunk height in tiles
    pub chunk_height: i32,
    /// Ticks added to a chunk's counter by `load_chunk_at`
    pub load_ticks: u32,
    /// Wall-clock budget for draining the generation queue per tick (0 = unbounded)
    pub generation_budget_ms: u64,
    /// Camera window for client levels; `None` runs the level in server mode
    pub camera: Option<CameraConfig>,
    /// Lighting parameters
    pub lighting: LightingConfig,
}

/// Camera window size in tiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraConfig {
    pub width: i32,
    pub height: i32,
}

/// Which propagation algorithm lights the level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LightAlgorithm {
    /// Wavefront expansion, one Chebyshev ring per step
    #[default]
    FloodFill,
    /// Per-ray DDA walk with linear falloff and recursive bounces
    PathTraced,
}

/// Lighting parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    /// Global switch; when false every lighting operation is a no-op
    pub enabled: bool,
    pub algorithm: LightAlgorithm,
    /// Bounce depth for path tracing (0 = direct light only)
    pub max_indirect: u32,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            algorithm: LightAlgorithm::FloodFill,
            max_indirect: 1,
        }
    }
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            chunk_width: DEFAULT_CHUNK_SIZE,
            chunk_height: DEFAULT_CHUNK_SIZE,
            load_ticks: DEFAULT_LOAD_TICKS,
            generation_budget_ms: 0,
            camera: None,
            lighting: LightingConfig::default(),
        }
    }
}

impl LevelConfig {
    /// Non-rendering level (no camera, screen transforms unavailable)
    pub fn server() -> Self {
        Self::default()
    }

    /// Rendering level with a camera window of `width` x `height` tiles
    pub fn client(width: i32, height: i32) -> Self {
        Self {
            camera: Some(CameraConfig { width, height }),
            ..Self::default()
        }
    }

    pub fn with_algorithm(mut self, algorithm: LightAlgorithm) -> Self {
        self.lighting.algorithm = algorithm;
        self
    }

    pub fn with_chunk_size(mut self, width: i32, height: i32) -> Self {
        self.chunk_width = width;
        self.chunk_height = height;
        self
    }

    /// Parse and validate a RON preset
    pub fn from_ron(source: &str) -> Result<Self, ConfigError> {
        let config: LevelConfig = ron::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_ron(&self) -> Result<String, ConfigError> {
        Ok(ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::default(),
        )?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_width <= 0 || self.chunk_height <= 0 {
            return Err(ConfigError::Invalid(format!(
                "chunk size must be positive, got {}x{}",
                self.chunk_width, self.chunk_height
            )));
        }
        if let Some(camera) = self.camera {
            if camera.width <= 0 || camera.height <= 0 {
                return Err(ConfigError::Invalid(format!(
                    "camera size must be positive, got {}x{}",
                    camera.width, camera.height
                )));
            }
        }
        Ok(())
    }
}
