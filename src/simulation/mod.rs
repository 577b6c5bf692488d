//! Lighting systems - light values, the incremental engine and its strategies

pub mod flood_fill;
pub mod light;
pub mod lighting;
pub mod path_traced;

pub use flood_fill::FloodFill;
pub use light::{Contribution, Light, LightEmitter, Rgb, LIGHT_ONE};
pub use lighting::{LightField, LightStrategy, Lighting, LightingStats};
pub use path_traced::PathTraced;
