//! Light values and per-source contribution records
//!
//! Light is accumulated in fixed point (`LIGHT_ONE` == full intensity) so a
//! source's contribution can be subtracted exactly, no matter in which order
//! overlapping sources were added.

use std::ops::{Add, AddAssign, Sub, SubAssign};

use ahash::AHashMap;
use glam::IVec2;
use serde::{Deserialize, Serialize};

/// Fixed-point value of full intensity
pub const LIGHT_ONE: i32 = 1 << 16;

/// 8-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Channels as fractions of full intensity
    pub fn to_unit(self) -> [f32; 3] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        ]
    }
}

/// Accumulated color plus visibility (alpha) at a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Light {
    pub r: i32,
    pub g: i32,
    pub b: i32,
    /// Visibility contribution (reveal), independent of color
    pub a: i32,
}

impl Light {
    pub const ZERO: Light = Light {
        r: 0,
        g: 0,
        b: 0,
        a: 0,
    };

    /// `color` scaled by `color_factor`, with `alpha` visibility (factors in `0.0..=1.0`)
    pub fn from_factors(color: Rgb, color_factor: f32, alpha: f32) -> Self {
        let [r, g, b] = color.to_unit();
        let color_factor = color_factor.clamp(0.0, 1.0);
        Self {
            r: to_fixed(r * color_factor),
            g: to_fixed(g * color_factor),
            b: to_fixed(b * color_factor),
            a: to_fixed(alpha.clamp(0.0, 1.0)),
        }
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        *self == Light::ZERO
    }

    /// Whether any color or visibility reaches the tile
    #[inline]
    pub fn is_visible(&self) -> bool {
        self.r > 0 || self.g > 0 || self.b > 0 || self.a > 0
    }

    pub fn has_color(&self) -> bool {
        self.r > 0 || self.g > 0 || self.b > 0
    }

    /// Component-wise maximum
    pub fn max(self, other: Light) -> Light {
        Light {
            r: self.r.max(other.r),
            g: self.g.max(other.g),
            b: self.b.max(other.b),
            a: self.a.max(other.a),
        }
    }

    /// Color channels clamped to `0.0..=1.0`
    pub fn color_unit(&self) -> [f32; 3] {
        [from_fixed(self.r), from_fixed(self.g), from_fixed(self.b)]
    }

    /// Visibility clamped to `0.0..=1.0`
    pub fn alpha_unit(&self) -> f32 {
        from_fixed(self.a)
    }


    /// Sum of all channels, used for brightness comparisons
    pub fn total(&self) -> i64 {
        self.r as i64 + self.g as i64 + self.b as i64 + self.a as i64
    }
}

#[inline]
fn to_fixed(unit: f32) -> i32 {
    (unit * LIGHT_ONE as f32).round() as i32
}

#[inline]
fn from_fixed(value: i32) -> f32 {
    (value as f32 / LIGHT_ONE as f32).clamp(0.0, 1.0)
}

impl Add for Light {
    type Output = Light;

    fn add(self, rhs: Light) -> Light {
        Light {
            r: self.r + rhs.r,
            g: self.g + rhs.g,
            b: self.b + rhs.b,
            a: self.a + rhs.a,
        }
    }
}

impl AddAssign for Light {
    fn add_assign(&mut self, rhs: Light) {
        *self = *self + rhs;
    }
}

impl Sub for Light {
    type Output = Light;

    fn sub(self, rhs: Light) -> Light {
        Light {
            r: self.r - rhs.r,
            g: self.g - rhs.g,
            b: self.b - rhs.b,
            a: self.a - rhs.a,
        }
    }
}

impl SubAssign for Light {
    fn sub_assign(&mut self, rhs: Light) {
        *self = *self - rhs;
    }
}

/// Light profile of an emitting entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightEmitter {
    pub color: Rgb,
    /// Radius over which the source contributes color
    pub emission: u8,
    /// Radius over which the source contributes pure visibility
    pub reveal: u8,
}

impl LightEmitter {
    pub fn new(color: Rgb, emission: u8, reveal: u8) -> Self {
        Self {
            color,
            emission,
            reveal,
        }
    }

    /// Largest of the two radii
    pub fn radius(&self) -> u8 {
        self.emission.max(self.reveal)
    }

    /// Whether this profile lights anything at all
    pub fn is_active(&self) -> bool {
        self.radius() > 0
    }
}

/// Exact per-tile light a single source added to the level
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contribution {
    /// Level tile -> light added there
    pub tiles: AHashMap<IVec2, Light>,
    /// Occluder tiles where this source's propagation stopped
    pub blocked: Vec<IVec2>,
}

impl Contribution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty() && self.blocked.is_empty()
    }

    /// Sum a contribution into the tile
    pub fn add(&mut self, pos: IVec2, light: Light) {
        if light.is_zero() {
            return;
        }
        *self.tiles.entry(pos).or_default() += light;
    }

    /// Keep the component-wise maximum (repeated visits by the same source)
    pub fn merge_max(&mut self, pos: IVec2, light: Light) {
        if light.is_zero() {
            return;
        }
        let slot = self.tiles.entry(pos).or_default();
        *slot = slot.max(light);
    }

    pub fn get(&self, pos: IVec2) -> Light {
        self.tiles.get(&pos).copied().unwrap_or_default()
    }

    pub fn mark_blocked(&mut self, pos: IVec2) {
        if !self.blocked.contains(&pos) {
            self.blocked.push(pos);
        }
    }

    /// Sum over all tiles
    pub fn total(&self) -> Light {
        self.tiles.values().fold(Light::ZERO, |acc, light| acc + *light)
    }
}
