//! Rendering hook - composing lit glyphs and handing them to a canvas
//!
//! The level never talks to a graphics API. Each frame it composes every
//! visible entity's glyph with the light resting on its tile and passes the
//! result to a [`Canvas`].

mod text;

pub use text::TextCanvas;

use glam::IVec2;

use crate::entity::Glyph;
use crate::simulation::{Light, Rgb};

/// Share of full brightness given to tiles that are revealed but unlit
pub const REVEAL_AMBIENT: f32 = 0.5;

/// A glyph tinted by the light on its tile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComposedGlyph {
    pub ch: char,
    pub color: Rgb,
}

impl ComposedGlyph {
    /// Multiply the base color by the tile light (plus ambient from visibility)
    pub fn compose(glyph: Glyph, light: Light) -> Self {
        let base = glyph.color.to_unit();
        let lit = light.color_unit();
        let ambient = light.alpha_unit() * REVEAL_AMBIENT;
        let channel = |i: usize| {
            let factor = (lit[i] + ambient).min(1.0);
            (base[i] * factor * 255.0).round() as u8
        };
        Self {
            ch: glyph.ch,
            color: Rgb::new(channel(0), channel(1), channel(2)),
        }
    }

    /// Glyph drawn at full brightness
    pub fn unlit(glyph: Glyph) -> Self {
        Self {
            ch: glyph.ch,
            color: glyph.color,
        }
    }
}

/// Render target receiving one call per drawn entity
pub trait Canvas {
    /// Draw a glyph at a screen cell
    fn draw(&mut self, position: IVec2, glyph: ComposedGlyph);
}

/// A canvas that discards everything (headless levels)
#[derive(Debug, Default)]
pub struct NullCanvas;

impl Canvas for NullCanvas {
    fn draw(&mut self, _position: IVec2, _glyph: ComposedGlyph) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::LIGHT_ONE;

    #[test]
    fn test_compose_full_light_keeps_color() {
        let glyph = Glyph::new('@', Rgb::new(200, 100, 50));
        let light = Light::from_factors(Rgb::WHITE, 1.0, 0.0);
        let composed = ComposedGlyph::compose(glyph, light);
        assert_eq!(composed.ch, '@');
        assert_eq!(composed.color, Rgb::new(200, 100, 50));
    }

    #[test]
    fn test_compose_tints_and_clamps() {
        let glyph = Glyph::new('#', Rgb::WHITE);
        let light = Light {
            r: LIGHT_ONE * 2,
            g: LIGHT_ONE / 2,
            b: 0,
            a: 0,
        };
        let composed = ComposedGlyph::compose(glyph, light);
        assert_eq!(composed.color, Rgb::new(255, 128, 0));
    }

    #[test]
    fn test_reveal_only_is_dimmed() {
        let glyph = Glyph::new('.', Rgb::WHITE);
        let light = Light::from_factors(Rgb::BLACK, 0.0, 1.0);
        let composed = ComposedGlyph::compose(glyph, light);
        assert_eq!(composed.color, Rgb::new(128, 128, 128));
    }
}
