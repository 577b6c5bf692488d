//! Ray-cast light propagation with wall bounces
//!
//! Casts `ceil(2π · radius)` rays from the source tile center and walks each
//! with a grid DDA. A ray stops at the first occluder it enters; while the
//! bounce depth allows and emission remains, it reflects off the occluder
//! face, tinted by the light already resting on the hit tile.

use std::f32::consts::TAU;

use glam::{IVec2, Vec2};

use super::light::{Contribution, Light, LightEmitter, Rgb};
use super::lighting::{LightField, LightStrategy};
use crate::world::coords::checked_add;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    X,
    Y,
}

/// One ray segment being walked
#[derive(Debug, Clone, Copy)]
struct Ray {
    start: IVec2,
    dir: Vec2,
    color: Rgb,
    /// Distance already travelled before this segment (non-zero after a bounce)
    travelled: f32,
    /// Whether this segment contributes visibility
    reveal: bool,
    depth: u32,
}

/// Ray-traced light with a bounded number of indirect bounces
#[derive(Debug, Clone, Copy)]
pub struct PathTraced {
    max_indirect: u32,
}

impl PathTraced {
    pub fn new(max_indirect: u32) -> Self {
        Self { max_indirect }
    }

    fn trace(
        &self,
        ray: Ray,
        emitter: &LightEmitter,
        field: &LightField<'_>,
        contribution: &mut Contribution,
    ) {
        let emission = emitter.emission as f32;
        let reveal = if ray.reveal { emitter.reveal as f32 } else { 0.0 };
        let max_distance = emission.max(reveal);

        let step = IVec2::new(ray.dir.x.signum() as i32, ray.dir.y.signum() as i32);
        let t_delta = Vec2::new(axis_delta(ray.dir.x), axis_delta(ray.dir.y));
        let mut t_max = t_delta * 0.5;
        let mut cell = ray.start;

        loop {
            let (axis, advance) = if t_max.x < t_max.y {
                t_max.x += t_delta.x;
                (Axis::X, IVec2::new(step.x, 0))
            } else {
                t_max.y += t_delta.y;
                (Axis::Y, IVec2::new(0, step.y))
            };
            // The ray leaves the representable grid
            let Some(next) = checked_add(cell, advance) else {
                return;
            };
            cell = next;

            let distance = ray.travelled + (cell - ray.start).as_vec2().length();
            if distance > max_distance {
                return;
            }

            let light = Light::from_factors(
                ray.color,
                falloff(distance, emission),
                falloff(distance, reveal),
            );
            contribution.merge_max(cell, light);

            if !field.is_blocked(cell) {
                continue;
            }
            contribution.mark_blocked(cell);

            if ray.depth < self.max_indirect && emission - distance > 0.0 {
                let resting = (field.light_at(cell) + contribution.get(cell)).color_unit();
                let [r, g, b] = ray.color.to_unit();
                let color = Rgb::new(
                    (r * resting[0] * 255.0).round() as u8,
                    (g * resting[1] * 255.0).round() as u8,
                    (b * resting[2] * 255.0).round() as u8,
                );
                let dir = match axis {
                    Axis::X => Vec2::new(-ray.dir.x, ray.dir.y),
                    Axis::Y => Vec2::new(ray.dir.x, -ray.dir.y),
                };
                let previous = cell - advance;
                self.trace(
                    Ray {
                        start: previous,
                        dir,
                        color,
                        travelled: distance,
                        reveal: false,
                        depth: ray.depth + 1,
                    },
                    emitter,
                    field,
                    contribution,
                );
            }
            return;
        }
    }
}

impl Default for PathTraced {
    fn default() -> Self {
        Self::new(1)
    }
}

#[inline]
fn axis_delta(component: f32) -> f32 {
    if component == 0.0 {
        f32::INFINITY
    } else {
        1.0 / component.abs()
    }
}

/// Linear falloff matching the flood fill: full at the source, zero past `radius`
#[inline]
fn falloff(distance: f32, radius: f32) -> f32 {
    if radius <= 0.0 {
        0.0
    } else {
        (1.0 - distance / (radius + 1.0)).max(0.0)
    }
}

impl LightStrategy for PathTraced {
    fn name(&self) -> &'static str {
        "path-traced"
    }

    fn propagate(
        &self,
        origin: IVec2,
        emitter: &LightEmitter,
        field: &LightField<'_>,
    ) -> Contribution {
        let mut contribution = Contribution::new();
        let radius = emitter.radius() as f32;
        if radius <= 0.0 {
            return contribution;
        }

        contribution.merge_max(
            origin,
            Light::from_factors(
                emitter.color,
                falloff(0.0, emitter.emission as f32),
                falloff(0.0, emitter.reveal as f32),
            ),
        );

        let rays = (TAU * radius).ceil() as u32;
        for i in 0..rays {
            let angle = TAU * i as f32 / rays as f32;
            let ray = Ray {
                start: origin,
                dir: Vec2::from_angle(angle),
                color: emitter.color,
                travelled: 0.0,
                reveal: true,
                depth: 0,
            };
            self.trace(ray, emitter, field, &mut contribution);
        }
        contribution
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{ChunkLayout, ChunkMap};

    #[test]
    fn test_axis_rays_reach_radius() {
        let chunks = ChunkMap::new(ChunkLayout::new(16, 16));
        let emitter = LightEmitter::new(Rgb::WHITE, 3, 0);
        let contribution =
            PathTraced::new(0).propagate(IVec2::ZERO, &emitter, &LightField::new(&chunks));

        assert_eq!(contribution.get(IVec2::ZERO).r, crate::simulation::LIGHT_ONE);
        for pos in [IVec2::new(3, 0), IVec2::new(-3, 0), IVec2::new(0, 3), IVec2::new(0, -3)] {
            assert!(contribution.get(pos).has_color(), "{pos} should be lit");
        }
        assert_eq!(contribution.get(IVec2::new(4, 0)), Light::ZERO);
        assert!(contribution.get(IVec2::new(1, 0)).r > contribution.get(IVec2::new(2, 0)).r);
        assert!(contribution.blocked.is_empty());
    }

    #[test]
    fn test_zero_radius_is_noop() {
        let chunks = ChunkMap::new(ChunkLayout::new(16, 16));
        let emitter = LightEmitter::new(Rgb::WHITE, 0, 0);
        let contribution =
            PathTraced::default().propagate(IVec2::ZERO, &emitter, &LightField::new(&chunks));
        assert!(contribution.is_empty());
    }

    #[test]
    fn test_occluder_stops_ray() {
        let mut chunks = ChunkMap::new(ChunkLayout::new(16, 16));
        chunks.chunk_at_or_create(IVec2::new(2, 0)).add_occluder(IVec2::new(2, 0));
        let emitter = LightEmitter::new(Rgb::WHITE, 4, 0);
        let contribution =
            PathTraced::new(0).propagate(IVec2::ZERO, &emitter, &LightField::new(&chunks));

        assert!(contribution.get(IVec2::new(2, 0)).has_color());
        assert!(contribution.blocked.contains(&IVec2::new(2, 0)));
        assert_eq!(contribution.get(IVec2::new(3, 0)), Light::ZERO);
    }

    #[test]
    fn test_bounces_only_add_light() {
        let mut chunks = ChunkMap::new(ChunkLayout::new(16, 16));
        for y in -6..=6 {
            chunks.chunk_at_or_create(IVec2::new(2, y)).add_occluder(IVec2::new(2, y));
        }
        let emitter = LightEmitter::new(Rgb::new(255, 200, 100), 6, 0);
        let field = LightField::new(&chunks);
        let direct = PathTraced::new(0).propagate(IVec2::ZERO, &emitter, &field);
        let bounced = PathTraced::new(2).propagate(IVec2::ZERO, &emitter, &field);

        for (pos, light) in direct.tiles.iter() {
            let with_bounce = bounced.get(*pos);
            assert!(with_bounce.r >= light.r && with_bounce.g >= light.g, "{pos}");
        }
        assert!(bounced.total().total() >= direct.total().total());
        // Nothing passes the wall
        assert!(bounced.tiles.keys().all(|pos| pos.x <= 2));
    }

    #[test]
    fn test_rays_stop_at_grid_edge() {
        let chunks = ChunkMap::new(ChunkLayout::new(16, 16));
        let emitter = LightEmitter::new(Rgb::WHITE, 3, 0);
        let edge = IVec2::new(i32::MAX, 0);
        let contribution = PathTraced::default().propagate(edge, &emitter, &LightField::new(&chunks));

        assert!(contribution.get(edge).has_color());
        assert!(contribution.get(IVec2::new(i32::MAX - 3, 0)).has_color());
        assert!(contribution.tiles.keys().all(|pos| pos.x > i32::MAX - 4));
    }
}
