//! Flood-fill light propagation
//!
//! Expands a wavefront one Chebyshev ring per step. Propagation only moves
//! outward (never decreasing the offset from the source on either axis), so
//! the wave cannot fold back on itself and a tile directly behind an occluder
//! stays in shadow.

use ahash::AHashSet;
use glam::IVec2;

use super::light::{Contribution, Light, LightEmitter};
use crate::world::coords::checked_add;
use super::lighting::{LightField, LightStrategy};

const NEIGHBORS: [IVec2; 8] = [
    IVec2::new(1, 0),
    IVec2::new(-1, 0),
    IVec2::new(0, 1),
    IVec2::new(0, -1),
    IVec2::new(1, 1),
    IVec2::new(1, -1),
    IVec2::new(-1, 1),
    IVec2::new(-1, -1),
];

/// Remaining-radius counter for one channel (color or visibility).
///
/// A radius `R` lights rings `0..=R` with factor `(R + 1 - d) / (R + 1)`;
/// radius 0 contributes nothing.
#[derive(Debug, Clone, Copy)]
struct Counter {
    remaining: u16,
    max: u16,
}

impl Counter {
    fn new(radius: u8) -> Self {
        let max = if radius == 0 { 0 } else { radius as u16 + 1 };
        Self {
            remaining: max,
            max,
        }
    }

    fn factor(&self) -> f32 {
        if self.max == 0 {
            0.0
        } else {
            self.remaining as f32 / self.max as f32
        }
    }

    fn is_live(&self) -> bool {
        self.remaining > 0
    }

    /// Whether another ring follows the current one
    fn has_next(&self) -> bool {
        self.remaining > 1
    }

    fn step(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }
}

/// Wavefront (BFS) light spread
#[derive(Debug, Clone, Copy, Default)]
pub struct FloodFill;

impl LightStrategy for FloodFill {
    fn name(&self) -> &'static str {
        "flood-fill"
    }

    fn propagate(
        &self,
        origin: IVec2,
        emitter: &LightEmitter,
        field: &LightField<'_>,
    ) -> Contribution {
        let mut contribution = Contribution::new();
        let mut emission = Counter::new(emitter.emission);
        let mut reveal = Counter::new(emitter.reveal);

        let mut current = vec![origin];
        let mut next = Vec::new();
        let mut visited = AHashSet::new();
        visited.insert(origin);

        while (emission.is_live() || reveal.is_live()) && !current.is_empty() {
            let light = Light::from_factors(emitter.color, emission.factor(), reveal.factor());
            let expand = emission.has_next() || reveal.has_next();

            for &tile in &current {
                contribution.add(tile, light);

                // Occluders are lit but stop the wave
                if tile != origin && field.is_blocked(tile) {
                    contribution.mark_blocked(tile);
                    continue;
                }
                if !expand {
                    continue;
                }

                let offset = tile - origin;
                for dir in NEIGHBORS {
                    // Tiles past the edge of the grid do not exist
                    let Some(step) = checked_add(tile, dir) else {
                        continue;
                    };
                    let step_offset = step - origin;
                    if step_offset.x.abs() < offset.x.abs() || step_offset.y.abs() < offset.y.abs()
                    {
                        continue;
                    }
                    if visited.insert(step) {
                        next.push(step);
                    }
                }
            }

            emission.step();
            reveal.step();
            std::mem::swap(&mut current, &mut next);
            next.clear();
        }

        contribution
    }
}
