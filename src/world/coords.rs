//! Coordinate spaces: level (world tile), chunk, in-chunk, camera and screen
//!
//! Level and chunk mappings use euclidean division so negative tiles wrap into
//! the chunk below/left of the origin (level x = -1 lands at in-chunk x = 15 for
//! 16-wide chunks).

use glam::IVec2;

/// Chunk dimensions and the pure level <-> chunk mappings derived from them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLayout {
    width: i32,
    height: i32,
}

impl ChunkLayout {
    pub fn new(width: i32, height: i32) -> Self {
        assert!(width > 0 && height > 0, "chunk dimensions must be positive");
        Self { width, height }
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    #[inline]
    pub fn size(&self) -> IVec2 {
        IVec2::new(self.width, self.height)
    }

    /// Tiles per chunk
    #[inline]
    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Chunk coordinate containing a level tile
    #[inline]
    pub fn level_to_chunk(&self, pos: IVec2) -> IVec2 {
        IVec2::new(pos.x.div_euclid(self.width), pos.y.div_euclid(self.height))
    }

    /// Offset of a level tile inside its chunk, always within `[0, size)`
    #[inline]
    pub fn level_to_in_chunk(&self, pos: IVec2) -> IVec2 {
        IVec2::new(pos.x.rem_euclid(self.width), pos.y.rem_euclid(self.height))
    }

    /// Level tile of a chunk's origin (wraps on overflow, see [`Self::checked_chunk_origin`])
    #[inline]
    pub fn chunk_to_level(&self, chunk: IVec2) -> IVec2 {
        IVec2::new(
            chunk.x.wrapping_mul(self.width),
            chunk.y.wrapping_mul(self.height),
        )
    }

    /// Chunk origin, or `None` when it is not representable as a level tile
    pub fn checked_chunk_origin(&self, chunk: IVec2) -> Option<IVec2> {
        let origin = IVec2::new(
            chunk.x.checked_mul(self.width)?,
            chunk.y.checked_mul(self.height)?,
        );
        (self.level_to_chunk(origin) == chunk).then_some(origin)
    }

    /// Row-major index of an in-chunk offset
    #[inline]
    pub fn tile_index(&self, in_chunk: IVec2) -> usize {
        debug_assert!(in_chunk.x >= 0 && in_chunk.x < self.width);
        debug_assert!(in_chunk.y >= 0 && in_chunk.y < self.height);
        in_chunk.y as usize * self.width as usize + in_chunk.x as usize
    }

    /// Chunk coordinate and tile index of a level tile
    #[inline]
    pub fn locate(&self, pos: IVec2) -> (IVec2, usize) {
        (
            self.level_to_chunk(pos),
            self.tile_index(self.level_to_in_chunk(pos)),
        )
    }

    /// Smallest chunk coordinate holding representable tiles
    pub fn min_chunk(&self) -> IVec2 {
        self.level_to_chunk(IVec2::splat(i32::MIN))
    }

    /// Largest chunk coordinate holding representable tiles
    pub fn max_chunk(&self) -> IVec2 {
        self.level_to_chunk(IVec2::splat(i32::MAX))
    }

    /// Chunks intersecting the tile window `[origin, origin + size)`.
    ///
    /// Windows that run past the representable range wrap around to the
    /// opposite extreme instead of overflowing.
    pub fn chunks_in_window(&self, origin: IVec2, size: IVec2) -> Vec<IVec2> {
        let last = IVec2::new(
            origin.x.wrapping_add(size.x.max(1) - 1),
            origin.y.wrapping_add(size.y.max(1) - 1),
        );
        let start = self.level_to_chunk(origin);
        let end = self.level_to_chunk(last);
        let (min, max) = (self.min_chunk(), self.max_chunk());

        let xs = wrapping_span(start.x, end.x, min.x, max.x);
        let ys = wrapping_span(start.y, end.y, min.y, max.y);
        let mut chunks = Vec::with_capacity(xs.len() * ys.len());
        for &y in &ys {
            for &x in &xs {
                chunks.push(IVec2::new(x, y));
            }
        }
        chunks
    }
}

impl Default for ChunkLayout {
    fn default() -> Self {
        Self::new(
            crate::config::DEFAULT_CHUNK_SIZE,
            crate::config::DEFAULT_CHUNK_SIZE,
        )
    }
}

/// Inclusive run `start..=end`, stepping from `max` back to `min`
fn wrapping_span(start: i32, end: i32, min: i32, max: i32) -> Vec<i32> {
    let mut span = vec![start];
    let mut current = start;
    while current != end {
        current = if current >= max { min } else { current + 1 };
        span.push(current);
    }
    span
}

/// Component-wise `a + b`, wrapping at the representable extremes
#[inline]
pub fn wrapping_add(a: IVec2, b: IVec2) -> IVec2 {
    IVec2::new(a.x.wrapping_add(b.x), a.y.wrapping_add(b.y))
}

/// Component-wise `a - b`, wrapping at the representable extremes
#[inline]
pub fn wrapping_sub(a: IVec2, b: IVec2) -> IVec2 {
    IVec2::new(a.x.wrapping_sub(b.x), a.y.wrapping_sub(b.y))
}

/// `a + b`, or `None` when the tile falls outside the representable grid
#[inline]
pub fn checked_add(a: IVec2, b: IVec2) -> Option<IVec2> {
    Some(IVec2::new(a.x.checked_add(b.x)?, a.y.checked_add(b.y)?))
}

/// Camera window over the level, plus where it lands on screen.
///
/// Transforms wrap like the chunk window does, so a camera straddling the
/// `i32` edge sees tiles from both extremes side by side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Camera {
    /// Level tile shown at the camera's top-left corner
    pub position: IVec2,
    /// Window size in tiles
    pub size: IVec2,
    /// Screen cell of the camera's top-left corner
    pub screen_offset: IVec2,
}

impl Camera {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            position: IVec2::ZERO,
            size: IVec2::new(width, height),
            screen_offset: IVec2::ZERO,
        }
    }

    /// Center the window on a level tile
    pub fn center_on(&mut self, pos: IVec2) {
        self.position = wrapping_sub(pos, self.size / 2);
    }

    #[inline]
    pub fn level_to_camera(&self, pos: IVec2) -> IVec2 {
        wrapping_sub(pos, self.position)
    }

    #[inline]
    pub fn camera_to_level(&self, pos: IVec2) -> IVec2 {
        wrapping_add(pos, self.position)
    }

    #[inline]
    pub fn camera_to_screen(&self, pos: IVec2) -> IVec2 {
        wrapping_add(pos, self.screen_offset)
    }

    #[inline]
    pub fn screen_to_camera(&self, pos: IVec2) -> IVec2 {
        wrapping_sub(pos, self.screen_offset)
    }

    #[inline]
    pub fn level_to_screen(&self, pos: IVec2) -> IVec2 {
        self.camera_to_screen(self.level_to_camera(pos))
    }

    #[inline]
    pub fn screen_to_level(&self, pos: IVec2) -> IVec2 {
        self.camera_to_level(self.screen_to_camera(pos))
    }

    /// Whether a level tile falls inside the window
    pub fn contains(&self, pos: IVec2) -> bool {
        let local = self.level_to_camera(pos);
        local.x >= 0 && local.y >= 0 && local.x < self.size.x && local.y < self.size.y
    }
}
