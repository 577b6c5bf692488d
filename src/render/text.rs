//! Character-buffer canvas

use std::fmt;

use glam::IVec2;

use super::{Canvas, ComposedGlyph};
use crate::simulation::Rgb;

/// Fixed-size grid of characters, one cell per screen position
#[derive(Debug, Clone)]
pub struct TextCanvas {
    /// Width in cells
    pub width: usize,
    /// Height in cells
    pub height: usize,
    cells: Vec<char>,
    colors: Vec<Rgb>,
}

impl TextCanvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![' '; width * height],
            colors: vec![Rgb::BLACK; width * height],
        }
    }

    fn index(&self, position: IVec2) -> Option<usize> {
        let (x, y) = (usize::try_from(position.x).ok()?, usize::try_from(position.y).ok()?);
        (x < self.width && y < self.height).then_some(y * self.width + x)
    }

    /// Reset every cell to blank
    pub fn clear(&mut self) {
        self.cells.fill(' ');
        self.colors.fill(Rgb::BLACK);
    }

    pub fn char_at(&self, position: IVec2) -> Option<char> {
        self.index(position).map(|i| self.cells[i])
    }

    pub fn color_at(&self, position: IVec2) -> Option<Rgb> {
        self.index(position).map(|i| self.colors[i])
    }

    /// Rows as strings, top to bottom
    pub fn to_lines(&self) -> Vec<String> {
        if self.width == 0 {
            return vec![String::new(); self.height];
        }
        self.cells
            .chunks_exact(self.width)
            .map(|row| row.iter().collect())
            .collect()
    }
}

impl Canvas for TextCanvas {
    fn draw(&mut self, position: IVec2, glyph: ComposedGlyph) {
        // Off-screen cells are dropped
        if let Some(i) = self.index(position) {
            self.cells[i] = glyph.ch;
            self.colors[i] = glyph.color;
        }
    }
}

impl fmt::Display for TextCanvas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.to_lines() {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_and_overwrite() {
        let mut canvas = TextCanvas::new(3, 2);
        let glyph = |ch| ComposedGlyph {
            ch,
            color: Rgb::WHITE,
        };
        canvas.draw(IVec2::new(0, 0), glyph('.'));
        canvas.draw(IVec2::new(2, 1), glyph('#'));
        canvas.draw(IVec2::new(2, 1), glyph('@'));
        canvas.draw(IVec2::new(3, 0), glyph('x'));
        canvas.draw(IVec2::new(-1, 0), glyph('x'));

        assert_eq!(canvas.to_lines(), vec![".  ".to_string(), "  @".to_string()]);
        assert_eq!(canvas.char_at(IVec2::new(2, 1)), Some('@'));
        assert_eq!(canvas.color_at(IVec2::new(1, 1)), Some(Rgb::BLACK));
        assert_eq!(canvas.char_at(IVec2::new(5, 5)), None);
        assert_eq!(canvas.to_string(), ".  \n  @\n");

        canvas.clear();
        assert_eq!(canvas.char_at(IVec2::new(2, 1)), Some(' '));
    }
}
