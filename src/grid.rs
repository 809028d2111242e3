use crate::Vec2;

/// Cell-centred grid geometry: resolution, per-axis spacing and origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Grid2 {
    width: usize,
    height: usize,
    spacing: Vec2,
    origin: Vec2,
}

impl Grid2 {
    pub fn new(width: usize, height: usize, spacing: Vec2, origin: Vec2) -> Self {
        assert!(width > 0, "width must be > 0");
        assert!(height > 0, "height must be > 0");
        assert!(spacing.x > 0.0 && spacing.y > 0.0, "spacing must be > 0");
        Self {
            width,
            height,
            spacing,
            origin,
        }
    }

    pub fn uniform(width: usize, height: usize, dx: f64) -> Self {
        Self::new(width, height, Vec2::splat(dx), Vec2::zero())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn resolution(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn spacing(&self) -> Vec2 {
        self.spacing
    }

    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    pub fn size(&self) -> usize {
        self.width * self.height
    }

    pub fn idx(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.width && y < self.height);
        y * self.width + x
    }

    pub fn resize(&mut self, width: usize, height: usize, spacing: Vec2, origin: Vec2) {
        *self = Self::new(width, height, spacing, origin);
    }

    pub fn cell_center(&self, x: usize, y: usize) -> Vec2 {
        Vec2::new(
            self.origin.x + (x as f64 + 0.5) * self.spacing.x,
            self.origin.y + (y as f64 + 0.5) * self.spacing.y,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_center_includes_origin() {
        let grid = Grid2::new(4, 2, Vec2::new(0.5, 2.0), Vec2::new(1.0, -1.0));
        assert_eq!(grid.cell_center(1, 0), Vec2::new(1.75, 0.0));
    }

    #[test]
    #[should_panic(expected = "width must be > 0")]
    fn zero_width_is_rejected() {
        Grid2::uniform(0, 4, 1.0);
    }
}
