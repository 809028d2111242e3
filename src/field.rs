use crate::{Array2, Grid2, Vec2};

/// Cell-centred scalar grid.
#[derive(Clone, Debug, PartialEq)]
pub struct Field2 {
    grid: Grid2,
    data: Array2<f64>,
}

impl Field2 {
    pub fn new(grid: Grid2, fill: f64) -> Self {
        let data = Array2::new(grid.width(), grid.height(), fill);
        Self { grid, data }
    }

    pub fn from_fn(grid: Grid2, f: impl Fn(usize, usize) -> f64 + Sync) -> Self {
        let data = Array2::from_fn(grid.width(), grid.height(), f);
        Self { grid, data }
    }

    pub fn grid(&self) -> Grid2 {
        self.grid
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Array2<f64> {
        &mut self.data
    }

    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.data.get(x, y)
    }

    pub fn set(&mut self, x: usize, y: usize, value: f64) {
        self.data.set(x, y, value);
    }

    pub fn sample_clamped(&self, x: isize, y: isize) -> f64 {
        let (cx, cy) = self.data.clamp_coord(x, y);
        self.get(cx, cy)
    }

    pub fn sample_linear(&self, pos: Vec2) -> f64 {
        let spacing = self.grid.spacing();
        let origin = self.grid.origin();
        let gx = (pos.x - origin.x) / spacing.x - 0.5;
        let gy = (pos.y - origin.y) / spacing.y - 0.5;
        bilinear(gx, gy, |x, y| self.sample_clamped(x, y))
    }

    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    pub fn fill_with_index(&mut self, f: impl Fn(usize, usize) -> f64 + Sync) {
        self.data.fill_with_index(f);
    }

    pub fn fill_with_position(&mut self, f: impl Fn(Vec2) -> f64 + Sync) {
        let grid = self.grid;
        self.data.fill_with_index(|x, y| f(grid.cell_center(x, y)));
    }

    pub fn copy_from(&mut self, other: &Self) {
        self.assert_same_grid(other);
        self.data.copy_from(&other.data);
    }

    pub fn min_max(&self) -> (f64, f64) {
        let mut iter = self.data.iter().filter(|value| value.is_finite());
        let Some(first) = iter.next() else {
            return (0.0, 0.0);
        };
        iter.fold((*first, *first), |(lo, hi), value| (lo.min(*value), hi.max(*value)))
    }

    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    fn assert_same_grid(&self, other: &Self) {
        assert_eq!(self.grid, other.grid, "field grid mismatch");
    }
}

pub(crate) fn bilinear(gx: f64, gy: f64, sample: impl Fn(isize, isize) -> f64) -> f64 {
    let x0 = gx.floor() as isize;
    let y0 = gy.floor() as isize;
    let sx = gx - x0 as f64;
    let sy = gy - y0 as f64;
    let v00 = sample(x0, y0);
    let v10 = sample(x0 + 1, y0);
    let v01 = sample(x0, y0 + 1);
    let v11 = sample(x0 + 1, y0 + 1);
    let vx0 = v00 + (v10 - v00) * sx;
    let vx1 = v01 + (v11 - v01) * sx;
    vx0 + (vx1 - vx0) * sy
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, tol: f64) {
        assert!(
            (a - b).abs() <= tol,
            "expected {a} to be within {tol} of {b}"
        );
    }

    #[test]
    fn from_fn_maps_coords() {
        let grid = Grid2::uniform(3, 2, 1.0);
        let field = Field2::from_fn(grid, |x, y| (x + y * 10) as f64);
        assert_close(field.get(2, 1), 12.0, 1e-12);
    }

    #[test]
    fn sample_linear_matches_cell_center() {
        let grid = Grid2::new(2, 2, Vec2::splat(1.0), Vec2::new(3.0, 1.0));
        let field = Field2::from_fn(grid, |x, y| (x + y * 2) as f64);
        let pos = grid.cell_center(1, 0);
        assert_close(field.sample_linear(pos), 1.0, 1e-12);
    }

    #[test]
    fn sample_linear_interpolates_between_centers() {
        let grid = Grid2::uniform(3, 1, 0.5);
        let field = Field2::from_fn(grid, |x, _| x as f64);
        assert_close(field.sample_linear(Vec2::new(0.5, 0.25)), 0.5, 1e-12);
    }

    #[test]
    fn min_max_reports_bounds() {
        let grid = Grid2::uniform(2, 2, 1.0);
        let field = Field2::from_fn(grid, |x, y| (x + y * 2) as f64 - 1.0);
        let (min_value, max_value) = field.min_max();
        assert_close(min_value, -1.0, 1e-12);
        assert_close(max_value, 2.0, 1e-12);
    }

    #[test]
    #[should_panic(expected = "field grid mismatch")]
    fn copy_from_rejects_other_grid() {
        let mut a = Field2::new(Grid2::uniform(2, 2, 1.0), 0.0);
        let b = Field2::new(Grid2::uniform(3, 2, 1.0), 0.0);
        a.copy_from(&b);
    }
}
