use crate::field::bilinear;
use crate::parallel::max_indexed;
use crate::{Array2, Field2, Grid2, Vec2};

impl Grid2 {
    pub fn u_grid(&self) -> StaggeredGrid2 {
        let spacing = self.spacing();
        StaggeredGrid2::new(
            self.width() + 1,
            self.height(),
            spacing,
            self.origin().add(Vec2::new(0.0, 0.5 * spacing.y)),
        )
    }

    pub fn v_grid(&self) -> StaggeredGrid2 {
        let spacing = self.spacing();
        StaggeredGrid2::new(
            self.width(),
            self.height() + 1,
            spacing,
            self.origin().add(Vec2::new(0.5 * spacing.x, 0.0)),
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StaggeredGrid2 {
    width: usize,
    height: usize,
    spacing: Vec2,
    origin: Vec2,
}

impl StaggeredGrid2 {
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

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn spacing(&self) -> Vec2 {
        self.spacing
    }

    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    pub fn index_position(&self, x: usize, y: usize) -> Vec2 {
        Vec2::new(
            self.origin.x + x as f64 * self.spacing.x,
            self.origin.y + y as f64 * self.spacing.y,
        )
    }
}

/// One velocity component sampled on its own face lattice.
#[derive(Clone, Debug, PartialEq)]
pub struct StaggeredField2 {
    grid: StaggeredGrid2,
    data: Array2<f64>,
}

impl StaggeredField2 {
    pub fn new(grid: StaggeredGrid2, fill: f64) -> Self {
        let data = Array2::new(grid.width(), grid.height(), fill);
        Self { grid, data }
    }

    pub fn from_fn(grid: StaggeredGrid2, f: impl Fn(usize, usize) -> f64 + Sync) -> Self {
        let data = Array2::from_fn(grid.width(), grid.height(), f);
        Self { grid, data }
    }

    pub fn grid(&self) -> StaggeredGrid2 {
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
        let gx = (pos.x - origin.x) / spacing.x;
        let gy = (pos.y - origin.y) / spacing.y;
        bilinear(gx, gy, |x, y| self.sample_clamped(x, y))
    }

    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    pub fn fill_with_index(&mut self, f: impl Fn(usize, usize) -> f64 + Sync) {
        self.data.fill_with_index(f);
    }

    pub fn update_with_index(&mut self, f: impl Fn(usize, usize, f64) -> f64 + Sync) {
        self.data.update_with_index(f);
    }

    pub fn copy_from(&mut self, other: &Self) {
        assert_eq!(self.grid, other.grid, "staggered grid mismatch");
        self.data.copy_from(&other.data);
    }

    pub fn max_abs(&self) -> f64 {
        let values = self.data.as_slice();
        max_indexed(values.len(), |i| values[i].abs())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CellType {
    Fluid,
    #[default]
    Air,
    Solid,
}

pub type CellFlags = Array2<CellType>;

/// Face-centred (MAC) velocity: u on vertical faces, v on horizontal faces.
#[derive(Clone, Debug, PartialEq)]
pub struct MacVelocity2 {
    grid: Grid2,
    u: StaggeredField2,
    v: StaggeredField2,
}

impl MacVelocity2 {
    pub fn new(grid: Grid2, fill: Vec2) -> Self {
        let u = StaggeredField2::new(grid.u_grid(), fill.x);
        let v = StaggeredField2::new(grid.v_grid(), fill.y);
        Self { grid, u, v }
    }

    pub fn from_components(grid: Grid2, u: StaggeredField2, v: StaggeredField2) -> Self {
        assert_eq!(u.grid(), grid.u_grid(), "u grid mismatch");
        assert_eq!(v.grid(), grid.v_grid(), "v grid mismatch");
        Self { grid, u, v }
    }

    pub fn grid(&self) -> Grid2 {
        self.grid
    }

    pub fn resolution(&self) -> (usize, usize) {
        self.grid.resolution()
    }

    pub fn u(&self) -> &StaggeredField2 {
        &self.u
    }

    pub fn v(&self) -> &StaggeredField2 {
        &self.v
    }

    pub fn u_mut(&mut self) -> &mut StaggeredField2 {
        &mut self.u
    }

    pub fn v_mut(&mut self) -> &mut StaggeredField2 {
        &mut self.v
    }

    pub fn u_position(&self, x: usize, y: usize) -> Vec2 {
        self.u.grid().index_position(x, y)
    }

    pub fn v_position(&self, x: usize, y: usize) -> Vec2 {
        self.v.grid().index_position(x, y)
    }

    pub fn divergence_at_cell_center(&self, x: usize, y: usize) -> f64 {
        let spacing = self.grid.spacing();
        (self.u.get(x + 1, y) - self.u.get(x, y)) / spacing.x
            + (self.v.get(x, y + 1) - self.v.get(x, y)) / spacing.y
    }

    pub fn value_at_cell_center(&self, x: usize, y: usize) -> Vec2 {
        Vec2::new(
            0.5 * (self.u.get(x, y) + self.u.get(x + 1, y)),
            0.5 * (self.v.get(x, y) + self.v.get(x, y + 1)),
        )
    }

    pub fn divergence(&self) -> Field2 {
        Field2::from_fn(self.grid, |x, y| self.divergence_at_cell_center(x, y))
    }

    pub fn sample(&self, pos: Vec2) -> Vec2 {
        Vec2::new(self.u.sample_linear(pos), self.v.sample_linear(pos))
    }

    pub fn fill(&mut self, value: Vec2) {
        self.u.fill(value.x);
        self.v.fill(value.y);
    }

    pub fn copy_from(&mut self, other: &Self) {
        assert_eq!(self.grid, other.grid, "velocity grid mismatch");
        self.u.copy_from(&other.u);
        self.v.copy_from(&other.v);
    }

    pub fn max_abs(&self) -> f64 {
        self.u.max_abs().max(self.v.max_abs())
    }
}
