use crate::solver::{FdmIccgSolver2, FdmLinearSystemSolver2};
use crate::{
    is_inside_sdf, Array2, CellFlags, CellType, FdmLinearSystem2, FdmMatrixRow2, Field2,
    MacVelocity2, ScalarField2, Vec2, VecField2,
};
use serde::{Deserialize, Serialize};

/// Wall condition for cells next to a collider.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryType {
    /// The collider holds its current value.
    #[default]
    Dirichlet,
    /// No flux through the collider.
    Neumann,
}

/// Diffuses grid quantities inside the fluid region. Cells outside the fluid
/// are copied through unchanged.
pub trait GridDiffusionSolver2: Send {
    fn solve_scalar(
        &mut self,
        source: &Field2,
        coefficient: f64,
        dt: f64,
        dest: &mut Field2,
        boundary_sdf: &dyn ScalarField2,
        fluid_sdf: &dyn ScalarField2,
    );

    fn solve_collocated(
        &mut self,
        source: &VecField2,
        coefficient: f64,
        dt: f64,
        dest: &mut VecField2,
        boundary_sdf: &dyn ScalarField2,
        fluid_sdf: &dyn ScalarField2,
    );

    fn solve_face_centered(
        &mut self,
        source: &MacVelocity2,
        coefficient: f64,
        dt: f64,
        dest: &mut MacVelocity2,
        boundary_sdf: &dyn ScalarField2,
        fluid_sdf: &dyn ScalarField2,
    );
}

/// One sampled component: values, spacing and the world position of each
/// sample.
struct Component<'a, P> {
    values: &'a Array2<f64>,
    spacing: Vec2,
    position: P,
}

fn build_markers<P>(
    component: &Component<'_, P>,
    boundary_sdf: &dyn ScalarField2,
    fluid_sdf: &dyn ScalarField2,
    markers: &mut CellFlags,
) where
    P: Fn(usize, usize) -> Vec2 + Sync,
{
    let (width, height) = component.values.size();
    markers.resize(width, height, CellType::Air);
    markers.fill_with_index(|i, j| {
        let pos = (component.position)(i, j);
        if is_inside_sdf(boundary_sdf.sample(pos)) {
            CellType::Solid
        } else if is_inside_sdf(fluid_sdf.sample(pos)) {
            CellType::Fluid
        } else {
            CellType::Air
        }
    });
}

/// Implicit diffusion: solves `(I - coefficient * dt * L) x = source` per
/// component.
pub struct GridBackwardEulerDiffusionSolver2 {
    boundary_type: BoundaryType,
    system: FdmLinearSystem2,
    markers: CellFlags,
    solver: Box<dyn FdmLinearSystemSolver2>,
}

impl Default for GridBackwardEulerDiffusionSolver2 {
    fn default() -> Self {
        Self::new(BoundaryType::default())
    }
}

impl GridBackwardEulerDiffusionSolver2 {
    pub fn new(boundary_type: BoundaryType) -> Self {
        Self {
            boundary_type,
            system: FdmLinearSystem2::default(),
            markers: CellFlags::default(),
            solver: Box::new(FdmIccgSolver2::new(100, f64::EPSILON)),
        }
    }

    pub fn boundary_type(&self) -> BoundaryType {
        self.boundary_type
    }

    pub fn linear_system_solver(&self) -> &dyn FdmLinearSystemSolver2 {
        self.solver.as_ref()
    }

    pub fn set_linear_system_solver(&mut self, solver: Box<dyn FdmLinearSystemSolver2>) {
        self.solver = solver;
    }

    fn solve_component<P>(
        &mut self,
        component: Component<'_, P>,
        coefficient: f64,
        dt: f64,
        dest: &mut Array2<f64>,
        boundary_sdf: &dyn ScalarField2,
        fluid_sdf: &dyn ScalarField2,
    ) where
        P: Fn(usize, usize) -> Vec2 + Sync,
    {
        build_markers(&component, boundary_sdf, fluid_sdf, &mut self.markers);
        let inv_h = component.spacing.recip();
        self.build_system(component.values, inv_h.mul(inv_h).scale(coefficient * dt));
        self.solver.solve(&mut self.system);
        dest.copy_from(&self.system.x);
    }

    /// `c` is `coefficient * dt / h^2` per axis.
    fn build_system(&mut self, source: &Array2<f64>, c: Vec2) {
        let (width, height) = source.size();
        let markers = &self.markers;
        let dirichlet = self.boundary_type == BoundaryType::Dirichlet;
        let is_fluid = |i: usize, j: usize| markers.get(i, j) == CellType::Fluid;
        let holds = |i: usize, j: usize| match markers.get(i, j) {
            CellType::Fluid => true,
            CellType::Solid => dirichlet,
            CellType::Air => false,
        };
        let pinned_value = |i: usize, j: usize, c: f64| {
            if dirichlet && markers.get(i, j) == CellType::Solid {
                c * source.get(i, j)
            } else {
                0.0
            }
        };

        self.system.resize(width, height);
        self.system.a.fill_with_index(|i, j| {
            if !is_fluid(i, j) {
                return FdmMatrixRow2::IDENTITY;
            }
            let mut row = FdmMatrixRow2 {
                center: 1.0,
                ..FdmMatrixRow2::default()
            };
            if i > 0 && holds(i - 1, j) {
                row.center += c.x;
            }
            if i + 1 < width {
                if holds(i + 1, j) {
                    row.center += c.x;
                }
                if is_fluid(i + 1, j) {
                    row.right = -c.x;
                }
            }
            if j > 0 && holds(i, j - 1) {
                row.center += c.y;
            }
            if j + 1 < height {
                if holds(i, j + 1) {
                    row.center += c.y;
                }
                if is_fluid(i, j + 1) {
                    row.up = -c.y;
                }
            }
            row
        });
        self.system.b.fill_with_index(|i, j| {
            let mut value = source.get(i, j);
            if !is_fluid(i, j) {
                return value;
            }
            if i > 0 {
                value += pinned_value(i - 1, j, c.x);
            }
            if i + 1 < width {
                value += pinned_value(i + 1, j, c.x);
            }
            if j > 0 {
                value += pinned_value(i, j - 1, c.y);
            }
            if j + 1 < height {
                value += pinned_value(i, j + 1, c.y);
            }
            value
        });
        self.system.x.copy_from(source);
    }
}

impl GridDiffusionSolver2 for GridBackwardEulerDiffusionSolver2 {
    fn solve_scalar(
        &mut self,
        source: &Field2,
        coefficient: f64,
        dt: f64,
        dest: &mut Field2,
        boundary_sdf: &dyn ScalarField2,
        fluid_sdf: &dyn ScalarField2,
    ) {
        let grid = source.grid();
        assert_eq!(dest.grid(), grid, "grid mismatch");
        let component = Component {
            values: source.data(),
            spacing: grid.spacing(),
            position: |i: usize, j: usize| grid.cell_center(i, j),
        };
        self.solve_component(component, coefficient, dt, dest.data_mut(), boundary_sdf, fluid_sdf);
    }

    fn solve_collocated(
        &mut self,
        source: &VecField2,
        coefficient: f64,
        dt: f64,
        dest: &mut VecField2,
        boundary_sdf: &dyn ScalarField2,
        fluid_sdf: &dyn ScalarField2,
    ) {
        self.solve_scalar(source.u(), coefficient, dt, dest.u_mut(), boundary_sdf, fluid_sdf);
        self.solve_scalar(source.v(), coefficient, dt, dest.v_mut(), boundary_sdf, fluid_sdf);
    }

    fn solve_face_centered(
        &mut self,
        source: &MacVelocity2,
        coefficient: f64,
        dt: f64,
        dest: &mut MacVelocity2,
        boundary_sdf: &dyn ScalarField2,
        fluid_sdf: &dyn ScalarField2,
    ) {
        assert_eq!(dest.grid(), source.grid(), "grid mismatch");
        let u_grid = source.u().grid();
        let component = Component {
            values: source.u().data(),
            spacing: u_grid.spacing(),
            position: |i: usize, j: usize| u_grid.index_position(i, j),
        };
        self.solve_component(component, coefficient, dt, dest.u_mut().data_mut(), boundary_sdf, fluid_sdf);

        let v_grid = source.v().grid();
        let component = Component {
            values: source.v().data(),
            spacing: v_grid.spacing(),
            position: |i: usize, j: usize| v_grid.index_position(i, j),
        };
        self.solve_component(component, coefficient, dt, dest.v_mut().data_mut(), boundary_sdf, fluid_sdf);
    }
}

/// Explicit diffusion: one stencil application, no linear solve. Stable only
/// while `coefficient * dt * (2/h.x^2 + 2/h.y^2) <= 1`.
#[derive(Clone, Debug, Default)]
pub struct GridForwardEulerDiffusionSolver2 {
    markers: CellFlags,
}

impl GridForwardEulerDiffusionSolver2 {
    pub fn new() -> Self {
        Self::default()
    }

    fn solve_component<P>(
        &mut self,
        component: Component<'_, P>,
        coefficient: f64,
        dt: f64,
        dest: &mut Array2<f64>,
        boundary_sdf: &dyn ScalarField2,
        fluid_sdf: &dyn ScalarField2,
    ) where
        P: Fn(usize, usize) -> Vec2 + Sync,
    {
        build_markers(&component, boundary_sdf, fluid_sdf, &mut self.markers);
        let inv_h2 = component.spacing.recip().mul(component.spacing.recip());
        let factor = coefficient * dt;
        if factor * 2.0 * (inv_h2.x + inv_h2.y) > 1.0 {
            log::warn!("forward Euler diffusion exceeds its stability limit (factor {factor:.3e})");
        }

        let source = component.values;
        let markers = &self.markers;
        let (width, height) = source.size();
        dest.fill_with_index(|i, j| {
            let center = source.get(i, j);
            if markers.get(i, j) != CellType::Fluid {
                return center;
            }
            let mut laplacian = 0.0;
            let mut add = |ni: usize, nj: usize, inv_h2: f64| {
                if markers.get(ni, nj) == CellType::Fluid {
                    laplacian += (source.get(ni, nj) - center) * inv_h2;
                }
            };
            if i > 0 {
                add(i - 1, j, inv_h2.x);
            }
            if i + 1 < width {
                add(i + 1, j, inv_h2.x);
            }
            if j > 0 {
                add(i, j - 1, inv_h2.y);
            }
            if j + 1 < height {
                add(i, j + 1, inv_h2.y);
            }
            center + factor * laplacian
        });
    }
}

impl GridDiffusionSolver2 for GridForwardEulerDiffusionSolver2 {
    fn solve_scalar(
        &mut self,
        source: &Field2,
        coefficient: f64,
        dt: f64,
        dest: &mut Field2,
        boundary_sdf: &dyn ScalarField2,
        fluid_sdf: &dyn ScalarField2,
    ) {
        let grid = source.grid();
        assert_eq!(dest.grid(), grid, "grid mismatch");
        let component = Component {
            values: source.data(),
            spacing: grid.spacing(),
            position: |i: usize, j: usize| grid.cell_center(i, j),
        };
        self.solve_component(component, coefficient, dt, dest.data_mut(), boundary_sdf, fluid_sdf);
    }

    fn solve_collocated(
        &mut self,
        source: &VecField2,
        coefficient: f64,
        dt: f64,
        dest: &mut VecField2,
        boundary_sdf: &dyn ScalarField2,
        fluid_sdf: &dyn ScalarField2,
    ) {
        self.solve_scalar(source.u(), coefficient, dt, dest.u_mut(), boundary_sdf, fluid_sdf);
        self.solve_scalar(source.v(), coefficient, dt, dest.v_mut(), boundary_sdf, fluid_sdf);
    }

    fn solve_face_centered(
        &mut self,
        source: &MacVelocity2,
        coefficient: f64,
        dt: f64,
        dest: &mut MacVelocity2,
        boundary_sdf: &dyn ScalarField2,
        fluid_sdf: &dyn ScalarField2,
    ) {
        assert_eq!(dest.grid(), source.grid(), "grid mismatch");
        let u_grid = source.u().grid();
        let component = Component {
            values: source.u().data(),
            spacing: u_grid.spacing(),
            position: |i: usize, j: usize| u_grid.index_position(i, j),
        };
        self.solve_component(component, coefficient, dt, dest.u_mut().data_mut(), boundary_sdf, fluid_sdf);

        let v_grid = source.v().grid();
        let component = Component {
            values: source.v().data(),
            spacing: v_grid.spacing(),
            position: |i: usize, j: usize| v_grid.index_position(i, j),
        };
        self.solve_component(component, coefficient, dt, dest.v_mut().data_mut(), boundary_sdf, fluid_sdf);
    }
}
