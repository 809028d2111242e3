use super::{
    build_row_indices, compress_system, decompress_solution, find_enclosed_regions,
    BoundaryConditionKind, GridPressureSolver2,
};
use crate::solver::{
    FdmLinearSystemSolver2, FdmMgLinearSystem2, FdmMgSolver2, FdmMgUtils2, MgParameters,
};
use crate::{
    fraction_inside_sdf, is_inside_sdf, Array2, FdmCompressedLinearSystem2, FdmLinearSystem2,
    FdmMatrix2, FdmMatrixRow2, FdmVector2, MacVelocity2, ScalarField2, Vec2, VectorField2,
};

const MIN_WEIGHT: f64 = 0.01;
const MIN_THETA: f64 = 0.01;
// Keeps restriction sums finite when a field reports +-f64::MAX.
const SDF_LIMIT: f64 = 1e100;

/// Open-area fraction of a face whose end points sample `phi0` and `phi1`
/// of the collider SDF.
pub(crate) fn face_weight(phi0: f64, phi1: f64) -> f64 {
    clamp_weight(1.0 - fraction_inside_sdf(phi0, phi1))
}

/// Nonzero weights are raised to at least `MIN_WEIGHT`.
fn clamp_weight(weight: f64) -> f64 {
    let weight = weight.clamp(0.0, 1.0);
    if weight > 0.0 && weight < MIN_WEIGHT {
        MIN_WEIGHT
    } else {
        weight
    }
}

/// Per-level geometry the stencil is built from.
#[derive(Clone, Debug, Default)]
struct FractionalLevel {
    fluid_sdf: FdmVector2,
    u_weights: Array2<f64>,
    v_weights: Array2<f64>,
    pinned: Array2<bool>,
}

impl FractionalLevel {
    fn resolution(&self) -> (usize, usize) {
        self.fluid_sdf.size()
    }

    fn is_unknown(&self, i: usize, j: usize) -> bool {
        is_inside_sdf(self.fluid_sdf.get(i, j)) && !self.pinned.get(i, j)
    }

    /// Every in-range face of the cell is fully blocked.
    fn is_walled_in(&self, i: usize, j: usize) -> bool {
        let (width, height) = self.resolution();
        (i == 0 || self.u_weights.get(i, j) == 0.0)
            && (i + 1 == width || self.u_weights.get(i + 1, j) == 0.0)
            && (j == 0 || self.v_weights.get(i, j) == 0.0)
            && (j + 1 == height || self.v_weights.get(i, j + 1) == 0.0)
    }

    fn weight_between(&self, a: (usize, usize), b: (usize, usize)) -> f64 {
        if a.1 == b.1 {
            self.u_weights.get(a.0.max(b.0), a.1)
        } else {
            self.v_weights.get(a.0, a.1.max(b.1))
        }
    }

    fn pin_enclosed_regions(&mut self) {
        let (width, height) = self.resolution();
        self.pinned.resize(width, height, false);
        self.pinned.fill(false);
        let pinned = find_enclosed_regions(
            width,
            height,
            |i, j| is_inside_sdf(self.fluid_sdf.get(i, j)),
            |a, b| self.weight_between(a, b) > 0.0,
        );
        for (i, j) in pinned {
            self.pinned.set(i, j, true);
        }
    }
}

/// Ghost-fluid pressure projection: faces carry the open fraction left by the
/// collider, and the free surface is placed at the SDF zero crossing.
pub struct GridFractionalSinglePhasePressureSolver2 {
    system: FdmLinearSystem2,
    comp_system: FdmCompressedLinearSystem2,
    mg_system: FdmMgLinearSystem2,
    levels: Vec<FractionalLevel>,
    u_boundary: Array2<f64>,
    v_boundary: Array2<f64>,
    indices: Array2<usize>,
    solver: Box<dyn FdmLinearSystemSolver2>,
}

impl Default for GridFractionalSinglePhasePressureSolver2 {
    fn default() -> Self {
        Self::new()
    }
}

impl GridFractionalSinglePhasePressureSolver2 {
    pub fn new() -> Self {
        let params = MgParameters {
            max_number_of_levels: 5,
            ..MgParameters::default()
        };
        Self {
            system: FdmLinearSystem2::default(),
            comp_system: FdmCompressedLinearSystem2::default(),
            mg_system: FdmMgLinearSystem2::default(),
            levels: Vec::new(),
            u_boundary: Array2::default(),
            v_boundary: Array2::default(),
            indices: Array2::default(),
            solver: Box::new(FdmMgSolver2::new(params)),
        }
    }

    /// Finest u-face and v-face open fractions from the last solve.
    pub fn face_weights(&self) -> Option<(&Array2<f64>, &Array2<f64>)> {
        self.levels
            .first()
            .map(|level| (&level.u_weights, &level.v_weights))
    }

    fn uses_multigrid(&self) -> bool {
        self.solver.as_multigrid().is_some()
    }

    /// Samples the fluid SDF at cell centres and the collider at face end
    /// points, then restricts both down the level hierarchy.
    pub fn build_weights(
        &mut self,
        input: &MacVelocity2,
        boundary_sdf: &dyn ScalarField2,
        boundary_velocity: &dyn VectorField2,
        fluid_sdf: &dyn ScalarField2,
    ) {
        let grid = input.grid();
        let (width, height) = grid.resolution();
        let spacing = grid.spacing();
        let max_levels = match self.solver.as_multigrid() {
            Some(mg) => mg.params().max_number_of_levels,
            None => 1,
        };
        let resolutions = FdmMgUtils2::level_resolutions(width, height, max_levels);
        self.levels.truncate(resolutions.len());
        self.levels.resize_with(resolutions.len(), FractionalLevel::default);

        let finest = &mut self.levels[0];
        finest.fluid_sdf.resize(width, height, 0.0);
        finest.fluid_sdf.fill_with_index(|i, j| {
            fluid_sdf
                .sample(grid.cell_center(i, j))
                .clamp(-SDF_LIMIT, SDF_LIMIT)
        });
        let half_y = Vec2::new(0.0, 0.5 * spacing.y);
        let half_x = Vec2::new(0.5 * spacing.x, 0.0);
        finest.u_weights.resize(width + 1, height, 0.0);
        finest.u_weights.fill_with_index(|i, j| {
            let pos = input.u_position(i, j);
            face_weight(boundary_sdf.sample(pos.sub(half_y)), boundary_sdf.sample(pos.add(half_y)))
        });
        finest.v_weights.resize(width, height + 1, 0.0);
        finest.v_weights.fill_with_index(|i, j| {
            let pos = input.v_position(i, j);
            face_weight(boundary_sdf.sample(pos.sub(half_x)), boundary_sdf.sample(pos.add(half_x)))
        });
        finest.pin_enclosed_regions();

        self.u_boundary.resize(width + 1, height, 0.0);
        self.u_boundary
            .fill_with_index(|i, j| boundary_velocity.sample(input.u_position(i, j)).x);
        self.v_boundary.resize(width, height + 1, 0.0);
        self.v_boundary
            .fill_with_index(|i, j| boundary_velocity.sample(input.v_position(i, j)).y);

        for level in 1..resolutions.len() {
            let (finer, coarser) = self.levels.split_at_mut(level);
            coarsen_level(&finer[level - 1], resolutions[level], &mut coarser[0]);
        }
    }

    /// Assembles `A` on every level in use and `b` on the finest. Expects
    /// `build_weights` to have run for the same input.
    pub fn build_system(&mut self, input: &MacVelocity2, use_compressed: bool) {
        let (width, height) = input.resolution();
        let spacing = input.grid().spacing();
        assert_eq!(self.levels[0].resolution(), (width, height), "weight grid mismatch");

        if self.uses_multigrid() {
            self.mg_system.resize_with_finest(width, height, self.levels.len());
            for (level, geometry) in self.levels.iter().enumerate() {
                let scale = (1usize << level) as f64;
                build_matrix(geometry, spacing.scale(scale), &mut self.mg_system.a[level]);
            }
            let finest = &self.levels[0];
            build_rhs(finest, &self.u_boundary, &self.v_boundary, input, &mut self.mg_system.b[0]);
            zero_outside_unknowns(finest, &mut self.mg_system.x[0]);
            return;
        }

        self.system.resize(width, height);
        build_matrix(&self.levels[0], spacing, &mut self.system.a);
        build_rhs(&self.levels[0], &self.u_boundary, &self.v_boundary, input, &mut self.system.b);
        zero_outside_unknowns(&self.levels[0], &mut self.system.x);

        if use_compressed {
            let finest = &self.levels[0];
            let rows = build_row_indices(
                width,
                height,
                |i, j| finest.is_unknown(i, j),
                &mut self.indices,
            );
            compress_system(&self.system, &self.indices, rows, &mut self.comp_system);
        }
    }

    /// Subtracts the ghost-fluid pressure gradient on open faces that touch
    /// the fluid. Fully blocked faces take the collider velocity.
    pub fn apply_pressure_gradient(&self, input: &MacVelocity2, output: &mut MacVelocity2) {
        let finest = &self.levels[0];
        let (width, height) = finest.resolution();
        let pressure = self.pressure();
        let inv_h = input.grid().spacing().recip();
        let sdf = &finest.fluid_sdf;
        let (u_boundary, v_boundary) = (&self.u_boundary, &self.v_boundary);
        let p = |i: usize, j: usize| {
            if finest.is_unknown(i, j) {
                pressure.get(i, j)
            } else {
                0.0
            }
        };

        output.u_mut().fill_with_index(|i, j| {
            let weight = finest.u_weights.get(i, j);
            if weight == 0.0 {
                return u_boundary.get(i, j);
            }
            let value = input.u().get(i, j);
            if i == 0 || i == width {
                return value;
            }
            let (left, right) = (sdf.get(i - 1, j), sdf.get(i, j));
            if !is_inside_sdf(left) && !is_inside_sdf(right) {
                return value;
            }
            let theta = fraction_inside_sdf(left, right).max(MIN_THETA);
            value - (p(i, j) - p(i - 1, j)) * inv_h.x / theta
        });
        output.v_mut().fill_with_index(|i, j| {
            let weight = finest.v_weights.get(i, j);
            if weight == 0.0 {
                return v_boundary.get(i, j);
            }
            let value = input.v().get(i, j);
            if j == 0 || j == height {
                return value;
            }
            let (down, up) = (sdf.get(i, j - 1), sdf.get(i, j));
            if !is_inside_sdf(down) && !is_inside_sdf(up) {
                return value;
            }
            let theta = fraction_inside_sdf(down, up).max(MIN_THETA);
            value - (p(i, j) - p(i, j - 1)) * inv_h.y / theta
        });
    }
}

impl GridPressureSolver2 for GridFractionalSinglePhasePressureSolver2 {
    fn solve(
        &mut self,
        input: &MacVelocity2,
        _dt: f64,
        output: &mut MacVelocity2,
        boundary_sdf: &dyn ScalarField2,
        boundary_velocity: &dyn VectorField2,
        fluid_sdf: &dyn ScalarField2,
        use_compressed: bool,
    ) {
        assert_eq!(output.grid(), input.grid(), "velocity grid mismatch");

        self.build_weights(input, boundary_sdf, boundary_velocity, fluid_sdf);
        self.build_system(input, use_compressed);

        if let Some(mg) = self.solver.as_multigrid_mut() {
            mg.solve_multigrid(&mut self.mg_system);
        } else if use_compressed {
            self.solver.solve_compressed(&mut self.comp_system);
            decompress_solution(&self.comp_system.x, &self.indices, &mut self.system.x);
        } else {
            self.solver.solve(&mut self.system);
        }

        self.apply_pressure_gradient(input, output);
    }

    fn pressure(&self) -> &FdmVector2 {
        match self.mg_system.x.first() {
            Some(x) if self.uses_multigrid() => x,
            _ => &self.system.x,
        }
    }

    fn linear_system_solver(&self) -> &dyn FdmLinearSystemSolver2 {
        self.solver.as_ref()
    }

    fn set_linear_system_solver(&mut self, solver: Box<dyn FdmLinearSystemSolver2>) {
        self.solver = solver;
        if self.uses_multigrid() {
            self.system.clear();
            self.comp_system.clear();
        } else {
            self.mg_system.clear();
        }
    }

    fn suggested_boundary_condition(&self) -> BoundaryConditionKind {
        BoundaryConditionKind::Fractional
    }
}

/// Fluid SDF by restriction (point injection unless the level halves
/// exactly); a coarse face weight is the mean of the two fine faces it covers.
fn coarsen_level(finer: &FractionalLevel, resolution: (usize, usize), coarser: &mut FractionalLevel) {
    let (width, height) = resolution;
    let (fine_w, fine_h) = finer.resolution();

    coarser.fluid_sdf.resize(width, height, 0.0);
    if fine_w == 2 * width && fine_h == 2 * height {
        FdmMgUtils2::restrict(&finer.fluid_sdf, &mut coarser.fluid_sdf);
    } else {
        coarser.fluid_sdf.fill_with_index(|i, j| {
            finer
                .fluid_sdf
                .get((2 * i).min(fine_w - 1), (2 * j).min(fine_h - 1))
        });
    }

    let fine_u = &finer.u_weights;
    coarser.u_weights.resize(width + 1, height, 0.0);
    coarser.u_weights.fill_with_index(|i, j| {
        let fi = (2 * i).min(fine_u.width() - 1);
        let j0 = (2 * j).min(fine_h - 1);
        let j1 = (2 * j + 1).min(fine_h - 1);
        let mean = 0.5 * (fine_u.get(fi, j0) + fine_u.get(fi, j1));
        clamp_weight(mean)
    });
    let fine_v = &finer.v_weights;
    coarser.v_weights.resize(width, height + 1, 0.0);
    coarser.v_weights.fill_with_index(|i, j| {
        let fj = (2 * j).min(fine_v.height() - 1);
        let i0 = (2 * i).min(fine_w - 1);
        let i1 = (2 * i + 1).min(fine_w - 1);
        let mean = 0.5 * (fine_v.get(i0, fj) + fine_v.get(i1, fj));
        clamp_weight(mean)
    });

    coarser.pin_enclosed_regions();
}

fn build_matrix(level: &FractionalLevel, spacing: Vec2, a: &mut FdmMatrix2) {
    let (width, height) = level.resolution();
    let inv_h2 = spacing.recip().mul(spacing.recip());
    let sdf = &level.fluid_sdf;
    a.resize(width, height, FdmMatrixRow2::default());
    a.fill_with_index(|i, j| {
        if !level.is_unknown(i, j) {
            return FdmMatrixRow2::IDENTITY;
        }
        let phi = sdf.get(i, j);
        // (diagonal, off-diagonal) contribution of one face.
        let coupling = |ni: usize, nj: usize, weight: f64, inv_h2: f64| {
            let term = weight * inv_h2;
            let neighbor = sdf.get(ni, nj);
            if level.is_unknown(ni, nj) {
                (term, -term)
            } else if is_inside_sdf(neighbor) {
                (term, 0.0)
            } else {
                (term / fraction_inside_sdf(phi, neighbor).max(MIN_THETA), 0.0)
            }
        };

        let mut row = FdmMatrixRow2::default();
        if i > 0 {
            row.center += coupling(i - 1, j, level.u_weights.get(i, j), inv_h2.x).0;
        }
        if i + 1 < width {
            let (diagonal, off) = coupling(i + 1, j, level.u_weights.get(i + 1, j), inv_h2.x);
            row.center += diagonal;
            row.right = off;
        }
        if j > 0 {
            row.center += coupling(i, j - 1, level.v_weights.get(i, j), inv_h2.y).0;
        }
        if j + 1 < height {
            let (diagonal, off) = coupling(i, j + 1, level.v_weights.get(i, j + 1), inv_h2.y);
            row.center += diagonal;
            row.up = off;
        }

        if row.center < f64::EPSILON * (inv_h2.x + inv_h2.y) {
            FdmMatrixRow2::IDENTITY
        } else {
            row
        }
    });
}

/// `b = -div` of the face fluxes, where each face mixes the fluid and the
/// collider velocity by its open fraction.
fn build_rhs(
    finest: &FractionalLevel,
    u_boundary: &Array2<f64>,
    v_boundary: &Array2<f64>,
    input: &MacVelocity2,
    b: &mut FdmVector2,
) {
    let (width, height) = finest.resolution();
    let inv_h = input.grid().spacing().recip();
    let flux_u = |i: usize, j: usize| {
        let weight = finest.u_weights.get(i, j);
        weight * input.u().get(i, j) + (1.0 - weight) * u_boundary.get(i, j)
    };
    let flux_v = |i: usize, j: usize| {
        let weight = finest.v_weights.get(i, j);
        weight * input.v().get(i, j) + (1.0 - weight) * v_boundary.get(i, j)
    };
    b.resize(width, height, 0.0);
    b.fill_with_index(|i, j| {
        if !finest.is_unknown(i, j) || finest.is_walled_in(i, j) {
            return 0.0;
        }
        -((flux_u(i + 1, j) - flux_u(i, j)) * inv_h.x
            + (flux_v(i, j + 1) - flux_v(i, j)) * inv_h.y)
    });
}

fn zero_outside_unknowns(level: &FractionalLevel, x: &mut FdmVector2) {
    x.update_with_index(|i, j, value| {
        if level.is_unknown(i, j) && !level.is_walled_in(i, j) {
            value
        } else {
            0.0
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pressure::test_support::assert_compressed_symmetric;
    use crate::solver::FdmIccgSolver2;
    use crate::{CircleSdf2, ConstantScalarField2, ConstantVectorField2, Grid2};
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn assert_close(a: f64, b: f64, tol: f64) {
        assert!(
            (a - b).abs() <= tol,
            "expected {a} to be within {tol} of {b}"
        );
    }

    fn run(
        solver: &mut GridFractionalSinglePhasePressureSolver2,
        input: &MacVelocity2,
        boundary_sdf: &dyn ScalarField2,
        boundary_velocity: &dyn VectorField2,
        fluid_sdf: &dyn ScalarField2,
        use_compressed: bool,
    ) -> MacVelocity2 {
        let mut output = input.clone();
        solver.solve(
            input,
            1.0 / 60.0,
            &mut output,
            boundary_sdf,
            boundary_velocity,
            fluid_sdf,
            use_compressed,
        );
        output
    }

    /// Divergence of the open-fraction-weighted face fluxes.
    fn weighted_divergence(
        solver: &GridFractionalSinglePhasePressureSolver2,
        velocity: &MacVelocity2,
        i: usize,
        j: usize,
    ) -> f64 {
        let (u_weights, v_weights) = solver.face_weights().expect("solved");
        let inv_h = velocity.grid().spacing().recip();
        let flux_u = |x: usize| {
            let w = u_weights.get(x, j);
            w * velocity.u().get(x, j) + (1.0 - w) * solver.u_boundary.get(x, j)
        };
        let flux_v = |y: usize| {
            let w = v_weights.get(i, y);
            w * velocity.v().get(i, y) + (1.0 - w) * solver.v_boundary.get(i, y)
        };
        (flux_u(i + 1) - flux_u(i)) * inv_h.x + (flux_v(j + 1) - flux_v(j)) * inv_h.y
    }

    #[test]
    fn face_weight_clamps_small_openings() {
        assert_close(face_weight(1.0, 2.0), 1.0, 1e-12);
        assert_close(face_weight(-1.0, -2.0), 0.0, 1e-12);
        assert_close(face_weight(-1.0, 1.0), 0.5, 1e-12);
        assert_close(face_weight(-0.999, 0.001), MIN_WEIGHT, 1e-12);
    }

    #[test]
    fn closed_box_comes_to_rest() {
        let grid = Grid2::uniform(3, 3, 1.0);
        let mut input = MacVelocity2::new(grid, Vec2::zero());
        input
            .v_mut()
            .fill_with_index(|_, j| if j == 0 || j == 3 { 0.0 } else { 1.0 });

        for (use_iccg, use_compressed) in [(false, false), (true, false), (true, true)] {
            let mut solver = GridFractionalSinglePhasePressureSolver2::new();
            if use_iccg {
                solver.set_linear_system_solver(Box::new(FdmIccgSolver2::new(100, 1e-10)));
            }
            let output = run(
                &mut solver,
                &input,
                &ConstantScalarField2::empty(),
                &ConstantVectorField2::zero(),
                &ConstantScalarField2::full(),
                use_compressed,
            );
            for value in output.u().data().iter().chain(output.v().data().iter()) {
                assert_close(*value, 0.0, 1e-6);
            }
            let pressure = solver.pressure();
            for j in 0..2 {
                for i in 0..3 {
                    assert_close(pressure.get(i, j + 1) - pressure.get(i, j), 1.0, 1e-6);
                }
            }
        }
    }

    #[test]
    fn compressed_operator_is_symmetric_for_random_configurations() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..8 {
            let grid = Grid2::uniform(12, 10, 0.1);
            let boundary = CircleSdf2::new(
                Vec2::new(rng.gen_range(0.0..1.2), rng.gen_range(0.0..1.0)),
                rng.gen_range(0.05..0.4),
            );
            let level = rng.gen_range(0.2..1.0);
            let fluid = move |p: Vec2| p.y - level;
            let input = MacVelocity2::new(grid, Vec2::new(0.0, rng.gen_range(-1.0..1.0)));

            let mut solver = GridFractionalSinglePhasePressureSolver2::new();
            solver.set_linear_system_solver(Box::new(FdmIccgSolver2::new(100, 1e-6)));
            solver.build_weights(&input, &boundary, &ConstantVectorField2::zero(), &fluid);
            solver.build_system(&input, false);
            let finest = &solver.levels[0];
            assert_compressed_symmetric(&solver.system, |i, j| finest.is_unknown(i, j));
            assert!(solver.system.a.iter().all(|row| row.center > 0.0));
        }
    }

    #[test]
    fn blocked_faces_take_the_collider_velocity() {
        let grid = Grid2::uniform(16, 16, 1.0 / 16.0);
        let wall = |p: Vec2| p.x - 0.3;
        let wall_velocity = Vec2::new(0.25, -0.5);
        let input = MacVelocity2::new(grid, Vec2::new(1.0, 0.5));
        let mut solver = GridFractionalSinglePhasePressureSolver2::new();
        let output = run(
            &mut solver,
            &input,
            &wall,
            &ConstantVectorField2::new(wall_velocity),
            &ConstantScalarField2::full(),
            false,
        );
        for j in 0..16 {
            for i in 0..=4 {
                assert_eq!(output.u().get(i, j), wall_velocity.x);
            }
        }
        for j in 0..=16 {
            for i in 0..=3 {
                assert_eq!(output.v().get(i, j), wall_velocity.y);
            }
        }
        assert_ne!(output.u().get(8, 8), wall_velocity.x);
    }

    #[test]
    fn flow_around_sphere_has_no_weighted_divergence() {
        let grid = Grid2::uniform(64, 32, 1.0 / 32.0);
        let sphere = CircleSdf2::new(Vec2::new(1.0, 0.5), 0.2);
        let input = MacVelocity2::new(grid, Vec2::new(1.0, 0.0));
        let mut solver = GridFractionalSinglePhasePressureSolver2::new();
        solver.set_linear_system_solver(Box::new(FdmIccgSolver2::new(1000, 1e-9)));
        let output = run(
            &mut solver,
            &input,
            &sphere,
            &ConstantVectorField2::zero(),
            &ConstantScalarField2::full(),
            false,
        );

        let mut worst: f64 = 0.0;
        for j in 0..32 {
            for i in 0..64 {
                worst = worst.max(weighted_divergence(&solver, &output, i, j).abs());
            }
        }
        assert!(worst < 1e-5, "weighted divergence {worst}");

        let column_max = |i: usize| (0..=32).map(|j| output.v().get(i, j).abs()).fold(0.0, f64::max);
        assert!(column_max(41) > 0.1);
        assert!(column_max(2) < 0.5 * column_max(41));
    }

    fn sphere_scenario(
        solver: &mut GridFractionalSinglePhasePressureSolver2,
        width: usize,
        height: usize,
    ) -> (MacVelocity2, f64) {
        let grid = Grid2::uniform(width, height, 1.0 / height as f64);
        let sphere = CircleSdf2::new(Vec2::new(1.0, 0.5), 0.2);
        let input = MacVelocity2::new(grid, Vec2::new(1.0, 0.0));
        let output = run(
            solver,
            &input,
            &sphere,
            &ConstantVectorField2::zero(),
            &ConstantScalarField2::full(),
            false,
        );
        let mut worst: f64 = 0.0;
        for j in 0..height {
            for i in 0..width {
                worst = worst.max(weighted_divergence(solver, &output, i, j).abs());
            }
        }
        (output, worst)
    }

    #[test]
    fn default_solver_handles_flow_around_sphere() {
        let mut solver = GridFractionalSinglePhasePressureSolver2::new();
        let (output, worst) = sphere_scenario(&mut solver, 64, 32);
        let result = solver.linear_system_solver().last_result();
        assert!(result.is_converged(), "stopped after {} cycles", result.iterations);
        assert!(worst < 1e-5, "weighted divergence {worst}");

        let column_max = |i: usize| (0..=32).map(|j| output.v().get(i, j).abs()).fold(0.0, f64::max);
        assert!(column_max(41) > 0.1);
    }

    #[test]
    fn default_solver_iterations_stay_flat_as_resolution_doubles() {
        let mut iterations = Vec::new();
        for (width, height) in [(32, 16), (64, 32), (128, 64)] {
            let mut solver = GridFractionalSinglePhasePressureSolver2::new();
            let (_, worst) = sphere_scenario(&mut solver, width, height);
            let result = solver.linear_system_solver().last_result();
            assert!(result.is_converged(), "{width}x{height} stopped at {}", result.residual_norm);
            assert!(worst < 1e-5, "{width}x{height} weighted divergence {worst}");
            iterations.push(result.iterations);
        }
        assert!(iterations.iter().all(|&n| n <= 25), "iterations {iterations:?}");
        assert!(iterations[2] <= iterations[0] + 8, "iterations {iterations:?}");
    }

    #[test]
    fn large_spacing_keeps_open_cells_coupled() {
        let assemble = |spacing: f64| {
            let grid = Grid2::uniform(4, 4, spacing);
            let input = MacVelocity2::new(grid, Vec2::zero());
            let mut solver = GridFractionalSinglePhasePressureSolver2::new();
            solver.set_linear_system_solver(Box::new(FdmIccgSolver2::new(100, 1e-6)));
            solver.build_weights(
                &input,
                &ConstantScalarField2::empty(),
                &ConstantVectorField2::zero(),
                &ConstantScalarField2::full(),
            );
            solver.build_system(&input, false);
            solver.system.a
        };
        let unit = assemble(1.0);
        let wide = assemble(1e9);
        // Only the pinned corner is an identity row.
        assert_eq!(unit.get(0, 0), FdmMatrixRow2::IDENTITY);
        assert_eq!(wide.get(0, 0), FdmMatrixRow2::IDENTITY);
        for j in 0..4 {
            for i in 0..4 {
                if (i, j) == (0, 0) {
                    continue;
                }
                let (a, b) = (unit.get(i, j), wide.get(i, j));
                assert!(b.center > 0.0 && b.center < 1e-16, "({i}, {j}) became an identity row");
                assert_relative_eq!(b.center * 1e18, a.center, max_relative = 1e-12);
                assert_relative_eq!(b.right * 1e18, a.right, max_relative = 1e-12);
                assert_relative_eq!(b.up * 1e18, a.up, max_relative = 1e-12);
            }
        }
    }

    #[test]
    fn multigrid_matches_conjugate_gradient() {
        let grid = Grid2::uniform(32, 32, 1.0);
        let pool = |p: Vec2| p.y - 20.25;
        let mut input = MacVelocity2::new(grid, Vec2::zero());
        input.u_mut().fill_with_index(|i, _| (0.3 * i as f64).sin());
        input.v_mut().fill_with_index(|_, j| 0.5 * (0.2 * j as f64).cos());

        let mut cg = GridFractionalSinglePhasePressureSolver2::new();
        cg.set_linear_system_solver(Box::new(FdmIccgSolver2::new(1000, 1e-10)));
        let mut mg = GridFractionalSinglePhasePressureSolver2::new();
        mg.set_linear_system_solver(Box::new(FdmMgSolver2::new(MgParameters {
            max_number_of_levels: 3,
            max_tolerance: 1e-10,
            max_number_of_cycles: 200,
            sor_factor: 1.0,
            ..MgParameters::default()
        })));

        let empty = ConstantScalarField2::empty();
        let still = ConstantVectorField2::zero();
        run(&mut cg, &input, &empty, &still, &pool, false);
        run(&mut mg, &input, &empty, &still, &pool, false);
        assert_eq!(mg.mg_system.number_of_levels(), 3);

        let reference = cg.pressure();
        let scale = reference.iter().fold(0.0_f64, |m, p| m.max(p.abs()));
        assert!(scale > 0.0);
        for (a, b) in mg.pressure().iter().zip(reference.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-6 * scale);
        }
    }

    #[test]
    fn coarse_weights_average_fine_faces() {
        let grid = Grid2::uniform(4, 4, 0.25);
        let input = MacVelocity2::new(grid, Vec2::zero());
        // Collider covers the lower half of the left wall.
        let blocker = |p: Vec2| {
            if p.x < 0.1 && p.y < 0.5 {
                -1.0
            } else {
                1.0
            }
        };
        let mut solver = GridFractionalSinglePhasePressureSolver2::new();
        solver.build_weights(&input, &blocker, &ConstantVectorField2::zero(), &ConstantScalarField2::full());
        assert_eq!(solver.levels.len(), 3);
        let coarse = &solver.levels[1];
        assert_eq!(coarse.u_weights.size(), (3, 2));
        // Fine faces below: fully blocked, and half blocked at the corner.
        assert_close(coarse.u_weights.get(0, 0), 0.25, 1e-12);
        assert_close(coarse.u_weights.get(0, 1), 1.0, 1e-12);
        assert_close(coarse.u_weights.get(1, 0), 1.0, 1e-12);
    }

    #[test]
    fn defaults_to_multigrid() {
        let solver = GridFractionalSinglePhasePressureSolver2::new();
        assert_eq!(solver.linear_system_solver().name(), "multigrid");
        assert_eq!(
            solver.suggested_boundary_condition(),
            BoundaryConditionKind::Fractional
        );
        let params = solver
            .linear_system_solver()
            .as_multigrid()
            .map(|mg| mg.params().max_number_of_levels);
        assert_eq!(params, Some(5));
    }
}
