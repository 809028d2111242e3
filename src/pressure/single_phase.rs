use super::{
    build_row_indices, compress_system, decompress_solution, find_enclosed_regions, neighbors,
    BoundaryConditionKind, GridPressureSolver2,
};
use crate::solver::{FdmIccgSolver2, FdmLinearSystemSolver2, FdmMgLinearSystem2, FdmMgUtils2};
use crate::{
    flags_from_sdf, Array2, CellFlags, CellType, FdmCompressedLinearSystem2, FdmLinearSystem2,
    FdmMatrix2, FdmMatrixRow2, FdmVector2, Grid2, MacVelocity2, ScalarField2, Vec2, VectorField2,
};

/// Pressure projection with cells classified whole: a face is either fully
/// open or blocked by a solid cell.
pub struct GridSinglePhasePressureSolver2 {
    system: FdmLinearSystem2,
    comp_system: FdmCompressedLinearSystem2,
    mg_system: FdmMgLinearSystem2,
    markers: Vec<CellFlags>,
    indices: Array2<usize>,
    solver: Box<dyn FdmLinearSystemSolver2>,
}

impl Default for GridSinglePhasePressureSolver2 {
    fn default() -> Self {
        Self::new()
    }
}

impl GridSinglePhasePressureSolver2 {
    pub fn new() -> Self {
        Self {
            system: FdmLinearSystem2::default(),
            comp_system: FdmCompressedLinearSystem2::default(),
            mg_system: FdmMgLinearSystem2::default(),
            markers: Vec::new(),
            indices: Array2::default(),
            solver: Box::new(FdmIccgSolver2::new(100, 1e-6)),
        }
    }

    /// Finest-level markers from the last solve, after isolated cells were
    /// turned into air and enclosed regions were pinned.
    pub fn markers(&self) -> Option<&CellFlags> {
        self.markers.first()
    }

    fn uses_multigrid(&self) -> bool {
        self.solver.as_multigrid().is_some()
    }

    /// One marker grid per level: the finest from the SDFs, the rest by
    /// majority vote over the level above.
    pub fn build_markers(
        &mut self,
        grid: Grid2,
        boundary_sdf: &dyn ScalarField2,
        fluid_sdf: &dyn ScalarField2,
    ) {
        let max_levels = match self.solver.as_multigrid() {
            Some(mg) => mg.params().max_number_of_levels,
            None => 1,
        };
        let resolutions = FdmMgUtils2::level_resolutions(grid.width(), grid.height(), max_levels);
        self.markers.truncate(resolutions.len());
        self.markers.resize_with(resolutions.len(), CellFlags::default);

        self.markers[0] = flags_from_sdf(grid, boundary_sdf, fluid_sdf);
        settle_markers(&mut self.markers[0]);
        for level in 1..resolutions.len() {
            let (finer, coarser) = self.markers.split_at_mut(level);
            coarsen_markers(&finer[level - 1], resolutions[level], &mut coarser[0]);
            settle_markers(&mut coarser[0]);
        }
    }

    /// Assembles `A` on every level in use and `b` on the finest. Expects
    /// `build_markers` to have run on the same grid.
    pub fn build_system(
        &mut self,
        input: &MacVelocity2,
        boundary_velocity: &dyn VectorField2,
        use_compressed: bool,
    ) {
        let (width, height) = input.resolution();
        let spacing = input.grid().spacing();
        assert_eq!(self.markers[0].size(), (width, height), "marker grid mismatch");

        if self.uses_multigrid() {
            let levels = self.markers.len();
            self.mg_system.resize_with_finest(width, height, levels);
            for (level, markers) in self.markers.iter().enumerate() {
                let scale = (1usize << level) as f64;
                build_matrix(markers, spacing.scale(scale), &mut self.mg_system.a[level]);
            }
            build_rhs(input, boundary_velocity, &self.markers[0], &mut self.mg_system.b[0]);
            zero_outside_fluid(&self.markers[0], &mut self.mg_system.x[0]);
            return;
        }

        self.system.resize(width, height);
        build_matrix(&self.markers[0], spacing, &mut self.system.a);
        build_rhs(input, boundary_velocity, &self.markers[0], &mut self.system.b);
        zero_outside_fluid(&self.markers[0], &mut self.system.x);

        if use_compressed {
            let markers = &self.markers[0];
            let rows = build_row_indices(
                width,
                height,
                |i, j| markers.get(i, j) == CellType::Fluid,
                &mut self.indices,
            );
            compress_system(&self.system, &self.indices, rows, &mut self.comp_system);
        }
    }

    /// Subtracts the pressure gradient on faces touching fluid and clamps
    /// faces touching a solid to the boundary velocity.
    pub fn apply_pressure_gradient(
        &self,
        input: &MacVelocity2,
        boundary_velocity: &dyn VectorField2,
        output: &mut MacVelocity2,
    ) {
        let markers = &self.markers[0];
        let pressure = self.pressure();
        let inv_h = input.grid().spacing().recip();
        let p = |i: usize, j: usize| {
            if markers.get(i, j) == CellType::Fluid {
                pressure.get(i, j)
            } else {
                0.0
            }
        };
        let (width, height) = markers.size();

        output.u_mut().fill_with_index(|i, j| {
            let left = (i > 0).then(|| markers.get(i - 1, j));
            let right = (i < width).then(|| markers.get(i, j));
            face_value(
                left,
                right,
                input.u().get(i, j),
                || boundary_velocity.sample(input.u_position(i, j)).x,
                || (p(i, j) - p(i - 1, j)) * inv_h.x,
            )
        });
        output.v_mut().fill_with_index(|i, j| {
            let down = (j > 0).then(|| markers.get(i, j - 1));
            let up = (j < height).then(|| markers.get(i, j));
            face_value(
                down,
                up,
                input.v().get(i, j),
                || boundary_velocity.sample(input.v_position(i, j)).y,
                || (p(i, j) - p(i, j - 1)) * inv_h.y,
            )
        });
    }
}

/// Projected value of a face from the cells on either side. `gradient` is
/// only evaluated when both cells exist.
fn face_value(
    lower: Option<CellType>,
    upper: Option<CellType>,
    value: f64,
    boundary: impl Fn() -> f64,
    gradient: impl Fn() -> f64,
) -> f64 {
    if lower == Some(CellType::Solid) || upper == Some(CellType::Solid) {
        return boundary();
    }
    match (lower, upper) {
        (Some(a), Some(b)) if a == CellType::Fluid || b == CellType::Fluid => value - gradient(),
        _ => value,
    }
}

impl GridPressureSolver2 for GridSinglePhasePressureSolver2 {
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
        let grid = input.grid();
        assert_eq!(output.grid(), grid, "velocity grid mismatch");

        self.build_markers(grid, boundary_sdf, fluid_sdf);
        self.build_system(input, boundary_velocity, use_compressed);

        if let Some(mg) = self.solver.as_multigrid_mut() {
            mg.solve_multigrid(&mut self.mg_system);
        } else if use_compressed {
            self.solver.solve_compressed(&mut self.comp_system);
            decompress_solution(&self.comp_system.x, &self.indices, &mut self.system.x);
        } else {
            self.solver.solve(&mut self.system);
        }

        self.apply_pressure_gradient(input, boundary_velocity, output);
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
        BoundaryConditionKind::Blocked
    }
}

/// Fluid cells with no open neighbour become air, then each enclosed fluid
/// region gives up its first cell as a zero-pressure reference.
fn settle_markers(markers: &mut CellFlags) {
    let (width, height) = markers.size();
    let snapshot = markers.clone();
    markers.update_with_index(|i, j, cell| {
        let isolated = neighbors((i, j), width, height)
            .all(|(ni, nj)| snapshot.get(ni, nj) == CellType::Solid);
        if cell == CellType::Fluid && isolated {
            CellType::Air
        } else {
            cell
        }
    });

    let snapshot = &*markers;
    let pinned = find_enclosed_regions(
        width,
        height,
        |i, j| snapshot.get(i, j) == CellType::Fluid,
        |_, (ni, nj)| snapshot.get(ni, nj) != CellType::Solid,
    );
    for (i, j) in pinned {
        markers.set(i, j, CellType::Air);
    }
}

/// Majority vote over the clamped 4x4 fine window of each coarse cell.
/// Ties prefer fluid, then air.
fn coarsen_markers(finer: &CellFlags, resolution: (usize, usize), coarser: &mut CellFlags) {
    coarser.resize(resolution.0, resolution.1, CellType::Air);
    coarser.fill_with_index(|i, j| {
        let (mut fluid, mut air, mut solid) = (0, 0, 0);
        for dy in -1..=2 {
            for dx in -1..=2 {
                let (fi, fj) = finer.clamp_coord(2 * i as isize + dx, 2 * j as isize + dy);
                match finer.get(fi, fj) {
                    CellType::Fluid => fluid += 1,
                    CellType::Air => air += 1,
                    CellType::Solid => solid += 1,
                }
            }
        }
        if fluid >= air && fluid >= solid {
            CellType::Fluid
        } else if air >= solid {
            CellType::Air
        } else {
            CellType::Solid
        }
    });
}

fn build_matrix(markers: &CellFlags, spacing: Vec2, a: &mut FdmMatrix2) {
    let (width, height) = markers.size();
    let inv_h2 = spacing.recip().mul(spacing.recip());
    a.resize(width, height, FdmMatrixRow2::default());
    a.fill_with_index(|i, j| {
        if markers.get(i, j) != CellType::Fluid {
            return FdmMatrixRow2::IDENTITY;
        }
        let open = |ni: usize, nj: usize| markers.get(ni, nj) != CellType::Solid;
        let fluid = |ni: usize, nj: usize| markers.get(ni, nj) == CellType::Fluid;
        let mut row = FdmMatrixRow2::default();
        if i > 0 && open(i - 1, j) {
            row.center += inv_h2.x;
        }
        if i + 1 < width && open(i + 1, j) {
            row.center += inv_h2.x;
            if fluid(i + 1, j) {
                row.right = -inv_h2.x;
            }
        }
        if j > 0 && open(i, j - 1) {
            row.center += inv_h2.y;
        }
        if j + 1 < height && open(i, j + 1) {
            row.center += inv_h2.y;
            if fluid(i, j + 1) {
                row.up = -inv_h2.y;
            }
        }
        row
    });
}

/// `b = -div` of the input, with faces next to solids taking the boundary
/// velocity so that the projected field is consistent with the clamp.
fn build_rhs(
    input: &MacVelocity2,
    boundary_velocity: &dyn VectorField2,
    markers: &CellFlags,
    b: &mut FdmVector2,
) {
    let (width, height) = markers.size();
    let inv_h = input.grid().spacing().recip();
    let solid = |i: usize, j: usize| markers.get(i, j) == CellType::Solid;
    let u = |i: usize, j: usize| {
        if (i > 0 && solid(i - 1, j)) || (i < width && solid(i, j)) {
            boundary_velocity.sample(input.u_position(i, j)).x
        } else {
            input.u().get(i, j)
        }
    };
    let v = |i: usize, j: usize| {
        if (j > 0 && solid(i, j - 1)) || (j < height && solid(i, j)) {
            boundary_velocity.sample(input.v_position(i, j)).y
        } else {
            input.v().get(i, j)
        }
    };
    b.resize(width, height, 0.0);
    b.fill_with_index(|i, j| {
        if markers.get(i, j) != CellType::Fluid {
            return 0.0;
        }
        -((u(i + 1, j) - u(i, j)) * inv_h.x + (v(i, j + 1) - v(i, j)) * inv_h.y)
    });
}

fn zero_outside_fluid(markers: &CellFlags, x: &mut FdmVector2) {
    x.update_with_index(|i, j, value| {
        if markers.get(i, j) == CellType::Fluid {
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
    use crate::solver::{FdmMgSolver2, MgParameters};
    use crate::{CircleSdf2, ConstantScalarField2, ConstantVectorField2};
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn assert_close(a: f64, b: f64, tol: f64) {
        assert!(
            (a - b).abs() <= tol,
            "expected {a} to be within {tol} of {b}"
        );
    }

    fn closed_box_input() -> MacVelocity2 {
        let grid = Grid2::uniform(3, 3, 1.0);
        let mut input = MacVelocity2::new(grid, Vec2::zero());
        input
            .v_mut()
            .fill_with_index(|_, j| if j == 0 || j == 3 { 0.0 } else { 1.0 });
        input
    }

    fn solve_default(
        solver: &mut GridSinglePhasePressureSolver2,
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

    #[test]
    fn closed_box_comes_to_rest() {
        for use_compressed in [false, true] {
            let input = closed_box_input();
            let mut solver = GridSinglePhasePressureSolver2::new();
            let output = solve_default(
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
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..8 {
            let grid = Grid2::uniform(12, 10, 0.1);
            let boundary = CircleSdf2::new(
                Vec2::new(rng.gen_range(0.0..1.2), rng.gen_range(0.0..1.0)),
                rng.gen_range(0.05..0.4),
            );
            let level = rng.gen_range(0.2..1.0);
            let fluid = move |p: Vec2| p.y - level;
            let input = MacVelocity2::new(grid, Vec2::new(rng.gen_range(-1.0..1.0), 0.0));

            let mut solver = GridSinglePhasePressureSolver2::new();
            solver.build_markers(grid, &boundary, &fluid);
            solver.build_system(&input, &ConstantVectorField2::zero(), false);
            let markers = &solver.markers[0];
            assert_compressed_symmetric(&solver.system, |i, j| {
                markers.get(i, j) == CellType::Fluid
            });
            markers.for_each_index(|i, j| {
                if markers.get(i, j) == CellType::Fluid {
                    assert!(solver.system.a.get(i, j).center > 0.0);
                }
            });
        }
    }

    #[test]
    fn solid_faces_are_clamped_exactly() {
        let grid = Grid2::uniform(16, 16, 1.0 / 16.0);
        let sphere = CircleSdf2::new(Vec2::new(0.5, 0.5), 0.25);
        let input = MacVelocity2::new(grid, Vec2::new(1.0, 0.5));
        for wall in [Vec2::zero(), Vec2::new(0.25, -0.5)] {
            let mut solver = GridSinglePhasePressureSolver2::new();
            let output = solve_default(
                &mut solver,
                &input,
                &sphere,
                &ConstantVectorField2::new(wall),
                &ConstantScalarField2::full(),
                false,
            );
            let markers = flags_from_sdf(grid, &sphere, &ConstantScalarField2::full());
            let solid = |i: usize, j: usize| markers.get(i, j) == CellType::Solid;
            let mut checked = 0;
            for j in 0..16 {
                for i in 0..=16 {
                    if (i > 0 && solid(i - 1, j)) || (i < 16 && solid(i, j)) {
                        assert_eq!(output.u().get(i, j), wall.x);
                        checked += 1;
                    }
                }
            }
            for j in 0..=16 {
                for i in 0..16 {
                    if (j > 0 && solid(i, j - 1)) || (j < 16 && solid(i, j)) {
                        assert_eq!(output.v().get(i, j), wall.y);
                    }
                }
            }
            assert!(checked > 0);
        }
    }

    #[test]
    fn divergence_drops_inside_free_surface_blob() {
        let grid = Grid2::uniform(32, 32, 1.0 / 32.0);
        let blob = CircleSdf2::new(Vec2::new(0.5, 0.5), 0.3);
        let mut rng = StdRng::seed_from_u64(3);
        let mut input = MacVelocity2::new(grid, Vec2::zero());
        for value in input.u_mut().data_mut().as_mut_slice() {
            *value = rng.gen_range(-1.0..1.0);
        }
        for value in input.v_mut().data_mut().as_mut_slice() {
            *value = rng.gen_range(-1.0..1.0);
        }

        let mut solver = GridSinglePhasePressureSolver2::new();
        let output = solve_default(
            &mut solver,
            &input,
            &ConstantScalarField2::empty(),
            &ConstantVectorField2::zero(),
            &blob,
            false,
        );
        let markers = flags_from_sdf(grid, &ConstantScalarField2::empty(), &blob);
        let fluid_l2 = |velocity: &MacVelocity2| {
            let mut sum = 0.0;
            markers.for_each_index(|i, j| {
                if markers.get(i, j) == CellType::Fluid {
                    sum += velocity.divergence_at_cell_center(i, j).powi(2);
                }
            });
            sum.sqrt()
        };
        let before = fluid_l2(&input);
        let after = fluid_l2(&output);
        assert!(before > 1.0);
        assert!(after < 0.1 * before, "divergence {before} -> {after}");
    }

    #[test]
    fn flow_around_sphere_is_divergence_free_and_deflected() {
        let grid = Grid2::uniform(64, 32, 1.0 / 32.0);
        let sphere = CircleSdf2::new(Vec2::new(1.0, 0.5), 0.2);
        let input = MacVelocity2::new(grid, Vec2::new(1.0, 0.0));
        let mut solver = GridSinglePhasePressureSolver2::new();
        solver.set_linear_system_solver(Box::new(FdmIccgSolver2::new(1000, 1e-9)));
        let output = solve_default(
            &mut solver,
            &input,
            &sphere,
            &ConstantVectorField2::zero(),
            &ConstantScalarField2::full(),
            false,
        );

        let divergence = output.divergence();
        let (min, max) = divergence.min_max();
        assert!(min.abs().max(max.abs()) < 1e-5);

        let column_max = |i: usize| (0..=32).map(|j| output.v().get(i, j).abs()).fold(0.0, f64::max);
        let downstream = column_max(41);
        let upstream = column_max(2);
        assert!(downstream > 0.1, "downstream deflection {downstream}");
        assert!(upstream < 0.5 * downstream, "upstream {upstream} vs {downstream}");
    }

    #[test]
    fn default_solver_handles_flow_around_sphere() {
        let grid = Grid2::uniform(64, 32, 1.0 / 32.0);
        let sphere = CircleSdf2::new(Vec2::new(1.0, 0.5), 0.2);
        let input = MacVelocity2::new(grid, Vec2::new(1.0, 0.0));
        let mut solver = GridSinglePhasePressureSolver2::new();
        let output = solve_default(
            &mut solver,
            &input,
            &sphere,
            &ConstantVectorField2::zero(),
            &ConstantScalarField2::full(),
            false,
        );

        let result = solver.linear_system_solver().last_result();
        assert!(result.is_converged(), "stopped after {} iterations", result.iterations);
        let (min, max) = output.divergence().min_max();
        assert!(min.abs().max(max.abs()) < 1e-5, "divergence in [{min}, {max}]");
    }

    #[test]
    fn multigrid_matches_conjugate_gradient() {
        let grid = Grid2::uniform(32, 32, 1.0);
        let pool = |p: Vec2| p.y - 20.0;
        let mut input = MacVelocity2::new(grid, Vec2::zero());
        input.u_mut().fill_with_index(|i, _| (0.3 * i as f64).sin());
        input.v_mut().fill_with_index(|_, j| 0.5 * (0.2 * j as f64).cos());

        let mut cg = GridSinglePhasePressureSolver2::new();
        cg.set_linear_system_solver(Box::new(FdmIccgSolver2::new(1000, 1e-10)));
        let mut mg = GridSinglePhasePressureSolver2::new();
        mg.set_linear_system_solver(Box::new(FdmMgSolver2::new(MgParameters {
            max_number_of_levels: 3,
            max_tolerance: 1e-10,
            max_number_of_cycles: 200,
            ..MgParameters::default()
        })));

        let empty = ConstantScalarField2::empty();
        let still = ConstantVectorField2::zero();
        solve_default(&mut cg, &input, &empty, &still, &pool, false);
        solve_default(&mut mg, &input, &empty, &still, &pool, false);
        assert_eq!(mg.mg_system.number_of_levels(), 3);

        let reference = cg.pressure();
        let scale = reference.iter().fold(0.0_f64, |m, p| m.max(p.abs()));
        assert!(scale > 0.0);
        for (a, b) in mg.pressure().iter().zip(reference.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-6 * scale);
        }
    }

    #[test]
    fn isolated_fluid_cell_becomes_air() {
        let grid = Grid2::uniform(3, 3, 1.0);
        let walls = |p: Vec2| {
            if p.sub(Vec2::new(1.5, 1.5)).length() < 0.6 {
                1.0
            } else {
                -1.0
            }
        };
        let input = MacVelocity2::new(grid, Vec2::new(1.0, 1.0));
        let mut solver = GridSinglePhasePressureSolver2::new();
        let output = solve_default(
            &mut solver,
            &input,
            &walls,
            &ConstantVectorField2::zero(),
            &ConstantScalarField2::full(),
            false,
        );
        assert_eq!(solver.markers().map(|m| m.get(1, 1)), Some(CellType::Air));
        assert!(solver.pressure().iter().all(|p| *p == 0.0));
        assert_eq!(output.max_abs(), 0.0);
    }

    #[test]
    fn coarse_markers_follow_majority() {
        let fine = CellFlags::from_fn(4, 4, |i, _| {
            if i < 2 {
                CellType::Fluid
            } else {
                CellType::Air
            }
        });
        let mut coarse = CellFlags::default();
        coarsen_markers(&fine, (2, 2), &mut coarse);
        assert_eq!(coarse.get(0, 0), CellType::Fluid);
        assert_eq!(coarse.get(1, 1), CellType::Air);

        let tie = CellFlags::from_fn(2, 2, |i, _| {
            if i == 0 {
                CellType::Solid
            } else {
                CellType::Air
            }
        });
        coarsen_markers(&tie, (1, 1), &mut coarse);
        assert_eq!(coarse.get(0, 0), CellType::Air);
    }

    #[test]
    fn multigrid_solver_switches_systems() {
        let mut solver = GridSinglePhasePressureSolver2::new();
        let input = closed_box_input();
        solve_default(
            &mut solver,
            &input,
            &ConstantScalarField2::empty(),
            &ConstantVectorField2::zero(),
            &ConstantScalarField2::full(),
            false,
        );
        assert_eq!(solver.system.size(), (3, 3));

        solver.set_linear_system_solver(Box::new(FdmMgSolver2::new(MgParameters {
            max_number_of_levels: 2,
            ..MgParameters::default()
        })));
        assert_eq!(solver.system.size(), (0, 0));
        assert_eq!(solver.linear_system_solver().name(), "multigrid");
        solve_default(
            &mut solver,
            &input,
            &ConstantScalarField2::empty(),
            &ConstantVectorField2::zero(),
            &ConstantScalarField2::full(),
            false,
        );
        assert_eq!(solver.mg_system.number_of_levels(), 2);
        assert_eq!(solver.pressure().size(), (3, 3));

        solver.set_linear_system_solver(Box::new(FdmIccgSolver2::new(10, 1e-6)));
        assert_eq!(solver.mg_system.number_of_levels(), 0);
        assert_eq!(solver.suggested_boundary_condition(), BoundaryConditionKind::Blocked);
    }
}
