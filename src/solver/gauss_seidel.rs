use super::{log_result, FdmLinearSystemSolver2, SolverResult};
use crate::{
    Blas, CsrMatrix, FdmBlas2, FdmCompressedBlas2, FdmCompressedLinearSystem2, FdmLinearSystem2,
    FdmMatrix2, FdmVector2,
};

/// Gauss-Seidel with successive over-relaxation. With red-black ordering each
/// colour only reads the other colour, so a colour is one parallel sweep.
#[derive(Clone, Debug)]
pub struct FdmGaussSeidelSolver2 {
    max_number_of_iterations: usize,
    residual_check_interval: usize,
    tolerance: f64,
    sor_factor: f64,
    use_red_black_ordering: bool,
    last_result: SolverResult,
    residual: FdmVector2,
    snapshot: FdmVector2,
    residual_comp: Vec<f64>,
}

impl FdmGaussSeidelSolver2 {
    pub fn new(
        max_number_of_iterations: usize,
        residual_check_interval: usize,
        tolerance: f64,
        sor_factor: f64,
        use_red_black_ordering: bool,
    ) -> Self {
        Self {
            max_number_of_iterations,
            residual_check_interval: residual_check_interval.max(1),
            tolerance,
            sor_factor,
            use_red_black_ordering,
            last_result: SolverResult::default(),
            residual: FdmVector2::default(),
            snapshot: FdmVector2::default(),
            residual_comp: Vec::new(),
        }
    }

    pub fn sor_factor(&self) -> f64 {
        self.sor_factor
    }

    pub fn use_red_black_ordering(&self) -> bool {
        self.use_red_black_ordering
    }

    /// One lexicographic sweep, reading already-updated neighbours.
    pub fn relax(a: &FdmMatrix2, b: &FdmVector2, sor_factor: f64, x: &mut FdmVector2) {
        for j in 0..a.height() {
            for i in 0..a.width() {
                let center = a.get(i, j).center;
                if center == 0.0 {
                    continue;
                }
                let off = FdmBlas2::off_diagonal_product(a, x, i, j);
                let value = x.get(i, j);
                x.set(i, j, (1.0 - sor_factor) * value + sor_factor * (b.get(i, j) - off) / center);
            }
        }
    }

    /// The lexicographic sweep run in reverse. Pairing it with `relax` gives a
    /// symmetric smoother.
    pub fn relax_backward(a: &FdmMatrix2, b: &FdmVector2, sor_factor: f64, x: &mut FdmVector2) {
        for j in (0..a.height()).rev() {
            for i in (0..a.width()).rev() {
                let center = a.get(i, j).center;
                if center == 0.0 {
                    continue;
                }
                let off = FdmBlas2::off_diagonal_product(a, x, i, j);
                let value = x.get(i, j);
                x.set(i, j, (1.0 - sor_factor) * value + sor_factor * (b.get(i, j) - off) / center);
            }
        }
    }

    /// Red cells (even `i + j`) first, then black. `snapshot` is scratch.
    pub fn relax_red_black(
        a: &FdmMatrix2,
        b: &FdmVector2,
        sor_factor: f64,
        x: &mut FdmVector2,
        snapshot: &mut FdmVector2,
    ) {
        for color in [0, 1] {
            Self::relax_color(a, b, sor_factor, x, snapshot, color);
        }
    }

    /// Black cells first, then red: the adjoint of `relax_red_black`.
    pub fn relax_black_red(
        a: &FdmMatrix2,
        b: &FdmVector2,
        sor_factor: f64,
        x: &mut FdmVector2,
        snapshot: &mut FdmVector2,
    ) {
        for color in [1, 0] {
            Self::relax_color(a, b, sor_factor, x, snapshot, color);
        }
    }

    fn relax_color(
        a: &FdmMatrix2,
        b: &FdmVector2,
        sor_factor: f64,
        x: &mut FdmVector2,
        snapshot: &mut FdmVector2,
        color: usize,
    ) {
        FdmBlas2::copy(x, snapshot);
        let snapshot = &*snapshot;
        x.update_with_index(|i, j, value| {
            if (i + j) % 2 != color {
                return value;
            }
            let center = a.get(i, j).center;
            if center == 0.0 {
                return value;
            }
            let off = FdmBlas2::off_diagonal_product(a, snapshot, i, j);
            (1.0 - sor_factor) * value + sor_factor * (b.get(i, j) - off) / center
        });
    }

    pub fn relax_compressed(a: &CsrMatrix, b: &[f64], sor_factor: f64, x: &mut [f64]) {
        for row in 0..a.n_rows() {
            let (cols, values) = a.row(row);
            let mut diag = 0.0;
            let mut sum = 0.0;
            for (&col, &value) in cols.iter().zip(values) {
                if col == row {
                    diag = value;
                } else {
                    sum += value * x[col];
                }
            }
            if diag == 0.0 {
                continue;
            }
            x[row] = (1.0 - sor_factor) * x[row] + sor_factor * (b[row] - sum) / diag;
        }
    }

    fn sweep(&mut self, system: &mut FdmLinearSystem2) {
        if self.use_red_black_ordering {
            Self::relax_red_black(
                &system.a,
                &system.b,
                self.sor_factor,
                &mut system.x,
                &mut self.snapshot,
            );
        } else {
            Self::relax(&system.a, &system.b, self.sor_factor, &mut system.x);
        }
    }
}

impl FdmLinearSystemSolver2 for FdmGaussSeidelSolver2 {
    fn solve(&mut self, system: &mut FdmLinearSystem2) -> bool {
        let mut iterations = 0;
        while iterations < self.max_number_of_iterations {
            self.sweep(system);
            iterations += 1;
            if iterations % self.residual_check_interval == 0 {
                FdmBlas2::residual(&system.a, &system.x, &system.b, &mut self.residual);
                if FdmBlas2::l2_norm(&self.residual) < self.tolerance {
                    break;
                }
            }
        }
        FdmBlas2::residual(&system.a, &system.x, &system.b, &mut self.residual);
        let norm = FdmBlas2::l2_norm(&self.residual);
        self.last_result = SolverResult::new(norm <= self.tolerance, iterations, norm);
        log_result(self.name(), &self.last_result);
        self.last_result.is_converged()
    }

    fn solve_compressed(&mut self, system: &mut FdmCompressedLinearSystem2) -> bool {
        let mut iterations = 0;
        while iterations < self.max_number_of_iterations {
            Self::relax_compressed(&system.a, &system.b, self.sor_factor, &mut system.x);
            iterations += 1;
            if iterations % self.residual_check_interval == 0 {
                FdmCompressedBlas2::residual(&system.a, &system.x, &system.b, &mut self.residual_comp);
                if FdmCompressedBlas2::l2_norm(&self.residual_comp) < self.tolerance {
                    break;
                }
            }
        }
        FdmCompressedBlas2::residual(&system.a, &system.x, &system.b, &mut self.residual_comp);
        let norm = FdmCompressedBlas2::l2_norm(&self.residual_comp);
        self.last_result = SolverResult::new(norm <= self.tolerance, iterations, norm);
        log_result(self.name(), &self.last_result);
        self.last_result.is_converged()
    }

    fn last_result(&self) -> SolverResult {
        self.last_result
    }

    fn tolerance(&self) -> f64 {
        self.tolerance
    }

    fn max_number_of_iterations(&self) -> usize {
        self.max_number_of_iterations
    }

    fn name(&self) -> &'static str {
        "gauss_seidel"
    }
}
