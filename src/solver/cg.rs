use super::{log_result, FdmLinearSystemSolver2, SolverResult};
use crate::{
    Blas, CsrMatrix, FdmBlas2, FdmCompressedBlas2, FdmCompressedLinearSystem2, FdmLinearSystem2,
    FdmMatrix2, FdmVector2,
};

const RESIDUAL_REFRESH_INTERVAL: usize = 50;

/// `x = M^-1 b` for some approximation `M` of the system matrix.
pub trait Preconditioner<B: Blas> {
    fn build(&mut self, matrix: &B::Matrix);

    fn solve(&mut self, b: &B::Vector, x: &mut B::Vector);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityPreconditioner;

impl<B: Blas> Preconditioner<B> for IdentityPreconditioner {
    fn build(&mut self, _matrix: &B::Matrix) {}

    fn solve(&mut self, b: &B::Vector, x: &mut B::Vector) {
        B::copy(b, x);
    }
}

/// Incomplete Cholesky factor of the 5-point stencil, `A ~ (D + L) D^-1 (D + L^T)`.
/// Only `D^-1` is stored; `L` is read straight from the matrix.
#[derive(Clone, Debug, Default)]
pub struct FdmIcPreconditioner2 {
    inv_d: FdmVector2,
    y: FdmVector2,
    a: FdmMatrix2,
}

impl Preconditioner<FdmBlas2> for FdmIcPreconditioner2 {
    fn build(&mut self, matrix: &FdmMatrix2) {
        let (width, height) = matrix.size();
        FdmBlas2::copy_matrix(matrix, &mut self.a);
        self.inv_d.resize(width, height, 0.0);
        self.y.resize(width, height, 0.0);
        for j in 0..height {
            for i in 0..width {
                let center = matrix.get(i, j).center;
                let mut denom = center;
                if i > 0 {
                    let right = matrix.get(i - 1, j).right;
                    denom -= right * right * self.inv_d.get(i - 1, j);
                }
                if j > 0 {
                    let up = matrix.get(i, j - 1).up;
                    denom -= up * up * self.inv_d.get(i, j - 1);
                }
                self.inv_d.set(i, j, safe_inverse(denom, center));
            }
        }
    }

    fn solve(&mut self, b: &FdmVector2, x: &mut FdmVector2) {
        let (width, height) = self.a.size();
        FdmBlas2::resize_like(b, x);
        for j in 0..height {
            for i in 0..width {
                let mut value = b.get(i, j);
                if i > 0 {
                    value -= self.a.get(i - 1, j).right * self.y.get(i - 1, j);
                }
                if j > 0 {
                    value -= self.a.get(i, j - 1).up * self.y.get(i, j - 1);
                }
                self.y.set(i, j, value * self.inv_d.get(i, j));
            }
        }
        for j in (0..height).rev() {
            for i in (0..width).rev() {
                let row = self.a.get(i, j);
                let mut upper = 0.0;
                if i + 1 < width {
                    upper += row.right * x.get(i + 1, j);
                }
                if j + 1 < height {
                    upper += row.up * x.get(i, j + 1);
                }
                x.set(i, j, self.y.get(i, j) - self.inv_d.get(i, j) * upper);
            }
        }
    }
}

/// The same factorisation over the lower triangle of a CSR matrix, without fill.
#[derive(Clone, Debug, Default)]
pub struct FdmCompressedIcPreconditioner2 {
    inv_d: Vec<f64>,
    y: Vec<f64>,
    a: CsrMatrix,
}

impl Preconditioner<FdmCompressedBlas2> for FdmCompressedIcPreconditioner2 {
    fn build(&mut self, matrix: &CsrMatrix) {
        let n = matrix.n_rows();
        self.a.clone_from(matrix);
        self.inv_d.clear();
        self.inv_d.resize(n, 0.0);
        self.y.resize(n, 0.0);
        for row in 0..n {
            let (cols, values) = matrix.row(row);
            let mut center = 0.0;
            let mut lower = 0.0;
            for (&col, &value) in cols.iter().zip(values) {
                if col < row {
                    lower += value * value * self.inv_d[col];
                } else if col == row {
                    center = value;
                }
            }
            self.inv_d[row] = safe_inverse(center - lower, center);
        }
    }

    fn solve(&mut self, b: &Vec<f64>, x: &mut Vec<f64>) {
        let n = self.a.n_rows();
        x.resize(n, 0.0);
        for row in 0..n {
            let (cols, values) = self.a.row(row);
            let lower: f64 = cols
                .iter()
                .zip(values)
                .filter(|(col, _)| **col < row)
                .map(|(col, value)| value * self.y[*col])
                .sum();
            self.y[row] = (b[row] - lower) * self.inv_d[row];
        }
        for row in (0..n).rev() {
            let (cols, values) = self.a.row(row);
            let upper: f64 = cols
                .iter()
                .zip(values)
                .filter(|(col, _)| **col > row)
                .map(|(col, value)| value * x[*col])
                .sum();
            x[row] = self.y[row] - self.inv_d[row] * upper;
        }
    }
}

fn safe_inverse(denom: f64, center: f64) -> f64 {
    if denom > f64::EPSILON * center.abs().max(1.0) {
        1.0 / denom
    } else if center > 0.0 {
        1.0 / center
    } else {
        0.0
    }
}

#[derive(Clone, Debug, Default)]
pub struct PcgScratch<V> {
    r: V,
    d: V,
    q: V,
    s: V,
}

/// Preconditioned conjugate gradient. `x` is the initial guess. Returns the
/// number of iterations and the final residual L2 norm.
pub fn pcg<B: Blas, P: Preconditioner<B>>(
    a: &B::Matrix,
    b: &B::Vector,
    x: &mut B::Vector,
    max_number_of_iterations: usize,
    tolerance: f64,
    preconditioner: &mut P,
    scratch: &mut PcgScratch<B::Vector>,
) -> (usize, f64) {
    let PcgScratch { r, d, q, s } = scratch;
    B::resize_like(x, q);
    B::residual(a, x, b, r);
    preconditioner.solve(r, d);
    let mut sigma_new = B::dot(r, d);
    let mut refresh = false;
    let mut iterations = 0;
    while B::l2_norm(r) > tolerance && iterations < max_number_of_iterations {
        B::mvm(a, d, q);
        let dq = B::dot(d, q);
        if dq == 0.0 || !dq.is_finite() {
            break;
        }
        let alpha = sigma_new / dq;
        B::axpy_in_place(alpha, d, x);
        if refresh || (iterations > 0 && iterations % RESIDUAL_REFRESH_INTERVAL == 0) {
            B::residual(a, x, b, r);
            refresh = false;
        } else {
            B::axpy_in_place(-alpha, q, r);
        }
        preconditioner.solve(r, s);
        let sigma_old = sigma_new;
        sigma_new = B::dot(r, s);
        if sigma_new > sigma_old {
            refresh = true;
        }
        iterations += 1;
        if sigma_old == 0.0 {
            break;
        }
        B::aypx(sigma_new / sigma_old, d, s);
    }
    (iterations, B::l2_norm(r))
}

/// Conjugate gradient without preconditioning.
#[derive(Clone, Debug)]
pub struct FdmCgSolver2 {
    max_number_of_iterations: usize,
    tolerance: f64,
    last_result: SolverResult,
    scratch: PcgScratch<FdmVector2>,
    scratch_comp: PcgScratch<Vec<f64>>,
}

impl FdmCgSolver2 {
    pub fn new(max_number_of_iterations: usize, tolerance: f64) -> Self {
        Self {
            max_number_of_iterations,
            tolerance,
            last_result: SolverResult::default(),
            scratch: PcgScratch::default(),
            scratch_comp: PcgScratch::default(),
        }
    }
}

impl FdmLinearSystemSolver2 for FdmCgSolver2 {
    fn solve(&mut self, system: &mut FdmLinearSystem2) -> bool {
        let (iterations, norm) = pcg::<FdmBlas2, _>(
            &system.a,
            &system.b,
            &mut system.x,
            self.max_number_of_iterations,
            self.tolerance,
            &mut IdentityPreconditioner,
            &mut self.scratch,
        );
        self.last_result = SolverResult::new(norm <= self.tolerance, iterations, norm);
        log_result(self.name(), &self.last_result);
        self.last_result.is_converged()
    }

    fn solve_compressed(&mut self, system: &mut FdmCompressedLinearSystem2) -> bool {
        let (iterations, norm) = pcg::<FdmCompressedBlas2, _>(
            &system.a,
            &system.b,
            &mut system.x,
            self.max_number_of_iterations,
            self.tolerance,
            &mut IdentityPreconditioner,
            &mut self.scratch_comp,
        );
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
        "cg"
    }
}

/// Conjugate gradient preconditioned with incomplete Cholesky.
#[derive(Clone, Debug)]
pub struct FdmIccgSolver2 {
    max_number_of_iterations: usize,
    tolerance: f64,
    last_result: SolverResult,
    preconditioner: FdmIcPreconditioner2,
    preconditioner_comp: FdmCompressedIcPreconditioner2,
    scratch: PcgScratch<FdmVector2>,
    scratch_comp: PcgScratch<Vec<f64>>,
}

impl FdmIccgSolver2 {
    pub fn new(max_number_of_iterations: usize, tolerance: f64) -> Self {
        Self {
            max_number_of_iterations,
            tolerance,
            last_result: SolverResult::default(),
            preconditioner: FdmIcPreconditioner2::default(),
            preconditioner_comp: FdmCompressedIcPreconditioner2::default(),
            scratch: PcgScratch::default(),
            scratch_comp: PcgScratch::default(),
        }
    }
}

impl FdmLinearSystemSolver2 for FdmIccgSolver2 {
    fn solve(&mut self, system: &mut FdmLinearSystem2) -> bool {
        self.preconditioner.build(&system.a);
        let (iterations, norm) = pcg::<FdmBlas2, _>(
            &system.a,
            &system.b,
            &mut system.x,
            self.max_number_of_iterations,
            self.tolerance,
            &mut self.preconditioner,
            &mut self.scratch,
        );
        self.last_result = SolverResult::new(norm <= self.tolerance, iterations, norm);
        log_result(self.name(), &self.last_result);
        self.last_result.is_converged()
    }

    fn solve_compressed(&mut self, system: &mut FdmCompressedLinearSystem2) -> bool {
        self.preconditioner_comp.build(&system.a);
        let (iterations, norm) = pcg::<FdmCompressedBlas2, _>(
            &system.a,
            &system.b,
            &mut system.x,
            self.max_number_of_iterations,
            self.tolerance,
            &mut self.preconditioner_comp,
            &mut self.scratch_comp,
        );
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
        "iccg"
    }
}
