use super::{log_result, FdmLinearSystemSolver2, SolverResult};
use crate::parallel::for_each_enumerated;
use crate::{
    Blas, CsrMatrix, FdmBlas2, FdmCompressedBlas2, FdmCompressedLinearSystem2, FdmLinearSystem2,
    FdmMatrix2, FdmVector2,
};

#[derive(Clone, Debug)]
pub struct FdmJacobiSolver2 {
    max_number_of_iterations: usize,
    residual_check_interval: usize,
    tolerance: f64,
    last_result: SolverResult,
    x_temp: FdmVector2,
    residual: FdmVector2,
    x_temp_comp: Vec<f64>,
    residual_comp: Vec<f64>,
}

impl FdmJacobiSolver2 {
    pub fn new(max_number_of_iterations: usize, residual_check_interval: usize, tolerance: f64) -> Self {
        Self {
            max_number_of_iterations,
            residual_check_interval: residual_check_interval.max(1),
            tolerance,
            last_result: SolverResult::default(),
            x_temp: FdmVector2::default(),
            residual: FdmVector2::default(),
            x_temp_comp: Vec::new(),
            residual_comp: Vec::new(),
        }
    }

    pub fn residual_check_interval(&self) -> usize {
        self.residual_check_interval
    }

    pub fn relax(a: &FdmMatrix2, b: &FdmVector2, x: &FdmVector2, x_temp: &mut FdmVector2) {
        FdmBlas2::resize_like(x, x_temp);
        x_temp.fill_with_index(|i, j| {
            let center = a.get(i, j).center;
            if center == 0.0 {
                return x.get(i, j);
            }
            (b.get(i, j) - FdmBlas2::off_diagonal_product(a, x, i, j)) / center
        });
    }

    pub fn relax_compressed(a: &CsrMatrix, b: &[f64], x: &[f64], x_temp: &mut Vec<f64>) {
        x_temp.resize(x.len(), 0.0);
        for_each_enumerated(x_temp, |row, slot| {
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
            *slot = if diag == 0.0 { x[row] } else { (b[row] - sum) / diag };
        });
    }
}

impl FdmLinearSystemSolver2 for FdmJacobiSolver2 {
    fn solve(&mut self, system: &mut FdmLinearSystem2) -> bool {
        FdmBlas2::resize_like(&system.x, &mut self.residual);
        let mut iterations = 0;
        while iterations < self.max_number_of_iterations {
            Self::relax(&system.a, &system.b, &system.x, &mut self.x_temp);
            std::mem::swap(&mut system.x, &mut self.x_temp);
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
        FdmCompressedBlas2::resize_like(&system.x, &mut self.residual_comp);
        let mut iterations = 0;
        while iterations < self.max_number_of_iterations {
            Self::relax_compressed(&system.a, &system.b, &system.x, &mut self.x_temp_comp);
            std::mem::swap(&mut system.x, &mut self.x_temp_comp);
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
        "jacobi"
    }
}
