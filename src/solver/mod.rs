mod cg;
mod gauss_seidel;
mod jacobi;
mod multigrid;

pub use cg::{
    pcg, FdmCgSolver2, FdmCompressedIcPreconditioner2, FdmIcPreconditioner2, FdmIccgSolver2,
    IdentityPreconditioner, PcgScratch, Preconditioner,
};
pub use gauss_seidel::FdmGaussSeidelSolver2;
pub use jacobi::FdmJacobiSolver2;
pub use multigrid::{
    mg_v_cycle, FdmMgLinearSystem2, FdmMgSolver2, FdmMgUtils2, MgParameters, MgResult,
};

use crate::{FdmCompressedLinearSystem2, FdmLinearSystem2};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SolverStatus {
    Converged,
    #[default]
    MaxIterationsReached,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SolverResult {
    pub status: SolverStatus,
    pub iterations: usize,
    pub residual_norm: f64,
}

impl SolverResult {
    pub fn new(converged: bool, iterations: usize, residual_norm: f64) -> Self {
        let status = if converged {
            SolverStatus::Converged
        } else {
            SolverStatus::MaxIterationsReached
        };
        Self {
            status,
            iterations,
            residual_norm,
        }
    }

    pub fn is_converged(&self) -> bool {
        self.status == SolverStatus::Converged
    }
}

/// Solves `A x = b` in place. `A` and `b` are never modified; `x` is used as
/// the initial guess. Returns whether the tolerance was reached.
pub trait FdmLinearSystemSolver2: Send {
    fn solve(&mut self, system: &mut FdmLinearSystem2) -> bool;

    fn solve_compressed(&mut self, system: &mut FdmCompressedLinearSystem2) -> bool;

    fn last_result(&self) -> SolverResult;

    fn tolerance(&self) -> f64;

    fn max_number_of_iterations(&self) -> usize;

    fn name(&self) -> &'static str;

    fn as_multigrid(&self) -> Option<&FdmMgSolver2> {
        None
    }

    fn as_multigrid_mut(&mut self) -> Option<&mut FdmMgSolver2> {
        None
    }
}

pub(crate) fn log_result(name: &str, result: &SolverResult) {
    log::debug!(
        "{name}: {:?} after {} iterations, residual {:.3e}",
        result.status,
        result.iterations,
        result.residual_norm
    );
}
