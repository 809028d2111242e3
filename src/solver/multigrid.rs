use super::{
    log_result, pcg, FdmGaussSeidelSolver2, FdmLinearSystemSolver2, PcgScratch, Preconditioner,
    SolverResult,
};
use crate::{
    Array2, Blas, FdmBlas2, FdmCompressedLinearSystem2, FdmLinearSystem2, FdmMatrix2,
    FdmMatrixRow2, FdmVector2,
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MgParameters {
    pub max_number_of_levels: usize,
    pub number_of_restriction_iter: usize,
    pub number_of_correction_iter: usize,
    pub number_of_coarsest_iter: usize,
    pub number_of_final_iter: usize,
    pub max_tolerance: f64,
    pub sor_factor: f64,
    pub use_red_black_ordering: bool,
    pub max_number_of_cycles: usize,
    /// Run the V-cycles as the preconditioner of a conjugate gradient loop
    /// instead of iterating them directly. Each iteration counts as a cycle.
    pub use_conjugate_gradient: bool,
}

impl Default for MgParameters {
    fn default() -> Self {
        Self {
            max_number_of_levels: 1,
            number_of_restriction_iter: 5,
            number_of_correction_iter: 5,
            number_of_coarsest_iter: 20,
            number_of_final_iter: 20,
            max_tolerance: 1e-9,
            sor_factor: 1.0,
            use_red_black_ordering: true,
            max_number_of_cycles: 50,
            use_conjugate_gradient: true,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MgResult {
    pub last_residual_norm: f64,
    pub cycles: usize,
}

/// Level 0 is the finest grid; every following level halves the resolution.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FdmMgLinearSystem2 {
    pub a: Vec<FdmMatrix2>,
    pub x: Vec<FdmVector2>,
    pub b: Vec<FdmVector2>,
}

impl FdmMgLinearSystem2 {
    pub fn resize_with_finest(&mut self, width: usize, height: usize, max_number_of_levels: usize) {
        FdmMgUtils2::resize_array_with_finest(width, height, max_number_of_levels, &mut self.a);
        FdmMgUtils2::resize_array_with_finest(width, height, max_number_of_levels, &mut self.x);
        FdmMgUtils2::resize_array_with_finest(width, height, max_number_of_levels, &mut self.b);
    }

    pub fn resize_with_coarsest(&mut self, coarsest: (usize, usize), number_of_levels: usize) {
        FdmMgUtils2::resize_array_with_coarsest(coarsest, number_of_levels, &mut self.a);
        FdmMgUtils2::resize_array_with_coarsest(coarsest, number_of_levels, &mut self.x);
        FdmMgUtils2::resize_array_with_coarsest(coarsest, number_of_levels, &mut self.b);
    }

    pub fn clear(&mut self) {
        self.a.clear();
        self.x.clear();
        self.b.clear();
    }

    pub fn number_of_levels(&self) -> usize {
        self.a.len()
    }

    pub fn resolution(&self, level: usize) -> (usize, usize) {
        self.a[level].size()
    }
}

/// Grid transfer and hierarchy helpers.
pub struct FdmMgUtils2;

impl FdmMgUtils2 {
    pub fn level_resolutions(width: usize, height: usize, max_number_of_levels: usize) -> Vec<(usize, usize)> {
        let mut resolutions = Vec::new();
        if width == 0 || height == 0 {
            return resolutions;
        }
        let mut current = (width, height);
        resolutions.push(current);
        while resolutions.len() < max_number_of_levels {
            let next = (current.0 / 2, current.1 / 2);
            if next.0 < 1 || next.1 < 1 {
                break;
            }
            resolutions.push(next);
            current = next;
        }
        resolutions
    }

    pub fn resize_array_with_finest<T: Copy + Default + Send + Sync>(
        width: usize,
        height: usize,
        max_number_of_levels: usize,
        levels: &mut Vec<Array2<T>>,
    ) {
        let resolutions = Self::level_resolutions(width, height, max_number_of_levels);
        Self::resize_levels(&resolutions, levels);
    }

    pub fn resize_array_with_coarsest<T: Copy + Default + Send + Sync>(
        coarsest: (usize, usize),
        number_of_levels: usize,
        levels: &mut Vec<Array2<T>>,
    ) {
        let resolutions: Vec<(usize, usize)> = (0..number_of_levels)
            .map(|level| {
                let scale = 1usize << (number_of_levels - 1 - level);
                (coarsest.0 * scale, coarsest.1 * scale)
            })
            .collect();
        Self::resize_levels(&resolutions, levels);
    }

    fn resize_levels<T: Copy + Default + Send + Sync>(
        resolutions: &[(usize, usize)],
        levels: &mut Vec<Array2<T>>,
    ) {
        levels.truncate(resolutions.len());
        levels.resize_with(resolutions.len(), Array2::default);
        for (level, &(width, height)) in levels.iter_mut().zip(resolutions) {
            level.resize(width, height, T::default());
        }
    }

    /// Fine to coarse with the separable {1/8, 3/8, 3/8, 1/8} kernel. Taps
    /// past the fine boundary are clamped to the last fine index.
    pub fn restrict(finer: &FdmVector2, coarser: &mut FdmVector2) {
        const KERNEL: [f64; 4] = [0.125, 0.375, 0.375, 0.125];
        let (fine_w, fine_h) = finer.size();
        debug_assert!(coarser.width() * 2 <= fine_w && coarser.height() * 2 <= fine_h);
        let taps = |c: usize, n: usize| {
            [
                if c > 0 { 2 * c - 1 } else { 2 * c },
                2 * c,
                2 * c + 1,
                if 2 * c + 2 < n { 2 * c + 2 } else { 2 * c + 1 },
            ]
        };
        coarser.fill_with_index(|i, j| {
            let i_taps = taps(i, fine_w);
            let j_taps = taps(j, fine_h);
            let mut sum = 0.0;
            for (y, &fj) in j_taps.iter().enumerate() {
                for (x, &fi) in i_taps.iter().enumerate() {
                    sum += KERNEL[x] * KERNEL[y] * finer.get(fi, fj);
                }
            }
            sum
        });
    }

    /// Coarse to fine bilinear prolongation, added into `finer`.
    pub fn correct(coarser: &FdmVector2, finer: &mut FdmVector2) {
        finer.update_with_index(|i, j, value| value + Self::prolongate(coarser, i, j));
    }

    /// Like `correct`, but rows of `a` that are decoupled from every
    /// neighbour keep their value.
    pub fn correct_coupled(coarser: &FdmVector2, a: &FdmMatrix2, finer: &mut FdmVector2) {
        finer.update_with_index(|i, j, value| {
            if is_decoupled(a, i, j) {
                value
            } else {
                value + Self::prolongate(coarser, i, j)
            }
        });
    }

    fn prolongate(coarser: &FdmVector2, i: usize, j: usize) -> f64 {
        let taps = |f: usize, n: usize| {
            let c = (f / 2).min(n - 1);
            if f % 2 == 0 {
                ([if c > 0 { c - 1 } else { c }, c], [0.25, 0.75])
            } else {
                ([c, if c + 1 < n { c + 1 } else { c }], [0.75, 0.25])
            }
        };
        let (i_taps, i_weights) = taps(i, coarser.width());
        let (j_taps, j_weights) = taps(j, coarser.height());
        let mut sum = 0.0;
        for y in 0..2 {
            for x in 0..2 {
                sum += i_weights[x] * j_weights[y] * coarser.get(i_taps[x], j_taps[y]);
            }
        }
        sum
    }

    /// Galerkin coarsening `1/8 P^T A P` with piecewise-constant `P` over
    /// 2x2 blocks; an odd trailing fine row or column joins the last block.
    pub fn coarsen_matrix(finer: &FdmMatrix2, coarser: &mut FdmMatrix2) {
        let (fine_w, fine_h) = finer.size();
        let (coarse_w, coarse_h) = coarser.size();
        let span = |c: usize, coarse_n: usize, fine_n: usize| {
            let end = if c + 1 == coarse_n { fine_n } else { 2 * c + 2 };
            2 * c..end
        };
        coarser.fill_with_index(|ci, cj| {
            let xs = span(ci, coarse_w, fine_w);
            let ys = span(cj, coarse_h, fine_h);
            let mut row = FdmMatrixRow2::default();
            for fj in ys.clone() {
                for fi in xs.clone() {
                    let fine = finer.get(fi, fj);
                    row.center += fine.center;
                    if fi + 1 < xs.end {
                        row.center += 2.0 * fine.right;
                    }
                    if fj + 1 < ys.end {
                        row.center += 2.0 * fine.up;
                    }
                }
            }
            if ci + 1 < coarse_w {
                row.right = ys.clone().map(|fj| finer.get(xs.end - 1, fj).right).sum();
            }
            if cj + 1 < coarse_h {
                row.up = xs.clone().map(|fi| finer.get(fi, ys.end - 1).up).sum();
            }
            FdmMatrixRow2 {
                center: row.center * 0.125,
                right: row.right * 0.125,
                up: row.up * 0.125,
            }
        });
    }
}

/// A row with no off-diagonal coupling in either direction. Cells outside
/// the fluid are stored this way and never take a coarse correction.
pub(crate) fn is_decoupled(a: &FdmMatrix2, i: usize, j: usize) -> bool {
    let row = a.get(i, j);
    row.right == 0.0
        && row.up == 0.0
        && (i == 0 || a.get(i - 1, j).right == 0.0)
        && (j == 0 || a.get(i, j - 1).up == 0.0)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Sweep {
    Forward,
    Backward,
}

/// Backward sweeps visit cells in the opposite order of forward ones, so a
/// cycle that pre-smooths forward and post-smooths backward is symmetric.
fn relax(
    a: &FdmMatrix2,
    b: &FdmVector2,
    x: &mut FdmVector2,
    iterations: usize,
    params: &MgParameters,
    sweep: Sweep,
    snapshot: &mut FdmVector2,
) {
    let omega = params.sor_factor;
    for _ in 0..iterations {
        match (params.use_red_black_ordering, sweep) {
            (true, Sweep::Forward) => {
                FdmGaussSeidelSolver2::relax_red_black(a, b, omega, x, snapshot)
            }
            (true, Sweep::Backward) => {
                FdmGaussSeidelSolver2::relax_black_red(a, b, omega, x, snapshot)
            }
            (false, Sweep::Forward) => FdmGaussSeidelSolver2::relax(a, b, omega, x),
            (false, Sweep::Backward) => FdmGaussSeidelSolver2::relax_backward(a, b, omega, x),
        }
    }
}

/// One V-cycle: a down-sweep that smooths and restricts residuals into the
/// coarser right-hand sides, a coarsest-level relaxation, and an up-sweep
/// that adds the prolonged corrections and smooths again. `b[0]` is read
/// only; `b[1..]` and `x[1..]` are overwritten. Returns the finest residual norm.
pub fn mg_v_cycle(
    a: &[FdmMatrix2],
    params: &MgParameters,
    x: &mut [FdmVector2],
    b: &mut [FdmVector2],
    buffer: &mut [FdmVector2],
    snapshot: &mut FdmVector2,
) -> f64 {
    v_cycle(a, params, x, b, buffer, snapshot);
    FdmBlas2::residual(&a[0], &x[0], &b[0], &mut buffer[0]);
    FdmBlas2::l2_norm(&buffer[0])
}

fn v_cycle(
    a: &[FdmMatrix2],
    params: &MgParameters,
    x: &mut [FdmVector2],
    b: &mut [FdmVector2],
    buffer: &mut [FdmVector2],
    snapshot: &mut FdmVector2,
) {
    let levels = a.len();
    assert!(levels > 0, "multigrid system has no levels");
    assert!(x.len() == levels && b.len() == levels && buffer.len() == levels, "level count mismatch");
    let coarsest = levels - 1;

    for level in 0..coarsest {
        let iterations = params.number_of_restriction_iter;
        let (a_l, b_l) = (&a[level], &b[level]);
        relax(a_l, b_l, &mut x[level], iterations, params, Sweep::Forward, snapshot);
        FdmBlas2::residual(&a[level], &x[level], &b[level], &mut buffer[level]);
        FdmMgUtils2::restrict(&buffer[level], &mut b[level + 1]);
        let coarse_a = &a[level + 1];
        b[level + 1].update_with_index(|i, j, value| {
            if is_decoupled(coarse_a, i, j) {
                0.0
            } else {
                value
            }
        });
        FdmBlas2::set(0.0, &mut x[level + 1]);
    }

    let (a_c, b_c, x_c) = (&a[coarsest], &b[coarsest], &mut x[coarsest]);
    let backward = params.number_of_coarsest_iter / 2;
    let forward = params.number_of_coarsest_iter - backward;
    relax(a_c, b_c, x_c, forward, params, Sweep::Forward, snapshot);
    relax(a_c, b_c, x_c, backward, params, Sweep::Backward, snapshot);

    for level in (0..coarsest).rev() {
        {
            let (finer, coarser) = x.split_at_mut(level + 1);
            FdmMgUtils2::correct_coupled(&coarser[0], &a[level], &mut finer[level]);
        }
        let iterations = if level == 0 {
            params.number_of_final_iter
        } else {
            params.number_of_correction_iter
        };
        relax(&a[level], &b[level], &mut x[level], iterations, params, Sweep::Backward, snapshot);
    }
}

/// `z = V(r)`: one V-cycle from a zero guess with `r` as the finest
/// right-hand side. The hierarchy's own `x` and `b` stay untouched.
struct VCyclePreconditioner<'a> {
    a: &'a [FdmMatrix2],
    params: &'a MgParameters,
    x: &'a mut [FdmVector2],
    b: &'a mut [FdmVector2],
    buffer: &'a mut [FdmVector2],
    snapshot: &'a mut FdmVector2,
}

impl Preconditioner<FdmBlas2> for VCyclePreconditioner<'_> {
    // The caller assembles every level before solving.
    fn build(&mut self, _matrix: &FdmMatrix2) {}

    fn solve(&mut self, r: &FdmVector2, z: &mut FdmVector2) {
        FdmBlas2::copy(r, &mut self.b[0]);
        FdmBlas2::resize_like(r, &mut self.x[0]);
        FdmBlas2::set(0.0, &mut self.x[0]);
        v_cycle(self.a, self.params, self.x, self.b, self.buffer, self.snapshot);
        FdmBlas2::copy(&self.x[0], z);
    }
}

fn resize_levels_like(like: &[FdmVector2], levels: &mut Vec<FdmVector2>) {
    levels.truncate(like.len());
    levels.resize_with(like.len(), FdmVector2::default);
    for (level, like) in levels.iter_mut().zip(like) {
        FdmBlas2::resize_like(like, level);
    }
}

#[derive(Clone, Debug)]
pub struct FdmMgSolver2 {
    params: MgParameters,
    last_result: SolverResult,
    last_mg_result: MgResult,
    hierarchy: FdmMgLinearSystem2,
    buffer: Vec<FdmVector2>,
    snapshot: FdmVector2,
    precond_x: Vec<FdmVector2>,
    precond_b: Vec<FdmVector2>,
    pcg_scratch: PcgScratch<FdmVector2>,
    fallback: FdmGaussSeidelSolver2,
}

impl FdmMgSolver2 {
    pub fn new(params: MgParameters) -> Self {
        let sweeps = params.number_of_restriction_iter
            + params.number_of_correction_iter
            + params.number_of_final_iter;
        let fallback = FdmGaussSeidelSolver2::new(
            params.max_number_of_cycles * sweeps.max(1),
            10,
            params.max_tolerance,
            params.sor_factor,
            false,
        );
        Self {
            params,
            last_result: SolverResult::default(),
            last_mg_result: MgResult::default(),
            hierarchy: FdmMgLinearSystem2::default(),
            buffer: Vec::new(),
            snapshot: FdmVector2::default(),
            precond_x: Vec::new(),
            precond_b: Vec::new(),
            pcg_scratch: PcgScratch::default(),
            fallback,
        }
    }

    pub fn params(&self) -> &MgParameters {
        &self.params
    }

    pub fn last_mg_result(&self) -> MgResult {
        self.last_mg_result
    }

    /// Runs V-cycles on a caller-built hierarchy, directly or as the PCG
    /// preconditioner, until the finest residual drops to `max_tolerance`
    /// or the cycle cap is reached.
    pub fn solve_multigrid(&mut self, system: &mut FdmMgLinearSystem2) -> bool {
        let levels = system.number_of_levels();
        if levels == 0 {
            self.last_mg_result = MgResult::default();
            self.last_result = SolverResult::new(true, 0, 0.0);
            return true;
        }
        resize_levels_like(&system.x, &mut self.buffer);

        let (cycles, norm) = if self.params.use_conjugate_gradient {
            self.run_preconditioned(system)
        } else {
            self.run_cycles(system)
        };

        self.last_mg_result = MgResult {
            last_residual_norm: norm,
            cycles,
        };
        self.last_result = SolverResult::new(norm <= self.params.max_tolerance, cycles, norm);
        log_result(self.name(), &self.last_result);
        self.last_result.is_converged()
    }

    fn run_cycles(&mut self, system: &mut FdmMgLinearSystem2) -> (usize, f64) {
        FdmBlas2::residual(&system.a[0], &system.x[0], &system.b[0], &mut self.buffer[0]);
        let mut norm = FdmBlas2::l2_norm(&self.buffer[0]);
        let mut cycles = 0;
        while norm > self.params.max_tolerance && cycles < self.params.max_number_of_cycles {
            norm = mg_v_cycle(
                &system.a,
                &self.params,
                &mut system.x,
                &mut system.b,
                &mut self.buffer,
                &mut self.snapshot,
            );
            cycles += 1;
            log::trace!("multigrid cycle {cycles}: residual {norm:.3e}");
        }
        (cycles, norm)
    }

    fn run_preconditioned(&mut self, system: &mut FdmMgLinearSystem2) -> (usize, f64) {
        resize_levels_like(&system.x, &mut self.precond_x);
        resize_levels_like(&system.x, &mut self.precond_b);
        let mut preconditioner = VCyclePreconditioner {
            a: &system.a,
            params: &self.params,
            x: &mut self.precond_x,
            b: &mut self.precond_b,
            buffer: &mut self.buffer,
            snapshot: &mut self.snapshot,
        };
        pcg::<FdmBlas2, _>(
            &system.a[0],
            &system.b[0],
            &mut system.x[0],
            self.params.max_number_of_cycles,
            self.params.max_tolerance,
            &mut preconditioner,
            &mut self.pcg_scratch,
        )
    }
}

impl FdmLinearSystemSolver2 for FdmMgSolver2 {
    fn solve(&mut self, system: &mut FdmLinearSystem2) -> bool {
        let (width, height) = system.size();
        if width == 0 || height == 0 {
            self.last_result = SolverResult::new(true, 0, 0.0);
            return true;
        }
        let mut hierarchy = std::mem::take(&mut self.hierarchy);
        hierarchy.resize_with_finest(width, height, self.params.max_number_of_levels);
        FdmBlas2::copy_matrix(&system.a, &mut hierarchy.a[0]);
        FdmBlas2::copy(&system.x, &mut hierarchy.x[0]);
        FdmBlas2::copy(&system.b, &mut hierarchy.b[0]);
        for level in 1..hierarchy.number_of_levels() {
            let (finer, coarser) = hierarchy.a.split_at_mut(level);
            FdmMgUtils2::coarsen_matrix(&finer[level - 1], &mut coarser[0]);
        }
        let converged = self.solve_multigrid(&mut hierarchy);
        FdmBlas2::copy(&hierarchy.x[0], &mut system.x);
        self.hierarchy = hierarchy;
        converged
    }

    fn solve_compressed(&mut self, system: &mut FdmCompressedLinearSystem2) -> bool {
        let converged = self.fallback.solve_compressed(system);
        self.last_result = self.fallback.last_result();
        self.last_mg_result = MgResult {
            last_residual_norm: self.last_result.residual_norm,
            cycles: 0,
        };
        converged
    }

    fn last_result(&self) -> SolverResult {
        self.last_result
    }

    fn tolerance(&self) -> f64 {
        self.params.max_tolerance
    }

    fn max_number_of_iterations(&self) -> usize {
        self.params.max_number_of_cycles
    }

    fn name(&self) -> &'static str {
        "multigrid"
    }

    fn as_multigrid(&self) -> Option<&FdmMgSolver2> {
        Some(self)
    }

    fn as_multigrid_mut(&mut self) -> Option<&mut FdmMgSolver2> {
        Some(self)
    }
}
