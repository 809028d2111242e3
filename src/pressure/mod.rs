mod fractional;
mod single_phase;

pub use fractional::GridFractionalSinglePhasePressureSolver2;
pub use single_phase::GridSinglePhasePressureSolver2;

use crate::solver::FdmLinearSystemSolver2;
use crate::{
    Array2, CsrMatrix, FdmCompressedLinearSystem2, FdmLinearSystem2, FdmVector2, MacVelocity2,
    ScalarField2, VectorField2,
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// How a pressure solver expects solid boundaries to be represented.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryConditionKind {
    /// Whole cells are either solid or open.
    Blocked,
    /// Faces carry a continuous open-area fraction.
    Fractional,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PressureSolverKind {
    #[default]
    SinglePhase,
    Fractional,
}

impl PressureSolverKind {
    pub fn build(self) -> Box<dyn GridPressureSolver2> {
        match self {
            Self::SinglePhase => Box::new(GridSinglePhasePressureSolver2::new()),
            Self::Fractional => Box::new(GridFractionalSinglePhasePressureSolver2::new()),
        }
    }
}

/// Projects a face-centred velocity onto its divergence-free part inside the
/// fluid. Pressure is expressed in velocity-times-length units, so `dt` does
/// not enter the system.
pub trait GridPressureSolver2: Send {
    #[allow(clippy::too_many_arguments)]
    fn solve(
        &mut self,
        input: &MacVelocity2,
        dt: f64,
        output: &mut MacVelocity2,
        boundary_sdf: &dyn ScalarField2,
        boundary_velocity: &dyn VectorField2,
        fluid_sdf: &dyn ScalarField2,
        use_compressed: bool,
    );

    /// Cell-centred pressure from the last solve.
    fn pressure(&self) -> &FdmVector2;

    fn linear_system_solver(&self) -> &dyn FdmLinearSystemSolver2;

    fn set_linear_system_solver(&mut self, solver: Box<dyn FdmLinearSystemSolver2>);

    fn suggested_boundary_condition(&self) -> BoundaryConditionKind;
}

pub(crate) const NO_ROW: usize = usize::MAX;

/// Finds connected regions of unknown cells that cannot reach a Dirichlet
/// cell through an open face and returns the first cell of each in
/// row-major order. `open(a, b)` is only asked about in-range neighbours.
pub(crate) fn find_enclosed_regions(
    width: usize,
    height: usize,
    is_unknown: impl Fn(usize, usize) -> bool,
    open: impl Fn((usize, usize), (usize, usize)) -> bool,
) -> Vec<(usize, usize)> {
    let mut visited = Array2::new(width, height, false);
    let mut queue = VecDeque::new();
    let mut pinned = Vec::new();
    for j in 0..height {
        for i in 0..width {
            if visited.get(i, j) || !is_unknown(i, j) {
                continue;
            }
            visited.set(i, j, true);
            queue.push_back((i, j));
            let mut reaches_dirichlet = false;
            while let Some(cell) = queue.pop_front() {
                for neighbor in neighbors(cell, width, height) {
                    if !open(cell, neighbor) {
                        continue;
                    }
                    if !is_unknown(neighbor.0, neighbor.1) {
                        reaches_dirichlet = true;
                    } else if !visited.get(neighbor.0, neighbor.1) {
                        visited.set(neighbor.0, neighbor.1, true);
                        queue.push_back(neighbor);
                    }
                }
            }
            if !reaches_dirichlet {
                pinned.push((i, j));
            }
        }
    }
    if !pinned.is_empty() {
        log::debug!("pinned {} enclosed fluid region(s) on a {width}x{height} grid", pinned.len());
    }
    pinned
}

fn neighbors(
    (i, j): (usize, usize),
    width: usize,
    height: usize,
) -> impl Iterator<Item = (usize, usize)> {
    let left = (i > 0).then(|| (i - 1, j));
    let right = (i + 1 < width).then_some((i + 1, j));
    let down = (j > 0).then(|| (i, j - 1));
    let up = (j + 1 < height).then_some((i, j + 1));
    [left, right, down, up].into_iter().flatten()
}

/// Row-major row numbers for the unknown cells; everything else is `NO_ROW`.
pub(crate) fn build_row_indices(
    width: usize,
    height: usize,
    is_unknown: impl Fn(usize, usize) -> bool,
    indices: &mut Array2<usize>,
) -> usize {
    indices.resize(width, height, NO_ROW);
    let mut next = 0;
    for j in 0..height {
        for i in 0..width {
            if is_unknown(i, j) {
                indices.set(i, j, next);
                next += 1;
            } else {
                indices.set(i, j, NO_ROW);
            }
        }
    }
    next
}

/// Copies the unknown rows of a stencil system into CSR form. The current
/// stencil `x` seeds the compressed initial guess.
pub(crate) fn compress_system(
    system: &FdmLinearSystem2,
    indices: &Array2<usize>,
    rows: usize,
    compressed: &mut FdmCompressedLinearSystem2,
) {
    let (width, height) = system.size();
    let mut a = CsrMatrix::new(rows);
    compressed.x.clear();
    compressed.b.clear();
    let mut entries = Vec::with_capacity(5);
    for j in 0..height {
        for i in 0..width {
            let row = indices.get(i, j);
            if row == NO_ROW {
                continue;
            }
            let stencil = system.a.get(i, j);
            entries.clear();
            entries.push((row, stencil.center));
            let mut couple = |col: usize, value: f64| {
                if col != NO_ROW && value != 0.0 {
                    entries.push((col, value));
                }
            };
            if i > 0 {
                couple(indices.get(i - 1, j), system.a.get(i - 1, j).right);
            }
            if i + 1 < width {
                couple(indices.get(i + 1, j), stencil.right);
            }
            if j > 0 {
                couple(indices.get(i, j - 1), system.a.get(i, j - 1).up);
            }
            if j + 1 < height {
                couple(indices.get(i, j + 1), stencil.up);
            }
            a.add_row(&mut entries);
            compressed.x.push(system.x.get(i, j));
            compressed.b.push(system.b.get(i, j));
        }
    }
    compressed.a = a;
}

/// Scatters a compressed solution back to the grid; cells without a row get
/// zero pressure.
pub(crate) fn decompress_solution(solution: &[f64], indices: &Array2<usize>, x: &mut FdmVector2) {
    x.resize(indices.width(), indices.height(), 0.0);
    x.fill_with_index(|i, j| match indices.get(i, j) {
        NO_ROW => 0.0,
        row => solution[row],
    });
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::{build_row_indices, compress_system};
    use crate::{Array2, FdmCompressedLinearSystem2, FdmLinearSystem2};

    /// Compresses the unknown rows of an assembled system and checks the
    /// result is a symmetric, weakly diagonally dominant operator. Also
    /// rejects stencil couplings that reach a non-unknown cell, since
    /// compression drops those silently.
    pub fn assert_compressed_symmetric(
        system: &FdmLinearSystem2,
        is_unknown: impl Fn(usize, usize) -> bool,
    ) {
        let (width, height) = system.size();
        for j in 0..height {
            for i in 0..width {
                let row = system.a.get(i, j);
                if i + 1 < width && !(is_unknown(i, j) && is_unknown(i + 1, j)) {
                    assert_eq!(row.right, 0.0, "coupling leaves the unknowns at ({i}, {j})");
                }
                if j + 1 < height && !(is_unknown(i, j) && is_unknown(i, j + 1)) {
                    assert_eq!(row.up, 0.0, "coupling leaves the unknowns at ({i}, {j})");
                }
            }
        }

        let mut indices = Array2::default();
        let rows = build_row_indices(width, height, &is_unknown, &mut indices);
        assert!(rows > 0, "no unknown cells");
        let mut compressed = FdmCompressedLinearSystem2::default();
        compress_system(system, &indices, rows, &mut compressed);
        let a = &compressed.a;
        assert_eq!(a.n_rows(), rows);

        let scale = a.diagonal().iter().fold(0.0_f64, |m, d| m.max(d.abs()));
        assert!(a.is_symmetric(1e-12 * scale), "compressed operator is not symmetric");
        for row in 0..rows {
            let (cols, values) = a.row(row);
            let off: f64 = cols
                .iter()
                .zip(values)
                .filter(|(col, _)| **col != row)
                .map(|(_, value)| value.abs())
                .sum();
            let center = a.get(row, row);
            assert!(center > 0.0, "row {row} has diagonal {center}");
            assert!(
                center >= off - 1e-12 * scale,
                "row {row} is not diagonally dominant: {center} < {off}"
            );
        }
    }
}
