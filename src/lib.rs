mod array;
mod blas;
mod config;
mod csr;
mod diffusion;
mod error;
mod fdm;
mod field;
mod grid;
mod level_set;
mod mac;
mod parallel;
mod pressure;
pub mod solver;
mod vec2;
mod vec_field;

pub use array::Array2;
pub use blas::{Blas, FdmBlas2, FdmCompressedBlas2};
pub use config::{
    DiffusionSolverConfig, DiffusionSolverKind, LinearSolverConfig, Preconditioning,
    PressureSolverConfig, SolverConfig,
};
pub use csr::CsrMatrix;
pub use diffusion::{
    BoundaryType, GridBackwardEulerDiffusionSolver2, GridDiffusionSolver2,
    GridForwardEulerDiffusionSolver2,
};
pub use error::{ConfigError, ConfigResult};
pub use fdm::{
    FdmCompressedLinearSystem2, FdmLinearSystem2, FdmMatrix2, FdmMatrixRow2, FdmVector2,
};
pub use field::Field2;
pub use grid::Grid2;
pub use level_set::{
    flags_from_sdf, fraction_inside_sdf, is_inside_sdf, CircleSdf2, ConstantScalarField2,
    ConstantVectorField2, ScalarField2, VectorField2,
};
pub use mac::{CellFlags, CellType, MacVelocity2, StaggeredField2, StaggeredGrid2};
pub use pressure::{
    BoundaryConditionKind, GridFractionalSinglePhasePressureSolver2, GridPressureSolver2,
    GridSinglePhasePressureSolver2, PressureSolverKind,
};
pub use vec2::Vec2;
pub use vec_field::VecField2;
