use crate::error::{ConfigError, ConfigResult};
use crate::solver::{
    FdmCgSolver2, FdmGaussSeidelSolver2, FdmIccgSolver2, FdmJacobiSolver2,
    FdmLinearSystemSolver2, FdmMgSolver2, MgParameters,
};
use crate::{
    BoundaryType, GridBackwardEulerDiffusionSolver2, GridDiffusionSolver2,
    GridForwardEulerDiffusionSolver2, GridPressureSolver2, PressureSolverKind,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Solver selection for a simulation, loadable from JSON. Every field falls
/// back to the constructor defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub pressure: PressureSolverConfig,
    pub diffusion: DiffusionSolverConfig,
}

impl SolverConfig {
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&json)?;
        log::debug!("loaded solver config from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn to_json_string(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(solver) = &self.pressure.linear_solver {
            solver.validate("pressure.linear_solver")?;
        }
        self.diffusion.validate()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PressureSolverConfig {
    pub kind: PressureSolverKind,
    /// Replaces the pressure solver's default linear solver when set.
    pub linear_solver: Option<LinearSolverConfig>,
    /// Solve on a CSR system holding only the unknown cells.
    pub use_compressed: bool,
}

impl PressureSolverConfig {
    pub fn build(&self) -> Box<dyn GridPressureSolver2> {
        let mut solver = self.kind.build();
        if let Some(linear_solver) = &self.linear_solver {
            solver.set_linear_system_solver(linear_solver.build());
        }
        solver
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffusionSolverKind {
    #[default]
    BackwardEuler,
    ForwardEuler,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffusionSolverConfig {
    pub kind: DiffusionSolverKind,
    pub boundary_type: BoundaryType,
    /// Only the backward Euler solver runs a linear solve.
    pub linear_solver: Option<LinearSolverConfig>,
}

impl DiffusionSolverConfig {
    fn validate(&self) -> ConfigResult<()> {
        match (&self.kind, &self.linear_solver) {
            (DiffusionSolverKind::ForwardEuler, Some(_)) => Err(ConfigError::invalid(
                "diffusion.linear_solver",
                "set",
                "forward Euler diffusion has no linear solve",
            )),
            (_, Some(solver)) => solver.validate("diffusion.linear_solver"),
            (_, None) => Ok(()),
        }
    }

    pub fn build(&self) -> Box<dyn GridDiffusionSolver2> {
        match self.kind {
            DiffusionSolverKind::BackwardEuler => {
                let mut solver = GridBackwardEulerDiffusionSolver2::new(self.boundary_type);
                if let Some(linear_solver) = &self.linear_solver {
                    solver.set_linear_system_solver(linear_solver.build());
                }
                Box::new(solver)
            }
            DiffusionSolverKind::ForwardEuler => Box::new(GridForwardEulerDiffusionSolver2::new()),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preconditioning {
    None,
    #[default]
    IncompleteCholesky,
}

fn default_max_iterations() -> usize {
    100
}

fn default_check_interval() -> usize {
    10
}

fn default_tolerance() -> f64 {
    1e-6
}

fn default_sor_factor() -> f64 {
    1.0
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LinearSolverConfig {
    Jacobi {
        #[serde(default = "default_max_iterations")]
        max_number_of_iterations: usize,
        #[serde(default = "default_check_interval")]
        residual_check_interval: usize,
        #[serde(default = "default_tolerance")]
        tolerance: f64,
    },
    GaussSeidel {
        #[serde(default = "default_max_iterations")]
        max_number_of_iterations: usize,
        #[serde(default = "default_check_interval")]
        residual_check_interval: usize,
        #[serde(default = "default_tolerance")]
        tolerance: f64,
        #[serde(default = "default_sor_factor")]
        sor_factor: f64,
        #[serde(default)]
        use_red_black_ordering: bool,
    },
    ConjugateGradient {
        #[serde(default = "default_max_iterations")]
        max_number_of_iterations: usize,
        #[serde(default = "default_tolerance")]
        tolerance: f64,
        #[serde(default)]
        preconditioner: Preconditioning,
    },
    Multigrid(MgParameters),
}

impl Default for LinearSolverConfig {
    fn default() -> Self {
        Self::ConjugateGradient {
            max_number_of_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
            preconditioner: Preconditioning::default(),
        }
    }
}

impl LinearSolverConfig {
    pub fn build(&self) -> Box<dyn FdmLinearSystemSolver2> {
        match *self {
            Self::Jacobi {
                max_number_of_iterations,
                residual_check_interval,
                tolerance,
            } => Box::new(FdmJacobiSolver2::new(
                max_number_of_iterations,
                residual_check_interval,
                tolerance,
            )),
            Self::GaussSeidel {
                max_number_of_iterations,
                residual_check_interval,
                tolerance,
                sor_factor,
                use_red_black_ordering,
            } => Box::new(FdmGaussSeidelSolver2::new(
                max_number_of_iterations,
                residual_check_interval,
                tolerance,
                sor_factor,
                use_red_black_ordering,
            )),
            Self::ConjugateGradient {
                max_number_of_iterations,
                tolerance,
                preconditioner: Preconditioning::None,
            } => Box::new(FdmCgSolver2::new(max_number_of_iterations, tolerance)),
            Self::ConjugateGradient {
                max_number_of_iterations,
                tolerance,
                preconditioner: Preconditioning::IncompleteCholesky,
            } => Box::new(FdmIccgSolver2::new(max_number_of_iterations, tolerance)),
            Self::Multigrid(params) => Box::new(FdmMgSolver2::new(params)),
        }
    }

    pub fn validate(&self, key: &str) -> ConfigResult<()> {
        let positive_tolerance = |tolerance: f64| {
            if tolerance > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::invalid(&format!("{key}.tolerance"), tolerance, "must be positive"))
            }
        };
        let nonzero = |name: &str, value: usize| {
            if value > 0 {
                Ok(())
            } else {
                Err(ConfigError::invalid(&format!("{key}.{name}"), value, "must be at least 1"))
            }
        };
        let sor = |sor_factor: f64| {
            if sor_factor > 0.0 && sor_factor < 2.0 {
                Ok(())
            } else {
                Err(ConfigError::invalid(&format!("{key}.sor_factor"), sor_factor, "must lie in (0, 2)"))
            }
        };

        match *self {
            Self::Jacobi {
                max_number_of_iterations,
                residual_check_interval,
                tolerance,
            } => {
                nonzero("max_number_of_iterations", max_number_of_iterations)?;
                nonzero("residual_check_interval", residual_check_interval)?;
                positive_tolerance(tolerance)
            }
            Self::GaussSeidel {
                max_number_of_iterations,
                residual_check_interval,
                tolerance,
                sor_factor,
                ..
            } => {
                nonzero("max_number_of_iterations", max_number_of_iterations)?;
                nonzero("residual_check_interval", residual_check_interval)?;
                positive_tolerance(tolerance)?;
                sor(sor_factor)
            }
            Self::ConjugateGradient {
                max_number_of_iterations,
                tolerance,
                ..
            } => {
                nonzero("max_number_of_iterations", max_number_of_iterations)?;
                positive_tolerance(tolerance)
            }
            Self::Multigrid(params) => {
                nonzero("max_number_of_levels", params.max_number_of_levels)?;
                nonzero("max_number_of_cycles", params.max_number_of_cycles)?;
                if params.max_tolerance <= 0.0 {
                    return Err(ConfigError::invalid(
                        &format!("{key}.max_tolerance"),
                        params.max_tolerance,
                        "must be positive",
                    ));
                }
                sor(params.sor_factor)
            }
        }
    }
}
