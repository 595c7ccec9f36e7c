//! Problem-level configuration and explicit experiment selection.

use serde::{Deserialize, Serialize};

use crate::assembly::{solve_linear_bvp, LinearSolution};
use crate::error::{Result, SolverError};
use crate::solving::{run_fixed_point, run_newton, IterationOptions, Solution};
use crate::studies::{
    compare_models, mu_sweep, refinement_study, ModelComparison, RefinementSample, SweepSample,
};
use crate::threshold::{find_divergence_threshold, BisectionOptions, ThresholdEstimate};

/// Linear solver used for the Newton correction `J·δ = F`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum JacobianSolve {
    /// Thomas elimination, exploiting that the Jacobian is tridiagonal.
    #[default]
    Thomas,
    /// General dense LU with partial pivoting.
    DenseLu,
}

/// Aggregated solver configuration shared by every entry point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProblemOptions {
    /// Number of grid points `n`.
    pub grid_points: usize,
    /// Stopping rule of the Picard iteration.
    pub fixed_point: IterationOptions,
    /// Stopping rule of the Newton iteration.
    pub newton: IterationOptions,
    /// Linear solve used inside each Newton step.
    pub jacobian_solve: JacobianSolve,
}

impl Default for ProblemOptions {
    fn default() -> Self {
        Self {
            grid_points: 1000,
            fixed_point: IterationOptions::fixed_point(),
            newton: IterationOptions::newton(),
            jacobian_solve: JacobianSolve::Thomas,
        }
    }
}

impl ProblemOptions {
    /// Override the grid size while preserving other defaults.
    pub fn with_grid_points(mut self, grid_points: usize) -> Self {
        self.grid_points = grid_points;
        self
    }

    /// Override the Picard stopping rule.
    pub fn with_fixed_point(mut self, fixed_point: IterationOptions) -> Self {
        self.fixed_point = fixed_point;
        self
    }

    /// Override the Newton stopping rule.
    pub fn with_newton(mut self, newton: IterationOptions) -> Self {
        self.newton = newton;
        self
    }

    /// Select the linear solve used for Newton corrections.
    pub fn with_jacobian_solve(mut self, jacobian_solve: JacobianSolve) -> Self {
        self.jacobian_solve = jacobian_solve;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.grid_points < 2 {
            return Err(SolverError::InvalidGrid {
                points: self.grid_points,
            });
        }
        self.fixed_point.validate()?;
        self.newton.validate()
    }
}

/// One runnable experiment. Each variant maps to a single entry point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Experiment {
    /// Debye–Hückel solve at coupling `mu`.
    LinearBvp { mu: f64 },
    /// Picard iteration at coupling `mu`.
    FixedPoint { mu: f64 },
    /// Newton iteration at coupling `mu`.
    Newton { mu: f64 },
    /// Threshold bisection for the Picard iteration.
    DivergenceThreshold(BisectionOptions),
    /// `u[0]` of the Debye–Hückel solution across grid sizes.
    Refinement { mu: f64, grid_sizes: Vec<usize> },
    /// Linear and Picard solutions over evenly spaced couplings.
    MuSweep { lower: f64, upper: f64, count: usize },
    /// Linear against Picard solution at one coupling.
    Comparison { mu: f64 },
}

/// Output of [`Experiment::run`].
#[derive(Clone, Debug)]
pub enum ExperimentOutcome {
    /// Debye–Hückel solution with its operator diagonals.
    LinearBvp(LinearSolution),
    /// Final Picard iterate and its convergence summary.
    FixedPoint(Solution),
    /// Final Newton iterate and its convergence summary.
    Newton(Solution),
    /// Located divergence threshold and the final bracket.
    DivergenceThreshold(ThresholdEstimate),
    /// One sample per requested grid size, in input order.
    Refinement(Vec<RefinementSample>),
    /// One sample per sweep coupling, in ascending order.
    MuSweep(Vec<SweepSample>),
    /// Both models at one coupling and their sup-norm distance.
    Comparison(ModelComparison),
}

impl Experiment {
    /// Runs the experiment. The grid size for `LinearBvp` and every
    /// iteration setting come from `options`.
    pub fn run(&self, options: &ProblemOptions) -> Result<ExperimentOutcome> {
        let outcome = match self {
            Self::LinearBvp { mu } => {
                ExperimentOutcome::LinearBvp(solve_linear_bvp(options.grid_points, *mu)?)
            }
            Self::FixedPoint { mu } => ExperimentOutcome::FixedPoint(run_fixed_point(*mu, options)?),
            Self::Newton { mu } => ExperimentOutcome::Newton(run_newton(*mu, options)?),
            Self::DivergenceThreshold(bisection) => ExperimentOutcome::DivergenceThreshold(
                find_divergence_threshold(bisection, options)?,
            ),
            Self::Refinement { mu, grid_sizes } => {
                ExperimentOutcome::Refinement(refinement_study(*mu, grid_sizes)?)
            }
            Self::MuSweep {
                lower,
                upper,
                count,
            } => ExperimentOutcome::MuSweep(mu_sweep(*lower, *upper, *count, options)?),
            Self::Comparison { mu } => ExperimentOutcome::Comparison(compare_models(*mu, options)?),
        };
        Ok(outcome)
    }
}
