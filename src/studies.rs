//! Batch studies built from independent solves: mesh refinement, coupling
//! sweeps and linear/nonlinear comparisons.
//!
//! Every solve owns its own grid and iterate, so the batches run on the
//! `rayon` thread pool.

use nalgebra::DVector;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::assembly::{solve_linear_bvp, LinearSolution};
use crate::error::{Result, SolverError};
use crate::options::ProblemOptions;
use crate::solving::{fixed_point_from, Solution};
use crate::tridiag::infinity_norm;

/// Grid sizes of the reference refinement study.
pub const REFINEMENT_GRID_SIZES: [usize; 7] = [10, 15, 30, 70, 100, 1000, 10000];

/// Coupling range of the reference sweep.
pub const SWEEP_RANGE: (f64, f64) = (0.1, 6.4);

/// Number of couplings in the reference sweep.
pub const SWEEP_COUNT: usize = 10;

/// Value at the inner boundary for one grid size.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RefinementSample {
    /// Number of grid points.
    pub grid_points: usize,
    /// Grid spacing `h = 10 / n`.
    pub spacing: f64,
    /// Potential at the inner boundary `x = 1`.
    pub u0: f64,
}

/// Linear and Picard solutions at one coupling of a sweep.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SweepSample {
    /// Coupling, rounded to three decimals.
    pub mu: f64,
    /// Debye–Hückel solution, which is also the Picard starting point.
    pub linear: DVector<f64>,
    /// Picard run started from `linear`.
    pub fixed_point: Solution,
}

/// Debye–Hückel and Poisson–Boltzmann solutions on the same grid.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelComparison {
    /// Coupling both models were solved at.
    pub mu: f64,
    /// Debye–Hückel solution.
    pub linear: LinearSolution,
    /// Picard solution of the Poisson–Boltzmann problem.
    pub nonlinear: Solution,
    /// `‖u_nonlinear - u_linear‖∞`.
    pub max_difference: f64,
}

/// Solves the Debye–Hückel problem for each grid size and records `u[0]`.
pub fn refinement_study(mu: f64, grid_sizes: &[usize]) -> Result<Vec<RefinementSample>> {
    grid_sizes
        .par_iter()
        .map(|&grid_points| -> Result<RefinementSample> {
            let solution = solve_linear_bvp(grid_points, mu)?;
            Ok(RefinementSample {
                grid_points,
                spacing: solution.grid.spacing(),
                u0: solution.u[0],
            })
        })
        .collect()
}

/// `count` evenly spaced couplings in `[lower, upper]`, rounded to three decimals.
pub fn sweep_values(lower: f64, upper: f64, count: usize) -> Vec<f64> {
    let round = |mu: f64| (mu * 1000.0).round() / 1000.0;
    match count {
        0 => Vec::new(),
        1 => vec![round(lower)],
        _ => {
            let step = (upper - lower) / (count - 1) as f64;
            (0..count)
                .map(|i| round(lower + i as f64 * step))
                .collect()
        }
    }
}

/// Runs the linear solve and the Picard iteration for every sweep coupling.
pub fn mu_sweep(
    lower: f64,
    upper: f64,
    count: usize,
    options: &ProblemOptions,
) -> Result<Vec<SweepSample>> {
    if !(lower.is_finite() && upper.is_finite()) || lower > upper {
        return Err(SolverError::InvalidBracket { lower, upper });
    }

    sweep_values(lower, upper, count)
        .into_par_iter()
        .map(|mu| -> Result<SweepSample> {
            let linear = solve_linear_bvp(options.grid_points, mu)?;
            let start = linear.u.clone();
            let fixed_point = fixed_point_from(linear, mu, options)?;
            Ok(SweepSample {
                mu,
                linear: start,
                fixed_point,
            })
        })
        .collect()
}

/// Solves both models at `mu` and measures how far apart they are.
///
/// The Picard run starts from the linear solution, so the linear system is
/// solved once.
pub fn compare_models(mu: f64, options: &ProblemOptions) -> Result<ModelComparison> {
    let linear = solve_linear_bvp(options.grid_points, mu)?;
    let nonlinear = fixed_point_from(linear.clone(), mu, options)?;
    let max_difference = infinity_norm(&(&nonlinear.u - &linear.u));

    Ok(ModelComparison {
        mu,
        linear,
        nonlinear,
        max_difference,
    })
}
