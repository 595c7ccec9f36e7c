//! Finite-difference solvers for the radial Debye–Hückel and Poisson–Boltzmann equations.
//!
//! The potential `u` on `x ∈ [1, 11)` is discretized on a uniform grid of `n`
//! points. Every system that appears along the way is tridiagonal, so the
//! crate is built around a small Thomas-elimination kernel. It offers tools to
//!
//! - factor and solve tridiagonal systems without pivoting (`tridiag` module),
//! - assemble the linear, Picard and Newton systems (`assembly` module),
//! - iterate the nonlinear problem to convergence (`solving` module),
//! - bisect for the coupling at which the Picard iteration fails (`threshold` module), and
//! - run refinement studies and coupling sweeps (`studies` module).
//!
//! # Quick start
//!
//! ```no_run
//! use pbsolve::{run_fixed_point, run_newton, ProblemOptions};
//!
//! let options = ProblemOptions::default();
//! let picard = run_fixed_point(1.0, &options).expect("valid options");
//! let newton = run_newton(1.0, &options).expect("valid options");
//!
//! println!(
//!     "u(1) = {} after {} Picard steps, {} Newton steps",
//!     picard.u[0],
//!     picard.iterations(),
//!     newton.iterations()
//! );
//! ```
//!
//! Runs that hit the iteration cap or overflow are not errors; inspect
//! [`Solution::summary`] to tell them apart from converged runs.

pub mod assembly;
pub mod error;
pub mod grid;
pub mod options;
pub mod solving;
pub mod studies;
pub mod threshold;
pub mod tridiag;

pub use assembly::{solve_linear_bvp, LinearSolution};
pub use error::{Result, SolverError};
pub use grid::Grid;
pub use options::{Experiment, ExperimentOutcome, JacobianSolve, ProblemOptions};
pub use solving::{
    fixed_point_from, run_fixed_point, run_newton, ConvergenceStatus, ConvergenceSummary, IterationOptions,
    Solution,
};
pub use threshold::{find_divergence_threshold, BisectionOptions, ThresholdEstimate};
pub use tridiag::{LuFactors, TridiagonalMatrix};
