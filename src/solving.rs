//! Outer iterations for the Poisson–Boltzmann equation: Picard (fixed point) and Newton.
//!
//! Both loops start from the Debye–Hückel solution and track two sup-norms:
//! an equation residual and the size of the last step. A run stops once both
//! fall below their tolerances or once the iteration counter exceeds the cap.
//! Callers tell convergence from cap exhaustion through [`ConvergenceStatus`].

use log::{debug, trace, warn};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::assembly::{
    check_coupling, fixed_point_step, newton_step, solve_linear_bvp, LinearSolution,
};
use crate::error::{Result, SolverError};
use crate::grid::Grid;
use crate::options::ProblemOptions;
use crate::tridiag::infinity_norm;

/// Stopping rule of an outer iteration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IterationOptions {
    /// Sup-norm tolerance on the equation residual.
    pub residual_tolerance: f64,
    /// Sup-norm tolerance on the change between consecutive iterates.
    pub step_tolerance: f64,
    /// The loop stops once the counter exceeds this value.
    pub max_iterations: usize,
}

impl IterationOptions {
    /// Residual tolerance shared by both iterations.
    pub const RESIDUAL_TOLERANCE: f64 = 10e-12;
    /// Step tolerance shared by both iterations.
    pub const STEP_TOLERANCE: f64 = 10e-9;

    /// Picard defaults: cap of 200 iterations.
    pub fn fixed_point() -> Self {
        Self {
            residual_tolerance: Self::RESIDUAL_TOLERANCE,
            step_tolerance: Self::STEP_TOLERANCE,
            max_iterations: 200,
        }
    }

    /// Newton defaults: cap of 50 iterations.
    pub fn newton() -> Self {
        Self {
            max_iterations: 50,
            ..Self::fixed_point()
        }
    }

    /// Override the iteration cap.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Override both tolerances.
    pub fn with_tolerances(mut self, residual: f64, step: f64) -> Self {
        self.residual_tolerance = residual;
        self.step_tolerance = step;
        self
    }

    /// Whether both norms are below their tolerances.
    pub fn is_satisfied(&self, residual_norm: f64, step_norm: f64) -> bool {
        residual_norm < self.residual_tolerance && step_norm < self.step_tolerance
    }

    /// Whether iteration `k` has run past the cap.
    pub fn is_exhausted(&self, k: usize) -> bool {
        k > self.max_iterations
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !(self.residual_tolerance > 0.0 && self.step_tolerance > 0.0) {
            return Err(SolverError::InvalidOptions {
                reason: "tolerances must be positive",
            });
        }
        Ok(())
    }
}

impl Default for IterationOptions {
    fn default() -> Self {
        Self::fixed_point()
    }
}

/// How an outer iteration ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConvergenceStatus {
    /// Both tolerances were met before the cap.
    Converged,
    /// The counter exceeded the cap first.
    CappedOut,
    /// The iterate overflowed; the run ended early.
    Diverged,
}

/// Diagnostics returned alongside the final iterate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceSummary {
    /// Number of completed outer steps.
    pub iterations: usize,
    /// Last residual sup-norm.
    pub residual_norm: f64,
    /// Last step sup-norm.
    pub step_norm: f64,
    /// Terminal state.
    pub status: ConvergenceStatus,
}

/// Final iterate of an outer loop together with its grid and diagnostics.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Solution {
    /// Discretization grid.
    pub grid: Grid,
    /// Last finite iterate.
    pub u: DVector<f64>,
    /// How the run ended.
    pub summary: ConvergenceSummary,
}

impl Solution {
    /// Number of outer steps taken.
    pub fn iterations(&self) -> usize {
        self.summary.iterations
    }

    /// Whether the run met both tolerances.
    pub fn converged(&self) -> bool {
        self.summary.status == ConvergenceStatus::Converged
    }
}

/// Next iterate produced by one step and the residual norm to test it with.
struct Advance {
    u_next: DVector<f64>,
    residual_norm: f64,
}

/// Drives `advance` from the Debye–Hückel solution until the stopping rule fires.
fn iterate<F>(
    label: &'static str,
    linear: LinearSolution,
    options: &IterationOptions,
    mut advance: F,
) -> Result<Solution>
where
    F: FnMut(&Grid, &DVector<f64>) -> Result<Advance>,
{
    options.validate()?;

    let operator = linear.operator()?;
    let LinearSolution { grid, mut u, .. } = linear;
    grid.check_len("initial iterate", &u)?;
    if !u.iter().all(|value| value.is_finite()) {
        return Err(SolverError::non_finite("initial iterate"));
    }

    let mut residual_norm = infinity_norm(&operator.mul_vec(&u)?);
    let mut step_norm = infinity_norm(&u);
    let mut k = 0usize;

    while !(options.is_exhausted(k) || options.is_satisfied(residual_norm, step_norm)) {
        let outcome = advance(&grid, &u).and_then(|next| {
            if next.u_next.iter().all(|value| value.is_finite()) {
                Ok(next)
            } else {
                Err(SolverError::non_finite("iterate update"))
            }
        });
        let Advance {
            u_next,
            residual_norm: next_residual,
        } = match outcome {
            Ok(next) => next,
            Err(err) if err.is_divergence_signal() => {
                warn!("{label} iteration diverged after {k} steps: {err}");
                return Ok(Solution {
                    grid,
                    u,
                    summary: ConvergenceSummary {
                        iterations: k,
                        residual_norm,
                        step_norm,
                        status: ConvergenceStatus::Diverged,
                    },
                });
            }
            Err(err) => return Err(err),
        };

        residual_norm = next_residual;
        step_norm = infinity_norm(&(&u_next - &u));
        u = u_next;
        k += 1;
        trace!("{label} step {k}: residual {residual_norm:e}, step {step_norm:e}");
    }

    let status = if options.is_exhausted(k) {
        ConvergenceStatus::CappedOut
    } else {
        ConvergenceStatus::Converged
    };
    debug!("{label} iteration finished after {k} steps with status {status:?}");

    Ok(Solution {
        grid,
        u,
        summary: ConvergenceSummary {
            iterations: k,
            residual_norm,
            step_norm,
            status,
        },
    })
}

/// Runs the Picard iteration for coupling `mu`.
///
/// The residual is measured against the Debye–Hückel operator `A` as
/// `‖A·u_next - z‖∞`, where `z` is the right-hand side of the step.
pub fn run_fixed_point(mu: f64, options: &ProblemOptions) -> Result<Solution> {
    options.validate()?;
    let linear = solve_linear_bvp(options.grid_points, mu)?;
    fixed_point_from(linear, mu, options)
}

/// Runs the Picard iteration starting from an already solved Debye–Hückel problem.
///
/// The grid is taken from `linear`; `options.grid_points` is not consulted.
/// An initial iterate with NaN or infinite entries is rejected up front.
pub fn fixed_point_from(
    linear: LinearSolution,
    mu: f64,
    options: &ProblemOptions,
) -> Result<Solution> {
    options.validate()?;
    check_coupling(mu)?;
    let operator = linear.operator()?;

    iterate("fixed-point", linear, &options.fixed_point, |grid, u| {
        let step = fixed_point_step(grid, u, mu)?;
        let defect = operator.mul_vec(&step.u_next)? - &step.rhs;
        Ok(Advance {
            residual_norm: infinity_norm(&defect),
            u_next: step.u_next,
        })
    })
}

/// Runs the Newton iteration for coupling `mu`.
///
/// The residual norm is `‖F(u)‖∞` at the iterate the step started from.
pub fn run_newton(mu: f64, options: &ProblemOptions) -> Result<Solution> {
    options.validate()?;
    let linear = solve_linear_bvp(options.grid_points, mu)?;
    let method = options.jacobian_solve;

    iterate("newton", linear, &options.newton, |grid, u| {
        let step = newton_step(grid, u, mu, method)?;
        Ok(Advance {
            residual_norm: infinity_norm(&step.residual),
            u_next: step.u_next,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::assemble_newton;
    use crate::options::JacobianSolve;
    use approx::assert_relative_eq;

    fn small_problem() -> ProblemOptions {
        ProblemOptions::default().with_grid_points(200)
    }

    #[test]
    fn default_tolerances_keep_literal_values() {
        let options = IterationOptions::fixed_point();
        assert_eq!(options.residual_tolerance, 1e-11);
        assert_eq!(options.step_tolerance, 1e-8);
        assert_eq!(options.max_iterations, 200);
        assert_eq!(IterationOptions::newton().max_iterations, 50);
    }

    #[test]
    fn picard_converges_for_unit_coupling() {
        let solution = run_fixed_point(1.0, &small_problem()).unwrap();
        assert!(solution.converged());
        assert!(solution.iterations() > 0 && solution.iterations() <= 200);
        assert!(solution.summary.step_norm < 1e-8);
        assert_eq!(solution.u.len(), 200);
    }

    #[test]
    fn converged_picard_iterate_is_a_fixed_point() {
        let solution = run_fixed_point(2.0, &small_problem()).unwrap();
        assert!(solution.converged());
        let again = fixed_point_step(&solution.grid, &solution.u, 2.0).unwrap();
        assert!(infinity_norm(&(&again.u_next - &solution.u)) < 1e-8);
    }

    #[test]
    fn newton_agrees_with_picard() {
        let options = small_problem();
        let picard = run_fixed_point(1.0, &options).unwrap();
        let newton = run_newton(1.0, &options).unwrap();

        assert!(newton.converged());
        assert!(newton.iterations() < picard.iterations());
        assert_relative_eq!(newton.u, picard.u, epsilon = 1e-7);

        let residual = assemble_newton(&newton.grid, &newton.u, 1.0).unwrap().residual;
        assert!(infinity_norm(&residual) < 1e-10);
    }

    #[test]
    fn dense_jacobian_solve_reaches_same_solution() {
        let options = ProblemOptions::default()
            .with_grid_points(60)
            .with_jacobian_solve(JacobianSolve::DenseLu);
        let dense = run_newton(1.0, &options).unwrap();
        let thomas = run_newton(1.0, &options.with_jacobian_solve(JacobianSolve::Thomas)).unwrap();
        assert!(dense.converged());
        assert_relative_eq!(dense.u, thomas.u, epsilon = 1e-9);
    }

    #[test]
    fn tiny_cap_reports_capped_out() {
        let options = small_problem()
            .with_fixed_point(IterationOptions::fixed_point().with_max_iterations(2));
        let solution = run_fixed_point(1.0, &options).unwrap();
        assert_eq!(solution.summary.status, ConvergenceStatus::CappedOut);
        assert_eq!(solution.iterations(), 3);
    }

    #[test]
    fn strong_coupling_diverges_early_and_stays_finite() {
        let solution = run_fixed_point(7.0, &small_problem()).unwrap();
        assert_eq!(solution.summary.status, ConvergenceStatus::Diverged);
        assert!(solution.iterations() > 0 && solution.iterations() < 10);
        assert!(solution.u.iter().all(|value| value.is_finite()));
    }

    #[test]
    fn nan_coupling_is_an_error_not_a_solution() {
        for result in [
            run_fixed_point(f64::NAN, &small_problem()),
            run_newton(f64::NAN, &small_problem()),
        ] {
            assert!(matches!(result, Err(SolverError::InvalidCoupling { .. })));
        }
    }

    #[test]
    fn non_finite_initial_iterate_is_rejected() {
        let mut linear = solve_linear_bvp(50, 1.0).unwrap();
        linear.u[3] = f64::NAN;
        assert!(matches!(
            fixed_point_from(linear, 1.0, &small_problem()),
            Err(SolverError::NonFinite {
                context: "initial iterate"
            })
        ));
    }

    #[test]
    fn starting_from_a_given_linear_solution_matches_a_full_run() {
        let options = small_problem();
        let linear = solve_linear_bvp(options.grid_points, 2.0).unwrap();
        let resumed = fixed_point_from(linear, 2.0, &options).unwrap();
        let full = run_fixed_point(2.0, &options).unwrap();
        assert_eq!(resumed.summary, full.summary);
        assert_eq!(resumed.u, full.u);
    }

    #[test]
    fn rejects_non_positive_tolerances() {
        let options = small_problem()
            .with_fixed_point(IterationOptions::fixed_point().with_tolerances(0.0, 1e-8));
        assert!(matches!(
            run_fixed_point(1.0, &options),
            Err(SolverError::InvalidOptions { .. })
        ));
    }
}
