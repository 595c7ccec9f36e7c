//! Finite-difference assembly of the Debye–Hückel and Poisson–Boltzmann systems.
//!
//! All three systems share the same geometric off-diagonals: row `i` couples
//! to `u[i - 1]` with `1 - h / (2 x_i)` and to `u[i + 1]` with
//! `1 + h / (2 x_i)`. Row 0 carries the Neumann condition at `x = 1` through
//! an eliminated image point (neighbor coefficient 2 and a `μ`-dependent
//! source), and the Dirichlet condition at the far end is absorbed into the
//! last row by dropping its right neighbor.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SolverError};
use crate::grid::Grid;
use crate::options::JacobianSolve;
use crate::tridiag::TridiagonalMatrix;

/// Tridiagonal system `A·u = z` assembled for one solve.
#[derive(Clone, Debug)]
pub struct LinearSystem {
    /// Operator `A`.
    pub matrix: TridiagonalMatrix,
    /// Right-hand side `z`.
    pub rhs: DVector<f64>,
}

/// Jacobian and residual of the discrete Poisson–Boltzmann equation at an iterate.
#[derive(Clone, Debug)]
pub struct NewtonSystem {
    /// Jacobian `J = ∂F/∂u`.
    pub jacobian: TridiagonalMatrix,
    /// Residual `F(u)`.
    pub residual: DVector<f64>,
}

/// Solution of the linear Debye–Hückel problem.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LinearSolution {
    /// Discretization grid.
    pub grid: Grid,
    /// Discrete potential at the grid points.
    pub u: DVector<f64>,
    /// Sub-diagonal of the Debye–Hückel operator.
    pub sub: DVector<f64>,
    /// Main diagonal of the Debye–Hückel operator.
    pub diag: DVector<f64>,
    /// Super-diagonal of the Debye–Hückel operator.
    pub sup: DVector<f64>,
}

impl LinearSolution {
    /// Rebuilds the Debye–Hückel operator from the stored diagonals.
    pub fn operator(&self) -> Result<TridiagonalMatrix> {
        TridiagonalMatrix::new(self.sub.clone(), self.diag.clone(), self.sup.clone())
    }
}

/// Result of one fixed-point step.
#[derive(Clone, Debug)]
pub struct FixedPointStep {
    /// Next iterate.
    pub u_next: DVector<f64>,
    /// Right-hand side the step solved against.
    pub rhs: DVector<f64>,
}

/// Result of one Newton step.
#[derive(Clone, Debug)]
pub struct NewtonStep {
    /// Next iterate `u - J⁻¹·F`.
    pub u_next: DVector<f64>,
    /// Residual `F(u)` at the incoming iterate.
    pub residual: DVector<f64>,
}

/// Nonlinear part of the Poisson–Boltzmann source, `sinh(t) - t`.
fn excess_source(t: f64) -> f64 {
    t.sinh() - t
}

/// Row 0 injection of the Neumann boundary condition.
fn boundary_source(grid: &Grid, mu: f64) -> f64 {
    let h = grid.spacing();
    mu * h * (h - 2.0)
}

/// Builds the operator with the geometric off-diagonals and the given main diagonal.
fn geometric_operator(grid: &Grid, diag: DVector<f64>) -> Result<TridiagonalMatrix> {
    let n = grid.len();
    let sub = DVector::from_fn(n - 1, |k, _| grid.lower_coefficient(k + 1));
    let sup = DVector::from_fn(n - 1, |i, _| grid.upper_coefficient(i));
    TridiagonalMatrix::new(sub, diag, sup)
}

/// Rejects a coupling that is NaN or infinite.
pub(crate) fn check_coupling(mu: f64) -> Result<()> {
    if mu.is_finite() {
        Ok(())
    } else {
        Err(SolverError::InvalidCoupling { mu })
    }
}

fn ensure_finite(context: &'static str, values: &DVector<f64>) -> Result<()> {
    if values.iter().all(|value| value.is_finite()) {
        Ok(())
    } else {
        Err(SolverError::non_finite(context))
    }
}

/// Assembles the linear Debye–Hückel system for coupling `mu`.
pub fn assemble_debye_huckel(grid: &Grid, mu: f64) -> Result<LinearSystem> {
    let h = grid.spacing();
    let matrix = geometric_operator(grid, DVector::from_element(grid.len(), -(2.0 + h * h)))?;

    let mut rhs = DVector::zeros(grid.len());
    rhs[0] = boundary_source(grid, mu);

    Ok(LinearSystem { matrix, rhs })
}

/// Assembles the Picard system for the Poisson–Boltzmann equation at iterate `u`.
///
/// The operator is the Debye–Hückel one; only the right-hand side depends on
/// `u`, through `h²·(sinh(u) - u)`.
pub fn assemble_fixed_point(grid: &Grid, u: &DVector<f64>, mu: f64) -> Result<LinearSystem> {
    grid.check_len("fixed-point iterate", u)?;

    let h2 = grid.spacing().powi(2);
    let LinearSystem { matrix, mut rhs } = assemble_debye_huckel(grid, mu)?;
    for (z, value) in rhs.iter_mut().zip(u.iter()) {
        *z += h2 * excess_source(*value);
    }
    ensure_finite("fixed-point source term", &rhs)?;

    Ok(LinearSystem { matrix, rhs })
}

/// Assembles the Newton Jacobian and residual at iterate `u`.
pub fn assemble_newton(grid: &Grid, u: &DVector<f64>, mu: f64) -> Result<NewtonSystem> {
    grid.check_len("Newton iterate", u)?;

    let n = grid.len();
    let h = grid.spacing();
    let h2 = h * h;

    let diag = u.map(|value| -2.0 - h2 * value.cosh());
    ensure_finite("Newton Jacobian diagonal", &diag)?;
    let jacobian = geometric_operator(grid, diag)?;

    let mut residual = DVector::zeros(n);
    for i in 0..n {
        let mut row = -2.0 * u[i] - h2 * u[i].sinh();
        if i > 0 {
            row += grid.lower_coefficient(i) * u[i - 1];
        }
        if i + 1 < n {
            row += grid.upper_coefficient(i) * u[i + 1];
        }
        residual[i] = row;
    }
    residual[0] -= boundary_source(grid, mu);
    ensure_finite("Newton residual", &residual)?;

    Ok(NewtonSystem { jacobian, residual })
}

/// Solves the Debye–Hückel problem on an `n`-point grid.
pub fn solve_linear_bvp(n: usize, mu: f64) -> Result<LinearSolution> {
    check_coupling(mu)?;
    let grid = Grid::new(n)?;
    let LinearSystem { matrix, rhs } = assemble_debye_huckel(&grid, mu)?;
    let u = matrix.solve(&rhs)?;

    Ok(LinearSolution {
        grid,
        u,
        sub: matrix.sub().clone(),
        diag: matrix.diag().clone(),
        sup: matrix.sup().clone(),
    })
}

/// Performs one Picard step from `u`.
pub fn fixed_point_step(grid: &Grid, u: &DVector<f64>, mu: f64) -> Result<FixedPointStep> {
    let LinearSystem { matrix, rhs } = assemble_fixed_point(grid, u, mu)?;
    let u_next = matrix.solve(&rhs)?;
    Ok(FixedPointStep { u_next, rhs })
}

/// Performs one full Newton step from `u`: solves `J·δ = F` and returns `u - δ`.
pub fn newton_step(
    grid: &Grid,
    u: &DVector<f64>,
    mu: f64,
    method: JacobianSolve,
) -> Result<NewtonStep> {
    let NewtonSystem { jacobian, residual } = assemble_newton(grid, u, mu)?;

    let delta = match method {
        JacobianSolve::Thomas => jacobian.solve(&residual)?,
        JacobianSolve::DenseLu => jacobian
            .to_dense()
            .lu()
            .solve(&residual)
            .ok_or_else(|| SolverError::singular("Newton Jacobian"))?,
    };

    Ok(NewtonStep {
        u_next: u - delta,
        residual,
    })
}
